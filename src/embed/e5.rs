//! Optional e5-small sentence embedder backed by fastembed. Compiled out
//! unless the `e5` cargo feature is enabled; the stub loader always fails so
//! the engine's hash fallback kicks in.

#[cfg(feature = "e5")]
pub use real::E5Model;

#[cfg(not(feature = "e5"))]
pub use stub::E5Model;

#[cfg(feature = "e5")]
mod real {
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

    pub struct E5Model {
        inner: TextEmbedding,
    }

    impl E5Model {
        /// Load (and on first use, download) the model. Expensive; the engine
        /// calls this at most once per process.
        pub fn load() -> Result<Self, String> {
            let cache = dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("clipvault/models");
            std::fs::create_dir_all(&cache)
                .map_err(|e| format!("cannot create model cache dir: {e}"))?;
            let options = InitOptions::new(EmbeddingModel::MultilingualE5Small)
                .with_cache_dir(cache)
                .with_show_download_progress(false);
            let inner = TextEmbedding::try_new(options).map_err(|e| e.to_string())?;
            Ok(Self { inner })
        }

        pub fn embed(&mut self, text: &str) -> Result<Vec<f32>, String> {
            // e5 models expect a task prefix on the input text.
            let input = format!("passage: {text}");
            let mut vecs = self
                .inner
                .embed(vec![input], None)
                .map_err(|e| e.to_string())?;
            vecs.pop().ok_or_else(|| "model returned no embedding".to_string())
        }
    }
}

#[cfg(not(feature = "e5"))]
mod stub {
    pub struct E5Model;

    impl E5Model {
        pub fn load() -> Result<Self, String> {
            Err("built without the 'e5' feature".to_string())
        }

        pub fn embed(&mut self, _text: &str) -> Result<Vec<f32>, String> {
            Err("built without the 'e5' feature".to_string())
        }
    }
}
