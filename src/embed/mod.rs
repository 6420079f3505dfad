//! Text embedding engine.
//!
//! Two model families: a deterministic, dependency-free hash embedder and an
//! optional e5-small sentence embedder (cargo feature `e5`). The engine owns
//! the heavy model's lifecycle: lazy load on first use, and a load or
//! inference failure is cached for the rest of the process so the expensive
//! attempt never repeats. When e5 is unavailable the engine falls back to
//! hash and reports the model that actually produced the vector.

pub mod e5;
pub mod hashvec;

use log::warn;

pub const EMBED_DIM: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Hash,
    E5Small,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Hash => "hash",
            ModelKind::E5Small => "e5-small",
        }
    }

    pub fn parse(s: &str) -> ModelKind {
        match s.trim().to_lowercase().as_str() {
            "e5-small" | "e5" => ModelKind::E5Small,
            _ => ModelKind::Hash,
        }
    }
}

enum E5State {
    Uninit,
    Ready(e5::E5Model),
    Failed,
}

pub struct EmbedEngine {
    e5: E5State,
    warned: bool,
}

impl Default for EmbedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbedEngine {
    pub fn new() -> Self {
        Self {
            e5: E5State::Uninit,
            warned: false,
        }
    }

    /// Embed text with the requested model. Returns the vector and the model
    /// that actually produced it; the two never disagree.
    pub fn embed(&mut self, text: &str, kind: ModelKind) -> (Vec<f32>, ModelKind) {
        if kind == ModelKind::E5Small {
            if let Some(vec) = self.e5_embed(text) {
                return (vec, ModelKind::E5Small);
            }
            if !self.warned {
                warn!("embedder 'e5-small' unavailable; falling back to hash");
                self.warned = true;
            }
        }
        (hashvec::hash_embed(text, EMBED_DIM), ModelKind::Hash)
    }

    fn e5_embed(&mut self, text: &str) -> Option<Vec<f32>> {
        if let E5State::Uninit = self.e5 {
            self.e5 = match e5::E5Model::load() {
                Ok(model) => E5State::Ready(model),
                Err(reason) => {
                    warn!("e5-small load failed: {reason}");
                    E5State::Failed
                }
            };
        }
        let model = match &mut self.e5 {
            E5State::Ready(model) => model,
            _ => return None,
        };
        match model.embed(text) {
            Ok(vec) => Some(vec),
            Err(reason) => {
                warn!("e5-small inference failed: {reason}");
                self.e5 = E5State::Failed;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_kind_parse() {
        assert_eq!(ModelKind::parse("e5-small"), ModelKind::E5Small);
        assert_eq!(ModelKind::parse("E5"), ModelKind::E5Small);
        assert_eq!(ModelKind::parse("hash"), ModelKind::Hash);
        assert_eq!(ModelKind::parse("anything else"), ModelKind::Hash);
    }

    #[test]
    fn test_hash_embed_reports_hash_model() {
        let mut engine = EmbedEngine::new();
        let (vec, model) = engine.embed("hello world", ModelKind::Hash);
        assert_eq!(model, ModelKind::Hash);
        assert_eq!(vec.len(), EMBED_DIM);
    }

    #[cfg(not(feature = "e5"))]
    #[test]
    fn test_e5_falls_back_to_hash_without_feature() {
        let mut engine = EmbedEngine::new();
        let (vec, model) = engine.embed("hello world", ModelKind::E5Small);
        assert_eq!(model, ModelKind::Hash);
        assert_eq!(vec.len(), EMBED_DIM);
        // Fallback vector must be bit-identical to a direct hash embed.
        let (direct, _) = engine.embed("hello world", ModelKind::Hash);
        assert_eq!(vec, direct);
    }

    #[cfg(not(feature = "e5"))]
    #[test]
    fn test_e5_failure_is_cached() {
        let mut engine = EmbedEngine::new();
        let _ = engine.embed("first", ModelKind::E5Small);
        assert!(matches!(engine.e5, E5State::Failed));
        // A second call must not reset the state.
        let (_, model) = engine.embed("second", ModelKind::E5Small);
        assert_eq!(model, ModelKind::Hash);
        assert!(matches!(engine.e5, E5State::Failed));
    }
}
