//! Deterministic hash embedder: a bag-of-tokens vector where each token
//! increments a bucket chosen by a stable hash, L2-normalized at the end.
//! No model files, O(tokens) time, identical output across runs and machines.

use sha2::{Digest, Sha256};

/// Lowercase alphanumeric/underscore runs.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            current.push(ch.to_ascii_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Stable bucket for a token: first 8 bytes of its SHA-256, mod dim. Must not
/// depend on process-local hasher seeds, since vectors are persisted.
fn token_bucket(token: &str, dim: usize) -> usize {
    let digest = Sha256::digest(token.as_bytes());
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(raw) % dim as u64) as usize
}

/// Embed text into a `dim`-length unit vector. An input with no tokens yields
/// the zero vector; dividing by a zero norm is never attempted.
pub fn hash_embed(text: &str, dim: usize) -> Vec<f32> {
    let mut vec = vec![0.0f32; dim];
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return vec;
    }
    for tok in &tokens {
        vec[token_bucket(tok, dim)] += 1.0;
    }
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vec {
            *v /= norm;
        }
    }
    vec
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::EMBED_DIM;

    #[test]
    fn test_tokenize_basic() {
        assert_eq!(tokenize("Hello World"), vec!["hello", "world"]);
    }

    #[test]
    fn test_tokenize_strips_punctuation() {
        assert_eq!(tokenize("foo, bar! baz?"), vec!["foo", "bar", "baz"]);
    }

    #[test]
    fn test_tokenize_keeps_underscores() {
        assert_eq!(tokenize("snake_case id_42"), vec!["snake_case", "id_42"]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("!!! ...").is_empty());
    }

    #[test]
    fn test_embed_dimension() {
        assert_eq!(hash_embed("hello", EMBED_DIM).len(), EMBED_DIM);
    }

    #[test]
    fn test_embed_normalized() {
        let vec = hash_embed("the quick brown fox", EMBED_DIM);
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_embed_empty_returns_zeros() {
        let vec = hash_embed("", EMBED_DIM);
        assert_eq!(vec.len(), EMBED_DIM);
        assert!(vec.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_embed_deterministic() {
        assert_eq!(
            hash_embed("same text", EMBED_DIM),
            hash_embed("same text", EMBED_DIM)
        );
    }

    #[test]
    fn test_embed_different_inputs_differ() {
        let a = hash_embed("hello world", EMBED_DIM);
        let b = hash_embed("goodbye world", EMBED_DIM);
        assert!(a.iter().zip(b.iter()).any(|(x, y)| x != y));
    }

    #[test]
    fn test_bucket_stable() {
        let b1 = token_bucket("hello", EMBED_DIM);
        let b2 = token_bucket("hello", EMBED_DIM);
        assert_eq!(b1, b2);
        assert!(b1 < EMBED_DIM);
    }
}
