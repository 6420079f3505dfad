use std::cmp::Ordering;

/// Dot product of two vectors. Since stored embeddings are L2-normalized
/// this is cosine similarity in [-1, 1].
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Brute-force top-K over a bounded candidate pool. The sort is stable, so
/// equal scores keep the order the candidates arrived in (newest first when
/// the pool comes from the store).
pub fn knn(query: &[f32], ids: &[i64], vecs: &[Vec<f32>], limit: usize) -> Vec<(f32, i64)> {
    let mut sims: Vec<(f32, i64)> = ids
        .iter()
        .zip(vecs.iter())
        .map(|(&id, vec)| (cosine(query, vec), id))
        .collect();
    sims.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    sims.truncate(limit);
    sims
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let v = vec![0.6, 0.8];
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_knn_descending_order() {
        let query = vec![1.0, 0.0];
        let ids = vec![1, 2, 3];
        let vecs = vec![
            vec![0.0, 1.0],                  // sim 0.0
            vec![1.0, 0.0],                  // sim 1.0
            vec![0.7071068, 0.7071068],      // sim ~0.707
        ];
        let out = knn(&query, &ids, &vecs, 3);
        let ranked: Vec<i64> = out.iter().map(|&(_, id)| id).collect();
        assert_eq!(ranked, vec![2, 3, 1]);
        assert!(out[0].0 > out[1].0 && out[1].0 > out[2].0);
    }

    #[test]
    fn test_knn_respects_limit() {
        let query = vec![1.0];
        let ids = vec![1, 2, 3, 4];
        let vecs = vec![vec![0.1], vec![0.2], vec![0.3], vec![0.4]];
        assert_eq!(knn(&query, &ids, &vecs, 2).len(), 2);
    }

    #[test]
    fn test_knn_ties_keep_input_order() {
        let query = vec![1.0, 0.0];
        let ids = vec![10, 20, 30];
        let vecs = vec![vec![0.5, 0.5], vec![0.5, 0.5], vec![0.5, 0.5]];
        let out = knn(&query, &ids, &vecs, 3);
        let ranked: Vec<i64> = out.iter().map(|&(_, id)| id).collect();
        assert_eq!(ranked, vec![10, 20, 30]);
    }

    #[test]
    fn test_knn_empty_pool() {
        let out = knn(&[1.0], &[], &[], 5);
        assert!(out.is_empty());
    }
}
