//! Vector similarity and ranking.
//!
//! Exhaustive O(n) scoring; fine for small corpora, no ANN structure.

use ragline_core::chunk::{Chunk, SearchResult};
use ragline_core::error::IndexError;
use std::sync::Arc;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 when either vector has zero norm. Vectors of different
/// lengths cannot come from the same index and are reported as an error,
/// as are vectors holding NaN or infinite components.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, IndexError> {
    if a.len() != b.len() {
        return Err(IndexError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    // f32 inputs cannot overflow f64 products, so only NaN/inf inputs get here.
    if !(dot.is_finite() && norm_a.is_finite() && norm_b.is_finite()) {
        return Err(IndexError::NonFiniteEmbedding);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32)
}

/// Rank `chunks` by cosine similarity to `query`.
///
/// Sorted by descending similarity; equal scores keep insertion order.
/// At most `limit` results.
pub fn rank(
    chunks: &[Arc<Chunk>],
    query: &[f32],
    limit: usize,
) -> Result<Vec<SearchResult>, IndexError> {
    let mut scored = chunks
        .iter()
        .map(|chunk| {
            cosine_similarity(query, &chunk.embedding).map(|similarity| SearchResult {
                chunk: Arc::clone(chunk),
                similarity,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // `sort_by` is stable; scores are finite here.
    scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    scored.truncate(limit);
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragline_core::chunk::EmbeddingMode;

    fn chunk(id: &str, embedding: Vec<f32>) -> Arc<Chunk> {
        Arc::new(Chunk {
            id: id.into(),
            content: format!("Content for {id}"),
            source: format!("{id}.md"),
            embedding,
            embedding_mode: EmbeddingMode::Semantic,
            metadata: serde_json::Map::new(),
        })
    }

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).unwrap();
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn cosine_opposite_vectors() {
        let sim = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap();
        assert!((sim - (-1.0)).abs() < 1e-6);
    }

    #[test]
    fn cosine_is_symmetric_and_bounded() {
        let a = [0.3, -1.2, 4.0, 0.01];
        let b = [2.0, 0.5, -0.7, 3.3];
        let ab = cosine_similarity(&a, &b).unwrap();
        let ba = cosine_similarity(&b, &a).unwrap();
        assert_eq!(ab, ba);
        assert!((-1.0..=1.0).contains(&ab));
    }

    #[test]
    fn cosine_zero_vector() {
        let sim = cosine_similarity(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(sim, 0.0);
        assert_eq!(cosine_similarity(&[], &[]).unwrap(), 0.0);
    }

    #[test]
    fn cosine_tiny_vectors_are_still_identical() {
        for v in [vec![1e-6, 0.0, 0.0], vec![1e-20, 3e-21, 0.0]] {
            let sim = cosine_similarity(&v, &v).unwrap();
            assert!((sim - 1.0).abs() < 1e-6, "{v:?} -> {sim}");
        }
    }

    #[test]
    fn cosine_rejects_non_finite_components() {
        let err = cosine_similarity(&[f32::NAN, 1.0], &[1.0, 1.0]).unwrap_err();
        assert_eq!(err, IndexError::NonFiniteEmbedding);
        assert!(cosine_similarity(&[1.0, 0.0], &[f32::INFINITY, 0.0]).is_err());
    }

    #[test]
    fn cosine_mismatched_lengths_is_an_error() {
        let err = cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(err, IndexError::DimensionMismatch { expected: 2, actual: 3 });
    }

    #[test]
    fn cosine_known_value() {
        // [1,1] · [1,0] = 1, |[1,1]| = sqrt(2), |[1,0]| = 1
        let sim = cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]).unwrap();
        assert!((sim - 0.7071).abs() < 0.001);
    }

    #[test]
    fn rank_orders_by_similarity() {
        let chunks = vec![
            chunk("a", vec![0.0, 1.0, 0.0]),
            chunk("b", vec![1.0, 0.0, 0.0]),
            chunk("c", vec![0.5, 0.5, 0.0]),
        ];
        let results = rank(&chunks, &[1.0, 0.0, 0.0], 10).unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn rank_ties_keep_insertion_order() {
        let chunks = vec![
            chunk("first", vec![1.0, 0.0]),
            chunk("second", vec![2.0, 0.0]),
            chunk("third", vec![3.0, 0.0]),
        ];
        let results = rank(&chunks, &[1.0, 0.0], 3).unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn rank_respects_limit() {
        let chunks: Vec<_> = (0..10)
            .map(|i| chunk(&format!("e{i}"), vec![1.0, i as f32 * 0.1]))
            .collect();
        assert_eq!(rank(&chunks, &[1.0, 0.0], 3).unwrap().len(), 3);
        assert!(rank(&[], &[1.0, 0.0], 3).unwrap().is_empty());
    }

    #[test]
    fn rank_stays_sorted_over_many_chunks() {
        let chunks: Vec<_> = (0..40)
            .map(|i| chunk(&format!("c{i}"), vec![1.0, (i as f32 * 0.37).sin(), 0.2]))
            .collect();
        let results = rank(&chunks, &[1.0, 0.3, 0.0], 40).unwrap();
        assert_eq!(results.len(), 40);
        assert!(results.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        assert!(results.iter().all(|r| (-1.0..=1.0).contains(&r.similarity)));
    }

    #[test]
    fn rank_refuses_a_nan_embedding() {
        let chunks = vec![
            chunk("ok", vec![1.0, 0.0]),
            chunk("bad", vec![f32::NAN, 1.0]),
        ];
        assert_eq!(
            rank(&chunks, &[1.0, 0.0], 2).unwrap_err(),
            IndexError::NonFiniteEmbedding
        );
    }

    #[test]
    fn rank_surfaces_dimension_mismatch() {
        let chunks = vec![chunk("a", vec![1.0, 0.0, 0.0])];
        assert!(rank(&chunks, &[1.0, 0.0], 3).is_err());
    }
}
