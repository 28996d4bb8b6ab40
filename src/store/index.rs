//! In-memory vector index with k-nearest-neighbor search.
//!
//! Entries are keyed by item id (the source filename). Distances are
//! cosine distance (1 - cosine similarity): smaller = more similar.

use std::collections::HashMap;

/// In-memory vector index for one collection.
///
/// Supports upsert-by-id and k-NN queries by ascending cosine distance.
pub struct VectorIndex {
    /// Item id -> embedding
    entries: HashMap<String, Vec<f32>>,
    /// Expected embedding dimensions
    dimensions: usize,
}

/// A single k-NN hit: item id and cosine distance to the query.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub id: String,
    pub distance: f32,
}

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Cannot store or search with zero-norm vector")]
    ZeroNormVector,
}

impl VectorIndex {
    /// Create a new empty vector index with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self {
            entries: HashMap::new(),
            dimensions,
        }
    }

    /// Create an index with pre-allocated capacity.
    pub fn with_capacity(dimensions: usize, capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            dimensions,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Insert or overwrite the embedding for an id.
    ///
    /// Re-upserting an existing id replaces its vector; the index never
    /// holds two entries for one id.
    pub fn upsert(&mut self, id: String, embedding: Vec<f32>) -> Result<(), IndexError> {
        if embedding.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: embedding.len(),
            });
        }

        if l2_norm(&embedding) < f32::EPSILON {
            return Err(IndexError::ZeroNormVector);
        }

        self.entries.insert(id, embedding);
        Ok(())
    }

    /// Get an embedding by id.
    pub fn get(&self, id: &str) -> Option<&Vec<f32>> {
        self.entries.get(id)
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Vec<f32>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Find the k nearest neighbors of a query vector.
    ///
    /// Returns up to `k` hits sorted by ascending cosine distance.
    /// Equal distances are ordered by id so results are deterministic.
    pub fn knn(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }

        let query_norm = l2_norm(query);
        if query_norm < f32::EPSILON {
            return Err(IndexError::ZeroNormVector);
        }

        let mut results: Vec<Neighbor> = self
            .entries
            .iter()
            .map(|(id, embedding)| Neighbor {
                id: id.clone(),
                distance: cosine_distance(query, embedding, query_norm),
            })
            .collect();

        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(k);

        Ok(results)
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine distance between query and target, with the query norm precomputed.
/// A zero-norm target counts as maximally distant.
fn cosine_distance(query: &[f32], target: &[f32], query_norm: f32) -> f32 {
    let target_norm = l2_norm(target);
    if target_norm < f32::EPSILON {
        return 1.0;
    }

    let dot_product: f32 = query.iter().zip(target.iter()).map(|(a, b)| a * b).sum();
    1.0 - dot_product / (query_norm * target_norm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_index() {
        let index = VectorIndex::new(384);
        assert_eq!(index.dimensions(), 384);
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn test_upsert_and_get() {
        let mut index = VectorIndex::new(3);
        let embedding = vec![1.0, 0.0, 0.0];

        index.upsert("paper.pdf".to_string(), embedding.clone()).unwrap();

        assert_eq!(index.len(), 1);
        assert!(index.contains("paper.pdf"));
        assert_eq!(index.get("paper.pdf").unwrap(), &embedding);
    }

    #[test]
    fn test_upsert_overwrites_same_id() {
        let mut index = VectorIndex::new(3);

        index.upsert("paper.pdf".to_string(), vec![1.0, 0.0, 0.0]).unwrap();
        index.upsert("paper.pdf".to_string(), vec![0.0, 1.0, 0.0]).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.get("paper.pdf").unwrap(), &vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_upsert_dimension_mismatch() {
        let mut index = VectorIndex::new(3);
        let wrong_dims = vec![1.0, 0.0, 0.0, 0.0];

        let result = index.upsert("x".to_string(), wrong_dims);
        assert!(matches!(result, Err(IndexError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_upsert_zero_norm_rejected() {
        let mut index = VectorIndex::new(3);

        let result = index.upsert("x".to_string(), vec![0.0, 0.0, 0.0]);
        assert!(matches!(result, Err(IndexError::ZeroNormVector)));
    }

    #[test]
    fn test_knn_orders_by_ascending_distance() {
        let mut index = VectorIndex::new(3);

        index.upsert("near".to_string(), vec![1.0, 0.1, 0.0]).unwrap();
        index.upsert("far".to_string(), vec![0.0, 1.0, 0.0]).unwrap();

        let results = index.knn(&[1.0, 0.0, 0.0], 10).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "near");
        assert!(results[0].distance < results[1].distance);
    }

    #[test]
    fn test_knn_exact_match_distance_near_zero() {
        let mut index = VectorIndex::new(3);
        index.upsert("exact".to_string(), vec![0.0, 1.0, 0.0]).unwrap();

        let results = index.knn(&[0.0, 1.0, 0.0], 1).unwrap();
        assert!(results[0].distance.abs() < 1e-6);
    }

    #[test]
    fn test_knn_truncates_to_k() {
        let mut index = VectorIndex::new(3);

        for i in 0..10 {
            index
                .upsert(format!("item-{}", i), vec![1.0, i as f32 * 0.1, 0.0])
                .unwrap();
        }

        let results = index.knn(&[1.0, 0.0, 0.0], 3).unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_knn_on_empty_index() {
        let index = VectorIndex::new(3);
        let results = index.knn(&[1.0, 0.0, 0.0], 3).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_knn_tie_breaks_by_id() {
        let mut index = VectorIndex::new(3);

        // Two identical vectors, equal distance to any query
        index.upsert("b.pdf".to_string(), vec![1.0, 0.0, 0.0]).unwrap();
        index.upsert("a.pdf".to_string(), vec![1.0, 0.0, 0.0]).unwrap();

        let results = index.knn(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results[0].id, "a.pdf");
        assert_eq!(results[1].id, "b.pdf");
    }

    #[test]
    fn test_knn_query_dimension_mismatch() {
        let index = VectorIndex::new(3);
        let result = index.knn(&[1.0, 0.0], 3);
        assert!(matches!(result, Err(IndexError::DimensionMismatch { .. })));
    }
}
