//! Adaptive retrieval: k-NN lookup with a per-query relevance band.
//!
//! A global distance cutoff is meaningless across unrelated queries, so
//! the threshold is anchored to the observed best match instead:
//! `threshold = best + margin`. The margin is a fixed, per-collection
//! constant (the CLIP joint space runs on a wider distance scale than
//! the sentence-embedding space), not a statistically derived cutoff.

use crate::embeddings::EmbeddingError;
use crate::library::Library;
use crate::store::{ItemMeta, StoreError};

/// Errors that can occur during a search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One filtered search hit.
#[derive(Debug, Clone)]
pub struct Match {
    pub meta: ItemMeta,
    pub distance: f32,
}

/// What a search produced.
#[derive(Debug)]
pub enum SearchOutcome {
    /// The collection holds no items at all
    EmptyLibrary,
    /// Nothing passed the adaptive threshold. Unreachable in practice
    /// (the best match always passes); kept as a defensive fallback.
    NoMatch,
    /// Relevant hits in ascending-distance order
    Matches(Vec<Match>),
}

impl Library {
    /// Search the paper collection with a free-text query.
    pub fn search_papers(&self, query: &str) -> Result<SearchOutcome, SearchError> {
        if self.papers.is_empty() {
            return Ok(SearchOutcome::EmptyLibrary);
        }

        let query_vec = self.text_encoder.embed(query)?;
        let hits = self.papers.query(&query_vec, self.config.top_k)?;

        Ok(to_outcome(hits, self.config.paper_margin))
    }

    /// Search the image collection with a free-text query.
    ///
    /// The query goes through the CLIP text tower; the joint space aligns
    /// it with the stored image embeddings.
    pub fn search_images(&self, query: &str) -> Result<SearchOutcome, SearchError> {
        if self.images.is_empty() {
            return Ok(SearchOutcome::EmptyLibrary);
        }

        let query_vec = self.joint_encoder.embed_text(query)?;
        let hits = self.images.query(&query_vec, self.config.top_k)?;

        Ok(to_outcome(hits, self.config.image_margin))
    }
}

fn to_outcome(hits: Vec<(ItemMeta, f32)>, margin: f32) -> SearchOutcome {
    if hits.is_empty() {
        return SearchOutcome::EmptyLibrary;
    }

    let matches = adaptive_filter(hits, margin);
    if matches.is_empty() {
        return SearchOutcome::NoMatch;
    }

    SearchOutcome::Matches(matches)
}

/// Keep every hit within `margin` of the best (lowest) distance.
///
/// Expects `hits` in ascending-distance order. The first hit defines the
/// threshold and therefore always passes.
pub fn adaptive_filter(hits: Vec<(ItemMeta, f32)>, margin: f32) -> Vec<Match> {
    let Some(best) = hits.first().map(|(_, distance)| *distance) else {
        return Vec::new();
    };
    let threshold = best + margin;

    hits.into_iter()
        .take_while(|(_, distance)| *distance <= threshold)
        .map(|(meta, distance)| Match { meta, distance })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(filename: &str) -> ItemMeta {
        ItemMeta {
            filename: filename.to_string(),
            path: format!("/lib/{}", filename),
            preview: None,
        }
    }

    #[test]
    fn test_best_match_always_passes() {
        // Even with a zero margin the first hit defines the threshold
        let hits = vec![(meta("only.pdf"), 0.93)];
        let matches = adaptive_filter(hits, 0.0);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].meta.filename, "only.pdf");
    }

    #[test]
    fn test_drops_hits_past_the_margin() {
        let hits = vec![
            (meta("a.pdf"), 0.10),
            (meta("b.pdf"), 0.20),
            (meta("c.pdf"), 0.40),
        ];

        let matches = adaptive_filter(hits, 0.15);

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].meta.filename, "a.pdf");
        assert_eq!(matches[1].meta.filename, "b.pdf");
    }

    #[test]
    fn test_containment_no_hit_past_best_plus_margin() {
        let margin = 0.15;
        let hits = vec![
            (meta("a.pdf"), 0.30),
            (meta("b.pdf"), 0.44),
            (meta("c.pdf"), 0.46),
        ];

        let best = hits[0].1;
        let matches = adaptive_filter(hits, margin);

        assert!(matches.iter().all(|m| m.distance <= best + margin));
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_boundary_distance_is_kept() {
        let hits = vec![(meta("a.pdf"), 0.10), (meta("b.pdf"), 0.25)];

        // 0.25 == 0.10 + 0.15, inclusive threshold
        let matches = adaptive_filter(hits, 0.15);
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_preserves_ascending_order() {
        let hits = vec![
            (meta("a.pdf"), 0.10),
            (meta("b.pdf"), 0.12),
            (meta("c.pdf"), 0.14),
        ];

        let matches = adaptive_filter(hits, 1.0);
        let distances: Vec<f32> = matches.iter().map(|m| m.distance).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_empty_hits_yield_no_matches() {
        assert!(adaptive_filter(Vec::new(), 0.15).is_empty());
    }

    #[test]
    fn test_wide_margin_keeps_everything() {
        let hits = vec![
            (meta("a.png"), 0.60),
            (meta("b.png"), 0.75),
            (meta("c.png"), 0.95),
        ];

        let matches = adaptive_filter(hits, 0.40);
        assert_eq!(matches.len(), 3);
    }
}
