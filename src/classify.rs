//! Topic classification by embedding similarity.
//!
//! Embeds the document text once and every candidate topic label once,
//! then picks the topic with the highest cosine similarity.

use crate::embeddings::{EmbeddingError, TextEncoder};

/// Classify text into one of the candidate topics.
///
/// Returns the best-matching topic label. Ties break to the first
/// occurrence in the input order; the order is otherwise meaningless,
/// so nothing stronger than "deterministic for a fixed input order"
/// should be relied on. `topics` must be non-empty.
pub fn classify(
    encoder: &TextEncoder,
    text: &str,
    topics: &[String],
) -> Result<String, EmbeddingError> {
    debug_assert!(!topics.is_empty(), "classify called with no topics");

    let doc_vec = encoder.embed(text)?;
    let topic_vecs = encoder.embed_batch(topics)?;

    let best = best_topic_index(&doc_vec, &topic_vecs)
        .ok_or_else(|| EmbeddingError::EmbeddingFailed("No topic embeddings".to_string()))?;

    log::debug!("Classified into topic '{}'", topics[best]);
    Ok(topics[best].clone())
}

/// Index of the topic vector most similar to the document vector.
///
/// Argmax over cosine similarity; a strictly-greater comparison keeps
/// the first occurrence on ties.
pub fn best_topic_index(doc: &[f32], topic_vecs: &[Vec<f32>]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;

    for (i, topic) in topic_vecs.iter().enumerate() {
        let score = cosine_similarity(doc, topic);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((i, score)),
        }
    }

    best.map(|(i, _)| i)
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
