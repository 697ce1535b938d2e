//! Cosine similarity for dense vectors.

use crate::similarity::{dot, norm, SimilarityMeasure};

/// Cosine similarity measure.
///
/// dot(a, b) / (|a| * |b|), defined as 0 when either norm is 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineSimilarity;

impl SimilarityMeasure for CosineSimilarity {
    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        cosine_similarity(a, b)
    }
}

/// Cosine similarity of two vectors, 0 if either is all zeros.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let denom = norm(a) * norm(b);
    if denom == 0.0 {
        return 0.0;
    }
    (dot(a, b) / denom).clamp(-1.0, 1.0) as f32
}
