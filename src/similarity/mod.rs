//! Similarity measures for comparing dense embeddings.

mod cosine;
mod euclidean;

pub use cosine::{cosine_similarity, CosineSimilarity};
pub use euclidean::{euclidean_distance, EuclideanDistance};

/// Trait for similarity measures between dense vectors of equal length.
pub trait SimilarityMeasure {
    /// Computes the similarity between two vectors (higher is closer).
    fn similarity(&self, a: &[f32], b: &[f32]) -> f32;

    /// Computes the distance between two vectors.
    ///
    /// Default implementation: 1.0 - similarity.
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        1.0 - self.similarity(a, b)
    }
}

/// Enum for the available measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityType {
    /// Cosine similarity.
    Cosine,
    /// Euclidean distance mapped to `1 / (1 + d)`.
    Euclidean,
}

impl SimilarityType {
    /// Computes similarity using this measure.
    pub fn compute(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            SimilarityType::Cosine => CosineSimilarity.similarity(a, b),
            SimilarityType::Euclidean => EuclideanDistance.similarity(a, b),
        }
    }
}

/// Dot product accumulated in `f64`.
#[inline]
pub(crate) fn dot(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum()
}

/// Euclidean norm accumulated in `f64`.
#[inline]
pub(crate) fn norm(a: &[f32]) -> f64 {
    dot(a, a).sqrt()
}
