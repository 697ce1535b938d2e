//! Euclidean distance for dense vectors.

use crate::similarity::SimilarityMeasure;

/// Euclidean (L2) distance.
///
/// As a similarity it is mapped to `1 / (1 + d)` so identical vectors score 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanDistance;

impl SimilarityMeasure for EuclideanDistance {
    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        1.0 / (1.0 + euclidean_distance(a, b))
    }

    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        euclidean_distance(a, b)
    }
}

/// L2 distance between two vectors.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt() as f32
}
