//! Negative sampling from the smoothed unigram distribution.

use crate::error::{PhonembedError, Result};
use crate::text::Vocabulary;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Exponent applied to token counts before sampling.
const UNIGRAM_POWER: f64 = 0.75;

/// Draws negative token ids with probability proportional to `count^0.75`.
///
/// The unknown id is never drawn.
#[derive(Debug, Clone)]
pub struct NegativeSampler {
    distribution: WeightedIndex<f64>,
    known: usize,
}

impl NegativeSampler {
    /// Builds a sampler from vocabulary counts.
    pub fn new(vocabulary: &Vocabulary) -> Result<Self> {
        let mut weights: Vec<f64> = vocabulary
            .counts()
            .iter()
            .map(|&c| (c as f64).powf(UNIGRAM_POWER))
            .collect();

        // Vocabularies restored without counts fall back to uniform sampling.
        if weights.iter().all(|&w| w == 0.0) {
            weights.iter_mut().for_each(|w| *w = 1.0);
        }

        let distribution = WeightedIndex::new(&weights)
            .map_err(|e| PhonembedError::Config(format!("cannot build negative sampler: {}", e)))?;

        Ok(Self {
            distribution,
            known: weights.len(),
        })
    }

    /// Draws `n` ids different from `target`.
    ///
    /// Gives up after a bounded number of rejections, so a vocabulary with a
    /// single token yields fewer than `n` negatives.
    pub fn sample<R: Rng>(&self, rng: &mut R, target: usize, n: usize) -> Vec<usize> {
        let mut out = Vec::with_capacity(n);
        let mut attempts = 0;
        let max_attempts = n * 10 + 10;

        while out.len() < n && attempts < max_attempts {
            attempts += 1;
            let id = self.distribution.sample(rng);
            if id != target {
                out.push(id);
            }
        }

        out
    }

    /// Number of ids the sampler draws from.
    pub fn support(&self) -> usize {
        self.known
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_never_samples_target_or_unknown() {
        let vocab = Vocabulary::from_parts(vec!["a".into(), "b".into(), "c".into()], vec![10, 5, 1]).unwrap();
        let sampler = NegativeSampler::new(&vocab).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..100 {
            let negatives = sampler.sample(&mut rng, 0, 4);
            assert_eq!(negatives.len(), 4);
            assert!(negatives.iter().all(|&id| id != 0 && id != vocab.unknown_id()));
        }
        assert_eq!(sampler.support(), 3);
    }

    #[test]
    fn test_single_token_vocabulary_gives_up() {
        let vocab = Vocabulary::from_parts(vec!["a".into()], vec![3]).unwrap();
        let sampler = NegativeSampler::new(&vocab).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(sampler.sample(&mut rng, 0, 5).is_empty());
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let vocab = Vocabulary::from_parts(vec!["a".into(), "b".into(), "c".into()], vec![4, 4, 4]).unwrap();
        let sampler = NegativeSampler::new(&vocab).unwrap();
        let a = sampler.sample(&mut ChaCha8Rng::seed_from_u64(3), 1, 8);
        let b = sampler.sample(&mut ChaCha8Rng::seed_from_u64(3), 1, 8);
        assert_eq!(a, b);
    }
}
