//! Combined word embeddings: lexical row followed by the mean phoneme row.

use crate::embedding::TrainedModel;
use crate::error::{PhonembedError, Result};

/// Composes one fixed-length vector from a word and its phonemes.
///
/// The output is `word_row ‖ mean(phoneme_rows)`, `2 * dim` long whatever
/// the number of phonemes. Tokens missing from either vocabulary use that
/// model's unknown row.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddingComposer;

impl EmbeddingComposer {
    /// Builds the combined embedding for `word`.
    pub fn combine<S: AsRef<str>>(
        word: &str,
        phonemes: &[S],
        word_model: &TrainedModel,
        phoneme_model: &TrainedModel,
    ) -> Result<Vec<f32>> {
        if phonemes.is_empty() {
            return Err(PhonembedError::EmptyPhonemeSequence {
                word: word.to_string(),
            });
        }

        let dim = word_model.dim();
        if phoneme_model.dim() != dim {
            return Err(PhonembedError::DimensionMismatch {
                model: phoneme_model.key().to_string(),
                expected: dim,
                found: phoneme_model.dim(),
            });
        }

        let vocab = phoneme_model.vocabulary();
        let ids: Vec<usize> = phonemes
            .iter()
            .map(|p| vocab.id_or_unknown(p.as_ref()))
            .collect();

        let mut combined = Vec::with_capacity(2 * dim);
        combined.extend_from_slice(word_model.embedding(word));
        match phoneme_model.matrix().mean_of(&ids) {
            Some(mean) => combined.extend(mean),
            None => {
                return Err(PhonembedError::EmptyPhonemeSequence {
                    word: word.to_string(),
                })
            }
        }

        Ok(combined)
    }

    /// Splits a combined vector back into its word and phoneme halves.
    pub fn split(combined: &[f32]) -> (&[f32], &[f32]) {
        combined.split_at(combined.len() / 2)
    }
}
