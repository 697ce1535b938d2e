//! Trained models and their identifiers.

use crate::config::TextConfig;
use crate::embedding::EmbeddingMatrix;
use crate::error::{PhonembedError, Result};
use crate::similarity::cosine_similarity;
use crate::text::Vocabulary;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which vocabulary a model was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Phoneme tokens (e.g. IPA units).
    Phoneme,
    /// Orthographic word tokens.
    Word,
}

impl ModelKind {
    /// Both kinds, in training order.
    pub const ALL: [ModelKind; 2] = [ModelKind::Phoneme, ModelKind::Word];

    /// Lowercase name, also used as the file stem on disk.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Phoneme => "phoneme",
            ModelKind::Word => "word",
        }
    }

    pub(crate) fn to_byte(self) -> u8 {
        match self {
            ModelKind::Phoneme => 0,
            ModelKind::Word => 1,
        }
    }

    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(ModelKind::Phoneme),
            1 => Some(ModelKind::Word),
            _ => None,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = PhonembedError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "phoneme" | "phonemes" => Ok(ModelKind::Phoneme),
            "word" | "words" => Ok(ModelKind::Word),
            other => Err(PhonembedError::Config(format!("unknown model kind '{}'", other))),
        }
    }
}

/// A `(language, kind)` pair addressing one model.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelKey {
    /// Language code, e.g. `en`.
    pub language: String,
    /// Model kind.
    pub kind: ModelKind,
}

impl ModelKey {
    /// Creates a new key.
    pub fn new(language: impl Into<String>, kind: ModelKind) -> Self {
        Self {
            language: language.into(),
            kind,
        }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.language, self.kind)
    }
}

/// Provenance stored alongside a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Language code.
    pub language: String,
    /// Model kind.
    pub kind: ModelKind,
    /// Row width.
    pub embedding_dim: usize,
    /// Context radius used in training.
    pub window_size: usize,
    /// Vocabulary frequency floor used in training.
    pub min_count: usize,
    /// Epochs trained.
    pub epochs: usize,
    /// Seed the run used.
    pub seed: u64,
    /// Training examples per epoch.
    pub examples: usize,
    /// Mean loss of the last epoch.
    pub final_loss: f32,
    /// Normalization applied to the training corpus, and therefore to lookups.
    pub text: TextConfig,
}

impl ModelMetadata {
    /// The key this metadata describes.
    pub fn key(&self) -> ModelKey {
        ModelKey::new(self.language.clone(), self.kind)
    }
}

/// A vocabulary together with its exported embedding rows.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    metadata: ModelMetadata,
    vocabulary: Vocabulary,
    matrix: EmbeddingMatrix,
}

impl TrainedModel {
    /// Pairs a vocabulary with a matrix, checking shapes.
    pub fn new(metadata: ModelMetadata, vocabulary: Vocabulary, matrix: EmbeddingMatrix) -> Result<Self> {
        let label = metadata.key().to_string();
        if matrix.rows() != vocabulary.len() {
            return Err(PhonembedError::Config(format!(
                "{}: matrix has {} rows but vocabulary has {} ids",
                label,
                matrix.rows(),
                vocabulary.len()
            )));
        }
        if matrix.dim() != metadata.embedding_dim {
            return Err(PhonembedError::DimensionMismatch {
                model: label,
                expected: metadata.embedding_dim,
                found: matrix.dim(),
            });
        }

        Ok(Self {
            metadata,
            vocabulary,
            matrix,
        })
    }

    /// Model provenance.
    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// The `(language, kind)` key.
    pub fn key(&self) -> ModelKey {
        self.metadata.key()
    }

    /// The vocabulary.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// The embedding matrix.
    pub fn matrix(&self) -> &EmbeddingMatrix {
        &self.matrix
    }

    /// Row width.
    pub fn dim(&self) -> usize {
        self.matrix.dim()
    }

    /// Row for a token, falling back to the unknown row.
    pub fn embedding(&self, token: &str) -> &[f32] {
        self.matrix.row(self.vocabulary.id_or_unknown(token))
    }

    /// The `k` known tokens closest to `token` by cosine similarity.
    ///
    /// Returns `None` if `token` is not in the vocabulary.
    pub fn most_similar(&self, token: &str, k: usize) -> Option<Vec<(String, f32)>> {
        let query_id = self.vocabulary.id(token)?;
        let query = self.matrix.row(query_id);

        let mut scored: Vec<(String, f32)> = self
            .vocabulary
            .iter()
            .filter(|(id, _)| *id != query_id)
            .map(|(id, t)| (t.to_string(), cosine_similarity(query, self.matrix.row(id))))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Some(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::metadata;

    fn small_model() -> TrainedModel {
        let vocab = Vocabulary::from_parts(
            vec!["cat".into(), "kitten".into(), "car".into()],
            vec![3, 2, 1],
        )
        .unwrap();
        let matrix = EmbeddingMatrix::from_rows(vec![
            vec![1.0, 0.1],
            vec![0.9, 0.2],
            vec![-1.0, 0.5],
            vec![0.0, 0.0],
        ])
        .unwrap();
        TrainedModel::new(metadata("en", ModelKind::Word, 2), vocab, matrix).unwrap()
    }

    #[test]
    fn test_kind_parse_and_display() {
        assert_eq!("phoneme".parse::<ModelKind>().unwrap(), ModelKind::Phoneme);
        assert_eq!("words".parse::<ModelKind>().unwrap(), ModelKind::Word);
        assert!("syllable".parse::<ModelKind>().is_err());
        assert_eq!(ModelKey::new("pl", ModelKind::Word).to_string(), "pl/word");
        for kind in ModelKind::ALL {
            assert_eq!(ModelKind::from_byte(kind.to_byte()), Some(kind));
        }
    }

    #[test]
    fn test_shape_checks() {
        let vocab = Vocabulary::from_parts(vec!["a".into()], vec![1]).unwrap();
        let short = EmbeddingMatrix::zeros(1, 2).unwrap();
        assert!(TrainedModel::new(metadata("en", ModelKind::Word, 2), vocab.clone(), short).is_err());

        let wide = EmbeddingMatrix::zeros(2, 3).unwrap();
        let err = TrainedModel::new(metadata("en", ModelKind::Word, 2), vocab, wide).unwrap_err();
        assert!(matches!(err, PhonembedError::DimensionMismatch { expected: 2, found: 3, .. }));
    }

    #[test]
    fn test_embedding_falls_back_to_unknown() {
        let model = small_model();
        assert_eq!(model.embedding("cat"), &[1.0, 0.1]);
        assert_eq!(model.embedding("dog"), &[0.0, 0.0]);
    }

    #[test]
    fn test_most_similar() {
        let model = small_model();
        let similar = model.most_similar("cat", 2).unwrap();
        assert_eq!(similar.len(), 2);
        assert_eq!(similar[0].0, "kitten");
        assert!(similar[0].1 > similar[1].1);
        assert!(model.most_similar("dog", 2).is_none());
    }
}
