//! Error types for phonembed.

use crate::embedding::ModelKind;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for phonembed operations.
#[derive(Error, Debug)]
pub enum PhonembedError {
    /// No token in the corpus reached the minimum count.
    #[error("Empty vocabulary for {model}: no token reached min_count")]
    EmptyVocabulary {
        /// Label of the model being built (e.g. `en/word`).
        model: String,
    },

    /// The corpus produced no training example with a non-empty context.
    #[error("Empty corpus for {model}: no valid training examples")]
    EmptyCorpus {
        /// Label of the model being trained.
        model: String,
    },

    /// The training loss became NaN or infinite.
    #[error("Training diverged for {model} at epoch {epoch}, step {step} (loss = {loss})")]
    TrainingDiverged {
        /// Label of the model being trained.
        model: String,
        /// Epoch index (0-based).
        epoch: usize,
        /// Global step index (0-based).
        step: usize,
        /// Offending batch loss.
        loss: f32,
    },

    /// No model artifact exists for the requested pair.
    #[error("Model not found: {language}/{kind}")]
    ModelNotFound {
        /// Language code.
        language: String,
        /// Model kind.
        kind: ModelKind,
    },

    /// A model artifact exists but could not be decoded.
    #[error("Corrupt model file {path} ({language}/{kind}): {reason}")]
    ModelCorrupt {
        /// Path of the artifact.
        path: PathBuf,
        /// Language the artifact was expected to hold.
        language: String,
        /// Model kind the artifact was expected to hold.
        kind: ModelKind,
        /// What was wrong with it.
        reason: String,
    },

    /// The comparator was not constructed with this language.
    #[error("Language not loaded: {language}")]
    LanguageNotLoaded {
        /// Requested language code.
        language: String,
    },

    /// `combine` was called without phonemes.
    #[error("Empty phoneme sequence for word '{word}'")]
    EmptyPhonemeSequence {
        /// The word being composed.
        word: String,
    },

    /// Two models that must agree on the embedding width do not.
    #[error("Dimension mismatch for {model}: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Label of the offending model.
        model: String,
        /// Expected embedding dimension.
        expected: usize,
        /// Actual embedding dimension.
        found: usize,
    },

    /// The transcriber has no pronunciation for a word.
    #[error("No transcription for '{word}' ({language})")]
    WordNotTranscribed {
        /// The word.
        word: String,
        /// Its language.
        language: String,
    },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for phonembed operations.
pub type Result<T> = std::result::Result<T, PhonembedError>;

impl From<bincode::Error> for PhonembedError {
    fn from(err: bincode::Error) -> Self {
        PhonembedError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for PhonembedError {
    fn from(err: serde_json::Error) -> Self {
        PhonembedError::Serialization(err.to_string())
    }
}
