//! # Phonembed - Phoneme-Aware Word Embeddings
//!
//! Phonembed learns dense embeddings for the phonemes and the words of a
//! language and combines them to compare words within and across languages.
//!
//! ## Overview
//!
//! Two CBOW models are trained per language: one over phoneme sequences
//! (one transcription per line) and one over word sequences (one sentence per
//! line). A word is then represented by its lexical row concatenated with the
//! mean of its phoneme rows, so two words with similar spelling contexts
//! or similar sound end up close to each other.
//!
//! ## Key Features
//!
//! - **CBOW training** with softmax or negative sampling, seeded and
//!   reproducible under parallel gradient computation
//! - **Compact binary format** (`.pemb`) loaded through memory maps
//! - **Model discovery** over a `<data_dir>/<language>/<kind>.pemb` layout
//! - **Cross-language comparison** by cosine similarity and Euclidean distance
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use phonembed::{LexiconTranscriber, ModelStore, WordComparator};
//!
//! let store = ModelStore::new("data");
//! let transcriber = LexiconTranscriber::load(&store, &["en", "pl"])?;
//! let comparator = WordComparator::load(&store, &["en", "pl"])?
//!     .with_transcriber(transcriber);
//!
//! let result = comparator.compare_words("cat", "en", "kot", "pl")?;
//! println!("{:.4}", result.cosine_similarity);
//! ```
//!
//! ## Training
//!
//! ```rust,ignore
//! use phonembed::{pipeline, Corpus, ModelStore, Normalizer, TrainingConfig};
//!
//! let normalizer = Normalizer::default();
//! let phonemes = Corpus::from_phoneme_lines(["h ə l oʊ", "k æ t"], &normalizer);
//! let words = Corpus::from_text_lines(["Hello there.", "The cat sat."], &normalizer);
//!
//! let store = ModelStore::new("data");
//! let models = pipeline::train_language(&store, "en", &phonemes, &words, &TrainingConfig::default())?;
//! ```
//!
//! ## Architecture
//!
//! - [`text`] - Normalization, corpora and vocabularies
//! - [`cbow`] - CBOW trainer
//! - [`embedding`] - Embedding matrices, trained models and the composer
//! - [`storage`] - Binary format and model store
//! - [`comparator`] - Word comparison and transcription
//! - [`similarity`] - Similarity measures
//! - [`pipeline`] - Per-language training and saving

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cbow;
pub mod comparator;
pub mod config;
pub mod embedding;
pub mod error;
pub mod pipeline;
pub mod similarity;
pub mod storage;
pub mod text;

// Re-export commonly used types
pub use cbow::{CbowTrainer, TrainingReport};
pub use comparator::{ComparisonResult, LanguageModels, LexiconTranscriber, Transcriber, WordComparator, WordQuery};
pub use config::{Config, StorageConfig, TextConfig, TrainingConfig, TrainingObjective};
pub use embedding::{EmbeddingComposer, EmbeddingMatrix, ModelKey, ModelKind, ModelMetadata, TrainedModel};
pub use error::{PhonembedError, Result};
pub use similarity::{cosine_similarity, euclidean_distance, CosineSimilarity, EuclideanDistance, SimilarityMeasure, SimilarityType};
pub use storage::{ModelFormat, ModelHeader, ModelStore};
pub use text::{Corpus, Normalizer, Vocabulary, UNKNOWN_TOKEN};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
