//! Cross-language word comparison over combined embeddings.
//!
//! A [`WordComparator`] holds the phoneme and word models of one or more
//! languages. Each word is mapped to `word_row ‖ mean(phoneme_rows)` and two
//! words are compared with cosine similarity and Euclidean distance over the
//! full combined vectors.

mod transcriber;

pub use transcriber::{LexiconTranscriber, Transcriber};

use crate::embedding::{EmbeddingComposer, ModelKind, TrainedModel};
use crate::error::{PhonembedError, Result};
use crate::similarity::{cosine_similarity, euclidean_distance};
use crate::storage::ModelStore;
use crate::text::Normalizer;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// The phoneme and word models of one language, with the normalizer they
/// were trained under.
#[derive(Debug, Clone)]
pub struct LanguageModels {
    phoneme: Arc<TrainedModel>,
    word: Arc<TrainedModel>,
    normalizer: Normalizer,
}

impl LanguageModels {
    /// Pairs two models, checking kinds, language, dimension and
    /// normalization.
    pub fn new(phoneme: TrainedModel, word: TrainedModel) -> Result<Self> {
        Self::from_shared(Arc::new(phoneme), Arc::new(word))
    }

    /// Pairs two shared models.
    pub fn from_shared(phoneme: Arc<TrainedModel>, word: Arc<TrainedModel>) -> Result<Self> {
        let (p, w) = (phoneme.key(), word.key());
        if p.kind != ModelKind::Phoneme || w.kind != ModelKind::Word {
            return Err(PhonembedError::Config(format!(
                "expected a phoneme and a word model, got {} and {}",
                p, w
            )));
        }
        if p.language != w.language {
            return Err(PhonembedError::Config(format!(
                "models belong to different languages: {} and {}",
                p, w
            )));
        }
        if phoneme.dim() != word.dim() {
            return Err(PhonembedError::DimensionMismatch {
                model: p.to_string(),
                expected: word.dim(),
                found: phoneme.dim(),
            });
        }
        if phoneme.metadata().text != word.metadata().text {
            return Err(PhonembedError::Config(format!(
                "{} and {} were trained with different text normalization",
                p, w
            )));
        }

        let normalizer = Normalizer::new(word.metadata().text.clone());
        Ok(Self {
            phoneme,
            word,
            normalizer,
        })
    }

    /// Loads both models of `language` from a store.
    pub fn load(store: &ModelStore, language: &str) -> Result<Self> {
        let phoneme = store.load(language, ModelKind::Phoneme)?;
        let word = store.load(language, ModelKind::Word)?;
        Self::new(phoneme, word)
    }

    /// Language code.
    pub fn language(&self) -> &str {
        &self.word.metadata().language
    }

    /// Shared embedding dimension.
    pub fn dim(&self) -> usize {
        self.word.dim()
    }

    /// The phoneme model.
    pub fn phoneme(&self) -> &TrainedModel {
        &self.phoneme
    }

    /// The word model.
    pub fn word(&self) -> &TrainedModel {
        &self.word
    }

    /// Normalizer matching the one applied to the training corpora.
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Combined embedding of `word` with the given phonemes.
    pub fn combine<S: AsRef<str>>(&self, word: &str, phonemes: &[S]) -> Result<Vec<f32>> {
        EmbeddingComposer::combine(word, phonemes, &self.word, &self.phoneme)
    }
}

/// A word with its language and phonemes, ready for comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordQuery {
    /// Surface form.
    pub word: String,
    /// Language code.
    pub language: String,
    /// Phoneme sequence.
    pub phonemes: Vec<String>,
}

impl WordQuery {
    /// Creates a new query.
    pub fn new<S: AsRef<str>>(word: &str, language: &str, phonemes: &[S]) -> Self {
        Self {
            word: word.to_string(),
            language: language.to_string(),
            phonemes: phonemes.iter().map(|p| p.as_ref().to_string()).collect(),
        }
    }
}

/// Result of comparing two words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// First word.
    pub word1: String,
    /// Language of the first word.
    pub language1: String,
    /// Second word.
    pub word2: String,
    /// Language of the second word.
    pub language2: String,
    /// Cosine similarity in `[-1, 1]`; 0 when either vector is zero.
    pub cosine_similarity: f32,
    /// Euclidean distance, never negative.
    pub euclidean_distance: f32,
    /// Phonemes used for the first word.
    pub phonemes1: Vec<String>,
    /// Phonemes used for the second word.
    pub phonemes2: Vec<String>,
}

/// Compares words across the loaded languages.
///
/// Construction is all-or-nothing and the models are never modified
/// afterwards, so a comparator can be shared freely between threads.
#[derive(Clone)]
pub struct WordComparator {
    models: HashMap<String, LanguageModels>,
    languages: Vec<String>,
    dim: usize,
    transcriber: Option<Arc<dyn Transcriber>>,
}

impl std::fmt::Debug for WordComparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordComparator")
            .field("languages", &self.languages)
            .field("dim", &self.dim)
            .field("transcriber", &self.transcriber.is_some())
            .finish()
    }
}

impl WordComparator {
    /// Loads both models for every language from a store.
    ///
    /// The first language is the primary one used by
    /// [`WordComparator::get_combined_embedding`].
    pub fn load<S: AsRef<str>>(store: &ModelStore, languages: &[S]) -> Result<Self> {
        if languages.is_empty() {
            return Err(PhonembedError::Config("no languages requested".to_string()));
        }

        let mut loaded: Vec<LanguageModels> = Vec::with_capacity(languages.len());
        for language in languages {
            let pair = LanguageModels::load(store, language.as_ref())?;
            if let Some(first) = loaded.first() {
                if pair.dim() != first.dim() {
                    return Err(PhonembedError::DimensionMismatch {
                        model: pair.word().key().to_string(),
                        expected: first.dim(),
                        found: pair.dim(),
                    });
                }
            }
            loaded.push(pair);
        }
        let comparator = Self::from_models(loaded)?;
        info!(
            "Comparator ready for {} (dim {})",
            comparator.languages.join(", "),
            comparator.dim
        );
        Ok(comparator)
    }

    /// Builds a comparator from models already in memory.
    pub fn from_models(models: Vec<LanguageModels>) -> Result<Self> {
        let first = models
            .first()
            .ok_or_else(|| PhonembedError::Config("no languages requested".to_string()))?;
        let dim = first.dim();

        let mut languages = Vec::with_capacity(models.len());
        let mut by_language = HashMap::with_capacity(models.len());
        for pair in models {
            if pair.dim() != dim {
                return Err(PhonembedError::DimensionMismatch {
                    model: pair.word().key().to_string(),
                    expected: dim,
                    found: pair.dim(),
                });
            }
            let language = pair.language().to_string();
            if by_language.contains_key(&language) {
                return Err(PhonembedError::Config(format!("language '{}' given twice", language)));
            }
            languages.push(language.clone());
            by_language.insert(language, pair);
        }

        Ok(Self {
            models: by_language,
            languages,
            dim,
            transcriber: None,
        })
    }

    /// Sets the transcriber used by [`WordComparator::compare_words`].
    pub fn with_transcriber<T: Transcriber + 'static>(mut self, transcriber: T) -> Self {
        self.transcriber = Some(Arc::new(transcriber));
        self
    }

    /// Sets a shared transcriber.
    pub fn with_shared_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    /// Loaded languages, primary first.
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// The primary language.
    pub fn primary_language(&self) -> &str {
        &self.languages[0]
    }

    /// Shared embedding dimension (combined vectors are twice as long).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Models of a loaded language.
    pub fn models(&self, language: &str) -> Option<&LanguageModels> {
        self.models.get(language)
    }

    /// Compares two words, transcribing both first.
    ///
    /// Both languages are checked before the transcriber is consulted.
    pub fn compare_words(&self, word1: &str, lang1: &str, word2: &str, lang2: &str) -> Result<ComparisonResult> {
        self.language_models(lang1)?;
        self.language_models(lang2)?;

        let transcriber = self
            .transcriber
            .as_ref()
            .ok_or_else(|| PhonembedError::Config("no transcriber configured".to_string()))?;
        let phonemes1 = transcriber.transcribe(word1, lang1)?;
        let phonemes2 = transcriber.transcribe(word2, lang2)?;

        self.compare_transcribed(
            &WordQuery {
                word: word1.to_string(),
                language: lang1.to_string(),
                phonemes: phonemes1,
            },
            &WordQuery {
                word: word2.to_string(),
                language: lang2.to_string(),
                phonemes: phonemes2,
            },
        )
    }

    /// Compares two words whose phonemes are already known.
    pub fn compare_transcribed(&self, first: &WordQuery, second: &WordQuery) -> Result<ComparisonResult> {
        let models1 = self.language_models(&first.language)?;
        let models2 = self.language_models(&second.language)?;

        let e1 = Self::embed_with(models1, &first.word, &first.phonemes)?;
        let e2 = Self::embed_with(models2, &second.word, &second.phonemes)?;

        Ok(ComparisonResult {
            word1: first.word.clone(),
            language1: first.language.clone(),
            word2: second.word.clone(),
            language2: second.language.clone(),
            cosine_similarity: cosine_similarity(&e1, &e2),
            euclidean_distance: euclidean_distance(&e1, &e2),
            phonemes1: first.phonemes.clone(),
            phonemes2: second.phonemes.clone(),
        })
    }

    /// Combined embedding of a word in the primary language.
    pub fn get_combined_embedding<S: AsRef<str>>(&self, word: &str, phonemes: &[S]) -> Result<Vec<f32>> {
        self.combined_embedding(word, self.primary_language(), phonemes)
    }

    /// Combined embedding of a word in any loaded language.
    pub fn combined_embedding<S: AsRef<str>>(&self, word: &str, language: &str, phonemes: &[S]) -> Result<Vec<f32>> {
        let models = self.language_models(language)?;
        Self::embed_with(models, word, phonemes)
    }

    fn language_models(&self, language: &str) -> Result<&LanguageModels> {
        self.models
            .get(language)
            .ok_or_else(|| PhonembedError::LanguageNotLoaded {
                language: language.to_string(),
            })
    }

    fn embed_with<S: AsRef<str>>(models: &LanguageModels, word: &str, phonemes: &[S]) -> Result<Vec<f32>> {
        if phonemes.is_empty() {
            return Err(PhonembedError::EmptyPhonemeSequence {
                word: word.to_string(),
            });
        }
        let normalizer = models.normalizer();
        let lookup = normalizer.normalize_word(word).unwrap_or_else(|| word.to_string());
        let phonemes: Vec<String> = phonemes
            .iter()
            .map(|p| {
                let p = p.as_ref();
                normalizer.normalize_phoneme(p).unwrap_or_else(|| p.to_string())
            })
            .collect();

        models.combine(&lookup, &phonemes)
    }
}
