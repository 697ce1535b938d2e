//! End-to-end training of a language's phoneme and word models.

use crate::cbow::CbowTrainer;
use crate::comparator::LanguageModels;
use crate::config::TrainingConfig;
use crate::embedding::{ModelKey, ModelKind, ModelMetadata, TrainedModel};
use crate::error::{PhonembedError, Result};
use crate::storage::ModelStore;
use crate::text::{Corpus, Vocabulary};
use indicatif::ProgressBar;
use log::{info, warn};
use std::fs;

/// Builds the vocabulary and trains one model.
pub fn train_model(
    language: &str,
    kind: ModelKind,
    corpus: &Corpus,
    config: &TrainingConfig,
    progress: Option<&ProgressBar>,
) -> Result<TrainedModel> {
    let label = ModelKey::new(language, kind).to_string();

    let vocabulary = Vocabulary::build(corpus.sequences(), config.min_count).map_err(|e| match e {
        PhonembedError::EmptyVocabulary { .. } => PhonembedError::EmptyVocabulary { model: label.clone() },
        other => other,
    })?;
    info!(
        "{}: {} sequences, {} tokens, vocabulary {}",
        label,
        corpus.len(),
        corpus.token_count(),
        vocabulary.known_len()
    );

    let trainer = CbowTrainer::new(config.clone())?.with_label(label);
    let (matrix, report) = trainer.train_with_progress(corpus, &vocabulary, progress)?;

    let metadata = ModelMetadata {
        language: language.to_string(),
        kind,
        embedding_dim: config.embedding_dim,
        window_size: config.window_size,
        min_count: config.min_count,
        epochs: config.epochs,
        seed: report.seed,
        examples: report.examples,
        final_loss: report.final_loss(),
        text: corpus.text_config().clone(),
    };

    TrainedModel::new(metadata, vocabulary, matrix)
}

/// Trains the phoneme model, then the word model, and saves both.
///
/// Both corpora must have been normalized with the same [`TextConfig`], which
/// is stored with the models. Nothing is saved unless both models train
/// successfully, and a failure to save the word model removes the phoneme
/// model written just before it.
///
/// [`TextConfig`]: crate::config::TextConfig
pub fn train_language(
    store: &ModelStore,
    language: &str,
    phoneme_corpus: &Corpus,
    word_corpus: &Corpus,
    config: &TrainingConfig,
) -> Result<LanguageModels> {
    train_language_with_progress(store, language, phoneme_corpus, word_corpus, config, None)
}

/// [`train_language`] reporting steps to a progress bar.
pub fn train_language_with_progress(
    store: &ModelStore,
    language: &str,
    phoneme_corpus: &Corpus,
    word_corpus: &Corpus,
    config: &TrainingConfig,
    progress: Option<&ProgressBar>,
) -> Result<LanguageModels> {
    if phoneme_corpus.text_config() != word_corpus.text_config() {
        return Err(PhonembedError::Config(format!(
            "{}: phoneme and word corpora were normalized differently",
            language
        )));
    }

    let phoneme = train_model(language, ModelKind::Phoneme, phoneme_corpus, config, progress)?;
    let word = train_model(language, ModelKind::Word, word_corpus, config, progress)?;
    let models = LanguageModels::new(phoneme, word)?;

    let phoneme_path = store.save(models.phoneme())?;
    if let Err(e) = store.save(models.word()) {
        if let Err(cleanup) = fs::remove_file(&phoneme_path) {
            warn!("Could not remove {}: {}", phoneme_path.display(), cleanup);
        }
        return Err(e);
    }

    Ok(models)
}
