//! Directory-backed model store.
//!
//! Models live at `<data_dir>/<language>/<kind>.pemb`.

use crate::config::StorageConfig;
use crate::embedding::{ModelKey, ModelKind, TrainedModel};
use crate::error::{PhonembedError, Result};
use crate::storage::format::ModelFormat;
use log::{debug, info};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// File extension of model artifacts.
pub const MODEL_EXTENSION: &str = "pemb";

/// File name of a language's pronunciation lexicon.
pub const LEXICON_FILE: &str = "lexicon.tsv";

/// Saves and loads trained models under a data directory.
#[derive(Debug, Clone)]
pub struct ModelStore {
    data_dir: PathBuf,
    use_mmap: bool,
}

impl ModelStore {
    /// Creates a store rooted at `data_dir`. The directory is created lazily.
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            use_mmap: true,
        }
    }

    /// Creates a store from configuration.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            use_mmap: config.use_mmap,
        }
    }

    /// The root directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Where the artifact for `(language, kind)` lives.
    pub fn path_for(&self, language: &str, kind: ModelKind) -> PathBuf {
        self.data_dir
            .join(language)
            .join(format!("{}.{}", kind.as_str(), MODEL_EXTENSION))
    }

    /// Where the lexicon for `language` lives.
    pub fn lexicon_path(&self, language: &str) -> PathBuf {
        self.data_dir.join(language).join(LEXICON_FILE)
    }

    /// Checks whether an artifact exists.
    pub fn exists(&self, language: &str, kind: ModelKind) -> bool {
        self.path_for(language, kind).is_file()
    }

    /// Saves a model, replacing any previous artifact atomically.
    pub fn save(&self, model: &TrainedModel) -> Result<PathBuf> {
        let key = model.key();
        validate_language(&key.language)?;

        let path = self.path_for(&key.language, key.kind);
        ModelFormat::write(&path, model)?;
        info!(
            "Saved {} ({} tokens, dim {}) to {}",
            key,
            model.vocabulary().known_len(),
            model.dim(),
            path.display()
        );
        Ok(path)
    }

    /// Loads the model for `(language, kind)`.
    pub fn load(&self, language: &str, kind: ModelKind) -> Result<TrainedModel> {
        validate_language(language)?;

        let path = self.path_for(language, kind);
        if !path.is_file() {
            return Err(PhonembedError::ModelNotFound {
                language: language.to_string(),
                kind,
            });
        }

        let key = ModelKey::new(language, kind);
        let model = if self.use_mmap {
            ModelFormat::read_mmap(&path, &key)?
        } else {
            ModelFormat::read(&path, &key)?
        };

        info!(
            "Loaded {} ({} tokens, dim {})",
            key,
            model.vocabulary().known_len(),
            model.dim()
        );
        Ok(model)
    }

    /// Lists every stored `(language, kind)` pair.
    pub fn discover(&self) -> Result<BTreeSet<ModelKey>> {
        discover(&self.data_dir)
    }

    /// Languages for which both model kinds are stored.
    pub fn complete_languages(&self) -> Result<Vec<String>> {
        let keys = self.discover()?;
        let mut languages: Vec<String> = keys
            .iter()
            .filter(|k| k.kind == ModelKind::Phoneme)
            .filter(|k| keys.contains(&ModelKey::new(k.language.clone(), ModelKind::Word)))
            .map(|k| k.language.clone())
            .collect();
        languages.dedup();
        Ok(languages)
    }
}

/// Scans `data_dir` for model artifacts.
///
/// A missing directory holds no models.
pub fn discover<P: AsRef<Path>>(data_dir: P) -> Result<BTreeSet<ModelKey>> {
    let data_dir = data_dir.as_ref();
    let mut keys = BTreeSet::new();
    if !data_dir.is_dir() {
        return Ok(keys);
    }

    for entry in fs::read_dir(data_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let language = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(name) => {
                debug!("Skipping non UTF-8 directory {:?}", name);
                continue;
            }
        };

        for kind in ModelKind::ALL {
            let path = entry.path().join(format!("{}.{}", kind.as_str(), MODEL_EXTENSION));
            if path.is_file() {
                keys.insert(ModelKey::new(language.clone(), kind));
            }
        }
    }

    Ok(keys)
}

fn validate_language(language: &str) -> Result<()> {
    let invalid = language.is_empty()
        || language == "."
        || language == ".."
        || language.contains(['/', '\\'])
        || language.chars().any(char::is_control);
    if invalid {
        return Err(PhonembedError::Config(format!("invalid language code '{}'", language)));
    }
    Ok(())
}
