//! Configuration for phonembed training, storage and text handling.

use crate::error::{PhonembedError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// CBOW hyperparameters.
    pub training: TrainingConfig,

    /// Model storage configuration.
    pub storage: StorageConfig,

    /// Token normalization configuration.
    pub text: TextConfig,
}

impl Config {
    /// Reads a configuration from a JSON file.
    ///
    /// Missing sections and fields fall back to their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.training.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)?;
        Ok(())
    }
}

/// Loss used to fit the output table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingObjective {
    /// Full softmax over the vocabulary.
    Softmax,
    /// Sigmoid loss against the target plus `negatives` sampled tokens.
    NegativeSampling {
        /// Number of negative tokens drawn per example.
        negatives: usize,
    },
}

impl Default for TrainingObjective {
    fn default() -> Self {
        TrainingObjective::Softmax
    }
}

/// CBOW training hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Width of every embedding row.
    /// Default: 100.
    pub embedding_dim: usize,

    /// Context radius: tokens taken on each side of the center.
    /// Default: 2.
    pub window_size: usize,

    /// Minimum corpus frequency for a token to enter the vocabulary.
    /// Default: 1.
    pub min_count: usize,

    /// Number of passes over the corpus.
    /// Default: 10.
    pub epochs: usize,

    /// Examples per gradient update.
    /// Default: 128.
    pub batch_size: usize,

    /// Constant gradient step size.
    /// Default: 0.05.
    pub learning_rate: f32,

    /// Random seed for initialization, shuffling and sampling.
    /// `None` draws one from the OS and logs it.
    /// Default: Some(42).
    pub seed: Option<u64>,

    /// Training objective.
    /// Default: softmax.
    pub objective: TrainingObjective,

    /// Number of worker threads for gradient computation.
    /// Default: 0 (rayon's global pool).
    pub num_threads: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            embedding_dim: 100,
            window_size: 2,
            min_count: 1,
            epochs: 10,
            batch_size: 128,
            learning_rate: 0.05,
            seed: Some(42),
            objective: TrainingObjective::Softmax,
            num_threads: 0,
        }
    }
}

impl TrainingConfig {
    /// Checks that every hyperparameter is usable.
    pub fn validate(&self) -> Result<()> {
        if self.embedding_dim == 0 {
            return Err(PhonembedError::Config("embedding_dim must be > 0".to_string()));
        }
        if self.window_size == 0 {
            return Err(PhonembedError::Config("window_size must be > 0".to_string()));
        }
        if self.epochs == 0 {
            return Err(PhonembedError::Config("epochs must be > 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(PhonembedError::Config("batch_size must be > 0".to_string()));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(PhonembedError::Config(format!(
                "learning_rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        if let TrainingObjective::NegativeSampling { negatives: 0 } = self.objective {
            return Err(PhonembedError::Config("negatives must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Model storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory holding one sub-directory per language.
    /// Default: "data".
    pub data_dir: PathBuf,

    /// Memory-map model files when loading.
    /// Default: true.
    pub use_mmap: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            use_mmap: true,
        }
    }
}

/// Token normalization configuration.
///
/// Stored with every trained model so lookups normalize the way training did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Lowercase word tokens.
    /// Default: true.
    pub lowercase_words: bool,

    /// Strip ASCII punctuation from word tokens.
    /// Default: true.
    pub remove_punctuation: bool,

    /// Apply Unicode NFC composition to every token.
    /// Default: true.
    pub unicode_normalize: bool,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            lowercase_words: true,
            remove_punctuation: true,
            unicode_normalize: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.training.embedding_dim, 100);
        assert_eq!(config.training.window_size, 2);
        assert_eq!(config.training.objective, TrainingObjective::Softmax);
        assert!(config.training.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = TrainingConfig::default();
        config.batch_size = 0;
        assert!(matches!(config.validate(), Err(PhonembedError::Config(_))));

        let mut config = TrainingConfig::default();
        config.learning_rate = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = TrainingConfig::default();
        config.objective = TrainingObjective::NegativeSampling { negatives: 0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip_with_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"training": {"embedding_dim": 16, "epochs": 3}}"#).unwrap();

        let config = Config::from_json_file(&path).unwrap();
        assert_eq!(config.training.embedding_dim, 16);
        assert_eq!(config.training.epochs, 3);
        assert_eq!(config.training.window_size, 2);

        let out = dir.path().join("out.json");
        config.to_json_file(&out).unwrap();
        let again = Config::from_json_file(&out).unwrap();
        assert_eq!(again.training, config.training);
    }

    #[test]
    fn test_negative_sampling_json() {
        let raw = r#"{"objective": {"negative_sampling": {"negatives": 5}}}"#;
        let config: TrainingConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.objective, TrainingObjective::NegativeSampling { negatives: 5 });
    }
}
