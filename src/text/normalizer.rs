//! Token normalization applied before vocabulary building and lookup.

use crate::config::TextConfig;
use unicode_normalization::UnicodeNormalization;

/// Token normalizer.
///
/// Phoneme tokens only get Unicode composition so that IPA diacritics compare
/// equal regardless of how they were typed. Word tokens are additionally
/// lowercased and stripped of punctuation.
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: TextConfig,
}

impl Normalizer {
    /// Creates a new normalizer with the given configuration.
    pub fn new(config: TextConfig) -> Self {
        Self { config }
    }

    /// Creates a normalizer with default configuration.
    pub fn default_config() -> Self {
        Self::new(TextConfig::default())
    }

    /// The configuration this normalizer applies.
    pub fn config(&self) -> &TextConfig {
        &self.config
    }

    /// Normalizes a phoneme token.
    ///
    /// Returns `None` if nothing is left after trimming.
    pub fn normalize_phoneme(&self, token: &str) -> Option<String> {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return None;
        }

        if self.config.unicode_normalize {
            Some(trimmed.nfc().collect())
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Normalizes a word token.
    ///
    /// Returns `None` if the token should be filtered out.
    pub fn normalize_word(&self, token: &str) -> Option<String> {
        let mut result: String = if self.config.unicode_normalize {
            token.trim().nfc().collect()
        } else {
            token.trim().to_string()
        };

        if self.config.lowercase_words {
            result = result.to_lowercase();
        }

        if self.config.remove_punctuation {
            result = result.chars().filter(|c| !c.is_ascii_punctuation()).collect();
        }

        if result.is_empty() {
            return None;
        }

        Some(result)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::default_config()
    }
}
