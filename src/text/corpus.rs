//! Token corpora for phoneme and word models.

use crate::config::TextConfig;
use crate::embedding::ModelKind;
use crate::error::Result;
use crate::text::Normalizer;
use log::warn;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;

/// An ordered collection of token sequences.
///
/// Phoneme corpora hold one transcription per sequence; word corpora hold one
/// sentence per sequence. Context windows never cross sequence boundaries.
/// The corpus remembers the normalization its tokens went through so the
/// trained model can apply the same policy at lookup time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    sequences: Vec<Vec<String>>,
    text: TextConfig,
}

impl Corpus {
    /// Wraps already tokenized sequences. Empty sequences are dropped.
    ///
    /// The tokens are assumed to follow the default [`TextConfig`]; use
    /// [`Corpus::with_text_config`] otherwise.
    pub fn new(sequences: Vec<Vec<String>>) -> Self {
        Self {
            sequences: sequences.into_iter().filter(|s| !s.is_empty()).collect(),
            text: TextConfig::default(),
        }
    }

    /// Records the normalization the tokens were produced with.
    pub fn with_text_config(mut self, text: TextConfig) -> Self {
        self.text = text;
        self
    }

    /// Builds a phoneme corpus: each line is whitespace-separated phonemes.
    pub fn from_phoneme_lines<I, S>(lines: I, normalizer: &Normalizer) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sequences = lines
            .into_iter()
            .map(|line| {
                line.as_ref()
                    .split_whitespace()
                    .filter_map(|t| normalizer.normalize_phoneme(t))
                    .collect()
            })
            .collect();
        Self::new(sequences).with_text_config(normalizer.config().clone())
    }

    /// Builds a word corpus: each line is a sentence split on Unicode word
    /// boundaries.
    pub fn from_text_lines<I, S>(lines: I, normalizer: &Normalizer) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sequences = lines
            .into_iter()
            .map(|line| {
                line.as_ref()
                    .unicode_words()
                    .filter_map(|w| normalizer.normalize_word(w))
                    .collect()
            })
            .collect();
        Self::new(sequences).with_text_config(normalizer.config().clone())
    }

    /// Reads a corpus file with one sequence per line.
    ///
    /// Lines that are not valid UTF-8 are skipped with a warning.
    pub fn from_file<P: AsRef<Path>>(path: P, kind: ModelKind, normalizer: &Normalizer) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);

        let mut lines = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            match line {
                Ok(line) => lines.push(line),
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    warn!("{}:{}: skipping unreadable line: {}", path.display(), number + 1, e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(match kind {
            ModelKind::Phoneme => Self::from_phoneme_lines(lines, normalizer),
            ModelKind::Word => Self::from_text_lines(lines, normalizer),
        })
    }

    /// The token sequences.
    pub fn sequences(&self) -> &[Vec<String>] {
        &self.sequences
    }

    /// Normalization applied to the tokens.
    pub fn text_config(&self) -> &TextConfig {
        &self.text
    }

    /// Number of sequences.
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// Checks if there are no sequences.
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Total number of tokens.
    pub fn token_count(&self) -> usize {
        self.sequences.iter().map(Vec::len).sum()
    }

    /// Creates `(center, context)` windows for every position.
    ///
    /// The context holds up to `half_window` tokens on each side of the
    /// center, truncated at sequence boundaries. Positions whose context is
    /// empty (single-token sequences) are skipped.
    pub fn context_windows(&self, half_window: usize) -> Vec<(&str, Vec<&str>)> {
        let mut result = Vec::with_capacity(self.token_count());

        for sequence in &self.sequences {
            for i in 0..sequence.len() {
                let start = i.saturating_sub(half_window);
                let end = (i + half_window + 1).min(sequence.len());

                let context: Vec<&str> = (start..end)
                    .filter(|&j| j != i)
                    .map(|j| sequence[j].as_str())
                    .collect();

                if !context.is_empty() {
                    result.push((sequence[i].as_str(), context));
                }
            }
        }

        result
    }
}

impl From<Vec<Vec<String>>> for Corpus {
    fn from(sequences: Vec<Vec<String>>) -> Self {
        Self::new(sequences)
    }
}
