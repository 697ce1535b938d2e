//! Word-to-phoneme transcription.

use crate::error::{PhonembedError, Result};
use crate::storage::ModelStore;
use crate::text::{Corpus, Normalizer};
use log::{info, warn};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;

/// Produces the phoneme sequence of a word in a given language.
pub trait Transcriber: Send + Sync {
    /// Transcribes `word`, failing with [`PhonembedError::WordNotTranscribed`]
    /// when no pronunciation is known.
    fn transcribe(&self, word: &str, language: &str) -> Result<Vec<String>>;
}

/// Stress marks dropped from unsegmented transcriptions.
const STRESS_MARKS: [char; 2] = ['ˈ', 'ˌ'];

/// Pronunciation lexicons loaded from TSV files.
///
/// Each line is `word<TAB>transcription`. Alternative transcriptions are
/// separated by `,` and only the first is kept. A transcription with spaces
/// is split on whitespace; an unsegmented one (e.g. `/həˈloʊ/`) is split
/// into grapheme clusters after removing slashes and stress marks.
#[derive(Debug, Clone, Default)]
pub struct LexiconTranscriber {
    lexicons: HashMap<String, HashMap<String, Vec<String>>>,
    normalizer: Normalizer,
}

impl LexiconTranscriber {
    /// Creates an empty transcriber.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes words and phonemes with `normalizer` instead of the
    /// default. Set this before loading entries.
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Loads `lexicon.tsv` for each language from the store's data directory.
    pub fn load<S: AsRef<str>>(store: &ModelStore, languages: &[S]) -> Result<Self> {
        Self::load_with_normalizer(store, languages, Normalizer::default())
    }

    /// [`LexiconTranscriber::load`] keying entries with `normalizer`.
    pub fn load_with_normalizer<S: AsRef<str>>(
        store: &ModelStore,
        languages: &[S],
        normalizer: Normalizer,
    ) -> Result<Self> {
        let mut transcriber = Self::new().with_normalizer(normalizer);
        for language in languages {
            let language = language.as_ref();
            transcriber.load_file(language, store.lexicon_path(language))?;
        }
        Ok(transcriber)
    }

    /// Adds the entries of a TSV lexicon file for `language`.
    ///
    /// Returns the number of entries read.
    pub fn load_file<P: AsRef<Path>>(&mut self, language: &str, path: P) -> Result<usize> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let count = self.load_reader(language, reader)?;
        info!("Loaded {} lexicon entries for {} from {}", count, language, path.display());
        Ok(count)
    }

    /// Adds TSV lexicon entries from any reader.
    pub fn load_reader<R: BufRead>(&mut self, language: &str, reader: R) -> Result<usize> {
        let mut count = 0;
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match self.parse_line(line) {
                Some((word, phonemes)) => {
                    self.lexicons
                        .entry(language.to_string())
                        .or_default()
                        .entry(word)
                        .or_insert(phonemes);
                    count += 1;
                }
                None => warn!("Skipping malformed lexicon line {} for {}", line_no + 1, language),
            }
        }
        Ok(count)
    }

    /// Adds or replaces a single entry.
    pub fn insert<S: AsRef<str>>(&mut self, language: &str, word: &str, phonemes: &[S]) {
        let phonemes: Vec<String> = phonemes
            .iter()
            .filter_map(|p| self.normalizer.normalize_phoneme(p.as_ref()))
            .collect();
        let key = self.lookup_key(word);
        self.lexicons
            .entry(language.to_string())
            .or_default()
            .insert(key, phonemes);
    }

    /// Languages with at least one entry.
    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.lexicons.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }

    /// Number of entries for `language`.
    pub fn len(&self, language: &str) -> usize {
        self.lexicons.get(language).map_or(0, HashMap::len)
    }

    /// Every transcription of `language` as a phoneme corpus, ordered by word.
    pub fn phoneme_corpus(&self, language: &str) -> Corpus {
        let text = self.normalizer.config().clone();
        let Some(lexicon) = self.lexicons.get(language) else {
            return Corpus::default().with_text_config(text);
        };
        let mut entries: Vec<(&String, &Vec<String>)> = lexicon.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        Corpus::new(entries.into_iter().map(|(_, p)| p.clone()).collect()).with_text_config(text)
    }

    fn parse_line(&self, line: &str) -> Option<(String, Vec<String>)> {
        let (word, transcription) = line.split_once('\t')?;
        let word = word.trim();
        if word.is_empty() {
            return None;
        }

        let first = transcription.split(',').next()?.trim();
        let first = first.trim_matches('/');
        let phonemes: Vec<String> = if first.contains(char::is_whitespace) {
            first
                .split_whitespace()
                .filter_map(|p| self.normalizer.normalize_phoneme(p))
                .collect()
        } else {
            let stripped: String = first.chars().filter(|c| !STRESS_MARKS.contains(c)).collect();
            stripped
                .graphemes(true)
                .filter_map(|p| self.normalizer.normalize_phoneme(p))
                .collect()
        };

        if phonemes.is_empty() {
            return None;
        }
        Some((self.lookup_key(word), phonemes))
    }

    fn lookup_key(&self, word: &str) -> String {
        self.normalizer
            .normalize_word(word)
            .unwrap_or_else(|| word.trim().to_string())
    }
}

impl Transcriber for LexiconTranscriber {
    fn transcribe(&self, word: &str, language: &str) -> Result<Vec<String>> {
        self.lexicons
            .get(language)
            .and_then(|lexicon| lexicon.get(&self.lookup_key(word)))
            .cloned()
            .ok_or_else(|| PhonembedError::WordNotTranscribed {
                word: word.to_string(),
                language: language.to_string(),
            })
    }
}
