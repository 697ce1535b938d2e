//! Token vocabulary with a reserved unknown id.

use crate::error::{PhonembedError, Result};
use std::collections::HashMap;

/// Display form of the reserved unknown token.
pub const UNKNOWN_TOKEN: &str = "<unk>";

/// Label used in errors when the caller has not named the model.
pub(crate) const UNLABELED: &str = "unlabeled";

/// Bidirectional token/id mapping.
///
/// Known tokens occupy ids `0..n` in descending corpus frequency; ties keep
/// the order in which tokens were first seen. Id `n` is the unknown id, so
/// [`Vocabulary::len`] is always `n + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    tokens: Vec<String>,
    counts: Vec<u32>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Builds a vocabulary from a corpus of token sequences.
    ///
    /// Tokens occurring fewer than `min_count` times are left out. A
    /// `min_count` of zero is treated as one.
    pub fn build<S: AsRef<str>>(corpus: &[Vec<S>], min_count: usize) -> Result<Self> {
        let min_count = min_count.max(1);

        let mut first_seen: Vec<&str> = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for sequence in corpus {
            for token in sequence {
                let token = token.as_ref();
                let count = counts.entry(token).or_insert(0);
                if *count == 0 {
                    first_seen.push(token);
                }
                *count += 1;
            }
        }

        let mut kept: Vec<(&str, usize)> = first_seen
            .into_iter()
            .map(|t| (t, counts[t]))
            .filter(|(_, c)| *c >= min_count)
            .collect();

        if kept.is_empty() {
            return Err(PhonembedError::EmptyVocabulary {
                model: UNLABELED.to_string(),
            });
        }

        // Stable sort keeps first-seen order among equal counts.
        kept.sort_by(|a, b| b.1.cmp(&a.1));

        let tokens: Vec<String> = kept.iter().map(|(t, _)| t.to_string()).collect();
        let counts: Vec<u32> = kept
            .iter()
            .map(|(_, c)| u32::try_from(*c).unwrap_or(u32::MAX))
            .collect();

        Self::from_parts(tokens, counts)
    }

    /// Rebuilds a vocabulary from stored tokens (in id order) and counts.
    pub fn from_parts(tokens: Vec<String>, counts: Vec<u32>) -> Result<Self> {
        if tokens.len() != counts.len() {
            return Err(PhonembedError::Serialization(format!(
                "{} tokens but {} counts",
                tokens.len(),
                counts.len()
            )));
        }

        let mut index = HashMap::with_capacity(tokens.len());
        for (id, token) in tokens.iter().enumerate() {
            if index.insert(token.clone(), id).is_some() {
                return Err(PhonembedError::Serialization(format!(
                    "duplicate token '{}'",
                    token
                )));
            }
        }

        Ok(Self {
            tokens,
            counts,
            index,
        })
    }

    /// Number of ids, including the unknown id.
    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len() + 1
    }

    /// Always false: the unknown id exists even for the smallest vocabulary.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of known tokens (excludes the unknown id).
    #[inline]
    pub fn known_len(&self) -> usize {
        self.tokens.len()
    }

    /// The reserved unknown id.
    #[inline]
    pub fn unknown_id(&self) -> usize {
        self.tokens.len()
    }

    /// Id of a known token.
    pub fn id(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    /// Id of a token, or the unknown id.
    pub fn id_or_unknown(&self, token: &str) -> usize {
        self.id(token).unwrap_or_else(|| self.unknown_id())
    }

    /// Checks if a token is known.
    pub fn contains(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }

    /// Token for an id. The unknown id yields [`UNKNOWN_TOKEN`].
    pub fn token(&self, id: usize) -> Option<&str> {
        if id == self.unknown_id() {
            return Some(UNKNOWN_TOKEN);
        }
        self.tokens.get(id).map(String::as_str)
    }

    /// Corpus frequency of a known id (0 for the unknown id).
    pub fn frequency(&self, id: usize) -> u32 {
        self.counts.get(id).copied().unwrap_or(0)
    }

    /// Known tokens in id order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Counts of known tokens in id order.
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Iterates over `(id, token)` for known tokens.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.tokens.iter().enumerate().map(|(i, t)| (i, t.as_str()))
    }
}
