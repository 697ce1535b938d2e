//! Training examples for context-to-center prediction.

use crate::text::{Corpus, Vocabulary};

/// One CBOW training example: context ids predicting a target id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CbowExample {
    /// Ids of the surrounding tokens (unknown id for out-of-vocabulary ones).
    pub context: Vec<usize>,
    /// Id of the center token.
    pub target: usize,
}

/// Extracts every example of `corpus` for a context radius of `window_size`.
///
/// Windows are truncated at sequence boundaries and never padded; positions
/// with an empty context are skipped.
pub fn build_examples(corpus: &Corpus, vocabulary: &Vocabulary, window_size: usize) -> Vec<CbowExample> {
    corpus
        .context_windows(window_size)
        .into_iter()
        .map(|(center, context)| CbowExample {
            context: context.iter().map(|t| vocabulary.id_or_unknown(t)).collect(),
            target: vocabulary.id_or_unknown(center),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(raw: &[&str]) -> Corpus {
        Corpus::new(
            raw.iter()
                .map(|s| s.split_whitespace().map(String::from).collect())
                .collect(),
        )
    }

    #[test]
    fn test_three_token_sequence_window_one() {
        // a:0 b:1 c:2 <unk>:3
        let vocab = Vocabulary::from_parts(vec!["a".into(), "b".into(), "c".into()], vec![1, 1, 1]).unwrap();
        let examples = build_examples(&corpus(&["a b c"]), &vocab, 1);

        assert_eq!(
            examples,
            vec![
                CbowExample { context: vec![1], target: 0 },
                CbowExample { context: vec![0, 2], target: 1 },
                CbowExample { context: vec![1], target: 2 },
            ]
        );
    }

    #[test]
    fn test_out_of_vocabulary_maps_to_unknown() {
        let vocab = Vocabulary::from_parts(vec!["a".into()], vec![2]).unwrap();
        let examples = build_examples(&corpus(&["a z"]), &vocab, 2);

        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0], CbowExample { context: vec![1], target: 0 });
        assert_eq!(examples[1], CbowExample { context: vec![0], target: 1 });
    }

    #[test]
    fn test_windows_do_not_cross_sequences() {
        let vocab = Vocabulary::from_parts(vec!["a".into(), "b".into()], vec![1, 1]).unwrap();
        let examples = build_examples(&corpus(&["a", "b"]), &vocab, 5);
        assert!(examples.is_empty());
    }
}
