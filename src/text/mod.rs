//! Text handling: token normalization, corpora and vocabularies.

mod corpus;
mod normalizer;
mod vocabulary;

pub use corpus::Corpus;
pub use normalizer::Normalizer;
pub use vocabulary::{Vocabulary, UNKNOWN_TOKEN};

pub(crate) use vocabulary::UNLABELED;
