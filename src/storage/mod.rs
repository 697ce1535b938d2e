//! Model persistence: the `.pemb` binary format and the directory store.

mod format;
mod store;

pub use format::{ModelFormat, ModelHeader, FORMAT_VERSION};
pub use store::{discover, ModelStore, LEXICON_FILE, MODEL_EXTENSION};
