//! Embedding matrices, trained models and word/phoneme composition.

mod composer;
mod matrix;
mod model;

pub use composer::EmbeddingComposer;
pub use matrix::EmbeddingMatrix;
pub use model::{ModelKey, ModelKind, ModelMetadata, TrainedModel};
