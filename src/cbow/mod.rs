//! Continuous-bag-of-words training.
//!
//! - **Examples**: context windows mapped to vocabulary ids (example.rs)
//! - **Model**: input/output tables and per-example gradients (model.rs)
//! - **Sampling**: unigram^0.75 negative sampler (sampler.rs)
//! - **Trainer**: seeded mini-batch gradient descent (trainer.rs)

mod example;
mod model;
mod sampler;
mod trainer;

pub use example::{build_examples, CbowExample};
pub use model::CbowModel;
pub use sampler::NegativeSampler;
pub use trainer::{CbowTrainer, TrainingReport};
