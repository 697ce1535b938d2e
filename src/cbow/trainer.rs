//! CBOW training loop.
//!
//! Examples are shuffled once per epoch with a seeded ChaCha8 generator and
//! processed in mini-batches. Within a batch, per-example gradients are
//! computed in parallel against a frozen snapshot of both tables, collected
//! in example order, then accumulated and applied once. Summation order is
//! therefore fixed, and a run is bit-reproducible for a given seed regardless
//! of the number of worker threads.

use crate::cbow::example::{build_examples, CbowExample};
use crate::cbow::model::{BatchGradient, CbowModel, ExampleGradient};
use crate::cbow::sampler::NegativeSampler;
use crate::config::{TrainingConfig, TrainingObjective};
use crate::embedding::EmbeddingMatrix;
use crate::error::{PhonembedError, Result};
use crate::text::{Corpus, Vocabulary, UNLABELED};
use indicatif::ProgressBar;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// Summary of a finished training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    /// Seed the run used.
    pub seed: u64,
    /// Valid examples per epoch.
    pub examples: usize,
    /// Parameter updates performed.
    pub steps: usize,
    /// Mean example loss of each epoch.
    pub epoch_losses: Vec<f32>,
}

impl TrainingReport {
    /// Mean loss of the last epoch.
    pub fn final_loss(&self) -> f32 {
        self.epoch_losses.last().copied().unwrap_or(f32::NAN)
    }
}

/// CBOW trainer with explicit hyperparameters.
pub struct CbowTrainer {
    config: TrainingConfig,
    seed: u64,
    label: String,
}

impl CbowTrainer {
    /// Creates a trainer, validating the configuration.
    ///
    /// Without a configured seed one is drawn from the OS and logged, so the
    /// run can still be reproduced.
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;

        let seed = match config.seed {
            Some(seed) => seed,
            None => {
                let seed = ChaCha8Rng::from_entropy().gen();
                info!("No training seed configured, using {}", seed);
                seed
            }
        };

        Ok(Self {
            config,
            seed,
            label: UNLABELED.to_string(),
        })
    }

    /// Names the model in log lines and errors (e.g. `en/word`).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// The configuration.
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// The effective seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Trains on `corpus` and returns the input table.
    pub fn train(&self, corpus: &Corpus, vocabulary: &Vocabulary) -> Result<EmbeddingMatrix> {
        self.train_with_progress(corpus, vocabulary, None)
            .map(|(matrix, _)| matrix)
    }

    /// Trains, reporting one progress tick per batch.
    pub fn train_with_progress(
        &self,
        corpus: &Corpus,
        vocabulary: &Vocabulary,
        progress: Option<&ProgressBar>,
    ) -> Result<(EmbeddingMatrix, TrainingReport)> {
        if self.config.num_threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.num_threads)
                .build()
                .map_err(|e| PhonembedError::Config(format!("cannot build thread pool: {}", e)))?;
            pool.install(|| self.run(corpus, vocabulary, progress))
        } else {
            self.run(corpus, vocabulary, progress)
        }
    }

    fn run(
        &self,
        corpus: &Corpus,
        vocabulary: &Vocabulary,
        progress: Option<&ProgressBar>,
    ) -> Result<(EmbeddingMatrix, TrainingReport)> {
        let examples = build_examples(corpus, vocabulary, self.config.window_size);
        if examples.is_empty() {
            return Err(PhonembedError::EmptyCorpus {
                model: self.label.clone(),
            });
        }

        let sampler = match self.config.objective {
            TrainingObjective::Softmax => None,
            TrainingObjective::NegativeSampling { .. } => Some(NegativeSampler::new(vocabulary)?),
        };

        let rows = vocabulary.len();
        let dim = self.config.embedding_dim;
        let batch_size = self.config.batch_size;
        let n = examples.len();
        let batches_per_epoch = (n + batch_size - 1) / batch_size;
        let total_steps = batches_per_epoch * self.config.epochs;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut model = CbowModel::new(rows, dim, &mut rng)?;
        let mut grad = BatchGradient::zeros(rows, dim);
        let mut indices: Vec<usize> = (0..n).collect();
        let mut epoch_losses = Vec::with_capacity(self.config.epochs);

        info!(
            "Training {}: {} examples, {} ids, {} dim, {} epochs x {} batches",
            self.label, n, rows, dim, self.config.epochs, batches_per_epoch
        );

        if let Some(pb) = progress {
            pb.set_length(total_steps as u64);
            pb.set_position(0);
        }

        let mut step = 0;
        for epoch in 0..self.config.epochs {
            indices.shuffle(&mut rng);
            let mut epoch_loss = 0.0f64;

            for batch in indices.chunks(batch_size) {
                let gradients: Vec<ExampleGradient> = batch
                    .par_iter()
                    .map(|&idx| self.example_gradient(&model, &examples[idx], sampler.as_ref(), step, idx))
                    .collect();

                grad.clear();
                for (&idx, example_grad) in batch.iter().zip(&gradients) {
                    grad.accumulate(&examples[idx], example_grad);
                }

                let loss = grad.mean_loss();
                if !loss.is_finite() {
                    return Err(self.diverged(epoch, step, loss));
                }

                model.apply(&grad, self.config.learning_rate);
                epoch_loss += loss as f64 * grad.examples() as f64;

                debug!("{} step {}/{}: loss={:.5}", self.label, step + 1, total_steps, loss);
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                step += 1;
            }

            let mean = (epoch_loss / n as f64) as f32;
            epoch_losses.push(mean);
            info!("{} epoch {}/{}: mean loss {:.5}", self.label, epoch + 1, self.config.epochs, mean);
            if let Some(pb) = progress {
                pb.set_message(format!("{} epoch {}/{} loss {:.4}", self.label, epoch + 1, self.config.epochs, mean));
            }
        }

        let matrix = model.into_input();
        if !matrix.is_finite() {
            return Err(self.diverged(self.config.epochs - 1, step.saturating_sub(1), f32::NAN));
        }

        let report = TrainingReport {
            seed: self.seed,
            examples: n,
            steps: step,
            epoch_losses,
        };

        info!("Training {} completed in {} steps", self.label, step);
        Ok((matrix, report))
    }

    fn example_gradient(
        &self,
        model: &CbowModel,
        example: &CbowExample,
        sampler: Option<&NegativeSampler>,
        step: usize,
        idx: usize,
    ) -> ExampleGradient {
        match (self.config.objective, sampler) {
            (TrainingObjective::NegativeSampling { negatives }, Some(sampler)) => {
                let mut rng = ChaCha8Rng::seed_from_u64(example_seed(self.seed, step, idx));
                let drawn = sampler.sample(&mut rng, example.target, negatives);
                model.negative_sampling_gradient(example, &drawn)
            }
            _ => model.softmax_gradient(example),
        }
    }

    fn diverged(&self, epoch: usize, step: usize, loss: f32) -> PhonembedError {
        PhonembedError::TrainingDiverged {
            model: self.label.clone(),
            epoch,
            step,
            loss,
        }
    }
}

/// Independent per-example stream so sampling does not depend on thread
/// scheduling.
fn example_seed(seed: u64, step: usize, idx: usize) -> u64 {
    let mut z = seed
        ^ (step as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (idx as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 30)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
