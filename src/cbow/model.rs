//! The two CBOW parameter tables and per-example gradients.

use crate::cbow::example::CbowExample;
use crate::embedding::EmbeddingMatrix;
use crate::error::Result;
use rand::Rng;

/// Input (context) and output (prediction) tables, both `[vocab, dim]`.
///
/// Only the input table survives training; the output table is scaffolding.
#[derive(Debug, Clone)]
pub struct CbowModel {
    input: EmbeddingMatrix,
    output: EmbeddingMatrix,
}

/// Gradient contribution of a single example.
///
/// Output-row gradients are `coefficient * hidden`, so only the coefficients
/// are kept. Every context row receives `hidden_grad / context.len()`.
#[derive(Debug, Clone)]
pub(crate) struct ExampleGradient {
    pub hidden: Vec<f32>,
    pub hidden_grad: Vec<f32>,
    pub output_coefficients: Vec<(usize, f32)>,
    pub loss: f32,
}

/// Batch-accumulated gradients for both tables.
#[derive(Debug, Clone)]
pub(crate) struct BatchGradient {
    input: Vec<f32>,
    output: Vec<f32>,
    dim: usize,
    examples: usize,
    loss: f64,
}

impl BatchGradient {
    pub fn zeros(rows: usize, dim: usize) -> Self {
        Self {
            input: vec![0.0; rows * dim],
            output: vec![0.0; rows * dim],
            dim,
            examples: 0,
            loss: 0.0,
        }
    }

    pub fn clear(&mut self) {
        self.input.fill(0.0);
        self.output.fill(0.0);
        self.examples = 0;
        self.loss = 0.0;
    }

    /// Adds one example's contribution.
    pub fn accumulate(&mut self, example: &CbowExample, grad: &ExampleGradient) {
        let dim = self.dim;

        let scale = 1.0 / example.context.len() as f32;
        for &c in &example.context {
            let row = &mut self.input[c * dim..(c + 1) * dim];
            for (r, g) in row.iter_mut().zip(&grad.hidden_grad) {
                *r += g * scale;
            }
        }

        for &(j, coefficient) in &grad.output_coefficients {
            let row = &mut self.output[j * dim..(j + 1) * dim];
            for (r, h) in row.iter_mut().zip(&grad.hidden) {
                *r += coefficient * h;
            }
        }

        self.examples += 1;
        self.loss += grad.loss as f64;
    }

    /// Mean loss over the accumulated examples.
    pub fn mean_loss(&self) -> f32 {
        if self.examples == 0 {
            return 0.0;
        }
        (self.loss / self.examples as f64) as f32
    }

    pub fn examples(&self) -> usize {
        self.examples
    }
}

impl CbowModel {
    /// Initializes the input table uniformly in `[-0.5/dim, 0.5/dim)` and the
    /// output table with zeros.
    pub fn new<R: Rng>(rows: usize, dim: usize, rng: &mut R) -> Result<Self> {
        let bound = 0.5 / dim as f32;
        let mut input = EmbeddingMatrix::zeros(rows, dim)?;
        for v in input.as_mut_slice() {
            *v = rng.gen_range(-bound..bound);
        }

        Ok(Self {
            input,
            output: EmbeddingMatrix::zeros(rows, dim)?,
        })
    }

    /// The input table.
    pub fn input(&self) -> &EmbeddingMatrix {
        &self.input
    }

    /// The output table.
    pub fn output(&self) -> &EmbeddingMatrix {
        &self.output
    }

    /// Consumes the model, keeping only the input table.
    pub fn into_input(self) -> EmbeddingMatrix {
        self.input
    }

    /// Mean of the context rows.
    pub fn hidden(&self, context: &[usize]) -> Vec<f32> {
        self.input
            .mean_of(context)
            .unwrap_or_else(|| vec![0.0; self.input.dim()])
    }

    /// Softmax cross-entropy gradient over the whole vocabulary.
    pub(crate) fn softmax_gradient(&self, example: &CbowExample) -> ExampleGradient {
        let hidden = self.hidden(&example.context);

        let scores: Vec<f32> = self.output.iter_rows().map(|row| dot(row, &hidden)).collect();
        let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
        let sum: f32 = exps.iter().sum();

        let loss = sum.ln() + max - scores[example.target];

        let mut hidden_grad = vec![0.0f32; hidden.len()];
        let mut output_coefficients = Vec::with_capacity(exps.len());
        for (j, e) in exps.iter().enumerate() {
            let mut err = e / sum;
            if j == example.target {
                err -= 1.0;
            }
            for (g, w) in hidden_grad.iter_mut().zip(self.output.row(j)) {
                *g += err * w;
            }
            output_coefficients.push((j, err));
        }

        ExampleGradient {
            hidden,
            hidden_grad,
            output_coefficients,
            loss,
        }
    }

    /// Sigmoid loss gradient against the target and the given negatives.
    pub(crate) fn negative_sampling_gradient(&self, example: &CbowExample, negatives: &[usize]) -> ExampleGradient {
        let hidden = self.hidden(&example.context);
        let mut hidden_grad = vec![0.0f32; hidden.len()];
        let mut output_coefficients = Vec::with_capacity(negatives.len() + 1);
        let mut loss = 0.0f32;

        let labelled = std::iter::once((example.target, 1.0f32)).chain(negatives.iter().map(|&n| (n, 0.0)));
        for (j, label) in labelled {
            let row = self.output.row(j);
            let score = dot(row, &hidden);
            let err = sigmoid(score) - label;

            // -ln(sigmoid(s)) for the target, -ln(sigmoid(-s)) for negatives.
            loss += if label > 0.5 { softplus(-score) } else { softplus(score) };

            for (g, w) in hidden_grad.iter_mut().zip(row) {
                *g += err * w;
            }
            output_coefficients.push((j, err));
        }

        ExampleGradient {
            hidden,
            hidden_grad,
            output_coefficients,
            loss,
        }
    }

    /// Applies `-learning_rate * mean gradient` to both tables.
    pub(crate) fn apply(&mut self, grad: &BatchGradient, learning_rate: f32) {
        if grad.examples == 0 {
            return;
        }
        let step = learning_rate / grad.examples as f32;

        for (w, g) in self.input.as_mut_slice().iter_mut().zip(&grad.input) {
            *w -= step * g;
        }
        for (w, g) in self.output.as_mut_slice().iter_mut().zip(&grad.output) {
            *w -= step * g;
        }
    }
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// ln(1 + e^x) without overflow.
#[inline]
fn softplus(x: f32) -> f32 {
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}
