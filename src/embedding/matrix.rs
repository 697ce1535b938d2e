//! Dense row-major embedding matrix.

use crate::error::{PhonembedError, Result};

/// A `rows x dim` matrix of `f32`, one row per vocabulary id.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    data: Vec<f32>,
    rows: usize,
    dim: usize,
}

impl EmbeddingMatrix {
    /// Creates a zero matrix.
    pub fn zeros(rows: usize, dim: usize) -> Result<Self> {
        Self::from_vec(vec![0.0; rows * dim], rows, dim)
    }

    /// Wraps flat row-major data.
    pub fn from_vec(data: Vec<f32>, rows: usize, dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(PhonembedError::Config("embedding dimension must be > 0".to_string()));
        }
        if data.len() != rows * dim {
            return Err(PhonembedError::Config(format!(
                "matrix data has {} values, expected {} x {} = {}",
                data.len(),
                rows,
                dim,
                rows * dim
            )));
        }
        Ok(Self { data, rows, dim })
    }

    /// Builds a matrix from equally sized rows.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let dim = rows.first().map(Vec::len).unwrap_or(0);
        let count = rows.len();
        let mut data = Vec::with_capacity(count * dim);
        for row in rows {
            if row.len() != dim {
                return Err(PhonembedError::Config(format!(
                    "ragged rows: expected width {}, found {}",
                    dim,
                    row.len()
                )));
            }
            data.extend(row);
        }
        Self::from_vec(data, count, dim)
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Row width.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// A single row.
    ///
    /// # Panics
    /// Panics if `id >= rows`.
    #[inline]
    pub fn row(&self, id: usize) -> &[f32] {
        let offset = id * self.dim;
        &self.data[offset..offset + self.dim]
    }

    /// A single row, or `None` if out of range.
    #[inline]
    pub fn get(&self, id: usize) -> Option<&[f32]> {
        if id < self.rows {
            Some(self.row(id))
        } else {
            None
        }
    }

    /// The flat row-major data.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Iterates over rows.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dim)
    }

    /// Elementwise mean of the given rows into a new vector.
    ///
    /// Returns `None` if `ids` is empty.
    pub fn mean_of(&self, ids: &[usize]) -> Option<Vec<f32>> {
        if ids.is_empty() {
            return None;
        }

        let mut out = vec![0.0f32; self.dim];
        for &id in ids {
            for (o, v) in out.iter_mut().zip(self.row(id)) {
                *o += v;
            }
        }
        let scale = 1.0 / ids.len() as f32;
        for o in &mut out {
            *o *= scale;
        }
        Some(out)
    }

    /// Checks that every value is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}
