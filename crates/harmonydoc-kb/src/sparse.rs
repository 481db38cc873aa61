//! Sparse row vectors over the shared TF-IDF vocabulary.

use serde::{Deserialize, Serialize};

/// Added to the norm product so an all-zero vector yields similarity 0.
pub const COSINE_EPSILON: f64 = 1e-8;

/// A single sparse row: `dim` columns, non-zero `values` at sorted `indices`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    dim: usize,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl SparseVector {
    /// An all-zero row with `dim` columns.
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build from `(column, value)` pairs. Zero values are dropped and
    /// duplicate columns are summed.
    pub fn from_pairs(dim: usize, mut pairs: Vec<(usize, f64)>) -> Self {
        pairs.sort_by_key(|(col, _)| *col);
        let mut indices: Vec<usize> = Vec::with_capacity(pairs.len());
        let mut values: Vec<f64> = Vec::with_capacity(pairs.len());
        for (col, value) in pairs {
            debug_assert!(col < dim, "column {col} out of range for dim {dim}");
            if indices.last() == Some(&col) {
                if let Some(last) = values.last_mut() {
                    *last += value;
                }
                continue;
            }
            indices.push(col);
            values.push(value);
        }

        let mut out = Self::zeros(dim);
        for (col, value) in indices.into_iter().zip(values) {
            if value != 0.0 {
                out.indices.push(col);
                out.values.push(value);
            }
        }
        out
    }

    pub fn from_dense(dense: &[f64]) -> Self {
        let mut out = Self::zeros(dense.len());
        for (col, &value) in dense.iter().enumerate() {
            if value != 0.0 {
                out.indices.push(col);
                out.values.push(value);
            }
        }
        out
    }

    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.dim];
        for (&col, &value) in self.indices.iter().zip(&self.values) {
            dense[col] = value;
        }
        dense
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_zero(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub fn get(&self, col: usize) -> f64 {
        match self.indices.binary_search(&col) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Dot product. Columns beyond either vector's dimension contribute zero,
    /// so rows built against different vocabularies never panic.
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut acc = 0.0;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }

    /// Cosine similarity with an epsilon in the denominator.
    pub fn cosine(&self, other: &SparseVector) -> f64 {
        self.dot(other) / (self.norm() * other.norm() + COSINE_EPSILON)
    }

    /// Scale in place so the L2 norm is 1. No-op on a zero row.
    pub fn normalize_l2(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for v in &mut self.values {
                *v /= norm;
            }
        }
    }

    /// Scale in place so the absolute values sum to 1. No-op on a zero row.
    pub fn normalize_l1(&mut self) {
        let total: f64 = self.values.iter().map(|v| v.abs()).sum();
        if total > 0.0 {
            for v in &mut self.values {
                *v /= total;
            }
        }
    }
}
