/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Discrete-time advance of a Petri-net marking.
//!
//! With rates frozen for one quantum every Euler sub-step is the same linear
//! map `m ← (I + A)·m`.  [`Propagator`] raises `(I + A)` to the sub-step count
//! once, by repeated squaring, and then advances a whole quantum with one
//! matrix–vector product.  [`advance`] is the explicit sub-step loop; both
//! agree within floating-point tolerance.
//!
//! The processor matrix is small and dense ([`DMatrix`]), the thermal matrix
//! large and sparse ([`CsrMatrix`]); both implement [`StateMatrix`].

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CsrMatrix;
use rayon::prelude::*;

use crate::error::ConfigurationError;

/// Diagonal entries above `-STABILITY_TOLERANCE` count as non-negative.
const STABILITY_TOLERANCE: f64 = 1e-9;

/// Square linear map over a marking.
pub trait StateMatrix: Clone + Send + Sync {
    fn dim(&self) -> usize;
    fn identity(dim: usize) -> Self;
    /// `self · other`
    fn compose(&self, other: &Self) -> Self;
    /// `self · marking`
    fn apply(&self, marking: &DVector<f64>) -> DVector<f64>;
    fn diagonal_entries(&self) -> Vec<f64>;
}

impl StateMatrix for DMatrix<f64> {
    fn dim(&self) -> usize {
        self.nrows()
    }

    fn identity(dim: usize) -> Self {
        DMatrix::identity(dim, dim)
    }

    fn compose(&self, other: &Self) -> Self {
        self * other
    }

    fn apply(&self, marking: &DVector<f64>) -> DVector<f64> {
        self * marking
    }

    fn diagonal_entries(&self) -> Vec<f64> {
        self.diagonal().iter().copied().collect()
    }
}

impl StateMatrix for CsrMatrix<f64> {
    fn dim(&self) -> usize {
        self.nrows()
    }

    fn identity(dim: usize) -> Self {
        CsrMatrix::identity(dim)
    }

    fn compose(&self, other: &Self) -> Self {
        self * other
    }

    /// Rows are split across the rayon pool; each row sums in column order.
    fn apply(&self, marking: &DVector<f64>) -> DVector<f64> {
        let values: Vec<f64> = (0..self.nrows())
            .into_par_iter()
            .map(|i| {
                let row = self.row(i);
                row.col_indices()
                    .iter()
                    .zip(row.values())
                    .map(|(&j, &v)| v * marking[j])
                    .sum()
            })
            .collect();
        DVector::from_vec(values)
    }

    fn diagonal_entries(&self) -> Vec<f64> {
        (0..self.nrows())
            .map(|i| {
                let row = self.row(i);
                row.col_indices()
                    .iter()
                    .position(|&j| j == i)
                    .map(|pos| row.values()[pos])
                    .unwrap_or(0.0)
            })
            .collect()
    }
}

/// Apply `step` to `marking` `steps` times.
pub fn advance<M: StateMatrix>(marking: &DVector<f64>, step: &M, steps: u32) -> DVector<f64> {
    let mut m = marking.clone();
    for _ in 0..steps {
        m = step.apply(&m);
    }
    m
}

/// `matrix^exponent` by repeated squaring.
pub fn matrix_power<M: StateMatrix>(matrix: &M, exponent: u32) -> M {
    let mut result = M::identity(matrix.dim());
    let mut base = matrix.clone();
    let mut e = exponent;
    while e > 0 {
        if e & 1 == 1 {
            result = result.compose(&base);
        }
        e >>= 1;
        if e > 0 {
            base = base.compose(&base);
        }
    }
    result
}

/// Reject a step matrix with a negative diagonal entry.
///
/// A negative `(I + A)_pp` means place `p` would be drained by more than its
/// own marking in one sub-step.
pub fn check_stability<M: StateMatrix>(
    model: &'static str,
    step: &M,
) -> Result<(), ConfigurationError> {
    for (place, diagonal) in step.diagonal_entries().into_iter().enumerate() {
        if !diagonal.is_finite() || diagonal < -STABILITY_TOLERANCE {
            return Err(ConfigurationError::UnstableStep {
                model,
                place,
                diagonal,
            });
        }
    }
    Ok(())
}

/// One quantum worth of sub-steps folded into a single matrix.
#[derive(Debug, Clone)]
pub struct Propagator<M: StateMatrix> {
    quantum: M,
    substeps: u32,
}

impl<M: StateMatrix> Propagator<M> {
    /// Check `step` for stability and precompute `step^substeps`.
    pub fn new(model: &'static str, step: &M, substeps: u32) -> Result<Self, ConfigurationError> {
        if substeps == 0 {
            return Err(ConfigurationError::InvalidStep(format!(
                "{model} model needs at least one sub-step"
            )));
        }
        check_stability(model, step)?;
        Ok(Self {
            quantum: matrix_power(step, substeps),
            substeps,
        })
    }

    pub fn substeps(&self) -> u32 {
        self.substeps
    }

    /// Advance `marking` by one quantum.
    pub fn propagate(&self, marking: &DVector<f64>) -> DVector<f64> {
        self.quantum.apply(marking)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
