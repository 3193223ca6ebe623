// statespace_core/src/data.rs

//! The boundary to the time-series data source.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{DataError, FrameError};
use crate::linalg;

/// A half-open `[from, to)` window of sample indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frame {
    pub from: usize,
    pub to: usize,
}

impl Frame {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    pub fn len(&self) -> usize {
        self.to.saturating_sub(self.from)
    }

    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }

    /// Checks `possible.from <= from < to <= possible.to`.
    pub fn validate_within(&self, possible: Frame) -> Result<(), FrameError> {
        if self.is_empty() {
            return Err(FrameError::Empty {
                from: self.from,
                to: self.to,
            });
        }
        if self.from < possible.from || self.to > possible.to {
            return Err(FrameError::OutOfRange {
                from: self.from,
                to: self.to,
                possible_from: possible.from,
                possible_to: possible.to,
            });
        }
        Ok(())
    }
}

/// The contract for anything that can supply observations to a filter.
///
/// Rows of the returned matrices are time steps, columns are variables.
pub trait TimeSeries {
    /// The widest window this source can serve.
    fn possible_frame(&self) -> Frame;

    /// Dependent (observed) variables for `[from, to)`, `n_sample x n_var`.
    fn dependent_vars(&self, from: usize, to: usize) -> Result<DMatrix<f64>, DataError>;

    /// Independent (exogenous) variables for `[from, to)`, `n_sample x n_indep`.
    fn independent_vars(&self, from: usize, to: usize) -> Result<DMatrix<f64>, DataError>;
}

/// How filters hold on to their data: shared and read-only.
pub type SharedSeries = Arc<dyn TimeSeries + Send + Sync>;

/// An in-memory multivariate series.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiSeries {
    dependent: DMatrix<f64>,
    independent: DMatrix<f64>,
}

impl MultiSeries {
    /// Builds a series from two matrices with one row per time step.
    pub fn new(dependent: DMatrix<f64>, independent: DMatrix<f64>) -> Result<Self, DataError> {
        if dependent.nrows() != independent.nrows() {
            return Err(DataError::RowMismatch {
                dependent: dependent.nrows(),
                independent: independent.nrows(),
            });
        }
        Ok(Self {
            dependent,
            independent,
        })
    }

    /// Builds a series from row vectors. Every row of a side must have the
    /// same width as its first row.
    pub fn from_rows(dependent: &[Vec<f64>], independent: &[Vec<f64>]) -> Result<Self, DataError> {
        Self::new(rows_to_matrix(dependent)?, rows_to_matrix(independent)?)
    }

    /// A series whose only independent variable is a constant `1.0`, the
    /// usual intercept regressor.
    pub fn with_constant(dependent: DMatrix<f64>) -> Self {
        let n = dependent.nrows();
        Self {
            dependent,
            independent: DMatrix::from_vec(n, 1, linalg::repeat(1.0, n)),
        }
    }

    pub fn n_obs(&self) -> usize {
        self.dependent.nrows()
    }

    pub fn dependent(&self) -> &DMatrix<f64> {
        &self.dependent
    }

    pub fn independent(&self) -> &DMatrix<f64> {
        &self.independent
    }
}

/// Stacks row vectors into a matrix. Every row must have the width of the
/// first one.
pub fn rows_to_matrix(rows: &[Vec<f64>]) -> Result<DMatrix<f64>, DataError> {
    let ncols = rows.first().map_or(0, Vec::len);
    if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
        return Err(DataError::RaggedRow {
            row,
            expected: ncols,
            got: r.len(),
        });
    }
    Ok(DMatrix::from_fn(rows.len(), ncols, |i, j| rows[i][j]))
}

impl TimeSeries for MultiSeries {
    fn possible_frame(&self) -> Frame {
        Frame::new(0, self.n_obs())
    }

    fn dependent_vars(&self, from: usize, to: usize) -> Result<DMatrix<f64>, DataError> {
        if from >= to || to > self.n_obs() || self.dependent.ncols() == 0 {
            return Err(DataError::NoDependentVars { from, to });
        }
        Ok(self.dependent.rows(from, to - from).into_owned())
    }

    fn independent_vars(&self, from: usize, to: usize) -> Result<DMatrix<f64>, DataError> {
        if from >= to || to > self.n_obs() || self.independent.ncols() == 0 {
            return Err(DataError::NoIndependentVars { from, to });
        }
        Ok(self.independent.rows(from, to - from).into_owned())
    }
}
