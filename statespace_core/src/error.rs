// statespace_core/src/error.rs

//! Error types for every fallible operation of the engine.
//!
//! Each stage of the engine lifecycle has its own error enum so callers can
//! tell a bad frame apart from a bad parameter buffer or a numerical failure.

use crate::model::ParName;

/// The attached data window yields no usable sub-matrix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataError {
    /// The requested range contains no dependent variable.
    #[error("no dependent variable in frame [{from}, {to})")]
    NoDependentVars { from: usize, to: usize },

    /// The requested range contains no independent variable.
    #[error("no independent variable in frame [{from}, {to})")]
    NoIndependentVars { from: usize, to: usize },

    /// Dependent and independent matrices disagree on the sample count.
    #[error("dependent vars have {dependent} rows but independent vars have {independent}")]
    RowMismatch { dependent: usize, independent: usize },

    /// A row of an in-memory series is shorter or longer than the first one.
    #[error("row {row} has {got} values, expected {expected}")]
    RaggedRow { row: usize, expected: usize, got: usize },

    /// Observations and regressors must be finite inside the frame.
    #[error("non-finite value at row {row}, column {column}")]
    NonFinite { row: usize, column: usize },
}

/// A requested `(from, to)` window is not usable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// No data provider is attached, so the valid range is unknown.
    #[error("no data attached, cannot resolve a frame")]
    NoData,

    /// `from >= to`.
    #[error("empty frame [{from}, {to})")]
    Empty { from: usize, to: usize },

    /// The window leaves the range reported by the provider.
    #[error("frame [{from}, {to}) outside possible range [{possible_from}, {possible_to})")]
    OutOfRange {
        from: usize,
        to: usize,
        possible_from: usize,
        possible_to: usize,
    },
}

/// A parameter buffer handed to `set_par` was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParError {
    #[error("unknown parameter name '{0}', expected one of F, B, H, A, Q, R")]
    UnknownName(String),

    #[error("parameter {name} must be square, got {dim0}x{dim1}")]
    NotSquare {
        name: ParName,
        dim0: usize,
        dim1: usize,
    },

    #[error("parameter {name} expects {expected} values, got {got}")]
    DimensionMismatch {
        name: ParName,
        expected: usize,
        got: usize,
    },

    #[error("parameter {name} must be symmetric")]
    NotSymmetric { name: ParName },
}

/// Validation failure inside `init()`. Names the first violated invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("no data attached")]
    NoData,

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("parameter {0} has not been set")]
    Missing(ParName),

    /// A stored matrix disagrees with the dimensions derived so far.
    /// Shapes are given in the internal (column) convention as `rows x cols`.
    #[error("parameter {name} has shape {got:?}, expected {expected:?}")]
    DimensionMismatch {
        name: ParName,
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("initial state mean has not been set")]
    MissingInitialMean,

    #[error("initial state covariance has not been set")]
    MissingInitialCovariance,

    #[error("initial state mean has length {got}, expected {expected}")]
    InitialMeanLength { expected: usize, got: usize },

    #[error("initial state covariance has {got} values, expected {expected}")]
    InitialCovarianceLength { expected: usize, got: usize },

    #[error("initial state covariance must be symmetric")]
    InitialCovarianceNotSymmetric,
}

/// Failure of the forward or backward pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NumericError {
    /// Cholesky factorisation of the innovation covariance `S[step]` failed.
    #[error("innovation covariance at step {step} is not positive definite")]
    NotPositiveSemiDefinite { step: usize },

    #[error("filter has not been initialised, call init() first")]
    NotInitialized,

    #[error("filter has not been run, call filter() before smooth()")]
    NotFiltered,
}

/// Failure while drawing a synthetic series.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulateError {
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A noise covariance could not be factorised.
    #[error("covariance {0} is not positive definite")]
    NotPositiveDefinite(&'static str),

    #[error("need {needed} rows of independent vars, got {got}")]
    TooFewInputs { needed: usize, got: usize },
}
