// statespace_core/src/types.rs

use nalgebra::{DMatrix, DVector};

// --- Core Type Aliases ---
pub type State = DVector<f64>;
pub type Covariance = DMatrix<f64>;

/// Sizes resolved by `init()`. Only `n_latent` comes from the model; the rest
/// are read off the data window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dims {
    /// Length of the latent state vector.
    pub n_latent: usize,
    /// Number of dependent (observed) variables.
    pub n_var: usize,
    /// Number of independent (exogenous) variables.
    pub n_indep: usize,
    /// Number of time steps in the frame.
    pub n_sample: usize,
}
