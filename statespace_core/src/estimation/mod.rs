// statespace_core/src/estimation/mod.rs

use std::any::Any;

use crate::data::SharedSeries;
use crate::error::{FrameError, ModelError, NumericError, ParError};
use crate::types::Dims;

pub mod filters;
pub mod state;

pub use state::{FilterState, SmoothState};

/// The contract for any algorithm that performs the "filter" role on a
/// state-space model: validate against data, run forward, run backward.
///
/// Calls are expected in dependency order: `set_data`, `set_frame`,
/// `set_par`/`set_initial`, `init`, `filter`, `smooth`. Changing the data,
/// the frame or a parameter only takes effect at the next `init`.
pub trait Filter: Send + Sync {
    /// Attaches the time series the filter reads in `init()`.
    fn set_data(&mut self, data: SharedSeries);

    /// Restricts estimation to `[from, to)`. The frame is left unchanged on error.
    fn set_frame(&mut self, from: usize, to: usize) -> Result<(), FrameError>;

    /// Stores one of the named parameter matrices `F, B, H, A, Q, R`.
    fn set_par(&mut self, name: &str, values: &[f64], dim0: usize, dim1: usize)
        -> Result<(), ParError>;

    /// Stores the initial state mean and covariance buffers.
    fn set_initial(&mut self, mean: &[f64], cov: &[f64]);

    /// Validates the model against the data window and allocates all results.
    fn init(&mut self) -> Result<(), ModelError>;

    /// Runs the forward pass.
    fn filter(&mut self) -> Result<(), NumericError>;

    /// Runs the backward pass over a completed forward pass.
    fn smooth(&mut self) -> Result<(), NumericError>;

    /// Sizes resolved by the last successful `init()`.
    fn dims(&self) -> Option<Dims>;

    fn filter_state(&self) -> Option<&FilterState>;

    fn smooth_state(&self) -> Option<&SmoothState>;

    /// Allows for dynamic downcasting to access algorithm-specific methods if needed.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
