// statespace_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::data::{SharedSeries, TimeSeries};
pub use crate::estimation::Filter;

// --- Core Data Structures ---
pub use crate::data::{Frame, MultiSeries};
pub use crate::estimation::{FilterState, SmoothState};
pub use crate::model::{Model, ParName, Params};
pub use crate::types::{Covariance, Dims, State};

// --- Errors ---
pub use crate::error::{DataError, FrameError, ModelError, NumericError, ParError, SimulateError};

// --- Estimation Algorithms ---
pub use crate::estimation::filters::KalmanFilter;
pub use crate::simulate::{simulate, simulate_with_constant, Simulation};
