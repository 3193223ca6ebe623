// statespace_core/src/estimation/filters/mod.rs

mod kalman;

pub use kalman::KalmanFilter;
