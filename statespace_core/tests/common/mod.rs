//! Shared builders for the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use nalgebra::DMatrix;
use statespace_core::prelude::*;

/// Scalar random walk observed directly: `F = 1, B = 0, H = 1, A = 0`.
pub fn random_walk_model(q: f64, r: f64, p0: f64) -> Model {
    let mut model = Model::new();
    model.set_par(ParName::F, &[1.0], 1, 1).unwrap();
    model.set_par(ParName::B, &[0.0], 1, 1).unwrap();
    model.set_par(ParName::H, &[1.0], 1, 1).unwrap();
    model.set_par(ParName::A, &[0.0], 1, 1).unwrap();
    model.set_par(ParName::Q, &[q], 1, 1).unwrap();
    model.set_par(ParName::R, &[r], 1, 1).unwrap();
    model.set_initial(&[0.0], &[p0]);
    model
}

/// Position/velocity model with two observed channels and two regressors.
///
/// Internally `F = [[1, 1], [0, 1]]`, `H = [[1, 0], [0.5, 0.5]]`; the buffers
/// below are the caller (transposed) convention.
pub fn velocity_model() -> Model {
    let mut model = Model::new();
    model.set_par(ParName::F, &[1.0, 0.0, 1.0, 1.0], 2, 2).unwrap();
    model.set_par(ParName::B, &[0.0, 0.1, 0.0, 0.05], 2, 2).unwrap();
    model.set_par(ParName::H, &[1.0, 0.5, 0.0, 0.5], 2, 2).unwrap();
    model.set_par(ParName::A, &[0.2, 0.0, 0.0, -0.3], 2, 2).unwrap();
    model.set_par(ParName::Q, &[0.05, 0.01, 0.01, 0.02], 2, 2).unwrap();
    model.set_par(ParName::R, &[0.3, 0.05, 0.05, 0.2], 2, 2).unwrap();
    model.set_initial(&[0.0, 1.0], &[10.0, 0.0, 0.0, 10.0]);
    model
}

/// A constant column and a slow sine, one row per step.
pub fn velocity_inputs(n: usize) -> DMatrix<f64> {
    DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { (i as f64 / 3.0).sin() })
}

/// A velocity-model filter attached to a simulated series, ready for `init()`.
pub fn velocity_filter(n: usize, seed: u64) -> (KalmanFilter, Simulation) {
    let model = velocity_model();
    let sim = simulate(&model, &velocity_inputs(n), n, seed).unwrap();
    let mut kf = KalmanFilter::with_model(model);
    kf.set_data(Arc::new(sim.to_series().unwrap()));
    (kf, sim)
}

pub fn attach(kf: &mut KalmanFilter, dependent: DMatrix<f64>) {
    kf.set_data(Arc::new(MultiSeries::with_constant(dependent)));
}
