// statespace_core/src/estimation/state.rs

use nalgebra::{DMatrix, DVector};

use crate::types::{Covariance, Dims, State};

/// Per-step results of the forward pass.
///
/// Every sequence has `n_sample + 1` entries. Index 0 is the prior
/// (`x_upd[0] = x0`, `p_upd[0] = P0`), index `t` holds the result after
/// processing observation `t - 1`. Index-0 entries other than the prior are
/// zero and unused.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    /// Predicted state mean `x[t|t-1]`.
    pub x_pred: Vec<State>,
    /// Updated state mean `x[t|t]`.
    pub x_upd: Vec<State>,
    /// Predicted state covariance `P[t|t-1]`.
    pub p_pred: Vec<Covariance>,
    /// Updated state covariance `P[t|t]`.
    pub p_upd: Vec<Covariance>,
    /// Innovation `z[t-1] - ẑ[t|t-1]`.
    pub v_pred: Vec<DVector<f64>>,
    /// Post-update residual `z[t-1] - ẑ[t|t]`.
    pub v_upd: Vec<DVector<f64>>,
    /// Innovation covariance.
    pub s: Vec<Covariance>,
    /// Inverse of `s`, taken from its Cholesky factor.
    pub s_inv: Vec<Covariance>,
    /// Kalman gain, `n_latent x n_var`.
    pub k: Vec<DMatrix<f64>>,
    /// Gaussian log-likelihood of the frame, by prediction error decomposition.
    pub log_likelihood: f64,
}

impl FilterState {
    /// Allocates zeroed sequences and seeds the prior.
    pub fn new(dims: Dims, x0: State, p0: Covariance) -> Self {
        let Dims {
            n_latent,
            n_var,
            n_sample,
            ..
        } = dims;
        let len = n_sample + 1;

        let mut x_upd = vec![DVector::zeros(n_latent); len];
        let mut p_upd = vec![DMatrix::zeros(n_latent, n_latent); len];
        x_upd[0] = x0;
        p_upd[0] = p0;

        Self {
            x_pred: vec![DVector::zeros(n_latent); len],
            x_upd,
            p_pred: vec![DMatrix::zeros(n_latent, n_latent); len],
            p_upd,
            v_pred: vec![DVector::zeros(n_var); len],
            v_upd: vec![DVector::zeros(n_var); len],
            s: vec![DMatrix::zeros(n_var, n_var); len],
            s_inv: vec![DMatrix::zeros(n_var, n_var); len],
            k: vec![DMatrix::zeros(n_latent, n_var); len],
            log_likelihood: 0.0,
        }
    }

    /// Number of processed time steps (`n_sample`).
    pub fn n_sample(&self) -> usize {
        self.x_upd.len() - 1
    }
}

/// Results of the backward pass, indexed like [`FilterState`].
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothState {
    /// Smoothed state mean `x[t|n]`.
    pub x_smooth: Vec<State>,
    /// Smoothed state covariance `P[t|n]`.
    pub p_smooth: Vec<Covariance>,
    /// Backward weighted residual; `r[t]` summarises the innovations after `t`.
    /// `r[n_sample]` is the zero terminal condition.
    pub r: Vec<DVector<f64>>,
    /// Variance of `r`, same indexing.
    pub n: Vec<Covariance>,
    /// Smoothed observation noise `ê[t]`, index 0 unused.
    pub obs_disturbance: Vec<DVector<f64>>,
    pub obs_disturbance_cov: Vec<Covariance>,
    /// Smoothed process noise `ŵ[t]` entering state `t`, index 0 unused.
    pub state_disturbance: Vec<State>,
    pub state_disturbance_cov: Vec<Covariance>,
}

impl SmoothState {
    pub fn new(dims: Dims) -> Self {
        let Dims {
            n_latent,
            n_var,
            n_sample,
            ..
        } = dims;
        let len = n_sample + 1;

        Self {
            x_smooth: vec![DVector::zeros(n_latent); len],
            p_smooth: vec![DMatrix::zeros(n_latent, n_latent); len],
            r: vec![DVector::zeros(n_latent); len],
            n: vec![DMatrix::zeros(n_latent, n_latent); len],
            obs_disturbance: vec![DVector::zeros(n_var); len],
            obs_disturbance_cov: vec![DMatrix::zeros(n_var, n_var); len],
            state_disturbance: vec![DVector::zeros(n_latent); len],
            state_disturbance_cov: vec![DMatrix::zeros(n_latent, n_latent); len],
        }
    }
}
