// statespace_core/src/estimation/filters/kalman.rs

use std::any::Any;
use std::fmt;

use nalgebra::{DMatrix, DVector};
use tracing::{debug, info, trace};

use crate::data::{Frame, SharedSeries};
use crate::error::{DataError, FrameError, ModelError, NumericError, ParError};
use crate::estimation::{Filter, FilterState, SmoothState};
use crate::linalg::{cholesky_inverse, sym_add, sym_cross, sym_sandwich, sym_sub};
use crate::model::{Model, ParName, Params};
use crate::types::Dims;

const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Everything `init()` resolved: validated parameters plus the data window.
#[derive(Debug, Clone)]
struct Setup {
    dims: Dims,
    frame: Frame,
    params: Params,
    /// Dependent vars, `n_sample x n_var`.
    z: DMatrix<f64>,
    /// Independent vars, `n_sample x n_indep`.
    u: DMatrix<f64>,
}

/// A concrete implementation of the linear Kalman filter with a fixed-interval
/// disturbance smoother.
///
/// ```text
/// x[t]   = F·x[t-1] + B·u[t-1] + w[t]     w ~ N(0, Q)
/// z[t-1] = H·x[t]   + A·u[t-1] + e[t]     e ~ N(0, R)
/// ```
///
/// `A` enters the observation equation, so the innovation is
/// `z[t-1] - H·x[t|t-1] - A·u[t-1]`. Set `A = 0` for the plain form.
#[derive(Default)]
pub struct KalmanFilter {
    model: Model,
    data: Option<SharedSeries>,
    /// Explicit frame; `None` means the full range at `init()` time.
    frame: Option<Frame>,

    setup: Option<Setup>,
    state: Option<FilterState>,
    filtered: bool,
    smoothed: Option<SmoothState>,
}

// The data source is a trait object without `Debug`; report only its presence.
impl fmt::Debug for KalmanFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KalmanFilter")
            .field("model", &self.model)
            .field("has_data", &self.data.is_some())
            .field("frame", &self.frame)
            .field("dims", &self.dims())
            .field("filtered", &self.filtered)
            .field("smoothed", &self.smoothed.is_some())
            .finish_non_exhaustive()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filter around an already populated model.
    pub fn with_model(model: Model) -> Self {
        Self {
            model,
            ..Self::default()
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    /// The explicitly requested frame, if any.
    pub fn frame(&self) -> Option<Frame> {
        self.frame
    }

    /// The frame used by the last successful `init()`.
    pub fn resolved_frame(&self) -> Option<Frame> {
        self.setup.as_ref().map(|s| s.frame)
    }

    /// The validated parameters of the last successful `init()`, with the
    /// `Q`/`R` defaults filled in.
    pub fn params(&self) -> Option<&Params> {
        self.setup.as_ref().map(|s| &s.params)
    }

    /// Log-likelihood of the last completed forward pass.
    pub fn log_likelihood(&self) -> Option<f64> {
        if !self.filtered {
            return None;
        }
        self.state.as_ref().map(|s| s.log_likelihood)
    }

    /// Discards every result; a fresh `init()` is needed before filtering.
    fn reset(&mut self) {
        self.setup = None;
        self.state = None;
        self.filtered = false;
        self.smoothed = None;
    }

    /// Resolves the frame, validates the model and fetches the data window,
    /// in the documented order. Allocates nothing.
    fn validate(&self) -> Result<Setup, ModelError> {
        let data = self.data.as_ref().ok_or(ModelError::NoData)?;

        let possible = data.possible_frame();
        let frame = self.frame.unwrap_or(possible);
        frame.validate_within(possible)?;

        let f = self.model.require(ParName::F)?;
        self.model.require(ParName::B)?;
        self.model.require(ParName::H)?;
        self.model.require(ParName::A)?;

        let n_latent = f.nrows();

        let z = data.dependent_vars(frame.from, frame.to)?;
        let (n_sample, n_var) = z.shape();
        if n_sample == 0 || n_var == 0 {
            return Err(DataError::NoDependentVars {
                from: frame.from,
                to: frame.to,
            }
            .into());
        }
        self.model.check_shape(ParName::H, (n_var, n_latent))?;
        check_finite(&z, frame.from)?;

        let u = data.independent_vars(frame.from, frame.to)?;
        if u.nrows() != n_sample {
            return Err(DataError::RowMismatch {
                dependent: n_sample,
                independent: u.nrows(),
            }
            .into());
        }
        let n_indep = u.ncols();
        if n_indep == 0 {
            return Err(DataError::NoIndependentVars {
                from: frame.from,
                to: frame.to,
            }
            .into());
        }
        check_finite(&u, frame.from)?;

        let dims = Dims {
            n_latent,
            n_var,
            n_indep,
            n_sample,
        };
        let params = self.model.resolve(dims)?;

        Ok(Setup {
            dims,
            frame,
            params,
            z,
            u,
        })
    }

    // --- Private Helper Methods for the Kalman Algorithm ---

    /// One predict/update cycle for step `t` (observation `t - 1`).
    fn step(setup: &Setup, st: &mut FilterState, t: usize) -> Result<(), NumericError> {
        let Params { f, b, h, a, q, r, .. } = &setup.params;
        let u = setup.u.row(t - 1).transpose();
        let z = setup.z.row(t - 1).transpose();

        // 1. Predict: x = F x + B u, P = F P F^T + Q
        let x_pred = f * &st.x_upd[t - 1] + b * &u;
        let p_pred = sym_add(&sym_sandwich(f, &st.p_upd[t - 1]), q);

        // 2. Innovation and its covariance S = H P H^T + R
        let v_pred = &z - (h * &x_pred + a * &u);
        let s = sym_add(&sym_sandwich(h, &p_pred), r);

        // 3. S must factor, otherwise no gain exists for this step.
        let (s_inv, log_det) =
            cholesky_inverse(&s).ok_or(NumericError::NotPositiveSemiDefinite { step: t })?;

        // 4. Gain K = P H^T S^-1 and update. P is symmetric so (H P)^T = P H^T.
        let hp = h * &p_pred;
        let k = hp.transpose() * &s_inv;
        let x_upd = &x_pred + &k * &v_pred;
        let p_upd = sym_sub(&p_pred, &sym_cross(&hp, &s_inv));
        let v_upd = &z - (h * &x_upd + a * &u);

        let mahalanobis = v_pred.dot(&(&s_inv * &v_pred));
        st.log_likelihood -= 0.5 * (setup.dims.n_var as f64 * LN_2PI + log_det + mahalanobis);

        trace!(step = t, innovation = v_pred.norm(), "kalman update");

        st.x_pred[t] = x_pred;
        st.x_upd[t] = x_upd;
        st.p_pred[t] = p_pred;
        st.p_upd[t] = p_upd;
        st.v_pred[t] = v_pred;
        st.v_upd[t] = v_upd;
        st.s[t] = s;
        st.s_inv[t] = s_inv;
        st.k[t] = k;
        Ok(())
    }

    /// Backward disturbance smoother from a zero terminal condition.
    fn backward(setup: &Setup, st: &FilterState) -> SmoothState {
        let Params { f, h, q, r, .. } = &setup.params;
        let n = setup.dims.n_sample;
        let ft = f.transpose();
        let ht = h.transpose();

        let mut sm = SmoothState::new(setup.dims);

        for t in (1..=n).rev() {
            let k = &st.k[t];
            let s_inv = &st.s_inv[t];
            let p_pred = &st.p_pred[t];

            let f_r = &ft * &sm.r[t];
            let fk = f * k;

            // Smoothed observation error.
            let u_t = s_inv * &st.v_pred[t] - k.transpose() * &f_r;
            let d_t = sym_add(s_inv, &sym_cross(&fk, &sm.n[t]));
            sm.obs_disturbance[t] = r * &u_t;
            sm.obs_disturbance_cov[t] = sym_sub(r, &sym_cross(r, &d_t));

            // Step the weighted residual and its variance back to t - 1.
            let l = f - &fk * h;
            let r_prev = &ht * &u_t + f_r;
            let n_prev = sym_add(&sym_cross(h, s_inv), &sym_cross(&l, &sm.n[t]));

            sm.x_smooth[t] = &st.x_pred[t] + p_pred * &r_prev;
            sm.p_smooth[t] = sym_sub(p_pred, &sym_cross(p_pred, &n_prev));
            sm.state_disturbance[t] = q * &r_prev;
            sm.state_disturbance_cov[t] = sym_sub(q, &sym_cross(q, &n_prev));

            trace!(step = t, residual = r_prev.norm(), "smoother step");

            sm.r[t - 1] = r_prev;
            sm.n[t - 1] = n_prev;
        }

        // The prior has no observation of its own; only F links it to step 1.
        let fp0 = f * &st.p_upd[0];
        sm.x_smooth[0] = &st.x_upd[0] + fp0.transpose() * &sm.r[0];
        sm.p_smooth[0] = sym_sub(&st.p_upd[0], &sym_cross(&fp0, &sm.n[0]));

        sm
    }

    /// Smoothed observations `H·x[t|n] + A·u[t-1]`, one row per step.
    pub fn smoothed_observations(&self) -> Option<DMatrix<f64>> {
        let setup = self.setup.as_ref()?;
        let sm = self.smoothed.as_ref()?;
        let Params { h, a, .. } = &setup.params;

        let n = setup.dims.n_sample;
        let mut out = DMatrix::zeros(n, setup.dims.n_var);
        for t in 1..=n {
            let u: DVector<f64> = setup.u.row(t - 1).transpose();
            let z_hat = h * &sm.x_smooth[t] + a * &u;
            out.row_mut(t - 1).copy_from(&z_hat.transpose());
        }
        Some(out)
    }
}

/// Rejects NaN and infinite entries; `offset` maps rows back to data indices.
fn check_finite(m: &DMatrix<f64>, offset: usize) -> Result<(), DataError> {
    for row in 0..m.nrows() {
        for column in 0..m.ncols() {
            if !m[(row, column)].is_finite() {
                return Err(DataError::NonFinite {
                    row: offset + row,
                    column,
                });
            }
        }
    }
    Ok(())
}

// --- The Public Trait Implementation ---
impl Filter for KalmanFilter {
    fn set_data(&mut self, data: SharedSeries) {
        self.data = Some(data);
    }

    fn set_frame(&mut self, from: usize, to: usize) -> Result<(), FrameError> {
        let data = self.data.as_ref().ok_or(FrameError::NoData)?;
        let frame = Frame::new(from, to);
        frame.validate_within(data.possible_frame())?;
        self.frame = Some(frame);
        Ok(())
    }

    fn set_par(
        &mut self,
        name: &str,
        values: &[f64],
        dim0: usize,
        dim1: usize,
    ) -> Result<(), ParError> {
        let name: ParName = name.parse()?;
        self.model.set_par(name, values, dim0, dim1)
    }

    fn set_initial(&mut self, mean: &[f64], cov: &[f64]) {
        self.model.set_initial(mean, cov);
    }

    fn init(&mut self) -> Result<(), ModelError> {
        self.reset();
        let setup = self.validate()?;

        debug!(
            from = setup.frame.from,
            to = setup.frame.to,
            n_latent = setup.dims.n_latent,
            n_var = setup.dims.n_var,
            n_indep = setup.dims.n_indep,
            n_sample = setup.dims.n_sample,
            "model validated"
        );

        self.state = Some(FilterState::new(
            setup.dims,
            setup.params.x0.clone(),
            setup.params.p0.clone(),
        ));
        self.setup = Some(setup);
        Ok(())
    }

    fn filter(&mut self) -> Result<(), NumericError> {
        let setup = self.setup.as_ref().ok_or(NumericError::NotInitialized)?;
        let prior = self.state.as_ref().ok_or(NumericError::NotInitialized)?;

        // Start over from the seeded prior so filter() can be re-run.
        let mut st = FilterState::new(setup.dims, prior.x_upd[0].clone(), prior.p_upd[0].clone());
        self.filtered = false;
        self.smoothed = None;

        let n_sample = setup.dims.n_sample;
        let pass = (1..=n_sample).try_for_each(|t| Self::step(setup, &mut st, t));
        if let Err(e) = pass {
            // Partial results are not usable; require a fresh init().
            self.reset();
            return Err(e);
        }

        info!(
            n_sample,
            log_likelihood = st.log_likelihood,
            "forward pass complete"
        );

        self.state = Some(st);
        self.filtered = true;
        Ok(())
    }

    fn smooth(&mut self) -> Result<(), NumericError> {
        let setup = self.setup.as_ref().ok_or(NumericError::NotInitialized)?;
        let st = self.state.as_ref().ok_or(NumericError::NotInitialized)?;
        if !self.filtered {
            return Err(NumericError::NotFiltered);
        }

        let sm = Self::backward(setup, st);
        info!(n_sample = setup.dims.n_sample, "backward pass complete");

        self.smoothed = Some(sm);
        Ok(())
    }

    fn dims(&self) -> Option<Dims> {
        self.setup.as_ref().map(|s| s.dims)
    }

    fn filter_state(&self) -> Option<&FilterState> {
        self.state.as_ref()
    }

    fn smooth_state(&self) -> Option<&SmoothState> {
        self.smoothed.as_ref()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MultiSeries;
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;

    /// A scalar random walk observed directly, with a constant regressor.
    fn random_walk(obs: &[f64], q: f64, r: f64) -> KalmanFilter {
        let data = MultiSeries::with_constant(DMatrix::from_column_slice(obs.len(), 1, obs));
        let mut kf = KalmanFilter::new();
        kf.set_data(Arc::new(data));
        kf.set_par("F", &[1.0], 1, 1).unwrap();
        kf.set_par("B", &[0.0], 1, 1).unwrap();
        kf.set_par("H", &[1.0], 1, 1).unwrap();
        kf.set_par("A", &[0.0], 1, 1).unwrap();
        kf.set_par("Q", &[q], 1, 1).unwrap();
        kf.set_par("R", &[r], 1, 1).unwrap();
        kf.set_initial(&[0.0], &[1.0e4]);
        kf
    }

    #[test]
    fn init_seeds_the_prior_exactly() {
        let mut kf = random_walk(&[1.0, 2.0, 3.0], 0.1, 0.5);
        kf.set_initial(&[0.25], &[7.5]);
        kf.init().unwrap();

        let st = kf.filter_state().unwrap();
        assert_eq!(st.x_upd[0][0], 0.25);
        assert_eq!(st.p_upd[0][(0, 0)], 7.5);
        assert_eq!(kf.dims().unwrap().n_latent, 1);
        assert_eq!(kf.dims().unwrap().n_sample, 3);
        assert_eq!(kf.resolved_frame(), Some(Frame::new(0, 3)));
        assert!(kf.log_likelihood().is_none());
    }

    #[test]
    fn filter_requires_init() {
        let mut kf = random_walk(&[1.0], 0.1, 0.5);
        assert_eq!(kf.filter(), Err(NumericError::NotInitialized));
        assert_eq!(kf.smooth(), Err(NumericError::NotInitialized));

        kf.init().unwrap();
        assert_eq!(kf.smooth(), Err(NumericError::NotFiltered));
    }

    #[test]
    fn set_frame_rejects_bad_windows_without_mutation() {
        let mut kf = KalmanFilter::new();
        assert_eq!(kf.set_frame(0, 1), Err(FrameError::NoData));

        let mut kf = random_walk(&[1.0, 2.0, 3.0, 4.0], 0.1, 0.5);
        kf.set_frame(1, 3).unwrap();
        assert_eq!(
            kf.set_frame(3, 3),
            Err(FrameError::Empty { from: 3, to: 3 })
        );
        assert_eq!(
            kf.set_frame(3, 2),
            Err(FrameError::Empty { from: 3, to: 2 })
        );
        assert!(matches!(
            kf.set_frame(0, 5),
            Err(FrameError::OutOfRange { .. })
        ));
        assert_eq!(kf.frame(), Some(Frame::new(1, 3)));

        kf.init().unwrap();
        assert_eq!(kf.dims().unwrap().n_sample, 2);
    }

    #[test]
    fn set_par_reports_unknown_names() {
        let mut kf = KalmanFilter::new();
        assert_eq!(
            kf.set_par("X", &[1.0], 1, 1),
            Err(ParError::UnknownName("X".to_string()))
        );
    }

    #[test]
    fn reinit_discards_previous_results() {
        let mut kf = random_walk(&[1.0, 2.0, 3.0], 0.1, 0.5);
        kf.init().unwrap();
        kf.filter().unwrap();
        kf.smooth().unwrap();
        assert!(kf.smooth_state().is_some());

        kf.init().unwrap();
        assert!(kf.smooth_state().is_none());
        assert!(kf.log_likelihood().is_none());
        let st = kf.filter_state().unwrap();
        assert!(st.x_upd[3].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn scalar_filter_matches_hand_computation() {
        let mut kf = random_walk(&[1.0], 1.0, 1.0);
        kf.set_initial(&[0.0], &[1.0]);
        kf.init().unwrap();
        kf.filter().unwrap();

        let st = kf.filter_state().unwrap();
        // P_pred = 1 + 1 = 2, S = 3, K = 2/3, x = 2/3, P = 2 - 4/3
        assert_abs_diff_eq!(st.p_pred[1][(0, 0)], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(st.s[1][(0, 0)], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(st.s_inv[1][(0, 0)], 1.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(st.k[1][(0, 0)], 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(st.x_upd[1][0], 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(st.p_upd[1][(0, 0)], 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(st.v_pred[1][0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(st.v_upd[1][0], 1.0 / 3.0, epsilon = 1e-12);

        let want = -0.5 * (LN_2PI + 3.0_f64.ln() + 1.0 / 3.0);
        assert_abs_diff_eq!(kf.log_likelihood().unwrap(), want, epsilon = 1e-12);
    }

    #[test]
    fn exogenous_terms_enter_both_equations() {
        // x[t] = x[t-1] + 2 u, z = x + 3 u, u = 1, no noise on the prior.
        let data = MultiSeries::with_constant(DMatrix::from_column_slice(1, 1, &[5.0]));
        let mut kf = KalmanFilter::new();
        kf.set_data(Arc::new(data));
        kf.set_par("F", &[1.0], 1, 1).unwrap();
        kf.set_par("B", &[2.0], 1, 1).unwrap();
        kf.set_par("H", &[1.0], 1, 1).unwrap();
        kf.set_par("A", &[3.0], 1, 1).unwrap();
        kf.set_initial(&[0.0], &[0.0]);
        kf.init().unwrap();
        kf.filter().unwrap();

        let st = kf.filter_state().unwrap();
        assert_abs_diff_eq!(st.x_pred[1][0], 2.0, epsilon = 1e-12);
        // innovation = 5 - (2 + 3)
        assert_abs_diff_eq!(st.v_pred[1][0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn smoothing_a_single_step_equals_filtering() {
        let mut kf = random_walk(&[0.7], 0.3, 0.2);
        kf.init().unwrap();
        kf.filter().unwrap();
        kf.smooth().unwrap();

        let st = kf.filter_state().unwrap();
        let sm = kf.smooth_state().unwrap();
        assert_abs_diff_eq!(sm.x_smooth[1][0], st.x_upd[1][0], epsilon = 1e-9);
        assert_abs_diff_eq!(sm.p_smooth[1][(0, 0)], st.p_upd[1][(0, 0)], epsilon = 1e-9);
        assert!(sm.r[1].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn filter_can_be_rerun_after_init() {
        let mut kf = random_walk(&[1.0, 0.5, 0.25], 0.1, 0.5);
        kf.init().unwrap();
        kf.filter().unwrap();
        let first = kf.filter_state().unwrap().clone();
        kf.filter().unwrap();
        assert_eq!(kf.filter_state().unwrap(), &first);
    }

    #[test]
    fn smoothed_observations_add_back_the_disturbance() {
        let obs = [0.3, -0.1, 0.8, 1.2];
        let mut kf = random_walk(&obs, 0.2, 0.4);
        kf.init().unwrap();
        kf.filter().unwrap();
        assert!(kf.smoothed_observations().is_none());
        kf.smooth().unwrap();

        let z_hat = kf.smoothed_observations().unwrap();
        let sm = kf.smooth_state().unwrap();
        for t in 1..=obs.len() {
            assert_abs_diff_eq!(
                z_hat[(t - 1, 0)] + sm.obs_disturbance[t][0],
                obs[t - 1],
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn debug_output_skips_the_data_source() {
        let mut kf = random_walk(&[1.0, 2.0], 0.1, 0.1);
        kf.init().unwrap();
        let text = format!("{kf:?}");
        assert!(text.starts_with("KalmanFilter"));
        assert!(text.contains("has_data: true"));
        assert!(text.contains("filtered: false"));
    }

    #[test]
    fn trait_object_downcasts_to_the_concrete_filter() {
        let mut boxed: Box<dyn Filter> = Box::new(random_walk(&[1.0, 2.0], 0.1, 0.1));
        boxed.init().unwrap();
        boxed.filter().unwrap();
        let kf = boxed
            .as_any_mut()
            .downcast_mut::<KalmanFilter>()
            .expect("concrete type");
        assert!(kf.log_likelihood().unwrap().is_finite());
    }
}
