// statespace_core/src/simulate.rs

//! Draws synthetic series from a model, for demos and for testing filters
//! against a known latent path.

use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use tracing::debug;

use crate::data::MultiSeries;
use crate::error::{DataError, SimulateError};
use crate::linalg::noise_factor;
use crate::model::{Model, ParName};
use crate::types::{Dims, State};

/// A simulated latent path and the observations it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    /// `x[0..=n_sample]`, including the draw from the prior.
    pub states: Vec<State>,
    /// `z[0..n_sample]`, one row per step.
    pub observations: DMatrix<f64>,
    /// The independent vars that drove the path, one row per step.
    pub inputs: DMatrix<f64>,
}

impl Simulation {
    /// The observations and inputs as a data source for a filter.
    pub fn to_series(&self) -> Result<MultiSeries, DataError> {
        MultiSeries::new(self.observations.clone(), self.inputs.clone())
    }
}

fn draw(rng: &mut ChaCha8Rng, factor: &DMatrix<f64>) -> DVector<f64> {
    let e: DVector<f64> = DVector::from_fn(factor.ncols(), |_, _| {
        StandardNormal.sample(&mut *rng)
    });
    factor * e
}

/// Simulates `n_sample` steps of the model driven by the first `n_sample`
/// rows of `inputs`. The same seed always produces the same series.
///
/// `n_var` is taken from `H`; the model is validated exactly as `init()`
/// would validate it against data of that shape.
pub fn simulate(
    model: &Model,
    inputs: &DMatrix<f64>,
    n_sample: usize,
    seed: u64,
) -> Result<Simulation, SimulateError> {
    let n_latent = model.require(ParName::F)?.nrows();
    let n_var = model.require(ParName::H)?.nrows();
    if inputs.nrows() < n_sample {
        return Err(SimulateError::TooFewInputs {
            needed: n_sample,
            got: inputs.nrows(),
        });
    }
    let dims = Dims {
        n_latent,
        n_var,
        n_indep: inputs.ncols(),
        n_sample,
    };
    let p = model.resolve(dims)?;

    let l_p0 = noise_factor(&p.p0).ok_or(SimulateError::NotPositiveDefinite("P0"))?;
    let l_q = noise_factor(&p.q).ok_or(SimulateError::NotPositiveDefinite("Q"))?;
    let l_r = noise_factor(&p.r).ok_or(SimulateError::NotPositiveDefinite("R"))?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut states = Vec::with_capacity(n_sample + 1);
    let mut observations = DMatrix::zeros(n_sample, n_var);

    states.push(&p.x0 + draw(&mut rng, &l_p0));
    for t in 1..=n_sample {
        let u = inputs.row(t - 1).transpose();
        let x = &p.f * &states[t - 1] + &p.b * &u + draw(&mut rng, &l_q);
        let z = &p.h * &x + &p.a * &u + draw(&mut rng, &l_r);
        observations.row_mut(t - 1).copy_from(&z.transpose());
        states.push(x);
    }

    debug!(n_latent, n_var, n_sample, seed, "simulated series");

    Ok(Simulation {
        states,
        observations,
        inputs: inputs.rows(0, n_sample).into_owned(),
    })
}

/// Convenience wrapper: a constant `1.0` regressor for every step.
pub fn simulate_with_constant(
    model: &Model,
    n_sample: usize,
    seed: u64,
) -> Result<Simulation, SimulateError> {
    simulate(model, &DMatrix::from_element(n_sample, 1, 1.0), n_sample, seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use approx::assert_abs_diff_eq;

    fn local_level(q: f64, r: f64) -> Model {
        let mut model = Model::new();
        model.set_par(ParName::F, &[1.0], 1, 1).unwrap();
        model.set_par(ParName::B, &[0.0], 1, 1).unwrap();
        model.set_par(ParName::H, &[1.0], 1, 1).unwrap();
        model.set_par(ParName::A, &[0.0], 1, 1).unwrap();
        model.set_par(ParName::Q, &[q], 1, 1).unwrap();
        model.set_par(ParName::R, &[r], 1, 1).unwrap();
        model.set_initial(&[0.0], &[1.0]);
        model
    }

    #[test]
    fn same_seed_same_series() {
        let model = local_level(0.5, 0.1);
        let a = simulate_with_constant(&model, 20, 42).unwrap();
        let b = simulate_with_constant(&model, 20, 42).unwrap();
        let c = simulate_with_constant(&model, 20, 43).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.observations, c.observations);
        assert_eq!(a.states.len(), 21);
        assert_eq!(a.observations.shape(), (20, 1));
    }

    #[test]
    fn noiseless_model_is_deterministic() {
        let mut model = local_level(0.0, 0.0);
        model.set_par(ParName::B, &[0.5], 1, 1).unwrap();
        model.set_initial(&[1.0], &[0.0]);
        let sim = simulate_with_constant(&model, 4, 0).unwrap();
        for t in 0..4 {
            assert_abs_diff_eq!(sim.observations[(t, 0)], 1.0 + 0.5 * (t + 1) as f64);
        }
    }

    #[test]
    fn rejects_short_inputs_and_bad_covariances() {
        let model = local_level(1.0, 1.0);
        assert_eq!(
            simulate(&model, &DMatrix::from_element(3, 1, 1.0), 5, 0),
            Err(SimulateError::TooFewInputs { needed: 5, got: 3 })
        );

        let model = local_level(-1.0, 1.0);
        assert_eq!(
            simulate_with_constant(&model, 5, 0),
            Err(SimulateError::NotPositiveDefinite("Q"))
        );

        let mut model = local_level(1.0, 1.0);
        model.clear_par(ParName::H);
        assert_eq!(
            simulate_with_constant(&model, 5, 0),
            Err(SimulateError::Model(ModelError::Missing(ParName::H)))
        );
    }

    #[test]
    fn series_feeds_a_filter() {
        use crate::data::TimeSeries;
        let sim = simulate_with_constant(&local_level(0.1, 0.1), 8, 9).unwrap();
        let series = sim.to_series().unwrap();
        assert_eq!(series.possible_frame().len(), 8);
        assert_eq!(series.independent_vars(0, 8).unwrap().ncols(), 1);
    }
}
