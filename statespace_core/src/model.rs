// statespace_core/src/model.rs

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ModelError, ParError};
use crate::linalg;
use crate::types::Dims;

/// Names of the six free parameter matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParName {
    /// Latent transition, `n_latent x n_latent`.
    F,
    /// Exogenous-to-latent, `n_latent x n_indep`.
    B,
    /// Latent-to-observation, `n_var x n_latent`.
    H,
    /// Exogenous-to-observation, `n_var x n_indep`.
    A,
    /// Process noise covariance, `n_latent x n_latent`.
    Q,
    /// Observation noise covariance, `n_var x n_var`.
    R,
}

impl ParName {
    pub const ALL: [ParName; 6] = [
        ParName::F,
        ParName::B,
        ParName::H,
        ParName::A,
        ParName::Q,
        ParName::R,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ParName::F => "F",
            ParName::B => "B",
            ParName::H => "H",
            ParName::A => "A",
            ParName::Q => "Q",
            ParName::R => "R",
        }
    }

    /// `Q` and `R` are covariances and must be square and symmetric.
    pub fn is_covariance(self) -> bool {
        matches!(self, ParName::Q | ParName::R)
    }
}

impl fmt::Display for ParName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParName {
    type Err = ParError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ParError::UnknownName(s.to_string()))
    }
}

/// The parameters of a linear Gaussian state-space model.
///
/// Matrices are stored in the column convention used by the recursion
/// (`x[t] = F·x[t-1] + …`). Callers hand them over in the row convention,
/// see [`Model::set_par`]. Each field is an owned copy; nothing aliases the
/// caller's buffers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub(crate) f: Option<DMatrix<f64>>,
    pub(crate) b: Option<DMatrix<f64>>,
    pub(crate) h: Option<DMatrix<f64>>,
    pub(crate) a: Option<DMatrix<f64>>,
    pub(crate) q: Option<DMatrix<f64>>,
    pub(crate) r: Option<DMatrix<f64>>,
    /// Initial mean, checked against `n_latent` in `init()`.
    pub(crate) x0: Option<Vec<f64>>,
    /// Initial covariance as a flat `n_latent²` buffer, checked in `init()`.
    pub(crate) p0: Option<Vec<f64>>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a parameter matrix.
    ///
    /// `values` is a `dim0 x dim1` row-major buffer. It is kept internally as
    /// the `dim1 x dim0` transpose. `F` must be square; `Q` and `R` take a
    /// `dim0 x dim0` buffer (`dim1` must equal `dim0`) that is symmetric.
    /// On error the previous value is left untouched.
    pub fn set_par(
        &mut self,
        name: ParName,
        values: &[f64],
        dim0: usize,
        dim1: usize,
    ) -> Result<(), ParError> {
        let square = name == ParName::F || name.is_covariance();
        if square && dim0 != dim1 {
            return Err(ParError::NotSquare { name, dim0, dim1 });
        }

        let expected = dim0 * dim1;
        if values.len() != expected {
            return Err(ParError::DimensionMismatch {
                name,
                expected,
                got: values.len(),
            });
        }

        let m = linalg::from_caller(values, dim0, dim1);
        if name.is_covariance() && !linalg::is_symmetric(&m) {
            return Err(ParError::NotSymmetric { name });
        }

        *self.slot_mut(name) = Some(m);
        Ok(())
    }

    /// Returns a stored parameter in the caller's row-major convention,
    /// the exact buffer `set_par` would accept back.
    pub fn par(&self, name: ParName) -> Option<Vec<f64>> {
        self.get(name).map(linalg::to_caller)
    }

    /// Caller-visible shape `(dim0, dim1)` of a stored parameter.
    pub fn par_shape(&self, name: ParName) -> Option<(usize, usize)> {
        self.get(name).map(|m| (m.ncols(), m.nrows()))
    }

    /// Stored parameter in the internal column convention.
    pub fn get(&self, name: ParName) -> Option<&DMatrix<f64>> {
        match name {
            ParName::F => self.f.as_ref(),
            ParName::B => self.b.as_ref(),
            ParName::H => self.h.as_ref(),
            ParName::A => self.a.as_ref(),
            ParName::Q => self.q.as_ref(),
            ParName::R => self.r.as_ref(),
        }
    }

    /// Sets the initial state mean (length `n_latent`) and covariance
    /// (`n_latent²` values, row-major). Lengths are checked in `init()`.
    pub fn set_initial(&mut self, mean: &[f64], cov: &[f64]) {
        self.x0 = Some(mean.to_vec());
        self.p0 = Some(cov.to_vec());
    }

    pub fn initial_mean(&self) -> Option<&[f64]> {
        self.x0.as_deref()
    }

    pub fn initial_covariance(&self) -> Option<&[f64]> {
        self.p0.as_deref()
    }

    /// Drops a parameter, e.g. to fall back to the identity default of `Q`/`R`.
    pub fn clear_par(&mut self, name: ParName) {
        *self.slot_mut(name) = None;
    }

    /// The stored matrix, or `ModelError::Missing`.
    pub(crate) fn require(&self, name: ParName) -> Result<&DMatrix<f64>, ModelError> {
        self.get(name).ok_or(ModelError::Missing(name))
    }

    /// Checks the internal `rows x cols` shape of a present parameter.
    pub(crate) fn check_shape(
        &self,
        name: ParName,
        expected: (usize, usize),
    ) -> Result<(), ModelError> {
        let got = self.require(name)?.shape();
        if got != expected {
            return Err(ModelError::DimensionMismatch {
                name,
                expected,
                got,
            });
        }
        Ok(())
    }

    /// Validates every parameter against `dims` and returns owned copies with
    /// the identity defaults for `Q`/`R` filled in.
    ///
    /// Checks run in the order `H, A, B, Q, R, x0, P0`.
    pub(crate) fn resolve(&self, dims: Dims) -> Result<Params, ModelError> {
        let Dims {
            n_latent,
            n_var,
            n_indep,
            ..
        } = dims;

        self.check_shape(ParName::F, (n_latent, n_latent))?;
        self.check_shape(ParName::H, (n_var, n_latent))?;
        self.check_shape(ParName::A, (n_var, n_indep))?;
        self.check_shape(ParName::B, (n_latent, n_indep))?;

        let q = match &self.q {
            Some(_) => {
                self.check_shape(ParName::Q, (n_latent, n_latent))?;
                self.require(ParName::Q)?.clone()
            }
            None => linalg::identity(n_latent),
        };
        let r = match &self.r {
            Some(_) => {
                self.check_shape(ParName::R, (n_var, n_var))?;
                self.require(ParName::R)?.clone()
            }
            None => linalg::identity(n_var),
        };

        let x0 = self.x0.as_ref().ok_or(ModelError::MissingInitialMean)?;
        if x0.len() != n_latent {
            return Err(ModelError::InitialMeanLength {
                expected: n_latent,
                got: x0.len(),
            });
        }

        let p0 = self
            .p0
            .as_ref()
            .ok_or(ModelError::MissingInitialCovariance)?;
        if p0.len() != n_latent * n_latent {
            return Err(ModelError::InitialCovarianceLength {
                expected: n_latent * n_latent,
                got: p0.len(),
            });
        }
        let p0 = linalg::from_caller(p0, n_latent, n_latent);
        if !linalg::is_symmetric(&p0) {
            return Err(ModelError::InitialCovarianceNotSymmetric);
        }

        Ok(Params {
            f: self.require(ParName::F)?.clone(),
            b: self.require(ParName::B)?.clone(),
            h: self.require(ParName::H)?.clone(),
            a: self.require(ParName::A)?.clone(),
            q,
            r,
            x0: DVector::from_column_slice(x0),
            p0,
        })
    }

    fn slot_mut(&mut self, name: ParName) -> &mut Option<DMatrix<f64>> {
        match name {
            ParName::F => &mut self.f,
            ParName::B => &mut self.b,
            ParName::H => &mut self.h,
            ParName::A => &mut self.a,
            ParName::Q => &mut self.q,
            ParName::R => &mut self.r,
        }
    }
}

/// A validated model: every matrix present with dimensions that agree.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    pub f: DMatrix<f64>,
    pub b: DMatrix<f64>,
    pub h: DMatrix<f64>,
    pub a: DMatrix<f64>,
    pub q: DMatrix<f64>,
    pub r: DMatrix<f64>,
    pub x0: DVector<f64>,
    pub p0: DMatrix<f64>,
}
