//! Turns scenario sections into engine types.

use anyhow::{Context, Result};
use nalgebra::DMatrix;
use statespace_core::prelude::*;

use crate::config::{DataToml, ModelToml, ParToml};

fn set(model: &mut Model, name: ParName, par: &ParToml) -> Result<()> {
    model
        .set_par(name, &par.values, par.dim0, par.dim1)
        .with_context(|| format!("invalid [model].{name}"))
}

/// Builds a model. Shape agreement with the data is checked later, in `init()`.
pub fn build_model(toml: &ModelToml) -> Result<Model> {
    let mut model = Model::new();
    set(&mut model, ParName::F, &toml.f)?;
    set(&mut model, ParName::B, &toml.b)?;
    set(&mut model, ParName::H, &toml.h)?;
    set(&mut model, ParName::A, &toml.a)?;
    if let Some(q) = &toml.q {
        set(&mut model, ParName::Q, q)?;
    }
    if let Some(r) = &toml.r {
        set(&mut model, ParName::R, r)?;
    }
    model.set_initial(&toml.x0, &toml.p0);
    Ok(model)
}

/// Builds the in-memory series, adding a constant regressor when
/// `independent` is absent.
pub fn build_series(toml: &DataToml) -> Result<MultiSeries> {
    let independent = toml
        .independent
        .clone()
        .unwrap_or_else(|| vec![vec![1.0]; toml.dependent.len()]);
    MultiSeries::from_rows(&toml.dependent, &independent).context("invalid [data]")
}

/// Matrix rows back into the nested arrays of a `[data]` section.
pub fn to_rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    m.row_iter().map(|row| row.iter().copied().collect()).collect()
}
