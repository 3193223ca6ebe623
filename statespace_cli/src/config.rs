//! Scenario files: a model, its data and the settings for the commands.

use std::path::Path;

use anyhow::{Context, Result};
use figment::{
    providers::{Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use statespace_core::data::Frame;

/// The root of a `scenario.toml` file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct ScenarioConfig {
    /// Estimation window; the full series when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<Frame>,

    pub model: ModelToml,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataToml>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulate: Option<SimulateToml>,
}

/// Parameter matrices in the caller's row-major convention.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelToml {
    /// Initial state mean.
    pub x0: Vec<f64>,
    /// Initial state covariance, `n_latent²` values.
    #[serde(rename = "P0")]
    pub p0: Vec<f64>,

    #[serde(rename = "F")]
    pub f: ParToml,
    #[serde(rename = "B")]
    pub b: ParToml,
    #[serde(rename = "H")]
    pub h: ParToml,
    #[serde(rename = "A")]
    pub a: ParToml,
    /// Identity when absent.
    #[serde(rename = "Q", default, skip_serializing_if = "Option::is_none")]
    pub q: Option<ParToml>,
    /// Identity when absent.
    #[serde(rename = "R", default, skip_serializing_if = "Option::is_none")]
    pub r: Option<ParToml>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParToml {
    pub dim0: usize,
    pub dim1: usize,
    pub values: Vec<f64>,
}

/// Observations, one inner array per time step.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DataToml {
    pub dependent: Vec<Vec<f64>>,
    /// A constant `1.0` column when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub independent: Option<Vec<Vec<f64>>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SimulateToml {
    pub n_sample: usize,
    #[serde(default)]
    pub seed: u64,
}

impl ScenarioConfig {
    pub fn load(path: &Path) -> Result<Self> {
        Figment::new()
            .merge(Toml::file(path))
            .extract()
            .with_context(|| format!("failed to load scenario {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Figment::new()
            .merge(Toml::string(s))
            .extract()
            .context("failed to parse scenario")
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize scenario")
    }
}
