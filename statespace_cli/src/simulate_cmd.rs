use std::fs;

use anyhow::{anyhow, Context, Result};
use nalgebra::DMatrix;
use statespace_core::data::rows_to_matrix;
use statespace_core::prelude::*;
use tracing::info;

use crate::cli::SimulateArgs;
use crate::config::{DataToml, ScenarioConfig, SimulateToml};
use crate::convert;

/// Draws a series from the scenario's model and writes it out as a new
/// scenario with the same model.
pub fn run(args: SimulateArgs) -> Result<()> {
    info!(path = %args.scenario.display(), "loading scenario");
    let config = ScenarioConfig::load(&args.scenario)?;

    let settings = resolve_settings(config.simulate.as_ref(), args.n_sample, args.seed)?;
    let out = simulated_scenario(&config, &settings)?;
    let text = out.to_toml_string()?;

    match &args.output {
        Some(path) => {
            fs::write(path, text)
                .with_context(|| format!("failed to write scenario {}", path.display()))?;
            info!(path = %path.display(), n_sample = settings.n_sample, "scenario written");
        }
        None => print!("{text}"),
    }
    Ok(())
}

/// Command-line overrides win over the `[simulate]` section.
fn resolve_settings(
    section: Option<&SimulateToml>,
    n_sample: Option<usize>,
    seed: Option<u64>,
) -> Result<SimulateToml> {
    let n_sample = n_sample
        .or(section.map(|s| s.n_sample))
        .ok_or_else(|| anyhow!("no sample count: set [simulate].n_sample or use --n-sample"))?;
    let seed = seed.or(section.map(|s| s.seed)).unwrap_or_default();
    Ok(SimulateToml { n_sample, seed })
}

/// The scenario's model with freshly simulated `[data]`.
///
/// Independent vars come from the scenario's `[data]` when present,
/// otherwise a constant column is used.
pub fn simulated_scenario(config: &ScenarioConfig, settings: &SimulateToml) -> Result<ScenarioConfig> {
    let model = convert::build_model(&config.model)?;

    let inputs = match config.data.as_ref().and_then(|d| d.independent.as_ref()) {
        Some(rows) => rows_to_matrix(rows).context("invalid [data].independent")?,
        None => DMatrix::from_element(settings.n_sample, 1, 1.0),
    };

    let sim = simulate(&model, &inputs, settings.n_sample, settings.seed)
        .context("simulation failed")?;

    let independent = config
        .data
        .as_ref()
        .and_then(|d| d.independent.as_ref())
        .map(|_| convert::to_rows(&sim.inputs));

    Ok(ScenarioConfig {
        frame: None,
        model: config.model.clone(),
        data: Some(DataToml {
            dependent: convert::to_rows(&sim.observations),
            independent,
        }),
        simulate: Some(settings.clone()),
    })
}
