use std::fs;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use statespace_core::prelude::*;
use tracing::info;

use crate::cli::RunArgs;
use crate::config::ScenarioConfig;
use crate::convert;
use crate::report;

/// Loads a scenario, runs the forward (and backward) pass and reports.
pub fn run(args: RunArgs) -> Result<()> {
    info!(path = %args.scenario.display(), "loading scenario");
    let config = ScenarioConfig::load(&args.scenario)?;

    let kf = estimate(&config, !args.no_smooth)?;
    let text = report::render(&kf)?;

    match &args.output {
        Some(path) => {
            fs::write(path, text)
                .with_context(|| format!("failed to write report {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => print!("{text}"),
    }
    Ok(())
}

/// Builds a filter from the scenario and runs it to completion.
pub fn estimate(config: &ScenarioConfig, smooth: bool) -> Result<KalmanFilter> {
    let data = config
        .data
        .as_ref()
        .ok_or_else(|| anyhow!("scenario has no [data] section"))?;

    let mut kf = KalmanFilter::with_model(convert::build_model(&config.model)?);
    kf.set_data(Arc::new(convert::build_series(data)?));
    if let Some(frame) = config.frame {
        kf.set_frame(frame.from, frame.to)
            .context("invalid [frame]")?;
    }

    kf.init().context("model does not fit the data")?;
    kf.filter().context("forward pass failed")?;
    if smooth {
        kf.smooth().context("backward pass failed")?;
    }
    Ok(kf)
}
