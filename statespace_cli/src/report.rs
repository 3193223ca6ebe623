//! Plain-text report of a completed run.

use std::fmt::Write;

use anyhow::{anyhow, Result};
use statespace_core::prelude::*;

/// Renders a tab-separated table with one row per step: the sample index,
/// the filtered mean and standard deviation of each state, and the smoothed
/// ones when a backward pass is available.
pub fn render(kf: &KalmanFilter) -> Result<String> {
    let st = kf
        .filter_state()
        .ok_or_else(|| anyhow!("no forward pass to report"))?;
    let frame = kf
        .resolved_frame()
        .ok_or_else(|| anyhow!("filter was not initialised"))?;
    let dims = kf
        .dims()
        .ok_or_else(|| anyhow!("filter was not initialised"))?;
    let ll = kf
        .log_likelihood()
        .ok_or_else(|| anyhow!("no forward pass to report"))?;
    let sm = kf.smooth_state();

    let mut out = String::new();
    writeln!(
        out,
        "# frame [{}, {})  n_latent {}  n_var {}  n_indep {}",
        frame.from, frame.to, dims.n_latent, dims.n_var, dims.n_indep
    )?;
    writeln!(out, "# log_likelihood {ll:.6}")?;

    let mut header = vec!["t".to_string()];
    for i in 0..dims.n_latent {
        header.push(format!("x_upd[{i}]"));
        header.push(format!("sd_upd[{i}]"));
    }
    if sm.is_some() {
        for i in 0..dims.n_latent {
            header.push(format!("x_smooth[{i}]"));
            header.push(format!("sd_smooth[{i}]"));
        }
    }
    writeln!(out, "{}", header.join("\t"))?;

    for t in 1..=dims.n_sample {
        let mut row = vec![(frame.from + t - 1).to_string()];
        for i in 0..dims.n_latent {
            row.push(format!("{:.6}", st.x_upd[t][i]));
            row.push(format!("{:.6}", st.p_upd[t][(i, i)].max(0.0).sqrt()));
        }
        if let Some(sm) = sm {
            for i in 0..dims.n_latent {
                row.push(format!("{:.6}", sm.x_smooth[t][i]));
                row.push(format!("{:.6}", sm.p_smooth[t][(i, i)].max(0.0).sqrt()));
            }
        }
        writeln!(out, "{}", row.join("\t"))?;
    }
    Ok(out)
}
