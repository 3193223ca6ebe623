use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Linear Gaussian state-space filtering and smoothing.
#[derive(Parser, Debug)]
#[command(name = "statespace", author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Filter (and smooth) the data of a scenario.
    Run(RunArgs),
    /// Draw a synthetic series from a scenario's model.
    Simulate(SimulateArgs),
}

/// Arguments for the `run` subcommand.
#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// The path to the scenario TOML file.
    #[arg(
        short,
        long,
        default_value = "assets/scenarios/local_level.toml"
    )]
    pub scenario: PathBuf,

    /// Stop after the forward pass.
    #[arg(long, default_value_t = false)]
    pub no_smooth: bool,

    /// Write the report here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the `simulate` subcommand.
#[derive(clap::Args, Debug)]
pub struct SimulateArgs {
    /// The path to the scenario TOML file providing the model.
    #[arg(
        short,
        long,
        default_value = "assets/scenarios/local_level.toml"
    )]
    pub scenario: PathBuf,

    /// Write the new scenario here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override `[simulate].n_sample`.
    #[arg(short = 'n', long)]
    pub n_sample: Option<usize>,

    /// Override `[simulate].seed`.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_flags() {
        let cli = Cli::parse_from([
            "statespace",
            "-vv",
            "run",
            "--scenario",
            "a.toml",
            "--no-smooth",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.scenario, PathBuf::from("a.toml"));
                assert!(args.no_smooth);
                assert!(args.output.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_simulate_overrides() {
        let cli = Cli::parse_from(["statespace", "simulate", "-n", "40", "--seed", "3", "-o", "out.toml"]);
        match cli.command {
            Command::Simulate(args) => {
                assert_eq!(args.n_sample, Some(40));
                assert_eq!(args.seed, Some(3));
                assert_eq!(args.output, Some(PathBuf::from("out.toml")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
