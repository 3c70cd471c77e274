//! Command-line interface for partysim

use clap::Parser;
use std::path::PathBuf;

use crate::headless::HeadlessConfig;

/// Party combat encounter simulator
#[derive(Parser, Debug)]
#[command(name = "partysim")]
#[command(about = "Party combat encounter simulator")]
#[command(version)]
pub struct Args {
    /// Run the encounter described by this JSON config file
    #[arg(long, value_name = "CONFIG_FILE")]
    pub headless: PathBuf,

    /// Output path for the combat log
    #[arg(long, value_name = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,

    /// Tick budget (overrides the config)
    #[arg(long)]
    pub max_ticks: Option<u32>,

    /// Random seed (overrides the config)
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Args {
    /// Apply command-line overrides on top of a loaded config.
    pub fn apply_overrides(&self, config: &mut HeadlessConfig) {
        if let Some(output) = &self.output {
            config.output_path = Some(output.to_string_lossy().into_owned());
        }
        if let Some(max_ticks) = self.max_ticks {
            config.max_ticks = max_ticks;
        }
        if let Some(seed) = self.seed {
            config.random_seed = Some(seed);
        }
    }
}

pub fn parse_args() -> Args {
    Args::parse()
}
