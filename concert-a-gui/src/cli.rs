//! Command-line argument parsing.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use concert_a_core::{tuning, TunerConfig};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "concert-a")]
#[command(about = "Microphone tuner that listens for a target pitch", long_about = None)]
pub struct Args {
    /// TOML configuration file (defaults to ./concert-a.toml if present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Target frequency in Hz, overriding the configuration
    #[arg(long, value_name = "HZ", conflicts_with = "note")]
    pub target: Option<f32>,

    /// Target note name such as A4, D3 or Bb2
    #[arg(long, value_name = "NAME")]
    pub note: Option<String>,
}

impl Args {
    /// Loads the configuration and applies the target overrides.
    pub fn resolve_config(&self) -> Result<TunerConfig> {
        let mut config = TunerConfig::load(self.config.as_deref())
            .context("failed to load tuner configuration")?;

        if let Some(name) = &self.note {
            config.target.frequency = tuning::frequency_for_note(name)
                .ok_or_else(|| anyhow!("unknown note name '{}'", name))?;
        } else if let Some(frequency) = self.target {
            config.target.frequency = frequency;
        }

        config.validate()?;
        Ok(config)
    }
}
