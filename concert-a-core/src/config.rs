//! # Configuration Module
//!
//! Runtime settings for the tuner. Defaults match a violin/guitar tuner
//! listening for concert A: an 8192-sample transform window, 44.1 kHz capture
//! and a ~60 FPS sampling loop.
//!
//! Settings are layered with the `config` crate:
//! defaults, then an optional TOML file, then `CONCERT_A__*` environment
//! variables (e.g. `CONCERT_A__TARGET__FREQUENCY=442`).

use std::path::Path;
use std::time::Duration;

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TunerError};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "CONCERT_A";

/// Largest and smallest transform window the analyzer accepts.
pub const MIN_FFT_SIZE: usize = 32;
pub const MAX_FFT_SIZE: usize = 32768;

/// Top-level tuner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    pub analyzer: AnalyzerConfig,
    pub capture: CaptureConfig,
    pub target: TargetConfig,
    /// Interval between sampling loop iterations in milliseconds.
    pub frame_interval_ms: u64,
}

/// Frequency analyzer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Transform window size in samples. Snapshots hold half as many bins.
    pub fft_size: usize,
    /// Weight of the previous magnitude when smoothing (0.0 to 1.0).
    pub smoothing_time_constant: f32,
    /// Magnitude mapped to byte value 0.
    pub min_decibels: f32,
    /// Magnitude mapped to byte value 255.
    pub max_decibels: f32,
}

/// Audio capture parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Sample rate requested from the input device, in Hz.
    pub preferred_sample_rate: u32,
}

/// The pitch the tuner listens for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Target frequency in Hz.
    pub frequency: f32,
    /// Deviation (in cents) still reported as in tune.
    pub cents_tolerance: f32,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            analyzer: AnalyzerConfig::default(),
            capture: CaptureConfig::default(),
            target: TargetConfig::default(),
            frame_interval_ms: 16,
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_size: 8192,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            preferred_sample_rate: 44100,
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            frequency: 440.0,
            cents_tolerance: 5.0,
        }
    }
}

impl TunerConfig {
    /// Loads the configuration from defaults, an optional file and the
    /// environment, then validates it.
    ///
    /// A missing file is only an error when `path` was given explicitly.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&TunerConfig::default())?);

        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name("concert-a").required(false)),
        };

        let config: TunerConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        log::debug!("[CONFIG] Loaded configuration: {:?}", config);
        Ok(config)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    /// Checks every section for values the tuner cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.analyzer.validate()?;
        if self.capture.preferred_sample_rate == 0 {
            return Err(TunerError::InvalidConfig(
                "capture.preferred_sample_rate must be positive".into(),
            ));
        }
        if !(self.target.frequency.is_finite() && self.target.frequency > 0.0) {
            return Err(TunerError::InvalidConfig(format!(
                "target.frequency must be a positive number, got {}",
                self.target.frequency
            )));
        }
        if !(self.target.cents_tolerance >= 0.0) {
            return Err(TunerError::InvalidConfig(
                "target.cents_tolerance must not be negative".into(),
            ));
        }
        Ok(())
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<()> {
        let size = self.fft_size;
        if !size.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&size) {
            return Err(TunerError::InvalidWindowSize(size));
        }
        if !(0.0..=1.0).contains(&self.smoothing_time_constant) {
            return Err(TunerError::InvalidConfig(format!(
                "analyzer.smoothing_time_constant must be within 0..=1, got {}",
                self.smoothing_time_constant
            )));
        }
        if !(self.min_decibels < self.max_decibels) {
            return Err(TunerError::InvalidConfig(format!(
                "analyzer.min_decibels ({}) must be below max_decibels ({})",
                self.min_decibels, self.max_decibels
            )));
        }
        Ok(())
    }

    /// Number of bins in each snapshot.
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }
}
