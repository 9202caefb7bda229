//! # Error Module
//!
//! Typed errors for the tuner core. Capture-setup failures are the only
//! runtime errors the tuner produces; the remaining variants cover invalid
//! configuration caught before a session starts.

use thiserror::Error;

/// Errors produced by the tuner core.
#[derive(Debug, Error)]
pub enum TunerError {
    /// The host reported no default input device.
    #[error("no audio input device available")]
    NoInputDevice,

    /// The device offers no configuration the analyzer can consume.
    #[error("no supported f32 input format found on '{device}'")]
    UnsupportedFormat { device: String },

    #[error("failed to read device name: {0}")]
    DeviceName(#[from] cpal::DeviceNameError),

    #[error("failed to query input configurations: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start input stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to spawn capture thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The capture worker exited before reporting whether the stream opened.
    #[error("capture worker stopped unexpectedly")]
    WorkerDisconnected,

    /// Transform window sizes must be a power of two between 32 and 32768.
    #[error("invalid transform window size {0}: must be a power of two in 32..=32768")]
    InvalidWindowSize(usize),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Config(#[from] ::config::ConfigError),
}

pub type Result<T> = std::result::Result<T, TunerError>;

impl TunerError {
    /// Returns true for errors raised while acquiring the input stream.
    pub fn is_capture_setup(&self) -> bool {
        matches!(
            self,
            TunerError::NoInputDevice
                | TunerError::UnsupportedFormat { .. }
                | TunerError::DeviceName(_)
                | TunerError::SupportedConfigs(_)
                | TunerError::BuildStream(_)
                | TunerError::PlayStream(_)
                | TunerError::Spawn(_)
                | TunerError::WorkerDisconnected
        )
    }
}
