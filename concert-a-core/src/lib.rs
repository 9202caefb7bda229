// concert-a-core/src/lib.rs

//! The core logic for the concert A tuner.
//! This crate is responsible for audio capture, frequency analysis,
//! and locating the target pitch in each spectrum snapshot. It is
//! completely headless and contains no GUI code.

pub mod audio;
pub mod config;
pub mod error;
pub mod fft;
pub mod monitor;
pub mod pitch;
pub mod session;
pub mod tuning;

pub use config::TunerConfig;
pub use error::{Result, TunerError};
pub use session::{FrameRequest, TunerSession};

/// One amplitude-per-bin reading taken from the analyzer.
///
/// Each bin holds an unsigned byte amplitude (0 = at or below the analyzer's
/// decibel floor). The number of bins is half the transform window size.
/// Snapshots are immutable; a newer one simply replaces the old.
///
/// Snapshots taken from the analyzer also carry the smoothed level of each
/// bin in decibels before it was clamped into a byte, for sub-bin estimates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencySnapshot {
    bins: Vec<u8>,
    decibels: Vec<f32>,
    /// Sample rate of the audio the snapshot was computed from, in Hz.
    sample_rate: u32,
}

impl FrequencySnapshot {
    pub fn new(bins: Vec<u8>, sample_rate: u32) -> Self {
        Self {
            bins,
            decibels: Vec::new(),
            sample_rate,
        }
    }

    /// Attaches the unclamped per-bin levels in dB.
    pub fn with_decibels(mut self, decibels: Vec<f32>) -> Self {
        self.decibels = decibels;
        self
    }

    /// Unclamped levels in dB, when present for every bin.
    pub fn decibels(&self) -> Option<&[f32]> {
        if !self.bins.is_empty() && self.decibels.len() == self.bins.len() {
            Some(&self.decibels)
        } else {
            None
        }
    }

    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Amplitude of `bin`, or `None` past the last bin.
    pub fn amplitude(&self, bin: usize) -> Option<u8> {
        self.bins.get(bin).copied()
    }
}
