//! # Fast Fourier Transform (FFT) Module
//!
//! Turns the most recent window of captured audio into a byte-per-bin
//! amplitude snapshot, the same representation a browser analyser node
//! produces.
//!
//! ## Pipeline
//! 1. Rolling time-domain window of the last `fft_size` mono samples
//! 2. Blackman windowing to reduce spectral leakage
//! 3. Forward FFT (RustFFT), magnitudes normalised by the window size
//! 4. Exponential smoothing against the previous frame
//! 5. Decibel conversion and mapping onto `0..=255`

use std::collections::VecDeque;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::config::AnalyzerConfig;
use crate::error::Result;
use crate::FrequencySnapshot;

/// Blackman window alpha.
const BLACKMAN_ALPHA: f32 = 0.16;

/// Floor applied before taking the log so silence stays finite.
const EPSILON: f32 = 1e-12;

/// Applies a Blackman window to the input buffer to reduce spectral leakage.
///
/// # Arguments
/// * `buffer` - Audio buffer to window (modified in-place)
fn apply_blackman_window(buffer: &mut [f32]) {
    let n = buffer.len();
    if n == 0 {
        return;
    }
    let a0 = 0.5 * (1.0 - BLACKMAN_ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * BLACKMAN_ALPHA;
    let n = n as f32;
    for (i, sample) in buffer.iter_mut().enumerate() {
        let phase = 2.0 * std::f32::consts::PI * i as f32 / n;
        let multiplier = a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos();
        *sample *= multiplier;
    }
}

/// Converts a linear magnitude to decibels, flooring silence at -240 dB.
pub fn magnitude_to_decibels(magnitude: f32) -> f32 {
    20.0 * magnitude.max(EPSILON).log10()
}

/// Maps a linear magnitude to a byte using the analyzer's decibel range.
///
/// Zero (or negative) magnitudes are treated as silence and map to 0.
pub fn magnitude_to_byte(magnitude: f32, min_decibels: f32, max_decibels: f32) -> u8 {
    if !(magnitude > 0.0) {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = 255.0 / (max_decibels - min_decibels) * (db - min_decibels);
    scaled.floor().clamp(0.0, 255.0) as u8
}

/// Frequency analyzer producing [`FrequencySnapshot`]s.
///
/// Holds the rolling sample window, the planned FFT and the smoothing state
/// carried between frames. One analyzer belongs to one capture; dropping it
/// releases the analysis context.
pub struct FrequencyAnalyzer {
    config: AnalyzerConfig,
    sample_rate: u32,
    window: VecDeque<f32>,
    fft: Arc<dyn Fft<f32>>,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl std::fmt::Debug for FrequencyAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrequencyAnalyzer")
            .field("fft_size", &self.config.fft_size)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

impl FrequencyAnalyzer {
    /// Creates an analyzer for a stream running at `sample_rate`.
    ///
    /// Fails if the configured window size is not a supported power of two.
    pub fn new(config: AnalyzerConfig, sample_rate: u32) -> Result<Self> {
        config.validate()?;
        let size = config.fft_size;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);

        let mut window = VecDeque::with_capacity(size);
        window.resize(size, 0.0);

        Ok(Self {
            smoothed: vec![0.0; size / 2],
            scratch: Vec::with_capacity(size),
            config,
            sample_rate,
            window,
            fft,
        })
    }

    pub fn fft_size(&self) -> usize {
        self.config.fft_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Appends mono samples, keeping only the most recent `fft_size`.
    pub fn push_samples(&mut self, samples: &[f32]) {
        let size = self.config.fft_size;
        let samples = if samples.len() > size {
            &samples[samples.len() - size..]
        } else {
            samples
        };
        let overflow = (self.window.len() + samples.len()).saturating_sub(size);
        self.window.drain(..overflow);
        self.window.extend(samples.iter().copied());
    }

    /// Analyzes the current window and returns the byte snapshot.
    ///
    /// Each call advances the smoothing state, so calling it once per frame
    /// matches the cadence the smoothing constant assumes.
    pub fn snapshot(&mut self) -> FrequencySnapshot {
        let size = self.config.fft_size;

        let mut signal: Vec<f32> = self.window.iter().copied().collect();
        apply_blackman_window(&mut signal);

        self.scratch.clear();
        self.scratch
            .extend(signal.into_iter().map(|sample| Complex { re: sample, im: 0.0 }));
        self.fft.process(&mut self.scratch);

        let tau = self.config.smoothing_time_constant;
        let scale = 1.0 / size as f32;
        let (min_db, max_db) = (self.config.min_decibels, self.config.max_decibels);

        let mut decibels = Vec::with_capacity(size / 2);
        let bins = self
            .scratch
            .iter()
            .take(size / 2)
            .zip(self.smoothed.iter_mut())
            .map(|(c, previous)| {
                let magnitude = c.norm() * scale;
                let mut value = tau * *previous + (1.0 - tau) * magnitude;
                if !value.is_finite() {
                    value = 0.0;
                }
                *previous = value;
                decibels.push(magnitude_to_decibels(value));
                magnitude_to_byte(value, min_db, max_db)
            })
            .collect();

        FrequencySnapshot::new(bins, self.sample_rate).with_decibels(decibels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| {
                amplitude
                    * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin()
            })
            .collect()
    }

    fn unsmoothed(fft_size: usize) -> AnalyzerConfig {
        AnalyzerConfig {
            fft_size,
            smoothing_time_constant: 0.0,
            ..AnalyzerConfig::default()
        }
    }

    #[test]
    fn blackman_window_tapers_edges() {
        let mut buffer = vec![1.0; 64];
        apply_blackman_window(&mut buffer);
        assert!(buffer[0].abs() < 1e-6);
        assert!((buffer[32] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn silence_maps_to_zero() {
        assert_eq!(magnitude_to_byte(0.0, -100.0, -30.0), 0);
        assert_eq!(magnitude_to_byte(f32::NAN, -100.0, -30.0), 0);
        // -100 dB sits exactly on the floor.
        assert_eq!(magnitude_to_byte(1e-5, -100.0, -30.0), 0);
    }

    #[test]
    fn loud_magnitudes_saturate() {
        assert_eq!(magnitude_to_byte(1.0, -100.0, -30.0), 255);
        // -65 dB is halfway up the default range.
        let mid = magnitude_to_byte(10f32.powf(-65.0 / 20.0), -100.0, -30.0);
        assert!((126..=128).contains(&mid), "got {}", mid);
    }

    #[test]
    fn decibels_floor_silence() {
        assert_eq!(magnitude_to_decibels(0.0), -240.0);
        assert!((magnitude_to_decibels(0.1) + 20.0).abs() < 1e-4);
    }

    #[test]
    fn snapshot_keeps_levels_above_the_byte_ceiling() {
        let sample_rate = 44100;
        let mut analyzer = FrequencyAnalyzer::new(unsmoothed(8192), sample_rate).unwrap();
        analyzer.push_samples(&sine(440.0, sample_rate, 8192, 0.5));
        let snapshot = analyzer.snapshot();

        assert_eq!(snapshot.amplitude(82), Some(255));
        let decibels = snapshot.decibels().unwrap();
        assert_eq!(decibels.len(), 4096);
        // Loud enough to clamp the byte, yet the dB curve still peaks.
        assert!(decibels[82] > -30.0);
        assert!(decibels[82] > decibels[81] && decibels[82] > decibels[83]);
    }

    #[test]
    fn rejects_invalid_window_size() {
        assert!(FrequencyAnalyzer::new(unsmoothed(1000), 44100).is_err());
    }

    #[test]
    fn snapshot_length_is_half_the_window() {
        let mut analyzer = FrequencyAnalyzer::new(unsmoothed(2048), 44100).unwrap();
        let snapshot = analyzer.snapshot();
        assert_eq!(snapshot.len(), 1024);
        assert_eq!(snapshot.sample_rate(), 44100);
    }

    #[test]
    fn fresh_analyzer_reports_silence() {
        let mut analyzer = FrequencyAnalyzer::new(AnalyzerConfig::default(), 44100).unwrap();
        assert!(analyzer.snapshot().bins().iter().all(|&b| b == 0));
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let sample_rate = 44100;
        let mut analyzer = FrequencyAnalyzer::new(unsmoothed(8192), sample_rate).unwrap();
        analyzer.push_samples(&sine(440.0, sample_rate, 8192, 0.01));
        let snapshot = analyzer.snapshot();

        let (peak, amplitude) = snapshot
            .bins()
            .iter()
            .enumerate()
            .max_by_key(|(_, b)| **b)
            .unwrap();
        // 440 / (22050 / 4096) = 81.7
        assert!((81..=82).contains(&peak), "peak at {}", peak);
        assert!(*amplitude > 100 && *amplitude < 255);
    }

    #[test]
    fn window_keeps_only_latest_samples() {
        let mut analyzer = FrequencyAnalyzer::new(unsmoothed(64), 8000).unwrap();
        analyzer.push_samples(&[1.0; 100]);
        analyzer.push_samples(&[0.0; 64]);
        assert!(analyzer.snapshot().bins().iter().all(|&b| b == 0));
    }

    #[test]
    fn smoothing_lags_behind_new_input() {
        let sample_rate = 44100;
        let config = AnalyzerConfig {
            fft_size: 2048,
            smoothing_time_constant: 0.8,
            ..AnalyzerConfig::default()
        };
        let mut smoothed = FrequencyAnalyzer::new(config, sample_rate).unwrap();
        let mut raw = FrequencyAnalyzer::new(unsmoothed(2048), sample_rate).unwrap();

        let tone = sine(1000.0, sample_rate, 2048, 0.5);
        smoothed.push_samples(&tone);
        raw.push_samples(&tone);

        let bin = (1000.0_f32 / (22050.0 / 1024.0)).round() as usize;
        let first = smoothed.snapshot().amplitude(bin).unwrap();
        let direct = raw.snapshot().amplitude(bin).unwrap();
        assert!(first < direct);

        let second = smoothed.snapshot().amplitude(bin).unwrap();
        assert!(second > first);
    }
}
