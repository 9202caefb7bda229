use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use concert_a_core::audio::{AudioInput, CaptureStream};
use concert_a_core::config::CaptureConfig;
use concert_a_core::{Result, TunerConfig, TunerError};

pub const SAMPLE_RATE: u32 = 44100;

/// Samples delivered per frame, roughly 16 ms of audio.
pub const SAMPLES_PER_FRAME: usize = 735;

/// Shared view of what the fake input has been asked to do.
#[derive(Debug, Default, Clone)]
pub struct StreamTracker {
    pub opened: Arc<AtomicUsize>,
    pub released: Arc<AtomicBool>,
}

impl StreamTracker {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// An input producing a continuous sine wave.
pub struct SineInput {
    pub frequency: f32,
    pub amplitude: f32,
    pub tracker: StreamTracker,
}

impl SineInput {
    pub fn new(frequency: f32) -> Self {
        Self::with_amplitude(frequency, 0.01)
    }

    /// Amplitudes above 1.0 clip at full scale, like an overdriven input.
    pub fn with_amplitude(frequency: f32, amplitude: f32) -> Self {
        Self {
            frequency,
            amplitude,
            tracker: StreamTracker::default(),
        }
    }
}

struct SineStream {
    frequency: f32,
    amplitude: f32,
    position: u64,
    released: Arc<AtomicBool>,
}

impl CaptureStream for SineStream {
    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn drain_into(&mut self, out: &mut Vec<f32>) {
        for _ in 0..SAMPLES_PER_FRAME {
            let t = self.position as f64 / SAMPLE_RATE as f64;
            let phase = 2.0 * std::f64::consts::PI * self.frequency as f64 * t;
            out.push((self.amplitude * phase.sin() as f32).clamp(-1.0, 1.0));
            self.position += 1;
        }
    }
}

impl Drop for SineStream {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

impl AudioInput for SineInput {
    fn open(&mut self, _config: &CaptureConfig) -> Result<Box<dyn CaptureStream>> {
        self.tracker.opened.fetch_add(1, Ordering::SeqCst);
        self.tracker.released.store(false, Ordering::SeqCst);
        Ok(Box::new(SineStream {
            frequency: self.frequency,
            amplitude: self.amplitude,
            position: 0,
            released: self.tracker.released.clone(),
        }))
    }
}

/// An input whose device never opens, like a denied microphone.
pub struct DeniedInput;

impl AudioInput for DeniedInput {
    fn open(&mut self, _config: &CaptureConfig) -> Result<Box<dyn CaptureStream>> {
        Err(TunerError::NoInputDevice)
    }
}

/// Defaults with smoothing disabled so a single window reflects the input.
pub fn test_config() -> TunerConfig {
    let mut config = TunerConfig::default();
    config.analyzer.smoothing_time_constant = 0.0;
    config
}
