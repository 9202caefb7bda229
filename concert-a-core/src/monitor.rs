//! # Target Monitor Module
//!
//! Watches published snapshots for energy at the target pitch and logs a
//! diagnostic line whenever it is present.

use crate::config::TargetConfig;
use crate::pitch::{estimate_peak, locate_target, Intonation, PeakEstimate, TargetReading};
use crate::tuning;
use crate::FrequencySnapshot;

/// Result of checking one snapshot against the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorReading {
    pub reading: TargetReading,
    /// Sub-bin estimate; `None` when the peak cannot be interpolated.
    pub peak: Option<PeakEstimate>,
    pub intonation: Option<Intonation>,
}

#[derive(Debug, Clone)]
pub struct TargetMonitor {
    target: TargetConfig,
    note_name: String,
    last: Option<MonitorReading>,
}

impl TargetMonitor {
    pub fn new(target: TargetConfig) -> Self {
        let (note_name, _) = tuning::find_nearest_note(target.frequency);
        Self {
            target,
            note_name,
            last: None,
        }
    }

    pub fn target_frequency(&self) -> f32 {
        self.target.frequency
    }

    /// Name of the note nearest the target, e.g. "A4".
    pub fn note_name(&self) -> &str {
        &self.note_name
    }

    /// The reading from the most recent non-empty snapshot.
    pub fn last_reading(&self) -> Option<&MonitorReading> {
        self.last.as_ref()
    }

    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Checks `snapshot` for the target pitch.
    ///
    /// Empty snapshots are skipped entirely. The bin mapping uses the sample
    /// rate the snapshot was captured at.
    pub fn observe(&mut self, snapshot: &FrequencySnapshot) -> Option<MonitorReading> {
        if snapshot.is_empty() {
            return None;
        }
        let sample_rate = snapshot.sample_rate() as f32;
        let target = self.target.frequency;

        let reading = locate_target(snapshot, target, sample_rate)?;
        let (peak, intonation) = if reading.is_present() {
            let peak = estimate_peak(snapshot, target, sample_rate);
            let intonation =
                peak.map(|p| Intonation::classify(p.cents, self.target.cents_tolerance));
            (peak, intonation)
        } else {
            (None, None)
        };

        if reading.is_present() {
            log::info!(
                "[MONITOR] frequency detected around {}hz with amplitude: {}",
                target,
                reading.amplitude
            );
            if let (Some(peak), Some(intonation)) = (peak, intonation) {
                log::debug!(
                    "[MONITOR] {} estimate {:.2} Hz ({:+.1} cents, {:?})",
                    self.note_name,
                    peak.frequency,
                    peak.cents,
                    intonation
                );
            }
        }

        let result = MonitorReading {
            reading,
            peak,
            intonation,
        };
        self.last = Some(result);
        Some(result)
    }
}
