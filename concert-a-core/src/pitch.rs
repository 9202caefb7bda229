//! # Pitch Detection Module
//!
//! Locates a target pitch inside a [`FrequencySnapshot`].
//!
//! ## Features
//! - Frequency to bin mapping (`(sample_rate / 2) / bin_count` Hz per bin)
//! - Target bin amplitude read with a presence check
//! - Parabolic interpolation across neighbouring bins for a sub-bin
//!   frequency estimate, reported as sharp, flat or in tune

use crate::tuning::calculate_cents_deviation;
use crate::FrequencySnapshot;

/// Bins searched on each side of the target bin when estimating the peak.
const SEARCH_RADIUS: usize = 2;

/// Relates bin indices to frequencies for one snapshot geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinMapping {
    sample_rate: f32,
    bin_count: usize,
}

impl BinMapping {
    pub fn new(sample_rate: f32, bin_count: usize) -> Self {
        Self {
            sample_rate,
            bin_count,
        }
    }

    /// Width of one bin in Hz.
    pub fn frequency_per_bin(&self) -> f32 {
        (self.sample_rate / 2.0) / self.bin_count as f32
    }

    /// Nearest bin to `frequency`, rounding to the closest index.
    ///
    /// Returns `None` when there are no bins, the inputs are not usable
    /// numbers, or the frequency falls past the last bin.
    pub fn bin_index(&self, frequency: f32) -> Option<usize> {
        if self.bin_count == 0 || !(self.sample_rate > 0.0) {
            return None;
        }
        if !frequency.is_finite() || frequency <= 0.0 {
            return None;
        }
        let bin = (frequency / self.frequency_per_bin()).round();
        if bin < self.bin_count as f32 {
            Some(bin as usize)
        } else {
            None
        }
    }

    /// Centre frequency of a (possibly fractional) bin position.
    pub fn frequency_of(&self, bin: f32) -> f32 {
        bin * self.frequency_per_bin()
    }
}

/// Direction of a measured pitch relative to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intonation {
    InTune,
    Sharp,
    Flat,
}

impl Intonation {
    pub fn classify(cents: f32, tolerance: f32) -> Self {
        if cents.abs() <= tolerance {
            Intonation::InTune
        } else if cents > 0.0 {
            Intonation::Sharp
        } else {
            Intonation::Flat
        }
    }
}

/// Sub-bin estimate of the loudest frequency near the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakEstimate {
    /// Interpolated frequency in Hz.
    pub frequency: f32,
    /// Deviation from the target in cents.
    pub cents: f32,
}

/// The amplitude read at the bin nearest the target frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetReading {
    pub target_frequency: f32,
    pub bin: usize,
    pub amplitude: u8,
}

impl TargetReading {
    /// True when the target bin carries any energy above the floor.
    pub fn is_present(&self) -> bool {
        self.amplitude > 0
    }
}

/// Reads the bin nearest `target_frequency`.
///
/// `bin_count` is taken from the snapshot; `sample_rate` is passed
/// explicitly so callers can pin it. Empty snapshots yield `None`
/// without attempting a lookup.
pub fn locate_target(
    snapshot: &FrequencySnapshot,
    target_frequency: f32,
    sample_rate: f32,
) -> Option<TargetReading> {
    if snapshot.is_empty() {
        return None;
    }
    let mapping = BinMapping::new(sample_rate, snapshot.len());
    let bin = mapping.bin_index(target_frequency)?;
    let amplitude = snapshot.amplitude(bin)?;
    Some(TargetReading {
        target_frequency,
        bin,
        amplitude,
    })
}

/// Estimates where the peak near `target_frequency` really sits.
///
/// Searches the target bin and its neighbours for the loudest bin, then fits
/// a parabola through that bin and the two either side of it, on a
/// logarithmic scale. The fit uses the snapshot's unclamped decibel levels
/// when it carries them. Byte amplitudes are only a fallback: they clamp at
/// 255, and a clamped peak has a flat top that cannot be interpolated.
///
/// # Returns
/// * `Some(estimate)` - Interpolated frequency and its cents deviation
/// * `None` - Nothing audible near the target, the peak is at the edge of
///   the snapshot, or a byte-only peak is saturated
pub fn estimate_peak(
    snapshot: &FrequencySnapshot,
    target_frequency: f32,
    sample_rate: f32,
) -> Option<PeakEstimate> {
    let bins = snapshot.bins();
    let decibels = snapshot.decibels();
    let level = |i: usize| match decibels {
        Some(db) => db[i],
        None => bins[i] as f32,
    };

    let mapping = BinMapping::new(sample_rate, bins.len());
    let target_bin = mapping.bin_index(target_frequency)?;

    let start_bin = target_bin.saturating_sub(SEARCH_RADIUS);
    let end_bin = (target_bin + SEARCH_RADIUS).min(bins.len() - 1);

    // Ties resolve towards the target bin.
    let peak_bin = (start_bin..=end_bin).max_by(|&a, &b| {
        level(a)
            .total_cmp(&level(b))
            .then_with(|| b.abs_diff(target_bin).cmp(&a.abs_diff(target_bin)))
    })?;

    if bins[peak_bin] == 0 || peak_bin == 0 || peak_bin >= bins.len() - 1 {
        return None;
    }
    if decibels.is_none() && bins[peak_bin - 1..=peak_bin + 1].contains(&u8::MAX) {
        return None;
    }

    let y1 = level(peak_bin - 1);
    let y2 = level(peak_bin);
    let y3 = level(peak_bin + 1);

    let denominator = 2.0 * y2 - y1 - y3;
    let peak_shift = if denominator.abs() < 1e-6 {
        0.0
    } else {
        ((y3 - y1) / (2.0 * denominator)).clamp(-0.5, 0.5)
    };

    let frequency = mapping.frequency_of(peak_bin as f32 + peak_shift);
    if !(frequency.is_finite() && frequency > 0.0) {
        return None;
    }

    Some(PeakEstimate {
        frequency,
        cents: calculate_cents_deviation(frequency, target_frequency),
    })
}
