//! # Musical Tuning Module
//!
//! Equal-temperament note table and cent arithmetic used to name the
//! target pitch and to express how far a measured frequency is from it.
//!
//! ## Features
//! - 88-key note mapping (A0 to C8), A4 = 440 Hz
//! - Note name to frequency lookups, sharps or flats
//! - Cent deviation calculations

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Frequency of concert A (A4) in Hz.
pub const CONCERT_A: f32 = 440.0;

/// Represents a single musical note with its name and frequency.
#[derive(Debug, Clone)]
pub struct Note {
    /// Note name (e.g., "A4", "C#3")
    pub name: String,
    /// Frequency in Hz
    pub frequency: f32,
}

/// Statically computed notes for the 88-key range (A0 to C8).
static NOTES: Lazy<Vec<Note>> = Lazy::new(|| {
    const NOTE_NAMES: [&str; 12] = [
        "A", "A#", "B", "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#",
    ];
    let mut notes = Vec::with_capacity(88);

    for i in 0..88 {
        // A4 is key index 48; f = 440 * 2^(n/12) with n semitones from A4.
        let frequency = CONCERT_A * 2.0_f32.powf((i as f32 - 48.0) / 12.0);

        // The octave number changes at C.
        let octave = (i + 9) / 12;
        let name = format!("{}{}", NOTE_NAMES[i % 12], octave);

        notes.push(Note { name, frequency });
    }
    notes
});

/// Note name to key index.
static NOTE_MAP: Lazy<BTreeMap<String, usize>> = Lazy::new(|| {
    NOTES
        .iter()
        .enumerate()
        .map(|(i, note)| (note.name.clone(), i))
        .collect()
});

/// Rewrites a flat spelling ("Bb4") as the sharp the table uses ("A#4").
fn normalize_note_name(name: &str) -> Option<String> {
    let name = name.trim();
    let mut chars = name.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let rest: String = chars.collect();

    if let Some(octave) = rest.strip_prefix('b') {
        let octave: i32 = octave.parse().ok()?;
        // Flat of C belongs to the previous octave (Cb4 == B3).
        let (sharp, octave) = match letter {
            'A' => ("G#", octave),
            'B' => ("A#", octave),
            'C' => ("B", octave - 1),
            'D' => ("C#", octave),
            'E' => ("D#", octave),
            'F' => ("E", octave),
            'G' => ("F#", octave),
            _ => return None,
        };
        return Some(format!("{}{}", sharp, octave));
    }

    Some(format!("{}{}", letter, rest))
}

/// Looks up the equal-tempered frequency of a note name such as "A4",
/// "C#5" or "Bb3". Returns `None` for names outside the 88-key range.
pub fn frequency_for_note(name: &str) -> Option<f32> {
    let normalized = normalize_note_name(name)?;
    NOTE_MAP.get(&normalized).map(|&i| NOTES[i].frequency)
}

/// Finds the closest note to a given frequency.
///
/// # Returns
/// * `(note_name, target_frequency)` - Closest note name and its frequency
pub fn find_nearest_note(freq: f32) -> (String, f32) {
    let closest = NOTES
        .iter()
        .min_by(|a, b| {
            let diff_a = (a.frequency - freq).abs();
            let diff_b = (b.frequency - freq).abs();
            diff_a.total_cmp(&diff_b)
        })
        .unwrap_or(&NOTES[48]);

    (closest.name.clone(), closest.frequency)
}

/// Calculates the deviation from a target frequency in cents.
///
/// 100 cents = 1 semitone. Positive values are sharp, negative values flat.
pub fn calculate_cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}
