//! # Note Frequency Module
//!
//! Reference pitches for the detector and the tolerance bands derived from them.
//!
//! ## Features
//! - Standard D2 to B6 table (A4 = 440 Hz), validated and built once
//! - Equal temperament tables for other reference pitches
//! - Tolerance band (`NoteRange`) derivation from a strictness divisor
//! - Cent deviation calculations

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;

use crate::error::TableError;

/// Represents a single musical note with its name and frequency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    /// Note name (e.g., "A4", "C#3")
    pub name: String,
    /// Frequency in Hz
    pub frequency: f32,
}

impl Note {
    pub fn new(name: impl Into<String>, frequency: f32) -> Self {
        Self {
            name: name.into(),
            frequency,
        }
    }
}

/// Equal-tempered pitches from D2 to B6, rounded to 0.01 Hz.
#[rustfmt::skip]
const STANDARD_NOTES: [(&str, f32); 58] = [
    ("D2", 73.42), ("D#2", 77.78), ("E2", 82.41),
    ("F2", 87.31), ("F#2", 92.50), ("G2", 98.00),
    ("G#2", 103.83), ("A2", 110.00), ("A#2", 116.54),
    ("B2", 123.47), ("C3", 130.81), ("C#3", 138.59),
    ("D3", 146.83), ("D#3", 155.56), ("E3", 164.81),
    ("F3", 174.61), ("F#3", 185.00), ("G3", 196.00),
    ("G#3", 207.65), ("A3", 220.00), ("A#3", 233.08),
    ("B3", 246.94), ("C4", 261.63), ("C#4", 277.18),
    ("D4", 293.66), ("D#4", 311.13), ("E4", 329.63),
    ("F4", 349.23), ("F#4", 369.99), ("G4", 392.00),
    ("G#4", 415.30), ("A4", 440.00), ("A#4", 466.16),
    ("B4", 493.88), ("C5", 523.25), ("C#5", 554.37),
    ("D5", 587.33), ("D#5", 622.25), ("E5", 659.26),
    ("F5", 698.46), ("F#5", 739.99), ("G5", 783.99),
    ("G#5", 830.61), ("A5", 880.00), ("A#5", 932.33),
    ("B5", 987.77), ("C6", 1046.50), ("C#6", 1108.73),
    ("D6", 1174.66), ("D#6", 1244.51), ("E6", 1318.51),
    ("F6", 1396.91), ("F#6", 1479.98), ("G6", 1567.98),
    ("G#6", 1661.22), ("A6", 1760.00), ("A#6", 1864.66),
    ("B6", 1975.53),
];

/// 0-based 88-key piano indices covered by the standard table (D2 and B6).
const FIRST_KEY: usize = 17;
const LAST_KEY: usize = 74;

/// Statically built standard table.
///
/// `STANDARD_NOTES` is checked by `test_standard_table_is_valid`, so the
/// validating constructor is skipped here.
static STANDARD: Lazy<NoteFrequencyTable> = Lazy::new(|| NoteFrequencyTable {
    notes: STANDARD_NOTES
        .iter()
        .map(|&(name, frequency)| Note::new(name, frequency))
        .collect(),
});

/// Canonical mapping from note name to frequency, in ascending pitch order.
///
/// Immutable after construction; share it by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteFrequencyTable {
    notes: Vec<Note>,
}

impl NoteFrequencyTable {
    /// Builds a table after checking that it is non-empty, that every
    /// frequency is finite and positive, that frequencies strictly increase
    /// and that names are unique.
    pub fn new(notes: Vec<Note>) -> Result<Self, TableError> {
        validate_notes(&notes)?;
        Ok(Self { notes })
    }

    /// The standard D2 to B6 table at A4 = 440 Hz.
    pub fn standard() -> &'static NoteFrequencyTable {
        &STANDARD
    }

    /// Generates the D2 to B6 range in equal temperament for an arbitrary A4.
    ///
    /// The formula is `f = a4 * 2^(n/12)` where n is the number of
    /// semitones away from A4. Names follow the 88-key piano layout.
    pub fn equal_tempered(reference_a4: f32) -> Result<Self, TableError> {
        if !reference_a4.is_finite() || reference_a4 <= 0.0 {
            return Err(TableError::InvalidReference(reference_a4));
        }

        const NOTE_NAMES: [&str; 12] = [
            "A", "A#", "B", "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#",
        ];
        let notes = (FIRST_KEY..=LAST_KEY)
            .map(|i| {
                // A4 is the 49th key, index 48 when counting from 0.
                let frequency = reference_a4 * 2.0_f32.powf((i as f32 - 48.0) / 12.0);
                // The octave number changes at C, not at A.
                let octave = (i + 9) / 12;
                Note::new(format!("{}{}", NOTE_NAMES[i % 12], octave), frequency)
            })
            .collect();

        Self::new(notes)
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Looks up a note's frequency by name.
    pub fn frequency_of(&self, name: &str) -> Option<f32> {
        self.notes
            .iter()
            .find(|note| note.name == name)
            .map(|note| note.frequency)
    }

    /// Derives the tolerance band of every note. See [`build_ranges`].
    pub fn build_ranges(&self, note_width: f32) -> Vec<NoteRange> {
        build_ranges(&self.notes, note_width)
    }
}

fn validate_notes(notes: &[Note]) -> Result<(), TableError> {
    if notes.is_empty() {
        return Err(TableError::Empty);
    }

    let mut seen = HashSet::with_capacity(notes.len());
    let mut previous: Option<f32> = None;
    for note in notes {
        if !note.frequency.is_finite() || note.frequency <= 0.0 {
            return Err(TableError::InvalidFrequency {
                name: note.name.clone(),
                frequency: note.frequency,
            });
        }
        if let Some(prev) = previous {
            if note.frequency <= prev {
                return Err(TableError::NotIncreasing {
                    name: note.name.clone(),
                    frequency: note.frequency,
                    previous: prev,
                });
            }
        }
        if !seen.insert(note.name.as_str()) {
            return Err(TableError::DuplicateName(note.name.clone()));
        }
        previous = Some(note.frequency);
    }
    Ok(())
}

/// Frequency interval around a canonical note that classifies as that note.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteRange {
    pub name: String,
    pub lower: f32,
    pub center: f32,
    pub upper: f32,
}

impl NoteRange {
    /// Open-interval membership: the bounds themselves do not match.
    pub fn contains(&self, frequency: f32) -> bool {
        frequency > self.lower && frequency < self.upper
    }
}

/// Derives one `NoteRange` per note, preserving the input order.
///
/// Each band is `center / 2^(10/note_width)` to `center * 2^(10/note_width)`.
/// At the default width of 300 that is about ±40 cents, leaving a 20 cent gap
/// between neighbouring semitones. Widths below 240 make neighbours overlap.
pub fn build_ranges(notes: &[Note], note_width: f32) -> Vec<NoteRange> {
    let factor = 2.0_f32.powf(10.0 / note_width);
    notes
        .iter()
        .map(|note| NoteRange {
            name: note.name.clone(),
            lower: note.frequency / factor,
            center: note.frequency,
            upper: note.frequency * factor,
        })
        .collect()
}

/// Returns the index pairs of neighbouring ranges whose bands overlap.
pub fn overlapping_ranges(ranges: &[NoteRange]) -> Vec<(usize, usize)> {
    ranges
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[0].upper > pair[1].lower)
        .map(|(i, _)| (i, i + 1))
        .collect()
}

/// Calculates the deviation from a target frequency in cents.
///
/// 100 cents = 1 semitone, 1200 cents = 1 octave. Positive is sharp.
pub fn cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}
