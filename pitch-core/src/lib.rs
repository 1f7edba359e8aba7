// pitch-core/src/lib.rs

//! The core logic for the block-wise pitch detector.
//! This crate turns fixed-size blocks of 16-bit audio into a dominant
//! frequency and the nearest note name. It is headless: reporting and the
//! read loop belong to the caller.
//!
//! ```no_run
//! use pitch_core::{AudioBlock, DetectorConfig, NoteFrequencyTable, PitchDetector};
//!
//! let config = DetectorConfig::default();
//! let detector = PitchDetector::new(config, NoteFrequencyTable::standard())?;
//! let block = AudioBlock::new(vec![0; 4096], 4096)?;
//! println!("{}", detector.process(&block)); // DF: 0, KEY: NA
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audio;
pub mod block;
pub mod classify;
pub mod config;
pub mod error;
pub mod notes;
pub mod peak;
pub mod pipeline;
pub mod spectrum;

use serde::Serialize;
use std::fmt;

pub use block::AudioBlock;
pub use classify::{NoteClassifier, NOT_AVAILABLE};
pub use config::DetectorConfig;
pub use error::{BlockError, CaptureError, ConfigError, TableError};
pub use notes::{NoteFrequencyTable, NoteRange};
pub use pipeline::PitchDetector;
pub use spectrum::Spectrum;

/// Represents the result of classifying a single audio block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassificationResult {
    /// Frequency of the dominant bin in Hz, if it cleared the threshold.
    pub detected_frequency: Option<f32>,
    /// Normalized magnitude of that bin.
    pub magnitude: Option<f32>,
    /// The matched note, if the frequency fell inside one of its ranges.
    pub note_name: Option<String>,
    /// Canonical frequency of the matched note.
    pub target_frequency: Option<f32>,
    /// Deviation from the matched note in cents.
    pub cents_deviation: Option<f32>,
}

impl ClassificationResult {
    /// Dominant frequency with the `0` sentinel for "no peak".
    pub fn frequency_or_zero(&self) -> f32 {
        self.detected_frequency.unwrap_or(0.0)
    }

    /// Note name with the `"NA"` sentinel for "no match".
    pub fn note_or_na(&self) -> &str {
        self.note_name.as_deref().unwrap_or(NOT_AVAILABLE)
    }
}

impl fmt::Display for ClassificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detected_frequency {
            Some(freq) => write!(f, "DF: {:.2}, KEY: {}", freq, self.note_or_na()),
            None => write!(f, "DF: 0, KEY: {}", self.note_or_na()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_sentinels() {
        assert_eq!(ClassificationResult::default().to_string(), "DF: 0, KEY: NA");

        let result = ClassificationResult {
            detected_frequency: Some(441.430_66),
            magnitude: Some(3900.0),
            note_name: Some("A4".to_string()),
            target_frequency: Some(440.0),
            cents_deviation: Some(5.6),
        };
        assert_eq!(result.to_string(), "DF: 441.43, KEY: A4");
        assert_eq!(result.frequency_or_zero(), 441.430_66);
        assert_eq!(result.note_or_na(), "A4");
    }
}
