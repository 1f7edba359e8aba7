//! # Peak Extraction Module
//!
//! Reduces a spectrum to its single dominant bin.
//!
//! Ambient noise spreads low magnitude across the whole band, while a played
//! note shows up as a clear spike. Only a maximum above the significance
//! threshold is reported as a peak.

use serde::Serialize;

use crate::spectrum::Spectrum;

/// The strongest bin of a spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DominantPeak {
    /// Bin frequency in Hz
    pub frequency: f32,
    /// Normalized magnitude of that bin
    pub magnitude: f32,
}

/// Finds the dominant bin of `spectrum`.
///
/// Bins are scanned in ascending frequency and only a strictly larger
/// magnitude replaces the current maximum, so the lowest of several equal
/// maxima wins.
///
/// # Returns
/// * `Some(peak)` - The maximum magnitude exceeds `significance_threshold`
/// * `None` - Empty spectrum, silence, or nothing above the threshold
pub fn extract_peak(spectrum: &Spectrum, significance_threshold: f32) -> Option<DominantPeak> {
    let mut best: Option<DominantPeak> = None;
    for bin in spectrum.iter() {
        let replace = match best {
            Some(current) => bin.magnitude > current.magnitude,
            None => true,
        };
        if replace {
            best = Some(DominantPeak {
                frequency: bin.frequency,
                magnitude: bin.magnitude,
            });
        }
    }

    match best {
        Some(peak) if peak.magnitude > significance_threshold => Some(peak),
        Some(peak) => {
            log::trace!(
                "Strongest bin {:.2} Hz at {:.2} is below threshold {}",
                peak.frequency,
                peak.magnitude,
                significance_threshold
            );
            None
        }
        None => None,
    }
}
