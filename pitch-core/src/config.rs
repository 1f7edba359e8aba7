//! Configuration parameters for pitch detection

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Default capture sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default number of samples per block.
///
/// 4096 samples at 44.1 kHz gives ~10.8 Hz per bin and a ~93 ms budget per block.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Block size used when the spectrum itself is being consumed.
/// Doubles the frequency resolution at the cost of latency.
pub const SPECTRUM_BLOCK_SIZE: usize = 8192;

/// Detector configuration.
///
/// Built once at startup, validated, and handed to each component by value or
/// reference. Nothing in the pipeline mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Sample rate in Hz (default: 44100)
    pub sample_rate: u32,

    /// Samples per block (default: 4096)
    pub block_size: usize,

    /// Lower band limit in Hz (default: 50.0)
    pub min_freq: f32,

    /// Upper band limit in Hz, exclusive (default: 2000.0)
    pub max_freq: f32,

    /// Minimum peak magnitude accepted as a played note (default: 30.0)
    /// Magnitudes are normalized by block size, so this is in sample units.
    pub significance_threshold: f32,

    /// Strictness divisor for note tolerance bands (default: 300.0)
    /// Each band spans `2^(±10 / note_width)` around its center; larger is stricter.
    pub note_width: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            min_freq: 50.0,
            max_freq: 2000.0,
            significance_threshold: 30.0,
            note_width: 300.0,
        }
    }
}

impl DetectorConfig {
    /// Loads a configuration from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_file_over(path, &Self::default())
    }

    /// Loads a JSON file on top of `base`. Fields present in the file replace
    /// those of `base`; missing fields keep the value from `base`.
    pub fn from_json_file_over(
        path: impl AsRef<Path>,
        base: &DetectorConfig,
    ) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        let overrides: Map<String, Value> = serde_json::from_str(&data)?;

        let mut merged = serde_json::to_value(base)?;
        if let Value::Object(fields) = &mut merged {
            fields.extend(overrides);
        }
        Ok(serde_json::from_value(merged)?)
    }

    /// Checks the configuration for values the pipeline cannot work with.
    ///
    /// A band that lies above Nyquist is accepted; it just produces empty spectra.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if self.block_size == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        let band_ok = self.min_freq.is_finite()
            && self.max_freq.is_finite()
            && self.min_freq >= 0.0
            && self.min_freq < self.max_freq;
        if !band_ok {
            return Err(ConfigError::InvalidBand {
                min: self.min_freq,
                max: self.max_freq,
            });
        }
        if !self.significance_threshold.is_finite() || self.significance_threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.significance_threshold));
        }
        if !self.note_width.is_finite() || self.note_width <= 0.0 {
            return Err(ConfigError::InvalidNoteWidth(self.note_width));
        }
        Ok(())
    }

    /// Width of one frequency bin in Hz.
    pub fn bin_width(&self) -> f32 {
        self.sample_rate as f32 / self.block_size as f32
    }

    /// Wall-clock time one block represents, which is also the processing budget.
    pub fn block_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.block_size as f64 / self.sample_rate as f64)
    }
}
