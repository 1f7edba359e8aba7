//! Error types for the pitch detector.
//!
//! The detection stages themselves never fail. Everything here is raised
//! either at startup (configuration, note tables) or at the capture boundary
//! before a block reaches the pipeline.

use thiserror::Error;

/// Rejected detector configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("sample rate must be positive")]
    ZeroSampleRate,

    #[error("block size must be positive")]
    ZeroBlockSize,

    #[error("invalid frequency band: min {min} Hz must be non-negative and below max {max} Hz")]
    InvalidBand { min: f32, max: f32 },

    #[error("significance threshold must be a finite, non-negative number (got {0})")]
    InvalidThreshold(f32),

    #[error("note width must be a finite, positive number (got {0})")]
    InvalidNoteWidth(f32),

    #[error("note width {config} does not match the classifier's note width {classifier}")]
    NoteWidthMismatch { config: f32, classifier: f32 },

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Malformed note frequency table.
#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("note table is empty")]
    Empty,

    #[error("note {name} has invalid frequency {frequency} Hz")]
    InvalidFrequency { name: String, frequency: f32 },

    #[error("note {name} ({frequency} Hz) is not above the previous entry ({previous} Hz)")]
    NotIncreasing {
        name: String,
        frequency: f32,
        previous: f32,
    },

    #[error("note {0} appears more than once")]
    DuplicateName(String),

    #[error("reference pitch must be a finite, positive number (got {0})")]
    InvalidReference(f32),
}

/// A block that does not have the configured shape.
#[derive(Debug, Error, PartialEq)]
pub enum BlockError {
    #[error("audio block has {actual} samples, expected {expected}")]
    Length { expected: usize, actual: usize },
}

/// Failures of the audio acquisition side.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device available")]
    NoInputDevice,

    #[error("no supported input format at {0} Hz")]
    NoSuitableConfig(u32),

    #[error("audio device error: {0}")]
    Device(String),

    #[error("audio stream closed")]
    StreamClosed,

    #[error("no audio received for {0:?}")]
    NoData(std::time::Duration),

    #[error("failed to read WAV file: {0}")]
    Wav(#[from] hound::Error),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),
}
