//! Audio blocks handed to the pipeline.

use crate::error::BlockError;

/// One fixed-length block of mono 16-bit samples.
///
/// The length is checked when the block is built, so the pipeline never has
/// to deal with a short or oversized block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBlock {
    samples: Box<[i16]>,
}

impl AudioBlock {
    /// Wraps `samples` after checking that exactly `block_size` are present.
    pub fn new(samples: Vec<i16>, block_size: usize) -> Result<Self, BlockError> {
        if samples.len() != block_size {
            return Err(BlockError::Length {
                expected: block_size,
                actual: samples.len(),
            });
        }
        Ok(Self {
            samples: samples.into_boxed_slice(),
        })
    }

    /// For callers that have already counted out a full block.
    pub(crate) fn from_exact(samples: Vec<i16>) -> Self {
        Self {
            samples: samples.into_boxed_slice(),
        }
    }

    /// Converts normalized float samples (-1.0..=1.0) to a 16-bit block.
    /// Out-of-range values are clipped.
    pub fn from_f32(samples: &[f32], block_size: usize) -> Result<Self, BlockError> {
        Self::new(samples.iter().map(|&s| f32_to_i16(s)).collect(), block_size)
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Scales a normalized float sample to the i16 range.
pub(crate) fn f32_to_i16(sample: f32) -> i16 {
    (sample * i16::MAX as f32)
        .round()
        .clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
