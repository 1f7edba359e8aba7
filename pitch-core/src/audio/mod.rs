//! # Audio Input Module
//!
//! Everything on the acquisition side of the pipeline: turning a stream of
//! interleaved samples into validated mono blocks, and the sources that
//! produce them.
//!
//! ## Sources
//! - [`WavSource`] - blocks read from a WAV file
//! - [`LiveCapture`] - blocks from the default input device (feature `live`)
//!
//! Sources follow a pull model. The caller asks for the next block, processes
//! it, reports, and only then asks again.

#[cfg(feature = "live")]
mod live;
mod wav;

#[cfg(feature = "live")]
pub use live::LiveCapture;
pub use wav::WavSource;

use std::mem;

use crate::block::AudioBlock;
use crate::error::CaptureError;

/// A producer of fixed-size audio blocks.
pub trait BlockSource {
    /// Sample rate of the blocks this source yields.
    fn sample_rate(&self) -> u32;

    /// Number of samples in every block.
    fn block_size(&self) -> usize;

    /// Blocks until the next block is ready.
    ///
    /// # Returns
    /// * `Ok(Some(block))` - The next block
    /// * `Ok(None)` - The source is exhausted
    /// * `Err(e)` - The source failed; no further blocks should be expected
    fn next_block(&mut self) -> Result<Option<AudioBlock>, CaptureError>;
}

/// Accumulates interleaved samples into mono blocks of a fixed size.
///
/// Multi-channel frames are averaged down to one channel. A frame split across
/// two pushes is carried over, and so are samples short of a full block.
#[derive(Debug, Clone)]
pub struct BlockAssembler {
    block_size: usize,
    channels: usize,
    carry: Vec<i16>,
    mono: Vec<i16>,
}

impl BlockAssembler {
    /// `channels` of 0 is treated as mono.
    pub fn new(block_size: usize, channels: usize) -> Self {
        Self {
            block_size,
            channels: channels.max(1),
            carry: Vec::new(),
            mono: Vec::with_capacity(block_size),
        }
    }

    /// Adds interleaved samples, calling `on_block` for every block completed.
    pub fn push(&mut self, interleaved: &[i16], mut on_block: impl FnMut(AudioBlock)) {
        if self.channels == 1 {
            for &sample in interleaved {
                self.push_mono(sample, &mut on_block);
            }
            return;
        }

        self.carry.extend_from_slice(interleaved);
        let whole = self.carry.len() / self.channels * self.channels;
        let frames: Vec<i16> = self.carry[..whole]
            .chunks_exact(self.channels)
            .map(downmix)
            .collect();
        self.carry.drain(..whole);

        for sample in frames {
            self.push_mono(sample, &mut on_block);
        }
    }

    /// Mono samples waiting for the rest of their block.
    pub fn pending(&self) -> usize {
        self.mono.len()
    }

    fn push_mono(&mut self, sample: i16, on_block: &mut impl FnMut(AudioBlock)) {
        self.mono.push(sample);
        if self.mono.len() == self.block_size {
            let samples = mem::replace(&mut self.mono, Vec::with_capacity(self.block_size));
            on_block(AudioBlock::from_exact(samples));
        }
    }
}

fn downmix(frame: &[i16]) -> i16 {
    let sum: i32 = frame.iter().map(|&s| s as i32).sum();
    (sum / frame.len() as i32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn collect(assembler: &mut BlockAssembler, samples: &[i16]) -> Vec<Vec<i16>> {
        let mut blocks = Vec::new();
        assembler.push(samples, |block| blocks.push(block.samples().to_vec()));
        blocks
    }

    #[test]
    fn test_mono_blocks_and_remainder() {
        let mut assembler = BlockAssembler::new(4, 1);
        let blocks = collect(&mut assembler, &[1, 2, 3, 4, 5, 6]);
        assert_eq!(blocks, vec![vec![1, 2, 3, 4]]);
        assert_eq!(assembler.pending(), 2);

        let blocks = collect(&mut assembler, &[7, 8, 9, 10, 11, 12, 13]);
        assert_eq!(blocks, vec![vec![5, 6, 7, 8], vec![9, 10, 11, 12]]);
        assert_eq!(assembler.pending(), 1);
    }

    #[test]
    fn test_stereo_is_averaged() {
        let mut assembler = BlockAssembler::new(2, 2);
        let blocks = collect(&mut assembler, &[100, 200, -50, 50, 7]);
        assert_eq!(blocks, vec![vec![150, 0]]);

        // The dangling left sample pairs with the next push.
        let blocks = collect(&mut assembler, &[9, 32767, 32767]);
        assert_eq!(assembler.pending(), 0);
        assert_eq!(blocks, vec![vec![8, 32767]]);
    }

    #[test]
    fn test_zero_channels_is_mono() {
        let mut assembler = BlockAssembler::new(2, 0);
        assert_eq!(collect(&mut assembler, &[1, 2]), vec![vec![1, 2]]);
    }
}
