//! Blocks read from a WAV file.

use hound::{SampleFormat, WavReader};
use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::{BlockAssembler, BlockSource};
use crate::block::{f32_to_i16, AudioBlock};
use crate::error::CaptureError;

/// Reads a WAV file block by block.
///
/// Integer samples of any width up to 32 bits and 32-bit float samples are
/// converted to 16-bit. Multi-channel files are downmixed. A trailing partial
/// block is dropped.
pub struct WavSource {
    reader: WavReader<BufReader<File>>,
    format: SampleFormat,
    bits_per_sample: u16,
    channels: usize,
    sample_rate: u32,
    block_size: usize,
    assembler: BlockAssembler,
    ready: VecDeque<AudioBlock>,
}

impl WavSource {
    pub fn open(path: impl AsRef<Path>, block_size: usize) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let reader = WavReader::open(path)?;
        let spec = reader.spec();

        match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, 1..=32) | (SampleFormat::Float, 32) => {}
            (format, bits) => {
                return Err(CaptureError::UnsupportedFormat(format!(
                    "{:?} samples at {} bits",
                    format, bits
                )));
            }
        }

        log::info!(
            "Reading {}: {} Hz, {} channel(s), {} bits {:?}, {} frames",
            path.display(),
            spec.sample_rate,
            spec.channels,
            spec.bits_per_sample,
            spec.sample_format,
            reader.duration()
        );

        let channels = spec.channels as usize;
        Ok(Self {
            reader,
            format: spec.sample_format,
            bits_per_sample: spec.bits_per_sample,
            channels,
            sample_rate: spec.sample_rate,
            block_size,
            assembler: BlockAssembler::new(block_size, channels),
            ready: VecDeque::new(),
        })
    }

    /// Reads up to `count` interleaved samples, converted to 16-bit.
    fn read_chunk(&mut self, count: usize) -> Result<Vec<i16>, CaptureError> {
        let chunk = match self.format {
            SampleFormat::Float => self
                .reader
                .samples::<f32>()
                .take(count)
                .map(|s| s.map(f32_to_i16))
                .collect::<Result<Vec<_>, _>>()?,
            SampleFormat::Int => {
                let bits = self.bits_per_sample;
                self.reader
                    .samples::<i32>()
                    .take(count)
                    .map(|s| s.map(|s| rescale_int(s, bits)))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(chunk)
    }
}

impl BlockSource for WavSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn next_block(&mut self) -> Result<Option<AudioBlock>, CaptureError> {
        let wanted = self.block_size * self.channels;
        while self.ready.is_empty() {
            let chunk = self.read_chunk(wanted)?;
            let ready = &mut self.ready;
            self.assembler.push(&chunk, |block| ready.push_back(block));

            if chunk.len() < wanted {
                if self.assembler.pending() > 0 {
                    log::debug!("Dropping {} trailing samples", self.assembler.pending());
                }
                break;
            }
        }
        Ok(self.ready.pop_front())
    }
}

/// Shifts an integer sample of `bits` width into the 16-bit range.
fn rescale_int(sample: i32, bits: u16) -> i16 {
    if bits > 16 {
        (sample >> (bits - 16)) as i16
    } else {
        (sample << (16 - bits)) as i16
    }
}
