//! Live capture from the default input device using CPAL.
//!
//! The audio callback assembles blocks on the audio thread and hands them to
//! the consumer through a bounded channel. When the consumer falls behind,
//! new blocks are dropped rather than queued.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SupportedStreamConfigRange};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{BlockAssembler, BlockSource};
use crate::block::{f32_to_i16, AudioBlock};
use crate::config::DetectorConfig;
use crate::error::CaptureError;

/// Blocks buffered between the audio thread and the consumer.
const CHANNEL_CAPACITY: usize = 4;

/// How long `next_block` waits beyond one block's duration before giving up.
const STALL_GRACE: Duration = Duration::from_secs(2);

/// A running input stream.
///
/// The stream is paused when this is dropped.
pub struct LiveCapture {
    stream: cpal::Stream,
    receiver: Receiver<AudioBlock>,
    dropped: Arc<AtomicUsize>,
    sample_rate: u32,
    block_size: usize,
    timeout: Duration,
}

impl LiveCapture {
    /// Starts capturing from the default input device.
    ///
    /// This function:
    /// 1. Selects the default audio input device
    /// 2. Picks an i16 or f32 input format that supports `config.sample_rate`,
    ///    preferring mono and i16
    /// 3. Starts a stream whose callback assembles `config.block_size` blocks
    pub fn start(config: &DetectorConfig) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(CaptureError::NoInputDevice)?;

        log::info!(
            "Using audio input device: {}",
            device.name().map_err(device_error)?
        );

        let configs = device
            .supported_input_configs()
            .map_err(device_error)?
            .collect::<Vec<_>>();
        let supported = find_supported_config(configs, config.sample_rate)
            .and_then(|c| c.try_with_sample_rate(cpal::SampleRate(config.sample_rate)))
            .ok_or(CaptureError::NoSuitableConfig(config.sample_rate))?;

        let sample_format = supported.sample_format();
        let channels = supported.channels() as usize;
        let stream_config: cpal::StreamConfig = supported.into();

        log::info!(
            "Selected {:?} input, {} channel(s) at {} Hz",
            sample_format,
            channels,
            config.sample_rate
        );

        let (sender, receiver) = crossbeam_channel::bounded(CHANNEL_CAPACITY);
        let dropped = Arc::new(AtomicUsize::new(0));
        let sink = BlockSink {
            assembler: BlockAssembler::new(config.block_size, channels),
            sender,
            dropped: Arc::clone(&dropped),
            scratch: Vec::new(),
        };

        let stream = match sample_format {
            SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, sink, |s| s)?,
            SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, sink, f32_to_i16)?,
            other => {
                return Err(CaptureError::UnsupportedFormat(format!("{:?}", other)));
            }
        };
        stream.play().map_err(device_error)?;

        Ok(Self {
            stream,
            receiver,
            dropped,
            sample_rate: config.sample_rate,
            block_size: config.block_size,
            timeout: config.block_duration() + STALL_GRACE,
        })
    }

    /// Blocks dropped because the consumer was too slow, since the last call.
    pub fn take_dropped(&self) -> usize {
        self.dropped.swap(0, Ordering::Relaxed)
    }
}

impl BlockSource for LiveCapture {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn next_block(&mut self) -> Result<Option<AudioBlock>, CaptureError> {
        let dropped = self.take_dropped();
        if dropped > 0 {
            log::warn!("Processing fell behind capture; dropped {} block(s)", dropped);
        }

        match self.receiver.recv_timeout(self.timeout) {
            Ok(block) => Ok(Some(block)),
            Err(RecvTimeoutError::Timeout) => Err(CaptureError::NoData(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(CaptureError::StreamClosed),
        }
    }
}

impl Drop for LiveCapture {
    fn drop(&mut self) {
        if let Err(e) = self.stream.pause() {
            log::warn!("Error pausing input stream: {}", e);
        }
    }
}

/// State moved into the audio callback.
struct BlockSink {
    assembler: BlockAssembler,
    sender: Sender<AudioBlock>,
    dropped: Arc<AtomicUsize>,
    scratch: Vec<i16>,
}

impl BlockSink {
    /// Converts one callback's worth of samples and forwards every completed block.
    fn push<T: Copy>(&mut self, data: &[T], convert: fn(T) -> i16) {
        let Self {
            assembler,
            sender,
            dropped,
            scratch,
        } = self;

        scratch.clear();
        scratch.extend(data.iter().map(|&s| convert(s)));

        assembler.push(scratch.as_slice(), |block| {
            // Full channel: drop the newest block rather than stall the callback.
            if sender.try_send(block).is_err() {
                dropped.fetch_add(1, Ordering::Relaxed);
            }
        });
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut sink: BlockSink,
    convert: fn(T) -> i16,
) -> Result<cpal::Stream, CaptureError>
where
    T: cpal::SizedSample,
{
    let err_fn = |err| log::error!("An error occurred on the audio stream: {}", err);

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| sink.push(data, convert),
            err_fn,
            None,
        )
        .map_err(device_error)
}

/// Finds the best supported input configuration for the target sample rate.
///
/// Only i16 and f32 formats whose range includes `target_rate` qualify. Among
/// those, mono beats multi-channel, then i16 beats f32, then fewer channels win.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| matches!(c.sample_format(), SampleFormat::I16 | SampleFormat::F32))
        .filter(|c| c.min_sample_rate().0 <= target_rate && target_rate <= c.max_sample_rate().0)
        .min_by_key(|c| (c.channels() != 1, c.sample_format() != SampleFormat::I16, c.channels()))
}

fn device_error(err: impl std::fmt::Display) -> CaptureError {
    CaptureError::Device(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpal::{SampleRate, SupportedBufferSize};
    use pretty_assertions::assert_eq;

    fn range(
        channels: u16,
        min: u32,
        max: u32,
        format: SampleFormat,
    ) -> SupportedStreamConfigRange {
        SupportedStreamConfigRange::new(
            channels,
            SampleRate(min),
            SampleRate(max),
            SupportedBufferSize::Unknown,
            format,
        )
    }

    fn pick(configs: Vec<SupportedStreamConfigRange>) -> Option<(u16, SampleFormat)> {
        find_supported_config(configs, 44100).map(|c| (c.channels(), c.sample_format()))
    }

    #[test]
    fn test_mono_beats_sample_format() {
        let configs = vec![
            range(2, 8000, 96000, SampleFormat::I16),
            range(1, 8000, 96000, SampleFormat::F32),
        ];
        assert_eq!(pick(configs), Some((1, SampleFormat::F32)));
    }

    #[test]
    fn test_i16_beats_f32() {
        let configs = vec![
            range(1, 8000, 96000, SampleFormat::F32),
            range(1, 8000, 96000, SampleFormat::I16),
        ];
        assert_eq!(pick(configs), Some((1, SampleFormat::I16)));

        let stereo = vec![
            range(4, 8000, 96000, SampleFormat::I16),
            range(2, 8000, 96000, SampleFormat::F32),
            range(2, 8000, 96000, SampleFormat::I16),
        ];
        assert_eq!(pick(stereo), Some((2, SampleFormat::I16)));
    }

    #[test]
    fn test_unusable_configs_are_skipped() {
        let configs = vec![
            range(1, 48000, 96000, SampleFormat::I16),
            range(1, 8000, 96000, SampleFormat::U8),
            range(2, 44100, 44100, SampleFormat::F32),
        ];
        assert_eq!(pick(configs), Some((2, SampleFormat::F32)));

        let none = vec![
            range(1, 48000, 96000, SampleFormat::I16),
            range(1, 8000, 96000, SampleFormat::U8),
        ];
        assert_eq!(pick(none), None);
    }

    fn sink(
        block_size: usize,
        channels: usize,
        capacity: usize,
    ) -> (BlockSink, Receiver<AudioBlock>) {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        let sink = BlockSink {
            assembler: BlockAssembler::new(block_size, channels),
            sender,
            dropped: Arc::new(AtomicUsize::new(0)),
            scratch: Vec::new(),
        };
        (sink, receiver)
    }

    #[test]
    fn test_full_channel_counts_dropped_blocks() {
        let (mut sink, receiver) = sink(4, 1, 1);

        sink.push(&[1i16, 2, 3, 4, 5, 6, 7, 8], |s| s);
        assert_eq!(sink.dropped.load(Ordering::Relaxed), 1);
        assert_eq!(receiver.try_recv().unwrap().samples(), &[1, 2, 3, 4]);
        assert!(receiver.try_recv().is_err());

        // Room again once the consumer has caught up.
        sink.push(&[9i16, 10, 11, 12], |s| s);
        assert_eq!(receiver.try_recv().unwrap().samples(), &[9, 10, 11, 12]);
        assert_eq!(sink.dropped.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_f32_callback_data_is_converted() {
        let (mut sink, receiver) = sink(2, 2, 4);

        sink.push(&[1.0f32, 1.0, -1.0, -1.0, 0.5], f32_to_i16);
        let block = receiver.try_recv().unwrap();
        assert_eq!(block.samples(), &[i16::MAX, -i16::MAX]);
        assert_eq!(sink.dropped.load(Ordering::Relaxed), 0);
    }
}
