//! # pitch-detect
//!
//! Command-line front end for the pitch detector. Pulls blocks from a WAV
//! file or the default input device, classifies each one and prints a
//! report per block.
//!
//! ## Architecture
//! - **Source**: `WavSource` or `LiveCapture` (feature `live`), pulled one block at a time
//! - **Detector**: `PitchDetector`, built once from the merged configuration
//! - **Output**: reports on stdout, logs on stderr

mod report;

use anyhow::{Context, Result};
use clap::Parser;
use pitch_core::audio::{BlockSource, WavSource};
use pitch_core::config::SPECTRUM_BLOCK_SIZE;
use pitch_core::{DetectorConfig, NoteFrequencyTable, PitchDetector};
use report::Format;
use std::io;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "pitch-detect")]
#[command(
    about = "Print the dominant note of live or recorded audio, block by block",
    long_about = None
)]
struct Args {
    /// Read audio from a WAV file instead of the default input device
    #[arg(short = 'w', long)]
    wav: Option<PathBuf>,

    /// JSON file with detector settings (flags below override it)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Sample rate in Hz (ignored for WAV input, which uses the file's rate)
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Samples per block (default: 4096, or 8192 with --spectrum)
    #[arg(long)]
    block_size: Option<usize>,

    /// Lower band limit in Hz (default: 50)
    #[arg(long)]
    min_freq: Option<f32>,

    /// Upper band limit in Hz (default: 2000)
    #[arg(long)]
    max_freq: Option<f32>,

    /// Minimum peak magnitude to report a note (default: 30)
    #[arg(short = 't', long)]
    threshold: Option<f32>,

    /// Note band strictness; larger values give narrower bands (default: 300)
    #[arg(long)]
    note_width: Option<f32>,

    /// Build the note table around this A4 instead of 440 Hz
    #[arg(long)]
    a4: Option<f32>,

    /// Report format
    #[arg(short = 'f', long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Also output the band-limited spectrum of every block
    #[arg(long)]
    spectrum: bool,

    /// Stop after this many blocks
    #[arg(short = 'n', long)]
    blocks: Option<usize>,

    /// Verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut config = resolve_config(&args)?;
    config.validate().context("invalid detector configuration")?;

    let table = match args.a4 {
        Some(a4) => NoteFrequencyTable::equal_tempered(a4).context("invalid --a4 reference pitch")?,
        None => NoteFrequencyTable::standard().clone(),
    };

    let mut source = open_source(&args, &mut config)?;
    let detector = PitchDetector::new(config, &table).context("invalid detector configuration")?;

    run(&args, &detector, source.as_mut())
}

/// Merges defaults, the optional config file and command-line overrides.
fn resolve_config(args: &Args) -> Result<DetectorConfig> {
    let mut base = DetectorConfig::default();
    if args.spectrum {
        base.block_size = SPECTRUM_BLOCK_SIZE;
    }

    let mut config = match &args.config {
        Some(path) => DetectorConfig::from_json_file_over(path, &base)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => base,
    };

    if let Some(rate) = args.sample_rate {
        config.sample_rate = rate;
    }
    if let Some(size) = args.block_size {
        config.block_size = size;
    }
    if let Some(min) = args.min_freq {
        config.min_freq = min;
    }
    if let Some(max) = args.max_freq {
        config.max_freq = max;
    }
    if let Some(threshold) = args.threshold {
        config.significance_threshold = threshold;
    }
    if let Some(width) = args.note_width {
        config.note_width = width;
    }

    Ok(config)
}

/// Opens the block source. WAV input replaces the configured sample rate
/// with the file's own.
fn open_source(args: &Args, config: &mut DetectorConfig) -> Result<Box<dyn BlockSource>> {
    match &args.wav {
        Some(path) => {
            let source = WavSource::open(path, config.block_size)
                .with_context(|| format!("failed to open {}", path.display()))?;
            if source.sample_rate() != config.sample_rate {
                log::info!(
                    "Using the file's sample rate of {} Hz instead of {} Hz",
                    source.sample_rate(),
                    config.sample_rate
                );
                config.sample_rate = source.sample_rate();
            }
            Ok(Box::new(source))
        }
        None => open_live(config),
    }
}

#[cfg(feature = "live")]
fn open_live(config: &DetectorConfig) -> Result<Box<dyn BlockSource>> {
    let capture =
        pitch_core::audio::LiveCapture::start(config).context("failed to start audio capture")?;
    Ok(Box::new(capture))
}

#[cfg(not(feature = "live"))]
fn open_live(_config: &DetectorConfig) -> Result<Box<dyn BlockSource>> {
    anyhow::bail!(
        "live capture is not available in this build; \
         pass --wav <file> or rebuild with `--features live`"
    )
}

/// Pulls, processes and reports blocks until the source ends or the block limit is hit.
fn run(args: &Args, detector: &PitchDetector, source: &mut dyn BlockSource) -> Result<()> {
    let budget = detector.config().block_duration();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut processed = 0;

    while args.blocks.is_none_or(|limit| processed < limit) {
        let Some(block) = source.next_block().context("audio capture failed")? else {
            break;
        };

        let started = Instant::now();
        let (result, spectrum) = detector.process_with_spectrum(&block);
        let elapsed = started.elapsed();
        if elapsed > budget {
            log::warn!(
                "Block {} took {:?}, over its real-time budget of {:?}",
                processed,
                elapsed,
                budget
            );
        }

        let spectrum = args.spectrum.then_some(&spectrum);
        report::write_report(&mut out, args.format, processed, &result, spectrum)?;
        processed += 1;
    }

    log::info!("Processed {} block(s)", processed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("pitch-detect").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(resolve_config(&args).unwrap(), DetectorConfig::default());
        assert_eq!(args.format, Format::Text);
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = parse(&["--block-size", "2048", "--min-freq", "80", "-t", "12.5", "-f", "json"]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.block_size, 2048);
        assert_eq!(config.min_freq, 80.0);
        assert_eq!(config.significance_threshold, 12.5);
        assert_eq!(config.max_freq, 2000.0);
        assert_eq!(args.format, Format::Json);
    }

    #[test]
    fn test_spectrum_mode_uses_larger_blocks() {
        let config = resolve_config(&parse(&["--spectrum"])).unwrap();
        assert_eq!(config.block_size, SPECTRUM_BLOCK_SIZE);

        let explicit = resolve_config(&parse(&["--spectrum", "--block-size", "4096"])).unwrap();
        assert_eq!(explicit.block_size, 4096);
    }

    #[test]
    fn test_config_file_then_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "note_width": 200.0, "max_freq": 1500.0 }}"#).unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = resolve_config(&parse(&["--config", &path, "--max-freq", "1800"])).unwrap();
        assert_eq!(config.note_width, 200.0);
        assert_eq!(config.max_freq, 1800.0);
        assert_eq!(config.block_size, 4096);
    }

    #[test]
    fn test_spectrum_mode_with_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "significance_threshold": 20.0 }}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = resolve_config(&parse(&["--spectrum", "--config", &path])).unwrap();
        assert_eq!(config.block_size, SPECTRUM_BLOCK_SIZE);
        assert_eq!(config.significance_threshold, 20.0);

        let mut sized = tempfile::NamedTempFile::new().unwrap();
        write!(sized, r#"{{ "block_size": 2048 }}"#).unwrap();
        let path = sized.path().to_str().unwrap().to_string();
        let config = resolve_config(&parse(&["--spectrum", "--config", &path])).unwrap();
        assert_eq!(config.block_size, 2048);
    }

    #[test]
    fn test_wav_sample_rate_replaces_configured_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..6000 {
            let t = i as f32 / 48000.0;
            let sample = (8000.0 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()) as i16;
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();

        let args = parse(&["--wav", path.to_str().unwrap()]);
        let mut config = resolve_config(&args).unwrap();
        assert_eq!(config.sample_rate, 44100);

        let mut source = open_source(&args, &mut config).unwrap();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(source.sample_rate(), 48000);
        assert!(source.next_block().unwrap().is_some());
    }

    #[test]
    fn test_missing_config_file_fails() {
        assert!(resolve_config(&parse(&["--config", "/nonexistent/pitch.json"])).is_err());
    }
}
