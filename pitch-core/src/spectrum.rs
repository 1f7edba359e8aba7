//! # Spectral Analysis Module
//!
//! Turns one audio block into a band-limited magnitude spectrum.
//!
//! ## Features
//! - FFT planned once per analyzer using RustFFT
//! - Band restriction to `[min_freq, max_freq)` in whole bins
//! - Magnitudes normalized by block size
//!
//! No window or DC removal is applied. The significance threshold is
//! calibrated against raw `|X| / N` magnitudes.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::Serialize;
use std::ops::Range;
use std::sync::Arc;

use crate::block::AudioBlock;
use crate::config::DetectorConfig;

/// One retained frequency bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectrumBin {
    /// Bin center in Hz
    pub frequency: f32,
    /// `|X[i]| / N`
    pub magnitude: f32,
}

/// Band-limited magnitude spectrum in ascending frequency order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Spectrum {
    bins: Vec<SpectrumBin>,
}

impl Spectrum {
    pub fn bins(&self) -> &[SpectrumBin] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpectrumBin> {
        self.bins.iter()
    }

    pub fn frequencies(&self) -> impl Iterator<Item = f32> + '_ {
        self.bins.iter().map(|bin| bin.frequency)
    }

    pub fn magnitudes(&self) -> impl Iterator<Item = f32> + '_ {
        self.bins.iter().map(|bin| bin.magnitude)
    }
}

/// Collects bins that are already in ascending frequency order.
impl FromIterator<SpectrumBin> for Spectrum {
    fn from_iter<I: IntoIterator<Item = SpectrumBin>>(iter: I) -> Self {
        Self {
            bins: iter.into_iter().collect(),
        }
    }
}

/// Computes the retained bin indices `[min_index, max_index)` for a band.
///
/// `min_index = floor(min_freq * N / R)` and `max_index = floor(max_freq * N / R)`,
/// with the upper end clipped at Nyquist (`N / 2`). An inverted, negative or
/// non-finite band, or one entirely above Nyquist, yields an empty range.
pub fn band_indices(
    sample_rate: u32,
    block_size: usize,
    min_freq: f32,
    max_freq: f32,
) -> Range<usize> {
    let valid = sample_rate > 0
        && block_size > 0
        && min_freq.is_finite()
        && max_freq.is_finite()
        && min_freq >= 0.0
        && min_freq < max_freq;
    if !valid {
        return 0..0;
    }

    let scale = block_size as f64 / sample_rate as f64;
    let nyquist_index = block_size / 2;
    let min_index = (min_freq as f64 * scale).floor() as usize;
    let max_index = ((max_freq as f64 * scale).floor() as usize).min(nyquist_index);

    if min_index >= max_index {
        0..0
    } else {
        min_index..max_index
    }
}

/// Center frequency of bin `index` for a block of `block_size` samples.
pub fn bin_frequency(index: usize, sample_rate: u32, block_size: usize) -> f32 {
    (index as f64 * sample_rate as f64 / block_size as f64) as f32
}

/// Produces band-limited spectra for blocks of a fixed size.
///
/// The forward FFT is planned at construction. A block of any other length
/// is still analyzed, with a plan made on the spot.
pub struct SpectralAnalyzer {
    sample_rate: u32,
    block_size: usize,
    min_freq: f32,
    max_freq: f32,
    fft: Arc<dyn Fft<f32>>,
}

impl std::fmt::Debug for SpectralAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralAnalyzer")
            .field("sample_rate", &self.sample_rate)
            .field("block_size", &self.block_size)
            .field("min_freq", &self.min_freq)
            .field("max_freq", &self.max_freq)
            .finish()
    }
}

impl SpectralAnalyzer {
    pub fn new(config: &DetectorConfig) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.block_size);
        let band = band_indices(
            config.sample_rate,
            config.block_size,
            config.min_freq,
            config.max_freq,
        );
        log::debug!(
            "Planned {}-point FFT, keeping bins {}..{} ({:.2} Hz per bin)",
            config.block_size,
            band.start,
            band.end,
            config.bin_width()
        );

        Self {
            sample_rate: config.sample_rate,
            block_size: config.block_size,
            min_freq: config.min_freq,
            max_freq: config.max_freq,
            fft,
        }
    }

    /// Analyzes one block with the configured rate and band.
    pub fn analyze(&self, block: &AudioBlock) -> Spectrum {
        if block.len() == self.block_size {
            spectrum_with(
                self.fft.as_ref(),
                block.samples(),
                self.sample_rate,
                self.min_freq,
                self.max_freq,
            )
        } else {
            analyze(block.samples(), self.sample_rate, self.min_freq, self.max_freq)
        }
    }

    /// The bin range every spectrum from this analyzer covers.
    pub fn band(&self) -> Range<usize> {
        band_indices(self.sample_rate, self.block_size, self.min_freq, self.max_freq)
    }
}

/// One-shot analysis that plans its own FFT.
///
/// Prefer [`SpectralAnalyzer`] for a stream of same-sized blocks.
pub fn analyze(samples: &[i16], sample_rate: u32, min_freq: f32, max_freq: f32) -> Spectrum {
    if samples.is_empty() {
        return Spectrum::default();
    }
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(samples.len());
    spectrum_with(fft.as_ref(), samples, sample_rate, min_freq, max_freq)
}

fn spectrum_with(
    fft: &dyn Fft<f32>,
    samples: &[i16],
    sample_rate: u32,
    min_freq: f32,
    max_freq: f32,
) -> Spectrum {
    let n = samples.len();
    let band = band_indices(sample_rate, n, min_freq, max_freq);
    if band.is_empty() {
        return Spectrum::default();
    }

    let mut buffer: Vec<Complex<f32>> = samples
        .iter()
        .map(|&sample| Complex {
            re: sample as f32,
            im: 0.0,
        })
        .collect();
    fft.process(&mut buffer);

    let norm = n as f32;
    let bins = band
        .map(|i| SpectrumBin {
            frequency: bin_frequency(i, sample_rate, n),
            magnitude: buffer[i].norm() / norm, // .norm() is sqrt(re^2 + im^2)
        })
        .collect();

    Spectrum { bins }
}
