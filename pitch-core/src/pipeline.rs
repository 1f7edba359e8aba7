//! # Pitch Detection Pipeline
//!
//! Drives one block through analysis, peak extraction and classification.
//! Each call is independent: nothing is carried from one block to the next,
//! so the same block always gives the same result.

use std::sync::Arc;

use crate::{
    block::AudioBlock,
    classify::NoteClassifier,
    config::DetectorConfig,
    error::ConfigError,
    notes::{cents_deviation, NoteFrequencyTable},
    peak::{extract_peak, DominantPeak},
    spectrum::{SpectralAnalyzer, Spectrum},
    ClassificationResult,
};

/// Block-to-note detector built from a validated configuration.
#[derive(Debug, Clone)]
pub struct PitchDetector {
    config: DetectorConfig,
    analyzer: Arc<SpectralAnalyzer>,
    classifier: NoteClassifier,
}

impl PitchDetector {
    /// Validates `config` and prepares the FFT plan and note ranges.
    pub fn new(config: DetectorConfig, table: &NoteFrequencyTable) -> Result<Self, ConfigError> {
        config.validate()?;
        let classifier = NoteClassifier::new(table, config.note_width);
        Ok(Self::build(config, classifier))
    }

    /// Builds a detector around an existing classifier so several streams
    /// can share one set of note ranges.
    ///
    /// The classifier must have been built with `config.note_width`.
    pub fn with_classifier(
        config: DetectorConfig,
        classifier: NoteClassifier,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if classifier.note_width() != config.note_width {
            return Err(ConfigError::NoteWidthMismatch {
                config: config.note_width,
                classifier: classifier.note_width(),
            });
        }
        Ok(Self::build(config, classifier))
    }

    fn build(config: DetectorConfig, classifier: NoteClassifier) -> Self {
        let analyzer = SpectralAnalyzer::new(&config);
        log::info!(
            "Detector ready: {} Hz, {} samples per block, band {}-{} Hz, threshold {}, {} notes",
            config.sample_rate,
            config.block_size,
            config.min_freq,
            config.max_freq,
            config.significance_threshold,
            classifier.ranges().len()
        );
        Self {
            config,
            analyzer: Arc::new(analyzer),
            classifier,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn classifier(&self) -> &NoteClassifier {
        &self.classifier
    }

    /// Classifies the dominant pitch of one block.
    pub fn process(&self, block: &AudioBlock) -> ClassificationResult {
        self.process_with_spectrum(block).0
    }

    /// Same as [`process`](Self::process), also handing back the spectrum the
    /// result was computed from.
    pub fn process_with_spectrum(&self, block: &AudioBlock) -> (ClassificationResult, Spectrum) {
        let spectrum = self.analyzer.analyze(block);
        let peak = extract_peak(&spectrum, self.config.significance_threshold);
        let result = self.classify_peak(peak);
        log::debug!("{}", result);
        (result, spectrum)
    }

    fn classify_peak(&self, peak: Option<DominantPeak>) -> ClassificationResult {
        let Some(peak) = peak else {
            return ClassificationResult::default();
        };

        match self.classifier.classify(peak.frequency) {
            Some(range) => ClassificationResult {
                detected_frequency: Some(peak.frequency),
                magnitude: Some(peak.magnitude),
                note_name: Some(range.name.clone()),
                target_frequency: Some(range.center),
                cents_deviation: Some(cents_deviation(peak.frequency, range.center)),
            },
            None => ClassificationResult {
                detected_frequency: Some(peak.frequency),
                magnitude: Some(peak.magnitude),
                ..Default::default()
            },
        }
    }
}
