//! Per-block report output.

use anyhow::Result;
use clap::ValueEnum;
use pitch_core::{ClassificationResult, Spectrum};
use serde::Serialize;
use std::io::Write;

/// Output format for reports written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// `DF: <freq>, KEY: <note>` lines
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    block: usize,
    frequency: f32,
    note: &'a str,
    #[serde(flatten)]
    result: &'a ClassificationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    spectrum: Option<&'a Spectrum>,
}

/// Writes the report for block number `index`.
///
/// In text mode the spectrum, when given, follows the report line as
/// tab-separated `frequency magnitude` rows.
pub fn write_report(
    out: &mut impl Write,
    format: Format,
    index: usize,
    result: &ClassificationResult,
    spectrum: Option<&Spectrum>,
) -> Result<()> {
    match format {
        Format::Text => {
            writeln!(out, "{}", result)?;
            if let Some(spectrum) = spectrum {
                for bin in spectrum.iter() {
                    writeln!(out, "{:.2}\t{:.4}", bin.frequency, bin.magnitude)?;
                }
            }
        }
        Format::Json => {
            let report = JsonReport {
                block: index,
                frequency: result.frequency_or_zero(),
                note: result.note_or_na(),
                result,
                spectrum,
            };
            serde_json::to_writer(&mut *out, &report)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitch_core::spectrum::SpectrumBin;
    use pretty_assertions::assert_eq;

    fn a4() -> ClassificationResult {
        ClassificationResult {
            detected_frequency: Some(441.430_66),
            magnitude: Some(4860.96),
            note_name: Some("A4".to_string()),
            target_frequency: Some(440.0),
            cents_deviation: Some(5.63),
        }
    }

    fn render(
        format: Format,
        result: &ClassificationResult,
        spectrum: Option<&Spectrum>,
    ) -> String {
        let mut out = Vec::new();
        write_report(&mut out, format, 3, result, spectrum).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_text_report() {
        assert_eq!(render(Format::Text, &a4(), None), "DF: 441.43, KEY: A4\n");
        assert_eq!(
            render(Format::Text, &ClassificationResult::default(), None),
            "DF: 0, KEY: NA\n"
        );
    }

    #[test]
    fn test_text_report_with_spectrum() {
        let spectrum: Spectrum = [
            SpectrumBin { frequency: 430.66, magnitude: 12.5 },
            SpectrumBin { frequency: 441.43, magnitude: 4860.96 },
        ]
        .into_iter()
        .collect();
        let text = render(Format::Text, &a4(), Some(&spectrum));
        assert_eq!(text, "DF: 441.43, KEY: A4\n430.66\t12.5000\n441.43\t4860.9600\n");
    }

    #[test]
    fn test_json_report() {
        let line = render(Format::Json, &a4(), None);
        assert!(line.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["block"], 3);
        assert_eq!(value["note"], "A4");
        assert_eq!(value["note_name"], "A4");
        assert_eq!(value["target_frequency"], 440.0);
        assert!(value.get("spectrum").is_none());
    }

    #[test]
    fn test_json_report_sentinels_and_spectrum() {
        let spectrum: Spectrum = [SpectrumBin { frequency: 50.0, magnitude: 0.0 }]
            .into_iter()
            .collect();
        let line = render(Format::Json, &ClassificationResult::default(), Some(&spectrum));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["frequency"], 0.0);
        assert_eq!(value["note"], "NA");
        assert!(value["note_name"].is_null());
        assert_eq!(value["spectrum"]["bins"][0]["frequency"], 50.0);
    }
}
