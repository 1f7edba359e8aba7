//! Maps a frequency to the note whose tolerance band contains it.

use std::sync::Arc;

use crate::notes::{overlapping_ranges, NoteFrequencyTable, NoteRange};

/// Name reported when no note matches.
pub const NOT_AVAILABLE: &str = "NA";

/// Returns the first range, in table order, whose open interval contains
/// `frequency`.
///
/// Exact boundary values match nothing. With overlapping ranges the lower
/// note wins.
pub fn classify(frequency: f32, ranges: &[NoteRange]) -> Option<&NoteRange> {
    ranges.iter().find(|range| range.contains(frequency))
}

/// Note ranges built once from a table, shared read-only between pipelines.
#[derive(Debug, Clone)]
pub struct NoteClassifier {
    ranges: Arc<[NoteRange]>,
    note_width: f32,
}

impl NoteClassifier {
    pub fn new(table: &NoteFrequencyTable, note_width: f32) -> Self {
        let ranges = table.build_ranges(note_width);

        let overlaps = overlapping_ranges(&ranges);
        if !overlaps.is_empty() {
            log::warn!(
                "Note width {} makes {} pairs of note ranges overlap (first: {} / {}); \
                 the lower note wins",
                note_width,
                overlaps.len(),
                ranges[overlaps[0].0].name,
                ranges[overlaps[0].1].name
            );
        }

        Self {
            ranges: ranges.into(),
            note_width,
        }
    }

    /// The note width the ranges were built with.
    pub fn note_width(&self) -> f32 {
        self.note_width
    }

    pub fn ranges(&self) -> &[NoteRange] {
        &self.ranges
    }

    pub fn classify(&self, frequency: f32) -> Option<&NoteRange> {
        classify(frequency, &self.ranges)
    }

    /// Like [`classify`](Self::classify) but yields the report name, `"NA"` when unmatched.
    pub fn note_name(&self, frequency: f32) -> &str {
        self.classify(frequency)
            .map_or(NOT_AVAILABLE, |range| range.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::{build_ranges, Note};

    fn standard() -> NoteClassifier {
        NoteClassifier::new(NoteFrequencyTable::standard(), 300.0)
    }

    #[test]
    fn test_canonical_frequencies_classify_as_themselves() {
        let classifier = standard();
        for note in NoteFrequencyTable::standard().notes() {
            assert_eq!(classifier.note_name(note.frequency), note.name);
        }
    }

    #[test]
    fn test_inside_band() {
        let classifier = standard();
        assert_eq!(classifier.note_name(441.43), "A4");
        assert_eq!(classifier.note_name(435.0), "A4");
        assert_eq!(classifier.note_name(262.5), "C4");
    }

    #[test]
    fn test_boundaries_are_not_available() {
        let classifier = standard();
        let a4 = classifier.ranges().iter().find(|r| r.name == "A4").unwrap().clone();
        assert_eq!(classifier.note_name(a4.lower), NOT_AVAILABLE);
        assert_eq!(classifier.note_name(a4.upper), NOT_AVAILABLE);
        assert_eq!(classifier.note_name(a4.center), "A4");
    }

    #[test]
    fn test_out_of_table_and_gaps() {
        let classifier = standard();
        assert!(classifier.classify(0.0).is_none());
        assert!(classifier.classify(30.0).is_none());
        assert!(classifier.classify(5000.0).is_none());
        // Quarter tone between A4 and A#4 falls in the 20 cent gap.
        let quarter_tone = 440.0 * 2.0_f32.powf(0.5 / 12.0);
        assert_eq!(classifier.note_name(quarter_tone), NOT_AVAILABLE);
    }

    #[test]
    fn test_overlap_prefers_lower_note() {
        let ranges = build_ranges(&[Note::new("A4", 440.0), Note::new("A#4", 466.16)], 100.0);
        assert!(ranges[0].upper > ranges[1].lower);
        let shared = (ranges[0].upper + ranges[1].lower) / 2.0;
        assert_eq!(classify(shared, &ranges).map(|r| r.name.as_str()), Some("A4"));
    }

    #[test]
    fn test_clones_share_ranges() {
        let classifier = standard();
        let clone = classifier.clone();
        assert!(std::ptr::eq(classifier.ranges(), clone.ranges()));
    }
}
