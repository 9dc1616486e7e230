//! Chord naming from a set of sounding MIDI pitches.
//!
//! The root is the pitch class of the lowest sounding note, and the
//! intervals above it are matched against an ordered rule table where the
//! first matching rule wins. Extended chords land on the nearest rule or fall
//! back to the bare root name.

use std::fmt;

use fretloop_domain::events::{ChordAnnotation, MUTED};
use serde::{Deserialize, Serialize};

pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

pub fn pitch_class_name(pitch_class: u8) -> &'static str {
    NOTE_NAMES[(pitch_class % 12) as usize]
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ChordQuality {
    Major,
    Minor,
    Dominant7,
    Minor7,
    Major7,
    Diminished,
    Augmented,
    Sus4,
    Sus2,
    Power,
    /// Only one pitch class is sounding.
    SingleNote,
    /// No rule matched; named after the root alone.
    Unclassified,
}

impl ChordQuality {
    pub fn suffix(self) -> &'static str {
        match self {
            ChordQuality::Major => "",
            ChordQuality::Minor => "m",
            ChordQuality::Dominant7 => "7",
            ChordQuality::Minor7 => "m7",
            ChordQuality::Major7 => "maj7",
            ChordQuality::Diminished => "dim",
            ChordQuality::Augmented => "aug",
            ChordQuality::Sus4 => "sus4",
            ChordQuality::Sus2 => "sus2",
            ChordQuality::Power => "5",
            ChordQuality::SingleNote | ChordQuality::Unclassified => "",
        }
    }
}

/// Set of pitch classes as a 12-bit mask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct PitchClassSet(u16);

impl PitchClassSet {
    fn from_pitches(pitches: &[u8]) -> Self {
        Self(pitches.iter().fold(0, |mask, pitch| mask | 1 << (pitch % 12)))
    }

    fn len(self) -> u32 {
        self.0.count_ones()
    }

    fn lowest(self) -> Option<u8> {
        (self.0 != 0).then(|| self.0.trailing_zeros() as u8)
    }

    /// Intervals above `root`, as a mask over 0..12.
    fn intervals_from(self, root: u8) -> Self {
        let root = u32::from(root % 12);
        let rotated = (u32::from(self.0) >> root) | (u32::from(self.0) << (12 - root));
        Self((rotated & 0xFFF) as u16)
    }

    fn has(self, interval: u8) -> bool {
        self.0 & (1 << interval) != 0
    }
}

struct ChordRule {
    quality: ChordQuality,
    required: &'static [u8],
    excluded: &'static [u8],
    /// Exact number of distinct pitch classes, when the rule needs one.
    size: Option<u32>,
}

impl ChordRule {
    fn matches(&self, intervals: PitchClassSet, size: u32) -> bool {
        self.required.iter().all(|&i| intervals.has(i))
            && !self.excluded.iter().any(|&i| intervals.has(i))
            && self.size.map_or(true, |expected| expected == size)
    }
}

const fn rule(
    quality: ChordQuality,
    required: &'static [u8],
    excluded: &'static [u8],
) -> ChordRule {
    ChordRule {
        quality,
        required,
        excluded,
        size: None,
    }
}

// Evaluated in order; the first match names the chord.
const CHORD_RULES: [ChordRule; 10] = [
    rule(ChordQuality::Major, &[4, 7], &[3, 10]),
    rule(ChordQuality::Minor, &[3, 7], &[4]),
    rule(ChordQuality::Dominant7, &[4, 7, 10], &[]),
    rule(ChordQuality::Minor7, &[3, 7, 10], &[]),
    rule(ChordQuality::Major7, &[4, 7, 11], &[]),
    rule(ChordQuality::Diminished, &[3, 6], &[7]),
    rule(ChordQuality::Augmented, &[4, 8], &[]),
    rule(ChordQuality::Sus4, &[5, 7], &[3, 4]),
    rule(ChordQuality::Sus2, &[2, 7], &[3, 4]),
    ChordRule {
        quality: ChordQuality::Power,
        required: &[7],
        excluded: &[],
        size: Some(2),
    },
];

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChordMatch {
    /// Pitch class of the root, 0 = C.
    pub root: u8,
    pub quality: ChordQuality,
}

impl ChordMatch {
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ChordMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", pitch_class_name(self.root), self.quality.suffix())
    }
}

/// Classifies the sounding pitches. Returns `None` only for an empty input.
pub fn detect_chord(pitches: &[u8]) -> Option<ChordMatch> {
    let lowest = *pitches.iter().min()?;
    let set = PitchClassSet::from_pitches(pitches);
    if set.len() == 1 {
        return set.lowest().map(|root| ChordMatch {
            root,
            quality: ChordQuality::SingleNote,
        });
    }

    let root = lowest % 12;
    let intervals = set.intervals_from(root);
    let quality = CHORD_RULES
        .iter()
        .find(|rule| rule.matches(intervals, set.len()))
        .map_or(ChordQuality::Unclassified, |rule| rule.quality);
    Some(ChordMatch { root, quality })
}

/// Chord label for the sounding pitches, e.g. `"Cm"`.
pub fn classify(pitches: &[u8]) -> Option<String> {
    detect_chord(pitches).map(|chord| chord.name())
}

/// The chord currently shown to the player.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveChord {
    pub name: String,
    pub first_fret: u8,
    /// Fret per string, string 1 first: `-1` muted, `0` open.
    pub string_frets: Vec<i8>,
    pub barre_frets: Vec<u8>,
}

impl ActiveChord {
    pub fn from_annotation(annotation: &ChordAnnotation) -> Self {
        Self {
            name: annotation.name.clone(),
            first_fret: annotation.first_fret,
            string_frets: annotation.strings.clone(),
            barre_frets: annotation.barre_frets.clone(),
        }
    }

    /// Builds a chord from an inferred name and a per-string shape.
    /// `first_fret` is the lowest fretted position, or 1 when every string is open or muted.
    pub fn inferred(name: String, string_frets: Vec<i8>) -> Self {
        let first_fret = string_frets
            .iter()
            .filter(|&&fret| fret > 0)
            .min()
            .map_or(1, |&fret| fret as u8);
        Self {
            name,
            first_fret,
            string_frets,
            barre_frets: Vec::new(),
        }
    }

    pub fn muted_strings(&self) -> usize {
        self.string_frets.iter().filter(|&&fret| fret == MUTED).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_common_triads() {
        assert_eq!(classify(&[60, 64, 67]).as_deref(), Some("C"));
        assert_eq!(classify(&[60, 63, 67]).as_deref(), Some("Cm"));
        assert_eq!(classify(&[60, 64, 67, 70]).as_deref(), Some("C7"));
        assert_eq!(classify(&[60, 67]).as_deref(), Some("C5"));
    }

    #[test]
    fn names_other_qualities() {
        assert_eq!(classify(&[62, 65, 68]).as_deref(), Some("Ddim"));
        assert_eq!(classify(&[60, 64, 68]).as_deref(), Some("Caug"));
        assert_eq!(classify(&[62, 67, 69]).as_deref(), Some("Dsus4"));
        assert_eq!(classify(&[62, 64, 69]).as_deref(), Some("Dsus2"));
    }

    #[test]
    fn earlier_rules_shadow_later_ones() {
        // A minor seventh still satisfies the minor rule first.
        assert_eq!(classify(&[57, 60, 64, 67]).as_deref(), Some("Am"));
        // A major seventh has no minor seventh, so the major rule claims it.
        assert_eq!(classify(&[60, 64, 67, 71]).as_deref(), Some("C"));
    }

    #[test]
    fn root_is_lowest_sounding_note() {
        // First-inversion C major: E in the bass takes the root.
        let chord = detect_chord(&[52, 60, 67]).unwrap();
        assert_eq!(chord.root, 4);
        assert_eq!(chord.name(), "E");
        // Guitar open E major voicing.
        assert_eq!(classify(&[40, 47, 52, 56, 59, 64]).as_deref(), Some("E"));
    }

    #[test]
    fn single_pitch_class_is_named_bare() {
        assert_eq!(classify(&[45]).as_deref(), Some("A"));
        let octaves = detect_chord(&[45, 57, 69]).unwrap();
        assert_eq!(octaves.quality, ChordQuality::SingleNote);
        assert_eq!(octaves.name(), "A");
    }

    #[test]
    fn unmatched_sets_fall_back_to_root() {
        let cluster = detect_chord(&[60, 61, 62]).unwrap();
        assert_eq!(cluster.quality, ChordQuality::Unclassified);
        assert_eq!(cluster.name(), "C");
        // A fifth plus a flat seventh is not a power chord.
        assert_eq!(classify(&[60, 67, 70]).as_deref(), Some("C"));
    }

    #[test]
    fn exclusions_block_diminished_and_suspended() {
        // A perfect fifth rules out diminished.
        assert_eq!(classify(&[60, 63, 66, 67]).as_deref(), Some("Cm"));
        let with_fifth = detect_chord(&[60, 63, 64, 66, 67]).unwrap();
        assert_eq!(with_fifth.quality, ChordQuality::Unclassified);
        assert_eq!(with_fifth.name(), "C");

        // Any third rules out the suspended chords.
        assert_eq!(classify(&[60, 64, 65, 67]).as_deref(), Some("C"));
        let with_thirds = detect_chord(&[60, 63, 64, 65, 67]).unwrap();
        assert_eq!(with_thirds.quality, ChordQuality::Unclassified);
        let second_with_thirds = detect_chord(&[62, 64, 65, 66, 69]).unwrap();
        assert_eq!(second_with_thirds.quality, ChordQuality::Unclassified);
    }

    #[test]
    fn empty_input_has_no_chord() {
        assert_eq!(detect_chord(&[]), None);
    }

    #[test]
    fn classification_is_deterministic_and_order_free() {
        let forward = classify(&[48, 55, 64, 67]);
        let reversed = classify(&[67, 64, 55, 48]);
        assert_eq!(forward, reversed);
        assert_eq!(forward, classify(&[48, 55, 64, 67]));
    }

    #[test]
    fn inferred_chord_first_fret() {
        let chord = ActiveChord::inferred("G".into(), vec![3, 2, 0, 0, 0, 3]);
        assert_eq!(chord.first_fret, 2);
        let open = ActiveChord::inferred("E5".into(), vec![0, 0, -1, -1, -1, -1]);
        assert_eq!(open.first_fret, 1);
        assert_eq!(open.muted_strings(), 4);
    }

    #[test]
    fn annotation_is_copied_verbatim() {
        let annotation = ChordAnnotation {
            name: "F".into(),
            first_fret: 1,
            strings: vec![1, 3, 3, 2, 1, 1],
            barre_frets: vec![1],
        };
        let chord = ActiveChord::from_annotation(&annotation);
        assert_eq!(chord.name, "F");
        assert_eq!(chord.string_frets, annotation.strings);
        assert_eq!(chord.barre_frets, vec![1]);
    }
}
