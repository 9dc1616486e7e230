use fretloop_domain::events::{ActiveBeat, MUTED};
use serde::{Deserialize, Serialize};

use crate::chord::pitch_class_name;

pub const FRET_WIDTH: f32 = 50.0;
pub const STRING_SPACING: f32 = 20.0;
pub const NUT_WIDTH: f32 = 6.0;
pub const LABEL_WIDTH: f32 = 36.0;
pub const PADDING_Y: f32 = 16.0;
pub const SINGLE_MARKER_FRETS: [u8; 5] = [3, 5, 7, 9, 15];
pub const DOUBLE_MARKER_FRET: u8 = 12;

/// A note to highlight on the fretboard.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct FretPosition {
    /// 1-based string number, string 1 being the lowest pitched.
    pub string: u8,
    pub fret: u8,
}

/// `"C4"`-style name of a MIDI pitch.
pub fn note_name(midi: u8) -> String {
    let octave = i32::from(midi) / 12 - 1;
    format!("{}{}", pitch_class_name(midi % 12), octave)
}

/// String count implied by a tuning, or `fallback` when the tuning is empty.
pub fn string_count(tuning: &[u8], fallback: usize) -> usize {
    if tuning.is_empty() {
        fallback
    } else {
        tuning.len()
    }
}

/// Sounding notes of one notification, translated for display and for chord naming.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MappedNotes {
    /// Every note, in delivery order.
    pub positions: Vec<FretPosition>,
    /// Pitches of the notes on tuned strings.
    pub pitches: Vec<u8>,
    /// Fret per string, `-1` where nothing sounds. Later notes on a string win.
    pub shape: Vec<i8>,
}

impl MappedNotes {
    pub fn distinct_pitch_count(&self) -> usize {
        let mut pitches = self.pitches.clone();
        pitches.sort_unstable();
        pitches.dedup();
        pitches.len()
    }
}

/// Flattens the active beats into fret positions, pitches and a chord shape.
pub fn map_notes(beats: &[ActiveBeat], tuning: &[u8], string_count: usize) -> MappedNotes {
    let mut mapped = MappedNotes {
        shape: vec![MUTED; string_count],
        ..Default::default()
    };
    for note in beats.iter().flat_map(|beat| beat.notes.iter()) {
        mapped.positions.push(FretPosition {
            string: note.string,
            fret: note.fret,
        });
        let Some(index) = (note.string as usize).checked_sub(1) else {
            continue;
        };
        if index >= string_count {
            continue;
        }
        mapped.shape[index] = note.fret.min(i8::MAX as u8) as i8;
        if let Some(open) = tuning.get(index) {
            mapped.pitches.push(open.saturating_add(note.fret));
        }
    }
    mapped
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct FretMarker {
    pub fret: u8,
    pub x: f32,
    pub y: f32,
}

/// Geometry of the horizontal fretboard view, in pixels.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FretboardLayout {
    pub strings: usize,
    pub frets: u8,
}

impl FretboardLayout {
    pub fn new(strings: usize, frets: u8) -> Self {
        Self { strings, frets }
    }

    pub fn width(&self) -> f32 {
        LABEL_WIDTH + NUT_WIDTH + f32::from(self.frets) * FRET_WIDTH
    }

    pub fn height(&self) -> f32 {
        self.strings.saturating_sub(1) as f32 * STRING_SPACING + PADDING_Y * 2.0
    }

    /// Row counted from the top; the highest string is drawn first, so string 1 ends up at the bottom.
    pub fn display_row(&self, string: u8) -> i32 {
        self.strings as i32 - i32::from(string)
    }

    pub fn row_y(&self, row: i32) -> f32 {
        PADDING_Y + row as f32 * STRING_SPACING
    }

    /// Centre of the fret space, or the nut for open strings.
    pub fn note_x(&self, fret: u8) -> f32 {
        if fret == 0 {
            LABEL_WIDTH + NUT_WIDTH / 2.0
        } else {
            LABEL_WIDTH + NUT_WIDTH + (f32::from(fret) - 0.5) * FRET_WIDTH
        }
    }

    pub fn note_center(&self, position: FretPosition) -> (f32, f32) {
        (
            self.note_x(position.fret),
            self.row_y(self.display_row(position.string)),
        )
    }

    pub fn markers(&self) -> Vec<FretMarker> {
        let mid_y = self.height() / 2.0;
        let mut markers = Vec::new();
        for fret in 1..=self.frets {
            let x = self.note_x(fret);
            if fret == DOUBLE_MARKER_FRET {
                markers.push(FretMarker {
                    fret,
                    x,
                    y: mid_y - STRING_SPACING * 1.2,
                });
                markers.push(FretMarker {
                    fret,
                    x,
                    y: mid_y + STRING_SPACING * 1.2,
                });
            } else if SINGLE_MARKER_FRETS.contains(&fret) {
                markers.push(FretMarker { fret, x, y: mid_y });
            }
        }
        markers
    }

    /// Open-string names from the top row down, `None` for untuned strings.
    pub fn string_labels(&self, tuning: &[u8]) -> Vec<Option<String>> {
        (0..self.strings)
            .map(|row| {
                let index = self.strings - 1 - row;
                tuning.get(index).map(|&pitch| note_name(pitch))
            })
            .collect()
    }
}
