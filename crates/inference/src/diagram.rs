use serde::{Deserialize, Serialize};

use crate::chord::ActiveChord;

pub const STRING_SPACING: f32 = 16.0;
pub const FRET_SPACING: f32 = 22.0;
pub const FRETS_SHOWN: i32 = 5;
pub const PADDING_X: f32 = 20.0;
pub const PADDING_TOP: f32 = 32.0;
pub const NUT_HEIGHT: f32 = 4.0;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum StringMarker {
    Muted,
    Open,
    /// Finger dot, `rel_fret` counted from the top of the box (1-based).
    Dot { rel_fret: i32 },
    /// Fretted outside the five frets shown.
    Hidden,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BarreSpan {
    pub fret: u8,
    pub rel_fret: i32,
    pub first_string: usize,
    pub last_string: usize,
}

/// Placement of a chord in a vertical five-fret chord box.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChordDiagramLayout {
    pub strings: usize,
    /// True when the box starts at the nut; otherwise `base_fret` is printed beside it.
    pub at_nut: bool,
    pub base_fret: u8,
    pub markers: Vec<StringMarker>,
    pub barres: Vec<BarreSpan>,
}

impl ChordDiagramLayout {
    pub fn new(chord: &ActiveChord, strings: usize) -> Self {
        let at_nut = chord.first_fret <= 1;
        let base_fret = if at_nut { 1 } else { chord.first_fret };
        let rel = |fret: i32| fret - i32::from(base_fret) + 1;
        let visible = |rel_fret: i32| (1..=FRETS_SHOWN).contains(&rel_fret);

        let markers = chord
            .string_frets
            .iter()
            .take(strings)
            .map(|&fret| match fret {
                -1 => StringMarker::Muted,
                0 => StringMarker::Open,
                fret if visible(rel(i32::from(fret))) => StringMarker::Dot {
                    rel_fret: rel(i32::from(fret)),
                },
                _ => StringMarker::Hidden,
            })
            .collect();

        let barres = chord
            .barre_frets
            .iter()
            .filter_map(|&fret| {
                let rel_fret = rel(i32::from(fret));
                if !visible(rel_fret) {
                    return None;
                }
                let mut covered = chord
                    .string_frets
                    .iter()
                    .enumerate()
                    .filter(|(_, &value)| i32::from(value) == i32::from(fret))
                    .map(|(index, _)| index);
                let first_string = covered.next()?;
                let last_string = covered.last().unwrap_or(first_string);
                Some(BarreSpan {
                    fret,
                    rel_fret,
                    first_string,
                    last_string,
                })
            })
            .collect();

        Self {
            strings,
            at_nut,
            base_fret,
            markers,
            barres,
        }
    }

    pub fn width(&self) -> f32 {
        PADDING_X * 2.0 + self.strings.saturating_sub(1) as f32 * STRING_SPACING
    }

    pub fn height(&self) -> f32 {
        PADDING_TOP + FRETS_SHOWN as f32 * FRET_SPACING + 24.0
    }

    pub fn string_x(&self, string_index: usize) -> f32 {
        PADDING_X + string_index as f32 * STRING_SPACING
    }

    /// Vertical centre of a fret space inside the box.
    pub fn fret_y(&self, rel_fret: i32) -> f32 {
        PADDING_TOP + NUT_HEIGHT + (rel_fret as f32 - 0.5) * FRET_SPACING
    }
}
