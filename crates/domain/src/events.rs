use serde::{Deserialize, Serialize};

/// Marker for a muted string in a chord shape.
pub const MUTED: i8 = -1;

/// One sounding note, addressed the way the engine reports it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct NoteEvent {
    /// 1-based string number, string 1 being the lowest pitched.
    pub string: u8,
    pub fret: u8,
}

impl NoteEvent {
    pub fn new(string: u8, fret: u8) -> Self {
        Self { string, fret }
    }
}

/// Chord diagram written into the score by its author.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChordAnnotation {
    pub name: String,
    #[serde(default)]
    pub first_fret: u8,
    /// Fret per string: `-1` muted, `0` open.
    #[serde(default)]
    pub strings: Vec<i8>,
    #[serde(default)]
    pub barre_frets: Vec<u8>,
}

/// A beat that is sounding right now.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveBeat {
    #[serde(default)]
    pub chord: Option<ChordAnnotation>,
    #[serde(default)]
    pub notes: Vec<NoteEvent>,
}

impl ActiveBeat {
    pub fn from_notes(notes: impl IntoIterator<Item = (u8, u8)>) -> Self {
        Self {
            chord: None,
            notes: notes
                .into_iter()
                .map(|(string, fret)| NoteEvent::new(string, fret))
                .collect(),
        }
    }

    pub fn with_chord(mut self, chord: ChordAnnotation) -> Self {
        self.chord = Some(chord);
        self
    }
}

/// Notifications published by the playback engine.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerEvent {
    ActiveBeatsChanged { beats: Vec<ActiveBeat> },
    /// Playback reached the end of the range (once per completed loop).
    PlayerFinished,
}
