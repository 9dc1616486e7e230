pub mod chord;
pub mod diagram;
pub mod engine;
pub mod fretboard;

pub use chord::{classify, detect_chord, ActiveChord, ChordMatch, ChordQuality};
pub use diagram::{BarreSpan, ChordDiagramLayout, StringMarker};
pub use engine::{InferenceSnapshot, LiveInferenceEngine};
pub use fretboard::{note_name, FretMarker, FretPosition, FretboardLayout, MappedNotes};
