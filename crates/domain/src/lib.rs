pub mod bus;
pub mod error;
pub mod events;
pub mod io;
pub mod range;
pub mod score;
pub mod settings;
pub mod tempo;

pub use crate::bus::{EventBus, Subscription};
pub use crate::error::DomainError;
pub use crate::events::{ActiveBeat, ChordAnnotation, NoteEvent, PlayerEvent};
pub use crate::io::{ReplayScript, ReplayStep, ScriptFormat};
pub use crate::range::{playback_range, BarRange, PlaybackRange};
pub use crate::score::{MasterBar, Score, Track};
pub use crate::settings::PracticeSettings;
pub use crate::tempo::TempoRampPolicy;
