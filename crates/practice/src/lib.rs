pub mod analytics;
pub mod looper;
pub mod player;
pub mod session;

pub use analytics::{PracticeStatistics, SessionSummary};
pub use looper::{DeferredPlay, LoopController};
pub use player::{PlaybackEngine, PlayerCommand, RecordingPlayer};
pub use session::{LoopPhase, LoopSession, PracticeState};
