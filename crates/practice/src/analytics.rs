use fretloop_domain::BarRange;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Outcome of one looping run, recorded when the session is torn down.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub range: BarRange,
    pub loops_completed: u32,
    pub start_tempo: f32,
    pub final_tempo: f32,
    pub finished_at: OffsetDateTime,
}

impl SessionSummary {
    pub fn new(range: BarRange, loops_completed: u32, start_tempo: f32, final_tempo: f32) -> Self {
        Self {
            range,
            loops_completed,
            start_tempo,
            final_tempo,
            finished_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn tempo_gain(&self) -> f32 {
        self.final_tempo - self.start_tempo
    }

    pub fn update_statistics(&self, stats: &mut PracticeStatistics) {
        stats.sessions += 1;
        stats.total_loops += self.loops_completed;
        stats.highest_tempo = stats.highest_tempo.max(self.final_tempo);
        stats.last_practiced = Some(self.finished_at);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PracticeStatistics {
    pub sessions: u32,
    pub total_loops: u32,
    pub highest_tempo: f32,
    pub last_practiced: Option<OffsetDateTime>,
}
