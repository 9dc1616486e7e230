use fretloop_domain::{BarRange, MasterBar, PracticeSettings, Score, TempoRampPolicy};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LoopPhase {
    Idle,
    /// Practice mode is on; range and tempo can be edited before playing.
    Armed,
    /// The range is applied and the player is looping it.
    Looping,
}

/// Mutable state of one practice session, shared with the playback-finished handler.
#[derive(Debug, Clone)]
pub struct LoopSession {
    phase: LoopPhase,
    range: BarRange,
    policy: TempoRampPolicy,
    loop_count: u32,
    saved_tempo: Option<f32>,
    count_in_enabled: bool,
    bars: Vec<MasterBar>,
    /// Bumped on every loop start and teardown.
    epoch: u64,
    start_tempo: Option<f32>,
}

impl LoopSession {
    pub fn new(settings: &PracticeSettings) -> Self {
        Self {
            phase: LoopPhase::Idle,
            range: settings.bar_range(),
            policy: settings.tempo_policy(),
            loop_count: 0,
            saved_tempo: None,
            count_in_enabled: settings.count_in,
            bars: Vec::new(),
            epoch: 0,
            start_tempo: None,
        }
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn range(&self) -> BarRange {
        self.range
    }

    pub fn policy(&self) -> TempoRampPolicy {
        self.policy
    }

    pub fn policy_mut(&mut self) -> &mut TempoRampPolicy {
        &mut self.policy
    }

    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    pub fn saved_tempo(&self) -> Option<f32> {
        self.saved_tempo
    }

    pub fn count_in_enabled(&self) -> bool {
        self.count_in_enabled
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn bars(&self) -> &[MasterBar] {
        &self.bars
    }

    pub fn total_bars(&self) -> u32 {
        self.bars.len() as u32
    }

    pub(crate) fn start_tempo(&self) -> Option<f32> {
        self.start_tempo
    }

    pub fn load_score(&mut self, score: Option<&Score>) {
        self.bars = score.map(|score| score.bars.clone()).unwrap_or_default();
        self.range = self.range.clamped_to(self.total_bars());
    }

    pub fn set_range(&mut self, start: u32, end: u32) {
        self.range = BarRange::new(start, end).clamped_to(self.total_bars());
        debug!(
            start = self.range.start_bar(),
            end = self.range.end_bar(),
            "practice range updated"
        );
    }

    pub fn toggle_count_in(&mut self) {
        self.count_in_enabled = !self.count_in_enabled;
    }

    pub(crate) fn arm(&mut self, current_tempo: f32) -> bool {
        if self.phase != LoopPhase::Idle {
            return false;
        }
        self.phase = LoopPhase::Armed;
        self.saved_tempo = Some(current_tempo);
        true
    }

    /// Enters `Looping` and returns the epoch identifying this run.
    pub(crate) fn begin_looping(&mut self) -> u64 {
        self.phase = LoopPhase::Looping;
        self.loop_count = 0;
        self.epoch += 1;
        let tempo = self.policy.starting_tempo();
        self.policy.set_loop_tempo(tempo);
        self.start_tempo = Some(tempo);
        self.epoch
    }

    /// Records a finished pass through the range. Returns the ramped tempo to
    /// push to the player, if it changed.
    pub fn complete_iteration(&mut self) -> Option<f32> {
        if self.phase != LoopPhase::Looping {
            return None;
        }
        self.loop_count += 1;
        self.policy.advance()
    }

    /// Returns to `Idle`, handing back the tempo captured at activation.
    pub(crate) fn reset(&mut self) -> Option<f32> {
        self.phase = LoopPhase::Idle;
        self.loop_count = 0;
        self.epoch += 1;
        self.start_tempo = None;
        self.saved_tempo.take()
    }

    pub fn snapshot(&self) -> PracticeState {
        PracticeState {
            active: self.phase != LoopPhase::Idle,
            looping: self.phase == LoopPhase::Looping,
            start_bar: self.range.start_bar(),
            end_bar: self.range.end_bar(),
            loop_tempo: self.policy.loop_tempo(),
            gradual_increase: self.policy.gradual_increase(),
            tempo_increment: self.policy.increment(),
            max_tempo: self.policy.max_tempo(),
            loop_count: self.loop_count,
            count_in_enabled: self.count_in_enabled,
            total_bars: self.total_bars(),
        }
    }
}

/// Read-only view of the session for presentation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PracticeState {
    pub active: bool,
    pub looping: bool,
    pub start_bar: u32,
    pub end_bar: u32,
    pub loop_tempo: f32,
    pub gradual_increase: bool,
    pub tempo_increment: f32,
    pub max_tempo: f32,
    pub loop_count: u32,
    pub count_in_enabled: bool,
    pub total_bars: u32,
}
