//! Practice-loop controller.
//!
//! Drives the external player through `Idle -> Armed -> Looping -> Idle`.
//! Session state lives in a shared cell so the playback-finished handler,
//! registered once per activation, always reads the current loop tempo.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use fretloop_domain::{
    playback_range, BarRange, EventBus, PlayerEvent, PracticeSettings, Score, Subscription,
    TempoRampPolicy,
};
use tracing::{debug, info, instrument};

use crate::analytics::SessionSummary;
use crate::player::PlaybackEngine;
use crate::session::{LoopPhase, LoopSession, PracticeState};

pub struct LoopController {
    player: Rc<dyn PlaybackEngine>,
    bus: EventBus<PlayerEvent>,
    session: Rc<RefCell<LoopSession>>,
    finished: Option<Subscription>,
    count_in_volume: f32,
    play_delay: Duration,
    last_summary: Option<SessionSummary>,
}

impl LoopController {
    pub fn new(
        player: Rc<dyn PlaybackEngine>,
        bus: EventBus<PlayerEvent>,
        settings: &PracticeSettings,
    ) -> Self {
        Self {
            player,
            bus,
            session: Rc::new(RefCell::new(LoopSession::new(settings))),
            finished: None,
            count_in_volume: settings.count_in_volume,
            play_delay: Duration::from_millis(settings.play_delay_ms),
            last_summary: None,
        }
    }

    /// Installs the bar timing of a newly loaded score, or clears it with `None`.
    pub fn set_score(&mut self, score: Option<&Score>) {
        self.session.borrow_mut().load_score(score);
        debug!(
            bars = self.session.borrow().total_bars(),
            "practice score updated"
        );
    }

    pub fn phase(&self) -> LoopPhase {
        self.session.borrow().phase()
    }

    pub fn loop_count(&self) -> u32 {
        self.session.borrow().loop_count()
    }

    pub fn range(&self) -> BarRange {
        self.session.borrow().range()
    }

    pub fn policy(&self) -> TempoRampPolicy {
        self.session.borrow().policy()
    }

    pub fn state(&self) -> PracticeState {
        self.session.borrow().snapshot()
    }

    /// Summary of the most recent looping run that was torn down.
    pub fn last_summary(&self) -> Option<&SessionSummary> {
        self.last_summary.as_ref()
    }

    pub fn is_subscribed(&self) -> bool {
        self.finished.is_some()
    }

    pub fn activate(&mut self) {
        let tempo = self.player.tempo();
        if !self.session.borrow_mut().arm(tempo) {
            debug!("practice mode already active");
            return;
        }
        self.finished = Some(self.subscribe_finished());
        info!(saved_tempo = tempo, "practice mode armed");
    }

    pub fn deactivate(&mut self) {
        self.teardown("deactivate");
    }

    pub fn stop_loop(&mut self) {
        self.teardown("stop_loop");
    }

    pub fn set_range(&mut self, start: u32, end: u32) {
        self.session.borrow_mut().set_range(start, end);
    }

    pub fn set_loop_tempo(&mut self, tempo: f32) {
        self.session.borrow_mut().policy_mut().set_loop_tempo(tempo);
    }

    pub fn set_gradual_increase(&mut self, enabled: bool) {
        self.session
            .borrow_mut()
            .policy_mut()
            .set_gradual_increase(enabled);
    }

    pub fn set_tempo_increment(&mut self, increment: f32) {
        self.session.borrow_mut().policy_mut().set_increment(increment);
    }

    pub fn set_max_tempo(&mut self, max: f32) {
        self.session.borrow_mut().policy_mut().set_max_tempo(max);
    }

    pub fn toggle_count_in(&mut self) {
        self.session.borrow_mut().toggle_count_in();
    }

    /// Applies the selected range to the player and starts looping it.
    ///
    /// The player applies a playback range asynchronously, so play is not
    /// issued here: the returned [`DeferredPlay`] issues it after the
    /// configured delay. Returns `None` without touching the session when
    /// practice mode is off or the range does not resolve to ticks.
    #[instrument(skip(self))]
    pub fn start_loop(&mut self) -> Option<DeferredPlay> {
        let range = {
            let session = self.session.borrow();
            if session.phase() == LoopPhase::Idle {
                debug!("start_loop ignored while idle");
                return None;
            }
            match playback_range(session.bars(), session.range()) {
                Some(range) => range,
                None => {
                    debug!(
                        bars = session.total_bars(),
                        "selected bars do not resolve to a playback range"
                    );
                    return None;
                }
            }
        };

        self.player.stop();
        self.player.set_playback_range(Some(range));
        self.player.set_looping(true);

        let (epoch, tempo, count_in) = {
            let mut session = self.session.borrow_mut();
            let epoch = session.begin_looping();
            (
                epoch,
                session.policy().loop_tempo(),
                session.count_in_enabled(),
            )
        };
        self.player.set_tempo(tempo);
        self.player
            .set_count_in_volume(if count_in { self.count_in_volume } else { 0.0 });

        info!(
            start_tick = range.start_tick,
            end_tick = range.end_tick,
            tempo,
            count_in,
            "practice loop started"
        );
        Some(DeferredPlay {
            session: Rc::clone(&self.session),
            player: Rc::clone(&self.player),
            epoch,
            delay: self.play_delay,
        })
    }

    fn subscribe_finished(&self) -> Subscription {
        let session = Rc::clone(&self.session);
        let player = Rc::clone(&self.player);
        self.bus.subscribe(move |event| {
            if !matches!(event, PlayerEvent::PlayerFinished) {
                return;
            }
            let (ramped, loop_count) = {
                let mut session = session.borrow_mut();
                let ramped = session.complete_iteration();
                (ramped, session.loop_count())
            };
            debug!(loop_count, "loop iteration finished");
            if let Some(tempo) = ramped {
                player.set_tempo(tempo);
                info!(tempo, loop_count, "loop tempo ramped");
            }
        })
    }

    fn teardown(&mut self, reason: &'static str) {
        let (saved_tempo, summary) = {
            let mut session = self.session.borrow_mut();
            if session.phase() == LoopPhase::Idle {
                debug!(reason, "practice mode already idle");
                return;
            }
            let summary = session.start_tempo().map(|start_tempo| {
                SessionSummary::new(
                    session.range(),
                    session.loop_count(),
                    start_tempo,
                    session.policy().loop_tempo(),
                )
            });
            (session.reset(), summary)
        };
        self.finished = None;

        self.player.stop();
        self.player.set_playback_range(None);
        self.player.set_looping(false);
        if let Some(tempo) = saved_tempo {
            self.player.set_tempo(tempo);
        }
        self.player.set_count_in_volume(0.0);

        if summary.is_some() {
            self.last_summary = summary;
        }
        info!(reason, ?saved_tempo, "practice mode stopped");
    }
}

/// Play command held back until the player has taken the new range.
#[must_use = "the loop does not start playing until the deferred play fires"]
pub struct DeferredPlay {
    session: Rc<RefCell<LoopSession>>,
    player: Rc<dyn PlaybackEngine>,
    epoch: u64,
    delay: Duration,
}

impl DeferredPlay {
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// True while the loop that produced this play is still running.
    pub fn is_current(&self) -> bool {
        let session = self.session.borrow();
        session.phase() == LoopPhase::Looping && session.epoch() == self.epoch
    }

    /// Issues play now. Does nothing if the loop was stopped or restarted since.
    pub fn fire(self) -> bool {
        if !self.is_current() {
            debug!(epoch = self.epoch, "stale deferred play dropped");
            return false;
        }
        self.player.play_pause();
        true
    }

    /// Waits out the delay on the tokio timer, then fires.
    pub async fn run(self) -> bool {
        tokio::time::sleep(self.delay).await;
        self.fire()
    }
}

impl std::fmt::Debug for DeferredPlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredPlay")
            .field("epoch", &self.epoch)
            .field("delay", &self.delay)
            .finish()
    }
}
