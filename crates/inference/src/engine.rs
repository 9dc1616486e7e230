//! Live chord and fretboard inference.
//!
//! Every "active beats changed" notification replaces the highlighted fret
//! positions. The displayed chord only changes when the score annotates one
//! or when at least two distinct pitches sound, so sparse passages keep the
//! last chord on screen.

use std::cell::RefCell;
use std::rc::Rc;

use fretloop_domain::{ActiveBeat, EventBus, PlayerEvent, PracticeSettings, Subscription};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::chord::{detect_chord, ActiveChord};
use crate::fretboard::{map_notes, string_count, FretPosition};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InferenceSnapshot {
    pub active_notes: Vec<FretPosition>,
    pub chord: Option<ActiveChord>,
}

#[derive(Debug)]
struct InferenceState {
    tuning: Vec<u8>,
    fallback_strings: usize,
    snapshot: InferenceSnapshot,
}

impl InferenceState {
    fn apply(&mut self, beats: &[ActiveBeat]) {
        let strings = string_count(&self.tuning, self.fallback_strings);
        let mapped = map_notes(beats, &self.tuning, strings);
        self.snapshot.active_notes = mapped.positions.clone();

        if let Some(annotation) = beats.iter().find_map(|beat| beat.chord.as_ref()) {
            trace!(name = %annotation.name, "using annotated chord");
            self.snapshot.chord = Some(ActiveChord::from_annotation(annotation));
            return;
        }

        if mapped.distinct_pitch_count() < 2 {
            trace!(
                notes = mapped.positions.len(),
                "too few pitches, keeping last chord"
            );
            return;
        }
        if let Some(detected) = detect_chord(&mapped.pitches) {
            let chord = ActiveChord::inferred(detected.name(), mapped.shape);
            debug!(name = %chord.name, first_fret = chord.first_fret, "chord inferred");
            self.snapshot.chord = Some(chord);
        }
    }
}

pub struct LiveInferenceEngine {
    state: Rc<RefCell<InferenceState>>,
    subscription: Option<Subscription>,
}

impl LiveInferenceEngine {
    /// Creates an engine that is not yet listening to any player.
    pub fn new(tuning: Vec<u8>, settings: &PracticeSettings) -> Self {
        Self {
            state: Rc::new(RefCell::new(InferenceState {
                tuning,
                fallback_strings: usize::from(settings.default_string_count),
                snapshot: InferenceSnapshot::default(),
            })),
            subscription: None,
        }
    }

    /// Creates an engine already subscribed to `bus`.
    pub fn attach(
        bus: &EventBus<PlayerEvent>,
        tuning: Vec<u8>,
        settings: &PracticeSettings,
    ) -> Self {
        let mut engine = Self::new(tuning, settings);
        engine.connect(bus);
        engine
    }

    /// Subscribes to `bus`, replacing any previous subscription.
    pub fn connect(&mut self, bus: &EventBus<PlayerEvent>) {
        let state = Rc::clone(&self.state);
        self.subscription = Some(bus.subscribe(move |event| {
            if let PlayerEvent::ActiveBeatsChanged { beats } = event {
                state.borrow_mut().apply(beats);
            }
        }));
    }

    pub fn detach(&mut self) {
        if self.subscription.take().is_some() {
            debug!("inference engine detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// Feeds one notification directly, bypassing the bus.
    pub fn handle(&self, beats: &[ActiveBeat]) {
        self.state.borrow_mut().apply(beats);
    }

    /// Swaps the tuning used for later notifications. The current chord stays on screen.
    pub fn set_tuning(&self, tuning: Vec<u8>) {
        self.state.borrow_mut().tuning = tuning;
    }

    pub fn string_count(&self) -> usize {
        let state = self.state.borrow();
        string_count(&state.tuning, state.fallback_strings)
    }

    pub fn snapshot(&self) -> InferenceSnapshot {
        self.state.borrow().snapshot.clone()
    }

    pub fn chord(&self) -> Option<ActiveChord> {
        self.state.borrow().snapshot.chord.clone()
    }

    pub fn active_notes(&self) -> Vec<FretPosition> {
        self.state.borrow().snapshot.active_notes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fretloop_domain::ChordAnnotation;

    const STANDARD: [u8; 6] = [40, 45, 50, 55, 59, 64];

    fn attached() -> (EventBus<PlayerEvent>, LiveInferenceEngine) {
        let bus = EventBus::new();
        let engine =
            LiveInferenceEngine::attach(&bus, STANDARD.to_vec(), &PracticeSettings::default());
        (bus, engine)
    }

    fn notes(bus: &EventBus<PlayerEvent>, notes: &[(u8, u8)]) {
        bus.emit(&PlayerEvent::ActiveBeatsChanged {
            beats: vec![ActiveBeat::from_notes(notes.iter().copied())],
        });
    }

    #[test]
    fn infers_chord_from_notes() {
        let (bus, engine) = attached();
        // Open C major: x 3 2 0 1 0
        notes(&bus, &[(2, 3), (3, 2), (4, 0), (5, 1), (6, 0)]);
        let chord = engine.chord().unwrap();
        assert_eq!(chord.name, "C");
        assert_eq!(chord.first_fret, 1);
        assert_eq!(chord.string_frets, vec![-1, 3, 2, 0, 1, 0]);
        assert!(chord.barre_frets.is_empty());
        assert_eq!(engine.active_notes().len(), 5);
    }

    #[test]
    fn sparse_notifications_keep_last_chord() {
        let (bus, engine) = attached();
        // C minor barre shape on the 3rd fret.
        notes(&bus, &[(2, 3), (3, 5), (4, 5), (5, 4)]);
        assert_eq!(engine.chord().unwrap().name, "Cm");

        notes(&bus, &[]);
        let snapshot = engine.snapshot();
        assert!(snapshot.active_notes.is_empty());
        assert_eq!(snapshot.chord.unwrap().name, "Cm");

        notes(&bus, &[(1, 5)]);
        assert_eq!(engine.active_notes(), vec![FretPosition { string: 1, fret: 5 }]);
        assert_eq!(engine.chord().unwrap().name, "Cm");
    }

    #[test]
    fn repeated_pitch_does_not_count_twice() {
        let (bus, engine) = attached();
        notes(&bus, &[(1, 0), (2, 2)]);
        assert_eq!(engine.chord().unwrap().name, "E5");
        // B2 on two strings is a single pitch.
        notes(&bus, &[(1, 7), (2, 2)]);
        assert_eq!(engine.chord().unwrap().name, "E5");
        assert_eq!(engine.active_notes().len(), 2);
    }

    #[test]
    fn annotation_wins_over_notes() {
        let (bus, engine) = attached();
        let annotation = ChordAnnotation {
            name: "Fmaj7".into(),
            first_fret: 1,
            strings: vec![-1, -1, 3, 2, 1, 0],
            barre_frets: vec![],
        };
        bus.emit(&PlayerEvent::ActiveBeatsChanged {
            beats: vec![
                ActiveBeat::from_notes([(1, 0), (2, 2)]),
                ActiveBeat::from_notes([(4, 2)]).with_chord(annotation.clone()),
            ],
        });
        let chord = engine.chord().unwrap();
        assert_eq!(chord.name, "Fmaj7");
        assert_eq!(chord.string_frets, annotation.strings);
        assert_eq!(engine.active_notes().len(), 3);
    }

    #[test]
    fn finished_events_are_ignored() {
        let (bus, engine) = attached();
        bus.emit(&PlayerEvent::PlayerFinished);
        assert_eq!(engine.snapshot(), InferenceSnapshot::default());
    }

    #[test]
    fn detach_stops_updates() {
        let (bus, mut engine) = attached();
        notes(&bus, &[(1, 0), (2, 2), (3, 2)]);
        engine.detach();
        assert!(!engine.is_attached());
        assert_eq!(bus.subscriber_count(), 0);
        notes(&bus, &[(1, 3), (2, 2)]);
        assert_eq!(engine.chord().unwrap().name, "E5");
    }

    #[test]
    fn dropping_engine_unsubscribes() {
        let (bus, engine) = attached();
        assert_eq!(bus.subscriber_count(), 1);
        drop(engine);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn retuning_keeps_chord_and_changes_pitches() {
        let (bus, engine) = attached();
        notes(&bus, &[(1, 0), (2, 2), (3, 2)]);
        assert_eq!(engine.chord().unwrap().name, "E5");
        // Drop D.
        engine.set_tuning(vec![38, 45, 50, 55, 59, 64]);
        assert_eq!(engine.chord().unwrap().name, "E5");
        notes(&bus, &[(1, 0), (2, 0), (3, 0)]);
        assert_eq!(engine.chord().unwrap().name, "D5");
    }

    #[test]
    fn empty_tuning_uses_default_string_count() {
        let engine = LiveInferenceEngine::new(Vec::new(), &PracticeSettings::default());
        assert_eq!(engine.string_count(), 6);
        engine.handle(&[ActiveBeat::from_notes([(1, 0), (2, 0)])]);
        assert!(engine.chord().is_none());
        assert_eq!(engine.active_notes().len(), 2);
    }
}
