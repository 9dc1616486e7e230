use std::cell::{Cell, RefCell};

use fretloop_domain::PlaybackRange;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Transport controls of the external playback engine.
///
/// Methods take `&self`: the engine is shared between the controller and its
/// event handlers, and implementations keep their own interior state.
pub trait PlaybackEngine {
    /// Current playback-speed multiplier.
    fn tempo(&self) -> f32;
    fn set_tempo(&self, tempo: f32);
    /// Restricts playback to `range`, or plays the whole score for `None`.
    fn set_playback_range(&self, range: Option<PlaybackRange>);
    fn set_looping(&self, looping: bool);
    /// Metronome count-in volume; zero disables the count-in.
    fn set_count_in_volume(&self, volume: f32);
    fn play_pause(&self);
    fn stop(&self);
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum PlayerCommand {
    SetTempo(f32),
    SetPlaybackRange(Option<PlaybackRange>),
    SetLooping(bool),
    SetCountInVolume(f32),
    PlayPause,
    Stop,
}

/// Engine stand-in that remembers every command it receives.
#[derive(Debug)]
pub struct RecordingPlayer {
    tempo: Cell<f32>,
    commands: RefCell<Vec<PlayerCommand>>,
}

impl RecordingPlayer {
    pub fn new(tempo: f32) -> Self {
        Self {
            tempo: Cell::new(tempo),
            commands: RefCell::new(Vec::new()),
        }
    }

    pub fn commands(&self) -> Vec<PlayerCommand> {
        self.commands.borrow().clone()
    }

    pub fn take_commands(&self) -> Vec<PlayerCommand> {
        std::mem::take(&mut *self.commands.borrow_mut())
    }

    pub fn play_count(&self) -> usize {
        self.commands
            .borrow()
            .iter()
            .filter(|command| matches!(command, PlayerCommand::PlayPause))
            .count()
    }

    fn record(&self, command: PlayerCommand) {
        trace!(?command, "player command");
        self.commands.borrow_mut().push(command);
    }
}

impl Default for RecordingPlayer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl PlaybackEngine for RecordingPlayer {
    fn tempo(&self) -> f32 {
        self.tempo.get()
    }

    fn set_tempo(&self, tempo: f32) {
        self.tempo.set(tempo);
        self.record(PlayerCommand::SetTempo(tempo));
    }

    fn set_playback_range(&self, range: Option<PlaybackRange>) {
        self.record(PlayerCommand::SetPlaybackRange(range));
    }

    fn set_looping(&self, looping: bool) {
        self.record(PlayerCommand::SetLooping(looping));
    }

    fn set_count_in_volume(&self, volume: f32) {
        self.record(PlayerCommand::SetCountInVolume(volume));
    }

    fn play_pause(&self) {
        self.record(PlayerCommand::PlayPause);
    }

    fn stop(&self) {
        self.record(PlayerCommand::Stop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_player_tracks_tempo() {
        let player = RecordingPlayer::new(0.8);
        assert_eq!(player.tempo(), 0.8);
        player.set_tempo(1.2);
        player.play_pause();
        assert_eq!(player.tempo(), 1.2);
        assert_eq!(player.play_count(), 1);
        assert_eq!(
            player.take_commands(),
            vec![PlayerCommand::SetTempo(1.2), PlayerCommand::PlayPause]
        );
        assert!(player.commands().is_empty());
    }
}
