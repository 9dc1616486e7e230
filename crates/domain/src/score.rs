use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Timing of a single bar as reported by the playback engine.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MasterBar {
    /// Tick at which the bar starts.
    pub start: u64,
    /// Length of the bar in ticks.
    pub duration: u64,
}

impl MasterBar {
    pub fn new(start: u64, duration: u64) -> Self {
        Self { start, duration }
    }

    /// Tick just past the bar, or `None` when it does not fit in a `u64`.
    pub fn end(&self) -> Option<u64> {
        self.start.checked_add(self.duration)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    pub name: String,
    /// Open-string MIDI pitches, indexed by `string - 1` (string 1 is the lowest).
    #[serde(default)]
    pub tuning: Vec<u8>,
}

impl Track {
    pub fn new(name: impl Into<String>, tuning: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            tuning,
        }
    }

    /// Standard six-string guitar tuning, E2 A2 D3 G3 B3 E4.
    pub fn standard_guitar(name: impl Into<String>) -> Self {
        Self::new(name, vec![40, 45, 50, 55, 59, 64])
    }
}

/// The parts of a loaded score this subsystem reads: bar timing and tunings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Score {
    #[serde(default)]
    pub title: String,
    pub bars: Vec<MasterBar>,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Score {
    pub fn new(title: impl Into<String>, bars: Vec<MasterBar>, tracks: Vec<Track>) -> Self {
        Self {
            title: title.into(),
            bars,
            tracks,
        }
    }

    /// Builds `count` back-to-back bars of `ticks_per_bar` ticks each.
    pub fn uniform(title: impl Into<String>, count: u32, ticks_per_bar: u64) -> Self {
        let bars = (0..count as u64)
            .map(|index| MasterBar::new(index * ticks_per_bar, ticks_per_bar))
            .collect();
        Self::new(title, bars, vec![Track::standard_guitar("Guitar")])
    }

    pub fn bar_count(&self) -> u32 {
        self.bars.len() as u32
    }

    /// Tuning of the first track, or an empty slice when the score has no tracks.
    pub fn primary_tuning(&self) -> &[u8] {
        self.tracks
            .first()
            .map(|track| track.tuning.as_slice())
            .unwrap_or(&[])
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        for pair in self.bars.windows(2) {
            if pair[1].start < pair[0].start {
                return Err(DomainError::validation(
                    "bars must be ordered by start tick",
                ));
            }
        }
        if self.bars.iter().any(|bar| bar.duration == 0) {
            return Err(DomainError::validation("bars must have a nonzero duration"));
        }
        if self.bars.iter().any(|bar| bar.end().is_none()) {
            return Err(DomainError::validation("bar end tick overflows"));
        }
        Ok(())
    }
}
