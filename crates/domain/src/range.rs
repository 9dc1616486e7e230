use serde::{Deserialize, Serialize};

use crate::{score::MasterBar, DomainError};

/// Tick span handed to the player for looped playback. `end_tick` is exclusive.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaybackRange {
    pub start_tick: u64,
    pub end_tick: u64,
}

impl PlaybackRange {
    pub fn new(start_tick: u64, end_tick: u64) -> Result<Self, DomainError> {
        if end_tick <= start_tick {
            return Err(DomainError::validation(
                "playback range must end after it starts",
            ));
        }
        Ok(Self {
            start_tick,
            end_tick,
        })
    }

    pub fn len(&self) -> u64 {
        self.end_tick - self.start_tick
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Inclusive, 1-based range of bars selected for practice.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BarRange {
    start_bar: u32,
    end_bar: u32,
}

impl BarRange {
    /// Raises `start` to at least 1 and `end` to at least `start`.
    pub fn new(start: u32, end: u32) -> Self {
        let start_bar = start.max(1);
        Self {
            start_bar,
            end_bar: end.max(start_bar),
        }
    }

    /// Bounds both ends to `[1, total_bars]`. A score without bars leaves the range untouched.
    pub fn clamped_to(self, total_bars: u32) -> Self {
        if total_bars == 0 {
            return self;
        }
        let start_bar = self.start_bar.min(total_bars);
        Self {
            start_bar,
            end_bar: self.end_bar.clamp(start_bar, total_bars),
        }
    }

    pub fn start_bar(&self) -> u32 {
        self.start_bar
    }

    pub fn end_bar(&self) -> u32 {
        self.end_bar
    }

    pub fn bar_count(&self) -> u32 {
        self.end_bar - self.start_bar + 1
    }
}

impl Default for BarRange {
    fn default() -> Self {
        Self::new(1, 4)
    }
}

/// Translates a bar selection into the tick span covering those bars.
///
/// Indices are clamped into the score, so an over-long selection plays to the
/// final bar. Returns `None` for a score without bars, when the clamped
/// selection is inverted or spans no ticks, or when the last bar's end tick
/// overflows.
pub fn playback_range(bars: &[MasterBar], range: BarRange) -> Option<PlaybackRange> {
    let last = bars.len().checked_sub(1)?;
    let start_index = (range.start_bar() as usize).saturating_sub(1).min(last);
    let end_index = (range.end_bar() as usize).saturating_sub(1).min(last);
    if start_index > end_index {
        return None;
    }
    let start_tick = bars[start_index].start;
    let end_tick = bars[end_index].end()?;
    PlaybackRange::new(start_tick, end_tick).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::Score;

    #[test]
    fn bar_range_raises_end_to_start() {
        let range = BarRange::new(5, 2);
        assert_eq!(range.start_bar(), 5);
        assert_eq!(range.end_bar(), 5);
        assert_eq!(BarRange::new(0, 0), BarRange::new(1, 1));
    }

    #[test]
    fn bar_range_clamps_to_score() {
        let range = BarRange::new(3, 40).clamped_to(8);
        assert_eq!((range.start_bar(), range.end_bar()), (3, 8));
        let past_end = BarRange::new(12, 14).clamped_to(8);
        assert_eq!((past_end.start_bar(), past_end.end_bar()), (8, 8));
        let unloaded = BarRange::new(2, 6).clamped_to(0);
        assert_eq!((unloaded.start_bar(), unloaded.end_bar()), (2, 6));
    }

    #[test]
    fn translates_bars_to_ticks() {
        let score = Score::uniform("x", 8, 960);
        let range = playback_range(&score.bars, BarRange::new(2, 4)).unwrap();
        assert_eq!(range.start_tick, 960);
        assert_eq!(range.end_tick, 4 * 960);
    }

    #[test]
    fn clamps_indices_into_score() {
        let score = Score::uniform("x", 4, 960);
        let range = playback_range(&score.bars, BarRange::new(3, 99)).unwrap();
        assert_eq!(range.start_tick, 2 * 960);
        assert_eq!(range.end_tick, 4 * 960);
    }

    #[test]
    fn empty_score_has_no_range() {
        assert!(playback_range(&[], BarRange::new(1, 4)).is_none());
    }

    #[test]
    fn every_valid_selection_spans_ticks() {
        let bars = vec![
            MasterBar::new(0, 960),
            MasterBar::new(960, 1440),
            MasterBar::new(2400, 480),
            MasterBar::new(2880, 960),
        ];
        for start in 1..=4 {
            for end in start..=4 {
                let range = playback_range(&bars, BarRange::new(start, end)).unwrap();
                assert!(range.start_tick < range.end_tick, "{start}..={end}");
            }
        }
    }

    #[test]
    fn zero_length_bar_yields_none() {
        let bars = vec![MasterBar::new(0, 0)];
        assert!(playback_range(&bars, BarRange::new(1, 1)).is_none());
    }

    #[test]
    fn overflowing_bar_end_yields_none() {
        let bars = vec![MasterBar::new(0, 960), MasterBar::new(u64::MAX, 1)];
        assert!(playback_range(&bars, BarRange::new(1, 2)).is_none());
        assert!(playback_range(&bars, BarRange::new(1, 1)).is_some());
    }

    #[test]
    fn playback_range_rejects_inverted_ticks() {
        assert!(PlaybackRange::new(10, 10).is_err());
        assert_eq!(PlaybackRange::new(10, 30).unwrap().len(), 20);
    }
}
