use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

pub const LOOP_TEMPO_RANGE: RangeInclusive<f32> = 0.25..=2.0;
pub const INCREMENT_RANGE: RangeInclusive<f32> = 0.01..=0.5;
pub const MAX_TEMPO_RANGE: RangeInclusive<f32> = 0.5..=2.0;

fn clamp_into(value: f32, range: &RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        return *range.start();
    }
    value.clamp(*range.start(), *range.end())
}

/// Playback-speed policy for a practice loop. Tempos are multipliers of the
/// score's own tempo (1.0 = as written).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct TempoRampPolicy {
    loop_tempo: f32,
    gradual_increase: bool,
    increment: f32,
    max_tempo: f32,
}

impl TempoRampPolicy {
    pub fn new(loop_tempo: f32, gradual_increase: bool, increment: f32, max_tempo: f32) -> Self {
        let mut policy = Self::default();
        policy.set_loop_tempo(loop_tempo);
        policy.set_gradual_increase(gradual_increase);
        policy.set_increment(increment);
        policy.set_max_tempo(max_tempo);
        policy
    }

    pub fn loop_tempo(&self) -> f32 {
        self.loop_tempo
    }

    pub fn gradual_increase(&self) -> bool {
        self.gradual_increase
    }

    pub fn increment(&self) -> f32 {
        self.increment
    }

    pub fn max_tempo(&self) -> f32 {
        self.max_tempo
    }

    pub fn set_loop_tempo(&mut self, tempo: f32) {
        self.loop_tempo = clamp_into(tempo, &LOOP_TEMPO_RANGE);
    }

    pub fn set_gradual_increase(&mut self, enabled: bool) {
        self.gradual_increase = enabled;
    }

    pub fn set_increment(&mut self, increment: f32) {
        self.increment = clamp_into(increment, &INCREMENT_RANGE);
    }

    pub fn set_max_tempo(&mut self, max: f32) {
        self.max_tempo = clamp_into(max, &MAX_TEMPO_RANGE);
    }

    /// Tempo for the next iteration of the loop.
    ///
    /// Never lower than the current loop tempo and never raised past
    /// `max_tempo`. A loop tempo already at or above the ceiling holds.
    pub fn next_tempo(&self) -> f32 {
        if !self.gradual_increase || self.loop_tempo >= self.max_tempo {
            return self.loop_tempo;
        }
        (self.loop_tempo + self.increment).min(self.max_tempo)
    }

    /// Tempo a loop starts from. With ramping on the ceiling applies, so a loop
    /// tempo above `max_tempo` starts at `max_tempo`.
    pub fn starting_tempo(&self) -> f32 {
        if self.gradual_increase {
            self.loop_tempo.min(self.max_tempo)
        } else {
            self.loop_tempo
        }
    }

    /// Applies one ramp step and returns the new loop tempo, or `None` when it did not change.
    pub fn advance(&mut self) -> Option<f32> {
        let next = self.next_tempo();
        if next > self.loop_tempo {
            self.loop_tempo = next;
            Some(next)
        } else {
            None
        }
    }
}

impl Default for TempoRampPolicy {
    fn default() -> Self {
        Self {
            loop_tempo: 1.0,
            gradual_increase: false,
            increment: 0.05,
            max_tempo: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_clamp_to_bounds() {
        let policy = TempoRampPolicy::new(5.0, true, 0.0, 0.1);
        assert_eq!(policy.loop_tempo(), 2.0);
        assert_eq!(policy.increment(), 0.01);
        assert_eq!(policy.max_tempo(), 0.5);

        let low = TempoRampPolicy::new(0.0, false, 9.0, 3.0);
        assert_eq!(low.loop_tempo(), 0.25);
        assert_eq!(low.increment(), 0.5);
        assert_eq!(low.max_tempo(), 2.0);
    }

    #[test]
    fn nan_falls_to_lower_bound() {
        let policy = TempoRampPolicy::new(f32::NAN, false, f32::NAN, f32::NAN);
        assert_eq!(policy.loop_tempo(), 0.25);
        assert_eq!(policy.increment(), 0.01);
        assert_eq!(policy.max_tempo(), 0.5);
    }

    #[test]
    fn ramp_stops_at_max() {
        let mut policy = TempoRampPolicy::new(0.7, true, 0.2, 1.0);
        assert!(policy.advance().is_some());
        assert!(policy.advance().is_some());
        assert_eq!(policy.loop_tempo(), 1.0);
        assert_eq!(policy.advance(), None);
        assert_eq!(policy.loop_tempo(), 1.0);
    }

    #[test]
    fn ramp_never_lowers_tempo_above_ceiling() {
        let mut policy = TempoRampPolicy::new(1.5, true, 0.1, 1.0);
        assert_eq!(policy.next_tempo(), 1.5);
        assert_eq!(policy.advance(), None);
    }

    #[test]
    fn ramping_loop_starts_at_ceiling() {
        let ramping = TempoRampPolicy::new(1.5, true, 0.1, 1.0);
        assert_eq!(ramping.starting_tempo(), 1.0);
        let fixed = TempoRampPolicy::new(1.5, false, 0.1, 1.0);
        assert_eq!(fixed.starting_tempo(), 1.5);
        let below = TempoRampPolicy::new(0.6, true, 0.1, 1.0);
        assert_eq!(below.starting_tempo(), 0.6);
    }

    #[test]
    fn disabled_ramp_holds() {
        let mut policy = TempoRampPolicy::new(0.5, false, 0.1, 1.0);
        assert_eq!(policy.advance(), None);
        assert_eq!(policy.loop_tempo(), 0.5);
    }
}
