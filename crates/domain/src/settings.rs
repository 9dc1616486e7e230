use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{io::ScriptFormat, range::BarRange, tempo::TempoRampPolicy, DomainError};

/// User-facing defaults for a practice session and the fretboard view.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PracticeSettings {
    pub start_bar: u32,
    pub end_bar: u32,
    pub loop_tempo: f32,
    pub gradual_increase: bool,
    pub tempo_increment: f32,
    pub max_tempo: f32,
    pub count_in: bool,
    /// Count-in volume applied when the count-in is enabled.
    pub count_in_volume: f32,
    /// Delay between applying the playback range and starting playback.
    pub play_delay_ms: u64,
    /// String count assumed when a track carries no tuning.
    pub default_string_count: u8,
    pub fret_count: u8,
}

impl Default for PracticeSettings {
    fn default() -> Self {
        Self {
            start_bar: 1,
            end_bar: 4,
            loop_tempo: 1.0,
            gradual_increase: false,
            tempo_increment: 0.05,
            max_tempo: 1.0,
            count_in: false,
            count_in_volume: 1.0,
            play_delay_ms: 50,
            default_string_count: 6,
            fret_count: 22,
        }
    }
}

impl PracticeSettings {
    pub fn bar_range(&self) -> BarRange {
        BarRange::new(self.start_bar, self.end_bar)
    }

    pub fn tempo_policy(&self) -> TempoRampPolicy {
        TempoRampPolicy::new(
            self.loop_tempo,
            self.gradual_increase,
            self.tempo_increment,
            self.max_tempo,
        )
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if !(self.count_in_volume > 0.0 && self.count_in_volume <= 1.0) {
            return Err(DomainError::validation(
                "count-in volume must be in (0, 1]",
            ));
        }
        if self.default_string_count == 0 {
            return Err(DomainError::validation("string count must be at least 1"));
        }
        if self.fret_count == 0 {
            return Err(DomainError::validation("fret count must be at least 1"));
        }
        Ok(())
    }

    pub fn parse(text: &str, format: ScriptFormat) -> Result<Self, DomainError> {
        let settings: Self = match format {
            ScriptFormat::Json => {
                serde_json::from_str(text).map_err(DomainError::serialization)?
            }
            ScriptFormat::Yaml => {
                serde_yaml::from_str(text).map_err(DomainError::serialization)?
            }
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Reads settings from a `.json`, `.yaml` or `.yml` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let format = ScriptFormat::from_path(path)?;
        let text = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), ?format, "loading practice settings");
        Self::parse(&text, format)
    }
}
