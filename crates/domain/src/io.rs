use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{events::PlayerEvent, score::Score, settings::PracticeSettings, DomainError};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScriptFormat {
    Json,
    Yaml,
}

impl ScriptFormat {
    pub fn from_path(path: &Path) -> Result<Self, DomainError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            other => Err(DomainError::validation(format!(
                "unsupported file extension {:?} for {}",
                other,
                path.display()
            ))),
        }
    }
}

/// One scripted user action or player notification.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReplayStep {
    Activate,
    Deactivate,
    SetRange { start: u32, end: u32 },
    SetLoopTempo { tempo: f32 },
    SetGradualIncrease { enabled: bool },
    SetTempoIncrement { increment: f32 },
    SetMaxTempo { max: f32 },
    ToggleCountIn,
    /// Changes the player tempo from outside the practice session.
    SetPlayerTempo { tempo: f32 },
    StartLoop,
    StopLoop,
    Emit { event: PlayerEvent },
}

/// A recorded practice session: the score timing plus the steps to replay against it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReplayScript {
    pub score: Score,
    #[serde(default)]
    pub settings: Option<PracticeSettings>,
    #[serde(default)]
    pub steps: Vec<ReplayStep>,
}

impl ReplayScript {
    pub fn parse(text: &str, format: ScriptFormat) -> Result<Self, DomainError> {
        let script: Self = match format {
            ScriptFormat::Json => serde_json::from_str(text).map_err(DomainError::serialization)?,
            ScriptFormat::Yaml => serde_yaml::from_str(text).map_err(DomainError::serialization)?,
        };
        script.score.validate()?;
        if let Some(settings) = &script.settings {
            settings.validate()?;
        }
        Ok(script)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let format = ScriptFormat::from_path(path)?;
        let text = std::fs::read_to_string(path)?;
        let script = Self::parse(&text, format)?;
        debug!(
            path = %path.display(),
            bars = script.score.bars.len(),
            steps = script.steps.len(),
            "loaded replay script"
        );
        Ok(script)
    }

    pub fn render(&self, format: ScriptFormat) -> Result<String, DomainError> {
        match format {
            ScriptFormat::Json => {
                serde_json::to_string_pretty(self).map_err(DomainError::serialization)
            }
            ScriptFormat::Yaml => serde_yaml::to_string(self).map_err(DomainError::serialization),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ActiveBeat;

    const SCRIPT: &str = r#"
score:
  title: Drill
  bars:
    - { start: 0, duration: 960 }
    - { start: 960, duration: 960 }
  tracks:
    - { name: Guitar, tuning: [40, 45, 50, 55, 59, 64] }
settings:
  gradual_increase: true
steps:
  - action: activate
  - action: set_range
    start: 1
    end: 2
  - action: start_loop
  - action: emit
    event: { type: player_finished }
"#;

    #[test]
    fn parses_yaml_script() {
        let script = ReplayScript::parse(SCRIPT, ScriptFormat::Yaml).unwrap();
        assert_eq!(script.score.bar_count(), 2);
        assert!(script.settings.as_ref().unwrap().gradual_increase);
        assert_eq!(script.steps.len(), 4);
        assert_eq!(script.steps[1], ReplayStep::SetRange { start: 1, end: 2 });
        assert_eq!(
            script.steps[3],
            ReplayStep::Emit {
                event: PlayerEvent::PlayerFinished
            }
        );
    }

    #[test]
    fn rejects_score_whose_bar_end_overflows() {
        let text = r#"{"score":{"bars":[{"start":18446744073709551615,"duration":1}]},"steps":[]}"#;
        assert!(matches!(
            ReplayScript::parse(text, ScriptFormat::Json),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn json_rendering_parses_back() {
        let mut script = ReplayScript::parse(SCRIPT, ScriptFormat::Yaml).unwrap();
        script.steps.push(ReplayStep::Emit {
            event: PlayerEvent::ActiveBeatsChanged {
                beats: vec![ActiveBeat::from_notes([(1, 3)])],
            },
        });
        let json = script.render(ScriptFormat::Json).unwrap();
        assert!(json.contains("\"action\": \"start_loop\""));
        let reparsed = ReplayScript::parse(&json, ScriptFormat::Json).unwrap();
        assert_eq!(reparsed.steps.len(), 5);
    }

    #[test]
    fn rejects_unknown_extension() {
        assert!(ScriptFormat::from_path(Path::new("session.xml")).is_err());
        assert_eq!(
            ScriptFormat::from_path(Path::new("session.yml")).unwrap(),
            ScriptFormat::Yaml
        );
    }

    #[test]
    fn rejects_invalid_score() {
        let text = r#"{"score":{"bars":[{"start":0,"duration":0}]}}"#;
        let result = ReplayScript::parse(text, ScriptFormat::Json);
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
