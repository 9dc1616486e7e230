use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use fretloop_domain::{
    EventBus, PlaybackRange, PlayerEvent, PracticeSettings, ReplayScript, ReplayStep,
};
use fretloop_inference::{
    ChordDiagramLayout, FretboardLayout, InferenceSnapshot, LiveInferenceEngine,
};
use fretloop_practice::{
    LoopController, PlaybackEngine, PracticeState, PracticeStatistics, SessionSummary,
};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Replay a scripted practice session and report loop and chord state"
)]
struct Args {
    /// Replay script (.json, .yaml or .yml)
    script: PathBuf,
    /// Settings file overriding the settings embedded in the script
    #[arg(short, long)]
    settings: Option<PathBuf>,
    /// Only print the final state, not one entry per step
    #[arg(long)]
    summary_only: bool,
}

/// Player that logs every command instead of producing sound.
struct ConsolePlayer {
    tempo: Cell<f32>,
    playing: Cell<bool>,
}

impl ConsolePlayer {
    fn new() -> Self {
        Self {
            tempo: Cell::new(1.0),
            playing: Cell::new(false),
        }
    }
}

impl PlaybackEngine for ConsolePlayer {
    fn tempo(&self) -> f32 {
        self.tempo.get()
    }

    fn set_tempo(&self, tempo: f32) {
        info!(tempo, "player: tempo");
        self.tempo.set(tempo);
    }

    fn set_playback_range(&self, range: Option<PlaybackRange>) {
        info!(?range, "player: playback range");
    }

    fn set_looping(&self, looping: bool) {
        info!(looping, "player: looping");
    }

    fn set_count_in_volume(&self, volume: f32) {
        info!(volume, "player: count-in volume");
    }

    fn play_pause(&self) {
        self.playing.set(!self.playing.get());
        info!(playing = self.playing.get(), "player: play/pause");
    }

    fn stop(&self) {
        self.playing.set(false);
        info!("player: stop");
    }
}

#[derive(Debug, Serialize)]
struct StepReport {
    index: usize,
    step: ReplayStep,
    practice: PracticeState,
    inference: InferenceSnapshot,
}

#[derive(Debug, Serialize)]
struct ReplayReport {
    title: String,
    steps: Vec<StepReport>,
    practice: PracticeState,
    inference: InferenceSnapshot,
    /// Pixel centres of the final highlighted notes on the fretboard view.
    note_centers: Vec<(f32, f32)>,
    diagram: Option<ChordDiagramLayout>,
    sessions: Vec<SessionSummary>,
    statistics: PracticeStatistics,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let script = ReplayScript::load(&args.script)
        .with_context(|| format!("reading replay script {}", args.script.display()))?;
    let settings = match &args.settings {
        Some(path) => PracticeSettings::load(path)
            .with_context(|| format!("reading settings {}", path.display()))?,
        None => script.settings.clone().unwrap_or_default(),
    };

    let report = replay(&script, &settings, !args.summary_only)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn replay(
    script: &ReplayScript,
    settings: &PracticeSettings,
    keep_steps: bool,
) -> Result<ReplayReport> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let bus = EventBus::<PlayerEvent>::new();
    let player = Rc::new(ConsolePlayer::new());
    let mut controller = LoopController::new(player.clone(), bus.clone(), settings);
    controller.set_score(Some(&script.score));
    let engine =
        LiveInferenceEngine::attach(&bus, script.score.primary_tuning().to_vec(), settings);

    info!(
        title = %script.score.title,
        bars = script.score.bar_count(),
        steps = script.steps.len(),
        "replaying session"
    );

    let mut steps = Vec::new();
    let mut sessions: Vec<SessionSummary> = Vec::new();
    let mut statistics = PracticeStatistics::default();

    for (index, step) in script.steps.iter().enumerate() {
        match step {
            ReplayStep::Activate => controller.activate(),
            ReplayStep::Deactivate => controller.deactivate(),
            ReplayStep::SetRange { start, end } => controller.set_range(*start, *end),
            ReplayStep::SetLoopTempo { tempo } => controller.set_loop_tempo(*tempo),
            ReplayStep::SetGradualIncrease { enabled } => {
                controller.set_gradual_increase(*enabled)
            }
            ReplayStep::SetTempoIncrement { increment } => {
                controller.set_tempo_increment(*increment)
            }
            ReplayStep::SetMaxTempo { max } => controller.set_max_tempo(*max),
            ReplayStep::ToggleCountIn => controller.toggle_count_in(),
            ReplayStep::SetPlayerTempo { tempo } => player.set_tempo(*tempo),
            ReplayStep::StartLoop => {
                if let Some(play) = controller.start_loop() {
                    runtime.block_on(play.run());
                }
            }
            ReplayStep::StopLoop => controller.stop_loop(),
            ReplayStep::Emit { event } => bus.emit(event),
        }

        record_summary(&controller, &mut sessions, &mut statistics);

        if keep_steps {
            steps.push(StepReport {
                index,
                step: step.clone(),
                practice: controller.state(),
                inference: engine.snapshot(),
            });
        }
    }

    controller.deactivate();
    record_summary(&controller, &mut sessions, &mut statistics);

    let inference = engine.snapshot();
    let fretboard = FretboardLayout::new(engine.string_count(), settings.fret_count);
    let note_centers = inference
        .active_notes
        .iter()
        .map(|&position| fretboard.note_center(position))
        .collect();
    let diagram = inference
        .chord
        .as_ref()
        .map(|chord| ChordDiagramLayout::new(chord, engine.string_count()));

    Ok(ReplayReport {
        title: script.score.title.clone(),
        steps,
        practice: controller.state(),
        inference,
        note_centers,
        diagram,
        sessions,
        statistics,
    })
}

fn record_summary(
    controller: &LoopController,
    sessions: &mut Vec<SessionSummary>,
    statistics: &mut PracticeStatistics,
) {
    if let Some(summary) = controller.last_summary() {
        if sessions.last() != Some(summary) {
            summary.update_statistics(statistics);
            sessions.push(summary.clone());
        }
    }
}
