//! Headless application: wires definitions, session and autopilot, then
//! runs at a fixed timestep until the quest resolves or the frame cap hits.

use anyhow::{Context, Result};
use bestiary_gameplay::{
    format_time, DefinitionSet, HuntSession, MonsterSpawn, MonsterStats, PresentationSink,
    QuestState, SessionSetup, TracingSink, MONSTER_SPAWN_RADIUS,
};
use glam::Vec3;
use tracing::{info, warn};

use crate::autopilot::Autopilot;
use crate::config::SimConfig;

/// What a run ended with.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Quest name.
    pub quest: String,
    /// Final quest state.
    pub state: QuestState,
    /// Frames simulated.
    pub frames: u64,
    /// Quest seconds elapsed.
    pub elapsed: f32,
    /// Hunter faints.
    pub deaths: u32,
}

/// Loads everything named by `config` and runs it.
pub fn run(config: &SimConfig) -> Result<RunSummary> {
    let definitions = load_definitions(config);
    let setup = build_setup(config, &definitions)?;
    let mut sink = TracingSink::new();
    Ok(run_session(config, setup, &mut sink))
}

fn load_definitions(config: &SimConfig) -> DefinitionSet {
    let Some(path) = &config.definitions else {
        info!("No definitions configured, using built-in tuning");
        return DefinitionSet::default();
    };
    match DefinitionSet::load(path) {
        Ok(set) => set,
        Err(e) => {
            warn!("Failed to load definitions from {}: {e}", path.display());
            DefinitionSet::default()
        },
    }
}

fn build_setup(config: &SimConfig, definitions: &DefinitionSet) -> Result<SessionSetup> {
    let mut setup = SessionSetup::from_definitions(
        definitions,
        config.weapon.as_deref(),
        config.quest.as_deref(),
    )
    .context("resolving session from definitions")?
    .with_seed(config.seed);
    if setup.monsters.is_empty() {
        warn!("No monsters to hunt, spawning a stand-in");
        let position = Vec3::Z * MONSTER_SPAWN_RADIUS;
        let spawn = MonsterSpawn::new(MonsterStats::default(), position).facing(-position);
        setup = setup.with_monster(spawn);
    }
    Ok(setup)
}

/// Runs a prepared session with the autopilot at the hunter's controls.
pub fn run_session(
    config: &SimConfig,
    setup: SessionSetup,
    sink: &mut dyn PresentationSink,
) -> RunSummary {
    let mut session = HuntSession::new(setup);
    let mut pilot = Autopilot::new(config.autopilot.clone());
    let limit = config.frame_limit();

    info!(
        "Hunting with {} monster(s) at {:.1} Hz",
        session.monsters().len(),
        1.0 / config.timestep
    );

    let mut state = session.tracker().state();
    while !state.is_finished() {
        if limit.is_some_and(|limit| session.frame() >= limit) {
            warn!("Frame cap of {} reached before the quest resolved", session.frame());
            break;
        }
        let input = pilot.next_input(&session);
        state = session.tick(config.timestep, input, sink);
    }

    let record = session.tracker().record();
    RunSummary {
        quest: record.definition.name.clone(),
        state,
        frames: session.frame(),
        elapsed: record.elapsed,
        deaths: record.deaths,
    }
}

impl RunSummary {
    /// One-line description.
    #[must_use]
    pub fn describe(&self) -> String {
        let outcome = match self.state {
            QuestState::Success => String::from("cleared"),
            QuestState::Failed(reason) => format!("failed ({reason})"),
            QuestState::InProgress | QuestState::NotStarted => String::from("unfinished"),
        };
        format!(
            "'{}' {} after {} frames ({}), {} faint(s)",
            self.quest,
            outcome,
            self.frames,
            format_time(self.elapsed),
            self.deaths
        )
    }
}
