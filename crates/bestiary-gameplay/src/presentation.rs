//! Presentation sink: the read-only view the HUD consumes.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::events::GameEvent;
use crate::quest::{format_time, QuestRecord, QuestState};

/// Values a HUD displays each frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HudSnapshot {
    /// Hunter health.
    pub health: i32,
    /// Hunter max health.
    pub max_health: i32,
    /// Hunter stamina.
    pub stamina: f32,
    /// Hunter max stamina.
    pub max_stamina: f32,
    /// Quest seconds elapsed.
    pub elapsed: f32,
    /// Quest seconds left.
    pub remaining_time: f32,
    /// Faints so far.
    pub deaths: u32,
    /// Faints left.
    pub remaining_lives: u32,
    /// Quest state.
    pub quest_state: QuestState,
}

/// Observer of a running session. Never mutates gameplay state.
pub trait PresentationSink {
    /// Called once per frame with current vitals and timers.
    fn show_vitals(&mut self, hud: &HudSnapshot);

    /// Called once per frame with the quest record.
    fn show_quest(&mut self, record: &QuestRecord);

    /// Called for every dispatched event, in order.
    fn show_event(&mut self, event: &GameEvent);
}

/// Sink that writes through `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink {
    last_state: Option<QuestState>,
}

impl TracingSink {
    /// Creates a sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PresentationSink for TracingSink {
    fn show_vitals(&mut self, hud: &HudSnapshot) {
        trace!(
            "hp {}/{} stamina {:.0}/{:.0} time {}",
            hud.health,
            hud.max_health,
            hud.stamina,
            hud.max_stamina,
            format_time(hud.remaining_time)
        );
    }

    fn show_quest(&mut self, record: &QuestRecord) {
        if self.last_state != Some(record.state) {
            info!(
                "quest '{}': {:?} ({} kills, {} faints)",
                record.definition.name, record.state, record.kills, record.deaths
            );
            self.last_state = Some(record.state);
        }
    }

    fn show_event(&mut self, event: &GameEvent) {
        match event {
            GameEvent::AttackHit { damage, critical, .. } => {
                debug!("hit for {}{}", damage, if *critical { " (critical)" } else { "" });
            }
            GameEvent::ItemObtained { item, quantity, .. } => {
                info!("obtained {} x{}", item, quantity);
            }
            GameEvent::QuestSucceeded { name, zenny, elapsed } => {
                info!("{} cleared in {} for {}z", name, format_time(*elapsed), zenny);
            }
            GameEvent::QuestFailed { name, reason } => {
                info!("{} failed: {}", name, reason);
            }
            other => debug!("{}", other.name()),
        }
    }
}

/// Sink that keeps everything it sees.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    /// Every event in dispatch order.
    pub events: Vec<GameEvent>,
    /// Last HUD snapshot.
    pub last_hud: Option<HudSnapshot>,
    /// Frames presented.
    pub frames: u64,
}

impl RecordingSink {
    /// Number of recorded events named `name`.
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.events.iter().filter(|event| event.name() == name).count()
    }
}

impl PresentationSink for RecordingSink {
    fn show_vitals(&mut self, hud: &HudSnapshot) {
        self.last_hud = Some(*hud);
        self.frames += 1;
    }

    fn show_quest(&mut self, _record: &QuestRecord) {}

    fn show_event(&mut self, event: &GameEvent) {
        self.events.push(event.clone());
    }
}
