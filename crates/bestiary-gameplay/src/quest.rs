//! Quest lifecycle tracking.
//!
//! This module provides:
//! - [`QuestRecord`]: counters and state for one quest run
//! - [`QuestTracker`]: advances the clock and reacts to death events
//! - [`format_time`]: `mm:ss.cc` formatting for timers
//!
//! State only moves forward: NotStarted → InProgress → Success or Failed.
//! A finished record ignores every further tick and event until the next
//! [`QuestTracker::start`].

use ahash::AHashSet;
use bestiary_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::definitions::{ObjectiveType, QuestDefinition};
use crate::events::{ActorKind, EventPublisher, GameEvent};

/// Why a quest failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureReason {
    /// The time limit ran out.
    TimeExpired,
    /// The hunter fainted too often.
    TooManyDeaths,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimeExpired => write!(f, "time"),
            Self::TooManyDeaths => write!(f, "deaths"),
        }
    }
}

/// Lifecycle of a quest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestState {
    /// Not started yet.
    #[default]
    NotStarted,
    /// Running.
    InProgress,
    /// Objective met.
    Success,
    /// Out of time or lives.
    Failed(FailureReason),
}

impl QuestState {
    /// Success or Failed.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self, Self::Success | Self::Failed(_))
    }
}

/// Progress of one quest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestRecord {
    /// Quest parameters.
    pub definition: QuestDefinition,
    /// Seconds since start.
    pub elapsed: f32,
    /// Faints so far.
    pub deaths: u32,
    /// Tracked kills so far.
    pub kills: u32,
    /// Lifecycle state.
    pub state: QuestState,
}

impl QuestRecord {
    /// Fresh record for `definition`.
    #[must_use]
    pub fn new(definition: QuestDefinition) -> Self {
        Self {
            definition,
            elapsed: 0.0,
            deaths: 0,
            kills: 0,
            state: QuestState::NotStarted,
        }
    }

    /// Seconds left, never negative.
    #[must_use]
    pub fn remaining_time(&self) -> f32 {
        (self.definition.time_limit - self.elapsed).max(0.0)
    }

    /// Faints left before failure.
    #[must_use]
    pub fn remaining_lives(&self) -> u32 {
        self.definition.max_deaths.saturating_sub(self.deaths)
    }
}

/// Observes combat outcomes for a single quest.
#[derive(Debug)]
pub struct QuestTracker {
    record: QuestRecord,
    tracked_monsters: AHashSet<EntityId>,
    hunter: Option<EntityId>,
    events: EventPublisher,
}

impl QuestTracker {
    /// Creates a tracker with no quest running.
    #[must_use]
    pub fn new(definition: QuestDefinition, events: EventPublisher) -> Self {
        Self {
            record: QuestRecord::new(definition),
            tracked_monsters: AHashSet::new(),
            hunter: None,
            events,
        }
    }

    /// Starts (or restarts) the quest.
    ///
    /// Counters reset and the tracker subscribes to the deaths of `hunter`
    /// and of every monster in `monsters` whose name matches the target.
    pub fn start<'a>(
        &mut self,
        hunter: EntityId,
        monsters: impl IntoIterator<Item = (EntityId, &'a str)>,
    ) {
        self.record.elapsed = 0.0;
        self.record.deaths = 0;
        self.record.kills = 0;
        self.record.state = QuestState::InProgress;
        self.tracked_monsters.clear();
        self.hunter = Some(hunter);
        for (id, name) in monsters {
            self.track_monster(id, name);
        }
        info!(
            "quest '{}' started, tracking {} monster(s)",
            self.record.definition.name,
            self.tracked_monsters.len()
        );
        self.events.publish(GameEvent::QuestStarted {
            name: self.record.definition.name.clone(),
        });
    }

    /// Subscribes to a monster spawned after start. Returns whether it matched.
    pub fn track_monster(&mut self, id: EntityId, name: &str) -> bool {
        if self.record.state != QuestState::InProgress || !self.record.definition.targets(name) {
            return false;
        }
        self.tracked_monsters.insert(id)
    }

    /// Advances the quest clock.
    pub fn tick(&mut self, dt: f32) {
        if self.record.state != QuestState::InProgress {
            return;
        }
        self.record.elapsed += dt;
        if self.record.elapsed >= self.record.definition.time_limit {
            self.fail(FailureReason::TimeExpired);
        }
    }

    /// Routes a bus event. Only death events matter.
    pub fn handle_event(&mut self, event: &GameEvent) {
        if let GameEvent::Died { entity, kind, .. } = event {
            match kind {
                ActorKind::Monster => self.on_monster_died(*entity),
                ActorKind::Hunter => self.on_hunter_died(*entity),
            }
        }
    }

    /// Counts a tracked monster's death. Each monster counts once.
    pub fn on_monster_died(&mut self, id: EntityId) {
        if self.record.state != QuestState::InProgress || !self.tracked_monsters.remove(&id) {
            return;
        }
        self.record.kills += 1;
        self.events.publish(GameEvent::MonsterKilled {
            kills: self.record.kills,
            target_count: self.record.definition.target_count,
        });
        if self.record.definition.objective == ObjectiveType::Hunt
            && self.record.kills >= self.record.definition.target_count
        {
            self.succeed();
        }
    }

    /// Counts a faint of the subscribed hunter.
    pub fn on_hunter_died(&mut self, id: EntityId) {
        if self.record.state != QuestState::InProgress || self.hunter != Some(id) {
            return;
        }
        self.record.deaths += 1;
        self.events.publish(GameEvent::PlayerFainted {
            deaths: self.record.deaths,
            max_deaths: self.record.definition.max_deaths,
        });
        if self.record.deaths >= self.record.definition.max_deaths {
            self.fail(FailureReason::TooManyDeaths);
        }
    }

    fn succeed(&mut self) {
        self.record.state = QuestState::Success;
        self.unsubscribe();
        info!(
            "quest '{}' complete in {}",
            self.record.definition.name,
            format_time(self.record.elapsed)
        );
        self.events.publish(GameEvent::QuestSucceeded {
            name: self.record.definition.name.clone(),
            zenny: self.record.definition.zenny,
            elapsed: self.record.elapsed,
        });
    }

    fn fail(&mut self, reason: FailureReason) {
        self.record.state = QuestState::Failed(reason);
        self.unsubscribe();
        info!("quest '{}' failed ({})", self.record.definition.name, reason);
        self.events.publish(GameEvent::QuestFailed {
            name: self.record.definition.name.clone(),
            reason,
        });
    }

    fn unsubscribe(&mut self) {
        self.tracked_monsters.clear();
        self.hunter = None;
    }

    /// Current record.
    #[must_use]
    pub fn record(&self) -> &QuestRecord {
        &self.record
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> QuestState {
        self.record.state
    }

    /// Running.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.record.state == QuestState::InProgress
    }

    /// Success or Failed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.record.state.is_finished()
    }

    /// Seconds left.
    #[must_use]
    pub fn remaining_time(&self) -> f32 {
        self.record.remaining_time()
    }

    /// Faints left.
    #[must_use]
    pub fn remaining_lives(&self) -> u32 {
        self.record.remaining_lives()
    }

    /// Monsters whose death still counts.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.tracked_monsters.len()
    }
}

/// Formats seconds as `mm:ss.cc`.
#[must_use]
pub fn format_time(seconds: f32) -> String {
    let total_centis = (seconds.max(0.0) * 100.0).floor() as u64;
    let minutes = total_centis / 6_000;
    let secs = (total_centis / 100) % 60;
    let centis = total_centis % 100;
    format!("{minutes:02}:{secs:02}.{centis:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;

    fn died(entity: EntityId, kind: ActorKind) -> GameEvent {
        GameEvent::Died {
            entity,
            kind,
            name: String::new(),
        }
    }

    fn started(
        definition: QuestDefinition,
        monsters: &[(EntityId, &str)],
    ) -> (QuestTracker, EntityId, EventBus) {
        let bus = EventBus::default();
        let hunter = EntityId::new();
        let mut tracker = QuestTracker::new(definition, bus.publisher());
        tracker.start(hunter, monsters.iter().copied());
        (tracker, hunter, bus)
    }

    #[test]
    fn test_starts_in_progress() {
        let bus = EventBus::default();
        let mut tracker = QuestTracker::new(QuestDefinition::default(), bus.publisher());
        assert_eq!(tracker.state(), QuestState::NotStarted);
        tracker.tick(10_000.0);
        assert_eq!(tracker.state(), QuestState::NotStarted);

        tracker.start(EntityId::new(), std::iter::empty());
        assert!(tracker.is_in_progress());
        assert_eq!(bus.drain()[0].name(), "quest_started");
    }

    #[test]
    fn test_time_limit_fails_regardless_of_lives() {
        let definition = QuestDefinition::hunt("Timed", "Wyvern", 1).with_limits(60.0, 3);
        let wyvern = EntityId::new();
        let (mut tracker, _, _bus) = started(definition, &[(wyvern, "Wyvern")]);

        for _ in 0..119 {
            tracker.tick(0.5);
        }
        assert!(tracker.is_in_progress());
        tracker.tick(0.5);
        assert_eq!(tracker.record().elapsed, 60.0);
        assert_eq!(tracker.state(), QuestState::Failed(FailureReason::TimeExpired));
        assert_eq!(tracker.remaining_lives(), 3);
    }

    #[test]
    fn test_hunt_succeeds_on_target_count() {
        let definition = QuestDefinition::hunt("Pair", "Raptor", 2);
        let (a, b, other) = (EntityId::new(), EntityId::new(), EntityId::new());
        let (mut tracker, _, bus) =
            started(definition, &[(a, "Raptor"), (b, "Raptor"), (other, "Wyvern")]);
        assert_eq!(tracker.tracked_count(), 2);

        tracker.handle_event(&died(other, ActorKind::Monster));
        tracker.handle_event(&died(a, ActorKind::Monster));
        tracker.handle_event(&died(a, ActorKind::Monster));
        assert_eq!(tracker.record().kills, 1);

        tracker.handle_event(&died(b, ActorKind::Monster));
        assert_eq!(tracker.state(), QuestState::Success);
        assert!(bus.drain().iter().any(GameEvent::is_quest_outcome));
    }

    #[test]
    fn test_non_hunt_objective_never_succeeds_on_kills() {
        let definition = QuestDefinition {
            objective: ObjectiveType::Capture,
            ..QuestDefinition::hunt("Capture", "Wyvern", 1)
        };
        let wyvern = EntityId::new();
        let (mut tracker, _, _bus) = started(definition, &[(wyvern, "Wyvern")]);
        tracker.on_monster_died(wyvern);
        assert_eq!(tracker.record().kills, 1);
        assert!(tracker.is_in_progress());
    }

    #[test]
    fn test_deaths_budget() {
        let definition = QuestDefinition::hunt("Hard", "Wyvern", 1).with_limits(600.0, 2);
        let (mut tracker, hunter, _bus) = started(definition, &[]);

        tracker.on_hunter_died(EntityId::new());
        assert_eq!(tracker.record().deaths, 0);

        tracker.on_hunter_died(hunter);
        assert!(tracker.is_in_progress());
        assert_eq!(tracker.remaining_lives(), 1);
        tracker.on_hunter_died(hunter);
        assert_eq!(tracker.state(), QuestState::Failed(FailureReason::TooManyDeaths));
    }

    #[test]
    fn test_finished_quest_is_frozen() {
        let definition = QuestDefinition::hunt("Quick", "", 1);
        let monster = EntityId::new();
        let (mut tracker, hunter, _bus) = started(definition, &[(monster, "Anything")]);
        tracker.on_monster_died(monster);
        assert_eq!(tracker.state(), QuestState::Success);

        let elapsed = tracker.record().elapsed;
        tracker.tick(5_000.0);
        tracker.on_hunter_died(hunter);
        tracker.on_hunter_died(hunter);
        tracker.on_hunter_died(hunter);
        assert_eq!(tracker.state(), QuestState::Success);
        assert_eq!(tracker.record().elapsed, elapsed);
        assert_eq!(tracker.record().deaths, 0);
    }

    #[test]
    fn test_restart_resets_counters() {
        let definition = QuestDefinition::hunt("Again", "Wyvern", 1).with_limits(10.0, 3);
        let (mut tracker, hunter, _bus) = started(definition, &[]);
        tracker.tick(10.0);
        assert!(tracker.is_complete());

        tracker.start(hunter, std::iter::empty());
        assert!(tracker.is_in_progress());
        assert_eq!(tracker.record().elapsed, 0.0);
        assert_eq!(tracker.remaining_time(), 10.0);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "00:00.00");
        assert_eq!(format_time(65.5), "01:05.50");
        assert_eq!(format_time(3000.0), "50:00.00");
        assert_eq!(format_time(-3.0), "00:00.00");
    }
}
