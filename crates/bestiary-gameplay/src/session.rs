//! Per-frame orchestration of a hunt.
//!
//! This module provides:
//! - [`SessionSetup`]: who spawns where, with which stats, under which quest
//! - [`HuntSession`]: owns every actor, the carving registry, the collider
//!   snapshot, the quest tracker and the event bus
//!
//! One [`HuntSession::tick`] runs, in order: sensor refresh (colliders and
//! monster targets), hunter and monster state machines with same-frame damage
//! delivery, hunter locomotion, the quest clock, and event dispatch to the
//! tracker and then the presentation sink.

use std::f32::consts::TAU;
use std::sync::Arc;

use bestiary_common::{BestiaryError, BestiaryResult, EntityId};
use glam::Vec3;
use tracing::{info, warn};

use crate::carving::CarvingRegistry;
use crate::combat::{ActorContext, Damageable, HitReport, TargetInfo};
use crate::definitions::QuestDefinition;
use crate::events::{EventBus, GameEvent, DEFAULT_EVENT_CAPACITY};
use crate::hunter::Hunter;
use crate::input::InputSnapshot;
use crate::loader::DefinitionSet;
use crate::monster::Monster;
use crate::movement::KinematicBody;
use crate::presentation::{HudSnapshot, PresentationSink};
use crate::quest::{QuestState, QuestTracker};
use crate::spatial::{Collider, ColliderSet};
use crate::stats::{EffectiveWeapon, HunterStats, MonsterStats};

/// Distance from the hunter spawn at which generated monster spawns are placed.
pub const MONSTER_SPAWN_RADIUS: f32 = 15.0;

/// Upper bound on dispatch rounds per frame; events published while
/// dispatching are delivered in the next round.
const MAX_DISPATCH_ROUNDS: usize = 8;

/// One monster to place at session start.
#[derive(Debug, Clone)]
pub struct MonsterSpawn {
    /// Resolved tuning.
    pub stats: MonsterStats,
    /// Spawn position.
    pub position: Vec3,
    /// Initial facing.
    pub facing: Vec3,
}

impl MonsterSpawn {
    /// Spawn facing +Z.
    #[must_use]
    pub fn new(stats: MonsterStats, position: Vec3) -> Self {
        Self {
            stats,
            position,
            facing: Vec3::Z,
        }
    }

    /// Sets the initial facing.
    #[must_use]
    pub fn facing(mut self, direction: Vec3) -> Self {
        self.facing = direction;
        self
    }
}

/// Everything needed to start a hunt.
#[derive(Debug, Clone)]
pub struct SessionSetup {
    /// Hunter tuning.
    pub hunter: HunterStats,
    /// Hunter weapon.
    pub weapon: EffectiveWeapon,
    /// Hunter spawn and respawn point.
    pub hunter_spawn: Vec3,
    /// Monsters to place.
    pub monsters: Vec<MonsterSpawn>,
    /// Quest to run.
    pub quest: QuestDefinition,
    /// Seed for every random stream in the session.
    pub seed: u64,
    /// Event bus capacity.
    pub event_capacity: usize,
}

impl SessionSetup {
    /// Default hunter and weapon, no monsters, the given quest.
    #[must_use]
    pub fn new(quest: QuestDefinition) -> Self {
        Self {
            hunter: HunterStats::default(),
            weapon: EffectiveWeapon::resolve(None),
            hunter_spawn: Vec3::ZERO,
            monsters: Vec::new(),
            quest,
            seed: 0,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Builds a setup from authored data.
    ///
    /// Picks the named quest (or the first one, or a default hunt) and the
    /// named weapon (or the first one, or the built-in great sword). A quest
    /// with a named target spawns `target_count` of that species; an open
    /// quest spawns one of every species.
    pub fn from_definitions(
        set: &DefinitionSet,
        weapon: Option<&str>,
        quest: Option<&str>,
    ) -> BestiaryResult<Self> {
        let quest = match quest {
            Some(name) => set.quest(name).cloned().ok_or_else(|| {
                BestiaryError::InvalidDefinition(format!("unknown quest '{name}'"))
            })?,
            None => set.quests.first().cloned().unwrap_or_default(),
        };
        let weapon = match weapon {
            Some(name) => Some(set.weapon(name).ok_or_else(|| {
                BestiaryError::InvalidDefinition(format!("unknown weapon '{name}'"))
            })?),
            None => set.weapons.first(),
        };

        let target = quest.target_name.trim();
        let species: Vec<MonsterStats> = if target.is_empty() {
            set.monsters
                .iter()
                .map(|def| MonsterStats::resolve(Some(def)))
                .collect()
        } else {
            let def = set.monster(target).ok_or_else(|| {
                BestiaryError::InvalidDefinition(format!(
                    "quest '{}' targets unknown monster '{target}'",
                    quest.name
                ))
            })?;
            let stats = MonsterStats::resolve(Some(def));
            vec![stats; quest.target_count as usize]
        };

        let mut setup = Self::new(quest);
        setup.hunter = HunterStats::resolve(set.hunter.as_ref());
        setup.weapon = EffectiveWeapon::resolve(weapon);
        let count = species.len().max(1) as f32;
        setup.monsters = species
            .into_iter()
            .enumerate()
            .map(|(i, stats)| {
                let angle = TAU * i as f32 / count;
                let position = Vec3::new(angle.sin(), 0.0, angle.cos()) * MONSTER_SPAWN_RADIUS;
                MonsterSpawn::new(stats, position).facing(position)
            })
            .collect();
        Ok(setup)
    }

    /// Adds a monster.
    #[must_use]
    pub fn with_monster(mut self, spawn: MonsterSpawn) -> Self {
        self.monsters.push(spawn);
        self
    }

    /// Sets the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// A running hunt.
pub struct HuntSession {
    bus: EventBus,
    colliders: Arc<ColliderSet>,
    carving: CarvingRegistry,
    hunter: Hunter,
    hunter_stats: HunterStats,
    weapon: EffectiveWeapon,
    hunter_spawn: Vec3,
    monsters: Vec<Monster>,
    tracker: QuestTracker,
    rng: fastrand::Rng,
    frame: u64,
}

impl HuntSession {
    /// Spawns everything and starts the quest.
    #[must_use]
    pub fn new(setup: SessionSetup) -> Self {
        let bus = EventBus::new(setup.event_capacity);
        let colliders = Arc::new(ColliderSet::new());
        let carving = CarvingRegistry::new();
        let mut rng = fastrand::Rng::with_seed(setup.seed);

        let ctx = ActorContext::new(colliders.clone(), carving.clone(), bus.publisher());
        let monsters: Vec<Monster> = setup
            .monsters
            .into_iter()
            .map(|spawn| {
                let body = KinematicBody::new(spawn.position).facing(spawn.facing);
                Monster::new(EntityId::new(), spawn.stats, Box::new(body), ctx.clone())
                    .with_seed(rng.u64(..))
            })
            .collect();

        let hunter = Self::build_hunter(
            EntityId::new(),
            &setup.hunter,
            &setup.weapon,
            setup.hunter_spawn,
            ctx,
            rng.u64(..),
        );
        let mut tracker = QuestTracker::new(setup.quest, bus.publisher());
        tracker.start(hunter.id(), monsters.iter().map(|m| (m.id(), m.name())));

        Self {
            bus,
            colliders,
            carving,
            hunter,
            hunter_stats: setup.hunter,
            weapon: setup.weapon,
            hunter_spawn: setup.hunter_spawn,
            monsters,
            tracker,
            rng,
            frame: 0,
        }
    }

    fn build_hunter(
        id: EntityId,
        stats: &HunterStats,
        weapon: &EffectiveWeapon,
        spawn: Vec3,
        ctx: ActorContext,
        seed: u64,
    ) -> Hunter {
        Hunter::new(
            id,
            stats.clone(),
            weapon.clone(),
            Box::new(KinematicBody::new(spawn)),
            ctx,
        )
        .with_seed(seed)
    }

    fn actor_context(&self) -> ActorContext {
        ActorContext::new(
            self.colliders.clone(),
            self.carving.clone(),
            self.bus.publisher(),
        )
    }

    /// Advances one frame and reports the quest state afterwards.
    pub fn tick(
        &mut self,
        dt: f32,
        input: InputSnapshot,
        sink: &mut dyn PresentationSink,
    ) -> QuestState {
        self.frame += 1;
        self.refresh_sensors();

        self.hunter.tick(dt, input);
        let hunter_hits = self.hunter.drain_hits();
        self.deliver_to_monsters(&hunter_hits);

        for index in 0..self.monsters.len() {
            self.monsters[index].tick(dt);
            let hits = self.monsters[index].drain_hits();
            self.deliver_to_hunter(&hits);
        }

        self.hunter.integrate_movement(dt);
        self.tracker.tick(dt);

        self.dispatch(sink);
        if self.respawn_if_fainted() {
            self.dispatch(sink);
        }
        self.carving.prune_depleted();

        sink.show_vitals(&self.hud());
        sink.show_quest(self.tracker.record());
        self.tracker.state()
    }

    fn refresh_sensors(&mut self) {
        let hunter_alive = !self.hunter.is_dead();
        let hunter_collider = hunter_alive.then(|| {
            let radius = self.hunter.stats().body_radius;
            Collider {
                root: self.hunter.id(),
                center: self.hunter.position() + Vec3::Y * radius,
                radius,
            }
        });
        let monster_colliders = self.monsters.iter().filter(|m| !m.is_dead()).map(|m| {
            let radius = m.stats().body_radius;
            Collider {
                root: m.id(),
                center: m.position() + Vec3::Y * radius,
                radius,
            }
        });
        self.colliders
            .rebuild(hunter_collider.into_iter().chain(monster_colliders));

        let target = TargetInfo {
            id: self.hunter.id(),
            position: self.hunter.position(),
            alive: hunter_alive,
        };
        for monster in &mut self.monsters {
            monster.set_target(Some(target));
        }
    }

    fn deliver_to_monsters(&mut self, hits: &[HitReport]) {
        for hit in hits {
            match self.monsters.iter_mut().find(|m| m.id() == hit.target) {
                Some(monster) => {
                    monster.take_damage(hit.damage, hit.source_position);
                }
                None => warn!("hit on unknown target {}", hit.target),
            }
        }
    }

    fn deliver_to_hunter(&mut self, hits: &[HitReport]) {
        let hunter = self.hunter.id();
        for hit in hits.iter().filter(|hit| hit.target == hunter) {
            self.hunter.take_damage(hit.damage, hit.source_position);
        }
    }

    fn dispatch(&mut self, sink: &mut dyn PresentationSink) {
        for _ in 0..MAX_DISPATCH_ROUNDS {
            let events = self.bus.drain();
            if events.is_empty() {
                return;
            }
            for event in &events {
                self.tracker.handle_event(event);
                sink.show_event(event);
            }
        }
        warn!("event dispatch did not settle this frame");
    }

    /// Replaces a fainted hunter while the quest still runs.
    fn respawn_if_fainted(&mut self) -> bool {
        if !self.hunter.is_dead() || !self.tracker.is_in_progress() {
            return false;
        }
        let id = self.hunter.id();
        let seed = self.rng.u64(..);
        self.hunter = Self::build_hunter(
            id,
            &self.hunter_stats,
            &self.weapon,
            self.hunter_spawn,
            self.actor_context(),
            seed,
        );
        info!(
            "hunter {} respawned, {} faint(s) left",
            id,
            self.tracker.remaining_lives()
        );
        self.bus.publish(GameEvent::HunterRespawned { hunter: id });
        true
    }

    /// HUD values for the current frame.
    #[must_use]
    pub fn hud(&self) -> HudSnapshot {
        let vitals = self.hunter.vitals();
        let record = self.tracker.record();
        HudSnapshot {
            health: vitals.health(),
            max_health: vitals.max_health(),
            stamina: vitals.stamina(),
            max_stamina: vitals.max_stamina(),
            elapsed: record.elapsed,
            remaining_time: record.remaining_time(),
            deaths: record.deaths,
            remaining_lives: record.remaining_lives(),
            quest_state: record.state,
        }
    }

    /// The hunter.
    #[must_use]
    pub fn hunter(&self) -> &Hunter {
        &self.hunter
    }

    /// The hunter, mutably.
    pub fn hunter_mut(&mut self) -> &mut Hunter {
        &mut self.hunter
    }

    /// All monsters, dead ones included.
    #[must_use]
    pub fn monsters(&self) -> &[Monster] {
        &self.monsters
    }

    /// All monsters, mutably.
    pub fn monsters_mut(&mut self) -> &mut [Monster] {
        &mut self.monsters
    }

    /// Nearest living monster to the hunter.
    #[must_use]
    pub fn nearest_monster(&self) -> Option<&Monster> {
        let origin = self.hunter.position();
        self.monsters
            .iter()
            .filter(|m| !m.is_dead())
            .min_by(|a, b| {
                a.position()
                    .distance_squared(origin)
                    .total_cmp(&b.position().distance_squared(origin))
            })
    }

    /// Live carving nodes.
    #[must_use]
    pub fn carving(&self) -> &CarvingRegistry {
        &self.carving
    }

    /// The quest tracker.
    #[must_use]
    pub fn tracker(&self) -> &QuestTracker {
        &self.tracker
    }

    /// Frames simulated.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

impl std::fmt::Debug for HuntSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuntSession")
            .field("frame", &self.frame)
            .field("hunter", &self.hunter)
            .field("monsters", &self.monsters.len())
            .field("quest", &self.tracker.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::LootEntry;
    use crate::hunter::HunterStateKind;
    use crate::monster::MonsterStateKind;
    use crate::presentation::RecordingSink;
    use crate::quest::FailureReason;

    const DT: f32 = 0.05;

    fn idle() -> InputSnapshot {
        InputSnapshot::IDLE
    }

    fn run(
        session: &mut HuntSession,
        sink: &mut RecordingSink,
        seconds: f32,
        input: InputSnapshot,
    ) {
        let frames = (seconds / DT).round() as usize;
        for _ in 0..frames {
            session.tick(DT, input, sink);
        }
    }

    fn weak_wyvern() -> MonsterStats {
        MonsterStats {
            name: "Wyvern".into(),
            max_health: 40,
            loot: Arc::from(vec![LootEntry::new("Wyvern Scale", 1, 1.0)]),
            ..Default::default()
        }
    }

    #[test]
    fn test_hunt_carve_and_succeed() {
        let setup = SessionSetup::new(QuestDefinition::hunt("First Hunt", "Wyvern", 1))
            .with_monster(MonsterSpawn::new(weak_wyvern(), Vec3::new(0.0, 0.0, 2.5)))
            .with_seed(3);
        let mut session = HuntSession::new(setup);
        let mut sink = RecordingSink::default();
        assert_eq!(sink.count("quest_started"), 0);

        session.tick(DT, idle().with_attack(), &mut sink);
        assert_eq!(session.hunter().state(), HunterStateKind::Attack);
        run(&mut session, &mut sink, 1.0, idle());

        assert_eq!(session.monsters()[0].state(), MonsterStateKind::Dead);
        assert_eq!(session.tracker().state(), QuestState::Success);
        assert_eq!(sink.count("quest_started"), 1);
        assert_eq!(sink.count("monster_killed"), 1);
        assert_eq!(sink.count("quest_succeeded"), 1);
        assert_eq!(session.carving().len(), 1);

        // Died reaches the tracker before the kill is announced.
        let died = sink.events.iter().position(|e| e.name() == "died");
        let killed = sink.events.iter().position(|e| e.name() == "monster_killed");
        assert!(died < killed);

        run(&mut session, &mut sink, 2.0, idle().with_interact());
        assert_eq!(sink.count("item_obtained"), 1);
    }

    #[test]
    fn test_monster_bites_hunter() {
        let wyvern = MonsterStats {
            name: "Wyvern".into(),
            ..Default::default()
        };
        let setup = SessionSetup::new(QuestDefinition::hunt("Ambush", "Wyvern", 1))
            .with_monster(MonsterSpawn::new(wyvern, Vec3::new(0.0, 0.0, 3.0)).facing(Vec3::NEG_Z))
            .with_seed(8);
        let mut session = HuntSession::new(setup);
        let mut sink = RecordingSink::default();

        run(&mut session, &mut sink, 0.7, idle());

        assert_eq!(session.hunter().vitals().health(), 85);
        assert_eq!(session.hunter().state(), HunterStateKind::Stagger);
        assert_eq!(sink.count("staggered"), 1);
        assert_eq!(sink.last_hud.map(|hud| hud.health), Some(85));
    }

    #[test]
    fn test_faint_respawns_until_budget_spent() {
        let quest = QuestDefinition::hunt("Risky", "Wyvern", 1).with_limits(600.0, 2);
        let mut session = HuntSession::new(SessionSetup::new(quest));
        let mut sink = RecordingSink::default();
        let id = session.hunter().id();

        session.hunter_mut().take_damage(1_000, Vec3::ZERO);
        session.tick(DT, idle(), &mut sink);

        assert_eq!(session.tracker().record().deaths, 1);
        assert!(!session.hunter().is_dead());
        assert_eq!(session.hunter().id(), id);
        assert_eq!(session.hunter().vitals().health(), 100);
        assert_eq!(sink.count("hunter_respawned"), 1);

        session.hunter_mut().take_damage(1_000, Vec3::ZERO);
        let state = session.tick(DT, idle(), &mut sink);
        assert_eq!(state, QuestState::Failed(FailureReason::TooManyDeaths));
        assert!(session.hunter().is_dead());
        assert_eq!(sink.count("hunter_respawned"), 1);
    }

    #[test]
    fn test_time_limit_ends_session() {
        let quest = QuestDefinition::hunt("Short", "Wyvern", 1).with_limits(1.0, 3);
        let mut session = HuntSession::new(SessionSetup::new(quest));
        let mut sink = RecordingSink::default();
        run(&mut session, &mut sink, 1.1, idle());
        assert_eq!(
            session.tracker().state(),
            QuestState::Failed(FailureReason::TimeExpired)
        );
        assert_eq!(sink.count("quest_failed"), 1);
    }

    #[test]
    fn test_kills_survive_a_full_event_bus() {
        let mut setup = SessionSetup::new(QuestDefinition::hunt("Cull", "Wyvern", 4));
        setup.event_capacity = 2;
        for i in 0..4 {
            let position = Vec3::new(i as f32 * 10.0 - 15.0, 0.0, 30.0);
            setup = setup.with_monster(MonsterSpawn::new(weak_wyvern(), position));
        }
        let mut session = HuntSession::new(setup);
        let mut sink = RecordingSink::default();

        for monster in session.monsters_mut() {
            monster.take_damage(1_000, Vec3::ZERO);
        }
        let state = session.tick(DT, idle(), &mut sink);

        assert_eq!(sink.count("died"), 4);
        assert_eq!(sink.count("monster_killed"), 4);
        assert_eq!(state, QuestState::Success);
    }

    #[test]
    fn test_setup_from_definitions() {
        let text = r#"
[[weapons]]
name = "Bone Blade"
attack = 130

[[monsters]]
name = "Raptor"

[[quests]]
name = "Raptor Cull"
target_name = "Raptor"
target_count = 3
"#;
        let set = DefinitionSet::from_toml_str(text).expect("parses");
        let setup = SessionSetup::from_definitions(&set, None, None).expect("resolves");
        assert_eq!(setup.weapon.attack, 130);
        assert_eq!(setup.monsters.len(), 3);
        assert!(setup
            .monsters
            .iter()
            .all(|spawn| (spawn.position.length() - MONSTER_SPAWN_RADIUS).abs() < 1e-3));

        let session = HuntSession::new(setup);
        assert_eq!(session.tracker().tracked_count(), 3);

        assert!(SessionSetup::from_definitions(&set, Some("Nope"), None).is_err());
    }
}
