//! Monster AI.
//!
//! This module provides:
//! - [`Monster`]: vitals, flinch accumulation and a state machine over [`MonsterStateKind`]
//! - Idle, Roam, Chase, Attack, Flinch and Dead state handlers
//! - [`select_attack`]: distance-filtered weighted attack choice
//!
//! Sight requires the target to be inside both the detection radius and the
//! forward field of view. A chase is only abandoned beyond
//! `detection_range * lose_target_factor`, so a target hovering at the edge of
//! sight does not flip the monster between Chase and Idle.

use std::f32::consts::TAU;
use std::sync::Arc;

use bestiary_common::{EntityId, NodeId};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::carving::CarvingNode;
use crate::combat::{ActorContext, Damageable, HitReport, TargetInfo};
use crate::definitions::MonsterAttackDefinition;
use crate::events::{ActorKind, GameEvent};
use crate::movement::Mover;
use crate::state_machine::{State, StateMachine};
use crate::stats::MonsterStats;
use crate::vitals::ActorVitals;

/// Monster states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonsterStateKind {
    /// Waiting in place.
    Idle,
    /// Wandering to a random nearby point.
    Roam,
    /// Closing in on the target.
    Chase,
    /// Performing an attack.
    Attack,
    /// Hitstun after heavy damage.
    Flinch,
    /// Slain. Terminal.
    Dead,
}

/// Chooses an attack for a target at `distance`.
///
/// Only attacks whose range contains `distance` are candidates; among them
/// one is drawn by weight. If nothing qualifies the first attack is used.
/// Returns `None` only for an empty pool.
pub fn select_attack(
    attacks: &[MonsterAttackDefinition],
    distance: f32,
    rng: &mut fastrand::Rng,
) -> Option<usize> {
    if attacks.is_empty() {
        return None;
    }
    let candidates: Vec<usize> = attacks
        .iter()
        .enumerate()
        .filter(|(_, attack)| attack.in_range(distance))
        .map(|(index, _)| index)
        .collect();
    let Some(&first) = candidates.first() else {
        return Some(0);
    };

    let total: f32 = candidates
        .iter()
        .map(|&index| attacks[index].weight.max(0.0))
        .sum();
    if total <= 0.0 {
        return Some(first);
    }
    let roll = rng.f32() * total;
    let mut cumulative = 0.0;
    for &index in &candidates {
        cumulative += attacks[index].weight.max(0.0);
        if roll < cumulative {
            return Some(index);
        }
    }
    candidates.last().copied()
}

/// Everything the monster's states operate on.
pub struct MonsterCore {
    id: EntityId,
    stats: MonsterStats,
    vitals: ActorVitals,
    body: Box<dyn Mover>,
    ctx: ActorContext,
    target: Option<TargetInfo>,
    flinch_accumulator: f32,
    invincible: bool,
    current_attack: Option<usize>,
    carcass: Option<NodeId>,
    hits: Vec<HitReport>,
    rng: fastrand::Rng,
}

impl MonsterCore {
    fn publish(&self, event: GameEvent) {
        self.ctx.events.publish(event);
    }

    fn live_target(&self) -> Option<TargetInfo> {
        self.target.filter(|target| target.alive)
    }

    fn distance_to_target(&self) -> Option<f32> {
        self.live_target()
            .map(|target| target.position.distance(self.body.position()))
    }

    fn can_see_target(&self) -> bool {
        let Some(target) = self.live_target() else {
            return false;
        };
        let to_target = target.position - self.body.position();
        let distance = to_target.length();
        if distance > self.stats.detection_range {
            return false;
        }
        if distance <= f32::EPSILON {
            return true;
        }
        let angle = self.body.forward().angle_between(to_target).to_degrees();
        angle <= self.stats.field_of_view * 0.5
    }

    /// Turns towards `destination` and steps at `speed`, never overshooting.
    fn step_towards(&mut self, destination: Vec3, speed: f32, dt: f32) {
        let mut offset = destination - self.body.position();
        offset.y = 0.0;
        let distance = offset.length();
        if distance <= f32::EPSILON {
            return;
        }
        let direction = offset / distance;
        self.body
            .rotate_towards(direction, self.stats.rotation_speed * dt);
        self.body.move_by(direction * (speed * dt).min(distance));
    }

    fn hit_pass(&mut self, attack: &MonsterAttackDefinition) {
        let hitbox = attack.hitbox();
        let position = self.body.position();
        let rotation = self.body.rotation();
        let targets = self.ctx.spatial.query_box(
            hitbox.center(position, rotation),
            hitbox.half_extents(),
            rotation,
            self.id,
        );
        for target in targets {
            debug!("{} {} hits {} with {}", self.stats.name, self.id, target, attack.name);
            self.hits.push(HitReport {
                attacker: self.id,
                target,
                damage: attack.damage,
                source_position: position,
            });
            self.publish(GameEvent::AttackHit {
                attacker: self.id,
                target,
                damage: attack.damage,
                critical: false,
            });
        }
    }
}

#[derive(Default)]
struct IdleState {
    timer: f32,
}

impl State<MonsterStateKind, MonsterCore> for IdleState {
    fn enter(&mut self, _monster: &mut MonsterCore) {
        self.timer = 0.0;
    }

    fn tick(&mut self, monster: &mut MonsterCore, dt: f32) -> Option<MonsterStateKind> {
        if monster.can_see_target() {
            return Some(MonsterStateKind::Chase);
        }
        self.timer += dt;
        (self.timer >= monster.stats.idle_time).then_some(MonsterStateKind::Roam)
    }
}

#[derive(Default)]
struct RoamState {
    destination: Vec3,
}

impl State<MonsterStateKind, MonsterCore> for RoamState {
    fn enter(&mut self, monster: &mut MonsterCore) {
        // Uniform point inside a circle of the roam radius.
        let angle = monster.rng.f32() * TAU;
        let radius = monster.rng.f32().sqrt() * monster.stats.roam_distance;
        let offset = Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius);
        self.destination = monster.body.position() + offset;
    }

    fn tick(&mut self, monster: &mut MonsterCore, dt: f32) -> Option<MonsterStateKind> {
        if monster.can_see_target() {
            return Some(MonsterStateKind::Chase);
        }
        let mut remaining = self.destination - monster.body.position();
        remaining.y = 0.0;
        if remaining.length() <= monster.stats.arrival_distance {
            return Some(MonsterStateKind::Idle);
        }
        monster.step_towards(self.destination, monster.stats.move_speed, dt);
        None
    }
}

struct ChaseState;

impl State<MonsterStateKind, MonsterCore> for ChaseState {
    fn tick(&mut self, monster: &mut MonsterCore, dt: f32) -> Option<MonsterStateKind> {
        let Some(target) = monster.live_target() else {
            return Some(MonsterStateKind::Idle);
        };
        let distance = target.position.distance(monster.body.position());
        if distance > monster.stats.lose_target_range() {
            debug!("{} {} lost its target", monster.stats.name, monster.id);
            return Some(MonsterStateKind::Idle);
        }
        if distance <= monster.stats.attack_range {
            return Some(MonsterStateKind::Attack);
        }
        monster.step_towards(target.position, monster.stats.chase_speed, dt);
        None
    }
}

#[derive(Default)]
struct AttackState {
    timer: f32,
    hit_done: bool,
}

impl State<MonsterStateKind, MonsterCore> for AttackState {
    fn enter(&mut self, monster: &mut MonsterCore) {
        let distance = monster.distance_to_target().unwrap_or(0.0);
        let index = select_attack(&monster.stats.attacks, distance, &mut monster.rng);
        monster.current_attack = index;
        self.timer = 0.0;
        self.hit_done = false;

        if let Some(target) = monster.live_target() {
            let facing = target.position - monster.body.position();
            monster.body.rotate_towards(facing, 360.0);
        }
        if let Some(attack) = index.and_then(|i| monster.stats.attacks.get(i)) {
            debug!("{} {} uses {}", monster.stats.name, monster.id, attack.name);
            monster.publish(GameEvent::AttackStarted {
                attacker: monster.id,
                attack: attack.name.clone(),
                combo_index: 0,
            });
        }
    }

    fn tick(&mut self, monster: &mut MonsterCore, dt: f32) -> Option<MonsterStateKind> {
        let attacks = Arc::clone(&monster.stats.attacks);
        let Some(attack) = monster.current_attack.and_then(|i| attacks.get(i)) else {
            return Some(MonsterStateKind::Chase);
        };

        self.timer += dt;
        if !self.hit_done && self.timer >= attack.startup {
            self.hit_done = true;
            monster.hit_pass(attack);
        }
        if self.timer >= attack.total_duration() {
            monster.publish(GameEvent::AttackEnded {
                attacker: monster.id,
            });
            return Some(MonsterStateKind::Chase);
        }
        None
    }

    fn exit(&mut self, monster: &mut MonsterCore) {
        monster.current_attack = None;
    }
}

#[derive(Default)]
struct FlinchState {
    timer: f32,
}

impl State<MonsterStateKind, MonsterCore> for FlinchState {
    fn enter(&mut self, monster: &mut MonsterCore) {
        self.timer = 0.0;
        monster.flinch_accumulator = 0.0;
    }

    fn tick(&mut self, monster: &mut MonsterCore, dt: f32) -> Option<MonsterStateKind> {
        self.timer += dt;
        (self.timer >= monster.stats.flinch_duration).then_some(MonsterStateKind::Chase)
    }
}

struct DeadState;

impl State<MonsterStateKind, MonsterCore> for DeadState {
    fn enter(&mut self, monster: &mut MonsterCore) {
        if monster.carcass.is_some() {
            return;
        }
        let position = monster.body.position();
        let node = CarvingNode::new(
            monster.id,
            position,
            monster.stats.carve_count,
            Arc::clone(&monster.stats.loot),
        )
        .with_seed(monster.rng.u64(..))
        .with_carve_time(monster.stats.carve_time)
        .with_interaction_range(monster.stats.carve_range);
        let node_id = node.id();
        let charges = node.max_charges();
        monster.ctx.carving.spawn(node);
        monster.carcass = Some(node_id);

        info!("{} {} slain", monster.stats.name, monster.id);
        monster.publish(GameEvent::Died {
            entity: monster.id,
            kind: ActorKind::Monster,
            name: monster.stats.name.clone(),
        });
        monster.publish(GameEvent::CarvingNodeSpawned {
            node: node_id,
            owner: monster.id,
            charges,
        });
    }

    fn tick(&mut self, _monster: &mut MonsterCore, _dt: f32) -> Option<MonsterStateKind> {
        None
    }
}

/// A hostile monster.
pub struct Monster {
    core: MonsterCore,
    machine: StateMachine<MonsterStateKind, MonsterCore>,
}

impl Monster {
    /// Creates a monster in Idle at full health.
    pub fn new(id: EntityId, stats: MonsterStats, body: Box<dyn Mover>, ctx: ActorContext) -> Self {
        let vitals = ActorVitals::new(stats.max_health, 0.0);
        let mut core = MonsterCore {
            id,
            stats,
            vitals,
            body,
            ctx,
            target: None,
            flinch_accumulator: 0.0,
            invincible: false,
            current_attack: None,
            carcass: None,
            hits: Vec::new(),
            rng: fastrand::Rng::new(),
        };
        let mut machine = StateMachine::new()
            .with_state(MonsterStateKind::Idle, IdleState::default())
            .with_state(MonsterStateKind::Roam, RoamState::default())
            .with_state(MonsterStateKind::Chase, ChaseState)
            .with_state(MonsterStateKind::Attack, AttackState::default())
            .with_state(MonsterStateKind::Flinch, FlinchState::default())
            .with_state(MonsterStateKind::Dead, DeadState);
        machine.change_state(MonsterStateKind::Idle, &mut core);
        Self { core, machine }
    }

    /// Seeds roaming, attack selection and the carcass loot roll.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.core.rng = fastrand::Rng::with_seed(seed);
        self
    }

    /// Updates what the monster senses about its quarry this frame.
    pub fn set_target(&mut self, target: Option<TargetInfo>) {
        self.core.target = target;
    }

    /// Runs one frame of the state machine.
    pub fn tick(&mut self, dt: f32) {
        self.machine.tick(&mut self.core, dt);
    }

    /// Forces a transition. Refused once the monster is dead.
    pub fn force_state(&mut self, state: MonsterStateKind) -> bool {
        if self.is_dead() {
            return false;
        }
        self.machine.change_state(state, &mut self.core)
    }

    /// Toggles damage immunity.
    pub fn set_invincible(&mut self, invincible: bool) {
        self.core.invincible = invincible;
    }

    /// Takes the hits landed since the last call.
    pub fn drain_hits(&mut self) -> Vec<HitReport> {
        std::mem::take(&mut self.core.hits)
    }

    /// Whether the target is currently seen.
    #[must_use]
    pub fn can_see_target(&self) -> bool {
        self.core.can_see_target()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> MonsterStateKind {
        self.machine.current().unwrap_or(MonsterStateKind::Idle)
    }

    /// Entity id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.core.id
    }

    /// Species name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.core.stats.name
    }

    /// Resolved tuning.
    #[must_use]
    pub fn stats(&self) -> &MonsterStats {
        &self.core.stats
    }

    /// World position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.core.body.position()
    }

    /// World rotation.
    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.core.body.rotation()
    }

    /// Health.
    #[must_use]
    pub fn vitals(&self) -> &ActorVitals {
        &self.core.vitals
    }

    /// Damage accumulated towards the next flinch.
    #[must_use]
    pub fn flinch_accumulator(&self) -> f32 {
        self.core.flinch_accumulator
    }

    /// Carving node spawned on death.
    #[must_use]
    pub fn carcass(&self) -> Option<NodeId> {
        self.core.carcass
    }

    /// Health is zero.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.core.vitals.is_dead()
    }
}

impl Damageable for Monster {
    fn take_damage(&mut self, amount: i32, _source_position: Vec3) -> bool {
        if self.is_dead() || self.core.invincible {
            return false;
        }
        let change = self.core.vitals.apply_damage(amount);
        self.core.publish(GameEvent::Damaged {
            target: self.core.id,
            amount: change.dealt,
            remaining: change.remaining,
        });

        if change.killed {
            self.machine.change_state(MonsterStateKind::Dead, &mut self.core);
            return true;
        }

        self.core.flinch_accumulator += change.dealt as f32;
        if self.core.flinch_accumulator >= self.core.stats.flinch_threshold
            && self
                .machine
                .change_state(MonsterStateKind::Flinch, &mut self.core)
        {
            debug!("{} {} flinched", self.core.stats.name, self.core.id);
            self.core.publish(GameEvent::Flinched {
                monster: self.core.id,
            });
        }
        true
    }
}

impl std::fmt::Debug for Monster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monster")
            .field("id", &self.core.id)
            .field("name", &self.core.stats.name)
            .field("state", &self.machine.current())
            .field("health", &self.core.vitals.health())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carving::CarvingRegistry;
    use crate::events::EventBus;
    use crate::movement::KinematicBody;
    use crate::spatial::{ColliderSet, SpatialQuery};

    struct Rig {
        bus: EventBus,
        colliders: Arc<ColliderSet>,
        carving: CarvingRegistry,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                bus: EventBus::default(),
                colliders: Arc::new(ColliderSet::new()),
                carving: CarvingRegistry::new(),
            }
        }

        fn monster(&self, stats: MonsterStats) -> Monster {
            let spatial: Arc<dyn SpatialQuery> = Arc::<ColliderSet>::clone(&self.colliders);
            let ctx = ActorContext::new(spatial, self.carving.clone(), self.bus.publisher());
            Monster::new(
                EntityId::new(),
                stats,
                Box::new(KinematicBody::new(Vec3::ZERO)),
                ctx,
            )
            .with_seed(11)
        }

        fn count(&self, name: &str) -> usize {
            self.bus.drain().iter().filter(|e| e.name() == name).count()
        }
    }

    fn target_at(position: Vec3) -> TargetInfo {
        TargetInfo {
            id: EntityId::new(),
            position,
            alive: true,
        }
    }

    fn attack(name: &str, weight: f32, min: f32, max: f32) -> MonsterAttackDefinition {
        MonsterAttackDefinition {
            name: name.into(),
            weight,
            min_distance: min,
            max_distance: max,
            ..Default::default()
        }
    }

    #[test]
    fn test_flinch_on_third_hit() {
        let rig = Rig::new();
        let mut monster = rig.monster(MonsterStats::default());

        monster.take_damage(40, Vec3::ZERO);
        monster.take_damage(40, Vec3::ZERO);
        assert_eq!(monster.state(), MonsterStateKind::Idle);
        assert_eq!(monster.flinch_accumulator(), 80.0);

        monster.take_damage(40, Vec3::ZERO);
        assert_eq!(monster.state(), MonsterStateKind::Flinch);
        assert_eq!(monster.flinch_accumulator(), 0.0);
        assert_eq!(rig.count("flinched"), 1);

        monster.tick(1.0);
        assert_eq!(monster.state(), MonsterStateKind::Chase);
    }

    #[test]
    fn test_death_preempts_flinch_and_spawns_once() {
        let rig = Rig::new();
        let stats = MonsterStats {
            max_health: 100,
            ..Default::default()
        };
        let mut monster = rig.monster(stats);

        assert!(monster.take_damage(150, Vec3::ZERO));
        assert!(!monster.take_damage(150, Vec3::ZERO));
        assert_eq!(monster.state(), MonsterStateKind::Dead);
        assert!(!monster.force_state(MonsterStateKind::Idle));

        assert_eq!(rig.carving.len(), 1);
        assert!(monster.carcass().is_some());
        let events = rig.bus.drain();
        assert_eq!(events.iter().filter(|e| e.name() == "died").count(), 1);
        assert_eq!(events.iter().filter(|e| e.name() == "flinched").count(), 0);
        assert_eq!(events.last().map(GameEvent::name), Some("carving_node_spawned"));
    }

    #[test]
    fn test_invincible_ignores_damage() {
        let rig = Rig::new();
        let mut monster = rig.monster(MonsterStats::default());
        monster.set_invincible(true);
        assert!(!monster.take_damage(500, Vec3::ZERO));
        assert_eq!(monster.vitals().health(), 1000);
        assert_eq!(monster.flinch_accumulator(), 0.0);
    }

    #[test]
    fn test_sight_needs_range_and_field_of_view() {
        let rig = Rig::new();
        let mut monster = rig.monster(MonsterStats::default());

        monster.set_target(Some(target_at(Vec3::new(0.0, 0.0, -10.0))));
        assert!(!monster.can_see_target());
        monster.tick(0.1);
        assert_eq!(monster.state(), MonsterStateKind::Idle);

        monster.set_target(Some(target_at(Vec3::new(0.0, 0.0, 25.0))));
        assert!(!monster.can_see_target());

        monster.set_target(Some(target_at(Vec3::new(5.0, 0.0, 10.0))));
        assert!(monster.can_see_target());
        monster.tick(0.1);
        assert_eq!(monster.state(), MonsterStateKind::Chase);
    }

    #[test]
    fn test_chase_hysteresis() {
        let rig = Rig::new();
        let mut monster = rig.monster(MonsterStats::default());
        monster.set_target(Some(target_at(Vec3::new(0.0, 0.0, 15.0))));
        monster.tick(0.0);
        assert_eq!(monster.state(), MonsterStateKind::Chase);

        // Out of sight but inside 1.5x detection: keep chasing.
        monster.set_target(Some(target_at(Vec3::new(0.0, 0.0, 28.0))));
        monster.tick(0.0);
        assert_eq!(monster.state(), MonsterStateKind::Chase);

        monster.set_target(Some(target_at(Vec3::new(0.0, 0.0, 31.0))));
        monster.tick(0.0);
        assert_eq!(monster.state(), MonsterStateKind::Idle);
    }

    #[test]
    fn test_chase_closes_distance_then_attacks() {
        let rig = Rig::new();
        let mut monster = rig.monster(MonsterStats::default());
        monster.set_target(Some(target_at(Vec3::new(0.0, 0.0, 10.0))));
        monster.tick(0.1);
        monster.tick(0.5);
        // Chase speed 6.
        assert!((monster.position().z - 3.0).abs() < 1e-4);

        monster.tick(0.5);
        monster.tick(0.0);
        assert_eq!(monster.state(), MonsterStateKind::Attack);
    }

    #[test]
    fn test_bite_hits_once_and_returns_to_chase() {
        let rig = Rig::new();
        let mut monster = rig.monster(MonsterStats::default());
        let hunter = EntityId::new();
        rig.colliders.insert(monster.id(), Vec3::ZERO, 1.5);
        rig.colliders.insert(hunter, Vec3::new(0.0, 0.0, 3.0), 0.5);
        monster.set_target(Some(TargetInfo {
            id: hunter,
            position: Vec3::new(0.0, 0.0, 3.0),
            alive: true,
        }));

        monster.tick(0.0);
        monster.tick(0.0);
        assert_eq!(monster.state(), MonsterStateKind::Attack);

        let mut hits = Vec::new();
        for _ in 0..14 {
            monster.tick(0.1);
            hits.extend(monster.drain_hits());
        }
        assert_eq!(monster.state(), MonsterStateKind::Attack);
        monster.tick(0.1);
        assert_eq!(monster.state(), MonsterStateKind::Chase);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, hunter);
        assert_eq!(hits[0].damage, 15);
    }

    #[test]
    fn test_idle_roams_then_arrives() {
        let rig = Rig::new();
        let mut monster = rig.monster(MonsterStats::default());
        monster.tick(2.0);
        assert_eq!(monster.state(), MonsterStateKind::Roam);

        for _ in 0..200 {
            monster.tick(0.1);
            if monster.state() == MonsterStateKind::Idle {
                break;
            }
        }
        assert_eq!(monster.state(), MonsterStateKind::Idle);
        assert!(monster.position().length() <= 10.0);
    }

    #[test]
    fn test_select_attack_filters_by_distance() {
        let attacks = [
            attack("Tail", 1.0, 0.0, 3.0),
            attack("Charge", 1.0, 8.0, 20.0),
        ];
        let mut rng = fastrand::Rng::with_seed(1);
        assert_eq!(select_attack(&attacks, 2.0, &mut rng), Some(0));
        assert_eq!(select_attack(&attacks, 12.0, &mut rng), Some(1));
        // Nothing in range: first attack.
        assert_eq!(select_attack(&attacks, 5.0, &mut rng), Some(0));
        assert_eq!(select_attack(&[], 5.0, &mut rng), None);
    }

    #[test]
    fn test_select_attack_respects_weights() {
        let attacks = [attack("Swipe", 3.0, 0.0, 10.0), attack("Roar", 1.0, 0.0, 10.0)];
        let mut rng = fastrand::Rng::with_seed(77);
        let swipes = (0..4_000)
            .filter(|_| select_attack(&attacks, 5.0, &mut rng) == Some(0))
            .count();
        assert!((2_800..3_200).contains(&swipes), "swipes = {swipes}");
    }
}
