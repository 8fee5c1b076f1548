//! The player-controlled hunter.
//!
//! This module provides:
//! - [`Hunter`]: vitals, weapon and a state machine over [`HunterStateKind`]
//! - Locomotion, Attack, Dodge, Carve, Stagger and Dead state handlers
//!
//! The hunter reads one [`InputSnapshot`] per frame. Hits it lands are queued
//! as [`HitReport`]s for the session to deliver; locomotion itself is applied by
//! the session through [`Hunter::integrate_movement`] while the hunter can move.

use bestiary_common::EntityId;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::attack_timeline::{AttackTimeline, TimelineEvent};
use crate::carving::{CarveEvent, SharedCarvingNode};
use crate::combat::{ActorContext, Damageable, HitReport};
use crate::damage_calc::{raw_damage_neutral, roll_critical};
use crate::events::{ActorKind, GameEvent};
use crate::input::InputSnapshot;
use crate::movement::Mover;
use crate::state_machine::{State, StateMachine};
use crate::stats::{EffectiveWeapon, HunterStats};
use crate::vitals::ActorVitals;

/// Hunter states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HunterStateKind {
    /// Free movement; the default state.
    Locomotion,
    /// Playing the weapon combo.
    Attack,
    /// Evasive roll.
    Dodge,
    /// Harvesting remains.
    Carve,
    /// Hitstun.
    Stagger,
    /// Fainted. Terminal.
    Dead,
}

/// Everything the hunter's states operate on.
pub struct HunterCore {
    id: EntityId,
    stats: HunterStats,
    weapon: EffectiveWeapon,
    vitals: ActorVitals,
    body: Box<dyn Mover>,
    timeline: AttackTimeline,
    ctx: ActorContext,
    input: InputSnapshot,
    invincible: bool,
    dodge_cooldown: f32,
    carve_target: Option<SharedCarvingNode>,
    hits: Vec<HitReport>,
    rng: fastrand::Rng,
}

impl HunterCore {
    fn publish(&self, event: GameEvent) {
        self.ctx.events.publish(event);
    }

    fn can_attack(&self) -> bool {
        self.vitals.has_stamina(self.weapon.attack_stamina_cost)
    }

    fn can_dodge(&self) -> bool {
        self.dodge_cooldown <= 0.0 && self.vitals.has_stamina(self.stats.dodge_stamina_cost)
    }

    fn wants_to_move(&self) -> bool {
        self.input.has_move_input(self.stats.input_deadzone)
    }

    fn announce(&self, event: TimelineEvent) {
        match event {
            TimelineEvent::Started { combo_index } => {
                let attack = self
                    .timeline
                    .current_attack()
                    .map(|attack| attack.name.clone())
                    .unwrap_or_default();
                debug!("hunter {} starts {} ({})", self.id, attack, combo_index);
                self.publish(GameEvent::AttackStarted {
                    attacker: self.id,
                    attack,
                    combo_index,
                });
            }
            TimelineEvent::ComboAdvanced { combo_index } => {
                self.publish(GameEvent::ComboAdvanced {
                    attacker: self.id,
                    combo_index,
                });
            }
            TimelineEvent::Ended => {
                self.publish(GameEvent::AttackEnded { attacker: self.id });
            }
            TimelineEvent::Hit { .. } => {}
        }
    }

    /// Runs one overlap query for the current attack and queues every hit.
    fn hit_pass(&mut self) {
        let Some(attack) = self.timeline.current_attack() else {
            return;
        };
        let hitbox = attack.hitbox();
        let motion_value = attack.motion_value;
        let position = self.body.position();
        let rotation = self.body.rotation();

        let targets = self.ctx.spatial.query_box(
            hitbox.center(position, rotation),
            hitbox.half_extents(),
            rotation,
            self.id,
        );
        for target in targets {
            // The affinity roll is reported on the event but never scales damage.
            let critical = roll_critical(self.weapon.affinity, &mut self.rng);
            let damage = raw_damage_neutral(self.weapon.attack, motion_value);
            debug!("hunter {} hits {} for {}", self.id, target, damage);
            self.hits.push(HitReport {
                attacker: self.id,
                target,
                damage,
                source_position: position,
            });
            self.publish(GameEvent::AttackHit {
                attacker: self.id,
                target,
                damage,
                critical,
            });
        }
    }
}

struct LocomotionState;

impl State<HunterStateKind, HunterCore> for LocomotionState {
    fn tick(&mut self, hunter: &mut HunterCore, _dt: f32) -> Option<HunterStateKind> {
        let input = hunter.input;
        if input.attack_pressed && hunter.can_attack() {
            return Some(HunterStateKind::Attack);
        }
        if input.dodge_pressed && hunter.can_dodge() {
            return Some(HunterStateKind::Dodge);
        }
        if input.interact_held {
            let position = hunter.body.position();
            let radius = hunter.stats.carve_search_radius;
            if let Some(node) = hunter.ctx.carving.nearest_harvestable(position, radius) {
                hunter.carve_target = Some(node);
                return Some(HunterStateKind::Carve);
            }
        }
        None
    }
}

struct AttackState;

impl State<HunterStateKind, HunterCore> for AttackState {
    fn enter(&mut self, hunter: &mut HunterCore) {
        hunter.vitals.consume_stamina(hunter.weapon.attack_stamina_cost);
        if let Some(event) = hunter.timeline.start_attack(0) {
            hunter.announce(event);
        }
    }

    fn tick(&mut self, hunter: &mut HunterCore, dt: f32) -> Option<HunterStateKind> {
        if hunter.input.attack_pressed {
            hunter.timeline.buffer_input();
        }
        if let Some(attack) = hunter.timeline.current_attack() {
            let step = hunter.body.forward() * attack.forward_movement * dt;
            hunter.body.move_by(step);
        }

        for event in hunter.timeline.tick(dt) {
            match event {
                TimelineEvent::Hit { .. } => hunter.hit_pass(),
                TimelineEvent::Ended => {
                    hunter.announce(event);
                    return Some(HunterStateKind::Locomotion);
                }
                other => hunter.announce(other),
            }
        }

        if hunter.timeline.is_attacking() {
            None
        } else {
            Some(HunterStateKind::Locomotion)
        }
    }

    fn exit(&mut self, hunter: &mut HunterCore) {
        if hunter.timeline.is_attacking() {
            hunter.timeline.interrupt();
        }
    }
}

#[derive(Default)]
struct DodgeState {
    timer: f32,
    direction: Vec3,
}

impl State<HunterStateKind, HunterCore> for DodgeState {
    fn enter(&mut self, hunter: &mut HunterCore) {
        hunter.vitals.consume_stamina(hunter.stats.dodge_stamina_cost);
        hunter.dodge_cooldown = hunter.stats.dodge_cooldown;
        let direction = if hunter.wants_to_move() {
            hunter.input.world_direction().normalize_or_zero()
        } else {
            Vec3::ZERO
        };
        self.direction = if direction == Vec3::ZERO {
            hunter.body.forward()
        } else {
            direction
        };
        hunter.body.rotate_towards(self.direction, 360.0);
        self.timer = 0.0;
        hunter.invincible = true;
        hunter.publish(GameEvent::Dodged { hunter: hunter.id });
    }

    fn tick(&mut self, hunter: &mut HunterCore, dt: f32) -> Option<HunterStateKind> {
        let remaining = (hunter.stats.dodge_duration - self.timer).max(0.0);
        self.timer += dt;
        if self.timer >= hunter.stats.dodge_iframe_duration {
            hunter.invincible = false;
        }
        // The last step covers only what is left of the roll.
        let step = self.direction * hunter.stats.dodge_speed() * dt.min(remaining);
        hunter.body.move_by(step);

        (self.timer >= hunter.stats.dodge_duration).then_some(HunterStateKind::Locomotion)
    }

    fn exit(&mut self, hunter: &mut HunterCore) {
        hunter.invincible = false;
    }
}

#[derive(Default)]
struct CarveState {
    node: Option<SharedCarvingNode>,
}

impl State<HunterStateKind, HunterCore> for CarveState {
    fn enter(&mut self, hunter: &mut HunterCore) {
        self.node = hunter
            .carve_target
            .take()
            .filter(|node| node.lock().start());
    }

    fn tick(&mut self, hunter: &mut HunterCore, dt: f32) -> Option<HunterStateKind> {
        let Some(node) = &self.node else {
            return Some(HunterStateKind::Locomotion);
        };
        if hunter.input.dodge_pressed && hunter.can_dodge() {
            return Some(HunterStateKind::Dodge);
        }
        if hunter.input.dodge_pressed || hunter.wants_to_move() {
            return Some(HunterStateKind::Locomotion);
        }

        let (node_id, events) = {
            let mut guard = node.lock();
            (guard.id(), guard.tick(dt))
        };
        let mut finished = false;
        for event in events {
            match event {
                CarveEvent::ItemObtained { item, quantity } => {
                    info!("hunter {} carved {} x{}", hunter.id, item, quantity);
                    hunter.publish(GameEvent::ItemObtained {
                        node: node_id,
                        item,
                        quantity,
                    });
                }
                CarveEvent::CarveComplete { remaining } => {
                    finished = true;
                    hunter.publish(GameEvent::CarveCompleted {
                        node: node_id,
                        remaining,
                    });
                }
                CarveEvent::AllCarvesComplete => {
                    hunter.publish(GameEvent::AllCarvesCompleted { node: node_id });
                }
            }
        }

        let mut guard = node.lock();
        if finished {
            let keep_going = hunter.input.interact_held
                && guard.in_range(hunter.body.position())
                && guard.start();
            return (!keep_going).then_some(HunterStateKind::Locomotion);
        }
        (!guard.is_in_progress()).then_some(HunterStateKind::Locomotion)
    }

    fn exit(&mut self, _hunter: &mut HunterCore) {
        if let Some(node) = self.node.take() {
            node.lock().cancel();
        }
    }
}

#[derive(Default)]
struct StaggerState {
    timer: f32,
}

impl State<HunterStateKind, HunterCore> for StaggerState {
    fn enter(&mut self, hunter: &mut HunterCore) {
        self.timer = 0.0;
        hunter.publish(GameEvent::Staggered { hunter: hunter.id });
    }

    fn tick(&mut self, hunter: &mut HunterCore, dt: f32) -> Option<HunterStateKind> {
        self.timer += dt;
        (self.timer >= hunter.stats.stagger_duration).then_some(HunterStateKind::Locomotion)
    }
}

struct DeadState;

impl State<HunterStateKind, HunterCore> for DeadState {
    fn enter(&mut self, hunter: &mut HunterCore) {
        hunter.invincible = false;
        info!("hunter {} fainted", hunter.id);
        hunter.publish(GameEvent::Died {
            entity: hunter.id,
            kind: ActorKind::Hunter,
            name: String::from("Hunter"),
        });
    }

    fn tick(&mut self, _hunter: &mut HunterCore, _dt: f32) -> Option<HunterStateKind> {
        None
    }
}

/// The player-controlled hunter.
pub struct Hunter {
    core: HunterCore,
    machine: StateMachine<HunterStateKind, HunterCore>,
}

impl Hunter {
    /// Creates a hunter in Locomotion with full vitals.
    pub fn new(
        id: EntityId,
        stats: HunterStats,
        weapon: EffectiveWeapon,
        body: Box<dyn Mover>,
        ctx: ActorContext,
    ) -> Self {
        let vitals = ActorVitals::new(stats.max_health, stats.max_stamina)
            .with_regen(stats.stamina_regen_rate, stats.stamina_regen_delay);
        let timeline = AttackTimeline::new(weapon.combo.clone());
        let mut core = HunterCore {
            id,
            stats,
            weapon,
            vitals,
            body,
            timeline,
            ctx,
            input: InputSnapshot::IDLE,
            invincible: false,
            dodge_cooldown: 0.0,
            carve_target: None,
            hits: Vec::new(),
            rng: fastrand::Rng::new(),
        };
        let mut machine = StateMachine::new()
            .with_state(HunterStateKind::Locomotion, LocomotionState)
            .with_state(HunterStateKind::Attack, AttackState)
            .with_state(HunterStateKind::Dodge, DodgeState::default())
            .with_state(HunterStateKind::Carve, CarveState::default())
            .with_state(HunterStateKind::Stagger, StaggerState::default())
            .with_state(HunterStateKind::Dead, DeadState);
        machine.change_state(HunterStateKind::Locomotion, &mut core);
        Self { core, machine }
    }

    /// Seeds the affinity roll reported on hits.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.core.rng = fastrand::Rng::with_seed(seed);
        self
    }

    /// Runs one frame of the state machine with `input`.
    pub fn tick(&mut self, dt: f32, input: InputSnapshot) {
        self.core.input = input;
        if !self.is_dead() {
            self.core.vitals.tick(dt);
            self.core.dodge_cooldown = (self.core.dodge_cooldown - dt).max(0.0);
        }
        self.machine.tick(&mut self.core, dt);
    }

    /// Applies stick locomotion for this frame. Does nothing outside Locomotion.
    pub fn integrate_movement(&mut self, dt: f32) {
        if !self.can_move() || !self.core.wants_to_move() {
            return;
        }
        let direction = self.core.input.world_direction();
        let speed = self.core.stats.move_speed * self.core.weapon.move_speed_multiplier;
        let max_degrees = self.core.stats.rotation_speed * dt;
        self.core.body.rotate_towards(direction, max_degrees);
        self.core.body.move_by(direction * speed * dt);
    }

    /// Forces a transition. Refused once the hunter is dead.
    pub fn force_state(&mut self, state: HunterStateKind) -> bool {
        if self.is_dead() {
            return false;
        }
        self.machine.change_state(state, &mut self.core)
    }

    /// Restores health. Returns the amount restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        self.core.vitals.heal(amount)
    }

    /// Takes the hits landed since the last call.
    pub fn drain_hits(&mut self) -> Vec<HitReport> {
        std::mem::take(&mut self.core.hits)
    }

    /// Free to move under stick control.
    #[must_use]
    pub fn can_move(&self) -> bool {
        self.machine.is_in(HunterStateKind::Locomotion)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> HunterStateKind {
        self.machine.current().unwrap_or(HunterStateKind::Locomotion)
    }

    /// Entity id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.core.id
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

    /// Health and stamina.
    #[must_use]
    pub fn vitals(&self) -> &ActorVitals {
        &self.core.vitals
    }

    /// Resolved tuning.
    #[must_use]
    pub fn stats(&self) -> &HunterStats {
        &self.core.stats
    }

    /// Equipped weapon.
    #[must_use]
    pub fn weapon(&self) -> &EffectiveWeapon {
        &self.core.weapon
    }

    /// Combo timeline.
    #[must_use]
    pub fn timeline(&self) -> &AttackTimeline {
        &self.core.timeline
    }

    /// Health is zero.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.core.vitals.is_dead()
    }

    /// Dodge i-frames are active.
    #[must_use]
    pub fn is_invincible(&self) -> bool {
        self.core.invincible
    }
}

impl Damageable for Hunter {
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
        let next = if change.killed {
            HunterStateKind::Dead
        } else {
            HunterStateKind::Stagger
        };
        self.machine.change_state(next, &mut self.core);
        true
    }
}

impl std::fmt::Debug for Hunter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hunter")
            .field("id", &self.core.id)
            .field("state", &self.machine.current())
            .field("health", &self.core.vitals.health())
            .field("stamina", &self.core.vitals.stamina())
            .finish_non_exhaustive()
    }
}
