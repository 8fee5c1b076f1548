//! Authored definitions for weapons, actors, loot and quests.
//!
//! These are read-only at runtime. Field defaults match what the authoring
//! tools produce for a freshly created asset, so partially specified documents
//! still load.

use bestiary_common::{BestiaryError, BestiaryResult};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::spatial::Hitbox;

// ============================================================================
// Attacks and weapons
// ============================================================================

/// One attack in a weapon's combo sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackDefinition {
    /// Display name.
    pub name: String,
    /// Motion value in hundredths of weapon attack.
    pub motion_value: i32,
    /// Seconds before the hitbox becomes active.
    pub startup: f32,
    /// Seconds the hitbox stays active.
    pub active: f32,
    /// Seconds of recovery after the active phase.
    pub recovery: f32,
    /// Hitbox centre relative to the attacker (x = right, y = up, z = forward).
    pub hitbox_offset: Vec3,
    /// Full hitbox dimensions.
    pub hitbox_size: Vec3,
    /// Forward travel speed applied while the attack plays.
    pub forward_movement: f32,
    /// Whether recovery can chain into the next attack.
    pub can_combo: bool,
    /// Seconds into recovery during which a buffered input chains.
    pub combo_window: f32,
}

impl Default for AttackDefinition {
    fn default() -> Self {
        Self {
            name: String::from("Attack"),
            motion_value: 10,
            startup: 0.3,
            active: 0.1,
            recovery: 0.5,
            hitbox_offset: Vec3::new(0.0, 1.0, 1.5),
            hitbox_size: Vec3::new(1.0, 1.0, 2.0),
            forward_movement: 0.0,
            can_combo: true,
            combo_window: 0.3,
        }
    }
}

impl AttackDefinition {
    /// Create a new attack with the given name and motion value.
    #[must_use]
    pub fn new(name: impl Into<String>, motion_value: i32) -> Self {
        Self {
            name: name.into(),
            motion_value,
            ..Default::default()
        }
    }

    /// Set phase timing.
    #[must_use]
    pub fn with_timing(mut self, startup: f32, active: f32, recovery: f32) -> Self {
        self.startup = startup;
        self.active = active;
        self.recovery = recovery;
        self
    }

    /// Set combo behaviour.
    #[must_use]
    pub fn with_combo(mut self, can_combo: bool, window: f32) -> Self {
        self.can_combo = can_combo;
        self.combo_window = window;
        self
    }

    /// Set forward movement.
    #[must_use]
    pub fn with_forward_movement(mut self, speed: f32) -> Self {
        self.forward_movement = speed;
        self
    }

    /// Set hitbox placement.
    #[must_use]
    pub fn with_hitbox(mut self, offset: Vec3, size: Vec3) -> Self {
        self.hitbox_offset = offset;
        self.hitbox_size = size;
        self
    }

    /// Total duration: startup + active + recovery.
    #[must_use]
    pub fn total_duration(&self) -> f32 {
        self.startup + self.active + self.recovery
    }

    /// Hitbox volume of this attack.
    #[must_use]
    pub fn hitbox(&self) -> Hitbox {
        Hitbox::new(self.hitbox_offset, self.hitbox_size)
    }

    /// Check constraints.
    pub fn validate(&self) -> BestiaryResult<()> {
        require_name("attack", &self.name)?;
        require_non_negative(&self.name, "startup", self.startup)?;
        require_non_negative(&self.name, "active", self.active)?;
        require_non_negative(&self.name, "recovery", self.recovery)?;
        require_non_negative(&self.name, "combo_window", self.combo_window)?;
        if self.motion_value < 0 {
            return Err(invalid(format!("{}: negative motion value", self.name)));
        }
        Ok(())
    }
}

/// Weapon families.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponType {
    /// Slow, heavy two-handed blade.
    #[default]
    GreatSword,
}

/// A weapon with its combo sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponDefinition {
    /// Display name.
    pub name: String,
    /// Weapon family.
    pub weapon_type: WeaponType,
    /// Base attack power.
    pub attack: i32,
    /// Critical chance in [-100, 100].
    pub affinity: i32,
    /// Ordered combo sequence.
    pub combo: Vec<AttackDefinition>,
    /// Movement speed multiplier while the weapon is drawn.
    pub move_speed_multiplier: f32,
    /// Stamina needed to open a combo.
    pub attack_stamina_cost: f32,
}

impl Default for WeaponDefinition {
    fn default() -> Self {
        Self {
            name: String::from("Weapon"),
            weapon_type: WeaponType::GreatSword,
            attack: 100,
            affinity: 0,
            combo: Vec::new(),
            move_speed_multiplier: 0.7,
            attack_stamina_cost: 0.0,
        }
    }
}

impl WeaponDefinition {
    /// Check constraints.
    pub fn validate(&self) -> BestiaryResult<()> {
        require_name("weapon", &self.name)?;
        if !(-100..=100).contains(&self.affinity) {
            return Err(invalid(format!(
                "{}: affinity {} outside [-100, 100]",
                self.name, self.affinity
            )));
        }
        if self.attack < 0 {
            return Err(invalid(format!("{}: negative attack", self.name)));
        }
        require_non_negative(&self.name, "attack_stamina_cost", self.attack_stamina_cost)?;
        self.combo.iter().try_for_each(AttackDefinition::validate)
    }
}

// ============================================================================
// Hunter
// ============================================================================

/// Hunter tuning values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HunterDefinition {
    /// Maximum health.
    pub max_health: i32,
    /// Maximum stamina.
    pub max_stamina: f32,
    /// Stamina regained per second.
    pub stamina_regen_rate: f32,
    /// Seconds after spending stamina before regen resumes.
    pub stamina_regen_delay: f32,
    /// Locomotion speed.
    pub move_speed: f32,
    /// Turn speed in degrees per second.
    pub rotation_speed: f32,
    /// Distance covered by one dodge.
    pub dodge_distance: f32,
    /// Length of a dodge.
    pub dodge_duration: f32,
    /// Invulnerable part of a dodge, from its start.
    pub dodge_iframe_duration: f32,
    /// Stamina spent per dodge.
    pub dodge_stamina_cost: f32,
    /// Seconds before another dodge is allowed.
    pub dodge_cooldown: f32,
    /// Move input magnitude below which the stick counts as idle.
    pub input_deadzone: f32,
}

impl Default for HunterDefinition {
    fn default() -> Self {
        Self {
            max_health: 100,
            max_stamina: 100.0,
            stamina_regen_rate: 10.0,
            stamina_regen_delay: 1.0,
            move_speed: 5.0,
            rotation_speed: 720.0,
            dodge_distance: 3.0,
            dodge_duration: 0.4,
            dodge_iframe_duration: 0.2,
            dodge_stamina_cost: 25.0,
            dodge_cooldown: 0.1,
            input_deadzone: 0.1,
        }
    }
}

impl HunterDefinition {
    /// Check constraints.
    pub fn validate(&self) -> BestiaryResult<()> {
        if self.max_health <= 0 {
            return Err(invalid("hunter: max_health must be positive".into()));
        }
        require_non_negative("hunter", "max_stamina", self.max_stamina)?;
        require_non_negative("hunter", "dodge_iframe_duration", self.dodge_iframe_duration)?;
        require_positive("hunter", "dodge_duration", self.dodge_duration)
    }
}

// ============================================================================
// Monsters
// ============================================================================

/// One attack a monster can choose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonsterAttackDefinition {
    /// Display name.
    pub name: String,
    /// Flat damage per hit.
    pub damage: i32,
    /// Seconds before the hit lands.
    pub startup: f32,
    /// Seconds of active hitbox.
    pub active: f32,
    /// Seconds of recovery.
    pub recovery: f32,
    /// Hitbox centre relative to the monster.
    pub hitbox_offset: Vec3,
    /// Full hitbox dimensions.
    pub hitbox_size: Vec3,
    /// Relative selection weight.
    pub weight: f32,
    /// Minimum distance to the target for this attack.
    pub min_distance: f32,
    /// Maximum distance to the target for this attack.
    pub max_distance: f32,
}

impl Default for MonsterAttackDefinition {
    fn default() -> Self {
        Self {
            name: String::from("Attack"),
            damage: 20,
            startup: 0.5,
            active: 0.2,
            recovery: 1.0,
            hitbox_offset: Vec3::new(0.0, 1.0, 2.0),
            hitbox_size: Vec3::new(2.0, 2.0, 3.0),
            weight: 1.0,
            min_distance: 0.0,
            max_distance: 5.0,
        }
    }
}

impl MonsterAttackDefinition {
    /// Built-in attack used when a monster has none authored.
    #[must_use]
    pub fn bite() -> Self {
        Self {
            name: String::from("Bite"),
            damage: 15,
            startup: 0.5,
            active: 0.2,
            recovery: 0.8,
            hitbox_offset: Vec3::new(0.0, -1.5, 2.0),
            hitbox_size: Vec3::new(5.0, 5.0, 5.0),
            weight: 1.0,
            min_distance: 0.0,
            max_distance: 10.0,
        }
    }

    /// Total duration: startup + active + recovery.
    #[must_use]
    pub fn total_duration(&self) -> f32 {
        self.startup + self.active + self.recovery
    }

    /// Whether this attack may be used at `distance` from the target.
    #[must_use]
    pub fn in_range(&self, distance: f32) -> bool {
        distance >= self.min_distance && distance <= self.max_distance
    }

    /// Hitbox volume of this attack.
    #[must_use]
    pub fn hitbox(&self) -> Hitbox {
        Hitbox::new(self.hitbox_offset, self.hitbox_size)
    }

    /// Check constraints.
    pub fn validate(&self) -> BestiaryResult<()> {
        require_name("monster attack", &self.name)?;
        require_non_negative(&self.name, "startup", self.startup)?;
        require_non_negative(&self.name, "active", self.active)?;
        require_non_negative(&self.name, "recovery", self.recovery)?;
        require_non_negative(&self.name, "weight", self.weight)?;
        if self.min_distance > self.max_distance {
            return Err(invalid(format!(
                "{}: min_distance {} exceeds max_distance {}",
                self.name, self.min_distance, self.max_distance
            )));
        }
        Ok(())
    }
}

/// One row of a carving loot table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootEntry {
    /// Item granted.
    pub item_name: String,
    /// Quantity granted.
    pub quantity: u32,
    /// Relative drop weight.
    pub weight: f32,
}

impl Default for LootEntry {
    fn default() -> Self {
        Self {
            item_name: String::new(),
            quantity: 1,
            weight: 50.0,
        }
    }
}

impl LootEntry {
    /// Create a loot entry.
    #[must_use]
    pub fn new(item_name: impl Into<String>, quantity: u32, weight: f32) -> Self {
        Self {
            item_name: item_name.into(),
            quantity,
            weight,
        }
    }
}

/// Monster tuning values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonsterDefinition {
    /// Species name, matched by quest targets.
    pub name: String,
    /// Maximum health.
    pub max_health: i32,
    /// Roaming speed.
    pub move_speed: f32,
    /// Chasing speed.
    pub chase_speed: f32,
    /// Turn speed in degrees per second.
    pub rotation_speed: f32,
    /// Radius within which the target can be seen.
    pub detection_range: f32,
    /// Distance at which the monster stops chasing and attacks.
    pub attack_range: f32,
    /// Full field-of-view angle in degrees.
    pub field_of_view: f32,
    /// Accumulated damage that forces a flinch.
    pub flinch_threshold: f32,
    /// Seconds spent idle before roaming.
    pub idle_time: f32,
    /// Radius of random roam destinations.
    pub roam_distance: f32,
    /// Carves available after death.
    pub carve_count: u32,
    /// Attack pool.
    pub attacks: Vec<MonsterAttackDefinition>,
    /// Carving rewards.
    pub loot: Vec<LootEntry>,
}

impl Default for MonsterDefinition {
    fn default() -> Self {
        Self {
            name: String::from("Monster"),
            max_health: 1000,
            move_speed: 3.0,
            chase_speed: 5.0,
            rotation_speed: 120.0,
            detection_range: 20.0,
            attack_range: 4.0,
            field_of_view: 120.0,
            flinch_threshold: 100.0,
            idle_time: 3.0,
            roam_distance: 10.0,
            carve_count: 3,
            attacks: Vec::new(),
            loot: Vec::new(),
        }
    }
}

impl MonsterDefinition {
    /// Check constraints.
    pub fn validate(&self) -> BestiaryResult<()> {
        require_name("monster", &self.name)?;
        if self.max_health <= 0 {
            return Err(invalid(format!("{}: max_health must be positive", self.name)));
        }
        require_non_negative(&self.name, "detection_range", self.detection_range)?;
        require_non_negative(&self.name, "attack_range", self.attack_range)?;
        require_non_negative(&self.name, "idle_time", self.idle_time)?;
        for entry in &self.loot {
            require_non_negative(&self.name, "loot weight", entry.weight)?;
        }
        self.attacks
            .iter()
            .try_for_each(MonsterAttackDefinition::validate)
    }
}

// ============================================================================
// Quests
// ============================================================================

/// What a quest asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveType {
    /// Slay the target monster(s).
    #[default]
    Hunt,
    /// Capture the target alive.
    Capture,
    /// Deliver gathered items.
    Gather,
    /// Thin out a group of small monsters.
    Slay,
}

/// Quest parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestDefinition {
    /// Quest title.
    pub name: String,
    /// Flavour text.
    pub description: String,
    /// Objective kind.
    pub objective: ObjectiveType,
    /// Monster species to track; empty tracks every monster.
    pub target_name: String,
    /// Kills required.
    pub target_count: u32,
    /// Seconds before the quest fails.
    pub time_limit: f32,
    /// Faints allowed before the quest fails.
    pub max_deaths: u32,
    /// Reward on success.
    pub zenny: u32,
}

impl Default for QuestDefinition {
    fn default() -> Self {
        Self {
            name: String::from("Quest"),
            description: String::new(),
            objective: ObjectiveType::Hunt,
            target_name: String::new(),
            target_count: 1,
            time_limit: 3000.0,
            max_deaths: 3,
            zenny: 1000,
        }
    }
}

impl QuestDefinition {
    /// Create a hunt quest for `target_count` monsters named `target_name`.
    #[must_use]
    pub fn hunt(
        name: impl Into<String>,
        target_name: impl Into<String>,
        target_count: u32,
    ) -> Self {
        Self {
            name: name.into(),
            target_name: target_name.into(),
            target_count,
            ..Default::default()
        }
    }

    /// Set the time and faint budgets.
    #[must_use]
    pub fn with_limits(mut self, time_limit: f32, max_deaths: u32) -> Self {
        self.time_limit = time_limit;
        self.max_deaths = max_deaths;
        self
    }

    /// Whether a monster named `monster_name` counts toward this quest.
    #[must_use]
    pub fn targets(&self, monster_name: &str) -> bool {
        let target = self.target_name.trim();
        target.is_empty() || target == monster_name
    }

    /// Check constraints.
    pub fn validate(&self) -> BestiaryResult<()> {
        require_name("quest", &self.name)?;
        if self.target_count == 0 {
            return Err(invalid(format!("{}: target_count must be at least 1", self.name)));
        }
        require_positive(&self.name, "time_limit", self.time_limit)
    }
}

// ============================================================================
// Validation helpers
// ============================================================================

fn invalid(message: String) -> BestiaryError {
    BestiaryError::InvalidDefinition(message)
}

fn require_name(kind: &str, name: &str) -> BestiaryResult<()> {
    if name.trim().is_empty() {
        Err(invalid(format!("{kind} has an empty name")))
    } else {
        Ok(())
    }
}

fn require_non_negative(owner: &str, field: &str, value: f32) -> BestiaryResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{owner}: {field} must be finite and not negative (got {value})")))
    }
}

fn require_positive(owner: &str, field: &str, value: f32) -> BestiaryResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{owner}: {field} must be finite and positive (got {value})")))
    }
}
