//! Effective stats resolved once at actor construction.
//!
//! Authored definitions are optional. Each `resolve` fills every field, using
//! built-in values where nothing was authored, so actors never branch on
//! missing data while ticking.

use std::sync::Arc;

use crate::definitions::{
    AttackDefinition, HunterDefinition, LootEntry, MonsterAttackDefinition, MonsterDefinition,
    WeaponDefinition,
};

/// Weapon attack used when none is equipped.
pub const DEFAULT_WEAPON_ATTACK: i32 = 100;

/// Weapon stats an actor fights with.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveWeapon {
    /// Display name.
    pub name: String,
    /// Base attack power.
    pub attack: i32,
    /// Critical chance in [-100, 100].
    pub affinity: i32,
    /// Combo sequence; never empty.
    pub combo: Arc<[AttackDefinition]>,
    /// Locomotion multiplier while drawn.
    pub move_speed_multiplier: f32,
    /// Stamina needed to open a combo.
    pub attack_stamina_cost: f32,
}

impl EffectiveWeapon {
    /// Resolves an optional weapon, substituting the great-sword combo when
    /// the weapon is missing or has no attacks.
    #[must_use]
    pub fn resolve(weapon: Option<&WeaponDefinition>) -> Self {
        let fallback = WeaponDefinition::default();
        let weapon = weapon.unwrap_or(&fallback);
        let combo: Arc<[AttackDefinition]> = if weapon.combo.is_empty() {
            Arc::from(default_combo())
        } else {
            Arc::from(weapon.combo.clone())
        };
        Self {
            name: weapon.name.clone(),
            attack: weapon.attack,
            affinity: weapon.affinity.clamp(-100, 100),
            combo,
            move_speed_multiplier: weapon.move_speed_multiplier,
            attack_stamina_cost: weapon.attack_stamina_cost.max(0.0),
        }
    }
}

/// Built-in three-hit great-sword combo.
#[must_use]
pub fn default_combo() -> Vec<AttackDefinition> {
    vec![
        AttackDefinition::new("Vertical Slash", 48)
            .with_timing(0.4, 0.1, 0.5)
            .with_forward_movement(1.0)
            .with_combo(true, 0.5),
        AttackDefinition::new("Horizontal Slash", 26)
            .with_timing(0.3, 0.1, 0.4)
            .with_forward_movement(0.5)
            .with_combo(true, 0.4),
        AttackDefinition::new("Rising Slash", 38)
            .with_timing(0.4, 0.1, 0.6)
            .with_forward_movement(0.3)
            .with_combo(false, 0.0),
    ]
}

/// Hunter tuning with every field resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct HunterStats {
    /// Maximum health.
    pub max_health: i32,
    /// Maximum stamina.
    pub max_stamina: f32,
    /// Stamina per second.
    pub stamina_regen_rate: f32,
    /// Seconds before regen resumes.
    pub stamina_regen_delay: f32,
    /// Locomotion speed.
    pub move_speed: f32,
    /// Degrees per second.
    pub rotation_speed: f32,
    /// Dodge length.
    pub dodge_distance: f32,
    /// Dodge time.
    pub dodge_duration: f32,
    /// Invulnerable part of the dodge.
    pub dodge_iframe_duration: f32,
    /// Stamina per dodge.
    pub dodge_stamina_cost: f32,
    /// Seconds between dodges.
    pub dodge_cooldown: f32,
    /// Squared stick magnitude treated as idle.
    pub input_deadzone: f32,
    /// Hitstun length.
    pub stagger_duration: f32,
    /// How far to look for carvable remains.
    pub carve_search_radius: f32,
    /// Collider radius.
    pub body_radius: f32,
}

impl HunterStats {
    /// Resolves optional hunter tuning.
    #[must_use]
    pub fn resolve(definition: Option<&HunterDefinition>) -> Self {
        let fallback = HunterDefinition::default();
        let def = definition.unwrap_or(&fallback);
        Self {
            max_health: def.max_health,
            max_stamina: def.max_stamina,
            stamina_regen_rate: def.stamina_regen_rate,
            stamina_regen_delay: def.stamina_regen_delay,
            move_speed: def.move_speed,
            rotation_speed: def.rotation_speed,
            dodge_distance: def.dodge_distance,
            dodge_duration: def.dodge_duration.max(f32::EPSILON),
            dodge_iframe_duration: def.dodge_iframe_duration.min(def.dodge_duration),
            dodge_stamina_cost: def.dodge_stamina_cost,
            dodge_cooldown: def.dodge_cooldown,
            input_deadzone: def.input_deadzone,
            stagger_duration: 0.5,
            carve_search_radius: 3.0,
            body_radius: 0.5,
        }
    }

    /// Constant dodge speed.
    #[must_use]
    pub fn dodge_speed(&self) -> f32 {
        self.dodge_distance / self.dodge_duration
    }
}

impl Default for HunterStats {
    fn default() -> Self {
        Self::resolve(None)
    }
}

/// Monster tuning with every field resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct MonsterStats {
    /// Species name.
    pub name: String,
    /// Maximum health.
    pub max_health: i32,
    /// Roam speed.
    pub move_speed: f32,
    /// Chase speed.
    pub chase_speed: f32,
    /// Degrees per second.
    pub rotation_speed: f32,
    /// Sight radius.
    pub detection_range: f32,
    /// Distance that triggers an attack.
    pub attack_range: f32,
    /// Full field-of-view angle in degrees.
    pub field_of_view: f32,
    /// Accumulated damage that forces a flinch.
    pub flinch_threshold: f32,
    /// Flinch length.
    pub flinch_duration: f32,
    /// Idle time before roaming.
    pub idle_time: f32,
    /// Roam destination radius.
    pub roam_distance: f32,
    /// Distance at which a roam destination counts as reached.
    pub arrival_distance: f32,
    /// Chase gives up beyond `detection_range` times this.
    pub lose_target_factor: f32,
    /// Carves on the carcass.
    pub carve_count: u32,
    /// Seconds per carve.
    pub carve_time: f32,
    /// Distance from the carcass within which carving is possible.
    pub carve_range: f32,
    /// Attack pool; never empty.
    pub attacks: Arc<[MonsterAttackDefinition]>,
    /// Carving rewards.
    pub loot: Arc<[LootEntry]>,
    /// Collider radius.
    pub body_radius: f32,
}

impl MonsterStats {
    /// Resolves optional monster tuning.
    ///
    /// With no definition at all the monster uses the stand-in tuning below;
    /// with a definition but no attacks it bites.
    #[must_use]
    pub fn resolve(definition: Option<&MonsterDefinition>) -> Self {
        let Some(def) = definition else {
            return Self::with_attacks(Self::fallback(), Vec::new(), Vec::new());
        };
        let base = Self {
            name: def.name.clone(),
            max_health: def.max_health,
            move_speed: def.move_speed,
            chase_speed: def.chase_speed,
            rotation_speed: def.rotation_speed,
            detection_range: def.detection_range,
            attack_range: def.attack_range,
            field_of_view: def.field_of_view,
            flinch_threshold: def.flinch_threshold,
            idle_time: def.idle_time,
            roam_distance: def.roam_distance,
            carve_count: def.carve_count,
            ..Self::fallback()
        };
        Self::with_attacks(base, def.attacks.clone(), def.loot.clone())
    }

    fn with_attacks(
        mut base: Self,
        attacks: Vec<MonsterAttackDefinition>,
        loot: Vec<LootEntry>,
    ) -> Self {
        base.attacks = if attacks.is_empty() {
            Arc::from(vec![MonsterAttackDefinition::bite()])
        } else {
            Arc::from(attacks)
        };
        base.loot = Arc::from(loot);
        base
    }

    fn fallback() -> Self {
        Self {
            name: String::from("Test Monster"),
            max_health: 1000,
            move_speed: 4.0,
            chase_speed: 6.0,
            rotation_speed: 180.0,
            detection_range: 20.0,
            attack_range: 4.0,
            field_of_view: 120.0,
            flinch_threshold: 100.0,
            flinch_duration: 1.0,
            idle_time: 2.0,
            roam_distance: 10.0,
            arrival_distance: 1.0,
            lose_target_factor: 1.5,
            carve_count: 3,
            carve_time: 1.5,
            carve_range: 2.5,
            attacks: Arc::from(Vec::new()),
            loot: Arc::from(Vec::new()),
            body_radius: 1.5,
        }
    }

    /// Distance beyond which a chase is abandoned.
    #[must_use]
    pub fn lose_target_range(&self) -> f32 {
        self.detection_range * self.lose_target_factor
    }
}

impl Default for MonsterStats {
    fn default() -> Self {
        Self::resolve(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_weapon_uses_great_sword() {
        let weapon = EffectiveWeapon::resolve(None);
        assert_eq!(weapon.attack, DEFAULT_WEAPON_ATTACK);
        let mvs: Vec<i32> = weapon.combo.iter().map(|a| a.motion_value).collect();
        assert_eq!(mvs, vec![48, 26, 38]);
        assert!(!weapon.combo[2].can_combo);
    }

    #[test]
    fn test_weapon_without_combo_keeps_its_attack() {
        let authored = WeaponDefinition {
            name: "Bone Blade".into(),
            attack: 160,
            ..Default::default()
        };
        let weapon = EffectiveWeapon::resolve(Some(&authored));
        assert_eq!(weapon.attack, 160);
        assert_eq!(weapon.combo.len(), 3);
        assert_eq!(weapon.name, "Bone Blade");
    }

    #[test]
    fn test_monster_fallback_and_bite() {
        let stats = MonsterStats::resolve(None);
        assert_eq!(stats.max_health, 1000);
        assert_eq!(stats.chase_speed, 6.0);
        assert_eq!(stats.attacks.len(), 1);
        assert_eq!(stats.attacks[0].name, "Bite");
        assert_eq!(stats.attacks[0].damage, 15);
        assert_eq!(stats.lose_target_range(), 30.0);

        let authored = MonsterDefinition {
            name: "Wyvern".into(),
            ..Default::default()
        };
        let stats = MonsterStats::resolve(Some(&authored));
        assert_eq!(stats.name, "Wyvern");
        assert_eq!(stats.chase_speed, 5.0);
        assert_eq!(stats.attacks[0].name, "Bite");
    }

    #[test]
    fn test_hunter_defaults() {
        let stats = HunterStats::default();
        assert_eq!(stats.max_health, 100);
        assert_eq!(stats.dodge_stamina_cost, 25.0);
        assert!((stats.dodge_speed() - 7.5).abs() < 1e-4);
    }
}
