//! Damage calculation.
//!
//! This module provides:
//! - Raw damage from weapon attack and motion value
//! - Full damage with sharpness, critical and hit-zone modifiers
//! - Affinity-based critical rolls
//!
//! Every function is pure; randomness comes in through the caller's RNG.

/// Default multiplier applied to critical hits.
pub const DEFAULT_CRIT_MODIFIER: f32 = 1.25;

/// Lowest damage any landed hit can deal.
pub const MIN_DAMAGE: i32 = 1;

/// Hit-zone multiplier for an unmodified body part.
pub const NEUTRAL_HIT_ZONE: f32 = 1.0;

/// Modifiers applied on top of raw damage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageModifiers {
    /// Hit-zone multiplier of the struck part.
    pub hit_zone: f32,
    /// Weapon sharpness multiplier.
    pub sharpness: f32,
    /// Whether the hit is a critical.
    pub critical: bool,
    /// Multiplier applied when `critical` is set.
    pub crit_modifier: f32,
}

impl Default for DamageModifiers {
    fn default() -> Self {
        Self {
            hit_zone: NEUTRAL_HIT_ZONE,
            sharpness: 1.0,
            critical: false,
            crit_modifier: DEFAULT_CRIT_MODIFIER,
        }
    }
}

impl DamageModifiers {
    /// Set hit-zone multiplier.
    #[must_use]
    pub fn with_hit_zone(mut self, hit_zone: f32) -> Self {
        self.hit_zone = hit_zone;
        self
    }

    /// Set sharpness multiplier.
    #[must_use]
    pub fn with_sharpness(mut self, sharpness: f32) -> Self {
        self.sharpness = sharpness;
        self
    }

    /// Mark as critical.
    #[must_use]
    pub fn as_critical(mut self) -> Self {
        self.critical = true;
        self
    }
}

fn motion_scaled(attack: i32, motion_value: i32) -> f32 {
    attack as f32 * (motion_value as f32 / 100.0)
}

/// Rounds to the nearest integer, ties to even.
fn round_half_even(value: f32) -> f32 {
    if (value - value.trunc()).abs() == 0.5 {
        2.0 * (value / 2.0).round()
    } else {
        value.round()
    }
}

fn floor_damage(value: f32) -> i32 {
    (round_half_even(value) as i32).max(MIN_DAMAGE)
}

/// Raw damage: `max(1, round(attack * motion_value / 100 * hit_zone))`, ties to even.
#[must_use]
pub fn raw_damage(attack: i32, motion_value: i32, hit_zone: f32) -> i32 {
    floor_damage(motion_scaled(attack, motion_value) * hit_zone)
}

/// Raw damage against a neutral hit zone.
#[must_use]
pub fn raw_damage_neutral(attack: i32, motion_value: i32) -> i32 {
    raw_damage(attack, motion_value, NEUTRAL_HIT_ZONE)
}

/// Damage with every modifier applied.
#[must_use]
pub fn full_damage(attack: i32, motion_value: i32, modifiers: DamageModifiers) -> i32 {
    let mut damage = motion_scaled(attack, motion_value) * modifiers.sharpness;
    if modifiers.critical {
        damage *= modifiers.crit_modifier;
    }
    floor_damage(damage * modifiers.hit_zone)
}

/// Decides a critical from a roll already drawn in `[0, 100)`.
///
/// Positive affinity gives a critical chance; negative affinity gives a
/// weak-hit chance of the same magnitude, so both report `true` on success.
#[must_use]
pub fn is_critical_roll(affinity: i32, roll: u32) -> bool {
    match affinity {
        0 => false,
        a => (roll as i64) < (a as i64).abs(),
    }
}

/// Rolls for a critical hit based on affinity.
pub fn roll_critical(affinity: i32, rng: &mut fastrand::Rng) -> bool {
    if affinity == 0 {
        return false;
    }
    is_critical_roll(affinity, rng.u32(0..100))
}
