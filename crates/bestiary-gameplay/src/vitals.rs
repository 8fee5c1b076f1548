//! Health and stamina bookkeeping.

use serde::{Deserialize, Serialize};

/// Result of applying damage to [`ActorVitals`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthChange {
    /// Health actually removed.
    pub dealt: i32,
    /// Health left afterwards.
    pub remaining: i32,
    /// This hit took health from positive to zero.
    pub killed: bool,
}

/// Health and stamina of one actor.
///
/// Health stays in `[0, max_health]` and stamina in `[0, max_stamina]`.
/// Zero health is terminal: heals are refused afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorVitals {
    max_health: i32,
    current_health: i32,
    max_stamina: f32,
    current_stamina: f32,
    stamina_regen_rate: f32,
    stamina_regen_delay: f32,
    regen_cooldown: f32,
}

impl ActorVitals {
    /// Full health and stamina.
    #[must_use]
    pub fn new(max_health: i32, max_stamina: f32) -> Self {
        let max_health = max_health.max(1);
        let max_stamina = max_stamina.max(0.0);
        Self {
            max_health,
            current_health: max_health,
            max_stamina,
            current_stamina: max_stamina,
            stamina_regen_rate: 0.0,
            stamina_regen_delay: 0.0,
            regen_cooldown: 0.0,
        }
    }

    /// Set stamina regeneration.
    #[must_use]
    pub fn with_regen(mut self, rate: f32, delay: f32) -> Self {
        self.stamina_regen_rate = rate.max(0.0);
        self.stamina_regen_delay = delay.max(0.0);
        self
    }

    /// Removes up to `amount` health. Negative amounts are treated as zero.
    pub fn apply_damage(&mut self, amount: i32) -> HealthChange {
        let was_alive = self.is_alive();
        let before = self.current_health;
        self.current_health = (self.current_health - amount.max(0)).max(0);
        HealthChange {
            dealt: before - self.current_health,
            remaining: self.current_health,
            killed: was_alive && self.current_health == 0,
        }
    }

    /// Restores up to `amount` health. Returns the amount restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if self.is_dead() {
            return 0;
        }
        let before = self.current_health;
        self.current_health = (self.current_health + amount.max(0)).min(self.max_health);
        self.current_health - before
    }

    /// Whether at least `amount` stamina is available.
    #[must_use]
    pub fn has_stamina(&self, amount: f32) -> bool {
        self.current_stamina >= amount
    }

    /// Spends stamina, clamping at zero, and restarts the regen delay.
    pub fn consume_stamina(&mut self, amount: f32) {
        if amount <= 0.0 {
            return;
        }
        self.current_stamina = (self.current_stamina - amount).max(0.0);
        self.regen_cooldown = self.stamina_regen_delay;
    }

    /// Advances stamina regeneration.
    pub fn tick(&mut self, dt: f32) {
        if self.regen_cooldown > 0.0 {
            self.regen_cooldown = (self.regen_cooldown - dt).max(0.0);
            return;
        }
        self.current_stamina =
            (self.current_stamina + self.stamina_regen_rate * dt).min(self.max_stamina);
    }

    /// Current health.
    #[must_use]
    pub fn health(&self) -> i32 {
        self.current_health
    }

    /// Maximum health.
    #[must_use]
    pub fn max_health(&self) -> i32 {
        self.max_health
    }

    /// Current stamina.
    #[must_use]
    pub fn stamina(&self) -> f32 {
        self.current_stamina
    }

    /// Maximum stamina.
    #[must_use]
    pub fn max_stamina(&self) -> f32 {
        self.max_stamina
    }

    /// Health as a fraction of max.
    #[must_use]
    pub fn health_fraction(&self) -> f32 {
        self.current_health as f32 / self.max_health as f32
    }

    /// Stamina as a fraction of max (zero when the actor has no stamina pool).
    #[must_use]
    pub fn stamina_fraction(&self) -> f32 {
        if self.max_stamina <= 0.0 {
            0.0
        } else {
            self.current_stamina / self.max_stamina
        }
    }

    /// Health above zero.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.current_health > 0
    }

    /// Health at zero.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        !self.is_alive()
    }
}
