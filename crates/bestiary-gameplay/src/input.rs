//! Per-frame input snapshot.
//!
//! Input is polled, not pushed: the session hands the hunter one snapshot per
//! frame and states read it during their tick.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Input state for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSnapshot {
    /// Attack button went down this frame.
    pub attack_pressed: bool,
    /// Dodge button went down this frame.
    pub dodge_pressed: bool,
    /// Interact button is held.
    pub interact_held: bool,
    /// Movement stick, x = right, y = forward.
    pub move_vector: Vec2,
}

impl InputSnapshot {
    /// Snapshot with no buttons and a centred stick.
    pub const IDLE: Self = Self {
        attack_pressed: false,
        dodge_pressed: false,
        interact_held: false,
        move_vector: Vec2::ZERO,
    };

    /// Set the attack button.
    #[must_use]
    pub fn with_attack(mut self) -> Self {
        self.attack_pressed = true;
        self
    }

    /// Set the dodge button.
    #[must_use]
    pub fn with_dodge(mut self) -> Self {
        self.dodge_pressed = true;
        self
    }

    /// Hold interact.
    #[must_use]
    pub fn with_interact(mut self) -> Self {
        self.interact_held = true;
        self
    }

    /// Set the movement stick.
    #[must_use]
    pub fn with_move(mut self, move_vector: Vec2) -> Self {
        self.move_vector = move_vector;
        self
    }

    /// Whether the stick is pushed beyond `deadzone` (compared squared).
    #[must_use]
    pub fn has_move_input(&self, deadzone: f32) -> bool {
        self.move_vector.length_squared() > deadzone
    }

    /// Stick direction on the ground plane, clamped to unit length.
    #[must_use]
    pub fn world_direction(&self) -> Vec3 {
        let stick = self.move_vector.clamp_length_max(1.0);
        Vec3::new(stick.x, 0.0, stick.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadzone() {
        let nudge = InputSnapshot::IDLE.with_move(Vec2::new(0.2, 0.2));
        assert!(!nudge.has_move_input(0.1));
        let push = InputSnapshot::IDLE.with_move(Vec2::new(0.0, 0.8));
        assert!(push.has_move_input(0.1));
    }

    #[test]
    fn test_world_direction_is_clamped() {
        let input = InputSnapshot::IDLE.with_move(Vec2::new(3.0, 4.0));
        let dir = input.world_direction();
        assert!((dir.length() - 1.0).abs() < 1e-5);
        assert_eq!(dir.y, 0.0);
    }
}
