//! Movement and rotation primitive.
//!
//! Actors never integrate physics themselves; they ask a [`Mover`] to translate
//! or turn them. [`KinematicBody`] is the collision-free implementation used by
//! the headless session.

use glam::{Quat, Vec3};

/// Rotations smaller than this are treated as already facing the target.
const DIRECTION_EPSILON: f32 = 1e-6;

/// Movement primitive consumed by actor states.
pub trait Mover: Send {
    /// Current world position.
    fn position(&self) -> Vec3;

    /// Current world rotation.
    fn rotation(&self) -> Quat;

    /// Translates by `displacement`.
    fn move_by(&mut self, displacement: Vec3);

    /// Turns towards `direction` by at most `max_degrees`.
    fn rotate_towards(&mut self, direction: Vec3, max_degrees: f32);

    /// Places the body at `position` without moving through the world.
    fn teleport(&mut self, position: Vec3);

    /// Unit forward vector.
    fn forward(&self) -> Vec3 {
        self.rotation() * Vec3::Z
    }
}

/// Returns the yaw rotation that faces `direction` on the ground plane.
#[must_use]
pub fn look_rotation(direction: Vec3) -> Option<Quat> {
    let flat = Vec3::new(direction.x, 0.0, direction.z);
    if flat.length_squared() < DIRECTION_EPSILON {
        return None;
    }
    Some(Quat::from_rotation_y(flat.x.atan2(flat.z)))
}

/// Yaw-only kinematic body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicBody {
    position: Vec3,
    rotation: Quat,
}

impl Default for KinematicBody {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

impl KinematicBody {
    /// Creates a body at `position` facing +Z.
    #[must_use]
    pub const fn new(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Sets the initial facing.
    #[must_use]
    pub fn facing(mut self, direction: Vec3) -> Self {
        if let Some(rotation) = look_rotation(direction) {
            self.rotation = rotation;
        }
        self
    }
}

impl Mover for KinematicBody {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn rotation(&self) -> Quat {
        self.rotation
    }

    fn move_by(&mut self, displacement: Vec3) {
        self.position += displacement;
    }

    fn rotate_towards(&mut self, direction: Vec3, max_degrees: f32) {
        let Some(target) = look_rotation(direction) else {
            return;
        };
        let angle = self.rotation.angle_between(target);
        let max_radians = max_degrees.max(0.0).to_radians();
        if angle <= max_radians || angle < DIRECTION_EPSILON {
            self.rotation = target;
        } else {
            self.rotation = self.rotation.slerp(target, max_radians / angle).normalize();
        }
    }

    fn teleport(&mut self, position: Vec3) {
        self.position = position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_look_rotation_faces_direction() {
        let rotation = look_rotation(Vec3::new(1.0, 5.0, 0.0)).expect("non-zero direction");
        assert!((rotation * Vec3::Z).abs_diff_eq(Vec3::X, 1e-5));
        assert!(look_rotation(Vec3::Y).is_none());
    }

    #[test]
    fn test_rotate_towards_is_rate_limited() {
        let mut body = KinematicBody::new(Vec3::ZERO);
        body.rotate_towards(Vec3::X, 45.0);
        let forward = body.forward();
        let degrees = forward.angle_between(Vec3::Z).to_degrees();
        assert!((degrees - 45.0).abs() < 0.1, "turned {degrees}");

        body.rotate_towards(Vec3::X, 90.0);
        assert!(body.forward().abs_diff_eq(Vec3::X, 1e-4));
    }

    #[test]
    fn test_move_and_teleport() {
        let mut body = KinematicBody::new(Vec3::ZERO).facing(Vec3::NEG_Z);
        body.move_by(body.forward() * 2.0);
        assert!(body.position().abs_diff_eq(Vec3::new(0.0, 0.0, -2.0), 1e-5));

        body.teleport(Vec3::ONE);
        assert_eq!(body.position(), Vec3::ONE);
    }
}
