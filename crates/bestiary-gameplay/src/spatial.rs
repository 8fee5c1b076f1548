//! Spatial overlap queries for hitboxes.
//!
//! This module provides:
//! - [`Hitbox`]: an attack volume placed relative to the attacker's facing
//! - [`SpatialQuery`]: the oriented box query actors run on hit frames
//! - [`ColliderSet`]: a sphere-collider implementation rebuilt once per frame

use bestiary_common::EntityId;
use glam::{Quat, Vec3};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Oriented box volume relative to an actor.
///
/// Offsets use the actor's local axes: x = right, y = up, z = forward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hitbox {
    /// Centre offset in local space.
    pub offset: Vec3,
    /// Full dimensions.
    pub size: Vec3,
}

impl Hitbox {
    /// Creates a hitbox.
    #[must_use]
    pub const fn new(offset: Vec3, size: Vec3) -> Self {
        Self { offset, size }
    }

    /// World-space centre for an actor at `position` facing `rotation`.
    #[must_use]
    pub fn center(&self, position: Vec3, rotation: Quat) -> Vec3 {
        position + rotation * self.offset
    }

    /// Half of the box dimensions.
    #[must_use]
    pub fn half_extents(&self) -> Vec3 {
        self.size * 0.5
    }
}

/// Overlap query consumed by attacking actors.
pub trait SpatialQuery: Send + Sync {
    /// Returns the roots of every damageable target overlapping the box,
    /// excluding `exclude` and anything it owns.
    fn query_box(
        &self,
        center: Vec3,
        half_extents: Vec3,
        orientation: Quat,
        exclude: EntityId,
    ) -> Vec<EntityId>;
}

/// A sphere collider attached to an actor hierarchy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    /// Root entity of the hierarchy this collider belongs to.
    pub root: EntityId,
    /// World-space centre.
    pub center: Vec3,
    /// Sphere radius.
    pub radius: f32,
}

impl Collider {
    /// Whether this sphere overlaps the oriented box.
    #[must_use]
    pub fn overlaps_box(&self, center: Vec3, half_extents: Vec3, orientation: Quat) -> bool {
        let local = orientation.inverse() * (self.center - center);
        let closest = local.clamp(-half_extents, half_extents);
        local.distance_squared(closest) <= self.radius * self.radius
    }
}

/// Per-frame snapshot of every damageable collider.
#[derive(Debug, Default)]
pub struct ColliderSet {
    colliders: RwLock<Vec<Collider>>,
}

impl ColliderSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a collider.
    pub fn insert(&self, root: EntityId, center: Vec3, radius: f32) {
        self.colliders.write().push(Collider {
            root,
            center,
            radius,
        });
    }

    /// Removes every collider.
    pub fn clear(&self) {
        self.colliders.write().clear();
    }

    /// Replaces the contents with `colliders`.
    pub fn rebuild(&self, colliders: impl IntoIterator<Item = Collider>) {
        let mut guard = self.colliders.write();
        guard.clear();
        guard.extend(colliders);
    }

    /// Number of colliders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.colliders.read().len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colliders.read().is_empty()
    }
}

impl SpatialQuery for ColliderSet {
    fn query_box(
        &self,
        center: Vec3,
        half_extents: Vec3,
        orientation: Quat,
        exclude: EntityId,
    ) -> Vec<EntityId> {
        let mut hits: Vec<EntityId> = Vec::new();
        for collider in self.colliders.read().iter() {
            if collider.root == exclude || hits.contains(&collider.root) {
                continue;
            }
            if collider.overlaps_box(center, half_extents, orientation) {
                hits.push(collider.root);
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_hitbox_center_follows_facing() {
        let hitbox = Hitbox::new(Vec3::new(0.0, 1.0, 1.5), Vec3::new(1.0, 1.0, 2.0));
        let center = hitbox.center(Vec3::ZERO, Quat::IDENTITY);
        assert!(center.abs_diff_eq(Vec3::new(0.0, 1.0, 1.5), 1e-5));

        // Facing +X: forward offset lands on the x axis.
        let turned = hitbox.center(Vec3::ZERO, Quat::from_rotation_y(FRAC_PI_2));
        assert!(turned.abs_diff_eq(Vec3::new(1.5, 1.0, 0.0), 1e-5));
        assert_eq!(hitbox.half_extents(), Vec3::new(0.5, 0.5, 1.0));
    }

    #[test]
    fn test_query_excludes_attacker() {
        let attacker = EntityId::new();
        let target = EntityId::new();
        let set = ColliderSet::new();
        set.insert(attacker, Vec3::ZERO, 0.5);
        set.insert(target, Vec3::new(0.0, 0.0, 2.0), 1.0);

        let center = Vec3::new(0.0, 0.0, 1.5);
        let hits = set.query_box(center, Vec3::splat(1.0), Quat::IDENTITY, attacker);
        assert_eq!(hits, vec![target]);
    }

    #[test]
    fn test_query_reports_each_root_once() {
        let target = EntityId::new();
        let set = ColliderSet::new();
        set.insert(target, Vec3::new(0.0, 0.0, 1.0), 0.5);
        set.insert(target, Vec3::new(0.3, 0.0, 1.0), 0.5);

        let center = Vec3::new(0.0, 0.0, 1.0);
        let hits = set.query_box(center, Vec3::ONE, Quat::IDENTITY, EntityId::NULL);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_query_respects_orientation() {
        let target = EntityId::new();
        let set = ColliderSet::new();
        set.insert(target, Vec3::new(2.5, 0.0, 0.0), 0.1);

        // Long thin box along local z.
        let half = Vec3::new(0.2, 0.2, 3.0);
        let along_z = set.query_box(Vec3::ZERO, half, Quat::IDENTITY, EntityId::NULL);
        assert!(along_z.is_empty());

        let turned = Quat::from_rotation_y(FRAC_PI_2);
        let along_x = set.query_box(Vec3::ZERO, half, turned, EntityId::NULL);
        assert_eq!(along_x, vec![target]);
    }

    #[test]
    fn test_rebuild_replaces_contents() {
        let set = ColliderSet::new();
        set.insert(EntityId::new(), Vec3::ZERO, 1.0);
        set.rebuild(Vec::new());
        assert!(set.is_empty());
    }
}
