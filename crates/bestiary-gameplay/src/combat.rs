//! Shared combat plumbing between actors and the session.
//!
//! This module provides:
//! - [`Damageable`]: the damage-intake capability of every actor
//! - [`HitReport`]: a landed hit waiting for delivery
//! - [`ActorContext`]: collaborators injected into actors at construction
//! - [`TargetInfo`]: what a monster senses about its quarry each frame

use std::sync::Arc;

use bestiary_common::EntityId;
use glam::Vec3;

use crate::carving::CarvingRegistry;
use crate::events::EventPublisher;
use crate::spatial::SpatialQuery;

/// Anything that can take damage.
pub trait Damageable {
    /// Applies `amount` damage from a source at `source_position`.
    ///
    /// Returns `false` if the hit was ignored (invincible or already dead).
    fn take_damage(&mut self, amount: i32, source_position: Vec3) -> bool;
}

/// A hit found by an attacker's overlap query.
///
/// Attackers cannot reach their targets directly, so hits are queued and
/// delivered by the session in the same frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitReport {
    /// Attacking actor.
    pub attacker: EntityId,
    /// Struck actor.
    pub target: EntityId,
    /// Damage to apply.
    pub damage: i32,
    /// Attacker position when the hit landed.
    pub source_position: Vec3,
}

/// Position and liveness of a monster's quarry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetInfo {
    /// Target entity.
    pub id: EntityId,
    /// World position.
    pub position: Vec3,
    /// Target is alive.
    pub alive: bool,
}

/// Collaborators every actor needs.
#[derive(Clone)]
pub struct ActorContext {
    /// Overlap query for hit passes.
    pub spatial: Arc<dyn SpatialQuery>,
    /// Where carcasses go and where hunters look for them.
    pub carving: CarvingRegistry,
    /// Event sink.
    pub events: EventPublisher,
}

impl ActorContext {
    /// Bundles the collaborators.
    #[must_use]
    pub fn new(
        spatial: Arc<dyn SpatialQuery>,
        carving: CarvingRegistry,
        events: EventPublisher,
    ) -> Self {
        Self {
            spatial,
            carving,
            events,
        }
    }
}

impl std::fmt::Debug for ActorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorContext")
            .field("carving_nodes", &self.carving.len())
            .finish_non_exhaustive()
    }
}
