//! Carving: timed harvesting of a defeated monster's remains.
//!
//! This module provides:
//! - [`CarvingNode`]: a finite number of timed carves, each rolling one loot entry
//! - [`pick_weighted`]: cumulative-weight selection used by the loot roll
//! - [`CarvingRegistry`]: the session-owned set of live nodes, shared with actors
//!
//! Proximity gating belongs to the caller; a node only tracks charges and progress.

use std::sync::Arc;

use bestiary_common::{EntityId, NodeId};
use glam::Vec3;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::definitions::LootEntry;

/// Seconds per carve.
pub const DEFAULT_CARVE_TIME: f32 = 1.5;

/// Distance within which a hunter can carve.
pub const DEFAULT_INTERACTION_RANGE: f32 = 2.5;

/// Carves per node.
pub const DEFAULT_CARVE_CHARGES: u32 = 3;

/// Outcome of a carving tick.
#[derive(Debug, Clone, PartialEq)]
pub enum CarveEvent {
    /// The carve produced an item.
    ItemObtained {
        /// Item name.
        item: String,
        /// Quantity.
        quantity: u32,
    },
    /// One carve finished.
    CarveComplete {
        /// Carves left.
        remaining: u32,
    },
    /// The node has no carves left.
    AllCarvesComplete,
}

/// Picks one entry by cumulative weight over a uniform draw in `[0, total)`.
///
/// Entries with non-positive weight are never picked. Returns `None` when the
/// table is empty or carries no weight.
pub fn pick_weighted<'a>(loot: &'a [LootEntry], rng: &mut fastrand::Rng) -> Option<&'a LootEntry> {
    let total: f32 = loot.iter().map(|entry| entry.weight.max(0.0)).sum();
    if total <= 0.0 {
        return None;
    }
    let roll = rng.f32() * total;
    let mut cumulative = 0.0;
    for entry in loot.iter().filter(|entry| entry.weight > 0.0) {
        cumulative += entry.weight;
        if roll < cumulative {
            return Some(entry);
        }
    }
    // Rounding can leave the roll just above the final sum.
    loot.iter().rev().find(|entry| entry.weight > 0.0)
}

/// Harvestable remains.
#[derive(Debug)]
pub struct CarvingNode {
    id: NodeId,
    owner: EntityId,
    position: Vec3,
    max_charges: u32,
    remaining_charges: u32,
    loot: Arc<[LootEntry]>,
    carve_time: f32,
    interaction_range: f32,
    in_progress: bool,
    progress: f32,
    rng: fastrand::Rng,
}

impl CarvingNode {
    /// Creates a node with `charges` carves over `loot`.
    #[must_use]
    pub fn new(owner: EntityId, position: Vec3, charges: u32, loot: Arc<[LootEntry]>) -> Self {
        Self {
            id: NodeId::new(),
            owner,
            position,
            max_charges: charges,
            remaining_charges: charges,
            loot,
            carve_time: DEFAULT_CARVE_TIME,
            interaction_range: DEFAULT_INTERACTION_RANGE,
            in_progress: false,
            progress: 0.0,
            rng: fastrand::Rng::new(),
        }
    }

    /// Seeds the loot roll.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    /// Sets seconds per carve.
    #[must_use]
    pub fn with_carve_time(mut self, carve_time: f32) -> Self {
        self.carve_time = carve_time.max(0.0);
        self
    }

    /// Sets the interaction range.
    #[must_use]
    pub fn with_interaction_range(mut self, range: f32) -> Self {
        self.interaction_range = range.max(0.0);
        self
    }

    /// A charge is left and no carve is running.
    #[must_use]
    pub fn can_harvest(&self) -> bool {
        self.remaining_charges > 0 && !self.in_progress
    }

    /// Begins a carve. Returns `false` and changes nothing if not harvestable.
    pub fn start(&mut self) -> bool {
        if !self.can_harvest() {
            return false;
        }
        self.in_progress = true;
        self.progress = 0.0;
        true
    }

    /// Aborts the running carve without spending a charge.
    /// Returns whether a carve was running.
    pub fn cancel(&mut self) -> bool {
        let was_running = self.in_progress;
        self.in_progress = false;
        self.progress = 0.0;
        was_running
    }

    /// Advances the running carve.
    pub fn tick(&mut self, dt: f32) -> Vec<CarveEvent> {
        let mut events = Vec::new();
        if !self.in_progress {
            return events;
        }
        self.progress += dt;
        if self.progress < self.carve_time {
            return events;
        }

        self.in_progress = false;
        self.progress = 0.0;
        self.remaining_charges = self.remaining_charges.saturating_sub(1);

        if let Some(entry) = pick_weighted(&self.loot, &mut self.rng) {
            events.push(CarveEvent::ItemObtained {
                item: entry.item_name.clone(),
                quantity: entry.quantity,
            });
        }
        events.push(CarveEvent::CarveComplete {
            remaining: self.remaining_charges,
        });
        if self.remaining_charges == 0 {
            events.push(CarveEvent::AllCarvesComplete);
        }
        debug!(
            "carve on node {} complete, {} left",
            self.id.raw(),
            self.remaining_charges
        );
        events
    }

    /// Whether `position` is close enough to carve.
    #[must_use]
    pub fn in_range(&self, position: Vec3) -> bool {
        self.position.distance(position) <= self.interaction_range
    }

    /// Node id.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Actor whose death spawned this node.
    #[must_use]
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// World position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Carves left.
    #[must_use]
    pub fn remaining_charges(&self) -> u32 {
        self.remaining_charges
    }

    /// Carves at spawn.
    #[must_use]
    pub fn max_charges(&self) -> u32 {
        self.max_charges
    }

    /// A carve is running.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.in_progress
    }

    /// Progress of the running carve in `[0, 1]`.
    #[must_use]
    pub fn progress_fraction(&self) -> f32 {
        if self.carve_time <= 0.0 {
            return 0.0;
        }
        (self.progress / self.carve_time).min(1.0)
    }

    /// No carves left.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.remaining_charges == 0
    }
}

/// A node shared between the registry and the hunter carving it.
pub type SharedCarvingNode = Arc<Mutex<CarvingNode>>;

/// Live carving nodes of a session.
#[derive(Debug, Clone, Default)]
pub struct CarvingRegistry {
    nodes: Arc<RwLock<Vec<SharedCarvingNode>>>,
}

impl CarvingRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and returns its shared handle.
    pub fn spawn(&self, node: CarvingNode) -> SharedCarvingNode {
        let shared = Arc::new(Mutex::new(node));
        self.nodes.write().push(Arc::clone(&shared));
        shared
    }

    /// Nearest node within `radius` of `position` that can start a carve
    /// from there.
    #[must_use]
    pub fn nearest_harvestable(&self, position: Vec3, radius: f32) -> Option<SharedCarvingNode> {
        let nodes = self.nodes.read();
        let mut best: Option<(f32, &SharedCarvingNode)> = None;
        for shared in nodes.iter() {
            let node = shared.lock();
            let distance = node.position().distance(position);
            if distance > radius || !node.can_harvest() || !node.in_range(position) {
                continue;
            }
            if best.map_or(true, |(closest, _)| distance < closest) {
                best = Some((distance, shared));
            }
        }
        best.map(|(_, shared)| Arc::clone(shared))
    }

    /// Drops depleted nodes.
    pub fn prune_depleted(&self) -> usize {
        let mut nodes = self.nodes.write();
        let before = nodes.len();
        nodes.retain(|shared| !shared.lock().is_depleted());
        before - nodes.len()
    }

    /// Handles to every live node.
    #[must_use]
    pub fn nodes(&self) -> Vec<SharedCarvingNode> {
        self.nodes.read().clone()
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    /// No live nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scale_and_claw() -> Arc<[LootEntry]> {
        Arc::from(vec![
            LootEntry::new("Scale", 1, 70.0),
            LootEntry::new("Claw", 1, 30.0),
        ])
    }

    fn carve_once(node: &mut CarvingNode) -> Vec<CarveEvent> {
        assert!(node.start());
        node.tick(DEFAULT_CARVE_TIME)
    }

    #[test]
    fn test_three_carves_deplete_node() {
        let mut node =
            CarvingNode::new(EntityId::new(), Vec3::ZERO, 3, scale_and_claw()).with_seed(1);

        let first = carve_once(&mut node);
        assert!(matches!(first[0], CarveEvent::ItemObtained { .. }));
        assert_eq!(first[1], CarveEvent::CarveComplete { remaining: 2 });
        assert_eq!(first.len(), 2);

        carve_once(&mut node);
        let last = carve_once(&mut node);
        assert_eq!(last.last(), Some(&CarveEvent::AllCarvesComplete));
        assert!(node.is_depleted());
        assert!(!node.start());
    }

    #[test]
    fn test_loot_distribution_matches_weights() {
        let loot = scale_and_claw();
        let mut rng = fastrand::Rng::with_seed(1234);
        let mut scales = 0;
        for _ in 0..1_000 {
            let entry = pick_weighted(&loot, &mut rng).expect("weighted table");
            if entry.item_name == "Scale" {
                scales += 1;
            }
        }
        assert!((630..=770).contains(&scales), "scales = {scales}");
    }

    #[test]
    fn test_empty_or_weightless_table_grants_nothing() {
        let mut rng = fastrand::Rng::with_seed(9);
        assert!(pick_weighted(&[], &mut rng).is_none());
        let zero = [LootEntry::new("Dust", 1, 0.0)];
        assert!(pick_weighted(&zero, &mut rng).is_none());

        let mut node = CarvingNode::new(EntityId::new(), Vec3::ZERO, 1, Arc::from(Vec::new()));
        let events = carve_once(&mut node);
        assert_eq!(
            events,
            vec![
                CarveEvent::CarveComplete { remaining: 0 },
                CarveEvent::AllCarvesComplete
            ]
        );
    }

    #[test]
    fn test_zero_weight_entry_never_picked() {
        let loot = [LootEntry::new("Gem", 1, 0.0), LootEntry::new("Bone", 2, 5.0)];
        let mut rng = fastrand::Rng::with_seed(3);
        for _ in 0..200 {
            let entry = pick_weighted(&loot, &mut rng).expect("bone has weight");
            assert_eq!(entry.item_name, "Bone");
        }
    }

    #[test]
    fn test_cancel_keeps_charge() {
        let mut node = CarvingNode::new(EntityId::new(), Vec3::ZERO, 3, scale_and_claw());
        assert!(node.start());
        assert!(!node.start());
        assert!(node.tick(1.0).is_empty());
        assert!(node.cancel());
        assert_eq!(node.remaining_charges(), 3);
        assert!(!node.cancel());
        assert!(node.can_harvest());
    }

    #[test]
    fn test_registry_finds_nearest_harvestable() {
        let registry = CarvingRegistry::new();
        let node_at = |x: f32| {
            CarvingNode::new(EntityId::new(), Vec3::new(x, 0.0, 0.0), 1, scale_and_claw())
        };
        let far = registry.spawn(node_at(2.0));
        let near = registry.spawn(node_at(1.0));

        let found = registry.nearest_harvestable(Vec3::ZERO, 3.0).expect("node in range");
        assert!(Arc::ptr_eq(&found, &near));

        near.lock().start();
        let found = registry.nearest_harvestable(Vec3::ZERO, 3.0).expect("far node still free");
        assert!(Arc::ptr_eq(&found, &far));

        assert!(registry.nearest_harvestable(Vec3::new(50.0, 0.0, 0.0), 3.0).is_none());
    }

    #[test]
    fn test_registry_prunes_depleted() {
        let registry = CarvingRegistry::new();
        let node =
            registry.spawn(CarvingNode::new(EntityId::new(), Vec3::ZERO, 1, scale_and_claw()));
        carve_once(&mut node.lock());
        assert_eq!(registry.prune_depleted(), 1);
        assert!(registry.is_empty());
    }

    proptest! {
        #[test]
        fn prop_charges_only_drop_on_completion(
            charges in 1u32..6,
            steps in prop::collection::vec((0u8..3, 0.0f32..1.0), 0..60),
        ) {
            let mut node =
                CarvingNode::new(EntityId::new(), Vec3::ZERO, charges, Arc::from(Vec::new()));
            let mut completions = 0;
            for (action, dt) in steps {
                match action {
                    0 => { node.start(); }
                    1 => { node.cancel(); }
                    _ => {
                        completions += node
                            .tick(dt)
                            .iter()
                            .filter(|event| matches!(event, CarveEvent::CarveComplete { .. }))
                            .count() as u32;
                    }
                }
                prop_assert_eq!(node.remaining_charges(), charges - completions);
                prop_assert!(node.remaining_charges() <= node.max_charges());
            }
        }
    }
}
