//! Gameplay event system.
//!
//! This module provides:
//! - [`GameEvent`]: everything actors, carving nodes and the quest tracker announce
//! - [`EventBus`]: a bounded channel the session drains once per frame, with an
//!   unbounded overflow lane for events the quest outcome depends on
//! - [`EventPublisher`]: the cloneable sending half handed to each producer
//!
//! Producers publish at the point of state change, after their own internal
//! effects have been applied. Consumers only see events during dispatch.

use bestiary_common::{EntityId, NodeId};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::quest::FailureReason;

/// Default channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Which kind of actor an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorKind {
    /// The player-controlled hunter.
    Hunter,
    /// A monster.
    Monster,
}

/// Gameplay events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// An attack began (including combo follow-ups).
    AttackStarted {
        /// Attacking actor.
        attacker: EntityId,
        /// Attack name.
        attack: String,
        /// Position in the combo sequence.
        combo_index: usize,
    },
    /// An attack connected.
    AttackHit {
        /// Attacking actor.
        attacker: EntityId,
        /// Struck actor.
        target: EntityId,
        /// Damage sent to the target.
        damage: i32,
        /// Affinity roll succeeded.
        critical: bool,
    },
    /// Recovery chained into the next attack.
    ComboAdvanced {
        /// Attacking actor.
        attacker: EntityId,
        /// New combo index.
        combo_index: usize,
    },
    /// An attack finished without chaining.
    AttackEnded {
        /// Attacking actor.
        attacker: EntityId,
    },
    /// An actor lost health.
    Damaged {
        /// Damaged actor.
        target: EntityId,
        /// Health removed.
        amount: i32,
        /// Health left.
        remaining: i32,
    },
    /// A monster flinched.
    Flinched {
        /// Flinching monster.
        monster: EntityId,
    },
    /// The hunter was staggered.
    Staggered {
        /// Staggered hunter.
        hunter: EntityId,
    },
    /// The hunter dodged.
    Dodged {
        /// Dodging hunter.
        hunter: EntityId,
    },
    /// An actor reached zero health.
    Died {
        /// Dead actor.
        entity: EntityId,
        /// Actor kind.
        kind: ActorKind,
        /// Species or display name.
        name: String,
    },
    /// The hunter was put back at the spawn point.
    HunterRespawned {
        /// Respawned hunter.
        hunter: EntityId,
    },
    /// A carcass became carvable.
    CarvingNodeSpawned {
        /// New node.
        node: NodeId,
        /// Actor whose death spawned it.
        owner: EntityId,
        /// Carves available.
        charges: u32,
    },
    /// A carve granted an item.
    ItemObtained {
        /// Source node.
        node: NodeId,
        /// Item name.
        item: String,
        /// Quantity.
        quantity: u32,
    },
    /// One carve finished.
    CarveCompleted {
        /// Source node.
        node: NodeId,
        /// Carves left.
        remaining: u32,
    },
    /// The last carve of a node finished.
    AllCarvesCompleted {
        /// Source node.
        node: NodeId,
    },
    /// Quest began.
    QuestStarted {
        /// Quest name.
        name: String,
    },
    /// A tracked monster died.
    MonsterKilled {
        /// Kills so far.
        kills: u32,
        /// Kills required.
        target_count: u32,
    },
    /// The hunter fainted.
    PlayerFainted {
        /// Faints so far.
        deaths: u32,
        /// Faints allowed.
        max_deaths: u32,
    },
    /// Quest succeeded.
    QuestSucceeded {
        /// Quest name.
        name: String,
        /// Reward.
        zenny: u32,
        /// Seconds taken.
        elapsed: f32,
    },
    /// Quest failed.
    QuestFailed {
        /// Quest name.
        name: String,
        /// Why it failed.
        reason: FailureReason,
    },
}

impl GameEvent {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AttackStarted { .. } => "attack_started",
            Self::AttackHit { .. } => "attack_hit",
            Self::ComboAdvanced { .. } => "combo_advanced",
            Self::AttackEnded { .. } => "attack_ended",
            Self::Damaged { .. } => "damaged",
            Self::Flinched { .. } => "flinched",
            Self::Staggered { .. } => "staggered",
            Self::Dodged { .. } => "dodged",
            Self::Died { .. } => "died",
            Self::HunterRespawned { .. } => "hunter_respawned",
            Self::CarvingNodeSpawned { .. } => "carving_node_spawned",
            Self::ItemObtained { .. } => "item_obtained",
            Self::CarveCompleted { .. } => "carve_completed",
            Self::AllCarvesCompleted { .. } => "all_carves_completed",
            Self::QuestStarted { .. } => "quest_started",
            Self::MonsterKilled { .. } => "monster_killed",
            Self::PlayerFainted { .. } => "player_fainted",
            Self::QuestSucceeded { .. } => "quest_succeeded",
            Self::QuestFailed { .. } => "quest_failed",
        }
    }

    /// Whether this event ends the quest.
    #[must_use]
    pub const fn is_quest_outcome(&self) -> bool {
        matches!(self, Self::QuestSucceeded { .. } | Self::QuestFailed { .. })
    }

    /// Events the quest tracker needs to see; a full bus never drops these.
    #[must_use]
    pub const fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::Died { .. }
                | Self::MonsterKilled { .. }
                | Self::PlayerFainted { .. }
                | Self::QuestSucceeded { .. }
                | Self::QuestFailed { .. }
        )
    }
}

/// Sending half of an [`EventBus`].
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: Sender<GameEvent>,
    overflow: Sender<GameEvent>,
}

impl EventPublisher {
    /// Publishes an event. Never blocks.
    ///
    /// When the channel is full, critical events spill into the overflow lane
    /// and everything else is dropped.
    pub fn publish(&self, event: GameEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) if event.is_critical() => {
                warn!("event bus full, queueing {} on overflow", event.name());
                // Only fails once the bus itself is gone.
                let _ = self.overflow.send(event);
            }
            Err(TrySendError::Full(event)) => {
                warn!("event bus full, dropping {}", event.name());
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Bounded event queue drained by the session.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<GameEvent>,
    receiver: Receiver<GameEvent>,
    overflow_sender: Sender<GameEvent>,
    overflow: Receiver<GameEvent>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    /// Creates a bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        let (overflow_sender, overflow) = unbounded();
        Self {
            sender,
            receiver,
            overflow_sender,
            overflow,
            capacity,
        }
    }

    /// Publishes directly on the bus.
    pub fn publish(&self, event: GameEvent) {
        self.publisher().publish(event);
    }

    /// Creates a publisher handle.
    #[must_use]
    pub fn publisher(&self) -> EventPublisher {
        EventPublisher {
            sender: self.sender.clone(),
            overflow: self.overflow_sender.clone(),
        }
    }

    /// Drains all pending events in publication order.
    ///
    /// Overflow only fills while the channel is full, so it always holds
    /// the newest events.
    pub fn drain(&self) -> Vec<GameEvent> {
        let mut events: Vec<GameEvent> = self.receiver.try_iter().collect();
        events.extend(self.overflow.try_iter());
        events
    }

    /// Number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len() + self.overflow.len()
    }

    /// Channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain_in_order() {
        let bus = EventBus::new(16);
        let publisher = bus.publisher();
        let hunter = EntityId::new();
        publisher.publish(GameEvent::Dodged { hunter });
        bus.publish(GameEvent::Staggered { hunter });

        assert_eq!(bus.pending_count(), 2);
        let events = bus.drain();
        assert_eq!(events[0].name(), "dodged");
        assert_eq!(events[1].name(), "staggered");
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops_newest() {
        let bus = EventBus::new(1);
        let node = NodeId::new();
        bus.publish(GameEvent::AllCarvesCompleted { node });
        bus.publish(GameEvent::CarveCompleted { node, remaining: 0 });

        let events = bus.drain();
        assert_eq!(events, vec![GameEvent::AllCarvesCompleted { node }]);
    }

    #[test]
    fn test_full_bus_keeps_deaths() {
        let bus = EventBus::new(1);
        let node = NodeId::new();
        let monster = EntityId::new();
        bus.publish(GameEvent::AllCarvesCompleted { node });
        bus.publish(GameEvent::Died {
            entity: monster,
            kind: ActorKind::Monster,
            name: "Wyvern".into(),
        });
        bus.publish(GameEvent::CarveCompleted { node, remaining: 0 });
        assert_eq!(bus.pending_count(), 2);

        let names: Vec<_> = bus.drain().iter().map(GameEvent::name).collect();
        assert_eq!(names, vec!["all_carves_completed", "died"]);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_quest_outcome_classification() {
        let success = GameEvent::QuestSucceeded {
            name: "Hunt".into(),
            zenny: 1000,
            elapsed: 12.0,
        };
        assert!(success.is_quest_outcome());
        assert!(!GameEvent::QuestStarted { name: "Hunt".into() }.is_quest_outcome());
    }
}
