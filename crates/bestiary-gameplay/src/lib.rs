//! # Bestiary Gameplay
//!
//! Gameplay core for Genesis Bestiary, a third-person monster hunt.
//!
//! This crate provides the simulation side of a hunt:
//! - Generic finite state machine used by every actor
//! - Damage formulas and critical rolls
//! - Authored definitions (weapons, hunter, monsters, quests) and their loader
//! - Attack timeline with combo buffering
//! - Hunter and monster state machines
//! - Carving nodes with weighted loot
//! - Quest tracking with time and faint budgets
//! - Event bus and presentation sink
//! - Hunt session that drives one frame at a time

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod attack_timeline;
pub mod carving;
pub mod combat;
pub mod damage_calc;
pub mod definitions;
pub mod events;
pub mod hunter;
pub mod input;
pub mod loader;
pub mod monster;
pub mod movement;
pub mod presentation;
pub mod quest;
pub mod session;
pub mod spatial;
pub mod state_machine;
pub mod stats;
pub mod vitals;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::attack_timeline::*;
    pub use crate::carving::*;
    pub use crate::combat::*;
    pub use crate::damage_calc::*;
    pub use crate::definitions::*;
    pub use crate::events::*;
    pub use crate::hunter::*;
    pub use crate::input::*;
    pub use crate::loader::*;
    pub use crate::monster::*;
    pub use crate::movement::*;
    pub use crate::presentation::*;
    pub use crate::quest::*;
    pub use crate::session::*;
    pub use crate::spatial::*;
    pub use crate::state_machine::*;
    pub use crate::stats::*;
    pub use crate::vitals::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_builds_a_session() {
        let setup = SessionSetup::new(QuestDefinition::hunt("Smoke", "Test Monster", 1))
            .with_monster(MonsterSpawn::new(
                MonsterStats::default(),
                glam::Vec3::new(0.0, 0.0, 30.0),
            ))
            .with_seed(1);
        let mut session = HuntSession::new(setup);
        let mut sink = RecordingSink::default();
        let state = session.tick(1.0 / 60.0, InputSnapshot::IDLE, &mut sink);

        assert_eq!(state, QuestState::InProgress);
        assert_eq!(session.tracker().tracked_count(), 1);
        assert_eq!(sink.frames, 1);
    }

    #[test]
    fn test_damage_formula_reexported() {
        assert_eq!(raw_damage_neutral(100, 48), 48);
    }
}
