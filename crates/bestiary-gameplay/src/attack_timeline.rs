//! Phase clock for melee combos.
//!
//! This module provides:
//! - [`AttackTimeline`]: startup → active → recovery for one attack at a time
//! - Combo chaining from a buffered input inside the recovery window
//! - [`TimelineEvent`]s the owning actor reacts to (hit pass, logging, state exit)
//!
//! The timeline never touches the world. On [`TimelineEvent::Hit`] the owner
//! runs its overlap query; forward movement is applied by the owner as well.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::definitions::AttackDefinition;

/// Current phase of the timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackPhase {
    /// Not attacking.
    #[default]
    None,
    /// Wind-up before the hitbox activates.
    Startup,
    /// Hitbox live.
    Active,
    /// Follow-through; the combo window lives here.
    Recovery,
}

/// Something the owner must react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineEvent {
    /// An attack entered startup.
    Started {
        /// Index into the combo sequence.
        combo_index: usize,
    },
    /// The active phase began; run exactly one hit pass now.
    Hit {
        /// Index into the combo sequence.
        combo_index: usize,
    },
    /// Recovery chained into the attack at `combo_index`.
    ComboAdvanced {
        /// New index into the combo sequence.
        combo_index: usize,
    },
    /// The attack finished and the combo reset.
    Ended,
}

/// Snapshot of the timeline's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackPhaseState {
    /// Current phase.
    pub phase: AttackPhase,
    /// Seconds spent in the current phase.
    pub elapsed_in_phase: f32,
    /// Index of the current attack.
    pub combo_index: usize,
    /// A hit pass already ran for this active phase.
    pub has_dealt_damage: bool,
    /// Attack input is buffered.
    pub buffered_input: bool,
}

/// Drives one attack sequence.
#[derive(Debug, Clone)]
pub struct AttackTimeline {
    sequence: Arc<[AttackDefinition]>,
    phase: AttackPhase,
    elapsed: f32,
    combo_index: usize,
    has_dealt_damage: bool,
    buffered_input: bool,
}

impl AttackTimeline {
    /// Creates an idle timeline over `sequence`.
    #[must_use]
    pub fn new(sequence: Arc<[AttackDefinition]>) -> Self {
        Self {
            sequence,
            phase: AttackPhase::None,
            elapsed: 0.0,
            combo_index: 0,
            has_dealt_damage: false,
            buffered_input: false,
        }
    }

    /// Begins the attack at `combo_index`.
    ///
    /// Returns `None` without changing anything if the index is past the end
    /// of the sequence.
    pub fn start_attack(&mut self, combo_index: usize) -> Option<TimelineEvent> {
        if combo_index >= self.sequence.len() {
            return None;
        }
        self.combo_index = combo_index;
        self.phase = AttackPhase::Startup;
        self.elapsed = 0.0;
        self.has_dealt_damage = false;
        self.buffered_input = false;
        Some(TimelineEvent::Started { combo_index })
    }

    /// Records an attack press for the combo window. Ignored while idle.
    pub fn buffer_input(&mut self) {
        if self.is_attacking() {
            self.buffered_input = true;
        }
    }

    /// Abandons the current attack without emitting [`TimelineEvent::Ended`].
    pub fn interrupt(&mut self) {
        self.reset();
    }

    /// Advances the clock by `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> Vec<TimelineEvent> {
        let mut events = Vec::new();
        let Some(attack) = self.current_attack() else {
            return events;
        };
        let (startup, active, recovery) = (attack.startup, attack.active, attack.recovery);
        let (can_combo, combo_window) = (attack.can_combo, attack.combo_window);

        self.elapsed += dt;
        match self.phase {
            AttackPhase::None => {}
            AttackPhase::Startup => {
                if self.elapsed >= startup {
                    self.phase = AttackPhase::Active;
                    self.elapsed = 0.0;
                    if !self.has_dealt_damage {
                        self.has_dealt_damage = true;
                        events.push(TimelineEvent::Hit {
                            combo_index: self.combo_index,
                        });
                    }
                }
            }
            AttackPhase::Active => {
                if self.elapsed >= active {
                    self.phase = AttackPhase::Recovery;
                    self.elapsed = 0.0;
                }
            }
            AttackPhase::Recovery => {
                let next = self.combo_index + 1;
                if can_combo
                    && self.elapsed <= combo_window
                    && self.buffered_input
                    && next < self.sequence.len()
                {
                    events.extend(self.start_attack(next));
                    events.push(TimelineEvent::ComboAdvanced { combo_index: next });
                } else if self.elapsed >= recovery {
                    self.reset();
                    events.push(TimelineEvent::Ended);
                }
            }
        }
        events
    }

    fn reset(&mut self) {
        self.phase = AttackPhase::None;
        self.elapsed = 0.0;
        self.combo_index = 0;
        self.has_dealt_damage = false;
        self.buffered_input = false;
    }

    /// Attack currently playing.
    #[must_use]
    pub fn current_attack(&self) -> Option<&AttackDefinition> {
        if self.is_attacking() {
            self.sequence.get(self.combo_index)
        } else {
            None
        }
    }

    /// Whether an attack is playing.
    #[must_use]
    pub fn is_attacking(&self) -> bool {
        self.phase != AttackPhase::None
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> AttackPhase {
        self.phase
    }

    /// Current combo index (0 while idle).
    #[must_use]
    pub fn combo_index(&self) -> usize {
        self.combo_index
    }

    /// Length of the combo sequence.
    #[must_use]
    pub fn sequence_len(&self) -> usize {
        self.sequence.len()
    }

    /// Bookkeeping snapshot.
    #[must_use]
    pub fn phase_state(&self) -> AttackPhaseState {
        AttackPhaseState {
            phase: self.phase,
            elapsed_in_phase: self.elapsed,
            combo_index: self.combo_index,
            has_dealt_damage: self.has_dealt_damage,
            buffered_input: self.buffered_input,
        }
    }
}
