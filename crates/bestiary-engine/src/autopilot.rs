//! Scripted input source for headless hunts.
//!
//! The autopilot reads the session the same way a HUD would and produces one
//! [`InputSnapshot`] per frame: walk to the nearest monster, swing when in
//! reach, roll away from a wind-up, and carve whatever falls.

use bestiary_gameplay::{HuntSession, HunterStateKind, InputSnapshot, MonsterStateKind};
use glam::{Vec2, Vec3};
use tracing::debug;

use crate::config::AutopilotConfig;

/// Carving is postponed while a living monster is closer than this.
const SAFE_CARVE_DISTANCE: f32 = 8.0;

/// Scripted hunter.
#[derive(Debug, Clone)]
pub struct Autopilot {
    config: AutopilotConfig,
    dodged_current_windup: bool,
}

impl Autopilot {
    /// Creates an autopilot.
    #[must_use]
    pub fn new(config: AutopilotConfig) -> Self {
        Self {
            config,
            dodged_current_windup: false,
        }
    }

    /// Input for the next frame.
    pub fn next_input(&mut self, session: &HuntSession) -> InputSnapshot {
        let hunter = session.hunter();
        if hunter.is_dead() {
            return InputSnapshot::IDLE;
        }
        let position = hunter.position();

        let target = session
            .nearest_monster()
            .map(|monster| (monster, flat_distance(position, monster.position())));

        if self.config.carve {
            let threat_nearby = target.is_some_and(|(_, distance)| distance < SAFE_CARVE_DISTANCE);
            if !threat_nearby {
                if let Some(input) = Self::carve_input(session, position) {
                    return input;
                }
            }
        }

        let Some((monster, distance)) = target else {
            return InputSnapshot::IDLE;
        };
        let towards = stick_towards(position, monster.position());

        let winding_up = monster.state() == MonsterStateKind::Attack
            && distance <= monster.stats().attack_range + hunter.stats().body_radius;
        if !winding_up {
            self.dodged_current_windup = false;
        } else if self.config.dodge
            && !self.dodged_current_windup
            && hunter.state() == HunterStateKind::Locomotion
        {
            self.dodged_current_windup = true;
            debug!("autopilot rolls away from {}", monster.name());
            return InputSnapshot::IDLE.with_dodge().with_move(-towards);
        }

        if distance > self.config.engage_distance {
            return InputSnapshot::IDLE.with_move(towards);
        }
        if self.config.attack {
            InputSnapshot::IDLE.with_attack()
        } else {
            InputSnapshot::IDLE
        }
    }

    /// Walks to the closest carving node with charges left, holding interact
    /// once in range.
    fn carve_input(session: &HuntSession, position: Vec3) -> Option<InputSnapshot> {
        let nodes = session.carving().nodes();
        let (in_range, node_position) = nodes
            .iter()
            .filter_map(|shared| {
                let node = shared.lock();
                (!node.is_depleted()).then(|| (node.in_range(position), node.position()))
            })
            .min_by(|a, b| {
                flat_distance(position, a.1).total_cmp(&flat_distance(position, b.1))
            })?;

        Some(if in_range {
            InputSnapshot::IDLE.with_interact()
        } else {
            InputSnapshot::IDLE.with_move(stick_towards(position, node_position))
        })
    }
}

fn flat_distance(a: Vec3, b: Vec3) -> f32 {
    Vec2::new(b.x - a.x, b.z - a.z).length()
}

fn stick_towards(from: Vec3, to: Vec3) -> Vec2 {
    Vec2::new(to.x - from.x, to.z - from.z).normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bestiary_gameplay::{
        Damageable, MonsterSpawn, MonsterStats, QuestDefinition, RecordingSink, SessionSetup,
    };

    fn session_with_monster_at(z: f32) -> HuntSession {
        let stats = MonsterStats {
            name: "Wyvern".into(),
            ..Default::default()
        };
        let setup = SessionSetup::new(QuestDefinition::hunt("Test", "Wyvern", 1))
            .with_monster(MonsterSpawn::new(stats, Vec3::new(0.0, 0.0, z)));
        HuntSession::new(setup)
    }

    #[test]
    fn test_walks_towards_distant_monster() {
        let session = session_with_monster_at(10.0);
        let mut pilot = Autopilot::new(AutopilotConfig::default());
        let input = pilot.next_input(&session);
        assert!(!input.attack_pressed);
        assert!((input.move_vector - Vec2::Y).length() < 1e-5);
    }

    #[test]
    fn test_swings_in_reach() {
        let session = session_with_monster_at(2.0);
        let mut pilot = Autopilot::new(AutopilotConfig::default());
        assert!(pilot.next_input(&session).attack_pressed);

        let mut passive = Autopilot::new(AutopilotConfig {
            attack: false,
            ..Default::default()
        });
        assert_eq!(passive.next_input(&session), InputSnapshot::IDLE);
    }

    #[test]
    fn test_carves_fallen_monster() {
        let mut session = session_with_monster_at(2.0);
        let mut sink = RecordingSink::default();
        session.monsters_mut()[0].take_damage(10_000, Vec3::ZERO);
        session.tick(1.0 / 60.0, InputSnapshot::IDLE, &mut sink);
        assert_eq!(session.carving().len(), 1);

        let mut pilot = Autopilot::new(AutopilotConfig::default());
        let input = pilot.next_input(&session);
        assert!(input.interact_held);

        let mut no_carve = Autopilot::new(AutopilotConfig {
            carve: false,
            ..Default::default()
        });
        assert_eq!(no_carve.next_input(&session), InputSnapshot::IDLE);
    }

    #[test]
    fn test_dead_hunter_sends_nothing() {
        let mut session = session_with_monster_at(10.0);
        session.hunter_mut().take_damage(10_000, Vec3::ZERO);
        let mut pilot = Autopilot::new(AutopilotConfig::default());
        assert_eq!(pilot.next_input(&session), InputSnapshot::IDLE);
    }
}
