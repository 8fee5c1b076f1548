//! Generic keyed state machine shared by every actor.
//!
//! A [`StateMachine`] maps a state key (usually a small `Copy` enum) to a boxed
//! handler implementing [`State`]. The machine itself holds no timers: all
//! per-state data lives inside the handlers, and the owning actor passes its
//! context in on every call.

use ahash::AHashMap;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::debug;

/// A single state handler.
///
/// `K` is the key type of the owning machine and `C` the actor context the
/// handler operates on. `tick` may return the key of the state to switch to;
/// the machine applies it after the handler returns.
pub trait State<K, C>: Send {
    /// Called once when the state becomes current.
    fn enter(&mut self, _ctx: &mut C) {}

    /// Advances the state by `dt` seconds.
    fn tick(&mut self, ctx: &mut C, dt: f32) -> Option<K>;

    /// Called once when the state stops being current.
    fn exit(&mut self, _ctx: &mut C) {}
}

/// Keyed state container and transition engine.
pub struct StateMachine<K, C> {
    states: AHashMap<K, Box<dyn State<K, C>>>,
    current: Option<K>,
    previous: Option<K>,
    transitions: u64,
}

impl<K, C> Default for StateMachine<K, C> {
    fn default() -> Self {
        Self {
            states: AHashMap::new(),
            current: None,
            previous: None,
            transitions: 0,
        }
    }
}

impl<K, C> std::fmt::Debug for StateMachine<K, C>
where
    K: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("current", &self.current)
            .field("previous", &self.previous)
            .field("registered", &self.states.len())
            .finish()
    }
}

impl<K, C> StateMachine<K, C>
where
    K: Copy + Eq + Hash + Debug,
{
    /// Creates an empty machine with no current state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for `key` (builder form).
    #[must_use]
    pub fn with_state(mut self, key: K, handler: impl State<K, C> + 'static) -> Self {
        self.register(key, handler);
        self
    }

    /// Registers a handler for `key`, replacing any previous handler.
    pub fn register(&mut self, key: K, handler: impl State<K, C> + 'static) {
        self.states.insert(key, Box::new(handler));
    }

    /// Switches to `key`.
    ///
    /// Unknown keys and the current key are ignored. Otherwise the current
    /// handler's `exit` runs, the key is swapped, and the new handler's `enter`
    /// runs. Returns whether a transition happened.
    pub fn change_state(&mut self, key: K, ctx: &mut C) -> bool {
        if !self.states.contains_key(&key) || self.current == Some(key) {
            return false;
        }

        if let Some(current) = self.current {
            if let Some(handler) = self.states.get_mut(&current) {
                handler.exit(ctx);
            }
        }

        debug!("state {:?} -> {:?}", self.current, key);
        self.previous = self.current;
        self.current = Some(key);
        self.transitions += 1;

        if let Some(handler) = self.states.get_mut(&key) {
            handler.enter(ctx);
        }
        true
    }

    /// Forwards `dt` to the current handler and applies any transition it requests.
    pub fn tick(&mut self, ctx: &mut C, dt: f32) {
        let next = match self.current.and_then(|key| self.states.get_mut(&key)) {
            Some(handler) => handler.tick(ctx, dt),
            None => None,
        };

        if let Some(next) = next {
            self.change_state(next, ctx);
        }
    }

    /// Returns the current state key.
    #[must_use]
    pub fn current(&self) -> Option<K> {
        self.current
    }

    /// Returns the state that was current before the last transition.
    #[must_use]
    pub fn previous(&self) -> Option<K> {
        self.previous
    }

    /// Checks whether `key` is the current state.
    #[must_use]
    pub fn is_in(&self, key: K) -> bool {
        self.current == Some(key)
    }

    /// Checks whether a handler is registered for `key`.
    #[must_use]
    pub fn has_state(&self, key: K) -> bool {
        self.states.contains_key(&key)
    }

    /// Total number of transitions performed.
    #[must_use]
    pub fn transition_count(&self) -> u64 {
        self.transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Light {
        Red,
        Green,
        Broken,
    }

    #[derive(Default)]
    struct Log {
        entries: Vec<String>,
        elapsed: f32,
    }

    struct Timed {
        name: &'static str,
        duration: f32,
        next: Light,
        timer: f32,
    }

    impl Timed {
        fn new(name: &'static str, duration: f32, next: Light) -> Self {
            Self {
                name,
                duration,
                next,
                timer: 0.0,
            }
        }
    }

    impl State<Light, Log> for Timed {
        fn enter(&mut self, ctx: &mut Log) {
            self.timer = 0.0;
            ctx.entries.push(format!("enter {}", self.name));
        }

        fn tick(&mut self, ctx: &mut Log, dt: f32) -> Option<Light> {
            self.timer += dt;
            ctx.elapsed += dt;
            (self.timer >= self.duration).then_some(self.next)
        }

        fn exit(&mut self, ctx: &mut Log) {
            ctx.entries.push(format!("exit {}", self.name));
        }
    }

    fn machine() -> StateMachine<Light, Log> {
        StateMachine::new()
            .with_state(Light::Red, Timed::new("red", 1.0, Light::Green))
            .with_state(Light::Green, Timed::new("green", 2.0, Light::Red))
    }

    #[test]
    fn test_initial_state_is_explicit() {
        let mut log = Log::default();
        let mut sm = machine();
        assert_eq!(sm.current(), None);

        // Ticking without a current state does nothing.
        sm.tick(&mut log, 5.0);
        assert!(log.entries.is_empty());
        assert_eq!(log.elapsed, 0.0);

        assert!(sm.change_state(Light::Red, &mut log));
        assert_eq!(log.entries, vec!["enter red"]);
        assert!(sm.is_in(Light::Red));
    }

    #[test]
    fn test_reentering_current_state_is_noop() {
        let mut log = Log::default();
        let mut sm = machine();
        sm.change_state(Light::Red, &mut log);

        assert!(!sm.change_state(Light::Red, &mut log));
        assert_eq!(log.entries, vec!["enter red"]);
        assert_eq!(sm.transition_count(), 1);
    }

    #[test]
    fn test_unknown_key_is_ignored() {
        let mut log = Log::default();
        let mut sm = machine();
        sm.change_state(Light::Red, &mut log);

        assert!(!sm.has_state(Light::Broken));
        assert!(!sm.change_state(Light::Broken, &mut log));
        assert!(sm.is_in(Light::Red));
    }

    #[test]
    fn test_exit_runs_before_enter() {
        let mut log = Log::default();
        let mut sm = machine();
        sm.change_state(Light::Red, &mut log);
        sm.change_state(Light::Green, &mut log);

        assert_eq!(log.entries, vec!["enter red", "exit red", "enter green"]);
        assert_eq!(sm.previous(), Some(Light::Red));
    }

    #[test]
    fn test_tick_applies_requested_transition() {
        let mut log = Log::default();
        let mut sm = machine();
        sm.change_state(Light::Red, &mut log);

        sm.tick(&mut log, 0.5);
        assert!(sm.is_in(Light::Red));

        sm.tick(&mut log, 0.5);
        assert!(sm.is_in(Light::Green));

        // Re-entering resets the handler's own timer.
        sm.tick(&mut log, 1.5);
        assert!(sm.is_in(Light::Green));
        sm.tick(&mut log, 0.5);
        assert!(sm.is_in(Light::Red));
    }
}
