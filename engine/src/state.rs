//! Lifecycle state shared between the reader task and callers.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Lifecycle of the engine process.
///
/// `Disabled` and `Terminated` are terminal: once entered, no transition
/// leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    NotStarted,
    Starting,
    Ready,
    /// Spawn or handshake failed.
    Disabled,
    /// Shut down, or the process went away after becoming ready.
    Terminated,
}

impl EngineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, EngineState::Disabled | EngineState::Terminated)
    }

    fn as_u8(self) -> u8 {
        match self {
            EngineState::NotStarted => 0,
            EngineState::Starting => 1,
            EngineState::Ready => 2,
            EngineState::Disabled => 3,
            EngineState::Terminated => 4,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => EngineState::NotStarted,
            1 => EngineState::Starting,
            2 => EngineState::Ready,
            3 => EngineState::Disabled,
            _ => EngineState::Terminated,
        }
    }
}

/// Flags touched by both the reader task and caller tasks.
#[derive(Debug)]
pub struct SharedState {
    state: AtomicU8,
    alive: AtomicBool,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(EngineState::NotStarted.as_u8()),
            alive: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move to `to` unless the current state is terminal.
    ///
    /// Returns the state that was replaced, or `None` if nothing changed.
    pub fn transition(&self, to: EngineState) -> Option<EngineState> {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let current = EngineState::from_u8(current);
                (!current.is_terminal() && current != to).then_some(to.as_u8())
            })
            .ok()
            .map(EngineState::from_u8)
    }

    /// Move `from` → `to` only if the current state is exactly `from`.
    pub fn transition_from(&self, from: EngineState, to: EngineState) -> bool {
        if from.is_terminal() {
            return false;
        }
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == EngineState::Ready && self.is_alive()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::Release);
    }

    /// Record that the process is gone: clears `alive` and retires a ready
    /// engine.
    pub fn mark_exited(&self) {
        self.set_alive(false);
        self.transition_from(EngineState::Ready, EngineState::Terminated);
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
