//! Process lifecycle state read by the health probes.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    Starting = 0,
    Ready = 1,
    ShuttingDown = 2,
    Shutdown = 3,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Ready => "ready",
            LifecycleState::ShuttingDown => "shutting_down",
            LifecycleState::Shutdown => "shutdown",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => LifecycleState::Starting,
            1 => LifecycleState::Ready,
            2 => LifecycleState::ShuttingDown,
            _ => LifecycleState::Shutdown,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic lifecycle flag.
///
/// Readers never block. Transitions are plain stores, so any state may
/// overwrite any other; the server drives them in order.
#[derive(Debug)]
pub struct LifecycleManager {
    state: AtomicU8,
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Starting as u8),
        }
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: LifecycleState) {
        let previous = LifecycleState::from_u8(self.state.swap(state as u8, Ordering::AcqRel));
        if previous != state {
            tracing::info!(from = %previous, to = %state, "Lifecycle state changed");
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == LifecycleState::Ready
    }

    pub fn mark_ready(&self) {
        self.set_state(LifecycleState::Ready);
    }

    pub fn mark_shutting_down(&self) {
        self.set_state(LifecycleState::ShuttingDown);
    }

    pub fn mark_shutdown(&self) {
        self.set_state(LifecycleState::Shutdown);
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}
