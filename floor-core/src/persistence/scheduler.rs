//! Save coalescing policy
//!
//! Decides *when* the layout is written, never *what*: the worker always
//! writes the latest snapshot. Time is passed in explicitly, so the policy is
//! tested with hand-built instants instead of a running clock.
//!
//! - [`SaveTrigger::Immediate`]: structural edits, drag/resize release,
//!   account transitions. Due right away.
//! - [`SaveTrigger::Coalesced`]: continuous drag, item edits. Each one pushes
//!   the deadline to `now + window`, so only the state after a pause is
//!   written.

use std::time::Duration;
use tokio::time::Instant;

/// Default debounce window
pub const DEFAULT_SAVE_WINDOW: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTrigger {
    Immediate,
    Coalesced,
}

/// Drag/resize phase reported by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    /// Pointer still down; intermediate position
    Moving,
    /// Pointer released; final position
    Released,
}

impl From<DragPhase> for SaveTrigger {
    fn from(phase: DragPhase) -> Self {
        match phase {
            DragPhase::Moving => SaveTrigger::Coalesced,
            DragPhase::Released => SaveTrigger::Immediate,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SaveScheduler {
    window: Duration,
    deadline: Option<Instant>,
}

impl Default for SaveScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_SAVE_WINDOW)
    }
}

impl SaveScheduler {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Register a mutation observed at `now`.
    ///
    /// A coalesced edit restarts the window but never moves an earlier
    /// deadline back, so a pending immediate save stays due.
    pub fn record(&mut self, trigger: SaveTrigger, now: Instant) {
        let next = match trigger {
            SaveTrigger::Immediate => now,
            SaveTrigger::Coalesced => now + self.window,
        };
        self.deadline = Some(match (trigger, self.deadline) {
            (SaveTrigger::Coalesced, Some(pending)) if pending <= now => pending,
            _ => next,
        });
    }

    /// When the pending save becomes due, if one is pending
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| d <= now)
    }

    /// Consume the pending save if it is due at `now`
    pub fn take_due(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.deadline = None;
            return true;
        }
        false
    }

    /// Drop any pending save (after a forced flush)
    pub fn clear(&mut self) {
        self.deadline = None;
    }
}
