//! Run lifecycle: `Running -> Draining -> Finished`
//!
//! The producer moves the run to `Draining` when it stops reading (end of input or
//! cancellation) and closes the dispatch queue. The coordinator moves it to
//! `Finished` once every worker has returned.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum LifecycleState {
    Running = 0,
    Draining = 1,
    Finished = 2,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LifecycleState::Running,
            1 => LifecycleState::Draining,
            _ => LifecycleState::Finished,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Running => "running",
            LifecycleState::Draining => "draining",
            LifecycleState::Finished => "finished",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the producer stopped reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainReason {
    EndOfInput,
    Cancelled,
    /// Every worker had already quit when a record was handed off
    QueueClosed,
}

/// Forward-only state holder shared by the producer and the coordinator
#[derive(Debug)]
pub struct Lifecycle {
    state: AtomicU8,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Running as u8),
        }
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Enter `Draining`; returns false if the run had already left `Running`
    pub fn begin_draining(&self, reason: DrainReason) -> bool {
        let moved = self.advance(LifecycleState::Running, LifecycleState::Draining);
        if moved {
            debug!(?reason, "lifecycle running -> draining");
        }
        moved
    }

    /// Enter `Finished` from `Draining`
    pub fn finish(&self) -> bool {
        let moved = self.advance(LifecycleState::Draining, LifecycleState::Finished);
        if moved {
            debug!("lifecycle draining -> finished");
        }
        moved
    }

    fn advance(&self, from: LifecycleState, to: LifecycleState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), LifecycleState::Running);

        assert!(lifecycle.begin_draining(DrainReason::EndOfInput));
        assert_eq!(lifecycle.state(), LifecycleState::Draining);

        assert!(lifecycle.finish());
        assert_eq!(lifecycle.state(), LifecycleState::Finished);
    }

    #[test]
    fn test_transitions_cannot_skip_or_repeat() {
        let lifecycle = Lifecycle::new();
        assert!(!lifecycle.finish(), "cannot finish while running");

        assert!(lifecycle.begin_draining(DrainReason::Cancelled));
        assert!(!lifecycle.begin_draining(DrainReason::EndOfInput));

        assert!(lifecycle.finish());
        assert!(!lifecycle.finish());
        assert!(!lifecycle.begin_draining(DrainReason::Cancelled));
        assert_eq!(lifecycle.state(), LifecycleState::Finished);
    }

    #[test]
    fn test_states_are_ordered() {
        assert!(LifecycleState::Running < LifecycleState::Draining);
        assert!(LifecycleState::Draining < LifecycleState::Finished);
        assert_eq!(LifecycleState::Draining.to_string(), "draining");
    }
}
