/// Worker state definitions for tracking crawl progress
///
/// This module defines every state a crawl worker moves through while it
/// drains the page queue.
use std::fmt;

/// Represents the current state of a crawl worker
///
/// ```text
/// Idle -> Fetching -> Extracting -> Appending -> Idle
/// Idle -> Sleeping -> Idle                       (queue empty)
/// any  -> Stopped                                (stop flag observed)
/// any  -> Failed                                 (worker-fatal error)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WorkerState {
    // ===== Active States =====
    /// Between pages, about to poll the queue
    Idle = 0,

    /// Waiting for a page response, including rate-limit retries
    Fetching = 1,

    /// Turning the page payload into records
    Extracting = 2,

    /// Pushing records into the shared sink
    Appending = 3,

    /// Queue was empty; backing off before polling again
    Sleeping = 4,

    // ===== Terminal States =====
    /// Observed the stop flag and exited cleanly
    Stopped = 5,

    /// Exited on a worker-fatal error
    Failed = 6,
}

impl WorkerState {
    /// Returns true if the worker thread has exited
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }

    /// Returns true if moving from this state to `next` follows the state machine
    pub fn can_transition_to(&self, next: WorkerState) -> bool {
        use WorkerState::*;

        if self.is_terminal() {
            return false;
        }

        matches!(
            (*self, next),
            (Idle, Fetching)
                | (Idle, Sleeping)
                | (Sleeping, Idle)
                | (Fetching, Extracting)
                | (Extracting, Appending)
                | (Appending, Idle)
                | (_, Stopped)
                | (_, Failed)
        )
    }

    /// Short lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Appending => "appending",
            Self::Sleeping => "sleeping",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }

    /// Encodes the state for storage in an atomic
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Decodes a state stored with `to_u8`
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::Fetching),
            2 => Some(Self::Extracting),
            3 => Some(Self::Appending),
            4 => Some(Self::Sleeping),
            5 => Some(Self::Stopped),
            6 => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [WorkerState; 7] = [
        WorkerState::Idle,
        WorkerState::Fetching,
        WorkerState::Extracting,
        WorkerState::Appending,
        WorkerState::Sleeping,
        WorkerState::Stopped,
        WorkerState::Failed,
    ];

    #[test]
    fn test_u8_roundtrip() {
        for state in ALL {
            assert_eq!(WorkerState::from_u8(state.to_u8()), Some(state));
        }
        assert_eq!(WorkerState::from_u8(42), None);
    }

    #[test]
    fn test_page_cycle() {
        assert!(WorkerState::Idle.can_transition_to(WorkerState::Fetching));
        assert!(WorkerState::Fetching.can_transition_to(WorkerState::Extracting));
        assert!(WorkerState::Extracting.can_transition_to(WorkerState::Appending));
        assert!(WorkerState::Appending.can_transition_to(WorkerState::Idle));
    }

    #[test]
    fn test_idle_cycle() {
        assert!(WorkerState::Idle.can_transition_to(WorkerState::Sleeping));
        assert!(WorkerState::Sleeping.can_transition_to(WorkerState::Idle));
        assert!(!WorkerState::Sleeping.can_transition_to(WorkerState::Fetching));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!WorkerState::Idle.can_transition_to(WorkerState::Appending));
        assert!(!WorkerState::Fetching.can_transition_to(WorkerState::Idle));
        assert!(!WorkerState::Stopped.can_transition_to(WorkerState::Idle));
        assert!(!WorkerState::Failed.can_transition_to(WorkerState::Stopped));
    }

    #[test]
    fn test_any_active_state_can_stop_or_fail() {
        for state in ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(state.can_transition_to(WorkerState::Stopped));
            assert!(state.can_transition_to(WorkerState::Failed));
        }
    }

    #[test]
    fn test_classification() {
        assert!(WorkerState::Failed.is_terminal());
        assert!(!WorkerState::Idle.is_terminal());
    }
}
