//! Worker lifecycle state machine.
//!
//! Three states: a new worker installs, waits, then takes over. The
//! install and activate handlers themselves live on
//! [`crate::ServiceWorker`]; this module owns the state and its legal
//! transitions.

use std::fmt;

use tokio::sync::RwLock;

use crate::WorkerError;

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Pre-warming the shell store.
    Installing,
    /// Installed, waiting for (or skipping straight to) activation.
    Installed,
    /// Controlling pages.
    Active,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Installed => write!(f, "installed"),
            WorkerState::Active => write!(f, "active"),
        }
    }
}

/// Check if a state transition is valid.
fn is_valid_transition(from: WorkerState, to: WorkerState) -> bool {
    use WorkerState::*;

    matches!((from, to), (Installing, Installed) | (Installed, Active))
}

/// Tracks the worker's lifecycle state.
pub struct Lifecycle {
    state: RwLock<WorkerState>,
}

impl Lifecycle {
    /// A new worker starts installing.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(WorkerState::Installing),
        }
    }

    /// The current state.
    pub async fn current(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Transition to a new state, rejecting illegal jumps.
    pub async fn advance(&self, to: WorkerState) -> Result<(), WorkerError> {
        let mut state = self.state.write().await;
        let from = *state;
        if !is_valid_transition(from, to) {
            return Err(WorkerError::InvalidTransition { from, to });
        }
        *state = to;
        Ok(())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_full_lifecycle() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.current().await, WorkerState::Installing);

        lifecycle.advance(WorkerState::Installed).await.unwrap();
        lifecycle.advance(WorkerState::Active).await.unwrap();
        assert_eq!(lifecycle.current().await, WorkerState::Active);
    }

    #[tokio::test]
    async fn test_cannot_skip_install() {
        let lifecycle = Lifecycle::new();
        let result = lifecycle.advance(WorkerState::Active).await;
        assert!(matches!(
            result,
            Err(WorkerError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_cannot_go_backwards() {
        let lifecycle = Lifecycle::new();
        lifecycle.advance(WorkerState::Installed).await.unwrap();
        lifecycle.advance(WorkerState::Active).await.unwrap();

        assert!(lifecycle.advance(WorkerState::Installed).await.is_err());
    }
}
