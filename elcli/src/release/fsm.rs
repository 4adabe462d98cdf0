//! Finite State Machine for a single configuration release

use serde::{Deserialize, Serialize};

use crate::errors::LeapError;

/// Release state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseState {
    /// Nothing has been asked of the hub yet
    Start,

    /// Looking up the configuration id
    Checking,

    /// No configuration exists under the id
    Absent,

    /// A configuration exists and will be replaced
    Present,

    /// Removing the existing configuration
    Deleting,

    /// Creating the desired configuration
    Creating,

    /// Re-creating the previous configuration after a failed create
    RollingBack,

    /// Desired configuration is in place
    Released,

    /// Release did not complete
    Failed,
}

impl ReleaseState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReleaseState::Released | ReleaseState::Failed)
    }
}

/// Release event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseEvent {
    /// Start the existence check
    Check,

    /// Hub answered 404
    NotFound,

    /// Hub answered 200
    Found,

    /// Start removing the existing configuration
    Delete,

    /// Existing configuration is gone
    Deleted,

    /// Start creating from `Absent`
    Create,

    /// Desired configuration was created
    Created,

    /// Create failed; `rollback` is true when a previous configuration was captured
    CreateFailed { rollback: bool },

    /// Rollback attempt finished, whatever its outcome
    RollbackFinished,

    /// Fatal error before any creation was attempted
    Abort(String),
}

/// Release FSM
#[derive(Debug, Clone)]
pub struct ReleaseFsm {
    state: ReleaseState,
    error: Option<String>,
    history: Vec<ReleaseState>,
}

impl ReleaseFsm {
    /// Create a new FSM in the start state
    pub fn new() -> Self {
        Self {
            state: ReleaseState::Start,
            error: None,
            history: vec![ReleaseState::Start],
        }
    }

    /// Get current state
    pub fn state(&self) -> ReleaseState {
        self.state
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Every state visited, in order
    pub fn history(&self) -> &[ReleaseState] {
        &self.history
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: ReleaseEvent) -> Result<ReleaseState, LeapError> {
        let new_state = match (&self.state, &event) {
            (ReleaseState::Start, ReleaseEvent::Check) => ReleaseState::Checking,

            (ReleaseState::Checking, ReleaseEvent::NotFound) => ReleaseState::Absent,
            (ReleaseState::Checking, ReleaseEvent::Found) => ReleaseState::Present,

            (ReleaseState::Present, ReleaseEvent::Delete) => ReleaseState::Deleting,
            (ReleaseState::Deleting, ReleaseEvent::Deleted) => ReleaseState::Creating,

            (ReleaseState::Absent, ReleaseEvent::Create) => ReleaseState::Creating,

            (ReleaseState::Creating, ReleaseEvent::Created) => ReleaseState::Released,
            (ReleaseState::Creating, ReleaseEvent::CreateFailed { rollback: true }) => {
                ReleaseState::RollingBack
            }
            (ReleaseState::Creating, ReleaseEvent::CreateFailed { rollback: false }) => {
                ReleaseState::Failed
            }

            (ReleaseState::RollingBack, ReleaseEvent::RollbackFinished) => ReleaseState::Failed,

            (ReleaseState::Checking | ReleaseState::Deleting, ReleaseEvent::Abort(err)) => {
                self.error = Some(err.clone());
                ReleaseState::Failed
            }

            (state, event) => {
                return Err(LeapError::InvalidTransition(format!(
                    "{:?} -> {:?}",
                    state, event
                )));
            }
        };

        self.state = new_state;
        self.history.push(new_state);
        Ok(new_state)
    }
}

impl Default for ReleaseFsm {
    fn default() -> Self {
        Self::new()
    }
}
