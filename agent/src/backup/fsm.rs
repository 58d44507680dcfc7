//! Finite State Machine for a backup run

use serde::{Deserialize, Serialize};

/// Run state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Nothing has happened yet
    NotStarted,

    /// Receiver launch in progress
    ReceiverStarting,

    /// Receiver is up, devices not yet processed
    ReceiverRunning,

    /// Device loop in progress
    ProcessingDevices,

    /// Receiver shutdown in progress
    ReceiverStopping,

    /// Run finished, receiver stopped
    Done,

    /// Receiver could not be started
    Failed,
}

/// Run event
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// Begin launching the receiver
    StartReceiver,

    /// Receiver is running
    ReceiverStarted,

    /// Receiver launch failed
    ReceiverFailed(String),

    /// Begin the device loop
    BeginDevices,

    /// Begin receiver shutdown
    StopReceiver,

    /// Receiver shutdown finished (successfully or not)
    ReceiverStopped,
}

/// Run FSM
#[derive(Debug, Clone)]
pub struct RunFsm {
    state: RunState,
    error: Option<String>,
}

impl RunFsm {
    /// Create a new FSM in the not-started state
    pub fn new() -> Self {
        Self {
            state: RunState::NotStarted,
            error: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the run has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, RunState::Done | RunState::Failed)
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: RunEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            (RunState::NotStarted, RunEvent::StartReceiver) => RunState::ReceiverStarting,

            (RunState::ReceiverStarting, RunEvent::ReceiverStarted) => RunState::ReceiverRunning,
            (RunState::ReceiverStarting, RunEvent::ReceiverFailed(err)) => {
                self.error = Some(err.clone());
                RunState::Failed
            }

            (RunState::ReceiverRunning, RunEvent::BeginDevices) => RunState::ProcessingDevices,
            (RunState::ReceiverRunning, RunEvent::StopReceiver) => RunState::ReceiverStopping,

            (RunState::ProcessingDevices, RunEvent::StopReceiver) => RunState::ReceiverStopping,

            (RunState::ReceiverStopping, RunEvent::ReceiverStopped) => RunState::Done,

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for RunFsm {
    fn default() -> Self {
        Self::new()
    }
}
