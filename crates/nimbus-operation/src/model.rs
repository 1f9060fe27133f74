//! Operation snapshots as returned by the management API.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle state of an operation.
///
/// Unknown states are kept verbatim in [`OperationState::Other`] and treated
/// as terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationState {
    /// Still running; poll again.
    InProgress,
    /// Finished successfully; `result` holds the payload.
    Succeeded,
    /// Finished with an error; `result` holds the error envelope.
    Failed,
    /// A state this client does not know.
    Other(String),
}

impl OperationState {
    /// The wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Other(state) => state,
        }
    }

    /// Whether the server will no longer change the operation.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl From<String> for OperationState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "IN_PROGRESS" => Self::InProgress,
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            _ => Self::Other(state),
        }
    }
}

impl From<&str> for OperationState {
    fn from(state: &str) -> Self {
        Self::from(state.to_owned())
    }
}

impl From<OperationState> for String {
    fn from(state: OperationState) -> Self {
        match state {
            OperationState::Other(state) => state,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A snapshot of a server-side asynchronous action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation identifier.
    #[serde(alias = "id")]
    pub operation_id: String,
    /// Current state.
    pub state: OperationState,
    /// Result payload: the resource on success, an error envelope on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Resource-specific metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// When the operation started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    /// When the operation reached a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl Operation {
    /// A bare snapshot with no payload.
    pub fn new(operation_id: impl Into<String>, state: impl Into<OperationState>) -> Self {
        Self {
            operation_id: operation_id.into(),
            state: state.into(),
            result: None,
            metadata: None,
            started_at: None,
            completed_at: None,
        }
    }

    /// Attach a result payload.
    #[must_use]
    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    /// Whether the server will no longer change the operation.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
