//! Error types for operation polling.

use nimbus_client::ClientError;
use nimbus_core::ContextError;

use crate::model::Operation;

/// Why waiting for an operation did not produce a result.
///
/// Every variant carries the last snapshot seen, available through
/// [`OperationError::operation`].
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// The context finished before the operation did.
    #[error("stopped waiting for operation {}: {source}", .operation.operation_id)]
    Cancelled {
        /// Why the context finished.
        #[source]
        source: ContextError,
        /// Last snapshot seen.
        operation: Box<Operation>,
    },

    /// Fetching a snapshot failed.
    #[error("failed to fetch operation {}: {source}", .operation.operation_id)]
    Fetch {
        /// The accessor's error.
        #[source]
        source: ClientError,
        /// Last snapshot seen.
        operation: Box<Operation>,
    },

    /// The operation failed and reported why.
    #[error("{message}")]
    Failed {
        /// Machine-readable error code.
        code: String,
        /// Human-readable description.
        message: String,
        /// Final snapshot.
        operation: Box<Operation>,
    },

    /// The operation failed without a readable error payload.
    #[error("unable to get operation result")]
    ResultUnavailable {
        /// Final snapshot.
        operation: Box<Operation>,
    },

    /// The operation finished in a state this client does not know.
    #[error(
        "operation {} finished in unexpected state {}, please contact support",
        .operation.operation_id,
        .operation.state
    )]
    UnexpectedState {
        /// Final snapshot.
        operation: Box<Operation>,
    },

    /// The result payload did not match the expected type.
    #[error("failed to decode operation result: {source}")]
    Decode {
        /// The decoding error.
        #[source]
        source: serde_json::Error,
        /// Final snapshot.
        operation: Box<Operation>,
    },
}

impl OperationError {
    /// The last snapshot seen before the error.
    #[must_use]
    pub fn operation(&self) -> &Operation {
        match self {
            Self::Cancelled { operation, .. }
            | Self::Fetch { operation, .. }
            | Self::Failed { operation, .. }
            | Self::ResultUnavailable { operation }
            | Self::UnexpectedState { operation }
            | Self::Decode { operation, .. } => operation,
        }
    }

    /// Take the last snapshot seen before the error.
    #[must_use]
    pub fn into_operation(self) -> Operation {
        match self {
            Self::Cancelled { operation, .. }
            | Self::Fetch { operation, .. }
            | Self::Failed { operation, .. }
            | Self::ResultUnavailable { operation }
            | Self::UnexpectedState { operation }
            | Self::Decode { operation, .. } => *operation,
        }
    }
}

/// Convenience result type for operation waits.
pub type OperationResult<T> = Result<T, OperationError>;
