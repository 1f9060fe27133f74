//! Error types for the Nimbus core.

/// The reason a [`Context`](crate::Context) is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// The context was cancelled through its [`CancelHandle`](crate::CancelHandle).
    #[error("context cancelled")]
    Cancelled,

    /// The context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Core error type for Nimbus infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum NimbusError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result type for core operations.
pub type NimbusResult<T> = Result<T, NimbusError>;
