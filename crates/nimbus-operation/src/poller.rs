//! Waiting for operations to finish.
//!
//! [`OperationPoller`] re-fetches an operation until it leaves `IN_PROGRESS`,
//! then maps the terminal state:
//!
//! - `SUCCEEDED` returns the final snapshot.
//! - `FAILED` decodes the `{code, message}` payload into
//!   [`OperationError::Failed`], or [`OperationError::ResultUnavailable`] if
//!   the payload has another shape.
//! - Any other state is [`OperationError::UnexpectedState`].
//!
//! Snapshots are fetched strictly one after another. The context is checked
//! before every fetch and interrupts the interval sleep.

use std::time::Duration;

use nimbus_client::{ClientError, ErrorEnvelope};
use nimbus_core::{Context, NimbusConfig};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::accessor::OperationAccessor;
use crate::error::{OperationError, OperationResult};
use crate::model::{Operation, OperationState};

/// Interval between polls unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Polls operations at a fixed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationPoller {
    interval: Duration,
}

impl Default for OperationPoller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl From<&NimbusConfig> for OperationPoller {
    fn from(config: &NimbusConfig) -> Self {
        Self::new(config.poll_interval)
    }
}

impl OperationPoller {
    /// Create a poller sleeping `interval` between fetches.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// The interval between fetches.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll `operation` until it is terminal.
    pub async fn await_operation<A>(
        &self,
        ctx: &Context,
        operation: Operation,
        accessor: &A,
    ) -> OperationResult<Operation>
    where
        A: OperationAccessor + ?Sized,
    {
        let mut operation = operation;
        let mut polls: u32 = 0;

        while operation.state == OperationState::InProgress {
            if let Some(source) = ctx.err() {
                return Err(cancelled(source, operation));
            }

            let next = match accessor.get_operation(ctx, &operation.operation_id).await {
                Ok(next) => next,
                Err(ClientError::Context(source)) => return Err(cancelled(source, operation)),
                Err(source) => {
                    return Err(OperationError::Fetch {
                        source,
                        operation: Box::new(operation),
                    });
                }
            };
            polls += 1;
            debug!(
                operation_id = %next.operation_id,
                state = %next.state,
                polls,
                "fetched operation snapshot"
            );
            operation = next;

            if operation.state == OperationState::InProgress {
                if let Err(source) = ctx.sleep(self.interval).await {
                    return Err(cancelled(source, operation));
                }
            }
        }

        finish(operation)
    }

    /// Poll `operation` until it is terminal and decode its result as `T`.
    pub async fn await_operation_and_resolve<T, A>(
        &self,
        ctx: &Context,
        operation: Operation,
        accessor: &A,
    ) -> OperationResult<(T, Operation)>
    where
        T: DeserializeOwned,
        A: OperationAccessor + ?Sized,
    {
        let operation = self.await_operation(ctx, operation, accessor).await?;
        let payload = operation.result.clone().unwrap_or(Value::Null);
        match serde_json::from_value(payload) {
            Ok(value) => Ok((value, operation)),
            Err(source) => Err(OperationError::Decode {
                source,
                operation: Box::new(operation),
            }),
        }
    }
}

/// Poll `operation` until it is terminal, using the default interval.
pub async fn await_operation<A>(
    ctx: &Context,
    operation: Operation,
    accessor: &A,
) -> OperationResult<Operation>
where
    A: OperationAccessor + ?Sized,
{
    OperationPoller::default()
        .await_operation(ctx, operation, accessor)
        .await
}

/// Poll `operation` until it is terminal and decode its result as `T`, using
/// the default interval.
pub async fn await_operation_and_resolve<T, A>(
    ctx: &Context,
    operation: Operation,
    accessor: &A,
) -> OperationResult<(T, Operation)>
where
    T: DeserializeOwned,
    A: OperationAccessor + ?Sized,
{
    OperationPoller::default()
        .await_operation_and_resolve(ctx, operation, accessor)
        .await
}

fn cancelled(source: nimbus_core::ContextError, operation: Operation) -> OperationError {
    OperationError::Cancelled {
        source,
        operation: Box::new(operation),
    }
}

fn finish(operation: Operation) -> OperationResult<Operation> {
    match &operation.state {
        OperationState::Succeeded => {
            info!(operation_id = %operation.operation_id, "operation succeeded");
            Ok(operation)
        }
        OperationState::Failed => {
            let envelope = operation
                .result
                .clone()
                .and_then(|result| serde_json::from_value::<ErrorEnvelope>(result).ok());
            info!(
                operation_id = %operation.operation_id,
                code = envelope.as_ref().map_or("", |e| e.code.as_str()),
                "operation failed"
            );
            Err(match envelope {
                Some(ErrorEnvelope { code, message }) => OperationError::Failed {
                    code,
                    message,
                    operation: Box::new(operation),
                },
                None => OperationError::ResultUnavailable {
                    operation: Box::new(operation),
                },
            })
        }
        state => {
            info!(
                operation_id = %operation.operation_id,
                %state,
                "operation finished in unexpected state"
            );
            Err(OperationError::UnexpectedState {
                operation: Box::new(operation),
            })
        }
    }
}
