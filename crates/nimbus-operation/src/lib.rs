//! Polling and result decoding for asynchronous Nimbus operations.
//!
//! Mutating API calls answer with an [`Operation`] handle rather than the
//! finished resource. [`await_operation`] re-fetches the handle through an
//! [`OperationAccessor`] until it leaves `IN_PROGRESS`;
//! [`await_operation_and_resolve`] additionally decodes the result into a
//! caller-chosen type.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use nimbus_client::ApiClient;
//! use nimbus_core::{Context, NimbusConfig};
//! use nimbus_operation::{HttpOperationAccessor, Operation, await_operation_and_resolve};
//!
//! # async fn run(operation: Operation) -> Result<(), Box<dyn std::error::Error>> {
//! let api = Arc::new(ApiClient::from_config(&NimbusConfig::from_env())?);
//! let accessor = HttpOperationAccessor::new(api, "/projects/p1/vms/operations/{operation_id}");
//! let (vm, _operation): (serde_json::Value, _) =
//!     await_operation_and_resolve(&Context::background(), operation, &accessor).await?;
//! println!("{vm}");
//! # Ok(())
//! # }
//! ```

pub mod accessor;
pub mod error;
pub mod model;
pub mod poller;

pub use accessor::{HttpOperationAccessor, OPERATION_ID_PLACEHOLDER, OperationAccessor};
pub use error::{OperationError, OperationResult};
pub use model::{Operation, OperationState};
pub use poller::{
    DEFAULT_POLL_INTERVAL, OperationPoller, await_operation, await_operation_and_resolve,
};
