//! Call context, configuration, and shared error types for the Nimbus client.
//!
//! This crate provides the pieces every other Nimbus crate depends on: the
//! [`Context`] that carries cancellation and deadlines through signed HTTP
//! calls and operation polling, and the environment-driven [`NimbusConfig`].

mod config;
mod context;
mod error;

pub use config::NimbusConfig;
pub use context::{CancelHandle, Context};
pub use error::{ContextError, NimbusError, NimbusResult};
