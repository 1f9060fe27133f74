//! Fetching operation snapshots.
//!
//! The poller never talks HTTP itself; it goes through an
//! [`OperationAccessor`]. [`HttpOperationAccessor`] is the standard one, a
//! signed, retried `GET` against the resource's operations endpoint. Any
//! async closure `Fn(Context, String) -> Future<Output = Result<Operation, _>>`
//! is an accessor as well.

use std::future::Future;
use std::sync::Arc;

use nimbus_client::transport::BoxFuture;
use nimbus_client::{ApiClient, AuthenticatingTransport, ClientError, HttpSend, ReqwestTransport};
use nimbus_core::Context;

use crate::model::Operation;

/// Placeholder replaced by the operation id in accessor path templates.
pub const OPERATION_ID_PLACEHOLDER: &str = "{operation_id}";

/// Fetches a fresh snapshot of an operation.
pub trait OperationAccessor: Send + Sync {
    /// Fetch the current snapshot of `operation_id`.
    fn get_operation<'a>(
        &'a self,
        ctx: &'a Context,
        operation_id: &'a str,
    ) -> BoxFuture<'a, Result<Operation, ClientError>>;
}

impl<F, Fut> OperationAccessor for F
where
    F: Fn(Context, String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Operation, ClientError>> + Send + 'static,
{
    fn get_operation<'a>(
        &'a self,
        ctx: &'a Context,
        operation_id: &'a str,
    ) -> BoxFuture<'a, Result<Operation, ClientError>> {
        Box::pin(self(ctx.clone(), operation_id.to_owned()))
    }
}

/// Fetches snapshots with a `GET` on a path template.
///
/// The template names where the id goes, e.g.
/// `/projects/p1/compute/vms/instances/operations/{operation_id}`. A template
/// without the placeholder gets the id appended as a final segment.
#[derive(Debug)]
pub struct HttpOperationAccessor<S = AuthenticatingTransport<ReqwestTransport>> {
    api: Arc<ApiClient<S>>,
    path_template: String,
}

impl<S> Clone for HttpOperationAccessor<S> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            path_template: self.path_template.clone(),
        }
    }
}

impl<S: HttpSend> HttpOperationAccessor<S> {
    /// Create an accessor for operations under `path_template`.
    pub fn new(api: Arc<ApiClient<S>>, path_template: impl Into<String>) -> Self {
        Self {
            api,
            path_template: path_template.into(),
        }
    }

    /// The path a snapshot of `operation_id` is fetched from.
    #[must_use]
    pub fn path(&self, operation_id: &str) -> String {
        if self.path_template.contains(OPERATION_ID_PLACEHOLDER) {
            self.path_template
                .replace(OPERATION_ID_PLACEHOLDER, operation_id)
        } else {
            format!("{}/{operation_id}", self.path_template.trim_end_matches('/'))
        }
    }
}

impl<S: HttpSend> OperationAccessor for HttpOperationAccessor<S> {
    fn get_operation<'a>(
        &'a self,
        ctx: &'a Context,
        operation_id: &'a str,
    ) -> BoxFuture<'a, Result<Operation, ClientError>> {
        Box::pin(async move {
            let path = self.path(operation_id);
            self.api.get(ctx, &path).await
        })
    }
}
