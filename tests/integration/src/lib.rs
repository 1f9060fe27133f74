//! End-to-end tests for the Nimbus client.
//!
//! Each test starts an in-process HTTP server on a free localhost port. The
//! server verifies every request's signature with `nimbus_auth::verify_request`
//! (answering `401` on failure), records what it received, and answers through
//! a per-test handler. The client side is the real stack: reqwest transport,
//! signing, retries and operation polling.
//!
//! ```text
//! cargo test -p nimbus-integration
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use nimbus_auth::{AuthError, Credential, Signer, StaticCredentialProvider, verify_request};
use nimbus_client::{
    ApiClient, AuthenticatingTransport, ReqwestTransport, RetryConfig, RetryingClient,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Access key id the test server accepts.
pub const KEY_ID: &str = "integration-key";

/// Secret for [`KEY_ID`]: base64url("integration-secret").
pub const SECRET: &str = "aW50ZWdyYXRpb24tc2VjcmV0";

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A request as the server saw it.
#[derive(Debug, Clone)]
pub struct Received {
    /// Request method.
    pub method: http::Method,
    /// Origin-form request target (path and query).
    pub target: String,
    /// Request headers.
    pub headers: http::HeaderMap,
    /// Request body.
    pub body: Bytes,
    /// Outcome of signature verification.
    pub verified: Result<String, AuthError>,
}

type Handler = dyn Fn(&Received, usize) -> http::Response<Bytes> + Send + Sync;

struct ServerState {
    handler: Box<Handler>,
    provider: StaticCredentialProvider,
    received: Mutex<Vec<Received>>,
}

impl ServerState {
    async fn handle(
        &self,
        request: http::Request<Incoming>,
    ) -> Result<http::Response<Full<Bytes>>, Infallible> {
        let (parts, body) = request.into_parts();
        let body = body
            .collect()
            .await
            .map(http_body_util::Collected::to_bytes)
            .unwrap_or_default();

        let received = Received {
            method: parts.method.clone(),
            target: parts
                .uri
                .path_and_query()
                .map_or_else(|| parts.uri.path().to_owned(), ToString::to_string),
            headers: parts.headers.clone(),
            body,
            verified: verify_request(&parts, &self.provider),
        };
        let index = {
            let mut all = self.received.lock().unwrap();
            all.push(received.clone());
            all.len() - 1
        };

        debug!(
            index,
            method = %received.method,
            target = %received.target,
            "test server received request"
        );

        let response = match &received.verified {
            Ok(_) => (self.handler)(&received, index),
            Err(err) => {
                warn!(index, error = %err, "test server rejected signature");
                json(
                    StatusCode::UNAUTHORIZED,
                    &serde_json::json!({
                        "code": "unauthenticated",
                        "message": format!("rpc error: code = Unauthenticated desc = {err}"),
                    }),
                )
            }
        };
        Ok(response.map(Full::new))
    }
}

/// An in-process server that verifies signatures.
pub struct TestServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for TestServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestServer").field("addr", &self.addr).finish()
    }
}

impl TestServer {
    /// Start a server answering verified requests with `handler`, which also
    /// receives the zero-based index of the request.
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&Received, usize) -> http::Response<Bytes> + Send + Sync + 'static,
    {
        init_tracing();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test server");
        let addr = listener.local_addr().expect("listener has an address");
        let state = Arc::new(ServerState {
            handler: Box::new(handler),
            provider: StaticCredentialProvider::new(vec![(KEY_ID.to_owned(), SECRET.to_owned())]),
            received: Mutex::new(Vec::new()),
        });

        let task = tokio::spawn({
            let state = Arc::clone(&state);
            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let state = Arc::clone(&state);
                    tokio::spawn(async move {
                        let service = service_fn(move |request| {
                            let state = Arc::clone(&state);
                            async move { state.handle(request).await }
                        });
                        let _ = http1::Builder::new()
                            .serve_connection(TokioIo::new(stream), service)
                            .await;
                    });
                }
            }
        });

        Self { addr, state, task }
    }

    /// Base URL of the server's API.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Every request received so far.
    #[must_use]
    pub fn received(&self) -> Vec<Received> {
        self.state.received.lock().unwrap().clone()
    }

    /// Number of requests received so far.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.state.received.lock().unwrap().len()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A JSON response.
#[must_use]
pub fn json(status: StatusCode, body: &serde_json::Value) -> http::Response<Bytes> {
    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Bytes::from(body.to_string()))
        .expect("valid response")
}

/// An empty response with the given status.
#[must_use]
pub fn status(status: StatusCode) -> http::Response<Bytes> {
    http::Response::builder()
        .status(status)
        .body(Bytes::new())
        .expect("valid response")
}

/// Fast retry settings for tests.
#[must_use]
pub fn test_retry_config() -> RetryConfig {
    RetryConfig {
        max_retries: 2,
        wait_min: Duration::from_millis(10),
        wait_max: Duration::from_millis(50),
    }
}

/// A client for `server` signing with `secret`.
#[must_use]
pub fn api_client_with_secret(server: &TestServer, secret: &str) -> ApiClient {
    let http = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("failed to build reqwest client");
    let transport = AuthenticatingTransport::new(
        ReqwestTransport::from_client(http),
        Signer::new(Credential::new(KEY_ID, secret)),
    );
    ApiClient::new(
        server.url(),
        RetryingClient::new(transport, test_retry_config()),
    )
}

/// A correctly configured client for `server`.
#[must_use]
pub fn api_client(server: &TestServer) -> ApiClient {
    api_client_with_secret(server, SECRET)
}

mod test_retry;
mod test_signing;
