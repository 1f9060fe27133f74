//! Nimbus CLI - signed, retried calls against the Nimbus management API.
//!
//! # Usage
//!
//! ```text
//! nimbus get <path>
//! nimbus wait <operation-path-template> <operation-id>
//! ```
//!
//! `get` prints the JSON body of a signed `GET`. `wait` polls an operation
//! until it finishes and prints the final snapshot; the template must contain
//! `{operation_id}`, e.g. `/projects/p1/compute/vms/instances/operations/{operation_id}`.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `NIMBUS_API_ENDPOINT` | `https://api.nimbuscloud.io/v1alpha5` | API base URL |
//! | `NIMBUS_ACCESS_KEY_ID` | *(required)* | Access key id |
//! | `NIMBUS_SECRET_KEY` | *(required)* | Unpadded base64url secret |
//! | `NIMBUS_MAX_RETRIES` | `2` | Retries after the first attempt |
//! | `NIMBUS_RETRY_WAIT_MIN_MS` | `1000` | First back-off |
//! | `NIMBUS_RETRY_WAIT_MAX_MS` | `30000` | Back-off cap |
//! | `NIMBUS_POLL_INTERVAL_MS` | `2000` | Operation poll interval |
//! | `NIMBUS_REQUEST_TIMEOUT_SECS` | `60` | Per-attempt timeout |
//! | `NIMBUS_WAIT_TIMEOUT_SECS` | *(unset)* | Overall limit for `wait` |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use nimbus_client::{ApiClient, unpack_api_error};
use nimbus_core::{Context, NimbusConfig};
use nimbus_operation::{
    HttpOperationAccessor, Operation, OperationError, OperationPoller, OperationState,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage:
  nimbus get <path>
  nimbus wait <operation-path-template> <operation-id>";

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Get {
        path: String,
    },
    Wait {
        path_template: String,
        operation_id: String,
    },
    Help,
}

impl Command {
    fn parse(args: &[String]) -> Result<Self, String> {
        match args {
            [] => Err(USAGE.to_owned()),
            [flag] if flag == "-h" || flag == "--help" || flag == "help" => Ok(Self::Help),
            [cmd, path] if cmd == "get" => Ok(Self::Get { path: path.clone() }),
            [cmd, template, id] if cmd == "wait" => Ok(Self::Wait {
                path_template: template.clone(),
                operation_id: id.clone(),
            }),
            [cmd, ..] if cmd == "get" || cmd == "wait" => {
                Err(format!("wrong number of arguments for {cmd}\n{USAGE}"))
            }
            [cmd, ..] => Err(format!("unknown command: {cmd}\n{USAGE}")),
        }
    }
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
/// Logs go to stderr so stdout carries only JSON.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// A context that is cancelled on Ctrl-C.
fn cancel_on_interrupt() -> Context {
    let (ctx, handle) = Context::cancellable();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            handle.cancel();
        }
    });
    ctx
}

async fn get(api: &ApiClient, ctx: &Context, path: &str) -> Result<ExitCode> {
    match api.get::<serde_json::Value>(ctx, path).await {
        Ok(body) => {
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            error!(%path, error = %err, "request failed");
            eprintln!("error: {}", unpack_api_error(err));
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn wait(
    api: Arc<ApiClient>,
    ctx: &Context,
    poller: OperationPoller,
    path_template: &str,
    operation_id: &str,
) -> Result<ExitCode> {
    let accessor = HttpOperationAccessor::new(api, path_template);
    let operation = Operation::new(operation_id, OperationState::InProgress);
    info!(
        %operation_id,
        path = %accessor.path(operation_id),
        interval_ms = u64::try_from(poller.interval().as_millis()).unwrap_or(u64::MAX),
        "waiting for operation"
    );

    match poller.await_operation(ctx, operation, &accessor).await {
        Ok(operation) => {
            println!("{}", serde_json::to_string_pretty(&operation)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            let message = match &err {
                OperationError::Fetch { source, .. } => {
                    unpack_api_error(source.clone()).to_string()
                }
                other => other.to_string(),
            };
            let last = err.into_operation();
            if last.is_terminal() {
                println!("{}", serde_json::to_string_pretty(&last)?);
            }
            eprintln!("error: {message}");
            Ok(ExitCode::FAILURE)
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(Command::Help) => {
            println!("{USAGE}");
            return Ok(ExitCode::SUCCESS);
        }
        Ok(command) => command,
        Err(usage) => {
            eprintln!("{usage}");
            return Ok(ExitCode::from(2));
        }
    };

    let config = NimbusConfig::from_env();
    init_tracing(&config.log_level)?;
    config.validate().context("invalid configuration")?;

    let api = Arc::new(ApiClient::from_config(&config).context("failed to build API client")?);
    let ctx = cancel_on_interrupt();

    match command {
        Command::Get { path } => get(&api, &ctx, &path).await,
        Command::Wait {
            path_template,
            operation_id,
        } => {
            let ctx = match config.wait_timeout {
                Some(timeout) => ctx.with_timeout(timeout),
                None => ctx,
            };
            let poller = OperationPoller::from(&config);
            wait(api, &ctx, poller, &path_template, &operation_id).await
        }
        Command::Help => Ok(ExitCode::SUCCESS),
    }
}
