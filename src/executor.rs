use std::error::Error as _;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::commands::CommandResult;
use crate::config::ServerConfig;

/// Failures that prevent a remote command from producing a result.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("request failed: {}", error_chain(.0))]
    Request(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid response from server: {0}")]
    Decode(#[from] serde_json::Error),
}

// reqwest keeps the cause (e.g. "connection refused") out of its own message.
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Longest part of a non-2xx body shown on the terminal.
const MAX_STATUS_BODY: usize = 200;

/// Readable detail for a rejected request: the backend's `output` when the
/// body is one of its JSON replies, otherwise the body cut to one short line.
fn status_detail(body: &str) -> String {
    if let Ok(ExecuteResponse { output: Some(output), .. }) = serde_json::from_str(body) {
        return output;
    }

    let body = body.trim();
    let first_line = body.lines().next().unwrap_or_default();
    let mut detail: String = first_line.chars().take(MAX_STATUS_BODY).collect();
    if detail.len() < body.len() {
        detail.push_str("...");
    }
    detail
}

/// Runs a command line somewhere other than the client.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &str) -> Result<CommandResult, ExecError>;
}

#[derive(Serialize)]
struct ExecuteRequest<'a> {
    command: &'a str,
}

#[derive(Deserialize)]
struct ExecuteResponse {
    // Only a literal `true` marks an error; null, absent or any other value
    // means the output is to be shown as-is.
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    output: Option<String>,
}

impl From<ExecuteResponse> for CommandResult {
    fn from(response: ExecuteResponse) -> Self {
        let text = response.output.unwrap_or_default();
        if response.error == Some(Value::Bool(true)) {
            CommandResult::error(text)
        } else {
            CommandResult::output(text)
        }
    }
}

/// Executor backed by the console backend's JSON endpoint.
#[derive(Clone)]
pub struct HttpExecutor {
    client: Client,
    endpoint: String,
}

impl HttpExecutor {
    pub fn new(base_url: &str, execute_path: &str) -> anyhow::Result<Self> {
        // No timeout: a slow command simply keeps its prompt pending.
        let client = ClientBuilder::new()
            .build()
            .context("Failed to create HTTP client")?;

        let endpoint = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            execute_path.trim_start_matches('/')
        );

        Ok(Self { client, endpoint })
    }

    pub fn from_config(server: &ServerConfig) -> anyhow::Result<Self> {
        Self::new(&server.base_url, &server.execute_path)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CommandExecutor for HttpExecutor {
    async fn execute(&self, command: &str) -> Result<CommandResult, ExecError> {
        debug!(endpoint = %self.endpoint, command, "sending command");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&ExecuteRequest { command })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(%status, command, "command endpoint rejected request");
            return Err(ExecError::Status { status, body: status_detail(&body) });
        }

        let parsed: ExecuteResponse = serde_json::from_str(&body)?;
        Ok(parsed.into())
    }
}
