//! MCP Tool Source
//!
//! Client side of the Model Context Protocol over streamable HTTP. Each
//! connection is one MCP session:
//!
//! 1. `initialize`, remembering the `mcp-session-id` header
//! 2. `notifications/initialized`
//! 3. `tools/list` (following `nextCursor`) and `tools/call` on demand
//! 4. `DELETE` on the endpoint to end the session
//!
//! Servers may answer a request with plain JSON or with an SSE body; both
//! are accepted.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use ops_core::{
    AgentError, Result, SourceConnection, Tool, ToolCall, ToolResult, ToolSchema, ToolSource,
};

pub const PROTOCOL_VERSION: &str = "2025-06-18";
pub const SESSION_HEADER: &str = "mcp-session-id";

#[derive(Debug, Error)]
pub enum McpError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("no JSON-RPC response in body")]
    EmptyResponse,
}

/// A tool source reached over MCP streamable HTTP
pub struct McpToolSource {
    name: String,
    url: String,
    http: reqwest::Client,
}

impl McpToolSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::with_client(name, url, reqwest::Client::new())
    }

    /// Share one HTTP client (and its connection pool) across sources
    pub fn with_client(
        name: impl Into<String>,
        url: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            http,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ToolSource for McpToolSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<Box<dyn SourceConnection>> {
        let session = McpSession::initialize(&self.name, &self.url, self.http.clone())
            .await
            .map_err(|e| AgentError::connectivity(&self.name, e))?;

        tracing::debug!(
            source = %self.name,
            session = session.session_id.as_deref().unwrap_or("-"),
            "MCP session established"
        );

        Ok(Box::new(McpConnection {
            session: Arc::new(session),
        }))
    }
}

struct McpSession {
    source: String,
    url: String,
    http: reqwest::Client,
    session_id: Option<String>,
    next_id: AtomicU64,
}

impl McpSession {
    async fn initialize(
        source: &str,
        url: &str,
        http: reqwest::Client,
    ) -> std::result::Result<Self, McpError> {
        let mut session = Self {
            source: source.to_string(),
            url: url.to_string(),
            http,
            session_id: None,
            next_id: AtomicU64::new(1),
        };

        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": {}
        });
        let payload = session.envelope("initialize", params);
        let response = session.post(&payload).await?;
        session.session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // The server holds a session from here on; end it if the handshake
        // does not complete.
        if let Err(err) = session.complete_handshake(response).await {
            if let Err(close_err) = session.terminate().await {
                tracing::warn!(
                    source = %session.source,
                    error = %close_err,
                    "Failed to end half-initialized MCP session"
                );
            }
            return Err(err);
        }

        Ok(session)
    }

    async fn complete_handshake(
        &self,
        response: reqwest::Response,
    ) -> std::result::Result<(), McpError> {
        decode_response(response).await?;
        self.notify("notifications/initialized", json!({})).await
    }

    fn envelope(&self, method: &str, params: Value) -> Value {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        })
    }

    async fn post(&self, payload: &Value) -> std::result::Result<reqwest::Response, McpError> {
        let mut request = self
            .http
            .post(&self.url)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(payload);
        if let Some(id) = &self.session_id {
            request = request.header(SESSION_HEADER, id);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Status { status, body });
        }
        Ok(response)
    }

    async fn request(&self, method: &str, params: Value) -> std::result::Result<Value, McpError> {
        tracing::trace!(source = %self.source, method, "MCP request");
        let payload = self.envelope(method, params);
        let response = self.post(&payload).await?;
        decode_response(response).await
    }

    async fn notify(&self, method: &str, params: Value) -> std::result::Result<(), McpError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        self.post(&payload).await?;
        Ok(())
    }

    async fn terminate(&self) -> std::result::Result<(), McpError> {
        let Some(id) = &self.session_id else {
            return Ok(());
        };

        let response = self
            .http
            .delete(&self.url)
            .header(SESSION_HEADER, id)
            .send()
            .await?;

        let status = response.status();
        // Servers without explicit session teardown answer 405
        if status.is_success() || status == StatusCode::METHOD_NOT_ALLOWED {
            Ok(())
        } else {
            Err(McpError::Status {
                status,
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}

async fn decode_response(response: reqwest::Response) -> std::result::Result<Value, McpError> {
    let is_event_stream = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/event-stream"));
    let body = response.text().await?;

    let message = if is_event_stream {
        parse_sse_message(&body)?
    } else {
        serde_json::from_str(&body)?
    };

    rpc_result(message)
}

/// First JSON-RPC response carried in an SSE body
fn parse_sse_message(body: &str) -> std::result::Result<Value, McpError> {
    for event in body.split("\n\n") {
        let data: Vec<&str> = event
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(str::trim_start)
            .collect();
        if data.is_empty() {
            continue;
        }

        let message: Value = serde_json::from_str(&data.join("\n"))?;
        if message.get("result").is_some() || message.get("error").is_some() {
            return Ok(message);
        }
    }

    Err(McpError::EmptyResponse)
}

fn rpc_result(message: Value) -> std::result::Result<Value, McpError> {
    if let Some(error) = message.get("error") {
        return Err(McpError::Rpc {
            code: error.get("code").and_then(Value::as_i64).unwrap_or(-32000),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }

    Ok(message.get("result").cloned().unwrap_or(Value::Null))
}

/// Tool schemas from one `tools/list` page, plus the next cursor
fn parse_tool_page(result: &Value) -> (Vec<ToolSchema>, Option<String>) {
    let tools = result
        .get("tools")
        .and_then(Value::as_array)
        .map(|tools| {
            tools
                .iter()
                .map(|tool| {
                    ToolSchema::from_input_schema(
                        tool.get("name").and_then(Value::as_str).unwrap_or_default(),
                        tool.get("description")
                            .and_then(Value::as_str)
                            .unwrap_or_default(),
                        tool.get("inputSchema").unwrap_or(&Value::Null),
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    let cursor = result
        .get("nextCursor")
        .and_then(Value::as_str)
        .map(str::to_string);

    (tools, cursor)
}

/// Join the text blocks of a `tools/call` result
fn call_output(result: &Value) -> String {
    result
        .get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

struct McpConnection {
    session: Arc<McpSession>,
}

#[async_trait]
impl SourceConnection for McpConnection {
    fn source_name(&self) -> &str {
        &self.session.source
    }

    async fn list_tools(&self) -> Result<Vec<Arc<dyn Tool>>> {
        let mut tools: Vec<Arc<dyn Tool>> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen_cursors = HashSet::new();

        loop {
            let params = cursor.as_ref().map_or_else(|| json!({}), |c| json!({ "cursor": c }));
            let result = self
                .session
                .request("tools/list", params)
                .await
                .map_err(|e| AgentError::connectivity(&self.session.source, e))?;

            let (schemas, next) = parse_tool_page(&result);
            for schema in schemas {
                let index = tools.len();
                tools.push(Arc::new(McpTool {
                    session: Arc::clone(&self.session),
                    schema,
                    index,
                }));
            }

            match next {
                Some(next) if seen_cursors.insert(next.clone()) => cursor = Some(next),
                Some(repeated) => {
                    tracing::warn!(
                        source = %self.session.source,
                        cursor = %repeated,
                        "tools/list cursor repeated, stopping pagination"
                    );
                    break;
                }
                None => break,
            }
        }

        Ok(tools)
    }

    async fn close(&self) -> Result<()> {
        self.session
            .terminate()
            .await
            .map_err(|e| AgentError::connectivity(&self.session.source, e))
    }
}

/// A tool living on an MCP server
struct McpTool {
    session: Arc<McpSession>,
    schema: ToolSchema,
    index: usize,
}

#[async_trait]
impl Tool for McpTool {
    fn schema(&self) -> ToolSchema {
        self.schema.clone()
    }

    fn label(&self) -> String {
        format!("{}:tool[{}]", self.session.source, self.index)
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let params = json!({
            "name": self.schema.name,
            "arguments": call.arguments,
        });

        let result = self
            .session
            .request("tools/call", params)
            .await
            .map_err(|e| AgentError::ToolExecution(format!("{}: {e}", self.session.source)))?;

        let output = call_output(&result);
        let is_error = result
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let mut tool_result = if is_error {
            ToolResult::failure(&self.schema.name, output)
        } else {
            ToolResult::success(&self.schema.name, output)
        };
        if let Some(data) = result.get("structuredContent") {
            tool_result = tool_result.with_data(data.clone());
        }
        Ok(tool_result)
    }
}
