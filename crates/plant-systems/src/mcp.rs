//! MCP Server
//!
//! Serves a [`ToolSet`] over MCP streamable HTTP on `/mcp`. Responses are
//! always plain JSON; sessions are tracked only so `DELETE` can end them.

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use ops_core::{AgentError, ToolCall, ToolSet};

pub const PROTOCOL_VERSION: &str = "2025-06-18";
pub const SESSION_HEADER: &str = "mcp-session-id";

const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

/// One plant system exposed as an MCP server
pub struct McpServer {
    name: String,
    tools: ToolSet,
    sessions: RwLock<HashSet<String>>,
}

impl McpServer {
    pub fn new(name: impl Into<String>, tools: ToolSet) -> Self {
        Self {
            name: name.into(),
            tools,
            sessions: RwLock::new(HashSet::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": {
                "name": self.name,
                "version": env!("CARGO_PKG_VERSION"),
            },
        })
    }

    fn list_tools(&self) -> Value {
        let tools: Vec<Value> = self
            .tools
            .schemas()
            .into_iter()
            .map(|schema| {
                json!({
                    "name": schema.name,
                    "description": schema.description,
                    "inputSchema": schema.input_schema(),
                })
            })
            .collect();
        json!({ "tools": tools })
    }

    async fn call_tool(&self, params: &Value) -> Result<Value, (i64, String)> {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return Err((INVALID_PARAMS, "tools/call requires a tool name".into()));
        };

        let mut call = ToolCall::new(name);
        if let Some(args) = params.get("arguments").and_then(Value::as_object) {
            call.arguments = args.clone().into_iter().collect();
        }

        let result = match self.tools.execute(&call).await {
            Ok(result) => result,
            Err(e @ (AgentError::ToolNotFound(_) | AgentError::ToolValidation(_))) => {
                return Err((INVALID_PARAMS, e.to_string()));
            }
            Err(e) => {
                tracing::warn!(server = %self.name, tool = name, error = %e, "Tool failed");
                return Ok(json!({
                    "content": [{ "type": "text", "text": e.to_string() }],
                    "isError": true,
                }));
            }
        };

        let mut body = json!({
            "content": [{ "type": "text", "text": result.output }],
            "isError": !result.success,
        });
        if let Some(data) = result.data {
            body["structuredContent"] = match data {
                Value::Object(map) => Value::Object(map),
                other => {
                    let mut map = Map::new();
                    map.insert("result".into(), other);
                    Value::Object(map)
                }
            };
        }
        Ok(body)
    }
}

/// Router exposing `POST /mcp` and `DELETE /mcp`
pub fn router(server: Arc<McpServer>) -> Router {
    Router::new()
        .route("/mcp", post(handle_post).delete(handle_delete))
        .with_state(server)
}

fn session_of(headers: &HeaderMap) -> Option<&str> {
    headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok())
}

fn rpc_error(id: Value, code: i64, message: impl Into<String>) -> Json<Value> {
    Json(json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message.into() },
    }))
}

async fn handle_post(
    State(server): State<Arc<McpServer>>,
    headers: HeaderMap,
    Json(message): Json<Value>,
) -> Response {
    let Some(method) = message.get("method").and_then(Value::as_str) else {
        return (
            StatusCode::BAD_REQUEST,
            rpc_error(Value::Null, INVALID_REQUEST, "missing method"),
        )
            .into_response();
    };

    // Notifications carry no id and get no body
    let Some(id) = message.get("id").cloned() else {
        tracing::trace!(server = %server.name, method, "Notification");
        return StatusCode::ACCEPTED.into_response();
    };

    if method == "initialize" {
        let session_id = uuid::Uuid::new_v4().to_string();
        server.sessions.write().await.insert(session_id.clone());
        tracing::debug!(server = %server.name, session = %session_id, "Session opened");

        let mut response = Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": server.initialize_result(),
        }))
        .into_response();
        if let Ok(value) = HeaderValue::from_str(&session_id) {
            response.headers_mut().insert(SESSION_HEADER, value);
        }
        return response;
    }

    let Some(session) = session_of(&headers) else {
        return (
            StatusCode::BAD_REQUEST,
            rpc_error(id, INVALID_REQUEST, "missing session header"),
        )
            .into_response();
    };
    let known = server.sessions.read().await.contains(session);
    if !known {
        return (
            StatusCode::NOT_FOUND,
            rpc_error(id, INVALID_REQUEST, "unknown session"),
        )
            .into_response();
    }

    let params = message.get("params").cloned().unwrap_or(Value::Null);
    let outcome = match method {
        "ping" => Ok(json!({})),
        "tools/list" => Ok(server.list_tools()),
        "tools/call" => server.call_tool(&params).await,
        other => Err((METHOD_NOT_FOUND, format!("method not found: {other}"))),
    };

    match outcome {
        Ok(result) => Json(json!({ "jsonrpc": "2.0", "id": id, "result": result })).into_response(),
        Err((code, msg)) => rpc_error(id, code, msg).into_response(),
    }
}

async fn handle_delete(State(server): State<Arc<McpServer>>, headers: HeaderMap) -> StatusCode {
    let Some(session) = session_of(&headers) else {
        return StatusCode::BAD_REQUEST;
    };

    if server.sessions.write().await.remove(session) {
        tracing::debug!(server = %server.name, session, "Session closed");
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}
