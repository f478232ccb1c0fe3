//! HTTP Handlers

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::ACCEPT},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;

use ops_core::{
    AgentError, AgentInvocation, ErrorKind, Result, SessionHandle, SessionId, ToolSet, with_tools,
};

use crate::negotiate::ResponseFormat;
use crate::state::{AppState, Tooling};

const QUERY_NOT_PROVIDED: &str = "Query not provided";

// ============================================================================
// Request / Response Types
// ============================================================================

/// Body of `POST /ask`
#[derive(Debug, PartialEq, Eq)]
pub struct AskRequest {
    /// `None` when absent, not a string, or the body is not a JSON object
    pub query: Option<String>,
    pub session_id: String,
}

impl AskRequest {
    /// Lenient parse; any malformed body yields a request without a query
    pub fn parse(body: &[u8]) -> Self {
        let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
        let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);

        Self {
            query: field("query"),
            session_id: field("session_id").unwrap_or_else(|| SessionId::DEFAULT.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model_connected: bool,
    pub tool_sources: Vec<String>,
    pub discovery: &'static str,
}

fn error_response(err: &AgentError) -> Response {
    let status = match err.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Connectivity | ErrorKind::UpstreamAgent => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// `/ask` and `/health`, without static hosting or middleware
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ask", post(ask))
        .with_state(state)
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let model_connected = match &state.provider {
        Some(provider) => provider.health_check().await.unwrap_or(false),
        None => false,
    };

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        model_connected,
        tool_sources: state
            .config
            .source_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        discovery: state.config.discovery.as_str(),
    })
}

/// Answer one question
pub async fn ask(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let request = AskRequest::parse(&body);
    tracing::info!(
        %request_id,
        query = request.query.as_deref().unwrap_or_default(),
        session_id = %request.session_id,
        "Received ask request"
    );

    let format = ResponseFormat::from_accept(headers.get(ACCEPT).and_then(|v| v.to_str().ok()));

    // Detached from the connection: a client hanging up must not cut the
    // tool source scope short.
    let span = tracing::info_span!("ask", %request_id);
    let outcome = tokio::spawn(answer(state, request).instrument(span))
        .await
        .unwrap_or_else(|err| {
            Err(AgentError::UpstreamAgent(format!(
                "request task failed: {err}"
            )))
        });

    match outcome {
        Ok(text) => format.render(&text),
        Err(err) => {
            tracing::error!(%request_id, error = %err, "Ask failed");
            error_response(&err)
        }
    }
}

async fn answer(state: AppState, request: AskRequest) -> Result<String> {
    let query = request
        .query
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AgentError::Validation(QUERY_NOT_PROVIDED.into()))?;

    let session = SessionHandle::new(
        SessionId::from_string(request.session_id),
        state.sessions.clone(),
    );

    match &state.tooling {
        Tooling::PerRequest(sources) => {
            with_tools(sources, |tools| invoke_agent(&state, tools, session, query)).await
        }
        Tooling::Cached(tools) => invoke_agent(&state, tools.clone(), session, query).await,
    }
}

async fn invoke_agent(
    state: &AppState,
    tools: ToolSet,
    session: SessionHandle,
    query: String,
) -> Result<String> {
    tracing::debug!(tools = tools.len(), session = %session.id(), "Invoking agent");

    let invocation = AgentInvocation {
        system_prompt: state.system_prompt.to_string(),
        tools,
        session,
        query,
    };

    let reply = state.agent.invoke(invocation).await.map_err(|err| match err {
        // nothing past validation may surface as a client error
        AgentError::Validation(msg) => AgentError::UpstreamAgent(msg),
        other => other,
    })?;

    Ok(reply.text()?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header::CONTENT_TYPE};
    use ops_core::agent::{ContentBlock, ReplyMessage};
    use ops_core::{
        AgentReply, ConversationalAgent, MemorySessionStore, SessionStore, SourceConnection, Tool,
        ToolCall, ToolResult, ToolSchema, ToolSource,
    };
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tower::ServiceExt;

    use crate::config::{DiscoveryMode, ServerConfig};

    type Log = Arc<Mutex<Vec<String>>>;

    const ANSWER: &str = "This is a test response from the agent";

    // ------------------------------------------------------------------
    // Fakes
    // ------------------------------------------------------------------

    struct Named(&'static str);

    #[async_trait]
    impl Tool for Named {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: self.0.into(),
                ..Default::default()
            }
        }

        async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
            Ok(ToolResult::success(&call.name, "ok"))
        }
    }

    struct FakeSource {
        name: &'static str,
        tools: Vec<&'static str>,
        fail_connect: bool,
        log: Log,
    }

    struct FakeConnection {
        name: &'static str,
        tools: Vec<&'static str>,
        log: Log,
    }

    #[async_trait]
    impl ToolSource for FakeSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn connect(&self) -> Result<Box<dyn SourceConnection>> {
            if self.fail_connect {
                self.log.lock().unwrap().push(format!("fail {}", self.name));
                return Err(AgentError::connectivity(self.name, "connection refused"));
            }
            self.log.lock().unwrap().push(format!("open {}", self.name));
            Ok(Box::new(FakeConnection {
                name: self.name,
                tools: self.tools.clone(),
                log: self.log.clone(),
            }))
        }
    }

    #[async_trait]
    impl SourceConnection for FakeConnection {
        fn source_name(&self) -> &str {
            self.name
        }

        async fn list_tools(&self) -> Result<Vec<Arc<dyn Tool>>> {
            Ok(self
                .tools
                .iter()
                .map(|t| Arc::new(Named(*t)) as Arc<dyn Tool>)
                .collect())
        }

        async fn close(&self) -> Result<()> {
            self.log.lock().unwrap().push(format!("close {}", self.name));
            Ok(())
        }
    }

    /// Records what it was invoked with and answers with a fixed reply
    struct FakeAgent {
        reply: AgentReply,
        calls: Arc<Mutex<Vec<(String, Vec<String>, String)>>>,
    }

    #[async_trait]
    impl ConversationalAgent for FakeAgent {
        async fn invoke(&self, invocation: AgentInvocation) -> Result<AgentReply> {
            self.calls.lock().unwrap().push((
                invocation.session.id().to_string(),
                invocation.tools.names().iter().map(|n| (*n).to_string()).collect(),
                invocation.query.clone(),
            ));
            Ok(self.reply.clone())
        }
    }

    struct Harness {
        state: AppState,
        log: Log,
        calls: Arc<Mutex<Vec<(String, Vec<String>, String)>>>,
    }

    fn harness(reply: AgentReply, fail_source: Option<&'static str>) -> Harness {
        let log: Log = Arc::default();
        let specs = [
            ("cmms", vec!["get_work_orders"]),
            ("erp", vec!["get_inventory", "get_production_orders"]),
            ("mes", vec!["get_production_lines", "get_production_orders"]),
            ("wpms", vec!["get_employees"]),
        ];
        let sources: Vec<Arc<dyn ToolSource>> = specs
            .into_iter()
            .map(|(name, tools)| {
                Arc::new(FakeSource {
                    name,
                    tools,
                    fail_connect: fail_source == Some(name),
                    log: log.clone(),
                }) as Arc<dyn ToolSource>
            })
            .collect();

        let calls = Arc::default();
        let agent = FakeAgent {
            reply,
            calls: Arc::clone(&calls),
        };

        let state = AppState {
            config: Arc::new(ServerConfig::default()),
            agent: Arc::new(agent),
            provider: None,
            tooling: Tooling::PerRequest(sources.into()),
            sessions: Arc::new(MemorySessionStore::new()),
            system_prompt: Arc::from("You are a test assistant."),
        };

        Harness { state, log, calls }
    }

    async fn post_ask(
        state: AppState,
        body: Value,
        accept: Option<&str>,
    ) -> (StatusCode, Option<String>, Vec<u8>) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/ask")
            .header(CONTENT_TYPE, "application/json");
        if let Some(accept) = accept {
            builder = builder.header(ACCEPT, accept);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();

        let response = api_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, body.to_vec())
    }

    // ------------------------------------------------------------------
    // Request parsing
    // ------------------------------------------------------------------

    #[test]
    fn test_parse_request() {
        let req = AskRequest::parse(br#"{"query":"status of line 1"}"#);
        assert_eq!(req.query.as_deref(), Some("status of line 1"));
        assert_eq!(req.session_id, "default");

        let req = AskRequest::parse(br#"{"query":42,"session_id":null}"#);
        assert_eq!(req.query, None);
        assert_eq!(req.session_id, "default");

        let req = AskRequest::parse(b"not json");
        assert_eq!(req.query, None);

        let req = AskRequest::parse(br#"{"query":"q","session_id":""}"#);
        assert_eq!(req.session_id, "");
    }

    // ------------------------------------------------------------------
    // /ask
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_json_response_without_accept() {
        let h = harness(AgentReply::from_text(ANSWER), None);
        let (status, content_type, body) = post_ask(
            h.state,
            json!({"query": "test query", "session_id": "test_session"}),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({"response": ANSWER}));

        let calls = h.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "test_session");
        assert_eq!(calls[0].2, "test query");
    }

    #[tokio::test]
    async fn test_json_response_when_requested() {
        let h = harness(AgentReply::from_text(ANSWER), None);
        let (status, content_type, body) =
            post_ask(h.state, json!({"query": "test query"}), Some("application/json")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["response"], ANSWER);
    }

    #[tokio::test]
    async fn test_event_stream_response() {
        let h = harness(AgentReply::from_text(ANSWER), None);
        let (status, content_type, body) = post_ask(
            h.state,
            json!({"query": "test query", "session_id": "test_session"}),
            Some("text/event-stream"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("text/event-stream; charset=utf-8"));
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "data: This is a test response from the agent\n\n"
        );
    }

    #[tokio::test]
    async fn test_missing_query_rejected_before_any_work() {
        for body in [
            json!({"session_id": "test_session"}),
            json!({"query": "", "session_id": "test_session"}),
            json!({"query": null}),
            json!(["query"]),
        ] {
            let h = harness(AgentReply::from_text(ANSWER), None);
            let (status, _, bytes) = post_ask(h.state, body, None).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            let value: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(value, json!({"error": "Query not provided"}));
            assert!(h.log.lock().unwrap().is_empty());
            assert!(h.calls.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_missing_session_behaves_as_default() {
        let h = harness(AgentReply::from_text(ANSWER), None);
        let (_, _, without) = post_ask(h.state.clone(), json!({"query": "q"}), None).await;
        let (_, _, with) =
            post_ask(h.state, json!({"query": "q", "session_id": "default"}), None).await;

        assert_eq!(without, with);
        let calls = h.calls.lock().unwrap();
        assert_eq!(calls[0].0, "default");
        assert_eq!(calls[1].0, "default");
    }

    #[tokio::test]
    async fn test_sources_opened_in_order_and_closed_in_reverse() {
        let h = harness(AgentReply::from_text(ANSWER), None);
        let (status, _, _) = post_ask(h.state, json!({"query": "q"}), None).await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(
            *h.log.lock().unwrap(),
            vec![
                "open cmms",
                "open erp",
                "open mes",
                "open wpms",
                "close wpms",
                "close mes",
                "close erp",
                "close cmms",
            ]
        );

        // erp's get_production_orders wins over mes's
        let calls = h.calls.lock().unwrap();
        assert_eq!(
            calls[0].1,
            vec![
                "get_work_orders",
                "get_inventory",
                "get_production_orders",
                "get_production_lines",
                "get_employees",
            ]
        );
    }

    #[tokio::test]
    async fn test_connect_failure_is_500_and_releases_opened() {
        let h = harness(AgentReply::from_text(ANSWER), Some("mes"));
        let (status, _, body) = post_ask(h.state, json!({"query": "q"}), None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let value: Value = serde_json::from_slice(&body).unwrap();
        let message = value["error"].as_str().unwrap();
        assert!(!message.is_empty());
        assert!(message.contains("mes"));

        assert_eq!(
            *h.log.lock().unwrap(),
            vec!["open cmms", "open erp", "fail mes", "close erp", "close cmms"]
        );
        assert!(h.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_reply_is_500() {
        let reply = AgentReply {
            message: ReplyMessage {
                role: "assistant".into(),
                content: vec![
                    ContentBlock::Text { text: "one".into() },
                    ContentBlock::Text { text: "two".into() },
                ],
            },
        };
        let h = harness(reply, None);
        let (status, _, body) = post_ask(h.state, json!({"query": "q"}), None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert!(value["error"].as_str().unwrap().contains("segments"));
        assert_eq!(h.log.lock().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_cached_tooling_skips_sources() {
        let mut h = harness(AgentReply::from_text(ANSWER), Some("cmms"));
        let mut tools = ToolSet::new();
        tools.register(Named("get_line_status"));
        h.state.tooling = Tooling::Cached(tools);

        let (status, _, _) = post_ask(h.state, json!({"query": "q"}), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(h.log.lock().unwrap().is_empty());
        assert_eq!(h.calls.lock().unwrap()[0].1, vec!["get_line_status"]);
    }

    // ------------------------------------------------------------------
    // /health
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_health() {
        let mut h = harness(AgentReply::from_text(ANSWER), None);
        h.state.config = Arc::new(ServerConfig {
            discovery: DiscoveryMode::PerProcess,
            ..Default::default()
        });

        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = api_router(h.state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "healthy");
        assert_eq!(value["model_connected"], false);
        assert_eq!(value["tool_sources"], json!(["cmms", "erp", "mes", "wpms"]));
        assert_eq!(value["discovery"], "per-process");
    }

    #[tokio::test]
    async fn test_failed_agent_keeps_session_untouched() {
        struct Failing;

        #[async_trait]
        impl ConversationalAgent for Failing {
            async fn invoke(&self, _invocation: AgentInvocation) -> Result<AgentReply> {
                Err(AgentError::Provider("model offline".into()))
            }
        }

        let mut h = harness(AgentReply::from_text(ANSWER), None);
        let store = Arc::new(MemorySessionStore::new());
        h.state.sessions = store.clone() as Arc<dyn SessionStore>;
        h.state.agent = Arc::new(Failing);

        let (status, _, body) =
            post_ask(h.state, json!({"query": "q", "session_id": "s1"}), None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Provider error: model offline");
        assert!(store.load(&SessionId::from_string("s1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_abandoned_request_runs_to_completion() {
        struct Slow(Arc<Mutex<bool>>);

        #[async_trait]
        impl ConversationalAgent for Slow {
            async fn invoke(&self, _invocation: AgentInvocation) -> Result<AgentReply> {
                tokio::time::sleep(Duration::from_millis(100)).await;
                *self.0.lock().unwrap() = true;
                Ok(AgentReply::from_text(ANSWER))
            }
        }

        let mut h = harness(AgentReply::from_text(ANSWER), None);
        let finished = Arc::new(Mutex::new(false));
        h.state.agent = Arc::new(Slow(Arc::clone(&finished)));

        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            post_ask(h.state, json!({"query": "q"}), None),
        )
        .await;
        assert!(abandoned.is_err());

        for _ in 0..100 {
            if h.log.lock().unwrap().len() == 8 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(*finished.lock().unwrap());
        assert_eq!(
            h.log.lock().unwrap()[4..],
            ["close wpms", "close mes", "close erp", "close cmms"]
        );
    }
}
