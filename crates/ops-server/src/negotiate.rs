//! Response Format Negotiation
//!
//! The answer is computed in full before either format is written; the
//! event-stream form is a single `data:` event.

use axum::Json;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

pub const EVENT_STREAM: &str = "text/event-stream";
pub const EVENT_STREAM_UTF8: &str = "text/event-stream; charset=utf-8";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    EventStream,
}

impl ResponseFormat {
    /// Event stream when the `Accept` value mentions `text/event-stream`,
    /// JSON for anything else including no header at all
    pub fn from_accept(accept: Option<&str>) -> Self {
        match accept {
            Some(value) if value.contains(EVENT_STREAM) => Self::EventStream,
            _ => Self::Json,
        }
    }

    pub fn render(self, text: &str) -> Response {
        match self {
            Self::Json => Json(json!({ "response": text })).into_response(),
            Self::EventStream => (
                [(header::CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM_UTF8))],
                sse_frame(text),
            )
                .into_response(),
        }
    }
}

/// One SSE event carrying `text` verbatim
pub fn sse_frame(text: &str) -> String {
    format!("data: {text}\n\n")
}
