//! API Client

use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

const FALLBACK_ORIGIN: &str = "http://127.0.0.1:5001";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Assistant => "Assistant",
        }
    }
}

/// Chat message for display
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: usize,
    pub role: Role,
    pub content: String,
    /// Local wall-clock time, `HH:MM`
    pub sent_at: String,
}

impl ChatMessage {
    pub fn new(id: usize, role: Role, content: impl Into<String>) -> Self {
        Self {
            id,
            role,
            content: content.into(),
            sent_at: chrono::Local::now().format("%H:%M").to_string(),
        }
    }
}

/// `{query, session_id?}`; a blank session id is left out
fn request_body(query: &str, session_id: Option<&str>) -> Value {
    let mut body = json!({ "query": query });
    if let Some(id) = session_id.map(str::trim).filter(|id| !id.is_empty()) {
        body["session_id"] = json!(id);
    }
    body
}

/// Answer text on success, the server's `error` message otherwise
fn read_answer(success: bool, data: &Value) -> Result<String, String> {
    if success {
        data["response"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| "Malformed response from server".to_string())
    } else {
        Err(data["error"]
            .as_str()
            .unwrap_or("Request failed")
            .to_string())
    }
}

/// Ask the assistant a question
pub async fn send_query(query: &str, session_id: Option<&str>) -> Result<String, String> {
    let origin = web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_else(|| FALLBACK_ORIGIN.into());

    let response = reqwest::Client::new()
        .post(format!("{origin}/ask"))
        .header(ACCEPT, "application/json")
        .json(&request_body(query, session_id))
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let success = response.status().is_success();
    let data: Value = response.json().await.unwrap_or_default();
    read_answer(success, &data)
}
