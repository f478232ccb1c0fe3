//! Conversational Agent Boundary
//!
//! What the request handler hands to an agent, and the reply shape it
//! reads back. Only the single text segment of a reply is consumed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::session::SessionHandle;
use crate::tool::ToolSet;

/// One agent call
#[derive(Debug)]
pub struct AgentInvocation {
    pub system_prompt: String,
    pub tools: ToolSet,
    pub session: SessionHandle,
    pub query: String,
}

/// A content segment of an agent reply
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentBlock {
    Text { text: String },
    Other(Value),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplyMessage {
    #[serde(default = "assistant_role")]
    pub role: String,
    pub content: Vec<ContentBlock>,
}

fn assistant_role() -> String {
    "assistant".into()
}

/// `{message: {content: [{text}, ...]}}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    pub message: ReplyMessage,
}

impl AgentReply {
    /// Reply made of a single text segment
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            message: ReplyMessage {
                role: assistant_role(),
                content: vec![ContentBlock::Text { text: text.into() }],
            },
        }
    }

    /// Extract the answer text.
    ///
    /// Exactly one text segment is accepted. Empty, non-text and
    /// multi-segment replies are rejected rather than truncated.
    pub fn text(&self) -> Result<&str> {
        match self.message.content.as_slice() {
            [ContentBlock::Text { text }] => Ok(text),
            [] => Err(AgentError::UpstreamAgent("agent reply has no content".into())),
            [ContentBlock::Other(_)] => Err(AgentError::UpstreamAgent(
                "agent reply content is not text".into(),
            )),
            segments => Err(AgentError::UpstreamAgent(format!(
                "agent reply has {} content segments, expected one",
                segments.len()
            ))),
        }
    }
}

/// Anything that can answer a question given a prompt, tools and a session
#[async_trait]
pub trait ConversationalAgent: Send + Sync {
    async fn invoke(&self, invocation: AgentInvocation) -> Result<AgentReply>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_text_segment() {
        let reply = AgentReply::from_text("Line 2 is running at 94% OEE.");
        assert_eq!(reply.text().unwrap(), "Line 2 is running at 94% OEE.");
    }

    #[test]
    fn test_reply_wire_shape() {
        let reply: AgentReply = serde_json::from_value(json!({
            "message": {"content": [{"text": "This is a test response from the agent"}]}
        }))
        .unwrap();
        assert_eq!(reply.text().unwrap(), "This is a test response from the agent");

        let encoded = serde_json::to_value(AgentReply::from_text("hi")).unwrap();
        assert_eq!(encoded["message"]["content"][0]["text"], "hi");
    }

    #[test]
    fn test_malformed_replies_rejected() {
        let empty: AgentReply =
            serde_json::from_value(json!({"message": {"content": []}})).unwrap();
        assert!(matches!(empty.text(), Err(AgentError::UpstreamAgent(_))));

        let non_text: AgentReply = serde_json::from_value(json!({
            "message": {"content": [{"toolUse": {"name": "get_inventory"}}]}
        }))
        .unwrap();
        assert!(matches!(non_text.text(), Err(AgentError::UpstreamAgent(_))));

        let multi: AgentReply = serde_json::from_value(json!({
            "message": {"content": [{"text": "a"}, {"text": "b"}]}
        }))
        .unwrap();
        let err = multi.text().unwrap_err();
        assert!(err.to_string().contains("2 content segments"));
    }
}
