//! Reasoning Loop
//!
//! ReAct (Reason + Act) agent. The model either answers or asks for a tool
//! with a fenced ```` ```tool ```` JSON block; tool output is fed back and
//! the loop continues until a plain answer or the iteration cap.

use async_trait::async_trait;
use std::sync::Arc;

use crate::agent::{AgentInvocation, AgentReply, ConversationalAgent};
use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::tool::{ToolCall, ToolResult, ToolSet};

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Maximum reasoning iterations before giving up
    pub max_iterations: usize,

    pub generation: GenerationOptions,

    /// Whether to append tool descriptions to the system prompt
    pub inject_tool_descriptions: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            generation: GenerationOptions::default(),
            inject_tool_descriptions: true,
        }
    }
}

const TOOL_PROTOCOL: &str = r#"When you need to use a tool, respond with a JSON block in this exact format:
```tool
{"tool": "tool_name", "arguments": {"arg1": "value1"}}
```

After receiving tool results, synthesize them into a helpful response.
If you can answer directly without tools, do so."#;

/// LLM-backed conversational agent
pub struct ReasoningAgent {
    provider: Arc<dyn LlmProvider>,
    config: AgentConfig,
}

impl ReasoningAgent {
    pub fn new(provider: Arc<dyn LlmProvider>, config: AgentConfig) -> Self {
        Self { provider, config }
    }

    pub fn with_defaults(provider: Arc<dyn LlmProvider>) -> Self {
        Self::new(provider, AgentConfig::default())
    }

    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn build_system_prompt(&self, base: &str, tools: &ToolSet) -> String {
        let mut prompt = base.to_string();

        if self.config.inject_tool_descriptions && !tools.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(TOOL_PROTOCOL);
            prompt.push_str("\n\n");
            prompt.push_str(&tools.generate_prompt_section());
        }

        prompt
    }

    /// Drive the loop until the model produces a final answer
    pub async fn run(&self, conversation: &mut Conversation, tools: &ToolSet) -> Result<String> {
        for iteration in 1..=self.config.max_iterations {
            let completion = self
                .provider
                .complete(conversation.messages(), &self.config.generation)
                .await?;

            let content = completion.content;
            conversation.push(Message::assistant(&content));

            let Some(call) = parse_tool_call(&content) else {
                tracing::debug!(iteration, "Agent produced final answer");
                return Ok(content);
            };

            tracing::debug!(tool = %call.name, iteration, "Executing tool");
            let result = execute_tool(tools, &call).await;
            conversation.push(Message::tool(format_tool_result(&result), call.id.clone()));
        }

        Err(AgentError::MaxIterations(self.config.max_iterations))
    }
}

#[async_trait]
impl ConversationalAgent for ReasoningAgent {
    async fn invoke(&self, invocation: AgentInvocation) -> Result<AgentReply> {
        let AgentInvocation {
            system_prompt,
            tools,
            session: handle,
            query,
        } = invocation;

        let mut session = handle.load_or_create().await?;

        let mut conversation = Conversation::new();
        conversation.push(Message::system(self.build_system_prompt(&system_prompt, &tools)));
        for message in session.conversation.messages() {
            conversation.push(message.clone());
        }
        conversation.push(Message::user(&query));
        conversation.truncate_to_fit();

        tracing::debug!(
            session_id = %handle.id(),
            history = session.message_count(),
            tools = tools.len(),
            "Invoking agent"
        );

        let answer = self.run(&mut conversation, &tools).await?;

        session.conversation.push(Message::user(query));
        session.conversation.push(Message::assistant(&answer));
        session.touch();
        handle.save(&session).await?;

        Ok(AgentReply::from_text(answer))
    }
}

/// Parse a tool call from an LLM response
fn parse_tool_call(content: &str) -> Option<ToolCall> {
    const TOOL_START: &str = "```tool";
    const TOOL_END: &str = "```";

    if let Some(start_idx) = content.find(TOOL_START) {
        let after_marker = &content[start_idx + TOOL_START.len()..];
        if let Some(end_idx) = after_marker.find(TOOL_END) {
            let json_str = after_marker[..end_idx].trim();
            if let Ok(call) = serde_json::from_str::<ToolCall>(json_str) {
                return Some(with_call_id(call));
            }
        }
    }

    parse_inline_tool_call(content).map(with_call_id)
}

/// Bare JSON object with a "tool" key, no fence
fn parse_inline_tool_call(content: &str) -> Option<ToolCall> {
    if !content.contains(r#""tool""#) {
        return None;
    }

    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }

    serde_json::from_str::<ToolCall>(&content[start..=end]).ok()
}

fn with_call_id(mut call: ToolCall) -> ToolCall {
    if call.id.is_none() {
        call.id = Some(uuid::Uuid::new_v4().to_string());
    }
    call
}

/// Tool failures become failed results the model can read
async fn execute_tool(tools: &ToolSet, call: &ToolCall) -> ToolResult {
    match tools.execute(call).await {
        Ok(mut result) => {
            result.id.clone_from(&call.id);
            result
        }
        Err(e) => {
            tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
            let mut result = ToolResult::failure(&call.name, format!("Error: {e}"));
            result.id.clone_from(&call.id);
            result
        }
    }
}

fn format_tool_result(result: &ToolResult) -> String {
    if result.success {
        format!("[Tool '{}' returned]\n{}", result.name, result.output)
    } else {
        format!("[Tool '{}' failed]\n{}", result.name, result.output)
    }
}
