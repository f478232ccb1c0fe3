//! Application State

use std::sync::Arc;

use ops_core::{ConversationalAgent, LlmProvider, SessionStore, ToolSet, ToolSource};

use crate::config::ServerConfig;

/// Where the tools for a request come from
#[derive(Clone)]
pub enum Tooling {
    /// Sources opened, aggregated and closed around each request
    PerRequest(Arc<[Arc<dyn ToolSource>]>),
    /// Tool set discovered once at start-up
    Cached(ToolSet),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,

    /// Answers questions (reasoning loop over the LLM)
    pub agent: Arc<dyn ConversationalAgent>,

    /// Only used for health reporting; `None` reports disconnected
    pub provider: Option<Arc<dyn LlmProvider>>,

    pub tooling: Tooling,

    pub sessions: Arc<dyn SessionStore>,

    pub system_prompt: Arc<str>,
}
