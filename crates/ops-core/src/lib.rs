//! # ops-core
//!
//! Core of the manufacturing operations assistant: tool aggregation across
//! tool sources, scoped source connections, sessions, and the agent that
//! answers questions with those tools.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────────────────┐
//! │ ToolSource × │──▶│ SourceScope  │──▶│ ToolSet (first-seen)  │
//! │ (cmms, erp…) │   │ open / close │   └──────────┬────────────┘
//! └──────────────┘   └──────────────┘              │
//!                                                  ▼
//!                 ┌──────────────┐   ┌───────────────────────┐
//!                 │ SessionStore │◀─▶│ ConversationalAgent   │
//!                 └──────────────┘   │ (ReasoningAgent + LLM)│
//!                                    └───────────────────────┘
//! ```

pub mod agent;
pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod session;
pub mod source;
pub mod tool;

pub use agent::{AgentInvocation, AgentReply, ConversationalAgent};
pub use error::{AgentError, ErrorKind, Result};
pub use message::{Message, Role};
pub use provider::LlmProvider;
pub use reasoning::{AgentConfig, ReasoningAgent};
pub use session::{
    FileSessionStore, MemorySessionStore, Session, SessionHandle, SessionId, SessionStore,
};
pub use source::{SourceConnection, SourceScope, ToolSource, with_tools};
pub use tool::{Tool, ToolCall, ToolResult, ToolSchema, ToolSet};
