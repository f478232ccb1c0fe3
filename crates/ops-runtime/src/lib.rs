//! # ops-runtime
//!
//! Concrete collaborators for the operations assistant.
//!
//! - **Ollama** (default feature): local LLM inference behind `LlmProvider`
//! - **MCP**: tool sources reached over MCP streamable HTTP
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ops_runtime::{McpToolSource, OllamaProvider};
//!
//! let provider = Arc::new(OllamaProvider::from_env());
//! let cmms = McpToolSource::new("cmms", "http://127.0.0.1:8001/mcp");
//! ```

pub mod mcp;
#[cfg(feature = "ollama")]
pub mod ollama;

pub use mcp::McpToolSource;
#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};
