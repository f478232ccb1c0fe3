//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Coarse classification used at the HTTP boundary
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller input was missing or malformed; nothing downstream ran
    Validation,
    /// A tool source could not be reached or enumerated
    Connectivity,
    /// The conversational agent failed or replied with an unusable shape
    UpstreamAgent,
}

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Required request input missing or empty
    #[error("{0}")]
    Validation(String),

    /// Tool source unreachable, or its tool listing failed
    #[error("Tool source '{source_name}' unavailable: {message}")]
    Connectivity { source_name: String, message: String },

    /// Agent invocation failed or returned a malformed reply
    #[error("Agent error: {0}")]
    UpstreamAgent(String),

    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Tool not found in the tool set
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool validation failed
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Maximum iterations reached in reasoning loop
    #[error("Maximum iterations ({0}) reached")]
    MaxIterations(usize),

    /// Session error
    #[error("Session error: {0}")]
    Session(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Build a connectivity error for the named source
    pub fn connectivity(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::Connectivity {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// Classify for the request boundary.
    ///
    /// Everything that is neither a validation nor a connectivity failure
    /// happened while driving the agent and counts as an upstream failure.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Connectivity { .. } => ErrorKind::Connectivity,
            _ => ErrorKind::UpstreamAgent,
        }
    }

    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_) | Self::Connectivity { .. } | Self::Io(_)
        )
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            AgentError::Validation("Query not provided".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            AgentError::connectivity("cmms", "connection refused").kind(),
            ErrorKind::Connectivity
        );
        assert_eq!(AgentError::MaxIterations(3).kind(), ErrorKind::UpstreamAgent);
        assert_eq!(
            AgentError::UpstreamAgent("empty reply".into()).kind(),
            ErrorKind::UpstreamAgent
        );
    }

    #[test]
    fn test_connectivity_message_names_source() {
        let err = AgentError::connectivity("erp", "connection refused");
        assert_eq!(
            err.to_string(),
            "Tool source 'erp' unavailable: connection refused"
        );
    }
}
