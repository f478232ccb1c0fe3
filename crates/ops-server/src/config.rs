//! Server Configuration
//!
//! Read once from the environment (after `.env` is loaded) and shared
//! read-only through `AppState`.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5001";
const DEFAULT_SESSIONS_DIR: &str = "./sessions";
const DEFAULT_MODEL: &str = "llama3.2";
const DEFAULT_MAX_ITERATIONS: usize = 10;
const DEFAULT_TOOL_SOURCES: &str = "cmms=http://127.0.0.1:8001/mcp,\
                                    erp=http://127.0.0.1:8002/mcp,\
                                    mes=http://127.0.0.1:8003/mcp,\
                                    wpms=http://127.0.0.1:8004/mcp";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: {reason} (got '{value}')")]
    Invalid {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// When tool sources are connected and enumerated
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// Fresh scope for every `/ask`
    #[default]
    PerRequest,
    /// One scope for the life of the process
    PerProcess,
}

impl DiscoveryMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PerRequest => "per-request",
            Self::PerProcess => "per-process",
        }
    }

    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "per-request" | "request" => Ok(Self::PerRequest),
            "per-process" | "process" => Ok(Self::PerProcess),
            _ => Err(ConfigError::Invalid {
                var: "TOOL_DISCOVERY",
                value: value.to_string(),
                reason: "expected per-request or per-process",
            }),
        }
    }
}

impl fmt::Display for DiscoveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named tool source endpoint
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceSpec {
    pub name: String,
    pub url: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub sessions_dir: PathBuf,
    /// Connection order is declaration order
    pub tool_sources: Vec<SourceSpec>,
    pub discovery: DiscoveryMode,
    pub model: String,
    pub max_iterations: usize,
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            sessions_dir: PathBuf::from(DEFAULT_SESSIONS_DIR),
            tool_sources: parse_sources(DEFAULT_TOOL_SOURCES).unwrap_or_default(),
            discovery: DiscoveryMode::default(),
            model: DEFAULT_MODEL.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            debug: false,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(dir) = lookup("SESSIONS_DIR") {
            config.sessions_dir = PathBuf::from(dir);
        }
        if let Some(sources) = lookup("TOOL_SOURCES") {
            config.tool_sources = parse_sources(&sources)?;
        }
        if let Some(mode) = lookup("TOOL_DISCOVERY") {
            config.discovery = DiscoveryMode::parse(&mode)?;
        }
        if let Some(model) = lookup("MODEL") {
            config.model = model;
        }
        if let Some(raw) = lookup("MAX_ITERATIONS") {
            config.max_iterations = raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    var: "MAX_ITERATIONS",
                    value: raw.clone(),
                    reason: "expected a positive integer",
                })?;
        }
        config.debug = lookup("DEBUG").is_some_and(|v| is_truthy(&v));

        Ok(config)
    }

    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub const fn default_log_filter(&self) -> &'static str {
        if self.debug {
            "debug,tower_http=debug"
        } else {
            "info,tower_http=info"
        }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.tool_sources.iter().map(|s| s.name.as_str()).collect()
    }
}

/// `true`, `1` or `yes`, any case
pub fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

/// Parse `name=url,name=url`
fn parse_sources(raw: &str) -> Result<Vec<SourceSpec>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, url) = entry
                .split_once('=')
                .map(|(n, u)| (n.trim(), u.trim()))
                .filter(|(n, u)| !n.is_empty() && !u.is_empty())
                .ok_or_else(|| ConfigError::Invalid {
                    var: "TOOL_SOURCES",
                    value: entry.to_string(),
                    reason: "expected name=url",
                })?;
            Ok(SourceSpec {
                name: name.to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}
