//! ops-server
//!
//! Axum server for the manufacturing operations assistant. `POST /ask`
//! answers a question using the plant systems' tools; the built chat
//! client is served from `static/`.

mod config;
mod handlers;
mod negotiate;
mod state;

use std::sync::Arc;

use anyhow::Context;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ops_core::provider::GenerationOptions;
use ops_core::{
    AgentConfig, FileSessionStore, LlmProvider, ReasoningAgent, SourceScope, ToolSource,
};
use ops_runtime::{McpToolSource, OllamaProvider};
use plant_systems::MANUFACTURING_AGENT_PROMPT;

use crate::config::{DiscoveryMode, ServerConfig};
use crate::handlers::api_router;
use crate::state::{AppState, Tooling};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env().context("invalid configuration")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.default_log_filter().into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // LLM provider
    let provider = Arc::new(OllamaProvider::from_env());
    match provider.health_check().await {
        Ok(true) => tracing::info!("Connected to Ollama, model {}", config.model),
        Ok(false) | Err(_) => {
            tracing::warn!("Ollama not available - /ask will fail until it is");
            tracing::warn!("  Make sure Ollama is running: ollama serve");
        }
    }

    let agent = ReasoningAgent::new(
        provider.clone(),
        AgentConfig {
            max_iterations: config.max_iterations,
            generation: GenerationOptions {
                model: config.model.clone(),
                ..Default::default()
            },
            ..Default::default()
        },
    );

    // Sessions
    let sessions = FileSessionStore::new(&config.sessions_dir);
    sessions
        .ensure_dir()
        .await
        .with_context(|| format!("creating {}", config.sessions_dir.display()))?;

    // Tool sources, in declared order
    let sources: Vec<Arc<dyn ToolSource>> = config
        .tool_sources
        .iter()
        .map(|spec| Arc::new(McpToolSource::new(&spec.name, &spec.url)) as Arc<dyn ToolSource>)
        .collect();
    for spec in &config.tool_sources {
        tracing::info!("Tool source {} at {}", spec.name, spec.url);
    }

    let (tooling, scope) = match config.discovery {
        DiscoveryMode::PerRequest => (Tooling::PerRequest(sources.into()), None),
        DiscoveryMode::PerProcess => {
            let scope = SourceScope::open(&sources).await?;
            let tools = match scope.aggregate().await {
                Ok(tools) => tools,
                Err(err) => {
                    scope.close().await;
                    return Err(err.into());
                }
            };
            tracing::info!("Discovered {} tools: {}", tools.len(), tools.names().join(", "));
            (Tooling::Cached(tools), Some(scope))
        }
    };

    let bind_addr = config.bind_addr.clone();
    let discovery = config.discovery;

    let state = AppState {
        config: Arc::new(config),
        agent: Arc::new(agent),
        provider: Some(provider as Arc<dyn LlmProvider>),
        tooling,
        sessions: Arc::new(sessions),
        system_prompt: Arc::from(MANUFACTURING_AGENT_PROMPT),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api_router(state)
        // Static files (WASM chat client)
        .fallback_service(ServeDir::new("static"))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;

    tracing::info!("ops-server running on http://{} ({} discovery)", bind_addr, discovery);
    tracing::info!("  GET  /health - Health check");
    tracing::info!("  POST /ask    - Ask the operations assistant");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scope) = scope {
        tracing::info!("Closing tool sources");
        scope.close().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
