//! plant-systems server
//!
//! Starts the CMMS, ERP, MES and WPMS MCP servers on consecutive ports.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plant_systems::{McpServer, PlantDataset, System, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let host = std::env::var("PLANT_HOST").unwrap_or_else(|_| "127.0.0.1".into());
    let base_port: u16 = match std::env::var("PLANT_BASE_PORT") {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("PLANT_BASE_PORT is not a port: {raw}"))?,
        Err(_) => 8001,
    };

    let plant = Arc::new(PlantDataset::sample());

    let mut servers = Vec::new();
    for system in System::ALL {
        let port = base_port
            .checked_add(system.port_offset())
            .context("PLANT_BASE_PORT too high")?;
        let addr = format!("{host}:{port}");
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding {system} on {addr}"))?;

        let server = Arc::new(McpServer::new(system.name(), system.tools(&plant)));
        tracing::info!("{} MCP server on http://{}/mcp", server.name(), addr);

        servers.push(async move { axum::serve(listener, router(server)).await });
    }

    futures::future::try_join_all(servers).await?;

    Ok(())
}
