//! routewise HTTP/WebSocket server.
//!
//! # Usage
//!
//! ```bash
//! OPENROUTER_KEY=sk-... BRAVE_SEARCH_KEY=... cargo run -p routewise-web
//! cargo run -p routewise-web -- --port 8080 --model google/gemini-2.5-flash
//! ```
//!
//! ## Endpoints
//!
//! ```text
//! POST /api/analyze            {"query": "..."}
//! POST /api/research           {"query": "..."}
//! POST /api/pipeline           {"query": "...", "personalization": "..."}
//! GET  /api/tools
//! POST /api/tools/clear-cache
//! GET  /ws                     then {"type": "join_session", "session_id": "..."}
//! ```

use std::sync::Arc;

use clap::Parser;
use routewise::config::RouterConfig;
use routewise::router::ToolRouter;
use routewise_web::{WebConfig, spawn_web};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// routewise web server.
#[derive(Parser)]
#[command(about = "HTTP and WebSocket API for the routewise query router")]
struct Args {
    /// Port to listen on (overrides PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Completion model (overrides ROUTEWISE_MODEL).
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut router_config = RouterConfig::from_env().map_err(|e| e.to_string())?;
    if let Some(model) = args.model {
        router_config = router_config.with_model(model);
    }
    let mut web_config = WebConfig::from_env().map_err(|e| e.to_string())?;
    if let Some(port) = args.port {
        web_config = web_config.with_port(port);
    }

    let router = Arc::new(ToolRouter::from_config(&router_config)?);
    let addr = spawn_web(router, web_config).await?;
    println!("routewise API: http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("failed to listen for shutdown signal: {e}"))?;
    info!("Shutting down");
    Ok(())
}
