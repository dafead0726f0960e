//! Axum server setup and router construction.

use std::net::SocketAddr;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::api::{self, AppState};
use crate::ws;

/// Build the full axum router.
///
/// The router serves:
/// - WebSocket at `/ws`
/// - REST API at `/api/*`
pub fn build_router(state: AppState, allowed_origin: Option<HeaderValue>) -> Router {
    let cors = match allowed_origin {
        Some(origin) => CorsLayer::new().allow_origin(origin),
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods(Any)
    .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .route("/api/analyze", post(api::post_analyze))
        .route("/api/research", post(api::post_research))
        .route("/api/pipeline", post(api::post_pipeline))
        .route("/api/tools", get(api::get_tools))
        .route("/api/tools/clear-cache", post(api::post_clear_cache))
        .with_state(state)
        .layer(cors)
}

/// Bind, spawn the server, and return the bound address.
pub async fn start_server(router: Router, bind_addr: SocketAddr) -> Result<SocketAddr, String> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| format!("failed to bind {bind_addr}: {e}"))?;
    let addr = listener
        .local_addr()
        .map_err(|e| format!("failed to read bound address: {e}"))?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!("Web server stopped: {e}");
        }
    });

    info!("Listening on http://{addr}");
    Ok(addr)
}
