//! HTTP and WebSocket surface for the routewise query router.
//!
//! `routewise-web` adapts REST requests to a shared
//! [`ToolRouter`](routewise::router::ToolRouter) and delivers
//! [`ProgressEvent`](routewise::progress::ProgressEvent)s to browsers over a
//! WebSocket. It holds no routing logic of its own.
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use routewise::config::RouterConfig;
//! use routewise::router::ToolRouter;
//! use routewise_web::{WebConfig, spawn_web};
//!
//! let router = Arc::new(ToolRouter::from_config(&RouterConfig::from_env()?)?);
//! let addr = spawn_web(router, WebConfig::default()).await?;
//! println!("API: http://{addr}/api/tools");
//! ```
//!
//! # Architecture
//!
//! ```text
//! HTTP client ──/api/*──▶ ToolRouter ──ProgressBus──▶ /ws (joined session)
//!      │                                                   ▲
//!      └────────── x-session-id header ───────────────────┘
//! ```
//!
//! A browser opens `/ws`, sends `{"type":"join_session","session_id":"..."}`,
//! and then sends REST requests with the same id in the `x-session-id`
//! header. Progress for those requests arrives on the socket.

mod api;
mod server;
mod ws;

pub use api::{AppState, SESSION_HEADER};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use routewise::error::ConfigError;
use routewise::router::ToolRouter;

pub const ENV_PORT: &str = "PORT";
pub const ENV_CLIENT_URL: &str = "CLIENT_URL";

/// Configuration for the web server.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Address to bind to. Default: `127.0.0.1:3000`.
    pub bind_addr: SocketAddr,
    /// Origin allowed by CORS. `None` allows any origin.
    pub allowed_origin: Option<HeaderValue>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            allowed_origin: None,
        }
    }
}

impl WebConfig {
    /// Defaults overridden by `PORT` and `CLIENT_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(raw) = get(ENV_PORT) {
            let port = raw.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                var: ENV_PORT,
                value: raw.clone(),
            })?;
            config.bind_addr.set_port(port);
        }
        if let Some(raw) = get(ENV_CLIENT_URL) {
            let origin = HeaderValue::from_str(&raw).map_err(|_| ConfigError::InvalidValue {
                var: ENV_CLIENT_URL,
                value: raw.clone(),
            })?;
            config.allowed_origin = Some(origin);
        }
        Ok(config)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }
}

/// Spawn the web server on a Tokio task and return the bound address.
///
/// The server runs until the Tokio runtime shuts down.
pub async fn spawn_web(router: Arc<ToolRouter>, config: WebConfig) -> Result<SocketAddr, String> {
    let app = server::build_router(AppState { router }, config.allowed_origin);
    server::start_server(app, config.bind_addr).await
}
