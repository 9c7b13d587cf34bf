//! HTTP gateway for Cocochat.
//!
//! Exposes the chat endpoint and a health check. Built on Axum; the chat
//! stream is served as Server-Sent Events.

pub mod chat;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{
    Router,
    routing::{get, post},
};
use cocochat_agent::{Orchestrator, OrchestratorSettings, system_prompt};
use cocochat_config::{AppConfig, GatewayConfig};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

pub use chat::{AppState, SharedState};

/// Build the router with all routes and layers.
///
/// Layers applied:
/// - CORS for the configured origins (`*` allows any)
/// - Request body size limit
/// - HTTP trace logging
pub fn build_router(state: SharedState, config: &GatewayConfig) -> Router {
    Router::new()
        .route("/api/chat", post(chat::chat_handler))
        .route("/health", get(chat::health_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors_layer(&config.allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}

/// Assemble the shared state from configuration.
///
/// Provider, tool registry and orchestrator are built once and shared by
/// every request.
pub fn build_state(config: &AppConfig) -> Result<SharedState, Box<dyn std::error::Error>> {
    let provider = cocochat_providers::build_from_config(config)?;
    let tools = Arc::new(cocochat_tools::default_registry(config)?);
    let orchestrator =
        Orchestrator::new(provider, tools, OrchestratorSettings::from_config(config));

    Ok(Arc::new(AppState {
        orchestrator,
        system_prompt: system_prompt(&config.agent),
    }))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = build_state(&config)?;
    let app = build_router(state, &config.gateway);

    info!(
        addr = %addr,
        model = %config.model.model_id,
        max_rounds = config.agent.max_rounds,
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
