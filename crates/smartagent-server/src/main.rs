//! SmartAgent HTTP Server
//!
//! Axum-based server exposing the chat endpoint, session inspection and the
//! static chat page. Answers come from Gemini, which may call the built-in
//! `calc`, `time_in_timezone` and `web_search` tools.

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smartagent_core::{AgentBuilder, MemorySessionStore};
use smartagent_runtime::{GeminiConfig, GeminiProvider};
use smartagent_tools::{DuckDuckGoClient, builtin_registry};

use crate::config::ServerConfig;
use crate::handlers::{chat_handler, delete_session, get_session, health_check};
use crate::state::AppState;

/// Build the router: API routes first, static files for everything else
fn app(state: AppState, static_dir: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/chat", post(chat_handler))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .fallback_service(ServeDir::new(static_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let server = ServerConfig::from_env();
    let gemini = GeminiConfig::from_env()?;
    tracing::info!(model = %gemini.model, "Using Gemini");

    let model = gemini.model.clone();
    let provider = Arc::new(GeminiProvider::new(gemini)?);

    let tools = builtin_registry(Arc::new(DuckDuckGoClient::new()?));
    tracing::info!("Registered {} tools:", tools.len());
    for name in tools.names() {
        tracing::info!("  • {}", name);
    }

    let agent = AgentBuilder::new()
        .provider(provider)
        .tools(tools)
        .model(model)
        .max_hops(server.max_hops)
        .build()?;

    let state = AppState {
        agent: Arc::new(agent),
        sessions: Arc::new(MemorySessionStore::new()),
    };

    let app = app(state, &server.static_dir);

    let listener = tokio::net::TcpListener::bind(&server.bind_addr).await?;

    tracing::info!("SmartAgent listening on http://{}", server.bind_addr);
    tracing::info!("  POST   /chat           - Send message");
    tracing::info!("  GET    /health         - Health check");
    tracing::info!("  GET    /sessions/{{id}}  - Session history");
    tracing::info!("  DELETE /sessions/{{id}}  - Reset session");
    tracing::info!("  GET    /               - Chat page ({})", server.static_dir);

    axum::serve(listener, app).await?;

    Ok(())
}
