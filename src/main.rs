use axum::{extract::State, middleware, routing::get, Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use impostor::{abuse, config::ServerConfig, state::AppState, ws};

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "rooms": state.registry.count().await,
    }))
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "impostor=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting impostor server...");

    let config = ServerConfig::from_env();
    let abuse_config = Arc::new(abuse::AbuseConfig::from_env());

    if let Some(limiter) = &abuse_config.rate_limiter {
        abuse::spawn_rate_limit_cleanup(limiter.clone());
    }

    let state = Arc::new(
        AppState::new(config.timings.clone()).with_rate_limiter(abuse_config.rate_limiter.clone()),
    );

    // WebSocket route with anti-abuse protection
    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .layer(middleware::from_fn_with_state(
            abuse_config.clone(),
            abuse::ws_abuse_middleware,
        ));

    let app = Router::new()
        .merge(ws_routes)
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}
