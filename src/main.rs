//! Campaign Engine - Backend API for tabletop RPG campaigns
//!
//! The Engine is the backend server that:
//! - Stores rooms, characters, items, domains and units in SQLite
//! - Runs hero-scale combat and army-scale warfare turn by turn
//! - Pushes presence, board state and game events to room members over WebSocket

mod application;
mod domain;
mod infrastructure;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::infrastructure::config::AppConfig;
use crate::infrastructure::http;
use crate::infrastructure::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campaign_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Campaign Engine");

    let config = AppConfig::load()?;
    let addr = config.bind_address();
    tracing::info!(database = %config.database_url, "Configuration loaded");

    let state = Arc::new(AppState::new(config).await?);
    tracing::info!("Application state initialized");

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(infrastructure::websocket::ws_handler))
        .merge(http::create_routes())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::infrastructure::persistence::SqliteDatabase;

    async fn app() -> Router {
        let config = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
        };
        let database = SqliteDatabase::in_memory().await;
        build_router(Arc::new(AppState::with_database(config, &database)))
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = app()
            .await
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_room_then_bad_ids() {
        let app = app().await;

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/rooms")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"Ironhold","gm":"mira"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(Request::get("/api/rooms/not-an-id").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let missing = crate::domain::value_objects::CombatId::new();
        let response = app
            .oneshot(
                Request::get(format!("/api/combats/{missing}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
