//! Keep-alive web server.
//!
//! The free hosting tier idles the container without inbound traffic, so the
//! platform's pinger hits `/health`. `/stats` exposes the in-memory user
//! count for monitoring.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use muzacore::UserRegistry;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Clone)]
struct WebState {
    users: Arc<UserRegistry>,
}

/// Start the keep-alive server; runs until the process exits.
pub async fn start_web_server(port: u16, users: Arc<UserRegistry>) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let state = WebState { users };

    let app = Router::new()
        .route("/", get(health_handler))
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .with_state(state);

    log::info!("🌐 Keep-alive server listening on http://{}", addr);
    log::info!("  /        - liveness (plain text)");
    log::info!("  /health  - liveness (plain text)");
    log::info!("  /stats   - user count (JSON)");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// GET / and /health — plain-text liveness with the user count.
async fn health_handler(State(state): State<WebState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        format!(
            "🎵 Muza bot is alive!\n⏰ {}\n👥 Users: {}",
            Utc::now().to_rfc3339(),
            state.users.count()
        ),
    )
}

/// GET /stats — monitoring JSON.
async fn stats_handler(State(state): State<WebState>) -> impl IntoResponse {
    Json(json!({
        "status": "alive",
        "users_count": state.users.count(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
