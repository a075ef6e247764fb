use axum::{extract::State, routing::get, Json, Router};

use crate::models::{AppState, BannerResponse, HealthResponse};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health_check))
        .with_state(state)
}

async fn banner(State(state): State<AppState>) -> Json<BannerResponse> {
    state.bunkers.sweep().await;

    Json(BannerResponse {
        service: "agent-bunkers".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        address: state.bunkers.receiving_address().to_string(),
        url: state.config.server.public_url.clone(),
        pending_invoices: state.bunkers.pending_count().await,
    })
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
