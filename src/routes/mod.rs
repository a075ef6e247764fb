//! API Routes
//!
//! - `POST /bunker` - Issue a payment invoice for a memory
//! - `POST /confirm/{memo}` - Verify payment and commit the memory
//! - `GET /retrieve/{agent_id}/{filename}` - Read a bunkered memory
//! - `GET /` - Service banner
//! - `GET /health` - Liveness

pub mod bunker;
pub mod health;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::{apply_cors, global_throttle, rate_limiter_middleware};
use crate::models::AppState;

/// Headroom on top of the base64-expanded payload for the JSON envelope
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

/// Largest request body needed to carry a payload of `max_payload_bytes`
pub fn max_body_bytes(max_payload_bytes: usize) -> usize {
    max_payload_bytes.div_ceil(3) * 4 + BODY_OVERHEAD_BYTES
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let throttle = global_throttle(state.config.server.requests_per_second);
    let body_limit = max_body_bytes(state.config.bunker.max_payload_bytes);

    let router = Router::new()
        .merge(bunker::router(state.clone()))
        .merge(health::router(state.clone()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn_with_state(
            throttle,
            rate_limiter_middleware,
        ))
        .layer(TraceLayer::new_for_http());

    apply_cors(router, &state.config.server.cors_allowed_origins)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_limit_fits_largest_payload() {
        // 1,000,000 bytes encode to 1,333,336 base64 characters.
        assert_eq!(max_body_bytes(1_000_000), 1_333_336 + BODY_OVERHEAD_BYTES);
        assert_eq!(max_body_bytes(0), BODY_OVERHEAD_BYTES);
    }
}
