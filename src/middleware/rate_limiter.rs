// Process-wide request throttle
// Sits in front of every route and is independent of the per-agent windows
// the bunker service keeps.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::warn;

pub type GlobalThrottle = Arc<DefaultDirectRateLimiter>;

pub fn global_throttle(requests_per_second: u32) -> GlobalThrottle {
    let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_second(rate)))
}

pub async fn rate_limiter_middleware(
    State(limiter): State<GlobalThrottle>,
    req: Request,
    next: Next,
) -> Response {
    if limiter.check().is_err() {
        warn!(path = %req.uri().path(), "Request throttled");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({ "error": "Too many requests" })),
        )
            .into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_is_bounded_by_quota() {
        let limiter = global_throttle(3);
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }

    #[test]
    fn test_zero_rate_still_admits_one() {
        let limiter = global_throttle(0);
        assert!(limiter.check().is_ok());
    }
}
