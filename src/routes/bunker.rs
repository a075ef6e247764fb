use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::info;
use validator::Validate;

use crate::models::{
    AppState, BunkerRequest, BunkeredResponse, ConfirmRequest, InvoiceResponse, RetrieveResponse,
};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/bunker", post(create_bunker))
        .route("/confirm/{memo}", post(confirm_bunker))
        .route("/retrieve/{agent_id}/{filename}", get(retrieve_bunker))
        .with_state(state)
}

/// POST /bunker - issue a payment invoice for a memory
async fn create_bunker(
    State(state): State<AppState>,
    Json(request): Json<BunkerRequest>,
) -> AppResult<Json<InvoiceResponse>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    info!(agent_id = %request.agent_id, tier = %request.tier, "Bunker request received");

    let invoice = state
        .bunkers
        .create_invoice(&request.agent_id, &request.tier, request.memory)
        .await?;

    Ok(Json(invoice))
}

/// POST /confirm/{memo} - verify the payment and store the memory
async fn confirm_bunker(
    State(state): State<AppState>,
    Path(memo): Path<String>,
    Json(request): Json<ConfirmRequest>,
) -> AppResult<Json<BunkeredResponse>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    info!(memo = %memo, tx = %request.tx_hash, "Confirmation received");

    let bunkered = state
        .bunkers
        .confirm_payment(&memo, request.tx_hash.trim())
        .await?;

    Ok(Json(bunkered))
}

/// GET /retrieve/{agent_id}/{filename}
async fn retrieve_bunker(
    State(state): State<AppState>,
    Path((agent_id, filename)): Path<(String, String)>,
) -> AppResult<Json<RetrieveResponse>> {
    let memory = state.bunkers.retrieve(&agent_id, &filename).await?;
    Ok(Json(memory))
}

#[cfg(test)]
mod tests {
    use crate::bunker::testing::{payment_tx, Harness};
    use crate::config::Config;
    use crate::models::{AppState, BunkeredResponse, InvoiceResponse, RetrieveResponse};
    use crate::routes::create_router;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(h: &Harness) -> Router {
        create_router(AppState {
            config: Config::default(),
            bunkers: h.service.clone(),
        })
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn issue(h: &Harness, agent_id: &str, tier: &str) -> InvoiceResponse {
        let (status, body) = send(
            app(h),
            "POST",
            "/bunker",
            Some(json!({ "memory": "eyJtZW1vcnkiOiJ5ZXMifQ==", "agent_id": agent_id, "tier": tier })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn test_bunker_confirm_retrieve_flow() {
        let h = Harness::new();
        let invoice = issue(&h, "agent-7", "standard").await;
        assert_eq!(invoice.memo, "agent-7:standard:1700000000");
        assert_eq!(invoice.amount, 0.01);

        h.chain.insert("5xSig", payment_tx(&invoice.memo, 10_000_000));
        let (status, body) = send(
            app(&h),
            "POST",
            &invoice.confirm_path,
            Some(json!({ "tx_hash": "5xSig" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        let bunkered: BunkeredResponse = serde_json::from_value(body).unwrap();
        assert_eq!(bunkered.status, "bunkered");
        assert_eq!(bunkered.path, "agent-7/2023-11-14_221320.json");

        let (status, body) = send(app(&h), "GET", &bunkered.retrieve_path, None).await;
        assert_eq!(status, StatusCode::OK);
        let retrieved: RetrieveResponse = serde_json::from_value(body).unwrap();
        assert_eq!(retrieved.memory, "eyJtZW1vcnkiOiJ5ZXMifQ==");
    }

    #[tokio::test]
    async fn test_invalid_tier_is_bad_request() {
        let h = Harness::new();
        let (status, body) = send(
            app(&h),
            "POST",
            "/bunker",
            Some(json!({ "memory": "", "agent_id": "a1", "tier": "gold" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("tier"));
    }

    #[tokio::test]
    async fn test_confirm_unknown_memo_is_bad_request() {
        let h = Harness::new();
        let (status, body) = send(
            app(&h),
            "POST",
            "/confirm/nobody:standard:1",
            Some(json!({ "tx_hash": "sig" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No pending bunker (expired)");
    }

    #[tokio::test]
    async fn test_confirm_empty_tx_hash_is_bad_request() {
        let h = Harness::new();
        let invoice = issue(&h, "a1", "standard").await;
        let (status, _) = send(
            app(&h),
            "POST",
            &invoice.confirm_path,
            Some(json!({ "tx_hash": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_payment_is_bad_request() {
        let h = Harness::new();
        let invoice = issue(&h, "a1", "standard").await;
        h.chain.insert("wrong-memo", payment_tx("a1:vault:1700000000", 10_000_000));

        let (status, body) = send(
            app(&h),
            "POST",
            &invoice.confirm_path,
            Some(json!({ "tx_hash": "wrong-memo" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Tx invalid: Memo mismatch");
    }

    #[tokio::test]
    async fn test_confirm_rate_limit_is_429() {
        let h = Harness::new();
        let invoice = issue(&h, "a1", "standard").await;
        for _ in 0..9 {
            let (status, _) = send(
                app(&h),
                "POST",
                &invoice.confirm_path,
                Some(json!({ "tx_hash": "missing" })),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }

        let (status, _) = send(
            app(&h),
            "POST",
            &invoice.confirm_path,
            Some(json!({ "tx_hash": "missing" })),
        )
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_storage_failure_is_500() {
        let h = Harness::new();
        let invoice = issue(&h, "a1", "standard").await;
        h.chain.insert("sig", payment_tx(&invoice.memo, 10_000_000));
        h.vault.set_failing(true);

        let (status, body) = send(
            app(&h),
            "POST",
            &invoice.confirm_path,
            Some(json!({ "tx_hash": "sig" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().starts_with("Commit fail:"));
    }

    #[tokio::test]
    async fn test_retrieve_missing_is_404() {
        let h = Harness::new();
        let (status, body) = send(app(&h), "GET", "/retrieve/a1/nothing.json", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not found");
    }

    #[tokio::test]
    async fn test_health_and_banner() {
        let h = Harness::new();
        let (status, body) = send(app(&h), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));

        issue(&h, "a1", "vault").await;
        let (status, body) = send(app(&h), "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "agent-bunkers");
        assert_eq!(body["address"], crate::bunker::testing::RECEIVER);
        assert_eq!(body["pending_invoices"], 1);
    }
}
