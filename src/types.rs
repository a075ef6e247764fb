// Type definitions and enums

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::payment::VerificationError;
use crate::utils::truncate;

/// Lamports per SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Longest excerpt of oracle detail allowed into a client-facing message
pub const MAX_ERROR_DETAIL: usize = 100;

/// Service class chosen at invoice creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Standard,
    Vault,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Standard => write!(f, "standard"),
            Tier::Vault => write!(f, "vault"),
        }
    }
}

impl Tier {
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "standard" => Some(Tier::Standard),
            "vault" => Some(Tier::Vault),
            _ => None,
        }
    }
}

/// Convert lamports to SOL for display
pub fn lamports_to_sol(lamports: i128) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Rate limit")]
    RateLimited,

    #[error("No pending bunker (expired)")]
    InvoiceNotFound,

    #[error("Confirmation already in progress for this invoice")]
    InvoiceBusy,

    #[error("Tx invalid: {}", truncate(&.0.to_string(), MAX_ERROR_DETAIL))]
    Verification(#[from] VerificationError),

    #[error("Commit fail: {}", truncate(.0, MAX_ERROR_DETAIL))]
    StorageWrite(String),

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::InvoiceNotFound
            | AppError::InvoiceBusy
            | AppError::Verification(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::StorageWrite(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            Json(serde_json::json!({
                "error": self.to_string()
            })),
        )
            .into_response()
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
