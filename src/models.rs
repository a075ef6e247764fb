use validator::Validate;

use crate::bunker::BunkerService;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub bunkers: BunkerService,
}

// API Request/Response types

#[derive(Debug, serde::Deserialize, Validate)]
pub struct BunkerRequest {
    /// Base64 encoded memory
    pub memory: String,
    #[validate(length(max = 1024))]
    pub agent_id: String,
    /// "standard" or "vault"
    pub tier: String,
}

#[derive(Debug, serde::Deserialize, Validate)]
pub struct ConfirmRequest {
    /// Transaction signature that paid the invoice
    #[validate(length(min = 1, max = 128))]
    pub tx_hash: String,
}

/// Payment instructions for a freshly issued invoice
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct InvoiceResponse {
    pub status: String,
    pub address: String,
    /// Amount due in SOL
    pub amount: f64,
    pub memo: String,
    pub confirm_path: String,
    /// Explorer link prefilled with address, amount and memo
    pub payment_url: String,
    pub expires_at: i64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct BunkeredResponse {
    pub status: String,
    pub path: String,
    pub tx: String,
    pub retrieve_path: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct RetrieveResponse {
    /// Base64 encoded memory, as submitted
    pub memory: String,
}

#[derive(Debug, serde::Serialize)]
pub struct BannerResponse {
    pub service: String,
    pub version: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub pending_invoices: usize,
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
}
