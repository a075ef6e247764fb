// Solana JSON-RPC adapter
// Only `getTransaction` is needed. The "json" encoding returns account keys as
// base58 strings; versioned (v0) transactions append lookup-table addresses in
// `meta.loadedAddresses`, writable first, then readonly.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::oracle::{ChainOracle, ChainTransaction, OracleError};

pub struct SolanaRpcClient {
    client: Client,
    rpc_url: String,
    commitment: String,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: (&'a str, GetTransactionConfig<'a>),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GetTransactionConfig<'a> {
    encoding: &'static str,
    commitment: &'a str,
    max_supported_transaction_version: u8,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<EncodedTransaction>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct EncodedTransaction {
    meta: Option<TransactionMeta>,
    transaction: TransactionEnvelope,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionMeta {
    #[serde(default)]
    err: Option<serde_json::Value>,
    #[serde(default)]
    log_messages: Option<Vec<String>>,
    #[serde(default)]
    pre_balances: Vec<u64>,
    #[serde(default)]
    post_balances: Vec<u64>,
    #[serde(default)]
    loaded_addresses: Option<LoadedAddresses>,
}

#[derive(Deserialize, Default)]
struct LoadedAddresses {
    #[serde(default)]
    writable: Vec<String>,
    #[serde(default)]
    readonly: Vec<String>,
}

#[derive(Deserialize)]
struct TransactionEnvelope {
    message: TransactionMessage,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionMessage {
    account_keys: Vec<String>,
}

impl SolanaRpcClient {
    pub fn new(rpc_url: &str, commitment: &str, timeout: Duration) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Request(e.to_string()))?;

        Ok(Self {
            client,
            rpc_url: rpc_url.to_string(),
            commitment: commitment.to_string(),
        })
    }

    fn into_chain_transaction(encoded: EncodedTransaction) -> ChainTransaction {
        let mut account_keys = encoded.transaction.message.account_keys;

        match encoded.meta {
            Some(meta) => {
                let loaded = meta.loaded_addresses.unwrap_or_default();
                account_keys.extend(loaded.writable);
                account_keys.extend(loaded.readonly);

                ChainTransaction {
                    failed: meta.err.is_some(),
                    log_messages: meta.log_messages.unwrap_or_default(),
                    account_keys,
                    pre_balances: meta.pre_balances,
                    post_balances: meta.post_balances,
                }
            }
            None => ChainTransaction {
                failed: true,
                account_keys,
                ..ChainTransaction::default()
            },
        }
    }
}

#[async_trait]
impl ChainOracle for SolanaRpcClient {
    async fn get_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<ChainTransaction>, OracleError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: "getTransaction",
            params: (
                signature,
                GetTransactionConfig {
                    encoding: "json",
                    commitment: &self.commitment,
                    max_supported_transaction_version: 0,
                },
            ),
        };

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| OracleError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Request(format!("HTTP {}: {}", status, body)));
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Parse(e.to_string()))?;

        if let Some(error) = rpc.error {
            return Err(OracleError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        debug!(signature, found = rpc.result.is_some(), "getTransaction answered");
        Ok(rpc.result.map(Self::into_chain_transaction))
    }
}
