// GitHub contents API adapter
// PUT  /repos/{owner}/{repo}/contents/{path}  {message, content}
// GET  /repos/{owner}/{repo}/contents/{path}  -> {content, encoding: "base64"}

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{StorageError, StorageOracle};
use crate::types::MAX_ERROR_DETAIL;
use crate::utils::truncate;

const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("agent-bunkers/", env!("CARGO_PKG_VERSION"));

pub struct GitHubContents {
    client: Client,
    api_url: String,
    repo: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ContentsResponse {
    content: String,
}

impl GitHubContents {
    pub fn new(api_url: &str, repo: &str, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            repo: repo.to_string(),
            token,
        }
    }

    fn contents_url(&self, path: &str) -> String {
        format!("{}/repos/{}/contents/{}", self.api_url, self.repo, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT);
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }
}

#[async_trait]
impl StorageOracle for GitHubContents {
    async fn put(&self, path: &str, message: &str, content_b64: &str) -> Result<(), StorageError> {
        let response = self
            .authorize(self.client.put(self.contents_url(path)))
            .json(&PutContentsRequest {
                message,
                content: content_b64,
            })
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_DETAIL).to_string(),
            });
        }

        debug!(path, status = status.as_u16(), "Contents written");
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<String, StorageError> {
        let response = self
            .authorize(self.client.get(self.contents_url(path)))
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_DETAIL).to_string(),
            });
        }

        let contents: ContentsResponse = response
            .json()
            .await
            .map_err(|e| StorageError::Parse(e.to_string()))?;

        // GitHub wraps base64 content at 60 columns.
        Ok(contents.content.split_whitespace().collect())
    }
}
