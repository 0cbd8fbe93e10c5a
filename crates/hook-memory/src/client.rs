//! Client for the external memory API.
//!
//! Hooks only ever reach the memory server through [`MemoryApi`]; the HTTP
//! implementation is [`HttpMemoryClient`]. Every call made from a hook goes
//! through [`best_effort`], which turns errors and timeouts into `None`.

use async_trait::async_trait;
use hook_common::config::{HookConfig, NON_HOOK_TIMEOUT};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Failure talking to the memory API.
#[derive(Debug, Error)]
pub enum MemoryApiError {
    #[error("memory API unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("memory API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid memory API URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

pub type ApiResult<T> = Result<T, MemoryApiError>;

/// Server-side session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    #[serde(alias = "id")]
    pub session_id: String,
    #[serde(default)]
    pub workspace_id: Option<String>,
}

/// Workspace briefing shown at session start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Briefing {
    pub summary: String,
    pub highlights: Vec<String>,
}

impl Briefing {
    pub fn is_empty(&self) -> bool {
        self.summary.trim().is_empty() && self.highlights.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallRequest {
    pub workspace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub query: String,
    pub limit: usize,
}

/// One relevance-ranked recall result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallHit {
    pub content: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecallResponse {
    #[serde(default)]
    results: Vec<RecallHit>,
}

#[derive(Debug, Deserialize)]
struct WorkingMemoryEntry {
    #[serde(default)]
    value: Value,
}

/// The narrow surface hooks use on the memory server.
#[async_trait]
pub trait MemoryApi: Send + Sync {
    async fn create_session(&self, workspace_id: &str) -> ApiResult<SessionInfo>;

    async fn commit_session(&self, session_id: &str) -> ApiResult<()>;

    async fn end_session(&self, session_id: &str) -> ApiResult<()>;

    async fn briefing(&self, workspace_id: &str) -> ApiResult<Briefing>;

    async fn recall(&self, request: &RecallRequest) -> ApiResult<Vec<RecallHit>>;

    async fn get_working_memory(&self, session_id: &str, key: &str) -> ApiResult<Option<Value>>;

    async fn set_working_memory(&self, session_id: &str, key: &str, value: &Value) -> ApiResult<()>;

    async fn health(&self) -> ApiResult<bool>;
}

/// Await `call` for at most `timeout`; any failure is logged and becomes `None`.
pub async fn best_effort<T, F>(label: &str, timeout: Duration, call: F) -> Option<T>
where
    F: Future<Output = ApiResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            tracing::warn!(call = label, error = %e, "Memory API call failed");
            None
        }
        Err(_) => {
            tracing::warn!(
                call = label,
                timeout_ms = timeout.as_millis() as u64,
                "Memory API call timed out"
            );
            None
        }
    }
}

/// HTTP implementation of [`MemoryApi`].
#[derive(Debug, Clone)]
pub struct HttpMemoryClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpMemoryClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> ApiResult<Self> {
        let invalid = |reason: String| MemoryApiError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };
        let base_url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("not a base URL".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Client with the short per-call timeout hooks must use.
    pub fn for_hooks(config: &HookConfig) -> ApiResult<Self> {
        Self::new(&config.api_url, config.api_key.clone(), config.hook_timeout)
    }

    /// Client for long-lived callers.
    pub fn for_service(config: &HookConfig) -> ApiResult<Self> {
        Self::new(&config.api_url, config.api_key.clone(), NON_HOOK_TIMEOUT)
    }

    /// Endpoint URL; every segment is percent-encoded on its own.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Build request with auth headers.
    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let mut req = self.client.request(method, self.endpoint(segments));

        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        req
    }

    async fn send(&self, req: RequestBuilder) -> ApiResult<Response> {
        let response = req.send().await?;
        check_status(response).await
    }
}

/// Pass a successful response through; otherwise report status and body.
async fn check_status(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(MemoryApiError::Status {
        status: status.as_u16(),
        body: clip_body(&body),
    })
}

/// Error bodies are kept short; the cut respects char boundaries.
fn clip_body(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[async_trait]
impl MemoryApi for HttpMemoryClient {
    async fn create_session(&self, workspace_id: &str) -> ApiResult<SessionInfo> {
        let body = serde_json::json!({ "workspaceId": workspace_id });
        let response = self
            .send(self.request(Method::POST, &["v1", "sessions"]).json(&body))
            .await?;
        Ok(response.json().await?)
    }

    async fn commit_session(&self, session_id: &str) -> ApiResult<()> {
        self.send(self.request(Method::POST, &["v1", "sessions", session_id, "commit"]))
            .await?;
        Ok(())
    }

    async fn end_session(&self, session_id: &str) -> ApiResult<()> {
        self.send(self.request(Method::POST, &["v1", "sessions", session_id, "end"]))
            .await?;
        Ok(())
    }

    async fn briefing(&self, workspace_id: &str) -> ApiResult<Briefing> {
        let response = self
            .send(self.request(Method::GET, &["v1", "workspaces", workspace_id, "briefing"]))
            .await?;
        Ok(response.json().await?)
    }

    async fn recall(&self, request: &RecallRequest) -> ApiResult<Vec<RecallHit>> {
        let response = self
            .send(self.request(Method::POST, &["v1", "recall"]).json(request))
            .await?;
        let parsed: RecallResponse = response.json().await?;
        Ok(parsed.results)
    }

    async fn get_working_memory(&self, session_id: &str, key: &str) -> ApiResult<Option<Value>> {
        let segments = ["v1", "sessions", session_id, "working-memory", key];
        let response = self.request(Method::GET, &segments).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let entry: WorkingMemoryEntry = check_status(response).await?.json().await?;
        Ok(Some(entry.value).filter(|v| !v.is_null()))
    }

    async fn set_working_memory(&self, session_id: &str, key: &str, value: &Value) -> ApiResult<()> {
        let segments = ["v1", "sessions", session_id, "working-memory", key];
        let body = serde_json::json!({ "value": value });
        self.send(self.request(Method::PUT, &segments).json(&body)).await?;
        Ok(())
    }

    async fn health(&self) -> ApiResult<bool> {
        let response = self.request(Method::GET, &["health"]).send().await?;
        Ok(response.status().is_success())
    }
}
