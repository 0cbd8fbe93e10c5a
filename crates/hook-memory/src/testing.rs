//! In-memory [`MemoryApi`] double for handler tests.

use crate::client::{
    ApiResult, Briefing, MemoryApi, MemoryApiError, RecallHit, RecallRequest, SessionInfo,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Records every call and answers from canned data.
#[derive(Debug, Default)]
pub struct RecordingApi {
    calls: Mutex<Vec<String>>,
    working_memory: Mutex<HashMap<String, Value>>,
    pub next_session_id: String,
    pub briefing: Briefing,
    pub hits: Vec<RecallHit>,
    /// Every call fails with a 503
    pub unavailable: bool,
    /// Only `commit_session` fails
    pub fail_commit: bool,
    /// Only `end_session` fails
    pub fail_end: bool,
    /// Every call sleeps this long first
    pub delay: Option<Duration>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self {
            next_session_id: "sess-new".to_string(),
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new()
        }
    }

    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    pub fn failing_end(mut self) -> Self {
        self.fail_end = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_briefing(mut self, summary: &str) -> Self {
        self.briefing = Briefing {
            summary: summary.to_string(),
            highlights: Vec::new(),
        };
        self
    }

    pub fn with_hits(mut self, hits: &[&str]) -> Self {
        self.hits = hits
            .iter()
            .map(|content| RecallHit {
                content: content.to_string(),
                score: Some(0.9),
                kind: None,
            })
            .collect();
        self
    }

    /// Calls in order, as `name` or `name:arg`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Calls whose name matches.
    pub fn calls_named(&self, name: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c == name || c.starts_with(&format!("{name}:")))
            .collect()
    }

    pub fn stored(&self, key: &str) -> Option<Value> {
        self.working_memory.lock().ok()?.get(key).cloned()
    }

    pub fn seed(&self, key: &str, value: Value) {
        if let Ok(mut wm) = self.working_memory.lock() {
            wm.insert(key.to_string(), value);
        }
    }

    async fn enter(&self, call: String) -> ApiResult<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable {
            return Err(unavailable());
        }
        Ok(())
    }
}

fn unavailable() -> MemoryApiError {
    MemoryApiError::Status {
        status: 503,
        body: "unavailable".to_string(),
    }
}

#[async_trait]
impl MemoryApi for RecordingApi {
    async fn create_session(&self, workspace_id: &str) -> ApiResult<SessionInfo> {
        self.enter(format!("create_session:{workspace_id}")).await?;
        Ok(SessionInfo {
            session_id: self.next_session_id.clone(),
            workspace_id: Some(workspace_id.to_string()),
        })
    }

    async fn commit_session(&self, session_id: &str) -> ApiResult<()> {
        self.enter(format!("commit_session:{session_id}")).await?;
        if self.fail_commit {
            return Err(unavailable());
        }
        Ok(())
    }

    async fn end_session(&self, session_id: &str) -> ApiResult<()> {
        self.enter(format!("end_session:{session_id}")).await?;
        if self.fail_end {
            return Err(MemoryApiError::Status {
                status: 410,
                body: "session expired".to_string(),
            });
        }
        Ok(())
    }

    async fn briefing(&self, workspace_id: &str) -> ApiResult<Briefing> {
        self.enter(format!("briefing:{workspace_id}")).await?;
        Ok(self.briefing.clone())
    }

    async fn recall(&self, request: &RecallRequest) -> ApiResult<Vec<RecallHit>> {
        self.enter(format!("recall:{}", request.query)).await?;
        Ok(self.hits.iter().take(request.limit).cloned().collect())
    }

    async fn get_working_memory(&self, session_id: &str, key: &str) -> ApiResult<Option<Value>> {
        self.enter(format!("get_working_memory:{session_id}/{key}")).await?;
        Ok(self.stored(key))
    }

    async fn set_working_memory(&self, session_id: &str, key: &str, value: &Value) -> ApiResult<()> {
        self.enter(format!("set_working_memory:{session_id}/{key}")).await?;
        self.seed(key, value.clone());
        Ok(())
    }

    async fn health(&self) -> ApiResult<bool> {
        self.enter("health".to_string()).await?;
        Ok(true)
    }
}
