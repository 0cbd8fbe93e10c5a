//! Durable hook state shared by every hook process on this machine.
//!
//! Each hook invocation is a fresh process, so anything that has to survive
//! between events (the adopted session, the current topic, which recall
//! queries already ran this turn) lives in one small JSON file. Reads never
//! fail: a missing or corrupt file is an empty state. Writes are best-effort.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;

const STATE_FILE_NAME: &str = "hook-state.json";

/// On-disk record, one per host machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HookState {
    pub session_id: Option<String>,
    pub workspace_id: Option<String>,
    /// True iff `recall_queries_this_turn` is non-empty
    pub recall_done_this_turn: bool,
    /// Normalized queries already recalled since the last turn reset
    pub recall_queries_this_turn: Vec<String>,
    pub current_topic: Option<String>,
    pub last_recall_at: Option<DateTime<Utc>>,
    pub last_recall_query: Option<String>,
    /// Last session closed by Stop; never adopted again
    pub ended_session_id: Option<String>,
}

/// Lower-case and collapse whitespace so equivalent queries compare equal.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

impl HookState {
    /// Record that `query` was recalled this turn.
    ///
    /// Re-marking an already recorded query only refreshes the audit fields.
    /// Queries that normalize to nothing are ignored.
    pub fn mark_recall_done(&mut self, query: &str) {
        let normalized = normalize_query(query);
        if normalized.is_empty() {
            return;
        }
        if !self.recall_queries_this_turn.contains(&normalized) {
            self.recall_queries_this_turn.push(normalized);
        }
        self.recall_done_this_turn = true;
        self.last_recall_at = Some(Utc::now());
        self.last_recall_query = Some(query.to_string());
    }

    /// Coarse check: has any recall fired this turn.
    pub fn was_recall_done_this_turn(&self) -> bool {
        self.recall_done_this_turn
    }

    /// Fine check: has this query (after normalization) fired this turn.
    pub fn was_query_recalled_this_turn(&self, query: &str) -> bool {
        let normalized = normalize_query(query);
        self.recall_queries_this_turn.contains(&normalized)
    }

    /// Clear the ledger at a turn boundary. Audit fields are kept.
    pub fn reset_recall_status(&mut self) {
        self.recall_done_this_turn = false;
        self.recall_queries_this_turn.clear();
    }

    pub fn set_current_topic(&mut self, topic: impl Into<String>) {
        self.current_topic = Some(topic.into());
    }

    pub fn current_topic(&self) -> Option<&str> {
        self.current_topic.as_deref()
    }

    pub fn update_session_info(&mut self, workspace_id: impl Into<String>, session_id: impl Into<String>) {
        self.workspace_id = Some(workspace_id.into());
        self.session_id = Some(session_id.into());
    }

    /// Forget the adopted session after it has been ended, remembering its id
    /// so a stale handoff or environment value cannot bring it back.
    pub fn clear_session(&mut self) {
        if let Some(ended) = self.session_id.take() {
            self.ended_session_id = Some(ended);
        }
    }

    /// Whether `session_id` was closed by a previous Stop.
    pub fn is_ended(&self, session_id: &str) -> bool {
        self.ended_session_id.as_deref() == Some(session_id)
    }

    /// Re-establish the flag/ledger invariant on a record read from disk.
    fn repair(mut self) -> Self {
        self.recall_queries_this_turn.retain(|q| !q.is_empty());
        self.recall_done_this_turn = !self.recall_queries_this_turn.is_empty();
        self
    }
}

/// File-backed store for [`HookState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: Utf8PathBuf,
}

impl StateStore {
    /// Store living in `dir`.
    pub fn new(dir: impl AsRef<Utf8Path>) -> Self {
        Self {
            path: dir.as_ref().join(STATE_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Load the state; missing or corrupt files yield an empty state.
    pub fn read(&self) -> HookState {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HookState::default(),
            Err(e) => {
                tracing::warn!(path = %self.path, error = %e, "Failed to read hook state");
                return HookState::default();
            }
        };

        match serde_json::from_str::<HookState>(&content) {
            Ok(state) => state.repair(),
            Err(e) => {
                tracing::warn!(path = %self.path, error = %e, "Corrupt hook state, starting empty");
                HookState::default()
            }
        }
    }

    /// Persist the whole state. Failures are logged and swallowed.
    pub fn write(&self, state: &HookState) {
        if let Err(e) = self.try_write(state) {
            tracing::warn!(path = %self.path, error = %e, "Failed to write hook state");
        }
    }

    fn try_write(&self, state: &HookState) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}
