//! Session coordination between the long-lived coordinator and hook processes.
//!
//! The two sides share no memory. The coordinator creates a server-side
//! session at startup and publishes it in a handoff file named after its
//! lineage (the host process both sides are spawned by). A hook adopts, in
//! order: the session already in its state file, the lineage handoff, the
//! `MEMORY_SESSION_ID` fallback, and only then creates its own session.
//! Two sides racing to create sessions is tolerated; the loser's session
//! expires unused.

use crate::client::{MemoryApi, best_effort};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use hook_common::HookState;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::time::Duration;
use thiserror::Error;

/// Write-once record passing a session id to hooks of the same lineage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHandoff {
    pub session_id: String,
    pub workspace_id: String,
    /// Process that created the session
    pub pid: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("handoff I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("handoff encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("handoff rename failed: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Directory of handoff files, one per lineage.
#[derive(Debug, Clone)]
pub struct HandoffStore {
    dir: Utf8PathBuf,
}

impl HandoffStore {
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    pub fn path_for(&self, lineage_pid: u32) -> Utf8PathBuf {
        self.dir.join(format!("session-{}.json", lineage_pid))
    }

    /// Publish atomically: write a temp file in the same directory, then rename.
    pub fn write(&self, lineage_pid: u32, handoff: &SessionHandoff) -> Result<Utf8PathBuf, HandoffError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(lineage_pid);

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer(&mut tmp, handoff)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path)?;

        Ok(path)
    }

    /// Read the lineage handoff; absent or malformed files yield `None`.
    pub fn read(&self, lineage_pid: u32) -> Option<SessionHandoff> {
        let path = self.path_for(lineage_pid);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Failed to read session handoff");
                return None;
            }
        };

        match serde_json::from_str::<SessionHandoff>(&content) {
            Ok(handoff) if !handoff.session_id.trim().is_empty() => Some(handoff),
            Ok(_) => {
                tracing::warn!(path = %path, "Session handoff has an empty session id");
                None
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Malformed session handoff");
                None
            }
        }
    }
}

/// Pid identifying this process's lineage: the host that spawned it.
pub fn lineage_pid() -> u32 {
    #[cfg(unix)]
    {
        std::os::unix::process::parent_id()
    }
    #[cfg(not(unix))]
    {
        std::process::id()
    }
}

/// Where an adopted session id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    State,
    Handoff,
    Environment,
    Created,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub session_id: String,
    pub source: SessionSource,
}

/// Outcome of closing a session; each step is independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinishOutcome {
    pub committed: bool,
    pub ended: bool,
}

pub struct SessionCoordinator<'a> {
    api: &'a dyn MemoryApi,
    handoffs: &'a HandoffStore,
    timeout: Duration,
}

impl<'a> SessionCoordinator<'a> {
    pub fn new(api: &'a dyn MemoryApi, handoffs: &'a HandoffStore, timeout: Duration) -> Self {
        Self {
            api,
            handoffs,
            timeout,
        }
    }

    /// Resolve the session for a hook process and record it in `state`.
    ///
    /// Returns `None` when nothing could be adopted and the memory API could
    /// not create a session either.
    pub async fn resolve_for_hook(
        &self,
        state: &mut HookState,
        workspace_id: &str,
        env_session: Option<&str>,
        lineage: u32,
    ) -> Option<ResolvedSession> {
        if let Some(session_id) = adoptable_state_session(state, workspace_id) {
            return Some(ResolvedSession {
                session_id,
                source: SessionSource::State,
            });
        }

        if let Some(handoff) = self.handoffs.read(lineage) {
            if handoff.workspace_id != workspace_id {
                tracing::debug!(
                    session = %handoff.session_id,
                    handoff_workspace = %handoff.workspace_id,
                    workspace = %workspace_id,
                    "Skipping handoff from another workspace"
                );
            } else if state.is_ended(&handoff.session_id) {
                tracing::debug!(session = %handoff.session_id, "Skipping handoff of an ended session");
            } else {
                tracing::debug!(session = %handoff.session_id, lineage, "Adopting handoff session");
                state.update_session_info(&handoff.workspace_id, &handoff.session_id);
                return Some(ResolvedSession {
                    session_id: handoff.session_id,
                    source: SessionSource::Handoff,
                });
            }
        }

        if let Some(session_id) = env_session
            .map(str::trim)
            .filter(|s| !s.is_empty() && !state.is_ended(s))
        {
            state.update_session_info(workspace_id, session_id);
            return Some(ResolvedSession {
                session_id: session_id.to_string(),
                source: SessionSource::Environment,
            });
        }

        let healthy = best_effort("health", self.timeout, self.api.health()).await;
        if healthy != Some(true) {
            tracing::debug!("Memory API not reachable, running without a session");
            return None;
        }

        let info = best_effort("create_session", self.timeout, self.api.create_session(workspace_id)).await?;
        state.update_session_info(workspace_id, &info.session_id);
        Some(ResolvedSession {
            session_id: info.session_id,
            source: SessionSource::Created,
        })
    }

    /// Coordinator side: create a session and publish it for `lineage`.
    pub async fn publish(&self, workspace_id: &str, lineage: u32) -> Result<SessionHandoff> {
        let info = tokio::time::timeout(self.timeout, self.api.create_session(workspace_id))
            .await
            .context("Timed out creating session")?
            .context("Failed to create session")?;

        let handoff = SessionHandoff {
            session_id: info.session_id,
            workspace_id: workspace_id.to_string(),
            pid: std::process::id(),
            created_at: Utc::now(),
        };

        let path = self
            .handoffs
            .write(lineage, &handoff)
            .context("Failed to publish session handoff")?;
        tracing::info!(session = %handoff.session_id, path = %path, "Published session handoff");

        Ok(handoff)
    }

    /// Commit, then end. A failed commit does not skip the end, and a failed
    /// end (e.g. already expired) is not an error.
    pub async fn finish(&self, session_id: &str) -> FinishOutcome {
        let committed = best_effort("commit_session", self.timeout, self.api.commit_session(session_id))
            .await
            .is_some();
        let ended = best_effort("end_session", self.timeout, self.api.end_session(session_id))
            .await
            .is_some();
        FinishOutcome { committed, ended }
    }
}

/// State session, if it belongs to this workspace (or has no workspace recorded).
fn adoptable_state_session(state: &HookState, workspace_id: &str) -> Option<String> {
    let session_id = state.session_id.as_deref().filter(|s| !s.is_empty())?;
    match state.workspace_id.as_deref() {
        Some(ws) if ws != workspace_id => None,
        _ => Some(session_id.to_string()),
    }
}

/// Session to close on Stop: state first, environment second. Blank values
/// count as absent, and an already ended session is not closed twice.
pub fn resolve_for_stop(state: &HookState, env_session: Option<&str>) -> Option<String> {
    state
        .session_id
        .as_deref()
        .and_then(non_blank)
        .or_else(|| env_session.and_then(non_blank).filter(|s| !state.is_ended(s)))
        .map(str::to_string)
}

fn non_blank(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

/// Append `export` lines so shell commands spawned later see the session.
pub fn export_session_env(env_file: &Utf8Path, session_id: &str, workspace_id: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(env_file)?;
    writeln!(file, "export MEMORY_SESSION_ID={}", shell_quote(session_id))?;
    writeln!(file, "export MEMORY_WORKSPACE_ID={}", shell_quote(workspace_id))?;
    Ok(())
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingApi;
    use tempfile::tempdir;

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn store(dir: &tempfile::TempDir) -> HandoffStore {
        HandoffStore::new(Utf8Path::from_path(dir.path()).unwrap().join("handoff"))
    }

    fn handoff(session_id: &str) -> SessionHandoff {
        SessionHandoff {
            session_id: session_id.to_string(),
            workspace_id: "ws".to_string(),
            pid: 4242,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_handoff_write_and_read() {
        let dir = tempdir().unwrap();
        let handoffs = store(&dir);
        let written = handoff("sess-mcp");

        let path = handoffs.write(100, &written).unwrap();
        assert_eq!(path, handoffs.path_for(100));
        assert_eq!(handoffs.read(100), Some(written));
        assert_eq!(handoffs.read(101), None);

        // Only the final file is left behind.
        let entries: Vec<_> = fs::read_dir(handoffs.dir()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_corrupt_handoff_ignored() {
        let dir = tempdir().unwrap();
        let handoffs = store(&dir);
        fs::create_dir_all(handoffs.dir()).unwrap();
        fs::write(handoffs.path_for(7), "{\"sessionId\":").unwrap();
        assert_eq!(handoffs.read(7), None);

        fs::write(
            handoffs.path_for(8),
            r#"{"sessionId":" ","workspaceId":"ws","pid":1,"createdAt":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(handoffs.read(8), None);
    }

    #[tokio::test]
    async fn test_adopts_handoff_without_creating() {
        let dir = tempdir().unwrap();
        let handoffs = store(&dir);
        handoffs.write(55, &handoff("sess-mcp")).unwrap();
        let api = RecordingApi::new();
        let coordinator = SessionCoordinator::new(&api, &handoffs, TIMEOUT);

        let mut state = HookState::default();
        let resolved = coordinator.resolve_for_hook(&mut state, "ws", None, 55).await.unwrap();

        assert_eq!(resolved.session_id, "sess-mcp");
        assert_eq!(resolved.source, SessionSource::Handoff);
        assert_eq!(state.session_id.as_deref(), Some("sess-mcp"));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_creates_when_handoff_missing() {
        let dir = tempdir().unwrap();
        let handoffs = store(&dir);
        let api = RecordingApi::new();
        let coordinator = SessionCoordinator::new(&api, &handoffs, TIMEOUT);

        let mut state = HookState::default();
        let resolved = coordinator.resolve_for_hook(&mut state, "ws", None, 55).await.unwrap();

        assert_eq!(resolved.source, SessionSource::Created);
        assert_eq!(resolved.session_id, "sess-new");
        assert_eq!(state.workspace_id.as_deref(), Some("ws"));
        assert_eq!(api.calls_named("create_session"), vec!["create_session:ws"]);
    }

    #[tokio::test]
    async fn test_creates_when_handoff_corrupt() {
        let dir = tempdir().unwrap();
        let handoffs = store(&dir);
        fs::create_dir_all(handoffs.dir()).unwrap();
        fs::write(handoffs.path_for(55), "garbage").unwrap();
        let api = RecordingApi::new();
        let coordinator = SessionCoordinator::new(&api, &handoffs, TIMEOUT);

        let mut state = HookState::default();
        let resolved = coordinator.resolve_for_hook(&mut state, "ws", None, 55).await.unwrap();
        assert_eq!(resolved.source, SessionSource::Created);
    }

    #[tokio::test]
    async fn test_state_session_wins() {
        let dir = tempdir().unwrap();
        let handoffs = store(&dir);
        handoffs.write(55, &handoff("sess-mcp")).unwrap();
        let api = RecordingApi::new();
        let coordinator = SessionCoordinator::new(&api, &handoffs, TIMEOUT);

        let mut state = HookState::default();
        state.update_session_info("ws", "sess-local");
        let resolved = coordinator.resolve_for_hook(&mut state, "ws", None, 55).await.unwrap();
        assert_eq!(resolved.session_id, "sess-local");
        assert_eq!(resolved.source, SessionSource::State);
    }

    #[tokio::test]
    async fn test_state_session_from_other_workspace_skipped() {
        let dir = tempdir().unwrap();
        let handoffs = store(&dir);
        let api = RecordingApi::new();
        let coordinator = SessionCoordinator::new(&api, &handoffs, TIMEOUT);

        let mut state = HookState::default();
        state.update_session_info("other-ws", "sess-old");
        let resolved = coordinator
            .resolve_for_hook(&mut state, "ws", Some("sess-env"), 55)
            .await
            .unwrap();
        assert_eq!(resolved.session_id, "sess-env");
        assert_eq!(resolved.source, SessionSource::Environment);
        assert_eq!(state.workspace_id.as_deref(), Some("ws"));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_handoff_from_other_workspace_skipped() {
        let dir = tempdir().unwrap();
        let handoffs = store(&dir);
        let mut foreign = handoff("sess-other");
        foreign.workspace_id = "other-ws".to_string();
        handoffs.write(55, &foreign).unwrap();
        let api = RecordingApi::new();
        let coordinator = SessionCoordinator::new(&api, &handoffs, TIMEOUT);

        let mut state = HookState::default();
        let resolved = coordinator.resolve_for_hook(&mut state, "ws", None, 55).await.unwrap();

        assert_eq!(resolved.source, SessionSource::Created);
        assert_eq!(resolved.session_id, "sess-new");
        assert_eq!(state.workspace_id.as_deref(), Some("ws"));
    }

    #[tokio::test]
    async fn test_ended_session_not_adopted_again() {
        let dir = tempdir().unwrap();
        let handoffs = store(&dir);
        handoffs.write(55, &handoff("sess-mcp")).unwrap();
        let api = RecordingApi::new();
        let coordinator = SessionCoordinator::new(&api, &handoffs, TIMEOUT);

        let mut state = HookState::default();
        state.update_session_info("ws", "sess-mcp");
        state.clear_session();

        let resolved = coordinator
            .resolve_for_hook(&mut state, "ws", Some("sess-mcp"), 55)
            .await
            .unwrap();

        assert_eq!(resolved.source, SessionSource::Created);
        assert_eq!(resolved.session_id, "sess-new");
        assert_eq!(api.calls(), vec!["health", "create_session:ws"]);
    }

    #[tokio::test]
    async fn test_unreachable_api_resolves_nothing() {
        let dir = tempdir().unwrap();
        let handoffs = store(&dir);
        let api = RecordingApi::unavailable();
        let coordinator = SessionCoordinator::new(&api, &handoffs, TIMEOUT);

        let mut state = HookState::default();
        assert_eq!(coordinator.resolve_for_hook(&mut state, "ws", None, 55).await, None);
        assert_eq!(state.session_id, None);
        assert!(api.calls_named("create_session").is_empty());
    }

    #[tokio::test]
    async fn test_publish_writes_handoff() {
        let dir = tempdir().unwrap();
        let handoffs = store(&dir);
        let api = RecordingApi::new();
        let coordinator = SessionCoordinator::new(&api, &handoffs, TIMEOUT);

        let published = coordinator.publish("ws", 77).await.unwrap();
        assert_eq!(published.session_id, "sess-new");
        assert_eq!(handoffs.read(77), Some(published));
    }

    #[tokio::test]
    async fn test_publish_fails_without_api() {
        let dir = tempdir().unwrap();
        let handoffs = store(&dir);
        let api = RecordingApi::unavailable();
        let coordinator = SessionCoordinator::new(&api, &handoffs, TIMEOUT);

        assert!(coordinator.publish("ws", 77).await.is_err());
        assert_eq!(handoffs.read(77), None);
    }

    #[tokio::test]
    async fn test_finish_ends_even_if_commit_fails() {
        let dir = tempdir().unwrap();
        let handoffs = store(&dir);
        let api = RecordingApi::new().failing_commit();
        let coordinator = SessionCoordinator::new(&api, &handoffs, TIMEOUT);

        let outcome = coordinator.finish("sess-1").await;
        assert_eq!(outcome, FinishOutcome { committed: false, ended: true });
        assert_eq!(api.calls(), vec!["commit_session:sess-1", "end_session:sess-1"]);
    }

    #[test]
    fn test_resolve_for_stop() {
        let mut state = HookState::default();
        assert_eq!(resolve_for_stop(&state, None), None);
        assert_eq!(resolve_for_stop(&state, Some("env")), Some("env".to_string()));

        state.update_session_info("ws", "local");
        assert_eq!(resolve_for_stop(&state, Some("env")), Some("local".to_string()));
    }

    #[test]
    fn test_resolve_for_stop_blank_state_falls_back() {
        let mut state = HookState::default();
        state.update_session_info("ws", "   ");
        assert_eq!(resolve_for_stop(&state, Some(" env ")), Some("env".to_string()));
        assert_eq!(resolve_for_stop(&state, Some("")), None);

        state.update_session_info("ws", "env");
        state.clear_session();
        assert_eq!(resolve_for_stop(&state, Some("env")), None);
    }

    #[test]
    fn test_export_session_env() {
        let dir = tempdir().unwrap();
        let env_file = Utf8Path::from_path(dir.path()).unwrap().join("env.sh");
        fs::write(&env_file, "export EDITOR=vim\n").unwrap();

        export_session_env(&env_file, "sess-1", "it's-ws").unwrap();

        let content = fs::read_to_string(&env_file).unwrap();
        assert_eq!(
            content,
            "export EDITOR=vim\nexport MEMORY_SESSION_ID='sess-1'\nexport MEMORY_WORKSPACE_ID='it'\\''s-ws'\n"
        );
    }
}
