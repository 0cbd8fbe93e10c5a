//! Test fixture: an isolated config rooted in a temp dir.

use crate::dispatch;
use camino::{Utf8Path, Utf8PathBuf};
use hook_common::config::{
    ENV_CLAUDE_ENV_FILE, ENV_HANDOFF_DIR, ENV_PROJECT_DIR, ENV_SESSION_ID, ENV_STATE_DIR,
    ENV_TIMEOUT_MS, ENV_WORKSPACE_ID,
};
use hook_common::prelude::*;
use hook_memory::HandoffStore;
use hook_memory::testing::RecordingApi;
use std::collections::HashMap;
use tempfile::TempDir;

pub const LINEAGE: u32 = 4242;

pub struct Fixture {
    _dir: TempDir,
    pub root: Utf8PathBuf,
    vars: HashMap<&'static str, String>,
    pub config: HookConfig,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap().to_path_buf();
        let vars = HashMap::from([
            (ENV_WORKSPACE_ID, "ws".to_string()),
            (ENV_STATE_DIR, root.join("state").to_string()),
            (ENV_HANDOFF_DIR, root.join("handoff").to_string()),
            (ENV_PROJECT_DIR, root.join("project").to_string()),
            (ENV_TIMEOUT_MS, "200".to_string()),
        ]);
        let config = config_from(&vars);
        Self {
            _dir: dir,
            root,
            vars,
            config,
        }
    }

    pub fn with_var(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.vars.insert(key, value.into());
        self.config = config_from(&self.vars);
        self
    }

    pub fn with_env_session(self, session_id: &str) -> Self {
        self.with_var(ENV_SESSION_ID, session_id)
    }

    /// Route session exports to `env` under the temp root.
    pub fn with_env_file(self) -> Self {
        let path = self.root.join("env");
        self.with_var(ENV_CLAUDE_ENV_FILE, path.to_string())
    }

    pub fn store(&self) -> StateStore {
        StateStore::new(&self.config.state_dir)
    }

    pub fn handoffs(&self) -> HandoffStore {
        HandoffStore::new(self.config.handoff_dir.clone())
    }

    pub fn state(&self) -> HookState {
        self.store().read()
    }

    pub fn seed_session(&self, workspace_id: &str, session_id: &str) {
        let mut state = self.state();
        state.update_session_info(workspace_id, session_id);
        self.store().write(&state);
    }

    pub async fn run(&self, hook: HookType, payload: &str, api: &RecordingApi) -> HookOutput {
        let input = HookInput::parse_or_empty(payload, hook);
        dispatch::run(hook, &input, &self.config, api, LINEAGE).await
    }
}

fn config_from(vars: &HashMap<&'static str, String>) -> HookConfig {
    HookConfig::from_lookup(|key| vars.get(key).cloned())
}

/// The injected context, if any.
pub fn context_of(output: &HookOutput) -> Option<&str> {
    output
        .hook_specific_output
        .as_ref()
        .map(|o| o.additional_context.as_str())
}
