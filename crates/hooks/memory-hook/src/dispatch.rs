//! One hook event in, one normalized output out.

use crate::handlers;
use hook_common::prelude::*;
use hook_memory::client::RecallRequest;
use hook_memory::{HandoffStore, MemoryApi};
use std::time::Duration;

/// Recall hits requested per query.
pub const RECALL_LIMIT: usize = 5;

/// Everything a handler may touch while serving one event.
pub struct HookContext<'a> {
    pub config: &'a HookConfig,
    pub api: &'a dyn MemoryApi,
    pub store: StateStore,
    pub handoffs: HandoffStore,
    /// Working copy; persisted by [`run`] if a handler changed it
    pub state: HookState,
    /// Parent pid keying this lineage's handoff file
    pub lineage: u32,
}

impl<'a> HookContext<'a> {
    pub fn new(config: &'a HookConfig, api: &'a dyn MemoryApi, lineage: u32) -> Self {
        let store = StateStore::new(&config.state_dir);
        let state = store.read();
        Self {
            config,
            api,
            store,
            handoffs: HandoffStore::new(config.handoff_dir.clone()),
            state,
            lineage,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.config.hook_timeout
    }

    /// Adopted session, else the environment fallback unless Stop ended it.
    pub fn session_id(&self) -> Option<String> {
        self.state.session_id.clone().or_else(|| {
            self.config
                .session_id
                .clone()
                .filter(|id| !self.state.is_ended(id))
        })
    }

    pub fn recall_request(&self, query: &str) -> RecallRequest {
        RecallRequest {
            workspace_id: self.config.workspace_id.clone(),
            session_id: self.session_id(),
            query: query.to_string(),
            limit: RECALL_LIMIT,
        }
    }
}

/// Serve one event: load state, run the handler, persist, normalize.
///
/// Never fails; handler errors become an annotation on the output.
pub async fn run(
    hook: HookType,
    input: &HookInput,
    config: &HookConfig,
    api: &dyn MemoryApi,
    lineage: u32,
) -> HookOutput {
    let mut ctx = HookContext::new(config, api, lineage);
    let loaded = ctx.state.clone();

    let response = match handlers::handle(hook, input, &mut ctx).await {
        Ok(response) => response,
        Err(e) => {
            let message = format!("{e:#}");
            tracing::warn!(hook = %hook, error = %message, "Hook handler failed");
            HookResponse::failed(message)
        }
    };

    if ctx.state != loaded {
        ctx.store.write(&ctx.state);
    }

    tracing::debug!(hook = %hook, response = ?response, "Hook finished");
    HookOutput::normalize(hook, response)
}
