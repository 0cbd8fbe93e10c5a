//! SessionStart: adopt or create the session, then brief the model.

use super::{CURRENT_TOPIC_KEY, RECALL_TITLE};
use crate::dispatch::HookContext;
use crate::render;
use hook_common::prelude::*;
use hook_memory::best_effort;
use hook_memory::session::{SessionCoordinator, SessionSource, export_session_env};
use hook_memory::topic::{derive_topic, recall_query};
use serde_json::Value;

pub async fn handle(input: &HookInput, ctx: &mut HookContext<'_>) -> Result<HookResponse> {
    ctx.state.reset_recall_status();

    let api = ctx.api;
    let timeout = ctx.timeout();
    let workspace_id = ctx.config.workspace_id.clone();

    let coordinator = SessionCoordinator::new(api, &ctx.handoffs, timeout);
    let resolved = coordinator
        .resolve_for_hook(
            &mut ctx.state,
            &workspace_id,
            ctx.config.session_id.as_deref(),
            ctx.lineage,
        )
        .await;

    let Some(resolved) = resolved else {
        tracing::info!(workspace = %workspace_id, "No memory session, continuing without memory");
        return Ok(HookResponse::ok());
    };
    tracing::info!(
        session = %resolved.session_id,
        source = ?resolved.source,
        start = input.source.as_deref().unwrap_or("startup"),
        "Memory session ready"
    );

    if let Some(env_file) = &ctx.config.env_file {
        if let Err(e) = export_session_env(env_file, &resolved.session_id, &workspace_id) {
            tracing::warn!(path = %env_file, error = %e, "Failed to export session id");
        }
    }

    if resolved.source != SessionSource::Created && ctx.state.current_topic().is_none() {
        let stored = best_effort(
            "get_working_memory",
            timeout,
            api.get_working_memory(&resolved.session_id, CURRENT_TOPIC_KEY),
        )
        .await
        .flatten();
        if let Some(topic) = stored.as_ref().and_then(Value::as_str).and_then(derive_topic) {
            tracing::debug!(topic = %topic, "Restored topic from working memory");
            ctx.state.set_current_topic(topic);
        }
    }

    let query = ctx
        .state
        .current_topic()
        .and_then(recall_query)
        .filter(|q| !ctx.state.was_query_recalled_this_turn(q));
    let request = query.as_deref().map(|q| ctx.recall_request(q));

    let briefing = best_effort("briefing", timeout, api.briefing(&workspace_id));
    let recall = async {
        match &request {
            Some(request) => best_effort("recall", timeout, api.recall(request)).await,
            None => None,
        }
    };
    let (briefing, hits) = tokio::join!(briefing, recall);

    if let Some(query) = &query {
        ctx.state.mark_recall_done(query);
    }

    let context = render::join([
        briefing.as_ref().and_then(render::briefing),
        hits.as_deref().and_then(|hits| render::recall(RECALL_TITLE, hits)),
    ]);
    Ok(HookResponse::ok().with_context(context))
}

#[cfg(test)]
mod tests {
    use crate::fixtures::{Fixture, LINEAGE};
    use chrono::Utc;
    use hook_common::config::ENV_TIMEOUT_MS;
    use hook_common::prelude::*;
    use hook_memory::SessionHandoff;
    use hook_memory::testing::RecordingApi;
    use serde_json::json;
    use std::time::{Duration, Instant};

    fn handoff(session_id: &str) -> SessionHandoff {
        SessionHandoff {
            session_id: session_id.to_string(),
            workspace_id: "ws".to_string(),
            pid: 1,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_adopts_lineage_handoff() {
        let fx = Fixture::new();
        fx.handoffs().write(LINEAGE, &handoff("sess-handoff")).unwrap();
        let api = RecordingApi::new();

        let output = fx.run(HookType::SessionStart, "{}", &api).await;

        assert!(output.continue_);
        assert!(api.calls_named("create_session").is_empty());
        assert!(api.calls_named("health").is_empty());
        assert_eq!(fx.state().session_id.as_deref(), Some("sess-handoff"));
    }

    #[tokio::test]
    async fn test_corrupt_handoff_creates_own_session() {
        let fx = Fixture::new();
        let path = fx.handoffs().path_for(LINEAGE);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{\"sessionId\": ").unwrap();
        let api = RecordingApi::new();

        let output = fx.run(HookType::SessionStart, "{}", &api).await;

        assert!(output.continue_);
        assert_eq!(api.calls_named("create_session"), vec!["create_session:ws"]);
        let state = fx.state();
        assert_eq!(state.session_id.as_deref(), Some("sess-new"));
        assert_eq!(state.workspace_id.as_deref(), Some("ws"));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_a_no_op() {
        let fx = Fixture::new();
        let api = RecordingApi::unavailable();

        let output = fx.run(HookType::SessionStart, "{}", &api).await;

        assert_eq!(output, HookOutput::proceed());
        assert_eq!(api.calls(), vec!["health"]);
        assert_eq!(fx.state().session_id, None);
    }

    #[tokio::test]
    async fn test_exports_session_to_env_file() {
        let fx = Fixture::new().with_env_file();
        let api = RecordingApi::new();

        fx.run(HookType::SessionStart, "{}", &api).await;

        let exported = std::fs::read_to_string(fx.root.join("env")).unwrap();
        assert!(exported.contains("export MEMORY_SESSION_ID='sess-new'"));
        assert!(exported.contains("export MEMORY_WORKSPACE_ID='ws'"));
    }

    #[tokio::test]
    async fn test_briefing_and_topic_recall_are_joined() {
        let fx = Fixture::new();
        let mut state = HookState::default();
        state.update_session_info("ws", "sess-1");
        state.set_current_topic("fix login error");
        fx.store().write(&state);
        let api = RecordingApi::new()
            .with_briefing("Auth rewrite in progress")
            .with_hits(&["login uses JWT"]);

        let output = fx.run(HookType::SessionStart, "{}", &api).await;

        insta::assert_json_snapshot!(output, @r###"
        {
          "continue": true,
          "hookSpecificOutput": {
            "hookEventName": "SessionStart",
            "additionalContext": "# Workspace briefing\n\nAuth rewrite in progress\n\n# Related memories\n\n- login uses JWT"
          }
        }
        "###);
        assert_eq!(api.calls_named("briefing"), vec!["briefing:ws"]);
        assert_eq!(api.calls_named("recall"), vec!["recall:fix login error"]);
        assert!(fx.state().was_query_recalled_this_turn("fix login error"));
    }

    #[tokio::test]
    async fn test_slow_briefing_and_recall_time_out_together() {
        let fx = Fixture::new().with_var(ENV_TIMEOUT_MS, "400");
        let mut state = HookState::default();
        state.update_session_info("ws", "sess-1");
        state.set_current_topic("fix login error");
        fx.store().write(&state);
        let api = RecordingApi::new()
            .with_hits(&["login uses JWT"])
            .with_delay(Duration::from_secs(1));

        let started = Instant::now();
        let output = fx.run(HookType::SessionStart, "{}", &api).await;

        // Both calls share one timeout window instead of queueing.
        assert!(started.elapsed() < Duration::from_millis(700));
        assert_eq!(output, HookOutput::proceed());
        assert_eq!(api.calls_named("briefing").len(), 1);
        assert_eq!(api.calls_named("recall").len(), 1);
        assert!(fx.state().was_query_recalled_this_turn("fix login error"));
    }

    #[tokio::test]
    async fn test_resets_turn_ledger() {
        let fx = Fixture::new();
        let mut state = HookState::default();
        state.update_session_info("ws", "sess-1");
        state.mark_recall_done("old query");
        fx.store().write(&state);
        let api = RecordingApi::new();

        fx.run(HookType::SessionStart, "{}", &api).await;

        let state = fx.state();
        assert!(!state.was_query_recalled_this_turn("old query"));
        assert!(!state.was_recall_done_this_turn());
    }

    #[tokio::test]
    async fn test_restores_topic_from_working_memory() {
        let fx = Fixture::new();
        fx.seed_session("ws", "sess-1");
        let api = RecordingApi::new();
        api.seed("currentTopic", json!("refactor the parser"));

        fx.run(HookType::SessionStart, "{}", &api).await;

        assert_eq!(fx.state().current_topic(), Some("refactor the parser"));
        assert_eq!(api.calls_named("get_working_memory"), vec!["get_working_memory:sess-1/currentTopic"]);
        assert_eq!(api.calls_named("recall"), vec!["recall:refactor parser"]);
    }

    #[tokio::test]
    async fn test_other_workspace_state_is_not_adopted() {
        let fx = Fixture::new();
        fx.seed_session("other-ws", "sess-other");
        let api = RecordingApi::new();

        fx.run(HookType::SessionStart, "{}", &api).await;

        assert_eq!(api.calls_named("create_session"), vec!["create_session:ws"]);
        assert_eq!(fx.state().session_id.as_deref(), Some("sess-new"));
    }
}
