//! PreToolUse: guard hook-owned files and recall before edits, commands and sub-agents.

use super::RECALL_TITLE;
use crate::dispatch::HookContext;
use crate::render;
use camino::{Utf8Path, Utf8PathBuf};
use hook_common::prelude::*;
use hook_memory::best_effort;
use hook_memory::topic::recall_query;

pub async fn handle(input: &HookInput, ctx: &mut HookContext<'_>) -> Result<HookResponse> {
    let Some(call) = input.tool_call() else {
        return Ok(HookResponse::ok());
    };

    if let Some(path) = protected_target(&call, input, ctx) {
        tracing::warn!(tool = call.name(), path = %path, "Blocking write to hook-owned file");
        return Ok(HookResponse::block(format!(
            "{path} is managed by the memory hooks and must not be edited directly"
        )));
    }

    let query = match &call {
        ToolCall::Edit { .. } | ToolCall::Write { .. } | ToolCall::MultiEdit { .. } | ToolCall::Bash { .. } => {
            topic_query(ctx)
                .or_else(|| tool_query(&call))
                .filter(|q| !ctx.state.was_query_recalled_this_turn(q))
        }
        // A sub-agent launched after this turn already recalled gets nothing extra.
        ToolCall::Task {
            description, prompt, ..
        } if !ctx.state.was_recall_done_this_turn() => description
            .as_deref()
            .or(prompt.as_deref())
            .and_then(recall_query)
            .or_else(|| topic_query(ctx)),
        _ => None,
    };
    let Some(query) = query else {
        return Ok(HookResponse::ok());
    };

    let request = ctx.recall_request(&query);
    let hits = best_effort("recall", ctx.timeout(), ctx.api.recall(&request)).await;
    ctx.state.mark_recall_done(&query);

    let context = hits
        .as_deref()
        .and_then(|hits| render::recall(RECALL_TITLE, hits))
        .unwrap_or_default();
    Ok(HookResponse::ok().with_context(context))
}

fn topic_query(ctx: &HookContext<'_>) -> Option<String> {
    ctx.state.current_topic().and_then(recall_query)
}

/// Query from the call itself: the edited file's name or the command line.
fn tool_query(call: &ToolCall) -> Option<String> {
    if let Some(path) = call.file_path() {
        return Utf8Path::new(path).file_stem().and_then(recall_query);
    }
    call.command()
        .and_then(|command| command.lines().next())
        .and_then(recall_query)
}

/// The resolved target path when a file-writing call aims at the state file
/// or the handoff directory.
fn protected_target(call: &ToolCall, input: &HookInput, ctx: &HookContext<'_>) -> Option<Utf8PathBuf> {
    if !matches!(
        call,
        ToolCall::Write { .. } | ToolCall::Edit { .. } | ToolCall::MultiEdit { .. }
    ) {
        return None;
    }

    let path = Utf8Path::new(call.file_path()?);
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        input
            .cwd
            .as_deref()
            .map(Utf8PathBuf::from)
            .unwrap_or_else(|| ctx.config.project_dir.clone())
            .join(path)
    };

    if path.as_path() == ctx.store.path() || path.starts_with(ctx.handoffs.dir()) {
        Some(path)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::fixtures::{Fixture, context_of};
    use hook_common::output::Decision;
    use hook_common::prelude::*;
    use hook_memory::testing::RecordingApi;
    use serde_json::json;

    fn tool_payload(tool_name: &str, tool_input: serde_json::Value) -> String {
        json!({ "tool_name": tool_name, "tool_input": tool_input }).to_string()
    }

    #[tokio::test]
    async fn test_blocks_write_to_state_file() {
        let fx = Fixture::new();
        let api = RecordingApi::new();
        let payload = tool_payload("Write", json!({"file_path": fx.store().path().as_str(), "content": "{}"}));

        let output = fx.run(HookType::PreToolUse, &payload, &api).await;

        assert!(output.continue_);
        assert_eq!(output.decision, Some(Decision::Block));
        assert!(output.reason.unwrap().contains("managed by the memory hooks"));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_blocks_relative_edit_in_handoff_dir() {
        let fx = Fixture::new();
        let api = RecordingApi::new();
        let payload = json!({
            "tool_name": "Edit",
            "cwd": fx.config.handoff_dir.as_str(),
            "tool_input": {"file_path": "session-1.json", "old_string": "a", "new_string": "b"}
        })
        .to_string();

        let output = fx.run(HookType::PreToolUse, &payload, &api).await;

        assert_eq!(output.decision, Some(Decision::Block));
    }

    #[tokio::test]
    async fn test_read_is_neither_blocked_nor_recalled() {
        let fx = Fixture::new();
        let api = RecordingApi::new();
        let payload = tool_payload("Read", json!({"file_path": fx.store().path().as_str()}));

        let output = fx.run(HookType::PreToolUse, &payload, &api).await;

        assert_eq!(output, HookOutput::proceed());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_distinct_files_recall_separately() {
        let fx = Fixture::new();
        let api = RecordingApi::new().with_hits(&["session ids are uuids"]);
        let edit = |file: &str| tool_payload("Edit", json!({"file_path": file, "old_string": "a", "new_string": "b"}));

        fx.run(HookType::PreToolUse, &edit("src/login.rs"), &api).await;
        let output = fx.run(HookType::PreToolUse, &edit("src/session.rs"), &api).await;
        fx.run(HookType::PreToolUse, &edit("lib/login.rs"), &api).await;

        assert_eq!(api.calls_named("recall"), vec!["recall:login", "recall:session"]);
        assert!(context_of(&output).unwrap().contains("session ids are uuids"));
    }

    #[tokio::test]
    async fn test_bash_recalls_on_command() {
        let fx = Fixture::new();
        let api = RecordingApi::new();

        fx.run(HookType::PreToolUse, &tool_payload("Bash", json!({"command": "cargo build --release"})), &api)
            .await;

        assert_eq!(api.calls_named("recall"), vec!["recall:cargo build release implementation"]);
    }

    #[tokio::test]
    async fn test_task_uses_coarse_flag() {
        let fx = Fixture::new();
        let api = RecordingApi::new();
        let task = |description: &str| tool_payload("Task", json!({"description": description, "prompt": "..."}));

        fx.run(HookType::PreToolUse, &task("Explore auth module"), &api).await;
        fx.run(HookType::PreToolUse, &task("Review payment flow"), &api).await;

        assert_eq!(api.calls_named("recall"), vec!["recall:explore auth module"]);
    }

    #[tokio::test]
    async fn test_task_after_prompt_recall_is_suppressed() {
        let fx = Fixture::new();
        let api = RecordingApi::new();

        fx.run(HookType::UserPromptSubmit, r#"{"prompt": "add dark mode"}"#, &api).await;
        fx.run(
            HookType::PreToolUse,
            &tool_payload("Task", json!({"description": "Find theme files"})),
            &api,
        )
        .await;

        assert_eq!(api.calls_named("recall").len(), 1);
    }

    #[tokio::test]
    async fn test_other_tools_do_nothing() {
        let fx = Fixture::new();
        let api = RecordingApi::new();

        let output = fx
            .run(HookType::PreToolUse, &tool_payload("Grep", json!({"pattern": "todo"})), &api)
            .await;

        assert_eq!(output, HookOutput::proceed());
        assert!(api.calls().is_empty());
    }
}
