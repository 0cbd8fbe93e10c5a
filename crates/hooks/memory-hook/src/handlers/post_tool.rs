//! PostToolUse: turn the finished tool call into an observation and store it.

use crate::dispatch::HookContext;
use hook_common::prelude::*;
use hook_memory::{ToolUseEvent, best_effort, build_observation};

pub async fn handle(input: &HookInput, ctx: &mut HookContext<'_>) -> Result<HookResponse> {
    let Some(event) = ToolUseEvent::from_hook_input(input) else {
        return Ok(HookResponse::ok());
    };

    let prompt = input.prompt().or(ctx.state.current_topic());
    let Some(record) = build_observation(&event, prompt) else {
        return Ok(HookResponse::ok());
    };

    let Some(session_id) = ctx.session_id() else {
        tracing::debug!(tool = event.tool_name(), "No session, dropping observation");
        return Ok(HookResponse::ok());
    };

    let key = record.storage_key();
    let value = serde_json::to_value(&record).context("Failed to encode observation")?;
    let stored = best_effort(
        "set_working_memory",
        ctx.timeout(),
        ctx.api.set_working_memory(&session_id, &key, &value),
    )
    .await;
    tracing::debug!(key = %key, stored = stored.is_some(), "Observation handed off");

    Ok(HookResponse::ok())
}
