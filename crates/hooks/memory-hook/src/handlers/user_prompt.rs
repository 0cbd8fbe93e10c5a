//! UserPromptSubmit: start a new turn and recall memories for the prompt.

use super::{CURRENT_TOPIC_KEY, RECALL_TITLE};
use crate::dispatch::HookContext;
use crate::render;
use hook_common::prelude::*;
use hook_memory::best_effort;
use hook_memory::topic::{derive_topic, recall_query};
use serde_json::Value;

pub async fn handle(input: &HookInput, ctx: &mut HookContext<'_>) -> Result<HookResponse> {
    ctx.state.reset_recall_status();

    let Some(topic) = input.prompt().and_then(derive_topic) else {
        return Ok(HookResponse::ok());
    };
    ctx.state.set_current_topic(topic.clone());

    let api = ctx.api;
    let timeout = ctx.timeout();
    let session_id = ctx.session_id();

    let query = recall_query(&topic).filter(|q| !ctx.state.was_query_recalled_this_turn(q));
    let request = query.as_deref().map(|q| ctx.recall_request(q));
    let topic_value = Value::String(topic);

    let recall = async {
        match &request {
            Some(request) => best_effort("recall", timeout, api.recall(request)).await,
            None => None,
        }
    };
    let mirror = async {
        if let Some(session_id) = &session_id {
            best_effort(
                "set_working_memory",
                timeout,
                api.set_working_memory(session_id, CURRENT_TOPIC_KEY, &topic_value),
            )
            .await;
        }
    };
    let (hits, ()) = tokio::join!(recall, mirror);

    if let Some(query) = &query {
        ctx.state.mark_recall_done(query);
    }

    let context = hits
        .as_deref()
        .and_then(|hits| render::recall(RECALL_TITLE, hits))
        .unwrap_or_default();
    Ok(HookResponse::ok().with_context(context))
}
