//! One handler per hook type.

mod post_tool;
mod pre_tool;
mod session_start;
mod stop;
mod user_prompt;

use crate::dispatch::HookContext;
use hook_common::prelude::*;

/// Working-memory key mirroring the current topic.
pub const CURRENT_TOPIC_KEY: &str = "currentTopic";

/// Heading of recall blocks.
pub const RECALL_TITLE: &str = "Related memories";

pub async fn handle(hook: HookType, input: &HookInput, ctx: &mut HookContext<'_>) -> Result<HookResponse> {
    match hook {
        HookType::SessionStart => session_start::handle(input, ctx).await,
        HookType::UserPromptSubmit => user_prompt::handle(input, ctx).await,
        HookType::PreToolUse => pre_tool::handle(input, ctx).await,
        HookType::PostToolUse => post_tool::handle(input, ctx).await,
        // Context is about to be truncated; nothing to inject or record.
        HookType::PreCompact => Ok(HookResponse::ok()),
        HookType::Stop => stop::handle(input, ctx).await,
    }
}
