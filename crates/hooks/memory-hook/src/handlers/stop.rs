//! Stop: commit and end the session, then forget it locally.

use crate::dispatch::HookContext;
use hook_common::prelude::*;
use hook_memory::session::{SessionCoordinator, resolve_for_stop};

pub async fn handle(input: &HookInput, ctx: &mut HookContext<'_>) -> Result<HookResponse> {
    let Some(session_id) = resolve_for_stop(&ctx.state, ctx.config.session_id.as_deref()) else {
        tracing::debug!("No session to close");
        return Ok(HookResponse::ok());
    };

    let coordinator = SessionCoordinator::new(ctx.api, &ctx.handoffs, ctx.timeout());
    let outcome = coordinator.finish(&session_id).await;
    tracing::info!(
        session = %session_id,
        committed = outcome.committed,
        ended = outcome.ended,
        stop_hook_active = input.stop_hook_active,
        "Closed memory session"
    );

    ctx.state.clear_session();
    Ok(HookResponse::ok())
}
