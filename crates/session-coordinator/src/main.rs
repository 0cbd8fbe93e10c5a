//! session-coordinator: long-lived owner of the memory session.
//!
//! Started once per host window. Creates a server-side session, publishes it
//! in the handoff file for its lineage so hook processes of the same host can
//! adopt it, then stays up until the host closes its stdin.

use anyhow::{Context, Result};
use clap::Parser;
use hook_common::config::NON_HOOK_TIMEOUT;
use hook_common::{HookConfig, init_logging};
use hook_memory::session::lineage_pid;
use hook_memory::{HandoffStore, HttpMemoryClient, SessionCoordinator};

#[derive(Parser, Debug)]
#[command(name = "session-coordinator")]
#[command(about = "Create the memory session and hand it off to hook processes")]
#[command(version)]
struct Cli {
    /// Workspace id (default: MEMORY_WORKSPACE_ID, else the project directory name)
    #[arg(long)]
    workspace: Option<String>,

    /// Publish the handoff and exit instead of waiting for stdin to close
    #[arg(long)]
    once: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = HookConfig::from_env();
    let _logging_guard = init_logging(&config.project_dir);

    let workspace_id = cli.workspace.unwrap_or_else(|| config.workspace_id.clone());
    let client = HttpMemoryClient::for_service(&config).context("Failed to build memory client")?;
    let handoffs = HandoffStore::new(config.handoff_dir.clone());
    let coordinator = SessionCoordinator::new(&client, &handoffs, NON_HOOK_TIMEOUT);

    let lineage = lineage_pid();
    let handoff = coordinator.publish(&workspace_id, lineage).await?;
    println!("{}", serde_json::to_string(&handoff)?);

    if !cli.once {
        tokio::io::copy(&mut tokio::io::stdin(), &mut tokio::io::sink())
            .await
            .context("Failed waiting on stdin")?;
        tracing::info!(session = %handoff.session_id, lineage, "Host closed stdin, exiting");
    }

    Ok(())
}
