//! memory-hook: entry point registered for every lifecycle hook.
//!
//! Exit code is 0 for every handled event, including ones whose handler
//! failed. It is 1 only for a bad invocation (missing, extra or unknown hook
//! type) or a panic.

use clap::Parser;
use clap::error::ErrorKind;
use hook_common::input::read_stdin_with_timeout;
use hook_common::prelude::*;
use hook_common::init_logging;
use hook_memory::HttpMemoryClient;
use hook_memory::session::lineage_pid;
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "memory-hook")]
#[command(about = "Memory hooks for the agent lifecycle")]
#[command(version)]
struct Cli {
    /// Hook event: SessionStart, UserPromptSubmit, PreToolUse, PostToolUse, PreCompact or Stop
    #[arg(value_name = "HOOK")]
    hook: String,
}

fn main() -> ExitCode {
    let parsed = Cli::try_parse();
    let config = HookConfig::from_env();
    let _logging_guard = init_logging(&config.project_dir);

    let cli = match parsed {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => return refuse(e.kind().as_str().unwrap_or("invalid arguments").to_string()),
    };

    let hook = match cli.hook.parse::<HookType>() {
        Ok(hook) => hook,
        Err(e) => return refuse(e.to_string()),
    };

    let raw = read_stdin_with_timeout(config.stdin_timeout);
    let input = HookInput::parse_or_empty(&raw, hook);

    let output = match panic::catch_unwind(AssertUnwindSafe(|| serve(hook, &input, &config))) {
        Ok(output) => output,
        Err(_) => {
            tracing::error!(hook = %hook, "Hook panicked");
            let _ = HookOutput::proceed().write_stdout();
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = output.write_stdout() {
        tracing::error!(hook = %hook, error = %e, "Failed to write hook output");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Invalid invocation: still one protocol line, but a failing exit code.
fn refuse(error: String) -> ExitCode {
    tracing::error!(error = %error, "Refusing to run");
    println!("{}", serde_json::json!({ "continue": true, "error": error }));
    ExitCode::FAILURE
}

/// Run the dispatcher on a single-threaded runtime.
fn serve(hook: HookType, input: &HookInput, config: &HookConfig) -> HookOutput {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => return HookOutput::normalize(hook, HookResponse::failed(format!("runtime: {e}"))),
    };
    let client = match HttpMemoryClient::for_hooks(config) {
        Ok(client) => client,
        Err(e) => return HookOutput::normalize(hook, HookResponse::failed(e)),
    };

    runtime.block_on(memory_hook::run(hook, input, config, &client, lineage_pid()))
}
