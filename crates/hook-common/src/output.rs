//! Hook output generation for stdout.
//!
//! Handlers return a [`HookResponse`]; the dispatcher turns it into the one
//! [`HookOutput`] line the host reads.

use crate::event::HookType;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Decision values the host understands. Only blocking is ever emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Block,
}

/// Hook-specific output structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    /// Hook event name
    pub hook_event_name: String,

    /// Text injected into the model's context
    pub additional_context: String,
}

/// Main hook output structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    /// Always true: this system never stops the host
    #[serde(rename = "continue")]
    pub continue_: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// What a handler produced, before protocol shaping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HookResponse {
    /// False only when the handler hit an error it had to report
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Reason for blocking the pending tool call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HookResponse {
    /// Nothing to say, everything fine.
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// Inject context (empty text is dropped).
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        if !context.trim().is_empty() {
            self.context = Some(context);
        }
        self
    }

    /// Ask the host to block the pending tool call (PreToolUse only).
    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            success: true,
            block: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Handler failed; the host still continues.
    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }
}

impl HookOutput {
    /// Plain `{"continue": true}`.
    pub fn proceed() -> Self {
        Self {
            continue_: true,
            hook_specific_output: None,
            decision: None,
            reason: None,
        }
    }

    /// Shape a handler response for the given hook type.
    ///
    /// Context (and any error annotation) is only attached for hook types on
    /// the allow-list, and a block is only honoured for PreToolUse.
    pub fn normalize(hook: HookType, response: HookResponse) -> Self {
        let mut output = Self::proceed();

        if let Some(reason) = response.block {
            if hook.can_block() {
                output.decision = Some(Decision::Block);
                output.reason = Some(reason);
            } else {
                tracing::warn!(hook = %hook, reason = %reason, "Dropping block from non-blocking hook");
            }
        }

        let mut context = response.context.unwrap_or_default();
        if let Some(error) = response.error {
            if !context.is_empty() {
                context.push_str("\n\n");
            }
            context.push_str(&format!("[memory hook error] {}", error));
        }

        if !context.is_empty() && hook.accepts_additional_context() {
            output.hook_specific_output = Some(HookSpecificOutput {
                hook_event_name: hook.as_str().to_string(),
                additional_context: context,
            });
        }

        output
    }

    /// Write the output to stdout as exactly one line.
    pub fn write_stdout(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string(self)?;
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", json)?;
        stdout.flush()?;
        Ok(())
    }
}
