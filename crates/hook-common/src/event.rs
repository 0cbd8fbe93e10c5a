//! Hook type tokens passed by the host on the command line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle events this hook system is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookType {
    SessionStart,
    UserPromptSubmit,
    PreToolUse,
    PostToolUse,
    PreCompact,
    Stop,
}

/// The hook-type argument did not name a known event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown hook type: {0}")]
pub struct UnknownHookType(pub String);

impl HookType {
    pub const ALL: [HookType; 6] = [
        HookType::SessionStart,
        HookType::UserPromptSubmit,
        HookType::PreToolUse,
        HookType::PostToolUse,
        HookType::PreCompact,
        HookType::Stop,
    ];

    /// Event name as the host spells it.
    pub fn as_str(self) -> &'static str {
        match self {
            HookType::SessionStart => "SessionStart",
            HookType::UserPromptSubmit => "UserPromptSubmit",
            HookType::PreToolUse => "PreToolUse",
            HookType::PostToolUse => "PostToolUse",
            HookType::PreCompact => "PreCompact",
            HookType::Stop => "Stop",
        }
    }

    /// Whether the host reads `hookSpecificOutput.additionalContext` for this event.
    ///
    /// The host silently drops the field for anything else, so it must not be
    /// emitted there.
    pub fn accepts_additional_context(self) -> bool {
        CONTEXT_HOOKS.contains(&self)
    }

    /// Only PreToolUse can veto the host's action.
    pub fn can_block(self) -> bool {
        self == HookType::PreToolUse
    }
}

/// Allow-list of events that may carry `hookSpecificOutput`.
const CONTEXT_HOOKS: &[HookType] = &[
    HookType::SessionStart,
    HookType::UserPromptSubmit,
    HookType::PreToolUse,
    HookType::PostToolUse,
];

impl FromStr for HookType {
    type Err = UnknownHookType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HookType::ALL
            .into_iter()
            .find(|hook| hook.as_str() == s)
            .ok_or_else(|| UnknownHookType(s.to_string()))
    }
}

impl fmt::Display for HookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
