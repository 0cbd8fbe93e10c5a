//! Common utilities for the memory hooks.
//!
//! This crate provides shared functionality for the hook binaries:
//! - Hook type tokens and JSON input parsing
//! - Protocol output shaping
//! - Durable hook state with the turn-scoped recall ledger
//! - Environment configuration
//! - Logging

pub mod config;
pub mod debug;
pub mod event;
pub mod input;
pub mod output;
pub mod state;

pub use config::HookConfig;
pub use debug::init_logging;
pub use event::{HookType, UnknownHookType};
pub use input::{HookInput, ToolCall};
pub use output::{HookOutput, HookResponse};
pub use state::{HookState, StateStore};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::HookConfig;
    pub use crate::event::HookType;
    pub use crate::input::{HookInput, ToolCall};
    pub use crate::output::{HookOutput, HookResponse};
    pub use crate::state::{HookState, StateStore};
    pub use anyhow::{Context, Result};
    pub use serde::{Deserialize, Serialize};
}
