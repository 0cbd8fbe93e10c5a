//! Hook dispatcher for the memory system.
//!
//! `memory-hook <HookType>` reads one JSON event from stdin, routes it to the
//! handler for that hook type and prints exactly one JSON line.

pub mod dispatch;
mod handlers;
pub mod render;

#[cfg(test)]
mod fixtures;

pub use dispatch::{HookContext, run};
