//! Turns one completed tool use into an [`ObservationRecord`].
//!
//! The pipeline is skip filter, type, paths, title, facts, concepts, intent,
//! summary, hash. Events that yield no files, facts or concepts produce nothing.

mod extract;
pub mod tables;

use crate::schema::ObservationRecord;
use hook_common::{HookInput, ToolCall};
use serde_json::Value;
use sha2::{Digest, Sha256};

const SUMMARY_COMMAND_CHARS: usize = 80;
const HASH_HEX_CHARS: usize = 16;

/// A completed tool use as seen by PostToolUse.
#[derive(Debug, Clone)]
pub struct ToolUseEvent {
    pub call: ToolCall,
    pub raw_input: Value,
    pub output: Option<String>,
}

impl ToolUseEvent {
    pub fn new(tool_name: &str, raw_input: Value, output: Option<String>) -> Self {
        Self {
            call: ToolCall::from_parts(tool_name, &raw_input),
            raw_input,
            output,
        }
    }

    /// `None` when the event names no tool.
    pub fn from_hook_input(input: &HookInput) -> Option<Self> {
        let call = input.tool_call()?;
        Some(Self {
            call,
            raw_input: input.tool_input.clone(),
            output: input.tool_output_text(),
        })
    }

    pub fn tool_name(&self) -> &str {
        self.call.name()
    }
}

/// Build the observation for `event`, or `None` when it is skipped or empty.
pub fn build_observation(event: &ToolUseEvent, prompt: Option<&str>) -> Option<ObservationRecord> {
    let tool_name = event.tool_name();
    if tables::is_skipped(tool_name) {
        return None;
    }

    let observation_type = tables::classify(tool_name);
    let (files_read, files_modified) = extract::paths(&event.call, observation_type);
    let facts = extract::facts(&event.call, event.output.as_deref());
    let concepts = extract::concepts(&event.call, &files_read, &files_modified);

    if files_read.is_empty() && files_modified.is_empty() && facts.is_empty() && concepts.is_empty() {
        tracing::debug!(tool = tool_name, "Nothing worth observing");
        return None;
    }

    let title = extract::title(&event.call);
    let intent = extract::intent(prompt, tool_name, &event.raw_input);
    let summary = summarize(&event.call, &files_read, &files_modified).unwrap_or_else(|| title.clone());
    let content_hash = content_hash(tool_name, &event.raw_input, &summary);

    Some(ObservationRecord {
        observation_type,
        title,
        summary,
        files_read,
        files_modified,
        facts,
        concepts,
        intent,
        content_hash,
    })
}

fn summarize(call: &ToolCall, files_read: &[String], files_modified: &[String]) -> Option<String> {
    let mut pieces = Vec::new();
    if !files_read.is_empty() {
        pieces.push(format!("Read: {}", files_read.join(", ")));
    }
    if !files_modified.is_empty() {
        pieces.push(format!("Modified: {}", files_modified.join(", ")));
    }

    let action = match call {
        ToolCall::Bash { .. } => call
            .command()
            .map(|c| format!("Ran `{}`", extract::truncate(c, SUMMARY_COMMAND_CHARS))),
        ToolCall::Glob { pattern, .. } | ToolCall::Grep { pattern, .. } => {
            pattern.as_deref().map(|p| format!("Searched for `{p}`"))
        }
        ToolCall::WebSearch { query } => query.as_deref().map(|q| format!("Web search `{q}`")),
        ToolCall::WebFetch { url } => url.as_deref().map(|u| format!("Fetched {u}")),
        ToolCall::Task { description, .. } => description.as_deref().map(|d| format!("Delegated: {d}")),
        _ => None,
    };
    pieces.extend(action.filter(|a| !a.trim().is_empty()));

    if pieces.is_empty() {
        None
    } else {
        Some(pieces.join("; "))
    }
}

/// First 16 hex chars of SHA-256 over (tool name, serialized input, summary).
pub fn content_hash(tool_name: &str, raw_input: &Value, summary: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tool_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(raw_input.to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(summary.as_bytes());
    let mut hex = hex::encode(hasher.finalize());
    hex.truncate(HASH_HEX_CHARS);
    hex
}
