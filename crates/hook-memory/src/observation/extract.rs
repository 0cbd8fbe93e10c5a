//! Individual extraction stages. Each stage is a pure function of the call.

use super::tables;
use crate::schema::{Intent, ObservationType};
use hook_common::ToolCall;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

const MAX_COMMAND_PATHS: usize = 5;
const MAX_IDENTIFIERS: usize = 3;
const TITLE_COMMAND_CHARS: usize = 50;
const FACT_COMMAND_CHARS: usize = 80;

static FAILED_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b[1-9]\d*\s+(failed|failing|failures?)\b").expect("valid regex"));
static PASSED_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b\d+\s+(passed|passing)\b").expect("valid regex"));

/// Trimmed non-empty string field.
fn text(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// First line of `s`, cut to `max` chars with a trailing ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    let line = s.lines().next().unwrap_or("").trim();
    if line.chars().count() <= max {
        line.to_string()
    } else {
        let cut: String = line.chars().take(max).collect();
        format!("{cut}...")
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// Path-like tokens in a shell command, first-seen order, bounded.
pub fn command_paths(command: &str) -> Vec<String> {
    let mut paths = Vec::new();
    for capture in tables::COMMAND_PATH_PATTERN.captures_iter(command) {
        if let Some(m) = capture.get(1) {
            push_unique(&mut paths, m.as_str());
        }
        if paths.len() == MAX_COMMAND_PATHS {
            break;
        }
    }
    paths
}

/// `(files_read, files_modified)` for the call.
pub fn paths(call: &ToolCall, observation_type: ObservationType) -> (Vec<String>, Vec<String>) {
    let found = match call.file_path() {
        Some(path) => vec![path.to_string()],
        None => call.command().map(command_paths).unwrap_or_default(),
    };

    match observation_type {
        ObservationType::Write => (Vec::new(), found),
        ObservationType::Read | ObservationType::Execute => (found, Vec::new()),
        ObservationType::Search | ObservationType::Other => (Vec::new(), Vec::new()),
    }
}

pub fn title(call: &ToolCall) -> String {
    let name = call.name();
    let detail = match call {
        ToolCall::Read { .. } => call.file_path().map(|p| format!("Read {p}")),
        ToolCall::Write { .. } => call.file_path().map(|p| format!("Write {p}")),
        ToolCall::Edit { .. } | ToolCall::MultiEdit { .. } => {
            call.file_path().map(|p| format!("Edit {p}"))
        }
        ToolCall::NotebookEdit { .. } => call.file_path().map(|p| format!("Edit notebook {p}")),
        ToolCall::Bash { .. } => call
            .command()
            .map(|c| format!("Run: {}", truncate(c, TITLE_COMMAND_CHARS))),
        ToolCall::Glob { pattern, .. } => text(pattern).map(|p| format!("Find files: {p}")),
        ToolCall::Grep { pattern, .. } => text(pattern).map(|p| format!("Search: {p}")),
        ToolCall::Ls { path } => text(path).map(|p| format!("List {p}")),
        ToolCall::WebFetch { url } => text(url).map(|u| format!("Fetch {u}")),
        ToolCall::WebSearch { query } => text(query).map(|q| format!("Web search: {q}")),
        ToolCall::Task { description, .. } => text(description).map(|d| format!("Task: {d}")),
        ToolCall::Other { .. } => None,
    };
    detail.unwrap_or_else(|| name.to_string())
}

/// Outcome line for test-like shell output. Failure markers win.
pub fn test_outcome(output: &str) -> Option<&'static str> {
    let lower = output.to_lowercase();
    if lower.contains("test result: ok") || lower.contains("all tests passed") {
        return Some("Tests passed");
    }
    if lower.contains("test result: failed") || FAILED_COUNT.is_match(output) {
        return Some("Tests failed");
    }
    if PASSED_COUNT.is_match(output) || lower.contains("tests passed") {
        return Some("Tests passed");
    }
    None
}

pub fn facts(call: &ToolCall, output: Option<&str>) -> Vec<String> {
    let mut facts = Vec::new();
    match call {
        ToolCall::Read { .. } => {
            if let Some(p) = call.file_path() {
                facts.push(format!("File read: {p}"));
            }
        }
        ToolCall::Write { .. } => {
            if let Some(p) = call.file_path() {
                facts.push(format!("File written: {p}"));
            }
        }
        ToolCall::Edit { .. } => {
            if let Some(p) = call.file_path() {
                facts.push(format!("File modified: {p}"));
            }
        }
        ToolCall::MultiEdit { edits, .. } => {
            if let Some(p) = call.file_path() {
                facts.push(format!("File modified: {p}"));
            }
            if edits.len() > 1 {
                facts.push(format!("{} edits applied", edits.len()));
            }
        }
        ToolCall::NotebookEdit { .. } => {
            if let Some(p) = call.file_path() {
                facts.push(format!("Notebook modified: {p}"));
            }
        }
        ToolCall::Bash { .. } => {
            if let Some(c) = call.command() {
                facts.push(format!("Command run: {}", truncate(c, FACT_COMMAND_CHARS)));
            }
            if let Some(outcome) = output.and_then(test_outcome) {
                facts.push(outcome.to_string());
            }
        }
        ToolCall::Glob { pattern, .. } => {
            if let Some(p) = text(pattern) {
                facts.push(format!("Searched files matching: {p}"));
            }
        }
        ToolCall::Grep { pattern, path } => match (text(pattern), text(path)) {
            (Some(p), Some(dir)) => facts.push(format!("Searched code for: {p} in {dir}")),
            (Some(p), None) => facts.push(format!("Searched code for: {p}")),
            _ => {}
        },
        ToolCall::Ls { path } => {
            if let Some(p) = text(path) {
                facts.push(format!("Listed directory: {p}"));
            }
        }
        ToolCall::WebFetch { url } => {
            if let Some(u) = text(url) {
                facts.push(format!("Fetched URL: {u}"));
            }
        }
        ToolCall::WebSearch { query } => {
            if let Some(q) = text(query) {
                facts.push(format!("Searched web for: {q}"));
            }
        }
        ToolCall::Task { description, prompt, .. } => {
            if let Some(d) = text(description).or(text(prompt)) {
                facts.push(format!("Delegated task: {}", truncate(d, FACT_COMMAND_CHARS)));
            }
        }
        ToolCall::Other { .. } => {}
    }
    facts
}

fn path_concepts(path: &str, concepts: &mut Vec<String>) {
    let segments: Vec<&str> = path.split(['/', '\\']).filter(|s| !s.is_empty()).collect();
    let Some((file_name, dirs)) = segments.split_last() else {
        return;
    };

    let by_name = tables::file_name_concept(file_name);
    let by_ext = file_name
        .rsplit_once('.')
        .and_then(|(_, ext)| tables::extension_concept(ext));
    if let Some(tag) = by_name.or(by_ext) {
        push_unique(concepts, tag);
    }
    for dir in dirs {
        if let Some(tag) = tables::directory_concept(dir) {
            push_unique(concepts, tag);
        }
    }
}

fn code_concepts(code: &str, concepts: &mut Vec<String>) {
    for (tag, re) in tables::CODE_CONCEPTS.iter() {
        if re.is_match(code) {
            push_unique(concepts, tag);
        }
    }
    let identifiers = tables::IDENTIFIER_PATTERN
        .captures_iter(code)
        .filter_map(|c| c.get(1))
        .take(MAX_IDENTIFIERS);
    for ident in identifiers {
        push_unique(concepts, ident.as_str());
    }
}

/// Text an edit introduces or replaces.
fn edited_text(call: &ToolCall) -> Vec<&str> {
    match call {
        ToolCall::Write { content, .. } => content.as_deref().into_iter().collect(),
        ToolCall::Edit {
            old_string,
            new_string,
            ..
        } => [old_string, new_string]
            .into_iter()
            .filter_map(|s| s.as_deref())
            .collect(),
        ToolCall::MultiEdit { edits, .. } => edits
            .iter()
            .flat_map(|e| [&e.old_string, &e.new_string])
            .filter_map(|s| s.as_deref())
            .collect(),
        ToolCall::NotebookEdit { new_source, .. } => new_source.as_deref().into_iter().collect(),
        _ => Vec::new(),
    }
}

pub fn concepts(call: &ToolCall, files_read: &[String], files_modified: &[String]) -> Vec<String> {
    let mut concepts = Vec::new();
    for path in files_read.iter().chain(files_modified) {
        path_concepts(path, &mut concepts);
    }
    for code in edited_text(call) {
        code_concepts(code, &mut concepts);
    }
    if let Some(command) = call.command() {
        for (tag, re) in tables::SHELL_CONCEPTS.iter() {
            if re.is_match(command) {
                push_unique(&mut concepts, tag);
            }
        }
    }
    concepts
}

fn match_intent(text: &str) -> Option<Intent> {
    tables::INTENT_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(intent, _)| *intent)
}

/// Intent from the prompt, then the serialized input, then the tool default.
pub fn intent(prompt: Option<&str>, tool_name: &str, raw_input: &Value) -> Option<Intent> {
    prompt
        .and_then(match_intent)
        .or_else(|| match_intent(&raw_input.to_string()))
        .or_else(|| tables::default_intent(tool_name))
}
