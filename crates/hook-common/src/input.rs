//! Hook input parsing from stdin.

use crate::event::HookType;
use serde::Deserialize;
use serde_json::Value;
use std::io::{self, Read};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Main hook input structure received from the host.
///
/// Every field is optional on the wire; a payload that does not parse at all
/// degrades to [`HookInput::empty`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    /// Hook event name as reported by the host
    #[serde(default)]
    pub hook_event_name: Option<String>,

    /// Host-side conversation id (not the memory session id)
    #[serde(default)]
    pub session_id: Option<String>,

    /// Working directory of the host
    #[serde(default)]
    pub cwd: Option<String>,

    /// User prompt (UserPromptSubmit)
    #[serde(default, alias = "user_prompt")]
    pub prompt: Option<String>,

    /// The name of the tool being called (e.g., "Bash", "Edit", "Write")
    #[serde(default)]
    pub tool_name: String,

    /// Raw tool input, kept untyped so it can be hashed verbatim
    #[serde(default)]
    pub tool_input: Value,

    /// Tool result (PostToolUse)
    #[serde(default, alias = "tool_output")]
    pub tool_response: Option<Value>,

    /// Why the session started: startup, resume, clear, compact
    #[serde(default)]
    pub source: Option<String>,

    /// Set by the host when a Stop hook already forced a continuation
    #[serde(default)]
    pub stop_hook_active: bool,
}

impl HookInput {
    /// Empty payload annotated with the hook type.
    pub fn empty(hook: HookType) -> Self {
        Self {
            hook_event_name: Some(hook.as_str().to_string()),
            ..Self::default()
        }
    }

    /// Parse raw stdin, never failing.
    pub fn parse_or_empty(raw: &str, hook: HookType) -> Self {
        if raw.trim().is_empty() {
            return Self::empty(hook);
        }

        match serde_json::from_str::<HookInput>(raw) {
            Ok(mut input) => {
                if input.hook_event_name.is_none() {
                    input.hook_event_name = Some(hook.as_str().to_string());
                }
                input
            }
            Err(e) => {
                tracing::warn!(hook = %hook, error = %e, "Unparseable hook input, using empty payload");
                Self::empty(hook)
            }
        }
    }

    /// Typed view of the tool call, if this event carries one.
    pub fn tool_call(&self) -> Option<ToolCall> {
        if self.tool_name.is_empty() {
            return None;
        }
        Some(ToolCall::from_parts(&self.tool_name, &self.tool_input))
    }

    /// The non-empty user prompt, if any.
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }

    /// Captured tool output flattened to text.
    pub fn tool_output_text(&self) -> Option<String> {
        let response = self.tool_response.as_ref()?;
        let text = match response {
            Value::Null => return None,
            Value::String(s) => s.clone(),
            Value::Object(map) => {
                let parts: Vec<&str> = ["stdout", "stderr", "output", "content", "result"]
                    .iter()
                    .filter_map(|key| map.get(*key).and_then(Value::as_str))
                    .filter(|s| !s.is_empty())
                    .collect();
                if parts.is_empty() {
                    response.to_string()
                } else {
                    parts.join("\n")
                }
            }
            other => other.to_string(),
        };
        Some(text)
    }
}

/// Read all of stdin, giving up after `timeout`.
///
/// The host normally closes stdin right after writing the event. When it does
/// not, an empty string is returned and the caller falls back to `{}`.
pub fn read_stdin_with_timeout(timeout: Duration) -> String {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = String::new();
        if let Err(e) = io::stdin().read_to_string(&mut buf) {
            tracing::warn!(error = %e, "Failed to read stdin");
        }
        let _ = tx.send(buf);
    });

    match rx.recv_timeout(timeout) {
        Ok(buf) => buf,
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "No stdin before timeout");
            String::new()
        }
    }
}

/// One replacement chunk of a MultiEdit call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EditChunk {
    pub old_string: Option<String>,
    pub new_string: Option<String>,
}

/// Tool input keyed by tool name.
///
/// Known tools get their own shape; anything else (including a known tool
/// whose input does not fit its shape) lands in [`ToolCall::Other`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "tool_name", content = "tool_input")]
pub enum ToolCall {
    Read {
        file_path: Option<String>,
    },
    Write {
        file_path: Option<String>,
        content: Option<String>,
    },
    Edit {
        file_path: Option<String>,
        old_string: Option<String>,
        new_string: Option<String>,
    },
    MultiEdit {
        file_path: Option<String>,
        #[serde(default)]
        edits: Vec<EditChunk>,
    },
    NotebookEdit {
        notebook_path: Option<String>,
        new_source: Option<String>,
    },
    Bash {
        command: Option<String>,
        description: Option<String>,
    },
    Glob {
        pattern: Option<String>,
        path: Option<String>,
    },
    Grep {
        pattern: Option<String>,
        path: Option<String>,
    },
    #[serde(rename = "LS")]
    Ls {
        path: Option<String>,
    },
    WebFetch {
        url: Option<String>,
    },
    WebSearch {
        query: Option<String>,
    },
    Task {
        description: Option<String>,
        prompt: Option<String>,
        subagent_type: Option<String>,
    },
    #[serde(skip_deserializing)]
    Other { name: String, input: Value },
}

impl ToolCall {
    /// Build the typed call from the raw name and input bag.
    pub fn from_parts(name: &str, input: &Value) -> Self {
        let input = match input {
            Value::Null => Value::Object(Default::default()),
            other => other.clone(),
        };
        let tagged = serde_json::json!({ "tool_name": name, "tool_input": input });
        serde_json::from_value(tagged).unwrap_or_else(|_| ToolCall::Other {
            name: name.to_string(),
            input,
        })
    }

    /// Tool name as the host spells it.
    pub fn name(&self) -> &str {
        match self {
            ToolCall::Read { .. } => "Read",
            ToolCall::Write { .. } => "Write",
            ToolCall::Edit { .. } => "Edit",
            ToolCall::MultiEdit { .. } => "MultiEdit",
            ToolCall::NotebookEdit { .. } => "NotebookEdit",
            ToolCall::Bash { .. } => "Bash",
            ToolCall::Glob { .. } => "Glob",
            ToolCall::Grep { .. } => "Grep",
            ToolCall::Ls { .. } => "LS",
            ToolCall::WebFetch { .. } => "WebFetch",
            ToolCall::WebSearch { .. } => "WebSearch",
            ToolCall::Task { .. } => "Task",
            ToolCall::Other { name, .. } => name,
        }
    }

    /// The structured file path argument, when the tool takes one.
    pub fn file_path(&self) -> Option<&str> {
        let path = match self {
            ToolCall::Read { file_path }
            | ToolCall::Write { file_path, .. }
            | ToolCall::Edit { file_path, .. }
            | ToolCall::MultiEdit { file_path, .. } => file_path.as_deref(),
            ToolCall::NotebookEdit { notebook_path, .. } => notebook_path.as_deref(),
            _ => None,
        };
        path.map(str::trim).filter(|p| !p.is_empty())
    }

    /// The shell command, for Bash.
    pub fn command(&self) -> Option<&str> {
        match self {
            ToolCall::Bash { command, .. } => {
                command.as_deref().map(str::trim).filter(|c| !c.is_empty())
            }
            _ => None,
        }
    }
}
