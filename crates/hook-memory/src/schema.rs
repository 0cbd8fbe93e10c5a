//! Observation schema handed to the memory store.

use serde::{Deserialize, Serialize};

/// Classification of the tool that triggered an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationType {
    Read,
    Write,
    Execute,
    Search,
    Other,
}

/// What the user seems to be doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Bugfix,
    Feature,
    Refactor,
    Testing,
    Investigation,
    Documentation,
}

/// Structured summary of one tool use.
///
/// Built once per qualifying event and handed off; never kept locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationRecord {
    #[serde(rename = "type")]
    pub observation_type: ObservationType,

    pub title: String,

    pub summary: String,

    /// Distinct paths, first-seen order
    #[serde(default)]
    pub files_read: Vec<String>,

    /// Distinct paths, first-seen order
    #[serde(default)]
    pub files_modified: Vec<String>,

    #[serde(default)]
    pub facts: Vec<String>,

    /// Distinct tags, first-seen order
    #[serde(default)]
    pub concepts: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,

    /// 16 hex chars over (tool name, serialized input, summary)
    pub content_hash: String,
}

impl ObservationRecord {
    /// Working-memory key; identical observations collapse onto one key.
    pub fn storage_key(&self) -> String {
        format!("observation:{}", self.content_hash)
    }
}
