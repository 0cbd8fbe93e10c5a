//! Recall query derivation from user prompts.
//!
//! UserPromptSubmit and PreToolUse both turn the current topic into a query
//! through [`recall_query`], so one topic always maps to one normalized query
//! and the per-turn ledger can suppress repeats.

use regex::Regex;
use std::sync::LazyLock;

const MAX_TOPIC_CHARS: usize = 200;
const MAX_KEY_TERMS: usize = 6;
const MIN_TERM_LEN: usize = 3;

const STOPWORDS: &[&str] = &[
    "about", "after", "again", "all", "also", "and", "any", "are", "because", "been", "before",
    "being", "but", "can", "could", "did", "does", "doing", "done", "for", "from", "get", "had",
    "has", "have", "help", "her", "here", "him", "his", "how", "into", "its", "just", "let",
    "like", "make", "more", "most", "need", "not", "now", "off", "once", "only", "other", "our",
    "out", "over", "please", "same", "she", "should", "some", "such", "than", "that", "the",
    "their", "them", "then", "there", "these", "they", "this", "those", "through", "too", "use",
    "using", "very", "want", "was", "way", "were", "what", "when", "where", "which", "while",
    "who", "why", "will", "with", "would", "you", "your",
];

/// Kind of request a prompt looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptPattern {
    Error,
    Implement,
    Refactor,
    Test,
    Explain,
}

impl PromptPattern {
    /// Word appended to the recall query for this pattern.
    pub fn query_suffix(self) -> &'static str {
        match self {
            PromptPattern::Error => "fix",
            PromptPattern::Implement => "implementation",
            PromptPattern::Refactor => "refactor",
            PromptPattern::Test => "test",
            PromptPattern::Explain => "overview",
        }
    }
}

/// Ordered: the first matching row wins.
static PATTERNS: LazyLock<Vec<(PromptPattern, Regex)>> = LazyLock::new(|| {
    [
        (
            PromptPattern::Error,
            r"(?i)\b(error|errors|exception|fail|failing|failed|failure|crash|crashes|broken|bug|panic|traceback)\b",
        ),
        (
            PromptPattern::Implement,
            r"(?i)\b(implement|add|create|build|introduce|support)\b",
        ),
        (
            PromptPattern::Refactor,
            r"(?i)\b(refactor|restructure|clean\s*up|simplify|rename|extract)\b",
        ),
        (PromptPattern::Test, r"(?i)\b(test|tests|testing|coverage|spec)\b"),
        (
            PromptPattern::Explain,
            r"(?i)\b(explain|how\s+does|what\s+is|walk\s+me\s+through|overview)\b",
        ),
    ]
    .into_iter()
    .filter_map(|(pattern, re)| Regex::new(re).ok().map(|re| (pattern, re)))
    .collect()
});

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\p{L}\p{N}_]+").expect("valid word regex"));

/// Topic string kept in state: collapsed whitespace, bounded length.
pub fn derive_topic(prompt: &str) -> Option<String> {
    let collapsed = prompt.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(collapsed.chars().take(MAX_TOPIC_CHARS).collect())
}

/// Distinct lowercase content words, first-occurrence order.
pub fn key_terms(text: &str, limit: usize) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in WORD.find_iter(text) {
        let word = word.as_str().to_lowercase();
        if word.chars().count() < MIN_TERM_LEN
            || STOPWORDS.contains(&word.as_str())
            || word.chars().all(|c| c.is_ascii_digit())
            || terms.contains(&word)
        {
            continue;
        }
        terms.push(word);
        if terms.len() == limit {
            break;
        }
    }
    terms
}

/// First pattern category matching the text.
pub fn detect_pattern(text: &str) -> Option<PromptPattern> {
    PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(pattern, _)| *pattern)
}

/// Recall query for a topic: key terms plus the pattern suffix.
pub fn recall_query(topic: &str) -> Option<String> {
    let mut terms = key_terms(topic, MAX_KEY_TERMS);
    if terms.is_empty() {
        return None;
    }
    if let Some(pattern) = detect_pattern(topic) {
        let suffix = pattern.query_suffix();
        if !terms.iter().any(|t| t == suffix) {
            terms.push(suffix.to_string());
        }
    }
    Some(terms.join(" "))
}
