//! Lookup tables driving observation extraction.
//!
//! Every table is ordered; lookups return the first matching row.

use crate::schema::{Intent, ObservationType};
use regex::Regex;
use std::sync::LazyLock;

/// Tools never observed (exact names).
pub const SKIP_TOOLS: &[&str] = &[
    "TodoWrite",
    "TodoRead",
    "AskUserQuestion",
    "EnterPlanMode",
    "ExitPlanMode",
    "SlashCommand",
];

/// Tools never observed (name prefixes): the memory system's own tools.
pub const SKIP_PREFIXES: &[&str] = &["mcp__memory", "mcp__plugin_memory"];

pub const TOOL_TYPES: &[(&str, ObservationType)] = &[
    ("Read", ObservationType::Read),
    ("NotebookRead", ObservationType::Read),
    ("Write", ObservationType::Write),
    ("Edit", ObservationType::Write),
    ("MultiEdit", ObservationType::Write),
    ("NotebookEdit", ObservationType::Write),
    ("Bash", ObservationType::Execute),
    ("BashOutput", ObservationType::Execute),
    ("Glob", ObservationType::Search),
    ("Grep", ObservationType::Search),
    ("LS", ObservationType::Search),
    ("WebSearch", ObservationType::Search),
    ("WebFetch", ObservationType::Search),
];

/// File extension (lowercase, no dot) to technology tag.
pub const EXTENSION_CONCEPTS: &[(&str, &str)] = &[
    ("rs", "rust"),
    ("ts", "typescript"),
    ("tsx", "react"),
    ("js", "javascript"),
    ("jsx", "react"),
    ("mjs", "javascript"),
    ("cjs", "javascript"),
    ("py", "python"),
    ("go", "go"),
    ("java", "java"),
    ("kt", "kotlin"),
    ("rb", "ruby"),
    ("swift", "swift"),
    ("c", "c"),
    ("h", "c"),
    ("cpp", "cpp"),
    ("cc", "cpp"),
    ("hpp", "cpp"),
    ("cs", "csharp"),
    ("php", "php"),
    ("sql", "database"),
    ("md", "documentation"),
    ("mdx", "documentation"),
    ("json", "json"),
    ("yaml", "config"),
    ("yml", "config"),
    ("toml", "config"),
    ("sh", "shell"),
    ("bash", "shell"),
    ("zsh", "shell"),
    ("css", "styling"),
    ("scss", "styling"),
    ("html", "html"),
    ("vue", "vue"),
    ("svelte", "svelte"),
    ("proto", "protobuf"),
    ("tf", "terraform"),
];

/// Whole file names (lowercase) that carry a tag without an extension match.
pub const FILE_NAME_CONCEPTS: &[(&str, &str)] = &[
    ("dockerfile", "docker"),
    ("docker-compose.yml", "docker"),
    ("makefile", "build"),
    ("cargo.toml", "rust"),
    ("package.json", "javascript"),
];

/// Directory name (lowercase) to domain tag.
pub const DIRECTORY_CONCEPTS: &[(&str, &str)] = &[
    ("auth", "authentication"),
    ("login", "authentication"),
    ("api", "api"),
    ("routes", "routing"),
    ("router", "routing"),
    ("components", "ui"),
    ("ui", "ui"),
    ("pages", "ui"),
    ("views", "ui"),
    ("hooks", "hooks"),
    ("test", "testing"),
    ("tests", "testing"),
    ("__tests__", "testing"),
    ("spec", "testing"),
    ("e2e", "testing"),
    ("db", "database"),
    ("database", "database"),
    ("migrations", "database"),
    ("models", "data-model"),
    ("schema", "data-model"),
    ("schemas", "data-model"),
    ("services", "services"),
    ("middleware", "middleware"),
    ("utils", "utilities"),
    ("util", "utilities"),
    ("helpers", "utilities"),
    ("config", "configuration"),
    ("settings", "configuration"),
    ("docs", "documentation"),
    ("scripts", "scripting"),
    ("styles", "styling"),
    ("cli", "cli"),
    ("server", "backend"),
    ("client", "frontend"),
];

/// Tools whose intent defaults to investigation when nothing else matched.
pub const TOOL_INTENTS: &[(&str, Intent)] = &[
    ("Read", Intent::Investigation),
    ("Glob", Intent::Investigation),
    ("Grep", Intent::Investigation),
    ("LS", Intent::Investigation),
    ("WebSearch", Intent::Investigation),
    ("WebFetch", Intent::Investigation),
];

fn compile<T: Copy>(rows: &[(T, &str)]) -> Vec<(T, Regex)> {
    rows.iter()
        .filter_map(|(tag, re)| Regex::new(re).ok().map(|re| (*tag, re)))
        .collect()
}

/// Intent categories, tested in this order.
pub static INTENT_PATTERNS: LazyLock<Vec<(Intent, Regex)>> = LazyLock::new(|| {
    compile(&[
        (
            Intent::Bugfix,
            r"(?i)\b(fix|fixes|fixed|fixing|bug|bugs|error|errors|issue|broken|crash|fail|failing|failed|failure|debug|regression)\b",
        ),
        (
            Intent::Feature,
            r"(?i)\b(add|adds|adding|implement|implementing|create|creating|new feature|introduce|support)\b",
        ),
        (
            Intent::Refactor,
            r"(?i)\b(refactor|refactoring|clean\s*up|cleanup|restructure|rename|simplify|reorganize|extract)\b",
        ),
        (
            Intent::Testing,
            r"(?i)\b(test|tests|testing|spec|specs|coverage|assert|e2e)\b",
        ),
        (
            Intent::Investigation,
            r"(?i)\b(why|how does|investigate|understand|explore|look into|what is|where is|find)\b",
        ),
        (
            Intent::Documentation,
            r"(?i)\b(doc|docs|documentation|readme|comment|comments|explain|changelog)\b",
        ),
    ])
});

/// Shell command heuristics: pattern to concept tag.
pub static SHELL_CONCEPTS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    compile(&[
        ("testing", r"(?i)\b(test|tests|pytest|vitest|jest|mocha|rspec)\b"),
        ("build", r"(?i)\b(build|make|compile|tsc|webpack|vite)\b"),
        ("git", r"(?i)\bgit\b"),
        ("package-manager", r"(?i)\b(npm|npx|yarn|pnpm|bun|pip|pip3|uv|cargo|poetry|gem)\b"),
        ("docker", r"(?i)\b(docker|docker-compose|podman)\b"),
        ("linting", r"(?i)\b(lint|eslint|clippy|ruff|flake8|pylint|prettier|rubocop)\b"),
    ])
});

/// Lightweight code scans over edited text.
pub static CODE_CONCEPTS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    compile(&[
        ("imports", r"\b(import|require\(|use\s+\w+::)"),
        ("interfaces", r"\b(interface|trait|protocol)\s+\w"),
        ("async", r"\b(async|await)\b"),
    ])
});

/// Declared function/class/type names in edited text.
pub static IDENTIFIER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:fn|function|def|class|struct|enum|trait|interface)\s+([A-Za-z_][A-Za-z0-9_]*)")
        .expect("valid identifier regex")
});

/// Path-like tokens in shell commands ending in a known extension.
pub static COMMAND_PATH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:^|[\s'"=(])((?:~|\.{1,2})?/?(?:[\w.@-]+/)*[\w@-][\w.@-]*\.(?:rs|ts|tsx|js|jsx|mjs|py|go|java|rb|md|json|toml|yaml|yml|sh|css|scss|html|sql|txt|lock|cfg|ini))\b"#,
    )
    .expect("valid command path regex")
});

/// True if the tool is internal or the memory system's own.
pub fn is_skipped(tool_name: &str) -> bool {
    SKIP_TOOLS.contains(&tool_name) || SKIP_PREFIXES.iter().any(|p| tool_name.starts_with(p))
}

pub fn classify(tool_name: &str) -> ObservationType {
    lookup(TOOL_TYPES, tool_name).unwrap_or(ObservationType::Other)
}

pub fn default_intent(tool_name: &str) -> Option<Intent> {
    lookup(TOOL_INTENTS, tool_name)
}

pub fn extension_concept(extension: &str) -> Option<&'static str> {
    lookup(EXTENSION_CONCEPTS, &extension.to_ascii_lowercase())
}

pub fn file_name_concept(file_name: &str) -> Option<&'static str> {
    lookup(FILE_NAME_CONCEPTS, &file_name.to_ascii_lowercase())
}

pub fn directory_concept(dir: &str) -> Option<&'static str> {
    lookup(DIRECTORY_CONCEPTS, &dir.to_ascii_lowercase())
}

fn lookup<T: Copy>(table: &[(&str, T)], key: &str) -> Option<T> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_exact_and_prefix() {
        assert!(is_skipped("TodoWrite"));
        assert!(is_skipped("mcp__memory__recall"));
        assert!(is_skipped("mcp__memory"));
        assert!(!is_skipped("Todo"));
        assert!(!is_skipped("mcp__github__create_issue"));
        assert!(!is_skipped("Read"));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("Read"), ObservationType::Read);
        assert_eq!(classify("MultiEdit"), ObservationType::Write);
        assert_eq!(classify("Bash"), ObservationType::Execute);
        assert_eq!(classify("Grep"), ObservationType::Search);
        assert_eq!(classify("Task"), ObservationType::Other);
        assert_eq!(classify("read"), ObservationType::Other);
    }

    #[test]
    fn test_tables_compile() {
        assert_eq!(INTENT_PATTERNS.len(), 6);
        assert_eq!(SHELL_CONCEPTS.len(), 6);
        assert_eq!(CODE_CONCEPTS.len(), 3);
    }

    #[test]
    fn test_tables_have_unique_keys() {
        fn unique<T>(table: &[(&str, T)]) -> bool {
            let mut keys: Vec<_> = table.iter().map(|(k, _)| *k).collect();
            keys.sort_unstable();
            keys.windows(2).all(|w| w[0] != w[1])
        }
        assert!(unique(TOOL_TYPES));
        assert!(unique(EXTENSION_CONCEPTS));
        assert!(unique(DIRECTORY_CONCEPTS));
        assert!(unique(FILE_NAME_CONCEPTS));
    }

    #[test]
    fn test_concept_lookups_ignore_case() {
        assert_eq!(extension_concept("RS"), Some("rust"));
        assert_eq!(directory_concept("Auth"), Some("authentication"));
        assert_eq!(file_name_concept("Dockerfile"), Some("docker"));
        assert_eq!(extension_concept("xyz"), None);
    }

    #[test]
    fn test_command_path_pattern() {
        let found: Vec<_> = COMMAND_PATH_PATTERN
            .captures_iter("cat src/main.rs && python ./scripts/run.py 'docs/a b.md' https://x.io/a.js")
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .collect();
        assert_eq!(found, vec!["src/main.rs", "./scripts/run.py", "b.md"]);
    }
}
