//! Environment-driven configuration for hook processes.

use camino::Utf8PathBuf;
use std::time::Duration;

pub const ENV_WORKSPACE_ID: &str = "MEMORY_WORKSPACE_ID";
pub const ENV_API_URL: &str = "MEMORY_API_URL";
pub const ENV_API_KEY: &str = "MEMORY_API_KEY";
pub const ENV_SESSION_ID: &str = "MEMORY_SESSION_ID";
pub const ENV_CLAUDE_ENV_FILE: &str = "CLAUDE_ENV_FILE";
pub const ENV_PROJECT_DIR: &str = "CLAUDE_PROJECT_DIR";
pub const ENV_STATE_DIR: &str = "MEMORY_HOOK_STATE_DIR";
pub const ENV_HANDOFF_DIR: &str = "MEMORY_HOOK_HANDOFF_DIR";
pub const ENV_TIMEOUT_MS: &str = "MEMORY_HOOK_TIMEOUT_MS";
pub const ENV_STDIN_TIMEOUT_MS: &str = "MEMORY_HOOK_STDIN_TIMEOUT_MS";

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8765";

/// Timeout for callers that are not hooks (the session coordinator).
pub const NON_HOOK_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_millis(3000);
const DEFAULT_STDIN_TIMEOUT: Duration = Duration::from_millis(1000);

/// Resolved settings for one process.
#[derive(Debug, Clone, PartialEq)]
pub struct HookConfig {
    pub workspace_id: String,
    pub api_url: String,
    pub api_key: Option<String>,
    /// Fallback session adoption path
    pub session_id: Option<String>,
    /// Host file of `export` lines for later shell commands
    pub env_file: Option<Utf8PathBuf>,
    pub project_dir: Utf8PathBuf,
    pub state_dir: Utf8PathBuf,
    pub handoff_dir: Utf8PathBuf,
    /// Per-call timeout for external calls made from hooks
    pub hook_timeout: Duration,
    pub stdin_timeout: Duration,
}

impl HookConfig {
    /// Read from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let project_dir = get(ENV_PROJECT_DIR)
            .map(Utf8PathBuf::from)
            .or_else(current_dir)
            .unwrap_or_else(|| Utf8PathBuf::from("."));

        let workspace_id = get(ENV_WORKSPACE_ID)
            .or_else(|| project_dir.file_name().map(slugify).filter(|s| !s.is_empty()))
            .unwrap_or_else(|| "default".to_string());

        let state_dir = get(ENV_STATE_DIR)
            .map(Utf8PathBuf::from)
            .unwrap_or_else(default_state_dir);

        let handoff_dir = get(ENV_HANDOFF_DIR)
            .map(Utf8PathBuf::from)
            .unwrap_or_else(default_handoff_dir);

        let hook_timeout = get(ENV_TIMEOUT_MS)
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_HOOK_TIMEOUT)
            .min(NON_HOOK_TIMEOUT / 2);

        let stdin_timeout = get(ENV_STDIN_TIMEOUT_MS)
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_STDIN_TIMEOUT);

        Self {
            workspace_id,
            api_url: get(ENV_API_URL)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key: get(ENV_API_KEY),
            session_id: get(ENV_SESSION_ID),
            env_file: get(ENV_CLAUDE_ENV_FILE).map(Utf8PathBuf::from),
            project_dir,
            state_dir,
            handoff_dir,
            hook_timeout,
            stdin_timeout,
        }
    }
}

/// Lower-case, keep alphanumerics, collapse everything else to single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn current_dir() -> Option<Utf8PathBuf> {
    std::env::current_dir()
        .ok()
        .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
}

/// `~/.config/ai/memory-hooks`, next to the rest of the ai memory config.
fn default_state_dir() -> Utf8PathBuf {
    dirs::home_dir()
        .and_then(|home| Utf8PathBuf::from_path_buf(home).ok())
        .map(|home| home.join(".config").join("ai").join("memory-hooks"))
        .unwrap_or_else(|| Utf8PathBuf::from(".config/ai/memory-hooks"))
}

fn default_handoff_dir() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(std::env::temp_dir())
        .unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
        .join("memory-hooks")
}
