use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// Root application configuration, loaded from `~/.config/paperscope/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub session: SessionConfig,
    pub frontend: FrontendConfig,
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Owner of the repository backing the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    /// Environment variable holding the access token.
    pub token_env: String,
    /// Inline token; `token_env` wins when both are set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
    /// Sessions shorter than this are not written to the interaction log.
    pub min_log_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    /// Hosts trusted as local development origins of the companion frontend.
    pub local_hosts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub min_interval_ms: u64,
    pub max_retries: u32,
}

/// Resolved credentials for the object store.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreCredentials {
    pub token: String,
    pub owner: String,
    pub repo: String,
}

impl fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("token", &"<redacted>")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .finish()
    }
}

impl StoreCredentials {
    /// `None` unless all three parts are present and non-blank, and owner
    /// and repo are plain names usable as single path segments.
    pub fn from_parts(token: Option<String>, owner: Option<String>, repo: Option<String>) -> Option<Self> {
        let non_blank = |s: Option<String>| s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let creds = Self {
            token: non_blank(token)?,
            owner: non_blank(owner)?,
            repo: non_blank(repo)?,
        };
        if !is_plain_name(&creds.owner) || !is_plain_name(&creds.repo) {
            warn!(owner = %creds.owner, repo = %creds.repo, "rejected store credentials with unsafe owner/repo");
            return None;
        }
        Some(creds)
    }
}

/// `[A-Za-z0-9_.-]+`, excluding `.` and `..`.
fn is_plain_name(name: &str) -> bool {
    name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for StoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("paperscope")
            .join("store");
        Self {
            owner: None,
            repo: None,
            token_env: "PAPERSCOPE_TOKEN".to_string(),
            token: None,
            data_dir: data_dir.to_string_lossy().to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 300,
            sweep_interval_secs: 30,
            min_log_seconds: 5,
        }
    }
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            local_hosts: vec![
                "localhost".to_string(),
                "127.0.0.1".to_string(),
                "[::1]".to_string(),
            ],
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "paperscope/0.1".to_string(),
            min_interval_ms: 1000,
            max_retries: 3,
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/paperscope/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("PAPERSCOPE_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("paperscope")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// Store credentials, reading the token from `store.token_env` first.
    pub fn credentials(&self) -> Option<StoreCredentials> {
        let token = std::env::var(&self.store.token_env)
            .ok()
            .or_else(|| self.store.token.clone());
        StoreCredentials::from_parts(token, self.store.owner.clone(), self.store.repo.clone())
    }

    /// Directory for the local store of a given owner/repo pair.
    pub fn store_dir(&self, credentials: &StoreCredentials) -> PathBuf {
        PathBuf::from(&self.store.data_dir)
            .join(&credentials.owner)
            .join(&credentials.repo)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session.idle_timeout_secs)
    }
}
