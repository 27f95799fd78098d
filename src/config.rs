use crate::models::ToolProbe;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 10;
const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;
const DEFAULT_DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Age after which a cached detection report is refreshed in the background.
    /// Default: 300
    pub cache_ttl_secs: Option<u64>,
    /// Upper bound for any single command.
    /// Default: 10
    pub command_timeout_secs: Option<u64>,
    /// Polling interval for watchers that cannot use native notification.
    /// Default: 3000
    pub poll_interval_ms: Option<u64>,
    /// Quiet period after a relevant filesystem event before re-reading git state.
    /// Default: 500
    pub debounce_ms: Option<u64>,
    /// Run local POSIX commands through `$SHELL -l` so profile PATH edits apply.
    /// Default: false
    pub login_shell: Option<bool>,
    /// Where the durable detection cache lives.
    /// Default: <user cache dir>/crossexec
    pub cache_dir: Option<PathBuf>,
    /// Extra tool probes merged over the built-in set.
    #[serde(default)]
    pub probes: Vec<ToolProbe>,
}

impl Config {
    /// Load configuration from ~/.config/crossexec/config.toml
    ///
    /// - File missing: returns default config (Ok)
    /// - File exists but invalid TOML: returns Err so caller can show warning
    /// - Field missing: uses the default for that field
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Some(p) => p,
            None => return Ok(Self::default()),
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS))
    }

    /// Zero would make every command time out immediately, so it falls back to the default.
    pub fn command_timeout(&self) -> Duration {
        let secs = self
            .command_timeout_secs
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    pub fn poll_interval(&self) -> Duration {
        let ms = self
            .poll_interval_ms
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        Duration::from_millis(ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS))
    }

    pub fn login_shell(&self) -> bool {
        self.login_shell.unwrap_or(false)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("crossexec")
        })
    }

    fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|d| d.join(".config").join("crossexec").join("config.toml"))
    }
}
