use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory holding config, history and the lock file
pub const WORK_DIR: &str = ".renbatch";

pub fn work_dir(root: &Path) -> PathBuf {
    root.join(WORK_DIR)
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// How long to wait for a job before switching to a progress display
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,

    /// Default output format: "summary" or "json"
    #[serde(default = "default_output")]
    pub output: String,

    /// Strip invalid characters from destination names without asking
    #[serde(default)]
    pub sanitize_names: bool,

    /// Number of history entries kept after each rename
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Whether to use color output by default (None = auto-detect)
    #[serde(default)]
    pub use_color: Option<bool>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            wait_timeout_ms: default_wait_timeout_ms(),
            output: default_output(),
            sanitize_names: false,
            history_limit: default_history_limit(),
            use_color: None,
        }
    }
}

impl DefaultsConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}

fn default_wait_timeout_ms() -> u64 {
    2000
}

fn default_output() -> String {
    "summary".to_string()
}

fn default_history_limit() -> usize {
    500
}

impl Config {
    /// Load config from .renbatch/config.toml under the current directory
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        Self::load_from_root(&cwd)
    }

    /// Load config from `<root>/.renbatch/config.toml`, or defaults if absent
    pub fn load_from_root(root: &Path) -> Result<Self> {
        let config_path = work_dir(root).join("config.toml");
        if config_path.exists() {
            return Self::load_from_path(&config_path);
        }

        Ok(Self::default())
    }

    /// Load config from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Save config to `<root>/.renbatch/config.toml`
    pub fn save(&self, root: &Path) -> Result<()> {
        let config_dir = work_dir(root);

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }

        self.save_to_path(&config_dir.join("config.toml"))
    }

    /// Save config to a specific path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
