use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "kbchat";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 100;

const ENV_BASE_URL: &str = "KBCHAT_BASE_URL";
const ENV_TOKEN: &str = "KBCHAT_TOKEN";
const ENV_TIMEOUT_SECS: &str = "KBCHAT_TIMEOUT_SECS";
const ENV_REORDER_ON_ACTIVITY: &str = "KBCHAT_REORDER_ON_ACTIVITY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub token: Option<String>,
    /// Re-sort the conversation list after sends and renames, not only after
    /// loads and pin changes.
    pub reorder_on_activity: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            token: None,
            reorder_on_activity: false,
        }
    }
}

impl ClientConfig {
    /// Read a JSON config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Overlay `KBCHAT_*` environment variables.
    pub fn with_env(self) -> Result<Self> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    pub fn from_env() -> Result<Self> {
        Self::default().with_env()
    }

    fn with_vars<F>(mut self, get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = get(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(token) = get(ENV_TOKEN) {
            self.token = Some(token);
        }
        if let Some(secs) = get(ENV_TIMEOUT_SECS) {
            self.timeout_secs = secs
                .parse()
                .with_context(|| format!("{} must be a number of seconds", ENV_TIMEOUT_SECS))?;
        }
        if let Some(flag) = get(ENV_REORDER_ON_ACTIVITY) {
            self.reorder_on_activity = matches!(flag.as_str(), "1" | "true" | "yes");
        }
        Ok(self)
    }
}
