use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Server connection (can override CLI)
    pub url: Option<String>,
    pub api_key: Option<String>,
    /// "series" or "movies"
    pub flavor: Option<String>,
    pub http_timeout_sec: Option<u64>,

    pub download_root: Option<String>,
    pub run_timeout_secs: Option<u64>,
    pub rename_after_rescan: Option<bool>,

    pub wait: Option<WaitConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct WaitConfig {
    pub poll_interval_secs: Option<u64>,
    pub max_wait_secs: Option<u64>,
    pub retries: Option<u32>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
