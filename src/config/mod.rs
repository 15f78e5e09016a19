mod file_config;

pub use file_config::{FileConfig, WaitConfig};

use crate::arr::ServerFlavor;
use crate::repair::WaitPolicy;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub flavor: ServerFlavor,
    pub download_root: Option<PathBuf>,
    pub http_timeout_sec: u64,
    pub poll_interval_secs: u64,
    pub max_wait_secs: u64,
    pub retries: u32,
    pub run_timeout_secs: Option<u64>,
    pub rename_after_rescan: bool,
}

#[derive(Clone)]
pub struct AppConfig {
    // Server connection
    pub url: String,
    pub api_key: String,
    pub flavor: ServerFlavor,
    pub http_timeout_sec: u64,

    pub download_root: PathBuf,
    pub wait: WaitPolicy,
    /// Upper bound for the whole run's command waits.
    pub run_timeout: Option<Duration>,
    pub rename_after_rescan: bool,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("flavor", &self.flavor)
            .field("http_timeout_sec", &self.http_timeout_sec)
            .field("download_root", &self.download_root)
            .field("wait", &self.wait)
            .field("run_timeout", &self.run_timeout)
            .field("rename_after_rescan", &self.rename_after_rescan)
            .finish()
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let url = file
            .url
            .or_else(|| cli.url.clone())
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("url must be specified via --url or in config file"))?;

        let api_key = file
            .api_key
            .or_else(|| cli.api_key.clone())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "api_key must be specified via --api-key, ARR_API_KEY or in config file"
                )
            })?;

        let flavor = match file.flavor {
            Some(s) => match parse_flavor(&s) {
                Some(flavor) => flavor,
                None => bail!("Unknown flavor {:?}, expected \"series\" or \"movies\"", s),
            },
            None => cli.flavor,
        };

        let download_root = file
            .download_root
            .map(PathBuf::from)
            .or_else(|| cli.download_root.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "download_root must be specified via --download-root or in config file"
                )
            })?;

        // Validate download_root exists
        if !download_root.exists() {
            bail!("Download root does not exist: {:?}", download_root);
        }
        if !download_root.is_dir() {
            bail!("download_root is not a directory: {:?}", download_root);
        }

        let http_timeout_sec = file.http_timeout_sec.unwrap_or(cli.http_timeout_sec);
        let run_timeout = file
            .run_timeout_secs
            .or(cli.run_timeout_secs)
            .map(Duration::from_secs);
        let rename_after_rescan = file.rename_after_rescan.unwrap_or(cli.rename_after_rescan);

        let wait_file = file.wait.unwrap_or_default();
        let wait = WaitPolicy {
            poll_interval: Duration::from_secs(
                wait_file
                    .poll_interval_secs
                    .unwrap_or(cli.poll_interval_secs),
            ),
            max_wait: Duration::from_secs(wait_file.max_wait_secs.unwrap_or(cli.max_wait_secs)),
            retries: wait_file.retries.unwrap_or(cli.retries),
        };
        if wait.poll_interval.is_zero() {
            bail!("poll_interval_secs must be greater than 0");
        }
        if wait.retries == 0 {
            bail!("retries must be greater than 0");
        }
        if wait.max_wait < wait.poll_interval {
            bail!(
                "max_wait_secs ({}) must not be shorter than poll_interval_secs ({})",
                wait.max_wait.as_secs(),
                wait.poll_interval.as_secs()
            );
        }

        Ok(Self {
            url,
            api_key,
            flavor,
            http_timeout_sec,
            download_root,
            wait,
            run_timeout,
            rename_after_rescan,
        })
    }
}

/// Parses a flavor name, case insensitive.
/// Uses clap's ValueEnum trait for parsing.
fn parse_flavor(s: &str) -> Option<ServerFlavor> {
    ServerFlavor::from_str(s, true).ok()
}
