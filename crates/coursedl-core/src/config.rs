use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::provider::webdriver::Credentials;
use crate::retry::RetryPolicy;

/// Stale-element retry parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaleRetryConfig {
    /// Maximum number of re-reads per element (including the first).
    pub max_attempts: u32,
    /// Pause between re-reads in milliseconds.
    pub delay_ms: u64,
}

impl Default for StaleRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay_ms: 100,
        }
    }
}

/// Global configuration loaded from `~/.config/coursedl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoursedlConfig {
    /// WebDriver endpoint (geckodriver).
    pub webdriver_url: String,
    /// Run the browser headless.
    pub headless: bool,
    /// Seconds to wait for a page to reach a ready state.
    pub page_load_timeout_secs: u64,
    /// Optional stale-retry bounds; built-in defaults when missing.
    #[serde(default)]
    pub stale_retry: Option<StaleRetryConfig>,
    /// Classroom sign-in email. Required the first time a run hits the
    /// sign-in page; there is no interactive fallback.
    #[serde(default)]
    pub email: Option<String>,
    /// Classroom sign-in password.
    #[serde(default)]
    pub password: Option<String>,
    /// Default destination directory when `-d` is not given.
    #[serde(default)]
    pub dest_dir: Option<PathBuf>,
}

impl Default for CoursedlConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://127.0.0.1:4444".to_string(),
            headless: true,
            page_load_timeout_secs: 100,
            stale_retry: None,
            email: None,
            password: None,
            dest_dir: None,
        }
    }
}

impl CoursedlConfig {
    /// Credentials for the sign-in flow, when both halves are configured.
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.email, &self.password) {
            (Some(email), Some(password)) => Some(Credentials {
                email: email.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    pub fn stale_retry_policy(&self) -> RetryPolicy {
        let cfg = self.stale_retry.clone().unwrap_or_default();
        RetryPolicy {
            max_attempts: cfg.max_attempts,
            delay: Duration::from_millis(cfg.delay_ms),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("coursedl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<CoursedlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = CoursedlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: CoursedlConfig = toml::from_str(&data)?;
    Ok(cfg)
}
