//! Engine configuration stored as TOML.

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Form engine configuration (TOML).
///
/// Missing fields default to values matching the stock browser form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FormConfig {
    /// Submission endpoint URL (`POST`).
    pub endpoint: String,

    /// Anti-forgery token sent as `X-CSRF-Token`.
    pub csrf_token: String,

    /// Key the autosave snapshot is stored under.
    pub storage_key: String,

    /// Quiet period after the last edit before the snapshot is written.
    pub autosave_debounce_ms: u64,

    /// Submission request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/api/submit".to_string(),
            csrf_token: String::new(),
            storage_key: "multiStepFormData".to_string(),
            autosave_debounce_ms: 500,
            request_timeout_secs: 30,
        }
    }
}

impl FormConfig {
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(anyhow!("endpoint must be non-empty"));
        }
        if self.storage_key.trim().is_empty() {
            return Err(anyhow!("storage_key must be non-empty"));
        }
        if self.autosave_debounce_ms == 0 {
            return Err(anyhow!("autosave_debounce_ms must be > 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be > 0"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Read engine settings from a TOML file.
///
/// A missing file yields the stock settings. Parse and validation failures
/// name the file.
pub fn load_config(path: &Path) -> Result<FormConfig> {
    let cfg = match fs::read_to_string(path) {
        Ok(contents) => toml::from_str::<FormConfig>(&contents)
            .with_context(|| format!("parse {}", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            FormConfig::default()
        }
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Persist settings, replacing the file atomically.
pub fn write_config(path: &Path, cfg: &FormConfig) -> Result<()> {
    cfg.validate().context("refusing to write invalid config")?;
    let body = toml::to_string_pretty(cfg).context("serialize config toml")?;
    super::store::write_atomic(path, &format!("{body}\n"))
}
