//! Inspector connection settings
//!
//! The base URL comes from `--base-url` / `LOCALUP_INSPECT_URL`, then from
//! ~/.localup/inspect.json, then falls back to the agent's default inspector
//! address.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Where the agent serves its inspector by default
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:4040";

/// Contents of ~/.localup/inspect.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InspectConfig {
    /// Inspector base URL
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Configuration file access
pub struct ConfigManager;

impl ConfigManager {
    /// Get the config file path
    fn get_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".localup").join("inspect.json"))
    }

    /// Load the configuration file, or defaults if there is none
    pub fn load() -> Result<InspectConfig> {
        let path = Self::get_config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<InspectConfig> {
        if !path.exists() {
            debug!("No config file at {:?}", path);
            return Ok(InspectConfig::default());
        }

        let json =
            fs::read_to_string(path).context(format!("Failed to read config file: {:?}", path))?;

        let config: InspectConfig = serde_json::from_str(&json)
            .context(format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }
}

/// Settings every command runs with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Validated base URL without trailing slash
    pub base_url: String,
}

/// Resolve settings from the flag (or its environment variable) and the file
pub fn resolve_config(flag: Option<&str>, file: &InspectConfig) -> Result<ResolvedConfig> {
    let (raw, origin) = match (flag, file.base_url.as_deref()) {
        (Some(url), _) => (url, "command line"),
        (None, Some(url)) => (url, "config file"),
        (None, None) => (DEFAULT_BASE_URL, "default"),
    };
    debug!("Using inspector base URL {} ({})", raw, origin);

    Ok(ResolvedConfig {
        base_url: normalize_base_url(raw)?,
    })
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).context(format!("Invalid inspector URL: {}", raw))?;

    match url.scheme() {
        "http" | "https" => {}
        other => bail!("Invalid inspector URL: {} (unsupported scheme '{}')", raw, other),
    }

    if url.host_str().is_none() {
        bail!("Invalid inspector URL: {} (missing host)", raw);
    }

    Ok(trimmed.to_string())
}
