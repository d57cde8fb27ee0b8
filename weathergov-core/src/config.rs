use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::model::Coordinate;

pub const DEFAULT_BASE_URL: &str = "https://api.weather.gov";

/// Identification string sent when the caller does not supply one.
pub const DEFAULT_USER_AGENT: &str = concat!("weathergov-rs (", env!("CARGO_PKG_VERSION"), ")");

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings the client is built from. Immutable once the client exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    user_agent: String,
    timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Point the client at another host (a proxy or a test server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// weather.gov asks callers to identify themselves, ideally with contact info.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Top-level configuration stored on disk for the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Overrides [`DEFAULT_USER_AGENT`].
    pub user_agent: Option<String>,

    /// Overrides [`DEFAULT_BASE_URL`].
    pub base_url: Option<String>,

    /// Example TOML:
    /// [locations.topeka]
    /// latitude = 39.0693
    /// longitude = -95.6245
    #[serde(default)]
    pub locations: BTreeMap<String, Coordinate>,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("gov", "weathergov", "weathergov-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Client settings with any configured overrides applied.
    pub fn client_config(&self) -> ClientConfig {
        let mut client = ClientConfig::default();
        if let Some(url) = &self.base_url {
            client = client.with_base_url(url.clone());
        }
        if let Some(agent) = &self.user_agent {
            client = client.with_user_agent(agent.clone());
        }
        client
    }

    /// Save a named location, returning the one it replaced.
    pub fn upsert_location(&mut self, name: &str, coordinate: Coordinate) -> Option<Coordinate> {
        self.locations.insert(name.to_string(), coordinate)
    }

    pub fn remove_location(&mut self, name: &str) -> Option<Coordinate> {
        self.locations.remove(name)
    }

    pub fn location(&self, name: &str) -> Result<Coordinate> {
        self.locations.get(name).copied().ok_or_else(|| {
            anyhow!(
                "No location named '{name}' configured.\n\
                 Hint: run `weathergov locations add {name} <LAT> <LON>` first."
            )
        })
    }
}
