//! Server settings from `<data dir>/config.toml`, and data directory lookup.
//!
//! The config file is optional. A missing file yields `Config::default()`.
//! Unknown keys are ignored by serde but logged as a warning, since they are
//! usually typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides the data directory.
pub const HOME_ENV: &str = "CHOPCHOPRSS_HOME";

/// Catalog file name inside the data directory.
pub const CATALOG_FILE: &str = "config.json";

/// Settings file name inside the data directory.
pub const SETTINGS_FILE: &str = "config.toml";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The file exceeds the size limit.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Cannot determine data directory: neither CHOPCHOPRSS_HOME nor HOME is set")]
    NoHome,
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Serving configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port for `serve` when `--port` is not given.
    pub port: u16,

    /// Address the HTTP listener binds to.
    pub bind_address: String,

    /// Public origin shown in the startup listing of feed URLs.
    /// Defaults to `http://localhost:<port>`.
    pub public_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8090,
            bind_address: "0.0.0.0".to_string(),
            public_url: None,
        }
    }
}

impl Config {
    /// Largest settings file accepted (1 MiB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KEYS: [&str; 3] = ["port", "bind_address", "public_url"];

    /// Load settings from `config.toml`.
    ///
    /// A missing or blank file gives the defaults. Unknown keys are ignored
    /// with a warning. Malformed TOML or a mistyped value is a
    /// `ConfigError::Parse`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let size = match std::fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config.toml, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        if size > Self::MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge(format!(
                "{} is {size} bytes (max {} bytes)",
                path.display(),
                Self::MAX_FILE_SIZE
            )));
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let table: toml::Table = content.parse()?;
        for key in table.keys().filter(|k| !Self::KEYS.contains(&k.as_str())) {
            tracing::warn!(key = %key, path = %path.display(), "Ignoring unknown setting");
        }

        let config: Config = toml::Value::Table(table).try_into()?;
        tracing::info!(
            path = %path.display(),
            port = config.port,
            bind_address = %config.bind_address,
            "Loaded server settings"
        );
        Ok(config)
    }

    /// Origin used when printing feed URLs, without a trailing slash.
    pub fn public_origin(&self, port: u16) -> String {
        match self.public_url.as_deref() {
            Some(url) if !url.trim().is_empty() => url.trim().trim_end_matches('/').to_string(),
            _ => format!("http://localhost:{port}"),
        }
    }
}

/// Data directory: `$CHOPCHOPRSS_HOME`, else `$HOME/.chopchoprss`.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    data_dir_from(
        std::env::var_os(HOME_ENV).map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

fn data_dir_from(
    override_dir: Option<PathBuf>,
    home: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    match (override_dir, home) {
        (Some(dir), _) if !dir.as_os_str().is_empty() => Ok(dir),
        (_, Some(home)) if !home.as_os_str().is_empty() => Ok(home.join(".chopchoprss")),
        _ => Err(ConfigError::NoHome),
    }
}

// ============================================================================
// Tests
// ============================================================================
