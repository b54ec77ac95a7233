//! Configuration management for the server.

use sgmock_engine::session::DEFAULT_BASE_URL;
use std::env;
use std::path::PathBuf;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Snapshot to load before serving
    pub snapshot: Option<PathBuf>,
    /// Where to write a snapshot once input ends
    pub dump: Option<PathBuf>,
    /// Base URL reported by `info`
    pub base_url: String,
    /// Indent written snapshots
    pub pretty_dump: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot: None,
            dump: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            pretty_dump: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let path = |name: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        };

        let pretty_dump = match lookup("SGMOCK_PRETTY_DUMP") {
            None => false,
            Some(value) => parse_bool(&value).ok_or(ConfigError::InvalidBool {
                name: "SGMOCK_PRETTY_DUMP",
                value,
            })?,
        };

        Ok(Self {
            snapshot: path("SGMOCK_SNAPSHOT"),
            dump: path("SGMOCK_DUMP"),
            base_url: lookup("SGMOCK_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            pretty_dump,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a boolean, got {value:?}")]
    InvalidBool { name: &'static str, value: String },
}
