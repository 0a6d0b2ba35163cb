//! `arbiter.toml` loading.
//!
//! Every field is optional; missing fields keep their built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use arbiter_eval::rest::DEFAULT_USER_AGENT;
use serde::Deserialize;

pub(crate) const DEFAULT_CONFIG_FILE: &str = "arbiter.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    pub log: LogConfig,
    pub rest: RestConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RestConfig {
    pub timeout_ms: u64,
    pub user_agent: String,
    /// When false, REST terms fail without touching the network.
    pub enabled: bool,
}

impl Default for RestConfig {
    fn default() -> Self {
        RestConfig {
            timeout_ms: 5000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            enabled: true,
        }
    }
}

impl RestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Load the configuration.
///
/// An explicit path must exist. Without one, `./arbiter.toml` is read when
/// present and the defaults are used otherwise.
pub(crate) fn load(explicit: Option<&Path>) -> Result<Config, String> {
    let path: PathBuf = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.is_file() {
                return Ok(Config::default());
            }
            default
        }
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    parse(&content, &path)
}

pub(crate) fn parse(content: &str, path: &Path) -> Result<Config, String> {
    toml::from_str(content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
}
