//! Configuration loading.
//!
//! Read-only, loaded once at startup. Config errors are soft failures:
//! a missing file, a parse error, or a wrong-typed key all fall back to
//! defaults, never abort the program.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;

/// Settings read from `config.toml`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Ceiling in milliseconds for the repository discovery wait.
    pub repo_wait_ms: Option<u64>,
}

impl Config {
    /// The discovery wait ceiling as a `Duration`, when configured.
    pub fn repo_wait(&self) -> Option<Duration> {
        self.repo_wait_ms.map(Duration::from_millis)
    }
}

/// Returns the path to the revfs config file.
///
/// Prefers `$XDG_CONFIG_HOME/revfs/config.toml`; falls back to
/// `~/.config/revfs/config.toml` when the env var is absent.
pub fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".config"))
        })
        .unwrap_or_else(|| PathBuf::from(".config"));
    base.join("revfs").join("config.toml")
}

/// Loads the config file, falling back to defaults on any failure.
pub fn load() -> Config {
    let path = config_path();
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(_) => return Config::default(),
    };
    parse(&raw, &path)
}

fn parse(raw: &str, origin: &Path) -> Config {
    let table: toml::Table = match toml::from_str(raw) {
        Ok(table) => table,
        Err(err) => {
            warn!("config parse error in {}: {err}", origin.display());
            return Config::default();
        }
    };
    let repo_wait_ms = table
        .get("repo_wait_ms")
        .and_then(|value| value.as_integer())
        .and_then(|ms| u64::try_from(ms).ok());
    Config { repo_wait_ms }
}
