use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::http::builder::HeaderPolicy;
use crate::state::result::DEFAULT_HISTORY_CAPACITY;

pub const HOME_ENV: &str = "COURIER_HOME";

/// User settings, read from `config.toml` in the data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Transport timeout in seconds; 0 disables it.
    pub timeout_secs: u64,
    pub header_policy: HeaderPolicy,
    /// Results kept in each workspace's `history.json`.
    pub history_capacity: usize,
    pub log_filter: String,
    pub workspace: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            header_policy: HeaderPolicy::Strict,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            log_filter: "info".to_string(),
            workspace: "default".to_string(),
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Root of everything courier stores: `$COURIER_HOME`, else `<data_dir>/courier`.
pub fn data_dir() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_ENV) {
        return PathBuf::from(home);
    }
    let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("courier")
}

pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "timeout_secs = 0\nheader_policy = \"skip-invalid\"\nhistory_capacity = 3\n",
        )
        .unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.timeout(), None);
        assert_eq!(settings.header_policy, HeaderPolicy::SkipInvalid);
        assert_eq!(settings.history_capacity, 3);
        assert_eq!(settings.workspace, "default");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "header_policy = \"sometimes\"\n").unwrap();
        let err = Settings::load(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let settings = Settings { history_capacity: 5, ..Settings::default() };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }
}
