use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::matcher::SearchPrecision;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(error) => write!(f, "config io error: {error}"),
            Self::Parse(error) => write!(f, "config parse error: {error}"),
            Self::Invalid(error) => write!(f, "invalid config: {error}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecisionSetting {
    Regular,
    Low,
    None,
}

impl PrecisionSetting {
    pub fn as_precision(self) -> SearchPrecision {
        match self {
            Self::Regular => SearchPrecision::Regular,
            Self::Low => SearchPrecision::Low,
            Self::None => SearchPrecision::None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Grace delay before the busy indicator may show. The value is a
    /// behavior-compatibility constant; change it knowingly.
    pub progress_delay_ms: u64,
    /// Linear popularity boost per recorded selection.
    pub selection_boost: i64,
    /// Top-N cut applied by the built-in providers' own match lists.
    pub provider_result_limit: usize,
    pub history_capacity: usize,
    pub search_precision: PrecisionSetting,
    pub record_db_path: PathBuf,
    pub config_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let base = stable_app_data_dir();
        Self {
            progress_delay_ms: 200,
            selection_boost: 5,
            provider_result_limit: 5,
            history_capacity: 50,
            search_precision: PrecisionSetting::Regular,
            record_db_path: base.join("records.sqlite3"),
            config_path: base.join("config.toml"),
        }
    }
}

pub fn stable_app_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("BEACON_DATA_DIR") {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    std::env::temp_dir().join("beacon")
}

/// Configuration faults are fatal at startup and never checked mid-query.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.progress_delay_ms == 0 || cfg.progress_delay_ms > 5_000 {
        return Err(ConfigError::Invalid(
            "progress_delay_ms must be within 1..=5000".to_string(),
        ));
    }

    if cfg.selection_boost < 0 {
        return Err(ConfigError::Invalid(
            "selection_boost must not be negative".to_string(),
        ));
    }

    if cfg.provider_result_limit == 0 || cfg.provider_result_limit > 100 {
        return Err(ConfigError::Invalid(
            "provider_result_limit must be within 1..=100".to_string(),
        ));
    }

    if cfg.record_db_path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid(
            "record_db_path is required".to_string(),
        ));
    }

    if cfg.config_path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid("config_path is required".to_string()));
    }

    Ok(())
}

pub fn load(path: Option<PathBuf>) -> Result<Config, ConfigError> {
    let mut cfg = Config::default();
    if let Some(path) = path {
        cfg.config_path = path;
    }

    if cfg.config_path.exists() {
        let raw = std::fs::read_to_string(&cfg.config_path)?;
        let config_path = cfg.config_path.clone();
        cfg = toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.config_path = config_path;
    }

    validate(&cfg)?;
    Ok(cfg)
}

pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = cfg.config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let raw = toml::to_string_pretty(cfg).map_err(|e| ConfigError::Parse(e.to_string()))?;
    std::fs::write(&cfg.config_path, raw)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate, Config};

    #[test]
    fn default_config_is_valid() {
        validate(&Config::default()).expect("defaults should validate");
    }

    #[test]
    fn zero_progress_delay_is_rejected() {
        let cfg = Config {
            progress_delay_ms: 0,
            ..Config::default()
        };
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn negative_selection_boost_is_rejected() {
        let cfg = Config {
            selection_boost: -1,
            ..Config::default()
        };
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn behavior_compatibility_defaults_are_preserved() {
        let cfg = Config::default();
        assert_eq!(cfg.progress_delay_ms, 200);
        assert_eq!(cfg.selection_boost, 5);
        assert_eq!(cfg.provider_result_limit, 5);
    }
}
