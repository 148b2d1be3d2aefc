//! Configuration loading and config file resolution
//!
//! Bootstrap settings come from a TOML file. Resolution order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Platform config directory
//! 4. Compiled defaults (fallback)
//!
//! A missing or unreadable file never stops startup; defaults are used.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SMETA_CONFIG";

/// Recommended spread threshold (percent) above which a price is flagged
pub const DEFAULT_VARIANCE_THRESHOLD: f64 = 20.0;

/// An excluded extreme this many times away from consensus is flagged
pub const DEFAULT_OUTLIER_MULTIPLE: f64 = 3.0;

/// Tuning for the consensus calculator
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConsensusConfig {
    /// Spread of used prices (percent of their mean) that triggers a warning
    #[serde(default = "default_variance_threshold")]
    pub price_variance_threshold: f64,

    /// Ratio between an excluded extreme and the consensus that triggers a warning
    #[serde(default = "default_outlier_multiple")]
    pub outlier_multiple: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            price_variance_threshold: DEFAULT_VARIANCE_THRESHOLD,
            outlier_multiple: DEFAULT_OUTLIER_MULTIPLE,
        }
    }
}

impl ConsensusConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.price_variance_threshold.is_finite() || self.price_variance_threshold < 0.0 {
            return Err(Error::Config(format!(
                "price_variance_threshold must be a non-negative number, got {}",
                self.price_variance_threshold
            )));
        }
        if !self.outlier_multiple.is_finite() || self.outlier_multiple <= 1.0 {
            return Err(Error::Config(format!(
                "outlier_multiple must be greater than 1, got {}",
                self.outlier_multiple
            )));
        }
        Ok(())
    }
}

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// HTTP bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to SQLite database file (defaults to the platform data dir)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub consensus: ConsensusConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_path: None,
            consensus: ConsensusConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5730
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_variance_threshold() -> f64 {
    DEFAULT_VARIANCE_THRESHOLD
}

fn default_outlier_multiple() -> f64 {
    DEFAULT_OUTLIER_MULTIPLE
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.consensus.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Resolve and load configuration, falling back to defaults
    ///
    /// `cli_arg` is the `--config` value, if given.
    pub fn load_or_default(cli_arg: Option<&Path>) -> Self {
        let Some(path) = resolve_config_path(cli_arg) else {
            info!("No config file found, using compiled defaults");
            return Self::default();
        };

        match Self::load_file(&path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!(
                    "Failed to load config {} ({}), using compiled defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Database path, falling back to the platform data directory
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(default_database_path)
    }
}

/// Config file resolution in priority order:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. Platform config directory (only if the file exists)
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    dirs::config_dir()
        .map(|d| d.join("smeta").join("smeta-brain.toml"))
        .filter(|p| p.exists())
}

/// Get OS-dependent default database path
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("smeta"))
        .unwrap_or_else(|| PathBuf::from("./smeta_data"))
        .join("brain.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.port, 5730);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.consensus.price_variance_threshold, 20.0);
        assert_eq!(config.consensus.outlier_multiple, 3.0);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
            port = 6000

            [consensus]
            price_variance_threshold = 25.0
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 6000);
        assert_eq!(config.consensus.price_variance_threshold, 25.0);
        assert_eq!(config.consensus.outlier_multiple, DEFAULT_OUTLIER_MULTIPLE);
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_invalid_consensus_rejected() {
        let err = TomlConfig::from_toml_str(
            r#"
            [consensus]
            outlier_multiple = 0.5
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let negative = ConsensusConfig {
            price_variance_threshold: -1.0,
            ..ConsensusConfig::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_cli_arg_wins() {
        let path = PathBuf::from("/tmp/explicit.toml");
        assert_eq!(resolve_config_path(Some(path.as_path())), Some(path.clone()));
    }
}
