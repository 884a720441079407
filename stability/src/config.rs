// Copyright (c) 2024 Botho Foundation

//! TOML configuration for tools embedding the engine.
//!
//! ```toml
//! [clock]
//! native_denom = "ubth"
//! blocks_per_epoch = 100
//!
//! [oracle]
//! vote_period = 5
//! vote_threshold = "0.67"
//!
//! [storage]
//! path = "/var/lib/stability"
//!
//! [log]
//! level = "debug"
//! ```

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::params::{BudgetParams, ClockParams, OracleParams, Params, TreasuryParams};

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub clock: ClockParams,
    #[serde(default)]
    pub oracle: OracleParams,
    #[serde(default)]
    pub treasury: TreasuryParams,
    #[serde(default)]
    pub budget: BudgetParams,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// LMDB directory. In-memory storage when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// LMDB map size in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            map_size_mb: default_map_size_mb(),
        }
    }
}

fn default_map_size_mb() -> usize {
    1024
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_ansi")]
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            ansi: default_ansi(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ansi() -> bool {
    true
}

impl Config {
    /// Engine parameters described by this config.
    pub fn params(&self) -> Params {
        Params {
            clock: self.clock.clone(),
            oracle: self.oracle.clone(),
            treasury: self.treasury.clone(),
            budget: self.budget.clone(),
        }
    }

    /// Load config from a file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        self.params()
            .validate()
            .map_err(|e| anyhow!("Invalid parameters: {e}"))?;
        if self.storage.map_size_mb == 0 {
            return Err(anyhow!("storage.map_size_mb must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.params(), Params::default());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/stability.toml");

        let mut config = Config::default();
        config.oracle.vote_period = 7;
        config.treasury.tax_caps.insert("ukrw".into(), 5_000);
        config.storage.path = Some(dir.path().join("db"));
        config.log.level = "debug".into();
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_rejects_invalid_params() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[oracle]\nvote_period = 0\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid parameters"));
    }
}
