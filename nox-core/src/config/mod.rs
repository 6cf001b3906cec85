//! Configuration system for Nox
//!
//! Values are resolved in the following order (highest priority wins):
//!
//! 1. **Environment Variables** (`NOX_*`)
//! 2. **Config File** (`nox.toml`)
//! 3. **Defaults**
//!
//! # Example
//!
//! ```no_run
//! use nox_core::config::NoxConfig;
//!
//! // Load with full supersedence
//! let config = NoxConfig::load()?;
//!
//! // Or load from specific file
//! let config = NoxConfig::from_file("nox.toml")?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! A minimal file:
//!
//! ```toml
//! [router]
//! not_found_route = "/not-found"
//!
//! [[database.credentials]]
//! host = "127.0.0.1"
//! username = "nox"
//! password = "secret"
//! database = "app"
//! ```

pub mod database;
pub mod logging;
pub mod router;

pub use database::DatabaseConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use router::RouterConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete Nox configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoxConfig {
    pub router: RouterConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

impl NoxConfig {
    /// Load configuration from `nox.toml` with the full supersedence chain
    pub fn load() -> Result<Self> {
        Self::load_from("nox.toml")
    }

    /// Load configuration from a specific file; a missing file means defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        config.apply_env_vars();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.router.merge(other.router);
        self.database.merge(other.database);
        self.logging.merge(other.logging);
    }

    /// Apply environment variables to configuration
    pub fn apply_env_vars(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    /// Apply variables from any source; `apply_env_vars` reads the process environment
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.router.apply_vars(&lookup);
        self.database.apply_vars(&lookup);
        self.logging.apply_vars(&lookup);
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.router.validate()?;
        self.database.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = NoxConfig::default();
        assert_eq!(config.router.max_recursion_depth, 10);
        assert_eq!(config.router.not_found_route, "/404");
        assert_eq!(config.database.character_encoding, "utf8mb4");
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config: NoxConfig = toml::from_str(
            r#"
            [router]
            output_arrays_as_json = true

            [logging]
            format = "json"
            "#,
        )
        .unwrap();
        assert!(config.router.output_arrays_as_json);
        assert_eq!(config.router.max_recursion_depth, 10);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = NoxConfig::default();
        config.merge(toml::from_str("[router]\nmax_recursion_depth = 3").unwrap());

        let vars: HashMap<&str, &str> =
            [("NOX_MAX_RECURSION_DEPTH", "5"), ("NOX_LOG_LEVEL", "debug")].into_iter().collect();
        config.apply_vars(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.router.max_recursion_depth, 5);
        assert_eq!(config.logging.level, "debug");
    }
}
