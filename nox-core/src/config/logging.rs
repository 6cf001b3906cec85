//! Logging configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// How log lines are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `2024-01-15T10:30:00.000Z INFO  [nox_core::orm::abyss] message`
    #[default]
    Human,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `error`, `warn`, `info`, `debug` or `trace`, optionally with
    /// `env_logger` module directives (`info,nox_core::router=debug`)
    /// Env: NOX_LOG_LEVEL
    /// Default: "info"
    pub level: String,

    /// Default: human
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Human }
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub(crate) fn apply_vars(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("NOX_LOG_LEVEL") {
            self.level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let default_level = self.level.split(',').next().unwrap_or_default().trim();
        if !default_level.contains('=') && default_level.parse::<log::LevelFilter>().is_err() {
            bail!("Invalid log level '{}'", self.level);
        }
        Ok(())
    }
}
