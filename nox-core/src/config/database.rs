//! Database configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::orm::DatabaseCredentials;

/// Database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Sent with `SET NAMES` on every new connection
    /// Default: "utf8mb4"
    pub character_encoding: String,

    /// Default: "utf8mb4_unicode_ci"
    pub collation: String,

    /// One entry per logical database
    /// Env: NOX_DB_HOST, NOX_DB_USER, NOX_DB_PASSWORD, NOX_DB_NAME, NOX_DB_PORT
    /// (add or override the entry named by NOX_DB_NAME, else the first one)
    /// Default: []
    pub credentials: Vec<DatabaseCredentials>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            character_encoding: "utf8mb4".to_string(),
            collation: "utf8mb4_unicode_ci".to_string(),
            credentials: Vec::new(),
        }
    }
}

impl DatabaseConfig {
    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.character_encoding = other.character_encoding;
        self.collation = other.collation;
        self.credentials = other.credentials;
    }

    pub(crate) fn apply_vars(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        let host = lookup("NOX_DB_HOST");
        let user = lookup("NOX_DB_USER");
        let password = lookup("NOX_DB_PASSWORD");
        let name = lookup("NOX_DB_NAME");
        let port = lookup("NOX_DB_PORT").and_then(|p| p.parse::<u16>().ok());

        if host.is_none() && user.is_none() && password.is_none() && name.is_none() && port.is_none()
        {
            return;
        }

        let index = match &name {
            Some(name) => self.credentials.iter().position(|c| &c.database == name),
            None => (!self.credentials.is_empty()).then_some(0),
        };
        let entry = match index {
            Some(index) => &mut self.credentials[index],
            None => {
                self.credentials.push(DatabaseCredentials::new(
                    "127.0.0.1",
                    "root",
                    "",
                    name.clone().unwrap_or_default(),
                ));
                let last = self.credentials.len() - 1;
                &mut self.credentials[last]
            }
        };

        if let Some(host) = host {
            entry.host = host;
        }
        if let Some(user) = user {
            entry.username = user;
        }
        if let Some(password) = password {
            entry.password = password;
        }
        if let Some(name) = name {
            entry.database = name;
        }
        if let Some(port) = port {
            entry.port = port;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.character_encoding.is_empty() {
            bail!("Invalid character_encoding: cannot be empty");
        }
        for credentials in &self.credentials {
            if credentials.database.is_empty() {
                bail!("Invalid database credentials for {}: database name is empty", credentials.host);
            }
            if credentials.port == 0 {
                bail!("Invalid port for database {}", credentials.database);
            }
        }
        Ok(())
    }
}
