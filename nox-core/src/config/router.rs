//! Router configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Router configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Internal re-dispatches allowed per request
    /// Env: NOX_MAX_RECURSION_DEPTH
    /// Default: 10
    pub max_recursion_depth: u32,

    /// Route answering requests nothing else matched
    /// Env: NOX_NOT_FOUND_ROUTE
    /// Default: "/404"
    pub not_found_route: String,

    /// Serialize structured handler results to JSON for every route
    /// Default: false
    pub output_arrays_as_json: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: crate::router::DEFAULT_MAX_RECURSION_DEPTH,
            not_found_route: crate::router::DEFAULT_NOT_FOUND_ROUTE.to_string(),
            output_arrays_as_json: false,
        }
    }
}

impl RouterConfig {
    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.max_recursion_depth = other.max_recursion_depth;
        self.not_found_route = other.not_found_route;
        self.output_arrays_as_json = other.output_arrays_as_json;
    }

    pub(crate) fn apply_vars(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(depth) = lookup("NOX_MAX_RECURSION_DEPTH") {
            if let Ok(d) = depth.parse() {
                self.max_recursion_depth = d;
            }
        }

        if let Some(route) = lookup("NOX_NOT_FOUND_ROUTE") {
            self.not_found_route = route;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.not_found_route.starts_with('/') {
            bail!("Invalid not_found_route '{}': must start with '/'", self.not_found_route);
        }
        Ok(())
    }
}
