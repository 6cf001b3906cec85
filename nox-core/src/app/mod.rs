//! Application root
//!
//! [`AppContext`] owns what used to be process-wide state: the loaded
//! configuration and the [`ConnectionPool`]. Hosts build it once at startup,
//! wrap it in an `Arc` and attach it to every [`RequestContext`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use nox_core::prelude::*;
//!
//! let config = NoxConfig::load()?;
//! nox_core::logging::init_logging(&config.logging)?;
//!
//! let app = Arc::new(AppContext::new(config, MySqlConnector::new()?));
//! let classes = ClassRegistry::new().controller::<UsersController>().model::<UsersModel>();
//! app.sync_models(&classes)?;
//! let router = app.build_router(&classes)?;
//!
//! let mut ctx = app.request(HttpMethod::GET, "/users/42");
//! let response = app.request_handler(&router).handle(&mut ctx)?;
//! ```

use std::sync::Arc;

use crate::config::NoxConfig;
use crate::http::RequestContext;
use crate::orm::{Abyss, ConnectionPool, Connector};
use crate::router::{ClassScanner, ModelClassIdentifier, RequestHandler, Router, RouteTableLoader};

/// Configuration and connection pool shared by every request
#[derive(Debug)]
pub struct AppContext {
    config: NoxConfig,
    pool: ConnectionPool,
}

impl AppContext {
    /// Build the pool from `config.database` on top of `connector`
    pub fn new(config: NoxConfig, connector: impl Connector + 'static) -> Self {
        let pool = ConnectionPool::new(connector)
            .with_names(&config.database.character_encoding, &config.database.collation);
        for credentials in &config.database.credentials {
            pool.add_credentials(credentials.clone());
        }
        Self { config, pool }
    }

    pub fn config(&self) -> &NoxConfig {
        &self.config
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// ORM entry point bound to this application's pool
    pub fn abyss(&self) -> Abyss<'_> {
        Abyss::new(&self.pool)
    }

    /// Load the route table from `scanner` and apply the router settings
    pub fn build_router(&self, scanner: &dyn ClassScanner) -> crate::Result<Router> {
        let table = RouteTableLoader::load_from(scanner)?;
        Ok(Router::from_config(table, &self.config.router))
    }

    pub fn request_handler<'r>(&self, router: &'r Router) -> RequestHandler<'r> {
        RequestHandler::from_config(router, &self.config.router)
    }

    /// Converge every model class found by `scanner`; returns the executed DDL
    pub fn sync_models(&self, scanner: &dyn ClassScanner) -> crate::Result<Vec<String>> {
        let models = ModelClassIdentifier::identify(&scanner.scan())?;
        log::info!("Synchronizing {} models", models.len());
        let models: Vec<&dyn crate::orm::Model> = models.iter().map(|m| &**m).collect();
        Ok(self.abyss().sync_models(&models)?)
    }

    /// Fresh request context bound to this application
    pub fn request(self: &Arc<Self>, method: impl AsRef<str>, path: &str) -> RequestContext {
        RequestContext::new(method, path)
            .with_app(Arc::clone(self))
            .with_json_output(self.config.router.output_arrays_as_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::DatabaseCredentials;
    use crate::router::ClassRegistry;
    use crate::testing::{ScriptedConnector, UsersModel};

    fn config() -> NoxConfig {
        let mut config = NoxConfig::default();
        config.database.credentials.push(DatabaseCredentials::new("localhost", "root", "", "test"));
        config.router.output_arrays_as_json = true;
        config
    }

    #[test]
    fn test_pool_gets_configured_credentials() {
        let app = AppContext::new(config(), ScriptedConnector::default());
        assert!(app.pool().credentials("test").is_some());
        assert_eq!(app.pool().open_connections(), 0);
    }

    #[test]
    fn test_request_carries_app_and_json_flag() {
        let app = Arc::new(AppContext::new(config(), ScriptedConnector::default()));
        let ctx = app.request("GET", "/");
        assert!(ctx.app().is_some());
        assert!(ctx.output_json());
    }

    #[test]
    fn test_sync_models_creates_missing_tables() {
        let connector = ScriptedConnector::default();
        let log = connector.log();
        let app = AppContext::new(config(), connector);

        let executed = app.sync_models(&ClassRegistry::new().model::<UsersModel>()).unwrap();
        assert_eq!(executed.len(), 1);
        assert!(executed[0].starts_with("CREATE TABLE `users`"));
        assert!(log.statements()[0].starts_with("SET NAMES utf8mb4"));
    }
}
