//! sqlx-backed MySQL connector
//!
//! Enabled with the `mysql` feature. The ORM is synchronous, so every
//! connection drives its sqlx session on a small current-thread tokio
//! runtime shared with its connector.
//!
//! ```rust,ignore
//! let connector = MySqlConnector::new()?;
//! let pool = ConnectionPool::new(connector);
//! pool.add_credentials(DatabaseCredentials::new("127.0.0.1", "root", "secret", "test"));
//! ```

use std::sync::Arc;

use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, ConnectOptions, Row as _, ValueRef};
use tokio::runtime::Runtime;

use super::connection::{BoundStatement, Connection, Connector, DatabaseCredentials, QueryResult, Row};
use super::data_type::BindType;
use super::value::SqlValue;
use super::{OrmError, OrmResult};

fn driver(err: impl std::fmt::Display) -> OrmError {
    OrmError::Driver(err.to_string())
}

/// Opens sqlx MySQL sessions
pub struct MySqlConnector {
    runtime: Arc<Runtime>,
}

impl MySqlConnector {
    pub fn new() -> OrmResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(driver)?;
        Ok(Self { runtime: Arc::new(runtime) })
    }
}

impl Connector for MySqlConnector {
    fn connect(&self, credentials: &DatabaseCredentials) -> OrmResult<Box<dyn Connection>> {
        let options = MySqlConnectOptions::new()
            .host(&credentials.host)
            .port(credentials.port)
            .username(&credentials.username)
            .password(&credentials.password)
            .database(&credentials.database);

        let session = self.runtime.block_on(options.connect()).map_err(driver)?;
        Ok(Box::new(MySqlSession { runtime: self.runtime.clone(), session }))
    }
}

struct MySqlSession {
    runtime: Arc<Runtime>,
    session: MySqlConnection,
}

/// Statements answered with a result set
fn returns_rows(sql: &str) -> bool {
    let keyword = sql.split_whitespace().next().unwrap_or_default().to_ascii_uppercase();
    matches!(keyword.as_str(), "SELECT" | "SHOW" | "DESCRIBE" | "DESC" | "EXPLAIN" | "WITH")
}

fn decode_cell(row: &MySqlRow, index: usize) -> SqlValue {
    match row.try_get_raw(index) {
        Ok(raw) if !raw.is_null() => {}
        _ => return SqlValue::Null,
    }

    if let Ok(v) = row.try_get::<i64, _>(index) {
        return SqlValue::Int(v);
    }
    if let Ok(v) = row.try_get::<u64, _>(index) {
        return i64::try_from(v).map(SqlValue::Int).unwrap_or_else(|_| SqlValue::Text(v.to_string()));
    }
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return SqlValue::Float(v);
    }
    if let Ok(v) = row.try_get::<f32, _>(index) {
        return SqlValue::Float(f64::from(v));
    }
    if let Ok(v) = row.try_get::<String, _>(index) {
        return SqlValue::Text(v);
    }
    if let Ok(v) = row.try_get::<Vec<u8>, _>(index) {
        return SqlValue::Blob(v);
    }
    row.try_get_unchecked::<String, _>(index).map(SqlValue::Text).unwrap_or(SqlValue::Null)
}

fn decode_row(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .map(|column| (column.name().to_string(), decode_cell(row, column.ordinal())))
        .collect()
}

impl Connection for MySqlSession {
    fn execute(&mut self, sql: &str) -> OrmResult<QueryResult> {
        if returns_rows(sql) {
            let rows = self
                .runtime
                .block_on(sqlx::raw_sql(sql).fetch_all(&mut self.session))
                .map_err(driver)?;
            Ok(QueryResult::with_rows(rows.iter().map(decode_row).collect()))
        } else {
            let done =
                self.runtime.block_on(sqlx::raw_sql(sql).execute(&mut self.session)).map_err(driver)?;
            Ok(QueryResult::with_affected(done.rows_affected(), done.last_insert_id()))
        }
    }

    fn execute_bound(&mut self, statement: &BoundStatement) -> OrmResult<QueryResult> {
        let mut query = sqlx::query(&statement.sql);
        for (bind_type, value) in statement.bindings() {
            query = match bind_type {
                BindType::Integer => query.bind(value.bind_i64()?),
                BindType::Double => query.bind(value.bind_f64()?),
                BindType::String => query.bind(match value {
                    SqlValue::Null => None,
                    SqlValue::Blob(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
                    other => Some(other.to_string()),
                }),
                BindType::Blob => query.bind(match value {
                    SqlValue::Null => None,
                    SqlValue::Blob(bytes) => Some(bytes.clone()),
                    other => Some(other.to_string().into_bytes()),
                }),
            };
        }

        if returns_rows(&statement.sql) {
            let rows =
                self.runtime.block_on(query.fetch_all(&mut self.session)).map_err(driver)?;
            Ok(QueryResult::with_rows(rows.iter().map(decode_row).collect()))
        } else {
            let done = self.runtime.block_on(query.execute(&mut self.session)).map_err(driver)?;
            Ok(QueryResult::with_affected(done.rows_affected(), done.last_insert_id()))
        }
    }
}
