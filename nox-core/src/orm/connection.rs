//! Database connections and the per-database connection pool
//!
//! The ORM never talks to a driver directly: it goes through the
//! [`Connection`] trait, and connections are handed out by a
//! [`ConnectionPool`] owned by the application root. Connections are created
//! lazily on first use, one per logical database name, and reused for the
//! lifetime of the pool.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use super::data_type::BindType;
use super::value::SqlValue;
use super::{OrmError, OrmResult};

/// Connection settings for one logical database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseCredentials {
    pub host: String,
    pub username: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3306
}

impl DatabaseCredentials {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            database: database.into(),
            port: default_port(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// One result row, columns kept in result-set order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        self.columns.push((column.into(), value.into()));
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.iter().find(|(name, _)| name == column).map(|(_, value)| value)
    }

    /// Text view of a cell, used for introspection rows
    pub fn get_text(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            SqlValue::Null => None,
            SqlValue::Blob(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            other => Some(other.to_string()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(String, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
        Self { columns: iter.into_iter().collect() }
    }
}

/// Outcome of one executed statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// `None` when the statement produced no result set (INSERT, UPDATE, DDL, ...)
    pub rows: Option<Vec<Row>>,
    pub affected_rows: u64,
    pub last_insert_id: u64,
}

impl QueryResult {
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self { rows: Some(rows), ..Self::default() }
    }

    pub fn with_affected(affected_rows: u64, last_insert_id: u64) -> Self {
        Self { rows: None, affected_rows, last_insert_id }
    }

    pub fn has_result_set(&self) -> bool {
        self.rows.is_some()
    }

    /// Rows of the result set, empty when there is none
    pub fn rows(&self) -> &[Row] {
        self.rows.as_deref().unwrap_or(&[])
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows.unwrap_or_default()
    }
}

/// A parameterized statement with one type flag per placeholder
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub type_flags: String,
    pub values: Vec<SqlValue>,
}

impl BoundStatement {
    /// Checks that placeholders, flags and values line up exactly, and that
    /// every numeric placeholder receives a numeric (or NULL) value
    pub fn new(
        sql: impl Into<String>,
        type_flags: impl Into<String>,
        values: Vec<SqlValue>,
    ) -> OrmResult<Self> {
        let sql = sql.into();
        let type_flags = type_flags.into();
        let placeholders = count_placeholders(&sql);
        let flags = type_flags.chars().count();

        if placeholders != flags
            || flags != values.len()
            || type_flags.chars().any(|c| BindType::from_char(c).is_none())
        {
            return Err(OrmError::PlaceholderMismatch { placeholders, flags, values: values.len() });
        }

        let statement = Self { sql, type_flags, values };
        for (bind_type, value) in statement.bindings() {
            value.check_bindable(bind_type)?;
        }
        Ok(statement)
    }

    /// Pairs each value with its bind type
    pub fn bindings(&self) -> impl Iterator<Item = (BindType, &SqlValue)> {
        self.type_flags
            .chars()
            .filter_map(BindType::from_char)
            .zip(self.values.iter())
    }
}

/// Counts `?` placeholders outside quoted strings and identifiers
fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in sql.chars() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' && q != '`' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '?' => count += 1,
                _ => {}
            },
        }
    }

    count
}

/// Escapes a string for inclusion in a quoted MySQL literal
pub fn escape_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\0' => escaped.push_str("\\0"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\x1a' => escaped.push_str("\\Z"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// A live database session
pub trait Connection: Send {
    /// Executes plain SQL text
    fn execute(&mut self, sql: &str) -> OrmResult<QueryResult>;

    /// Executes a prepared statement
    fn execute_bound(&mut self, statement: &BoundStatement) -> OrmResult<QueryResult>;

    /// Executes several statements in one round trip, one result per statement
    fn execute_batch(&mut self, statements: &[String]) -> OrmResult<Vec<QueryResult>> {
        statements.iter().map(|sql| self.execute(sql)).collect()
    }

    fn escape(&self, value: &str) -> String {
        escape_string(value)
    }
}

/// Opens connections from credentials
pub trait Connector: Send + Sync {
    fn connect(&self, credentials: &DatabaseCredentials) -> OrmResult<Box<dyn Connection>>;
}

/// Lazily created connections, cached per logical database name
pub struct ConnectionPool {
    connector: Box<dyn Connector>,
    credentials: Mutex<HashMap<String, DatabaseCredentials>>,
    connections: Mutex<HashMap<String, Box<dyn Connection>>>,
    character_encoding: String,
    collation: String,
}

impl ConnectionPool {
    pub fn new(connector: impl Connector + 'static) -> Self {
        Self {
            connector: Box::new(connector),
            credentials: Mutex::new(HashMap::new()),
            connections: Mutex::new(HashMap::new()),
            character_encoding: "utf8mb4".to_string(),
            collation: "utf8mb4_unicode_ci".to_string(),
        }
    }

    /// Overrides the `SET NAMES` encoding and collation run on every new connection
    pub fn with_names(mut self, encoding: impl Into<String>, collation: impl Into<String>) -> Self {
        self.character_encoding = encoding.into();
        self.collation = collation.into();
        self
    }

    /// Registers credentials for their database. The first registration wins.
    pub fn add_credentials(&self, credentials: DatabaseCredentials) {
        let mut registered = self.credentials.lock().unwrap_or_else(|e| e.into_inner());
        if registered.contains_key(&credentials.database) {
            log::debug!("Credentials for database {} already registered", credentials.database);
            return;
        }
        registered.insert(credentials.database.clone(), credentials);
    }

    pub fn credentials(&self, database: &str) -> Option<DatabaseCredentials> {
        self.credentials.lock().unwrap_or_else(|e| e.into_inner()).get(database).cloned()
    }

    /// Number of connections opened so far
    pub fn open_connections(&self) -> usize {
        self.connections.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Runs `f` with the connection for `database`, opening it first if needed
    pub fn with_connection<R>(
        &self,
        database: &str,
        f: impl FnOnce(&mut dyn Connection) -> OrmResult<R>,
    ) -> OrmResult<R> {
        let mut connections = self.connections.lock().unwrap_or_else(|e| e.into_inner());

        if !connections.contains_key(database) {
            let connection = self.open(database)?;
            connections.insert(database.to_string(), connection);
        }

        match connections.get_mut(database) {
            Some(connection) => f(connection.as_mut()),
            None => Err(OrmError::MissingDatabaseCredentials(database.to_string())),
        }
    }

    fn open(&self, database: &str) -> OrmResult<Box<dyn Connection>> {
        let credentials = self
            .credentials(database)
            .ok_or_else(|| OrmError::MissingDatabaseCredentials(database.to_string()))?;

        log::info!(
            "Opening connection to {}@{}:{}/{}",
            credentials.username,
            credentials.host,
            credentials.port,
            credentials.database
        );

        let mut connection = self.connector.connect(&credentials)?;
        connection
            .execute(&format!("SET NAMES {} COLLATE {}", self.character_encoding, self.collation))?;
        Ok(connection)
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("character_encoding", &self.character_encoding)
            .field("collation", &self.collation)
            .field("open_connections", &self.open_connections())
            .finish()
    }
}
