//! Abyss - the schema-synchronizing ORM
//!
//! Models declare an ordered list of [`ColumnDefinition`]s; Abyss keeps the
//! live MySQL tables converged to those declarations and maps rows to typed
//! instances and back.
//!
//! # Architecture
//!
//! - [`value`] - Dynamically typed SQL scalars ([`SqlValue`])
//! - [`data_type`] - Column data types and their bind flags
//! - [`column`] - Column definitions
//! - [`model`] - The `Model` / `ModelInstance` contracts and row hydration
//! - [`query`] - `ColumnQuery`, `ResultOrder` and `Pager`
//! - [`schema`] - DDL emission and the pluggable [`SchemaDiffer`]
//! - [`connection`] - Connection traits and the per-database [`ConnectionPool`]
//! - [`abyss`] - The [`Abyss`] entry point tying everything together
//!
//! # Example
//!
//! ```rust,ignore
//! use nox_core::orm::{Abyss, ColumnQuery, Pager};
//!
//! let abyss = Abyss::new(&app.pool);
//! let query = ColumnQuery::new().where_("age", ">", 18).and().where_("status", "=", "active");
//! let adults: Vec<User> = abyss.fetch_instances(Some(&query), None, Some(&Pager::new(10, 1)?))?;
//! ```

pub mod abyss;
pub mod column;
pub mod connection;
pub mod data_type;
pub mod model;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod query;
pub mod schema;
pub mod value;

pub use abyss::Abyss;
pub use column::ColumnDefinition;
pub use connection::{
    escape_string, BoundStatement, Connection, ConnectionPool, Connector, DatabaseCredentials,
    QueryResult, Row,
};
pub use data_type::{BindType, DataType};
pub use model::{
    check_primary_key, instance_from_model, prefill_with_column_defaults, Model, ModelInstance,
    TableModel,
};
pub use query::{
    build_where_clause, Clause, ClauseValue, ColumnQuery, ColumnRef, Join, Pager, ResultOrder,
    SortDirection, TrustedSql, WhereClause,
};
pub use schema::{
    column_definition_sql, create_table_sql, LiveColumn, RestatingDiffer, SchemaDiffer,
    TableSnapshot,
};
pub use value::{FromSqlValue, SqlValue};

/// Result type for ORM operations
pub type OrmResult<T> = std::result::Result<T, OrmError>;

/// Errors raised by the query builder, the schema synchronizer and model binding
#[derive(thiserror::Error, Debug)]
pub enum OrmError {
    /// A declared column has no matching property on the instance type
    #[error(
        "Missing property definition in {instance} for column {column}. Property name expected {property}"
    )]
    ObjectMissingModelProperty { instance: String, column: String, property: String },

    #[error("No primary key set for table {0}")]
    NoPrimaryKey(String),

    #[error("Table {table} declares more than one primary column: {columns}")]
    MultiplePrimaryKeys { table: String, columns: String },

    #[error("Model {model} has no column bound to property {property}")]
    NoColumnWithPropertyName { model: String, property: String },

    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    /// Untrusted text reached an unparameterized SQL position
    #[error("Untrusted literal for operator '{operator}' on column {column}; wrap vetted SQL in TrustedSql")]
    UntrustedLiteral { column: String, operator: String },

    #[error("Invalid pager: {0}")]
    InvalidPager(String),

    #[error("Missing DatabaseCredentials for database {0}")]
    MissingDatabaseCredentials(String),

    #[error("Property {property} cannot hold value {value}")]
    PropertyType { property: String, value: String },

    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    /// A non-NULL value with no form under its placeholder's type flag
    #[error("Value {value} cannot be bound to a '{flag}' placeholder")]
    UnbindableValue { flag: char, value: String },

    #[error("Float {0} has no SQL literal")]
    NonFiniteFloat(f64),

    #[error("Statement has {placeholders} placeholders, {flags} type flags and {values} values")]
    PlaceholderMismatch { placeholders: usize, flags: usize, values: usize },

    #[error("Database driver error: {0}")]
    Driver(String),
}
