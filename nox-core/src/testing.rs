//! Test doubles shared by the unit tests: a scripted in-memory connection
//! and a couple of hand-bound models.

use std::sync::{Arc, Mutex};

use crate::orm::{
    BoundStatement, ColumnDefinition, Connection, Connector, DataType, DatabaseCredentials,
    FromSqlValue, Model, ModelInstance, OrmError, OrmResult, QueryResult, SqlValue,
};

type Responder = Arc<dyn Fn(&str, &[SqlValue]) -> QueryResult + Send + Sync>;

/// Every statement seen by the scripted connections of one connector
#[derive(Clone, Default)]
pub struct StatementLog {
    statements: Arc<Mutex<Vec<String>>>,
    bound: Arc<Mutex<Vec<BoundStatement>>>,
}

impl StatementLog {
    /// SQL text of every statement, plain and bound, in execution order
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    pub fn bound(&self) -> Vec<BoundStatement> {
        self.bound.lock().unwrap().clone()
    }
}

/// Connector whose connections answer every statement through a closure
#[derive(Clone)]
pub struct ScriptedConnector {
    log: StatementLog,
    responder: Responder,
}

impl Default for ScriptedConnector {
    fn default() -> Self {
        Self::with_responder(|sql, _| {
            let upper = sql.trim_start().to_uppercase();
            if upper.starts_with("SELECT") || upper.starts_with("SHOW") {
                QueryResult::with_rows(Vec::new())
            } else {
                QueryResult::default()
            }
        })
    }
}

impl ScriptedConnector {
    pub fn with_responder(
        responder: impl Fn(&str, &[SqlValue]) -> QueryResult + Send + Sync + 'static,
    ) -> Self {
        Self { log: StatementLog::default(), responder: Arc::new(responder) }
    }

    pub fn log(&self) -> StatementLog {
        self.log.clone()
    }
}

impl Connector for ScriptedConnector {
    fn connect(&self, _credentials: &DatabaseCredentials) -> OrmResult<Box<dyn Connection>> {
        Ok(Box::new(ScriptedConnection { log: self.log.clone(), responder: self.responder.clone() }))
    }
}

struct ScriptedConnection {
    log: StatementLog,
    responder: Responder,
}

impl Connection for ScriptedConnection {
    fn execute(&mut self, sql: &str) -> OrmResult<QueryResult> {
        self.log.statements.lock().unwrap().push(sql.to_string());
        Ok((self.responder)(sql, &[]))
    }

    fn execute_bound(&mut self, statement: &BoundStatement) -> OrmResult<QueryResult> {
        self.log.statements.lock().unwrap().push(statement.sql.clone());
        self.log.bound.lock().unwrap().push(statement.clone());
        Ok((self.responder)(&statement.sql, &statement.values))
    }
}

/// The `users` table of the `test` database
#[derive(Debug, Clone, Copy, Default)]
pub struct UsersModel;

impl Model for UsersModel {
    fn columns(&self) -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", DataType::integer())
                .auto_increment()
                .primary()
                .not_null()
                .default_value(0),
            ColumnDefinition::new("name", DataType::VariableCharacter(65)).default_value(""),
            ColumnDefinition::new("email", DataType::VariableCharacter(65)).default_value(""),
            ColumnDefinition::new("creation_timestamp", DataType::integer())
                .property("creationTimestamp"),
        ]
    }

    fn name(&self) -> &str {
        "users"
    }

    fn database_name(&self) -> &str {
        "test"
    }

    fn instance_name(&self) -> &str {
        "User"
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    pub creation_timestamp: Option<i64>,
}

fn convert<T: FromSqlValue>(property: &str, value: &SqlValue) -> OrmResult<T> {
    T::from_sql_value(value).ok_or_else(|| OrmError::PropertyType {
        property: property.to_string(),
        value: value.to_string(),
    })
}

impl ModelInstance for User {
    type Model = UsersModel;

    fn property_names() -> &'static [&'static str] {
        &["id", "name", "email", "creationTimestamp"]
    }

    fn get_property(&self, name: &str) -> Option<SqlValue> {
        match name {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.clone().into()),
            "email" => Some(self.email.clone().into()),
            "creationTimestamp" => Some(self.creation_timestamp.into()),
            _ => None,
        }
    }

    fn set_property(&mut self, name: &str, value: SqlValue) -> OrmResult<()> {
        match name {
            "id" => self.id = convert(name, &value)?,
            "name" => self.name = convert(name, &value)?,
            "email" => self.email = convert(name, &value)?,
            "creationTimestamp" => self.creation_timestamp = convert(name, &value)?,
            _ => return Err(OrmError::UnknownProperty(name.to_string())),
        }
        Ok(())
    }
}

/// Append-only table without a primary key
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLinesModel;

impl Model for LogLinesModel {
    fn columns(&self) -> Vec<ColumnDefinition> {
        vec![ColumnDefinition::new("message", DataType::Text)]
    }

    fn name(&self) -> &str {
        "log_lines"
    }

    fn database_name(&self) -> &str {
        "test"
    }

    fn instance_name(&self) -> &str {
        "LogLine"
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogLine {
    pub message: Option<String>,
}

impl ModelInstance for LogLine {
    type Model = LogLinesModel;

    fn property_names() -> &'static [&'static str] {
        &["message"]
    }

    fn get_property(&self, name: &str) -> Option<SqlValue> {
        (name == "message").then(|| self.message.clone().into())
    }

    fn set_property(&mut self, name: &str, value: SqlValue) -> OrmResult<()> {
        match name {
            "message" => self.message = convert(name, &value)?,
            _ => return Err(OrmError::UnknownProperty(name.to_string())),
        }
        Ok(())
    }
}
