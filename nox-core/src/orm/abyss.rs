//! The Abyss entry point
//!
//! [`Abyss`] borrows the application's [`ConnectionPool`] and offers the
//! ORM operations: hydration, fetching, upserts, deletes and schema sync.

use super::column::ColumnDefinition;
use super::connection::{BoundStatement, Connection, ConnectionPool, QueryResult, Row};
use super::model::{self, Model, ModelInstance};
use super::query::{self, ColumnQuery, Pager, ResultOrder, WhereClause};
use super::schema::{self, RestatingDiffer, SchemaDiffer, TableSnapshot};
use super::value::SqlValue;
use super::{OrmError, OrmResult};

fn quote(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Whether an upsert result reports a fresh insert rather than an update
fn inserted_key(result: &QueryResult) -> Option<i64> {
    if !result.has_result_set() && result.affected_rows == 1 && result.last_insert_id != 0 {
        i64::try_from(result.last_insert_id).ok()
    } else {
        None
    }
}

/// ORM operations over a borrowed [`ConnectionPool`]
pub struct Abyss<'a> {
    pool: &'a ConnectionPool,
    differ: Box<dyn SchemaDiffer>,
}

impl<'a> Abyss<'a> {
    pub fn new(pool: &'a ConnectionPool) -> Self {
        Self { pool, differ: Box::new(RestatingDiffer) }
    }

    /// Replaces the schema diff strategy used by [`Abyss::sync_models`]
    pub fn with_differ(mut self, differ: impl SchemaDiffer + 'static) -> Self {
        self.differ = Box::new(differ);
        self
    }

    pub fn pool(&self) -> &ConnectionPool {
        self.pool
    }

    pub fn instance_from_model<T: ModelInstance>(
        &self,
        model: &dyn Model,
        values: &Row,
    ) -> OrmResult<T> {
        model::instance_from_model(model, values)
    }

    pub fn prefill_with_column_defaults<T: ModelInstance>(&self, instance: &mut T) -> OrmResult<()> {
        model::prefill_with_column_defaults(&T::model(), instance)
    }

    pub fn build_where_clause(
        &self,
        model: &dyn Model,
        query: &ColumnQuery,
    ) -> OrmResult<WhereClause> {
        query::build_where_clause(model, query)
    }

    pub fn fetch_instance_by_primary_key<T: ModelInstance>(
        &self,
        key: impl Into<SqlValue>,
    ) -> OrmResult<Option<T>> {
        let model = T::model();
        let primary = require_primary_key(&model)?;
        let statement = BoundStatement::new(
            format!("SELECT * FROM {} WHERE {} = ?", quote(model.name()), quote(&primary.name)),
            primary.data_type.bind_type().as_char().to_string(),
            vec![key.into()],
        )?;

        let result = self.execute_bound(&model, &statement)?;
        match result.rows().first() {
            Some(row) => model::instance_from_model(&model, row).map(Some),
            None => Ok(None),
        }
    }

    /// `SELECT *` with an optional filter, ordering and page window
    pub fn fetch_instances<T: ModelInstance>(
        &self,
        query: Option<&ColumnQuery>,
        order: Option<&ResultOrder>,
        pager: Option<&Pager>,
    ) -> OrmResult<Vec<T>> {
        let model = T::model();
        let filter = match query {
            Some(query) => query::build_where_clause(&model, query)?,
            None => WhereClause::default(),
        };

        let mut parts = vec![format!("SELECT * FROM {}", quote(model.name()))];
        parts.push(filter.sql);
        parts.push(order.map(ResultOrder::to_sql).unwrap_or_default());
        parts.push(pager.map(Pager::to_sql).unwrap_or_default());
        parts.retain(|part| !part.is_empty());

        let statement = BoundStatement::new(parts.join("\n"), filter.type_flags, filter.values)?;
        let result = self.execute_bound(&model, &statement)?;
        result.rows().iter().map(|row| model::instance_from_model(&model, row)).collect()
    }

    /// Prepared `INSERT ... ON DUPLICATE KEY UPDATE` with one placeholder per column
    pub fn build_save_query<T: ModelInstance>(&self, instance: &T) -> OrmResult<BoundStatement> {
        let model = T::model();
        let (columns, values) = column_values(&model, instance)?;
        let type_flags: String = columns.iter().map(|c| c.data_type.bind_type().as_char()).collect();
        let placeholders = vec!["?"; columns.len()].join(",");

        BoundStatement::new(upsert_sql(&model, &columns, &placeholders)?, type_flags, values)
    }

    /// Upsert with inlined, escaped literal values, used for batches
    pub fn build_literal_save_query<T: ModelInstance>(
        &self,
        instance: &T,
        connection: &dyn Connection,
    ) -> OrmResult<String> {
        let model = T::model();
        let (columns, values) = column_values(&model, instance)?;
        let literals = values
            .iter()
            .map(|v| v.to_sql_literal(|s| connection.escape(s)))
            .collect::<OrmResult<Vec<String>>>()?;

        upsert_sql(&model, &columns, &literals.join(","))
    }

    /// Saves or creates a row. Returns the generated key when a row was inserted.
    pub fn save_or_create<T: ModelInstance>(&self, instance: &T) -> OrmResult<Option<i64>> {
        let model = T::model();
        let statement = self.build_save_query(instance)?;
        let result = self.execute_bound(&model, &statement)?;
        Ok(inserted_key(&result))
    }

    /// Batch upsert in one round trip; generated keys are written back into
    /// the primary property of inserted instances.
    pub fn save_or_create_all<T: ModelInstance>(&self, instances: &mut [T]) -> OrmResult<()> {
        if instances.is_empty() {
            return Ok(());
        }

        let model = T::model();
        let primary = require_primary_key(&model)?;

        let results = self.pool.with_connection(model.database_name(), |connection| {
            let statements = instances
                .iter()
                .map(|instance| self.build_literal_save_query(instance, &*connection))
                .collect::<OrmResult<Vec<String>>>()?;
            log::debug!("Batch saving {} rows into {}", statements.len(), model.name());
            connection.execute_batch(&statements)
        })?;

        for (instance, result) in instances.iter_mut().zip(results.iter()) {
            if let Some(key) = inserted_key(result) {
                instance.set_property(&primary.property_name, SqlValue::Int(key))?;
            }
        }
        Ok(())
    }

    pub fn delete_row_by_primary_key<T: ModelInstance>(&self, instance: &T) -> OrmResult<()> {
        let model = T::model();
        let primary = require_primary_key(&model)?;
        let key = instance
            .get_property(&primary.property_name)
            .ok_or_else(|| missing_property(&model, &primary))?;

        let statement = BoundStatement::new(
            format!("DELETE FROM {} WHERE {} = ?", quote(model.name()), quote(&primary.name)),
            primary.data_type.bind_type().as_char().to_string(),
            vec![key],
        )?;
        self.execute_bound(&model, &statement)?;
        Ok(())
    }

    /// Converges the live tables of every model to its declarations.
    ///
    /// Returns the DDL statements that were executed, in order.
    pub fn sync_models(&self, models: &[&dyn Model]) -> OrmResult<Vec<String>> {
        let mut executed = Vec::new();
        for model in models {
            executed.extend(self.sync_model(*model)?);
        }
        Ok(executed)
    }

    pub fn sync_model(&self, model: &dyn Model) -> OrmResult<Vec<String>> {
        model::check_primary_key(model)?;
        self.pool.with_connection(model.database_name(), |connection| {
            let statements = match snapshot_table(connection, model.name())? {
                None => {
                    log::info!("Creating table {}", model.name());
                    vec![schema::create_table_sql(model)]
                }
                Some(snapshot) => {
                    log::info!("Updating table {}", model.name());
                    self.differ.diff(model, &snapshot)
                }
            };

            if !statements.is_empty() {
                connection.execute_batch(&statements)?;
            }
            Ok(statements)
        })
    }

    fn execute_bound(&self, model: &dyn Model, statement: &BoundStatement) -> OrmResult<QueryResult> {
        log::debug!("{} [{}]", statement.sql, statement.type_flags);
        self.pool
            .with_connection(model.database_name(), |connection| connection.execute_bound(statement))
    }
}

fn require_primary_key(model: &dyn Model) -> OrmResult<ColumnDefinition> {
    model::check_primary_key(model)?;
    model.primary_key().ok_or_else(|| OrmError::NoPrimaryKey(model.name().to_string()))
}

fn missing_property(model: &dyn Model, column: &ColumnDefinition) -> OrmError {
    OrmError::ObjectMissingModelProperty {
        instance: model.instance_name().to_string(),
        column: column.name.clone(),
        property: column.property_name.clone(),
    }
}

/// Declared columns paired with the instance's current values
fn column_values<T: ModelInstance>(
    model: &dyn Model,
    instance: &T,
) -> OrmResult<(Vec<ColumnDefinition>, Vec<SqlValue>)> {
    let columns = model.columns();
    let values = columns
        .iter()
        .map(|column| {
            instance.get_property(&column.property_name).ok_or_else(|| missing_property(model, column))
        })
        .collect::<OrmResult<Vec<SqlValue>>>()?;
    Ok((columns, values))
}

fn upsert_sql(model: &dyn Model, columns: &[ColumnDefinition], values: &str) -> OrmResult<String> {
    let primary = require_primary_key(model)?;
    let names: Vec<String> = columns.iter().map(|c| quote(&c.name)).collect();
    let mut updates: Vec<String> = columns
        .iter()
        .filter(|c| c.name != primary.name)
        .map(|c| format!("{0} = VALUES({0})", quote(&c.name)))
        .collect();
    if updates.is_empty() {
        updates.push(format!("{0} = {0}", quote(&primary.name)));
    }

    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({}) ON DUPLICATE KEY UPDATE {}",
        quote(model.name()),
        names.join(","),
        values,
        updates.join(",")
    ))
}

/// Live structure of `table`, or `None` when it does not exist
fn snapshot_table(connection: &mut dyn Connection, table: &str) -> OrmResult<Option<TableSnapshot>> {
    let exists = connection.execute(&format!("SHOW TABLES LIKE \"{}\"", connection.escape(table)))?;
    if exists.rows().is_empty() {
        return Ok(None);
    }

    let quoted = quote(table);
    let columns = connection.execute(&format!("SHOW COLUMNS FROM {}", quoted))?;
    let uniques = connection.execute(&format!(
        "SHOW INDEXES FROM {} WHERE Non_unique=0 AND Key_name != \"PRIMARY\"",
        quoted
    ))?;
    let primary = connection.execute(&format!("SHOW KEYS FROM {} WHERE Key_name=\"PRIMARY\"", quoted))?;

    Ok(Some(TableSnapshot::from_rows(columns.rows(), uniques.rows(), primary.rows())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::connection::DatabaseCredentials;
    use crate::testing::{ScriptedConnector, User, UsersModel};

    fn pool(connector: ScriptedConnector) -> ConnectionPool {
        let pool = ConnectionPool::new(connector);
        pool.add_credentials(DatabaseCredentials::new("localhost", "root", "", "test"));
        pool
    }

    #[test]
    fn test_build_save_query() {
        let pool = pool(ScriptedConnector::default());
        let abyss = Abyss::new(&pool);
        let mut user = User::new_with_defaults().unwrap();
        user.name = "Ada".to_string();

        let statement = abyss.build_save_query(&user).unwrap();
        assert_eq!(
            statement.sql,
            "INSERT INTO `users` (`id`,`name`,`email`,`creation_timestamp`) VALUES (?,?,?,?) \
             ON DUPLICATE KEY UPDATE `name` = VALUES(`name`),`email` = VALUES(`email`),\
             `creation_timestamp` = VALUES(`creation_timestamp`)"
        );
        assert_eq!(statement.type_flags, "issi");
        assert_eq!(statement.values[1], SqlValue::from("Ada"));
    }

    #[test]
    fn test_literal_save_query_escapes() {
        let pool = pool(ScriptedConnector::default());
        let abyss = Abyss::new(&pool);
        let user = User { id: Some(3), name: "O\"Neil".to_string(), ..User::default() };
        let sql = pool
            .with_connection("test", |c| abyss.build_literal_save_query(&user, &*c))
            .unwrap();
        assert!(sql.contains("VALUES (3,\"O\\\"Neil\",\"\",NULL)"), "{}", sql);
    }

    #[test]
    fn test_save_or_create_reports_inserts_only() {
        let connector = ScriptedConnector::with_responder(|sql, _| {
            if sql.starts_with("INSERT") {
                QueryResult::with_affected(1, 77)
            } else {
                QueryResult::default()
            }
        });
        let pool = pool(connector);
        let abyss = Abyss::new(&pool);
        let mut user = User::new_with_defaults().unwrap();
        assert_eq!(user.save(&abyss).unwrap(), Some(77));
        assert_eq!(user.id, Some(77));

        let updating = ScriptedConnector::with_responder(|_, _| QueryResult::with_affected(2, 77));
        let pool = self::pool(updating);
        let abyss = Abyss::new(&pool);
        assert_eq!(abyss.save_or_create(&user).unwrap(), None);
    }

    #[test]
    fn test_fetch_by_primary_key() {
        let connector = ScriptedConnector::with_responder(|sql, values| {
            if sql.starts_with("SELECT") && values == [SqlValue::Int(42)] {
                QueryResult::with_rows(vec![Row::new()
                    .with("id", 42)
                    .with("name", "Ada")
                    .with("email", "ada@example.com")
                    .with("creation_timestamp", 1_700_000_000)])
            } else {
                QueryResult::with_rows(vec![])
            }
        });
        let log = connector.log();
        let pool = pool(connector);
        let abyss = Abyss::new(&pool);

        let user: User = abyss.fetch_instance_by_primary_key(42).unwrap().unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.creation_timestamp, Some(1_700_000_000));
        assert!(abyss.fetch_instance_by_primary_key::<User>(7).unwrap().is_none());
        assert_eq!(log.bound()[0].sql, "SELECT * FROM `users` WHERE `id` = ?");
    }

    #[test]
    fn test_fetch_instances_composes_clauses() {
        let connector = ScriptedConnector::default();
        let log = connector.log();
        let pool = pool(connector);
        let abyss = Abyss::new(&pool);

        let query = ColumnQuery::new().where_("name", "=", "Ada");
        let order = ResultOrder::new().by("id", query::SortDirection::Desc);
        let pager = Pager::new(10, 3).unwrap();
        let users: Vec<User> =
            abyss.fetch_instances(Some(&query), Some(&order), Some(&pager)).unwrap();

        assert!(users.is_empty());
        let statement = &log.bound()[0];
        assert_eq!(
            statement.sql,
            "SELECT * FROM `users`\nWHERE `name` = ?\nORDER BY `id` DESC\nLIMIT 10 OFFSET 20"
        );
        assert_eq!(statement.type_flags, "s");
    }

    #[test]
    fn test_delete_requires_primary_key() {
        let pool = pool(ScriptedConnector::default());
        let abyss = Abyss::new(&pool);
        let err = abyss.delete_row_by_primary_key(&crate::testing::LogLine::default()).unwrap_err();
        assert!(matches!(err, OrmError::NoPrimaryKey(ref t) if t == "log_lines"));
    }

    #[test]
    fn test_save_or_create_all_assigns_keys() {
        let connector = ScriptedConnector::with_responder(|sql, _| {
            if sql.contains("\"new\"") {
                QueryResult::with_affected(1, 501)
            } else {
                QueryResult::with_affected(2, 0)
            }
        });
        let pool = pool(connector);
        let abyss = Abyss::new(&pool);
        let mut users = vec![
            User { id: Some(1), name: "old".to_string(), ..User::default() },
            User { id: None, name: "new".to_string(), ..User::default() },
        ];

        abyss.save_or_create_all(&mut users).unwrap();
        assert_eq!(users[0].id, Some(1));
        assert_eq!(users[1].id, Some(501));
    }

    #[test]
    fn test_sync_creates_missing_table() {
        let connector = ScriptedConnector::default();
        let log = connector.log();
        let pool = pool(connector);
        let abyss = Abyss::new(&pool);

        let executed = abyss.sync_models(&[&UsersModel]).unwrap();
        assert_eq!(executed.len(), 1);
        assert!(executed[0].starts_with("CREATE TABLE `users`("));
        assert!(log.statements().contains(&executed[0]));
    }
}
