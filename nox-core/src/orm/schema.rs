//! DDL emission and schema diffing
//!
//! [`create_table_sql`] builds the statement for a missing table. For an
//! existing table, a [`SchemaDiffer`] compares the model against a
//! [`TableSnapshot`] of the live table and returns the `ALTER TABLE`
//! statements that converge it. The default [`RestatingDiffer`] restates
//! every declared column on every sync, so a second sync against an
//! up-to-date table emits only `MODIFY` statements.

use super::column::ColumnDefinition;
use super::connection::{escape_string, Row};
use super::model::Model;
use super::value::SqlValue;

fn quote(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Full column definition: name, type, nullability, default, auto increment
pub fn column_definition_sql(column: &ColumnDefinition) -> String {
    let mut sql = format!("{} {}", quote(&column.name), column.data_type.sql());

    sql.push_str(if column.is_nullable { " NULL" } else { " NOT NULL" });

    if !column.auto_increment && column.data_type.allows_default() {
        match &column.default_value {
            SqlValue::Null => sql.push_str(" DEFAULT NULL"),
            SqlValue::Int(v) => sql.push_str(&format!(" DEFAULT {}", v)),
            SqlValue::Float(v) => sql.push_str(&format!(" DEFAULT {}", v)),
            SqlValue::Text(s) => sql.push_str(&format!(" DEFAULT \"{}\"", escape_string(s))),
            SqlValue::Blob(bytes) => sql.push_str(&format!(
                " DEFAULT \"{}\"",
                escape_string(&String::from_utf8_lossy(bytes))
            )),
        }
    }

    if column.auto_increment {
        sql.push_str(" AUTO_INCREMENT");
    }

    sql
}

/// `CREATE TABLE` with every column, the primary key and one `UNIQUE` per unique column
pub fn create_table_sql(model: &dyn Model) -> String {
    let columns = model.columns();
    let mut parts: Vec<String> = columns.iter().map(column_definition_sql).collect();

    if let Some(primary) = columns.iter().find(|c| c.is_primary) {
        parts.push(format!("PRIMARY KEY({})", quote(&primary.name)));
    }
    for unique in columns.iter().filter(|c| c.is_unique) {
        parts.push(format!("UNIQUE ({})", quote(&unique.name)));
    }

    format!("CREATE TABLE {}({})", quote(model.name()), parts.join(", "))
}

/// One row of `SHOW COLUMNS`
#[derive(Debug, Clone, PartialEq)]
pub struct LiveColumn {
    pub name: String,
    pub column_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub extra: String,
}

impl LiveColumn {
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            name: row.get_text("Field")?,
            column_type: row.get_text("Type").unwrap_or_default(),
            nullable: row.get_text("Null").is_some_and(|v| v.eq_ignore_ascii_case("YES")),
            default: row.get_text("Default"),
            extra: row.get_text("Extra").unwrap_or_default(),
        })
    }
}

/// Live structure of an existing table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSnapshot {
    pub columns: Vec<LiveColumn>,
    /// `(column, index name)` for every non-primary unique index
    pub unique_indexes: Vec<(String, String)>,
    pub primary_columns: Vec<String>,
}

impl TableSnapshot {
    /// Builds a snapshot from `SHOW COLUMNS`, `SHOW INDEXES` (unique, non-primary)
    /// and `SHOW KEYS` (primary) result rows.
    pub fn from_rows(columns: &[Row], unique_indexes: &[Row], primary_keys: &[Row]) -> Self {
        Self {
            columns: columns.iter().filter_map(LiveColumn::from_row).collect(),
            unique_indexes: unique_indexes
                .iter()
                .filter_map(|row| Some((row.get_text("Column_name")?, row.get_text("Key_name")?)))
                .collect(),
            primary_columns: primary_keys
                .iter()
                .filter_map(|row| row.get_text("Column_name"))
                .collect(),
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn is_primary(&self, name: &str) -> bool {
        self.primary_columns.iter().any(|c| c == name)
    }

    /// Name of the unique index covering `column`, if any
    pub fn unique_index(&self, column: &str) -> Option<&str> {
        self.unique_indexes.iter().find(|(c, _)| c == column).map(|(_, index)| index.as_str())
    }
}

/// Strategy turning a model and its live table into `ALTER TABLE` statements
pub trait SchemaDiffer: Send + Sync {
    fn diff(&self, model: &dyn Model, live: &TableSnapshot) -> Vec<String>;
}

/// Restates every declared column with `MODIFY`, adds missing ones, diffs
/// unique indexes and drops columns the model no longer declares.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestatingDiffer;

impl SchemaDiffer for RestatingDiffer {
    fn diff(&self, model: &dyn Model, live: &TableSnapshot) -> Vec<String> {
        let table = quote(model.name());
        let columns = model.columns();
        let mut statements = Vec::new();
        let mut previous: Option<&str> = None;

        for column in &columns {
            let mut definition = column_definition_sql(column);
            if column.is_primary && !live.is_primary(&column.name) {
                definition.push_str(" PRIMARY KEY");
            }
            if let Some(previous) = previous {
                definition.push_str(&format!(" AFTER {}", quote(previous)));
            }

            if live.has_column(&column.name) {
                statements.push(format!("ALTER TABLE {} MODIFY {}", table, definition));
            } else {
                statements.push(format!("ALTER TABLE {} ADD COLUMN {}", table, definition));
            }

            match (live.unique_index(&column.name), column.is_unique) {
                (Some(index), false) => {
                    statements.push(format!("ALTER TABLE {} DROP INDEX {}", table, quote(index)));
                }
                (None, true) => {
                    statements
                        .push(format!("ALTER TABLE {} ADD UNIQUE ({})", table, quote(&column.name)));
                }
                _ => {}
            }

            previous = Some(column.name.as_str());
        }

        for live_column in &live.columns {
            if !columns.iter().any(|c| c.name == live_column.name) {
                log::warn!(
                    "Dropping column {}.{}: not declared by the model, its data is lost",
                    model.name(),
                    live_column.name
                );
                statements.push(format!(
                    "ALTER TABLE {} DROP COLUMN {}",
                    table,
                    quote(&live_column.name)
                ));
            }
        }

        statements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::data_type::DataType;
    use crate::orm::model::TableModel;

    fn users() -> TableModel {
        TableModel::new("test", "users")
            .with_column(
                ColumnDefinition::new("id", DataType::integer())
                    .auto_increment()
                    .primary()
                    .not_null()
                    .default_value(0),
            )
            .with_column(
                ColumnDefinition::new("email", DataType::VariableCharacter(65))
                    .unique()
                    .default_value(""),
            )
            .with_column(ColumnDefinition::new("bio", DataType::Text).default_value("ignored"))
    }

    fn live(names: &[&str]) -> TableSnapshot {
        TableSnapshot {
            columns: names
                .iter()
                .map(|n| LiveColumn {
                    name: n.to_string(),
                    column_type: String::new(),
                    nullable: true,
                    default: None,
                    extra: String::new(),
                })
                .collect(),
            ..TableSnapshot::default()
        }
    }

    #[test]
    fn test_column_fragment_order() {
        let columns = users().columns();
        assert_eq!(column_definition_sql(&columns[0]), "`id` int(11) NOT NULL AUTO_INCREMENT");
        assert_eq!(column_definition_sql(&columns[1]), "`email` varchar(65) NULL DEFAULT \"\"");
        assert_eq!(column_definition_sql(&columns[2]), "`bio` text NULL");
    }

    #[test]
    fn test_null_and_numeric_defaults() {
        let nullable = ColumnDefinition::new("deleted_at", DataType::integer());
        assert_eq!(column_definition_sql(&nullable), "`deleted_at` int(11) NULL DEFAULT NULL");
        let score = ColumnDefinition::new("score", DataType::float_value()).default_value(1.5);
        assert_eq!(column_definition_sql(&score), "`score` float(11) NULL DEFAULT 1.5");
    }

    #[test]
    fn test_create_table() {
        assert_eq!(
            create_table_sql(&users()),
            "CREATE TABLE `users`(`id` int(11) NOT NULL AUTO_INCREMENT, \
             `email` varchar(65) NULL DEFAULT \"\", `bio` text NULL, \
             PRIMARY KEY(`id`), UNIQUE (`email`))"
        );
    }

    #[test]
    fn test_diff_adds_missing_and_drops_undeclared() {
        let snapshot = live(&["id", "legacy"]);
        let statements = RestatingDiffer.diff(&users(), &snapshot);
        assert_eq!(
            statements,
            vec![
                "ALTER TABLE `users` MODIFY `id` int(11) NOT NULL AUTO_INCREMENT PRIMARY KEY",
                "ALTER TABLE `users` ADD COLUMN `email` varchar(65) NULL DEFAULT \"\" AFTER `id`",
                "ALTER TABLE `users` ADD UNIQUE (`email`)",
                "ALTER TABLE `users` ADD COLUMN `bio` text NULL AFTER `email`",
                "ALTER TABLE `users` DROP COLUMN `legacy`",
            ]
        );
    }

    #[test]
    fn test_diff_of_converged_table_only_modifies() {
        let mut snapshot = live(&["id", "email", "bio"]);
        snapshot.primary_columns.push("id".to_string());
        snapshot.unique_indexes.push(("email".to_string(), "email".to_string()));

        let statements = RestatingDiffer.diff(&users(), &snapshot);
        assert_eq!(statements.len(), 3);
        assert!(statements.iter().all(|s| s.starts_with("ALTER TABLE `users` MODIFY ")));
        assert!(!statements[0].contains("PRIMARY KEY"));
    }

    #[test]
    fn test_diff_drops_stale_unique_index() {
        let model = TableModel::new("test", "tags")
            .with_column(ColumnDefinition::new("label", DataType::VariableCharacter(20)));
        let mut snapshot = live(&["label"]);
        snapshot.unique_indexes.push(("label".to_string(), "label_2".to_string()));

        let statements = RestatingDiffer.diff(&model, &snapshot);
        assert_eq!(statements[1], "ALTER TABLE `tags` DROP INDEX `label_2`");
    }

    #[test]
    fn test_snapshot_from_rows() {
        let columns = vec![Row::new().with("Field", "id").with("Type", "int(11)").with("Null", "NO")];
        let uniques = vec![Row::new().with("Column_name", "email").with("Key_name", "email")];
        let keys = vec![Row::new().with("Column_name", "id").with("Key_name", "PRIMARY")];
        let snapshot = TableSnapshot::from_rows(&columns, &uniques, &keys);

        assert!(snapshot.has_column("id"));
        assert!(!snapshot.columns[0].nullable);
        assert!(snapshot.is_primary("id"));
        assert_eq!(snapshot.unique_index("email"), Some("email"));
    }
}
