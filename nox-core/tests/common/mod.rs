//! In-memory stand-in for a MySQL server, good enough for the statements
//! Abyss emits: `SHOW` introspection, `CREATE TABLE`, upserts, simple
//! selects with `=`/`>`/`<` filters and paging, and deletes by key.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use nox_core::orm::{
    BoundStatement, Connection, Connector, DatabaseCredentials, OrmResult, QueryResult, Row,
    SqlValue,
};

#[derive(Debug, Default)]
pub struct MemoryTable {
    pub columns: Vec<String>,
    pub primary: Option<String>,
    pub uniques: Vec<String>,
    pub rows: Vec<Row>,
    next_id: i64,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: BTreeMap<String, MemoryTable>,
    statements: Vec<String>,
}

/// Shared handle on the fake server; every connection sees the same tables
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statements(&self) -> Vec<String> {
        self.state.lock().unwrap().statements.clone()
    }

    pub fn clear_statements(&self) {
        self.state.lock().unwrap().statements.clear();
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.state.lock().unwrap().tables.contains_key(name)
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.state.lock().unwrap().tables.get(table).map_or(0, |t| t.rows.len())
    }
}

impl Connector for MemoryDatabase {
    fn connect(&self, _credentials: &DatabaseCredentials) -> OrmResult<Box<dyn Connection>> {
        Ok(Box::new(MemoryConnection { state: self.state.clone() }))
    }
}

struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
}

impl Connection for MemoryConnection {
    fn execute(&mut self, sql: &str) -> OrmResult<QueryResult> {
        let mut state = self.state.lock().unwrap();
        state.statements.push(sql.to_string());

        if let Some(rest) = sql.strip_prefix("SHOW TABLES LIKE ") {
            let name = rest.trim_matches('"');
            let rows = if state.tables.contains_key(name) {
                vec![Row::new().with("Tables_in_test", name)]
            } else {
                Vec::new()
            };
            return Ok(QueryResult::with_rows(rows));
        }
        if let Some(rest) = sql.strip_prefix("SHOW COLUMNS FROM ") {
            let table = &state.tables[first_identifier(rest)];
            let rows = table
                .columns
                .iter()
                .map(|c| Row::new().with("Field", c.as_str()).with("Null", "YES"))
                .collect();
            return Ok(QueryResult::with_rows(rows));
        }
        if let Some(rest) = sql.strip_prefix("SHOW INDEXES FROM ") {
            let table = &state.tables[first_identifier(rest)];
            let rows = table
                .uniques
                .iter()
                .map(|c| Row::new().with("Column_name", c.as_str()).with("Key_name", c.as_str()))
                .collect();
            return Ok(QueryResult::with_rows(rows));
        }
        if let Some(rest) = sql.strip_prefix("SHOW KEYS FROM ") {
            let table = &state.tables[first_identifier(rest)];
            let rows = table
                .primary
                .iter()
                .map(|c| Row::new().with("Column_name", c.as_str()).with("Key_name", "PRIMARY"))
                .collect();
            return Ok(QueryResult::with_rows(rows));
        }
        if let Some(rest) = sql.strip_prefix("CREATE TABLE ") {
            let name = first_identifier(rest).to_string();
            state.tables.insert(name, parse_create_table(rest));
        }
        if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            let columns = identifiers(list_after(rest, '('));
            let values_start = rest.find(" VALUES ").unwrap_or(0);
            let values = parse_literals(list_after(&rest[values_start..], '('));
            let table = state.tables.entry(first_identifier(rest).to_string()).or_default();
            return Ok(upsert(table, &columns, &values));
        }
        Ok(QueryResult::default())
    }

    fn execute_bound(&mut self, statement: &BoundStatement) -> OrmResult<QueryResult> {
        let mut state = self.state.lock().unwrap();
        let sql = statement.sql.clone();
        state.statements.push(sql.clone());

        if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            let table = state.tables.entry(first_identifier(rest).to_string()).or_default();
            return Ok(upsert(table, &identifiers(list_after(rest, '(')), &statement.values));
        }
        if let Some(rest) = sql.strip_prefix("SELECT * FROM ") {
            let table = &state.tables[first_identifier(rest)];
            return Ok(QueryResult::with_rows(select(table, &sql, &statement.values)));
        }
        if let Some(rest) = sql.strip_prefix("DELETE FROM ") {
            let table = state.tables.entry(first_identifier(rest).to_string()).or_default();
            let before = table.rows.len();
            let conditions = conditions(&sql);
            table.rows.retain(|row| !matches(row, &conditions, &statement.values));
            return Ok(QueryResult::with_affected((before - table.rows.len()) as u64, 0));
        }
        Ok(QueryResult::default())
    }
}

fn first_identifier(text: &str) -> &str {
    text.split('`').nth(1).unwrap_or_default()
}

fn identifiers(text: &str) -> Vec<String> {
    text.split('`').skip(1).step_by(2).map(str::to_string).collect()
}

/// Text between the first `open` bracket and its matching `)`
fn list_after(text: &str, open: char) -> &str {
    let start = text.find(open).map_or(0, |i| i + 1);
    let mut depth = 0;
    for (offset, c) in text[start..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return &text[start..start + offset],
            ')' => depth -= 1,
            _ => {}
        }
    }
    &text[start..]
}

/// Values of an inlined `VALUES (...)` list as rendered by `to_sql_literal`
fn parse_literals(list: &str) -> Vec<SqlValue> {
    let mut values = Vec::new();
    let mut chars = list.chars().peekable();
    loop {
        while chars.next_if(|c| *c == ',' || c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else { break };
        if first == '"' {
            chars.next();
            let mut text = String::new();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => text.extend(chars.next()),
                    '"' => break,
                    other => text.push(other),
                }
            }
            values.push(SqlValue::Text(text));
        } else {
            let mut word = String::new();
            while let Some(c) = chars.next_if(|c| *c != ',') {
                word.push(c);
            }
            let word = word.trim();
            values.push(if word == "NULL" {
                SqlValue::Null
            } else if let Ok(int) = word.parse::<i64>() {
                SqlValue::Int(int)
            } else {
                word.parse::<f64>().map_or(SqlValue::Null, SqlValue::Float)
            });
        }
    }
    values
}

fn parse_create_table(rest: &str) -> MemoryTable {
    let mut table = MemoryTable::default();
    for part in list_after(rest, '(').split(", ") {
        if let Some(keys) = part.strip_prefix("PRIMARY KEY") {
            table.primary = identifiers(keys).into_iter().next();
        } else if let Some(keys) = part.strip_prefix("UNIQUE") {
            table.uniques.extend(identifiers(keys));
        } else if part.starts_with('`') {
            table.columns.push(first_identifier(part).to_string());
        }
    }
    table
}

fn upsert(table: &mut MemoryTable, columns: &[String], values: &[SqlValue]) -> QueryResult {
    let primary = table.primary.clone().unwrap_or_else(|| "id".to_string());
    let row_with_key = |key: i64| -> Row {
        columns
            .iter()
            .cloned()
            .zip(values.iter().cloned())
            .map(|(column, value)| if column == primary { (column, SqlValue::Int(key)) } else { (column, value) })
            .collect()
    };
    let key = columns
        .iter()
        .position(|c| *c == primary)
        .and_then(|i| values.get(i))
        .and_then(SqlValue::as_i64)
        .unwrap_or(0);

    if key != 0 {
        let row = row_with_key(key);
        if let Some(existing) = table
            .rows
            .iter_mut()
            .find(|r| r.get(&primary).and_then(SqlValue::as_i64) == Some(key))
        {
            *existing = row;
            return QueryResult::with_affected(2, key as u64);
        }
        table.next_id = table.next_id.max(key);
        table.rows.push(row);
        return QueryResult::with_affected(1, key as u64);
    }

    table.next_id += 1;
    let id = table.next_id;
    table.rows.push(row_with_key(id));
    QueryResult::with_affected(1, id as u64)
}

/// `(column, operator)` per bound condition; only `AND` chains are understood
fn conditions(sql: &str) -> Vec<(String, String)> {
    let Some(filter) = sql.split("WHERE ").nth(1) else { return Vec::new() };
    let filter = filter.lines().next().unwrap_or_default();
    filter
        .split(" AND ")
        .filter_map(|condition| {
            let mut parts = condition.split_whitespace();
            let column = parts.next()?.trim_matches('`').to_string();
            let operator = parts.next()?.to_string();
            Some((column, operator))
        })
        .collect()
}

fn matches(row: &Row, conditions: &[(String, String)], values: &[SqlValue]) -> bool {
    conditions.iter().zip(values).all(|((column, operator), expected)| {
        let actual = row.get(column).cloned().unwrap_or(SqlValue::Null);
        match (actual.as_i64(), expected.as_i64()) {
            (Some(a), Some(b)) => match operator.as_str() {
                ">" => a > b,
                "<" => a < b,
                _ => a == b,
            },
            _ => operator == "=" && actual.as_str() == expected.as_str(),
        }
    })
}

fn select(table: &MemoryTable, sql: &str, values: &[SqlValue]) -> Vec<Row> {
    let conditions = conditions(sql);
    let rows = table.rows.iter().filter(|row| matches(row, &conditions, values)).cloned();

    let mut limit = usize::MAX;
    let mut offset = 0;
    if let Some(window) = sql.lines().find(|line| line.starts_with("LIMIT ")) {
        let numbers: Vec<usize> =
            window.split_whitespace().filter_map(|word| word.parse().ok()).collect();
        limit = numbers.first().copied().unwrap_or(usize::MAX);
        offset = numbers.get(1).copied().unwrap_or(0);
    }
    rows.skip(offset).take(limit).collect()
}
