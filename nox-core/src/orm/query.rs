//! Query builder: `ColumnQuery`, `ResultOrder` and `Pager`
//!
//! A [`ColumnQuery`] is an ordered list of clause nodes compiled by
//! [`build_where_clause`] into a `WHERE` fragment, its bind flags and the
//! bound values.
//!
//! Some positions cannot be parameterized: the right-hand side of `is`,
//! `is not`, `in` and `not in`, raw clauses, function-call columns and
//! function orderings. Those only accept [`TrustedSql`], numbers or `NULL`,
//! so caller-supplied text can never reach them by accident.

use std::fmt;

use super::model::Model;
use super::value::SqlValue;
use super::{OrmError, OrmResult};

/// A caller-vetted SQL fragment, emitted verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedSql(String);

impl TrustedSql {
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrustedSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Right-hand side of a where clause
#[derive(Debug, Clone, PartialEq)]
pub enum ClauseValue {
    Bound(SqlValue),
    Trusted(TrustedSql),
}

impl From<TrustedSql> for ClauseValue {
    fn from(value: TrustedSql) -> Self {
        ClauseValue::Trusted(value)
    }
}

impl From<SqlValue> for ClauseValue {
    fn from(value: SqlValue) -> Self {
        ClauseValue::Bound(value)
    }
}

macro_rules! impl_bound_clause_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ClauseValue {
                fn from(value: $ty) -> Self {
                    ClauseValue::Bound(SqlValue::from(value))
                }
            }
        )*
    };
}

impl_bound_clause_value!(i8, i16, i32, i64, u8, u16, u32, bool, f32, f64, &str, String, Vec<u8>);

/// Column operand of a where clause
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnRef {
    /// Plain column, backtick-quoted on output
    Name(String),
    /// Function-call expression such as `coalesce(a, b)`, emitted verbatim
    Function(TrustedSql),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Join {
    And,
    Or,
}

/// One node of a [`ColumnQuery`]
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    GroupStart,
    GroupEnd,
    Join(Join),
    Where { column: ColumnRef, operator: String, value: ClauseValue, raw: bool },
}

/// Operators whose right-hand side is inlined rather than bound
const UNPARAMETERIZED_OPERATORS: &[&str] = &["is", "is not", "in", "not in"];

/// Column prefixes marking a function call rather than a column name
const FUNCTION_PREFIXES: &[&str] = &["coalesce(", "concat("];

const BOUND_OPERATORS: &[&str] = &[
    "=", "!=", "<>", "<", ">", "<=", ">=", "<=>", "like", "not like", "regexp", "not regexp",
    "rlike",
];

/// Fluent predicate builder
///
/// ```rust,ignore
/// let query = ColumnQuery::new()
///     .where_("age", ">", 18)
///     .and()
///     .start_group()
///     .where_("status", "=", "active")
///     .or()
///     .where_("deleted_at", "is", SqlValue::Null)
///     .end_group();
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnQuery {
    clauses: Vec<Clause>,
}

impl ColumnQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a parenthesized condition group
    pub fn start_group(mut self) -> Self {
        self.clauses.push(Clause::GroupStart);
        self
    }

    pub fn end_group(mut self) -> Self {
        self.clauses.push(Clause::GroupEnd);
        self
    }

    pub fn and(mut self) -> Self {
        self.clauses.push(Clause::Join(Join::And));
        self
    }

    pub fn or(mut self) -> Self {
        self.clauses.push(Clause::Join(Join::Or));
        self
    }

    pub fn where_(
        mut self,
        column: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<ClauseValue>,
    ) -> Self {
        self.clauses.push(Clause::Where {
            column: ColumnRef::Name(column.into()),
            operator: operator.into(),
            value: value.into(),
            raw: false,
        });
        self
    }

    /// Where clause on a function-call column such as `concat(first, last)`
    pub fn where_function(
        mut self,
        expression: TrustedSql,
        operator: impl Into<String>,
        value: impl Into<ClauseValue>,
    ) -> Self {
        self.clauses.push(Clause::Where {
            column: ColumnRef::Function(expression),
            operator: operator.into(),
            value: value.into(),
            raw: false,
        });
        self
    }

    /// Where clause whose right-hand side is inlined verbatim, never bound
    pub fn where_raw(
        mut self,
        column: impl Into<String>,
        operator: impl Into<String>,
        value: TrustedSql,
    ) -> Self {
        self.clauses.push(Clause::Where {
            column: ColumnRef::Name(column.into()),
            operator: operator.into(),
            value: ClauseValue::Trusted(value),
            raw: true,
        });
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Rejects clause sequences that would compile to invalid SQL: unbalanced
    /// or empty groups, joins that do not sit between two conditions, and
    /// conditions that follow each other without a join.
    pub fn validate(&self) -> OrmResult<()> {
        let mut depth = 0usize;
        let mut expecting_condition = true;

        for (position, clause) in self.clauses.iter().enumerate() {
            let malformed = |reason: &str| {
                Err(OrmError::MalformedQuery(format!("{} at clause {}", reason, position)))
            };
            match clause {
                Clause::GroupStart => {
                    if !expecting_condition {
                        return malformed("group opened without a join");
                    }
                    depth += 1;
                }
                Clause::GroupEnd => {
                    if expecting_condition {
                        return malformed("group closed after a join or left empty");
                    }
                    if depth == 0 {
                        return malformed("group closed without being opened");
                    }
                    depth -= 1;
                }
                Clause::Join(_) => {
                    if expecting_condition {
                        return malformed("join without a preceding condition");
                    }
                    expecting_condition = true;
                }
                Clause::Where { .. } => {
                    if !expecting_condition {
                        return malformed("condition without a join");
                    }
                    expecting_condition = false;
                }
            }
        }

        if depth != 0 {
            return Err(OrmError::MalformedQuery(format!("{} unclosed group(s)", depth)));
        }
        if expecting_condition && !self.clauses.is_empty() {
            return Err(OrmError::MalformedQuery("query ends with a join".to_string()));
        }
        Ok(())
    }
}

/// Compiled `WHERE` fragment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    pub sql: String,
    /// One flag per placeholder, in emission order
    pub type_flags: String,
    pub values: Vec<SqlValue>,
}

fn is_function_call(name: &str) -> bool {
    let lower = name.trim_start().to_lowercase();
    FUNCTION_PREFIXES.iter().any(|prefix| lower.starts_with(prefix))
}

fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Inline form of an unparameterized right-hand side
fn literal_value(column: &str, operator: &str, value: &ClauseValue) -> OrmResult<String> {
    match value {
        ClauseValue::Trusted(sql) => Ok(sql.as_str().to_string()),
        ClauseValue::Bound(SqlValue::Null) => Ok("NULL".to_string()),
        ClauseValue::Bound(SqlValue::Int(v)) => Ok(v.to_string()),
        ClauseValue::Bound(SqlValue::Float(v)) => Ok(v.to_string()),
        ClauseValue::Bound(_) => Err(OrmError::UntrustedLiteral {
            column: column.to_string(),
            operator: operator.to_string(),
        }),
    }
}

/// Compiles a [`ColumnQuery`] against `model`.
///
/// Bind flags come from the declared data type of each column; function
/// columns bind as strings and undeclared columns fall back to the flag of
/// the value itself. An empty query compiles to an empty fragment.
pub fn build_where_clause(model: &dyn Model, query: &ColumnQuery) -> OrmResult<WhereClause> {
    query.validate()?;

    let mut compiled = WhereClause::default();
    if query.is_empty() {
        return Ok(compiled);
    }

    let columns = model.columns();
    compiled.sql.push_str("WHERE ");

    for clause in query.clauses() {
        match clause {
            Clause::GroupStart => compiled.sql.push('('),
            Clause::GroupEnd => compiled.sql.push(')'),
            Clause::Join(Join::And) => compiled.sql.push_str(" AND "),
            Clause::Join(Join::Or) => compiled.sql.push_str(" OR "),
            Clause::Where { column, operator, value, raw } => {
                let operator = operator.trim().to_lowercase();
                let (column_sql, column_label) = match column {
                    ColumnRef::Name(name) if is_function_call(name) => {
                        return Err(OrmError::MalformedQuery(format!(
                            "function column {} needs where_function with TrustedSql",
                            name
                        )));
                    }
                    ColumnRef::Name(name) => (quote_identifier(name), name.as_str()),
                    ColumnRef::Function(expression) => {
                        (expression.as_str().to_string(), expression.as_str())
                    }
                };

                if *raw || UNPARAMETERIZED_OPERATORS.contains(&operator.as_str()) {
                    let rhs = literal_value(column_label, &operator, value)?;
                    compiled.sql.push_str(&format!("{} {} {}", column_sql, operator, rhs));
                    continue;
                }

                if !BOUND_OPERATORS.contains(&operator.as_str()) {
                    return Err(OrmError::MalformedQuery(format!(
                        "unsupported operator '{}' on column {}",
                        operator, column_label
                    )));
                }

                let bound = match value {
                    ClauseValue::Bound(bound) => bound.clone(),
                    ClauseValue::Trusted(sql) => SqlValue::Text(sql.as_str().to_string()),
                };

                let flag = match column {
                    ColumnRef::Function(_) => 's',
                    ColumnRef::Name(name) => match columns.iter().find(|c| &c.name == name) {
                        Some(definition) => definition.data_type.bind_type().as_char(),
                        None => {
                            log::warn!(
                                "Column {} is not declared on model {}; binding by value type",
                                name,
                                model.name()
                            );
                            bound.bind_type().as_char()
                        }
                    },
                };

                compiled.type_flags.push(flag);
                compiled.values.push(bound);
                compiled.sql.push_str(&format!("{} {} ?", column_sql, operator));
            }
        }
    }

    Ok(compiled)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Ordered `ORDER BY` entries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultOrder {
    entries: Vec<String>,
}

impl ResultOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by(mut self, column: impl AsRef<str>, direction: SortDirection) -> Self {
        self.entries.push(format!("{} {}", quote_identifier(column.as_ref()), direction.as_str()));
        self
    }

    /// Orders by a function call such as `RAND()`
    pub fn by_function(mut self, function: TrustedSql) -> Self {
        self.entries.push(function.as_str().to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `ORDER BY a, b`, or an empty string when there are no entries
    pub fn to_sql(&self) -> String {
        if self.entries.is_empty() {
            String::new()
        } else {
            format!("ORDER BY {}", self.entries.join(", "))
        }
    }
}

/// Page window over a result set, pages are 1-indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    limit: u64,
    page_number: u64,
}

impl Pager {
    pub fn new(limit: i64, page_number: i64) -> OrmResult<Self> {
        if limit <= 0 {
            return Err(OrmError::InvalidPager(format!("limit must be positive, got {}", limit)));
        }
        if page_number < 1 {
            return Err(OrmError::InvalidPager(format!(
                "page number must be at least 1, got {}",
                page_number
            )));
        }
        Ok(Self { limit: limit as u64, page_number: page_number as u64 })
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn page_number(&self) -> u64 {
        self.page_number
    }

    pub fn offset(&self) -> u64 {
        (self.page_number - 1).saturating_mul(self.limit)
    }

    pub fn to_sql(&self) -> String {
        format!("LIMIT {} OFFSET {}", self.limit, self.offset())
    }
}
