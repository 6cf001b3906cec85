//! Dynamically typed SQL scalars

use serde::{Deserialize, Serialize};
use std::fmt;

use super::data_type::BindType;
use super::{OrmError, OrmResult};

/// Whether `v` is a whole number that fits an `i64` exactly
fn whole_i64(v: f64) -> Option<i64> {
    // 2^63 is exactly representable; every f64 below it converts without saturating
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (v.fract() == 0.0 && v >= -LIMIT && v < LIMIT).then_some(v as i64)
}

/// A single SQL value: column defaults, bound parameters and row cells
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Bind flag inferred from the value itself, used when no column type is known
    pub fn bind_type(&self) -> BindType {
        match self {
            SqlValue::Int(_) => BindType::Integer,
            SqlValue::Float(_) => BindType::Double,
            SqlValue::Blob(_) => BindType::Blob,
            SqlValue::Null | SqlValue::Text(_) => BindType::String,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(v) => Some(*v),
            SqlValue::Float(v) => whole_i64(*v),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Int(v) => Some(*v as f64),
            SqlValue::Float(v) => Some(*v),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Integer form for an `i` placeholder; `Ok(None)` binds NULL
    pub fn bind_i64(&self) -> OrmResult<Option<i64>> {
        if self.is_null() {
            return Ok(None);
        }
        self.as_i64().map(Some).ok_or_else(|| self.unbindable(BindType::Integer))
    }

    /// Double form for a `d` placeholder; `Ok(None)` binds NULL
    pub fn bind_f64(&self) -> OrmResult<Option<f64>> {
        if self.is_null() {
            return Ok(None);
        }
        self.as_f64().map(Some).ok_or_else(|| self.unbindable(BindType::Double))
    }

    /// Fails when the value has no representation under `bind_type`.
    /// Text and blob placeholders accept every value.
    pub fn check_bindable(&self, bind_type: BindType) -> OrmResult<()> {
        match bind_type {
            BindType::Integer => self.bind_i64().map(drop),
            BindType::Double => self.bind_f64().map(drop),
            BindType::String | BindType::Blob => Ok(()),
        }
    }

    fn unbindable(&self, bind_type: BindType) -> OrmError {
        OrmError::UnbindableValue { flag: bind_type.as_char(), value: self.to_string() }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Renders the value as an inline SQL literal.
    ///
    /// Text and blobs are double-quoted after passing through `escape`;
    /// numbers are emitted bare and `Null` becomes `NULL`. NaN and the
    /// infinities have no SQL spelling and are rejected.
    pub fn to_sql_literal(&self, escape: impl Fn(&str) -> String) -> OrmResult<String> {
        Ok(match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Int(v) => v.to_string(),
            SqlValue::Float(v) if !v.is_finite() => return Err(OrmError::NonFiniteFloat(*v)),
            SqlValue::Float(v) => v.to_string(),
            SqlValue::Text(s) => format!("\"{}\"", escape(s)),
            SqlValue::Blob(bytes) => format!("\"{}\"", escape(&String::from_utf8_lossy(bytes))),
        })
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Int(v) => write!(f, "{}", v),
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Text(s) => write!(f, "{}", s),
            SqlValue::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(value: $ty) -> Self {
                    SqlValue::Int(i64::from(value))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

/// Values above `i64::MAX` travel as decimal text, the way the driver
/// hands back unsigned BIGINT cells that overflow.
impl From<u64> for SqlValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map(SqlValue::Int).unwrap_or_else(|_| SqlValue::Text(value.to_string()))
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Int(i64::from(value))
    }
}

impl From<f32> for SqlValue {
    fn from(value: f32) -> Self {
        SqlValue::Float(f64::from(value))
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&String> for SqlValue {
    fn from(value: &String) -> Self {
        SqlValue::Text(value.clone())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        SqlValue::Blob(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Conversion from a row cell back into a property type
pub trait FromSqlValue: Sized {
    /// Returns `None` when the value cannot represent `Self`
    fn from_sql_value(value: &SqlValue) -> Option<Self>;
}

macro_rules! impl_from_sql_int {
    ($($ty:ty),*) => {
        $(
            impl FromSqlValue for $ty {
                fn from_sql_value(value: &SqlValue) -> Option<Self> {
                    value.as_i64().and_then(|v| <$ty>::try_from(v).ok())
                }
            }
        )*
    };
}

impl_from_sql_int!(i8, i16, i32, i64, u8, u16, u32);

impl FromSqlValue for u64 {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Text(s) => s.trim().parse().ok(),
            other => other.as_i64().and_then(|v| u64::try_from(v).ok()),
        }
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        value.as_i64().map(|v| v != 0)
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        value.as_f64()
    }
}

impl FromSqlValue for f32 {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        value.as_f64().map(|v| v as f32)
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Int(v) => Some(v.to_string()),
            SqlValue::Float(v) => Some(v.to_string()),
            SqlValue::Blob(bytes) => String::from_utf8(bytes.clone()).ok(),
            SqlValue::Null => None,
        }
    }
}

impl FromSqlValue for Vec<u8> {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Blob(bytes) => Some(bytes.clone()),
            SqlValue::Text(s) => Some(s.as_bytes().to_vec()),
            _ => None,
        }
    }
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Null => Some(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}
