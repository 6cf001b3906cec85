//! MySQL column data types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire type of a bound parameter, one flag character per placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindType {
    Integer,
    Double,
    String,
    Blob,
}

impl BindType {
    pub fn as_char(self) -> char {
        match self {
            BindType::Integer => 'i',
            BindType::Double => 'd',
            BindType::String => 's',
            BindType::Blob => 'b',
        }
    }

    pub fn from_char(flag: char) -> Option<Self> {
        match flag {
            'i' => Some(BindType::Integer),
            'd' => Some(BindType::Double),
            's' => Some(BindType::String),
            'b' => Some(BindType::Blob),
            _ => None,
        }
    }
}

/// Column data type with its display width, where the type carries one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Integer(u32),
    BigInteger(u32),
    TinyInteger(u32),
    FloatValue(u32),
    VariableCharacter(u32),
    Text,
    MediumText,
    Blob,
}

impl DataType {
    /// `int(11)`
    pub fn integer() -> Self {
        DataType::Integer(11)
    }

    /// `bigint(16)`
    pub fn big_integer() -> Self {
        DataType::BigInteger(16)
    }

    /// `tinyint(1)`
    pub fn tiny_integer() -> Self {
        DataType::TinyInteger(1)
    }

    /// `float(11)`
    pub fn float_value() -> Self {
        DataType::FloatValue(11)
    }

    /// `varchar(255)`
    pub fn variable_character() -> Self {
        DataType::VariableCharacter(255)
    }

    /// Native schema type name
    pub fn type_name(&self) -> &'static str {
        match self {
            DataType::Integer(_) => "int",
            DataType::BigInteger(_) => "bigint",
            DataType::TinyInteger(_) => "tinyint",
            DataType::FloatValue(_) => "float",
            DataType::VariableCharacter(_) => "varchar",
            DataType::Text => "text",
            DataType::MediumText => "mediumtext",
            DataType::Blob => "blob",
        }
    }

    pub fn bind_type(&self) -> BindType {
        match self {
            DataType::Integer(_) | DataType::BigInteger(_) | DataType::TinyInteger(_) => {
                BindType::Integer
            }
            DataType::FloatValue(_) => BindType::Double,
            DataType::VariableCharacter(_) | DataType::Text | DataType::MediumText => {
                BindType::String
            }
            DataType::Blob => BindType::Blob,
        }
    }

    pub fn width(&self) -> Option<u32> {
        match self {
            DataType::Integer(w)
            | DataType::BigInteger(w)
            | DataType::TinyInteger(w)
            | DataType::FloatValue(w)
            | DataType::VariableCharacter(w) => Some(*w),
            DataType::Text | DataType::MediumText | DataType::Blob => None,
        }
    }

    /// Text, medium text and blob columns cannot carry a `DEFAULT` clause
    pub fn allows_default(&self) -> bool {
        !matches!(self, DataType::Text | DataType::MediumText | DataType::Blob)
    }

    /// Type fragment used in column DDL, e.g. `varchar(65)` or `text`
    pub fn sql(&self) -> String {
        match self.width() {
            Some(width) => format!("{}({})", self.type_name(), width),
            None => self.type_name().to_string(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_widths() {
        assert_eq!(DataType::integer().sql(), "int(11)");
        assert_eq!(DataType::big_integer().sql(), "bigint(16)");
        assert_eq!(DataType::tiny_integer().sql(), "tinyint(1)");
        assert_eq!(DataType::float_value().sql(), "float(11)");
        assert_eq!(DataType::variable_character().sql(), "varchar(255)");
        assert_eq!(DataType::MediumText.sql(), "mediumtext");
    }

    #[test]
    fn test_bind_flags() {
        let flags: String = [
            DataType::integer(),
            DataType::float_value(),
            DataType::VariableCharacter(65),
            DataType::Blob,
        ]
        .iter()
        .map(|t| t.bind_type().as_char())
        .collect();
        assert_eq!(flags, "idsb");
    }

    #[test]
    fn test_no_default_types() {
        assert!(!DataType::Text.allows_default());
        assert!(!DataType::MediumText.allows_default());
        assert!(!DataType::Blob.allows_default());
        assert!(DataType::VariableCharacter(10).allows_default());
    }
}
