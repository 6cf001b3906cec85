//! Column definitions

use serde::{Deserialize, Serialize};

use super::data_type::DataType;
use super::value::SqlValue;

/// One declared column of a model.
///
/// The position of a definition in [`Model::columns`](super::Model::columns)
/// is its position in the generated DDL.
///
/// # Example
///
/// ```rust,ignore
/// let id = ColumnDefinition::new("id", DataType::integer())
///     .auto_increment()
///     .primary()
///     .not_null()
///     .default_value(0);
/// let created = ColumnDefinition::new("creation_timestamp", DataType::integer())
///     .property("creationTimestamp");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    /// Name of the instance property bound to this column
    pub property_name: String,
    pub data_type: DataType,
    pub default_value: SqlValue,
    pub auto_increment: bool,
    pub is_primary: bool,
    pub is_unique: bool,
    pub is_nullable: bool,
}

impl ColumnDefinition {
    /// Nullable column with a `NULL` default, bound to the property of the same name
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let name = name.into();
        Self {
            property_name: name.clone(),
            name,
            data_type,
            default_value: SqlValue::Null,
            auto_increment: false,
            is_primary: false,
            is_unique: false,
            is_nullable: true,
        }
    }

    pub fn property(mut self, property_name: impl Into<String>) -> Self {
        self.property_name = property_name.into();
        self
    }

    pub fn default_value(mut self, value: impl Into<SqlValue>) -> Self {
        self.default_value = value.into();
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }
}
