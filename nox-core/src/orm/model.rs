//! Model contracts and instance binding
//!
//! A [`Model`] describes a table: its name, its database and its ordered
//! columns. A [`ModelInstance`] is the typed row object bound to a model by
//! property name. Instances are usually produced by
//! `#[derive(ModelInstance)]`, which generates the property accessors.

use super::abyss::Abyss;
use super::column::ColumnDefinition;
use super::connection::Row;
use super::value::SqlValue;
use super::{OrmError, OrmResult};

/// Declarative description of a table
pub trait Model: Send + Sync {
    /// Ordered column definitions
    fn columns(&self) -> Vec<ColumnDefinition>;

    /// Table name
    fn name(&self) -> &str;

    /// Logical database (schema) name
    fn database_name(&self) -> &str;

    /// Name of the instance type bound to this model
    fn instance_name(&self) -> &str;

    fn column(&self, name: &str) -> Option<ColumnDefinition> {
        self.columns().into_iter().find(|c| c.name == name)
    }

    /// The primary column, if any. At most one column may be primary.
    fn primary_key(&self) -> Option<ColumnDefinition> {
        self.columns().into_iter().find(|c| c.is_primary)
    }

    /// First column flagged unique, if any
    fn unique_key(&self) -> Option<ColumnDefinition> {
        self.columns().into_iter().find(|c| c.is_unique)
    }

    /// Column name bound to an instance property
    fn column_name(&self, property: &str) -> OrmResult<String> {
        self.columns()
            .into_iter()
            .find(|c| c.property_name == property)
            .map(|c| c.name)
            .ok_or_else(|| OrmError::NoColumnWithPropertyName {
                model: self.name().to_string(),
                property: property.to_string(),
            })
    }
}

/// Rejects a model declaring more than one primary column
pub fn check_primary_key(model: &dyn Model) -> OrmResult<()> {
    let primary: Vec<String> =
        model.columns().into_iter().filter(|c| c.is_primary).map(|c| c.name).collect();
    if primary.len() > 1 {
        return Err(OrmError::MultiplePrimaryKeys {
            table: model.name().to_string(),
            columns: primary.join(", "),
        });
    }
    Ok(())
}

/// Data-driven [`Model`] for tables declared at runtime
#[derive(Debug, Clone, Default)]
pub struct TableModel {
    database: String,
    table: String,
    instance: String,
    columns: Vec<ColumnDefinition>,
}

impl TableModel {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        let table = table.into();
        Self { database: database.into(), instance: table.clone(), table, columns: Vec::new() }
    }

    pub fn with_instance_name(mut self, instance: impl Into<String>) -> Self {
        self.instance = instance.into();
        self
    }

    pub fn with_column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }
}

impl Model for TableModel {
    fn columns(&self) -> Vec<ColumnDefinition> {
        self.columns.clone()
    }

    fn name(&self) -> &str {
        &self.table
    }

    fn database_name(&self) -> &str {
        &self.database
    }

    fn instance_name(&self) -> &str {
        &self.instance
    }
}

/// A typed row object bound to a [`Model`] by property name
pub trait ModelInstance: Default + Send {
    type Model: Model + Default;

    fn model() -> Self::Model {
        Self::Model::default()
    }

    /// Every property the type exposes to the ORM
    fn property_names() -> &'static [&'static str];

    fn get_property(&self, name: &str) -> Option<SqlValue>;

    fn set_property(&mut self, name: &str, value: SqlValue) -> OrmResult<()>;

    /// Fresh instance with every bound property set to its column default
    fn new_with_defaults() -> OrmResult<Self> {
        let mut instance = Self::default();
        prefill_with_column_defaults(&Self::model(), &mut instance)?;
        Ok(instance)
    }

    /// Upserts the instance and, on insert, writes the generated key back
    /// into the primary property.
    fn save(&mut self, abyss: &Abyss<'_>) -> OrmResult<Option<i64>> {
        let inserted = abyss.save_or_create(self)?;
        if let Some(key) = inserted {
            if let Some(primary) = Self::model().primary_key() {
                self.set_property(&primary.property_name, SqlValue::Int(key))?;
            }
        }
        Ok(inserted)
    }

    fn delete(&self, abyss: &Abyss<'_>) -> OrmResult<()> {
        abyss.delete_row_by_primary_key(self)
    }
}

fn ensure_property<T: ModelInstance>(
    model: &dyn Model,
    column: &ColumnDefinition,
) -> OrmResult<()> {
    if T::property_names().contains(&column.property_name.as_str()) {
        Ok(())
    } else {
        Err(OrmError::ObjectMissingModelProperty {
            instance: model.instance_name().to_string(),
            column: column.name.clone(),
            property: column.property_name.clone(),
        })
    }
}

/// Builds an instance from column values.
///
/// Every declared column must map to a property of `T`; columns absent from
/// `values` fall back to their declared default.
pub fn instance_from_model<T: ModelInstance>(model: &dyn Model, values: &Row) -> OrmResult<T> {
    let mut instance = T::default();
    for column in model.columns() {
        ensure_property::<T>(model, &column)?;
        let value = values.get(&column.name).cloned().unwrap_or(column.default_value);
        instance.set_property(&column.property_name, value)?;
    }
    Ok(instance)
}

/// Resets every bound property of `instance` to its column default
pub fn prefill_with_column_defaults<T: ModelInstance>(
    model: &dyn Model,
    instance: &mut T,
) -> OrmResult<()> {
    for column in model.columns() {
        ensure_property::<T>(model, &column)?;
        instance.set_property(&column.property_name, column.default_value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::data_type::DataType;
    use crate::orm::value::FromSqlValue;

    #[derive(Debug, Default)]
    struct Person {
        id: Option<i64>,
        name: String,
    }

    fn people() -> TableModel {
        TableModel::new("test", "people")
            .with_instance_name("Person")
            .with_column(
                ColumnDefinition::new("id", DataType::integer()).primary().auto_increment(),
            )
            .with_column(
                ColumnDefinition::new("full_name", DataType::VariableCharacter(65))
                    .property("name")
                    .default_value(""),
            )
    }

    impl ModelInstance for Person {
        type Model = TableModel;

        fn model() -> TableModel {
            people()
        }

        fn property_names() -> &'static [&'static str] {
            &["id", "name"]
        }

        fn get_property(&self, name: &str) -> Option<SqlValue> {
            match name {
                "id" => Some(self.id.into()),
                "name" => Some(self.name.clone().into()),
                _ => None,
            }
        }

        fn set_property(&mut self, name: &str, value: SqlValue) -> OrmResult<()> {
            let type_error =
                || OrmError::PropertyType { property: name.to_string(), value: value.to_string() };
            match name {
                "id" => self.id = FromSqlValue::from_sql_value(&value).ok_or_else(type_error)?,
                "name" => self.name = FromSqlValue::from_sql_value(&value).ok_or_else(type_error)?,
                _ => return Err(OrmError::UnknownProperty(name.to_string())),
            }
            Ok(())
        }
    }

    #[test]
    fn test_column_name_lookup() {
        let model = people();
        assert_eq!(model.column_name("name").unwrap(), "full_name");
        assert!(matches!(
            model.column_name("email"),
            Err(OrmError::NoColumnWithPropertyName { .. })
        ));
    }

    #[test]
    fn test_primary_and_unique_lookup() {
        let model = people();
        assert_eq!(model.primary_key().unwrap().name, "id");
        assert!(model.unique_key().is_none());
    }

    #[test]
    fn test_single_primary_column() {
        assert!(check_primary_key(&people()).is_ok());

        let model = people().with_column(ColumnDefinition::new("code", DataType::integer()).primary());
        let err = check_primary_key(&model).unwrap_err();
        assert!(matches!(err, OrmError::MultiplePrimaryKeys { ref columns, .. } if columns == "id, code"));
    }

    #[test]
    fn test_instance_from_row_uses_defaults_for_missing_columns() {
        let row: Row = vec![("id".to_string(), SqlValue::Int(9))].into_iter().collect();
        let person: Person = instance_from_model(&people(), &row).unwrap();
        assert_eq!(person.id, Some(9));
        assert_eq!(person.name, "");
    }

    #[test]
    fn test_missing_property_fails_fast() {
        let model = people().with_column(ColumnDefinition::new("email", DataType::Text));
        let err = instance_from_model::<Person>(&model, &Row::default()).unwrap_err();
        assert!(matches!(err, OrmError::ObjectMissingModelProperty { ref column, .. } if column == "email"));
    }

    #[test]
    fn test_new_with_defaults() {
        let person = Person::new_with_defaults().unwrap();
        assert_eq!(person.id, None);
        assert_eq!(person.name, "");
    }
}
