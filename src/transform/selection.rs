//! Column selection and renaming.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use arrow::datatypes::Field;

use super::Transform;
use crate::{
    error::{Error, Result},
    frame::Table,
};

/// Keeps the named columns, in the order given.
///
/// # Example
///
/// ```
/// use qaframe::transform::Select;
///
/// let select = Select::new(["id", "name"]);
/// assert_eq!(select.columns(), ["id", "name"]);
/// ```
#[derive(Debug, Clone)]
pub struct Select {
    columns: Vec<String>,
}

impl Select {
    /// Creates a Select transform for the given column names.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// The columns to keep.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Transform for Select {
    fn apply(&self, table: Table) -> Result<Table> {
        table.select(&self.columns)
    }

    fn describe(&self) -> String {
        format!("select {:?}", self.columns)
    }
}

/// Renames columns; extension metadata such as `qacode` is kept.
#[derive(Debug, Clone)]
pub struct Rename {
    mapping: HashMap<String, String>,
}

impl Rename {
    /// Creates a Rename transform from an old-to-new name mapping.
    pub fn new(mapping: HashMap<String, String>) -> Self {
        Self { mapping }
    }

    /// Creates a Rename transform from `(old, new)` pairs.
    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, S)>) -> Self {
        let mapping = pairs
            .into_iter()
            .map(|(old, new)| (old.into(), new.into()))
            .collect();
        Self { mapping }
    }
}

impl Transform for Rename {
    fn apply(&self, table: Table) -> Result<Table> {
        let schema = table.schema();
        let fields: Vec<Field> = schema
            .fields()
            .iter()
            .map(|field| match self.mapping.get(field.name()) {
                Some(new_name) => field.as_ref().clone().with_name(new_name),
                None => field.as_ref().clone(),
            })
            .collect();
        table.with_columns(fields, table.batch().columns().to_vec())
    }

    fn describe(&self) -> String {
        let mut pairs: Vec<_> = self
            .mapping
            .iter()
            .map(|(old, new)| format!("{old} -> {new}"))
            .collect();
        pairs.sort();
        format!("rename [{}]", pairs.join(", "))
    }
}

/// Removes the named columns. Unknown names are ignored.
#[derive(Debug, Clone)]
pub struct Drop {
    columns: Vec<String>,
}

impl Drop {
    /// Creates a Drop transform for the given column names.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// The columns to drop.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Transform for Drop {
    fn apply(&self, table: Table) -> Result<Table> {
        let schema = table.schema();
        let drop_set: HashSet<&str> = self.columns.iter().map(String::as_str).collect();

        let mut fields = Vec::new();
        let mut arrays = Vec::new();

        for (idx, field) in schema.fields().iter().enumerate() {
            if !drop_set.contains(field.name().as_str()) {
                fields.push(field.as_ref().clone());
                arrays.push(Arc::clone(table.batch().column(idx)));
            }
        }

        if fields.is_empty() {
            return Err(Error::validation("cannot drop all columns from a table"));
        }

        table.with_columns(fields, arrays)
    }

    fn describe(&self) -> String {
        format!("drop {:?}", self.columns)
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::{Int32Array, StringArray};

    use super::*;
    use crate::{array::QaFlagArray, code::QaCode, dtype::is_qa_field, frame::Series};

    fn create_test_table() -> Table {
        Table::from_columns(vec![
            Series::new("id", Arc::new(Int32Array::from(vec![1, 2, 3]))),
            Series::new("name", Arc::new(StringArray::from(vec!["a", "b", "c"]))),
            Series::from_flags("qa", &QaFlagArray::filled(3, QaCode::Auto)),
        ])
        .unwrap()
    }

    #[test]
    fn test_select() {
        let result = Select::new(["qa", "id"]).apply(create_test_table()).unwrap();
        assert_eq!(result.column_names(), ["qa", "id"]);
        assert!(is_qa_field(result.schema().field(0)));
    }

    #[test]
    fn test_select_missing_column() {
        let result = Select::new(["missing"]).apply(create_test_table());
        assert!(matches!(result, Err(Error::ColumnNotFound { .. })));
    }

    #[test]
    fn test_rename_keeps_metadata() {
        let rename = Rename::from_pairs([("qa", "flags"), ("id", "key")]);
        let result = rename.apply(create_test_table()).unwrap();
        assert_eq!(result.column_names(), ["key", "name", "flags"]);
        assert!(is_qa_field(result.schema().field(2)));
        assert_eq!(rename.describe(), "rename [id -> key, qa -> flags]");
    }

    #[test]
    fn test_rename_via_map() {
        let mut mapping = HashMap::new();
        mapping.insert("name".to_string(), "label".to_string());
        let result = Rename::new(mapping).apply(create_test_table()).unwrap();
        assert!(result.column("label").is_ok());
    }

    #[test]
    fn test_drop() {
        let result = Drop::new(["name", "unknown"]).apply(create_test_table()).unwrap();
        assert_eq!(result.column_names(), ["id", "qa"]);
        assert_eq!(result.index(), ["0", "1", "2"]);
    }

    #[test]
    fn test_drop_all_columns() {
        let result = Drop::new(["id", "name", "qa"]).apply(create_test_table());
        assert!(matches!(result, Err(Error::Validation { .. })));
    }
}
