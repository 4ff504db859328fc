//! Transforms that write QA flags into `qacode` columns.

use arrow::array::Array;

use super::Transform;
use crate::{
    array::{ExtensionArray, FlagValue, Key, QaFlagArray},
    code::QaCode,
    error::{Error, Result},
    frame::{Series, Table},
};

/// Flags of `column`, or all missing when the table has no such column.
fn flags_or_missing(table: &Table, column: &str) -> Result<QaFlagArray> {
    match table.column(column) {
        Ok(series) => series.flags(),
        Err(Error::ColumnNotFound { .. }) => Ok(QaFlagArray::missing(table.num_rows())),
        Err(e) => Err(e),
    }
}

fn write_flags(table: Table, column: &str, key: &Key, value: FlagValue) -> Result<Table> {
    let mut flags = flags_or_missing(&table, column)?;
    flags.set(key, value)?;
    table.with_column(&Series::from_flags(column, &flags))
}

fn value_name(value: &FlagValue) -> String {
    match value {
        FlagValue::Code(code) => code.to_string(),
        FlagValue::Missing => "missing".to_string(),
        FlagValue::Array(flags) => format!("{} flags", flags.len()),
    }
}

/// Writes a flag value into the addressed rows of a `qacode` column.
///
/// The column is appended, all missing, when the table does not have it yet.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use arrow::array::Float64Array;
/// use qaframe::{transform::{FlagRows, Transform}, QaCode, Series, Table};
///
/// let table = Table::from_columns(vec![Series::new(
///     "level",
///     Arc::new(Float64Array::from(vec![1.0, 9.5, 1.2])),
/// )])
/// .unwrap();
///
/// let flagged = FlagRows::new("level_qa", 1_isize, QaCode::Manu).apply(table).unwrap();
/// let flags = flagged.column("level_qa").unwrap().flags().unwrap();
/// assert_eq!(flags.as_slice(), &[None, Some(QaCode::Manu), None]);
/// ```
#[derive(Debug, Clone)]
pub struct FlagRows {
    column: String,
    key: Key,
    value: FlagValue,
}

impl FlagRows {
    /// Creates a transform writing `value` at `key` in `column`.
    pub fn new(column: impl Into<String>, key: impl Into<Key>, value: impl Into<FlagValue>) -> Self {
        Self {
            column: column.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Transform for FlagRows {
    fn apply(&self, table: Table) -> Result<Table> {
        write_flags(table, &self.column, &self.key, self.value.clone())
    }

    fn describe(&self) -> String {
        format!(
            "flag '{}' {:?} as {}",
            self.column,
            self.key,
            value_name(&self.value)
        )
    }
}

/// Flags every row where a data column is null.
///
/// Used to mark gaps: by default the rows are flagged [`QaCode::Gapf`].
#[derive(Debug, Clone)]
pub struct FlagMissing {
    column: String,
    flag_column: String,
    code: QaCode,
}

impl FlagMissing {
    /// Flags nulls of `column` as gap-filled in `flag_column`.
    pub fn new(column: impl Into<String>, flag_column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            flag_column: flag_column.into(),
            code: QaCode::Gapf,
        }
    }

    /// Uses `code` instead of [`QaCode::Gapf`].
    #[must_use]
    pub fn with_code(mut self, code: QaCode) -> Self {
        self.code = code;
        self
    }
}

impl Transform for FlagMissing {
    fn apply(&self, table: Table) -> Result<Table> {
        let values = table.column(&self.column)?;
        let mask: Vec<bool> = (0..values.len()).map(|i| values.values().is_null(i)).collect();
        let gaps = mask.iter().filter(|&&null| null).count();
        tracing::debug!(column = %self.column, gaps, code = %self.code, "flagging missing values");
        write_flags(table, &self.flag_column, &Key::Mask(mask), FlagValue::Code(self.code))
    }

    fn describe(&self) -> String {
        format!(
            "flag_missing '{}' into '{}' as {}",
            self.column, self.flag_column, self.code
        )
    }
}
