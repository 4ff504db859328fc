//! Labelled single-column values.

use std::{ops::Range, sync::Arc};

use arrow::{
    array::{new_empty_array, Array, ArrayRef, BooleanArray},
    datatypes::{DataType, Field, FieldRef},
    util::display::array_value_to_string,
};

use super::{check_column, range_index, render, take_array, take_labels, Table};
use crate::{
    array::{normalize, Addressed, ExtensionArray, Key, QaFlagArray},
    code::QaCode,
    dtype::{dtype_of_field, is_qa_field},
    error::{Error, Result},
};

/// A named Arrow array with row labels.
#[derive(Debug, Clone)]
pub struct Series {
    field: FieldRef,
    values: ArrayRef,
    index: Vec<String>,
}

impl Series {
    /// Creates a nullable series with the default row labels.
    pub fn new(name: impl Into<String>, values: ArrayRef) -> Self {
        let field = Field::new(name, values.data_type().clone(), true);
        let index = range_index(values.len());
        Self {
            field: Arc::new(field),
            values,
            index,
        }
    }

    /// Creates a `qacode` series from flags.
    pub fn from_flags(name: impl Into<String>, flags: &QaFlagArray) -> Self {
        let name = name.into();
        Self {
            field: Arc::new(flags.to_field(&name)),
            values: flags.to_arrow(),
            index: range_index(flags.len()),
        }
    }

    /// Creates a series from an explicit field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] if the field type differs from the values
    /// or a non-nullable field holds nulls, [`Error::InvalidValue`] if a `qacode`
    /// field holds a byte that is not a code.
    pub fn from_field(field: FieldRef, values: ArrayRef) -> Result<Self> {
        if field.data_type() != values.data_type() {
            return Err(Error::schema_mismatch(format!(
                "field '{}' is {} but values are {}",
                field.name(),
                field.data_type(),
                values.data_type()
            )));
        }
        check_column(&field, values.as_ref())?;
        let index = range_index(values.len());
        Ok(Self {
            field,
            values,
            index,
        })
    }

    pub(crate) fn from_parts(field: FieldRef, values: ArrayRef, index: Vec<String>) -> Self {
        Self {
            field,
            values,
            index,
        }
    }

    /// An empty series of the given type.
    pub fn empty(name: impl Into<String>, data_type: &DataType) -> Self {
        Self::new(name, new_empty_array(data_type))
    }

    /// Replaces the row labels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if there is not one label per value.
    pub fn with_index(mut self, index: Vec<String>) -> Result<Self> {
        if index.len() != self.len() {
            return Err(Error::validation(format!(
                "index of length {} does not match {} values",
                index.len(),
                self.len()
            )));
        }
        self.index = index;
        Ok(self)
    }

    /// Replaces the values, keeping name and labels.
    ///
    /// A `qacode` series stays `qacode` only while the new values share its storage type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] if the length changes, or the errors of
    /// [`Series::from_field`] when the kept field rejects the values.
    pub fn with_values(&self, values: ArrayRef) -> Result<Self> {
        if values.len() != self.len() {
            return Err(Error::schema_mismatch(format!(
                "series '{}' has {} values, replacement has {}",
                self.name(),
                self.len(),
                values.len()
            )));
        }
        let field = if values.data_type() == self.field.data_type() {
            check_column(&self.field, values.as_ref())?;
            Arc::clone(&self.field)
        } else {
            Arc::new(Field::new(self.name(), values.data_type().clone(), true))
        };
        Ok(Self::from_parts(field, values, self.index.clone()))
    }

    /// Series name.
    pub fn name(&self) -> &str {
        self.field.name()
    }

    /// Arrow field, including extension metadata.
    pub fn field(&self) -> &FieldRef {
        &self.field
    }

    /// Arrow values.
    pub fn values(&self) -> &ArrayRef {
        &self.values
    }

    /// Row labels.
    pub fn index(&self) -> &[String] {
        &self.index
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the series is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Name of the dtype: the extension name when registered, the Arrow type otherwise.
    pub fn dtype_name(&self) -> String {
        dtype_of_field(&self.field)
            .map_or_else(|| self.field.data_type().to_string(), |d| d.name.to_string())
    }

    /// True for `qacode` series.
    pub fn is_qa(&self) -> bool {
        is_qa_field(&self.field)
    }

    /// Reads the values as QA flags.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidType`] if the series is not `qacode`.
    pub fn flags(&self) -> Result<QaFlagArray> {
        QaFlagArray::from_arrow(&self.field, self.values.as_ref())
    }

    /// Formats one value; `qacode` values show as code names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] for positions outside the series.
    pub fn value_string(&self, position: isize) -> Result<String> {
        let i = normalize(position, self.len())?;
        if self.values.is_null(i) {
            return Ok(String::new());
        }
        if self.is_qa() {
            let flag = self.flags()?.as_slice()[i];
            return Ok(flag.map(QaCode::as_str).unwrap_or_default().to_string());
        }
        array_value_to_string(self.values.as_ref(), i).map_err(Error::Arrow)
    }

    /// Selects values by key, preserving key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not resolve against the values.
    pub fn select(&self, key: &Key) -> Result<Self> {
        if let Key::Slice(range) = key {
            return Ok(self.slice(range.clone()));
        }
        let positions = match key.resolve(self.len())? {
            Addressed::Single(p) => vec![p],
            Addressed::Many(positions) => positions,
        };
        Ok(Self::from_parts(
            Arc::clone(&self.field),
            take_array(self.values.as_ref(), &positions)?,
            take_labels(&self.index, &positions),
        ))
    }

    /// Values in `range`, clamped to the series.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let start = range.start.min(self.len());
        let end = range.end.clamp(start, self.len());
        Self::from_parts(
            Arc::clone(&self.field),
            self.values.slice(start, end - start),
            self.index[start..end].to_vec(),
        )
    }

    /// Values at `positions`, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] for positions outside the series.
    pub fn take(&self, positions: &[isize]) -> Result<Self> {
        self.select(&Key::Positions(positions.to_vec()))
    }

    /// Values where `mask` is true; nulls count as false.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the mask is not one entry per value.
    pub fn filter(&self, mask: &BooleanArray) -> Result<Self> {
        self.select(&Key::from_arrow(mask)?)
    }

    /// The first `n` values.
    pub fn head(&self, n: usize) -> Self {
        self.slice(0..n)
    }

    /// A one-column table holding this series.
    ///
    /// # Errors
    ///
    /// Returns an error if the values violate the field, e.g. nulls in a
    /// non-nullable field.
    pub fn to_frame(&self) -> Result<Table> {
        Table::from_columns(vec![self.clone()])
    }

    /// Renders the series with its row labels and a dtype footer.
    ///
    /// # Errors
    ///
    /// Returns an error if Arrow cannot format the values.
    pub fn render(&self) -> Result<String> {
        render::render_series(self)
    }
}

impl PartialEq for Series {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field
            && self.values.as_ref() == other.values.as_ref()
            && self.index == other.index
    }
}
