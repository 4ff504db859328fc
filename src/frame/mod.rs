//! Host tables and series.
//!
//! [`Table`] is an Arrow [`RecordBatch`] with row labels, [`Series`] a single
//! Arrow array with a field and row labels. Every operation returns a new
//! value; Arrow buffers are never written through, so a clone taken before an
//! operation stays untouched by it.

use std::{ops::Range, path::Path, sync::Arc};

use arrow::{
    array::{Array, ArrayRef, BooleanArray, RecordBatch, RecordBatchOptions, UInt64Array},
    compute::{concat_batches, take, take_record_batch},
    datatypes::{Field, Schema, SchemaRef},
};

use crate::{
    array::{normalize, Addressed, ExtensionArray, Key, QaFlagArray},
    dtype::is_qa_field,
    error::{Error, Result},
};

mod render;
mod reshape;
mod series;

pub use series::Series;

/// Default row labels `"0"`, `"1"`, ...
pub(crate) fn range_index(len: usize) -> Vec<String> {
    (0..len).map(|i| i.to_string()).collect()
}

fn positions_array(positions: &[usize]) -> UInt64Array {
    UInt64Array::from_iter_values(positions.iter().map(|&p| p as u64))
}

pub(crate) fn take_array(values: &dyn Array, positions: &[usize]) -> Result<ArrayRef> {
    take(values, &positions_array(positions), None).map_err(Error::Arrow)
}

pub(crate) fn take_labels(index: &[String], positions: &[usize]) -> Vec<String> {
    positions.iter().map(|&p| index[p].clone()).collect()
}

/// Checks that `values` can live in a column declared by `field`: no nulls in a
/// non-nullable field, and only valid code bytes in a `qacode` field.
pub(crate) fn check_column(field: &Field, values: &dyn Array) -> Result<()> {
    if !field.is_nullable() && values.null_count() > 0 {
        return Err(Error::schema_mismatch(format!(
            "non-nullable field '{}' holds {} nulls",
            field.name(),
            values.null_count()
        )));
    }
    if is_qa_field(field) {
        QaFlagArray::from_arrow(field, values)?;
    }
    Ok(())
}

fn check_batch(batch: &RecordBatch) -> Result<()> {
    let schema = batch.schema();
    for (field, values) in schema.fields().iter().zip(batch.columns()) {
        check_column(field, values.as_ref())?;
    }
    Ok(())
}

/// A labelled Arrow table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    batch: RecordBatch,
    index: Vec<String>,
}

impl Table {
    /// Wraps a batch with the default row labels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if a `qacode` column holds a byte that is
    /// not a code, [`Error::SchemaMismatch`] if a non-nullable column holds nulls.
    pub fn new(batch: RecordBatch) -> Result<Self> {
        let index = range_index(batch.num_rows());
        Self::with_index(batch, index)
    }

    /// Wraps a batch with explicit row labels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if there is not one label per row, and the
    /// errors of [`Table::new`] for invalid column contents.
    pub fn with_index(batch: RecordBatch, index: Vec<String>) -> Result<Self> {
        if index.len() != batch.num_rows() {
            return Err(Error::validation(format!(
                "index of length {} does not match {} rows",
                index.len(),
                batch.num_rows()
            )));
        }
        check_batch(&batch)?;
        Ok(Self { batch, index })
    }

    /// A table with no rows and no columns.
    pub fn empty() -> Self {
        Self {
            batch: RecordBatch::new_empty(Arc::new(Schema::empty())),
            index: Vec::new(),
        }
    }

    /// Builds a table from series sharing the same row labels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] if the series differ in length or labels.
    pub fn from_columns(columns: Vec<Series>) -> Result<Self> {
        let Some(first) = columns.first() else {
            return Ok(Self::empty());
        };
        let index = first.index().to_vec();

        for series in &columns[1..] {
            if series.index() != index.as_slice() {
                return Err(Error::schema_mismatch(format!(
                    "series '{}' does not share the row labels of series '{}'",
                    series.name(),
                    first.name()
                )));
            }
        }

        let fields: Vec<_> = columns.iter().map(|s| Arc::clone(s.field())).collect();
        let arrays: Vec<_> = columns.iter().map(|s| Arc::clone(s.values())).collect();
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
            .map_err(|e| Error::schema_mismatch(e.to_string()))?;
        Self::with_index(batch, index)
    }

    /// Reads a table from CSV text with a header row.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid CSV or holds no rows.
    pub fn from_csv_str(data: &str) -> Result<Self> {
        use std::io::Cursor;

        use arrow_csv::{reader::Format, ReaderBuilder};

        let mut cursor_for_infer = Cursor::new(data.as_bytes());
        let format = Format::default().with_header(true);
        let (inferred, _) = format
            .infer_schema(&mut cursor_for_infer, Some(1000))
            .map_err(Error::Arrow)?;

        let schema = Arc::new(inferred);
        let reader = ReaderBuilder::new(Arc::clone(&schema))
            .with_header(true)
            .build(Cursor::new(data.as_bytes()))
            .map_err(Error::Arrow)?;

        Self::from_batches(&schema, reader)
    }

    /// Reads a table from a CSV file with a header row.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid CSV or holds no rows.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| Error::io(e, path))?;
        Self::from_csv_str(&data)
    }

    fn from_batches(
        schema: &SchemaRef,
        batches: impl Iterator<Item = std::result::Result<RecordBatch, arrow::error::ArrowError>>,
    ) -> Result<Self> {
        let batches = batches.collect::<std::result::Result<Vec<_>, _>>()?;
        if batches.is_empty() {
            return Err(Error::EmptyTable);
        }
        Self::new(concat_batches(schema, &batches)?)
    }

    /// The underlying batch.
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Row labels.
    pub fn index(&self) -> &[String] {
        &self.index
    }

    /// The schema.
    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows(), self.num_columns())
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Extracts a column by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnNotFound`] if no column has that name.
    pub fn column(&self, name: &str) -> Result<Series> {
        let schema = self.batch.schema();
        let (idx, field) = schema
            .column_with_name(name)
            .ok_or_else(|| Error::column_not_found(name))?;
        Ok(Series::from_parts(
            Arc::new(field.clone()),
            Arc::clone(self.batch.column(idx)),
            self.index.clone(),
        ))
    }

    /// Extracts a row by position as a series labelled by column names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if the position is out of range.
    pub fn row(&self, position: isize) -> Result<Series> {
        let row = normalize(position, self.num_rows())?;
        reshape::row(self, row)
    }

    /// Selects rows by key, preserving key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not resolve against the rows.
    pub fn rows(&self, key: &Key) -> Result<Self> {
        if let Key::Slice(range) = key {
            return Ok(self.slice_rows(range.clone()));
        }
        let positions = match key.resolve(self.num_rows())? {
            Addressed::Single(p) => vec![p],
            Addressed::Many(positions) => positions,
        };
        let batch = take_record_batch(&self.batch, &positions_array(&positions))?;
        Ok(Self {
            batch,
            index: take_labels(&self.index, &positions),
        })
    }

    /// Rows in `range`, clamped to the table.
    pub fn slice_rows(&self, range: Range<usize>) -> Self {
        let start = range.start.min(self.num_rows());
        let end = range.end.clamp(start, self.num_rows());
        Self {
            batch: self.batch.slice(start, end - start),
            index: self.index[start..end].to_vec(),
        }
    }

    /// Rows at `positions`, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] for positions outside the table.
    pub fn take_rows(&self, positions: &[isize]) -> Result<Self> {
        self.rows(&Key::Positions(positions.to_vec()))
    }

    /// Rows where `mask` is true; nulls count as false.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the mask is not one entry per row.
    pub fn filter_rows(&self, mask: &BooleanArray) -> Result<Self> {
        self.rows(&Key::from_arrow(mask)?)
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> Self {
        self.slice_rows(0..n)
    }

    /// Keeps the named columns, in the order given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnNotFound`] if a name is unknown.
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Result<Self> {
        let schema = self.batch.schema();
        let mut fields = Vec::with_capacity(columns.len());
        let mut arrays = Vec::with_capacity(columns.len());

        for name in columns {
            let name = name.as_ref();
            let (idx, field) = schema
                .column_with_name(name)
                .ok_or_else(|| Error::column_not_found(name))?;
            fields.push(field.clone());
            arrays.push(Arc::clone(self.batch.column(idx)));
        }

        self.with_columns(fields, arrays)
    }

    /// Replaces the column with the series' name, or appends it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] if the series does not have one value per row.
    pub fn with_column(&self, series: &Series) -> Result<Self> {
        if series.len() != self.num_rows() {
            return Err(Error::schema_mismatch(format!(
                "series '{}' has {} values, table has {} rows",
                series.name(),
                series.len(),
                self.num_rows()
            )));
        }

        let schema = self.batch.schema();
        let mut fields: Vec<_> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
        let mut arrays = self.batch.columns().to_vec();

        match schema.index_of(series.name()) {
            Ok(idx) => {
                fields[idx] = series.field().as_ref().clone();
                arrays[idx] = Arc::clone(series.values());
            }
            Err(_) => {
                fields.push(series.field().as_ref().clone());
                arrays.push(Arc::clone(series.values()));
            }
        }

        self.with_columns(fields, arrays)
    }

    /// Builds a table with new columns and this table's rows.
    pub(crate) fn with_columns(
        &self,
        fields: Vec<Field>,
        arrays: Vec<ArrayRef>,
    ) -> Result<Self> {
        let options = RecordBatchOptions::new().with_row_count(Some(self.num_rows()));
        let batch = RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)?;
        Ok(Self {
            batch,
            index: self.index.clone(),
        })
    }

    /// Swaps rows and columns.
    ///
    /// Row labels become column names and column names become row labels.
    /// Columns are brought to a common type first: all `qacode` columns stay
    /// `qacode`, identical types are kept, mixed numeric types widen to
    /// `Float64`, anything else becomes `Utf8`.
    ///
    /// # Errors
    ///
    /// Returns an error if a column cannot be cast to the common type.
    pub fn transpose(&self) -> Result<Self> {
        reshape::transpose(self)
    }

    /// Renders the table with its row labels.
    ///
    /// # Errors
    ///
    /// Returns an error if Arrow cannot format a column.
    pub fn render(&self) -> Result<String> {
        render::render_batch(&self.index, &self.batch)
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::empty()
    }
}
