//! QA tables.

use std::{fmt, ops::Range, path::Path};

use arrow::{
    array::{BooleanArray, RecordBatch},
    datatypes::SchemaRef,
};

use crate::{
    annotated::{Lineage, QaAnnotated, QaConstruct, QaGenerator, QaState, Sliced},
    array::{ExtensionArray, Key, QaFlagArray},
    config::QaOptions,
    error::{Error, Result},
    frame::{Series, Table},
    series::QaSeries,
    transform::Transform,
};

/// A [`Table`] with a raw copy, QA flags and a history.
///
/// Every structural operation returns a `QaTable` (or a [`QaSeries`] when a
/// dimension is dropped). What the result inherits from its source is set by
/// [`QaOptions::derive_policy`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use arrow::array::Int64Array;
/// use qaframe::{QaAnnotated, QaTable, Series};
///
/// let table = QaTable::from_columns(vec![Series::new(
///     "a",
///     Arc::new(Int64Array::from(vec![1, 2, 3, 4])),
/// )])
/// .unwrap();
///
/// let sliced = table.slice_rows(1..3).unwrap();
/// assert_eq!(sliced.num_rows(), 2);
/// assert!(table.history().contains("Initiated QA Table"));
/// ```
#[derive(Debug, Clone)]
pub struct QaTable {
    data: Table,
    state: QaState<Table>,
}

impl QaTable {
    /// Wraps a table with default options.
    pub fn new(data: Table) -> Self {
        Self::with_options(data, QaOptions::default())
    }

    /// Wraps a table.
    pub fn with_options(data: Table, options: QaOptions) -> Self {
        Self::construct(data, None, options)
    }

    /// Wraps a record batch with default row labels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if a `qacode` column holds a byte that is
    /// not a code, [`Error::SchemaMismatch`] if a non-nullable column holds nulls.
    pub fn from_batch(batch: RecordBatch) -> Result<Self> {
        Table::new(batch).map(Self::new)
    }

    /// Builds a table from series sharing the same row labels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] if the series do not line up.
    pub fn from_columns(columns: Vec<Series>) -> Result<Self> {
        Table::from_columns(columns).map(Self::new)
    }

    /// Reads CSV text with a header row.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid CSV or holds no rows.
    pub fn from_csv_str(data: &str) -> Result<Self> {
        Table::from_csv_str(data).map(Self::new)
    }

    /// Reads a CSV file with a header row.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        Table::from_csv(path).map(Self::new)
    }

    /// Consumes the QA table, returning the live table.
    pub fn into_inner(self) -> Table {
        self.data
    }

    /// Row labels.
    pub fn index(&self) -> &[String] {
        self.data.index()
    }

    /// The schema.
    pub fn schema(&self) -> SchemaRef {
        self.data.schema()
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.data.num_rows()
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.data.num_columns()
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        self.data.shape()
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.data.column_names()
    }

    /// Rows in `range`, clamped to the table.
    ///
    /// # Errors
    ///
    /// Infallible on the live data; kept fallible like every derivation.
    pub fn slice_rows(&self, range: Range<usize>) -> Result<Self> {
        self.derive(&format!("slice_rows {range:?}"), |t| {
            Ok(t.slice_rows(range.clone()))
        })
    }

    /// Rows addressed by `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not resolve against the rows.
    pub fn rows(&self, key: &Key) -> Result<Self> {
        self.derive(&format!("rows {key:?}"), |t| t.rows(key))
    }

    /// Rows at `positions`, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] for positions outside the table.
    pub fn take_rows(&self, positions: &[isize]) -> Result<Self> {
        self.derive(&format!("take_rows {positions:?}"), |t| t.take_rows(positions))
    }

    /// Rows where `mask` is true.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the mask is not one entry per row.
    pub fn filter_rows(&self, mask: &BooleanArray) -> Result<Self> {
        self.derive("filter_rows", |t| t.filter_rows(mask))
    }

    /// The first `n` rows.
    ///
    /// # Errors
    ///
    /// Infallible on the live data; kept fallible like every derivation.
    pub fn head(&self, n: usize) -> Result<Self> {
        self.derive(&format!("head {n}"), |t| Ok(t.head(n)))
    }

    /// Keeps the named columns, in the order given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnNotFound`] if a name is unknown.
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Result<Self> {
        let names: Vec<&str> = columns.iter().map(AsRef::as_ref).collect();
        self.derive(&format!("select {names:?}"), |t| t.select(&names))
    }

    /// Swaps rows and columns.
    ///
    /// # Errors
    ///
    /// Returns an error if a column cannot be cast to the common type.
    pub fn transpose(&self) -> Result<Self> {
        self.derive("transpose", Table::transpose)
    }

    /// Extracts a column as a QA series.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnNotFound`] if no column has that name.
    pub fn column(&self, name: &str) -> Result<<Self as Sliced>::Sliced> {
        self.derive(&format!("column '{name}'"), |t| t.column(name))
    }

    /// Extracts a row by position as a QA series.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if the position is out of range.
    pub fn row(&self, position: isize) -> Result<<Self as Sliced>::Sliced> {
        self.derive(&format!("row {position}"), |t| t.row(position))
    }

    /// Applies a transform.
    ///
    /// # Errors
    ///
    /// Returns the transform's error.
    pub fn apply<T: Transform>(&self, transform: &T) -> Result<Self> {
        self.derive(&transform.describe(), |t| transform.apply(t.clone()))
    }

    /// Replaces or appends a column of the live data.
    ///
    /// The raw copy is left untouched; the change is recorded and the QA
    /// annotation invalidated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] if the series does not have one value per row.
    pub fn set_column(&mut self, series: &Series) -> Result<()> {
        let replaced = self.data.schema().index_of(series.name()).is_ok();
        self.data = self.data.with_column(series)?;
        self.log(format!(
            "{} column '{}'",
            if replaced { "Replaced" } else { "Added" },
            series.name()
        ));
        self.invalidate_qa();
        Ok(())
    }

    /// Reads a `qacode` column of the live data.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is missing or not `qacode`.
    pub fn flags(&self, name: &str) -> Result<QaFlagArray> {
        self.data.column(name)?.flags()
    }
}

impl QaAnnotated for QaTable {
    type Host = Table;

    fn data(&self) -> &Table {
        &self.data
    }

    fn state(&self) -> &QaState<Table> {
        &self.state
    }

    fn state_mut(&mut self) -> &mut QaState<Table> {
        &mut self.state
    }

    fn annotate(raw: &Table, generator: &dyn QaGenerator) -> Result<Table> {
        let schema = raw.schema();
        let mut fields = Vec::with_capacity(schema.fields().len());
        let mut arrays = Vec::with_capacity(schema.fields().len());

        for (field, values) in schema.fields().iter().zip(raw.batch().columns()) {
            let flags = generator.flag_column(field.name(), values.as_ref())?;
            if flags.len() != values.len() {
                return Err(Error::schema_mismatch(format!(
                    "generator '{}' returned {} flags for {} values of column '{}'",
                    generator.name(),
                    flags.len(),
                    values.len(),
                    field.name()
                )));
            }
            fields.push(flags.to_field(field.name()));
            arrays.push(flags.to_arrow());
        }

        raw.with_columns(fields, arrays)
    }
}

impl QaConstruct for QaTable {
    fn construct(data: Table, lineage: Option<Lineage<Table>>, options: QaOptions) -> Self {
        let state = match lineage {
            Some(lineage) => QaState::from_lineage(lineage, options),
            None => {
                tracing::info!(
                    rows = data.num_rows(),
                    columns = data.num_columns(),
                    "QA table created"
                );
                QaState::new(data.clone(), options)
            }
        };
        Self { data, state }
    }
}

impl Sliced for QaTable {
    type Sliced = QaSeries;
}

impl fmt::Display for QaTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data.render() {
            Ok(table) => write!(f, "{table}")?,
            Err(e) => write!(f, "<unrenderable table: {e}>")?,
        }
        write!(f, "\n\n{}", self.render_qa())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::{
        array::{Float64Array, Int64Array, StringArray, UInt8Array},
        datatypes::Schema,
    };

    use super::*;
    use crate::{code::QaCode, config::DerivePolicy, transform::Select};

    fn sample_columns() -> Vec<Series> {
        vec![
            Series::new("a", Arc::new(Int64Array::from(vec![1, 2, 3, 4]))),
            Series::new("b", Arc::new(StringArray::from(vec!["a", "a", "c", "b"]))),
            Series::new("c", Arc::new(Float64Array::from(vec![0.1, 0.1, 0.2, 0.1]))),
        ]
    }

    fn sample() -> QaTable {
        QaTable::from_columns(sample_columns()).unwrap()
    }

    fn inheriting() -> QaTable {
        QaTable::with_options(
            Table::from_columns(sample_columns()).unwrap(),
            QaOptions::new().with_derive_policy(DerivePolicy::Inherit),
        )
    }

    #[test]
    fn test_construction_captures_raw() {
        let table = sample();
        assert_eq!(table.raw(), table.data());
        assert!(table.qa().is_none());
        assert!(!table.qa_generated());
        assert_eq!(table.history_entries().len(), 1);
    }

    #[test]
    fn test_generate_qa_mirrors_raw_shape() {
        let mut table = sample();
        let qa = table.generate_qa().unwrap().clone();
        assert_eq!(qa.shape(), (4, 3));
        assert_eq!(qa.column_names(), ["a", "b", "c"]);
        assert_eq!(qa.index(), table.index());
        assert_eq!(
            qa.column("b").unwrap().flags().unwrap(),
            QaFlagArray::filled(4, QaCode::Orig)
        );
        assert!(table.qa_generated());
    }

    #[test]
    fn test_generate_qa_is_cached() {
        let mut table = sample();
        let first = table.generate_qa().unwrap().clone();
        let second = table.generate_qa().unwrap().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalidate_qa_keeps_raw_and_history() {
        let mut table = sample();
        table.generate_qa().unwrap();
        table.invalidate_qa();
        table.invalidate_qa();
        assert!(table.qa().is_none());
        assert!(!table.qa_generated());
        assert_eq!(table.raw().shape(), (4, 3));
        assert_eq!(table.history_entries().len(), 1);
    }

    #[test]
    fn test_set_column_leaves_raw_alone() {
        let mut table = sample();
        table.generate_qa().unwrap();
        let replacement = Series::new("a", Arc::new(Int64Array::from(vec![0, 0, 0, 0])));
        table.set_column(&replacement).unwrap();

        assert_eq!(table.data().column("a").unwrap().value_string(0).unwrap(), "0");
        assert_eq!(table.raw().column("a").unwrap().value_string(0).unwrap(), "1");
        assert!(!table.qa_generated());
        assert!(table.history().contains("Replaced column 'a'"));
    }

    #[test]
    fn test_set_column_append() {
        let mut table = sample();
        let flags = Series::from_flags("qa", &QaFlagArray::filled(4, QaCode::Gapf));
        table.set_column(&flags).unwrap();
        assert_eq!(table.num_columns(), 4);
        assert_eq!(table.flags("qa").unwrap().value(0).unwrap(), Some(QaCode::Gapf));
        assert!(table.history().contains("Added column 'qa'"));
        assert!(table.flags("a").is_err());
    }

    #[test]
    fn test_fresh_derivation_resets_history() {
        let mut table = sample();
        table.log("manual edit");
        let sliced = table.slice_rows(1..3).unwrap();
        assert_eq!(sliced.history_entries().len(), 1);
        assert_eq!(sliced.raw(), sliced.data());
    }

    #[test]
    fn test_inherit_derivation_carries_history_and_raw() {
        let mut table = inheriting();
        let replacement = Series::new("a", Arc::new(Int64Array::from(vec![7, 7, 7, 7])));
        table.set_column(&replacement).unwrap();

        let sliced = table.slice_rows(1..3).unwrap();
        let messages: Vec<_> = sliced
            .history_entries()
            .iter()
            .map(|e| e.message().to_string())
            .collect();
        assert_eq!(messages[0], "Initiated QA Table");
        assert_eq!(messages[1], "Replaced column 'a'");
        assert!(messages[2].starts_with("Derived QA Table via slice_rows"));

        assert_eq!(sliced.raw().num_rows(), 2);
        assert_eq!(sliced.raw().column("a").unwrap().value_string(0).unwrap(), "2");
        assert_eq!(sliced.data().column("a").unwrap().value_string(0).unwrap(), "7");
        assert_eq!(sliced.options().derive_policy, DerivePolicy::Inherit);
    }

    #[test]
    fn test_inherit_restarts_raw_when_operation_does_not_fit() {
        let mut table = inheriting();
        let extra = Series::new("d", Arc::new(Int64Array::from(vec![1, 1, 1, 1])));
        table.set_column(&extra).unwrap();

        let column = table.column("d").unwrap();
        assert_eq!(column.raw(), column.data());
        assert!(column.history().contains("Raw copy restarted"));
    }

    #[test]
    fn test_inherit_transpose_transposes_raw() {
        let table = inheriting();
        let transposed = table.transpose().unwrap();
        assert_eq!(transposed.raw().shape(), (3, 4));
        assert_eq!(transposed.history_entries().len(), 2);
    }

    #[test]
    fn test_apply_transform() {
        let table = sample();
        let selected = table.apply(&Select::new(["c"])).unwrap();
        assert_eq!(selected.column_names(), ["c"]);
    }

    #[test]
    fn test_errors_do_not_produce_objects() {
        let table = sample();
        assert!(matches!(table.column("zzz"), Err(Error::ColumnNotFound { .. })));
        assert!(matches!(table.row(9), Err(Error::IndexOutOfBounds { .. })));
        let mask = BooleanArray::from(vec![true]);
        assert!(matches!(table.filter_rows(&mask), Err(Error::Validation { .. })));
    }

    #[test]
    fn test_from_batch_rejects_invalid_code_bytes() {
        let flags = QaFlagArray::missing(0);
        let schema = Arc::new(Schema::new(vec![flags.to_field("qa")]));
        let batch =
            RecordBatch::try_new(schema, vec![Arc::new(UInt8Array::from(vec![0, 9]))]).unwrap();
        assert!(matches!(
            QaTable::from_batch(batch),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_from_batch_with_flags() {
        let flags = QaFlagArray::new(vec![Some(QaCode::Manu), None]);
        let schema = Arc::new(Schema::new(vec![flags.to_field("qa")]));
        let batch = RecordBatch::try_new(schema, vec![flags.to_arrow()]).unwrap();
        let table = QaTable::from_batch(batch).unwrap();
        assert_eq!(table.flags("qa").unwrap(), flags);
        assert!(table.to_string().contains("manu"));
    }

    #[test]
    fn test_display_falls_back_when_render_fails() {
        let mut table = sample();
        let bad = Series::from_parts(
            Arc::new(QaFlagArray::missing(0).to_field("qa")),
            Arc::new(UInt8Array::from(vec![0, 9, 1, 2])),
            table.index().to_vec(),
        );
        table.data = table.data.with_column(&bad).unwrap();

        let rendered = table.to_string();
        assert!(rendered.starts_with("<unrenderable table:"));
        assert!(rendered.contains("[QA]: not set"));
        assert!(rendered.contains("Initiated QA Table"));
    }

    #[test]
    fn test_display_appends_qa_block() {
        let mut table = sample();
        let rendered = table.to_string();
        assert!(rendered.contains("[QA]: not set"));
        assert!(rendered.contains("[History]:"));
        assert!(rendered.contains("Initiated QA Table"));

        table.generate_qa().unwrap();
        let rendered = table.to_string();
        assert!(rendered.contains("[QA]:\n"));
        assert!(rendered.contains("orig"));
    }
}
