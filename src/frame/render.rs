//! Text rendering of tables and series.

use std::sync::Arc;

use arrow::{
    array::{Array, ArrayRef, AsArray, RecordBatch, RecordBatchOptions, StringArray},
    datatypes::{DataType, Field, Schema, UInt8Type},
    util::pretty::pretty_format_batches,
};

use super::Series;
use crate::{array::QaFlagArray, code::QaCode, dtype::is_qa_field, error::Result};

fn display_column(field: &Field, values: &ArrayRef) -> Result<(Field, ArrayRef)> {
    if !is_qa_field(field) {
        return Ok((field.clone(), Arc::clone(values)));
    }
    let flags = QaFlagArray::from_storage(values.as_primitive::<UInt8Type>())?;
    let names: StringArray = flags.iter().map(|f| f.map(QaCode::as_str)).collect();
    Ok((
        Field::new(field.name(), DataType::Utf8, true),
        Arc::new(names),
    ))
}

/// Pretty-prints a batch with its row labels as a leading unnamed column.
pub(super) fn render_batch(index: &[String], batch: &RecordBatch) -> Result<String> {
    let mut fields = vec![Field::new("", DataType::Utf8, false)];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from_iter_values(index))];

    let schema = batch.schema();
    for (field, values) in schema.fields().iter().zip(batch.columns()) {
        let (field, values) = display_column(field, values)?;
        fields.push(field);
        columns.push(values);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(batch.num_rows()));
    let display = RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), columns, &options)?;
    Ok(pretty_format_batches(&[display])?.to_string())
}

/// Pretty-prints a series followed by a `Name: .., Length: .., dtype: ..` footer.
pub(super) fn render_series(series: &Series) -> Result<String> {
    let schema = Schema::new(vec![Arc::clone(series.field())]);
    let batch = RecordBatch::try_new(Arc::new(schema), vec![Arc::clone(series.values())])?;
    let body = render_batch(series.index(), &batch)?;
    Ok(format!(
        "{body}\nName: {}, Length: {}, dtype: {}",
        series.name(),
        series.values().len(),
        series.dtype_name()
    ))
}

#[cfg(test)]
mod tests {
    use arrow::array::Int64Array;

    use super::*;
    use crate::frame::Table;

    #[test]
    fn test_render_table_includes_labels_and_values() {
        let table = Table::from_columns(vec![
            Series::new("value", Arc::new(Int64Array::from(vec![10, 20]))),
            Series::from_flags("qa", &QaFlagArray::new(vec![Some(QaCode::Gapf), None])),
        ])
        .unwrap();
        let rendered = table.render().unwrap();
        assert!(rendered.contains("value"));
        assert!(rendered.contains("20"));
        assert!(rendered.contains("gapf"));
        assert!(rendered.contains("| 1 "));
    }

    #[test]
    fn test_render_series_footer() {
        let series = Series::from_flags("flags", &QaFlagArray::filled(3, QaCode::Orig));
        let rendered = series.render().unwrap();
        assert!(rendered.contains("orig"));
        assert!(rendered.ends_with("Name: flags, Length: 3, dtype: qacode"));
    }

    #[test]
    fn test_render_empty_table() {
        let rendered = Table::empty().render().unwrap();
        assert!(!rendered.contains("value"));
    }
}
