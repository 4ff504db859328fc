//! Row extraction and transposition.
//!
//! Both operations collect values across columns, so the columns are first
//! brought to a common type.

use std::sync::Arc;

use arrow::{
    array::{new_empty_array, Array, ArrayRef, AsArray, RecordBatch, RecordBatchOptions, StringArray},
    compute::{cast, concat},
    datatypes::{DataType, Field, FieldRef, Schema, UInt8Type},
};

use super::{Series, Table};
use crate::{
    array::QaFlagArray,
    code::QaCode,
    dtype::{is_qa_field, ExtensionDtype, QaFlagDtype},
    error::Result,
};

/// Type every column is brought to before values are collected across columns.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CommonType {
    Qa,
    Plain(DataType),
}

impl CommonType {
    fn of(fields: &[FieldRef]) -> Self {
        let Some(first) = fields.first() else {
            return Self::Plain(DataType::Null);
        };

        if fields.iter().all(|f| is_qa_field(f)) {
            return Self::Qa;
        }
        if fields.iter().any(|f| is_qa_field(f)) {
            return Self::Plain(DataType::Utf8);
        }
        if fields.iter().all(|f| f.data_type() == first.data_type()) {
            return Self::Plain(first.data_type().clone());
        }
        if fields.iter().all(|f| f.data_type().is_numeric()) {
            return Self::Plain(DataType::Float64);
        }
        Self::Plain(DataType::Utf8)
    }

    fn data_type(&self) -> DataType {
        match self {
            Self::Qa => QaFlagDtype.storage_type(),
            Self::Plain(data_type) => data_type.clone(),
        }
    }

    fn field(&self, name: &str) -> Field {
        match self {
            Self::Qa => QaFlagDtype.field(name),
            Self::Plain(data_type) => Field::new(name, data_type.clone(), true),
        }
    }
}

fn qa_names(values: &dyn Array) -> Result<ArrayRef> {
    let flags = QaFlagArray::from_storage(values.as_primitive::<UInt8Type>())?;
    Ok(Arc::new(
        flags
            .iter()
            .map(|flag| flag.map(QaCode::as_str))
            .collect::<StringArray>(),
    ))
}

fn to_common(field: &Field, values: &dyn Array, target: &CommonType) -> Result<ArrayRef> {
    match target {
        CommonType::Plain(DataType::Utf8) if is_qa_field(field) => qa_names(values),
        CommonType::Plain(data_type) if data_type != values.data_type() => {
            Ok(cast(values, data_type)?)
        }
        _ => Ok(values.slice(0, values.len())),
    }
}

/// Values of row `row` across every column, in column order.
fn row_values(table: &Table, row: usize, target: &CommonType) -> Result<ArrayRef> {
    let batch = table.batch();
    if batch.num_columns() == 0 {
        return Ok(new_empty_array(&target.data_type()));
    }

    let schema = batch.schema();
    let cells = schema
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, column)| to_common(field, column.slice(row, 1).as_ref(), target))
        .collect::<Result<Vec<_>>>()?;
    let refs: Vec<&dyn Array> = cells.iter().map(|c| c.as_ref()).collect();
    Ok(concat(&refs)?)
}

pub(super) fn row(table: &Table, row: usize) -> Result<Series> {
    let schema = table.schema();
    let target = CommonType::of(schema.fields());
    let name = &table.index()[row];
    Ok(Series::from_parts(
        Arc::new(target.field(name)),
        row_values(table, row, &target)?,
        table.column_names(),
    ))
}

pub(super) fn transpose(table: &Table) -> Result<Table> {
    let schema = table.schema();
    let target = CommonType::of(schema.fields());

    let fields: Vec<Field> = table.index().iter().map(|label| target.field(label)).collect();
    let columns = (0..table.num_rows())
        .map(|row| row_values(table, row, &target))
        .collect::<Result<Vec<_>>>()?;

    let options = RecordBatchOptions::new().with_row_count(Some(table.num_columns()));
    let batch = RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), columns, &options)?;
    Table::with_index(batch, table.column_names())
}
