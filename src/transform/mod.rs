//! Table transforms.
//!
//! A transform takes a [`Table`] and produces a new one. Applied to a
//! [`QaTable`](crate::QaTable) through [`QaTable::apply`](crate::QaTable::apply),
//! the result is wrapped like any other structural operation and its
//! [`Transform::describe`] text names the step in derived histories.
//!
//! [`FlagRows`] and [`FlagMissing`] write QA flags; the others reshape rows
//! and columns while carrying `qacode` columns along.

use arrow::array::BooleanArray;

use crate::{error::Result, frame::Table};

mod flags;
mod row_ops;
mod selection;

pub use flags::{FlagMissing, FlagRows};
pub use row_ops::{Skip, Take};
pub use selection::{Drop, Rename, Select};

/// An operation from one table to another.
pub trait Transform: Send + Sync {
    /// Applies the transform.
    ///
    /// # Errors
    ///
    /// Returns an error if the transform cannot be applied to the table.
    fn apply(&self, table: Table) -> Result<Table>;

    /// Short description, recorded in derived histories.
    fn describe(&self) -> String;
}

/// A transform that keeps the rows a predicate marks `true`.
///
/// The predicate must return one entry per row; nulls count as false.
pub struct Filter<F>
where
    F: Fn(&Table) -> Result<BooleanArray> + Send + Sync,
{
    predicate: F,
}

impl<F> Filter<F>
where
    F: Fn(&Table) -> Result<BooleanArray> + Send + Sync,
{
    /// Creates a Filter transform with the given predicate.
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> Transform for Filter<F>
where
    F: Fn(&Table) -> Result<BooleanArray> + Send + Sync,
{
    fn apply(&self, table: Table) -> Result<Table> {
        let mask = (self.predicate)(&table)?;
        table.filter_rows(&mask)
    }

    fn describe(&self) -> String {
        "filter".to_string()
    }
}

/// Transforms applied in sequence.
pub struct Chain {
    transforms: Vec<Box<dyn Transform>>,
}

impl Chain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    /// Adds a transform to the chain.
    #[must_use]
    pub fn then<T: Transform + 'static>(mut self, transform: T) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    /// Number of transforms in the chain.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// True if the chain has no transforms.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for Chain {
    fn apply(&self, table: Table) -> Result<Table> {
        let mut result = table;
        for transform in &self.transforms {
            result = transform.apply(result)?;
        }
        Ok(result)
    }

    fn describe(&self) -> String {
        let steps: Vec<_> = self.transforms.iter().map(|t| t.describe()).collect();
        format!("chain [{}]", steps.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::{
        array::{AsArray, Int32Array, StringArray},
        datatypes::Int32Type,
    };

    use super::*;
    use crate::{code::QaCode, error::Error, frame::Series};

    fn create_test_table() -> Table {
        Table::from_columns(vec![
            Series::new("id", Arc::new(Int32Array::from(vec![1, 2, 3, 4, 5]))),
            Series::new("name", Arc::new(StringArray::from(vec!["a", "b", "c", "d", "e"]))),
            Series::new("value", Arc::new(Int32Array::from(vec![10, 20, 30, 40, 50]))),
        ])
        .unwrap()
    }

    fn ids_above_two(table: &Table) -> Result<BooleanArray> {
        let ids = table.column("id")?;
        let ids = ids.values().as_primitive::<Int32Type>();
        Ok(ids.iter().map(|v| v.map(|v| v > 2)).collect())
    }

    #[test]
    fn test_filter_transform_keeps_labels() {
        let result = Filter::new(ids_above_two).apply(create_test_table()).unwrap();
        assert_eq!(result.num_rows(), 3);
        assert_eq!(result.index(), ["2", "3", "4"]);
    }

    #[test]
    fn test_filter_empty_result() {
        let filter = Filter::new(|t: &Table| Ok(BooleanArray::from(vec![false; t.num_rows()])));
        assert_eq!(filter.apply(create_test_table()).unwrap().num_rows(), 0);
    }

    #[test]
    fn test_filter_wrong_mask_length() {
        let filter = Filter::new(|_: &Table| Ok(BooleanArray::from(vec![true])));
        assert!(matches!(
            filter.apply(create_test_table()),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_chain_transform() {
        let chain = Chain::new()
            .then(Select::new(["id", "value"]))
            .then(Take::new(3));

        assert_eq!(chain.len(), 2);
        let result = chain.apply(create_test_table()).unwrap();
        assert_eq!(result.shape(), (3, 2));
        assert_eq!(chain.describe(), "chain [select [\"id\", \"value\"], take 3]");
    }

    #[test]
    fn test_empty_chain() {
        let chain = Chain::default();
        assert!(chain.is_empty());
        let table = create_test_table();
        assert_eq!(chain.apply(table.clone()).unwrap(), table);
    }

    #[test]
    fn test_chain_with_rename() {
        let chain = Chain::new()
            .then(Select::new(["id", "name"]))
            .then(Rename::from_pairs([("id", "identifier")]));
        let result = chain.apply(create_test_table()).unwrap();
        assert_eq!(result.column_names(), ["identifier", "name"]);
    }

    #[test]
    fn test_chain_flags_then_filters() {
        let chain = Chain::new()
            .then(FlagRows::new("qa", 0_usize..5, QaCode::Orig))
            .then(FlagRows::new("qa", vec![1_isize, 3], QaCode::Manu))
            .then(Filter::new(ids_above_two));
        let result = chain.apply(create_test_table()).unwrap();
        assert_eq!(result.index(), ["2", "3", "4"]);
        assert_eq!(
            result.column("qa").unwrap().flags().unwrap().as_slice(),
            &[Some(QaCode::Orig), Some(QaCode::Manu), Some(QaCode::Orig)]
        );
        assert_eq!(
            chain.describe(),
            "chain [flag 'qa' Slice(0..5) as orig, flag 'qa' Positions([1, 3]) as manu, filter]"
        );
    }

    #[test]
    fn test_chain_error_stops_pipeline() {
        let chain = Chain::new().then(Take::new(2)).then(Select::new(["missing"]));
        assert!(matches!(
            chain.apply(create_test_table()),
            Err(Error::ColumnNotFound { .. })
        ));
    }
}
