//! Row slicing.

use super::Transform;
use crate::{error::Result, frame::Table};

/// Keeps the first N rows.
#[derive(Debug, Clone, Copy)]
pub struct Take {
    count: usize,
}

impl Take {
    /// Creates a Take transform that keeps the first `count` rows.
    pub fn new(count: usize) -> Self {
        Self { count }
    }

    /// The number of rows to keep.
    pub fn count(&self) -> usize {
        self.count
    }
}

impl Transform for Take {
    fn apply(&self, table: Table) -> Result<Table> {
        if self.count >= table.num_rows() {
            return Ok(table);
        }
        Ok(table.head(self.count))
    }

    fn describe(&self) -> String {
        format!("take {}", self.count)
    }
}

/// Skips the first N rows.
#[derive(Debug, Clone, Copy)]
pub struct Skip {
    count: usize,
}

impl Skip {
    /// Creates a Skip transform that drops the first `count` rows.
    pub fn new(count: usize) -> Self {
        Self { count }
    }

    /// The number of rows to skip.
    pub fn count(&self) -> usize {
        self.count
    }
}

impl Transform for Skip {
    fn apply(&self, table: Table) -> Result<Table> {
        // slice_rows clamps, so skipping past the end yields an empty table
        Ok(table.slice_rows(self.count..table.num_rows()))
    }

    fn describe(&self) -> String {
        format!("skip {}", self.count)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::Int32Array;

    use super::*;
    use crate::frame::Series;

    fn create_test_table() -> Table {
        Table::from_columns(vec![Series::new(
            "id",
            Arc::new(Int32Array::from(vec![1, 2, 3, 4, 5])),
        )])
        .unwrap()
    }

    #[test]
    fn test_take() {
        let result = Take::new(3).apply(create_test_table()).unwrap();
        assert_eq!(result.num_rows(), 3);
        assert_eq!(Take::new(3).count(), 3);
    }

    #[test]
    fn test_take_more_than_available() {
        let result = Take::new(100).apply(create_test_table()).unwrap();
        assert_eq!(result.num_rows(), 5);
    }

    #[test]
    fn test_skip_keeps_labels() {
        let result = Skip::new(2).apply(create_test_table()).unwrap();
        assert_eq!(result.num_rows(), 3);
        assert_eq!(result.index(), ["2", "3", "4"]);
    }

    #[test]
    fn test_skip_all() {
        let result = Skip::new(10).apply(create_test_table()).unwrap();
        assert_eq!(result.num_rows(), 0);
        assert_eq!(result.num_columns(), 1);
    }

    #[test]
    fn test_take_then_skip() {
        let taken = Take::new(4).apply(create_test_table()).unwrap();
        let skipped = Skip::new(1).apply(taken).unwrap();
        assert_eq!(skipped.index(), ["1", "2", "3"]);
    }
}
