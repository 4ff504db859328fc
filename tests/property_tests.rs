//! Property-based tests for QA flag arrays and QA tables.

#![allow(clippy::unwrap_used, clippy::cast_possible_wrap)]

use std::sync::Arc;

use arrow::array::Int64Array;
use proptest::prelude::*;
use qaframe::{
    Element, Error, ExtensionArray, FlagValue, Key, QaAnnotated, QaCode, QaFlagArray, QaTable,
    Series,
};

fn code_strategy() -> impl Strategy<Value = QaCode> {
    prop::sample::select(QaCode::ALL.to_vec())
}

fn flags_strategy() -> impl Strategy<Value = Vec<Option<QaCode>>> {
    prop::collection::vec(prop::option::of(code_strategy()), 1..64)
}

proptest! {
    /// Property: reading position i returns the i-th constructor element
    #[test]
    fn prop_get_matches_source(seq in flags_strategy()) {
        let array = QaFlagArray::new(seq.clone());
        for (i, expected) in seq.iter().enumerate() {
            let element = array.get(&Key::Index(i as isize)).unwrap();
            prop_assert_eq!(element, Element::Scalar(*expected));
        }
    }

    /// Property: negative positions count from the end
    #[test]
    fn prop_negative_get(seq in flags_strategy()) {
        let array = QaFlagArray::new(seq.clone());
        let last = array.value(-1).unwrap();
        prop_assert_eq!(last, seq[seq.len() - 1]);
    }

    /// Property: a code written at i reads back at i, other positions unchanged
    #[test]
    fn prop_set_then_get(
        seq in flags_strategy(),
        pick in any::<prop::sample::Index>(),
        code in code_strategy(),
    ) {
        let mut array = QaFlagArray::new(seq.clone());
        let i = pick.index(seq.len());
        array.set(&Key::Index(i as isize), FlagValue::from(code)).unwrap();

        prop_assert_eq!(array.value(i as isize).unwrap(), Some(code));
        for (j, original) in seq.iter().enumerate() {
            if j != i {
                prop_assert_eq!(array.as_slice()[j], *original);
            }
        }
    }

    /// Property: a single position never accepts an array value
    #[test]
    fn prop_scalar_set_with_array_fails(
        seq in flags_strategy(),
        pick in any::<prop::sample::Index>(),
        replacement in flags_strategy(),
    ) {
        let mut array = QaFlagArray::new(seq.clone());
        let i = pick.index(seq.len()) as isize;
        let result = array.set(&Key::Index(i), FlagValue::from(QaFlagArray::new(replacement)));

        match result {
            Err(Error::InvalidValue { message }) => {
                prop_assert_eq!(message, "cannot set a single element with an array");
            }
            other => prop_assert!(false, "unexpected result: {:?}", other),
        }
        prop_assert_eq!(array.as_slice(), seq.as_slice());
    }

    /// Property: a mask of the wrong length is rejected on get and set
    #[test]
    fn prop_mask_length_mismatch_fails(
        seq in flags_strategy(),
        mask in prop::collection::vec(any::<bool>(), 0..80),
    ) {
        prop_assume!(mask.len() != seq.len());
        let mut array = QaFlagArray::new(seq.clone());
        let key = Key::Mask(mask);

        let read_failed = matches!(array.get(&key), Err(Error::Validation { .. }));
        prop_assert!(read_failed);
        let write_failed = matches!(
            array.set(&key, FlagValue::from(QaCode::Auto)),
            Err(Error::Validation { .. })
        );
        prop_assert!(write_failed);
        prop_assert_eq!(array.as_slice(), seq.as_slice());
    }

    /// Property: a mask of the right length selects exactly the true positions
    #[test]
    fn prop_mask_selects_true_positions(
        pairs in prop::collection::vec((prop::option::of(code_strategy()), any::<bool>()), 1..64),
    ) {
        let (seq, mask): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        let array = QaFlagArray::new(seq.clone());
        let expected: Vec<_> = seq
            .iter()
            .zip(&mask)
            .filter(|(_, keep)| **keep)
            .map(|(flag, _)| *flag)
            .collect();

        match array.get(&Key::Mask(mask)).unwrap() {
            Element::Array(selected) => prop_assert_eq!(selected.as_slice(), expected.as_slice()),
            Element::Scalar(_) => prop_assert!(false, "mask key must read an array"),
        }
    }

    /// Property: arrow storage holds the same flags
    #[test]
    fn prop_arrow_storage_preserves_flags(seq in flags_strategy()) {
        let array = QaFlagArray::new(seq);
        let field = array.to_field("qa");
        let restored = QaFlagArray::from_arrow(&field, array.to_arrow().as_ref()).unwrap();
        prop_assert_eq!(restored, array);
    }

    /// Property: invalidating twice leaves the same state as invalidating once
    #[test]
    fn prop_invalidate_idempotent(values in prop::collection::vec(any::<i64>(), 1..32)) {
        let series = Series::new("v", Arc::new(Int64Array::from(values)));
        let mut table = QaTable::from_columns(vec![series]).unwrap();
        table.generate_qa().unwrap();

        table.invalidate_qa();
        let once = (table.qa().is_none(), table.qa_generated(), table.history_entries().len());
        table.invalidate_qa();
        let twice = (table.qa().is_none(), table.qa_generated(), table.history_entries().len());
        prop_assert_eq!(once, twice);
    }

    /// Property: row slices keep the requested number of rows, clamped to the table
    #[test]
    fn prop_slice_rows_length(
        values in prop::collection::vec(any::<i64>(), 0..32),
        start in 0usize..40,
        len in 0usize..40,
    ) {
        let rows = values.len();
        let series = Series::new("v", Arc::new(Int64Array::from(values)));
        let table = QaTable::from_columns(vec![series]).unwrap();
        let sliced = table.slice_rows(start..start + len).unwrap();

        let expected = (start + len).min(rows).saturating_sub(start.min(rows));
        prop_assert_eq!(sliced.num_rows(), expected);
    }
}
