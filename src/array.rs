//! Element-addressable extension arrays.
//!
//! [`QaFlagArray`] is the storage behind the `qacode` dtype. It owns one
//! `Option<QaCode>` per position, `None` being the only representation of a
//! missing flag, and converts to and from Arrow `UInt8` arrays so that QA
//! columns live inside ordinary [`RecordBatch`](arrow::array::RecordBatch)es.

use std::{
    collections::BTreeMap,
    fmt,
    ops::{Range, RangeFrom, RangeFull, RangeTo},
    sync::Arc,
};

use arrow::{
    array::{Array, ArrayRef, AsArray, BooleanArray, UInt8Array},
    compute::cast,
    datatypes::{DataType, Field, Int64Type, UInt8Type},
};

use crate::{
    code::QaCode,
    dtype::{is_qa_field, ExtensionDtype, QaFlagDtype},
    error::{Error, Result},
};

/// Spellings accepted as a missing flag when parsing text.
const MISSING_SPELLINGS: [&str; 6] = ["", "nan", "na", "<na>", "null", "none"];

/// Addresses one or more positions of an array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// A single position; negative values count from the end.
    Index(isize),
    /// A half-open range, clamped to the array length.
    Slice(Range<usize>),
    /// Explicit positions in the order given; negative values count from the end.
    Positions(Vec<isize>),
    /// A boolean mask that must be exactly as long as the array.
    Mask(Vec<bool>),
}

impl Key {
    /// Converts an Arrow indexer into a key.
    ///
    /// Boolean arrays become masks (null counts as `false`), integer arrays
    /// become positions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidType`] for any other Arrow type and
    /// [`Error::InvalidValue`] for integer indexers containing nulls.
    pub fn from_arrow(indexer: &dyn Array) -> Result<Self> {
        match indexer.data_type() {
            DataType::Boolean => {
                let mask = indexer.as_boolean();
                Ok(Self::Mask(
                    (0..mask.len())
                        .map(|i| mask.is_valid(i) && mask.value(i))
                        .collect(),
                ))
            }
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => {
                if indexer.null_count() > 0 {
                    return Err(Error::invalid_value(
                        "cannot index with an integer indexer containing missing values",
                    ));
                }
                let positions = cast(indexer, &DataType::Int64)?;
                if positions.null_count() > 0 {
                    return Err(Error::invalid_value("integer indexer does not fit in i64"));
                }
                positions
                    .as_primitive::<Int64Type>()
                    .values()
                    .iter()
                    .map(|&p| {
                        isize::try_from(p).map_err(|_| Error::index_out_of_bounds(p, usize::MAX))
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(Self::Positions)
            }
            other => Err(Error::invalid_type(format!(
                "index type not supported: {other}"
            ))),
        }
    }

    /// True for keys that address a single position.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Index(_))
    }

    /// Resolves the key against an array of length `len`.
    pub(crate) fn resolve(&self, len: usize) -> Result<Addressed> {
        match self {
            Self::Index(index) => normalize(*index, len).map(Addressed::Single),
            Self::Slice(range) => {
                let start = range.start.min(len);
                let end = range.end.clamp(start, len);
                Ok(Addressed::Many((start..end).collect()))
            }
            Self::Positions(positions) => positions
                .iter()
                .map(|&p| normalize(p, len))
                .collect::<Result<Vec<_>>>()
                .map(Addressed::Many),
            Self::Mask(mask) => {
                if mask.len() != len {
                    return Err(Error::validation(format!(
                        "boolean mask of length {} does not match array length {len}",
                        mask.len()
                    )));
                }
                Ok(Addressed::Many(
                    mask.iter()
                        .enumerate()
                        .filter_map(|(i, &keep)| keep.then_some(i))
                        .collect(),
                ))
            }
        }
    }
}

/// Resolves a possibly negative position against `len`.
pub(crate) fn normalize(index: isize, len: usize) -> Result<usize> {
    let resolved = if index < 0 {
        len.checked_sub(index.unsigned_abs())
    } else {
        Some(index.unsigned_abs()).filter(|&i| i < len)
    };
    resolved.ok_or_else(|| Error::index_out_of_bounds(index, len))
}

/// Positions addressed by a resolved [`Key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Addressed {
    Single(usize),
    Many(Vec<usize>),
}

impl From<isize> for Key {
    fn from(index: isize) -> Self {
        Self::Index(index)
    }
}

impl From<Range<usize>> for Key {
    fn from(range: Range<usize>) -> Self {
        Self::Slice(range)
    }
}

impl From<RangeFrom<usize>> for Key {
    fn from(range: RangeFrom<usize>) -> Self {
        Self::Slice(range.start..usize::MAX)
    }
}

impl From<RangeTo<usize>> for Key {
    fn from(range: RangeTo<usize>) -> Self {
        Self::Slice(0..range.end)
    }
}

impl From<RangeFull> for Key {
    fn from(_: RangeFull) -> Self {
        Self::Slice(0..usize::MAX)
    }
}

impl From<Vec<isize>> for Key {
    fn from(positions: Vec<isize>) -> Self {
        Self::Positions(positions)
    }
}

impl From<Vec<bool>> for Key {
    fn from(mask: Vec<bool>) -> Self {
        Self::Mask(mask)
    }
}

/// A value written into a [`QaFlagArray`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    /// Element-wise values for a multi-position key.
    Array(QaFlagArray),
    /// A single code, broadcast over multi-position keys.
    Code(QaCode),
    /// The missing flag.
    Missing,
}

impl FlagValue {
    /// Parses a code name or a missing-value spelling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidType`] naming the text when it is neither.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if MISSING_SPELLINGS
            .iter()
            .any(|m| trimmed.eq_ignore_ascii_case(m))
        {
            return Ok(Self::Missing);
        }
        trimmed.parse::<QaCode>().map(Self::Code).map_err(|_| {
            Error::invalid_type(format!(
                "Value should be either a QaCode or missing, got '{text}'"
            ))
        })
    }
}

impl From<QaCode> for FlagValue {
    fn from(code: QaCode) -> Self {
        Self::Code(code)
    }
}

impl From<Option<QaCode>> for FlagValue {
    fn from(code: Option<QaCode>) -> Self {
        code.map_or(Self::Missing, Self::Code)
    }
}

impl From<QaFlagArray> for FlagValue {
    fn from(array: QaFlagArray) -> Self {
        Self::Array(array)
    }
}

impl TryFrom<f64> for FlagValue {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        if value.is_nan() {
            Ok(Self::Missing)
        } else {
            Err(Error::invalid_type(format!(
                "Value should be either a QaCode or missing, got {value}"
            )))
        }
    }
}

/// Result of reading an array by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element<S, A> {
    /// A single element, for integer keys.
    Scalar(S),
    /// A new array of the selected elements, for every other key.
    Array(A),
}

/// Capabilities the host engine needs from custom column storage.
pub trait ExtensionArray: Sized {
    /// The dtype describing this array.
    type Dtype: ExtensionDtype;
    /// A single element, including the missing sentinel.
    type Scalar;
    /// What [`ExtensionArray::set`] accepts.
    type Value;

    /// Returns the dtype.
    fn dtype(&self) -> Self::Dtype;

    /// Number of elements.
    fn len(&self) -> usize;

    /// True when the array holds no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads one element or a sub-array.
    ///
    /// # Errors
    ///
    /// Returns an error for out-of-range positions or a mask of the wrong length.
    fn get(&self, key: &Key) -> Result<Element<Self::Scalar, Self>>;

    /// Writes the addressed positions. Nothing is written when an error is returned.
    ///
    /// # Errors
    ///
    /// Returns an error when the key or value is rejected.
    fn set(&mut self, key: &Key, value: Self::Value) -> Result<()>;

    /// Marks the missing positions.
    fn isna(&self) -> BooleanArray;

    /// Converts to the Arrow storage array.
    fn to_arrow(&self) -> ArrayRef;

    /// Reads the array back from an Arrow column of this dtype.
    ///
    /// # Errors
    ///
    /// Returns an error when the field is not of this dtype or holds invalid values.
    fn from_arrow(field: &Field, array: &dyn Array) -> Result<Self>;
}

/// A fixed-length, nullable array of [`QaCode`]s.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QaFlagArray {
    data: Vec<Option<QaCode>>,
}

impl QaFlagArray {
    /// Creates an array from flags, `None` marking missing positions.
    pub fn new(data: Vec<Option<QaCode>>) -> Self {
        Self { data }
    }

    /// Creates an array of `len` missing flags.
    pub fn missing(len: usize) -> Self {
        Self {
            data: vec![None; len],
        }
    }

    /// Creates an array with every position set to `code`.
    pub fn filled(len: usize, code: QaCode) -> Self {
        Self {
            data: vec![Some(code); len],
        }
    }

    /// Reads the arrow storage of a `qacode` column without checking field metadata.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if a byte is not a valid code.
    pub fn from_storage(storage: &UInt8Array) -> Result<Self> {
        storage
            .iter()
            .map(|byte| byte.map(QaCode::try_from).transpose())
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    /// Iterates over the flags.
    pub fn iter(&self) -> impl Iterator<Item = Option<QaCode>> + '_ {
        self.data.iter().copied()
    }

    /// The flags as a slice.
    pub fn as_slice(&self) -> &[Option<QaCode>] {
        &self.data
    }

    /// Reads a single flag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index` is out of range.
    pub fn value(&self, index: isize) -> Result<Option<QaCode>> {
        normalize(index, self.len()).map(|i| self.data[i])
    }

    /// Selects the addressed flags into a new array, integer keys included.
    ///
    /// # Errors
    ///
    /// Returns an error when the key does not resolve against this array.
    pub fn take(&self, key: &Key) -> Result<Self> {
        Ok(match key.resolve(self.len())? {
            Addressed::Single(i) => Self::new(vec![self.data[i]]),
            Addressed::Many(positions) => positions.into_iter().map(|i| self.data[i]).collect(),
        })
    }

    /// Number of missing flags.
    pub fn null_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_none()).count()
    }

    /// Occurrences of each code present in the array.
    pub fn value_counts(&self) -> BTreeMap<QaCode, usize> {
        let mut counts = BTreeMap::new();
        for code in self.data.iter().flatten() {
            *counts.entry(*code).or_insert(0) += 1;
        }
        counts
    }

    /// Builds the Arrow field for a column holding this array.
    pub fn to_field(&self, name: &str) -> Field {
        self.dtype().field(name)
    }

    /// Consumes the array, returning the flags.
    pub fn into_inner(self) -> Vec<Option<QaCode>> {
        self.data
    }
}

impl ExtensionArray for QaFlagArray {
    type Dtype = QaFlagDtype;
    type Scalar = Option<QaCode>;
    type Value = FlagValue;

    fn dtype(&self) -> QaFlagDtype {
        QaFlagDtype
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn get(&self, key: &Key) -> Result<Element<Option<QaCode>, Self>> {
        Ok(match key.resolve(self.len())? {
            Addressed::Single(i) => Element::Scalar(self.data[i]),
            Addressed::Many(positions) => {
                Element::Array(positions.into_iter().map(|i| self.data[i]).collect())
            }
        })
    }

    fn set(&mut self, key: &Key, value: FlagValue) -> Result<()> {
        if key.is_scalar() && matches!(value, FlagValue::Array(_)) {
            return Err(Error::invalid_value(
                "cannot set a single element with an array",
            ));
        }

        let addressed = key.resolve(self.len())?;
        let positions = match addressed {
            Addressed::Single(i) => vec![i],
            Addressed::Many(positions) => positions,
        };

        match value {
            FlagValue::Array(values) => {
                if values.len() != positions.len() {
                    return Err(Error::invalid_value(format!(
                        "cannot set {} elements from an array of length {}",
                        positions.len(),
                        values.len()
                    )));
                }
                for (position, flag) in positions.into_iter().zip(values.data) {
                    self.data[position] = flag;
                }
            }
            FlagValue::Code(code) => positions
                .into_iter()
                .for_each(|position| self.data[position] = Some(code)),
            FlagValue::Missing => positions
                .into_iter()
                .for_each(|position| self.data[position] = None),
        }
        Ok(())
    }

    fn isna(&self) -> BooleanArray {
        self.data.iter().map(|v| Some(v.is_none())).collect()
    }

    fn to_arrow(&self) -> ArrayRef {
        Arc::new(
            self.data
                .iter()
                .map(|v| v.map(QaCode::as_u8))
                .collect::<UInt8Array>(),
        )
    }

    fn from_arrow(field: &Field, array: &dyn Array) -> Result<Self> {
        if !is_qa_field(field) {
            return Err(Error::invalid_type(format!(
                "column '{}' of type {} is not a qacode column",
                field.name(),
                field.data_type()
            )));
        }
        let storage = array.as_primitive_opt::<UInt8Type>().ok_or_else(|| {
            Error::invalid_type(format!(
                "column '{}' is declared qacode but stored as {}",
                field.name(),
                array.data_type()
            ))
        })?;
        Self::from_storage(storage)
    }
}

impl FromIterator<Option<QaCode>> for QaFlagArray {
    fn from_iter<I: IntoIterator<Item = Option<QaCode>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl FromIterator<QaCode> for QaFlagArray {
    fn from_iter<I: IntoIterator<Item = QaCode>>(iter: I) -> Self {
        iter.into_iter().map(Some).collect()
    }
}

impl fmt::Display for QaFlagArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<&str> = self
            .data
            .iter()
            .map(|v| v.map_or("<NA>", QaCode::as_str))
            .collect();
        write!(
            f,
            "<QaFlagArray>\n[{}]\nLength: {}, dtype: {}",
            items.join(", "),
            self.len(),
            QaFlagDtype::NAME
        )
    }
}
