//! QA series.

use std::{fmt, ops::Range};

use arrow::array::{ArrayRef, BooleanArray};

use crate::{
    annotated::{ExpandDim, Lineage, QaAnnotated, QaConstruct, QaGenerator, QaState},
    array::{ExtensionArray, Key, QaFlagArray},
    config::QaOptions,
    error::{Error, Result},
    frame::Series,
    table::QaTable,
};

/// A [`Series`] with a raw copy, QA flags and a history.
#[derive(Debug, Clone)]
pub struct QaSeries {
    data: Series,
    state: QaState<Series>,
}

impl QaSeries {
    /// Wraps a series with default options.
    pub fn new(data: Series) -> Self {
        Self::with_options(data, QaOptions::default())
    }

    /// Wraps a series.
    pub fn with_options(data: Series, options: QaOptions) -> Self {
        Self::construct(data, None, options)
    }

    /// Wraps an Arrow array under `name` with default row labels.
    pub fn from_array(name: impl Into<String>, values: ArrayRef) -> Self {
        Self::new(Series::new(name, values))
    }

    /// Wraps QA flags as a `qacode` series.
    pub fn from_flags(name: impl Into<String>, flags: &QaFlagArray) -> Self {
        Self::new(Series::from_flags(name, flags))
    }

    /// Consumes the QA series, returning the live series.
    pub fn into_inner(self) -> Series {
        self.data
    }

    /// Series name.
    pub fn name(&self) -> &str {
        self.data.name()
    }

    /// Row labels.
    pub fn index(&self) -> &[String] {
        self.data.index()
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the series is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Values selected by `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not resolve against the values.
    pub fn select(&self, key: &Key) -> Result<Self> {
        self.derive(&format!("select {key:?}"), |s| s.select(key))
    }

    /// Values in `range`, clamped to the series.
    ///
    /// # Errors
    ///
    /// Infallible on the live data; kept fallible like every derivation.
    pub fn slice(&self, range: Range<usize>) -> Result<Self> {
        self.derive(&format!("slice {range:?}"), |s| Ok(s.slice(range.clone())))
    }

    /// Values at `positions`, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] for positions outside the series.
    pub fn take(&self, positions: &[isize]) -> Result<Self> {
        self.derive(&format!("take {positions:?}"), |s| s.take(positions))
    }

    /// Values where `mask` is true.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the mask is not one entry per value.
    pub fn filter(&self, mask: &BooleanArray) -> Result<Self> {
        self.derive("filter", |s| s.filter(mask))
    }

    /// The first `n` values.
    ///
    /// # Errors
    ///
    /// Infallible on the live data; kept fallible like every derivation.
    pub fn head(&self, n: usize) -> Result<Self> {
        self.derive(&format!("head {n}"), |s| Ok(s.head(n)))
    }

    /// This series as a one-column QA table.
    ///
    /// # Errors
    ///
    /// Returns an error if the values cannot form a table column.
    pub fn to_frame(&self) -> Result<<Self as ExpandDim>::Expanded> {
        self.derive("to_frame", Series::to_frame)
    }

    /// Replaces the live values, keeping name and labels.
    ///
    /// The raw copy is left untouched; the change is recorded and the QA
    /// annotation invalidated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] if the length changes, and
    /// [`Error::InvalidValue`] if a `qacode` series receives bytes that are not codes.
    pub fn set_values(&mut self, values: ArrayRef) -> Result<()> {
        self.data = self.data.with_values(values)?;
        self.log(format!("Set values of '{}'", self.data.name()));
        self.invalidate_qa();
        Ok(())
    }

    /// Reads the live values as QA flags.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidType`] if the series is not `qacode`.
    pub fn flags(&self) -> Result<QaFlagArray> {
        self.data.flags()
    }

    /// Formats one live value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] for positions outside the series.
    pub fn value_string(&self, position: isize) -> Result<String> {
        self.data.value_string(position)
    }
}

impl QaAnnotated for QaSeries {
    type Host = Series;

    fn data(&self) -> &Series {
        &self.data
    }

    fn state(&self) -> &QaState<Series> {
        &self.state
    }

    fn state_mut(&mut self) -> &mut QaState<Series> {
        &mut self.state
    }

    fn annotate(raw: &Series, generator: &dyn QaGenerator) -> Result<Series> {
        let flags = generator.flag_column(raw.name(), raw.values().as_ref())?;
        if flags.len() != raw.len() {
            return Err(Error::schema_mismatch(format!(
                "generator '{}' returned {} flags for {} values of series '{}'",
                generator.name(),
                flags.len(),
                raw.len(),
                raw.name()
            )));
        }
        Series::from_flags(raw.name(), &flags).with_index(raw.index().to_vec())
    }
}

impl QaConstruct for QaSeries {
    fn construct(data: Series, lineage: Option<Lineage<Series>>, options: QaOptions) -> Self {
        let state = match lineage {
            Some(lineage) => QaState::from_lineage(lineage, options),
            None => {
                tracing::info!(name = data.name(), len = data.len(), "QA series created");
                QaState::new(data.clone(), options)
            }
        };
        Self { data, state }
    }
}

impl ExpandDim for QaSeries {
    type Expanded = QaTable;
}

impl fmt::Display for QaSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data.render() {
            Ok(series) => write!(f, "{series}")?,
            Err(e) => write!(f, "<unrenderable series: {e}>")?,
        }
        write!(f, "\n\n{}", self.render_qa())
    }
}
