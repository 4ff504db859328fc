//! QA state shared by tables and series.
//!
//! Every QA object owns a live host value plus a [`QaState`]: the raw copy of
//! what it was built from, the lazily generated QA annotation and the history.
//! Structural operations never build their result directly; they go through
//! [`QaAnnotated::derive`], which hands the host-engine output to the
//! [`QaConstruct`] factory of the requested result type. That is what keeps a
//! column of a [`QaTable`](crate::QaTable) a [`QaSeries`](crate::QaSeries)
//! rather than a bare [`Series`].

use std::{fmt, sync::Arc};

use arrow::array::Array;

use crate::{
    array::QaFlagArray,
    code::QaCode,
    config::{DerivePolicy, QaOptions},
    error::Result,
    frame::{Series, Table},
    history::{History, HistoryEntry},
};

/// Produces QA flags for one column of raw data.
pub trait QaGenerator: Send + Sync {
    /// Short name used in logs and debug output.
    fn name(&self) -> &str;

    /// Flags for `values`, one per value.
    ///
    /// # Errors
    ///
    /// Returns an error when the column cannot be assessed.
    fn flag_column(&self, name: &str, values: &dyn Array) -> Result<QaFlagArray>;
}

/// Placeholder generator: every value is flagged [`QaCode::Orig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginalFlags;

impl QaGenerator for OriginalFlags {
    fn name(&self) -> &str {
        "original-flags"
    }

    fn flag_column(&self, _name: &str, values: &dyn Array) -> Result<QaFlagArray> {
        Ok(QaFlagArray::filled(values.len(), QaCode::Orig))
    }
}

/// Host values a QA object can wrap.
pub trait HostData: Clone + fmt::Debug {
    /// Human name of the container kind, used in history records.
    const KIND: &'static str;

    /// Renders the value as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be formatted.
    fn render(&self) -> Result<String>;
}

impl HostData for Table {
    const KIND: &'static str = "Table";

    fn render(&self) -> Result<String> {
        Table::render(self)
    }
}

impl HostData for Series {
    const KIND: &'static str = "Series";

    fn render(&self) -> Result<String> {
        Series::render(self)
    }
}

/// Raw copy and history handed from a source object to a derived one.
#[derive(Debug, Clone)]
pub struct Lineage<H> {
    /// Raw data of the derived object.
    pub raw: H,
    /// History of the derived object.
    pub history: History,
}

/// Auxiliary state of a QA object.
#[derive(Debug, Clone)]
pub struct QaState<H> {
    raw: H,
    qa: Option<H>,
    qa_generated: bool,
    history: History,
    options: QaOptions,
}

impl<H: HostData> QaState<H> {
    /// State of a newly constructed object: `raw` copied, QA unset, one
    /// "Initiated" record.
    pub fn new(raw: H, options: QaOptions) -> Self {
        Self {
            raw,
            qa: None,
            qa_generated: false,
            history: History::starting_with(format!("Initiated QA {}", H::KIND)),
            options,
        }
    }

    /// State of a derived object that inherits raw data and history.
    pub fn from_lineage(lineage: Lineage<H>, options: QaOptions) -> Self {
        Self {
            raw: lineage.raw,
            qa: None,
            qa_generated: false,
            history: lineage.history,
            options,
        }
    }

    fn invalidate(&mut self) {
        self.qa = None;
        self.qa_generated = false;
    }
}

/// Builds a QA object of a given type from host data.
pub trait QaConstruct: QaAnnotated + Sized {
    /// Wraps `data`. Without a lineage the object starts fresh, with `data`
    /// as its raw copy.
    fn construct(data: Self::Host, lineage: Option<Lineage<Self::Host>>, options: QaOptions)
        -> Self;
}

/// Type produced when one dimension is taken away (a table's row or column).
pub trait Sliced: QaAnnotated {
    /// The lower-dimensional QA type.
    type Sliced: QaConstruct;
}

/// Type produced when a dimension is added (a series as a one-column table).
pub trait ExpandDim: QaAnnotated {
    /// The higher-dimensional QA type.
    type Expanded: QaConstruct;
}

/// A host value carrying raw data, QA annotation and history.
pub trait QaAnnotated {
    /// The wrapped host type; also the shape of `raw` and of the annotation.
    type Host: HostData;

    /// The live data.
    fn data(&self) -> &Self::Host;

    /// The QA state.
    fn state(&self) -> &QaState<Self::Host>;

    /// The QA state, mutably.
    fn state_mut(&mut self) -> &mut QaState<Self::Host>;

    /// Computes the annotation of `raw`.
    ///
    /// # Errors
    ///
    /// Returns an error if the generator fails or returns a wrongly sized result.
    fn annotate(raw: &Self::Host, generator: &dyn QaGenerator) -> Result<Self::Host>;

    /// Returns the QA annotation, generating it from `raw` if it is not set.
    ///
    /// # Errors
    ///
    /// Returns an error if generation fails; the annotation stays unset.
    fn generate_qa(&mut self) -> Result<&Self::Host> {
        let state = self.state_mut();
        let qa = match state.qa.take() {
            Some(qa) if state.qa_generated => qa,
            _ => {
                let generator = Arc::clone(&state.options.generator);
                let qa = Self::annotate(&state.raw, generator.as_ref())?;
                tracing::info!(
                    kind = <Self::Host as HostData>::KIND,
                    generator = generator.name(),
                    "generated QA annotation"
                );
                qa
            }
        };
        state.qa_generated = true;
        Ok(state.qa.insert(qa))
    }

    /// Drops the QA annotation so that it is rebuilt on the next request.
    ///
    /// Raw data and history are left alone.
    fn invalidate_qa(&mut self) {
        tracing::debug!(kind = <Self::Host as HostData>::KIND, "invalidated QA annotation");
        self.state_mut().invalidate();
    }

    /// The cached annotation, if generated.
    fn qa(&self) -> Option<&Self::Host> {
        self.state().qa.as_ref()
    }

    /// True between generation and the next invalidation.
    fn qa_generated(&self) -> bool {
        self.state().qa_generated
    }

    /// The raw copy.
    fn raw(&self) -> &Self::Host {
        &self.state().raw
    }

    /// The options in effect.
    fn options(&self) -> &QaOptions {
        &self.state().options
    }

    /// History as newline-joined `<timestamp> - <message>` lines.
    fn history(&self) -> String {
        let state = self.state();
        state.history.render(&state.options.timestamp_format)
    }

    /// History entries in recording order.
    fn history_entries(&self) -> &[HistoryEntry] {
        self.state().history.entries()
    }

    /// Appends a record to the history.
    fn log(&mut self, message: impl Into<String>) {
        self.state_mut().history.record(message);
    }

    /// QA status line followed by the history block.
    fn render_qa(&self) -> String {
        let qa = match self.qa() {
            Some(qa) => match qa.render() {
                Ok(rendered) => format!("[QA]:\n{rendered}"),
                Err(e) => format!("[QA]: <unrenderable: {e}>"),
            },
            None => "[QA]: not set".to_string(),
        };
        let history = if self.state().history.is_empty() {
            "[History]: empty".to_string()
        } else {
            format!("[History]:\n{}", self.history())
        };
        format!("{qa}\n{history}")
    }

    /// Runs a structural operation and wraps its result through `T`'s factory.
    ///
    /// Under [`DerivePolicy::Inherit`] the same operation is applied to the raw
    /// copy and the history is carried over with a "Derived" record. If the
    /// raw copy no longer fits the operation (e.g. a column only added to the
    /// live data), the derived data becomes the raw copy and the history notes it.
    ///
    /// # Errors
    ///
    /// Returns the operation's error on the live data.
    fn derive<T, F>(&self, operation: &str, op: F) -> Result<T>
    where
        T: QaConstruct,
        F: Fn(&Self::Host) -> Result<T::Host>,
    {
        let data = op(self.data())?;
        let options = self.options().clone();
        let lineage = match options.derive_policy {
            DerivePolicy::Fresh => None,
            DerivePolicy::Inherit => {
                let mut history = self.state().history.clone();
                history.record(format!(
                    "Derived QA {} via {operation}",
                    <T::Host as HostData>::KIND
                ));
                let raw = match op(self.raw()) {
                    Ok(raw) => raw,
                    Err(e) => {
                        tracing::warn!(operation, error = %e, "raw copy does not follow operation");
                        history.record(format!("Raw copy restarted: {e}"));
                        data.clone()
                    }
                };
                Some(Lineage { raw, history })
            }
        };
        tracing::debug!(
            operation,
            from = <Self::Host as HostData>::KIND,
            to = <T::Host as HostData>::KIND,
            policy = %options.derive_policy,
            "derived QA object"
        );
        Ok(T::construct(data, lineage, options))
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::Int32Array;

    use super::*;

    #[test]
    fn test_original_flags_marks_everything_orig() {
        let values = Int32Array::from(vec![Some(1), None, Some(3)]);
        let flags = OriginalFlags.flag_column("v", &values).unwrap();
        assert_eq!(flags, QaFlagArray::filled(3, QaCode::Orig));
    }

    #[test]
    fn test_new_state_defaults() {
        let state = QaState::new(Table::empty(), QaOptions::default());
        assert!(state.qa.is_none());
        assert!(!state.qa_generated);
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history.entries()[0].message(), "Initiated QA Table");
    }

    #[test]
    fn test_lineage_state_keeps_history() {
        let mut history = History::starting_with("Initiated QA Series");
        history.record("Derived QA Series via slice 0..1");
        let state = QaState::from_lineage(
            Lineage {
                raw: Table::empty(),
                history,
            },
            QaOptions::default(),
        );
        assert_eq!(state.history.len(), 2);
    }
}
