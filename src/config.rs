//! Options carried by QA tables and series.

use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    annotated::{OriginalFlags, QaGenerator},
    error::{Error, Result},
    history::DEFAULT_TIMESTAMP_FORMAT,
};

/// What a structural operation hands on to the object it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivePolicy {
    /// The result is a new QA subject: its raw copy is the derived data and its
    /// history starts over.
    #[default]
    Fresh,
    /// The result's raw copy is the source's raw copy put through the same
    /// operation, and the source's history is carried over and extended.
    Inherit,
}

impl fmt::Display for DerivePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fresh => write!(f, "fresh"),
            Self::Inherit => write!(f, "inherit"),
        }
    }
}

impl FromStr for DerivePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fresh" => Ok(Self::Fresh),
            "inherit" => Ok(Self::Inherit),
            other => Err(Error::invalid_value(format!(
                "unknown derive policy '{other}', expected 'fresh' or 'inherit'"
            ))),
        }
    }
}

/// Options for QA tables and series.
///
/// Derived objects carry the options of their source.
#[derive(Clone)]
pub struct QaOptions {
    /// Propagation of raw data and history to derived objects.
    pub derive_policy: DerivePolicy,
    /// `strftime` layout of history timestamps.
    pub timestamp_format: String,
    /// Produces the QA annotation from raw data.
    pub generator: Arc<dyn QaGenerator>,
}

impl Default for QaOptions {
    fn default() -> Self {
        Self {
            derive_policy: DerivePolicy::default(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            generator: Arc::new(OriginalFlags),
        }
    }
}

impl fmt::Debug for QaOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QaOptions")
            .field("derive_policy", &self.derive_policy)
            .field("timestamp_format", &self.timestamp_format)
            .field("generator", &self.generator.name())
            .finish()
    }
}

impl QaOptions {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the derive policy.
    #[must_use]
    pub fn with_derive_policy(mut self, policy: DerivePolicy) -> Self {
        self.derive_policy = policy;
        self
    }

    /// Sets the history timestamp layout.
    #[must_use]
    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    /// Sets the QA generator.
    #[must_use]
    pub fn with_generator(mut self, generator: impl QaGenerator + 'static) -> Self {
        self.generator = Arc::new(generator);
        self
    }
}
