//! Error types for qaframe.

use std::path::PathBuf;

/// Result type alias for qaframe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in qaframe operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A dtype could not be resolved from its name.
    #[error("Cannot construct a '{type_name}' from '{received}'")]
    TypeConstruction {
        /// The dtype that was asked to resolve the name.
        type_name: &'static str,
        /// The name string that was received.
        received: String,
    },

    /// A key or value of an unsupported type was passed.
    #[error("Type error: {message}")]
    InvalidType {
        /// Description of the offending type.
        message: String,
    },

    /// A value of the right type but unusable content was passed.
    #[error("Value error: {message}")]
    InvalidValue {
        /// Description of the offending value.
        message: String,
    },

    /// Index out of bounds when accessing an array, series or table.
    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// The requested index.
        index: i64,
        /// The actual length.
        len: usize,
    },

    /// A boolean mask or label set does not line up with the data.
    #[error("Validation error: {message}")]
    Validation {
        /// Description of the mismatch.
        message: String,
    },

    /// Column not found in schema.
    #[error("Column '{name}' not found in schema")]
    ColumnNotFound {
        /// The name of the missing column.
        name: String,
    },

    /// Columns that should share a shape or type do not.
    #[error("Schema mismatch: {message}")]
    SchemaMismatch {
        /// Description of the schema mismatch.
        message: String,
    },

    /// A dtype name was registered twice with different storage.
    #[error("Cannot register dtype '{name}': {message}")]
    Registration {
        /// The dtype name.
        name: String,
        /// Why the registration was refused.
        message: String,
    },

    /// Input held no record batches.
    #[error("Table input is empty")]
    EmptyTable,

    /// I/O error while reading tabular input.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        /// The path where the error occurred, if known.
        path: Option<PathBuf>,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Arrow error raised by the host table engine.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl Error {
    /// Create a dtype construction error.
    pub fn type_construction(type_name: &'static str, received: impl Into<String>) -> Self {
        Self::TypeConstruction {
            type_name,
            received: received.into(),
        }
    }

    /// Create a type error.
    pub fn invalid_type(message: impl Into<String>) -> Self {
        Self::InvalidType {
            message: message.into(),
        }
    }

    /// Create a value error.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            message: message.into(),
        }
    }

    /// Create an index out of bounds error.
    pub fn index_out_of_bounds(index: impl TryInto<i64>, len: usize) -> Self {
        Self::IndexOutOfBounds {
            index: index.try_into().unwrap_or(i64::MAX),
            len,
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a column not found error.
    pub fn column_not_found(name: impl Into<String>) -> Self {
        Self::ColumnNotFound { name: name.into() }
    }

    /// Create a schema mismatch error.
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
        }
    }

    /// Create a registration error.
    pub fn registration(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Registration {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error with a path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            path: Some(path.into()),
            source,
        }
    }
}
