//! Extension dtypes and the process-wide dtype registry.
//!
//! An extension dtype is stored in Arrow as a primitive storage array whose
//! field carries the `ARROW:extension:name` metadata key. The registry maps
//! those names back to their storage description so that any field read from
//! a [`RecordBatch`](arrow::array::RecordBatch) can be resolved to its dtype.

use std::{
    collections::HashMap,
    fmt,
    sync::{OnceLock, PoisonError, RwLock},
};

use arrow::datatypes::{DataType, Field};

use crate::{
    array::{ExtensionArray, QaFlagArray},
    code::QaCode,
    error::{Error, Result},
};

/// Arrow field metadata key naming an extension type.
pub const EXTENSION_NAME_KEY: &str = "ARROW:extension:name";

/// Descriptor of the storage implementation behind a dtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayType {
    /// Rust type implementing the array.
    pub name: &'static str,
    /// Arrow type the array is stored as.
    pub storage_type: DataType,
}

/// A custom column type the host engine can store and resolve by name.
pub trait ExtensionDtype: Copy + fmt::Debug + Send + Sync + 'static {
    /// The array type storing values of this dtype.
    type Array: ExtensionArray;

    /// Registered name of the dtype.
    const NAME: &'static str;

    /// Returns the registered name.
    fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Arrow storage type of the backing array.
    fn storage_type(&self) -> DataType;

    /// Canonical missing value.
    fn na_value(&self) -> <Self::Array as ExtensionArray>::Scalar;

    /// Resolves the dtype from its name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeConstruction`] when `s` is not the dtype's name.
    fn construct_from_string(s: &str) -> Result<Self>;

    /// Describes the storage implementation.
    fn construct_array_type(&self) -> ArrayType {
        ArrayType {
            name: std::any::type_name::<Self::Array>(),
            storage_type: self.storage_type(),
        }
    }

    /// Allocates an array of `len` missing values.
    fn construct_array(&self, len: usize) -> Self::Array;

    /// Builds an Arrow field of this dtype.
    fn field(&self, name: &str) -> Field {
        Field::new(name, self.storage_type(), true).with_metadata(HashMap::from([(
            EXTENSION_NAME_KEY.to_string(),
            Self::NAME.to_string(),
        )]))
    }
}

/// The `qacode` dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct QaFlagDtype;

impl ExtensionDtype for QaFlagDtype {
    type Array = QaFlagArray;

    const NAME: &'static str = "qacode";

    fn storage_type(&self) -> DataType {
        DataType::UInt8
    }

    fn na_value(&self) -> Option<QaCode> {
        None
    }

    fn construct_from_string(s: &str) -> Result<Self> {
        if s == Self::NAME {
            Ok(Self)
        } else {
            Err(Error::type_construction("QaFlagDtype", s))
        }
    }

    fn construct_array(&self, len: usize) -> QaFlagArray {
        QaFlagArray::missing(len)
    }
}

/// A dtype entry as held by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredDtype {
    /// Registered name.
    pub name: &'static str,
    /// Storage implementation.
    pub array_type: ArrayType,
}

type Registry = RwLock<HashMap<&'static str, RegisteredDtype>>;

static REGISTRY: OnceLock<Registry> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| {
        let qa = QaFlagDtype;
        let entry = RegisteredDtype {
            name: qa.name(),
            array_type: qa.construct_array_type(),
        };
        tracing::debug!(dtype = entry.name, "registered built-in extension dtype");
        RwLock::new(HashMap::from([(entry.name, entry)]))
    })
}

/// Registers a dtype process-wide.
///
/// Returns `true` when the dtype was newly registered and `false` when an
/// identical registration already existed.
///
/// # Errors
///
/// Returns [`Error::Registration`] if the name is already taken by a dtype
/// with different storage.
pub fn register_extension_dtype<D: ExtensionDtype>(dtype: D) -> Result<bool> {
    let entry = RegisteredDtype {
        name: dtype.name(),
        array_type: dtype.construct_array_type(),
    };

    let mut dtypes = registry().write().unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = dtypes.get(entry.name) {
        if *existing == entry {
            return Ok(false);
        }
        return Err(Error::registration(
            entry.name,
            format!(
                "already registered with storage {}",
                existing.array_type.storage_type
            ),
        ));
    }

    tracing::debug!(dtype = entry.name, "registered extension dtype");
    dtypes.insert(entry.name, entry);
    Ok(true)
}

/// Looks up a registered dtype by name.
pub fn registered_dtype(name: &str) -> Option<RegisteredDtype> {
    registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
        .cloned()
}

/// Resolves the extension dtype declared on an Arrow field, if any.
///
/// A field only resolves when its extension name is registered and its data
/// type matches the registered storage type.
pub fn dtype_of_field(field: &Field) -> Option<RegisteredDtype> {
    let name = field.metadata().get(EXTENSION_NAME_KEY)?;
    registered_dtype(name).filter(|dtype| dtype.array_type.storage_type == *field.data_type())
}

/// Returns true when the field is a `qacode` column.
pub fn is_qa_field(field: &Field) -> bool {
    dtype_of_field(field).is_some_and(|dtype| dtype.name == QaFlagDtype::NAME)
}
