//! qaframe - QA-flag annotated tables and series on Apache Arrow
//!
//! Wraps Arrow tables and arrays so that every value can carry a quality
//! assurance code, and every object keeps a raw copy of what it was built
//! from plus a timestamped history of what happened to it.
//!
//! # Building blocks
//!
//! 1. **[`QaCode`]** - the four flag codes (`orig`, `auto`, `manu`, `gapf`)
//! 2. **[`QaFlagDtype`] / [`QaFlagArray`]** - the `qacode` extension type,
//!    stored as nullable `UInt8` with Arrow extension metadata
//! 3. **[`QaTable`] / [`QaSeries`]** - annotated containers; structural
//!    operations keep returning annotated containers
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use arrow::array::Float64Array;
//! use qaframe::{QaAnnotated, QaCode, QaSeries, QaTable, Series};
//!
//! let mut table = QaTable::from_columns(vec![Series::new(
//!     "temperature",
//!     Arc::new(Float64Array::from(vec![12.5, 13.0, 12.8])),
//! )])
//! .unwrap();
//!
//! let column: QaSeries = table.column("temperature").unwrap();
//! assert_eq!(column.len(), 3);
//!
//! let qa = table.generate_qa().unwrap();
//! let flags = qa.column("temperature").unwrap().flags().unwrap();
//! assert_eq!(flags.value(0).unwrap(), Some(QaCode::Orig));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
// Allow common test patterns
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::cast_possible_wrap,
        clippy::float_cmp,
        clippy::redundant_clone,
        clippy::too_many_lines
    )
)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]

pub mod annotated;
pub mod array;
pub mod code;
pub mod config;
pub mod dtype;
pub mod error;
pub mod frame;
pub mod history;
pub mod series;
pub mod table;
pub mod transform;

// Re-exports for convenience
pub use annotated::{ExpandDim, OriginalFlags, QaAnnotated, QaConstruct, QaGenerator, Sliced};
pub use array::{Element, ExtensionArray, FlagValue, Key, QaFlagArray};
pub use code::QaCode;
pub use config::{DerivePolicy, QaOptions};
pub use dtype::{register_extension_dtype, registered_dtype, ExtensionDtype, QaFlagDtype};
pub use error::{Error, Result};
pub use frame::{Series, Table};
pub use history::{History, HistoryEntry};
pub use series::QaSeries;
pub use table::QaTable;
pub use transform::{
    Chain, Drop, Filter, FlagMissing, FlagRows, Rename, Select, Skip, Take, Transform,
};
