//! The closed set of QA categories.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How a data value was derived.
///
/// The discriminant is the byte stored in the Arrow `UInt8` column that backs a
/// `qacode` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum QaCode {
    /// Original, unmodified value.
    Orig = 0,
    /// Automatically corrected value.
    Auto = 1,
    /// Manually corrected value.
    Manu = 2,
    /// Gap-filled value.
    Gapf = 3,
}

impl QaCode {
    /// All codes in storage order.
    pub const ALL: [Self; 4] = [Self::Orig, Self::Auto, Self::Manu, Self::Gapf];

    /// Stable lowercase name of the code.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Orig => "orig",
            Self::Auto => "auto",
            Self::Manu => "manu",
            Self::Gapf => "gapf",
        }
    }

    /// Storage byte of the code.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for QaCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QaCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| Error::invalid_type(format!("unknown QA code '{s}'")))
    }
}

impl TryFrom<u8> for QaCode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::ALL
            .get(usize::from(value))
            .copied()
            .ok_or_else(|| Error::invalid_value(format!("{value} is not a valid QA code byte")))
    }
}

impl From<QaCode> for u8 {
    fn from(code: QaCode) -> Self {
        code.as_u8()
    }
}
