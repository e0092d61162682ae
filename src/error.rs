//! Library error types.
//!
//! Construction of the registry is all-or-nothing: any `DatasetError` means
//! no registry exists. View selection errors leave the controller untouched.

use thiserror::Error;

/// Fatal, construction-time dataset errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatasetError {
    /// Malformed JSON, a missing table, a missing field or an unknown field.
    #[error("malformed dataset: {0}")]
    Malformed(String),

    #[error("cannot read dataset: {0}")]
    Io(String),

    #[error("table `{0}` must not be empty")]
    EmptyTable(&'static str),

    #[error("bad country code `{code}` in {table}")]
    BadCountryCode { table: &'static str, code: String },

    #[error("duplicate country `{0}`")]
    DuplicateCountry(String),

    #[error("bad collaboration pair label `{0}` (expected \"A-B\" with A <= B)")]
    BadPairLabel(String),

    #[error("duplicate collaboration pair `{0}`")]
    DuplicatePair(String),

    #[error("share {share} for `{label}` in {table} is outside [0, 100]")]
    ShareOutOfRange {
        table: &'static str,
        label: String,
        share: f64,
    },

    #[error("unparseable bin label `{label}` in {table}")]
    BadBinLabel { table: &'static str, label: String },

    #[error("bins in {table} are not contiguous at `{label}`: expected lower bound {expected}, found {found}")]
    BinGap {
        table: &'static str,
        label: String,
        expected: u64,
        found: u64,
    },

    #[error("bin `{label}` in {table} follows an open-ended bin")]
    BinAfterOpenEnd { table: &'static str, label: String },
}

impl From<serde_json::Error> for DatasetError {
    fn from(err: serde_json::Error) -> Self {
        DatasetError::Malformed(err.to_string())
    }
}

/// Section selection and section-config errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("unknown section `{0}`")]
    UnknownSection(String),

    #[error("section config is empty")]
    NoSections,

    #[error("section `{0}` is configured twice")]
    DuplicateSection(String),
}
