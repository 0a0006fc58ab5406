//! Error types for the font patcher.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for container, codec and patch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid magic bytes at start of a container file
    #[error("Invalid container file: expected FPAC magic bytes")]
    InvalidMagic,

    /// Unsupported container format version
    #[error("Unsupported container format version: {0}")]
    UnsupportedVersion(u16),

    /// File or record is truncated
    #[error("Unexpected end of data at position {0}")]
    UnexpectedEof(u64),

    /// The structured description lacks a field the schema requires
    #[error("Missing field {field} of {parent} in structured description")]
    SchemaMismatch { field: String, parent: String },

    /// A value in the structured description cannot be coerced to the schema kind
    #[error("Field {field}: expected {expected}")]
    ValueTypeMismatch { field: String, expected: String },

    /// Schema feature the encoder does not implement
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// Container metadata disagrees with decoded record contents
    #[error("Corrupt container: {0}")]
    CorruptContainer(String),

    /// Reference from one container into a container it cannot depend on
    #[error("Invalid cross reference from {from} to {to}")]
    InvalidCrossReference { from: String, to: String },

    /// Operation would make a record depend on a container outside its reach
    #[error("Cross-container reference not allowed: {0}")]
    CrossContainerNotAllowed(String),

    /// Wrong record class supplied where a specific one is required
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Raw payload does not satisfy a precondition
    #[error("Unsupported payload shape: {0}")]
    UnsupportedPayloadShape(String),

    /// Length or count does not fit the field that stores it
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// Record, type or entry lookup miss
    #[error("Not found: {0}")]
    NotFound(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse error in a manifest or structured description
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create a corrupt container error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptContainer(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub(crate) fn value_type(field: &str, expected: impl Into<String>) -> Self {
        Self::ValueTypeMismatch {
            field: field.to_string(),
            expected: expected.into(),
        }
    }
}

/// Result type alias for font patcher operations.
pub type Result<T> = std::result::Result<T, Error>;
