//! Error handling for the loader.

pub mod util;

use std::io;
use std::path::PathBuf;

use arrow::error::ArrowError;

/// Server codes that mean "the thing you asked to create is already there"
const ALREADY_EXISTS_CODES: [i32; 3] = [
    48,    // NamespaceExists
    51002, // RoleAlreadyExists
    51003, // UserAlreadyExists
];

/// Specialized error type for the loader
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// Error opening or reading a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// File-level error with the offending path attached
    #[error("IO error for {}: {message}", .path.display())]
    File {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<io::Error>,
    },

    /// Error raised by an Arrow kernel or the CSV reader
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// The input header does not carry the expected columns
    #[error("Header error: {0}")]
    Header(String),

    /// A typed column or document does not match its declared schema
    #[error("Schema error: {0}")]
    Schema(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// A database command was rejected by the server
    #[error("Command failed (code {code}): {message}")]
    Command { code: i32, message: String },

    /// Transport or driver level database failure
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    /// The request handed to the store cannot be expressed as one command
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl LoaderError {
    /// Create a file error without an underlying IO source
    pub fn file(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::File {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Whether the error reports that a collection, role or user already exists
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        match self {
            Self::Command { code, message } => {
                ALREADY_EXISTS_CODES.contains(code) || message.contains("already exists")
            }
            _ => false,
        }
    }
}

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;
