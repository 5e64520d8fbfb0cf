// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Malformed section marker at line {line}: {reason}")]
    MalformedMarker { line: usize, reason: String },

    #[error("Duplicate section label '{label}' at line {line}, renamed to '{renamed}'")]
    DuplicateLabel { line: usize, label: String, renamed: String },

    #[error("Ragged table row at line {line}: expected {expected} cells, found {found}")]
    RaggedRow { line: usize, expected: usize, found: usize },
}

impl ExtractError {
    /// Line the problem was found on.
    pub fn line(&self) -> usize {
        match self {
            ExtractError::MalformedMarker { line, .. }
            | ExtractError::DuplicateLabel { line, .. }
            | ExtractError::RaggedRow { line, .. } => *line,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid accession number: {0}")]
pub struct InvalidAccession(pub String);

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Unreadable input {path}: {reason}")]
    UnreadableInput { path: String, reason: String },

    #[error("Configuration error: {0}")]
    Accession(#[from] InvalidAccession),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_is_reported_for_located_errors() {
        let err = ExtractError::RaggedRow { line: 12, expected: 3, found: 2 };
        assert_eq!(err.line(), 12);
        assert_eq!(
            err.to_string(),
            "Ragged table row at line 12: expected 3 cells, found 2"
        );
    }

    #[test]
    fn test_app_error_wraps_accession_error() {
        let app: AppError = InvalidAccession("12-34".into()).into();
        assert_eq!(
            app.to_string(),
            "Configuration error: Invalid accession number: 12-34"
        );
    }
}
