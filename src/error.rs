//! Custom error types for SheetKeep
//!
//! This module defines the error hierarchy for the storage layer using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for SheetKeep operations
#[derive(Error, Debug)]
pub enum SheetError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors (unknown or missing columns, bad names)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Record ordinal outside the loaded table
    #[error("Row {ordinal} is out of range (table has {row_count} rows)")]
    OutOfRange { ordinal: i64, row_count: usize },

    /// Duplicate entity errors
    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: &'static str,
        identifier: String,
    },

    /// Workbook lock could not be acquired in time
    #[error("Workbook is locked: {0}")]
    Locked(String),

    /// Export errors
    #[error("Export error: {0}")]
    Export(String),
}

impl SheetError {
    /// Create a "not found" error for tables
    pub fn table_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Table",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for snapshots
    pub fn snapshot_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Snapshot",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for files
    pub fn file_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "File",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for records addressed by id
    pub fn record_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Record",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for journaled mutations
    pub fn mutation_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Mutation",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    ///
    /// An out-of-range ordinal counts: the addressed record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::OutOfRange { .. })
    }

    /// Check if this is an out-of-range ordinal
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::OutOfRange { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for SheetError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SheetError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<csv::Error> for SheetError {
    fn from(err: csv::Error) -> Self {
        Self::Export(err.to_string())
    }
}

/// Result type alias for SheetKeep operations
pub type SheetResult<T> = Result<T, SheetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SheetError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_not_found_error() {
        let err = SheetError::table_not_found("Despesas");
        assert_eq!(err.to_string(), "Table not found: Despesas");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_out_of_range_error() {
        let err = SheetError::OutOfRange {
            ordinal: 10,
            row_count: 5,
        };
        assert_eq!(
            err.to_string(),
            "Row 10 is out of range (table has 5 rows)"
        );
        assert!(err.is_out_of_range());
        assert!(err.is_not_found());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let sheet_err: SheetError = io_err.into();
        assert!(matches!(sheet_err, SheetError::Io(_)));
    }
}
