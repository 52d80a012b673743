//! Error handling for Lumen
//!
//! Every failure path in the profile subsystem degrades to a smaller but
//! consistent in-memory state; nothing here is meant to abort the process.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Lumen operations
pub type Result<T> = std::result::Result<T, LumenError>;

/// How much of a document a decode failure affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// The document root could not be resolved; nothing was recovered.
    Fatal,
    /// A single layer could not be resolved; the rest of the document was kept.
    Partial,
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeErrorKind::Fatal => f.write_str("fatal"),
            DecodeErrorKind::Partial => f.write_str("partial"),
        }
    }
}

/// Main error type for Lumen operations
#[derive(Error, Debug)]
pub enum LumenError {
    // Decode Errors
    #[error("Failed to decode {path} ({kind}): {reason}")]
    Decode {
        path: PathBuf,
        kind: DecodeErrorKind,
        reason: String,
    },

    #[error("Corrupted profile {path} moved to {moved_to}")]
    Quarantined { path: PathBuf, moved_to: PathBuf },

    #[error("Invalid document schema version: {version}")]
    InvalidSchemaVersion { version: String },

    #[error("Migration failed from {from} to {to}: {reason}")]
    MigrationError {
        from: String,
        to: String,
        reason: String,
    },

    // File Errors
    #[error("Failed to read file: {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete file: {path}: {source}")]
    FileDelete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory creation failed: {path}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Registry Errors
    #[error("Type tag already registered: {tag}")]
    DuplicateTag { tag: String },

    #[error("Unknown type tag: {tag}")]
    UnknownTag { tag: String },

    // Profile Set Errors
    #[error("Profile not found: {id}")]
    ProfileNotFound { id: String },

    #[error("Invariant violation: {reason}")]
    InvariantViolation { reason: String },

    #[error("Lighting context has been closed")]
    ContextClosed,

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LumenError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            LumenError::Decode {
                kind: DecodeErrorKind::Fatal,
                ..
            } => "DECODE_FATAL",
            LumenError::Decode {
                kind: DecodeErrorKind::Partial,
                ..
            } => "DECODE_PARTIAL",
            LumenError::Quarantined { .. } => "QUARANTINED",
            LumenError::InvalidSchemaVersion { .. } => "INVALID_SCHEMA_VERSION",
            LumenError::MigrationError { .. } => "MIGRATION_ERROR",
            LumenError::FileRead { .. } => "IO_READ",
            LumenError::FileWrite { .. } => "IO_WRITE",
            LumenError::FileDelete { .. } => "IO_DELETE",
            LumenError::DirectoryCreate { .. } => "IO_WRITE",
            LumenError::DuplicateTag { .. } => "DUPLICATE_TAG",
            LumenError::UnknownTag { .. } => "UNKNOWN_TAG",
            LumenError::ProfileNotFound { .. } => "PROFILE_NOT_FOUND",
            LumenError::InvariantViolation { .. } => "INVARIANT_VIOLATION",
            LumenError::ContextClosed => "CONTEXT_CLOSED",
            LumenError::InvalidParameter { .. } => "INVALID_PARAMETER",
            LumenError::Io(_) => "IO_ERROR",
            LumenError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the caller can continue with a consistent state after this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, LumenError::ContextClosed)
    }

    /// Returns a user-facing recovery suggestion.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            LumenError::Quarantined { .. } => {
                Some("The corrupted file was kept next to the new default for inspection.")
            }
            LumenError::Decode { .. } => Some("The document was skipped; fix or remove it."),
            LumenError::FileWrite { .. } | LumenError::DirectoryCreate { .. } => {
                Some("Check permissions and free space; the next save will retry.")
            }
            LumenError::InvalidSchemaVersion { .. } => {
                Some("The document was written by a newer version of Lumen.")
            }
            LumenError::DuplicateTag { .. } => Some("The first registration was kept."),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = LumenError::Decode {
            path: PathBuf::from("default.json"),
            kind: DecodeErrorKind::Fatal,
            reason: "unknown profile kind".to_string(),
        };
        assert_eq!(err.error_code(), "DECODE_FATAL");

        let err = LumenError::DuplicateTag {
            tag: "solid_color".to_string(),
        };
        assert_eq!(err.error_code(), "DUPLICATE_TAG");
    }

    #[test]
    fn test_recovery_suggestions() {
        let err = LumenError::Quarantined {
            path: PathBuf::from("default.json"),
            moved_to: PathBuf::from("default.json.corrupted"),
        };
        assert!(err.recovery_suggestion().is_some());
        assert!(err.is_recoverable());
        assert!(!LumenError::ContextClosed.is_recoverable());
    }

    #[test]
    fn test_decode_message_names_kind() {
        let err = LumenError::Decode {
            path: PathBuf::from("p.json"),
            kind: DecodeErrorKind::Partial,
            reason: "bad layer".to_string(),
        };
        assert!(err.to_string().contains("partial"));
    }
}
