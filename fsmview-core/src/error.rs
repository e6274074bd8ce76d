//! Core error types.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which endpoint of a transition failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceRole {
    Source,
    Target,
    Trigger,
}

impl fmt::Display for ReferenceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceRole::Source => f.write_str("source state"),
            ReferenceRole::Target => f.write_str("target state"),
            ReferenceRole::Trigger => f.write_str("trigger"),
        }
    }
}

/// Errors from building, parsing and loading state machines.
#[derive(Debug, Error)]
pub enum FsmError {
    #[error("unknown state kind: '{kind}'")]
    UnknownKind { kind: String },

    #[error("unknown action kind: '{kind}'")]
    UnknownActionKind { kind: String },

    #[error("invalid transition '{transition}': {role} '{id}' not found")]
    InvalidReference {
        transition: String,
        role: ReferenceRole,
        id: String,
    },

    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FsmError {
    /// Returns a stable code for the error kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            FsmError::UnknownKind { .. } => "UNKNOWN_KIND",
            FsmError::UnknownActionKind { .. } => "UNKNOWN_KIND",
            FsmError::InvalidReference { .. } => "INVALID_REFERENCE",
            FsmError::NotFound { .. } => "NOT_FOUND",
            FsmError::Io(_) => "IO_ERROR",
        }
    }
}
