//! Error types for the notedesk application.
//!
//! This module defines the error taxonomy shared by the persistence layer,
//! the note controller and the command-line front end.

use std::{fmt, io, path::PathBuf};

use thiserror::Error;

/// The kind of record an operation was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Note,
    Attachment,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Note => f.write_str("Note"),
            Entity::Attachment => f.write_str("Attachment"),
        }
    }
}

/// The main error type for the notedesk application.
#[derive(Error, Debug)]
pub enum NoteError {
    /// The requested note or attachment id does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: i64 },

    /// Any store-level failure, wrapped with the action that was attempted.
    #[error("Failed to {action}: {source}")]
    Persistence {
        action: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A caller-side precondition failed before the store was touched.
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    DirectoryError { path: PathBuf },

    /// file not found
    #[error("File not found: {file_path}")]
    FileNotFound { file_path: String },
}

impl NoteError {
    pub fn not_found(entity: Entity, id: i64) -> Self {
        NoteError::NotFound { entity, id }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        NoteError::Validation {
            message: message.into(),
        }
    }

    /// Returns true when the error means "no such record".
    pub fn is_not_found(&self) -> bool {
        matches!(self, NoteError::NotFound { .. })
    }
}

/// Builds a closure that wraps a store error with the attempted action.
///
/// Meant for `map_err`: `tx.execute(..).map_err(persistence("delete note"))?`.
pub fn persistence(action: &'static str) -> impl FnOnce(rusqlite::Error) -> NoteError {
    move |source| {
        log::error!("Store failure while trying to {}: {}", action, source);
        NoteError::Persistence {
            action: action.to_string(),
            source,
        }
    }
}

/// A physical file could not be removed or opened.
///
/// Never escalated into an operation failure: by the time one of these is
/// produced the authoritative store state has already been committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemWarning {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for FilesystemWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}
