//! Error types for dictionary synchronization

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Lookup table or entity family a missing reference belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Class,
    Datatype,
    MapType,
    Source,
    Concept,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReferenceKind::Class => "concept class",
            ReferenceKind::Datatype => "concept datatype",
            ReferenceKind::MapType => "concept map type",
            ReferenceKind::Source => "concept reference source",
            ReferenceKind::Concept => "concept",
        };
        f.write_str(label)
    }
}

/// Main error type for synchronization runs
#[derive(Debug, Error)]
pub enum SyncError {
    /// A class, datatype, map type, source or concept lookup missed
    #[error("{kind} not found: '{key}'")]
    ReferenceNotFound { kind: ReferenceKind, key: String },

    /// A mapping's source concept was never reconciled in this run
    #[error("Mapping source concept {id} has not been synchronized ({url})")]
    UnknownFromConcept { id: i64, url: String },

    /// An internal mapping's target concept was never reconciled in this run
    #[error("Mapping target concept {id} has not been synchronized ({url})")]
    UnknownToConcept { id: i64, url: String },

    /// The single-concept filter matched nothing in the concept file
    #[error("Concept {id} is not present in the concept file")]
    ConceptNotFound { id: i64 },

    /// Reference source missing from the source directory or the remote catalog
    #[error("Unrecognized source: {message}")]
    UnrecognizedSource { message: String },

    /// An input line could not be turned into a typed record
    #[error("Malformed record at {}:{line}: {message}", file.display())]
    MalformedRecord {
        file: PathBuf,
        line: usize,
        message: String,
    },

    /// Configuration loading or validation errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Record store failures
    #[error("Store error: {message}")]
    StoreError { message: String },

    /// Catalog HTTP transport failures
    #[error("HTTP error: {message}")]
    HttpError { message: String },

    /// File system I/O errors
    #[error("IO error for path '{}': {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ReferenceNotFound,
    UnknownFromConcept,
    UnknownToConcept,
    ConceptNotFound,
    UnrecognizedSource,
    MalformedRecord,
    Config,
    Store,
    Http,
    Io,
}

impl SyncError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::ReferenceNotFound { .. } => ErrorKind::ReferenceNotFound,
            SyncError::UnknownFromConcept { .. } => ErrorKind::UnknownFromConcept,
            SyncError::UnknownToConcept { .. } => ErrorKind::UnknownToConcept,
            SyncError::ConceptNotFound { .. } => ErrorKind::ConceptNotFound,
            SyncError::UnrecognizedSource { .. } => ErrorKind::UnrecognizedSource,
            SyncError::MalformedRecord { .. } => ErrorKind::MalformedRecord,
            SyncError::ConfigError { .. } => ErrorKind::Config,
            SyncError::StoreError { .. } => ErrorKind::Store,
            SyncError::HttpError { .. } => ErrorKind::Http,
            SyncError::IoError { .. } => ErrorKind::Io,
        }
    }

    /// Create a missing reference error
    pub fn reference_not_found(kind: ReferenceKind, key: impl Into<String>) -> Self {
        Self::ReferenceNotFound {
            kind,
            key: key.into(),
        }
    }

    /// Create a malformed record error
    pub fn malformed(file: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    /// Create an unrecognized source error
    pub fn unrecognized_source(message: impl Into<String>) -> Self {
        Self::UnrecognizedSource {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a store error
    pub fn store_error(message: impl Into<String>) -> Self {
        Self::StoreError {
            message: message.into(),
        }
    }

    /// Create an IO error with path context
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<rusqlite::Error> for SyncError {
    fn from(err: rusqlite::Error) -> Self {
        Self::StoreError {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        Self::HttpError {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_not_found_message() {
        let err = SyncError::reference_not_found(ReferenceKind::Class, "Diagnosis");
        assert_eq!(err.to_string(), "concept class not found: 'Diagnosis'");
        assert_eq!(err.kind(), ErrorKind::ReferenceNotFound);
    }

    #[test]
    fn test_malformed_record_mentions_location() {
        let err = SyncError::malformed("concepts.json", 7, "missing field `id`");
        let message = err.to_string();
        assert!(message.contains("concepts.json:7"));
        assert!(message.contains("missing field `id`"));
    }
}
