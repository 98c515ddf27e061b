use std::fmt::Display;
use thiserror::Error;

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors returned when an alias fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AliasError {
    #[error("alias cannot be empty")]
    Empty,
    #[error("alias length must be at most {max} bytes, got {actual}")]
    TooLong { max: usize, actual: usize },
    #[error("alias must be a single path segment without control characters: '{0}'")]
    InvalidCharacters(String),
}

/// The only errors a storage provider surfaces to its callers.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("alias not found: {0}")]
    NotFound(String),
    #[error("alias already exists: {0}")]
    AlreadyExists(String),
    #[error(transparent)]
    Infra(#[from] InfraError),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, StorageError::AlreadyExists(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InfraKind {
    Unavailable,
    Timeout,
    Query,
    InvalidData,
    Io,
    Configuration,
    Unsupported,
    Operation,
}

impl Display for InfraKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            InfraKind::Unavailable => "storage backend unavailable",
            InfraKind::Timeout => "storage operation timed out",
            InfraKind::Query => "storage query failed",
            InfraKind::InvalidData => "stored data is invalid",
            InfraKind::Io => "storage i/o failed",
            InfraKind::Configuration => "invalid storage configuration",
            InfraKind::Unsupported => "operation not supported by storage backend",
            InfraKind::Operation => "storage operation failed",
        };
        f.write_str(label)
    }
}

/// An opaque infrastructure failure: connection loss, disk or permission
/// errors, malformed persisted state.
///
/// The category is only rendered in the message; callers treat every
/// `InfraError` as fatal to the current request.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct InfraError {
    kind: InfraKind,
    message: String,
}

impl InfraError {
    fn new(kind: InfraKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(InfraKind::Unavailable, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(InfraKind::Timeout, message)
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::new(InfraKind::Query, message)
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::new(InfraKind::InvalidData, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(InfraKind::Io, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(InfraKind::Configuration, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(InfraKind::Unsupported, message)
    }

    pub fn operation(message: impl Into<String>) -> Self {
        Self::new(InfraKind::Operation, message)
    }

    /// Backend-specific detail, for logging.
    pub fn message(&self) -> &str {
        &self.message
    }
}
