use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by record stores regardless of the underlying backend.
///
/// The display text is what ends up in user-facing notifications, so every
/// variant renders a complete sentence on its own.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or answered with an unexpected failure.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human readable summary of the failure.
        message: String,
        /// Backend error that caused the failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// No record with the requested identifier exists in the caller's scope.
    #[error("record `{id}` not found in `{collection}`")]
    NotFound {
        /// Collection that was searched.
        collection: String,
        /// Identifier that was requested.
        id: String,
    },
    /// The backend rejected a write (unique key, foreign key, check constraint...).
    #[error("{message}")]
    Constraint {
        /// Message reported by the backend.
        message: String,
    },
    /// A stored record could not be decoded into the expected shape.
    #[error("malformed record in `{collection}`")]
    Decode {
        /// Collection holding the malformed record.
        collection: String,
        /// Decoding failure.
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a not-found error for `id` in `collection`.
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        StorageError::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Construct a constraint violation carrying the backend's message.
    pub fn constraint(message: impl Into<String>) -> Self {
        StorageError::Constraint {
            message: message.into(),
        }
    }
}
