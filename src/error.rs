use thiserror::Error;

use crate::dao::storage::StorageError;

/// Failures a dialog reports to the user through the notification channel.
///
/// Validation failures are not part of this type: they are rendered inline and
/// never leave the dialog.
#[derive(Debug, Error)]
pub enum ModalError {
    /// Fetching the record under edit failed; the dialog closes.
    #[error(transparent)]
    Load(StorageError),
    /// Persisting the draft failed; the dialog stays open for a retry.
    #[error(transparent)]
    Mutation(StorageError),
    /// The fetched record does not have the expected shape.
    #[error("record could not be read: {0}")]
    Decode(#[source] serde_json::Error),
    /// The draft could not be turned into a mutation payload.
    #[error("record could not be prepared for saving: {0}")]
    Encode(#[source] serde_json::Error),
    /// Requests can only be dispatched from within a Tokio runtime.
    #[error("no async runtime available to dispatch the request")]
    NoRuntime,
}
