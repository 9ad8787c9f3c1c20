//! Error types shared by the PostgREST storage implementation.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`RestDaoError`] failures.
pub type RestResult<T> = Result<T, RestDaoError>;

/// Failures that can occur while interacting with the REST backend.
#[derive(Debug, Error)]
pub enum RestDaoError {
    /// Required environment variable is missing.
    #[error("missing REST backend environment variable `{var}`")]
    MissingEnvVar {
        /// Name of the missing variable.
        var: &'static str,
    },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build REST backend client")]
    ClientBuilder {
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// A request to a collection endpoint could not be sent.
    #[error("failed to send request to `{path}`")]
    RequestSend {
        /// Collection path targeted by the request.
        path: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },
    /// The backend answered with a non-success status code.
    #[error("unexpected response status {status} for `{path}`: {message}")]
    RequestStatus {
        /// Collection path targeted by the request.
        path: String,
        /// Status returned by the backend.
        status: StatusCode,
        /// Error message extracted from the response body.
        message: String,
    },
    /// Response payload could not be parsed into JSON.
    #[error("failed to decode response for `{path}`")]
    DecodeResponse {
        /// Collection path targeted by the request.
        path: String,
        /// Underlying decoding error.
        #[source]
        source: reqwest::Error,
    },
}

impl From<RestDaoError> for StorageError {
    fn from(err: RestDaoError) -> Self {
        match err {
            // Rejected writes carry a message meant for the user.
            RestDaoError::RequestStatus {
                status, message, ..
            } if status == StatusCode::CONFLICT
                || status == StatusCode::BAD_REQUEST
                || status == StatusCode::UNPROCESSABLE_ENTITY =>
            {
                StorageError::constraint(message)
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_maps_to_constraint_with_backend_message() {
        let err: StorageError = RestDaoError::RequestStatus {
            path: "players".into(),
            status: StatusCode::CONFLICT,
            message: "duplicate key value violates unique constraint".into(),
        }
        .into();

        match err {
            StorageError::Constraint { message } => {
                assert_eq!(message, "duplicate key value violates unique constraint")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn server_errors_map_to_unavailable() {
        let err: StorageError = RestDaoError::RequestStatus {
            path: "players".into(),
            status: StatusCode::BAD_GATEWAY,
            message: "upstream down".into(),
        }
        .into();

        assert!(matches!(err, StorageError::Unavailable { .. }));
    }

    #[test]
    fn missing_env_var_maps_to_unavailable() {
        let err: StorageError = RestDaoError::MissingEnvVar { var: "SUPABASE_URL" }.into();
        assert!(err.to_string().contains("SUPABASE_URL"));
    }
}
