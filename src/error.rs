use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

/// Failure of a user-facing client operation.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("not logged in")]
    NotAuthenticated,
    #[error("no conversation selected")]
    NoConversation,
    #[error("no username given")]
    MissingUsername,
}

impl ClientError {
    /// Message from the server to show instead of a generic one.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api(e) => e.server_message(),
            _ => None,
        }
    }
}
