// Mutation error taxonomy shared by the service contract and the client.

use thiserror::Error;

/// Every way a remote todo operation can fail.
///
/// `NotFoundOrForbidden` deliberately merges "missing" and "owned by someone
/// else" so callers cannot probe for other users' rows.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MutationError {
    #[error("no active session")]
    Unauthenticated,

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("todo not found or not accessible")]
    NotFoundOrForbidden,

    #[error("caller lacks required permission")]
    Forbidden,

    #[error("network failure or timeout: {0}")]
    NetworkOrTimeout(String),
}

impl MutationError {
    pub fn network(detail: impl Into<String>) -> Self {
        Self::NetworkOrTimeout(detail.into())
    }

    pub const fn kind(&self) -> MutationErrorKind {
        match self {
            Self::Unauthenticated => MutationErrorKind::Unauthenticated,
            Self::ValidationFailed(_) => MutationErrorKind::ValidationFailed,
            Self::NotFoundOrForbidden => MutationErrorKind::NotFoundOrForbidden,
            Self::Forbidden => MutationErrorKind::Forbidden,
            Self::NetworkOrTimeout(_) => MutationErrorKind::NetworkOrTimeout,
        }
    }

    /// Only transport failures are worth retrying by hand.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkOrTimeout(_))
    }

    /// Message shown to the user. Never distinguishes missing rows from
    /// rows owned by someone else.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated => "You must be signed in to change your todos.".to_string(),
            Self::ValidationFailed(reason) => reason.clone(),
            Self::NotFoundOrForbidden => {
                "That todo is no longer available to you.".to_string()
            }
            Self::Forbidden => "You do not have permission to do that.".to_string(),
            Self::NetworkOrTimeout(_) => {
                "Could not reach the server. Please try again.".to_string()
            }
        }
    }
}

/// Field-less discriminant of [`MutationError`], handy in assertions and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationErrorKind {
    Unauthenticated,
    ValidationFailed,
    NotFoundOrForbidden,
    Forbidden,
    NetworkOrTimeout,
}
