// REST envelopes and the error-code registry shared by the relay and the
// HTTP transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::MutationError,
    types::{Todo, TodoId},
};

pub const TODOS_PATH: &str = "/v1/todos";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn todo_path(id: TodoId) -> String {
    format!("{TODOS_PATH}/{id}")
}

pub fn toggle_path(id: TodoId) -> String {
    format!("{TODOS_PATH}/{id}/toggle")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateTodoRequest {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoEnvelope {
    pub todo: Todo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodosEnvelope {
    pub todos: Vec<Todo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub retryable: bool,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub details: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ValidationFailed,
    AuthInvalidToken,
    AuthForbidden,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub const ALL: [Self; 5] = [
        Self::ValidationFailed,
        Self::AuthInvalidToken,
        Self::AuthForbidden,
        Self::NotFound,
        Self::InternalError,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::AuthInvalidToken => "AUTH_INVALID_TOKEN",
            Self::AuthForbidden => "AUTH_FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.as_str() == value)
    }

    pub const fn http_status(self) -> u16 {
        match self {
            Self::ValidationFailed => 400,
            Self::AuthInvalidToken => 401,
            Self::AuthForbidden => 403,
            Self::NotFound => 404,
            Self::InternalError => 500,
        }
    }

    pub const fn retryable(self) -> bool {
        matches!(self, Self::InternalError)
    }

    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ValidationFailed => "request validation failed",
            Self::AuthInvalidToken => "invalid authentication token",
            Self::AuthForbidden => "caller lacks required permission",
            Self::NotFound => "requested resource not found",
            Self::InternalError => "internal server error",
        }
    }

    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::ValidationFailed,
            401 => Self::AuthInvalidToken,
            403 => Self::AuthForbidden,
            404 => Self::NotFound,
            _ => Self::InternalError,
        }
    }

    /// Map a wire error onto the client-facing taxonomy.
    pub fn into_mutation_error(self, message: impl Into<String>) -> MutationError {
        match self {
            Self::ValidationFailed => MutationError::ValidationFailed(message.into()),
            Self::AuthInvalidToken => MutationError::Unauthenticated,
            Self::AuthForbidden => MutationError::Forbidden,
            Self::NotFound => MutationError::NotFoundOrForbidden,
            Self::InternalError => MutationError::NetworkOrTimeout(message.into()),
        }
    }
}

impl From<&MutationError> for ErrorCode {
    fn from(error: &MutationError) -> Self {
        match error {
            MutationError::Unauthenticated => Self::AuthInvalidToken,
            MutationError::ValidationFailed(_) => Self::ValidationFailed,
            MutationError::NotFoundOrForbidden => Self::NotFound,
            MutationError::Forbidden => Self::AuthForbidden,
            MutationError::NetworkOrTimeout(_) => Self::InternalError,
        }
    }
}
