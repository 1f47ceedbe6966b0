use std::future::Future;

use axum::{
    http::{header::HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use donelist_common::protocol::api::{ErrorBody, ErrorEnvelope};
use serde_json::{json, Value};
use uuid::Uuid;

pub use donelist_common::protocol::api::{ErrorCode, REQUEST_ID_HEADER};

tokio::task_local! {
    static REQUEST_ID: String;
}

pub fn status_for(code: ErrorCode) -> StatusCode {
    StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

#[derive(Debug, Clone)]
pub struct RelayError {
    code: ErrorCode,
    message: String,
    details: Value,
    request_id: Option<String>,
}

impl RelayError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), details: json!({}), request_id: None }
    }

    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::from_status(status.as_u16()), message)
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let request_id = self.request_id.or_else(current_request_id);

        let envelope = ErrorEnvelope {
            error: ErrorBody {
                code: self.code.as_str().to_string(),
                message: self.message,
                retryable: self.code.retryable(),
                request_id: request_id.clone(),
                details: self.details,
            },
        };
        let mut response = (status_for(self.code), Json(envelope)).into_response();

        if let Some(request_id) = request_id {
            attach_request_id_header(&mut response, &request_id);
        }

        response
    }
}

pub async fn with_request_id_scope<F>(request_id: String, future: F) -> F::Output
where
    F: Future,
{
    REQUEST_ID.scope(request_id, future).await
}

pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(Clone::clone).ok()
}

pub fn request_id_from_headers_or_generate(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

pub fn attach_request_id_header(response: &mut Response, request_id: &str) {
    if let Ok(header) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, header);
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::to_bytes,
        http::{HeaderMap, HeaderValue, StatusCode},
        response::IntoResponse,
    };
    use serde_json::Value;

    use super::{
        request_id_from_headers_or_generate, with_request_id_scope, ErrorCode, RelayError,
        REQUEST_ID_HEADER,
    };

    async fn body_json(error: RelayError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("error response body should be readable");
        (status, serde_json::from_slice(&body).expect("error response body should be valid json"))
    }

    #[tokio::test]
    async fn relay_error_uses_scoped_request_id() {
        let (status, parsed) = with_request_id_scope("req-scoped-123".to_owned(), async {
            body_json(RelayError::from_code(ErrorCode::InternalError)).await
        })
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(parsed["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(parsed["error"]["retryable"], true);
        assert_eq!(parsed["error"]["request_id"], "req-scoped-123");
        assert_eq!(parsed["error"]["details"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn from_status_maps_http_status_to_registry_code() {
        let (status, parsed) =
            body_json(RelayError::from_status(StatusCode::FORBIDDEN, "denied")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(parsed["error"]["code"], "AUTH_FORBIDDEN");
        assert_eq!(parsed["error"]["message"], "denied");
        assert_eq!(parsed["error"]["retryable"], false);
    }

    #[tokio::test]
    async fn custom_details_are_preserved() {
        let (_, parsed) = body_json(
            RelayError::new(ErrorCode::ValidationFailed, "bad payload")
                .with_details(serde_json::json!({ "field": "title" })),
        )
        .await;
        assert_eq!(parsed["error"]["details"]["field"], "title");
    }

    #[tokio::test]
    async fn explicit_request_id_overrides_scope() {
        let (_, parsed) = with_request_id_scope("req-scoped-123".to_owned(), async {
            body_json(RelayError::from_code(ErrorCode::NotFound).with_request_id("req-explicit-456"))
                .await
        })
        .await;
        assert_eq!(parsed["error"]["request_id"], "req-explicit-456");
    }

    #[test]
    fn blank_request_id_header_is_replaced() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("  "));
        let generated = request_id_from_headers_or_generate(&headers);
        assert!(uuid::Uuid::parse_str(&generated).is_ok());

        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-1"));
        assert_eq!(request_id_from_headers_or_generate(&headers), "req-1");
    }
}
