// Request body validation.
//
// `ValidatedJson<T>` turns axum's plain-text JSON rejections into the
// relay's structured VALIDATION_FAILED envelope.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::{ErrorCode, RelayError};

/// Maximum REST request body in bytes (64 KiB). Todo payloads are tiny.
pub const MAX_REST_BODY_BYTES: usize = 64 * 1024;

/// A JSON body extractor that returns structured `RelayError` on failure.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidatedJson(value)),
            Err(rejection) => {
                let (message, details) = classify_json_rejection(&rejection);
                Err(RelayError::new(ErrorCode::ValidationFailed, message)
                    .with_details(details)
                    .into_response())
            }
        }
    }
}

fn classify_json_rejection(rejection: &JsonRejection) -> (String, serde_json::Value) {
    match rejection {
        JsonRejection::JsonDataError(e) => (
            format!("invalid JSON payload: {e}"),
            serde_json::json!({ "kind": "data_error" }),
        ),
        JsonRejection::JsonSyntaxError(e) => {
            (format!("malformed JSON: {e}"), serde_json::json!({ "kind": "syntax_error" }))
        }
        JsonRejection::MissingJsonContentType(_) => (
            "expected Content-Type: application/json".to_string(),
            serde_json::json!({ "kind": "missing_content_type" }),
        ),
        JsonRejection::BytesRejection(e) => {
            (format!("request body error: {e}"), serde_json::json!({ "kind": "body_error" }))
        }
        other => (format!("request body error: {other}"), serde_json::json!({ "kind": "unknown" })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
        routing::post,
        Router,
    };
    use donelist_common::protocol::api::CreateTodoRequest;
    use tower::ServiceExt;

    async fn echo_handler(
        ValidatedJson(payload): ValidatedJson<CreateTodoRequest>,
    ) -> impl IntoResponse {
        (StatusCode::OK, payload.title)
    }

    fn test_app() -> Router {
        Router::new().route("/test", post(echo_handler))
    }

    async fn send(content_type: Option<&str>, body: &'static str) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(Method::POST).uri("/test");
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        let response = test_app()
            .oneshot(builder.body(Body::from(body)).expect("request should build"))
            .await
            .expect("request should return a response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body should read");
        (status, body.to_vec())
    }

    fn error_kind(body: &[u8]) -> serde_json::Value {
        let parsed: serde_json::Value = serde_json::from_slice(body).expect("body should be json");
        assert_eq!(parsed["error"]["code"], "VALIDATION_FAILED");
        parsed["error"]["details"]["kind"].clone()
    }

    #[tokio::test]
    async fn validated_json_accepts_valid_payload() {
        let (status, body) = send(Some("application/json"), r#"{"title":"milk"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"milk");
    }

    #[tokio::test]
    async fn validated_json_rejects_missing_content_type() {
        let (status, body) = send(None, r#"{"title":"milk"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_kind(&body), "missing_content_type");
    }

    #[tokio::test]
    async fn validated_json_rejects_malformed_json() {
        let (status, body) = send(Some("application/json"), "not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_kind(&body), "syntax_error");
    }

    #[tokio::test]
    async fn validated_json_rejects_missing_field() {
        let (status, body) = send(Some("application/json"), r#"{"name":"milk"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_kind(&body), "data_error");
    }
}
