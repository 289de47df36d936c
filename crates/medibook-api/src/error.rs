//! API error types and JSON error response formatting.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use medibook_dialogue::DialogueError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "not_found").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid input.
    BadRequest(String),
    /// 404 Not Found - unknown session.
    NotFound(String),
    /// 500 Internal Server Error - unexpected server error.
    Internal(String),
    /// 503 Service Unavailable - a collaborator (language model) is down.
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DialogueError> for ApiError {
    fn from(err: DialogueError) -> Self {
        match err {
            DialogueError::EmptyMessage | DialogueError::MessageTooLong(_) => {
                ApiError::BadRequest(err.to_string())
            }
            DialogueError::SessionNotFound(_) => ApiError::NotFound(err.to_string()),
            DialogueError::Llm(_) => ApiError::ServiceUnavailable(err.to_string()),
            DialogueError::Voice(_) => ApiError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_error_response_shape() {
        let (status, body) = body_json(ApiError::BadRequest("nope".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
        assert_eq!(body["message"], "nope");

        let (status, body) = body_json(ApiError::Internal("boom".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal_error");

        let (status, body) = body_json(ApiError::ServiceUnavailable("ollama down".to_string())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "service_unavailable");
    }

    #[test]
    fn test_from_dialogue_error() {
        assert!(matches!(
            ApiError::from(DialogueError::EmptyMessage),
            ApiError::BadRequest(ref m) if m == "message cannot be empty"
        ));
        assert!(matches!(
            ApiError::from(DialogueError::MessageTooLong(10)),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(DialogueError::SessionNotFound("x".to_string())),
            ApiError::NotFound(ref m) if m == "session not found: x"
        ));
        assert!(matches!(
            ApiError::from(DialogueError::Voice("mic".to_string())),
            ApiError::Internal(_)
        ));
        assert!(matches!(
            ApiError::from(DialogueError::Llm("refused".to_string())),
            ApiError::ServiceUnavailable(_)
        ));
    }
}
