use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

use crate::rag::RagError;

/// Error type returned by every HTTP handler.
///
/// Bodies are plain text: the chat page renders whatever string comes back.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::UnsupportedFile(_) | RagError::NoContent => {
                ApiError::BadRequest(err.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rag_errors_map_to_status_codes() {
        let no_content: ApiError = RagError::NoContent.into();
        assert!(matches!(no_content, ApiError::BadRequest(ref m) if m == "No content extracted"));

        let unsupported: ApiError = RagError::UnsupportedFile("notes.docx".into()).into();
        assert!(matches!(unsupported, ApiError::BadRequest(_)));

        let index: ApiError = RagError::VectorIndex {
            backend: "pinecone".into(),
            message: "401 Unauthorized".into(),
        }
        .into();
        match index {
            ApiError::Internal(msg) => assert!(msg.contains("401 Unauthorized")),
            other => panic!("unexpected mapping: {:?}", other),
        }
    }

    #[test]
    fn internal_error_body_is_the_raw_message() {
        let response = ApiError::Internal("index unreachable".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
