use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use core_types::PayloadError;
use image_embedding::EmbedError;
use matcher::MatchError;
use quest_store::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Every failure an endpoint can report. Rendered as `{"error": message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    Decode(String),
    #[error("{0}")]
    NoValidCandidates(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    ModelUnavailable(String),
    /// Logged in full; clients only see a generic message.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::Decode(_) | Self::NoValidCandidates(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Internal(detail) => {
                error!(error = %detail, "request failed");
                INTERNAL_MESSAGE.to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<PayloadError> for ApiError {
    fn from(err: PayloadError) -> Self {
        Self::Decode(format!("Invalid base64 image data: {err}"))
    }
}

impl ApiError {
    /// Status for an embedding failure, keeping the caller's message.
    fn from_embed(err: &EmbedError, message: String) -> Self {
        match err {
            EmbedError::Decode(_) => Self::Decode(message),
            EmbedError::ModelUnavailable(_) => Self::ModelUnavailable(message),
            EmbedError::Inference(_) => Self::Internal(message),
        }
    }
}

impl From<MatchError> for ApiError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::NoValidCandidates(_) => Self::NoValidCandidates(err.to_string()),
            MatchError::Probe(ref inner) | MatchError::Pair(ref inner) => {
                Self::from_embed(inner, err.to_string())
            }
            MatchError::Incomparable => Self::internal(err),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidRequest(msg) => Self::InvalidRequest(msg),
            StoreError::NotFound(msg) => Self::NotFound(msg),
            other @ (StoreError::Io { .. } | StoreError::Json { .. }) => Self::internal(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_kind() {
        assert_eq!(ApiError::invalid("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Decode("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::NoValidCandidates("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::ModelUnavailable("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::internal("boom").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_errors_keep_their_user_message() {
        let err: ApiError = StoreError::InvalidRequest("Missing required field: team_name".into()).into();
        assert_eq!(err.to_string(), "Missing required field: team_name");
        let err: ApiError = StoreError::NotFound("Quest not found".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn no_valid_candidates_is_a_bad_request() {
        let err: ApiError = MatchError::NoValidCandidates(Vec::new()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Could not load any answer images");
    }

    #[test]
    fn embedding_failures_keep_the_match_message() {
        let bad = image::load_from_memory(b"not an image").unwrap_err();
        let err: ApiError = MatchError::Probe(EmbedError::Decode(bad)).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().starts_with("Error processing player image"));

        let err: ApiError = MatchError::Pair(EmbedError::ModelUnavailable("gone".into())).into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);

        let err: ApiError = MatchError::Pair(EmbedError::Inference("nan".into())).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
