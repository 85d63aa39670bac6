use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use strudel_ai_adapters::ProviderError;
use thiserror::Error;

/// Failures reported to the editor as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid JSON payload.")]
    InvalidPayload,

    #[error("Missing prompt.")]
    MissingPrompt,

    #[error("Missing code.")]
    MissingCode,

    #[error("Missing code or prompt.")]
    MissingCodeOrPrompt,

    #[error("Unknown provider. Use \"claude\" or \"openai\".")]
    UnknownProvider,

    #[error("{var} is not set.")]
    MissingApiKey { var: &'static str },

    #[error("{label} API returned empty content.")]
    EmptyContent { label: &'static str },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload
            | ApiError::MissingPrompt
            | ApiError::MissingCode
            | ApiError::MissingCodeOrPrompt
            | ApiError::UnknownProvider => StatusCode::BAD_REQUEST,
            ApiError::MissingApiKey { .. } | ApiError::EmptyContent { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Provider(err) => match err {
                ProviderError::Transport { .. } => StatusCode::BAD_GATEWAY,
                ProviderError::Upstream { status, .. } => {
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
                }
                ProviderError::InvalidBaseUrl { .. } | ProviderError::Client(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
