//! HTTP error mapping for the coderun API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use coderun_common::types::Language;
use coderun_judge::ExecError;
use serde_json::json;

/// Errors a handler can return, each with a fixed HTTP status
#[derive(Debug)]
pub enum ApiError {
    /// Language not in the table (400, lists supported languages)
    UnsupportedLanguage(String),
    BadRequest(String),
    NotFound(String),
    /// No judge configured, or the server is shutting down (503)
    ServiceUnavailable(String),
    /// Judge did not finish within the execution deadline (504)
    GatewayTimeout(String),
    /// Judge transport or protocol failure (502)
    BadGateway(String),
    Internal(String),
}

impl From<ExecError> for ApiError {
    fn from(err: ExecError) -> Self {
        match err {
            ExecError::UnsupportedLanguage(lang) => ApiError::UnsupportedLanguage(lang),
            ExecError::JudgeUnavailable(_) | ExecError::Cancelled => {
                ApiError::ServiceUnavailable(err.to_string())
            }
            ExecError::Timeout(_) => ApiError::GatewayTimeout(err.to_string()),
            ExecError::Judge(_) => ApiError::BadGateway(err.to_string()),
            ExecError::LocalExecution(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<redis::RedisError> for ApiError {
    fn from(err: redis::RedisError) -> Self {
        ApiError::Internal(format!("job store error: {}", err))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnsupportedLanguage(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            ApiError::UnsupportedLanguage(lang) => json!({
                "error": format!("unsupported language: {}", lang),
                "supported_languages": Language::supported_names(),
            }),
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                json!({ "error": "An internal server error occurred" })
            }
            ApiError::BadRequest(message)
            | ApiError::NotFound(message)
            | ApiError::ServiceUnavailable(message)
            | ApiError::GatewayTimeout(message)
            | ApiError::BadGateway(message) => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}
