use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Error codes for categorizing errors
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation errors (3xxx)
    #[serde(rename = "VAL_3001")]
    InvalidInput,
    #[serde(rename = "VAL_3002")]
    MissingRequiredField,
    #[serde(rename = "VAL_3003")]
    InvalidFormat,
    #[serde(rename = "VAL_3009")]
    PayloadTooLarge,

    // Resource errors (4xxx)
    #[serde(rename = "RES_4001")]
    NotFound,
    #[serde(rename = "RES_4003")]
    Conflict,

    // Internal errors (9xxx)
    #[serde(rename = "INT_9999")]
    InternalServerError,
    #[serde(rename = "INT_9997")]
    UnexpectedError,
}

impl ErrorCode {
    /// Get numeric code
    pub fn code(&self) -> u16 {
        match self {
            ErrorCode::InvalidInput => 3001,
            ErrorCode::MissingRequiredField => 3002,
            ErrorCode::InvalidFormat => 3003,
            ErrorCode::PayloadTooLarge => 3009,
            ErrorCode::NotFound => 4001,
            ErrorCode::Conflict => 4003,
            ErrorCode::InternalServerError => 9999,
            ErrorCode::UnexpectedError => 9997,
        }
    }

    /// Get user-friendly message
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "Invalid input provided",
            ErrorCode::MissingRequiredField => "Required field is missing",
            ErrorCode::InvalidFormat => "Invalid format provided",
            ErrorCode::PayloadTooLarge => "Request body is too large",
            ErrorCode::NotFound => "The requested resource was not found",
            ErrorCode::Conflict => "A conflict occurred with an existing resource",
            ErrorCode::InternalServerError => "An internal server error occurred",
            ErrorCode::UnexpectedError => "An unexpected error occurred",
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Request body exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation failed: {field}")]
    ValidationWithField { field: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Can't find {method} {path} on this server")]
    RouteNotFound { method: String, path: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Handler panicked: {0}")]
    Panic(String),
}

impl ApiError {
    /// Create validation error for specific field
    pub fn validation_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::ValidationWithField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Helper: Resource not found
    pub fn not_found(resource: &str) -> Self {
        ApiError::NotFound(format!("{} not found", resource))
    }

    /// Get error code
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ApiError::MalformedBody(_) => ErrorCode::InvalidFormat,
            ApiError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            ApiError::BadRequest(_) | ApiError::Validation(_) => ErrorCode::InvalidInput,
            ApiError::ValidationWithField { .. } => ErrorCode::MissingRequiredField,
            ApiError::NotFound(_) | ApiError::RouteNotFound { .. } => ErrorCode::NotFound,
            ApiError::Conflict(_) => ErrorCode::Conflict,
            ApiError::Internal(_) => ErrorCode::InternalServerError,
            ApiError::Panic(_) => ErrorCode::UnexpectedError,
        }
    }

    /// Get status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MalformedBody(_)
            | ApiError::BadRequest(_)
            | ApiError::Validation(_)
            | ApiError::ValidationWithField { .. } => StatusCode::BAD_REQUEST,

            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            ApiError::NotFound(_) | ApiError::RouteNotFound { .. } => StatusCode::NOT_FOUND,

            ApiError::Conflict(_) => StatusCode::CONFLICT,

            ApiError::Internal(_) | ApiError::Panic(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message that is safe to show a client for a 4xx error
    fn client_message(&self) -> String {
        match self {
            ApiError::MalformedBody(_) => "Invalid JSON format in request body".to_string(),
            ApiError::ValidationWithField { message, .. } => message.clone(),
            ApiError::BadRequest(msg)
            | ApiError::Validation(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    fn error_field(&self) -> Option<String> {
        match self {
            ApiError::ValidationWithField { field, .. } => Some(field.clone()),
            _ => None,
        }
    }

    fn error_details(&self) -> Option<String> {
        match self {
            ApiError::MalformedBody(detail) => Some(detail.clone()),
            ApiError::Internal(detail) | ApiError::Panic(detail) => Some(detail.clone()),
            _ => None,
        }
    }

    pub fn report(&self) -> ErrorReport {
        let status = self.status_code();
        let code = self.error_code();
        let message = if status.is_server_error() {
            code.message().to_string()
        } else {
            self.client_message()
        };

        ErrorReport {
            status,
            code,
            message,
            details: self.error_details(),
            field: self.error_field(),
            internal: self.to_string(),
        }
    }
}

/// An error on its way to the global error handler.
///
/// Stages never format error bodies themselves: `ApiError::into_response`
/// produces a bodiless response carrying this report as an extension, and the
/// global error handler renders it.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
    pub field: Option<String>,
    /// Full error text, for server-side logs only
    pub internal: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = self.report();
        let mut response = report.status.into_response();
        response.extensions_mut().insert(report);
        response
    }
}
