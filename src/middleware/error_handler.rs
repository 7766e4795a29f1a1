//! Global error handling.
//!
//! Every failure in the pipeline travels as an [`ErrorReport`] attached to a
//! bodiless response (see `ApiError::into_response`). [`global_error_handler`]
//! is the only place that turns those reports into client-facing bodies.
//! Unmatched routes end in [`handle_unmatched`] and panics are converted by
//! [`panic_response`], so both reach the handler the same way.

use axum::{
    extract::{OriginalUri, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::any::Any;
use tracing::{error, warn};
use uuid::Uuid;

use crate::config::Environment;
use crate::error::{ApiError, ErrorCode, ErrorReport};
use crate::middleware::request_logger::RequestId;

/// Structured error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// `fail` for client errors, `error` for server errors
    pub status: &'static str,
    pub error: ErrorDetail,
    pub request_id: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub code_number: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// State for [`global_error_handler`]
#[derive(Debug, Clone, Copy)]
pub struct ErrorHandler {
    pub environment: Environment,
}

impl ErrorHandler {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    /// Server-error internals are only shown in development.
    pub fn body_for(&self, report: &ErrorReport, request_id: &str) -> ErrorResponse {
        let details = if report.status.is_server_error() {
            if self.environment.is_development() {
                report.details.clone().or_else(|| Some(report.internal.clone()))
            } else {
                None
            }
        } else {
            report.details.clone()
        };

        ErrorResponse {
            status: if report.status.is_server_error() {
                "error"
            } else {
                "fail"
            },
            error: ErrorDetail {
                code: report.code,
                code_number: report.code.code(),
                message: report.message.clone(),
                details,
                field: report.field.clone(),
            },
            request_id: request_id.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn log(&self, report: &ErrorReport, request_id: &str, method: &Method, path: &str) {
        if report.status.is_server_error() {
            error!(
                request_id = %request_id,
                method = %method,
                path = %path,
                status = report.status.as_u16(),
                error = %report.internal,
                "Server error occurred"
            );
        } else {
            warn!(
                request_id = %request_id,
                method = %method,
                path = %path,
                status = report.status.as_u16(),
                error = %report.internal,
                "Client error occurred"
            );
        }
    }
}

/// Render any response carrying an [`ErrorReport`]; pass everything else on
/// untouched.
pub async fn global_error_handler(
    State(handler): State<ErrorHandler>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|RequestId(id)| id.clone())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let Some(report) = response.extensions().get::<ErrorReport>().cloned() else {
        return response;
    };

    handler.log(&report, &request_id, &method, &path);

    let (mut parts, _) = response.into_parts();
    let body = Json(handler.body_for(&report, &request_id)).into_response().into_body();

    parts.status = report.status;
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );

    Response::from_parts(parts, body)
}

/// Fallback for every path or method no router claimed
pub async fn handle_unmatched(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::RouteNotFound {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}

/// `CatchPanicLayer` hook: a panic becomes an ordinary internal error
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ApiError::Panic(detail).into_response()
}
