//! Common extractors for resource handlers.
//!
//! Bodies are parsed once by the gateway's body parser; handlers pick the
//! parsed value out of the request extensions instead of reading the stream.

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use serde_json::Error as JsonError;
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::body_parser::ParsedBody;

/// Typed, validated view of the parsed JSON body
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequestParts<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let body = parts
            .extensions
            .get::<ParsedBody>()
            .cloned()
            .unwrap_or_else(ParsedBody::empty);

        let value: T = serde_json::from_value(body.value().clone()).map_err(handle_json_error)?;

        value
            .validate()
            .map_err(|e| ApiError::Validation(format!("Validation error: {}", e)))?;

        Ok(JsonBody(value))
    }
}

/// Numeric `{id}` path segment.
///
/// Undecodable segments (bad percent-encoding, invalid UTF-8) and non-numeric
/// ids both reject with a field error, so they reach the global error handler
/// like every other failure.
#[derive(Debug, Clone, Copy)]
pub struct PathId(pub u64);

impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::validation_field("id", rejection.body_text()))?;

        parse_id(&raw).map(PathId)
    }
}

/// Parse a numeric path id, returning an ApiError on failure
pub fn parse_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::validation_field("id", format!("Invalid id: {}", raw)))
}

/// Convert JSON deserialization errors to structured API errors
fn handle_json_error(error: JsonError) -> ApiError {
    let error_str = error.to_string();

    if error_str.contains("unknown field") {
        match extract_backticked(&error_str, "unknown field `") {
            Some(field) => ApiError::validation_field(&field, format!("Unknown field '{}'", field)),
            None => ApiError::BadRequest("Unknown field in request".to_string()),
        }
    } else if error_str.contains("missing field") {
        match extract_backticked(&error_str, "missing field `") {
            Some(field) => {
                ApiError::validation_field(&field, format!("Required field '{}' is missing", field))
            }
            None => ApiError::Validation("Required field is missing".to_string()),
        }
    } else if error_str.contains("invalid type") {
        ApiError::Validation(format!("Invalid data format provided: {}", error_str))
    } else {
        ApiError::BadRequest("Invalid request body".to_string())
    }
}

/// Extract the name between `marker` and the closing backtick, as in
/// "missing field `email`"
fn extract_backticked(error_msg: &str, marker: &str) -> Option<String> {
    let start = error_msg.find(marker)? + marker.len();
    let end = error_msg[start..].find('`')?;
    Some(error_msg[start..start + end].to_string())
}
