use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::Value;
use std::sync::Arc;

use crate::error::ApiError;

/// JSON request body parsed once by [`parse_json_body`].
///
/// Requests without a JSON content type, and JSON requests with an empty
/// body, carry an empty object.
#[derive(Debug, Clone)]
pub struct ParsedBody(pub Arc<Value>);

impl ParsedBody {
    pub fn empty() -> Self {
        ParsedBody(Arc::new(Value::Object(serde_json::Map::new())))
    }

    pub fn value(&self) -> &Value {
        &self.0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BodyLimit(pub usize);

/// Buffer and parse JSON request bodies.
///
/// The raw bytes are put back on the request so downstream handlers may still
/// read the stream; the parsed value travels in the request extensions.
pub async fn parse_json_body(
    State(BodyLimit(limit)): State<BodyLimit>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();

    if !is_json(&parts.headers) {
        parts.extensions.insert(ParsedBody::empty());
        return Ok(next.run(Request::from_parts(parts, body)).await);
    }

    if let Some(length) = declared_length(&parts.headers) {
        if length > limit {
            return Err(ApiError::PayloadTooLarge { limit });
        }
    }

    let bytes = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            return Err(ApiError::PayloadTooLarge { limit });
        }
        Err(err) => {
            return Err(ApiError::BadRequest(format!(
                "Failed to read request body: {}",
                err
            )))
        }
    };

    let value = parse_strict(&bytes)?;

    tracing::debug!(
        method = %parts.method,
        uri = %parts.uri,
        bytes = bytes.len(),
        "Parsed JSON request body"
    );

    parts.extensions.insert(ParsedBody(Arc::new(value)));
    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}

/// Only objects and arrays are accepted at the top level.
fn parse_strict(bytes: &[u8]) -> Result<Value, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(serde_json::Map::new()));
    }

    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| ApiError::MalformedBody(e.to_string()))?;

    if !value.is_object() && !value.is_array() {
        return Err(ApiError::MalformedBody(
            "top-level JSON value must be an object or an array".to_string(),
        ));
    }

    Ok(value)
}

/// `application/json` and structured-syntax `+json` media types
fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .map(|ct| {
            let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
        })
        .unwrap_or(false)
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}
