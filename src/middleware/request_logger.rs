use axum::{
    body::HttpBody,
    extract::{Request, State},
    http::{header, Method, StatusCode, Version},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Environment;
use crate::utils::{client_ip, extract_referrer, extract_user_agent};

/// Request id shared with downstream stages through request extensions
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Shape of the one-line access log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLogFormat {
    /// `GET /api/v1/users 200 1.204 ms - 27`
    Dev,
    /// Apache combined log format
    Combined,
}

impl AccessLogFormat {
    /// Chosen once at startup
    pub fn for_environment(environment: Environment) -> Self {
        if environment.is_development() {
            AccessLogFormat::Dev
        } else {
            AccessLogFormat::Combined
        }
    }

    pub fn render(&self, entry: &AccessLogEntry) -> String {
        let length = entry
            .content_length
            .map(|len| len.to_string())
            .unwrap_or_else(|| "-".to_string());

        match self {
            AccessLogFormat::Dev => format!(
                "{} {} {} {:.3} ms - {}",
                entry.method,
                entry.uri,
                entry.status.as_u16(),
                entry.duration.as_secs_f64() * 1000.0,
                length
            ),
            AccessLogFormat::Combined => format!(
                "{} - - [{}] \"{} {} HTTP/{}\" {} {} \"{}\" \"{}\"",
                entry.remote_addr,
                entry.timestamp.format("%d/%b/%Y:%H:%M:%S +0000"),
                entry.method,
                entry.uri,
                http_version(entry.version),
                entry.status.as_u16(),
                length,
                entry.referrer.as_deref().unwrap_or("-"),
                entry.user_agent.as_deref().unwrap_or("-"),
            ),
        }
    }
}

fn http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "1.1",
    }
}

/// Everything an access log line may need about one completed request
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub request_id: String,
    pub remote_addr: String,
    pub timestamp: DateTime<Utc>,
    pub method: Method,
    pub uri: String,
    pub version: Version,
    pub status: StatusCode,
    pub content_length: Option<u64>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub duration: Duration,
}

/// State for [`request_logger_middleware`]
#[derive(Debug, Clone, Copy)]
pub struct AccessLogger {
    pub format: AccessLogFormat,
    pub trust_proxy: bool,
}

impl AccessLogger {
    pub fn new(format: AccessLogFormat, trust_proxy: bool) -> Self {
        Self {
            format,
            trust_proxy,
        }
    }
}

/// Log one line per completed request, whatever the outcome.
pub async fn request_logger_middleware(
    State(logger): State<AccessLogger>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let start = Instant::now();
    let timestamp = Utc::now();

    let method = request.method().clone();
    let uri = request
        .uri()
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_else(|| request.uri().to_string());
    let version = request.version();
    let remote_addr = client_ip(&request, logger.trust_proxy);
    let referrer = extract_referrer(request.headers());
    let user_agent = extract_user_agent(request.headers());

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    let entry = AccessLogEntry {
        request_id: request_id.clone(),
        remote_addr,
        timestamp,
        method,
        uri,
        version,
        status: response.status(),
        content_length: response_length(&response),
        referrer,
        user_agent,
        duration: start.elapsed(),
    };
    emit(logger.format, &entry);

    // Add request ID to response headers for tracing
    if let Ok(value) = request_id.parse() {
        response.headers_mut().insert("x-request-id", value);
    }

    response
}

fn response_length(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .or_else(|| response.body().size_hint().exact())
}

fn emit(format: AccessLogFormat, entry: &AccessLogEntry) {
    let line = format.render(entry);
    let request_id = entry.request_id.as_str();

    match entry.status {
        status if status.is_server_error() => {
            error!(target: "access", request_id = %request_id, status = status.as_u16(), "{}", line)
        }
        status if status.is_client_error() => {
            warn!(target: "access", request_id = %request_id, status = status.as_u16(), "{}", line)
        }
        status => {
            info!(target: "access", request_id = %request_id, status = status.as_u16(), "{}", line)
        }
    }
}
