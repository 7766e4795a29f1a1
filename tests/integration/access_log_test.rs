//! Integration tests for the access log lines emitted at target `access`
//!
//! A thread-local subscriber captures the formatted output while one request
//! runs through `build_app` on the current-thread test runtime.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::header,
    routing::get,
    Router,
};
use blog_gateway::config::{Config, Environment};
use blog_gateway::middleware::RateLimiter;
use blog_gateway::{build_app, ResourceRouters};
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// `io::Write` sink shared with the test body
#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn static_routers() -> ResourceRouters {
    let listing = Router::new().route("/", get(|| async { "[]" }));
    ResourceRouters {
        users: listing.clone(),
        posts: listing.clone(),
        comments: listing,
    }
}

/// Run one GET through the gateway and return the message of its access line
async fn access_line(environment: Environment, uri: &str) -> Result<String> {
    let config = Config {
        environment,
        ..Config::default()
    };
    let app = build_app(
        &config,
        static_routers(),
        RateLimiter::in_memory(config.rate_limit.clone()),
    );

    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .without_time()
        .with_max_level(tracing::Level::INFO)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);

    let mut request = Request::builder()
        .uri(uri)
        .header(header::USER_AGENT, "curl/8.4.0")
        .body(Body::empty())?;
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([203, 0, 113, 9], 52000))));
    app.oneshot(request).await?;
    drop(guard);

    let output = String::from_utf8(log.0.lock().unwrap().clone())?;
    let line = output
        .lines()
        .filter_map(|line| line.split_once("access: ").map(|(_, rest)| rest))
        .next()
        .ok_or_else(|| anyhow::anyhow!("no access line in captured output:\n{}", output))?;

    // Structured fields follow the message
    let message = line.split(" request_id=").next().unwrap_or(line);
    Ok(message.to_string())
}

#[tokio::test]
async fn test_development_uses_dev_format() -> Result<()> {
    let line = access_line(Environment::Development, "/api/v1/posts?page=2").await?;

    assert!(line.starts_with("GET /api/v1/posts?page=2 200 "), "{}", line);
    assert!(line.ends_with(" ms - 2"), "{}", line);
    assert!(!line.contains("203.0.113.9"));
    assert!(!line.contains("curl/8.4.0"));

    println!("✅ Development access line: {}", line);
    Ok(())
}

#[tokio::test]
async fn test_production_uses_combined_format() -> Result<()> {
    let line = access_line(Environment::Production, "/api/v1/posts?page=2").await?;

    assert!(line.starts_with("203.0.113.9 - - ["), "{}", line);
    assert!(
        line.ends_with("] \"GET /api/v1/posts?page=2 HTTP/1.1\" 200 2 \"-\" \"curl/8.4.0\""),
        "{}",
        line
    );
    Ok(())
}

#[tokio::test]
async fn test_same_request_differs_by_environment() -> Result<()> {
    let dev = access_line(Environment::Development, "/api/v1/comments").await?;
    let combined = access_line(Environment::Production, "/api/v1/comments").await?;

    assert_ne!(dev, combined);
    assert_eq!(dev.split_whitespace().count(), 7);
    assert_eq!(combined.matches('"').count(), 6);
    Ok(())
}

#[tokio::test]
async fn test_rejected_requests_are_logged() -> Result<()> {
    let line = access_line(Environment::Development, "/api/v1/tags").await?;

    assert!(line.starts_with("GET /api/v1/tags 404 "), "{}", line);
    Ok(())
}
