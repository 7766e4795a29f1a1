//! Integration tests for the gateway middleware chain
//!
//! Every test drives `build_app` in-process through `tower::ServiceExt::oneshot`.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use blog_gateway::config::{Config, Environment, RateLimitConfig};
use blog_gateway::middleware::RateLimiter;
use blog_gateway::{build_app, ResourceRouters};
use http_body_util::BodyExt;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const ORIGIN: &str = "https://blog.example.com";

async fn count(State(hits): State<Arc<AtomicUsize>>) -> &'static str {
    hits.fetch_add(1, Ordering::SeqCst);
    "ok"
}

async fn large() -> String {
    "lorem ipsum dolor sit amet ".repeat(200)
}

async fn explode() -> &'static str {
    panic!("handler exploded")
}

/// Routers whose handlers only count how often they were dispatched
fn counting_routers(hits: Arc<AtomicUsize>) -> ResourceRouters {
    let counting = Router::new()
        .route("/", get(count))
        .route("/large", get(large))
        .route("/explode", get(explode))
        .with_state(hits);

    ResourceRouters {
        users: counting.clone(),
        posts: counting.clone(),
        comments: counting,
    }
}

fn config_with_limit(max_requests: u32) -> Config {
    Config {
        rate_limit: RateLimitConfig {
            max_requests,
            window: Duration::from_secs(3600),
            message: "Too many requests from this IP".to_string(),
        },
        ..Config::default()
    }
}

fn gateway(config: &Config, hits: Arc<AtomicUsize>) -> Router {
    build_app(
        config,
        counting_routers(hits),
        RateLimiter::in_memory(config.rate_limit.clone()),
    )
}

fn request_from(addr: &str, method: &str, uri: &str) -> Request {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::ORIGIN, ORIGIN)
        .body(Body::empty())
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(addr.parse::<SocketAddr>().unwrap()));
    request
}

fn get_request(uri: &str) -> Request {
    request_from("198.51.100.7:51000", "GET", uri)
}

fn json_request(uri: &str, body: &'static str) -> Request {
    let mut request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ORIGIN, ORIGIN)
        .body(Body::from(body))
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([198, 51, 100, 7], 51000))));
    request
}

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn assert_hardened(headers: &HeaderMap) {
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
    assert_eq!(
        headers["strict-transport-security"],
        "max-age=15552000; includeSubDomains"
    );
    assert!(headers.contains_key("content-security-policy"));
    assert!(!headers.contains_key("x-powered-by"));
    assert_eq!(headers["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_requests_below_limit_reach_router() -> Result<()> {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = gateway(&config_with_limit(3), hits.clone());

    for remaining in ["2", "1", "0"] {
        let response = app.clone().oneshot(get_request("/api/v1/users")).await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-remaining"], remaining);
        assert_eq!(body_text(response).await, "ok");
    }

    assert_eq!(hits.load(Ordering::SeqCst), 3);
    println!("✅ Requests within the quota pass through untouched");
    Ok(())
}

#[tokio::test]
async fn test_request_over_limit_is_rejected_before_routing() -> Result<()> {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = gateway(&config_with_limit(2), hits.clone());

    for _ in 0..2 {
        app.clone().oneshot(get_request("/api/v1/posts")).await?;
    }
    let response = app.clone().oneshot(get_request("/api/v1/posts")).await?;

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_hardened(response.headers());
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    assert_eq!(body_text(response).await, "Too many requests from this IP");
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    // The quota is shared across the three mount points
    let response = app.oneshot(get_request("/api/v1/comments")).await?;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_quota_is_per_client_address() -> Result<()> {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = gateway(&config_with_limit(1), hits.clone());

    let first = app
        .clone()
        .oneshot(request_from("203.0.113.1:4000", "GET", "/api/v1/users"))
        .await?;
    let second = app
        .clone()
        .oneshot(request_from("203.0.113.1:4001", "GET", "/api/v1/users"))
        .await?;
    let other = app
        .oneshot(request_from("203.0.113.2:4000", "GET", "/api/v1/users"))
        .await?;

    assert_eq!(first.status(), StatusCode::OK);
    // Same IP from a different source port shares the quota
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(other.status(), StatusCode::OK);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_invalid_json_is_a_client_error() -> Result<()> {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = gateway(&Config::default(), hits.clone());

    let response = app
        .oneshot(json_request("/api/v1/users", "{\"name\": \"ana\""))
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_hardened(response.headers());
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );

    let body = body_json(response).await;
    assert_eq!(body["status"], "fail");
    assert_eq!(body["error"]["code"], "VAL_3003");
    assert_eq!(body["error"]["message"], "Invalid JSON format in request body");
    assert!(body["request_id"].as_str().is_some());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_oversized_body_is_rejected() -> Result<()> {
    let config = Config {
        body_limit_bytes: 16,
        ..Config::default()
    };
    let app = gateway(&config, Arc::new(AtomicUsize::new(0)));

    let response = app
        .oneshot(json_request(
            "/api/v1/users",
            "{\"name\": \"a name that is far too long\"}",
        ))
        .await?;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VAL_3009");
    Ok(())
}

#[tokio::test]
async fn test_unmatched_paths_reach_global_handler() -> Result<()> {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = gateway(&Config::default(), hits.clone());

    for path in ["/", "/api/v1/tags", "/api/v2/users", "/healthz"] {
        let response = app.clone().oneshot(get_request(path)).await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", path);
        assert_hardened(response.headers());

        let body = body_json(response).await;
        assert_eq!(body["status"], "fail");
        assert_eq!(
            body["error"]["message"],
            format!("Can't find GET {} on this server", path)
        );
    }

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_unsupported_method_is_not_found() -> Result<()> {
    let app = gateway(&Config::default(), Arc::new(AtomicUsize::new(0)));

    let response = app
        .oneshot(request_from("198.51.100.7:51000", "DELETE", "/api/v1/users"))
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(
        body["error"]["message"],
        "Can't find DELETE /api/v1/users on this server"
    );
    Ok(())
}

#[tokio::test]
async fn test_identical_requests_dispatch_independently() -> Result<()> {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = gateway(&Config::default(), hits.clone());

    let first = app.clone().oneshot(get_request("/api/v1/comments")).await?;
    let second = app.oneshot(get_request("/api/v1/comments")).await?;

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_ne!(
        first.headers()["x-request-id"],
        second.headers()["x-request-id"]
    );
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_cors_preflight() -> Result<()> {
    let app = gateway(&Config::default(), Arc::new(AtomicUsize::new(0)));

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/v1/posts")
        .header(header::ORIGIN, ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())?;
    let response = app.oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
    assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_HEADERS));
    Ok(())
}

#[tokio::test]
async fn test_large_responses_are_compressed() -> Result<()> {
    let app = gateway(&Config::default(), Arc::new(AtomicUsize::new(0)));

    let mut request = get_request("/api/v1/posts/large");
    request
        .headers_mut()
        .insert(header::ACCEPT_ENCODING, "gzip".parse()?);
    let response = app.clone().oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
    assert_hardened(response.headers());

    // Without negotiation the body goes out as written
    let response = app.oneshot(get_request("/api/v1/posts/large")).await?;
    assert!(!response.headers().contains_key(header::CONTENT_ENCODING));
    assert!(body_text(response).await.starts_with("lorem ipsum"));
    Ok(())
}

#[tokio::test]
async fn test_small_responses_are_not_compressed() -> Result<()> {
    let app = gateway(&Config::default(), Arc::new(AtomicUsize::new(0)));

    let mut request = get_request("/api/v1/posts");
    request
        .headers_mut()
        .insert(header::ACCEPT_ENCODING, "gzip, deflate".parse()?);
    let response = app.oneshot(request).await?;

    assert!(!response.headers().contains_key(header::CONTENT_ENCODING));
    assert_eq!(body_text(response).await, "ok");
    Ok(())
}

#[tokio::test]
async fn test_panics_become_internal_errors() -> Result<()> {
    let app = gateway(&Config::default(), Arc::new(AtomicUsize::new(0)));

    let response = app.oneshot(get_request("/api/v1/users/explode")).await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_hardened(response.headers());
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"]["message"], "An unexpected error occurred");
    assert!(!body.to_string().contains("handler exploded"));
    Ok(())
}

#[tokio::test]
async fn test_development_reveals_panic_details() -> Result<()> {
    let config = Config {
        environment: Environment::Development,
        ..Config::default()
    };
    let app = gateway(&config, Arc::new(AtomicUsize::new(0)));

    let response = app.oneshot(get_request("/api/v1/users/explode")).await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"]["details"], "handler exploded");
    Ok(())
}

#[test]
fn test_limiter_never_admits_more_than_quota() {
    use proptest::prelude::*;

    proptest!(ProptestConfig::with_cases(32), |(max_requests in 1u32..12, sent in 0usize..30)| {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = gateway(&config_with_limit(max_requests), hits.clone());

        let statuses: Vec<StatusCode> = tokio_test::block_on(async {
            let mut statuses = Vec::with_capacity(sent);
            for _ in 0..sent {
                let response = app.clone().oneshot(get_request("/api/v1/users")).await.unwrap();
                statuses.push(response.status());
            }
            statuses
        });

        let admitted = sent.min(max_requests as usize);
        prop_assert_eq!(hits.load(Ordering::SeqCst), admitted);
        prop_assert!(statuses[..admitted].iter().all(|s| *s == StatusCode::OK));
        prop_assert!(statuses[admitted..].iter().all(|s| *s == StatusCode::TOO_MANY_REQUESTS));
    });
}
