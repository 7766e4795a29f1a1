//! Per-client fixed-window rate limiting.
//!
//! Each client key (normally the IP address) gets a window that opens on its
//! first request and lasts `RateLimitConfig::window`. Every request in the
//! window is counted; once the count exceeds `max_requests` the client gets a
//! 429 with the configured message until the window closes. Counts live in a
//! [`RateLimitStore`] so the in-memory default can be swapped or reset.

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::RateLimitConfig;
use crate::utils::client_ip;

/// Rate limit entry - tracks requests per key within the current window
#[derive(Debug, Clone, Copy)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: Instant,
}

/// Request count for a key after recording a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hits {
    pub count: u32,
    /// Time until the key's window closes
    pub reset_in: Duration,
}

/// Storage for per-key request counters.
///
/// `increment` must be atomic per key: concurrent hits for the same key may
/// not be lost.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Record one request for `key` and return the count in its current window
    async fn increment(&self, key: &str) -> Hits;

    /// Forget everything recorded for `key`
    async fn reset_key(&self, key: &str);
}

/// In-memory store backed by a concurrent map.
#[derive(Debug)]
pub struct MemoryStore {
    entries: DashMap<String, RateLimitEntry>,
    window: Duration,
}

impl MemoryStore {
    pub fn new(window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a hit as of `now`. The map's entry guard holds the shard lock
    /// for the whole read-modify-write.
    pub fn increment_at(&self, key: &str, now: Instant) -> Hits {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert(RateLimitEntry {
                count: 0,
                window_start: now,
            });

        // Window expired? Start a new one
        if now.saturating_duration_since(entry.window_start) >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count = entry.count.saturating_add(1);

        let elapsed = now.saturating_duration_since(entry.window_start);
        Hits {
            count: entry.count,
            reset_in: self.window.saturating_sub(elapsed),
        }
    }

    /// Drop entries whose window has closed; returns how many were removed.
    pub fn prune_expired(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.window_start) < self.window);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn increment(&self, key: &str) -> Hits {
        self.increment_at(key, Instant::now())
    }

    async fn reset_key(&self, key: &str) {
        self.entries.remove(key);
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Remaining requests in current window
        remaining: u32,
        /// Time until window resets
        reset_in: Duration,
    },
    /// Request is rate limited
    Limited {
        /// Time until the window closes
        retry_after: Duration,
    },
}

/// Shared limiter handed to the middleware as state.
#[derive(Clone)]
pub struct RateLimiter {
    config: Arc<RateLimitConfig>,
    store: Arc<dyn RateLimitStore>,
    trust_proxy: bool,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, store: Arc<dyn RateLimitStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            trust_proxy: false,
        }
    }

    /// Limiter with a fresh [`MemoryStore`] sized to the configured window
    pub fn in_memory(config: RateLimitConfig) -> Self {
        let store = Arc::new(MemoryStore::new(config.window));
        Self::new(config, store)
    }

    pub fn with_trust_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count a request for `key` and decide whether it may proceed.
    pub async fn check(&self, key: &str) -> RateLimitResult {
        let hits = self.store.increment(key).await;

        if hits.count > self.config.max_requests {
            RateLimitResult::Limited {
                retry_after: hits.reset_in,
            }
        } else {
            RateLimitResult::Allowed {
                remaining: self.config.max_requests - hits.count,
                reset_in: hits.reset_in,
            }
        }
    }

    pub async fn reset(&self, key: &str) {
        self.store.reset_key(key).await;
    }

    fn rejection(&self, retry_after: Duration) -> Response {
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.config.message.clone(),
        )
            .into_response();

        let headers = response.headers_mut();
        self.insert_headers(headers, 0, retry_after);
        headers.insert(header::RETRY_AFTER, HeaderValue::from(ceil_secs(retry_after)));
        response
    }

    fn insert_headers(&self, headers: &mut HeaderMap, remaining: u32, reset_in: Duration) {
        let reset_at = chrono::Utc::now().timestamp() + ceil_secs(reset_in) as i64;

        headers.insert("x-ratelimit-limit", HeaderValue::from(self.config.max_requests));
        headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
        headers.insert("x-ratelimit-reset", HeaderValue::from(reset_at));
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Reject clients over their quota before the request reaches any router.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_ip(&request, limiter.trust_proxy);

    match limiter.check(&key).await {
        RateLimitResult::Allowed {
            remaining,
            reset_in,
        } => {
            debug!(client = %key, remaining, "Rate limit check passed");
            let mut response = next.run(request).await;
            limiter.insert_headers(response.headers_mut(), remaining, reset_in);
            response
        }
        RateLimitResult::Limited { retry_after } => {
            warn!(
                client = %key,
                method = %request.method(),
                uri = %request.uri(),
                retry_after_secs = ceil_secs(retry_after),
                "Rate limit exceeded"
            );
            limiter.rejection(retry_after)
        }
    }
}
