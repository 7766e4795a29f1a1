//! Router configuration module - versioned `/api/v1` gateway
//!
//! The gateway owns the middleware chain and the mount points; what lives
//! under each mount point is supplied by the caller as a plain [`Router`].

use axum::{
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::{
        predicate::{DefaultPredicate, Predicate, SizeAbove},
        CompressionLayer,
    },
    cors::CorsLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::handlers::{comments_router, posts_router, users_router, BlogStore};
use crate::middleware::{
    add_security_headers, global_error_handler, handle_unmatched, panic_response,
    parse_json_body, rate_limit_middleware, request_logger_middleware, AccessLogFormat,
    AccessLogger, BodyLimit, ErrorHandler, RateLimiter,
};

/// Routers mounted under `/api/v1/users`, `/api/v1/posts` and
/// `/api/v1/comments`.
#[derive(Debug, Clone)]
pub struct ResourceRouters {
    pub users: Router,
    pub posts: Router,
    pub comments: Router,
}

impl ResourceRouters {
    /// The bundled users/posts/comments resources over one shared store
    pub fn with_store(store: BlogStore) -> Self {
        Self {
            users: users_router(store.clone()),
            posts: posts_router(store.clone()),
            comments: comments_router(store),
        }
    }
}

/// Build the gateway application.
///
/// Layers, outermost first: CORS, security headers, compression, access log,
/// error rendering, panic capture, body parsing, rate limiting. Anything the
/// resource routers do not claim (path or method) ends in the 404 fallback.
pub fn build_app(config: &Config, routers: ResourceRouters, rate_limiter: RateLimiter) -> Router {
    let v1_api = Router::new()
        .nest("/users", routers.users) // GET/POST /api/v1/users, GET/PATCH/DELETE /api/v1/users/{id}
        .nest("/posts", routers.posts)
        .nest("/comments", routers.comments);

    let access_logger = AccessLogger::new(
        AccessLogFormat::for_environment(config.environment),
        config.trust_proxy,
    );
    let compression = CompressionLayer::new().compress_when(
        DefaultPredicate::new().and(SizeAbove::new(config.compression_threshold)),
    );

    Router::new()
        .nest("/api/v1", v1_api)
        .fallback(handle_unmatched)
        .method_not_allowed_fallback(handle_unmatched)
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(from_fn(add_security_headers))
                .layer(compression)
                .layer(from_fn_with_state(access_logger, request_logger_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(from_fn_with_state(
                    ErrorHandler::new(config.environment),
                    global_error_handler,
                ))
                .layer(CatchPanicLayer::custom(panic_response))
                .layer(from_fn_with_state(
                    BodyLimit(config.body_limit_bytes),
                    parse_json_body,
                ))
                .layer(from_fn_with_state(
                    rate_limiter.with_trust_proxy(config.trust_proxy),
                    rate_limit_middleware,
                )),
        )
}
