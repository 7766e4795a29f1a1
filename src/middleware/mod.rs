// Middleware module - body parsing, security headers, logging, rate limiting, errors

pub mod body_parser;
pub mod error_handler;
pub mod rate_limit;
pub mod request_logger;
pub mod security_headers;

pub use body_parser::{parse_json_body, BodyLimit, ParsedBody};
pub use error_handler::{global_error_handler, handle_unmatched, panic_response, ErrorHandler};
pub use rate_limit::{rate_limit_middleware, MemoryStore, RateLimitStore, RateLimiter};
pub use request_logger::{request_logger_middleware, AccessLogFormat, AccessLogger, RequestId};
pub use security_headers::add_security_headers;
