use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Request, Response},
    middleware::Next,
};

/// Content Security Policy applied to every response
pub const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
    base-uri 'self'; \
    font-src 'self' https: data:; \
    form-action 'self'; \
    frame-ancestors 'self'; \
    img-src 'self' data:; \
    object-src 'none'; \
    script-src 'self'; \
    script-src-attr 'none'; \
    style-src 'self' https: 'unsafe-inline'; \
    upgrade-insecure-requests";

/// Hardening headers set on every response
///
/// Headers added:
/// - Content-Security-Policy: restrict resource loading
/// - Cross-Origin-Opener-Policy / Cross-Origin-Resource-Policy: same-origin isolation
/// - Origin-Agent-Cluster: request origin-keyed agent clusters
/// - Referrer-Policy: no-referrer
/// - Strict-Transport-Security: 180 days, including subdomains
/// - X-Content-Type-Options: nosniff (prevent MIME sniffing)
/// - X-DNS-Prefetch-Control: off
/// - X-Download-Options: noopen
/// - X-Frame-Options: SAMEORIGIN (prevent clickjacking)
/// - X-Permitted-Cross-Domain-Policies: none
/// - X-XSS-Protection: 0 (the legacy auditor does more harm than good)
pub const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("content-security-policy", CONTENT_SECURITY_POLICY),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

pub async fn add_security_headers(request: Request<Body>, next: Next) -> Response<Body> {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    for &(name, value) in SECURITY_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    // Remove server identification (if present)
    headers.remove(header::SERVER);
    headers.remove("x-powered-by");

    response
}
