// Utility functions for extracting client information from requests

use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderMap,
};
use std::net::SocketAddr;

/// Key used for clients whose address cannot be determined
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Client address announced by a reverse proxy: the first
/// `X-Forwarded-For` hop, else `X-Real-IP`. Blank values are skipped.
pub fn extract_forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let first_hop = header_str(headers, "x-forwarded-for")
        .and_then(|chain| chain.split(',').next())
        .map(str::trim);
    let real_ip = header_str(headers, "x-real-ip").map(str::trim);

    [first_hop, real_ip]
        .into_iter()
        .flatten()
        .find(|ip| !ip.is_empty())
        .map(str::to_string)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Peer address recorded by `into_make_service_with_connect_info`
pub fn peer_ip(request: &Request) -> Option<String> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

/// Client identity used for rate limiting and access logs.
///
/// Proxy headers are only honoured when `trust_proxy` is set, otherwise any
/// client could pick its own rate-limit key.
pub fn client_ip(request: &Request, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(ip) = extract_forwarded_ip(request.headers()) {
            return ip;
        }
    }

    peer_ip(request).unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "user-agent").map(str::to_string)
}

/// Referer, or the Referrer spelling some clients send
pub fn extract_referrer(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "referer")
        .or_else(|| header_str(headers, "referrer"))
        .map(str::to_string)
}
