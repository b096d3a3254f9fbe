//! Client identity for rate limiting and report deduplication

use axum::http::HeaderMap;

/// Identity used when no forwarded address is available
pub const UNKNOWN_CLIENT: &str = "unknown";

/// First `X-Forwarded-For` entry; loopback or absent maps to `"unknown"`
pub fn client_id(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    match forwarded {
        Some("::1") | Some("127.0.0.1") | None => UNKNOWN_CLIENT.to_string(),
        Some(ip) => ip.to_string(),
    }
}
