//! Client IP extraction
//!
//! Extracts the caller address from `X-Forwarded-For` / `X-Real-IP` with
//! validation, falling back to the connection's socket address.

use axum::http::HeaderMap;
use std::net::IpAddr;

/// Extract and validate the client IP for rate limiting and audit logging.
/// Returns "unknown" if nothing trustworthy is available.
pub fn extract_client_ip(headers: &HeaderMap, socket_addr: Option<&std::net::SocketAddr>) -> String {
    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        if let Ok(header_value) = forwarded_for.to_str() {
            // First entry in the chain is the original client.
            if let Some(first) = header_value.split(',').map(str::trim).find(|s| !s.is_empty()) {
                if is_valid_ip(first) {
                    return first.to_string();
                }
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(header_value) = real_ip.to_str() {
            let trimmed = header_value.trim();
            if is_valid_ip(trimmed) {
                return trimmed.to_string();
            }
        }
    }

    if let Some(addr) = socket_addr {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

fn is_valid_ip(s: &str) -> bool {
    s.parse::<IpAddr>().is_ok()
}
