//! Request attribute extraction.
//!
//! # Responsibilities
//! - Resolve the client IP, honouring trusted proxies
//! - Extract host, cookies, request id and form fields
//!
//! # Design Decisions
//! - `X-Forwarded-For` is only read when the peer is a trusted proxy
//! - Malformed header values are ignored, never rejected

use std::collections::HashMap;
use std::net::IpAddr;

use axum::http::{header, HeaderMap, Method};

pub const X_REQUEST_ID: &str = "x-request-id";
const X_FORWARDED_FOR: &str = "x-forwarded-for";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// The right-most untrusted address of the forwarding chain, or the peer.
pub fn client_ip(peer: IpAddr, headers: &HeaderMap, trusted_proxies: &[IpAddr]) -> IpAddr {
    let peer = peer.to_canonical();
    if !trusted_proxies.contains(&peer) {
        return peer;
    }

    let chain: Vec<IpAddr> = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|hop| hop.trim().parse::<IpAddr>().ok())
        .map(|ip| ip.to_canonical())
        .collect();

    chain
        .iter()
        .rev()
        .find(|ip| !trusted_proxies.contains(ip))
        .or_else(|| chain.first())
        .copied()
        .unwrap_or(peer)
}

/// `Host` header without its port.
pub fn host_of(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::HOST)?.to_str().ok()?.trim();
    let host = if let Some(rest) = raw.strip_prefix('[') {
        rest.split(']').next().unwrap_or_default()
    } else {
        raw.rsplit_once(':')
            .filter(|(_, port)| port.chars().all(|c| c.is_ascii_digit()))
            .map_or(raw, |(host, _)| host)
    };
    (!host.is_empty()).then(|| host.to_ascii_lowercase())
}

pub fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().trim_matches('"').to_string()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

pub fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// POST/PUT with a urlencoded body.
pub fn is_form_submission(method: &Method, headers: &HeaderMap) -> bool {
    let is_write = method == Method::POST || method == Method::PUT;
    is_write
        && headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with(FORM_CONTENT_TYPE))
}

/// Later duplicates of a field win.
pub fn parse_form(body: &[u8]) -> HashMap<String, String> {
    url::form_urlencoded::parse(body).into_owned().collect()
}
