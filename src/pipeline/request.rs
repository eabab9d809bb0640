//! The request attributes the stages consume.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Instant;

use chrono::{DateTime, Utc};

/// Network identity, cookies and submitted form of one inbound request.
///
/// Built by the HTTP boundary; stages never see the raw request.
#[derive(Debug, Clone, Default)]
pub struct ClientRequest {
    ip: Option<IpAddr>,
    host: Option<String>,
    path: String,
    request_id: Option<String>,
    cookies: HashMap<String, String>,
    form: Option<HashMap<String, String>>,
}

impl ClientRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip = Some(ip);
        self
    }

    /// Hostnames are compared lowercase without a port.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        let host = host.into().trim().to_ascii_lowercase();
        if !host.is_empty() {
            self.host = Some(host);
        }
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_cookies(mut self, cookies: HashMap<String, String>) -> Self {
        self.cookies.extend(cookies);
        self
    }

    pub fn with_form(mut self, form: HashMap<String, String>) -> Self {
        self.form = Some(form);
        self
    }

    pub fn ip(&self) -> Option<IpAddr> {
        self.ip
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn cookies(&self) -> &HashMap<String, String> {
        &self.cookies
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn form(&self) -> Option<&HashMap<String, String>> {
        self.form.as_ref()
    }
}

/// The instant a request is evaluated at, on both clocks.
///
/// Throttle windows use the monotonic clock; tokens and rule windows use wall time.
#[derive(Debug, Clone, Copy)]
pub struct Moment {
    pub instant: Instant,
    pub wall: DateTime<Utc>,
}

impl Moment {
    pub fn now() -> Self {
        Self {
            instant: Instant::now(),
            wall: Utc::now(),
        }
    }

    pub fn at(instant: Instant, wall: DateTime<Utc>) -> Self {
        Self { instant, wall }
    }
}

/// `path` equals `prefix` or lies beneath it on a segment boundary.
pub fn path_within(prefix: &str, path: &str) -> bool {
    path == prefix
        || (prefix.ends_with('/') && path.starts_with(prefix))
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_normalises_host() {
        let request = ClientRequest::new("/login")
            .with_ip("10.1.2.3".parse().unwrap())
            .with_host("  Shop.Example.COM ")
            .with_cookie("ban_token", "abc");

        assert_eq!(request.host(), Some("shop.example.com"));
        assert_eq!(request.cookie("ban_token"), Some("abc"));
        assert!(request.form().is_none());
    }

    #[test]
    fn test_blank_host_is_absent() {
        let request = ClientRequest::new("/").with_host("   ");
        assert_eq!(request.host(), None);
    }
}
