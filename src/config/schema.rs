//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard.
//! All types derive Serde traits for deserialization from config files.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::firewall::EntryAction;

/// Root configuration for the ban management guard.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GuardConfig {
    /// Listener configuration (bind address, trusted proxies).
    pub listener: ListenerConfig,

    /// Static firewall entries.
    pub firewall: FirewallConfig,

    /// Per-client rate limiting.
    pub throttle: ThrottleConfig,

    /// Global flood ceiling.
    pub ddos: DdosConfig,

    /// Ban cookie tracking.
    pub cookie: CookieConfig,

    /// Form inspection for banned email addresses.
    pub banned_email: BannedEmailConfig,

    /// Rule store settings.
    pub store: StoreConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin endpoints.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Peers allowed to set X-Forwarded-For.
    pub trusted_proxies: Vec<IpAddr>,

    /// Maximum form body buffered for inspection.
    pub max_form_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            trusted_proxies: Vec::new(),
            max_form_bytes: 64 * 1024,
        }
    }
}

/// Firewall entry list, evaluated in order.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct FirewallConfig {
    /// Action when no entry and no rule matches.
    pub default_action: EntryAction,

    pub entries: Vec<FirewallEntryConfig>,
}

/// A single `(pattern, action)` pair.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct FirewallEntryConfig {
    pub pattern: String,

    pub action: EntryAction,

    /// Higher priority entries are checked first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

impl FirewallEntryConfig {
    pub fn new(pattern: impl Into<String>, action: EntryAction) -> Self {
        Self {
            pattern: pattern.into(),
            action,
            priority: None,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per window per client key.
    pub limit: u64,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Scope client keys by route.
    pub per_route: bool,

    /// Interval for purging expired counters.
    pub purge_interval_secs: u64,

    /// Route specific overrides.
    pub routes: Vec<RouteLimitConfig>,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 60,
            window_secs: 60,
            per_route: false,
            purge_interval_secs: 60,
            routes: Vec::new(),
        }
    }
}

/// Route specific throttle override.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouteLimitConfig {
    pub path_prefix: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_secs: Option<u64>,
}

/// Global (all clients) ceiling.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DdosConfig {
    pub enabled: bool,

    /// Maximum requests per window across all clients.
    pub global_limit: u64,

    pub window_secs: u64,
}

impl Default for DdosConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            global_limit: 10_000,
            window_secs: 1,
        }
    }
}

/// Ban cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CookieConfig {
    /// Issue and re-check ban cookies.
    pub tracking: bool,

    /// Cookie name.
    pub name: String,

    /// HMAC key. A random key is generated when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_key: Option<String>,

    /// Ban lifetime in seconds.
    pub lifetime_secs: u64,

    /// Add the `Secure` attribute.
    pub secure: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            tracking: true,
            name: "ban_token".to_string(),
            signing_key: None,
            lifetime_secs: 24 * 3600,
            secure: false,
        }
    }
}

/// Email-bearing form inspection.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BannedEmailConfig {
    /// Form field names that carry an email address.
    pub fields: Vec<String>,

    /// Path prefixes of login/registration/reset forms.
    pub paths: Vec<String>,
}

impl Default for BannedEmailConfig {
    fn default() -> Self {
        Self {
            fields: vec!["email".to_string(), "username".to_string(), "login".to_string()],
            paths: vec![
                "/login".to_string(),
                "/register".to_string(),
                "/password/reset".to_string(),
            ],
        }
    }
}

/// Rule store settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Request-time lookup budget in milliseconds.
    pub lookup_timeout_ms: u64,

    /// JSON file with rules and banned emails loaded at boot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_path: Option<String>,

    /// Interval for recomputing stored statuses.
    pub sync_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: 250,
            seed_path: None,
            sync_interval_secs: 300,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin endpoints.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

/// Placeholder key rejected by validation when admin is enabled.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml() {
        let config: GuardConfig = toml::from_str(
            r#"
            [firewall]
            default_action = "allow"

            [[firewall.entries]]
            pattern = "10.0.0.0/8"
            action = "deny"

            [throttle]
            limit = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.firewall.entries.len(), 1);
        assert_eq!(config.firewall.entries[0].action, EntryAction::Deny);
        assert_eq!(config.throttle.limit, 3);
        assert_eq!(config.throttle.window_secs, 60);
        assert!(config.cookie.tracking);
    }
}
