//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Parse every firewall pattern so malformed entries fail at boot
//! - Validate value ranges (limits and windows > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GuardConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{GuardConfig, PLACEHOLDER_API_KEY};
use crate::firewall::EntryFactory;

/// Minimum accepted length of a configured signing key.
pub const MIN_SIGNING_KEY_LEN: usize = 16;

/// Longest accepted ban cookie lifetime: ten years.
pub const MAX_COOKIE_LIFETIME_SECS: u64 = 10 * 365 * 24 * 3600;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the whole configuration, collecting every error.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if let Err(mut entry_errors) = EntryFactory::build(&config.firewall) {
        errors.append(&mut entry_errors);
    }

    let throttle = &config.throttle;
    if throttle.enabled {
        if throttle.limit == 0 {
            errors.push(ValidationError::new("throttle.limit", "must be greater than 0"));
        }
        if throttle.window_secs == 0 {
            errors.push(ValidationError::new("throttle.window_secs", "must be greater than 0"));
        }
    }
    if throttle.purge_interval_secs == 0 {
        errors.push(ValidationError::new(
            "throttle.purge_interval_secs",
            "must be greater than 0",
        ));
    }
    for (i, route) in throttle.routes.iter().enumerate() {
        if !route.path_prefix.starts_with('/') {
            errors.push(ValidationError::new(
                format!("throttle.routes[{i}].path_prefix"),
                "must start with '/'",
            ));
        }
        if route.limit == Some(0) {
            errors.push(ValidationError::new(
                format!("throttle.routes[{i}].limit"),
                "must be greater than 0",
            ));
        }
        if route.window_secs == Some(0) {
            errors.push(ValidationError::new(
                format!("throttle.routes[{i}].window_secs"),
                "must be greater than 0",
            ));
        }
    }

    let ddos = &config.ddos;
    if ddos.enabled {
        if ddos.global_limit == 0 || ddos.global_limit > u64::from(u32::MAX) {
            errors.push(ValidationError::new(
                "ddos.global_limit",
                format!("must be between 1 and {}", u32::MAX),
            ));
        }
        if ddos.window_secs == 0 {
            errors.push(ValidationError::new("ddos.window_secs", "must be greater than 0"));
        }
    }

    let cookie = &config.cookie;
    let name_ok = !cookie.name.is_empty()
        && cookie
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !name_ok {
        errors.push(ValidationError::new(
            "cookie.name",
            "must be non-empty and contain only [A-Za-z0-9_.-]",
        ));
    }
    if cookie.lifetime_secs == 0 {
        errors.push(ValidationError::new("cookie.lifetime_secs", "must be greater than 0"));
    } else if cookie.lifetime_secs > MAX_COOKIE_LIFETIME_SECS {
        errors.push(ValidationError::new(
            "cookie.lifetime_secs",
            format!("must be at most {MAX_COOKIE_LIFETIME_SECS}"),
        ));
    }
    if let Some(key) = &cookie.signing_key {
        if key.len() < MIN_SIGNING_KEY_LEN {
            errors.push(ValidationError::new(
                "cookie.signing_key",
                format!("must be at least {MIN_SIGNING_KEY_LEN} bytes"),
            ));
        }
    }

    for (i, path) in config.banned_email.paths.iter().enumerate() {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(
                format!("banned_email.paths[{i}]"),
                "must start with '/'",
            ));
        }
    }

    if config.store.lookup_timeout_ms == 0 {
        errors.push(ValidationError::new("store.lookup_timeout_ms", "must be greater than 0"));
    }
    if config.store.sync_interval_secs == 0 {
        errors.push(ValidationError::new("store.sync_interval_secs", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.admin.enabled && config.admin.api_key == PLACEHOLDER_API_KEY {
        errors.push(ValidationError::new(
            "admin.api_key",
            "placeholder key must be replaced when admin is enabled",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::FirewallEntryConfig;
    use crate::firewall::EntryAction;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GuardConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GuardConfig::default();
        config.listener.bind_address = "nowhere".to_string();
        config
            .firewall
            .entries
            .push(FirewallEntryConfig::new("10.0.0.0/33", EntryAction::Deny));
        config.throttle.limit = 0;
        config.cookie.signing_key = Some("short".to_string());
        config.admin.enabled = true;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "firewall.entries[0].pattern",
                "throttle.limit",
                "cookie.signing_key",
                "admin.api_key",
            ]
        );
    }

    #[test]
    fn test_cookie_lifetime_is_bounded() {
        let mut config = GuardConfig::default();
        config.cookie.lifetime_secs = MAX_COOKIE_LIFETIME_SECS;
        assert!(validate_config(&config).is_ok());

        config.cookie.lifetime_secs = 10_000_000_000_000;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "cookie.lifetime_secs");
    }

    #[test]
    fn test_disabled_throttle_skips_limit_checks() {
        let mut config = GuardConfig::default();
        config.throttle.enabled = false;
        config.throttle.limit = 0;
        assert!(validate_config(&config).is_ok());
    }
}
