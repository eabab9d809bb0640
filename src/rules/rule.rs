//! Ban/allow rules managed by administrators.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::firewall::{EntryAction, Pattern};
use crate::rules::activation::{Activatable, ActivationWindow};

/// A persisted directive for an IP, CIDR block, range or hostname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    pub pattern: Pattern,

    #[serde(default = "default_rule_action")]
    pub action: EntryAction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(flatten)]
    pub window: ActivationWindow,

    /// Cached `window.is_active(now)` as of the last save.
    #[serde(default)]
    pub status: bool,
}

fn default_rule_action() -> EntryAction {
    EntryAction::Deny
}

impl Rule {
    pub fn new(pattern: Pattern, action: EntryAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            pattern,
            action,
            reason: None,
            window: ActivationWindow::ALWAYS,
            status: false,
        }
    }

    pub fn deny(pattern: Pattern) -> Self {
        Self::new(pattern, EntryAction::Deny)
    }

    pub fn allow(pattern: Pattern) -> Self {
        Self::new(pattern, EntryAction::Allow)
    }

    pub fn with_window(mut self, window: ActivationWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn matches(&self, ip: Option<IpAddr>, host: Option<&str>) -> bool {
        self.pattern.matches(ip, host)
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.window.is_active(now)
    }
}

impl Activatable for Rule {
    fn window(&self) -> &ActivationWindow {
        &self.window
    }

    fn status(&self) -> bool {
        self.status
    }

    fn set_status(&mut self, status: bool) {
        self.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_defaults() {
        let rule: Rule = serde_json::from_str(r#"{ "pattern": "10.0.0.0/8" }"#).unwrap();
        assert_eq!(rule.action, EntryAction::Deny);
        assert_eq!(rule.window, ActivationWindow::ALWAYS);
        assert!(!rule.status);
    }

    #[test]
    fn test_window_fields_are_flat() {
        let rule: Rule = serde_json::from_str(
            r#"{ "pattern": "*.spam.test", "action": "deny",
                 "starts_at": "2024-01-01T00:00:00Z", "ends_at": "2024-02-01T00:00:00Z" }"#,
        )
        .unwrap();
        assert!(rule.window.starts_at.is_some());
        assert!(rule.matches(None, Some("mx.spam.test")));
    }
}
