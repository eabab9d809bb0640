//! Banned email addresses and email-domain globs.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::firewall::pattern::{Glob, PatternError};
use crate::rules::activation::{Activatable, ActivationWindow};

/// An exact address (`user@example.com`) or a glob (`*@spam.test`,
/// `*@*.spam.test`). A bare domain is shorthand for `*@domain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailPattern(Glob);

impl EmailPattern {
    pub fn matches(&self, email: &str) -> bool {
        self.0.matches(email)
    }

    pub fn specificity(&self) -> u32 {
        if self.0.is_literal() {
            u32::MAX
        } else {
            u32::try_from(self.0.literal_len()).unwrap_or(u32::MAX - 1)
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for EmailPattern {
    type Err = PatternError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PatternError::Empty);
        }
        let normalized = if raw.contains('@') {
            raw.to_string()
        } else {
            format!("*@{raw}")
        };

        let invalid = || PatternError::Email(raw.to_string());
        let (local, domain) = normalized.split_once('@').ok_or_else(invalid)?;
        if local.is_empty()
            || domain.is_empty()
            || domain.contains('@')
            || normalized.chars().any(char::is_whitespace)
        {
            return Err(invalid());
        }

        Glob::new(&normalized).map(Self).map_err(|_| invalid())
    }
}

impl TryFrom<String> for EmailPattern {
    type Error = PatternError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EmailPattern> for String {
    fn from(pattern: EmailPattern) -> Self {
        pattern.0.as_str().to_string()
    }
}

impl fmt::Display for EmailPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_str())
    }
}

/// A persisted email ban. Same activation contract as [`crate::rules::Rule`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannedEmail {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    pub pattern: EmailPattern,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(flatten)]
    pub window: ActivationWindow,

    #[serde(default)]
    pub status: bool,
}

impl BannedEmail {
    pub fn new(pattern: EmailPattern) -> Self {
        Self {
            id: Uuid::new_v4(),
            pattern,
            reason: None,
            window: ActivationWindow::ALWAYS,
            status: false,
        }
    }

    pub fn with_window(mut self, window: ActivationWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn matches(&self, email: &str) -> bool {
        self.pattern.matches(email)
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.window.is_active(now)
    }
}

impl Activatable for BannedEmail {
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
    fn test_exact_address() {
        let pattern: EmailPattern = "Bob@Example.com".parse().unwrap();
        assert!(pattern.matches("bob@example.com"));
        assert!(!pattern.matches("alice@example.com"));
    }

    #[test]
    fn test_domain_globs() {
        let domain: EmailPattern = "spam.test".parse().unwrap();
        assert_eq!(domain.as_str(), "*@spam.test");
        assert!(domain.matches("anyone@spam.test"));
        assert!(!domain.matches("anyone@mail.spam.test"));

        let sub: EmailPattern = "*@*.spam.test".parse().unwrap();
        assert!(sub.matches("x@mail.spam.test"));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!("".parse::<EmailPattern>().is_err());
        assert!("@spam.test".parse::<EmailPattern>().is_err());
        assert!("a@b@c".parse::<EmailPattern>().is_err());
        assert!("a b@c.test".parse::<EmailPattern>().is_err());
    }

    #[test]
    fn test_exact_beats_glob() {
        let exact: EmailPattern = "a@spam.test".parse().unwrap();
        let glob: EmailPattern = "*@spam.test".parse().unwrap();
        assert!(exact.specificity() > glob.specificity());
    }
}
