//! Stage outcomes and ban causes.

use std::fmt;

use crate::firewall::FirewallEntry;
use crate::rules::{BannedEmail, Rule};
use crate::security::throttle::RateScope;
use crate::security::token::BanToken;

/// What got a request blocked.
#[derive(Debug, Clone, PartialEq)]
pub enum Cause {
    /// A configured firewall entry (or a deny fallback) matched.
    FirewallMatch(FirewallEntry),
    /// An active repository rule with action `deny` matched.
    RuleMatch(Rule),
    /// A submitted form field matched an active banned email.
    EmailMatch { rule: BannedEmail, email: String },
    RateExceeded(RateScope),
    /// The client presented a valid, unexpired ban token.
    PriorBan(BanToken),
}

impl Cause {
    /// Stable label for metrics and token claims.
    pub fn label(&self) -> &'static str {
        match self {
            Cause::FirewallMatch(_) => "firewall",
            Cause::RuleMatch(_) => "rule",
            Cause::EmailMatch { .. } => "email",
            Cause::RateExceeded(_) => "rate_exceeded",
            Cause::PriorBan(_) => "prior_ban",
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Cause::RateExceeded(_))
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::FirewallMatch(entry) if entry.is_fallback() => {
                write!(f, "denied by default firewall action")
            }
            Cause::FirewallMatch(entry) => write!(f, "firewall entry '{}'", entry.pattern()),
            Cause::RuleMatch(rule) => match &rule.reason {
                Some(reason) => write!(f, "rule '{}': {}", rule.pattern, reason),
                None => write!(f, "rule '{}'", rule.pattern),
            },
            Cause::EmailMatch { rule, .. } => write!(f, "banned email '{}'", rule.pattern),
            Cause::RateExceeded(scope) => write!(f, "{scope} rate limit exceeded"),
            Cause::PriorBan(token) => write!(f, "prior ban: {}", token.reason),
        }
    }
}

/// Result of a single stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Allow,
    Deny(Cause),
}

impl Verdict {
    pub fn is_allow(&self) -> bool {
        matches!(self, Verdict::Allow)
    }
}
