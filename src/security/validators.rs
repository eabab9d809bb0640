//! Form-validation predicates.
//!
//! Same checks as the firewall and banned-email stages, returned as booleans
//! so forms can show a validation error instead of rejecting the request.
//! A store fault counts as no match, as in the stages.

use std::net::IpAddr;
use std::sync::Arc;

use crate::firewall::{EntryAction, Firewall, FirewallVerdict};
use crate::observability::metrics;
use crate::rules::{EmailCriteria, Repository, RuleCriteria};

#[derive(Clone)]
pub struct Validators {
    firewall: Arc<Firewall>,
    repository: Repository,
}

impl Validators {
    pub fn new(firewall: Arc<Firewall>, repository: Repository) -> Self {
        Self {
            firewall,
            repository,
        }
    }

    /// `value` may be an IP address or a hostname.
    pub async fn not_banned_hostname(&self, value: &str) -> bool {
        let value = value.trim();
        match value.parse::<IpAddr>() {
            Ok(ip) => self.identity_allowed(Some(ip), None).await,
            Err(_) => {
                let host = value.to_ascii_lowercase();
                self.identity_allowed(None, Some(&host)).await
            }
        }
    }

    pub async fn not_banned_email(&self, value: &str) -> bool {
        let criteria = EmailCriteria::new(value.trim().to_ascii_lowercase());
        match self.repository.find_active_banned_emails(&criteria).await {
            Ok(matches) => matches.is_empty(),
            Err(e) => {
                tracing::warn!(error = %e, "Banned email validation lookup failed");
                metrics::record_store_unavailable("find_banned_emails");
                true
            }
        }
    }

    /// The submitting client's own network identity is not banned.
    pub async fn not_submitter_ip_hostname(&self, ip: Option<IpAddr>, host: Option<&str>) -> bool {
        self.identity_allowed(ip, host).await
    }

    /// `value` looks like an address and is not banned.
    pub async fn not_submitter_email(&self, value: &str) -> bool {
        is_plausible_email(value.trim()) && self.not_banned_email(value).await
    }

    async fn identity_allowed(&self, ip: Option<IpAddr>, host: Option<&str>) -> bool {
        if let Some(entry) = self.firewall.explicit_match(ip, host) {
            return entry.action() == EntryAction::Allow;
        }

        match self.repository.find_active_rules(&RuleCriteria::new(ip, host)).await {
            Ok(rules) => {
                if let Some(rule) = rules.first() {
                    return rule.action == EntryAction::Allow;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Rule validation lookup failed");
                metrics::record_store_unavailable("find_rules");
            }
        }

        self.firewall.evaluate(ip, host) == FirewallVerdict::Allow
    }
}

fn is_plausible_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{FirewallConfig, FirewallEntryConfig};
    use crate::firewall::EntryFactory;
    use crate::rules::{BannedEmail, MemoryStore, Rule};
    use std::time::Duration;

    async fn validators() -> Validators {
        let config = FirewallConfig {
            default_action: EntryAction::Allow,
            entries: vec![FirewallEntryConfig::new("*.blocked.test", EntryAction::Deny)],
        };
        let firewall = Arc::new(Firewall::new(EntryFactory::build(&config).unwrap()));
        let repository = Repository::new(Arc::new(MemoryStore::new()), Duration::from_millis(100));
        repository
            .save_rule(Rule::deny("192.0.2.0/24".parse().unwrap()))
            .await
            .unwrap();
        repository
            .save_banned_email(BannedEmail::new("spam.test".parse().unwrap()))
            .await
            .unwrap();
        Validators::new(firewall, repository)
    }

    #[tokio::test]
    async fn test_hostname_predicate() {
        let v = validators().await;
        assert!(!v.not_banned_hostname("www.Blocked.test").await);
        assert!(!v.not_banned_hostname("192.0.2.55").await);
        assert!(v.not_banned_hostname("example.test").await);
        assert!(v.not_banned_hostname("198.51.100.1").await);
    }

    #[tokio::test]
    async fn test_email_predicates() {
        let v = validators().await;
        assert!(!v.not_banned_email("someone@spam.test").await);
        assert!(v.not_banned_email("someone@ham.test").await);

        assert!(v.not_submitter_email("someone@ham.test").await);
        assert!(!v.not_submitter_email("not an email").await);
        assert!(!v.not_submitter_email("x@spam.test").await);
    }

    #[tokio::test]
    async fn test_submitter_identity() {
        let v = validators().await;
        assert!(!v.not_submitter_ip_hostname(Some("192.0.2.1".parse().unwrap()), None).await);
        assert!(v.not_submitter_ip_hostname(Some("203.0.113.1".parse().unwrap()), Some("ok.test")).await);
    }

    #[tokio::test]
    async fn test_default_deny_applies_without_match() {
        let config = FirewallConfig {
            default_action: EntryAction::Deny,
            entries: vec![FirewallEntryConfig::new("10.0.0.0/8", EntryAction::Allow)],
        };
        let firewall = Arc::new(Firewall::new(EntryFactory::build(&config).unwrap()));
        let repository = Repository::new(Arc::new(MemoryStore::new()), Duration::from_millis(100));
        repository
            .save_rule(Rule::allow("trusted.test".parse().unwrap()))
            .await
            .unwrap();
        let v = Validators::new(firewall, repository);

        assert!(!v.not_banned_hostname("unknown.test").await);
        assert!(!v.not_banned_hostname("198.51.100.1").await);
        assert!(v.not_banned_hostname("10.4.5.6").await);
        assert!(v.not_banned_hostname("trusted.test").await);
    }
}
