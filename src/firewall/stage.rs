//! Firewall evaluation and the pipeline stage built on it.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::firewall::entry::{EntryAction, EntrySet, FirewallEntry};
use crate::observability::metrics;
use crate::pipeline::{Cause, ClientRequest, Moment, Stage, Verdict};
use crate::rules::{Repository, Rule, RuleCriteria};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirewallVerdict {
    Allow,
    Deny(FirewallEntry),
}

/// Pure evaluation over the static entry set.
#[derive(Debug)]
pub struct Firewall {
    entries: EntrySet,
}

impl Firewall {
    pub fn new(entries: EntrySet) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &EntrySet {
        &self.entries
    }

    /// First configured entry matching the identity, ignoring the fallback.
    pub fn explicit_match(&self, ip: Option<IpAddr>, host: Option<&str>) -> Option<&FirewallEntry> {
        self.entries.first_match(ip, host)
    }

    /// First match wins; no match applies the default action.
    pub fn evaluate(&self, ip: Option<IpAddr>, host: Option<&str>) -> FirewallVerdict {
        let entry = self
            .explicit_match(ip, host)
            .unwrap_or_else(|| self.entries.fallback());
        match entry.action() {
            EntryAction::Allow => FirewallVerdict::Allow,
            EntryAction::Deny => FirewallVerdict::Deny(entry.clone()),
        }
    }
}

/// Static entries first, then active repository rules, then the default action.
pub struct FirewallStage {
    firewall: Arc<Firewall>,
    repository: Option<Repository>,
}

impl FirewallStage {
    pub fn new(firewall: Arc<Firewall>, repository: Option<Repository>) -> Self {
        Self {
            firewall,
            repository,
        }
    }

    /// Most specific active rule for the identity. Store faults yield `None`.
    async fn matching_rule(&self, ip: Option<IpAddr>, host: Option<&str>) -> Option<Rule> {
        let repository = self.repository.as_ref()?;
        match repository.find_active_rules(&RuleCriteria::new(ip, host)).await {
            Ok(rules) => rules.into_iter().next(),
            Err(e) => {
                tracing::warn!(error = %e, "Rule lookup failed, skipping repository rules");
                metrics::record_store_unavailable("find_rules");
                None
            }
        }
    }
}

#[async_trait]
impl Stage for FirewallStage {
    fn name(&self) -> &'static str {
        "firewall"
    }

    async fn check(&self, request: &ClientRequest, _now: &Moment) -> Verdict {
        let (ip, host) = (request.ip(), request.host());

        if let Some(entry) = self.firewall.explicit_match(ip, host) {
            return match entry.action() {
                EntryAction::Allow => Verdict::Allow,
                EntryAction::Deny => Verdict::Deny(Cause::FirewallMatch(entry.clone())),
            };
        }

        if let Some(rule) = self.matching_rule(ip, host).await {
            return match rule.action {
                EntryAction::Allow => Verdict::Allow,
                EntryAction::Deny => Verdict::Deny(Cause::RuleMatch(rule)),
            };
        }

        match self.firewall.evaluate(ip, host) {
            FirewallVerdict::Allow => Verdict::Allow,
            FirewallVerdict::Deny(entry) => Verdict::Deny(Cause::FirewallMatch(entry)),
        }
    }
}
