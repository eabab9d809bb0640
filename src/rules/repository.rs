//! Rule and banned-email repository.
//!
//! # Responsibilities
//! - Define the storage contract collaborators implement ([`BanStore`])
//! - Run the status recomputation hook on every save
//! - Bound request-time lookups with a timeout
//!
//! # Design Decisions
//! - Stores only ever receive [`Stamped`] entities, so the hook cannot be skipped
//! - "now" is taken at each save call
//! - Matches are ordered most specific first; ties keep insertion order

use std::cmp::Reverse;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time;

use crate::resilience::timeouts::with_timeout;
use crate::rules::activation::Stamped;
use crate::rules::banned_email::BannedEmail;
use crate::rules::rule::Rule;

/// Storage faults. Request-time callers recover these as fail-open.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("entity rejected: {0}")]
    Rejected(String),
}

/// Network identity to look rules up by.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleCriteria {
    pub ip: Option<IpAddr>,
    pub host: Option<String>,
}

impl RuleCriteria {
    pub fn new(ip: Option<IpAddr>, host: Option<&str>) -> Self {
        Self {
            ip,
            host: host.map(str::to_string),
        }
    }
}

/// Submitted address to look banned emails up by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailCriteria {
    pub email: String,
}

impl EmailCriteria {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

/// Storage contract implemented by the persistence collaborator.
#[async_trait]
pub trait BanStore: Send + Sync {
    /// Rules with `status == true` whose pattern matches, in insertion order.
    async fn find_rules(&self, criteria: &RuleCriteria) -> Result<Vec<Rule>, StoreError>;

    /// Banned emails with `status == true` matching the address, in insertion order.
    async fn find_banned_emails(
        &self,
        criteria: &EmailCriteria,
    ) -> Result<Vec<BannedEmail>, StoreError>;

    /// Insert or replace by id.
    async fn persist_rule(&self, rule: Stamped<Rule>) -> Result<(), StoreError>;

    /// Insert or replace by id.
    async fn persist_banned_email(&self, email: Stamped<BannedEmail>) -> Result<(), StoreError>;

    async fn all_rules(&self) -> Result<Vec<Rule>, StoreError>;

    async fn all_banned_emails(&self) -> Result<Vec<BannedEmail>, StoreError>;
}

/// Outcome of a status synchronisation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub rules: usize,
    pub banned_emails: usize,
    pub changed: usize,
}

/// Read/write access to rules, wrapping a [`BanStore`].
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn BanStore>,
    lookup_timeout: Duration,
}

impl Repository {
    pub fn new(store: Arc<dyn BanStore>, lookup_timeout: Duration) -> Self {
        Self {
            store,
            lookup_timeout,
        }
    }

    pub fn lookup_timeout(&self) -> Duration {
        self.lookup_timeout
    }

    /// Active rules matching the criteria, most specific first.
    pub async fn find_active_rules(&self, criteria: &RuleCriteria) -> Result<Vec<Rule>, StoreError> {
        let mut rules = with_timeout(self.lookup_timeout, self.store.find_rules(criteria)).await?;
        rules.retain(|r| r.status);
        rules.sort_by_key(|r| Reverse(r.pattern.specificity()));
        Ok(rules)
    }

    /// Active banned emails matching the address, most specific first.
    pub async fn find_active_banned_emails(
        &self,
        criteria: &EmailCriteria,
    ) -> Result<Vec<BannedEmail>, StoreError> {
        let mut emails =
            with_timeout(self.lookup_timeout, self.store.find_banned_emails(criteria)).await?;
        emails.retain(|e| e.status);
        emails.sort_by_key(|e| Reverse(e.pattern.specificity()));
        Ok(emails)
    }

    pub async fn save_rule(&self, rule: Rule) -> Result<Rule, StoreError> {
        self.save_rule_at(rule, Utc::now()).await
    }

    /// Recompute `status` at `now`, then persist.
    pub async fn save_rule_at(&self, rule: Rule, now: DateTime<Utc>) -> Result<Rule, StoreError> {
        let stamped = Stamped::stamp(rule, now);
        let saved = stamped.get().clone();
        self.store.persist_rule(stamped).await?;
        Ok(saved)
    }

    pub async fn save_banned_email(&self, email: BannedEmail) -> Result<BannedEmail, StoreError> {
        self.save_banned_email_at(email, Utc::now()).await
    }

    /// Recompute `status` at `now`, then persist.
    pub async fn save_banned_email_at(
        &self,
        email: BannedEmail,
        now: DateTime<Utc>,
    ) -> Result<BannedEmail, StoreError> {
        let stamped = Stamped::stamp(email, now);
        let saved = stamped.get().clone();
        self.store.persist_banned_email(stamped).await?;
        Ok(saved)
    }

    /// Re-save every entity so statuses reflect `now`.
    pub async fn sync_statuses(&self, now: DateTime<Utc>) -> Result<SyncReport, StoreError> {
        let mut report = SyncReport::default();

        for rule in self.store.all_rules().await? {
            let before = rule.status;
            let saved = self.save_rule_at(rule, now).await?;
            report.rules += 1;
            if saved.status != before {
                report.changed += 1;
            }
        }

        for email in self.store.all_banned_emails().await? {
            let before = email.status;
            let saved = self.save_banned_email_at(email, now).await?;
            report.banned_emails += 1;
            if saved.status != before {
                report.changed += 1;
            }
        }

        Ok(report)
    }

    /// Periodically synchronise statuses until shutdown.
    pub async fn run_status_sync(self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = interval.as_secs(), "Status sync starting");

        let mut ticker = time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.sync_statuses(Utc::now()).await {
                        Ok(report) if report.changed > 0 => {
                            tracing::info!(
                                rules = report.rules,
                                banned_emails = report.banned_emails,
                                changed = report.changed,
                                "Rule statuses synchronised"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!(error = %e, "Status sync failed"),
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Status sync received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
