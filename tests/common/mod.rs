//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;

use ban_management::config::{FirewallEntryConfig, GuardConfig};
use ban_management::firewall::EntryAction;
use ban_management::rules::{
    BanStore, BannedEmail, EmailCriteria, MemoryStore, Rule, RuleCriteria, Stamped, StoreError,
};

pub const SIGNING_KEY: &str = "integration-test-signing-key";
pub const ADMIN_KEY: &str = "integration-admin-key";

/// Defaults plus a fixed signing key, so tokens verify across assemblies.
pub fn test_config() -> GuardConfig {
    let mut config = GuardConfig::default();
    config.cookie.signing_key = Some(SIGNING_KEY.to_string());
    config
}

pub fn deny_entry(pattern: &str) -> FirewallEntryConfig {
    FirewallEntryConfig::new(pattern, EntryAction::Deny)
}

pub fn ip(raw: &str) -> IpAddr {
    raw.parse().unwrap()
}

/// Request carrying the peer address the server would normally inject.
pub fn request_from(peer: &str, builder: axum::http::request::Builder, body: Body) -> Request<Body> {
    let addr = SocketAddr::new(ip(peer), 40_000);
    builder.extension(ConnectInfo(addr)).body(body).unwrap()
}

/// In-memory store that counts lookups.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    rule_lookups: AtomicUsize,
    email_lookups: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rule_lookups(&self) -> usize {
        self.rule_lookups.load(Ordering::SeqCst)
    }

    pub fn email_lookups(&self) -> usize {
        self.email_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BanStore for CountingStore {
    async fn find_rules(&self, criteria: &RuleCriteria) -> Result<Vec<Rule>, StoreError> {
        self.rule_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_rules(criteria).await
    }

    async fn find_banned_emails(&self, criteria: &EmailCriteria) -> Result<Vec<BannedEmail>, StoreError> {
        self.email_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_banned_emails(criteria).await
    }

    async fn persist_rule(&self, rule: Stamped<Rule>) -> Result<(), StoreError> {
        self.inner.persist_rule(rule).await
    }

    async fn persist_banned_email(&self, email: Stamped<BannedEmail>) -> Result<(), StoreError> {
        self.inner.persist_banned_email(email).await
    }

    async fn all_rules(&self) -> Result<Vec<Rule>, StoreError> {
        self.inner.all_rules().await
    }

    async fn all_banned_emails(&self) -> Result<Vec<BannedEmail>, StoreError> {
        self.inner.all_banned_emails().await
    }
}

/// Store whose lookups hang or fail, for fail-open checks.
pub enum BrokenStore {
    Slow(Duration),
    Down,
}

impl BrokenStore {
    async fn fault<T: Send>(&self) -> Result<T, StoreError> {
        match self {
            BrokenStore::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Err(StoreError::Unavailable("woke up too late".into()))
            }
            BrokenStore::Down => Err(StoreError::Unavailable("connection refused".into())),
        }
    }
}

#[async_trait]
impl BanStore for BrokenStore {
    async fn find_rules(&self, _criteria: &RuleCriteria) -> Result<Vec<Rule>, StoreError> {
        self.fault().await
    }

    async fn find_banned_emails(&self, _criteria: &EmailCriteria) -> Result<Vec<BannedEmail>, StoreError> {
        self.fault().await
    }

    async fn persist_rule(&self, _rule: Stamped<Rule>) -> Result<(), StoreError> {
        self.fault().await
    }

    async fn persist_banned_email(&self, _email: Stamped<BannedEmail>) -> Result<(), StoreError> {
        self.fault().await
    }

    async fn all_rules(&self) -> Result<Vec<Rule>, StoreError> {
        self.fault().await
    }

    async fn all_banned_emails(&self) -> Result<Vec<BannedEmail>, StoreError> {
        self.fault().await
    }
}
