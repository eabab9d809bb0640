//! In-process [`BanStore`].
//!
//! Backs the binary when no external persistence is wired in, and every test.

use std::sync::RwLock;

use async_trait::async_trait;
use serde::Deserialize;

use crate::rules::activation::Stamped;
use crate::rules::banned_email::BannedEmail;
use crate::rules::repository::{BanStore, EmailCriteria, RuleCriteria, StoreError};
use crate::rules::rule::Rule;

/// Seed file contents: `{ "rules": [...], "banned_emails": [...] }`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Seed {
    pub rules: Vec<Rule>,
    pub banned_emails: Vec<BannedEmail>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    rules: RwLock<Vec<Rule>>,
    banned_emails: RwLock<Vec<BannedEmail>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E>(_: E) -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

fn upsert<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T) -> bool) {
    match items.iter_mut().find(|existing| same(existing)) {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}

#[async_trait]
impl BanStore for MemoryStore {
    async fn find_rules(&self, criteria: &RuleCriteria) -> Result<Vec<Rule>, StoreError> {
        let rules = self.rules.read().map_err(poisoned)?;
        Ok(rules
            .iter()
            .filter(|r| r.status && r.matches(criteria.ip, criteria.host.as_deref()))
            .cloned()
            .collect())
    }

    async fn find_banned_emails(
        &self,
        criteria: &EmailCriteria,
    ) -> Result<Vec<BannedEmail>, StoreError> {
        let emails = self.banned_emails.read().map_err(poisoned)?;
        Ok(emails
            .iter()
            .filter(|e| e.status && e.matches(&criteria.email))
            .cloned()
            .collect())
    }

    async fn persist_rule(&self, rule: Stamped<Rule>) -> Result<(), StoreError> {
        let rule = rule.into_inner();
        let mut rules = self.rules.write().map_err(poisoned)?;
        let id = rule.id;
        upsert(&mut rules, rule, |r| r.id == id);
        Ok(())
    }

    async fn persist_banned_email(&self, email: Stamped<BannedEmail>) -> Result<(), StoreError> {
        let email = email.into_inner();
        let mut emails = self.banned_emails.write().map_err(poisoned)?;
        let id = email.id;
        upsert(&mut emails, email, |e| e.id == id);
        Ok(())
    }

    async fn all_rules(&self) -> Result<Vec<Rule>, StoreError> {
        Ok(self.rules.read().map_err(poisoned)?.clone())
    }

    async fn all_banned_emails(&self) -> Result<Vec<BannedEmail>, StoreError> {
        Ok(self.banned_emails.read().map_err(poisoned)?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Repository;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_persist_replaces_by_id() {
        let store = Arc::new(MemoryStore::new());
        let repo = Repository::new(store.clone(), Duration::from_millis(50));

        let saved = repo
            .save_rule(Rule::deny("10.0.0.1".parse().unwrap()).with_reason("first"))
            .await
            .unwrap();
        repo.save_rule(saved.with_reason("second")).await.unwrap();

        let all = store.all_rules().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].reason.as_deref(), Some("second"));
    }

    #[test]
    fn test_seed_parses() {
        let seed: Seed = serde_json::from_str(
            r#"{
                "rules": [
                    {"pattern": "10.0.0.0/8"},
                    {"pattern": "*.trusted.test", "action": "allow", "ends_at": "2030-01-01T00:00:00Z"}
                ],
                "banned_emails": [{"pattern": "spam.test", "reason": "abuse"}]
            }"#,
        )
        .unwrap();

        assert_eq!(seed.rules.len(), 2);
        assert!(seed.rules[1].window.ends_at.is_some());
        assert_eq!(seed.banned_emails[0].pattern.as_str(), "*@spam.test");
    }
}
