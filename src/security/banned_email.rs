//! Banned-email stage.
//!
//! Inspects email-bearing form submissions on guarded paths. Lookups go
//! through the repository and fail open.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::config::schema::BannedEmailConfig;
use crate::observability::metrics;
use crate::pipeline::{path_within, Cause, ClientRequest, Moment, Stage, Verdict};
use crate::rules::{BannedEmail, EmailCriteria, Repository};

/// `path` equals a prefix or continues it with a `/` segment.
pub fn is_guarded_path(prefixes: &[String], path: &str) -> bool {
    prefixes.iter().any(|p| path_within(p, path))
}

pub struct BannedEmailGuard {
    repository: Repository,
    fields: Vec<String>,
    paths: Vec<String>,
}

impl BannedEmailGuard {
    pub fn new(repository: Repository, config: &BannedEmailConfig) -> Self {
        Self {
            repository,
            fields: config.fields.clone(),
            paths: config.paths.clone(),
        }
    }

    /// True when submissions to `path` are inspected.
    pub fn applies_to(&self, path: &str) -> bool {
        is_guarded_path(&self.paths, path)
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Non-empty values of the configured email fields.
    pub fn submitted_emails<'a>(&'a self, form: &'a HashMap<String, String>) -> impl Iterator<Item = &'a str> {
        self.fields
            .iter()
            .filter_map(|field| form.get(field))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// First active banned email matching any submitted address.
    ///
    /// Store faults are logged and treated as no match.
    pub async fn check(&self, form: &HashMap<String, String>) -> Option<(BannedEmail, String)> {
        for email in self.submitted_emails(form) {
            match self
                .repository
                .find_active_banned_emails(&EmailCriteria::new(email.to_ascii_lowercase()))
                .await
            {
                Ok(matches) => {
                    if let Some(rule) = matches.into_iter().next() {
                        return Some((rule, email.to_string()));
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Banned email lookup failed, admitting");
                    metrics::record_store_unavailable("find_banned_emails");
                }
            }
        }
        None
    }
}

#[async_trait]
impl Stage for BannedEmailGuard {
    fn name(&self) -> &'static str {
        "banned_email"
    }

    async fn check(&self, request: &ClientRequest, _now: &Moment) -> Verdict {
        let Some(form) = request.form() else {
            return Verdict::Allow;
        };
        if !self.applies_to(request.path()) {
            return Verdict::Allow;
        }

        match BannedEmailGuard::check(self, form).await {
            Some((rule, email)) => Verdict::Deny(Cause::EmailMatch { rule, email }),
            None => Verdict::Allow,
        }
    }
}
