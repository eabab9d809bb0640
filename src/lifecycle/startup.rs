//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Build the firewall, throttle, repository and signer in dependency order
//! - Register listeners and assemble the pipeline
//! - Import the seed file through the save hook
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Everything built here is immutable or internally synchronised

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::schema::GuardConfig;
use crate::config::{validate_config, ConfigError};
use crate::events::{CookieBanListener, EventBus};
use crate::firewall::{EntryFactory, Firewall, FirewallStage};
use crate::pipeline::{AdmissionPipeline, Stage};
use crate::rules::{BanStore, Repository, Seed, StoreError};
use crate::security::{BannedEmailGuard, CookieBan, Throttle, TokenError, TokenSigner, Validators};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("signing key error: {0}")]
    Token(#[from] TokenError),

    #[error("failed to read seed file: {0}")]
    SeedIo(#[from] std::io::Error),

    #[error("failed to parse seed file: {0}")]
    SeedParse(#[from] serde_json::Error),

    #[error("failed to store seed entry: {0}")]
    Store(#[from] StoreError),
}

/// Everything the HTTP host needs, built once.
#[derive(Clone)]
pub struct Components {
    pub pipeline: Arc<AdmissionPipeline>,
    pub bus: Arc<EventBus>,
    pub firewall: Arc<Firewall>,
    pub throttle: Arc<Throttle>,
    pub repository: Repository,
    pub validators: Validators,
    pub signer: TokenSigner,
}

/// Build the pipeline and its collaborators from configuration.
pub fn assemble(config: &GuardConfig, store: Arc<dyn BanStore>) -> Result<Components, StartupError> {
    validate_config(config).map_err(ConfigError::Validation)?;

    let entries = EntryFactory::build(&config.firewall).map_err(ConfigError::Validation)?;
    tracing::info!(
        entries = entries.len(),
        default_action = ?config.firewall.default_action,
        "Firewall entries loaded"
    );
    let firewall = Arc::new(Firewall::new(entries));

    let repository = Repository::new(store, Duration::from_millis(config.store.lookup_timeout_ms));
    let throttle = Arc::new(Throttle::from_config(&config.throttle, &config.ddos));

    let signer = match &config.cookie.signing_key {
        Some(key) => TokenSigner::new(key.as_bytes())?,
        None => {
            tracing::warn!("No cookie signing key configured, ban cookies will not survive a restart");
            TokenSigner::random()
        }
    };

    let mut bus = EventBus::new();
    let cookie_stage: Option<Arc<dyn Stage>> = if config.cookie.tracking {
        bus.register(Arc::new(CookieBanListener::new(
            signer.clone(),
            config.cookie.name.clone(),
            i64::try_from(config.cookie.lifetime_secs)
                .ok()
                .and_then(chrono::Duration::try_seconds)
                .unwrap_or(chrono::Duration::MAX),
            config.cookie.secure,
        )));
        Some(Arc::new(CookieBan::new(signer.clone(), config.cookie.name.clone())))
    } else {
        None
    };
    let bus = Arc::new(bus);

    let pipeline = Arc::new(AdmissionPipeline::new(
        Arc::new(FirewallStage::new(firewall.clone(), Some(repository.clone()))),
        throttle.clone(),
        cookie_stage,
        Arc::new(BannedEmailGuard::new(repository.clone(), &config.banned_email)),
        bus.clone(),
    ));
    tracing::info!(stages = ?pipeline.stage_names(), "Admission pipeline assembled");

    Ok(Components {
        validators: Validators::new(firewall.clone(), repository.clone()),
        pipeline,
        bus,
        firewall,
        throttle,
        repository,
        signer,
    })
}

/// Save every seed entry through the repository. Returns `(rules, banned_emails)`.
pub async fn import_seed(repository: &Repository, path: &Path) -> Result<(usize, usize), StartupError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let seed: Seed = serde_json::from_str(&raw)?;
    let counts = (seed.rules.len(), seed.banned_emails.len());

    for rule in seed.rules {
        repository.save_rule(rule).await?;
    }
    for email in seed.banned_emails {
        repository.save_banned_email(email).await?;
    }

    tracing::info!(
        path = %path.display(),
        rules = counts.0,
        banned_emails = counts.1,
        "Seed imported"
    );
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::MemoryStore;

    #[test]
    fn test_stage_order_with_and_without_tracking() {
        let mut config = GuardConfig::default();
        let components = assemble(&config, Arc::new(MemoryStore::new())).unwrap();
        assert_eq!(
            components.pipeline.stage_names(),
            vec!["firewall", "throttle", "cookie_ban", "banned_email"]
        );
        assert_eq!(components.bus.listener_names(), vec!["cookie_ban"]);

        config.cookie.tracking = false;
        let components = assemble(&config, Arc::new(MemoryStore::new())).unwrap();
        assert_eq!(
            components.pipeline.stage_names(),
            vec!["firewall", "throttle", "banned_email"]
        );
        assert!(components.bus.listener_names().is_empty());
    }

    #[test]
    fn test_bad_entry_stops_startup() {
        let mut config = GuardConfig::default();
        config.firewall.entries.push(crate::config::FirewallEntryConfig::new(
            "not a pattern!",
            crate::firewall::EntryAction::Deny,
        ));
        let err = assemble(&config, Arc::new(MemoryStore::new())).err().unwrap();
        assert!(matches!(err, StartupError::Config(ConfigError::Validation(_))));
    }

    #[test]
    fn test_oversized_cookie_lifetime_stops_startup() {
        let mut config = GuardConfig::default();
        config.cookie.lifetime_secs = 10_000_000_000_000;
        let err = assemble(&config, Arc::new(MemoryStore::new())).err().unwrap();
        assert!(matches!(err, StartupError::Config(ConfigError::Validation(_))));
    }

    #[tokio::test]
    async fn test_seed_goes_through_save_hook() {
        let path = std::env::temp_dir().join(format!("ban-seed-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"{"rules":[{"pattern":"10.0.0.0/8"},{"pattern":"192.0.2.1","ends_at":"2000-01-01T00:00:00Z"}],
               "banned_emails":[{"pattern":"spam.test"}]}"#,
        )
        .unwrap();

        let store = Arc::new(MemoryStore::new());
        let repository = Repository::new(store.clone(), Duration::from_millis(100));
        assert_eq!(import_seed(&repository, &path).await.unwrap(), (2, 1));

        let rules = store.all_rules().await.unwrap();
        assert!(rules[0].status);
        assert!(!rules[1].status);
        let _ = std::fs::remove_file(path);
    }
}
