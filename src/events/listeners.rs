//! The two listeners the guard ships with.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Duration;
use tokio::sync::broadcast;

use crate::config::schema::GuardConfig;
use crate::config::{save_config, validate_config};
use crate::events::banned::{Banned, SecurityFormSubmitted};
use crate::events::bus::{BannedListener, ListenerError, ResponseEffect};
use crate::observability::metrics;
use crate::pipeline::Cause;
use crate::security::token::{BanToken, TokenSigner};

/// Issues a signed ban cookie on the rejection response.
pub struct CookieBanListener {
    signer: TokenSigner,
    cookie_name: String,
    lifetime: Duration,
    secure: bool,
}

impl CookieBanListener {
    pub fn new(signer: TokenSigner, cookie_name: impl Into<String>, lifetime: Duration, secure: bool) -> Self {
        Self {
            signer,
            cookie_name: cookie_name.into(),
            lifetime,
            secure,
        }
    }

    fn set_cookie(&self, value: &str, max_age: i64) -> String {
        let mut header = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.cookie_name, value, max_age
        );
        if self.secure {
            header.push_str("; Secure");
        }
        header
    }
}

impl BannedListener for CookieBanListener {
    fn name(&self) -> &'static str {
        "cookie_ban"
    }

    fn on_banned(&self, event: &Banned) -> Result<Vec<ResponseEffect>, ListenerError> {
        // The client already carries a valid token for this ban.
        if matches!(event.cause, Cause::PriorBan(_)) {
            return Ok(Vec::new());
        }

        let token = BanToken::issue(event.cause.label(), event.at, self.lifetime)?;
        let value = self.signer.sign(&token)?;
        Ok(vec![ResponseEffect::SetCookie(
            self.set_cookie(&value, self.lifetime.num_seconds()),
        )])
    }
}

/// Persists security settings submitted through the admin form.
///
/// Changes are written to the config file and take effect at next boot.
pub struct ConfigStoreListener {
    path: Option<PathBuf>,
    current: Mutex<GuardConfig>,
}

impl ConfigStoreListener {
    pub fn new(path: Option<PathBuf>, current: GuardConfig) -> Self {
        Self {
            path,
            current: Mutex::new(current),
        }
    }

    /// Merge the submission, validate (entry patterns included), and write it out.
    pub fn apply(&self, form: &SecurityFormSubmitted) -> Result<GuardConfig, ListenerError> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| ListenerError::Poisoned)?;
        let merged = merge(&current, form);

        validate_config(&merged).map_err(ListenerError::Invalid)?;

        match &self.path {
            Some(path) => {
                save_config(path, &merged)?;
                tracing::info!(path = %path.display(), "Stored submitted security settings");
            }
            None => tracing::info!("No config file configured, submitted settings kept in memory"),
        }

        *current = merged.clone();
        Ok(merged)
    }

    pub fn current(&self) -> Option<GuardConfig> {
        self.current.lock().ok().map(|c| c.clone())
    }

    /// Consume submissions until shutdown.
    pub async fn run(
        self,
        mut submissions: broadcast::Receiver<SecurityFormSubmitted>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                received = submissions.recv() => match received {
                    Ok(form) => {
                        if let Err(e) = self.apply(&form) {
                            tracing::error!(error = %e, "Failed to store security settings");
                            metrics::record_listener_failure("config_store");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Config store listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = shutdown.recv() => {
                    tracing::info!("Config store listener received shutdown signal");
                    break;
                }
            }
        }
    }
}

fn merge(current: &GuardConfig, form: &SecurityFormSubmitted) -> GuardConfig {
    let mut merged = current.clone();
    if let Some(entries) = &form.firewall_entries {
        merged.firewall.entries = entries.clone();
    }
    if let Some(action) = form.default_action {
        merged.firewall.default_action = action;
    }
    if let Some(throttle) = &form.throttle {
        merged.throttle = throttle.clone();
    }
    if let Some(ddos) = &form.ddos {
        merged.ddos = ddos.clone();
    }
    if let Some(tracking) = form.cookie_tracking {
        merged.cookie.tracking = tracking;
    }
    merged
}
