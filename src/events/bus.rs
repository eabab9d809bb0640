//! Typed event fan-out.
//!
//! # Responsibilities
//! - Run registered `Banned` listeners, each isolated from the others' failures
//! - Broadcast `Banned` and `SecurityFormSubmitted` to async subscribers
//!
//! # Design Decisions
//! - Listeners are registered at startup, before the bus is shared
//! - No ordering guarantee between listeners
//! - A broadcast with no subscribers is not an error

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;

use crate::config::ConfigError;
use crate::config::ValidationError;
use crate::events::banned::{Banned, SecurityFormSubmitted};
use crate::observability::metrics;
use crate::security::token::TokenError;

const CHANNEL_CAPACITY: usize = 256;

/// A change a listener wants applied to the rejection response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseEffect {
    /// Full `Set-Cookie` header value.
    SetCookie(String),
}

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("rejected submission: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),

    #[error("listener state poisoned")]
    Poisoned,
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Synchronous reaction to a `Banned` event.
pub trait BannedListener: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_banned(&self, event: &Banned) -> Result<Vec<ResponseEffect>, ListenerError>;
}

pub struct EventBus {
    listeners: Vec<Arc<dyn BannedListener>>,
    banned_tx: broadcast::Sender<Arc<Banned>>,
    security_tx: broadcast::Sender<SecurityFormSubmitted>,
}

impl EventBus {
    pub fn new() -> Self {
        let (banned_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (security_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            listeners: Vec::new(),
            banned_tx,
            security_tx,
        }
    }

    pub fn register(&mut self, listener: Arc<dyn BannedListener>) {
        tracing::debug!(listener = listener.name(), "Registered Banned listener");
        self.listeners.push(listener);
    }

    pub fn listener_names(&self) -> Vec<&'static str> {
        self.listeners.iter().map(|l| l.name()).collect()
    }

    /// Run every listener and broadcast the event. Returns the collected effects.
    pub fn publish_banned(&self, event: Arc<Banned>) -> Vec<ResponseEffect> {
        let mut effects = Vec::new();

        for listener in &self.listeners {
            match listener.on_banned(&event) {
                Ok(mut produced) => effects.append(&mut produced),
                Err(e) => {
                    tracing::error!(listener = listener.name(), error = %e, "Banned listener failed");
                    metrics::record_listener_failure(listener.name());
                }
            }
        }

        let _ = self.banned_tx.send(event);
        effects
    }

    /// Returns the number of subscribers that will receive the submission.
    pub fn publish_security_form(&self, form: SecurityFormSubmitted) -> usize {
        self.security_tx.send(form).unwrap_or(0)
    }

    pub fn subscribe_banned(&self) -> broadcast::Receiver<Arc<Banned>> {
        self.banned_tx.subscribe()
    }

    pub fn subscribe_security_form(&self) -> broadcast::Receiver<SecurityFormSubmitted> {
        self.security_tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Cause, ClientRequest};
    use crate::security::throttle::RateScope;
    use chrono::Utc;

    struct Failing;

    impl BannedListener for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn on_banned(&self, _event: &Banned) -> Result<Vec<ResponseEffect>, ListenerError> {
            Err(ListenerError::Token(TokenError::Malformed))
        }
    }

    struct Cookie;

    impl BannedListener for Cookie {
        fn name(&self) -> &'static str {
            "cookie"
        }

        fn on_banned(&self, _event: &Banned) -> Result<Vec<ResponseEffect>, ListenerError> {
            Ok(vec![ResponseEffect::SetCookie("ban=1".into())])
        }
    }

    fn event() -> Arc<Banned> {
        Arc::new(Banned::new(
            Cause::RateExceeded(RateScope::Client),
            &ClientRequest::new("/"),
            Utc::now(),
        ))
    }

    #[test]
    fn test_failing_listener_does_not_stop_others() {
        let mut bus = EventBus::new();
        bus.register(Arc::new(Failing));
        bus.register(Arc::new(Cookie));

        let effects = bus.publish_banned(event());
        assert_eq!(effects, vec![ResponseEffect::SetCookie("ban=1".into())]);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        assert!(bus.publish_banned(event()).is_empty());
        assert_eq!(bus.publish_security_form(SecurityFormSubmitted::default()), 0);
    }

    #[tokio::test]
    async fn test_security_form_reaches_subscriber() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_security_form();
        let form = SecurityFormSubmitted {
            cookie_tracking: Some(false),
            ..Default::default()
        };

        assert_eq!(bus.publish_security_form(form.clone()), 1);
        assert_eq!(rx.recv().await.unwrap(), form);
    }
}
