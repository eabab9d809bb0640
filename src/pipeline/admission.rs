//! Admission state machine.
//!
//! # Responsibilities
//! - Run the stages in their fixed order, stopping at the first deny
//! - Turn a block into a `Banned` event and collect the listeners' response effects
//! - Count admitted and blocked requests
//!
//! # Design Decisions
//! - Nothing is published until the terminal `Blocked` transition
//! - Listener work on the request path is bounded to cheap synchronous handlers;
//!   async subscribers receive the event through the bus broadcast

use std::sync::Arc;

use crate::events::{Banned, EventBus, ResponseEffect};
use crate::observability::metrics;
use crate::pipeline::request::{ClientRequest, Moment};
use crate::pipeline::verdict::{Cause, Verdict};
use crate::pipeline::Stage;

/// Where evaluation of a single request stands.
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionState {
    /// About to run the stage at this index.
    Evaluating(usize),
    Allowed,
    Blocked(Cause),
}

impl AdmissionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AdmissionState::Evaluating(_))
    }
}

/// Terminal outcome handed back to the HTTP boundary.
#[derive(Debug, Clone)]
pub enum Decision {
    Allowed,
    Blocked {
        event: Arc<Banned>,
        effects: Vec<ResponseEffect>,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

pub struct AdmissionPipeline {
    stages: Vec<Arc<dyn Stage>>,
    bus: Arc<EventBus>,
}

impl AdmissionPipeline {
    /// Stages in evaluation order: firewall, throttle, cookie ban (when tracking is on),
    /// banned email.
    pub fn new(
        firewall: Arc<dyn Stage>,
        throttle: Arc<dyn Stage>,
        cookie_ban: Option<Arc<dyn Stage>>,
        banned_email: Arc<dyn Stage>,
        bus: Arc<EventBus>,
    ) -> Self {
        let mut stages = vec![firewall, throttle];
        stages.extend(cookie_ban);
        stages.push(banned_email);
        Self::with_stages(stages, bus)
    }

    /// Pipeline over an arbitrary stage list.
    pub fn with_stages(stages: Vec<Arc<dyn Stage>>, bus: Arc<EventBus>) -> Self {
        Self { stages, bus }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Drive the state machine to a terminal state. Publishes nothing.
    pub async fn evaluate(&self, request: &ClientRequest, now: &Moment) -> AdmissionState {
        let mut state = AdmissionState::Evaluating(0);

        while let AdmissionState::Evaluating(index) = state {
            state = match self.stages.get(index) {
                None => AdmissionState::Allowed,
                Some(stage) => match stage.check(request, now).await {
                    Verdict::Allow => AdmissionState::Evaluating(index + 1),
                    Verdict::Deny(cause) => {
                        tracing::debug!(stage = stage.name(), cause = cause.label(), "Stage denied request");
                        AdmissionState::Blocked(cause)
                    }
                },
            };
        }

        state
    }

    /// Evaluate, and on a block publish `Banned` and return the response effects.
    pub async fn admit(&self, request: &ClientRequest, now: &Moment) -> Decision {
        match self.evaluate(request, now).await {
            AdmissionState::Blocked(cause) => {
                metrics::record_blocked(cause.label());
                tracing::info!(
                    client_ip = ?request.ip(),
                    host = ?request.host(),
                    path = %request.path(),
                    request_id = ?request.request_id(),
                    cause = %cause,
                    "Request blocked"
                );

                let event = Arc::new(Banned::new(cause, request, now.wall));
                let effects = self.bus.publish_banned(event.clone());
                Decision::Blocked { event, effects }
            }
            _ => {
                metrics::record_admitted();
                Decision::Allowed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        verdict: Verdict,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(verdict: Verdict) -> Arc<Self> {
            Arc::new(Self {
                verdict,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Stage for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn check(&self, _request: &ClientRequest, _now: &Moment) -> Verdict {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.verdict.clone()
        }
    }

    fn deny() -> Verdict {
        Verdict::Deny(Cause::RateExceeded(crate::security::throttle::RateScope::Client))
    }

    #[tokio::test]
    async fn test_all_allow_reaches_allowed() {
        let stages = [Fixed::new(Verdict::Allow), Fixed::new(Verdict::Allow)];
        let pipeline = AdmissionPipeline::with_stages(
            stages.iter().map(|s| s.clone() as Arc<dyn Stage>).collect(),
            Arc::new(EventBus::new()),
        );

        let state = pipeline.evaluate(&ClientRequest::new("/"), &Moment::now()).await;
        assert_eq!(state, AdmissionState::Allowed);
        assert!(stages.iter().all(|s| s.calls.load(Ordering::SeqCst) == 1));
    }

    #[tokio::test]
    async fn test_first_deny_short_circuits() {
        let first = Fixed::new(Verdict::Allow);
        let second = Fixed::new(deny());
        let third = Fixed::new(Verdict::Allow);
        let pipeline = AdmissionPipeline::with_stages(
            vec![first.clone() as Arc<dyn Stage>, second.clone(), third.clone()],
            Arc::new(EventBus::new()),
        );

        let state = pipeline.evaluate(&ClientRequest::new("/"), &Moment::now()).await;
        assert!(matches!(state, AdmissionState::Blocked(Cause::RateExceeded(_))));
        assert_eq!(third.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_admit_publishes_once_on_block() {
        let bus = Arc::new(EventBus::new());
        let mut rx = bus.subscribe_banned();
        let pipeline = AdmissionPipeline::with_stages(vec![Fixed::new(deny()) as Arc<dyn Stage>], bus);

        let decision = pipeline.admit(&ClientRequest::new("/"), &Moment::now()).await;
        assert!(!decision.is_allowed());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_empty_pipeline_allows() {
        let pipeline = AdmissionPipeline::with_stages(Vec::new(), Arc::new(EventBus::new()));
        let decision = pipeline.admit(&ClientRequest::new("/"), &Moment::now()).await;
        assert!(decision.is_allowed());
    }
}
