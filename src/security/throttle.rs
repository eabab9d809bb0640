//! Fixed-window throttling and the global DDoS ceiling.
//!
//! # Responsibilities
//! - Count requests per client key (IP, optionally scoped by route)
//! - Apply a global ceiling across all clients
//! - Purge expired windows in the background
//!
//! # Design Decisions
//! - Fixed windows reset at `started + length`; a burst across the boundary
//!   can reach twice the limit
//! - A denied request never increments its counter
//! - Per-key state lives in a sharded map so unrelated keys never contend
//! - The global counter is one packed atomic, updated with CAS

use std::fmt;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::schema::{DdosConfig, ThrottleConfig};
use crate::observability::metrics;
use crate::pipeline::{path_within, Cause, ClientRequest, Moment, Stage, Verdict};

/// Which ceiling tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateScope {
    Client,
    Global,
}

impl fmt::Display for RateScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateScope::Client => write!(f, "client"),
            RateScope::Global => write!(f, "global"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub max: u64,
    pub window: Duration,
}

/// Counter key plus the limit that applies to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey {
    key: String,
    limit: Limit,
}

impl ClientKey {
    pub fn new(key: impl Into<String>, limit: Limit) -> Self {
        Self {
            key: key.into(),
            limit,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn limit(&self) -> Limit {
        self.limit
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allow,
    Deny(RateScope),
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u64,
    length: Duration,
}

impl Window {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) >= self.length
    }
}

#[derive(Debug)]
struct RouteLimit {
    prefix: String,
    limit: Limit,
}

/// Global ceiling. State packs `window_index << 32 | count` into one atomic.
#[derive(Debug)]
pub struct GlobalCeiling {
    limit: u32,
    window: Duration,
    origin: Instant,
    state: AtomicU64,
}

impl GlobalCeiling {
    pub fn new(limit: u32, window: Duration, origin: Instant) -> Self {
        Self {
            limit,
            window: window.max(Duration::from_millis(1)),
            origin,
            state: AtomicU64::new(0),
        }
    }

    fn window_index(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.origin).as_nanos();
        let index = elapsed / self.window.as_nanos();
        // Window 0 is the initial state; real windows start at 1.
        (index as u64).saturating_add(1) & u64::from(u32::MAX)
    }

    pub fn admit(&self, now: Instant) -> bool {
        let index = self.window_index(now);
        let mut current = self.state.load(Ordering::Acquire);

        loop {
            let seen_index = current >> 32;
            let count = current & u64::from(u32::MAX);

            let next = if index > seen_index {
                (index << 32) | 1
            } else if count >= u64::from(self.limit) {
                return false;
            } else {
                current + 1
            };

            match self.state.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Requests counted in the window containing `now`.
    pub fn count(&self, now: Instant) -> u64 {
        let current = self.state.load(Ordering::Acquire);
        if current >> 32 == self.window_index(now) {
            current & u64::from(u32::MAX)
        } else {
            0
        }
    }
}

pub struct Throttle {
    enabled: bool,
    default_limit: Limit,
    per_route: bool,
    routes: Vec<RouteLimit>,
    windows: DashMap<String, Window>,
    ceiling: Option<GlobalCeiling>,
}

impl Throttle {
    pub fn from_config(throttle: &ThrottleConfig, ddos: &DdosConfig) -> Self {
        let default_limit = Limit {
            max: throttle.limit,
            window: Duration::from_secs(throttle.window_secs),
        };

        let mut routes: Vec<RouteLimit> = throttle
            .routes
            .iter()
            .map(|r| RouteLimit {
                prefix: r.path_prefix.clone(),
                limit: Limit {
                    max: r.limit.unwrap_or(default_limit.max),
                    window: r
                        .window_secs
                        .map(Duration::from_secs)
                        .unwrap_or(default_limit.window),
                },
            })
            .collect();
        // Longest prefix first.
        routes.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));

        let ceiling = ddos.enabled.then(|| {
            GlobalCeiling::new(
                u32::try_from(ddos.global_limit).unwrap_or(u32::MAX),
                Duration::from_secs(ddos.window_secs),
                Instant::now(),
            )
        });

        Self {
            enabled: throttle.enabled,
            default_limit,
            per_route: throttle.per_route,
            routes,
            windows: DashMap::new(),
            ceiling,
        }
    }

    /// Counter key for a client on a path.
    ///
    /// Route overrides always scope the key; `per_route` also scopes paths
    /// without an override by their first segment.
    pub fn key_for(&self, ip: Option<IpAddr>, path: &str) -> ClientKey {
        let client = ip.map_or_else(|| "unknown".to_string(), |ip| ip.to_canonical().to_string());

        if let Some(route) = self.routes.iter().find(|r| path_within(&r.prefix, path)) {
            return ClientKey::new(format!("{client}|{}", route.prefix), route.limit);
        }

        if self.per_route {
            let segment = path.trim_start_matches('/').split('/').next().unwrap_or_default();
            return ClientKey::new(format!("{client}|/{segment}"), self.default_limit);
        }

        ClientKey::new(client, self.default_limit)
    }

    /// Count the request against its key and the global ceiling.
    ///
    /// The client slot is only taken once the ceiling has admitted the
    /// request; the entry guard is held across both checks.
    pub fn admit(&self, key: &ClientKey, now: Instant) -> Admission {
        if !self.enabled {
            return self.admit_global(now);
        }

        let limit = key.limit();
        let mut window = self.windows.entry(key.key.clone()).or_insert_with(|| Window {
            started: now,
            count: 0,
            length: limit.window,
        });

        if window.is_expired(now) {
            window.started = now;
            window.count = 0;
            window.length = limit.window;
        }

        if window.count >= limit.max {
            return Admission::Deny(RateScope::Client);
        }
        if let Admission::Deny(scope) = self.admit_global(now) {
            return Admission::Deny(scope);
        }
        window.count += 1;
        Admission::Allow
    }

    fn admit_global(&self, now: Instant) -> Admission {
        match &self.ceiling {
            Some(ceiling) if !ceiling.admit(now) => Admission::Deny(RateScope::Global),
            _ => Admission::Allow,
        }
    }

    /// Requests counted for `key` in its current window.
    pub fn count(&self, key: &ClientKey, now: Instant) -> u64 {
        self.windows
            .get(key.as_str())
            .filter(|w| !w.is_expired(now))
            .map_or(0, |w| w.count)
    }

    pub fn global_count(&self, now: Instant) -> Option<u64> {
        self.ceiling.as_ref().map(|c| c.count(now))
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Drop expired windows. Returns the number removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, w| !w.is_expired(now));
        let remaining = self.windows.len();
        metrics::record_throttle_keys(remaining);
        before.saturating_sub(remaining)
    }

    /// Purge periodically until shutdown.
    pub async fn run_sweeper(self: Arc<Self>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = time::interval(interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.purge_expired(Instant::now());
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.tracked_keys(), "Purged throttle windows");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Throttle sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl Stage for Throttle {
    fn name(&self) -> &'static str {
        "throttle"
    }

    async fn check(&self, request: &ClientRequest, now: &Moment) -> Verdict {
        let key = self.key_for(request.ip(), request.path());
        match self.admit(&key, now.instant) {
            Admission::Allow => Verdict::Allow,
            Admission::Deny(scope) => {
                tracing::warn!(client = %key, scope = %scope, "Rate limit exceeded");
                Verdict::Deny(Cause::RateExceeded(scope))
            }
        }
    }
}
