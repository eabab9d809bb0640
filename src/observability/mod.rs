//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Stages, listeners, background tasks produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!     → tracing.rs (per-request span with request id)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows from the HTTP layer into the `Banned` event
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
pub mod tracing;
