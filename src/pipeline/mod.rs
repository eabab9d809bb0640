//! Admission pipeline.
//!
//! # Data Flow
//! ```text
//! ClientRequest
//!     → Firewall stage   (static entries, then active repository rules)
//!     → Throttle stage   (per-key window, global DDoS ceiling)
//!     → Cookie-ban stage (signed token from a prior ban)
//!     → Banned-email stage (guarded form submissions only)
//!     → Allowed | Blocked(cause) → Banned event
//! ```
//!
//! # Design Decisions
//! - The first deny short-circuits; later stages never run
//! - Stages report faults as `Allow`, never as errors

pub mod admission;
pub mod request;
pub mod verdict;

use async_trait::async_trait;

pub use admission::{AdmissionPipeline, AdmissionState, Decision};
pub use request::{path_within, ClientRequest, Moment};
pub use verdict::{Cause, Verdict};

/// One decision step of the pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self, request: &ClientRequest, now: &Moment) -> Verdict;
}
