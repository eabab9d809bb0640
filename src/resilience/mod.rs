//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request-time store lookup:
//!     → timeouts.rs (enforce lookup deadline)
//!     → On timeout/failure: caller logs a warning and admits (fail-open)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every store call on the request path has a deadline
//! - Internal faults degrade toward availability, never toward blocking

pub mod timeouts;
