//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build firewall/throttle/repository → Import seed
//!     → Assemble pipeline → Start listeners
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Stop background tasks → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Background tasks (sweeper, status sync, config store) all watch the same broadcast

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{assemble, import_seed, Components, StartupError};
