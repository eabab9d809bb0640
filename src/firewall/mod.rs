//! Firewall subsystem.
//!
//! # Data Flow
//! ```text
//! Boot:
//!     FirewallConfig → factory.rs (parse patterns, order by priority)
//!     → EntrySet (immutable, shared for the process lifetime)
//!
//! Request:
//!     (ip, host) → stage.rs
//!     → first matching entry → Allow / Deny(entry)
//!     → else most specific active rule → Allow / Deny(rule)
//!     → else default action
//! ```
//!
//! # Design Decisions
//! - Malformed patterns fail at boot, never at request time
//! - The entry set is read-only after construction and needs no locking

pub mod entry;
pub mod factory;
pub mod pattern;
pub mod stage;

pub use entry::{EntryAction, EntrySet, FirewallEntry};
pub use factory::EntryFactory;
pub use pattern::{Glob, Pattern, PatternError};
pub use stage::{Firewall, FirewallStage, FirewallVerdict};
