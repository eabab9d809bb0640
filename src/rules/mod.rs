//! Administrator-managed rules and banned emails.
//!
//! # Data Flow
//! ```text
//! Admin/seed writes:
//!     Rule / BannedEmail
//!     → Repository::save_* (activation.rs recomputes status at "now")
//!     → BanStore::persist_* (only accepts Stamped<T>)
//!
//! Request-time reads:
//!     Firewall / Banned-Email stage
//!     → Repository::find_active_* (bounded by lookup timeout)
//!     → status == true entities, most specific first
//! ```
//!
//! # Design Decisions
//! - Status is cached at save time; a periodic sync keeps it from going stale
//! - Store faults surface as [`StoreError`]; stages decide to fail open

pub mod activation;
pub mod banned_email;
pub mod memory;
pub mod repository;
pub mod rule;

pub use activation::{Activatable, ActivationWindow, Stamped};
pub use banned_email::{BannedEmail, EmailPattern};
pub use memory::{MemoryStore, Seed};
pub use repository::{BanStore, EmailCriteria, Repository, RuleCriteria, StoreError, SyncReport};
pub use rule::Rule;
