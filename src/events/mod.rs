//! Ban events and their listeners.
//!
//! # Data Flow
//! ```text
//! Pipeline Blocked(cause)
//!     → EventBus::publish_banned
//!         → CookieBanListener (Set-Cookie on the rejection response)
//!         → broadcast to async subscribers
//!
//! POST /admin/security
//!     → EventBus::publish_security_form
//!         → ConfigStoreListener (validate, write config file)
//! ```
//!
//! # Design Decisions
//! - Listeners never share state; one failing leaves the others untouched
//! - A listener failure never changes the already-decided rejection

pub mod banned;
pub mod bus;
pub mod listeners;

pub use banned::{Banned, ClientIdentity, SecurityFormSubmitted};
pub use bus::{BannedListener, EventBus, ListenerError, ResponseEffect};
pub use listeners::{ConfigStoreListener, CookieBanListener};
