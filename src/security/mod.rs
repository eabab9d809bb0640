//! Security stages.
//!
//! # Data Flow
//! ```text
//! After the firewall stage:
//!     → throttle.rs     (per-key window, global DDoS ceiling)
//!     → cookie_ban.rs   (verify token.rs ban cookie)
//!     → banned_email.rs (guarded form submissions)
//!
//! Form validation (outside the pipeline):
//!     → validators.rs
//! ```
//!
//! # Design Decisions
//! - Only the throttle holds mutable shared state
//! - Invalid tokens and store faults degrade to Allow

pub mod banned_email;
pub mod cookie_ban;
pub mod throttle;
pub mod token;
pub mod validators;

pub use banned_email::{is_guarded_path, BannedEmailGuard};
pub use cookie_ban::CookieBan;
pub use throttle::{Admission, ClientKey, GlobalCeiling, Limit, RateScope, Throttle};
pub use token::{BanToken, TokenError, TokenSigner};
pub use validators::Validators;
