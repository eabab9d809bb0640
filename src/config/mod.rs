//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, firewall patterns parsed)
//!     → GuardConfig (validated, immutable)
//!     → consumed once at boot by lifecycle::startup
//!
//! On security form submission:
//!     ConfigStoreListener merges the submitted settings
//!     → validation.rs validates
//!     → loader.rs writes the file (applies at next boot)
//! ```
//!
//! # Design Decisions
//! - Config is read at boot only; request handling never re-reads it
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, save_config, ConfigError};
pub use schema::{
    AdminConfig, BannedEmailConfig, CookieConfig, DdosConfig, FirewallConfig,
    FirewallEntryConfig, GuardConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    RouteLimitConfig, StoreConfig, ThrottleConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
