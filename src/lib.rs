//! Ban management: admission control for HTTP applications.
//!
//! Decides per request whether a client must be blocked, by IP or hostname,
//! by a signed ban cookie, by submitted email address, or by request rate.

// Core
pub mod firewall;
pub mod pipeline;
pub mod rules;
pub mod security;

// Side effects
pub mod events;

// Hosting
pub mod admin;
pub mod config;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::GuardConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::{AdmissionPipeline, Decision};
