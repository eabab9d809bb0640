//! HTTP boundary.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, tracing, timeout)
//!     → middleware/admission.rs
//!         → request.rs (client IP, host, cookies, form fields)
//!         → AdmissionPipeline::admit
//!         → Allowed: application handler
//!         → Blocked: response.rs (429/403 + Set-Cookie)
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::HttpServer;
