//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ban_requests_admitted_total` (counter)
//! - `ban_requests_blocked_total` (counter): by `cause`
//! - `ban_store_unavailable_total` (counter): by store `operation`
//! - `ban_listener_failures_total` (counter): by `listener`
//! - `ban_throttle_keys` (gauge): live throttle windows
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Label values are static strings, never client input

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_admitted() {
    counter!("ban_requests_admitted_total").increment(1);
}

pub fn record_blocked(cause: &'static str) {
    counter!("ban_requests_blocked_total", "cause" => cause).increment(1);
}

pub fn record_store_unavailable(operation: &'static str) {
    counter!("ban_store_unavailable_total", "operation" => operation).increment(1);
}

pub fn record_listener_failure(listener: &'static str) {
    counter!("ban_listener_failures_total", "listener" => listener).increment(1);
}

pub fn record_throttle_keys(keys: usize) {
    gauge!("ban_throttle_keys").set(keys as f64);
}
