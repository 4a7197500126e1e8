//! Metrics collection and exposition.
//!
//! # Metrics
//! - `agent_requests_total` (counter): dispatched attempts by outcome
//! - `agent_remediations_total` (counter): escalation actions by kind
//! - `agent_escalation_level` (gauge): current escalation counter
//! - `agent_logins_total` (counter): login transitions by kind
//! - `agent_orders_total` (counter): order attempts by result
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests pay nothing when the exporter is disabled.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the outcome of one dispatched attempt.
pub fn record_request(outcome: &'static str) {
    counter!("agent_requests_total", "outcome" => outcome).increment(1);
}

/// Record an escalation remediation.
pub fn record_remediation(action: &'static str) {
    counter!("agent_remediations_total", "action" => action).increment(1);
}

/// Publish the current escalation counter.
pub fn record_escalation_level(level: u32) {
    gauge!("agent_escalation_level").set(f64::from(level));
}

/// Record a login transition ("email", "refresh", "polling_timeout", ...).
pub fn record_login(kind: &'static str) {
    counter!("agent_logins_total", "kind" => kind).increment(1);
}

/// Record an order attempt ("created", "failed", "cancelled").
pub fn record_order(result: &'static str) {
    counter!("agent_orders_total", "result" => result).increment(1);
}
