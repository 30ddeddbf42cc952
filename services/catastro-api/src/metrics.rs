//! Prometheus metrics for tool calls and upstream requests.

use anyhow::{Context, Result};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

pub const TOOL_CALLS_TOTAL: &str = "catastro_tool_calls_total";
pub const UPSTREAM_REQUESTS_TOTAL: &str = "catastro_upstream_requests_total";
pub const UPSTREAM_DURATION_MS: &str = "catastro_upstream_request_duration_ms";

/// Install the global Prometheus recorder.
pub fn install_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")
}

/// Count one tool invocation; `outcome` is `ok` or an error kind.
pub fn record_tool_call(tool: &'static str, outcome: &'static str) {
    counter!(TOOL_CALLS_TOTAL, "tool" => tool, "outcome" => outcome).increment(1);
}

/// Count one upstream request and record its latency. `status` is the HTTP
/// status code, or `error` when no response arrived.
pub fn record_upstream(service: &'static str, status: String, elapsed: Duration) {
    counter!(UPSTREAM_REQUESTS_TOTAL, "service" => service, "status" => status).increment(1);
    histogram!(UPSTREAM_DURATION_MS, "service" => service).record(elapsed.as_secs_f64() * 1000.0);
}
