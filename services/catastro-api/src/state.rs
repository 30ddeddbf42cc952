//! Application state shared by the handlers.

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::config::{CatastroConfig, Endpoints};
use crate::upstream::UpstreamClient;

/// Shared application state.
pub struct AppState {
    /// Immutable configuration built at start-up.
    pub config: Arc<CatastroConfig>,

    /// Parsed upstream roots.
    pub endpoints: Endpoints,

    pub upstream: UpstreamClient,

    /// Renders `/metrics`; absent when no recorder was installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: CatastroConfig, metrics: Option<PrometheusHandle>) -> Result<Self> {
        let endpoints = config.endpoints()?;
        let upstream = UpstreamClient::new(&config.upstream)?;
        Ok(Self {
            config: Arc::new(config),
            endpoints,
            upstream,
            metrics,
        })
    }
}
