//! HTTP client for the Catastro upstream services.

use async_trait::async_trait;
use catastro_common::{CatastroError, CatastroResult};
use inspire_protocol::{preview, FetchError, SchemaFetcher};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::UpstreamConfig;
use crate::metrics::record_upstream;

/// Service label for the WFS itself.
pub const WFS_SERVICE: &str = "wfs_cp";
/// Service label for schema documents referenced by the WFS.
pub const SCHEMA_SERVICE: &str = "wfs_schema";

const XML: &str = "application/xml";
const JSON: &str = "application/json";

/// Shared upstream client. Cheap to clone.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    user_agent: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
        })
    }

    /// GET a text body. Non-success statuses and transport failures are
    /// mapped to typed errors; there are no retries.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_text(&self, service: &'static str, url: Url, accept: &str) -> CatastroResult<String> {
        let started = Instant::now();
        let result = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, accept)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                record_upstream(service, "error".to_string(), started.elapsed());
                warn!(service, error = %e, "Upstream request failed");
                return Err(transport_error(service, &e));
            }
        };

        let status = response.status();
        record_upstream(service, status.as_u16().to_string(), started.elapsed());
        if let Some(err) = status_error(service, status) {
            warn!(service, status = status.as_u16(), "Upstream returned an error status");
            return Err(err);
        }

        let body = response.text().await.map_err(|e| transport_error(service, &e))?;
        debug!(
            service,
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Upstream response received"
        );
        Ok(body)
    }

    pub async fn get_xml(&self, service: &'static str, url: Url) -> CatastroResult<String> {
        self.get_text(service, url, XML).await
    }

    /// GET and decode a JSON body.
    pub async fn get_json(&self, service: &'static str, url: Url) -> CatastroResult<Value> {
        let body = self.get_text(service, url, JSON).await?;
        decode_json(service, &body)
    }
}

/// Decode a JSON body, tolerating a leading byte-order mark.
pub fn decode_json(service: &str, body: &str) -> CatastroResult<Value> {
    serde_json::from_str(body.trim_start_matches('\u{feff}')).map_err(|e| {
        CatastroError::UpstreamRejected {
            service: service.to_string(),
            code: "InvalidResponse".to_string(),
            message: format!("{}: {}", e, preview(body, 200)),
        }
    })
}

/// Error for a non-success status, `None` on success.
///
/// The Catastro services signal rate limiting with 403 as well as 429.
pub fn status_error(service: &str, status: StatusCode) -> Option<CatastroError> {
    if status.is_success() {
        return None;
    }
    let service = service.to_string();
    let status = status.as_u16();
    Some(match status {
        403 | 429 => CatastroError::RateLimited { service, status },
        _ => CatastroError::UpstreamStatus { service, status },
    })
}

fn transport_error(service: &str, err: &reqwest::Error) -> CatastroError {
    let message = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.to_string()
    };
    CatastroError::UpstreamUnavailable {
        service: service.to_string(),
        message,
    }
}

#[async_trait]
impl SchemaFetcher for UpstreamClient {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        self.get_xml(SCHEMA_SERVICE, url.clone())
            .await
            .map_err(FetchError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(status_error("wfs_cp", StatusCode::OK).is_none());

        let err = status_error("callejero", StatusCode::FORBIDDEN).unwrap();
        assert_eq!(err.kind(), "RateLimited");
        assert_eq!(err.http_status_code(), 429);

        let err = status_error("wfs_cp", StatusCode::TOO_MANY_REQUESTS).unwrap();
        assert!(err.is_transient());

        let err = status_error("wfs_cp", StatusCode::INTERNAL_SERVER_ERROR).unwrap();
        assert_eq!(err.kind(), "UpstreamStatus");
        assert_eq!(err.http_status_code(), 502);
    }

    #[test]
    fn test_decode_json_with_bom() {
        let value = decode_json("callejero", "\u{feff}{\"a\": 1}").unwrap();
        assert_eq!(value["a"], 1);

        let err = decode_json("callejero", "<html>maintenance</html>").unwrap_err();
        assert_eq!(err.kind(), "UpstreamRejected");
        assert!(err.to_string().contains("maintenance"));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_unavailable() {
        let config = UpstreamConfig {
            connect_timeout_secs: 1,
            request_timeout_secs: 1,
            ..UpstreamConfig::default()
        };
        let client = UpstreamClient::new(&config).unwrap();
        // Port 9 (discard) on localhost is closed in test environments.
        let url = Url::parse("http://127.0.0.1:9/ObtenerProvincias").unwrap();
        let err = client.get_json("callejero", url).await.unwrap_err();
        assert_eq!(err.kind(), "UpstreamUnavailable");
        assert_eq!(err.http_status_code(), 503);
    }
}
