//! Service configuration.
//!
//! Loaded once at start-up from an optional YAML file, then overridden by
//! environment variables for the upstream URLs. The result is immutable and
//! shared behind an `Arc`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use ovc_protocol::OvcService;

pub const ENV_CALLEJERO_URL: &str = "CATASTRO_CALLEJERO_URL";
pub const ENV_COORDENADAS_URL: &str = "CATASTRO_COORDENADAS_URL";
pub const ENV_WFS_CP_URL: &str = "CATASTRO_WFS_CP_URL";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatastroConfig {
    pub upstream: UpstreamConfig,
    pub limits: LimitsConfig,
}

/// Upstream endpoints and HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// `COVCCallejero.svc/json` root.
    pub callejero_url: String,
    /// `COVCCoordenadas.svc/json` root.
    pub coordenadas_url: String,
    /// INSPIRE cadastral parcels WFS.
    pub wfs_cp_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    pub wfs_version: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            callejero_url: "https://ovc.catastro.meh.es/OVCServWeb/OVCWcfCallejero/COVCCallejero.svc/json"
                .to_string(),
            coordenadas_url:
                "https://ovc.catastro.meh.es/OVCServWeb/OVCWcfCallejero/COVCCoordenadas.svc/json"
                    .to_string(),
            wfs_cp_url: "https://ovc.catastro.meh.es/INSPIRE/wfsCP.aspx".to_string(),
            request_timeout_secs: 20,
            connect_timeout_secs: 10,
            user_agent: concat!("catastro-api/", env!("CARGO_PKG_VERSION")).to_string(),
            wfs_version: "2.0.0".to_string(),
        }
    }
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Decimal places beyond this no longer fit an f64 mantissa.
pub const MAX_GEOJSON_PRECISION: u32 = 15;

/// Size limits and output tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Hard cap on the schema include budget a caller may ask for.
    pub max_includes_cap: usize,
    pub default_max_includes: usize,
    /// Decimal places kept in GeoJSON output, capped at [`MAX_GEOJSON_PRECISION`].
    pub geojson_precision: u32,
    /// Characters of an upstream exception kept in error messages.
    pub exception_preview_chars: usize,
    /// Characters of a GetFeature sample returned.
    pub sample_head_chars: usize,
    /// Vertices returned by `parcel_vertices`.
    pub vertices_preview: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_includes_cap: 50,
            default_max_includes: 5,
            geojson_precision: 7,
            exception_preview_chars: 1200,
            sample_head_chars: 8000,
            vertices_preview: 50,
        }
    }
}

/// Parsed upstream roots.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoints {
    pub callejero: Url,
    pub coordenadas: Url,
    pub wfs_cp: Url,
}

impl Endpoints {
    pub fn ovc_root(&self, service: OvcService) -> &Url {
        match service {
            OvcService::Callejero => &self.callejero,
            OvcService::Coordenadas => &self.coordenadas,
        }
    }
}

impl CatastroConfig {
    /// Load from a YAML file, falling back to defaults when it does not
    /// exist, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: CatastroConfig = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            info!(path = %path.display(), "Loaded configuration");
            config
        } else {
            warn!(
                path = %path.display(),
                "Config file does not exist, using defaults"
            );
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.endpoints()?;
        Ok(config)
    }

    /// Override upstream URLs from the given variable lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides = [
            (ENV_CALLEJERO_URL, &mut self.upstream.callejero_url),
            (ENV_COORDENADAS_URL, &mut self.upstream.coordenadas_url),
            (ENV_WFS_CP_URL, &mut self.upstream.wfs_cp_url),
        ];
        for (key, target) in overrides {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                info!(key, value = %value, "Upstream URL overridden from environment");
                *target = value.trim().to_string();
            }
        }
    }

    /// Parse the upstream URLs.
    pub fn endpoints(&self) -> Result<Endpoints> {
        let parse = |name: &str, value: &str| {
            Url::parse(value).with_context(|| format!("Invalid {} URL: {}", name, value))
        };
        Ok(Endpoints {
            callejero: parse("callejero", &self.upstream.callejero_url)?,
            coordenadas: parse("coordenadas", &self.upstream.coordenadas_url)?,
            wfs_cp: parse("wfs_cp", &self.upstream.wfs_cp_url)?,
        })
    }

    /// Caller-requested include budget, defaulted and capped.
    pub fn effective_max_includes(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.limits.default_max_includes)
            .min(self.limits.max_includes_cap)
    }

    /// Configured GeoJSON precision, capped.
    pub fn effective_geojson_precision(&self) -> u32 {
        self.limits.geojson_precision.min(MAX_GEOJSON_PRECISION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CatastroConfig::load(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config.limits, LimitsConfig::default());
        assert_eq!(config.upstream.wfs_version, "2.0.0");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "upstream:\n  request_timeout_secs: 5\nlimits:\n  max_includes_cap: 8"
        )
        .unwrap();

        let config = CatastroConfig::load(file.path()).unwrap();
        assert_eq!(config.upstream.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.upstream.connect_timeout_secs, 10);
        assert_eq!(config.limits.max_includes_cap, 8);
        assert_eq!(config.limits.default_max_includes, 5);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "upstream: [not, a, map]").unwrap();
        assert!(CatastroConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_WFS_CP_URL, "http://127.0.0.1:9000/wfs"),
            (ENV_CALLEJERO_URL, "  "),
        ]
        .into_iter()
        .collect();

        let mut config = CatastroConfig::default();
        config.apply_env_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.upstream.wfs_cp_url, "http://127.0.0.1:9000/wfs");
        assert_eq!(
            config.upstream.callejero_url,
            UpstreamConfig::default().callejero_url
        );
    }

    #[test]
    fn test_invalid_url_rejected() {
        let mut config = CatastroConfig::default();
        config.upstream.coordenadas_url = "not a url".to_string();
        assert!(config.endpoints().is_err());
    }

    #[test]
    fn test_max_includes_is_capped() {
        let config = CatastroConfig::default();
        assert_eq!(config.effective_max_includes(None), 5);
        assert_eq!(config.effective_max_includes(Some(500)), 50);
        assert_eq!(config.effective_max_includes(Some(0)), 0);
    }

    #[test]
    fn test_geojson_precision_is_capped() {
        let mut config = CatastroConfig::default();
        assert_eq!(config.effective_geojson_precision(), 7);
        config.limits.geojson_precision = 400;
        assert_eq!(config.effective_geojson_precision(), MAX_GEOJSON_PRECISION);
        assert!(10f64.powi(config.effective_geojson_precision() as i32).is_finite());
    }
}
