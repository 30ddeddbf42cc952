//! Error types for the Catastro gateway.

use thiserror::Error;

/// Result type alias using CatastroError.
pub type CatastroResult<T> = Result<T, CatastroError>;

/// Primary error type for gateway operations.
#[derive(Debug, Error)]
pub enum CatastroError {
    // === Input Errors ===
    #[error("Invalid cadastral reference '{reference}': {reason}")]
    InvalidReferenceFormat { reference: String, reason: String },

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("No matching record: {0}")]
    NotFound(String),

    // === Upstream Errors ===
    #[error("Upstream service {service} unavailable: {message}")]
    UpstreamUnavailable { service: String, message: String },

    #[error("Upstream service {service} is rate limiting requests (HTTP {status})")]
    RateLimited { service: String, status: u16 },

    #[error("Upstream service {service} returned HTTP {status}")]
    UpstreamStatus { service: String, status: u16 },

    #[error("Upstream service {service} rejected the request ({code}): {message}")]
    UpstreamRejected {
        service: String,
        code: String,
        message: String,
    },

    // === Schema / Geometry Errors ===
    #[error("Failed to fetch schema document {url}: {message}")]
    SchemaFetchError { url: String, message: String },

    #[error("Schema resolution incomplete for {type_name}: {message}")]
    SchemaResolutionIncomplete { type_name: String, message: String },

    #[error("Malformed geometry: {0}")]
    MalformedGeometry(String),

    #[error("Unsupported SRS for GeoJSON output: {0}")]
    UnsupportedSrs(String),

    // === Infrastructure Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CatastroError {
    /// Stable machine-readable identifier for this error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CatastroError::InvalidReferenceFormat { .. } => "InvalidReferenceFormat",
            CatastroError::InvalidParameter { .. } => "InvalidParameter",
            CatastroError::UnknownTool(_) => "UnknownTool",
            CatastroError::NotFound(_) => "NotFound",
            CatastroError::UpstreamUnavailable { .. } => "UpstreamUnavailable",
            CatastroError::RateLimited { .. } => "RateLimited",
            CatastroError::UpstreamStatus { .. } => "UpstreamStatus",
            CatastroError::UpstreamRejected { .. } => "UpstreamRejected",
            CatastroError::SchemaFetchError { .. } => "SchemaFetchError",
            CatastroError::SchemaResolutionIncomplete { .. } => "SchemaResolutionIncomplete",
            CatastroError::MalformedGeometry(_) => "MalformedGeometry",
            CatastroError::UnsupportedSrs(_) => "UnsupportedSrs",
            CatastroError::Internal(_) => "Internal",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            CatastroError::InvalidReferenceFormat { .. }
            | CatastroError::InvalidParameter { .. } => 400,

            CatastroError::UnknownTool(_) | CatastroError::NotFound(_) => 404,

            CatastroError::UnsupportedSrs(_) => 422,
            CatastroError::RateLimited { .. } => 429,

            CatastroError::UpstreamStatus { .. }
            | CatastroError::UpstreamRejected { .. }
            | CatastroError::SchemaFetchError { .. }
            | CatastroError::MalformedGeometry(_) => 502,

            CatastroError::UpstreamUnavailable { .. } => 503,

            // Partial schema results are delivered as data, not as failures.
            CatastroError::SchemaResolutionIncomplete { .. } => 200,

            CatastroError::Internal(_) => 500,
        }
    }

    /// Whether a caller may reasonably retry the same request later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CatastroError::UpstreamUnavailable { .. } | CatastroError::RateLimited { .. }
        )
    }

    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        CatastroError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CatastroError {
    fn from(err: serde_json::Error) -> Self {
        CatastroError::Internal(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let err = CatastroError::InvalidReferenceFormat {
            reference: "X".to_string(),
            reason: "too short".to_string(),
        };
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(
            CatastroError::RateLimited {
                service: "wfs".to_string(),
                status: 429
            }
            .http_status_code(),
            429
        );
        assert_eq!(
            CatastroError::UpstreamUnavailable {
                service: "wfs".to_string(),
                message: "timeout".to_string()
            }
            .http_status_code(),
            503
        );
        assert_eq!(CatastroError::UnsupportedSrs("EPSG:25830".into()).http_status_code(), 422);
    }

    #[test]
    fn test_transient_errors() {
        assert!(CatastroError::RateLimited {
            service: "callejero".to_string(),
            status: 403
        }
        .is_transient());
        assert!(!CatastroError::MalformedGeometry("open ring".into()).is_transient());
    }

    #[test]
    fn test_display_includes_context() {
        let err = CatastroError::SchemaFetchError {
            url: "http://example.org/cp.xsd".to_string(),
            message: "connection refused".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("cp.xsd"));
        assert!(display.contains("connection refused"));
        assert_eq!(err.kind(), "SchemaFetchError");
    }
}
