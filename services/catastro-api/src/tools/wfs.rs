//! WFS CP inspection tools: capabilities, feature types, schemas and samples.

use catastro_common::{CatastroError, CatastroResult};
use inspire_protocol::requests::{self, CADASTRAL_PARCEL_TYPE};
use inspire_protocol::{
    parse_exception_report, parse_feature_types, preview, resolve, FeatureTypeInfo, ResolvedSchema,
    SchemaError,
};
use serde::Serialize;
use tracing::{info, warn};

use super::{ToolOutput, DEFAULT_SRS};
use crate::state::AppState;
use crate::upstream::WFS_SERVICE;

/// Features requested by `wfs_feature_sample` when no count is given.
pub const DEFAULT_SAMPLE_COUNT: u32 = 2;

#[derive(Debug, Serialize)]
pub struct CapabilitiesDocument {
    pub version: String,
    pub url: String,
    pub xml: String,
}

#[derive(Debug, Serialize)]
pub struct FeatureTypeList {
    pub version: String,
    pub feature_types: Vec<FeatureTypeInfo>,
}

/// Schema resolution outcome. Partial results are data, flagged by
/// `complete = false`.
#[derive(Debug, Serialize)]
pub struct SchemaReport {
    pub complete: bool,
    pub root_url: String,
    pub max_includes: usize,
    #[serde(flatten)]
    pub schema: ResolvedSchema,
}

#[derive(Debug, Serialize)]
pub struct FeatureSample {
    pub type_name: String,
    pub srs: String,
    pub count: u32,
    pub url: String,
    pub bytes: usize,
    pub truncated: bool,
    pub head: String,
}

/// Turn an OWS exception report into `UpstreamRejected`.
pub fn reject_exception(xml: &str, preview_chars: usize) -> CatastroResult<()> {
    match parse_exception_report(xml) {
        Some(exception) => Err(CatastroError::UpstreamRejected {
            service: WFS_SERVICE.to_string(),
            code: exception
                .code
                .clone()
                .unwrap_or_else(|| "ExceptionReport".to_string()),
            message: preview(&exception.to_string(), preview_chars),
        }),
        None => Ok(()),
    }
}

fn version<'a>(state: &'a AppState, requested: Option<&'a str>) -> &'a str {
    requested.unwrap_or(&state.config.upstream.wfs_version)
}

async fn fetch_capabilities(state: &AppState, version: &str) -> CatastroResult<(String, String)> {
    let url = requests::get_capabilities(&state.endpoints.wfs_cp, version);
    let url_text = url.to_string();
    let xml = state.upstream.get_xml(WFS_SERVICE, url).await?;
    reject_exception(&xml, state.config.limits.exception_preview_chars)?;
    Ok((url_text, xml))
}

pub async fn capabilities(state: &AppState, version: Option<&str>) -> CatastroResult<ToolOutput> {
    let version = self::version(state, version);
    let (url, xml) = fetch_capabilities(state, version).await?;
    Ok(ToolOutput::Capabilities(CapabilitiesDocument {
        version: version.to_string(),
        url,
        xml,
    }))
}

pub async fn feature_types(state: &AppState, version: Option<&str>) -> CatastroResult<ToolOutput> {
    let version = self::version(state, version);
    let (_, xml) = fetch_capabilities(state, version).await?;
    let feature_types = parse_feature_types(&xml).map_err(|e| CatastroError::UpstreamRejected {
        service: WFS_SERVICE.to_string(),
        code: "InvalidResponse".to_string(),
        message: e.to_string(),
    })?;
    info!(count = feature_types.len(), "Parsed WFS feature types");
    Ok(ToolOutput::FeatureTypes(FeatureTypeList {
        version: version.to_string(),
        feature_types,
    }))
}

/// Resolve the schema of `type_name` through its include/import graph.
pub async fn describe_feature_type(
    state: &AppState,
    type_name: &str,
    version: Option<&str>,
    max_includes: Option<usize>,
) -> CatastroResult<ToolOutput> {
    let version = self::version(state, version);
    let budget = state.config.effective_max_includes(max_includes);
    let root_url = requests::describe_feature_type(&state.endpoints.wfs_cp, version, type_name).to_string();

    let schema = match resolve(&state.upstream, &root_url, type_name, budget).await {
        Ok(schema) => schema,
        Err(SchemaError::Incomplete(partial)) => {
            warn!(
                type_name,
                unreachable = partial.unreachable.len(),
                pending = partial.pending.len(),
                "Schema resolution incomplete"
            );
            *partial
        }
        Err(e) => return Err(e.into()),
    };

    Ok(ToolOutput::Schema(SchemaReport {
        complete: schema.is_complete(),
        root_url,
        max_includes: budget,
        schema,
    }))
}

pub async fn feature_sample(
    state: &AppState,
    type_name: Option<&str>,
    srs: Option<&str>,
    count: Option<u32>,
) -> CatastroResult<ToolOutput> {
    let version = &state.config.upstream.wfs_version;
    let type_name = type_name.unwrap_or(CADASTRAL_PARCEL_TYPE);
    let srs = srs.unwrap_or(DEFAULT_SRS);
    let count = count.unwrap_or(DEFAULT_SAMPLE_COUNT);

    let url = requests::get_feature_sample(&state.endpoints.wfs_cp, version, type_name, srs, count);
    let url_text = url.to_string();
    let xml = state.upstream.get_xml(WFS_SERVICE, url).await?;
    reject_exception(&xml, state.config.limits.exception_preview_chars)?;

    let head = preview(&xml, state.config.limits.sample_head_chars);
    Ok(ToolOutput::FeatureSample(FeatureSample {
        type_name: type_name.to_string(),
        srs: srs.to_string(),
        count,
        url: url_text,
        bytes: xml.len(),
        truncated: head.len() < xml.len(),
        head,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixtures::{capabilities, gml};

    #[test]
    fn test_exception_report_rejected() {
        let err = reject_exception(gml::EXCEPTION_REPORT, 1200).unwrap_err();
        assert_eq!(err.kind(), "UpstreamRejected");
        assert_eq!(err.http_status_code(), 502);
    }

    #[test]
    fn test_regular_document_passes() {
        assert!(reject_exception(capabilities::WFS_CP, 1200).is_ok());
        assert!(reject_exception(gml::PARCEL_4326, 1200).is_ok());
    }

    #[test]
    fn test_exception_message_is_capped() {
        let err = reject_exception(gml::EXCEPTION_REPORT, 5).unwrap_err();
        let CatastroError::UpstreamRejected { message, .. } = err else {
            panic!("wrong error");
        };
        assert_eq!(message.chars().count(), 5);
    }
}
