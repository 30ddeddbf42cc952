//! Tool surface: a closed set of typed calls and results.
//!
//! Arguments are validated when a [`ToolCall`] is built, so the executors
//! only ever see well-formed input.

pub mod args;
pub mod ovc;
pub mod parcel;
pub mod registry;
pub mod wfs;

use catastro_common::crs::{epsg_from_srs, is_crs84};
use catastro_common::{CadastralReference, CatastroError, CatastroResult};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::metrics::record_tool_call;
use crate::state::AppState;
use args::ToolArgs;

pub use parcel::{ParcelGeoJson, ParcelGml, ParcelVertices};
pub use wfs::{CapabilitiesDocument, FeatureSample, FeatureTypeList, SchemaReport};

/// SRS used when a tool does not receive one.
pub const DEFAULT_SRS: &str = "EPSG:4326";

/// Owned postal address for `property_by_address`.
#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub province: String,
    pub municipality: String,
    pub street_type: String,
    pub street: String,
    pub number: String,
    pub block: Option<String>,
    pub stair: Option<String>,
    pub floor: Option<String>,
    pub door: Option<String>,
}

/// SRS requested for `parcel_gml`.
#[derive(Debug, Clone, PartialEq)]
pub enum SrsRequest {
    /// Pick the UTM zone from the parcel location.
    Auto,
    Manual(String),
}

impl SrsRequest {
    pub fn parse(param: &str, value: &str) -> CatastroResult<Self> {
        if ["AUTO", "AUTO_UTM", "UTM_AUTO"]
            .iter()
            .any(|a| value.eq_ignore_ascii_case(a))
        {
            return Ok(SrsRequest::Auto);
        }
        check_srs(param, value)?;
        Ok(SrsRequest::Manual(value.to_string()))
    }
}

/// Accept only SRS spellings that carry an EPSG code or name CRS84.
fn check_srs(param: &str, value: &str) -> CatastroResult<String> {
    if epsg_from_srs(value).is_some() || is_crs84(value) {
        Ok(value.to_string())
    } else {
        Err(CatastroError::invalid_parameter(
            param,
            format!("unrecognised SRS '{}'", value),
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    ListProvinces,
    ListMunicipalities {
        province: String,
        filter: Option<String>,
    },
    ListStreets {
        province: String,
        municipality: String,
        filter: Option<String>,
        street_type: Option<String>,
    },
    ListNumbers {
        province: String,
        municipality: String,
        street_type: String,
        street: String,
        number: String,
    },
    PropertyByAddress(Address),
    PropertyByReference {
        reference: CadastralReference,
        province: Option<String>,
        municipality: Option<String>,
    },
    PropertyByPolygonParcel {
        province: String,
        municipality: String,
        polygon: String,
        parcel: String,
    },
    ReferenceToCoordinates {
        reference: CadastralReference,
        srs: String,
        province: Option<String>,
        municipality: Option<String>,
    },
    CoordinatesToReference {
        x: f64,
        y: f64,
        srs: String,
    },
    NearbyReferences {
        x: f64,
        y: f64,
        srs: String,
    },
    WfsCapabilities {
        version: Option<String>,
    },
    WfsFeatureTypes {
        version: Option<String>,
    },
    DescribeFeatureType {
        type_name: String,
        version: Option<String>,
        max_includes: Option<usize>,
    },
    ParcelGml {
        reference: CadastralReference,
        srs: SrsRequest,
    },
    ParcelVertices {
        reference: CadastralReference,
    },
    WfsFeatureSample {
        type_name: Option<String>,
        srs: Option<String>,
        count: Option<u32>,
    },
    ParcelGeoJson {
        reference: CadastralReference,
    },
}

impl ToolCall {
    /// Validate a named call and its JSON arguments.
    pub fn parse(name: &str, arguments: &Map<String, Value>) -> CatastroResult<Self> {
        let descriptor =
            registry::find(name).ok_or_else(|| CatastroError::UnknownTool(name.to_string()))?;
        descriptor.check_arguments(arguments)?;
        let a = ToolArgs::new(arguments);

        let call = match descriptor.name {
            "list_provinces" => ToolCall::ListProvinces,
            "list_municipalities" => ToolCall::ListMunicipalities {
                province: a.required_str("province")?,
                filter: a.optional_str("filter")?,
            },
            "list_streets" => ToolCall::ListStreets {
                province: a.required_str("province")?,
                municipality: a.required_str("municipality")?,
                filter: a.optional_str("filter")?,
                street_type: a.optional_str("street_type")?,
            },
            "list_numbers" => ToolCall::ListNumbers {
                province: a.required_str("province")?,
                municipality: a.required_str("municipality")?,
                street_type: a.required_str("street_type")?,
                street: a.required_str("street")?,
                number: a.required_str("number")?,
            },
            "property_by_address" => ToolCall::PropertyByAddress(Address {
                province: a.required_str("province")?,
                municipality: a.required_str("municipality")?,
                street_type: a.required_str("street_type")?,
                street: a.required_str("street")?,
                number: a.required_str("number")?,
                block: a.optional_str("block")?,
                stair: a.optional_str("stair")?,
                floor: a.optional_str("floor")?,
                door: a.optional_str("door")?,
            }),
            "property_by_reference" => ToolCall::PropertyByReference {
                reference: a.reference("reference")?,
                province: a.optional_str("province")?,
                municipality: a.optional_str("municipality")?,
            },
            "property_by_polygon_parcel" => ToolCall::PropertyByPolygonParcel {
                province: a.required_str("province")?,
                municipality: a.required_str("municipality")?,
                polygon: a.required_str("polygon")?,
                parcel: a.required_str("parcel")?,
            },
            "reference_to_coordinates" => ToolCall::ReferenceToCoordinates {
                reference: a.reference("reference")?,
                srs: check_srs("srs", &a.str_or("srs", DEFAULT_SRS)?)?,
                province: a.optional_str("province")?,
                municipality: a.optional_str("municipality")?,
            },
            "coordinates_to_reference" => ToolCall::CoordinatesToReference {
                x: a.required_f64("x")?,
                y: a.required_f64("y")?,
                srs: check_srs("srs", &a.str_or("srs", DEFAULT_SRS)?)?,
            },
            "nearby_references" => ToolCall::NearbyReferences {
                x: a.required_f64("x")?,
                y: a.required_f64("y")?,
                srs: check_srs("srs", &a.str_or("srs", DEFAULT_SRS)?)?,
            },
            "wfs_capabilities" => ToolCall::WfsCapabilities {
                version: a.optional_str("version")?,
            },
            "wfs_feature_types" => ToolCall::WfsFeatureTypes {
                version: a.optional_str("version")?,
            },
            "describe_feature_type" => ToolCall::DescribeFeatureType {
                type_name: a.required_str("type_name")?,
                version: a.optional_str("version")?,
                max_includes: a
                    .optional_u64("max_includes")?
                    .map(|n| usize::try_from(n).unwrap_or(usize::MAX)),
            },
            "parcel_gml" => ToolCall::ParcelGml {
                reference: a.reference("reference")?,
                srs: SrsRequest::parse("srs", &a.str_or("srs", "AUTO")?)?,
            },
            "parcel_vertices" => ToolCall::ParcelVertices {
                reference: a.reference("reference")?,
            },
            "wfs_feature_sample" => ToolCall::WfsFeatureSample {
                type_name: a.optional_str("type_name")?,
                srs: a
                    .optional_str("srs")?
                    .map(|s| check_srs("srs", &s))
                    .transpose()?,
                count: a
                    .optional_u64("count")?
                    .map(|n| {
                        u32::try_from(n)
                            .ok()
                            .filter(|c| *c >= 1)
                            .ok_or_else(|| CatastroError::invalid_parameter("count", "must be between 1 and 4294967295"))
                    })
                    .transpose()?,
            },
            "parcel_geojson" => ToolCall::ParcelGeoJson {
                reference: a.reference("reference")?,
            },
            other => return Err(CatastroError::UnknownTool(other.to_string())),
        };
        Ok(call)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::ListProvinces => "list_provinces",
            ToolCall::ListMunicipalities { .. } => "list_municipalities",
            ToolCall::ListStreets { .. } => "list_streets",
            ToolCall::ListNumbers { .. } => "list_numbers",
            ToolCall::PropertyByAddress(_) => "property_by_address",
            ToolCall::PropertyByReference { .. } => "property_by_reference",
            ToolCall::PropertyByPolygonParcel { .. } => "property_by_polygon_parcel",
            ToolCall::ReferenceToCoordinates { .. } => "reference_to_coordinates",
            ToolCall::CoordinatesToReference { .. } => "coordinates_to_reference",
            ToolCall::NearbyReferences { .. } => "nearby_references",
            ToolCall::WfsCapabilities { .. } => "wfs_capabilities",
            ToolCall::WfsFeatureTypes { .. } => "wfs_feature_types",
            ToolCall::DescribeFeatureType { .. } => "describe_feature_type",
            ToolCall::ParcelGml { .. } => "parcel_gml",
            ToolCall::ParcelVertices { .. } => "parcel_vertices",
            ToolCall::WfsFeatureSample { .. } => "wfs_feature_sample",
            ToolCall::ParcelGeoJson { .. } => "parcel_geojson",
        }
    }
}

/// Result of a tool call, tagged by `type` with the payload under `data`.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ToolOutput {
    Ovc(ovc_protocol::OvcResult),
    Property(ovc_protocol::PropertyLookup),
    Capabilities(CapabilitiesDocument),
    FeatureTypes(FeatureTypeList),
    Schema(SchemaReport),
    ParcelGml(ParcelGml),
    ParcelVertices(ParcelVertices),
    FeatureSample(FeatureSample),
    #[serde(rename = "geojson")]
    GeoJson(ParcelGeoJson),
}

/// Run a validated call.
pub async fn dispatch(state: &AppState, call: ToolCall) -> CatastroResult<ToolOutput> {
    match call {
        ToolCall::ListProvinces => ovc::list_provinces(state).await,
        ToolCall::ListMunicipalities { province, filter } => {
            ovc::list_municipalities(state, &province, filter.as_deref()).await
        }
        ToolCall::ListStreets {
            province,
            municipality,
            filter,
            street_type,
        } => {
            ovc::list_streets(
                state,
                &province,
                &municipality,
                filter.as_deref(),
                street_type.as_deref(),
            )
            .await
        }
        ToolCall::ListNumbers {
            province,
            municipality,
            street_type,
            street,
            number,
        } => ovc::list_numbers(state, &province, &municipality, &street_type, &street, &number).await,
        ToolCall::PropertyByAddress(address) => ovc::property_by_address(state, &address).await,
        ToolCall::PropertyByReference {
            reference,
            province,
            municipality,
        } => {
            ovc::property_by_reference(state, &reference, province.as_deref(), municipality.as_deref())
                .await
        }
        ToolCall::PropertyByPolygonParcel {
            province,
            municipality,
            polygon,
            parcel,
        } => ovc::property_by_polygon_parcel(state, &province, &municipality, &polygon, &parcel).await,
        ToolCall::ReferenceToCoordinates {
            reference,
            srs,
            province,
            municipality,
        } => {
            ovc::reference_to_coordinates(
                state,
                &reference,
                &srs,
                province.as_deref(),
                municipality.as_deref(),
            )
            .await
        }
        ToolCall::CoordinatesToReference { x, y, srs } => {
            ovc::coordinates_to_reference(state, x, y, &srs).await
        }
        ToolCall::NearbyReferences { x, y, srs } => ovc::nearby_references(state, x, y, &srs).await,
        ToolCall::WfsCapabilities { version } => wfs::capabilities(state, version.as_deref()).await,
        ToolCall::WfsFeatureTypes { version } => wfs::feature_types(state, version.as_deref()).await,
        ToolCall::DescribeFeatureType {
            type_name,
            version,
            max_includes,
        } => wfs::describe_feature_type(state, &type_name, version.as_deref(), max_includes).await,
        ToolCall::ParcelGml { reference, srs } => parcel::parcel_gml(state, &reference, &srs).await,
        ToolCall::ParcelVertices { reference } => parcel::parcel_vertices(state, &reference).await,
        ToolCall::WfsFeatureSample {
            type_name,
            srs,
            count,
        } => wfs::feature_sample(state, type_name.as_deref(), srs.as_deref(), count).await,
        ToolCall::ParcelGeoJson { reference } => parcel::parcel_geojson(state, &reference).await,
    }
}

/// Validate, run and count one tool call.
#[instrument(skip(state, arguments))]
pub async fn execute(state: &AppState, name: &str, arguments: &Map<String, Value>) -> CatastroResult<ToolOutput> {
    let call = match ToolCall::parse(name, arguments) {
        Ok(call) => call,
        Err(e) => {
            if let Some(tool) = registry::find(name) {
                record_tool_call(tool.name, e.kind());
            }
            return Err(e);
        }
    };

    let tool = call.name();
    let result = dispatch(state, call).await;
    match &result {
        Ok(_) => {
            info!(tool, "Tool call completed");
            record_tool_call(tool, "ok");
        }
        Err(e) => {
            warn!(tool, error = %e, kind = e.kind(), "Tool call failed");
            record_tool_call(tool, e.kind());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(name: &str, args: Value) -> CatastroResult<ToolCall> {
        ToolCall::parse(name, args.as_object().unwrap())
    }

    #[test]
    fn test_unknown_tool() {
        let err = parse("export_parcel", json!({})).unwrap_err();
        assert_eq!(err.kind(), "UnknownTool");
        assert_eq!(err.http_status_code(), 404);
    }

    #[test]
    fn test_every_descriptor_parses_its_name() {
        for tool in registry::TOOLS {
            let err = ToolCall::parse(tool.name, &Map::new()).err();
            // Missing required arguments are the only acceptable failure.
            if let Some(err) = err {
                assert_eq!(err.kind(), "InvalidParameter", "tool {}", tool.name);
            }
        }
    }

    #[test]
    fn test_parcel_gml_defaults_to_auto() {
        let call = parse("parcel_gml", json!({"reference": "1146801VK4714E0001PW"})).unwrap();
        let ToolCall::ParcelGml { reference, srs } = call else {
            panic!("wrong variant");
        };
        assert_eq!(reference.parcel_id(), "1146801VK4714E");
        assert_eq!(srs, SrsRequest::Auto);

        let call = parse("parcel_gml", json!({"reference": "1146801VK4714E", "srs": "epsg::25830"})).unwrap();
        assert!(matches!(call, ToolCall::ParcelGml { srs: SrsRequest::Manual(_), .. }));
    }

    #[test]
    fn test_bad_srs_rejected() {
        let err = parse("coordinates_to_reference", json!({"x": 1, "y": 2, "srs": "WGS84"})).unwrap_err();
        assert_eq!(err.kind(), "InvalidParameter");
    }

    #[test]
    fn test_bad_reference_rejected() {
        let err = parse("property_by_reference", json!({"reference": "1146801VK4714E00"})).unwrap_err();
        assert_eq!(err.kind(), "InvalidReferenceFormat");
    }

    #[test]
    fn test_coordinates_default_srs() {
        let call = parse("nearby_references", json!({"x": -3.7, "y": "40.4"})).unwrap();
        assert_eq!(
            call,
            ToolCall::NearbyReferences {
                x: -3.7,
                y: 40.4,
                srs: DEFAULT_SRS.to_string()
            }
        );
    }

    #[test]
    fn test_sample_count_must_be_positive() {
        let err = parse("wfs_feature_sample", json!({"count": 0})).unwrap_err();
        assert_eq!(err.kind(), "InvalidParameter");
        let call = parse("wfs_feature_sample", json!({"count": 2})).unwrap();
        assert!(matches!(call, ToolCall::WfsFeatureSample { count: Some(2), .. }));
    }

    #[test]
    fn test_output_tagging() {
        let output = ToolOutput::Ovc(ovc_protocol::OvcResult::Provinces { items: vec![] });
        let v = serde_json::to_value(&output).unwrap();
        assert_eq!(v, json!({"type": "ovc", "data": {"kind": "provinces", "items": []}}));
    }
}
