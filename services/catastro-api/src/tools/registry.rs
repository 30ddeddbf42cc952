//! Tool descriptors served by `GET /tools`.

use catastro_common::{CatastroError, CatastroResult};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub required: bool,
}

const fn req(name: &'static str, param_type: ParamType) -> ParamSpec {
    ParamSpec {
        name,
        param_type,
        required: true,
    }
}

const fn opt(name: &'static str, param_type: ParamType) -> ParamSpec {
    ParamSpec {
        name,
        param_type,
        required: false,
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: &'static [ParamSpec],
}

impl ToolDescriptor {
    /// Reject argument names the tool does not declare.
    pub fn check_arguments(&self, args: &Map<String, Value>) -> CatastroResult<()> {
        match args
            .keys()
            .find(|k| !self.parameters.iter().any(|p| p.name == k.as_str()))
        {
            Some(unknown) => Err(CatastroError::invalid_parameter(
                unknown.as_str(),
                format!("not a parameter of {}", self.name),
            )),
            None => Ok(()),
        }
    }
}

use ParamType::{Integer, Number, String as Str};

pub static TOOLS: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "list_provinces",
        description: "List Spanish provinces known to the cadastre.",
        parameters: &[],
    },
    ToolDescriptor {
        name: "list_municipalities",
        description: "List municipalities of a province, optionally filtered by name substring.",
        parameters: &[req("province", Str), opt("filter", Str)],
    },
    ToolDescriptor {
        name: "list_streets",
        description: "List streets of a municipality, optionally filtered by name substring and street type.",
        parameters: &[
            req("province", Str),
            req("municipality", Str),
            opt("filter", Str),
            opt("street_type", Str),
        ],
    },
    ToolDescriptor {
        name: "list_numbers",
        description: "List street numbers near a given number, with their parcel references.",
        parameters: &[
            req("province", Str),
            req("municipality", Str),
            req("street_type", Str),
            req("street", Str),
            req("number", Str),
        ],
    },
    ToolDescriptor {
        name: "property_by_address",
        description: "Non-protected property data for a postal address.",
        parameters: &[
            req("province", Str),
            req("municipality", Str),
            req("street_type", Str),
            req("street", Str),
            req("number", Str),
            opt("block", Str),
            opt("stair", Str),
            opt("floor", Str),
            opt("door", Str),
        ],
    },
    ToolDescriptor {
        name: "property_by_reference",
        description: "Property data by cadastral reference: every unit for a 14-character parcel, one record for an 18/20-character unit.",
        parameters: &[req("reference", Str), opt("province", Str), opt("municipality", Str)],
    },
    ToolDescriptor {
        name: "property_by_polygon_parcel",
        description: "Property data for a rural polygon and parcel number.",
        parameters: &[
            req("province", Str),
            req("municipality", Str),
            req("polygon", Str),
            req("parcel", Str),
        ],
    },
    ToolDescriptor {
        name: "reference_to_coordinates",
        description: "Centroid coordinates of a parcel.",
        parameters: &[
            req("reference", Str),
            opt("srs", Str),
            opt("province", Str),
            opt("municipality", Str),
        ],
    },
    ToolDescriptor {
        name: "coordinates_to_reference",
        description: "Parcel reference at a coordinate.",
        parameters: &[req("x", Number), req("y", Number), opt("srs", Str)],
    },
    ToolDescriptor {
        name: "nearby_references",
        description: "Parcel references around a coordinate, with distances in metres.",
        parameters: &[req("x", Number), req("y", Number), opt("srs", Str)],
    },
    ToolDescriptor {
        name: "wfs_capabilities",
        description: "Raw GetCapabilities document of the cadastral parcels WFS.",
        parameters: &[opt("version", Str)],
    },
    ToolDescriptor {
        name: "wfs_feature_types",
        description: "Feature types of the cadastral parcels WFS with their CRSs.",
        parameters: &[opt("version", Str)],
    },
    ToolDescriptor {
        name: "describe_feature_type",
        description: "Fields of a feature type, resolving the schema include/import graph.",
        parameters: &[req("type_name", Str), opt("version", Str), opt("max_includes", Integer)],
    },
    ToolDescriptor {
        name: "parcel_gml",
        description: "GML of one parcel via the GetParcel stored query; srs=AUTO picks the UTM zone the WFS supports.",
        parameters: &[req("reference", Str), opt("srs", Str)],
    },
    ToolDescriptor {
        name: "parcel_vertices",
        description: "First exterior ring of a parcel in EPSG:4326 as served, with coordinate statistics.",
        parameters: &[req("reference", Str)],
    },
    ToolDescriptor {
        name: "wfs_feature_sample",
        description: "Head of an unfiltered GetFeature response, for inspection.",
        parameters: &[opt("type_name", Str), opt("srs", Str), opt("count", Integer)],
    },
    ToolDescriptor {
        name: "parcel_geojson",
        description: "Parcel geometry as a GeoJSON FeatureCollection in longitude/latitude order.",
        parameters: &[req("reference", Str)],
    },
];

pub fn find(name: &str) -> Option<&'static ToolDescriptor> {
    TOOLS.iter().find(|t| t.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = TOOLS.iter().map(|t| t.name).collect();
        assert_eq!(names.len(), TOOLS.len());
    }

    #[test]
    fn test_unknown_argument_rejected() {
        let tool = find("parcel_geojson").unwrap();
        let args = json!({"reference": "1146801VK4714E", "srs": "EPSG:25830"});
        let err = tool.check_arguments(args.as_object().unwrap()).unwrap_err();
        assert_eq!(err.kind(), "InvalidParameter");
    }

    #[test]
    fn test_descriptor_json() {
        let v = serde_json::to_value(find("coordinates_to_reference").unwrap()).unwrap();
        assert_eq!(v["parameters"][0], json!({"name": "x", "type": "number", "required": true}));
        assert_eq!(v["parameters"][2]["required"], false);
    }
}
