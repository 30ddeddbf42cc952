//! Mapping of OVC payloads into a closed set of result variants.

use catastro_common::{name_matches, CadastralReference, CatastroError, QueryShape};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::endpoints::OvcEndpoint;
use crate::json::{field, find_key, one_or_many};
use crate::records::{CoordinateMatch, Municipality, PropertyRecord, Province, Street, StreetNumber};

#[derive(Debug, Error)]
pub enum OvcError {
    /// The payload carried an `lerr` error list.
    #[error("OVC {service} rejected the request ({code}): {message}")]
    Rejected {
        service: &'static str,
        code: String,
        message: String,
    },

    #[error("{0}")]
    NotFound(String),
}

impl From<OvcError> for CatastroError {
    fn from(err: OvcError) -> Self {
        match err {
            OvcError::Rejected {
                service,
                code,
                message,
            } => CatastroError::UpstreamRejected {
                service: service.to_string(),
                code,
                message,
            },
            OvcError::NotFound(message) => CatastroError::NotFound(message),
        }
    }
}

/// Typed OVC result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OvcResult {
    Provinces { items: Vec<Province> },
    Municipalities { items: Vec<Municipality> },
    Streets { items: Vec<Street> },
    Numbers { items: Vec<StreetNumber> },
    Properties { items: Vec<PropertyRecord> },
    Coordinates { items: Vec<CoordinateMatch> },
    /// The payload did not have the expected shape; kept verbatim.
    Unexpected { endpoint: OvcEndpoint, raw: Value },
}

impl OvcResult {
    /// Number of typed items; `None` for [`OvcResult::Unexpected`].
    pub fn len(&self) -> Option<usize> {
        match self {
            OvcResult::Provinces { items } => Some(items.len()),
            OvcResult::Municipalities { items } => Some(items.len()),
            OvcResult::Streets { items } => Some(items.len()),
            OvcResult::Numbers { items } => Some(items.len()),
            OvcResult::Properties { items } => Some(items.len()),
            OvcResult::Coordinates { items } => Some(items.len()),
            OvcResult::Unexpected { .. } => None,
        }
    }

    /// Keep only named items matching `filter`; other variants are untouched.
    pub fn retain_names(&mut self, filter: &str) {
        match self {
            OvcResult::Provinces { items } => items.retain(|p| name_matches(&p.name, filter)),
            OvcResult::Municipalities { items } => items.retain(|m| name_matches(&m.name, filter)),
            OvcResult::Streets { items } => items.retain(|s| name_matches(&s.name, filter)),
            _ => {}
        }
    }
}

/// Keys under which each endpoint returns its items.
fn containers(endpoint: OvcEndpoint) -> &'static [&'static str] {
    match endpoint {
        OvcEndpoint::Provinces => &["prov"],
        OvcEndpoint::Municipalities => &["muni"],
        OvcEndpoint::Streets => &["calle"],
        OvcEndpoint::Numbers => &["nump"],
        OvcEndpoint::PropertyByAddress
        | OvcEndpoint::PropertyByReference
        | OvcEndpoint::PropertyByPolygonParcel => &["rcdnp", "bi"],
        OvcEndpoint::ReferenceToCoordinates | OvcEndpoint::CoordinatesToReference => &["coord"],
        OvcEndpoint::NearbyReferences => &["coordd"],
    }
}

fn check_errors(endpoint: OvcEndpoint, value: &Value) -> Result<(), OvcError> {
    let Some(errors) = find_key(value, "lerr").and_then(|l| l.get("err").or(Some(l))) else {
        return Ok(());
    };
    let errors = one_or_many(errors);
    let Some(first) = errors.first() else {
        return Ok(());
    };
    let message = errors
        .iter()
        .filter_map(|e| field(e, "des"))
        .collect::<Vec<_>>()
        .join("; ");
    Err(OvcError::Rejected {
        service: endpoint.service().as_str(),
        code: field(first, "cod").unwrap_or_default(),
        message,
    })
}

/// Map a decoded OVC payload.
///
/// An error list becomes [`OvcError::Rejected`]. A payload with a `control`
/// block but no item container is an empty result; anything else that lacks
/// the container is [`OvcResult::Unexpected`].
pub fn parse_response(endpoint: OvcEndpoint, value: &Value) -> Result<OvcResult, OvcError> {
    check_errors(endpoint, value)?;

    let items = match containers(endpoint).iter().find_map(|k| find_key(value, k)) {
        Some(container) => one_or_many(container),
        None if find_key(value, "control").is_some() => Vec::new(),
        None => {
            return Ok(OvcResult::Unexpected {
                endpoint,
                raw: value.clone(),
            })
        }
    };

    let result = match endpoint {
        OvcEndpoint::Provinces => OvcResult::Provinces {
            items: items.into_iter().filter_map(Province::from_json).collect(),
        },
        OvcEndpoint::Municipalities => OvcResult::Municipalities {
            items: items.into_iter().filter_map(Municipality::from_json).collect(),
        },
        OvcEndpoint::Streets => OvcResult::Streets {
            items: items.into_iter().filter_map(Street::from_json).collect(),
        },
        OvcEndpoint::Numbers => OvcResult::Numbers {
            items: items.into_iter().filter_map(StreetNumber::from_json).collect(),
        },
        OvcEndpoint::PropertyByAddress
        | OvcEndpoint::PropertyByReference
        | OvcEndpoint::PropertyByPolygonParcel => OvcResult::Properties {
            items: items.into_iter().filter_map(PropertyRecord::from_json).collect(),
        },
        OvcEndpoint::ReferenceToCoordinates | OvcEndpoint::CoordinatesToReference => {
            OvcResult::Coordinates {
                items: items.into_iter().map(CoordinateMatch::from_json).collect(),
            }
        }
        OvcEndpoint::NearbyReferences => OvcResult::Coordinates {
            items: items
                .into_iter()
                .flat_map(CoordinateMatch::from_distance_json)
                .collect(),
        },
    };
    Ok(result)
}

/// Outcome of a reference lookup, shaped by the reference length.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PropertyLookup {
    /// 14-character input: every unit of the parcel.
    Parcel {
        parcel_id: String,
        units: Vec<PropertyRecord>,
    },
    /// 18/20-character input: one unit.
    Unit { record: PropertyRecord },
}

impl PropertyLookup {
    /// Keep the records the reference asks for; fails with `NotFound` when
    /// none remains.
    pub fn from_records(reference: &CadastralReference, records: Vec<PropertyRecord>) -> Result<Self, OvcError> {
        let mut matching = records.into_iter().filter(|r| reference.covers(&r.reference));
        match reference.query_shape() {
            QueryShape::ParcelFanOut => {
                let units: Vec<_> = matching.collect();
                if units.is_empty() {
                    return Err(not_found(reference));
                }
                Ok(PropertyLookup::Parcel {
                    parcel_id: reference.parcel_id().to_string(),
                    units,
                })
            }
            QueryShape::UnitLookup => matching
                .next()
                .map(|record| PropertyLookup::Unit { record })
                .ok_or_else(|| not_found(reference)),
        }
    }

    pub fn references(&self) -> Vec<&str> {
        match self {
            PropertyLookup::Parcel { units, .. } => units.iter().map(|u| u.reference.as_str()).collect(),
            PropertyLookup::Unit { record } => vec![record.reference.as_str()],
        }
    }
}

fn not_found(reference: &CadastralReference) -> OvcError {
    OvcError::NotFound(format!("no property matches reference {}", reference))
}
