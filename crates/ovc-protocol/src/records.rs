//! Typed records extracted from OVC payload items.

use serde::Serialize;
use serde_json::Value;

use crate::json::{decimal, field, path};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Province {
    /// INE province code.
    pub code: Option<String>,
    pub name: String,
}

impl Province {
    pub fn from_json(item: &Value) -> Option<Self> {
        Some(Self {
            code: field(item, "cpine"),
            name: field(item, "np")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Municipality {
    pub name: String,
    /// INE province code.
    pub province_code: Option<String>,
    /// INE municipality code.
    pub ine_code: Option<String>,
    /// Cadastral delegation and municipality code, which differ from INE's.
    pub delegation: Option<String>,
    pub cadastral_code: Option<String>,
}

impl Municipality {
    pub fn from_json(item: &Value) -> Option<Self> {
        Some(Self {
            name: field(item, "nm")?,
            province_code: path(item, &["loine", "cp"]),
            ine_code: path(item, &["loine", "cm"]),
            delegation: path(item, &["locat", "cd"]),
            cadastral_code: path(item, &["locat", "cmc"]),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Street {
    pub code: Option<String>,
    /// Street type abbreviation (`CL`, `AV`, ...).
    pub street_type: Option<String>,
    pub name: String,
}

impl Street {
    pub fn from_json(item: &Value) -> Option<Self> {
        let dir = item.get("dir").unwrap_or(item);
        Some(Self {
            code: field(dir, "cv"),
            street_type: field(dir, "tv"),
            name: field(dir, "nv")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreetNumber {
    pub number: Option<String>,
    /// 14-character parcel reference at this number.
    pub reference: Option<String>,
}

impl StreetNumber {
    pub fn from_json(item: &Value) -> Option<Self> {
        let number = path(item, &["num", "pnp"]);
        let reference = item.get("pc").and_then(reference_from_parts);
        if number.is_none() && reference.is_none() {
            return None;
        }
        Some(Self { number, reference })
    }
}

/// One property (building unit or parcel).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyRecord {
    pub reference: String,
    /// `UR` (urban) or `RU` (rural) when the service reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub address: Option<String>,
    pub usage: Option<String>,
    pub surface_m2: Option<f64>,
    /// Share of the parcel, in percent.
    pub participation: Option<f64>,
    pub year_built: Option<String>,
}

impl PropertyRecord {
    /// From an `rcdnp` list item or a `bi` object.
    pub fn from_json(item: &Value) -> Option<Self> {
        let rc = item
            .get("rc")
            .or_else(|| item.get("idbi").and_then(|id| id.get("rc")))?;
        let debi = item.get("debi");
        Some(Self {
            reference: reference_from_parts(rc)?,
            class: path(item, &["idbi", "cn"]),
            address: field(item, "ldt"),
            usage: debi.and_then(|d| field(d, "luso")),
            surface_m2: debi.and_then(|d| d.get("sfc")).and_then(decimal),
            participation: debi.and_then(|d| d.get("cpt")).and_then(decimal),
            year_built: debi.and_then(|d| field(d, "ant")),
        })
    }
}

/// A reference located by (or at) a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinateMatch {
    pub reference: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub srs: Option<String>,
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
}

impl CoordinateMatch {
    /// From a `coord` item (`Consulta_CPMRC`, `Consulta_RCCOOR`).
    pub fn from_json(item: &Value) -> Self {
        let geo = item.get("geo");
        Self {
            reference: item.get("pc").and_then(reference_from_parts),
            x: geo.and_then(|g| g.get("xcen")).and_then(decimal),
            y: geo.and_then(|g| g.get("ycen")).and_then(decimal),
            srs: geo.and_then(|g| field(g, "srs")),
            address: field(item, "ldt"),
            distance_m: None,
        }
    }

    /// From a `coordd` item: one match per `lpcd` entry, all sharing the
    /// queried point.
    pub fn from_distance_json(item: &Value) -> Vec<Self> {
        let point = Self::from_json(item);
        item.get("lpcd")
            .map(crate::json::one_or_many)
            .unwrap_or_default()
            .into_iter()
            .map(|entry| Self {
                reference: entry.get("pc").and_then(reference_from_parts),
                address: field(entry, "ldt"),
                distance_m: entry.get("dis").and_then(decimal),
                ..point.clone()
            })
            .collect()
    }
}

/// Join `pc1 pc2 [car cc1 cc2]` into one reference.
pub fn reference_from_parts(rc: &Value) -> Option<String> {
    let joined: String = ["pc1", "pc2", "car", "cc1", "cc2"]
        .iter()
        .filter_map(|k| field(rc, k))
        .collect();
    (!joined.is_empty()).then_some(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_from_parts() {
        let rc = json!({"pc1": "1146801", "pc2": "VK4714E", "car": "0001", "cc1": "P", "cc2": "W"});
        assert_eq!(reference_from_parts(&rc).as_deref(), Some("1146801VK4714E0001PW"));
        let pc = json!({"pc1": "1146801", "pc2": "VK4714E"});
        assert_eq!(reference_from_parts(&pc).as_deref(), Some("1146801VK4714E"));
        assert_eq!(reference_from_parts(&json!({})), None);
    }

    #[test]
    fn test_property_record_from_bi() {
        let bi = json!({
            "idbi": {"cn": "UR", "rc": {"pc1": "1146801", "pc2": "VK4714E", "car": "0001", "cc1": "P", "cc2": "W"}},
            "ldt": "CL ALCALA 12",
            "debi": {"luso": "Residencial", "sfc": "96", "cpt": "12,500000", "ant": "1965"}
        });
        let record = PropertyRecord::from_json(&bi).unwrap();
        assert_eq!(record.reference, "1146801VK4714E0001PW");
        assert_eq!(record.class.as_deref(), Some("UR"));
        assert_eq!(record.surface_m2, Some(96.0));
        assert_eq!(record.participation, Some(12.5));
    }

    #[test]
    fn test_street_requires_name() {
        assert!(Street::from_json(&json!({"dir": {"cv": "1"}})).is_none());
    }
}
