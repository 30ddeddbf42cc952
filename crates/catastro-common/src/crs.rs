//! Spatial reference system names, EPSG codes and axis order.
//!
//! The WFS answers with `srsName` values in several spellings (short `EPSG:n`,
//! `urn:ogc:def:crs:EPSG::n`, `http://www.opengis.net/def/crs/EPSG/0/n`,
//! `CRS:84`). The helpers here normalise those spellings and decide which axis
//! comes first in the coordinates the server writes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical URN for OGC CRS84 (WGS84 with longitude first).
pub const CRS84_URN: &str = "urn:ogc:def:crs:CRS::84";

/// Geographic EPSG codes the Catastro WFS may serve (WGS84, ETRS89, ED50).
const GEOGRAPHIC_EPSG: &[u32] = &[4326, 4258, 4230];

/// Axis order for coordinate interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisOrder {
    /// Longitude (or easting) first.
    LonLat,
    /// Latitude (or northing) first.
    LatLon,
}

impl fmt::Display for AxisOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisOrder::LonLat => write!(f, "lon/lat"),
            AxisOrder::LatLon => write!(f, "lat/lon"),
        }
    }
}

/// Classification of an `srsName` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SrsClass {
    /// Geographic CRS in degrees; GeoJSON can carry it after an optional swap.
    Geographic {
        epsg: Option<u32>,
        axis_order: AxisOrder,
    },
    /// Projected CRS (UTM, Web Mercator, ...); needs reprojection for GeoJSON.
    Projected { epsg: u32 },
    /// Not recognised.
    Unknown,
}

impl SrsClass {
    /// Axis order for geographic systems, `None` otherwise.
    pub fn axis_order(&self) -> Option<AxisOrder> {
        match self {
            SrsClass::Geographic { axis_order, .. } => Some(*axis_order),
            _ => None,
        }
    }
}

/// Normalise an SRS string to its OGC URN form.
///
/// Accepts:
/// - `EPSG:25830`, `EPSG::25830`
/// - `urn:ogc:def:crs:EPSG::25830`
/// - `http://www.opengis.net/def/crs/EPSG/0/25830`
/// - `CRS:84`, `CRS::84`, `urn:ogc:def:crs:CRS::84`
///
/// Anything else is returned trimmed but otherwise untouched.
pub fn normalize_srs_to_urn(srs: &str) -> String {
    let s = srs.trim();
    if s.is_empty() {
        return String::new();
    }

    if is_crs84(s) {
        return CRS84_URN.to_string();
    }

    let lower = s.to_lowercase();
    if lower.starts_with("urn:ogc:def:crs:epsg::") || lower.starts_with("urn:ogc:def:crs:crs::") {
        return s.to_string();
    }

    if let Some(code) = epsg_from_url(s) {
        return epsg_urn(code);
    }

    let upper = s.to_uppercase();
    let short_code = upper
        .strip_prefix("EPSG::")
        .or_else(|| upper.strip_prefix("EPSG:"))
        .map(str::trim);
    if let Some(code) = short_code.and_then(|c| c.parse::<u32>().ok()) {
        return epsg_urn(code);
    }

    s.to_string()
}

/// URN for an EPSG code.
pub fn epsg_urn(code: u32) -> String {
    format!("urn:ogc:def:crs:EPSG::{}", code)
}

/// Extract the EPSG code from any of the supported spellings.
pub fn epsg_from_srs(srs: &str) -> Option<u32> {
    let s = srs.trim();
    let lower = s.to_lowercase();

    if lower.starts_with("urn:ogc:def:crs:epsg:") {
        return s.rsplit(':').next().and_then(|c| c.parse().ok());
    }

    if let Some(code) = epsg_from_url(s) {
        return Some(code);
    }

    let upper = s.to_uppercase();
    upper
        .strip_prefix("EPSG::")
        .or_else(|| upper.strip_prefix("EPSG:"))
        .and_then(|c| c.trim().parse().ok())
}

/// `http://www.opengis.net/def/crs/EPSG/0/25830` → 25830
fn epsg_from_url(s: &str) -> Option<u32> {
    let segments: Vec<&str> = s.trim_end_matches('/').rsplit('/').take(3).collect();
    match segments.as_slice() {
        [code, version, authority]
            if authority.eq_ignore_ascii_case("epsg")
                && version.chars().all(|c| c.is_ascii_digit()) =>
        {
            code.parse().ok()
        }
        _ => None,
    }
}

/// Whether the SRS is OGC CRS84 (WGS84, longitude first).
pub fn is_crs84(srs: &str) -> bool {
    let compact: String = srs
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    compact == "CRS:84" || compact.ends_with("CRS::84") || compact.ends_with("CRS84")
}

/// Classify an `srsName` value and derive the axis order of its coordinates.
///
/// URN and URL spellings of geographic EPSG codes follow the EPSG axis
/// definition (latitude first). The legacy short form `EPSG:4326` and CRS84
/// are written longitude first.
pub fn classify_srs(srs: &str) -> SrsClass {
    if is_crs84(srs) {
        return SrsClass::Geographic {
            epsg: None,
            axis_order: AxisOrder::LonLat,
        };
    }

    let Some(epsg) = epsg_from_srs(srs) else {
        return SrsClass::Unknown;
    };

    if !GEOGRAPHIC_EPSG.contains(&epsg) {
        return SrsClass::Projected { epsg };
    }

    let upper = srs.trim().to_uppercase();
    let short_form = upper.starts_with("EPSG:") && !upper.starts_with("EPSG::");
    let axis_order = if short_form {
        AxisOrder::LonLat
    } else {
        AxisOrder::LatLon
    };

    SrsClass::Geographic {
        epsg: Some(epsg),
        axis_order,
    }
}

/// UTM zone (1..=60) containing a longitude in degrees.
pub fn utm_zone_for_lon(lon: f64) -> u32 {
    let zone = ((lon + 180.0) / 6.0).floor() as i64 + 1;
    zone.clamp(1, 60) as u32
}

/// UTM EPSG code the Catastro WFS accepts for a longitude.
///
/// The Canary Islands (zones 27 and 28) are only offered as WGS84 / UTM
/// (EPSG:326xx); the peninsula and the Balearic Islands use ETRS89 / UTM
/// (EPSG:258xx).
pub fn wfs_utm_epsg_for_lon(lon: f64) -> u32 {
    let zone = utm_zone_for_lon(lon);
    match zone {
        27 | 28 => 32600 + zone,
        _ => 25800 + zone,
    }
}
