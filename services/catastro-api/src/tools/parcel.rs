//! Parcel geometry tools built on the `GetParcel` stored query.

use catastro_common::crs::{classify_srs, epsg_from_srs, normalize_srs_to_urn, wfs_utm_epsg_for_lon};
use catastro_common::{AxisOrder, CadastralReference, CatastroError, CatastroResult, SrsClass};
use inspire_protocol::gml::Coord;
use inspire_protocol::{
    is_exception_report, parse_geometry, requests, CoordinateStats, FeatureCollection, GeoJsonProjector,
    GmlFeature,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::wfs::reject_exception;
use super::{SrsRequest, ToolOutput, DEFAULT_SRS};
use crate::state::AppState;
use crate::upstream::WFS_SERVICE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SrsMode {
    Auto,
    Manual,
}

#[derive(Debug, Serialize)]
pub struct ParcelGml {
    pub reference: String,
    pub mode: SrsMode,
    /// SRS of the returned document.
    pub srs: String,
    /// UTM code chosen in auto mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_epsg: Option<u32>,
    /// Set when auto mode had to keep the EPSG:4326 document.
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub url: String,
    pub bytes: usize,
    pub gml: String,
}

#[derive(Debug, Serialize)]
pub struct ParcelVertices {
    pub reference: String,
    pub srs_name: String,
    pub axis_order: AxisOrder,
    pub vertex_count: usize,
    pub truncated: bool,
    /// Leading vertices, in document axis order.
    pub vertices: Vec<Coord>,
    pub stats: CoordinateStats,
    pub epsg_utm_recommended: u32,
}

#[derive(Debug, Serialize)]
pub struct ParcelGeoJson {
    pub reference: String,
    pub source_srs_name: String,
    pub axis_fix_applied: bool,
    pub feature_collection: FeatureCollection,
}

/// One fetched `GetParcel` document.
struct ParcelDocument {
    url: String,
    srs_urn: String,
    xml: String,
}

impl ParcelDocument {
    fn features(&self) -> CatastroResult<Vec<GmlFeature>> {
        Ok(parse_geometry(self.xml.as_bytes()).collect::<Result<Vec<_>, _>>()?)
    }
}

/// Fetch a parcel without rejecting exception reports.
async fn fetch_raw(state: &AppState, parcel_id: &str, srs: &str) -> CatastroResult<ParcelDocument> {
    let url = requests::get_parcel(&state.endpoints.wfs_cp, &state.config.upstream.wfs_version, parcel_id, srs);
    let url_text = url.to_string();
    let xml = state.upstream.get_xml(WFS_SERVICE, url).await?;
    Ok(ParcelDocument {
        url: url_text,
        srs_urn: normalize_srs_to_urn(srs),
        xml,
    })
}

async fn fetch(state: &AppState, parcel_id: &str, srs: &str) -> CatastroResult<ParcelDocument> {
    let doc = fetch_raw(state, parcel_id, srs).await?;
    reject_exception(&doc.xml, state.config.limits.exception_preview_chars)?;
    Ok(doc)
}

fn not_found(reference: &CadastralReference) -> CatastroError {
    CatastroError::NotFound(format!("the WFS returned no parcel for {}", reference.parcel_id()))
}

/// Axis order of a served `srsName`. Unrecognised names fall back to the
/// SRS that was requested.
fn axis_order_of(srs_name: &str, requested: &str) -> CatastroResult<AxisOrder> {
    match classify_srs(srs_name) {
        SrsClass::Geographic { axis_order, .. } => Ok(axis_order),
        SrsClass::Projected { epsg } => Err(CatastroError::UnsupportedSrs(format!(
            "EPSG:{} is projected; GeoJSON output needs geographic coordinates",
            epsg
        ))),
        SrsClass::Unknown if srs_name != requested => axis_order_of(requested, requested),
        SrsClass::Unknown => Err(CatastroError::UnsupportedSrs(srs_name.to_string())),
    }
}

/// Longitude of a geographic coordinate.
fn longitude([a, b]: Coord, order: AxisOrder) -> f64 {
    match order {
        AxisOrder::LonLat => a,
        AxisOrder::LatLon => b,
    }
}

/// First feature with a geometry, with the `srsName` it was served in.
fn first_geometry<'a>(
    features: &'a [GmlFeature],
    doc: &'a ParcelDocument,
    reference: &CadastralReference,
) -> CatastroResult<(&'a GmlFeature, &'a str)> {
    let feature = features
        .iter()
        .find(|f| f.geometry.is_some())
        .ok_or_else(|| not_found(reference))?;
    let srs_name = feature.srs_name.as_deref().unwrap_or(&doc.srs_urn);
    Ok((feature, srs_name))
}

fn first_ring_coords(feature: &GmlFeature) -> CatastroResult<&[Coord]> {
    feature
        .geometry
        .as_ref()
        .and_then(|g| g.first_ring())
        .map(|r| r.coords())
        .ok_or_else(|| CatastroError::MalformedGeometry("parcel geometry has no exterior ring".to_string()))
}

pub async fn parcel_gml(
    state: &AppState,
    reference: &CadastralReference,
    srs: &SrsRequest,
) -> CatastroResult<ToolOutput> {
    let parcel_id = reference.parcel_id();
    let output = match srs {
        SrsRequest::Manual(srs) => {
            let doc = fetch(state, parcel_id, srs).await?;
            if !doc.xml.contains(parcel_id) {
                return Err(not_found(reference));
            }
            ParcelGml {
                reference: parcel_id.to_string(),
                mode: SrsMode::Manual,
                srs: srs.clone(),
                utm_epsg: None,
                fallback: false,
                note: None,
                url: doc.url,
                bytes: doc.xml.len(),
                gml: doc.xml,
            }
        }
        SrsRequest::Auto => auto_utm(state, reference).await?,
    };
    Ok(ToolOutput::ParcelGml(output))
}

/// Fetch in EPSG:4326, pick the UTM zone from the first vertex and re-request.
/// The 4326 document is kept when the WFS refuses or ignores the UTM SRS.
async fn auto_utm(state: &AppState, reference: &CadastralReference) -> CatastroResult<ParcelGml> {
    let parcel_id = reference.parcel_id();
    let base = fetch(state, parcel_id, DEFAULT_SRS).await?;
    let features = base.features()?;
    let (feature, srs_name) = first_geometry(&features, &base, reference)?;
    let order = axis_order_of(srs_name, &base.srs_urn)?;
    let first = first_ring_coords(feature)?
        .first()
        .copied()
        .ok_or_else(|| CatastroError::MalformedGeometry("empty exterior ring".to_string()))?;
    let epsg = wfs_utm_epsg_for_lon(longitude(first, order));
    let utm_srs = format!("EPSG:{}", epsg);
    debug!(parcel_id, epsg, "Selected UTM zone");

    let fallback = |note: String| {
        warn!(parcel_id, epsg, note = %note, "Falling back to EPSG:4326 GML");
        ParcelGml {
            reference: parcel_id.to_string(),
            mode: SrsMode::Auto,
            srs: DEFAULT_SRS.to_string(),
            utm_epsg: Some(epsg),
            fallback: true,
            note: Some(note),
            url: base.url.clone(),
            bytes: base.xml.len(),
            gml: base.xml.clone(),
        }
    };

    let utm = fetch_raw(state, parcel_id, &utm_srs).await?;
    if is_exception_report(&utm.xml) {
        return Ok(fallback(format!("the WFS refused {}", utm_srs)));
    }

    let utm_features = match utm.features() {
        Ok(features) => features,
        Err(e) => return Ok(fallback(format!("the {} answer is unusable: {}", utm_srs, e))),
    };
    let served = utm_features.iter().find_map(|f| f.srs_name.as_deref());
    if served.and_then(epsg_from_srs) != Some(epsg) {
        return Ok(fallback(format!(
            "the WFS ignored {} and answered in {}",
            utm_srs,
            served.unwrap_or("an unspecified SRS")
        )));
    }

    info!(parcel_id, epsg, "Parcel GML served in UTM");
    Ok(ParcelGml {
        reference: parcel_id.to_string(),
        mode: SrsMode::Auto,
        srs: utm_srs,
        utm_epsg: Some(epsg),
        fallback: false,
        note: None,
        url: utm.url,
        bytes: utm.xml.len(),
        gml: utm.xml,
    })
}

pub async fn parcel_vertices(state: &AppState, reference: &CadastralReference) -> CatastroResult<ToolOutput> {
    let doc = fetch(state, reference.parcel_id(), DEFAULT_SRS).await?;
    let features = doc.features()?;
    let (feature, srs_name) = first_geometry(&features, &doc, reference)?;
    let order = axis_order_of(srs_name, &doc.srs_urn)?;
    let coords = first_ring_coords(feature)?;
    let stats = CoordinateStats::from_coords(coords)
        .ok_or_else(|| CatastroError::MalformedGeometry("empty exterior ring".to_string()))?;

    let limit = state.config.limits.vertices_preview;
    Ok(ToolOutput::ParcelVertices(ParcelVertices {
        reference: reference.parcel_id().to_string(),
        srs_name: srs_name.to_string(),
        axis_order: order,
        vertex_count: coords.len(),
        truncated: coords.len() > limit,
        vertices: coords.iter().take(limit).copied().collect(),
        epsg_utm_recommended: wfs_utm_epsg_for_lon(longitude(coords[0], order)),
        stats,
    }))
}

pub async fn parcel_geojson(state: &AppState, reference: &CadastralReference) -> CatastroResult<ToolOutput> {
    let doc = fetch(state, reference.parcel_id(), DEFAULT_SRS).await?;
    let features = doc.features()?;
    let (_, srs_name) = first_geometry(&features, &doc, reference)?;
    let order = axis_order_of(srs_name, &doc.srs_urn)?;
    let projector = GeoJsonProjector::new(order).with_precision(state.config.effective_geojson_precision());

    let mut attributes = Map::new();
    attributes.insert("refcat".to_string(), Value::from(reference.parcel_id()));
    attributes.insert("source_srs_name".to_string(), Value::from(srs_name));
    attributes.insert("axis_fix_applied".to_string(), Value::from(projector.swaps_axes()));

    let feature_collection = projector.project(&features, &attributes);
    Ok(ToolOutput::GeoJson(ParcelGeoJson {
        reference: reference.parcel_id().to_string(),
        source_srs_name: srs_name.to_string(),
        axis_fix_applied: projector.swaps_axes(),
        feature_collection,
    }))
}
