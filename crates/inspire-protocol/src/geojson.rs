//! GeoJSON output for parsed GML features.
//!
//! GeoJSON positions are always longitude first (RFC 7946). The projector
//! swaps every position of every ring when the source SRS writes latitude
//! first; it never reprojects between coordinate systems.

use catastro_common::{AxisOrder, BoundingBox};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::gml::{Coord, GeometryNode, GmlFeature, LinearRing, Polygon};

/// Decimal places kept by default (about 1 cm at the equator).
pub const DEFAULT_PRECISION: u32 = 7;

/// A GeoJSON FeatureCollection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,

    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Create a new empty FeatureCollection.
    pub fn new() -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            bbox: None,
            features: Vec::new(),
        }
    }

    /// Add a feature, growing the collection bbox.
    pub fn with_feature(mut self, feature: Feature) -> Self {
        if let Some(fb) = feature.bbox {
            let fb = BoundingBox::new(fb[0], fb[1], fb[2], fb[3]);
            self.bbox = Some(match self.bbox {
                Some(cb) => BoundingBox::new(cb[0], cb[1], cb[2], cb[3]).union(&fb).to_array(),
                None => fb.to_array(),
            });
        }
        self.features.push(feature);
        self
    }
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new()
    }
}

/// A GeoJSON Feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,

    /// `null` for features without geometry.
    pub geometry: Option<Geometry>,

    pub properties: Map<String, Value>,
}

impl Feature {
    /// Feature with the given geometry; bbox derived from it.
    pub fn new(geometry: Option<Geometry>) -> Self {
        let bbox = geometry
            .as_ref()
            .and_then(|g| BoundingBox::from_points(g.positions()))
            .map(|b| b.to_array());
        Self {
            type_: "Feature".to_string(),
            id: None,
            bbox,
            geometry,
            properties: Map::new(),
        }
    }

    /// Set the feature ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set one property, replacing any previous value.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// GeoJSON geometry types produced from GML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        /// [longitude, latitude]
        coordinates: [f64; 2],
    },
    LineString {
        coordinates: Vec<[f64; 2]>,
    },
    /// Rings: exterior first, then holes.
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
}

impl Geometry {
    /// Every position of the geometry.
    pub fn positions(&self) -> Vec<[f64; 2]> {
        match self {
            Geometry::Point { coordinates } => vec![*coordinates],
            Geometry::LineString { coordinates } => coordinates.clone(),
            Geometry::Polygon { coordinates } => coordinates.concat(),
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().flat_map(|p| p.concat()).collect()
            }
        }
    }

    /// Rings of every polygon, in order.
    pub fn rings(&self) -> Vec<&Vec<[f64; 2]>> {
        match self {
            Geometry::Polygon { coordinates } => coordinates.iter().collect(),
            Geometry::MultiPolygon { coordinates } => coordinates.iter().flatten().collect(),
            _ => Vec::new(),
        }
    }
}

/// A parsed feature in longitude/latitude order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub id: Option<String>,
    pub geometry: Option<GeometryNode>,
    pub properties: BTreeMap<String, String>,
}

/// Converts GML features to GeoJSON.
#[derive(Debug, Clone, Copy)]
pub struct GeoJsonProjector {
    source_axis_order: AxisOrder,
    precision: u32,
}

impl GeoJsonProjector {
    pub fn new(source_axis_order: AxisOrder) -> Self {
        Self {
            source_axis_order,
            precision: DEFAULT_PRECISION,
        }
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    /// Whether positions are swapped on output.
    pub fn swaps_axes(&self) -> bool {
        self.source_axis_order == AxisOrder::LatLon
    }

    /// Normalise a parsed feature to longitude/latitude order.
    pub fn to_record(&self, feature: &GmlFeature) -> FeatureRecord {
        let geometry = feature.geometry.as_ref().map(|g| {
            if self.swaps_axes() {
                g.swap_axes()
            } else {
                g.clone()
            }
        });
        FeatureRecord {
            id: feature.id.clone(),
            geometry,
            properties: feature.properties.clone(),
        }
    }

    fn round(&self, [x, y]: Coord) -> [f64; 2] {
        let factor = 10f64.powi(self.precision as i32);
        [(x * factor).round() / factor, (y * factor).round() / factor]
    }

    fn ring(&self, ring: &LinearRing) -> Vec<[f64; 2]> {
        ring.coords().iter().map(|c| self.round(*c)).collect()
    }

    fn polygon(&self, polygon: &Polygon) -> Vec<Vec<[f64; 2]>> {
        polygon.rings().map(|r| self.ring(r)).collect()
    }

    /// GeoJSON geometry of a lon/lat node. A single-member MultiSurface
    /// becomes a Polygon; a bare ring becomes a LineString.
    pub fn geometry(&self, node: &GeometryNode) -> Geometry {
        match node {
            GeometryNode::Point(c) => Geometry::Point {
                coordinates: self.round(*c),
            },
            GeometryNode::LinearRing(r) => Geometry::LineString {
                coordinates: self.ring(r),
            },
            GeometryNode::Polygon(p) => Geometry::Polygon {
                coordinates: self.polygon(p),
            },
            GeometryNode::MultiSurface(ps) if ps.len() == 1 => Geometry::Polygon {
                coordinates: self.polygon(&ps[0]),
            },
            GeometryNode::MultiSurface(ps) => Geometry::MultiPolygon {
                coordinates: ps.iter().map(|p| self.polygon(p)).collect(),
            },
        }
    }

    /// Build a feature; `attributes` are merged over the parsed properties.
    pub fn feature(&self, record: &FeatureRecord, attributes: &Map<String, Value>) -> Feature {
        let mut feature = Feature::new(record.geometry.as_ref().map(|g| self.geometry(g)));
        if let Some(id) = &record.id {
            feature = feature.with_id(id.clone());
        }
        for (k, v) in &record.properties {
            feature.properties.insert(k.clone(), Value::String(v.clone()));
        }
        for (k, v) in attributes {
            feature.properties.insert(k.clone(), v.clone());
        }
        feature
    }

    pub fn project(&self, features: &[GmlFeature], attributes: &Map<String, Value>) -> FeatureCollection {
        features
            .iter()
            .map(|f| self.feature(&self.to_record(f), attributes))
            .fold(FeatureCollection::new(), FeatureCollection::with_feature)
    }
}

/// Project parsed features with the default precision.
pub fn to_feature_collection(
    features: &[GmlFeature],
    source_axis_order: AxisOrder,
    attributes: &Map<String, Value>,
) -> FeatureCollection {
    GeoJsonProjector::new(source_axis_order).project(features, attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gml::parse_geometry;
    use test_utils::fixtures::gml;

    fn parcel_features() -> Vec<GmlFeature> {
        parse_geometry(gml::PARCEL_4326.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_lat_lon_source_is_swapped() {
        let fc = to_feature_collection(&parcel_features(), AxisOrder::LatLon, &Map::new());
        assert_eq!(fc.features.len(), 1);

        let Some(Geometry::Polygon { coordinates }) = &fc.features[0].geometry else {
            panic!("single-member MultiSurface should become a Polygon");
        };
        assert_eq!(
            coordinates[0],
            vec![[-3.7, 40.1], [-3.7, 40.2], [-3.6, 40.2], [-3.6, 40.1], [-3.7, 40.1]]
        );
        assert_eq!(fc.bbox, Some([-3.7, 40.1, -3.6, 40.2]));
        assert_eq!(fc.features[0].bbox, fc.bbox);
    }

    #[test]
    fn test_lon_lat_source_is_unchanged() {
        let fc = to_feature_collection(&parcel_features(), AxisOrder::LonLat, &Map::new());
        let positions = fc.features[0].geometry.as_ref().unwrap().positions();
        assert_eq!(positions[0], [40.1, -3.7]);
    }

    #[test]
    fn test_every_ring_is_closed() {
        let rings = vec![
            test_utils::square_ring(40.0, -3.0, 0.001),
            test_utils::square_ring(28.4, -16.3, 0.002),
        ];
        let doc = test_utils::gml_parcel_collection("urn:ogc:def:crs:EPSG::4326", &rings);
        let features: Vec<_> = parse_geometry(doc.as_bytes()).map(Result::unwrap).collect();
        let fc = to_feature_collection(&features, AxisOrder::LatLon, &Map::new());
        assert_eq!(fc.features.len(), 2);
        for feature in &fc.features {
            for ring in feature.geometry.as_ref().unwrap().rings() {
                assert_eq!(ring.first(), ring.last());
            }
        }
    }

    #[test]
    fn test_attributes_override_properties() {
        let mut attrs = Map::new();
        attrs.insert("label".into(), Value::from("override"));
        attrs.insert("refcat".into(), Value::from("1146801VK4714E"));
        let fc = to_feature_collection(&parcel_features(), AxisOrder::LatLon, &attrs);
        let props = &fc.features[0].properties;
        assert_eq!(props["label"], "override");
        assert_eq!(props["refcat"], "1146801VK4714E");
        assert_eq!(props["areaValue"], "1023");
        assert_eq!(fc.features[0].id.as_deref(), Some("1146801VK4714E"));
    }

    #[test]
    fn test_precision_rounding() {
        let node = GeometryNode::Point([-3.123456789, 40.987654321]);
        let projector = GeoJsonProjector::new(AxisOrder::LonLat).with_precision(3);
        assert_eq!(
            projector.geometry(&node),
            Geometry::Point {
                coordinates: [-3.123, 40.988]
            }
        );
    }

    #[test]
    fn test_serialized_shape() {
        let fc = to_feature_collection(&parcel_features(), AxisOrder::LatLon, &Map::new());
        let json = serde_json::to_value(&fc).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["type"], "Feature");
        assert_eq!(json["features"][0]["geometry"]["type"], "Polygon");
    }
}
