//! INSPIRE WFS protocol support for the Catastro cadastral-parcel service.
//!
//! This crate provides:
//! - KVP request builders for `GetCapabilities`, `DescribeFeatureType` and
//!   the `GetParcel` stored query
//! - capabilities and OWS exception report parsing
//! - breadth-first resolution of XSD include/import graphs
//! - a streaming GML geometry parser and a GeoJSON projector
//!
//! # Example
//!
//! ```rust
//! use catastro_common::AxisOrder;
//! use inspire_protocol::{parse_geometry, to_feature_collection};
//!
//! let gml = r#"<gml:Point xmlns:gml="http://www.opengis.net/gml/3.2">
//!     <gml:pos>40.1 -3.7</gml:pos></gml:Point>"#;
//! let features = parse_geometry(gml.as_bytes())
//!     .collect::<Result<Vec<_>, _>>()
//!     .unwrap();
//! let fc = to_feature_collection(&features, AxisOrder::LatLon, &Default::default());
//! assert_eq!(fc.features.len(), 1);
//! ```

pub mod capabilities;
pub mod exceptions;
pub mod geojson;
pub mod gml;
pub mod requests;
pub mod schema;
mod xml;
pub mod xsd;

// Re-export commonly used types
pub use capabilities::{parse_feature_types, CapabilitiesError, FeatureTypeInfo};
pub use exceptions::{is_exception_report, parse_exception_report, WfsException};
pub use geojson::{
    to_feature_collection, Feature, FeatureCollection, FeatureRecord, GeoJsonProjector, Geometry,
};
pub use gml::{parse_geometry, CoordinateStats, GeometryNode, GmlError, GmlFeature, LinearRing, Polygon};
pub use schema::{resolve, FetchError, ResolvedSchema, SchemaError, SchemaFetcher};
pub use xml::{local_part, preview};
pub use xsd::{parse_schema_document, SchemaDocument, XsdError};
