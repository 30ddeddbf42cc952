//! GML feature and geometry parsing.
//!
//! Walks a WFS response by local tag name and yields one [`GmlFeature`] per
//! member (`wfs:member`, `gml:featureMember`, `gml:featureMembers`). A
//! document whose root is not a feature collection is treated as a single
//! feature. Coordinates keep the axis order the document was written in; the
//! GeoJSON projector decides whether to swap.
//!
//! Supported geometry vocabulary (GML 2 and 3.2):
//! - `Point` with `pos` / `coordinates`
//! - `LinearRing`, and `Ring` built from `curveMember/Curve/segments`
//!   (`LineStringSegment` coordinates are concatenated, the repeated junction
//!   point dropped)
//! - `Polygon` / `PolygonPatch` with `exterior`/`interior` or
//!   `outerBoundaryIs`/`innerBoundaryIs`
//! - `MultiSurface`, `MultiPolygon`, `CompositeSurface`, `Surface`

use catastro_common::CatastroError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::xml::{attr, local_name};

/// A coordinate pair in document axis order.
pub type Coord = [f64; 2];

#[derive(Debug, Error)]
pub enum GmlError {
    #[error("malformed geometry: {0}")]
    MalformedGeometry(String),

    #[error("XML error at byte {position}: {message}")]
    Xml { position: usize, message: String },
}

impl From<GmlError> for CatastroError {
    fn from(err: GmlError) -> Self {
        CatastroError::MalformedGeometry(match err {
            GmlError::MalformedGeometry(msg) => msg,
            other => other.to_string(),
        })
    }
}

fn malformed(msg: impl Into<String>) -> GmlError {
    GmlError::MalformedGeometry(msg.into())
}

/// A closed ring of at least four positions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LinearRing(Vec<Coord>);

impl LinearRing {
    pub fn new(coords: Vec<Coord>) -> Result<Self, GmlError> {
        if coords.len() < 4 {
            return Err(malformed(format!(
                "ring has {} positions, at least 4 required",
                coords.len()
            )));
        }
        if coords.first() != coords.last() {
            return Err(malformed("ring is not closed"));
        }
        Ok(Self(coords))
    }

    pub fn coords(&self) -> &[Coord] {
        &self.0
    }

    /// Apply `f` to every position. Closure is preserved for any `f`.
    pub fn map(&self, f: &impl Fn(Coord) -> Coord) -> LinearRing {
        LinearRing(self.0.iter().map(|c| f(*c)).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polygon {
    pub exterior: LinearRing,
    pub interiors: Vec<LinearRing>,
}

impl Polygon {
    pub fn rings(&self) -> impl Iterator<Item = &LinearRing> {
        std::iter::once(&self.exterior).chain(self.interiors.iter())
    }

    fn map(&self, f: &impl Fn(Coord) -> Coord) -> Polygon {
        Polygon {
            exterior: self.exterior.map(f),
            interiors: self.interiors.iter().map(|r| r.map(f)).collect(),
        }
    }
}

/// Intermediate geometry model, axis order as found in the source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum GeometryNode {
    Point(Coord),
    LinearRing(LinearRing),
    Polygon(Polygon),
    MultiSurface(Vec<Polygon>),
}

impl GeometryNode {
    pub fn kind(&self) -> &'static str {
        match self {
            GeometryNode::Point(_) => "Point",
            GeometryNode::LinearRing(_) => "LinearRing",
            GeometryNode::Polygon(_) => "Polygon",
            GeometryNode::MultiSurface(_) => "MultiSurface",
        }
    }

    pub fn is_areal(&self) -> bool {
        matches!(self, GeometryNode::Polygon(_) | GeometryNode::MultiSurface(_))
    }

    pub fn map_coords(&self, f: impl Fn(Coord) -> Coord) -> GeometryNode {
        match self {
            GeometryNode::Point(c) => GeometryNode::Point(f(*c)),
            GeometryNode::LinearRing(r) => GeometryNode::LinearRing(r.map(&f)),
            GeometryNode::Polygon(p) => GeometryNode::Polygon(p.map(&f)),
            GeometryNode::MultiSurface(ps) => {
                GeometryNode::MultiSurface(ps.iter().map(|p| p.map(&f)).collect())
            }
        }
    }

    /// Every pair swapped: `(a, b)` → `(b, a)`.
    pub fn swap_axes(&self) -> GeometryNode {
        self.map_coords(|[a, b]| [b, a])
    }

    /// All positions, ring by ring.
    pub fn coords(&self) -> Vec<Coord> {
        match self {
            GeometryNode::Point(c) => vec![*c],
            GeometryNode::LinearRing(r) => r.coords().to_vec(),
            GeometryNode::Polygon(p) => p.rings().flat_map(|r| r.coords().iter().copied()).collect(),
            GeometryNode::MultiSurface(ps) => ps
                .iter()
                .flat_map(|p| p.rings())
                .flat_map(|r| r.coords().iter().copied())
                .collect(),
        }
    }

    /// The first ring of the geometry (exterior of the first polygon).
    pub fn first_ring(&self) -> Option<&LinearRing> {
        match self {
            GeometryNode::Point(_) => None,
            GeometryNode::LinearRing(r) => Some(r),
            GeometryNode::Polygon(p) => Some(&p.exterior),
            GeometryNode::MultiSurface(ps) => ps.first().map(|p| &p.exterior),
        }
    }
}

/// One parsed feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GmlFeature {
    /// `localId` text, else `gml:id`.
    pub id: Option<String>,
    /// Local name of the feature element.
    pub feature_type: String,
    /// First `srsName` inside the feature, else the document-level one.
    pub srs_name: Option<String>,
    /// First areal geometry, else the first geometry found.
    pub geometry: Option<GeometryNode>,
    /// Leaf element text outside geometry, first occurrence wins.
    pub properties: BTreeMap<String, String>,
}

/// Summary of a coordinate sequence, in document axis order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinateStats {
    pub count: usize,
    pub min_a: f64,
    pub max_a: f64,
    pub min_b: f64,
    pub max_b: f64,
    pub range_a: f64,
    pub range_b: f64,
    pub first_5: Vec<Coord>,
}

impl CoordinateStats {
    pub fn from_coords(coords: &[Coord]) -> Option<Self> {
        let first = coords.first()?;
        let (mut min_a, mut max_a, mut min_b, mut max_b) = (first[0], first[0], first[1], first[1]);
        for [a, b] in coords {
            min_a = min_a.min(*a);
            max_a = max_a.max(*a);
            min_b = min_b.min(*b);
            max_b = max_b.max(*b);
        }
        Some(Self {
            count: coords.len(),
            min_a,
            max_a,
            min_b,
            max_b,
            range_a: max_a - min_a,
            range_b: max_b - min_b,
            first_5: coords.iter().take(5).copied().collect(),
        })
    }
}

/// Lazily parse the features of a GML document.
///
/// Each call re-parses from the start. The iterator is fused after the first
/// error.
pub fn parse_geometry(bytes: &[u8]) -> GmlFeatures<'_> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);
    reader.expand_empty_elements(true);
    GmlFeatures {
        reader,
        depth: 0,
        member_depth: None,
        seen_root: false,
        doc_srs: None,
        done: false,
    }
}

/// Iterator returned by [`parse_geometry`].
pub struct GmlFeatures<'a> {
    reader: Reader<&'a [u8]>,
    depth: usize,
    /// Depth of the open member wrapper; its element children are features.
    member_depth: Option<usize>,
    seen_root: bool,
    doc_srs: Option<String>,
    done: bool,
}

impl<'a> GmlFeatures<'a> {
    fn xml_error(&self, err: impl std::fmt::Display) -> GmlError {
        GmlError::Xml {
            position: self.reader.buffer_position(),
            message: err.to_string(),
        }
    }

    fn next_feature(&mut self) -> Result<Option<GmlFeature>, GmlError> {
        loop {
            let event = self.reader.read_event().map_err(|e| self.xml_error(e))?;
            match event {
                Event::Start(e) => {
                    self.depth += 1;
                    let name = local_name(&e);

                    if !self.seen_root {
                        self.seen_root = true;
                        self.doc_srs = attr(&e, "srsName").map_err(|e| self.xml_error(e))?;
                        if !name.ends_with("FeatureCollection") {
                            // No collection: the root is the only feature.
                            self.done = true;
                            return self.parse_feature(e, true);
                        }
                        continue;
                    }

                    if matches!(name.as_str(), "member" | "featureMember" | "featureMembers") {
                        self.member_depth = Some(self.depth);
                        continue;
                    }

                    if self.member_depth.map(|d| d + 1) == Some(self.depth) {
                        return self.parse_feature(e, false);
                    }

                    if self.doc_srs.is_none() {
                        self.doc_srs = attr(&e, "srsName").map_err(|e| self.xml_error(e))?;
                    }
                }
                Event::End(_) => {
                    if self.member_depth == Some(self.depth) {
                        self.member_depth = None;
                    }
                    self.depth = self.depth.saturating_sub(1);
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }

    /// Consume events up to the end tag of `start`.
    fn parse_feature(
        &mut self,
        start: BytesStart<'a>,
        implicit: bool,
    ) -> Result<Option<GmlFeature>, GmlError> {
        let feature_type = local_name(&start);
        let gml_id = attr(&start, "id").map_err(|e| self.xml_error(e))?;

        let mut builder = FeatureBuilder::default();
        let mut depth = 1;
        builder.start(&start, depth).map_err(|e| self.promote(e))?;

        while depth > 0 {
            let event = self.reader.read_event().map_err(|e| self.xml_error(e))?;
            match event {
                Event::Start(e) => {
                    depth += 1;
                    builder.start(&e, depth).map_err(|e| self.promote(e))?;
                }
                Event::Text(t) => {
                    let text = t.unescape().map_err(|e| self.xml_error(e))?;
                    builder.text(&text);
                }
                Event::CData(t) => {
                    let text = std::str::from_utf8(&t).map_err(|e| self.xml_error(e))?;
                    builder.text(text);
                }
                Event::End(_) => {
                    builder.end(depth)?;
                    depth -= 1;
                }
                Event::Eof => return Err(malformed("document ended inside a feature")),
                _ => {}
            }
        }
        // The feature's end tag closed one level of the document.
        self.depth = self.depth.saturating_sub(1);

        Ok(builder.finish(feature_type, gml_id, self.doc_srs.clone(), implicit))
    }

    fn promote(&self, err: BuilderError) -> GmlError {
        match err {
            BuilderError::Gml(e) => e,
            BuilderError::Xml(e) => self.xml_error(e),
        }
    }
}

impl<'a> Iterator for GmlFeatures<'a> {
    type Item = Result<GmlFeature, GmlError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_feature() {
            Ok(Some(feature)) => Some(Ok(feature)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<'a> std::iter::FusedIterator for GmlFeatures<'a> {}

// ---------------------------------------------------------------------------
// Feature builder
// ---------------------------------------------------------------------------

enum BuilderError {
    Gml(GmlError),
    Xml(quick_xml::Error),
}

impl From<GmlError> for BuilderError {
    fn from(e: GmlError) -> Self {
        BuilderError::Gml(e)
    }
}

impl From<quick_xml::Error> for BuilderError {
    fn from(e: quick_xml::Error) -> Self {
        BuilderError::Xml(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Exterior,
    Interior,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoordSyntax {
    /// `posList` / `pos`: whitespace-separated ordinates.
    Ordinates,
    /// GML 2 `coordinates`: `x,y x,y`.
    Tuples,
}

enum GeomFrame {
    Point(Option<Coord>),
    Ring(Vec<Coord>),
    Polygon {
        exterior: Option<LinearRing>,
        interiors: Vec<LinearRing>,
    },
    Multi(Vec<Polygon>),
    /// Geometry we do not model (curves, envelopes); its coordinates are dropped.
    Ignored,
}

#[derive(Default)]
struct FeatureBuilder {
    srs_name: Option<String>,
    frames: Vec<(usize, GeomFrame)>,
    boundaries: Vec<(usize, Boundary)>,
    dims: Vec<(usize, usize)>,
    coord_elem: Option<(usize, CoordSyntax, usize)>,
    coord_text: String,
    leaf: Option<(usize, String)>,
    leaf_text: String,
    geometries: Vec<GeometryNode>,
    properties: BTreeMap<String, String>,
}

impl FeatureBuilder {
    fn current_dim(&self) -> usize {
        self.dims.last().map(|(_, d)| *d).unwrap_or(2)
    }

    fn in_ignored(&self) -> bool {
        self.frames
            .iter()
            .any(|(_, f)| matches!(f, GeomFrame::Ignored))
    }

    fn in_ring(&self) -> bool {
        self.frames
            .iter()
            .any(|(_, f)| matches!(f, GeomFrame::Ring(_)))
    }

    fn start(&mut self, e: &BytesStart<'_>, depth: usize) -> Result<(), BuilderError> {
        let name = local_name(e);

        if self.srs_name.is_none() {
            self.srs_name = attr(e, "srsName")?.filter(|s| !s.is_empty());
        }
        if let Some(raw) = attr(e, "srsDimension")? {
            let dim: usize = raw
                .parse()
                .map_err(|_| malformed(format!("srsDimension '{}' is not an integer", raw)))?;
            if dim < 2 {
                return Err(malformed(format!("unsupported srsDimension {}", dim)).into());
            }
            self.dims.push((depth, dim));
        }

        // A child start means the parent is not a leaf.
        self.leaf = None;

        let frame = match name.as_str() {
            // Nothing below an unmodelled geometry is collected.
            _ if self.in_ignored() => None,
            "Point" => Some(GeomFrame::Point(None)),
            "LinearRing" | "Ring" => Some(GeomFrame::Ring(Vec::new())),
            "Polygon" | "PolygonPatch" => Some(GeomFrame::Polygon {
                exterior: None,
                interiors: Vec::new(),
            }),
            "MultiSurface" | "MultiPolygon" | "CompositeSurface" | "Surface" => {
                Some(GeomFrame::Multi(Vec::new()))
            }
            "LineString" | "Curve" | "MultiCurve" | "Envelope" | "MultiPoint" if !self.in_ring() => {
                Some(GeomFrame::Ignored)
            }
            "exterior" | "outerBoundaryIs" => {
                self.boundaries.push((depth, Boundary::Exterior));
                None
            }
            "interior" | "innerBoundaryIs" => {
                self.boundaries.push((depth, Boundary::Interior));
                None
            }
            "posList" | "pos" | "coordinates" if !self.frames.is_empty() => {
                let syntax = if name == "coordinates" {
                    CoordSyntax::Tuples
                } else {
                    CoordSyntax::Ordinates
                };
                self.coord_elem = Some((depth, syntax, self.current_dim()));
                self.coord_text.clear();
                None
            }
            _ => {
                if self.frames.is_empty() {
                    self.leaf = Some((depth, name));
                    self.leaf_text.clear();
                }
                None
            }
        };

        if let Some(frame) = frame {
            self.frames.push((depth, frame));
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if self.coord_elem.is_some() {
            self.coord_text.push(' ');
            self.coord_text.push_str(text);
        } else if self.leaf.is_some() {
            self.leaf_text.push_str(text);
        }
    }

    fn end(&mut self, depth: usize) -> Result<(), GmlError> {
        if let Some((d, syntax, dim)) = self.coord_elem {
            if d == depth {
                self.coord_elem = None;
                let coords = parse_coords(&self.coord_text, syntax, dim)?;
                self.deliver(coords);
            }
        }

        if matches!(&self.leaf, Some((d, _)) if *d == depth) {
            if let Some((_, name)) = self.leaf.take() {
                let value = self.leaf_text.trim();
                if depth > 1 && !value.is_empty() {
                    self.properties
                        .entry(name)
                        .or_insert_with(|| value.to_string());
                }
            }
        }

        if matches!(self.frames.last(), Some((d, _)) if *d == depth) {
            if let Some((_, frame)) = self.frames.pop() {
                self.close(frame)?;
            }
        }

        if matches!(self.boundaries.last(), Some((d, _)) if *d == depth) {
            self.boundaries.pop();
        }
        if matches!(self.dims.last(), Some((d, _)) if *d == depth) {
            self.dims.pop();
        }
        Ok(())
    }

    fn deliver(&mut self, coords: Vec<Coord>) {
        match self.frames.last_mut() {
            Some((_, GeomFrame::Point(slot))) => {
                if slot.is_none() {
                    *slot = coords.first().copied();
                }
            }
            Some((_, GeomFrame::Ring(ring))) => {
                let mut iter = coords.into_iter().peekable();
                if let (Some(last), Some(first)) = (ring.last(), iter.peek()) {
                    if last == first {
                        iter.next();
                    }
                }
                ring.extend(iter);
            }
            _ => {}
        }
    }

    /// Boundary of the ring being closed, if it belongs to the polygon at
    /// `polygon_depth`.
    fn boundary_within(&self, polygon_depth: usize) -> Option<Boundary> {
        self.boundaries
            .last()
            .filter(|(d, _)| *d > polygon_depth)
            .map(|(_, b)| *b)
    }

    fn close(&mut self, frame: GeomFrame) -> Result<(), GmlError> {
        match frame {
            GeomFrame::Point(coord) => {
                let coord = coord.ok_or_else(|| malformed("Point has no position"))?;
                self.geometries.push(GeometryNode::Point(coord));
            }
            GeomFrame::Ring(coords) => {
                let ring = LinearRing::new(coords)?;
                let boundary = match self.frames.last() {
                    Some((d, GeomFrame::Polygon { .. })) => Some(self.boundary_within(*d)),
                    _ => None,
                };
                match (boundary, self.frames.last_mut()) {
                    (Some(b), Some((_, GeomFrame::Polygon { exterior, interiors }))) => {
                        if b == Some(Boundary::Interior) || exterior.is_some() {
                            interiors.push(ring);
                        } else {
                            *exterior = Some(ring);
                        }
                    }
                    _ => self.geometries.push(GeometryNode::LinearRing(ring)),
                }
            }
            GeomFrame::Polygon {
                exterior,
                interiors,
            } => {
                let exterior = exterior.ok_or_else(|| malformed("Polygon has no exterior ring"))?;
                let polygon = Polygon {
                    exterior,
                    interiors,
                };
                match self.frames.last_mut() {
                    Some((_, GeomFrame::Multi(polygons))) => polygons.push(polygon),
                    _ => self.geometries.push(GeometryNode::Polygon(polygon)),
                }
            }
            GeomFrame::Multi(polygons) => match self.frames.last_mut() {
                Some((_, GeomFrame::Multi(parent))) => parent.extend(polygons),
                _ if !polygons.is_empty() => {
                    self.geometries.push(GeometryNode::MultiSurface(polygons))
                }
                _ => {}
            },
            GeomFrame::Ignored => {}
        }
        Ok(())
    }

    fn finish(
        mut self,
        feature_type: String,
        gml_id: Option<String>,
        doc_srs: Option<String>,
        implicit: bool,
    ) -> Option<GmlFeature> {
        let primary = self
            .geometries
            .iter()
            .position(GeometryNode::is_areal)
            .or_else(|| (!self.geometries.is_empty()).then_some(0));
        let geometry = primary.map(|i| self.geometries.swap_remove(i));

        if implicit && geometry.is_none() {
            return None;
        }

        let id = self.properties.get("localId").cloned().or(gml_id);
        Some(GmlFeature {
            id,
            feature_type,
            srs_name: self.srs_name.or(doc_srs),
            geometry,
            properties: self.properties,
        })
    }
}

fn parse_number(token: &str) -> Result<f64, GmlError> {
    token
        .parse::<f64>()
        .map_err(|_| malformed(format!("'{}' is not a number", token)))
}

fn parse_coords(text: &str, syntax: CoordSyntax, dim: usize) -> Result<Vec<Coord>, GmlError> {
    match syntax {
        CoordSyntax::Ordinates => {
            let values = text
                .split_whitespace()
                .map(parse_number)
                .collect::<Result<Vec<_>, _>>()?;
            if values.len() % dim != 0 {
                return Err(malformed(format!(
                    "{} ordinates is not a multiple of dimension {}",
                    values.len(),
                    dim
                )));
            }
            Ok(values.chunks(dim).map(|c| [c[0], c[1]]).collect())
        }
        CoordSyntax::Tuples => text
            .split_whitespace()
            .map(|tuple| {
                let values = tuple
                    .split(',')
                    .map(parse_number)
                    .collect::<Result<Vec<_>, _>>()?;
                if values.len() < 2 {
                    return Err(malformed(format!("coordinate tuple '{}' has one ordinate", tuple)));
                }
                Ok([values[0], values[1]])
            })
            .collect(),
    }
}
