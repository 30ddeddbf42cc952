//! Generators for synthetic GML documents.
//!
//! These produce small, predictable documents so parser tests can vary one
//! thing (axis order, dimension, wrapper element) at a time.

/// Closed square ring centred on `(a, b)` in the document's own axis order.
///
/// # Example
///
/// ```
/// use test_utils::square_ring;
///
/// let ring = square_ring(40.0, -3.0, 0.5);
/// assert_eq!(ring.len(), 5);
/// assert_eq!(ring[0], ring[4]);
/// ```
pub fn square_ring(a: f64, b: f64, half: f64) -> Vec<[f64; 2]> {
    vec![
        [a - half, b - half],
        [a + half, b - half],
        [a + half, b + half],
        [a - half, b + half],
        [a - half, b - half],
    ]
}

/// Format coordinates as a `gml:posList` body.
pub fn pos_list(coords: &[[f64; 2]]) -> String {
    coords
        .iter()
        .map(|[a, b]| format!("{} {}", a, b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// WFS 2.0 collection with one `cp:CadastralParcel` per ring.
///
/// Each parcel gets `gml:id` `parcel.N` and a simple `gml:Polygon` with the
/// given `srsName`.
pub fn gml_parcel_collection(srs_name: &str, rings: &[Vec<[f64; 2]>]) -> String {
    let mut members = String::new();
    for (i, ring) in rings.iter().enumerate() {
        members.push_str(&format!(
            r#"  <wfs:member>
    <cp:CadastralParcel gml:id="parcel.{i}">
      <cp:label>{i:02}</cp:label>
      <cp:geometry>
        <gml:Polygon srsName="{srs}">
          <gml:exterior><gml:LinearRing><gml:posList>{coords}</gml:posList></gml:LinearRing></gml:exterior>
        </gml:Polygon>
      </cp:geometry>
    </cp:CadastralParcel>
  </wfs:member>
"#,
            i = i,
            srs = srs_name,
            coords = pos_list(ring)
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs/2.0" xmlns:gml="http://www.opengis.net/gml/3.2" xmlns:cp="http://inspire.ec.europa.eu/schemas/cp/4.0">
{}</wfs:FeatureCollection>
"#,
        members
    )
}
