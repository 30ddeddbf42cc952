//! WFS GetCapabilities parsing.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use thiserror::Error;

use crate::xml::local_name;

#[derive(Debug, Error)]
pub enum CapabilitiesError {
    #[error("XML error at byte {position}: {message}")]
    Xml { position: usize, message: String },
}

/// One advertised feature type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeatureTypeInfo {
    pub name: String,
    pub title: Option<String>,
    pub default_crs: Option<String>,
    pub other_crs: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Title,
    DefaultCrs,
    OtherCrs,
}

/// List the feature types of a capabilities document.
///
/// Accepts WFS 2.0 (`DefaultCRS`/`OtherCRS`) and 1.1 (`DefaultSRS`/`OtherSRS`)
/// spellings. Feature types without a name are skipped.
pub fn parse_feature_types(xml: &str) -> Result<Vec<FeatureTypeInfo>, CapabilitiesError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut feature_types = Vec::new();
    let mut current: Option<FeatureTypeInfo> = None;
    let mut field: Option<Field> = None;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| CapabilitiesError::Xml {
            position: reader.buffer_position(),
            message: e.to_string(),
        })?;

        match event {
            Event::Start(e) => {
                let name = local_name(&e);
                if name == "FeatureType" {
                    current = Some(FeatureTypeInfo::default());
                } else if current.is_some() {
                    field = match name.as_str() {
                        "Name" => Some(Field::Name),
                        "Title" => Some(Field::Title),
                        "DefaultCRS" | "DefaultSRS" => Some(Field::DefaultCrs),
                        "OtherCRS" | "OtherSRS" => Some(Field::OtherCrs),
                        _ => None,
                    };
                }
            }
            Event::Text(t) => {
                if let (Some(ft), Some(f)) = (current.as_mut(), field) {
                    let text = t
                        .unescape()
                        .map_err(|e| CapabilitiesError::Xml {
                            position: reader.buffer_position(),
                            message: e.to_string(),
                        })?
                        .trim()
                        .to_string();
                    if !text.is_empty() {
                        match f {
                            Field::Name => ft.name = text,
                            Field::Title if ft.title.is_none() => ft.title = Some(text),
                            Field::DefaultCrs => ft.default_crs = Some(text),
                            Field::OtherCrs => ft.other_crs.push(text),
                            Field::Title => {}
                        }
                    }
                }
            }
            Event::End(e) => {
                field = None;
                if e.local_name().as_ref() == b"FeatureType" {
                    if let Some(ft) = current.take() {
                        if !ft.name.is_empty() {
                            feature_types.push(ft);
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(feature_types)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixtures::capabilities;

    #[test]
    fn test_parse_feature_types() {
        let types = parse_feature_types(capabilities::WFS_CP).unwrap();
        assert_eq!(types.len(), 2);

        let parcel = &types[0];
        assert_eq!(parcel.name, "CP:CadastralParcel");
        assert_eq!(parcel.title.as_deref(), Some("Parcela Catastral"));
        assert_eq!(parcel.default_crs.as_deref(), Some("urn:ogc:def:crs:EPSG::25830"));
        assert_eq!(
            parcel.other_crs,
            vec!["urn:ogc:def:crs:EPSG::4326", "urn:ogc:def:crs:EPSG::32628"]
        );

        assert!(types[1].other_crs.is_empty());
    }

    #[test]
    fn test_service_title_is_not_a_feature_type() {
        let types = parse_feature_types(capabilities::WFS_CP).unwrap();
        assert!(types
            .iter()
            .all(|t| t.title.as_deref() != Some("Servicio de descarga de Parcelas Catastrales")));
    }

    #[test]
    fn test_wfs_1_1_spelling() {
        let xml = r#"<WFS_Capabilities><FeatureTypeList><FeatureType>
            <Name>cp:CadastralParcel</Name><DefaultSRS>EPSG:25830</DefaultSRS>
            <OtherSRS>EPSG:4326</OtherSRS></FeatureType></FeatureTypeList></WFS_Capabilities>"#;
        let types = parse_feature_types(xml).unwrap();
        assert_eq!(types[0].default_crs.as_deref(), Some("EPSG:25830"));
        assert_eq!(types[0].other_crs, vec!["EPSG:4326"]);
    }
}
