//! Single-document XML Schema reader.
//!
//! Extracts what the schema graph resolver needs from one `xs:schema`
//! document: `xs:include`/`xs:import` locations, global element
//! declarations, complex types with their base type and direct child
//! element declarations, plus the flat name sets reported to callers.
//! Names are kept as written (possibly prefixed); matching happens later by
//! local part.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::exceptions::parse_exception_report;
use crate::xml::{attr, local_name, local_part};

/// Errors reading a schema document.
#[derive(Debug, Error)]
pub enum XsdError {
    #[error("XML error at byte {position}: {message}")]
    Xml { position: usize, message: String },

    #[error("document root is <{0}>, not <schema>")]
    NotASchema(String),

    #[error("server returned an exception report: {0}")]
    ExceptionReport(String),

    #[error("document is empty")]
    Empty,
}

/// Kind of cross-document reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Include,
    Import,
}

/// An `xs:include` or `xs:import` with a `schemaLocation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaReference {
    pub kind: ReferenceKind,
    pub location: String,
}

/// A global `xs:element` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalElement {
    pub name: String,
    pub type_name: Option<String>,
}

/// A child element declaration inside a complex type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: String,
    pub type_name: Option<String>,
    /// Set for `ref=` declarations; the type comes from the referenced
    /// global element.
    pub reference: Option<String>,
}

/// A complex type definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexTypeDef {
    pub name: String,
    /// Base of `xs:extension` / `xs:restriction`, if any.
    pub base: Option<String>,
    pub fields: Vec<FieldDecl>,
    /// Inline type of a global element, named after that element.
    pub anonymous: bool,
}

/// Everything extracted from one schema document.
#[derive(Debug, Clone, Default)]
pub struct SchemaDocument {
    pub target_namespace: Option<String>,
    pub references: Vec<SchemaReference>,
    pub elements: Vec<GlobalElement>,
    pub complex_types: Vec<ComplexTypeDef>,
    pub element_names: BTreeSet<String>,
    pub complex_type_names: BTreeSet<String>,
    pub attribute_names: BTreeSet<String>,
}

impl SchemaDocument {
    /// Global element by local name.
    pub fn element(&self, local: &str) -> Option<&GlobalElement> {
        self.elements.iter().find(|e| local_part(&e.name) == local)
    }

    /// Complex type by local name.
    pub fn complex_type(&self, local: &str) -> Option<&ComplexTypeDef> {
        self.complex_types.iter().find(|t| local_part(&t.name) == local)
    }
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    Schema,
    TopElement(usize),
    ComplexType(usize),
    /// Field element, attribute, simple type or nested anonymous type: its
    /// descendants do not contribute fields to the enclosing type.
    Barrier,
    Other,
}

fn owner(stack: &[Frame]) -> Option<Frame> {
    stack.iter().rev().find(|f| !matches!(f, Frame::Other)).copied()
}

/// Parse one schema document.
pub fn parse_schema_document(text: &str) -> Result<SchemaDocument, XsdError> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);
    reader.expand_empty_elements(true);

    let mut doc = SchemaDocument::default();
    let mut stack: Vec<Frame> = Vec::new();
    let mut buf = Vec::new();
    let mut seen_root = false;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| XsdError::Xml {
            position: reader.buffer_position(),
            message: e.to_string(),
        })?;

        match event {
            Event::Start(e) => {
                let name = local_name(&e);
                if !seen_root {
                    seen_root = true;
                    if name == "ExceptionReport" {
                        let summary = parse_exception_report(text)
                            .map(|ex| ex.to_string())
                            .unwrap_or_else(|| "unparseable exception report".to_string());
                        return Err(XsdError::ExceptionReport(summary));
                    }
                    if name != "schema" {
                        return Err(XsdError::NotASchema(name));
                    }
                    doc.target_namespace = read_attr(&reader, &e, "targetNamespace")?;
                    stack.push(Frame::Schema);
                } else {
                    let frame = handle_start(&reader, &name, &e, &stack, &mut doc)?;
                    stack.push(frame);
                }
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(XsdError::Empty);
    }
    Ok(doc)
}

fn read_attr(
    reader: &Reader<&[u8]>,
    e: &BytesStart<'_>,
    name: &str,
) -> Result<Option<String>, XsdError> {
    attr(e, name)
        .map(|v| v.filter(|s| !s.is_empty()))
        .map_err(|err| XsdError::Xml {
            position: reader.buffer_position(),
            message: err.to_string(),
        })
}

fn handle_start(
    reader: &Reader<&[u8]>,
    name: &str,
    e: &BytesStart<'_>,
    stack: &[Frame],
    doc: &mut SchemaDocument,
) -> Result<Frame, XsdError> {
    let frame = match name {
        "include" | "import" => {
            if let Some(location) = read_attr(reader, e, "schemaLocation")? {
                let kind = if name == "include" {
                    ReferenceKind::Include
                } else {
                    ReferenceKind::Import
                };
                doc.references.push(SchemaReference { kind, location });
            }
            Frame::Other
        }
        "element" => {
            let el_name = read_attr(reader, e, "name")?;
            let type_name = read_attr(reader, e, "type")?;
            let reference = read_attr(reader, e, "ref")?;

            if let Some(n) = &el_name {
                doc.element_names.insert(n.clone());
            }

            if matches!(stack.last(), Some(Frame::Schema)) {
                return Ok(match el_name {
                    Some(name) => {
                        doc.elements.push(GlobalElement { name, type_name });
                        Frame::TopElement(doc.elements.len() - 1)
                    }
                    None => Frame::Barrier,
                });
            }

            if let Some(Frame::ComplexType(idx)) = owner(stack) {
                let decl = match (el_name, reference) {
                    (Some(name), _) => Some(FieldDecl {
                        name,
                        type_name,
                        reference: None,
                    }),
                    (None, Some(r)) => Some(FieldDecl {
                        name: local_part(&r).to_string(),
                        type_name: None,
                        reference: Some(r),
                    }),
                    (None, None) => None,
                };
                if let Some(decl) = decl {
                    doc.complex_types[idx].fields.push(decl);
                }
            }
            Frame::Barrier
        }
        "complexType" => {
            let ct_name = read_attr(reader, e, "name")?;
            match (stack.last(), owner(stack)) {
                (Some(Frame::Schema), _) => match ct_name {
                    Some(n) => {
                        doc.complex_type_names.insert(n.clone());
                        doc.complex_types.push(ComplexTypeDef {
                            name: n,
                            base: None,
                            fields: Vec::new(),
                            anonymous: false,
                        });
                        Frame::ComplexType(doc.complex_types.len() - 1)
                    }
                    None => Frame::Barrier,
                },
                (_, Some(Frame::TopElement(el))) => {
                    let element = &mut doc.elements[el];
                    let synthetic = element.name.clone();
                    if element.type_name.is_none() {
                        element.type_name = Some(synthetic.clone());
                    }
                    doc.complex_types.push(ComplexTypeDef {
                        name: synthetic,
                        base: None,
                        fields: Vec::new(),
                        anonymous: true,
                    });
                    Frame::ComplexType(doc.complex_types.len() - 1)
                }
                _ => Frame::Barrier,
            }
        }
        "extension" | "restriction" => {
            if let Some(Frame::ComplexType(idx)) = owner(stack) {
                let ct = &mut doc.complex_types[idx];
                if ct.base.is_none() {
                    ct.base = read_attr(reader, e, "base")?;
                }
            }
            Frame::Other
        }
        "attribute" => {
            if let Some(n) = read_attr(reader, e, "name")? {
                doc.attribute_names.insert(n);
            }
            Frame::Barrier
        }
        "simpleType" => Frame::Barrier,
        _ => Frame::Other,
    };
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixtures::xsd;

    #[test]
    fn test_parse_root_document() {
        let doc = parse_schema_document(xsd::ROOT).unwrap();
        assert_eq!(
            doc.target_namespace.as_deref(),
            Some("http://inspire.ec.europa.eu/schemas/cp/4.0")
        );
        let locations: Vec<_> = doc.references.iter().map(|r| r.location.as_str()).collect();
        assert_eq!(locations, vec!["parcel-base.xsd", "missing.xsd"]);

        let parcel = doc.element("CadastralParcel").unwrap();
        assert_eq!(parcel.type_name.as_deref(), Some("cp:CadastralParcelType"));

        let ct = doc.complex_type("CadastralParcelType").unwrap();
        assert_eq!(ct.base.as_deref(), Some("cp:AbstractParcelType"));
        let names: Vec<_> = ct.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["areaValue", "geometry", "inspireId", "label"]);
        assert!(doc.attribute_names.contains("nilReason"));
    }

    #[test]
    fn test_ref_fields_and_nested_types() {
        let text = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:element name="Zone">
            <xs:complexType>
              <xs:sequence>
                <xs:element ref="gml:name"/>
                <xs:element name="level">
                  <xs:complexType>
                    <xs:sequence><xs:element name="inner" type="xs:string"/></xs:sequence>
                  </xs:complexType>
                </xs:element>
                <xs:element name="code">
                  <xs:simpleType><xs:restriction base="xs:string"/></xs:simpleType>
                </xs:element>
              </xs:sequence>
            </xs:complexType>
          </xs:element>
        </xs:schema>"#;
        let doc = parse_schema_document(text).unwrap();
        let zone = doc.element("Zone").unwrap();
        assert_eq!(zone.type_name.as_deref(), Some("Zone"));

        let ct = doc.complex_type("Zone").unwrap();
        assert!(ct.anonymous);
        assert!(ct.base.is_none());
        let names: Vec<_> = ct.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["name", "level", "code"]);
        assert_eq!(ct.fields[0].reference.as_deref(), Some("gml:name"));
        assert!(doc.element_names.contains("inner"));
        assert!(doc.complex_type_names.is_empty());
    }

    #[test]
    fn test_exception_report_is_rejected() {
        let err = parse_schema_document(test_utils::fixtures::gml::EXCEPTION_REPORT).unwrap_err();
        match err {
            XsdError::ExceptionReport(msg) => assert!(msg.contains("InvalidParameterValue")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_non_schema_root() {
        let err = parse_schema_document("<html><body/></html>").unwrap_err();
        assert!(matches!(err, XsdError::NotASchema(ref n) if n == "html"));
        assert!(matches!(parse_schema_document(""), Err(XsdError::Empty)));
    }
}
