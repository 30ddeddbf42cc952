//! OWS exception reports returned by the WFS instead of the requested document.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use std::fmt;

use crate::xml::{attr, local_name};

/// First exception of an `ows:ExceptionReport`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WfsException {
    pub code: Option<String>,
    pub locator: Option<String>,
    pub texts: Vec<String>,
}

impl fmt::Display for WfsException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code.as_deref().unwrap_or("Exception"))?;
        if let Some(locator) = &self.locator {
            write!(f, " ({})", locator)?;
        }
        if !self.texts.is_empty() {
            write!(f, ": {}", self.texts.join("; "))?;
        }
        Ok(())
    }
}

fn root_name(text: &str) -> Option<String> {
    let mut reader = Reader::from_str(text);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => return Some(local_name(&e)),
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

/// Whether the document root is an OWS exception report.
pub fn is_exception_report(text: &str) -> bool {
    matches!(
        root_name(text).as_deref(),
        Some("ExceptionReport") | Some("ServiceExceptionReport")
    )
}

/// Extract the first exception of a report; `None` when the document is not
/// an exception report.
pub fn parse_exception_report(text: &str) -> Option<WfsException> {
    if !is_exception_report(text) {
        return None;
    }

    let mut reader = Reader::from_str(text);
    reader.trim_text(true);
    reader.expand_empty_elements(true);

    let mut buf = Vec::new();
    let mut exception: Option<WfsException> = None;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match local_name(&e).as_str() {
                "Exception" | "ServiceException" if exception.is_none() => {
                    exception = Some(WfsException {
                        code: attr(&e, "exceptionCode")
                            .ok()
                            .flatten()
                            .or_else(|| attr(&e, "code").ok().flatten()),
                        locator: attr(&e, "locator").ok().flatten(),
                        texts: Vec::new(),
                    });
                    // WMS-style reports carry the text directly.
                    in_text = true;
                }
                "ExceptionText" => in_text = true,
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                if let (Some(ex), Ok(text)) = (exception.as_mut(), t.unescape()) {
                    let text = text.trim();
                    if !text.is_empty() {
                        ex.texts.push(text.to_string());
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match name.as_str() {
                    "ExceptionText" => in_text = false,
                    "Exception" | "ServiceException" if exception.is_some() => break,
                    _ => {}
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    Some(exception.unwrap_or(WfsException {
        code: None,
        locator: None,
        texts: Vec::new(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixtures::{capabilities, gml};

    #[test]
    fn test_detects_exception_report() {
        assert!(is_exception_report(gml::EXCEPTION_REPORT));
        assert!(!is_exception_report(capabilities::WFS_CP));
        assert!(!is_exception_report("not xml at all"));
    }

    #[test]
    fn test_parse_exception_report() {
        let ex = parse_exception_report(gml::EXCEPTION_REPORT).unwrap();
        assert_eq!(ex.code.as_deref(), Some("InvalidParameterValue"));
        assert_eq!(ex.locator.as_deref(), Some("srsName"));
        assert_eq!(ex.texts.len(), 1);
        assert!(ex.to_string().starts_with("InvalidParameterValue (srsName): El sistema"));
    }

    #[test]
    fn test_not_a_report() {
        assert!(parse_exception_report(gml::PARCEL_4326).is_none());
    }
}
