//! Small helpers over quick-xml shared by the document parsers.

use quick_xml::events::BytesStart;

/// Local (prefix-free) tag name of a start element.
pub(crate) fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Value of the attribute whose local name is `name`, prefix ignored.
pub(crate) fn attr(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, quick_xml::Error> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.trim().to_string()));
        }
    }
    Ok(None)
}

/// Strip a namespace prefix: `cp:CadastralParcelType` → `CadastralParcelType`.
pub fn local_part(qname: &str) -> &str {
    qname.rsplit(':').next().unwrap_or(qname)
}

/// Truncate to at most `max` characters on a char boundary.
pub fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_part() {
        assert_eq!(local_part("cp:CadastralParcelType"), "CadastralParcelType");
        assert_eq!(local_part("CadastralParcel"), "CadastralParcel");
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("coruña", 5), "coruñ");
        assert_eq!(preview("abc", 10), "abc");
    }
}
