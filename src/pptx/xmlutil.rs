//! Byte-level XML surgery helpers.
//!
//! The mutation engine owns a handful of elements inside presentation and
//! slide-master XML (identifier lists, custom shows, the section
//! extension). Everything else in those parts must survive a rewrite
//! byte-for-byte, so instead of re-serializing whole documents, the engine
//! locates the span of one managed element and splices a regenerated
//! rendition over it.

use crate::pptx::error::{PptxError, Result};
use quick_xml::Reader;
use quick_xml::events::Event;

/// Byte span of the first element with the given local name, including its
/// start and end tags. Returns None when the element does not occur.
pub(crate) fn element_span(xml: &[u8], local_name: &[u8]) -> Result<Option<(usize, usize)>> {
    let mut reader = Reader::from_reader(xml);

    let mut depth_in_target = 0usize;
    let mut start = 0usize;

    loop {
        let pos_before = reader.buffer_position() as usize;
        match reader.read_event() {
            Ok(Event::Empty(ref e)) => {
                if depth_in_target == 0 && e.local_name().as_ref() == local_name {
                    return Ok(Some((pos_before, reader.buffer_position() as usize)));
                }
            }
            Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() == local_name {
                    if depth_in_target == 0 {
                        start = pos_before;
                    }
                    depth_in_target += 1;
                }
            }
            Ok(Event::End(ref e)) => {
                if depth_in_target > 0 && e.local_name().as_ref() == local_name {
                    depth_in_target -= 1;
                    if depth_in_target == 0 {
                        return Ok(Some((start, reader.buffer_position() as usize)));
                    }
                }
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => return Err(PptxError::Xml(e.to_string())),
            _ => {}
        }
    }
}

/// Replace the first element with the given local name by `replacement`.
///
/// Returns None when the element does not occur; the caller decides whether
/// that is an error.
pub(crate) fn replace_element(
    xml: &[u8],
    local_name: &[u8],
    replacement: &str,
) -> Result<Option<Vec<u8>>> {
    let Some((start, end)) = element_span(xml, local_name)? else {
        return Ok(None);
    };

    let mut out = Vec::with_capacity(xml.len() - (end - start) + replacement.len());
    out.extend_from_slice(&xml[..start]);
    out.extend_from_slice(replacement.as_bytes());
    out.extend_from_slice(&xml[end..]);
    Ok(Some(out))
}

/// Read a string attribute from a start tag, preferring the qualified name
/// but accepting the bare local name.
pub(crate) fn attr_value(
    e: &quick_xml::events::BytesStart<'_>,
    qualified: &[u8],
    local: &[u8],
) -> Option<String> {
    let mut fallback = None;
    for attr in e.attributes().flatten() {
        let key = attr.key.as_ref();
        if key == qualified {
            return std::str::from_utf8(&attr.value).ok().map(str::to_string);
        }
        if attr.key.local_name().as_ref() == local {
            fallback = std::str::from_utf8(&attr.value).ok().map(str::to_string);
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &[u8] = br#"<?xml version="1.0"?><p:presentation xmlns:p="ns"><p:sldMasterIdLst><p:sldMasterId id="1" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst><p:sldId id="256" r:id="rId2"/><p:sldId id="257" r:id="rId3"/></p:sldIdLst><p:sldSz cx="9144000" cy="6858000"/></p:presentation>"#;

    #[test]
    fn test_element_span_start_end() {
        let (start, end) = element_span(XML, b"sldIdLst").unwrap().unwrap();
        let span = &XML[start..end];
        assert!(span.starts_with(b"<p:sldIdLst>"));
        assert!(span.ends_with(b"</p:sldIdLst>"));
        assert_eq!(span.iter().filter(|&&b| b == b'<').count(), 4);
    }

    #[test]
    fn test_element_span_empty_element() {
        let (start, end) = element_span(XML, b"sldSz").unwrap().unwrap();
        assert_eq!(&XML[start..end], br#"<p:sldSz cx="9144000" cy="6858000"/>"#);
    }

    #[test]
    fn test_element_span_absent() {
        assert!(element_span(XML, b"custShowLst").unwrap().is_none());
    }

    #[test]
    fn test_replace_element_preserves_surroundings() {
        let out = replace_element(XML, b"sldIdLst", "<p:sldIdLst/>")
            .unwrap()
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("<p:sldIdLst/>"));
        assert!(!text.contains("256"));
        // Neighbors untouched
        assert!(text.contains("<p:sldMasterIdLst>"));
        assert!(text.contains(r#"<p:sldSz cx="9144000" cy="6858000"/>"#));
    }
}
