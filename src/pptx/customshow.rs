//! Custom slide shows.
//!
//! Custom shows are named, ordered subsets of slides that can be presented
//! independently of the main slide order. Entries reference slides by
//! relationship ID, so removing a slide must purge every entry carrying
//! that slide's relationship ID from every show, leaving the relative
//! order of the surviving entries intact. A show drained to zero entries
//! stays in place; dropping it is the caller's decision, consistent with
//! the section registry.

use crate::pptx::error::{PptxError, Result};
use crate::pptx::xmlutil::attr_value;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::fmt::Write as FmtWrite;

/// A custom slide show definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomShow {
    /// Numeric ID of the custom show
    pub id: u32,
    /// Display name of the custom show
    pub name: String,
    /// Relationship IDs of the member slides, in show order
    pub slide_rel_ids: Vec<String>,
}

/// The custom-show registry parsed from presentation XML.
#[derive(Debug, Clone, Default)]
pub struct CustomShowList {
    shows: Vec<CustomShow>,
    /// Whether the source XML carried a `custShowLst` element at all
    in_xml: bool,
}

impl CustomShowList {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse custom shows from presentation XML.
    ///
    /// Looks for the `p:custShowLst` element; a presentation without one
    /// yields an empty registry.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut shows = Vec::new();
        let mut in_xml = false;
        let mut current: Option<CustomShow> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                    b"custShowLst" => in_xml = true,
                    b"custShow" => {
                        let name = attr_value(e, b"name", b"name").unwrap_or_default();
                        let id = attr_value(e, b"id", b"id")
                            .and_then(|v| v.parse::<u32>().ok())
                            .unwrap_or(0);
                        current = Some(CustomShow {
                            id,
                            name,
                            slide_rel_ids: Vec::new(),
                        });
                    }
                    _ => {}
                },
                Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                    b"custShowLst" => in_xml = true,
                    b"sld" => {
                        if let Some(ref mut show) = current
                            && let Some(rel_id) = attr_value(e, b"r:id", b"id")
                        {
                            show.slide_rel_ids.push(rel_id);
                        }
                    }
                    _ => {}
                },
                Ok(Event::End(ref e)) => {
                    if e.local_name().as_ref() == b"custShow"
                        && let Some(show) = current.take()
                    {
                        shows.push(show);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(PptxError::Xml(e.to_string())),
                _ => {}
            }
        }

        Ok(Self { shows, in_xml })
    }

    /// Whether the presentation XML carried a custom-show list.
    pub fn is_in_xml(&self) -> bool {
        self.in_xml
    }

    /// Number of custom shows.
    pub fn len(&self) -> usize {
        self.shows.len()
    }

    /// Check whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.shows.is_empty()
    }

    /// Iterate the shows in document order.
    pub fn iter(&self) -> impl Iterator<Item = &CustomShow> {
        self.shows.iter()
    }

    /// Get a custom show by name.
    pub fn get_by_name(&self, name: &str) -> Option<&CustomShow> {
        self.shows.iter().find(|s| s.name == name)
    }

    /// Purge every entry referencing the given slide relationship ID from
    /// every show, preserving the relative order of surviving entries.
    ///
    /// Returns the number of entries removed. Purging is idempotent: a
    /// second call with the same relationship ID removes nothing.
    pub fn purge_slide_reference(&mut self, rel_id: &str) -> usize {
        let mut removed = 0;
        for show in &mut self.shows {
            let before = show.slide_rel_ids.len();
            show.slide_rel_ids.retain(|r| r != rel_id);
            removed += before - show.slide_rel_ids.len();
        }
        removed
    }

    /// Generate the `p:custShowLst` element for the presentation part.
    pub fn to_xml(&self) -> String {
        if self.shows.is_empty() {
            return "<p:custShowLst/>".to_string();
        }

        let mut xml = String::with_capacity(64 + self.shows.len() * 96);
        xml.push_str("<p:custShowLst>");

        let mut buf = itoa::Buffer::new();
        for show in &self.shows {
            let _ = write!(
                xml,
                r#"<p:custShow name="{}" id="{}">"#,
                crate::opc::rel::escape_xml(&show.name),
                buf.format(show.id)
            );
            if show.slide_rel_ids.is_empty() {
                xml.push_str("<p:sldLst/>");
            } else {
                xml.push_str("<p:sldLst>");
                for rel_id in &show.slide_rel_ids {
                    let _ = write!(
                        xml,
                        r#"<p:sld r:id="{}"/>"#,
                        crate::opc::rel::escape_xml(rel_id)
                    );
                }
                xml.push_str("</p:sldLst>");
            }
            xml.push_str("</p:custShow>");
        }

        xml.push_str("</p:custShowLst>");
        xml
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRES_XML: &[u8] = br#"<p:presentation xmlns:p="ns" xmlns:r="ns2"><p:sldIdLst><p:sldId id="256" r:id="rId2"/></p:sldIdLst><p:custShowLst><p:custShow name="Short" id="0"><p:sldLst><p:sld r:id="rId2"/><p:sld r:id="rId4"/></p:sldLst></p:custShow><p:custShow name="Full" id="1"><p:sldLst><p:sld r:id="rId2"/><p:sld r:id="rId3"/><p:sld r:id="rId4"/></p:sldLst></p:custShow></p:custShowLst></p:presentation>"#;

    #[test]
    fn test_parse_custom_shows() {
        let list = CustomShowList::from_xml(PRES_XML).unwrap();
        assert!(list.is_in_xml());
        assert_eq!(list.len(), 2);

        let short = list.get_by_name("Short").unwrap();
        assert_eq!(short.id, 0);
        assert_eq!(short.slide_rel_ids, vec!["rId2", "rId4"]);
    }

    #[test]
    fn test_purge_preserves_order_of_survivors() {
        let mut list = CustomShowList::from_xml(PRES_XML).unwrap();
        let removed = list.purge_slide_reference("rId3");
        assert_eq!(removed, 1);

        let full = list.get_by_name("Full").unwrap();
        assert_eq!(full.slide_rel_ids, vec!["rId2", "rId4"]);
        // Untouched show keeps all entries
        assert_eq!(list.get_by_name("Short").unwrap().slide_rel_ids.len(), 2);
    }

    #[test]
    fn test_purge_is_idempotent() {
        let mut list = CustomShowList::from_xml(PRES_XML).unwrap();
        assert_eq!(list.purge_slide_reference("rId2"), 2);
        assert_eq!(list.purge_slide_reference("rId2"), 0);
    }

    #[test]
    fn test_purged_empty_show_stays() {
        let mut list = CustomShowList::from_xml(PRES_XML).unwrap();
        list.purge_slide_reference("rId2");
        list.purge_slide_reference("rId4");

        let short = list.get_by_name("Short").unwrap();
        assert!(short.slide_rel_ids.is_empty());
        assert_eq!(list.len(), 2);

        // An entry-less show serializes with an empty member list
        assert!(list.to_xml().contains(r#"<p:custShow name="Short" id="0"><p:sldLst/>"#));
    }

    #[test]
    fn test_to_xml_round_trip() {
        let list = CustomShowList::from_xml(PRES_XML).unwrap();
        let xml = list.to_xml();

        let reparsed = CustomShowList::from_xml(xml.as_bytes()).unwrap();
        assert_eq!(reparsed.len(), 2);
        assert_eq!(
            reparsed.get_by_name("Full").unwrap().slide_rel_ids,
            vec!["rId2", "rId3", "rId4"]
        );
    }

    #[test]
    fn test_absent_show_list() {
        let list = CustomShowList::from_xml(b"<p:presentation/>").unwrap();
        assert!(!list.is_in_xml());
        assert!(list.is_empty());
    }
}
