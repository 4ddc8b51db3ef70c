//! Identifier records and allocation for slides, masters, and layouts.
//!
//! The presentation part orders its slides and masters through identifier
//! lists (`p:sldIdLst`, `p:sldMasterIdLst`), and each master orders its
//! layouts through `p:sldLayoutIdLst`. Every entry pairs a numeric ID that
//! is unique within its list with the relationship ID resolving the actual
//! part. This module parses those lists, allocates fresh identifiers, and
//! splices rewritten lists back into their owning part's XML.

use crate::pptx::error::{PptxError, Result};
use crate::pptx::xmlutil::{attr_value, replace_element};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::fmt::Write as FmtWrite;

/// Allocate the next identifier for a set of existing identifiers.
///
/// Scans the full sequence (no sortedness assumed) and returns one greater
/// than the maximum found, or 1 when the sequence is empty. Freed values
/// are deliberately never reused: callers re-run this on every allocation
/// instead of caching a counter, so removal can never cause an ID to be
/// handed out twice.
pub fn next_id<I>(existing: I) -> u32
where
    I: IntoIterator<Item = u32>,
{
    existing.into_iter().max().map_or(1, |max| max + 1)
}

/// Which identifier list a record set represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdListKind {
    Slide,
    SlideMaster,
    SlideLayout,
}

impl IdListKind {
    /// Local name of the list element.
    pub fn list_tag(&self) -> &'static str {
        match self {
            IdListKind::Slide => "sldIdLst",
            IdListKind::SlideMaster => "sldMasterIdLst",
            IdListKind::SlideLayout => "sldLayoutIdLst",
        }
    }

    /// Local name of one entry element.
    pub fn entry_tag(&self) -> &'static str {
        match self {
            IdListKind::Slide => "sldId",
            IdListKind::SlideMaster => "sldMasterId",
            IdListKind::SlideLayout => "sldLayoutId",
        }
    }
}

/// One identifier record: numeric ID plus relationship ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdRecord {
    pub id: u32,
    pub rel_id: String,
}

/// An ordered identifier record list parsed from part XML.
#[derive(Debug, Clone)]
pub struct IdList {
    kind: IdListKind,
    records: Vec<IdRecord>,
}

impl IdList {
    /// Create an empty list of the given kind.
    pub fn new(kind: IdListKind) -> Self {
        Self {
            kind,
            records: Vec::new(),
        }
    }

    /// Parse the identifier list of the given kind from part XML.
    ///
    /// An absent list element yields an empty record list; the distinction
    /// only matters when writing, where `splice_into` requires the element
    /// to exist.
    pub fn parse(xml: &[u8], kind: IdListKind) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let list_tag = kind.list_tag().as_bytes();
        let entry_tag = kind.entry_tag().as_bytes();

        let mut records = Vec::new();
        let mut in_list = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) if e.local_name().as_ref() == list_tag => {
                    in_list = true;
                }
                // A self-closing list is complete with zero entries; stop
                // here so a later element with the same local name (the
                // section extension nests one) is never misread
                Ok(Event::Empty(ref e)) if e.local_name().as_ref() == list_tag => {
                    break;
                }
                Ok(Event::End(ref e)) if e.local_name().as_ref() == list_tag => {
                    break;
                }
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                    if in_list && e.local_name().as_ref() == entry_tag =>
                {
                    let id = attr_value(e, b"id", b"id")
                        .and_then(|v| v.parse::<u32>().ok())
                        .ok_or_else(|| {
                            PptxError::InvalidFormat(format!(
                                "{} entry without numeric id",
                                kind.entry_tag()
                            ))
                        })?;
                    let rel_id = attr_value(e, b"r:id", b"id").ok_or_else(|| {
                        PptxError::InvalidFormat(format!(
                            "{} entry without relationship id",
                            kind.entry_tag()
                        ))
                    })?;
                    records.push(IdRecord { id, rel_id });
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(PptxError::Xml(e.to_string())),
                _ => {}
            }
        }

        Ok(Self { kind, records })
    }

    /// Allocate the next free identifier for this list.
    pub fn next_id(&self) -> u32 {
        next_id(self.records.iter().map(|r| r.id))
    }

    /// Append a record at the end of the list.
    pub fn push(&mut self, record: IdRecord) {
        self.records.push(record);
    }

    /// Remove the record with the given numeric ID, returning it.
    pub fn remove_by_id(&mut self, id: u32) -> Option<IdRecord> {
        let pos = self.records.iter().position(|r| r.id == id)?;
        Some(self.records.remove(pos))
    }

    /// Relocate the record at `from` so it ends up at index `to`.
    ///
    /// Only the ordering changes; identifier values are untouched.
    pub fn relocate(&mut self, from: usize, to: usize) {
        let record = self.records.remove(from);
        self.records.insert(to, record);
    }

    /// Index of the record with the given numeric ID.
    pub fn position_of(&self, id: u32) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    /// Get the record at an index.
    pub fn get(&self, index: usize) -> Option<&IdRecord> {
        self.records.get(index)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate the records in document order.
    pub fn iter(&self) -> impl Iterator<Item = &IdRecord> {
        self.records.iter()
    }

    /// Mutable iteration, for renumbering passes.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut IdRecord> {
        self.records.iter_mut()
    }

    /// Serialize this list to its XML element.
    pub fn to_xml(&self) -> String {
        let list_tag = self.kind.list_tag();
        if self.records.is_empty() {
            return format!("<p:{}/>", list_tag);
        }

        let entry_tag = self.kind.entry_tag();
        let mut xml = String::with_capacity(32 + self.records.len() * 48);
        let mut buf = itoa::Buffer::new();

        let _ = write!(xml, "<p:{}>", list_tag);
        for record in &self.records {
            let _ = write!(
                xml,
                r#"<p:{} id="{}" r:id="{}"/>"#,
                entry_tag,
                buf.format(record.id),
                record.rel_id
            );
        }
        let _ = write!(xml, "</p:{}>", list_tag);

        xml
    }

    /// Splice this list over the existing element in the owning part XML.
    ///
    /// Fails when the part has no such element: identifier lists are only
    /// ever rewritten in place, never invented.
    pub fn splice_into(&self, xml: &[u8]) -> Result<Vec<u8>> {
        replace_element(xml, self.kind.list_tag().as_bytes(), &self.to_xml())?.ok_or_else(|| {
            PptxError::InvalidFormat(format!("part has no {} element", self.kind.list_tag()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PRES_XML: &[u8] = br#"<?xml version="1.0"?><p:presentation xmlns:p="ns" xmlns:r="ns2"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst><p:sldId id="256" r:id="rId2"/><p:sldId id="257" r:id="rId3"/><p:sldId id="258" r:id="rId4"/></p:sldIdLst></p:presentation>"#;

    #[test]
    fn test_next_id_empty_is_one() {
        assert_eq!(next_id(Vec::new()), 1);
    }

    #[test]
    fn test_next_id_unsorted_input() {
        assert_eq!(next_id([257, 256, 301, 258]), 302);
    }

    #[test]
    fn test_next_id_does_not_reuse_gaps() {
        // 257 freed by a removal: the next allocation must still exceed the max
        assert_eq!(next_id([256, 258]), 259);
    }

    #[test]
    fn test_parse_slide_ids() {
        let list = IdList::parse(PRES_XML, IdListKind::Slide).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.get(0).unwrap(), &IdRecord { id: 256, rel_id: "rId2".into() });
        assert_eq!(list.get(2).unwrap().rel_id, "rId4");
        assert_eq!(list.next_id(), 259);
    }

    #[test]
    fn test_parse_master_ids() {
        let list = IdList::parse(PRES_XML, IdListKind::SlideMaster).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(0).unwrap().id, 2147483648);
        assert_eq!(list.next_id(), 2147483649);
    }

    #[test]
    fn test_relocate_preserves_ids() {
        let mut list = IdList::parse(PRES_XML, IdListKind::Slide).unwrap();
        list.relocate(2, 1);

        let ids: Vec<u32> = list.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![256, 258, 257]);
        // The record kept its identifier and relationship ID
        assert_eq!(list.get(1).unwrap().rel_id, "rId4");
    }

    #[test]
    fn test_splice_round_trip() {
        let mut list = IdList::parse(PRES_XML, IdListKind::Slide).unwrap();
        list.remove_by_id(257).unwrap();

        let rewritten = list.splice_into(PRES_XML).unwrap();
        let reparsed = IdList::parse(&rewritten, IdListKind::Slide).unwrap();
        assert_eq!(reparsed.len(), 2);
        assert!(reparsed.position_of(257).is_none());

        // The master list next door is untouched
        let masters = IdList::parse(&rewritten, IdListKind::SlideMaster).unwrap();
        assert_eq!(masters.len(), 1);
    }

    #[test]
    fn test_parse_stops_at_self_closing_list() {
        // A drained slide list followed by the section extension, whose
        // member entries share the sldIdLst/sldId local names
        let xml = br#"<p:presentation xmlns:p="ns"><p:sldIdLst/><p:extLst><p:ext uri="{x}"><p14:sectionLst xmlns:p14="ns14"><p14:section name="A" id="{a}"><p14:sldIdLst><p14:sldId id="256"/></p14:sldIdLst></p14:section></p14:sectionLst></p:ext></p:extLst></p:presentation>"#;

        let list = IdList::parse(xml, IdListKind::Slide).unwrap();
        assert!(list.is_empty());
        assert_eq!(list.next_id(), 1);
    }

    #[test]
    fn test_splice_requires_element() {
        let list = IdList::new(IdListKind::SlideLayout);
        assert!(list.splice_into(PRES_XML).is_err());
    }

    #[test]
    fn test_empty_list_serializes_self_closing() {
        let list = IdList::new(IdListKind::Slide);
        assert_eq!(list.to_xml(), "<p:sldIdLst/>");
    }

    proptest! {
        /// Repeated allocation without intervening additions is idempotent,
        /// and allocating after an addition strictly exceeds all prior values.
        #[test]
        fn prop_allocation_monotonicity(ids in proptest::collection::vec(1u32..1_000_000, 0..64)) {
            let first = next_id(ids.clone());
            let second = next_id(ids.clone());
            prop_assert_eq!(first, second);

            let mut grown = ids.clone();
            grown.push(first);
            let after = next_id(grown);
            prop_assert!(after > first);
            for id in ids {
                prop_assert!(after > id);
            }
        }
    }
}
