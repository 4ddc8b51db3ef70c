//! Slide entity.
//!
//! A `Slide` pairs a slide part with its identifier record. Handles are
//! cheap to clone and share one removal state: once a slide is removed
//! through the collection, every handle to it rejects further structural
//! operations.

use crate::opc::constants::relationship_type as rt;
use crate::opc::packuri::PackURI;
use crate::pptx::error::{PptxError, Result};
use crate::pptx::presentation::DocumentCore;
use crate::pptx::shapes::{Shape, ShapeOwner, parse_shapes};
use crate::pptx::xmlutil::attr_value;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::cell::Cell;
use std::rc::{Rc, Weak};

/// Removal state of an entity that can be structurally removed.
///
/// Checked at the top of every public operation; entities holding a
/// back-reference to a removable owner check the owner's state as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Live,
    Removed,
}

/// One slide of a presentation.
#[derive(Clone)]
pub struct Slide {
    pub(crate) core: Weak<DocumentCore>,
    pub(crate) partname: PackURI,
    pub(crate) slide_id: u32,
    pub(crate) rel_id: String,
    pub(crate) state: Rc<Cell<EntityState>>,
}

impl Slide {
    pub(crate) fn new(
        core: &Rc<DocumentCore>,
        partname: PackURI,
        slide_id: u32,
        rel_id: String,
    ) -> Self {
        Self {
            core: Rc::downgrade(core),
            partname,
            slide_id,
            rel_id,
            state: Rc::new(Cell::new(EntityState::Live)),
        }
    }

    /// The slide's numeric identifier, unique within the presentation.
    #[inline]
    pub fn id(&self) -> u32 {
        self.slide_id
    }

    /// The relationship ID resolving this slide's part.
    #[inline]
    pub fn rel_id(&self) -> &str {
        &self.rel_id
    }

    /// The partname of this slide's part.
    #[inline]
    pub fn partname(&self) -> &PackURI {
        &self.partname
    }

    /// Whether this slide has been structurally removed.
    #[inline]
    pub fn is_removed(&self) -> bool {
        self.state.get() == EntityState::Removed
    }

    /// Mark this slide as removed. All further structural operations on
    /// any handle sharing this state fail fast.
    pub(crate) fn mark_removed(&self) {
        self.state.set(EntityState::Removed);
    }

    pub(crate) fn ensure_live(&self) -> Result<()> {
        if self.is_removed() {
            return Err(PptxError::Removed("slide"));
        }
        Ok(())
    }

    pub(crate) fn core(&self) -> Result<Rc<DocumentCore>> {
        self.core.upgrade().ok_or(PptxError::Closed)
    }

    /// The 1-based position of this slide in document order.
    ///
    /// The position is derived from the live identifier list, never
    /// stored: relocations and removals elsewhere in the collection are
    /// reflected immediately. A handle whose record is gone from the list
    /// (removed through another handle after a cache rebuild) fails with a
    /// removed-entity error.
    pub fn number(&self) -> Result<usize> {
        self.ensure_live()?;
        let core = self.core()?;
        let position = core
            .slide_ids
            .borrow()
            .position_of(self.slide_id)
            .ok_or(PptxError::Removed("slide"))?;
        Ok(position + 1)
    }

    /// The slide name, from the `p:cSld` name attribute.
    ///
    /// Returns an empty string when the slide has no name.
    pub fn name(&self) -> Result<String> {
        let blob = self.blob()?;
        let mut reader = Reader::from_reader(blob.as_slice());
        reader.config_mut().trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    if e.local_name().as_ref() == b"cSld" {
                        return Ok(attr_value(e, b"name", b"name").unwrap_or_default());
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(PptxError::Xml(e.to_string())),
                _ => {}
            }
        }

        Ok(String::new())
    }

    /// Extract all text content from the slide.
    ///
    /// Concatenates the `a:t` runs in document order, one line per run.
    pub fn text(&self) -> Result<String> {
        let blob = self.blob()?;
        let mut reader = Reader::from_reader(blob.as_slice());
        reader.config_mut().trim_text(true);

        let mut text = String::new();
        let mut in_text_element = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    if e.local_name().as_ref() == b"t" {
                        in_text_element = true;
                    }
                }
                Ok(Event::Text(e)) if in_text_element => {
                    let t = std::str::from_utf8(e.as_ref())
                        .map_err(|e| PptxError::Xml(e.to_string()))?;
                    if !text.is_empty() && !text.ends_with('\n') {
                        text.push('\n');
                    }
                    text.push_str(t);
                }
                Ok(Event::End(ref e)) => {
                    if e.local_name().as_ref() == b"t" {
                        in_text_element = false;
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(PptxError::Xml(e.to_string())),
                _ => {}
            }
        }

        Ok(text)
    }

    /// Parse and return the shapes on this slide.
    pub fn shapes(&self) -> Result<Vec<Shape>> {
        self.ensure_live()?;
        let blob = self.blob()?;
        parse_shapes(ShapeOwner::Slide(self.clone()), &blob)
    }

    /// The partname of the layout this slide references.
    pub fn layout_partname(&self) -> Result<PackURI> {
        let core = self.core()?;
        let opc = core.opc.borrow();
        let part = opc.get_part(&self.partname)?;
        Ok(part
            .rels()
            .part_with_reltype(rt::SLIDE_LAYOUT)?
            .target_partname()?)
    }

    /// Whether this slide carries a notes part.
    pub fn has_notes(&self) -> Result<bool> {
        let core = self.core()?;
        let opc = core.opc.borrow();
        let part = opc.get_part(&self.partname)?;
        Ok(part.rels().part_with_reltype(rt::NOTES_SLIDE).is_ok())
    }

    /// Current bytes of the slide part.
    ///
    /// Fails on a removed slide: the part is gone from the graph.
    pub(crate) fn blob(&self) -> Result<Vec<u8>> {
        self.ensure_live()?;
        let core = self.core()?;
        let opc = core.opc.borrow();
        Ok(opc.get_part(&self.partname)?.blob().to_vec())
    }
}

impl std::fmt::Debug for Slide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slide")
            .field("id", &self.slide_id)
            .field("rel_id", &self.rel_id)
            .field("partname", &self.partname.as_str())
            .field("removed", &self.is_removed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pptx::Package;
    use crate::pptx::testutil::TestDeck;

    #[test]
    fn test_slide_accessors() {
        let pkg = Package::from_bytes(TestDeck::new(2).build()).unwrap();
        let slide = pkg.presentation().slides().get(1).unwrap();

        assert_eq!(slide.id(), 257);
        assert_eq!(slide.rel_id(), "rId3");
        assert_eq!(slide.number().unwrap(), 2);
        assert_eq!(slide.name().unwrap(), "Slide 2");
        assert_eq!(slide.text().unwrap(), "Slide 2 title");
        assert!(!slide.has_notes().unwrap());
        assert_eq!(
            slide.layout_partname().unwrap().as_str(),
            "/ppt/slideLayouts/slideLayout1.xml"
        );
    }

    #[test]
    fn test_number_reflects_relocation() {
        let src = Package::from_bytes(TestDeck::new(1).build()).unwrap();
        let dest = Package::from_bytes(TestDeck::new(2).build()).unwrap();
        let pres = dest.presentation();

        let last = pres.slides().get(1).unwrap();
        assert_eq!(last.number().unwrap(), 2);

        let source = src.presentation().slides().get(0).unwrap();
        pres.slides().insert(1, &source).unwrap();

        // Derived from the live identifier list, not stored
        assert_eq!(last.number().unwrap(), 3);
    }

    #[test]
    fn test_handles_share_removal_state() {
        let pkg = Package::from_bytes(TestDeck::new(2).build()).unwrap();
        let pres = pkg.presentation();

        let a = pres.slides().get(0).unwrap();
        let b = pres.slides().get(0).unwrap();
        pres.slides().remove(&a).unwrap();

        assert!(b.is_removed());
        assert!(matches!(b.text(), Err(PptxError::Removed(_))));
    }
}
