//! Slide masters and slide layouts.
//!
//! A slide references exactly one layout; a layout references exactly one
//! master; masters are shared by any number of layouts and slides. Layout
//! identifiers live in each master's `p:sldLayoutIdLst` and must be unique
//! presentation-wide, which is why cross-document slide imports renumber
//! them across every master.

use crate::opc::constants::relationship_type as rt;
use crate::opc::packuri::PackURI;
use crate::pptx::error::{PptxError, Result};
use crate::pptx::ident::{IdList, IdListKind};
use crate::pptx::presentation::DocumentCore;
use crate::pptx::shapes::{Shape, ShapeOwner, parse_shapes};
use crate::pptx::xmlutil::attr_value;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::rc::{Rc, Weak};

/// A slide master.
#[derive(Clone)]
pub struct SlideMaster {
    pub(crate) core: Weak<DocumentCore>,
    pub(crate) partname: PackURI,
    pub(crate) master_id: u32,
    pub(crate) rel_id: String,
}

impl SlideMaster {
    pub(crate) fn new(
        core: &Rc<DocumentCore>,
        partname: PackURI,
        master_id: u32,
        rel_id: String,
    ) -> Self {
        Self {
            core: Rc::downgrade(core),
            partname,
            master_id,
            rel_id,
        }
    }

    /// Find the master entity owning the given part.
    pub(crate) fn by_partname(core: &Rc<DocumentCore>, partname: &PackURI) -> Result<SlideMaster> {
        let records: Vec<_> = core.master_ids.borrow().iter().cloned().collect();
        for record in records {
            let candidate = core.partname_for_rel(&record.rel_id)?;
            if candidate == *partname {
                return Ok(SlideMaster::new(
                    core,
                    candidate,
                    record.id,
                    record.rel_id,
                ));
            }
        }
        Err(PptxError::InvalidFormat(format!(
            "no slide master registered for part {}",
            partname
        )))
    }

    /// The master's numeric identifier.
    #[inline]
    pub fn id(&self) -> u32 {
        self.master_id
    }

    /// The relationship ID resolving this master's part.
    #[inline]
    pub fn rel_id(&self) -> &str {
        &self.rel_id
    }

    /// The partname of this master's part.
    #[inline]
    pub fn partname(&self) -> &PackURI {
        &self.partname
    }

    /// The master name, from the `p:cSld` name attribute.
    pub fn name(&self) -> Result<String> {
        csld_name(&self.blob()?)
    }

    /// The layout identifier records of this master, in document order.
    pub fn layout_ids(&self) -> Result<IdList> {
        IdList::parse(&self.blob()?, IdListKind::SlideLayout)
    }

    /// The layouts belonging to this master.
    pub fn layouts(&self) -> Result<Vec<SlideLayout>> {
        let core = self.core()?;
        let layout_ids = self.layout_ids()?;

        let mut layouts = Vec::with_capacity(layout_ids.len());
        let opc = core.opc.borrow();
        let part = opc.get_part(&self.partname)?;
        for record in layout_ids.iter() {
            let rel = part.rels().get(&record.rel_id).ok_or_else(|| {
                PptxError::InvalidFormat(format!(
                    "master references unknown layout relationship {}",
                    record.rel_id
                ))
            })?;
            layouts.push(SlideLayout {
                core: self.core.clone(),
                partname: rel.target_partname()?,
                layout_id: record.id,
                rel_id: record.rel_id.clone(),
            });
        }
        Ok(layouts)
    }

    /// Parse and return the shapes on this master.
    pub fn shapes(&self) -> Result<Vec<Shape>> {
        let blob = self.blob()?;
        parse_shapes(ShapeOwner::Master(self.clone()), &blob)
    }

    pub(crate) fn core(&self) -> Result<Rc<DocumentCore>> {
        self.core.upgrade().ok_or(PptxError::Closed)
    }

    pub(crate) fn blob(&self) -> Result<Vec<u8>> {
        let core = self.core()?;
        let opc = core.opc.borrow();
        Ok(opc.get_part(&self.partname)?.blob().to_vec())
    }
}

impl std::fmt::Debug for SlideMaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlideMaster")
            .field("id", &self.master_id)
            .field("partname", &self.partname.as_str())
            .finish()
    }
}

/// A slide layout.
#[derive(Clone)]
pub struct SlideLayout {
    pub(crate) core: Weak<DocumentCore>,
    pub(crate) partname: PackURI,
    pub(crate) layout_id: u32,
    pub(crate) rel_id: String,
}

impl SlideLayout {
    /// The layout's numeric identifier, unique presentation-wide.
    #[inline]
    pub fn id(&self) -> u32 {
        self.layout_id
    }

    /// The partname of this layout's part.
    #[inline]
    pub fn partname(&self) -> &PackURI {
        &self.partname
    }

    /// The layout name, from the `p:cSld` name attribute.
    pub fn name(&self) -> Result<String> {
        csld_name(&self.blob()?)
    }

    /// The master this layout belongs to.
    pub fn master(&self) -> Result<SlideMaster> {
        let core = self.core()?;
        let master_partname = {
            let opc = core.opc.borrow();
            let part = opc.get_part(&self.partname)?;
            part.rels()
                .part_with_reltype(rt::SLIDE_MASTER)?
                .target_partname()?
        };
        SlideMaster::by_partname(&core, &master_partname)
    }

    /// Parse and return the shapes on this layout.
    pub fn shapes(&self) -> Result<Vec<Shape>> {
        let blob = self.blob()?;
        parse_shapes(ShapeOwner::Layout(self.clone()), &blob)
    }

    pub(crate) fn core(&self) -> Result<Rc<DocumentCore>> {
        self.core.upgrade().ok_or(PptxError::Closed)
    }

    pub(crate) fn blob(&self) -> Result<Vec<u8>> {
        let core = self.core()?;
        let opc = core.opc.borrow();
        Ok(opc.get_part(&self.partname)?.blob().to_vec())
    }
}

impl std::fmt::Debug for SlideLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlideLayout")
            .field("id", &self.layout_id)
            .field("partname", &self.partname.as_str())
            .finish()
    }
}

/// Read the name attribute of the first `cSld` element.
fn csld_name(xml: &[u8]) -> Result<String> {
    let mut reader = Reader::from_reader(xml);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pptx::Package;
    use crate::pptx::testutil::TestDeck;

    #[test]
    fn test_master_and_layouts() {
        let pkg = Package::from_bytes(TestDeck::new(1).build()).unwrap();
        let pres = pkg.presentation();

        let masters = pres.slide_masters().unwrap();
        assert_eq!(masters.len(), 1);

        let master = &masters[0];
        assert_eq!(master.id(), 2147483648);
        assert_eq!(master.name().unwrap(), "Office Master");

        let layouts = master.layouts().unwrap();
        assert_eq!(layouts.len(), 1);
        assert_eq!(layouts[0].id(), 2147483649);
        assert_eq!(layouts[0].name().unwrap(), "Title Layout");

        // The layout resolves back to its master
        let round_trip = layouts[0].master().unwrap();
        assert_eq!(round_trip.id(), master.id());
    }

    #[test]
    fn test_master_cache_is_reused_until_invalidated() {
        let pkg = Package::from_bytes(TestDeck::new(1).build()).unwrap();
        let pres = pkg.presentation();

        let first = pres.slide_masters().unwrap();
        let again = pres.slide_masters().unwrap();
        assert_eq!(first.len(), again.len());
        assert_eq!(first[0].partname(), again[0].partname());
    }
}
