//! Presentation object and the shared document core.
//!
//! A presentation and every handle derived from it (slide collection,
//! slides, sections, masters) share one `DocumentCore`: the OPC package,
//! the live identifier lists, both registries, and the caches. The core is
//! single-threaded (one logical owner per open document, no
//! internal locking), which is why interior mutability is `RefCell`/`Cell`
//! rather than anything synchronized. Concurrent use from multiple threads
//! is the caller's responsibility to avoid.

use crate::opc::OpcPackage;
use crate::opc::packuri::PackURI;
use crate::pptx::customshow::{CustomShow, CustomShowList};
use crate::pptx::error::{PptxError, Result};
use crate::pptx::ident::{IdList, IdListKind};
use crate::pptx::master::SlideMaster;
use crate::pptx::sections::{SectionList, Sections};
use crate::pptx::slide::Slide;
use crate::pptx::slides::SlideCollection;
use crate::pptx::xmlutil::{attr_value, replace_element};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Shared state of one open presentation document.
///
/// The identifier lists and registries parsed from presentation.xml are
/// the live authority while the document is open; `persist_presentation`
/// splices them back into the part XML after every structural mutation.
pub(crate) struct DocumentCore {
    /// The underlying OPC part graph
    pub(crate) opc: RefCell<OpcPackage>,

    /// Partname of the presentation part (usually /ppt/presentation.xml)
    pub(crate) pres_partname: PackURI,

    /// Live slide identifier list (p:sldIdLst)
    pub(crate) slide_ids: RefCell<IdList>,

    /// Live slide-master identifier list (p:sldMasterIdLst)
    pub(crate) master_ids: RefCell<IdList>,

    /// Section registry (p14:sectionLst)
    pub(crate) sections: RefCell<SectionList>,

    /// Custom-show registry (p:custShowLst)
    pub(crate) custom_shows: RefCell<CustomShowList>,

    /// Lazily materialized slide entities, invalidated on every mutation
    pub(crate) slide_cache: RefCell<Option<Vec<Slide>>>,

    /// Slide-master entities stamped with the generation they were built at
    pub(crate) master_cache: RefCell<Option<(u64, Vec<SlideMaster>)>>,

    /// Collection-changed notification: a bare counter, no payload.
    /// Dependent caches compare their stamp against it and rebuild lazily.
    pub(crate) generation: Cell<u64>,
}

impl DocumentCore {
    /// Build the document core from a loaded OPC package.
    pub(crate) fn from_opc(opc: OpcPackage) -> Result<Rc<Self>> {
        let pres_partname = opc.main_document_partname()?;
        let blob = opc.get_part(&pres_partname)?.blob();

        let slide_ids = IdList::parse(blob, IdListKind::Slide)?;
        let master_ids = IdList::parse(blob, IdListKind::SlideMaster)?;
        let sections = SectionList::from_xml(blob)?;
        let custom_shows = CustomShowList::from_xml(blob)?;

        Ok(Rc::new(Self {
            opc: RefCell::new(opc),
            pres_partname,
            slide_ids: RefCell::new(slide_ids),
            master_ids: RefCell::new(master_ids),
            sections: RefCell::new(sections),
            custom_shows: RefCell::new(custom_shows),
            slide_cache: RefCell::new(None),
            master_cache: RefCell::new(None),
            generation: Cell::new(0),
        }))
    }

    /// Current bytes of the presentation part.
    pub(crate) fn pres_blob(&self) -> Result<Vec<u8>> {
        Ok(self
            .opc
            .borrow()
            .get_part(&self.pres_partname)?
            .blob()
            .to_vec())
    }

    /// Rewrite the managed elements of presentation.xml from the live
    /// identifier lists and registries, leaving everything else untouched.
    ///
    /// This is the persist step each structural mutation ends with; once it
    /// returns, the in-memory part graph serializes to a consistent
    /// document.
    pub(crate) fn persist_presentation(&self) -> Result<()> {
        let mut xml = self.pres_blob()?;
        xml = self.slide_ids.borrow().splice_into(&xml)?;
        xml = self.master_ids.borrow().splice_into(&xml)?;

        {
            let shows = self.custom_shows.borrow();
            if shows.is_in_xml() {
                xml = replace_element(&xml, b"custShowLst", &shows.to_xml())?.ok_or_else(|| {
                    PptxError::InvalidFormat("presentation lost its custShowLst element".into())
                })?;
            }
        }
        {
            let sections = self.sections.borrow();
            if sections.is_in_xml() {
                xml = replace_element(&xml, b"sectionLst", &sections.to_xml())?.ok_or_else(|| {
                    PptxError::InvalidFormat("presentation lost its sectionLst element".into())
                })?;
            }
        }

        self.opc
            .borrow_mut()
            .set_part_blob(&self.pres_partname, xml)?;
        Ok(())
    }

    /// Fire the collection-changed notification.
    ///
    /// Drops the materialized slide list and bumps the generation counter;
    /// dependent caches (the master list) notice the stamp mismatch and
    /// rebuild on next access.
    pub(crate) fn mark_changed(&self) {
        *self.slide_cache.borrow_mut() = None;
        self.generation.set(self.generation.get() + 1);
    }

    /// Resolve a relationship of the presentation part to a partname.
    pub(crate) fn partname_for_rel(&self, rel_id: &str) -> Result<PackURI> {
        Ok(self
            .opc
            .borrow()
            .part_related_by(&self.pres_partname, rel_id)?)
    }
}

/// A PowerPoint presentation.
///
/// This is the main high-level API for working with presentation content.
/// Not intended to be constructed directly: use `Package::presentation()`.
///
/// # Examples
///
/// ```rust,no_run
/// use guava::Package;
///
/// let pkg = Package::open("deck.pptx")?;
/// let pres = pkg.presentation();
///
/// println!("{} slides", pres.slides().count()?);
/// for slide in pres.slides().iter()? {
///     println!("slide #{}: {}", slide.number()?, slide.name()?);
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Presentation {
    pub(crate) core: Rc<DocumentCore>,
}

impl Presentation {
    /// The slide collection, the single entry point for structural
    /// mutation (add, duplicate, insert, remove).
    pub fn slides(&self) -> SlideCollection {
        SlideCollection {
            core: self.core.clone(),
        }
    }

    /// The section registry.
    pub fn sections(&self) -> Sections {
        Sections {
            core: self.core.clone(),
        }
    }

    /// Snapshot of the custom shows currently defined.
    pub fn custom_shows(&self) -> Vec<CustomShow> {
        self.core.custom_shows.borrow().iter().cloned().collect()
    }

    /// Number of slides in the presentation.
    pub fn slide_count(&self) -> Result<usize> {
        self.slides().count()
    }

    /// All slide masters, in identifier-list order.
    ///
    /// The list is cached and stamped with the collection generation;
    /// structural slide mutations invalidate it indirectly through the
    /// collection-changed notification.
    pub fn slide_masters(&self) -> Result<Vec<SlideMaster>> {
        let generation = self.core.generation.get();
        if let Some((stamp, masters)) = self.core.master_cache.borrow().as_ref()
            && *stamp == generation
        {
            return Ok(masters.clone());
        }

        let masters = self.build_masters()?;
        *self.core.master_cache.borrow_mut() = Some((generation, masters.clone()));
        Ok(masters)
    }

    fn build_masters(&self) -> Result<Vec<SlideMaster>> {
        let records: Vec<_> = self.core.master_ids.borrow().iter().cloned().collect();
        let mut masters = Vec::with_capacity(records.len());
        for record in records {
            let partname = self.core.partname_for_rel(&record.rel_id)?;
            masters.push(SlideMaster::new(
                &self.core,
                partname,
                record.id,
                record.rel_id,
            ));
        }
        Ok(masters)
    }

    /// Get the slide width in EMUs (English Metric Units).
    ///
    /// Returns None if the slide size is not defined.
    /// 1 EMU = 1/914400 inch = 1/36000 mm
    pub fn slide_width(&self) -> Result<Option<i64>> {
        Ok(self.slide_size()?.map(|(cx, _)| cx))
    }

    /// Get the slide height in EMUs (English Metric Units).
    ///
    /// Returns None if the slide size is not defined.
    pub fn slide_height(&self) -> Result<Option<i64>> {
        Ok(self.slide_size()?.map(|(_, cy)| cy))
    }

    /// Get the slide dimensions as (width, height) in EMUs.
    pub fn slide_size(&self) -> Result<Option<(i64, i64)>> {
        let blob = self.core.pres_blob()?;
        let mut reader = Reader::from_reader(blob.as_slice());
        reader.config_mut().trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    if e.local_name().as_ref() == b"sldSz" {
                        let cx = attr_value(e, b"cx", b"cx").and_then(|v| v.parse::<i64>().ok());
                        let cy = attr_value(e, b"cy", b"cy").and_then(|v| v.parse::<i64>().ok());
                        return match (cx, cy) {
                            (Some(cx), Some(cy)) => Ok(Some((cx, cy))),
                            _ => Err(PptxError::InvalidFormat(
                                "sldSz element without numeric cx/cy".into(),
                            )),
                        };
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(PptxError::Xml(e.to_string())),
                _ => {}
            }
        }

        Ok(None)
    }
}
