//! The slide collection: the single entry point for structural mutation.
//!
//! Every operation that changes the slide set (add from another document,
//! duplicate within the same document, insert at a position, remove) goes
//! through this collection, so the cross-cutting consistency work is
//! centralized: identifier allocation, section membership, custom-show
//! references, part-graph edits, and the rewrite of presentation.xml all
//! happen here, in a fixed order.
//!
//! There is no transaction log. A mutation applies its steps narrowly and
//! persists at the end; if a store-level step fails partway, the document
//! is left partially mutated and the error is surfaced as-is; callers
//! must treat the cached state as untrustworthy after a failure. The
//! registry steps are idempotent, so a retry does not double-purge.

use crate::opc::constants::relationship_type as rt;
use crate::opc::package::{CloneAction, ClonePolicy};
use crate::opc::packuri::PackURI;
use crate::pptx::error::{PptxError, Result};
use crate::pptx::ident::IdRecord;
use crate::pptx::presentation::DocumentCore;
use crate::pptx::slide::Slide;
use std::rc::Rc;

/// The slides of a presentation, in document order.
///
/// Obtained from `Presentation::slides()`. The collection materializes its
/// slide entities lazily from the live identifier list and caches them
/// until the next structural mutation.
pub struct SlideCollection {
    pub(crate) core: Rc<DocumentCore>,
}

impl SlideCollection {
    /// Number of slides currently in the collection.
    pub fn count(&self) -> Result<usize> {
        self.materialize()?;
        Ok(self.core.slide_cache.borrow().as_ref().map_or(0, Vec::len))
    }

    /// Get the slide at a zero-based index.
    ///
    /// Fails with a range error when `index` is outside `[0, count)`.
    pub fn get(&self, index: usize) -> Result<Slide> {
        self.materialize()?;
        let cache = self.core.slide_cache.borrow();
        let slides = cache.as_ref().expect("materialized above");
        slides.get(index).cloned().ok_or(PptxError::IndexOutOfRange {
            index,
            count: slides.len(),
        })
    }

    /// Get the slide with the given numeric identifier.
    pub fn get_by_id(&self, slide_id: u32) -> Result<Slide> {
        self.materialize()?;
        let cache = self.core.slide_cache.borrow();
        let slides = cache.as_ref().expect("materialized above");
        slides
            .iter()
            .find(|s| s.id() == slide_id)
            .cloned()
            .ok_or(PptxError::Removed("slide"))
    }

    /// Iterate the slides in document order.
    ///
    /// The iterator is a snapshot of the cached entities; calling `iter`
    /// again restarts from the (possibly rebuilt) cache.
    pub fn iter(&self) -> Result<std::vec::IntoIter<Slide>> {
        self.materialize()?;
        let cache = self.core.slide_cache.borrow();
        Ok(cache.as_ref().expect("materialized above").clone().into_iter())
    }

    /// Remove a slide from the presentation.
    ///
    /// The slide must belong to this collection and must not already be
    /// removed. On success the slide's identifier is dropped from every
    /// section, every custom-show reference to it is purged, its part
    /// subtree is deleted from the package (layouts and masters are left
    /// behind even if now unused), and the handle is tombstoned.
    pub fn remove(&self, slide: &Slide) -> Result<()> {
        slide.ensure_live()?;
        if !self.owns(slide) {
            return Err(PptxError::NotInCollection);
        }

        // Resolve the identifier record by current position
        let record = {
            let ids = self.core.slide_ids.borrow();
            let index = ids
                .position_of(slide.id())
                .ok_or(PptxError::Removed("slide"))?;
            ids.get(index).expect("index from position_of").clone()
        };

        // Drop the slide from every section
        self.core.sections.borrow_mut().remove_slide_id(record.id);

        // Remove the identifier record from the live list
        self.core.slide_ids.borrow_mut().remove_by_id(record.id);

        // Purge custom-show references to the slide
        self.core
            .custom_shows
            .borrow_mut()
            .purge_slide_reference(&record.rel_id);

        // Delete the slide part and whatever becomes unreachable with it
        {
            let mut opc = self.core.opc.borrow_mut();
            let partname = opc.part_related_by(&self.core.pres_partname, &record.rel_id)?;
            opc.get_part_mut(&self.core.pres_partname)?
                .rels_mut()
                .remove(&record.rel_id);
            opc.delete_part_tree(&partname)?;
        }

        // Persist the identifier-list change into presentation.xml
        self.core.persist_presentation()?;

        // Tombstone the entity and drop cached views
        slide.mark_removed();
        self.core.mark_changed();

        Ok(())
    }

    /// Add a slide at the end of the collection.
    ///
    /// A slide from this presentation is duplicated; a slide from another
    /// presentation is imported together with its layout, master, and
    /// theme so the destination document stays internally consistent.
    ///
    /// Returns a handle to the newly created slide.
    pub fn add(&self, slide: &Slide) -> Result<Slide> {
        slide.ensure_live()?;
        let source_core = slide.core()?;

        if Rc::ptr_eq(&source_core, &self.core) {
            self.duplicate(slide)
        } else {
            self.import(slide, &source_core)
        }
    }

    /// Insert a slide at a 1-based position.
    ///
    /// Fails with a range error when `position` is outside
    /// `[1, count + 1]`, leaving the collection unmutated. Implemented as
    /// an add followed by relocating the appended identifier record; the
    /// identifier values themselves never change.
    pub fn insert(&self, position: usize, slide: &Slide) -> Result<Slide> {
        let count = self.count()?;
        if position < 1 || position > count + 1 {
            return Err(PptxError::PositionOutOfRange {
                position,
                max: count + 1,
            });
        }

        let added = self.add(slide)?;

        {
            let mut ids = self.core.slide_ids.borrow_mut();
            let from = ids.len() - 1;
            ids.relocate(from, position - 1);
        }
        self.core.persist_presentation()?;
        self.core.mark_changed();

        Ok(added)
    }

    /// Same-document path: deep-clone the slide part subtree.
    ///
    /// The clone re-links to the same layout part the original uses (no
    /// layout clone). Embedded charts, and the parts hanging off them
    /// like the embedded workbook, are deep-cloned and re-attached, so
    /// the duplicate's chart data is independent of the original's.
    /// Notes are not carried over.
    fn duplicate(&self, source: &Slide) -> Result<Slide> {
        let policy = ClonePolicy::new(CloneAction::Share)
            .deep(&[rt::CHART, rt::CHART_COLORS, rt::CHART_STYLE, rt::PACKAGE])
            .drop(&[rt::NOTES_SLIDE]);

        let outcome = self
            .core
            .opc
            .borrow_mut()
            .clone_part_tree(source.partname(), &policy)?;

        let new_slide = self.register_slide(&outcome.root)?;

        self.core.persist_presentation()?;
        self.core.mark_changed();
        Ok(new_slide)
    }

    /// Cross-document path: copy the slide part subtree into this
    /// document's store.
    ///
    /// Notes are deliberately not imported. The referenced layout, its
    /// master, and the master's theme come along; the master receives a
    /// fresh identifier, and afterwards every layout identifier across
    /// *all* masters is renumbered so layout identifiers stay unique
    /// presentation-wide.
    fn import(&self, source: &Slide, source_core: &Rc<DocumentCore>) -> Result<Slide> {
        let policy = ClonePolicy::new(CloneAction::Deep).drop(&[rt::NOTES_SLIDE]);

        let outcome = {
            let src_opc = source_core.opc.borrow();
            let mut opc = self.core.opc.borrow_mut();
            opc.import_part_tree(&src_opc, source.partname(), &policy)?
        };

        let new_slide = self.register_slide(&outcome.root)?;

        // Register the imported master under a fresh identifier
        let master_partname = {
            let opc = self.core.opc.borrow();
            let layout_partname = opc
                .get_part(&outcome.root)?
                .rels()
                .part_with_reltype(rt::SLIDE_LAYOUT)?
                .target_partname()?;
            opc.get_part(&layout_partname)?
                .rels()
                .part_with_reltype(rt::SLIDE_MASTER)?
                .target_partname()?
        };

        let master_rel_id = {
            let mut opc = self.core.opc.borrow_mut();
            let target = master_partname.relative_ref(self.core.pres_partname.base_uri());
            opc.get_part_mut(&self.core.pres_partname)?
                .rels_mut()
                .add_new(rt::SLIDE_MASTER, &target)
        };
        let master_id = {
            let mut ids = self.core.master_ids.borrow_mut();
            let id = ids.next_id();
            ids.push(IdRecord {
                id,
                rel_id: master_rel_id,
            });
            id
        };

        self.core.persist_presentation()?;

        // Layout identifiers must be unique presentation-wide, so the
        // renumbering pass walks every master, not only the imported one
        self.renumber_layout_ids(master_id)?;

        self.core.mark_changed();
        Ok(new_slide)
    }

    /// Link a freshly created slide part into the presentation: a new
    /// relationship plus an identifier record appended at the end.
    fn register_slide(&self, partname: &PackURI) -> Result<Slide> {
        let rel_id = {
            let mut opc = self.core.opc.borrow_mut();
            let target = partname.relative_ref(self.core.pres_partname.base_uri());
            opc.get_part_mut(&self.core.pres_partname)?
                .rels_mut()
                .add_new(rt::SLIDE, &target)
        };

        let slide_id = {
            let mut ids = self.core.slide_ids.borrow_mut();
            let id = ids.next_id();
            ids.push(IdRecord {
                id,
                rel_id: rel_id.clone(),
            });
            id
        };

        Ok(Slide::new(&self.core, partname.clone(), slide_id, rel_id))
    }

    /// Renumber the layout identifiers of every master, continuing upward
    /// from `start`, and persist each master part.
    fn renumber_layout_ids(&self, start: u32) -> Result<()> {
        use crate::pptx::ident::{IdList, IdListKind};

        let mut counter = start;
        let master_rel_ids: Vec<String> = self
            .core
            .master_ids
            .borrow()
            .iter()
            .map(|r| r.rel_id.clone())
            .collect();

        for rel_id in master_rel_ids {
            let partname = self.core.partname_for_rel(&rel_id)?;
            let blob = self.core.opc.borrow().get_part(&partname)?.blob().to_vec();

            let mut layout_ids = IdList::parse(&blob, IdListKind::SlideLayout)?;
            for record in layout_ids.iter_mut() {
                counter += 1;
                record.id = counter;
            }

            let rewritten = layout_ids.splice_into(&blob)?;
            self.core
                .opc
                .borrow_mut()
                .set_part_blob(&partname, rewritten)?;
        }

        Ok(())
    }

    /// Whether a slide handle belongs to this collection's document.
    fn owns(&self, slide: &Slide) -> bool {
        std::ptr::eq(slide.core.as_ptr(), Rc::as_ptr(&self.core))
    }

    /// Materialize the slide entities from the identifier list, one per
    /// record in document order. No-op when the cache is warm.
    fn materialize(&self) -> Result<()> {
        if self.core.slide_cache.borrow().is_some() {
            return Ok(());
        }

        let records: Vec<IdRecord> = self.core.slide_ids.borrow().iter().cloned().collect();
        let mut slides = Vec::with_capacity(records.len());
        for record in records {
            let partname = self.core.partname_for_rel(&record.rel_id)?;
            slides.push(Slide::new(&self.core, partname, record.id, record.rel_id));
        }

        *self.core.slide_cache.borrow_mut() = Some(slides);
        Ok(())
    }
}
