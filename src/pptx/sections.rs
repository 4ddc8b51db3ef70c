//! Presentation sections.
//!
//! Sections are named groupings of slides stored in the presentation
//! part's extension list (`p14:sectionLst`). The registry here is the live
//! authority while a document is open: slide removals prune membership
//! through it, and the presentation part XML is rewritten from it on every
//! persist.
//!
//! A section that loses its last slide is NOT removed automatically;
//! dropping an empty section is an explicit caller decision via
//! `Sections::remove`.

use crate::pptx::error::{PptxError, Result};
use crate::pptx::presentation::DocumentCore;
use crate::pptx::slide::Slide;
use crate::pptx::xmlutil::attr_value;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::fmt::Write as FmtWrite;
use std::rc::{Rc, Weak};

/// One section in the registry: a name, a GUID-format ID, and the ordered
/// numeric IDs of its member slides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRecord {
    /// Display name, unique within the presentation
    pub name: String,
    /// Section ID (GUID format, e.g. `{12345678-...}`)
    pub id: String,
    /// Numeric slide IDs in section order
    pub slide_ids: Vec<u32>,
}

/// The section registry parsed from presentation XML.
#[derive(Debug, Clone, Default)]
pub struct SectionList {
    sections: Vec<SectionRecord>,
    /// Whether the source XML carried a `sectionLst` element at all
    in_xml: bool,
}

impl SectionList {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse sections from presentation XML.
    ///
    /// Looks for the `p14:sectionLst` element; a presentation without one
    /// yields an empty registry.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut sections = Vec::new();
        let mut in_xml = false;
        let mut current: Option<SectionRecord> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                    b"sectionLst" => in_xml = true,
                    b"section" => {
                        let name = attr_value(e, b"name", b"name").unwrap_or_default();
                        let id = attr_value(e, b"id", b"id").unwrap_or_default();
                        current = Some(SectionRecord {
                            name,
                            id,
                            slide_ids: Vec::new(),
                        });
                    }
                    _ => {}
                },
                Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                    b"sectionLst" => in_xml = true,
                    b"section" => {
                        // Self-closing section: no member list follows
                        let name = attr_value(e, b"name", b"name").unwrap_or_default();
                        let id = attr_value(e, b"id", b"id").unwrap_or_default();
                        sections.push(SectionRecord {
                            name,
                            id,
                            slide_ids: Vec::new(),
                        });
                    }
                    b"sldId" => {
                        if let Some(ref mut section) = current
                            && let Some(id) = attr_value(e, b"id", b"id")
                            && let Ok(id) = id.parse::<u32>()
                        {
                            section.slide_ids.push(id);
                        }
                    }
                    _ => {}
                },
                Ok(Event::End(ref e)) => {
                    if e.local_name().as_ref() == b"section"
                        && let Some(section) = current.take()
                    {
                        sections.push(section);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(PptxError::Xml(e.to_string())),
                _ => {}
            }
        }

        Ok(Self { sections, in_xml })
    }

    /// Whether the presentation XML carried a section list.
    pub fn is_in_xml(&self) -> bool {
        self.in_xml
    }

    /// Number of sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Check whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Iterate the sections in document order.
    pub fn iter(&self) -> impl Iterator<Item = &SectionRecord> {
        self.sections.iter()
    }

    /// Get a section by index.
    pub fn get(&self, index: usize) -> Option<&SectionRecord> {
        self.sections.get(index)
    }

    /// Get the section with exactly the given name.
    pub fn get_by_name(&self, name: &str) -> Result<&SectionRecord> {
        self.sections
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| PptxError::SectionNotFound(name.to_string()))
    }

    /// Get the section with the given GUID ID.
    pub fn get_by_id(&self, id: &str) -> Option<&SectionRecord> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Drop a slide ID from every section that contains it.
    ///
    /// Sections drained to zero members are left in place.
    pub fn remove_slide_id(&mut self, slide_id: u32) {
        for section in &mut self.sections {
            section.slide_ids.retain(|&id| id != slide_id);
        }
    }

    /// Remove a section outright, regardless of membership.
    pub fn remove_by_name(&mut self, name: &str) -> Result<SectionRecord> {
        let pos = self
            .sections
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| PptxError::SectionNotFound(name.to_string()))?;
        Ok(self.sections.remove(pos))
    }

    /// Generate the `p14:sectionLst` element for the presentation part.
    pub fn to_xml(&self) -> String {
        const P14_NS: &str = "http://schemas.microsoft.com/office/powerpoint/2010/main";

        if self.sections.is_empty() {
            return format!(r#"<p14:sectionLst xmlns:p14="{}"/>"#, P14_NS);
        }

        let mut xml = String::with_capacity(128 + self.sections.len() * 128);
        let _ = write!(xml, r#"<p14:sectionLst xmlns:p14="{}">"#, P14_NS);

        for section in &self.sections {
            let _ = write!(
                xml,
                r#"<p14:section name="{}" id="{}">"#,
                crate::opc::rel::escape_xml(&section.name),
                crate::opc::rel::escape_xml(&section.id)
            );
            xml.push_str("<p14:sldIdLst>");
            let mut buf = itoa::Buffer::new();
            for slide_id in &section.slide_ids {
                let _ = write!(xml, r#"<p14:sldId id="{}"/>"#, buf.format(*slide_id));
            }
            xml.push_str("</p14:sldIdLst>");
            xml.push_str("</p14:section>");
        }

        xml.push_str("</p14:sectionLst>");
        xml
    }
}

/// Handle to the section registry of an open presentation.
pub struct Sections {
    pub(crate) core: Rc<DocumentCore>,
}

impl Sections {
    /// Number of sections in the presentation.
    pub fn len(&self) -> usize {
        self.core.sections.borrow().len()
    }

    /// Check whether the presentation has any sections.
    pub fn is_empty(&self) -> bool {
        self.core.sections.borrow().is_empty()
    }

    /// Get a section handle by index.
    pub fn get(&self, index: usize) -> Result<Section> {
        let sections = self.core.sections.borrow();
        let record = sections.get(index).ok_or(PptxError::IndexOutOfRange {
            index,
            count: sections.len(),
        })?;
        Ok(Section {
            core: Rc::downgrade(&self.core),
            id: record.id.clone(),
            name: record.name.clone(),
        })
    }

    /// Get a section handle by exact name.
    ///
    /// Fails with a not-found error when no section has that name.
    pub fn get_by_name(&self, name: &str) -> Result<Section> {
        let sections = self.core.sections.borrow();
        let record = sections.get_by_name(name)?;
        Ok(Section {
            core: Rc::downgrade(&self.core),
            id: record.id.clone(),
            name: record.name.clone(),
        })
    }

    /// Remove a section from the registry outright, regardless of
    /// membership, and persist the presentation part.
    pub fn remove(&self, section: &Section) -> Result<()> {
        self.core
            .sections
            .borrow_mut()
            .remove_by_name(&section.name)?;
        self.core.persist_presentation()
    }
}

/// Handle to one section.
///
/// The handle re-reads the live registry on every access, so membership
/// changes made through the slide collection are immediately visible.
#[derive(Clone)]
pub struct Section {
    core: Weak<DocumentCore>,
    id: String,
    name: String,
}

impl Section {
    /// The section name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The section ID (GUID format).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The slides currently belonging to this section, in section order.
    pub fn slides(&self) -> Result<Vec<Slide>> {
        let core = self.core()?;
        let slide_ids: Vec<u32> = {
            let sections = core.sections.borrow();
            let record = sections
                .get_by_id(&self.id)
                .ok_or_else(|| PptxError::SectionNotFound(self.name.clone()))?;
            record.slide_ids.clone()
        };

        let collection = crate::pptx::slides::SlideCollection { core: core.clone() };
        slide_ids
            .into_iter()
            .map(|id| collection.get_by_id(id))
            .collect()
    }

    /// Number of slides currently in this section.
    pub fn slide_count(&self) -> Result<usize> {
        let core = self.core()?;
        let sections = core.sections.borrow();
        let record = sections
            .get_by_id(&self.id)
            .ok_or_else(|| PptxError::SectionNotFound(self.name.clone()))?;
        Ok(record.slide_ids.len())
    }

    fn core(&self) -> Result<Rc<DocumentCore>> {
        self.core.upgrade().ok_or(PptxError::Closed)
    }
}
