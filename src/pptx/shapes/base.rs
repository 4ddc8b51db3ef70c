//! Base shape type and shape-tree parsing.

use crate::opc::constants::relationship_type as rt;
use crate::pptx::error::{PptxError, Result};
use crate::pptx::master::{SlideLayout, SlideMaster};
use crate::pptx::shapes::factory::{create_shape, is_shape_tag};
use crate::pptx::slide::{EntityState, Slide};
use crate::pptx::xmlutil::attr_value;
use memchr::memmem;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::cell::Cell;

/// Element name used to stash caller-defined custom data inside a shape.
const CUSTOM_DATA_TAG: &str = "ctd";

/// The kind of a shape-tree element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// Text and geometry shape (`p:sp`)
    AutoShape,
    /// Picture (`p:pic`)
    Picture,
    /// Table or chart container (`p:graphicFrame`)
    GraphicFrame,
    /// Group of shapes (`p:grpSp`)
    GroupShape,
    /// Connector (`p:cxnSp`)
    Connector,
}

/// The entity a shape belongs to: a slide, a slide layout, or a slide
/// master.
///
/// Removal guards and master resolution go through this variant instead of
/// downcasting: `nearest_master` maps any owner to the nearest slide-like
/// owner's master.
#[derive(Clone)]
pub enum ShapeOwner {
    Slide(Slide),
    Layout(SlideLayout),
    Master(SlideMaster),
}

impl ShapeOwner {
    /// Check the owner's removal state.
    ///
    /// Layouts and masters are never structurally removed, so only the
    /// slide variant can fail here.
    pub(crate) fn ensure_live(&self) -> Result<()> {
        match self {
            ShapeOwner::Slide(slide) => slide.ensure_live(),
            ShapeOwner::Layout(_) | ShapeOwner::Master(_) => Ok(()),
        }
    }

    /// Resolve the slide master governing this owner.
    ///
    /// Slide → its layout's master; layout → its master; master → itself.
    pub fn nearest_master(&self) -> Result<SlideMaster> {
        match self {
            ShapeOwner::Slide(slide) => {
                let core = slide.core()?;
                let layout_partname = slide.layout_partname()?;
                let master_partname = {
                    let opc = core.opc.borrow();
                    opc.get_part(&layout_partname)?
                        .rels()
                        .part_with_reltype(rt::SLIDE_MASTER)?
                        .target_partname()?
                };
                SlideMaster::by_partname(&core, &master_partname)
            }
            ShapeOwner::Layout(layout) => layout.master(),
            ShapeOwner::Master(master) => Ok(master.clone()),
        }
    }

    /// Replace the owning part's blob, for shape-level mutations.
    fn set_blob(&self, blob: Vec<u8>) -> Result<()> {
        let (core, partname) = match self {
            ShapeOwner::Slide(slide) => (slide.core()?, slide.partname().clone()),
            ShapeOwner::Layout(layout) => (layout.core()?, layout.partname().clone()),
            ShapeOwner::Master(master) => (master.core()?, master.partname().clone()),
        };
        core.opc.borrow_mut().set_part_blob(&partname, blob)?;
        Ok(())
    }

    fn blob(&self) -> Result<Vec<u8>> {
        match self {
            ShapeOwner::Slide(slide) => slide.blob(),
            ShapeOwner::Layout(layout) => layout.blob(),
            ShapeOwner::Master(master) => master.blob(),
        }
    }
}

/// One shape parsed from a shape tree.
pub struct Shape {
    owner: ShapeOwner,
    kind: ShapeKind,
    /// The shape's XML subtree as captured from the owning part
    xml: Vec<u8>,
    state: Cell<EntityState>,
}

impl Shape {
    pub(crate) fn new(owner: ShapeOwner, kind: ShapeKind, xml: Vec<u8>) -> Self {
        Self {
            owner,
            kind,
            xml,
            state: Cell::new(EntityState::Live),
        }
    }

    /// The shape kind.
    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// The owning entity.
    #[inline]
    pub fn owner(&self) -> &ShapeOwner {
        &self.owner
    }

    /// Guard: the shape itself and its owner must both be live.
    fn ensure_live(&self) -> Result<()> {
        if self.state.get() == EntityState::Removed {
            return Err(PptxError::Removed("shape"));
        }
        self.owner.ensure_live()
    }

    /// The shape identifier from its non-visual drawing properties.
    pub fn id(&self) -> Result<u32> {
        self.ensure_live()?;
        self.cnvpr_attr("id")?
            .and_then(|v| v.parse::<u32>().ok())
            .ok_or_else(|| PptxError::InvalidFormat("shape without numeric id".into()))
    }

    /// The shape name from its non-visual drawing properties.
    pub fn name(&self) -> Result<String> {
        self.ensure_live()?;
        Ok(self.cnvpr_attr("name")?.unwrap_or_default())
    }

    /// Whether the shape is hidden.
    pub fn hidden(&self) -> Result<bool> {
        self.ensure_live()?;
        Ok(matches!(
            self.cnvpr_attr("hidden")?.as_deref(),
            Some("1") | Some("true")
        ))
    }

    /// Extract the text runs of this shape.
    pub fn text(&self) -> Result<String> {
        self.ensure_live()?;

        let mut reader = Reader::from_reader(self.xml.as_slice());
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

    /// Caller-defined custom data previously stored on this shape, if any.
    pub fn custom_data(&self) -> Result<Option<String>> {
        self.ensure_live()?;

        let open = format!("<{}>", CUSTOM_DATA_TAG);
        let close = format!("</{}>", CUSTOM_DATA_TAG);
        let Some(start) = memmem::find(&self.xml, open.as_bytes()) else {
            return Ok(None);
        };
        let value_start = start + open.len();
        let Some(end) = memmem::find(&self.xml[value_start..], close.as_bytes()) else {
            return Ok(None);
        };
        let value = std::str::from_utf8(&self.xml[value_start..value_start + end])
            .map_err(|e| PptxError::Xml(e.to_string()))?;
        Ok(Some(value.to_string()))
    }

    /// Store caller-defined custom data on this shape.
    ///
    /// The value is written into the owning part, so it survives a save
    /// and reopen. The shape is located in the part by its identifier.
    pub fn set_custom_data(&mut self, value: &str) -> Result<()> {
        self.ensure_live()?;
        let id = self.id()?;

        let element = format!(
            "<{tag}>{value}</{tag}>",
            tag = CUSTOM_DATA_TAG,
            value = crate::opc::rel::escape_xml(value)
        );

        // Rewrite the owning part
        let blob = self.owner.blob()?;
        let span = shape_span_by_id(&blob, id)?.ok_or_else(|| {
            PptxError::InvalidFormat(format!("shape {} not found in owning part", id))
        })?;
        let updated = insert_before_end_tag(&blob, span, &element)?;
        self.owner.set_blob(updated)?;

        // Keep the local snapshot in step
        let len = self.xml.len();
        self.xml = insert_before_end_tag(&self.xml, (0, len), &element)?;
        Ok(())
    }

    /// Read an attribute of the first `cNvPr` element in this shape.
    fn cnvpr_attr(&self, attr: &str) -> Result<Option<String>> {
        let mut reader = Reader::from_reader(self.xml.as_slice());
        reader.config_mut().trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    if e.local_name().as_ref() == b"cNvPr" {
                        return Ok(attr_value(e, attr.as_bytes(), attr.as_bytes()));
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

/// Parse the top-level shapes of a part's `p:spTree`.
///
/// Children of group shapes are captured inside their group's subtree, not
/// as separate shapes.
pub(crate) fn parse_shapes(owner: ShapeOwner, xml: &[u8]) -> Result<Vec<Shape>> {
    owner.ensure_live()?;

    let mut reader = Reader::from_reader(xml);

    let mut shapes = Vec::new();
    let mut in_sp_tree = false;
    // (start offset, element tag) of the shape subtree being captured
    let mut capture: Option<(usize, Vec<u8>)> = None;
    let mut depth = 0usize;

    loop {
        let pos_before = reader.buffer_position() as usize;
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if capture.is_some() {
                    depth += 1;
                } else if in_sp_tree && is_shape_tag(e.local_name().as_ref()) {
                    capture = Some((pos_before, e.local_name().as_ref().to_vec()));
                    depth = 1;
                } else if e.local_name().as_ref() == b"spTree" {
                    in_sp_tree = true;
                }
            }
            Ok(Event::End(ref e)) => {
                if capture.is_some() {
                    depth -= 1;
                    if depth == 0 {
                        let (start, tag) = capture.take().unwrap();
                        let end = reader.buffer_position() as usize;
                        if let Some(shape) =
                            create_shape(&tag, owner.clone(), xml[start..end].to_vec())
                        {
                            shapes.push(shape);
                        }
                    }
                } else if e.local_name().as_ref() == b"spTree" {
                    in_sp_tree = false;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(PptxError::Xml(e.to_string())),
            _ => {}
        }
    }

    Ok(shapes)
}

/// Byte span of the top-level shape element carrying the given id.
fn shape_span_by_id(xml: &[u8], id: u32) -> Result<Option<(usize, usize)>> {
    let mut reader = Reader::from_reader(xml);

    let mut in_sp_tree = false;
    let mut capture: Option<(usize, bool)> = None; // (start, id matched)
    let mut depth = 0usize;

    loop {
        let pos_before = reader.buffer_position() as usize;
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if capture.is_some() {
                    depth += 1;
                    if e.local_name().as_ref() == b"cNvPr"
                        && cnvpr_id(e) == Some(id)
                        && let Some((_, matched)) = capture.as_mut()
                    {
                        *matched = true;
                    }
                } else if in_sp_tree && is_shape_tag(e.local_name().as_ref()) {
                    capture = Some((pos_before, false));
                    depth = 1;
                } else if e.local_name().as_ref() == b"spTree" {
                    in_sp_tree = true;
                }
            }
            Ok(Event::Empty(ref e)) => {
                if e.local_name().as_ref() == b"cNvPr"
                    && cnvpr_id(e) == Some(id)
                    && let Some((_, matched)) = capture.as_mut()
                {
                    *matched = true;
                }
            }
            Ok(Event::End(_)) => {
                if let Some((start, matched)) = capture {
                    depth -= 1;
                    if depth == 0 {
                        let end = reader.buffer_position() as usize;
                        if matched {
                            return Ok(Some((start, end)));
                        }
                        capture = None;
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(PptxError::Xml(e.to_string())),
            _ => {}
        }
    }

    Ok(None)
}

/// Numeric id attribute of a `cNvPr` tag.
fn cnvpr_id(e: &quick_xml::events::BytesStart<'_>) -> Option<u32> {
    attr_value(e, b"id", b"id").and_then(|v| v.parse::<u32>().ok())
}

/// Insert `element` immediately before the closing tag of the element
/// spanning `span` in `xml`.
fn insert_before_end_tag(xml: &[u8], span: (usize, usize), element: &str) -> Result<Vec<u8>> {
    let (start, end) = span;
    let slice = &xml[start..end];
    let close_at = memmem::rfind(slice, b"</").ok_or_else(|| {
        PptxError::InvalidFormat("shape element has no closing tag to insert before".into())
    })?;

    let insert_at = start + close_at;
    let mut out = Vec::with_capacity(xml.len() + element.len());
    out.extend_from_slice(&xml[..insert_at]);
    out.extend_from_slice(element.as_bytes());
    out.extend_from_slice(&xml[insert_at..]);
    Ok(out)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pptx::Package;
    use crate::pptx::testutil::TestDeck;

    pub(crate) fn slide_owner_for_tests() -> ShapeOwner {
        let bytes = TestDeck::new(1).build();
        let pkg = Package::from_bytes(bytes).unwrap();
        let slide = pkg.presentation().slides().get(0).unwrap();
        ShapeOwner::Slide(slide)
    }

    #[test]
    fn test_parse_shapes_top_level_only() {
        let xml = br#"<p:sld><p:cSld><p:spTree>
            <p:nvGrpSpPr><p:cNvPr id="1" name=""/></p:nvGrpSpPr>
            <p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/></p:nvSpPr><p:txBody><a:p><a:r><a:t>Hello</a:t></a:r></a:p></p:txBody></p:sp>
            <p:grpSp><p:nvGrpSpPr><p:cNvPr id="3" name="Group 1"/></p:nvGrpSpPr><p:sp><p:nvSpPr><p:cNvPr id="4" name="Inner"/></p:nvSpPr></p:sp></p:grpSp>
            <p:pic><p:nvPicPr><p:cNvPr id="5" name="Picture 1" hidden="1"/></p:nvPicPr></p:pic>
            </p:spTree></p:cSld></p:sld>"#;

        let shapes = parse_shapes(slide_owner_for_tests(), xml).unwrap();
        assert_eq!(shapes.len(), 3);
        assert_eq!(shapes[0].kind(), ShapeKind::AutoShape);
        assert_eq!(shapes[1].kind(), ShapeKind::GroupShape);
        assert_eq!(shapes[2].kind(), ShapeKind::Picture);

        assert_eq!(shapes[0].id().unwrap(), 2);
        assert_eq!(shapes[0].name().unwrap(), "Title 1");
        assert_eq!(shapes[0].text().unwrap(), "Hello");
        assert!(!shapes[0].hidden().unwrap());

        // The group captured its inner shape, id comes from the group
        assert_eq!(shapes[1].id().unwrap(), 3);

        assert!(shapes[2].hidden().unwrap());
    }

    #[test]
    fn test_shape_of_removed_slide_fails() {
        let bytes = TestDeck::new(2).build();
        let pkg = Package::from_bytes(bytes).unwrap();
        let pres = pkg.presentation();

        let slide = pres.slides().get(0).unwrap();
        let mut shapes = slide.shapes().unwrap();
        assert!(!shapes.is_empty());

        pres.slides().remove(&slide).unwrap();

        let shape = &mut shapes[0];
        assert!(matches!(shape.name(), Err(PptxError::Removed(_))));
        assert!(matches!(
            shape.set_custom_data("x"),
            Err(PptxError::Removed(_))
        ));
    }

    #[test]
    fn test_custom_data_round_trip() {
        let bytes = TestDeck::new(1).build();
        let pkg = Package::from_bytes(bytes).unwrap();
        let pres = pkg.presentation();

        let slide = pres.slides().get(0).unwrap();
        let mut shapes = slide.shapes().unwrap();
        let shape = &mut shapes[0];

        assert_eq!(shape.custom_data().unwrap(), None);
        shape.set_custom_data("marker-42").unwrap();
        assert_eq!(shape.custom_data().unwrap().as_deref(), Some("marker-42"));

        // Survives a save and reopen
        let saved = pkg.to_bytes().unwrap();
        let reopened = Package::from_bytes(saved).unwrap();
        let shapes = reopened.presentation().slides().get(0).unwrap().shapes().unwrap();
        assert_eq!(shapes[0].custom_data().unwrap().as_deref(), Some("marker-42"));
    }

    #[test]
    fn test_nearest_master_from_slide() {
        let bytes = TestDeck::new(1).build();
        let pkg = Package::from_bytes(bytes).unwrap();
        let pres = pkg.presentation();

        let slide = pres.slides().get(0).unwrap();
        let shapes = slide.shapes().unwrap();
        let master = shapes[0].owner().nearest_master().unwrap();

        let masters = pres.slide_masters().unwrap();
        assert_eq!(master.id(), masters[0].id());
    }
}
