//! In-memory presentation fixtures for tests.
//!
//! Builds small but structurally complete `.pptx` archives: a master, a
//! layout, N slides, and optionally a chart, sections, and custom shows.
//! Enough surface for the mutation engine without any file on disk.

use crate::opc::packuri::PackURI;
use crate::opc::phys_pkg::PhysPkgWriter;
use std::fmt::Write as FmtWrite;

const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_C: &str = "http://schemas.openxmlformats.org/drawingml/2006/chart";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

pub(crate) struct TestDeck {
    slides: usize,
    chart_on: Option<usize>,
    sections: Vec<(String, Vec<usize>)>,
    custom_shows: Vec<(String, Vec<usize>)>,
}

impl TestDeck {
    pub(crate) fn new(slides: usize) -> Self {
        Self {
            slides,
            chart_on: None,
            sections: Vec::new(),
            custom_shows: Vec::new(),
        }
    }

    /// Put a chart (with cached values) on the slide at `index`.
    pub(crate) fn chart_on(mut self, index: usize) -> Self {
        self.chart_on = Some(index);
        self
    }

    /// Add a section containing the slides at the given indexes.
    pub(crate) fn section(mut self, name: &str, members: &[usize]) -> Self {
        self.sections.push((name.to_string(), members.to_vec()));
        self
    }

    /// Add a custom show containing the slides at the given indexes.
    pub(crate) fn custom_show(mut self, name: &str, members: &[usize]) -> Self {
        self.custom_shows.push((name.to_string(), members.to_vec()));
        self
    }

    /// Numeric slide ID of the slide at `index`.
    pub(crate) fn slide_id(index: usize) -> u32 {
        256 + index as u32
    }

    /// Relationship ID of the slide at `index` on the presentation part.
    pub(crate) fn slide_rel_id(index: usize) -> String {
        format!("rId{}", index + 2)
    }

    /// Serialize the deck to `.pptx` bytes.
    pub(crate) fn build(self) -> Vec<u8> {
        let mut writer = PhysPkgWriter::new();
        let put = |writer: &mut PhysPkgWriter, name: &str, content: &str| {
            writer
                .write(&PackURI::new(name).unwrap(), content.as_bytes())
                .unwrap();
        };

        put(&mut writer, "/[Content_Types].xml", &self.content_types());
        put(
            &mut writer,
            "/_rels/.rels",
            &format!(
                r#"<?xml version="1.0"?><Relationships xmlns="{NS_REL}"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#
            ),
        );
        put(&mut writer, "/ppt/presentation.xml", &self.presentation_xml());
        put(
            &mut writer,
            "/ppt/_rels/presentation.xml.rels",
            &self.presentation_rels(),
        );

        for i in 0..self.slides {
            put(
                &mut writer,
                &format!("/ppt/slides/slide{}.xml", i + 1),
                &self.slide_xml(i),
            );
            put(
                &mut writer,
                &format!("/ppt/slides/_rels/slide{}.xml.rels", i + 1),
                &self.slide_rels(i),
            );
        }

        if self.chart_on.is_some() {
            put(&mut writer, "/ppt/charts/chart1.xml", &chart_xml("42"));
        }

        put(
            &mut writer,
            "/ppt/slideLayouts/slideLayout1.xml",
            &format!(
                r#"<?xml version="1.0"?><p:sldLayout xmlns:p="{NS_P}" xmlns:a="{NS_A}" xmlns:r="{NS_R}"><p:cSld name="Title Layout"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree></p:cSld></p:sldLayout>"#
            ),
        );
        put(
            &mut writer,
            "/ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            &format!(
                r#"<?xml version="1.0"?><Relationships xmlns="{NS_REL}"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="../slideMasters/slideMaster1.xml"/></Relationships>"#
            ),
        );

        put(
            &mut writer,
            "/ppt/slideMasters/slideMaster1.xml",
            &format!(
                r#"<?xml version="1.0"?><p:sldMaster xmlns:p="{NS_P}" xmlns:a="{NS_A}" xmlns:r="{NS_R}"><p:cSld name="Office Master"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree></p:cSld><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#
            ),
        );
        put(
            &mut writer,
            "/ppt/slideMasters/_rels/slideMaster1.xml.rels",
            &format!(
                r#"<?xml version="1.0"?><Relationships xmlns="{NS_REL}"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/></Relationships>"#
            ),
        );

        writer.finish().unwrap()
    }

    fn content_types(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
        xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
        xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
        xml.push_str(r#"<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>"#);
        for i in 0..self.slides {
            let _ = write!(
                xml,
                r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
                i + 1
            );
        }
        xml.push_str(r#"<Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>"#);
        xml.push_str(r#"<Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>"#);
        if self.chart_on.is_some() {
            xml.push_str(r#"<Override PartName="/ppt/charts/chart1.xml" ContentType="application/vnd.openxmlformats-officedocument.drawingml.chart+xml"/>"#);
        }
        xml.push_str("</Types>");
        xml
    }

    fn presentation_xml(&self) -> String {
        let mut xml = String::new();
        let _ = write!(
            xml,
            r#"<?xml version="1.0"?><p:presentation xmlns:p="{NS_P}" xmlns:r="{NS_R}">"#
        );
        xml.push_str(
            r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#,
        );

        xml.push_str("<p:sldIdLst>");
        for i in 0..self.slides {
            let _ = write!(
                xml,
                r#"<p:sldId id="{}" r:id="{}"/>"#,
                Self::slide_id(i),
                Self::slide_rel_id(i)
            );
        }
        xml.push_str("</p:sldIdLst>");

        xml.push_str(r#"<p:sldSz cx="9144000" cy="6858000"/>"#);

        if !self.custom_shows.is_empty() {
            xml.push_str("<p:custShowLst>");
            for (show_id, (name, members)) in self.custom_shows.iter().enumerate() {
                let _ = write!(xml, r#"<p:custShow name="{}" id="{}">"#, name, show_id);
                xml.push_str("<p:sldLst>");
                for &index in members {
                    let _ = write!(xml, r#"<p:sld r:id="{}"/>"#, Self::slide_rel_id(index));
                }
                xml.push_str("</p:sldLst></p:custShow>");
            }
            xml.push_str("</p:custShowLst>");
        }

        if !self.sections.is_empty() {
            xml.push_str(r#"<p:extLst><p:ext uri="{521415D9-36F7-43E2-AB2F-B90AF26B5E84}">"#);
            xml.push_str(r#"<p14:sectionLst xmlns:p14="http://schemas.microsoft.com/office/powerpoint/2010/main">"#);
            for (n, (name, members)) in self.sections.iter().enumerate() {
                let _ = write!(
                    xml,
                    r#"<p14:section name="{}" id="{{00000000-0000-0000-0000-{:012}}}">"#,
                    name,
                    n + 1
                );
                xml.push_str("<p14:sldIdLst>");
                for &index in members {
                    let _ = write!(xml, r#"<p14:sldId id="{}"/>"#, Self::slide_id(index));
                }
                xml.push_str("</p14:sldIdLst></p14:section>");
            }
            xml.push_str("</p14:sectionLst></p:ext></p:extLst>");
        }

        xml.push_str("</p:presentation>");
        xml
    }

    fn presentation_rels(&self) -> String {
        let mut xml = String::new();
        let _ = write!(xml, r#"<?xml version="1.0"?><Relationships xmlns="{NS_REL}">"#);
        xml.push_str(r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>"#);
        for i in 0..self.slides {
            let _ = write!(
                xml,
                r#"<Relationship Id="{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{}.xml"/>"#,
                Self::slide_rel_id(i),
                i + 1
            );
        }
        xml.push_str("</Relationships>");
        xml
    }

    fn slide_xml(&self, index: usize) -> String {
        let n = index + 1;
        let mut xml = String::new();
        let _ = write!(
            xml,
            r#"<?xml version="1.0"?><p:sld xmlns:p="{NS_P}" xmlns:a="{NS_A}" xmlns:r="{NS_R}"><p:cSld name="Slide {n}"><p:spTree>"#
        );
        xml.push_str(r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#);
        let _ = write!(
            xml,
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title {n}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:t>Slide {n} title</a:t></a:r></a:p></p:txBody></p:sp>"#
        );
        if self.chart_on == Some(index) {
            let _ = write!(
                xml,
                r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="7" name="Chart 1"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><a:graphic><a:graphicData uri="{NS_C}"><c:chart xmlns:c="{NS_C}" r:id="rId2"/></a:graphicData></a:graphic></p:graphicFrame>"#
            );
        }
        xml.push_str("</p:spTree></p:cSld></p:sld>");
        xml
    }

    fn slide_rels(&self, index: usize) -> String {
        let mut xml = String::new();
        let _ = write!(xml, r#"<?xml version="1.0"?><Relationships xmlns="{NS_REL}">"#);
        xml.push_str(r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>"#);
        if self.chart_on == Some(index) {
            xml.push_str(r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart" Target="../charts/chart1.xml"/>"#);
        }
        xml.push_str("</Relationships>");
        xml
    }
}

/// Chart-space XML with a single cached value.
pub(crate) fn chart_xml(value: &str) -> String {
    format!(
        r#"<?xml version="1.0"?><c:chartSpace xmlns:c="{NS_C}"><c:chart><c:plotArea><c:barChart><c:ser><c:idx val="0"/><c:val><c:numCache><c:pt idx="0"><c:v>{value}</c:v></c:pt></c:numCache></c:val></c:ser></c:barChart></c:plotArea></c:chart></c:chartSpace>"#
    )
}
