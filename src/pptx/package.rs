//! Package entry point for `.pptx` presentations.

use crate::opc::OpcPackage;
use crate::opc::constants::{MAX_PRESENTATION_SIZE, content_type as ct};
use crate::opc::pkgwriter::PackageWriter;
use crate::pptx::error::{PptxError, Result};
use crate::pptx::presentation::{DocumentCore, Presentation};
use std::io::{Read, Seek};
use std::path::Path;
use std::rc::Rc;

/// A PowerPoint (.pptx) package.
///
/// This is the main entry point for working with presentations. It wraps
/// an OPC package, verifies that the package actually is a presentation,
/// and hands out the `Presentation` object everything else derives from.
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
///
/// pkg.save("deck-out.pptx")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Package {
    core: Rc<DocumentCore>,
}

impl Package {
    /// Open a .pptx package from a file path.
    ///
    /// The file size is checked against `MAX_PRESENTATION_SIZE` before any
    /// content is parsed; oversized files are rejected up front.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let size = std::fs::metadata(path)?.len();
        if size > MAX_PRESENTATION_SIZE {
            return Err(PptxError::TooLarge {
                size,
                max: MAX_PRESENTATION_SIZE,
            });
        }

        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Open a .pptx package from a byte vector.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let size = bytes.len() as u64;
        if size > MAX_PRESENTATION_SIZE {
            return Err(PptxError::TooLarge {
                size,
                max: MAX_PRESENTATION_SIZE,
            });
        }

        let opc = OpcPackage::from_bytes(bytes)?;
        Self::from_opc(opc)
    }

    /// Open a .pptx package from a reader.
    pub fn from_reader<R: Read + Seek>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    /// Verify the package is a presentation and build the document core.
    fn from_opc(opc: OpcPackage) -> Result<Self> {
        let main_part = opc
            .main_document_part()
            .map_err(|e| PptxError::InvalidFormat(format!("no main presentation part: {}", e)))?;

        let content_type = main_part.content_type();
        // Support both regular and macro-enabled presentations
        if content_type != ct::PML_PRESENTATION_MAIN && content_type != ct::PML_PRES_MACRO_MAIN {
            return Err(PptxError::InvalidContentType {
                expected: format!("{} or {}", ct::PML_PRESENTATION_MAIN, ct::PML_PRES_MACRO_MAIN),
                got: content_type.to_string(),
            });
        }

        let core = DocumentCore::from_opc(opc)?;
        Ok(Self { core })
    }

    /// Get the presentation held by this package.
    pub fn presentation(&self) -> Presentation {
        Presentation {
            core: self.core.clone(),
        }
    }

    /// Save the package to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        PackageWriter::write(path, &self.core.opc.borrow())?;
        Ok(())
    }

    /// Save the package to a writer.
    pub fn save_to<W: std::io::Write>(&self, writer: W) -> Result<()> {
        PackageWriter::write_to_stream(writer, &self.core.opc.borrow())?;
        Ok(())
    }

    /// Serialize the package to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(PackageWriter::to_bytes(&self.core.opc.borrow())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pptx::testutil::TestDeck;

    #[test]
    fn test_open_minimal_deck() {
        let bytes = TestDeck::new(2).build();
        let pkg = Package::from_bytes(bytes).unwrap();
        let pres = pkg.presentation();

        assert_eq!(pres.slides().count().unwrap(), 2);
        assert_eq!(pres.slide_masters().unwrap().len(), 1);
        assert_eq!(pres.slide_size().unwrap(), Some((9144000, 6858000)));
    }

    #[test]
    fn test_not_a_presentation_rejected() {
        // A docx-shaped package: right structure, wrong content type
        let mut writer = crate::opc::phys_pkg::PhysPkgWriter::new();
        writer
            .write(
                &crate::opc::PackURI::new("/[Content_Types].xml").unwrap(),
                br#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#,
            )
            .unwrap();
        writer
            .write(
                &crate::opc::PackURI::new("/_rels/.rels").unwrap(),
                br#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#,
            )
            .unwrap();
        writer
            .write(
                &crate::opc::PackURI::new("/word/document.xml").unwrap(),
                b"<document/>",
            )
            .unwrap();
        let bytes = writer.finish().unwrap();

        assert!(matches!(
            Package::from_bytes(bytes),
            Err(PptxError::InvalidContentType { .. })
        ));
    }

    #[test]
    fn test_oversized_input_rejected_before_parsing() {
        // Not even a ZIP: the size gate must fire before any parsing
        let bytes = vec![0u8; (MAX_PRESENTATION_SIZE + 1) as usize];
        assert!(matches!(
            Package::from_bytes(bytes),
            Err(PptxError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_save_and_reopen_via_tempfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");

        let bytes = TestDeck::new(3).build();
        let pkg = Package::from_bytes(bytes).unwrap();
        pkg.save(&path).unwrap();

        let reopened = Package::open(&path).unwrap();
        assert_eq!(reopened.presentation().slides().count().unwrap(), 3);
    }
}
