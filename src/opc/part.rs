//! Package parts.
//!
//! Parts are the fundamental units of content in an OPC package. Each part
//! has a unique partname (PackURI), a content type, binary content, and may
//! have relationships to other parts.
//!
//! The part here is a single blob-backed type rather than an XML/binary
//! split: the mutation engine replaces part content wholesale after each
//! structural edit, so there is nothing to gain from caching parsed XML
//! inside the part itself.

use crate::opc::packuri::PackURI;
use crate::opc::rel::Relationships;
use memchr::memmem;

/// A part in an OPC package.
#[derive(Debug, Clone)]
pub struct Part {
    /// The partname (URI) of this part
    partname: PackURI,

    /// The content type of this part
    content_type: String,

    /// The binary content of this part
    blob: Vec<u8>,

    /// Relationships from this part to other parts
    rels: Relationships,
}

impl Part {
    /// Create a new part.
    pub fn new(partname: PackURI, content_type: String, blob: Vec<u8>) -> Self {
        let rels = Relationships::new(partname.base_uri().to_string());
        Self {
            partname,
            content_type,
            blob,
            rels,
        }
    }

    /// Get the partname of this part.
    #[inline]
    pub fn partname(&self) -> &PackURI {
        &self.partname
    }

    /// Get the content type of this part.
    #[inline]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Check whether this part holds XML content, judged by content type.
    #[inline]
    pub fn is_xml(&self) -> bool {
        self.content_type.ends_with("+xml") || self.content_type.ends_with("/xml")
    }

    /// Get the binary content of this part.
    #[inline]
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// Replace the binary content of this part.
    ///
    /// This is how structural edits to part XML become durable in the
    /// in-memory part graph; the package writer later serializes whatever
    /// blob is current.
    #[inline]
    pub fn set_blob(&mut self, blob: Vec<u8>) {
        self.blob = blob;
    }

    /// Get the relationships for this part.
    #[inline]
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    /// Get mutable access to the relationships for this part.
    #[inline]
    pub fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    /// Add or get a relationship to another part, returning its rId.
    pub fn relate_to(&mut self, target_ref: &str, reltype: &str) -> String {
        let rel = self.rels.get_or_add(reltype, target_ref);
        rel.r_id().to_string()
    }

    /// Count references to a relationship ID in the part content.
    ///
    /// Scans for `r:id="rIdN"` attribute references at the byte level.
    pub fn rel_ref_count(&self, r_id: &str) -> usize {
        let pattern = format!(r#"r:id="{}""#, r_id);
        let finder = memmem::Finder::new(pattern.as_bytes());
        finder.find_iter(&self.blob).count()
    }
}
