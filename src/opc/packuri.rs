//! Provides the PackURI value type for working with package part names.
//!
//! A PackURI represents a part name within an OPC package, following the URI
//! format defined by the Open Packaging Conventions specification. PackURIs
//! always begin with a forward slash and use forward slashes as path
//! separators.

/// The pseudo-partname of the package itself.
pub const PACKAGE_URI: &str = "/";

/// The partname of the content types stream.
pub const CONTENT_TYPES_URI: &str = "/[Content_Types].xml";

/// A part name within an OPC package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackURI {
    /// The full pack URI string (e.g., "/ppt/slides/slide1.xml")
    uri: String,
}

impl PackURI {
    /// Create a new PackURI from a string.
    ///
    /// Fails when the URI does not begin with a forward slash.
    pub fn new<S: Into<String>>(uri: S) -> Result<Self, String> {
        let uri = uri.into();
        if !uri.starts_with('/') {
            return Err(format!("PackURI must begin with slash, got '{}'", uri));
        }
        Ok(PackURI { uri })
    }

    /// Create a PackURI from a relative reference and a base URI.
    ///
    /// This translates a relative reference (like "../slideLayouts/slideLayout1.xml")
    /// onto a base URI (like "/ppt/slides") to produce an absolute PackURI
    /// (like "/ppt/slideLayouts/slideLayout1.xml").
    pub fn from_rel_ref(base_uri: &str, relative_ref: &str) -> Result<Self, String> {
        let joined = Self::join_paths(base_uri, relative_ref);
        let normalized = Self::normalize_path(&joined);
        Self::new(normalized)
    }

    /// Get the base URI (directory portion) of this PackURI.
    ///
    /// For example, "/ppt/slides" for "/ppt/slides/slide1.xml".
    /// For the package pseudo-partname "/", returns "/".
    pub fn base_uri(&self) -> &str {
        if self.uri == "/" {
            return "/";
        }

        match self.uri.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.uri[..pos],
        }
    }

    /// Get the filename portion of this PackURI.
    ///
    /// For example, "slide1.xml" for "/ppt/slides/slide1.xml".
    pub fn filename(&self) -> &str {
        match self.uri.rfind('/') {
            Some(pos) => &self.uri[pos + 1..],
            None => "",
        }
    }

    /// Get the extension portion of this PackURI, without the leading period.
    ///
    /// For example, "xml" for "/ppt/presentation.xml".
    pub fn ext(&self) -> &str {
        let filename = self.filename();
        match filename.rfind('.') {
            Some(pos) => &filename[pos + 1..],
            None => "",
        }
    }

    /// Get the membername (URI with leading slash stripped).
    ///
    /// This is the form used as the ZIP member name for the package item.
    /// Returns an empty string for the package pseudo-partname "/".
    pub fn membername(&self) -> &str {
        if self.uri == "/" { "" } else { &self.uri[1..] }
    }

    /// Get the URI of the relationships item corresponding to this partname.
    ///
    /// For "/ppt/presentation.xml" this is "/ppt/_rels/presentation.xml.rels";
    /// for the package pseudo-partname "/" it is "/_rels/.rels".
    pub fn rels_uri(&self) -> Result<PackURI, String> {
        let rels_name = format!("{}.rels", self.filename());
        let base = self.base_uri();
        if base == "/" {
            Self::new(format!("/_rels/{}", rels_name))
        } else {
            Self::new(format!("{}/_rels/{}", base, rels_name))
        }
    }

    /// Compute the relative reference from a base URI to this partname.
    ///
    /// Inverse of `from_rel_ref`: produces the shortest "../"-prefixed
    /// reference that resolves back to this URI from `base_uri`.
    pub fn relative_ref(&self, base_uri: &str) -> String {
        if base_uri == "/" {
            return self.uri[1..].to_string();
        }

        let base_segments: Vec<&str> = base_uri.split('/').filter(|s| !s.is_empty()).collect();
        let uri_segments: Vec<&str> = self.uri.split('/').filter(|s| !s.is_empty()).collect();

        // Length of the common directory prefix
        let mut common = 0;
        while common < base_segments.len()
            && common + 1 < uri_segments.len()
            && base_segments[common] == uri_segments[common]
        {
            common += 1;
        }

        let mut parts = Vec::new();
        for _ in common..base_segments.len() {
            parts.push("..");
        }
        parts.extend(&uri_segments[common..]);
        parts.join("/")
    }

    /// Get the URI as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    /// Join a base URI and a relative reference with a slash.
    fn join_paths(base_uri: &str, relative_ref: &str) -> String {
        if base_uri.ends_with('/') {
            format!("{}{}", base_uri, relative_ref)
        } else {
            format!("{}/{}", base_uri, relative_ref)
        }
    }

    /// Normalize "." and ".." segments out of a path.
    fn normalize_path(path: &str) -> String {
        let mut segments: Vec<&str> = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }
        format!("/{}", segments.join("/"))
    }
}

impl std::fmt::Display for PackURI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_leading_slash() {
        assert!(PackURI::new("/ppt/presentation.xml").is_ok());
        assert!(PackURI::new("ppt/presentation.xml").is_err());
    }

    #[test]
    fn test_from_rel_ref() {
        let uri = PackURI::from_rel_ref("/ppt/slides", "../slideLayouts/slideLayout1.xml").unwrap();
        assert_eq!(uri.as_str(), "/ppt/slideLayouts/slideLayout1.xml");

        let uri = PackURI::from_rel_ref("/", "ppt/presentation.xml").unwrap();
        assert_eq!(uri.as_str(), "/ppt/presentation.xml");
    }

    #[test]
    fn test_accessors() {
        let uri = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        assert_eq!(uri.base_uri(), "/ppt/slides");
        assert_eq!(uri.filename(), "slide1.xml");
        assert_eq!(uri.ext(), "xml");
        assert_eq!(uri.membername(), "ppt/slides/slide1.xml");
    }

    #[test]
    fn test_rels_uri() {
        let uri = PackURI::new("/ppt/presentation.xml").unwrap();
        assert_eq!(
            uri.rels_uri().unwrap().as_str(),
            "/ppt/_rels/presentation.xml.rels"
        );

        let pkg = PackURI::new(PACKAGE_URI).unwrap();
        assert_eq!(pkg.rels_uri().unwrap().as_str(), "/_rels/.rels");
    }

    #[test]
    fn test_relative_ref() {
        let uri = PackURI::new("/ppt/slideLayouts/slideLayout1.xml").unwrap();
        assert_eq!(
            uri.relative_ref("/ppt/slides"),
            "../slideLayouts/slideLayout1.xml"
        );
        assert_eq!(
            uri.relative_ref("/ppt/slideLayouts"),
            "slideLayout1.xml"
        );
        assert_eq!(uri.relative_ref("/"), "ppt/slideLayouts/slideLayout1.xml");
    }
}
