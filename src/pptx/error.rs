//! Error types for presentation-level operations.

use thiserror::Error;

/// Result type for presentation operations.
pub type Result<T> = std::result::Result<T, PptxError>;

/// Error types for presentation operations.
#[derive(Error, Debug)]
pub enum PptxError {
    /// Slide index outside `[0, count)`
    #[error("slide index {index} out of range, presentation has {count} slides")]
    IndexOutOfRange { index: usize, count: usize },

    /// Insert position outside `[1, count + 1]`
    #[error("insert position {position} out of range, valid positions are 1..={max}")]
    PositionOutOfRange { position: usize, max: usize },

    /// Section name lookup with no match
    #[error("no section named '{0}'")]
    SectionNotFound(String),

    /// Operation on an entity that has been structurally removed
    #[error("{0} was removed")]
    Removed(&'static str),

    /// A slide handle from a different presentation was passed where one of
    /// this presentation's slides was required
    #[error("slide does not belong to this presentation")]
    NotInCollection,

    /// Operation through a handle whose presentation has been dropped
    #[error("presentation is closed")]
    Closed,

    /// Presentation exceeds the configured maximum byte size
    #[error("presentation is {size} bytes, exceeding the {max} byte limit")]
    TooLarge { size: u64, max: u64 },

    /// Invalid content type for the main document part
    #[error("invalid content type: expected {expected}, got {got}")]
    InvalidContentType { expected: String, got: String },

    /// Malformed presentation content
    #[error("invalid presentation: {0}")]
    InvalidFormat(String),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// OPC package error
    #[error("OPC error: {0}")]
    Opc(#[from] crate::opc::error::OpcError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for PptxError {
    fn from(err: quick_xml::Error) -> Self {
        PptxError::Xml(err.to_string())
    }
}
