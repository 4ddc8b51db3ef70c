//! PowerPoint (.pptx) presentation support.
//!
//! This module provides the document model over the OPC layer:
//!
//! - `Package`: the overall .pptx file package (open, save)
//! - `Presentation`: the main presentation API
//! - `SlideCollection` / `Slide`: the slide set and its mutation engine
//! - `Sections` / `Section`: named slide groupings
//! - `SlideMaster` / `SlideLayout`: the layout hierarchy
//! - shapes: the shape trees of slides, layouts, and masters

pub mod customshow;
pub mod error;
pub mod ident;
pub mod master;
pub mod package;
pub mod presentation;
pub mod sections;
pub mod shapes;
pub mod slide;
pub mod slides;
mod xmlutil;

#[cfg(test)]
pub(crate) mod testutil;

// Re-exports
pub use customshow::CustomShow;
pub use error::{PptxError, Result};
pub use master::{SlideLayout, SlideMaster};
pub use package::Package;
pub use presentation::Presentation;
pub use sections::{Section, Sections};
pub use shapes::{Shape, ShapeKind, ShapeOwner};
pub use slide::Slide;
pub use slides::SlideCollection;
