//! Guava - a Rust library for reading and editing PowerPoint presentations
//!
//! This library provides a document object model over `.pptx` packages
//! (Office Open XML presentations). Unlike a pure reader, it supports
//! structural mutation: slides can be added from another presentation,
//! duplicated within the same presentation, inserted at a position, and
//! removed, with referential integrity maintained across the linked part
//! graphs (slide/layout/master identifier lists, relationship tables,
//! section membership, custom-show slide lists).
//!
//! # Architecture
//!
//! The crate is organized into two layers:
//!
//! 1. **OPC layer** (`opc`): Open Packaging Conventions container handling:
//!    ZIP physical packaging, parts, relationships, content types.
//! 2. **Presentation layer** (`pptx`): the PowerPoint document model:
//!    `Package`, `Presentation`, `SlideCollection`, sections, custom shows,
//!    shapes.
//!
//! # Example - Removing a slide
//!
//! ```no_run
//! use guava::Package;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pkg = Package::open("deck.pptx")?;
//! let pres = pkg.presentation();
//!
//! let slide = pres.slides().get(0)?;
//! pres.slides().remove(&slide)?;
//!
//! pkg.save("deck-trimmed.pptx")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Copying a slide between presentations
//!
//! ```no_run
//! use guava::Package;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source_pkg = Package::open("source.pptx")?;
//! let source = source_pkg.presentation();
//! let dest_pkg = Package::open("dest.pptx")?;
//! let dest = dest_pkg.presentation();
//!
//! // Cross-document add imports the slide together with its layout,
//! // master, and theme, so the destination stays internally consistent.
//! dest.slides().add(&source.slides().get(0)?)?;
//!
//! dest_pkg.save("dest.pptx")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! A presentation and all handles derived from it (slides, collections,
//! sections) are single-threaded: one logical owner per open
//! document. The handle types are deliberately `!Send`; concurrent access
//! is the caller's responsibility to avoid, not something guarded
//! internally.

pub mod opc;
pub mod pptx;

// Re-export the high-level entry points
pub use pptx::{Package, Presentation, PptxError, Result, Slide, SlideCollection};
