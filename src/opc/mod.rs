//! Open Packaging Conventions (OPC) implementation.
//!
//! This module implements the container format underneath `.pptx` files:
//! a ZIP archive of parts connected by relationship identifiers, with a
//! content-type map describing each part's format.
//!
//! Unlike a read-only package model, the part graph here is mutable: parts
//! can be added, deleted (with transitive collection of parts that become
//! unreachable), deep-cloned within a package, and imported across
//! packages. The presentation layer builds its structural slide mutations
//! on these primitives.

pub mod constants;
pub mod error;
pub mod package;
pub mod packuri;
pub mod part;
pub mod phys_pkg;
pub mod pkgreader;
pub mod pkgwriter;
pub mod rel;

// Re-export commonly used types
pub use error::{OpcError, Result};
pub use package::OpcPackage;
pub use packuri::PackURI;
pub use part::Part;
pub use rel::{Relationship, Relationships};
