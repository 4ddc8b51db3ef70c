//! Shape tree access.
//!
//! Shapes are parsed from the `p:spTree` of a slide, layout, or master
//! part. Each shape knows its owner and checks the owner's removal state
//! before answering, so a shape of a removed slide fails fast instead of
//! reading stale part content.

mod base;
mod factory;

pub use base::{Shape, ShapeKind, ShapeOwner};
pub(crate) use base::parse_shapes;
