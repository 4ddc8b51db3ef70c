//! Shape creation dispatch.
//!
//! The shape tree is a closed set of element kinds. Creation runs down an
//! ordered list of (predicate, constructor) pairs and stops at the first
//! predicate that accepts the element tag; elements no pair accepts (group
//! shape properties, nvPr bookkeeping) are simply not shapes.

use crate::pptx::shapes::base::{Shape, ShapeKind, ShapeOwner};

type Predicate = fn(&[u8]) -> bool;
type Constructor = fn(ShapeOwner, Vec<u8>) -> Shape;

/// Registration-order dispatch table. Evaluation stops at the first match.
const DISPATCH: &[(Predicate, Constructor)] = &[
    (|tag| tag == b"sp", |owner, xml| {
        Shape::new(owner, ShapeKind::AutoShape, xml)
    }),
    (|tag| tag == b"pic", |owner, xml| {
        Shape::new(owner, ShapeKind::Picture, xml)
    }),
    (|tag| tag == b"graphicFrame", |owner, xml| {
        Shape::new(owner, ShapeKind::GraphicFrame, xml)
    }),
    (|tag| tag == b"grpSp", |owner, xml| {
        Shape::new(owner, ShapeKind::GroupShape, xml)
    }),
    (|tag| tag == b"cxnSp", |owner, xml| {
        Shape::new(owner, ShapeKind::Connector, xml)
    }),
];

/// Create a shape for a shape-tree child element, or None when the tag is
/// not a shape kind.
pub(crate) fn create_shape(tag: &[u8], owner: ShapeOwner, xml: Vec<u8>) -> Option<Shape> {
    DISPATCH
        .iter()
        .find(|(predicate, _)| predicate(tag))
        .map(|(_, constructor)| constructor(owner, xml))
}

/// Whether some registered pair would accept the tag.
pub(crate) fn is_shape_tag(tag: &[u8]) -> bool {
    DISPATCH.iter().any(|(predicate, _)| predicate(tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pptx::shapes::base::tests::slide_owner_for_tests;

    #[test]
    fn test_dispatch_order_first_match_wins() {
        let owner = slide_owner_for_tests();
        let shape = create_shape(b"sp", owner, b"<p:sp/>".to_vec()).unwrap();
        assert_eq!(shape.kind(), ShapeKind::AutoShape);
    }

    #[test]
    fn test_all_registered_kinds() {
        for (tag, kind) in [
            (&b"sp"[..], ShapeKind::AutoShape),
            (b"pic", ShapeKind::Picture),
            (b"graphicFrame", ShapeKind::GraphicFrame),
            (b"grpSp", ShapeKind::GroupShape),
            (b"cxnSp", ShapeKind::Connector),
        ] {
            let shape = create_shape(tag, slide_owner_for_tests(), Vec::new()).unwrap();
            assert_eq!(shape.kind(), kind);
        }
    }

    #[test]
    fn test_non_shape_tags_rejected() {
        assert!(create_shape(b"nvGrpSpPr", slide_owner_for_tests(), Vec::new()).is_none());
        assert!(create_shape(b"grpSpPr", slide_owner_for_tests(), Vec::new()).is_none());
    }
}
