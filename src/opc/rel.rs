//! Relationship-related objects for OPC packages.
//!
//! This module provides types for managing relationships between parts in an
//! OPC package, including internal and external relationships. Relationship
//! tables are mutable: the slide mutation engine adds, removes, and
//! re-targets entries as parts come and go.

use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::PackURI;
use std::collections::HashMap;

/// A single relationship from a source part to a target.
///
/// Represents a connection between parts in an OPC package, identified by an
/// rId (relationship ID). Can be either internal (pointing to another part)
/// or external (pointing to an external URL).
#[derive(Debug, Clone)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1", "rId2")
    r_id: String,

    /// Relationship type URI
    reltype: String,

    /// Target reference - either a part URI or external URL
    target_ref: String,

    /// Base URI for resolving relative references
    base_uri: String,

    /// Whether this is an external relationship
    is_external: bool,
}

impl Relationship {
    /// Create a new relationship.
    pub fn new(
        r_id: String,
        reltype: String,
        target_ref: String,
        base_uri: String,
        is_external: bool,
    ) -> Self {
        Self {
            r_id,
            reltype,
            target_ref,
            base_uri,
            is_external,
        }
    }

    /// Get the relationship ID.
    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    /// Get the relationship type.
    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// Get the target reference.
    ///
    /// For internal relationships, this is a relative part reference.
    /// For external relationships, this is an absolute URL.
    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    /// Check if this is an external relationship.
    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }

    /// Get the absolute target partname for internal relationships.
    ///
    /// Returns an error if this is an external relationship.
    pub fn target_partname(&self) -> Result<PackURI> {
        if self.is_external {
            return Err(OpcError::InvalidRelationship(
                "Cannot get target_partname for external relationship".to_string(),
            ));
        }
        PackURI::from_rel_ref(&self.base_uri, &self.target_ref).map_err(OpcError::InvalidPackUri)
    }
}

/// Collection of relationships from a single source (part or package).
#[derive(Debug, Clone)]
pub struct Relationships {
    /// Base URI for resolving relative references
    base_uri: String,

    /// Map of relationship ID to Relationship
    rels: HashMap<String, Relationship>,
}

impl Relationships {
    /// Create a new empty relationships collection.
    pub fn new(base_uri: String) -> Self {
        Self {
            base_uri,
            rels: HashMap::new(),
        }
    }

    /// Get the base URI of this collection's source.
    #[inline]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Add a relationship to the collection with an explicit rId.
    pub fn add_relationship(
        &mut self,
        reltype: String,
        target_ref: String,
        r_id: String,
        is_external: bool,
    ) -> &Relationship {
        let rel = Relationship::new(
            r_id.clone(),
            reltype,
            target_ref,
            self.base_uri.clone(),
            is_external,
        );
        self.rels.insert(r_id.clone(), rel);
        // Safe to unwrap since we just inserted it
        self.rels.get(r_id.as_str()).unwrap()
    }

    /// Get a relationship by its ID.
    #[inline]
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.get(r_id)
    }

    /// Get or add a relationship to a target part.
    ///
    /// If a relationship of the given type to the target already exists,
    /// returns that relationship. Otherwise, creates a new one with the
    /// next available rId.
    pub fn get_or_add(&mut self, reltype: &str, target_ref: &str) -> &Relationship {
        // Check if matching relationship already exists
        let existing = self
            .rels
            .values()
            .find(|rel| rel.reltype() == reltype && rel.target_ref() == target_ref && !rel.is_external())
            .map(|rel| rel.r_id().to_string());
        if let Some(r_id) = existing {
            return self.rels.get(&r_id).unwrap();
        }

        // Create new relationship with next available rId
        let r_id = self.next_r_id();
        self.add_relationship(reltype.to_string(), target_ref.to_string(), r_id, false)
    }

    /// Add a relationship to a target part under a fresh rId.
    ///
    /// Unlike `get_or_add`, this always creates a new entry, which matters
    /// when a slide must reference two distinct clones of the same kind of
    /// part (e.g., two charts).
    pub fn add_new(&mut self, reltype: &str, target_ref: &str) -> String {
        let r_id = self.next_r_id();
        self.add_relationship(reltype.to_string(), target_ref.to_string(), r_id.clone(), false);
        r_id
    }

    /// Get or add an external relationship.
    pub fn get_or_add_ext_rel(&mut self, reltype: &str, target_ref: &str) -> String {
        for rel in self.rels.values() {
            if rel.reltype() == reltype && rel.target_ref() == target_ref && rel.is_external() {
                return rel.r_id().to_string();
            }
        }

        let r_id = self.next_r_id();
        self.add_relationship(
            reltype.to_string(),
            target_ref.to_string(),
            r_id.clone(),
            true,
        );
        r_id
    }

    /// Get the next available relationship ID.
    ///
    /// Generates IDs in the format "rId1", "rId2", etc., filling in gaps
    /// if any exist.
    fn next_r_id(&self) -> String {
        let mut used_numbers: Vec<u32> = self
            .rels
            .keys()
            .filter_map(|r_id| {
                // Extract number from "rId123" format
                if r_id.len() > 3 && &r_id[..3] == "rId" {
                    atoi_simd::parse::<u32, false, false>(&r_id.as_bytes()[3..]).ok()
                } else {
                    None
                }
            })
            .collect();

        used_numbers.sort_unstable();

        // Find first gap or use next number
        let mut next_num = 1u32;
        for &num in &used_numbers {
            match num.cmp(&next_num) {
                std::cmp::Ordering::Equal => next_num += 1,
                std::cmp::Ordering::Greater => break,
                std::cmp::Ordering::Less => {}
            }
        }

        format!("rId{}", next_num)
    }

    /// Get the single relationship of a specific type.
    ///
    /// Returns an error if no relationship of the type is found, or if
    /// multiple relationships of the type exist.
    pub fn part_with_reltype(&self, reltype: &str) -> Result<&Relationship> {
        let mut matching = self.rels.values().filter(|rel| rel.reltype() == reltype);

        match (matching.next(), matching.next()) {
            (None, _) => Err(OpcError::RelationshipNotFound(format!(
                "No relationship of type '{}'",
                reltype
            ))),
            (Some(rel), None) => Ok(rel),
            (Some(_), Some(_)) => Err(OpcError::InvalidRelationship(format!(
                "Multiple relationships of type '{}'",
                reltype
            ))),
        }
    }

    /// Get all relationships of a specific type, sorted by rId for
    /// deterministic iteration order.
    pub fn all_with_reltype(&self, reltype: &str) -> Vec<&Relationship> {
        let mut matching: Vec<&Relationship> = self
            .rels
            .values()
            .filter(|rel| rel.reltype() == reltype)
            .collect();
        matching.sort_by(|a, b| a.r_id().cmp(b.r_id()));
        matching
    }

    /// Get an iterator over all relationships.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.values()
    }

    /// Get the number of relationships in the collection.
    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    /// Check if the collection is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// Remove a relationship by its ID.
    pub fn remove(&mut self, r_id: &str) -> Option<Relationship> {
        self.rels.remove(r_id)
    }

    /// Remove every internal relationship pointing at the given partname.
    ///
    /// Returns the rIds of the removed entries.
    pub fn remove_by_target(&mut self, target: &PackURI) -> Vec<String> {
        let removing: Vec<String> = self
            .rels
            .values()
            .filter(|rel| {
                !rel.is_external()
                    && rel
                        .target_partname()
                        .map(|pn| pn == *target)
                        .unwrap_or(false)
            })
            .map(|rel| rel.r_id().to_string())
            .collect();

        for r_id in &removing {
            self.rels.remove(r_id);
        }
        removing
    }

    /// Re-point an existing relationship at a different internal target.
    ///
    /// The rId and reltype are preserved, so references embedded in part
    /// XML stay valid. Fails if the rId is unknown.
    pub fn retarget(&mut self, r_id: &str, target_ref: &str) -> Result<()> {
        match self.rels.get_mut(r_id) {
            Some(rel) => {
                rel.target_ref = target_ref.to_string();
                rel.is_external = false;
                Ok(())
            }
            None => Err(OpcError::RelationshipNotFound(format!("rId: {}", r_id))),
        }
    }

    /// Serialize relationships to XML format.
    ///
    /// Generates the XML for a .rels item, with relationships sorted by rId
    /// for consistent output.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(1024);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        xml.push('\n');

        let mut rels: Vec<&Relationship> = self.rels.values().collect();
        rels.sort_by_key(|rel| rel.r_id());

        for rel in rels {
            let target_mode = if rel.is_external() {
                r#" TargetMode="External""#
            } else {
                ""
            };

            xml.push_str(&format!(
                r#"  <Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
                escape_xml(rel.r_id()),
                escape_xml(rel.reltype()),
                escape_xml(rel.target_ref()),
                target_mode
            ));
            xml.push('\n');
        }

        xml.push_str("</Relationships>");

        xml
    }
}

/// Escape XML special characters.
#[inline]
pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_r_id_fills_gaps() {
        let mut rels = Relationships::new("/ppt".to_string());

        rels.add_relationship("t".to_string(), "a.xml".to_string(), "rId1".to_string(), false);
        rels.add_relationship("t".to_string(), "b.xml".to_string(), "rId3".to_string(), false);

        assert_eq!(rels.next_r_id(), "rId2");
    }

    #[test]
    fn test_get_or_add_reuses_matching() {
        let mut rels = Relationships::new("/ppt".to_string());

        let r_id1 = rels.get_or_add("t", "target1").r_id().to_string();
        let r_id2 = rels.get_or_add("t", "target1").r_id().to_string();
        assert_eq!(r_id1, r_id2);

        let r_id3 = rels.get_or_add("t", "target2").r_id().to_string();
        assert_ne!(r_id1, r_id3);
    }

    #[test]
    fn test_add_new_never_reuses() {
        let mut rels = Relationships::new("/ppt".to_string());

        let a = rels.add_new("t", "chart1.xml");
        let b = rels.add_new("t", "chart1.xml");
        assert_ne!(a, b);
        assert_eq!(rels.len(), 2);
    }

    #[test]
    fn test_remove_by_target() {
        let mut rels = Relationships::new("/ppt/slides".to_string());
        rels.add_relationship(
            "t".to_string(),
            "../notesSlides/notesSlide1.xml".to_string(),
            "rId2".to_string(),
            false,
        );
        rels.add_relationship(
            "t".to_string(),
            "../slideLayouts/slideLayout1.xml".to_string(),
            "rId1".to_string(),
            false,
        );

        let target = PackURI::new("/ppt/notesSlides/notesSlide1.xml").unwrap();
        let removed = rels.remove_by_target(&target);
        assert_eq!(removed, vec!["rId2".to_string()]);
        assert_eq!(rels.len(), 1);
    }

    #[test]
    fn test_retarget_preserves_r_id() {
        let mut rels = Relationships::new("/ppt/slides".to_string());
        rels.add_relationship(
            "t".to_string(),
            "../charts/chart1.xml".to_string(),
            "rId4".to_string(),
            false,
        );

        rels.retarget("rId4", "../charts/chart2.xml").unwrap();
        let rel = rels.get("rId4").unwrap();
        assert_eq!(rel.target_ref(), "../charts/chart2.xml");

        assert!(rels.retarget("rId9", "x").is_err());
    }
}
