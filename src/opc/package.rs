//! Objects that implement reading and writing OPC packages.
//!
//! This module provides the main OpcPackage type, which represents an Open
//! Packaging Convention package in memory. It manages parts and
//! relationships, and provides the graph-level mutation primitives the
//! presentation layer builds on: part deletion with transitive collection
//! of unreachable parts, same-package deep cloning, and cross-package
//! import of part subtrees.

use crate::opc::constants::{content_type as ct, relationship_type as rt};
use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::{PACKAGE_URI, PackURI};
use crate::opc::part::Part;
use crate::opc::phys_pkg::PhysPkgReader;
use crate::opc::pkgreader::PackageReader;
use crate::opc::rel::Relationships;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{Read, Seek};
use std::path::Path;

/// What to do with a relationship target while cloning a part subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneAction {
    /// Recurse: the target part is itself copied under a fresh partname.
    Deep,
    /// The relationship is copied but keeps pointing at the original part.
    /// Only meaningful for same-package clones.
    Share,
    /// The relationship is not carried over at all.
    Drop,
}

/// Per-relationship-type policy for `clone_part_tree` / `import_part_tree`.
///
/// A policy is a default action plus exception lists keyed by relationship
/// type URI. External relationships are always copied verbatim.
#[derive(Debug, Clone)]
pub struct ClonePolicy {
    default: CloneAction,
    deep: Vec<&'static str>,
    share: Vec<&'static str>,
    drop: Vec<&'static str>,
}

impl ClonePolicy {
    /// Create a policy with the given default action.
    pub fn new(default: CloneAction) -> Self {
        Self {
            default,
            deep: Vec::new(),
            share: Vec::new(),
            drop: Vec::new(),
        }
    }

    /// Mark relationship types whose targets are deep-copied.
    pub fn deep(mut self, reltypes: &[&'static str]) -> Self {
        self.deep.extend_from_slice(reltypes);
        self
    }

    /// Mark relationship types whose targets are shared, not copied.
    pub fn share(mut self, reltypes: &[&'static str]) -> Self {
        self.share.extend_from_slice(reltypes);
        self
    }

    /// Mark relationship types that are dropped entirely.
    pub fn drop(mut self, reltypes: &[&'static str]) -> Self {
        self.drop.extend_from_slice(reltypes);
        self
    }

    /// Resolve the action for a relationship type.
    pub fn action(&self, reltype: &str) -> CloneAction {
        if self.drop.iter().any(|r| *r == reltype) {
            CloneAction::Drop
        } else if self.deep.iter().any(|r| *r == reltype) {
            CloneAction::Deep
        } else if self.share.iter().any(|r| *r == reltype) {
            CloneAction::Share
        } else {
            self.default
        }
    }
}

/// Result of a subtree clone or import: the new root partname plus the
/// mapping from every copied source partname to its copy.
#[derive(Debug)]
pub struct CloneOutcome {
    /// Partname of the copy of the subtree root.
    pub root: PackURI,
    /// Source partname (as string) to destination partname, for every part
    /// that was deep-copied.
    pub mapping: HashMap<String, PackURI>,
}

/// Main API class for working with OPC packages.
///
/// OpcPackage represents an Open Packaging Convention package in memory,
/// providing access to parts, relationships, and package-level operations.
pub struct OpcPackage {
    /// Package-level relationships
    rels: Relationships,

    /// All parts in the package, indexed by partname
    parts: HashMap<String, Part>,
}

impl OpcPackage {
    /// Create a new empty OPC package.
    pub fn new() -> Self {
        Self {
            rels: Relationships::new(PACKAGE_URI.to_string()),
            parts: HashMap::new(),
        }
    }

    /// Open an OPC package from a file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let phys_reader = PhysPkgReader::open(path)?;
        Self::from_phys_reader(phys_reader)
    }

    /// Load an OPC package from a reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let phys_reader = PhysPkgReader::from_reader(reader)?;
        Self::from_phys_reader(phys_reader)
    }

    /// Load an OPC package from a byte vector.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let phys_reader = PhysPkgReader::from_bytes(bytes)?;
        Self::from_phys_reader(phys_reader)
    }

    /// Load an OPC package from a physical package reader.
    fn from_phys_reader(phys_reader: PhysPkgReader) -> Result<Self> {
        let pkg_reader = PackageReader::from_phys_reader(phys_reader)?;
        Self::unmarshal(pkg_reader)
    }

    /// Unmarshal a package from a package reader.
    ///
    /// Converts serialized parts and relationships into the in-memory
    /// object graph.
    fn unmarshal(mut pkg_reader: PackageReader) -> Result<Self> {
        let mut package = Self::new();

        // First pass: create all parts
        for spart in pkg_reader.take_sparts() {
            let mut part = Part::new(spart.partname, spart.content_type, spart.blob);
            for srel in spart.srels {
                let is_external = srel.is_external();
                part.rels_mut()
                    .add_relationship(srel.reltype, srel.target_ref, srel.r_id, is_external);
            }
            package.parts.insert(part.partname().to_string(), part);
        }

        // Second pass: load package relationships
        for srel in pkg_reader.take_pkg_srels() {
            let is_external = srel.is_external();
            package
                .rels
                .add_relationship(srel.reltype, srel.target_ref, srel.r_id, is_external);
        }

        Ok(package)
    }

    /// Get the partname of the main document part.
    ///
    /// For PowerPoint packages this is the presentation.xml part.
    pub fn main_document_partname(&self) -> Result<PackURI> {
        let rel = self.rels.part_with_reltype(rt::OFFICE_DOCUMENT)?;
        rel.target_partname()
    }

    /// Get a reference to the main document part.
    pub fn main_document_part(&self) -> Result<&Part> {
        let partname = self.main_document_partname()?;
        self.get_part(&partname)
    }

    /// Get a part by its partname.
    pub fn get_part(&self, partname: &PackURI) -> Result<&Part> {
        self.parts
            .get(partname.as_str())
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
    }

    /// Get a mutable reference to a part by its partname.
    pub fn get_part_mut(&mut self, partname: &PackURI) -> Result<&mut Part> {
        self.parts
            .get_mut(partname.as_str())
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
    }

    /// Resolve a relationship of a source part to the target's partname.
    pub fn part_related_by(&self, source: &PackURI, r_id: &str) -> Result<PackURI> {
        let part = self.get_part(source)?;
        let rel = part
            .rels()
            .get(r_id)
            .ok_or_else(|| OpcError::RelationshipNotFound(format!("rId: {}", r_id)))?;
        rel.target_partname()
    }

    /// Replace the blob of an existing part.
    pub fn set_part_blob(&mut self, partname: &PackURI, blob: Vec<u8>) -> Result<()> {
        self.get_part_mut(partname)?.set_blob(blob);
        Ok(())
    }

    /// Add a new part to the package.
    pub fn add_part(&mut self, part: Part) {
        let partname = part.partname().to_string();
        self.parts.insert(partname, part);
    }

    /// Remove a single part from the package.
    ///
    /// Incoming relationships are not touched; use `delete_part_tree` for
    /// graph-consistent removal.
    pub fn delete_part(&mut self, partname: &PackURI) -> Result<Part> {
        self.parts
            .remove(partname.as_str())
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
    }

    /// Delete a part together with everything that becomes unreachable.
    ///
    /// Removes the named part and every relationship pointing at it, then
    /// collects parts no longer reachable from the package root. Slide
    /// layouts, slide masters, and themes are retained even when orphaned:
    /// their identifiers must stay stable across slide removals.
    pub fn delete_part_tree(&mut self, partname: &PackURI) -> Result<()> {
        self.delete_part(partname)?;

        // Drop dangling relationships to the removed part
        self.rels.remove_by_target(partname);
        for part in self.parts.values_mut() {
            part.rels_mut().remove_by_target(partname);
        }

        // Collect parts that the removal made unreachable
        let reachable = self.reachable_partnames();
        let orphaned: Vec<String> = self
            .parts
            .values()
            .filter(|p| !reachable.contains(p.partname().as_str()) && !Self::is_retained(p))
            .map(|p| p.partname().to_string())
            .collect();

        for name in orphaned {
            self.parts.remove(&name);
        }

        Ok(())
    }

    /// Partnames reachable from the package root via internal relationships.
    fn reachable_partnames(&self) -> HashSet<String> {
        let mut reachable = HashSet::with_capacity(self.parts.len());
        let mut queue: VecDeque<PackURI> = VecDeque::new();

        for rel in self.rels.iter() {
            if rel.is_external() {
                continue;
            }
            if let Ok(target) = rel.target_partname()
                && reachable.insert(target.to_string())
            {
                queue.push_back(target);
            }
        }

        while let Some(partname) = queue.pop_front() {
            let Some(part) = self.parts.get(partname.as_str()) else {
                continue;
            };
            for rel in part.rels().iter() {
                if rel.is_external() {
                    continue;
                }
                if let Ok(target) = rel.target_partname()
                    && reachable.insert(target.to_string())
                {
                    queue.push_back(target);
                }
            }
        }

        reachable
    }

    /// Parts kept even when unreachable.
    fn is_retained(part: &Part) -> bool {
        matches!(
            part.content_type(),
            ct::PML_SLIDE_LAYOUT | ct::PML_SLIDE_MASTER | ct::OFC_THEME
        )
    }

    /// Deep-clone a part subtree within this package.
    ///
    /// Every part the policy marks `Deep` is copied under a freshly
    /// numbered partname; `Share` relationships are copied pointing at the
    /// original targets; `Drop` relationships are omitted. Mutual
    /// references (layout ↔ master) are handled by memoizing copies.
    pub fn clone_part_tree(&mut self, root: &PackURI, policy: &ClonePolicy) -> Result<CloneOutcome> {
        let mut mapping = HashMap::new();
        let root_copy = self.clone_part_into_self(root, policy, &mut mapping)?;
        Ok(CloneOutcome {
            root: root_copy,
            mapping,
        })
    }

    fn clone_part_into_self(
        &mut self,
        source: &PackURI,
        policy: &ClonePolicy,
        mapping: &mut HashMap<String, PackURI>,
    ) -> Result<PackURI> {
        if let Some(done) = mapping.get(source.as_str()) {
            return Ok(done.clone());
        }

        let (content_type, blob, src_rels) = {
            let part = self.get_part(source)?;
            (
                part.content_type().to_string(),
                part.blob().to_vec(),
                part.rels().clone(),
            )
        };

        // Register the copy before recursing so partname numbering sees it
        let new_partname = self.next_partname(&partname_template(source))?;
        mapping.insert(source.to_string(), new_partname.clone());
        self.add_part(Part::new(new_partname.clone(), content_type, blob));

        self.copy_rels(&src_rels, &new_partname, policy, mapping, None)?;
        Ok(new_partname)
    }

    /// Import a part subtree from another package.
    ///
    /// Like `clone_part_tree`, but sources come from `src_pkg` and `Share`
    /// is meaningless across packages, so shared targets are deep-copied
    /// as well.
    pub fn import_part_tree(
        &mut self,
        src_pkg: &OpcPackage,
        root: &PackURI,
        policy: &ClonePolicy,
    ) -> Result<CloneOutcome> {
        let mut mapping = HashMap::new();
        let root_copy = self.import_part(src_pkg, root, policy, &mut mapping)?;
        Ok(CloneOutcome {
            root: root_copy,
            mapping,
        })
    }

    fn import_part(
        &mut self,
        src_pkg: &OpcPackage,
        source: &PackURI,
        policy: &ClonePolicy,
        mapping: &mut HashMap<String, PackURI>,
    ) -> Result<PackURI> {
        if let Some(done) = mapping.get(source.as_str()) {
            return Ok(done.clone());
        }

        let src_part = src_pkg.get_part(source)?;
        let new_partname = self.next_partname(&partname_template(source))?;
        mapping.insert(source.to_string(), new_partname.clone());
        self.add_part(Part::new(
            new_partname.clone(),
            src_part.content_type().to_string(),
            src_part.blob().to_vec(),
        ));

        let src_rels = src_part.rels().clone();
        self.copy_rels(&src_rels, &new_partname, policy, mapping, Some(src_pkg))?;
        Ok(new_partname)
    }

    /// Copy a relationship table onto an already-registered copy, applying
    /// the clone policy.
    ///
    /// rIds are preserved so references embedded in the copied XML stay
    /// valid. When `src_pkg` is set the copy is a cross-package import and
    /// `Share` degrades to `Deep`.
    fn copy_rels(
        &mut self,
        src_rels: &Relationships,
        new_partname: &PackURI,
        policy: &ClonePolicy,
        mapping: &mut HashMap<String, PackURI>,
        src_pkg: Option<&OpcPackage>,
    ) -> Result<()> {
        let new_base = new_partname.base_uri().to_string();

        for rel in src_rels.iter() {
            if rel.is_external() {
                self.get_part_mut(new_partname)?.rels_mut().add_relationship(
                    rel.reltype().to_string(),
                    rel.target_ref().to_string(),
                    rel.r_id().to_string(),
                    true,
                );
                continue;
            }

            let mut action = policy.action(rel.reltype());
            if src_pkg.is_some() && action == CloneAction::Share {
                action = CloneAction::Deep;
            }

            let target = rel.target_partname()?;
            let new_target = match action {
                CloneAction::Drop => continue,
                CloneAction::Share => target,
                CloneAction::Deep => match src_pkg {
                    Some(src) => self.import_part(src, &target, policy, mapping)?,
                    None => self.clone_part_into_self(&target, policy, mapping)?,
                },
            };

            self.get_part_mut(new_partname)?.rels_mut().add_relationship(
                rel.reltype().to_string(),
                new_target.relative_ref(&new_base),
                rel.r_id().to_string(),
                false,
            );
        }

        Ok(())
    }

    /// Get an iterator over all parts in the package.
    pub fn iter_parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.values()
    }

    /// Get the number of parts in the package.
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Get a reference to the package-level relationships.
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    /// Get a mutable reference to the package-level relationships.
    pub fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    /// Find the next available partname for a part template.
    ///
    /// Useful for creating new parts with sequential numbering
    /// (e.g., slide1.xml, slide2.xml).
    ///
    /// # Arguments
    /// * `template` - A format string with a %d placeholder for the number
    pub fn next_partname(&self, template: &str) -> Result<PackURI> {
        let mut n = 1u32;
        loop {
            let candidate = template.replace("%d", itoa::Buffer::new().format(n));
            if !self.parts.contains_key(&candidate) {
                return PackURI::new(candidate).map_err(OpcError::InvalidPackUri);
            }
            n += 1;
            if n > 10000 {
                // Safety limit to prevent infinite loops
                return Err(OpcError::InvalidPackUri(
                    "Too many parts, cannot find next partname".to_string(),
                ));
            }
        }
    }

    /// Check if a part exists in the package.
    pub fn contains_part(&self, partname: &PackURI) -> bool {
        self.parts.contains_key(partname.as_str())
    }
}

impl Default for OpcPackage {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive a numbering template from a partname.
///
/// "/ppt/slides/slide3.xml" becomes "/ppt/slides/slide%d.xml", so copies
/// land next to their originals with fresh sequence numbers.
fn partname_template(partname: &PackURI) -> String {
    let filename = partname.filename();
    let (stem, ext) = match filename.rfind('.') {
        Some(pos) => (&filename[..pos], &filename[pos..]),
        None => (filename, ""),
    };
    let stem = stem.trim_end_matches(|c: char| c.is_ascii_digit());
    format!("{}/{}%d{}", partname.base_uri(), stem, ext)
}
