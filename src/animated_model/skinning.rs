//! Skin matrix storage
//!
//! One matrix per bone (`bone world * bind offset`) plus optional
//! per-geometry remapped copies. The alias table maps each global bone to
//! the `(geometry, slot)` pairs that mirror it, so a rebuild writes every
//! matrix once and copies it to its aliases in `O(bones + aliases)`.
//!
//! The table stores indices rather than references into the per-geometry
//! arrays, so resizing storage can never leave a dangling alias. It is
//! rebuilt whenever bone mappings or the bone count change.

use glam::Affine3A;
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::scene::{Node, NodeHandle};
use crate::skeleton::Skeleton;

/// A per-geometry slot mirroring a global bone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkinAlias {
    pub geometry: usize,
    pub slot: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SkinMatrices {
    global: Vec<Affine3A>,
    geometry: Vec<Vec<Affine3A>>,
    aliases: Vec<SmallVec<[SkinAlias; 2]>>,
}

impl SkinMatrices {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resizes global storage to `bone_count` and drops any remapping.
    pub fn resize(&mut self, bone_count: usize) {
        self.global.clear();
        self.global.resize(bone_count, Affine3A::IDENTITY);
        self.clear_geometry_mappings();
    }

    pub fn clear(&mut self) {
        self.global.clear();
        self.clear_geometry_mappings();
    }

    pub fn clear_geometry_mappings(&mut self) {
        self.geometry.clear();
        self.aliases.clear();
    }

    /// Builds per-geometry storage and the alias table.
    ///
    /// `mappings[g][slot]` is the global bone index geometry `g` reads in
    /// `slot`. Geometries with an empty mapping get no per-geometry storage
    /// and use the global matrices. Out-of-range bone indices are skipped.
    pub fn set_geometry_bone_mappings<'a, I>(&mut self, mappings: I)
    where
        I: IntoIterator<Item = &'a [usize]>,
    {
        self.clear_geometry_mappings();

        let bone_count = self.global.len();
        self.aliases.resize_with(bone_count, SmallVec::new);

        for (geometry, mapping) in mappings.into_iter().enumerate() {
            self.geometry.push(vec![Affine3A::IDENTITY; mapping.len()]);

            for (slot, &bone) in mapping.iter().enumerate() {
                match self.aliases.get_mut(bone) {
                    Some(list) => list.push(SkinAlias { geometry, slot }),
                    None => log::warn!(
                        "Geometry {geometry} maps slot {slot} to bone {bone}, but the skeleton has {bone_count} bones"
                    ),
                }
            }
        }
    }

    /// Recomputes every skin matrix from bone node world transforms.
    ///
    /// A bone without a live node takes `fallback` (the owning model's world
    /// transform), degrading to a rigid attachment.
    pub fn build(&mut self, skeleton: &Skeleton, nodes: &SlotMap<NodeHandle, Node>, fallback: &Affine3A) {
        debug_assert_eq!(skeleton.num_bones(), self.global.len());

        for (index, bone) in skeleton.bones().iter().enumerate() {
            let Some(target) = self.global.get_mut(index) else {
                break;
            };

            let matrix = match bone.node().and_then(|handle| nodes.get(handle)) {
                Some(node) => *node.world_matrix() * bone.offset_matrix,
                None => *fallback,
            };
            *target = matrix;

            if let Some(aliases) = self.aliases.get(index) {
                for alias in aliases {
                    if let Some(slot) = self
                        .geometry
                        .get_mut(alias.geometry)
                        .and_then(|matrices| matrices.get_mut(alias.slot))
                    {
                        *slot = matrix;
                    }
                }
            }
        }
    }

    /// One matrix per skeleton bone.
    #[inline]
    #[must_use]
    pub fn global(&self) -> &[Affine3A] {
        &self.global
    }

    /// Remapped matrices for geometry `index`. `None` when the geometry uses
    /// the global matrices.
    #[must_use]
    pub fn geometry(&self, index: usize) -> Option<&[Affine3A]> {
        self.geometry
            .get(index)
            .filter(|matrices| !matrices.is_empty())
            .map(Vec::as_slice)
    }

    /// Matrices a renderer should bind for geometry `index`.
    #[must_use]
    pub fn for_geometry(&self, index: usize) -> &[Affine3A] {
        self.geometry(index).unwrap_or(&self.global)
    }

    #[inline]
    #[must_use]
    pub fn has_geometry_mappings(&self) -> bool {
        !self.geometry.is_empty()
    }

    /// Per-geometry slots mirroring global bone `bone`.
    #[must_use]
    pub fn aliases(&self, bone: usize) -> &[SkinAlias] {
        self.aliases.get(bone).map_or(&[], |list| list.as_slice())
    }

    #[must_use]
    pub fn alias_count(&self) -> usize {
        self.aliases.iter().map(SmallVec::len).sum()
    }
}
