use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::errors::{AnimationError, Result};
use crate::scene::{Node, NodeHandle};
use crate::skeleton::Bone;
use crate::utils::StringHash;

/// An ordered bone hierarchy.
///
/// # Processing order
///
/// [`Skeleton::bones_order`] lists every bone index such that a bone always
/// comes after its parent. Hierarchy composition walks this list once and
/// never re-sorts, so the ordering is established (and the hierarchy
/// validated) in [`Skeleton::define`].
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    bones: Vec<Bone>,
    bones_order: Vec<usize>,
    root_bone_index: Option<usize>,
    lookup: FxHashMap<StringHash, usize>,
}

impl Skeleton {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a skeleton from a bone list.
    pub fn from_bones(bones: Vec<Bone>) -> Result<Self> {
        let mut skeleton = Self::new();
        skeleton.define(bones)?;
        Ok(skeleton)
    }

    /// Replaces the bone set wholesale.
    ///
    /// Parent indices need not be monotonic: a bone may name a parent listed
    /// after it. The processing order is sorted by depth instead, so parents
    /// always come before their children and bone indices stay as given.
    ///
    /// Fails (leaving the skeleton untouched) when a parent index is out of
    /// range or the parent links contain a cycle.
    pub fn define(&mut self, bones: Vec<Bone>) -> Result<()> {
        let count = bones.len();
        for (index, bone) in bones.iter().enumerate() {
            if bone.parent_index() >= count {
                return Err(AnimationError::InvalidParentIndex {
                    bone: index,
                    parent: bone.parent_index(),
                    count,
                });
            }
        }

        let depths = compute_depths(&bones)?;

        let mut order: Vec<usize> = (0..count).collect();
        order.sort_by_key(|&index| depths[index]);

        let mut lookup = FxHashMap::default();
        lookup.reserve(count);
        // First bone wins on duplicate names.
        for (index, bone) in bones.iter().enumerate() {
            lookup.entry(bone.name_hash).or_insert(index);
        }

        self.root_bone_index = bones
            .iter()
            .enumerate()
            .position(|(index, bone)| bone.parent_index() == index);
        self.bones = bones;
        self.bones_order = order;
        self.lookup = lookup;

        Ok(())
    }

    /// Removes every bone.
    pub fn clear(&mut self) {
        self.bones.clear();
        self.bones_order.clear();
        self.root_bone_index = None;
        self.lookup.clear();
    }

    #[inline]
    #[must_use]
    pub fn num_bones(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// Mutable access to bone payloads. The slice cannot be resized and
    /// parent indices are read-only, so the hierarchy stays valid.
    #[inline]
    pub fn bones_mut(&mut self) -> &mut [Bone] {
        &mut self.bones
    }

    /// Parent-before-child processing order.
    #[inline]
    #[must_use]
    pub fn bones_order(&self) -> &[usize] {
        &self.bones_order
    }

    #[inline]
    #[must_use]
    pub fn root_bone_index(&self) -> Option<usize> {
        self.root_bone_index
    }

    #[must_use]
    pub fn root_bone(&self) -> Option<&Bone> {
        self.bones.get(self.root_bone_index?)
    }

    #[inline]
    #[must_use]
    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    #[inline]
    pub fn bone_mut(&mut self, index: usize) -> Option<&mut Bone> {
        self.bones.get_mut(index)
    }

    #[inline]
    #[must_use]
    pub fn bone_index_by_hash(&self, name_hash: StringHash) -> Option<usize> {
        self.lookup.get(&name_hash).copied()
    }

    #[inline]
    #[must_use]
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bone_index_by_hash(StringHash::new(name))
    }

    #[must_use]
    pub fn bone_by_hash(&self, name_hash: StringHash) -> Option<&Bone> {
        self.bones.get(self.bone_index_by_hash(name_hash)?)
    }

    #[must_use]
    pub fn find_bone(&self, name: &str) -> Option<&Bone> {
        self.bone_by_hash(StringHash::new(name))
    }

    /// Restores every animated bone's scene node to its bind pose.
    ///
    /// Node transforms are written silently: no dirty notification is sent,
    /// so the caller decides when propagation happens by marking the owner
    /// node dirty.
    pub fn reset(&self, nodes: &mut SlotMap<NodeHandle, Node>) {
        for bone in &self.bones {
            if !bone.animated {
                continue;
            }
            if let Some(node) = bone.node.and_then(|handle| nodes.get_mut(handle)) {
                node.transform.set_trs(bone.initial_transform());
            }
        }
    }

    /// Copies bone data from `source` while keeping this skeleton's node
    /// references and animated flags.
    ///
    /// Only succeeds when both skeletons have the same bone count and every
    /// bone has a node, the same name and the same parent. Returns `false`
    /// as soon as a mismatch is found; the skeleton is then expected to be
    /// redefined from scratch.
    pub(crate) fn merge_compatible(&mut self, source: &Skeleton) -> bool {
        if self.bones.len() != source.bones.len() {
            return false;
        }

        for (dest, src) in self.bones.iter_mut().zip(&source.bones) {
            if dest.node.is_none() || dest.name != src.name || dest.parent_index() != src.parent_index() {
                return false;
            }

            let node = dest.node;
            let animated = dest.animated;
            *dest = src.clone();
            dest.node = node;
            dest.animated = animated;
        }

        true
    }
}

/// Depth of every bone below its root. Errors on cycles.
fn compute_depths(bones: &[Bone]) -> Result<Vec<usize>> {
    let count = bones.len();
    let mut depths: Vec<Option<usize>> = vec![None; count];
    let mut chain: Vec<usize> = Vec::new();

    for start in 0..count {
        chain.clear();
        let mut current = start;

        let base = loop {
            if let Some(depth) = depths[current] {
                break depth;
            }
            let parent = bones[current].parent_index();
            if parent == current {
                depths[current] = Some(0);
                break 0;
            }
            chain.push(current);
            if chain.len() > count {
                return Err(AnimationError::CyclicHierarchy { bone: start });
            }
            current = parent;
        };

        let mut depth = base;
        for &bone in chain.iter().rev() {
            depth += 1;
            depths[bone] = Some(depth);
        }
    }

    Ok(depths.into_iter().map(|depth| depth.unwrap_or(0)).collect())
}
