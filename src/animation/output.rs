use bitflags::bitflags;
use glam::{Affine3A, Quat, Vec3};
use slotmap::SlotMap;

use crate::scene::{Node, NodeHandle};
use crate::skeleton::Skeleton;

bitflags! {
    /// Transform channels written by a track evaluator.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ChannelMask: u8 {
        const POSITION = 1 << 0;
        const ROTATION = 1 << 1;
        const SCALE    = 1 << 2;
    }
}

/// Translation / rotation / scale triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BoneTransform {
    pub const IDENTITY: BoneTransform = BoneTransform {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[must_use]
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self { position, rotation, scale }
    }

    #[must_use]
    pub fn from_translation(position: Vec3) -> Self {
        Self { position, ..Self::IDENTITY }
    }

    #[inline]
    #[must_use]
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Per-bone animation output, indexed like the skeleton's bones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelAnimationOutput {
    /// Local-to-parent transform (bind pose or animated).
    pub local_to_parent: BoneTransform,
    /// Composed bone-to-component transform.
    pub local_to_component: Affine3A,
    /// Channels changed by the last evaluation.
    pub dirty: ChannelMask,
}

impl Default for ModelAnimationOutput {
    fn default() -> Self {
        Self {
            local_to_parent: BoneTransform::IDENTITY,
            local_to_component: Affine3A::IDENTITY,
            dirty: ChannelMask::empty(),
        }
    }
}

/// Reloads every bone's local transform.
///
/// With `reset_to_bind_pose == false`, bones bound to a live scene node take
/// the node's current transform; all others fall back to the bind pose.
/// Dirty channel markers are cleared.
pub fn initialize_local_bone_transforms(
    skeleton: &Skeleton,
    nodes: &SlotMap<NodeHandle, Node>,
    outputs: &mut [ModelAnimationOutput],
    reset_to_bind_pose: bool,
) {
    debug_assert_eq!(skeleton.num_bones(), outputs.len());

    for (bone, output) in skeleton.bones().iter().zip(outputs.iter_mut()) {
        output.dirty = ChannelMask::empty();

        let node = if reset_to_bind_pose {
            None
        } else {
            bone.node().and_then(|handle| nodes.get(handle))
        };

        output.local_to_parent = match node {
            Some(node) => node.transform.bone_transform(),
            None => bone.initial_transform(),
        };
    }
}

/// Composes local-to-parent transforms into component space in one forward
/// pass over the skeleton's processing order.
pub fn compose_hierarchy(skeleton: &Skeleton, outputs: &mut [ModelAnimationOutput]) {
    debug_assert_eq!(skeleton.num_bones(), outputs.len());

    for &index in skeleton.bones_order() {
        let Some(bone) = skeleton.bone(index) else {
            continue;
        };
        if index >= outputs.len() {
            continue;
        }

        let local = outputs[index].local_to_parent.to_affine();
        let parent = bone.parent_index();
        let parent_matrix = if parent == index {
            None
        } else {
            outputs.get(parent).map(|output| output.local_to_component)
        };

        outputs[index].local_to_component = match parent_matrix {
            Some(parent_matrix) => parent_matrix * local,
            None => local,
        };
    }
}
