use bitflags::bitflags;
use glam::{Affine3A, Quat, Vec3};

use crate::animation::BoneTransform;
use crate::resources::BoundingBox;
use crate::scene::NodeHandle;
use crate::utils::StringHash;

bitflags! {
    /// Collision shapes declared for a bone, used for bone-driven bounds.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct BoneCollision: u8 {
        const SPHERE = 1 << 0;
        const BOX    = 1 << 1;
    }
}

/// A single bone of a [`Skeleton`](super::Skeleton).
///
/// `node` is a non-owning reference into the scene graph. The node may be
/// missing (never created, removed, or not found by name); every consumer
/// treats that as a fallback case rather than an error.
#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    pub name_hash: StringHash,
    parent_index: usize,

    // === Bind pose ===
    pub initial_position: Vec3,
    pub initial_rotation: Quat,
    pub initial_scale: Vec3,
    /// Transforms from component-space bind pose to bone-local space.
    pub offset_matrix: Affine3A,

    // === Collision ===
    pub collision: BoneCollision,
    pub radius: f32,
    /// Bone-local hitbox.
    pub bounding_box: BoundingBox,

    /// Cleared bones are skipped by track evaluators.
    pub animated: bool,

    pub(crate) node: Option<NodeHandle>,
}

impl Bone {
    /// Creates a bone with an identity bind pose.
    ///
    /// A bone whose `parent_index` equals its own index in the skeleton is a root.
    #[must_use]
    pub fn new(name: &str, parent_index: usize) -> Self {
        Self {
            name: name.to_string(),
            name_hash: StringHash::new(name),
            parent_index,
            initial_position: Vec3::ZERO,
            initial_rotation: Quat::IDENTITY,
            initial_scale: Vec3::ONE,
            offset_matrix: Affine3A::IDENTITY,
            collision: BoneCollision::empty(),
            radius: 0.0,
            bounding_box: BoundingBox::EMPTY,
            animated: true,
            node: None,
        }
    }

    #[must_use]
    pub fn with_initial_transform(mut self, position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        self.initial_position = position;
        self.initial_rotation = rotation;
        self.initial_scale = scale;
        self
    }

    #[must_use]
    pub fn with_offset_matrix(mut self, offset: Affine3A) -> Self {
        self.offset_matrix = offset;
        self
    }

    /// Declares a sphere collision shape.
    #[must_use]
    pub fn with_sphere(mut self, radius: f32) -> Self {
        self.collision |= BoneCollision::SPHERE;
        self.radius = radius;
        self
    }

    /// Declares a box collision shape in bone-local space.
    #[must_use]
    pub fn with_box(mut self, bounding_box: BoundingBox) -> Self {
        self.collision |= BoneCollision::BOX;
        self.bounding_box = bounding_box;
        self
    }

    #[must_use]
    pub fn with_animated(mut self, animated: bool) -> Self {
        self.animated = animated;
        self
    }

    #[inline]
    #[must_use]
    pub fn parent_index(&self) -> usize {
        self.parent_index
    }

    /// Scene node driven by this bone, if any.
    #[inline]
    #[must_use]
    pub fn node(&self) -> Option<NodeHandle> {
        self.node
    }

    /// Bind-pose transform relative to the parent bone.
    #[inline]
    #[must_use]
    pub fn initial_transform(&self) -> BoneTransform {
        BoneTransform::new(self.initial_position, self.initial_rotation, self.initial_scale)
    }

    /// Copies collision metadata from another bone.
    pub(crate) fn copy_collision_from(&mut self, other: &Bone) {
        self.collision = other.collision;
        self.radius = other.radius;
        self.bounding_box = other.bounding_box;
    }
}
