//! Bone-driven bounding volumes
//!
//! Local bounds come from bone collision shapes placed by the composed
//! component-space transforms. The master additionally merges collision
//! shapes of every sibling's skeleton into its own bones, so bones the
//! master's mesh barely covers are still bounded by what siblings skin.

use glam::Vec3;

use crate::animation::ModelAnimationOutput;
use crate::resources::{BoundingBox, BoundingSphere};
use crate::skeleton::{Bone, BoneCollision, Skeleton};

/// Shapes below this size are treated as absent.
pub const COLLISION_EPSILON: f32 = 1e-6;

/// Sphere shapes contribute half their radius. Bone scale is not applied.
pub const SPHERE_RADIUS_SCALE: f32 = 0.5;

/// Bounds of all bone collision shapes in component space.
///
/// `outputs` must already hold composed `local_to_component` transforms.
/// A bone with a box uses the box; otherwise a sphere contributes a sphere
/// at the bone origin. An empty skeleton yields a point at the origin.
#[must_use]
pub fn compute_local_bounds(skeleton: &Skeleton, outputs: &[ModelAnimationOutput]) -> BoundingBox {
    if skeleton.is_empty() {
        return BoundingBox::from_point(Vec3::ZERO);
    }

    let mut bounds = BoundingBox::EMPTY;
    for (bone, output) in skeleton.bones().iter().zip(outputs) {
        let transform = &output.local_to_component;

        if bone.collision.contains(BoneCollision::BOX) {
            bounds.merge(&bone.bounding_box.transform(transform));
        } else if bone.collision.contains(BoneCollision::SPHERE) {
            let center: Vec3 = transform.translation.into();
            bounds.merge_sphere(&BoundingSphere::new(center, bone.radius * SPHERE_RADIUS_SCALE));
        }
    }
    bounds
}

/// Unions another bone's collision shapes into `dest`. Never shrinks `dest`.
pub fn merge_bone_collision(dest: &mut Bone, other: &Bone) {
    if other.collision.contains(BoneCollision::SPHERE) {
        dest.collision |= BoneCollision::SPHERE;
        dest.radius = dest.radius.max(other.radius);
    }
    if other.collision.contains(BoneCollision::BOX) {
        dest.collision |= BoneCollision::BOX;
        if dest.bounding_box.is_defined() {
            dest.bounding_box.merge(&other.bounding_box);
        } else {
            dest.bounding_box = other.bounding_box;
        }
    }
}

/// Clears collision flags of shapes too small to matter, so dummy bones do
/// not inflate the aggregate bounds.
pub fn strip_degenerate_collision(bones: &mut [Bone]) {
    for bone in bones {
        if bone.collision.contains(BoneCollision::BOX)
            && bone.bounding_box.size().length() < COLLISION_EPSILON
        {
            bone.collision.remove(BoneCollision::BOX);
        }
        if bone.collision.contains(BoneCollision::SPHERE) && bone.radius < COLLISION_EPSILON {
            bone.collision.remove(BoneCollision::SPHERE);
        }
    }
}

/// Recomputes a master's bone collision data.
///
/// With siblings present, every bone is first reset to the collision data
/// authored in `template`, then sibling bones with the same name hash are
/// merged in. Degenerate shapes are stripped in every case.
pub fn finalize_bone_collision(skeleton: &mut Skeleton, template: Option<&Skeleton>, siblings: &[&Skeleton]) {
    if !siblings.is_empty() {
        if let Some(template) = template {
            for (bone, source) in skeleton.bones_mut().iter_mut().zip(template.bones()) {
                bone.copy_collision_from(source);
            }
        }

        for bone in skeleton.bones_mut() {
            for sibling in siblings {
                if let Some(other) = sibling.bone_by_hash(bone.name_hash) {
                    merge_bone_collision(bone, other);
                }
            }
        }
    }

    strip_degenerate_collision(skeleton.bones_mut());
}
