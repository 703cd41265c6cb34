//! Skeleton Tests
//!
//! Tests for:
//! - Skeleton definition and validation (parent range, cycles)
//! - Processing order (parent before child)
//! - Lookup by index, name and hash
//! - Bind-pose reset of bone nodes

use glam::{Quat, Vec3};
use myth_animated::animated_model::AnimatedModel;
use myth_animated::errors::AnimationError;
use myth_animated::resources::{BoundingBox, Model};
use myth_animated::scene::Scene;
use myth_animated::skeleton::{Bone, BoneCollision, Skeleton};
use myth_animated::utils::StringHash;
use std::sync::Arc;

fn three_bone_chain() -> Vec<Bone> {
    vec![Bone::new("root", 0), Bone::new("child", 0), Bone::new("grandchild", 1)]
}

// ============================================================================
// Definition
// ============================================================================

#[test]
fn define_builds_lookup_and_root() {
    let skeleton = Skeleton::from_bones(three_bone_chain()).unwrap();

    assert_eq!(skeleton.num_bones(), 3);
    assert_eq!(skeleton.root_bone_index(), Some(0));
    assert_eq!(skeleton.root_bone().unwrap().name, "root");
    assert_eq!(skeleton.bone_index("grandchild"), Some(2));
    assert_eq!(skeleton.bone_index_by_hash(StringHash::new("child")), Some(1));
}

#[test]
fn lookup_misses_return_none() {
    let skeleton = Skeleton::from_bones(three_bone_chain()).unwrap();

    assert!(skeleton.bone(3).is_none());
    assert!(skeleton.find_bone("missing").is_none());
    assert!(skeleton.bone_by_hash(StringHash::new("missing")).is_none());
}

#[test]
fn define_rejects_out_of_range_parent() {
    let bones = vec![Bone::new("root", 0), Bone::new("bad", 7)];
    let err = Skeleton::from_bones(bones).unwrap_err();
    assert_eq!(err, AnimationError::InvalidParentIndex { bone: 1, parent: 7, count: 2 });
}

#[test]
fn define_rejects_cycles() {
    let bones = vec![Bone::new("root", 0), Bone::new("a", 2), Bone::new("b", 1)];
    let err = Skeleton::from_bones(bones).unwrap_err();
    assert!(matches!(err, AnimationError::CyclicHierarchy { .. }));
}

#[test]
fn failed_define_leaves_skeleton_untouched() {
    let mut skeleton = Skeleton::from_bones(three_bone_chain()).unwrap();
    assert!(skeleton.define(vec![Bone::new("x", 5)]).is_err());
    assert_eq!(skeleton.num_bones(), 3);
    assert_eq!(skeleton.bone_index("child"), Some(1));
}

#[test]
fn processing_order_puts_parents_first() {
    // Child listed before its parent.
    let bones = vec![
        Bone::new("leaf", 2),
        Bone::new("root", 1),
        Bone::new("mid", 1),
    ];
    let skeleton = Skeleton::from_bones(bones).unwrap();

    let order = skeleton.bones_order();
    let position = |index: usize| order.iter().position(|&i| i == index).unwrap();
    assert_eq!(order.len(), 3);
    assert!(position(1) < position(2));
    assert!(position(2) < position(0));
    assert_eq!(skeleton.root_bone_index(), Some(1));
}

#[test]
fn duplicate_names_resolve_to_first_bone() {
    let bones = vec![Bone::new("root", 0), Bone::new("twin", 0), Bone::new("twin", 0)];
    let skeleton = Skeleton::from_bones(bones).unwrap();
    assert_eq!(skeleton.bone_index("twin"), Some(1));
}

#[test]
fn empty_skeleton_is_valid() {
    let skeleton = Skeleton::from_bones(Vec::new()).unwrap();
    assert!(skeleton.is_empty());
    assert!(skeleton.root_bone().is_none());
    assert!(skeleton.bones_order().is_empty());
}

#[test]
fn clear_removes_everything() {
    let mut skeleton = Skeleton::from_bones(three_bone_chain()).unwrap();
    skeleton.clear();
    assert!(skeleton.is_empty());
    assert!(skeleton.bone_index("root").is_none());
}

#[test]
fn bone_builders_set_collision() {
    let bone = Bone::new("b", 0)
        .with_sphere(2.0)
        .with_box(BoundingBox::from_half_extents(Vec3::ONE));
    assert!(bone.collision.contains(BoneCollision::SPHERE | BoneCollision::BOX));
    assert_eq!(bone.radius, 2.0);
    assert!(bone.animated);
    assert!(bone.node().is_none());
}

// ============================================================================
// Reset
// ============================================================================

fn posed_model() -> Arc<Model> {
    let bones = vec![
        Bone::new("root", 0).with_initial_transform(Vec3::X, Quat::IDENTITY, Vec3::ONE),
        Bone::new("arm", 0).with_initial_transform(Vec3::Y, Quat::from_rotation_z(0.3), Vec3::ONE),
        Bone::new("static", 0)
            .with_initial_transform(Vec3::Z, Quat::IDENTITY, Vec3::ONE)
            .with_animated(false),
    ];
    Arc::new(Model::new("posed").with_skeleton(Skeleton::from_bones(bones).unwrap()))
}

#[test]
fn reset_restores_bind_pose_of_animated_bones() {
    let mut scene = Scene::new();
    let owner = scene.create_node("owner");
    let key = scene.add_animated_model(owner, AnimatedModel::default()).unwrap();
    scene.set_model(key, Some(posed_model()), true).unwrap();

    let skeleton = scene.get_animated_model(key).unwrap().skeleton().clone();
    let arm = skeleton.find_bone("arm").unwrap().node().unwrap();
    let fixed = skeleton.find_bone("static").unwrap().node().unwrap();

    scene.get_node_mut(arm).unwrap().transform.position = Vec3::splat(9.0);
    scene.get_node_mut(fixed).unwrap().transform.position = Vec3::splat(9.0);

    skeleton.reset(&mut scene.nodes);

    assert_eq!(scene.get_node(arm).unwrap().transform.position, Vec3::Y);
    assert_eq!(scene.get_node(arm).unwrap().transform.rotation, Quat::from_rotation_z(0.3));
    // Non-animated bones keep their node transform.
    assert_eq!(scene.get_node(fixed).unwrap().transform.position, Vec3::splat(9.0));
}

#[test]
fn reset_is_silent() {
    let mut scene = Scene::new();
    let owner = scene.create_node("owner");
    let key = scene.add_animated_model(owner, AnimatedModel::default()).unwrap();
    scene.set_model(key, Some(posed_model()), true).unwrap();
    scene.animated_models[key].update_skinning(&scene.nodes);
    assert!(!scene.get_animated_model(key).unwrap().flags().skinning_dirty());

    scene.reset_bones(key);
    assert!(!scene.get_animated_model(key).unwrap().flags().skinning_dirty());
}
