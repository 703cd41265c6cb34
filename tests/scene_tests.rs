//! Scene Integration Tests
//!
//! Tests for:
//! - Scene: create/remove nodes, reparenting, name lookup
//! - Dirty listeners: notification through set_transform / mark_dirty
//! - Queued transform updates
//! - Camera distance and LOD distance

use glam::{Quat, Vec3};
use myth_animated::animated_model::{AnimatedModel, AnimatedModelSystem, FrameInfo};
use myth_animated::animation::BoneTransform;
use myth_animated::scene::{Camera, Scene};
use myth_animated::resources::Model;
use myth_animated::skeleton::{Bone, Skeleton};
use std::sync::Arc;

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

// ============================================================================
// Node Creation & Removal
// ============================================================================

#[test]
fn scene_create_node_is_root() {
    let mut scene = Scene::new();
    let handle = scene.create_node("root");
    assert!(scene.get_node(handle).is_some());
    assert_eq!(scene.root_nodes, vec![handle]);
    assert_eq!(scene.get_node(handle).unwrap().name, "root");
}

#[test]
fn scene_create_child_links_hierarchy() {
    let mut scene = Scene::new();
    let parent = scene.create_node("parent");
    let child = scene.create_child(parent, "child");

    assert_eq!(scene.get_node(child).unwrap().parent(), Some(parent));
    assert_eq!(scene.get_node(parent).unwrap().children(), &[child]);
    assert_eq!(scene.root_nodes.len(), 1);
}

#[test]
fn scene_attach_reparents() {
    let mut scene = Scene::new();
    let a = scene.create_node("a");
    let b = scene.create_node("b");
    let child = scene.create_child(a, "child");

    scene.attach(child, b);
    assert!(scene.get_node(a).unwrap().children().is_empty());
    assert_eq!(scene.get_node(b).unwrap().children(), &[child]);

    // Root moves below another root.
    scene.attach(a, b);
    assert_eq!(scene.root_nodes, vec![b]);
}

#[test]
fn scene_attach_refuses_cycles() {
    let mut scene = Scene::new();
    let a = scene.create_node("a");
    let b = scene.create_child(a, "b");

    scene.attach(a, b);
    assert_eq!(scene.get_node(a).unwrap().parent(), None);
    assert_eq!(scene.get_node(b).unwrap().parent(), Some(a));
}

#[test]
fn scene_remove_node_removes_subtree() {
    let mut scene = Scene::new();
    let root = scene.create_node("root");
    let child = scene.create_child(root, "child");
    let grandchild = scene.create_child(child, "grandchild");

    scene.remove_node(child);
    assert!(scene.get_node(child).is_none());
    assert!(scene.get_node(grandchild).is_none());
    assert!(scene.get_node(root).unwrap().children().is_empty());
}

#[test]
fn scene_remove_node_destroys_attached_models() {
    let mut scene = Scene::new();
    let root = scene.create_node("root");
    let key = scene.add_animated_model(root, AnimatedModel::default()).unwrap();

    scene.remove_node(root);
    assert!(scene.get_animated_model(key).is_none());
}

#[test]
fn scene_find_child_by_name() {
    let mut scene = Scene::new();
    let root = scene.create_node("root");
    let a = scene.create_child(root, "a");
    let deep = scene.create_child(a, "deep");

    assert_eq!(scene.find_child_by_name(root, "a", false), Some(a));
    assert_eq!(scene.find_child_by_name(root, "deep", false), None);
    assert_eq!(scene.find_child_by_name(root, "deep", true), Some(deep));
    assert_eq!(scene.find_child_by_name(root, "missing", true), None);
}

#[test]
fn scene_collect_subtree_parents_first() {
    let mut scene = Scene::new();
    let root = scene.create_node("root");
    let a = scene.create_child(root, "a");
    let b = scene.create_child(a, "b");

    let subtree = scene.collect_subtree(root);
    assert_eq!(subtree, vec![root, a, b]);
}

// ============================================================================
// Dirty Listeners & Transform Queue
// ============================================================================

/// Runs one headless frame so flags raised by model setup are cleared.
fn settle(scene: &mut Scene) {
    AnimatedModelSystem::run_frame(scene, &FrameInfo::new(None, 1, 0.0));
}

fn skinned_model() -> Arc<Model> {
    let skeleton = Skeleton::from_bones(vec![Bone::new("root", 0)]).unwrap();
    Arc::new(Model::new("m").with_skeleton(skeleton))
}

#[test]
fn set_transform_notifies_listeners_on_ancestors_only() {
    let mut scene = Scene::new();
    let owner = scene.create_node("owner");
    let other = scene.create_node("other");
    let key = scene.add_animated_model(owner, AnimatedModel::default()).unwrap();
    scene.set_model(key, Some(skinned_model()), true).unwrap();
    settle(&mut scene);

    scene.set_transform(other, BoneTransform::from_translation(Vec3::X));
    assert!(!scene.get_animated_model(key).unwrap().flags().skinning_dirty());

    scene.set_transform(owner, BoneTransform::from_translation(Vec3::X));
    assert!(scene.get_animated_model(key).unwrap().flags().skinning_dirty());
}

#[test]
fn set_transform_silent_does_not_notify() {
    let mut scene = Scene::new();
    let owner = scene.create_node("owner");
    let key = scene.add_animated_model(owner, AnimatedModel::default()).unwrap();
    scene.set_model(key, Some(skinned_model()), true).unwrap();
    settle(&mut scene);

    assert!(scene.set_transform_silent(owner, BoneTransform::from_translation(Vec3::Y)));
    assert!(!scene.get_animated_model(key).unwrap().flags().skinning_dirty());

    scene.mark_dirty(owner);
    assert!(scene.get_animated_model(key).unwrap().flags().skinning_dirty());
}

#[test]
fn queued_transforms_apply_on_update() {
    let mut scene = Scene::new();
    let node = scene.create_node("n");

    scene.queue_transform_update(node, BoneTransform::from_translation(Vec3::new(0.0, 2.0, 0.0)));
    assert_eq!(scene.pending_transform_updates(), 1);
    assert!(approx(scene.get_node(node).unwrap().transform.position.y, 0.0));

    scene.update_transforms();
    assert_eq!(scene.pending_transform_updates(), 0);
    let pos = scene.get_node(node).unwrap().transform.world_position();
    assert!(approx(pos.y, 2.0));
}

// ============================================================================
// Camera
// ============================================================================

#[test]
fn camera_perspective_distance_is_euclidean() {
    let camera = Camera::new_perspective().with_position(Vec3::new(0.0, 0.0, 10.0));
    assert!(approx(camera.distance(Vec3::ZERO), 10.0));
    assert!(approx(camera.distance(Vec3::new(0.0, 3.0, 6.0)), 5.0));
}

#[test]
fn camera_orthographic_distance_is_view_depth() {
    let mut camera = Camera::new_orthographic(5.0);
    camera.set_world_matrix(glam::Affine3A::from_rotation_translation(
        Quat::IDENTITY,
        Vec3::new(0.0, 0.0, 10.0),
    ));
    // Lateral offset does not count.
    assert!(approx(camera.distance(Vec3::new(100.0, 0.0, 0.0)), 10.0));
}

#[test]
fn camera_lod_distance() {
    let camera = Camera::new_perspective();
    assert!(approx(camera.lod_distance(100.0, 2.0, 1.0), 50.0));
    assert!(approx(camera.lod_distance(100.0, 2.0, 2.0), 25.0));

    let ortho = Camera::new_orthographic(8.0);
    assert!(approx(ortho.lod_distance(100.0, 2.0, 1.0), 4.0));
}

#[test]
fn camera_lod_distance_guards_zero_scale() {
    let camera = Camera::new_perspective();
    let lod = camera.lod_distance(1.0, 0.0, 1.0);
    assert!(lod.is_finite());
    assert!(lod > 0.0);
}
