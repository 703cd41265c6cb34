//! Transform and TransformSystem tests
//!
//! Tests for:
//! - Transform TRS operations and dirty checking
//! - BoneTransform conversion
//! - Hierarchical matrix propagation (iterative, subtree)

use glam::{Affine3A, Quat, Vec3};
use myth_animated::animation::BoneTransform;
use myth_animated::scene::{NodeHandle, Scene};
use myth_animated::scene::node::Node;
use myth_animated::scene::transform::Transform;
use myth_animated::scene::transform_system::*;
use slotmap::SlotMap;
use std::f32::consts::FRAC_PI_2;

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-5;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
}

// ============================================================================
// Transform Unit Tests
// ============================================================================

#[test]
fn transform_default_is_identity() {
    let t = Transform::new();
    assert_eq!(t.position, Vec3::ZERO);
    assert_eq!(t.rotation, Quat::IDENTITY);
    assert_eq!(t.scale, Vec3::ONE);
}

#[test]
fn transform_update_local_matrix_dirty_check() {
    let mut t = Transform::new();

    // First call should always return true (force_update starts true)
    assert!(t.update_local_matrix());

    // Second call without changes should return false
    assert!(!t.update_local_matrix());

    t.position = Vec3::new(1.0, 2.0, 3.0);
    assert!(t.update_local_matrix());
    assert!(!t.update_local_matrix());

    t.rotation = Quat::from_rotation_y(FRAC_PI_2);
    assert!(t.update_local_matrix());
    assert!(!t.update_local_matrix());

    t.scale = Vec3::splat(2.0);
    assert!(t.update_local_matrix());
    assert!(!t.update_local_matrix());
}

#[test]
fn transform_mark_dirty_forces_rebuild() {
    let mut t = Transform::new();
    t.update_local_matrix();
    t.mark_dirty();
    assert!(t.update_local_matrix());
}

#[test]
fn transform_local_matrix_reflects_trs() {
    let mut t = Transform::new();
    t.position = Vec3::new(10.0, 20.0, 30.0);
    t.scale = Vec3::splat(2.0);
    t.update_local_matrix();

    let expected = Affine3A::from_scale_rotation_translation(Vec3::splat(2.0), Quat::IDENTITY, t.position);
    assert!(t.local_matrix().abs_diff_eq(expected, EPSILON));
}

#[test]
fn transform_set_trs_round_trips_bone_transform() {
    let bone = BoneTransform::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_z(0.5), Vec3::splat(0.5));
    let t = Transform::from_bone_transform(bone);
    assert_eq!(t.bone_transform(), bone);
}

#[test]
fn bone_transform_to_affine_matches_glam() {
    let bone = BoneTransform::new(Vec3::X, Quat::from_rotation_x(FRAC_PI_2), Vec3::ONE);
    let expected = Affine3A::from_rotation_translation(bone.rotation, bone.position);
    assert!(bone.to_affine().abs_diff_eq(expected, EPSILON));
}

// ============================================================================
// Transform System
// ============================================================================

#[test]
fn hierarchy_update_composes_parent_first() {
    let mut scene = Scene::new();
    let parent = scene.create_node("parent");
    let child = scene.create_child(parent, "child");
    let grandchild = scene.create_child(child, "grandchild");

    scene.get_node_mut(parent).unwrap().transform.position = Vec3::new(1.0, 0.0, 0.0);
    scene.get_node_mut(child).unwrap().transform.rotation = Quat::from_rotation_z(FRAC_PI_2);
    scene.get_node_mut(grandchild).unwrap().transform.position = Vec3::new(1.0, 0.0, 0.0);

    update_hierarchy_iterative(&mut scene.nodes, &scene.root_nodes);

    // Child rotates +X onto +Y.
    let pos = scene.get_node(grandchild).unwrap().transform.world_position();
    assert!(vec3_approx(pos, Vec3::new(1.0, 1.0, 0.0)), "got {pos}");
}

#[test]
fn subtree_update_uses_parent_world_matrix() {
    let mut scene = Scene::new();
    let parent = scene.create_node("parent");
    let child = scene.create_child(parent, "child");
    scene.get_node_mut(parent).unwrap().transform.position = Vec3::new(0.0, 0.0, 5.0);
    scene.update_transforms();

    scene.get_node_mut(child).unwrap().transform.position = Vec3::X;
    update_subtree(&mut scene.nodes, child);

    let pos = scene.get_node(child).unwrap().transform.world_position();
    assert!(vec3_approx(pos, Vec3::new(1.0, 0.0, 5.0)));
}

#[test]
fn hierarchy_update_multiple_roots() {
    let mut nodes: SlotMap<NodeHandle, Node> = SlotMap::with_key();

    let mut a = Node::new("a");
    a.transform.position = Vec3::X;
    let a = nodes.insert(a);

    let mut b = Node::new("b");
    b.transform.position = Vec3::Y;
    b.transform.rotation = Quat::from_rotation_z(FRAC_PI_2);
    let b = nodes.insert(b);

    update_hierarchy_iterative(&mut nodes, &[a, b]);

    assert!(vec3_approx(nodes[a].transform.world_position(), Vec3::X));
    assert!(vec3_approx(nodes[b].transform.world_position(), Vec3::Y));
}

#[test]
fn hierarchy_update_is_stable_without_changes() {
    let mut nodes: SlotMap<NodeHandle, Node> = SlotMap::with_key();
    let mut node = Node::new("a");
    node.transform.position = Vec3::new(0.0, 0.0, 4.0);
    let a = nodes.insert(node);

    update_hierarchy_iterative(&mut nodes, &[a]);
    let first = *nodes[a].world_matrix();
    update_hierarchy_iterative(&mut nodes, &[a]);
    assert_eq!(*nodes[a].world_matrix(), first);
}

#[test]
fn subtree_update_ignores_missing_node() {
    let mut nodes: SlotMap<NodeHandle, Node> = SlotMap::with_key();
    let a = nodes.insert(Node::new("a"));
    nodes.remove(a);
    // Must not panic.
    update_subtree(&mut nodes, a);
}
