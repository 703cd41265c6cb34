//! Animation Tests
//!
//! Tests for:
//! - Local transform initialization (node vs bind pose)
//! - Hierarchy composition in processing order
//! - AnimationLodGate cadence
//! - PoseEvaluator blending and EvaluatorRef weak semantics

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use glam::{Affine3A, Quat, Vec3};
use slotmap::SlotMap;

use myth_animated::animation::{
    AnimationLodGate, BoneTransform, ChannelMask, EvaluatorRef, ModelAnimationOutput,
    PoseEvaluator, TrackEvaluator, compose_hierarchy, initialize_local_bone_transforms,
};
use myth_animated::scene::{Node, NodeHandle};
use myth_animated::skeleton::{Bone, Skeleton};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    approx(a.x, b.x) && approx(a.y, b.y) && approx(a.z, b.z)
}

fn translated(name: &str, parent: usize, offset: Vec3) -> Bone {
    Bone::new(name, parent).with_initial_transform(offset, Quat::IDENTITY, Vec3::ONE)
}

fn outputs_for(skeleton: &Skeleton) -> Vec<ModelAnimationOutput> {
    vec![ModelAnimationOutput::default(); skeleton.num_bones()]
}

fn empty_nodes() -> SlotMap<NodeHandle, Node> {
    SlotMap::with_key()
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn composition_three_bone_chain() {
    let skeleton = Skeleton::from_bones(vec![
        translated("root", 0, Vec3::X),
        translated("child", 0, Vec3::X),
        translated("grandchild", 1, Vec3::X),
    ])
    .unwrap();

    let mut outputs = outputs_for(&skeleton);
    initialize_local_bone_transforms(&skeleton, &empty_nodes(), &mut outputs, true);
    compose_hierarchy(&skeleton, &mut outputs);

    assert!(vec3_approx(outputs[0].local_to_component.translation.into(), Vec3::new(1.0, 0.0, 0.0)));
    assert!(vec3_approx(outputs[1].local_to_component.translation.into(), Vec3::new(2.0, 0.0, 0.0)));
    assert!(vec3_approx(outputs[2].local_to_component.translation.into(), Vec3::new(3.0, 0.0, 0.0)));
}

#[test]
fn composition_equals_product_of_ancestors() {
    let locals = [
        BoneTransform::new(Vec3::new(0.0, 1.0, 0.0), Quat::from_rotation_y(0.4), Vec3::splat(2.0)),
        BoneTransform::new(Vec3::new(1.0, 0.0, 0.0), Quat::from_rotation_z(FRAC_PI_2), Vec3::ONE),
        BoneTransform::new(Vec3::new(0.0, 0.0, 3.0), Quat::from_rotation_x(-0.2), Vec3::splat(0.5)),
        BoneTransform::new(Vec3::new(0.5, 0.5, 0.0), Quat::IDENTITY, Vec3::ONE),
    ];
    // 0 <- 1 <- 2, 0 <- 3, listed out of depth order.
    let parents = [0usize, 0, 1, 0];
    let bones: Vec<Bone> = locals
        .iter()
        .zip(parents)
        .enumerate()
        .map(|(i, (local, parent))| {
            Bone::new(&format!("b{i}"), parent).with_initial_transform(local.position, local.rotation, local.scale)
        })
        .collect();
    let skeleton = Skeleton::from_bones(bones).unwrap();

    let mut outputs = outputs_for(&skeleton);
    initialize_local_bone_transforms(&skeleton, &empty_nodes(), &mut outputs, true);
    compose_hierarchy(&skeleton, &mut outputs);

    let expected_2 = locals[0].to_affine() * locals[1].to_affine() * locals[2].to_affine();
    assert!(outputs[2].local_to_component.abs_diff_eq(expected_2, 1e-4));

    let expected_3 = locals[0].to_affine() * locals[3].to_affine();
    assert!(outputs[3].local_to_component.abs_diff_eq(expected_3, 1e-4));
}

#[test]
fn composition_handles_child_listed_before_parent() {
    let skeleton = Skeleton::from_bones(vec![
        translated("leaf", 2, Vec3::Y),
        translated("root", 1, Vec3::Y),
        translated("mid", 1, Vec3::Y),
    ])
    .unwrap();

    let mut outputs = outputs_for(&skeleton);
    initialize_local_bone_transforms(&skeleton, &empty_nodes(), &mut outputs, true);
    compose_hierarchy(&skeleton, &mut outputs);

    assert!(vec3_approx(outputs[0].local_to_component.translation.into(), Vec3::new(0.0, 3.0, 0.0)));
}

#[test]
fn reset_to_bind_pose_is_idempotent() {
    let skeleton = Skeleton::from_bones(vec![
        translated("root", 0, Vec3::X),
        Bone::new("child", 0).with_initial_transform(Vec3::Y, Quat::from_rotation_z(0.7), Vec3::splat(1.5)),
    ])
    .unwrap();

    let mut outputs = outputs_for(&skeleton);
    outputs[1].dirty = ChannelMask::ROTATION;
    outputs[1].local_to_parent.position = Vec3::splat(42.0);

    initialize_local_bone_transforms(&skeleton, &empty_nodes(), &mut outputs, true);
    let first = outputs.clone();
    initialize_local_bone_transforms(&skeleton, &empty_nodes(), &mut outputs, true);

    assert_eq!(first, outputs);
    assert_eq!(outputs[1].dirty, ChannelMask::empty());
    assert_eq!(outputs[1].local_to_parent.position, Vec3::Y);
}

// ============================================================================
// LOD Gate
// ============================================================================

#[test]
fn lod_gate_scenario() {
    let mut gate = AnimationLodGate::new(1.0, 1.0);
    gate.set_distance(10.0);

    assert!(gate.check_due(1.0), "first call is always due");
    assert_eq!(gate.timer(), Some(0.0));

    for step in 1..10 {
        assert!(!gate.check_due(1.0), "step {step} should not be due");
        assert_eq!(gate.timer(), Some(step as f32));
    }

    assert!(gate.check_due(1.0));
    assert_eq!(gate.timer(), Some(0.0));
}

#[test]
fn lod_gate_wraps_instead_of_resetting() {
    let mut gate = AnimationLodGate::new(1.0, 1.0);
    gate.set_distance(10.0);
    gate.check_due(0.0);

    assert!(gate.check_due(13.0));
    assert!(approx(gate.timer().unwrap(), 3.0));
}

#[test]
fn lod_gate_due_count_matches_cadence() {
    // Power-of-two steps keep the accumulation exact.
    let cases = [(1.0_f32, 10.0_f32, 1.0_f32), (0.5, 7.0, 1.0), (1.0, 0.5, 1.0), (2.0, 0.25, 1.0)];

    for (bias, distance, base_scale) in cases {
        let mut gate = AnimationLodGate::new(bias, base_scale);
        gate.set_distance(distance);

        let dt = 1.0 / 64.0;
        let steps = 600;
        let total_time = dt * steps as f32;

        let due = (0..steps).filter(|_| gate.check_due(dt)).count();
        let expected = (bias * total_time * base_scale / distance).floor() as usize;
        assert!(
            due == expected || due == expected + 1,
            "bias {bias}, distance {distance}: {due} due, expected {expected} (+1)"
        );
    }
}

#[test]
fn lod_gate_default_uses_base_scale() {
    let gate = AnimationLodGate::default();
    assert_eq!(gate.base_scale(), 2500.0);
    assert_eq!(gate.bias(), 1.0);
    assert_eq!(gate.timer(), None);
}

// ============================================================================
// Evaluators
// ============================================================================

#[test]
fn pose_evaluator_writes_driven_bones_only() {
    let skeleton = Skeleton::from_bones(vec![translated("root", 0, Vec3::X), translated("arm", 0, Vec3::X)]).unwrap();
    let mut outputs = outputs_for(&skeleton);
    initialize_local_bone_transforms(&skeleton, &empty_nodes(), &mut outputs, true);

    let pose = PoseEvaluator::new();
    pose.set_bone("arm", BoneTransform::from_translation(Vec3::new(0.0, 4.0, 0.0)));
    pose.evaluate_into(&skeleton, &mut outputs);

    assert_eq!(outputs[0].local_to_parent.position, Vec3::X);
    assert_eq!(outputs[0].dirty, ChannelMask::empty());
    assert_eq!(outputs[1].local_to_parent.position, Vec3::new(0.0, 4.0, 0.0));
    assert_eq!(outputs[1].dirty, ChannelMask::all());
    assert_eq!(pose.evaluation_count(), 1);
}

#[test]
fn pose_evaluator_blends_selected_channels() {
    let skeleton = Skeleton::from_bones(vec![translated("root", 0, Vec3::ZERO)]).unwrap();
    let mut outputs = outputs_for(&skeleton);
    initialize_local_bone_transforms(&skeleton, &empty_nodes(), &mut outputs, true);

    let pose = PoseEvaluator::new();
    pose.set_bone_channels(
        "root",
        BoneTransform::new(Vec3::new(10.0, 0.0, 0.0), Quat::from_rotation_y(1.0), Vec3::ONE),
        ChannelMask::POSITION,
        0.5,
    );
    pose.evaluate_into(&skeleton, &mut outputs);

    assert!(vec3_approx(outputs[0].local_to_parent.position, Vec3::new(5.0, 0.0, 0.0)));
    assert_eq!(outputs[0].local_to_parent.rotation, Quat::IDENTITY);
    assert_eq!(outputs[0].dirty, ChannelMask::POSITION);
}

#[test]
fn pose_evaluator_skips_non_animated_bones() {
    let skeleton = Skeleton::from_bones(vec![translated("root", 0, Vec3::X).with_animated(false)]).unwrap();
    let mut outputs = outputs_for(&skeleton);
    initialize_local_bone_transforms(&skeleton, &empty_nodes(), &mut outputs, true);

    let pose = PoseEvaluator::new();
    pose.set_bone("root", BoneTransform::from_translation(Vec3::Z));
    pose.evaluate_into(&skeleton, &mut outputs);

    assert_eq!(outputs[0].local_to_parent.position, Vec3::X);
}

#[test]
fn evaluator_ref_does_not_keep_source_alive() {
    let pose = Arc::new(PoseEvaluator::new());
    let reference = EvaluatorRef::new(&pose);
    assert!(reference.is_connected());
    assert!(reference.upgrade().is_some());

    drop(pose);
    assert!(!reference.is_connected());
    assert!(reference.upgrade().is_none());
    assert!(!EvaluatorRef::none().is_connected());
}

#[test]
fn bone_transform_identity_matrix() {
    assert!(BoneTransform::IDENTITY.to_affine().abs_diff_eq(Affine3A::IDENTITY, EPSILON));
}
