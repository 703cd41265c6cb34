//! Animated model component
//!
//! Turns a skeleton, per-bone animation output and morph weights into skin
//! matrices and bone-driven bounds, following a three-phase frame:
//!
//! 1. **Prepare**: visibility, draw distance and animation LOD distance
//! 2. **Update**: gated animation evaluation, hierarchy composition, bounds,
//!    and queued bone node writes
//! 3. **Geometry**: forced evaluation owed from invisibility, skin matrices,
//!    morph-blended vertex data
//!
//! Several components may share one scene node. The first attached is the
//! master and owns the skeleton, morph authority and animation schedule;
//! the others reuse the master's bone nodes and copy its world bounds.
//!
//! Single-component behavior lives on [`AnimatedModel`]. Operations that
//! touch nodes or sibling components are on [`Scene`](crate::scene::Scene)
//! (see `attachment.rs`), and [`AnimatedModelSystem`] drives the phases.

mod attachment;
pub mod bounds;
pub mod flags;
pub mod morph;
pub mod skinning;
pub mod system;

pub use flags::UpdateFlags;
pub use morph::SoftwareModelAnimator;
pub use skinning::{SkinAlias, SkinMatrices};
pub use system::AnimatedModelSystem;

use std::sync::Arc;

use glam::{Affine3A, Vec3};
use slotmap::SlotMap;

use crate::animation::{
    AnimationLodGate, BoneTransform, EvaluatorRef, ModelAnimationOutput, compose_hierarchy,
    initialize_local_bone_transforms,
};
use crate::resources::{BoundingBox, Model, ModelMorph};
use crate::scene::{Camera, Node, NodeHandle};
use crate::settings::{AnimatedModelSettings, UpdateGeometryType};
use crate::skeleton::Skeleton;
use crate::utils::StringHash;

/// Weights object size equally along every axis for LOD scale.
const DOT_SCALE: Vec3 = Vec3::splat(1.0 / 3.0);

/// Per-frame input of the update phases.
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo<'a> {
    /// `None` when running headless; view-dependent skipping is disabled.
    pub camera: Option<&'a Camera>,
    pub frame_number: u32,
    pub time_step: f32,
}

impl<'a> FrameInfo<'a> {
    #[must_use]
    pub fn new(camera: Option<&'a Camera>, frame_number: u32, time_step: f32) -> Self {
        Self { camera, frame_number, time_step }
    }
}

/// A skinned, morphable model instance attached to a scene node.
#[derive(Debug)]
pub struct AnimatedModel {
    pub(crate) node: Option<NodeHandle>,
    pub(crate) model: Option<Arc<Model>>,
    settings: AnimatedModelSettings,

    // === Skeleton & animation ===
    pub(crate) skeleton: Skeleton,
    pub(crate) skeleton_data: Vec<ModelAnimationOutput>,
    pub(crate) evaluator: EvaluatorRef,
    pub(crate) lod_gate: AnimationLodGate,
    animation_lod_frame_number: u32,
    view_frame_number: u32,
    lod_distance: f32,
    distance: f32,

    // === Skinning ===
    pub(crate) geometry_bone_mappings: Vec<Vec<usize>>,
    pub(crate) skin: SkinMatrices,
    pub(crate) software_skinning: bool,

    // === Morphs ===
    pub(crate) morphs: Vec<ModelMorph>,
    pub(crate) animator: Option<SoftwareModelAnimator>,

    // === Bounds ===
    /// Static bounds of the model asset.
    pub(crate) bounding_box: BoundingBox,
    pub(crate) bone_bounding_box: BoundingBox,
    pub(crate) world_bounding_box: BoundingBox,

    pub(crate) flags: UpdateFlags,
    pub(crate) is_master: bool,
}

impl Default for AnimatedModel {
    fn default() -> Self {
        Self::new(AnimatedModelSettings::default())
    }
}

impl AnimatedModel {
    #[must_use]
    pub fn new(settings: AnimatedModelSettings) -> Self {
        let lod_gate = AnimationLodGate::new(settings.animation_lod_bias, settings.animation_lod_base_scale);
        Self {
            node: None,
            model: None,
            settings,

            skeleton: Skeleton::new(),
            skeleton_data: Vec::new(),
            evaluator: EvaluatorRef::none(),
            lod_gate,
            animation_lod_frame_number: 0,
            view_frame_number: 0,
            lod_distance: 0.0,
            distance: 0.0,

            geometry_bone_mappings: Vec::new(),
            skin: SkinMatrices::new(),
            software_skinning: false,

            morphs: Vec::new(),
            animator: None,

            bounding_box: BoundingBox::EMPTY,
            bone_bounding_box: BoundingBox::EMPTY,
            world_bounding_box: BoundingBox::EMPTY,

            flags: UpdateFlags::empty(),
            is_master: true,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn node(&self) -> Option<NodeHandle> {
        self.node
    }

    #[inline]
    #[must_use]
    pub fn model(&self) -> Option<&Arc<Model>> {
        self.model.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &AnimatedModelSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    /// Per-bone animation output, indexed like the skeleton's bones.
    #[inline]
    #[must_use]
    pub fn skeleton_data(&self) -> &[ModelAnimationOutput] {
        &self.skeleton_data
    }

    #[inline]
    #[must_use]
    pub fn skin_matrices(&self) -> &SkinMatrices {
        &self.skin
    }

    #[inline]
    #[must_use]
    pub fn flags(&self) -> UpdateFlags {
        self.flags
    }

    #[inline]
    #[must_use]
    pub fn is_master(&self) -> bool {
        self.is_master
    }

    #[inline]
    #[must_use]
    pub fn lod_gate(&self) -> &AnimationLodGate {
        &self.lod_gate
    }

    /// LOD distance driving the animation gate.
    #[inline]
    #[must_use]
    pub fn animation_lod_distance(&self) -> f32 {
        self.lod_gate.distance()
    }

    /// Drawable LOD distance from the last view update.
    #[inline]
    #[must_use]
    pub fn lod_distance(&self) -> f32 {
        self.lod_distance
    }

    /// Camera distance from the last view update.
    #[inline]
    #[must_use]
    pub fn distance(&self) -> f32 {
        self.distance
    }

    #[inline]
    #[must_use]
    pub fn view_frame_number(&self) -> u32 {
        self.view_frame_number
    }

    #[inline]
    #[must_use]
    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    /// Bone-driven bounds in component space.
    #[inline]
    #[must_use]
    pub fn bone_bounding_box(&self) -> &BoundingBox {
        &self.bone_bounding_box
    }

    /// World bounds committed by the last bounds update.
    #[inline]
    #[must_use]
    pub fn world_bounding_box(&self) -> &BoundingBox {
        &self.world_bounding_box
    }

    #[inline]
    #[must_use]
    pub fn is_software_skinning(&self) -> bool {
        self.software_skinning
    }

    #[inline]
    #[must_use]
    pub fn geometry_bone_mappings(&self) -> &[Vec<usize>] {
        &self.geometry_bone_mappings
    }

    /// CPU-deformed geometry, present once morphs or software skinning need it.
    #[inline]
    #[must_use]
    pub fn animator(&self) -> Option<&SoftwareModelAnimator> {
        self.animator.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn evaluator(&self) -> &EvaluatorRef {
        &self.evaluator
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Sets the animation LOD bias, clamped to non-negative.
    pub fn set_animation_lod_bias(&mut self, bias: f32) {
        self.settings.animation_lod_bias = bias.max(0.0);
        self.lod_gate.set_bias(bias);
    }

    pub fn set_update_invisible(&mut self, enable: bool) {
        self.settings.update_invisible = enable;
    }

    pub fn set_draw_distance(&mut self, distance: f32) {
        self.settings.draw_distance = distance.max(0.0);
    }

    pub fn set_lod_bias(&mut self, bias: f32) {
        self.settings.lod_bias = bias;
    }

    /// Enables or disables track evaluation for one bone.
    pub fn set_bone_animated(&mut self, index: usize, animated: bool) -> bool {
        match self.skeleton.bone_mut(index) {
            Some(bone) => {
                bone.animated = animated;
                true
            }
            None => false,
        }
    }

    /// Connects the animation source. The reference is weak: once the source
    /// is dropped the model gets no animation.
    pub fn connect_evaluator(&mut self, evaluator: EvaluatorRef) {
        self.evaluator = evaluator;
    }

    /// Requests a gated re-evaluation. Ignored on non-master instances.
    pub fn mark_animation_dirty(&mut self) {
        if self.is_master {
            self.flags.insert(UpdateFlags::ANIMATION_DIRTY);
        }
    }

    pub fn mark_morphs_dirty(&mut self) {
        self.flags.insert(UpdateFlags::MORPHS_DIRTY);
    }

    /// The owner node or a bone node moved.
    pub fn on_marked_dirty(&mut self) {
        if !self.skeleton.is_empty() {
            self.flags.insert(UpdateFlags::SKINNING_DIRTY | UpdateFlags::BOUNDS_DIRTY);
        }
    }

    // ========================================================================
    // Morph weights
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn morphs(&self) -> &[ModelMorph] {
        &self.morphs
    }

    #[inline]
    #[must_use]
    pub fn num_morphs(&self) -> usize {
        self.morphs.len()
    }

    /// Weight of morph `index`, `0.0` if out of range.
    #[must_use]
    pub fn morph_weight(&self, index: usize) -> f32 {
        self.morphs.get(index).map_or(0.0, |m| m.weight)
    }

    #[must_use]
    pub fn morph_weight_by_name(&self, name: &str) -> f32 {
        self.morphs.iter().find(|m| m.name == name).map_or(0.0, |m| m.weight)
    }

    #[must_use]
    pub fn morph_weight_by_hash(&self, name_hash: StringHash) -> f32 {
        self.morphs.iter().find(|m| m.name_hash == name_hash).map_or(0.0, |m| m.weight)
    }

    #[must_use]
    pub fn morph_index(&self, name: &str) -> Option<usize> {
        self.morphs.iter().position(|m| m.name == name)
    }

    #[must_use]
    pub fn morph_index_by_hash(&self, name_hash: StringHash) -> Option<usize> {
        self.morphs.iter().position(|m| m.name_hash == name_hash)
    }

    /// Sets one weight on this instance only, clamped to `[0, 1]`.
    ///
    /// Returns the morph's name hash if the weight changed.
    pub(crate) fn set_morph_weight_local(&mut self, index: usize, weight: f32) -> Option<StringHash> {
        if index >= self.morphs.len() || weight.is_nan() {
            return None;
        }
        let weight = weight.clamp(0.0, 1.0);

        // Vertex copies are created on demand.
        if weight != 0.0 && self.animator.is_none() {
            self.clone_geometries();
        }

        let morph = &mut self.morphs[index];
        if morph.weight == weight {
            return None;
        }
        morph.weight = weight;
        let name_hash = morph.name_hash;

        self.mark_morphs_dirty();
        Some(name_hash)
    }

    pub(crate) fn reset_morph_weights_local(&mut self) {
        for morph in &mut self.morphs {
            morph.weight = 0.0;
        }
        self.mark_morphs_dirty();
    }

    // ========================================================================
    // Phase 1: Prepare
    // ========================================================================

    /// Decides whether this instance takes part in the update phase.
    ///
    /// With a camera, a model not seen for more than one frame is skipped
    /// unless `update_invisible` is set; if animation was owed, the LOD gate
    /// is reset and a forced update is recorded instead. Otherwise the draw
    /// distance is checked and the animation LOD distance refreshed.
    pub fn prepare(&mut self, nodes: &SlotMap<NodeHandle, Node>, camera: Option<&Camera>, frame_number: u32) -> bool {
        let Some(owner) = self.node.and_then(|handle| nodes.get(handle)) else {
            return false;
        };
        let Some(camera) = camera else {
            return true;
        };
        if frame_number.abs_diff(self.view_frame_number) <= 1 {
            return true;
        }

        if self.view_frame_number != 0 && !self.settings.update_invisible {
            if self.flags.animation_dirty() {
                self.lod_gate.reset();
                self.flags.insert(UpdateFlags::FORCE_ANIMATION_UPDATE);
            }
            return false;
        }

        self.view_frame_number = self.view_frame_number.max(1);

        let distance = camera.distance(owner.transform.world_position());
        if self.settings.draw_distance > 0.0 && distance > self.settings.draw_distance {
            return false;
        }

        let scale = self.world_bounding_box.size().dot(DOT_SCALE);
        self.lod_gate
            .set_distance(camera.lod_distance(distance, scale, self.settings.lod_bias));
        true
    }

    // ========================================================================
    // Phase 2: Update
    // ========================================================================

    /// Refreshes the local transform of every bone from its node, or from
    /// the bind pose when `reset_to_bind_pose` is set or the node is missing.
    pub fn initialize_local_bone_transforms(&mut self, nodes: &SlotMap<NodeHandle, Node>, reset_to_bind_pose: bool) {
        self.skeleton_data.resize_with(self.skeleton.num_bones(), ModelAnimationOutput::default);
        initialize_local_bone_transforms(&self.skeleton, nodes, &mut self.skeleton_data, reset_to_bind_pose);
    }

    /// Runs the track evaluator over the animation output.
    ///
    /// Clears `ANIMATION_DIRTY` and sets `BOUNDS_DIRTY`. A dropped evaluator
    /// leaves the output untouched.
    pub fn calculate_animations(&mut self) {
        debug_assert!(self.is_master);

        if let Some(evaluator) = self.evaluator.upgrade() {
            evaluator.evaluate_into(&self.skeleton, &mut self.skeleton_data);
        }

        self.flags.remove(UpdateFlags::ANIMATION_DIRTY);
        self.flags.insert(UpdateFlags::BOUNDS_DIRTY);
    }

    /// Composes the hierarchy and recomputes bone-driven local bounds.
    pub fn calculate_local_bounding_box(&mut self) {
        self.skeleton_data.resize_with(self.skeleton.num_bones(), ModelAnimationOutput::default);
        compose_hierarchy(&self.skeleton, &mut self.skeleton_data);
        self.bone_bounding_box = bounds::compute_local_bounds(&self.skeleton, &self.skeleton_data);
        self.flags.remove(UpdateFlags::BOUNDS_DIRTY);
    }

    /// Advances the LOD gate and reports whether evaluation is due.
    pub fn check_animation_due(&mut self, time_step: f32) -> bool {
        self.lod_gate.check_due(time_step)
    }

    /// The update phase, run after [`prepare`](Self::prepare) returned true.
    ///
    /// On the master, new bone transforms are pushed to `queue` instead of
    /// being written to the nodes. Siblings only refresh their bounds.
    pub fn update(
        &mut self,
        nodes: &SlotMap<NodeHandle, Node>,
        time_step: f32,
        queue: &mut Vec<(NodeHandle, BoneTransform)>,
    ) {
        if !self.is_master {
            // One frame behind the master's committed transforms.
            if self.flags.bounds_dirty() {
                self.initialize_local_bone_transforms(nodes, false);
                self.calculate_local_bounding_box();
            }
            return;
        }

        let mut transforms_dirty = false;
        if self.flags.intersects(UpdateFlags::ANIMATION_DIRTY | UpdateFlags::BOUNDS_DIRTY) {
            self.initialize_local_bone_transforms(nodes, false);

            if self.flags.animation_dirty() && self.check_animation_due(time_step) {
                self.calculate_animations();
                transforms_dirty = true;
            }

            if self.flags.bounds_dirty() {
                self.calculate_local_bounding_box();
            }
        }

        if transforms_dirty {
            for (bone, output) in self.skeleton.bones().iter().zip(&self.skeleton_data) {
                if let Some(node) = bone.node() {
                    queue.push((node, output.local_to_parent));
                }
            }
        }
    }

    /// Evaluates and writes bone nodes immediately and silently.
    ///
    /// Returns true if nodes were written; the caller then marks the owner
    /// node dirty so propagation happens once.
    pub fn apply_animation(&mut self, nodes: &mut SlotMap<NodeHandle, Node>) -> bool {
        if !self.is_master {
            return false;
        }

        self.initialize_local_bone_transforms(nodes, false);
        self.calculate_animations();
        self.calculate_local_bounding_box();

        for (bone, output) in self.skeleton.bones().iter().zip(&self.skeleton_data) {
            if let Some(node) = bone.node().and_then(|handle| nodes.get_mut(handle)) {
                node.transform.set_trs(output.local_to_parent);
            }
        }
        true
    }

    /// Settles a forced update owed since the model left the view.
    pub(crate) fn apply_forced_animation(&mut self, nodes: &mut SlotMap<NodeHandle, Node>, time_step: f32) -> bool {
        if !self.flags.force_animation_update() {
            return false;
        }
        self.flags.remove(UpdateFlags::FORCE_ANIMATION_UPDATE);

        // The gate was reset when the update was owed.
        let due = self.check_animation_due(time_step);
        debug_assert!(due);

        self.apply_animation(nodes)
    }

    // ========================================================================
    // View & bounds
    // ========================================================================

    /// Records that the model was rendered by `camera` in `frame_number`.
    ///
    /// LOD scale comes from the static model bounds so animation does not
    /// change it. When several views render in one frame, the animation LOD
    /// distance keeps the minimum.
    pub fn update_view(&mut self, nodes: &SlotMap<NodeHandle, Node>, camera: &Camera, frame_number: u32) {
        let world = self
            .node
            .and_then(|handle| nodes.get(handle))
            .map_or(Affine3A::IDENTITY, |node| *node.world_matrix());

        let center = if self.world_bounding_box.is_defined() {
            self.world_bounding_box.center()
        } else {
            world.translation.into()
        };
        self.distance = camera.distance(center);

        let scale = self.bounding_box.transform(&world).size().dot(DOT_SCALE);
        let new_lod_distance = camera.lod_distance(self.distance, scale, self.settings.lod_bias);

        if frame_number != self.animation_lod_frame_number {
            self.lod_gate.set_distance(new_lod_distance);
            self.animation_lod_frame_number = frame_number;
        } else {
            self.lod_gate
                .set_distance(self.lod_gate.distance().min(new_lod_distance));
        }

        self.lod_distance = new_lod_distance;
        self.view_frame_number = frame_number;
    }

    /// Whether `frame` rendered this model. Headless frames render everything.
    #[inline]
    #[must_use]
    pub fn is_in_view(&self, frame: &FrameInfo) -> bool {
        frame.camera.is_none() || self.view_frame_number == frame.frame_number
    }

    /// Master world bounds: bone bounds placed by the owner world transform.
    pub(crate) fn update_world_bounds_from(&mut self, owner_world: &Affine3A) {
        self.world_bounding_box = self.bone_bounding_box.transform(owner_world);
    }

    // ========================================================================
    // Phase 3: Geometry
    // ========================================================================

    /// Which kind of thread the geometry phase needs this frame.
    #[must_use]
    pub fn update_geometry_type(&self) -> UpdateGeometryType {
        let flags = self.flags;
        if flags.morphs_dirty()
            || flags.force_animation_update()
            || (flags.skinning_dirty() && self.software_skinning)
        {
            UpdateGeometryType::MainThread
        } else if flags.skinning_dirty() {
            UpdateGeometryType::WorkerThread
        } else {
            UpdateGeometryType::None
        }
    }

    /// Rebuilds skin matrices from bone node world transforms.
    ///
    /// Requires world transform propagation for this frame to be done.
    /// Only reads `nodes`, so instances may run concurrently.
    pub fn update_skinning(&mut self, nodes: &SlotMap<NodeHandle, Node>) {
        let fallback = self
            .node
            .and_then(|handle| nodes.get(handle))
            .map_or(Affine3A::IDENTITY, |node| *node.world_matrix());

        if self.skin.global().len() != self.skeleton.num_bones() {
            self.skin.resize(self.skeleton.num_bones());
            self.set_geometry_bone_mappings();
        }
        self.skin.build(&self.skeleton, nodes, &fallback);

        self.flags.remove(UpdateFlags::SKINNING_DIRTY);
        if self.software_skinning {
            self.flags.insert(UpdateFlags::MORPHS_DIRTY);
        }
    }

    /// Rebuilds CPU vertex data from morph weights and, under software
    /// skinning, the skin matrices.
    pub fn update_morphs(&mut self) {
        if let Some(animator) = self.animator.as_mut() {
            animator.reset_animation();
            animator.apply_morphs(&self.morphs);
            if self.software_skinning {
                animator.apply_skinning(self.skin.global());
            }
            animator.commit();
        }
        self.flags.remove(UpdateFlags::MORPHS_DIRTY);
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Creates the private vertex copies used for morphs and software skinning.
    pub(crate) fn clone_geometries(&mut self) {
        if let Some(model) = &self.model {
            self.animator = Some(SoftwareModelAnimator::new(Arc::clone(model), self.software_skinning));
            self.mark_morphs_dirty();
        }
    }

    pub(crate) fn update_software_skinning_state(&mut self) {
        let has_mappings = self.geometry_bone_mappings.iter().any(|m| !m.is_empty());
        self.software_skinning = self.model.as_ref().is_some_and(|model| {
            self.settings
                .use_software_skinning(model.skeleton.num_bones(), has_mappings)
        });
    }

    /// Rebuilds per-geometry skin storage and the alias table.
    pub(crate) fn set_geometry_bone_mappings(&mut self) {
        self.skin.clear_geometry_mappings();

        if self.geometry_bone_mappings.iter().all(Vec::is_empty) {
            return;
        }
        if self.software_skinning {
            log::warn!("Geometry bone mappings are ignored in software skinning");
            return;
        }

        self.skin
            .set_geometry_bone_mappings(self.geometry_bone_mappings.iter().map(Vec::as_slice));
    }
}
