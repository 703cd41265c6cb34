use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::animated_model::{AnimatedModel, FrameInfo};
use crate::scene::{Camera, ModelKey, Node, NodeHandle, Scene};
use crate::settings::UpdateGeometryType;

/// Animated model system.
///
/// Drives the frame phases of every [`AnimatedModel`] in a [`Scene`]:
///
/// ```text
/// update()            Prepare + Update, bone writes queued
/// scene.update_transforms()
/// update_bounds()     world bounds, masters before siblings
/// update_views()      per rendered view: LOD distances
/// update_geometry()   forced updates, skin matrices, morphs
/// ```
///
/// [`AnimatedModelSystem::run_frame`] runs the whole sequence with every
/// model treated as in view.
pub struct AnimatedModelSystem;

impl AnimatedModelSystem {
    /// Runs Prepare and Update for every model.
    ///
    /// Pending bone assignments are resolved first. Master bone transforms
    /// land in the scene's transform queue and take effect on the next
    /// [`Scene::update_transforms`].
    pub fn update(scene: &mut Scene, frame: &FrameInfo) {
        let pending: SmallVec<[ModelKey; 8]> = scene
            .animated_models
            .iter()
            .filter(|(_, model)| model.flags().assign_bones_pending())
            .map(|(key, _)| key)
            .collect();
        for key in pending {
            if let Err(err) = scene.assign_bone_nodes(key) {
                log::warn!("Bone assignment failed: {err}");
            }
        }

        for model in scene.animated_models.values_mut() {
            if model.prepare(&scene.nodes, frame.camera, frame.frame_number) {
                model.update(&scene.nodes, frame.time_step, &mut scene.transform_queue);
            }
        }
    }

    /// Commits world bounds. Masters go first so siblings copy this frame's
    /// master world bounds. A sibling's own bone bounds lag one frame, since
    /// they are read from the bone nodes the master wrote last frame.
    pub fn update_bounds(scene: &mut Scene) {
        let mut keys: Vec<(ModelKey, bool)> = scene
            .animated_models
            .iter()
            .map(|(key, model)| (key, model.is_master()))
            .collect();
        keys.sort_by_key(|&(_, is_master)| !is_master);

        for (key, _) in keys {
            scene.update_world_bounding_box(key);
        }
    }

    /// Records a rendered view for every model `is_visible` accepts.
    pub fn update_views<F>(scene: &mut Scene, camera: &Camera, frame_number: u32, is_visible: F)
    where
        F: Fn(ModelKey) -> bool,
    {
        for (key, model) in &mut scene.animated_models {
            if is_visible(key) {
                model.update_view(&scene.nodes, camera, frame_number);
            }
        }
    }

    /// The geometry phase, for models rendered in `frame` only.
    ///
    /// Main-thread work (forced animation, software skinning, morphs) runs
    /// first and in sequence since it writes nodes and vertex data. The
    /// remaining skin matrix rebuilds only read node world transforms and
    /// run in parallel with the `parallel` feature. Models out of view keep
    /// their dirty flags, and an owed forced update, until they are seen.
    pub fn update_geometry(scene: &mut Scene, frame: &FrameInfo) {
        let main_thread: SmallVec<[ModelKey; 8]> = scene
            .animated_models
            .iter()
            .filter(|(_, model)| {
                model.is_in_view(frame) && model.update_geometry_type() == UpdateGeometryType::MainThread
            })
            .map(|(key, _)| key)
            .collect();

        for key in main_thread {
            Self::update_geometry_main_thread(scene, key, frame.time_step);
        }

        let nodes = &scene.nodes;
        let workers: Vec<&mut AnimatedModel> = scene
            .animated_models
            .values_mut()
            .filter(|model| model.is_in_view(frame) && model.update_geometry_type() == UpdateGeometryType::WorkerThread)
            .collect();
        update_skinning_batch(workers, nodes);
    }

    fn update_geometry_main_thread(scene: &mut Scene, key: ModelKey, time_step: f32) {
        let Some(model) = scene.animated_models.get_mut(key) else {
            return;
        };
        let owner = model.node();

        if model.apply_forced_animation(&mut scene.nodes, time_step) {
            if let Some(owner) = owner {
                // Bone nodes were written silently.
                scene.mark_dirty(owner);
                scene.update_subtree(owner);
            }
            scene.update_world_bounding_box(key);
        }

        let Some(model) = scene.animated_models.get_mut(key) else {
            return;
        };
        if model.flags().skinning_dirty() {
            model.update_skinning(&scene.nodes);
        }
        if model.flags().morphs_dirty() {
            model.update_morphs();
        }
    }

    /// Runs one full frame, treating every model as in view of
    /// `frame.camera`.
    pub fn run_frame(scene: &mut Scene, frame: &FrameInfo) {
        Self::update(scene, frame);
        scene.update_transforms();
        Self::update_bounds(scene);
        if let Some(camera) = frame.camera {
            Self::update_views(scene, camera, frame.frame_number, |_| true);
        }
        Self::update_geometry(scene, frame);
    }
}

#[cfg(feature = "parallel")]
fn update_skinning_batch(mut models: Vec<&mut AnimatedModel>, nodes: &SlotMap<NodeHandle, Node>) {
    use rayon::prelude::*;

    models
        .par_iter_mut()
        .for_each(|model| model.update_skinning(nodes));
}

#[cfg(not(feature = "parallel"))]
fn update_skinning_batch(models: Vec<&mut AnimatedModel>, nodes: &SlotMap<NodeHandle, Node>) {
    for model in models {
        model.update_skinning(nodes);
    }
}
