//! Scene-level animated model operations
//!
//! Everything here reaches beyond one component: bone node creation and
//! lookup, sibling coordination through the owner node and dirty listener
//! registration.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::animated_model::{AnimatedModel, UpdateFlags, bounds};
use crate::animation::{BoneTransform, ModelAnimationOutput};
use crate::errors::{AnimationError, Result};
use crate::resources::{BoundingBox, Model};
use crate::scene::{ModelKey, NodeHandle, Scene};
use crate::skeleton::Skeleton;
use crate::utils::StringHash;

impl Scene {
    // ========================================================================
    // Attachment
    // ========================================================================

    /// Attaches an animated model component to `node`.
    ///
    /// The first component attached to a node becomes its master.
    pub fn add_animated_model(&mut self, node: NodeHandle, mut model: AnimatedModel) -> Result<ModelKey> {
        if !self.nodes.contains_key(node) {
            log::error!("Can not attach animated model to a missing scene node");
            return Err(AnimationError::NotAttached("attach to a missing node"));
        }

        model.node = Some(node);
        model.is_master = self.master_model(node).is_none();
        let key = self.animated_models.insert(model);

        if let Some(list) = self.model_components.get_mut(node) {
            list.push(key);
        } else {
            let mut list = SmallVec::new();
            list.push(key);
            self.model_components.insert(node, list);
        }
        self.add_dirty_listener(node, key);

        Ok(key)
    }

    /// Detaches and returns a component.
    ///
    /// The bone hierarchy is removed with the last component on the node.
    /// When a master is removed, the next sibling adopts the role on its
    /// next world bounds update. The remaining master drops the collision
    /// shapes merged from the removed component.
    pub fn remove_animated_model(&mut self, key: ModelKey) -> Option<AnimatedModel> {
        let model = self.animated_models.remove(key)?;
        self.remove_listener_everywhere(key);

        if let Some(node) = model.node {
            if let Some(list) = self.model_components.get_mut(node) {
                list.retain(|&mut k| k != key);
            }
            if let Some(master) = self.master_model(node) {
                self.finalize_bone_bounding_boxes(master);
            }
        }

        let root_node = model.skeleton.root_bone().and_then(|bone| bone.node());
        if let Some(root_node) = root_node {
            let owner = self.nodes.get(root_node).and_then(|node| node.parent());
            if owner.is_some_and(|owner| self.master_model(owner).is_none()) {
                self.remove_node(root_node);
            }
        }

        Some(model)
    }

    /// Assigns (or clears) the model asset.
    ///
    /// Copies bone mappings, morphs and static bounds, installs the skeleton
    /// (creating bone nodes when `create_bones` is set), sizes skin storage
    /// and decides between hardware and software skinning.
    pub fn set_model(&mut self, key: ModelKey, model: Option<Arc<Model>>, create_bones: bool) -> Result<()> {
        let instance = self.animated_models.get(key).ok_or(AnimationError::InvalidModel(key))?;
        if !instance.node.is_some_and(|node| self.nodes.contains_key(node)) {
            log::error!("Can not set model while model component is not attached to a scene node");
            return Err(AnimationError::NotAttached("set model"));
        }

        let unchanged = match (&instance.model, &model) {
            (Some(current), Some(new)) => Arc::ptr_eq(current, new),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return Ok(());
        }

        let Some(asset) = model else {
            self.remove_root_bone(key);
            if let Some(instance) = self.animated_models.get_mut(key) {
                instance.model = None;
                instance.geometry_bone_mappings.clear();
                instance.animator = None;
                instance.morphs.clear();
                instance.skeleton_data.clear();
                instance.skin.clear();
                instance.bounding_box = BoundingBox::EMPTY;
            }
            return self.set_skeleton(key, &Skeleton::new(), false);
        };

        if let Some(instance) = self.animated_models.get_mut(key) {
            instance.model = Some(Arc::clone(&asset));
            instance.geometry_bone_mappings = asset.geometry_bone_mappings().map(<[usize]>::to_vec).collect();
            // Vertex copies are created on demand.
            instance.animator = None;
            instance.morphs.clone_from(&asset.morphs);

            // Initial bone bounds are the model's static bounds.
            instance.bounding_box = asset.bounding_box;
            instance.bone_bounding_box = asset.bounding_box;
            instance.flags.insert(UpdateFlags::BOUNDS_DIRTY);
        }

        self.set_skeleton(key, &asset.skeleton, create_bones)?;

        let instance = self.animated_models.get_mut(key).ok_or(AnimationError::InvalidModel(key))?;
        let bone_count = instance.skeleton.num_bones();
        instance.skeleton_data.resize(bone_count, ModelAnimationOutput::default());
        instance.skin.resize(bone_count);
        instance.update_software_skinning_state();
        instance.set_geometry_bone_mappings();

        if instance.software_skinning {
            instance.clone_geometries();
        }

        log::debug!(
            "Set model '{}' ({} bones, {} morphs, software skinning: {})",
            asset.name,
            bone_count,
            asset.morphs.len(),
            instance.software_skinning
        );
        Ok(())
    }

    /// Re-applies the current model asset after it changed in place.
    ///
    /// A master whose bone structure is unchanged keeps its bone nodes.
    pub fn reload_model(&mut self, key: ModelKey) -> Result<()> {
        let instance = self.animated_models.get_mut(key).ok_or(AnimationError::InvalidModel(key))?;
        let Some(current) = instance.model.take() else {
            log::error!("Can not reload animated model without a model");
            return Err(AnimationError::ModelNotFound);
        };

        let result = self.set_model(key, Some(Arc::clone(&current)), true);
        if result.is_err() {
            if let Some(instance) = self.animated_models.get_mut(key) {
                instance.model = Some(current);
            }
        }
        result
    }

    // ========================================================================
    // Skeleton
    // ========================================================================

    /// Installs a skeleton on a component.
    ///
    /// A master first tries to keep its current bones (same count, names
    /// and parents, every bone with a node); otherwise it rebuilds, merges
    /// sibling collision data and, with `create_bones`, spawns one child
    /// node per bone under the owner. A sibling adopts the skeleton, asks
    /// the master to re-merge bone bounds and, with `create_bones`, resolves
    /// the master's bone nodes by name. Without `create_bones` the nodes are
    /// resolved on the next update.
    pub fn set_skeleton(&mut self, key: ModelKey, skeleton: &Skeleton, create_bones: bool) -> Result<()> {
        let instance = self.animated_models.get(key).ok_or(AnimationError::InvalidModel(key))?;
        let owner = instance.node.filter(|&node| self.nodes.contains_key(node));
        if create_bones && owner.is_none() {
            log::error!("Animated model not attached to a scene node, can not create bone nodes");
            return Err(AnimationError::NotAttached("create bone nodes"));
        }

        if instance.is_master {
            let instance = self.animated_models.get_mut(key).ok_or(AnimationError::InvalidModel(key))?;
            if instance.skeleton.merge_compatible(skeleton) {
                log::debug!("Skeleton is compatible, keeping {} bone nodes", skeleton.num_bones());
                return Ok(());
            }

            if let Some(evaluator) = instance.evaluator.upgrade() {
                evaluator.mark_tracks_dirty();
            }

            if create_bones {
                self.remove_root_bone(key);
            }

            if let Some(instance) = self.animated_models.get_mut(key) {
                instance.skeleton = skeleton.clone();
            }
            self.finalize_bone_bounding_boxes(key);

            if let (true, Some(owner)) = (create_bones, owner) {
                self.create_bone_nodes(key, owner);
            }
        } else {
            if let Some(instance) = self.animated_models.get_mut(key) {
                instance.skeleton = skeleton.clone();
            }

            if let Some(master) = owner.and_then(|owner| self.master_model(owner)) {
                if master != key {
                    self.finalize_bone_bounding_boxes(master);
                }
            }

            if let (true, Some(owner)) = (create_bones, owner) {
                self.find_bone_nodes(key, owner);
            }
        }

        if let Some(instance) = self.animated_models.get_mut(key) {
            instance.flags.set(UpdateFlags::ASSIGN_BONES_PENDING, !create_bones);
            instance.on_marked_dirty();
        }
        Ok(())
    }

    /// Spawns one node per bone below `owner`, parented by bone parent index.
    fn create_bone_nodes(&mut self, key: ModelKey, owner: NodeHandle) {
        let Some(instance) = self.animated_models.get(key) else {
            return;
        };
        let specs: Vec<(String, BoneTransform, usize)> = instance
            .skeleton
            .bones()
            .iter()
            .map(|bone| (bone.name.clone(), bone.initial_transform(), bone.parent_index()))
            .collect();

        let handles: Vec<NodeHandle> = specs
            .iter()
            .map(|(name, transform, _)| {
                let handle = self.create_child(owner, name);
                self.add_dirty_listener(handle, key);
                self.set_transform_silent(handle, *transform);
                handle
            })
            .collect();

        for (index, (_, _, parent)) in specs.iter().enumerate() {
            if *parent != index {
                if let Some(&parent_handle) = handles.get(*parent) {
                    self.attach(handles[index], parent_handle);
                }
            }
        }

        if let Some(instance) = self.animated_models.get_mut(key) {
            for (bone, handle) in instance.skeleton.bones_mut().iter_mut().zip(&handles) {
                bone.node = Some(*handle);
            }
        }

        log::debug!("Created {} bone nodes", handles.len());
        self.mark_dirty(owner);
    }

    /// Looks up every bone's node by name below `owner`. Missing bones keep
    /// no node.
    fn find_bone_nodes(&mut self, key: ModelKey, owner: NodeHandle) {
        let found = self.resolve_bone_names(key, owner);
        for handle in found.iter().flatten() {
            self.add_dirty_listener(*handle, key);
        }
        if let Some(instance) = self.animated_models.get_mut(key) {
            for (bone, handle) in instance.skeleton.bones_mut().iter_mut().zip(found) {
                bone.node = handle;
            }
        }
    }

    fn resolve_bone_names(&self, key: ModelKey, owner: NodeHandle) -> Vec<Option<NodeHandle>> {
        self.animated_models.get(key).map_or_else(Vec::new, |instance| {
            instance
                .skeleton
                .bones()
                .iter()
                .map(|bone| self.find_child_by_name(owner, &bone.name, true))
                .collect()
        })
    }

    /// Resolves bone nodes by name below the owner node.
    ///
    /// If any bone is missing and the model asset is known, the skeleton is
    /// installed again with bone node creation, once.
    pub fn assign_bone_nodes(&mut self, key: ModelKey) -> Result<()> {
        let instance = self.animated_models.get_mut(key).ok_or(AnimationError::InvalidModel(key))?;
        instance.flags.remove(UpdateFlags::ASSIGN_BONES_PENDING);

        let Some(owner) = instance.node.filter(|&node| self.nodes.contains_key(node)) else {
            return Ok(());
        };

        let found = self.resolve_bone_names(key, owner);
        let all_found = found.iter().all(Option::is_some);

        if all_found {
            self.find_bone_nodes(key, owner);
        } else {
            let missing = found.iter().filter(|handle| handle.is_none()).count();
            let model = self.animated_models.get(key).and_then(|m| m.model.clone());
            log::warn!("{missing} bone nodes not found by name");
            if let Some(model) = model {
                self.set_skeleton(key, &model.skeleton, true)?;
            }
        }

        if let Some(instance) = self.animated_models.get_mut(key) {
            if let Some(evaluator) = instance.evaluator.upgrade() {
                evaluator.mark_tracks_dirty();
            }
            instance.on_marked_dirty();
        }
        Ok(())
    }

    /// Recomputes a master's bone collision data from the model asset and
    /// every sibling's skeleton, then strips degenerate shapes.
    pub fn finalize_bone_bounding_boxes(&mut self, key: ModelKey) {
        let Some(owner) = self.animated_models.get(key).and_then(|m| m.node) else {
            return;
        };
        let siblings: SmallVec<[ModelKey; 4]> = self
            .animated_models_of(owner)
            .iter()
            .copied()
            .filter(|&k| k != key)
            .collect();

        let Some(instance) = self.animated_models.get_mut(key) else {
            return;
        };
        // Taken out so sibling skeletons can be borrowed alongside.
        let mut skeleton = std::mem::take(&mut instance.skeleton);
        let template = instance.model.clone();

        {
            let sibling_skeletons: Vec<&Skeleton> = siblings
                .iter()
                .filter_map(|&k| self.animated_models.get(k))
                .map(|m| &m.skeleton)
                .collect();
            bounds::finalize_bone_collision(
                &mut skeleton,
                template.as_deref().map(|model| &model.skeleton),
                &sibling_skeletons,
            );
        }

        if let Some(instance) = self.animated_models.get_mut(key) {
            instance.skeleton = skeleton;
            if !instance.skeleton.is_empty() {
                instance.flags.insert(UpdateFlags::BOUNDS_DIRTY);
            }
        }
    }

    /// Removes the node of the component's root bone, with its subtree.
    pub fn remove_root_bone(&mut self, key: ModelKey) {
        let root_node = self
            .animated_models
            .get(key)
            .and_then(|m| m.skeleton.root_bone())
            .and_then(|bone| bone.node());
        if let Some(root_node) = root_node {
            self.remove_node(root_node);
        }
    }

    /// Restores every animated bone node to its bind pose, silently.
    pub fn reset_bones(&mut self, key: ModelKey) {
        if let Some(instance) = self.animated_models.get(key) {
            instance.skeleton.reset(&mut self.nodes);
        }
    }

    // ========================================================================
    // Morph weights
    // ========================================================================

    /// Sets a morph weight. On a master the change is mirrored to every
    /// sibling by name hash.
    pub fn set_morph_weight(&mut self, key: ModelKey, index: usize, weight: f32) {
        let Some(instance) = self.animated_models.get_mut(key) else {
            return;
        };
        let Some(name_hash) = instance.set_morph_weight_local(index, weight) else {
            return;
        };
        if !instance.is_master {
            return;
        }
        let weight = instance.morph_weight(index);

        for sibling in self.sibling_keys(key) {
            if let Some(sibling) = self.animated_models.get_mut(sibling) {
                if sibling.is_master {
                    continue;
                }
                // Sibling morph order may differ.
                if let Some(index) = sibling.morph_index_by_hash(name_hash) {
                    sibling.set_morph_weight_local(index, weight);
                }
            }
        }
    }

    pub fn set_morph_weight_by_name(&mut self, key: ModelKey, name: &str, weight: f32) {
        let index = self.animated_models.get(key).and_then(|m| m.morph_index(name));
        if let Some(index) = index {
            self.set_morph_weight(key, index, weight);
        }
    }

    pub fn set_morph_weight_by_hash(&mut self, key: ModelKey, name_hash: StringHash, weight: f32) {
        let index = self.animated_models.get(key).and_then(|m| m.morph_index_by_hash(name_hash));
        if let Some(index) = index {
            self.set_morph_weight(key, index, weight);
        }
    }

    /// Zeroes every morph weight, on siblings too when called on a master.
    pub fn reset_morph_weights(&mut self, key: ModelKey) {
        let Some(instance) = self.animated_models.get_mut(key) else {
            return;
        };
        instance.reset_morph_weights_local();
        if !instance.is_master {
            return;
        }

        for sibling in self.sibling_keys(key) {
            if let Some(sibling) = self.animated_models.get_mut(sibling) {
                if !sibling.is_master {
                    sibling.reset_morph_weights_local();
                }
            }
        }
    }

    // ========================================================================
    // Bounds
    // ========================================================================

    /// Commits the world bounds of a component and returns them.
    ///
    /// A master places its bone bounds with the owner's world transform. A
    /// sibling copies the master's committed bounds, or becomes the master
    /// itself if the original master is gone.
    pub fn update_world_bounding_box(&mut self, key: ModelKey) -> Option<BoundingBox> {
        let owner = self.animated_models.get(key)?.node?;
        let owner_world = *self.nodes.get(owner)?.world_matrix();
        let master = self.master_model(owner);

        let master_bounds = match master {
            Some(master) if master != key => self.animated_models.get(master).map(|m| m.world_bounding_box),
            _ => None,
        };

        let instance = self.animated_models.get_mut(key)?;
        if !instance.is_master && master == Some(key) {
            log::debug!("Animated model adopted the master role");
            instance.is_master = true;
        }

        if instance.is_master {
            instance.update_world_bounds_from(&owner_world);
        } else if let Some(bounds) = master_bounds {
            instance.world_bounding_box = bounds;
        }
        Some(instance.world_bounding_box)
    }

    fn sibling_keys(&self, key: ModelKey) -> SmallVec<[ModelKey; 4]> {
        self.animated_models
            .get(key)
            .and_then(|m| m.node)
            .map(|owner| {
                self.animated_models_of(owner)
                    .iter()
                    .copied()
                    .filter(|&k| k != key)
                    .collect()
            })
            .unwrap_or_default()
    }
}
