use glam::Affine3A;
use slotmap::{SlotMap, SparseSecondaryMap};
use smallvec::SmallVec;

use crate::animated_model::AnimatedModel;
use crate::animation::BoneTransform;
use crate::scene::node::Node;
use crate::scene::transform_system;
use crate::scene::{ModelKey, NodeHandle};

/// Component keys attached to one node, in attachment order.
pub type ModelList = SmallVec<[ModelKey; 2]>;

/// Scene graph
///
/// Owns the node hierarchy and the animated model components attached to it.
/// Nodes and components live in separate storages so systems can borrow them
/// independently.
///
/// # Dirty notification
///
/// [`Scene::set_transform`] and [`Scene::mark_dirty`] notify every animated
/// model registered as a dirty listener on the node or any of its
/// descendants. [`Scene::set_transform_silent`] writes without notifying.
///
/// # Deferred transform updates
///
/// Animated models never write bone nodes during their update phase; they
/// push [`BoneTransform`]s through [`Scene::queue_transform_update`], which
/// [`Scene::update_transforms`] applies right before world matrices are
/// propagated.
#[derive(Default)]
pub struct Scene {
    pub nodes: SlotMap<NodeHandle, Node>,
    pub root_nodes: Vec<NodeHandle>,

    pub animated_models: SlotMap<ModelKey, AnimatedModel>,

    pub(crate) model_components: SparseSecondaryMap<NodeHandle, ModelList>,
    pub(crate) dirty_listeners: SparseSecondaryMap<NodeHandle, ModelList>,
    pub(crate) transform_queue: Vec<(NodeHandle, BoneTransform)>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Creates a root node.
    pub fn create_node(&mut self, name: &str) -> NodeHandle {
        let handle = self.nodes.insert(Node::new(name));
        self.root_nodes.push(handle);
        handle
    }

    /// Creates a child of `parent`. Falls back to a root node when the parent
    /// does not exist.
    pub fn create_child(&mut self, parent: NodeHandle, name: &str) -> NodeHandle {
        if !self.nodes.contains_key(parent) {
            return self.create_node(name);
        }

        let mut node = Node::new(name);
        node.parent = Some(parent);
        let handle = self.nodes.insert(node);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(handle);
        }
        handle
    }

    /// Moves `child` (and its subtree) under `parent`.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) {
        if child == parent || !self.nodes.contains_key(parent) {
            return;
        }
        if self.is_ancestor(child, parent) {
            log::warn!("Refusing to attach a node below its own descendant");
            return;
        }
        let Some(old_parent) = self.nodes.get(child).map(|node| node.parent) else {
            return;
        };

        match old_parent {
            Some(old) => {
                if let Some(p) = self.nodes.get_mut(old) {
                    p.children.retain(|&c| c != child);
                }
            }
            None => self.root_nodes.retain(|&r| r != child),
        }

        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
            // New parent world, rebuild on next propagation.
            node.transform.mark_dirty();
        }
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
    }

    /// Returns true if `ancestor` is `node` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeHandle, node: NodeHandle) -> bool {
        let mut current = Some(node);
        while let Some(handle) = current {
            if handle == ancestor {
                return true;
            }
            current = self.nodes.get(handle).and_then(|n| n.parent);
        }
        false
    }

    /// Removes a node with its whole subtree.
    ///
    /// Animated models attached to removed nodes are destroyed with them.
    /// Bone references to removed nodes simply stop resolving.
    pub fn remove_node(&mut self, handle: NodeHandle) {
        let Some(parent) = self.nodes.get(handle).map(|node| node.parent) else {
            return;
        };

        match parent {
            Some(p) => {
                if let Some(p) = self.nodes.get_mut(p) {
                    p.children.retain(|&c| c != handle);
                }
            }
            None => self.root_nodes.retain(|&r| r != handle),
        }

        let subtree = self.collect_subtree(handle);
        for node in subtree {
            self.dirty_listeners.remove(node);
            if let Some(models) = self.model_components.remove(node) {
                for key in models {
                    self.animated_models.remove(key);
                }
            }
            self.nodes.remove(node);
        }
    }

    /// Returns `root` and all of its descendants, parents first.
    #[must_use]
    pub fn collect_subtree(&self, root: NodeHandle) -> Vec<NodeHandle> {
        let mut result = Vec::new();
        let mut stack = vec![root];
        while let Some(handle) = stack.pop() {
            if let Some(node) = self.nodes.get(handle) {
                result.push(handle);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        result
    }

    #[inline]
    #[must_use]
    pub fn get_node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    #[inline]
    pub fn get_node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self, handle: NodeHandle) -> Option<&Affine3A> {
        self.nodes.get(handle).map(Node::world_matrix)
    }

    /// Finds a descendant of `parent` by name, depth-first.
    #[must_use]
    pub fn find_child_by_name(&self, parent: NodeHandle, name: &str, recursive: bool) -> Option<NodeHandle> {
        let node = self.nodes.get(parent)?;

        for &child in &node.children {
            if self.nodes.get(child).is_some_and(|c| c.name == name) {
                return Some(child);
            }
            if recursive {
                if let Some(found) = self.find_child_by_name(child, name, true) {
                    return Some(found);
                }
            }
        }
        None
    }

    // ========================================================================
    // Transforms & dirty notification
    // ========================================================================

    /// Sets a node's local transform and notifies dirty listeners.
    pub fn set_transform(&mut self, handle: NodeHandle, transform: BoneTransform) {
        if self.set_transform_silent(handle, transform) {
            self.mark_dirty(handle);
        }
    }

    /// Sets a node's local transform without notifying listeners.
    ///
    /// Returns false when the node does not exist.
    pub fn set_transform_silent(&mut self, handle: NodeHandle, transform: BoneTransform) -> bool {
        match self.nodes.get_mut(handle) {
            Some(node) => {
                node.transform.set_trs(transform);
                true
            }
            None => false,
        }
    }

    /// Notifies every dirty listener on `handle` and its descendants.
    pub fn mark_dirty(&mut self, handle: NodeHandle) {
        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            stack.extend(node.children.iter().copied());

            if let Some(listeners) = self.dirty_listeners.get(current) {
                for &key in listeners {
                    if let Some(model) = self.animated_models.get_mut(key) {
                        model.on_marked_dirty();
                    }
                }
            }
        }
    }

    pub fn add_dirty_listener(&mut self, node: NodeHandle, key: ModelKey) {
        if !self.nodes.contains_key(node) {
            return;
        }
        if let Some(listeners) = self.dirty_listeners.get_mut(node) {
            if !listeners.contains(&key) {
                listeners.push(key);
            }
        } else {
            let mut listeners = ModelList::new();
            listeners.push(key);
            self.dirty_listeners.insert(node, listeners);
        }
    }

    pub fn remove_dirty_listener(&mut self, node: NodeHandle, key: ModelKey) {
        if let Some(listeners) = self.dirty_listeners.get_mut(node) {
            listeners.retain(|&mut k| k != key);
        }
    }

    /// Removes `key` from every listener list.
    pub(crate) fn remove_listener_everywhere(&mut self, key: ModelKey) {
        for (_, listeners) in &mut self.dirty_listeners {
            listeners.retain(|&mut k| k != key);
        }
    }

    /// Queues a local transform to be applied on the next
    /// [`update_transforms`](Self::update_transforms).
    pub fn queue_transform_update(&mut self, handle: NodeHandle, transform: BoneTransform) {
        self.transform_queue.push((handle, transform));
    }

    #[inline]
    #[must_use]
    pub fn pending_transform_updates(&self) -> usize {
        self.transform_queue.len()
    }

    /// Applies queued transform updates (with dirty notification), then
    /// propagates world matrices through the whole hierarchy.
    pub fn update_transforms(&mut self) {
        let queue = std::mem::take(&mut self.transform_queue);
        for (handle, transform) in &queue {
            self.set_transform(*handle, *transform);
        }
        // Keep the allocation for next frame.
        self.transform_queue = queue;
        self.transform_queue.clear();

        transform_system::update_hierarchy_iterative(&mut self.nodes, &self.root_nodes);
    }

    /// Propagates world matrices below `handle` only.
    pub fn update_subtree(&mut self, handle: NodeHandle) {
        transform_system::update_subtree(&mut self.nodes, handle);
    }

    // ========================================================================
    // Animated model components
    // ========================================================================

    /// Animated models attached to `node`, in attachment order.
    #[must_use]
    pub fn animated_models_of(&self, node: NodeHandle) -> &[ModelKey] {
        self.model_components.get(node).map_or(&[], |list| list.as_slice())
    }

    /// The master model of `node`: the first attached model still alive.
    #[must_use]
    pub fn master_model(&self, node: NodeHandle) -> Option<ModelKey> {
        self.animated_models_of(node)
            .iter()
            .copied()
            .find(|&key| self.animated_models.contains_key(key))
    }

    #[inline]
    #[must_use]
    pub fn get_animated_model(&self, key: ModelKey) -> Option<&AnimatedModel> {
        self.animated_models.get(key)
    }

    #[inline]
    pub fn get_animated_model_mut(&mut self, key: ModelKey) -> Option<&mut AnimatedModel> {
        self.animated_models.get_mut(key)
    }
}
