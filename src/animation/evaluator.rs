//! Track evaluation interface
//!
//! An animated model does not own its animation source. It holds a weak
//! [`EvaluatorRef`] to something implementing [`TrackEvaluator`] (an
//! animation controller, a ragdoll, a procedural pose) and asks it to write
//! local transforms into the model's [`ModelAnimationOutput`] buffer when the
//! animation LOD gate says an evaluation is due.
//!
//! When the source has been dropped the model simply gets no animation for
//! that frame.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::animation::{BoneTransform, ChannelMask, ModelAnimationOutput};
use crate::skeleton::Skeleton;
use crate::utils::StringHash;

/// Produces per-bone transform contributions.
pub trait TrackEvaluator: Send + Sync {
    /// Writes local-to-parent transforms for the bones this evaluator drives
    /// and records the changed channels in `ModelAnimationOutput::dirty`.
    /// Bones it does not drive must be left untouched.
    fn evaluate_into(&self, skeleton: &Skeleton, outputs: &mut [ModelAnimationOutput]);

    /// Called when the skeleton was rebuilt or its bones were reassigned, so
    /// cached bone bindings can be refreshed.
    fn mark_tracks_dirty(&self) {}
}

/// Non-owning, nullable reference to a [`TrackEvaluator`].
#[derive(Clone, Default)]
pub struct EvaluatorRef(Option<Weak<dyn TrackEvaluator>>);

impl EvaluatorRef {
    #[must_use]
    pub fn new<E: TrackEvaluator + 'static>(source: &Arc<E>) -> Self {
        let weak: Weak<E> = Arc::downgrade(source);
        Self(Some(weak))
    }

    #[must_use]
    pub fn none() -> Self {
        Self(None)
    }

    /// Returns the evaluator if it is still alive.
    #[inline]
    #[must_use]
    pub fn upgrade(&self) -> Option<Arc<dyn TrackEvaluator>> {
        self.0.as_ref()?.upgrade()
    }

    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.0.as_ref().is_some_and(|weak| weak.strong_count() > 0)
    }
}

impl std::fmt::Debug for EvaluatorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EvaluatorRef").field(&self.is_connected()).finish()
    }
}

// ============================================================================
// PoseEvaluator
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct PoseChannel {
    transform: BoneTransform,
    mask: ChannelMask,
    weight: f32,
}

/// A [`TrackEvaluator`] that applies a fixed pose, keyed by bone name.
///
/// Useful for procedural posing, ragdoll snapshots and tests. Each entry is
/// blended over the current output with its weight (`1.0` replaces).
#[derive(Debug, Default)]
pub struct PoseEvaluator {
    channels: RwLock<FxHashMap<StringHash, PoseChannel>>,
    evaluations: AtomicUsize,
    tracks_dirty: AtomicUsize,
}

impl PoseEvaluator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the full transform of a bone.
    pub fn set_bone(&self, name: &str, transform: BoneTransform) {
        self.set_bone_channels(name, transform, ChannelMask::all(), 1.0);
    }

    /// Sets selected channels of a bone with a blend weight.
    pub fn set_bone_channels(&self, name: &str, transform: BoneTransform, mask: ChannelMask, weight: f32) {
        self.channels.write().insert(
            StringHash::new(name),
            PoseChannel {
                transform,
                mask,
                weight: weight.clamp(0.0, 1.0),
            },
        );
    }

    pub fn remove_bone(&self, name: &str) {
        self.channels.write().remove(&StringHash::new(name));
    }

    pub fn clear(&self) {
        self.channels.write().clear();
    }

    /// Number of times `evaluate_into` has run.
    #[must_use]
    pub fn evaluation_count(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Number of times the owning model reported a skeleton change.
    #[must_use]
    pub fn tracks_dirty_count(&self) -> usize {
        self.tracks_dirty.load(Ordering::Relaxed)
    }
}

impl TrackEvaluator for PoseEvaluator {
    fn evaluate_into(&self, skeleton: &Skeleton, outputs: &mut [ModelAnimationOutput]) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);

        let channels = self.channels.read();
        if channels.is_empty() {
            return;
        }

        for (bone, output) in skeleton.bones().iter().zip(outputs.iter_mut()) {
            if !bone.animated {
                continue;
            }
            let Some(channel) = channels.get(&bone.name_hash) else {
                continue;
            };
            if channel.weight <= 0.0 {
                continue;
            }

            let target = &channel.transform;
            let current = &mut output.local_to_parent;
            let w = channel.weight;

            if channel.mask.contains(ChannelMask::POSITION) {
                current.position = current.position.lerp(target.position, w);
            }
            if channel.mask.contains(ChannelMask::ROTATION) {
                current.rotation = current.rotation.slerp(target.rotation, w);
            }
            if channel.mask.contains(ChannelMask::SCALE) {
                current.scale = current.scale.lerp(target.scale, w);
            }
            output.dirty |= channel.mask;
        }
    }

    fn mark_tracks_dirty(&self) {
        self.tracks_dirty.fetch_add(1, Ordering::Relaxed);
    }
}
