//! Animation evaluation
//!
//! - [`ModelAnimationOutput`]: per-bone local / component-space transforms
//! - [`initialize_local_bone_transforms`] / [`compose_hierarchy`]: buffer refresh and
//!   single-pass hierarchy composition
//! - [`TrackEvaluator`]: external animation source, referenced weakly via [`EvaluatorRef`]
//! - [`AnimationLodGate`]: distance-driven update throttling

pub mod evaluator;
pub mod lod;
pub mod output;

pub use evaluator::{EvaluatorRef, PoseEvaluator, TrackEvaluator};
pub use lod::AnimationLodGate;
pub use output::{
    BoneTransform, ChannelMask, ModelAnimationOutput, compose_hierarchy,
    initialize_local_bone_transforms,
};
