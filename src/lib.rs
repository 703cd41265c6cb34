#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::float_cmp)]

//! Skeletal animation pipeline for animated models.
//!
//! Turns a bone hierarchy, per-bone animation output and morph weights into
//! skin matrices and bone-driven bounds inside a prepare / update / geometry
//! frame loop, with distance-based animation LOD and master/sibling
//! components sharing one set of bone nodes.

pub mod animated_model;
pub mod animation;
pub mod errors;
pub mod resources;
pub mod scene;
pub mod settings;
pub mod skeleton;
pub mod utils;

pub use animated_model::{AnimatedModel, AnimatedModelSystem, FrameInfo, SkinMatrices, UpdateFlags};
pub use animation::{
    AnimationLodGate, BoneTransform, ChannelMask, EvaluatorRef, ModelAnimationOutput, PoseEvaluator,
    TrackEvaluator,
};
pub use errors::{AnimationError, Result};
pub use resources::{BoundingBox, BoundingSphere, Model};
pub use scene::{Camera, ModelKey, Node, NodeHandle, Scene};
pub use settings::{AnimatedModelSettings, SkinningMode, UpdateGeometryType};
pub use skeleton::{Bone, BoneCollision, Skeleton};
pub use utils::StringHash;
