//! Skeleton module
//!
//! - [`Bone`]: named bone with bind pose, offset matrix and collision shape
//! - [`Skeleton`]: validated, ordered bone hierarchy with name lookup

pub mod bone;
#[allow(clippy::module_inception)]
pub mod skeleton;

pub use bone::{Bone, BoneCollision};
pub use skeleton::Skeleton;
