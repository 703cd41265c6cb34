//! Scene graph module
//!
//! The node hierarchy animated models attach to and drive:
//! - [`Node`]: name, hierarchy and transform
//! - [`Transform`]: TRS with cached matrices and change detection
//! - [`Scene`]: node storage, dirty listeners, queued transform updates and
//!   the animated model component registry
//! - [`Camera`]: distance and LOD distance queries
//! - [`transform_system`]: world matrix propagation

pub mod camera;
pub mod node;
#[allow(clippy::module_inception)]
pub mod scene;
pub mod transform;
pub mod transform_system;

pub use camera::{Camera, ProjectionType};
pub use node::Node;
pub use scene::{ModelList, Scene};
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeHandle;
    pub struct ModelKey;
}
