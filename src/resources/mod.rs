//! Asset-side data consumed by animated models
//!
//! - [`BoundingBox`] / [`BoundingSphere`]: bounding volumes
//! - [`Model`]: template skeleton, morphs and sub-geometries with bone mappings
//! - [`ChangeTracker`]: version counter for deformed vertex data

pub mod bounds;
pub mod model;
pub mod version_tracker;

pub use bounds::{BoundingBox, BoundingSphere};
pub use model::{
    Model, ModelGeometry, ModelMorph, MorphBuffer, MorphVertex, VertexData, VertexSkin,
};
pub use version_tracker::ChangeTracker;
