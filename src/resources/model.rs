use std::sync::Arc;

use glam::Vec3;

use crate::resources::BoundingBox;
use crate::skeleton::Skeleton;
use crate::utils::StringHash;

// ============================================================================
// Vertex data
// ============================================================================

/// Up to four bone influences of a vertex.
///
/// Bone indices are global skeleton indices, or geometry-local slots when the
/// owning [`ModelGeometry`] declares a bone mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VertexSkin {
    pub bones: [u16; 4],
    pub weights: [f32; 4],
}

impl VertexSkin {
    #[must_use]
    pub fn single(bone: u16) -> Self {
        Self {
            bones: [bone, 0, 0, 0],
            weights: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

/// CPU-side vertex streams a software animator can deform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// Empty for unskinned geometry.
    pub skin: Vec<VertexSkin>,
}

impl VertexData {
    #[must_use]
    pub fn new(positions: Vec<Vec3>, normals: Vec<Vec3>) -> Self {
        Self {
            positions,
            normals,
            skin: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_skin(mut self, skin: Vec<VertexSkin>) -> Self {
        self.skin = skin;
        self
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// A sub-mesh of a model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelGeometry {
    pub center: Vec3,
    /// Geometry-local bone slot -> global bone index. Empty when the geometry
    /// uses global indices directly.
    pub bone_mapping: Vec<usize>,
    pub vertices: VertexData,
}

impl ModelGeometry {
    #[must_use]
    pub fn new(vertices: VertexData) -> Self {
        Self {
            center: Vec3::ZERO,
            bone_mapping: Vec::new(),
            vertices,
        }
    }

    #[must_use]
    pub fn with_bone_mapping(mut self, mapping: Vec<usize>) -> Self {
        self.bone_mapping = mapping;
        self
    }

    #[must_use]
    pub fn with_center(mut self, center: Vec3) -> Self {
        self.center = center;
        self
    }
}

// ============================================================================
// Morphs
// ============================================================================

/// Displacement of one vertex by a morph target at full weight.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MorphVertex {
    pub index: u32,
    pub position: Vec3,
    pub normal: Vec3,
}

/// The vertices a morph displaces within one geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MorphBuffer {
    pub geometry_index: usize,
    pub vertices: Vec<MorphVertex>,
}

/// A morph target. Buffers are immutable and shared between every instance
/// created from the same model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMorph {
    pub name: String,
    pub name_hash: StringHash,
    pub weight: f32,
    pub buffers: Arc<[MorphBuffer]>,
}

impl ModelMorph {
    #[must_use]
    pub fn new(name: &str, buffers: Vec<MorphBuffer>) -> Self {
        Self {
            name: name.to_string(),
            name_hash: StringHash::new(name),
            weight: 0.0,
            buffers: buffers.into(),
        }
    }

    #[must_use]
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight.clamp(0.0, 1.0);
        self
    }
}

// ============================================================================
// Model
// ============================================================================

/// An already-parsed animated model asset.
///
/// Holds the template skeleton (bind pose, offsets and collision shapes as
/// authored), morph templates, sub-geometries and the static bounds used for
/// LOD scale. Instances share it through `Arc<Model>`.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub name: String,
    pub skeleton: Skeleton,
    pub morphs: Vec<ModelMorph>,
    pub geometries: Vec<ModelGeometry>,
    pub bounding_box: BoundingBox,
}

impl Model {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_skeleton(mut self, skeleton: Skeleton) -> Self {
        self.skeleton = skeleton;
        self
    }

    #[must_use]
    pub fn with_geometry(mut self, geometry: ModelGeometry) -> Self {
        self.geometries.push(geometry);
        self
    }

    #[must_use]
    pub fn with_morph(mut self, morph: ModelMorph) -> Self {
        self.morphs.push(morph);
        self
    }

    #[must_use]
    pub fn with_bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = bounding_box;
        self
    }

    /// Per-geometry bone mappings, in geometry order.
    pub fn geometry_bone_mappings(&self) -> impl Iterator<Item = &[usize]> {
        self.geometries.iter().map(|g| g.bone_mapping.as_slice())
    }

    #[must_use]
    pub fn has_geometry_bone_mappings(&self) -> bool {
        self.geometries.iter().any(|g| !g.bone_mapping.is_empty())
    }
}
