//! CPU-side vertex deformation
//!
//! [`SoftwareModelAnimator`] owns a private copy of the model's vertex
//! streams. Each rebuild restores the source data, adds weighted morph
//! deltas and, under software skinning, blends up to four bone influences
//! per vertex. Renderers detect new data through the commit version.

use std::sync::Arc;

use glam::{Affine3A, Vec3};

use crate::resources::{ChangeTracker, Model, ModelMorph, VertexData};

#[derive(Debug, Clone)]
pub struct SoftwareModelAnimator {
    model: Arc<Model>,
    geometries: Vec<VertexData>,
    software_skinning: bool,
    tracker: ChangeTracker,
}

impl SoftwareModelAnimator {
    /// Clones the vertex streams of every geometry in `model`.
    #[must_use]
    pub fn new(model: Arc<Model>, software_skinning: bool) -> Self {
        let geometries = model.geometries.iter().map(|g| g.vertices.clone()).collect();
        Self {
            model,
            geometries,
            software_skinning,
            tracker: ChangeTracker::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_software_skinning(&self) -> bool {
        self.software_skinning
    }

    /// Deformed vertex data, one entry per model geometry.
    #[inline]
    #[must_use]
    pub fn geometries(&self) -> &[VertexData] {
        &self.geometries
    }

    #[must_use]
    pub fn geometry(&self, index: usize) -> Option<&VertexData> {
        self.geometries.get(index)
    }

    /// Incremented by every [`commit`](Self::commit).
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.tracker.version()
    }

    /// Restores positions and normals from the source model.
    pub fn reset_animation(&mut self) {
        for (target, source) in self.geometries.iter_mut().zip(&self.model.geometries) {
            target.positions.clone_from(&source.vertices.positions);
            target.normals.clone_from(&source.vertices.normals);
        }
    }

    /// Adds the weighted displacement of every active morph.
    pub fn apply_morphs(&mut self, morphs: &[ModelMorph]) {
        for morph in morphs {
            let weight = morph.weight;
            if weight <= 0.0 {
                continue;
            }

            for buffer in morph.buffers.iter() {
                let Some(target) = self.geometries.get_mut(buffer.geometry_index) else {
                    continue;
                };

                for vertex in &buffer.vertices {
                    let index = vertex.index as usize;
                    if let Some(position) = target.positions.get_mut(index) {
                        *position += vertex.position * weight;
                    }
                    if let Some(normal) = target.normals.get_mut(index) {
                        *normal += vertex.normal * weight;
                    }
                }
            }
        }
    }

    /// Blends vertices by their bone influences.
    ///
    /// `skin_matrices` are the global skin matrices; geometry-local bone
    /// slots are not used on this path. Vertices without influences, or
    /// whose weights sum to zero, are left as they are.
    pub fn apply_skinning(&mut self, skin_matrices: &[Affine3A]) {
        if !self.software_skinning {
            return;
        }

        for geometry in &mut self.geometries {
            let VertexData { positions, normals, skin } = geometry;

            for (index, influence) in skin.iter().enumerate() {
                let total: f32 = influence.weights.iter().sum();
                if total <= 0.0 {
                    continue;
                }

                let Some(position) = positions.get_mut(index) else {
                    break;
                };
                let source_position = *position;
                let source_normal = normals.get(index).copied();

                let mut blended_position = Vec3::ZERO;
                let mut blended_normal = Vec3::ZERO;
                for (&bone, &weight) in influence.bones.iter().zip(&influence.weights) {
                    if weight <= 0.0 {
                        continue;
                    }
                    let matrix = skin_matrices.get(bone as usize).copied().unwrap_or(Affine3A::IDENTITY);
                    blended_position += matrix.transform_point3(source_position) * weight;
                    if let Some(normal) = source_normal {
                        blended_normal += matrix.transform_vector3(normal) * weight;
                    }
                }

                *position = blended_position;
                if let Some(normal) = normals.get_mut(index) {
                    *normal = blended_normal.normalize_or_zero();
                }
            }
        }
    }

    /// Publishes the rebuilt vertex data.
    pub fn commit(&mut self) {
        self.tracker.changed();
    }
}
