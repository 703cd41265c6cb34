use glam::{Affine3A, Vec3};

/// Epsilon guarding the LOD distance denominator.
const LOD_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionType {
    Perspective,
    Orthographic,
}

/// The view information animated models need: where the camera is and how
/// distance maps to level of detail.
#[derive(Debug, Clone)]
pub struct Camera {
    pub projection_type: ProjectionType,
    /// Half height of the orthographic view volume.
    pub ortho_size: f32,
    pub zoom: f32,
    /// Camera-wide LOD bias, multiplied with each drawable's own bias.
    pub lod_bias: f32,

    world_matrix: Affine3A,
    view_matrix: Affine3A,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new_perspective()
    }
}

impl Camera {
    #[must_use]
    pub fn new_perspective() -> Self {
        Self {
            projection_type: ProjectionType::Perspective,
            ortho_size: 10.0,
            zoom: 1.0,
            lod_bias: 1.0,
            world_matrix: Affine3A::IDENTITY,
            view_matrix: Affine3A::IDENTITY,
        }
    }

    #[must_use]
    pub fn new_orthographic(ortho_size: f32) -> Self {
        Self {
            projection_type: ProjectionType::Orthographic,
            ortho_size,
            ..Self::new_perspective()
        }
    }

    /// Places the camera. View matrix = world inverse.
    pub fn set_world_matrix(&mut self, world: Affine3A) {
        self.world_matrix = world;
        self.view_matrix = world.inverse();
    }

    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.set_world_matrix(Affine3A::from_translation(position));
        self
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.world_matrix
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.world_matrix.translation.into()
    }

    /// Distance to a world-space point. Orthographic cameras use view depth.
    #[must_use]
    pub fn distance(&self, world_pos: Vec3) -> f32 {
        match self.projection_type {
            ProjectionType::Perspective => (world_pos - self.position()).length(),
            ProjectionType::Orthographic => self.view_matrix.transform_point3(world_pos).z.abs(),
        }
    }

    /// Converts a distance and an object scale into a LOD distance.
    ///
    /// Larger scale or bias means a smaller LOD distance (more detail).
    #[must_use]
    pub fn lod_distance(&self, distance: f32, scale: f32, bias: f32) -> f32 {
        let d = (self.lod_bias * bias * scale * self.zoom).max(LOD_EPSILON);
        match self.projection_type {
            ProjectionType::Perspective => distance / d,
            ProjectionType::Orthographic => self.ortho_size / d,
        }
    }
}
