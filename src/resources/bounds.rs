use glam::{Affine3A, Vec3};

// ============================================================================
// Bounding volumes
// ============================================================================

/// Axis-aligned bounding box.
///
/// A box whose `min` exceeds its `max` on any axis is *undefined* (empty);
/// merging anything into an undefined box defines it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingBox {
    /// The undefined box.
    pub const EMPTY: BoundingBox = BoundingBox {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box centered on the origin with the given half extents.
    #[must_use]
    pub fn from_half_extents(half_extents: Vec3) -> Self {
        Self { min: -half_extents, max: half_extents }
    }

    #[must_use]
    pub fn from_point(point: Vec3) -> Self {
        Self { min: point, max: point }
    }

    #[inline]
    #[must_use]
    pub fn is_defined(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    /// Resets to the undefined state.
    pub fn clear(&mut self) {
        *self = Self::EMPTY;
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Size of the box, zero when undefined.
    #[must_use]
    pub fn size(&self) -> Vec3 {
        if self.is_defined() { self.max - self.min } else { Vec3::ZERO }
    }

    #[must_use]
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn merge(&mut self, other: &BoundingBox) {
        if other.is_defined() {
            *self = self.union(other);
        }
    }

    pub fn merge_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn merge_sphere(&mut self, sphere: &BoundingSphere) {
        let extent = Vec3::splat(sphere.radius);
        self.merge_point(sphere.center - extent);
        self.merge_point(sphere.center + extent);
    }

    #[must_use]
    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        !other.is_defined()
            || (self.min.cmple(other.min).all() && self.max.cmpge(other.max).all())
    }

    /// Transforms the eight corners and returns their bounds.
    #[must_use]
    pub fn transform(&self, matrix: &Affine3A) -> Self {
        if !self.is_defined() {
            return *self;
        }

        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];

        let mut new_min = Vec3::splat(f32::INFINITY);
        let mut new_max = Vec3::splat(f32::NEG_INFINITY);

        for point in corners {
            let transformed = matrix.transform_point3(point);
            new_min = new_min.min(transformed);
            new_max = new_max.max(transformed);
        }

        Self { min: new_min, max: new_max }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    #[must_use]
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}
