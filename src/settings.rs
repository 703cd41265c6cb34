//! Animated Model Settings
//!
//! Per-component configuration for animation LOD, visibility-driven update
//! skipping and the skinning path.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_animated::settings::{AnimatedModelSettings, SkinningMode};
//!
//! // Default: throttled animation, hardware skinning when the bone count fits
//! let settings = AnimatedModelSettings::default();
//!
//! // A crowd character: animate at a quarter of the default cadence,
//! // never update while off-screen, cull beyond 200 units
//! let settings = AnimatedModelSettings::default()
//!     .with_animation_lod_bias(0.25)
//!     .with_draw_distance(200.0);
//! ```

/// Constant scale applied to elapsed time before it is compared against the
/// animation LOD distance.
pub const ANIMATION_LOD_BASESCALE: f32 = 2500.0;

/// Default bone limit for hardware skinning.
pub const DEFAULT_MAX_HARDWARE_BONES: usize = 128;

// ---------------------------------------------------------------------------
// SkinningMode
// ---------------------------------------------------------------------------

/// Selects where vertex skinning happens.
///
/// | Mode       | Skin matrices | Vertex deformation     |
/// |------------|---------------|------------------------|
/// | `Hardware` | ✅            | GPU (renderer)         |
/// | `Software` | ✅            | CPU, `SoftwareModelAnimator` |
/// | `Auto`     | ✅            | GPU unless the bone count exceeds the hardware limit |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkinningMode {
    /// Always skin on the GPU.
    Hardware,
    /// Always skin on the CPU.
    Software,
    /// Skin on the GPU, falling back to the CPU when the skeleton has more
    /// bones than `max_hardware_bones` and no per-geometry bone mappings exist.
    #[default]
    Auto,
}

// ---------------------------------------------------------------------------
// UpdateGeometryType
// ---------------------------------------------------------------------------

/// Which kind of thread the late-update (geometry) phase requires this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateGeometryType {
    /// Nothing to do.
    None,
    /// Mutates shared vertex data or scene nodes; must run on the main thread.
    MainThread,
    /// Only private skin matrices are rebuilt; safe on a worker thread.
    WorkerThread,
}

// ---------------------------------------------------------------------------
// AnimatedModelSettings
// ---------------------------------------------------------------------------

/// Configuration for a single animated model component.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedModelSettings {
    /// Animation LOD bias. Larger values animate distant models more often.
    /// `0.0` disables throttling entirely.
    pub animation_lod_bias: f32,
    /// Time scale applied by the animation LOD gate.
    pub animation_lod_base_scale: f32,
    /// Drawable LOD bias passed to [`Camera::lod_distance`](crate::scene::Camera::lod_distance).
    pub lod_bias: f32,
    /// Maximum camera distance at which the model is updated. `0.0` = unlimited.
    pub draw_distance: f32,
    /// Keep evaluating animation while the model is out of view.
    pub update_invisible: bool,
    /// Skinning path selection.
    pub skinning_mode: SkinningMode,
    /// Bone limit used by [`SkinningMode::Auto`].
    pub max_hardware_bones: usize,
}

impl Default for AnimatedModelSettings {
    fn default() -> Self {
        Self {
            animation_lod_bias: 1.0,
            animation_lod_base_scale: ANIMATION_LOD_BASESCALE,
            lod_bias: 1.0,
            draw_distance: 0.0,
            update_invisible: false,
            skinning_mode: SkinningMode::Auto,
            max_hardware_bones: DEFAULT_MAX_HARDWARE_BONES,
        }
    }
}

impl AnimatedModelSettings {
    /// Sets the animation LOD bias. Negative values are clamped to zero.
    #[must_use]
    pub fn with_animation_lod_bias(mut self, bias: f32) -> Self {
        self.animation_lod_bias = bias.max(0.0);
        self
    }

    #[must_use]
    pub fn with_animation_lod_base_scale(mut self, scale: f32) -> Self {
        self.animation_lod_base_scale = scale;
        self
    }

    #[must_use]
    pub fn with_lod_bias(mut self, bias: f32) -> Self {
        self.lod_bias = bias;
        self
    }

    #[must_use]
    pub fn with_draw_distance(mut self, distance: f32) -> Self {
        self.draw_distance = distance.max(0.0);
        self
    }

    #[must_use]
    pub fn with_update_invisible(mut self, enable: bool) -> Self {
        self.update_invisible = enable;
        self
    }

    #[must_use]
    pub fn with_skinning_mode(mut self, mode: SkinningMode) -> Self {
        self.skinning_mode = mode;
        self
    }

    #[must_use]
    pub fn with_max_hardware_bones(mut self, count: usize) -> Self {
        self.max_hardware_bones = count;
        self
    }

    /// Resolves whether software skinning is used for a skeleton of
    /// `bone_count` bones.
    #[inline]
    #[must_use]
    pub fn use_software_skinning(&self, bone_count: usize, has_geometry_bone_mappings: bool) -> bool {
        match self.skinning_mode {
            SkinningMode::Hardware => false,
            SkinningMode::Software => true,
            SkinningMode::Auto => {
                !has_geometry_bone_mappings && bone_count > self.max_hardware_bones
            }
        }
    }
}
