use bitflags::bitflags;

bitflags! {
    /// Per-instance update state.
    ///
    /// Flags are independent; an instance with none of the dirty flags set
    /// is clean. Each frame phase clears exactly the flags it satisfies.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct UpdateFlags: u8 {
        /// Animation sources changed, re-evaluation is owed (master only).
        const ANIMATION_DIRTY        = 1 << 0;
        /// Bone-driven local bounds must be recomputed.
        const BOUNDS_DIRTY           = 1 << 1;
        /// Skin matrices must be rebuilt.
        const SKINNING_DIRTY         = 1 << 2;
        /// Morph-blended geometry must be rebuilt.
        const MORPHS_DIRTY           = 1 << 3;
        /// The model came back into view with animation owed; evaluate
        /// synchronously in the geometry phase.
        const FORCE_ANIMATION_UPDATE = 1 << 4;
        /// Bone nodes are resolved by name on the next update.
        const ASSIGN_BONES_PENDING   = 1 << 5;
    }
}

impl UpdateFlags {
    const DIRTY: UpdateFlags = UpdateFlags::ANIMATION_DIRTY
        .union(UpdateFlags::BOUNDS_DIRTY)
        .union(UpdateFlags::SKINNING_DIRTY)
        .union(UpdateFlags::MORPHS_DIRTY);

    #[inline]
    #[must_use]
    pub fn animation_dirty(self) -> bool {
        self.contains(Self::ANIMATION_DIRTY)
    }

    #[inline]
    #[must_use]
    pub fn bounds_dirty(self) -> bool {
        self.contains(Self::BOUNDS_DIRTY)
    }

    #[inline]
    #[must_use]
    pub fn skinning_dirty(self) -> bool {
        self.contains(Self::SKINNING_DIRTY)
    }

    #[inline]
    #[must_use]
    pub fn morphs_dirty(self) -> bool {
        self.contains(Self::MORPHS_DIRTY)
    }

    #[inline]
    #[must_use]
    pub fn force_animation_update(self) -> bool {
        self.contains(Self::FORCE_ANIMATION_UPDATE)
    }

    #[inline]
    #[must_use]
    pub fn assign_bones_pending(self) -> bool {
        self.contains(Self::ASSIGN_BONES_PENDING)
    }

    /// No dirty flag is set. Pending requests (forced update, bone
    /// assignment) do not count as dirty.
    #[inline]
    #[must_use]
    pub fn is_clean(self) -> bool {
        !self.intersects(Self::DIRTY)
    }
}
