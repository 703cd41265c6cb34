//! Error Types
//!
//! This module defines the error types used by the animated model pipeline.
//!
//! # Overview
//!
//! The main error type [`AnimationError`] covers the failure modes that can be
//! reported to a caller:
//! - Structurally invalid skeleton definitions (bad parent indices, cycles)
//! - Operations requested while a model is not attached to a scene node
//! - Stale component keys
//!
//! Nothing here is fatal. Skeleton incompatibility during a model reload, a
//! bone without a scene node or a zero-sized collision shape are all handled
//! by fallbacks and never surface as errors.
//!
//! # Usage
//!
//! ```rust,ignore
//! use myth_animated::errors::{AnimationError, Result};
//!
//! fn rebuild(skeleton: &mut Skeleton, bones: Vec<Bone>) -> Result<()> {
//!     skeleton.define(bones)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::scene::ModelKey;

/// The main error type for the animated model pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnimationError {
    // ========================================================================
    // Skeleton Structure Errors
    // ========================================================================
    /// A bone references a parent outside of the bone list.
    #[error("Bone {bone} references parent {parent}, but the skeleton only has {count} bones")]
    InvalidParentIndex {
        /// Index of the offending bone
        bone: usize,
        /// The invalid parent index
        parent: usize,
        /// Number of bones in the definition
        count: usize,
    },

    /// Following parent links from a bone never reaches a root.
    #[error("Bone {bone} is part of a cycle in the bone hierarchy")]
    CyclicHierarchy {
        /// Index of a bone on the cycle
        bone: usize,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// The component is not attached to a scene node.
    #[error("Animated model is not attached to a scene node, can not {0}")]
    NotAttached(&'static str),

    /// The component has no model asset assigned.
    #[error("Animated model has no model assigned")]
    ModelNotFound,

    /// The component key does not refer to a live animated model.
    #[error("Invalid animated model key: {0:?}")]
    InvalidModel(ModelKey),
}

/// Alias for `Result<T, AnimationError>`.
pub type Result<T> = std::result::Result<T, AnimationError>;
