//! Utility Module
//!
//! - [`StringHash`]: stable 32-bit name hash used for bone and morph lookup
//!
//! ```rust,ignore
//! use myth_animated::utils::StringHash;
//!
//! let a = StringHash::new("Bip01_Head");
//! let b = StringHash::new("Bip01_Head");
//! assert_eq!(a, b); // O(1) comparison
//! ```

pub mod hash;

pub use hash::StringHash;
