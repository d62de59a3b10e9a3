//! Utility Module
//!
//! - [`interner`]: string interning for names used in binding keys
//!
//! ```rust,ignore
//! use kinema::utils::interner;
//!
//! let a = interner::intern("blendShapeWeights");
//! let b = interner::intern("blendShapeWeights");
//! assert_eq!(a, b); // O(1) comparison
//! ```

pub mod interner;

pub use interner::Symbol;
