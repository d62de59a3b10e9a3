//! Global String Interner
//!
//! Turns the names that appear in authored animation data (entity paths,
//! component kinds, property names, parameter names) into compact integer
//! [`Symbol`]s so that binding keys hash and compare in O(1).

use std::sync::LazyLock;

use lasso::{Spur, ThreadedRodeo};

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

/// Compact identifier for an interned string.
pub type Symbol = Spur;

/// Interns a string, returning its [`Symbol`].
///
/// Returns the existing symbol if the string was interned before.
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// Returns the symbol of an already interned string without allocating.
#[inline]
pub fn get(s: &str) -> Option<Symbol> {
    INTERNER.get(s)
}

/// Resolves a symbol back to its string.
#[inline]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}

/// Pre-interns the property names built-in scene components expose.
///
/// Call during startup so binding never has to grow the pool.
pub fn preload_common_properties() {
    let common = [
        // Transform
        "position",
        "rotation",
        "scale",
        "eulerAngles",
        // Renderers
        "blendShapeWeights",
        "color",
        "intensity",
        // Materials
        "baseColor",
        "emissive",
        "metallic",
        "roughness",
        "tilingOffset",
    ];

    for name in common {
        intern(name);
    }
}
