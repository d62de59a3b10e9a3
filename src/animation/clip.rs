use std::fmt;
use std::sync::Arc;

use crate::animation::tracks::TrackData;
use crate::utils::interner::{self, Symbol};

/// Which property of which component on which entity a curve drives.
///
/// `path` is relative to the animated root (empty for the root itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CurveBinding {
    pub path: Symbol,
    pub target_kind: Symbol,
    pub property: Symbol,
}

impl CurveBinding {
    #[must_use]
    pub fn new(path: &str, target_kind: &str, property: &str) -> Self {
        Self {
            path: interner::intern(path),
            target_kind: interner::intern(target_kind),
            property: interner::intern(property),
        }
    }

    #[must_use]
    pub fn path_str(&self) -> &'static str {
        interner::resolve(self.path)
    }

    #[must_use]
    pub fn target_kind_str(&self) -> &'static str {
        interner::resolve(self.target_kind)
    }

    #[must_use]
    pub fn property_str(&self) -> &'static str {
        interner::resolve(self.property)
    }
}

impl fmt::Display for CurveBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}.{}",
            self.path_str(),
            self.target_kind_str(),
            self.property_str()
        )
    }
}

/// A track together with the property it animates.
///
/// Track data is immutable and shared by every state and layer that
/// references it.
#[derive(Debug, Clone)]
pub struct AnimationCurve {
    pub binding: CurveBinding,
    pub data: Arc<TrackData>,
}

impl AnimationCurve {
    #[must_use]
    pub fn new(binding: CurveBinding, data: TrackData) -> Self {
        Self {
            binding,
            data: Arc::new(data),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub curves: Vec<AnimationCurve>,
}

impl AnimationClip {
    /// Duration is the latest key time across all curves.
    #[must_use]
    pub fn new(name: impl Into<String>, curves: Vec<AnimationCurve>) -> Self {
        let duration = curves
            .iter()
            .map(|c| c.data.end_time())
            .fold(0.0_f32, f32::max);

        Self {
            name: name.into(),
            duration,
            curves,
        }
    }

    /// Overrides the computed duration (e.g. trailing hold time).
    #[must_use]
    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = duration.max(0.0);
        self
    }
}
