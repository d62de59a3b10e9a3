//! Keyframe tracks and time-domain sampling.

use glam::{Quat, Vec2, Vec3, Vec4};

use crate::animation::values::{
    Animatable, AnimationValue, FloatArray, Interpolatable, ValueDomain,
};
use crate::errors::SampleDomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMode {
    Step,
    Linear,
    #[default]
    Hermite,
}

/// How a state maps accumulated time onto its clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    #[default]
    Loop,
    Clamp,
    PingPong,
}

impl WrapMode {
    /// Maps any normalized time onto `[0, 1]`.
    ///
    /// - `Loop`: fractional part (Euclidean, so negative times wrap too)
    /// - `PingPong`: triangle wave with period 2
    /// - `Clamp`: saturate
    #[must_use]
    pub fn resolve(self, normalized: f32) -> f32 {
        match self {
            WrapMode::Clamp => normalized.clamp(0.0, 1.0),
            WrapMode::Loop => normalized.rem_euclid(1.0),
            WrapMode::PingPong => {
                let t = normalized.rem_euclid(2.0);
                if t > 1.0 { 2.0 - t } else { t }
            }
        }
    }

    /// Same mapping as [`resolve`](Self::resolve) for a time split into
    /// whole `cycles` and a `fraction` in `[0, 1)`, without summing them.
    #[must_use]
    pub fn resolve_cycle(self, cycles: i32, fraction: f32) -> f32 {
        match self {
            WrapMode::Clamp if cycles < 0 => 0.0,
            WrapMode::Clamp if cycles > 0 => 1.0,
            WrapMode::PingPong if cycles.rem_euclid(2) == 1 => 1.0 - fraction,
            WrapMode::Clamp | WrapMode::Loop | WrapMode::PingPong => fraction,
        }
    }
}

/// One key: time in seconds, value, and per-second tangents.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe<T> {
    pub time: f32,
    pub value: T,
    pub in_tangent: T,
    pub out_tangent: T,
}

impl<T: Clone> Keyframe<T> {
    /// A key with both tangents set to `tangent`.
    #[must_use]
    pub fn new(time: f32, value: T, tangent: T) -> Self {
        Self {
            time,
            value,
            in_tangent: tangent.clone(),
            out_tangent: tangent,
        }
    }

    #[must_use]
    pub fn with_tangents(time: f32, value: T, in_tangent: T, out_tangent: T) -> Self {
        Self {
            time,
            value,
            in_tangent,
            out_tangent,
        }
    }
}

impl<T: Interpolatable> Keyframe<T> {
    /// A key with zero tangents (flat Hermite, ignored by Linear/Step).
    #[must_use]
    pub fn flat(time: f32, value: T) -> Self {
        let tangent = T::zero_tangent(&value);
        Self::new(time, value, tangent)
    }
}

/// An ordered, immutable keyframe sequence for one value domain.
#[derive(Debug, Clone)]
pub struct KeyframeTrack<T: Interpolatable> {
    keys: Vec<Keyframe<T>>,
    interpolation: InterpolationMode,
}

impl<T: Interpolatable> KeyframeTrack<T> {
    /// Builds a track without validating it.
    ///
    /// Binding validates every track once before its first sample; use
    /// [`try_new`](Self::try_new) to fail at load time instead.
    #[must_use]
    pub fn new(keys: Vec<Keyframe<T>>, interpolation: InterpolationMode) -> Self {
        Self {
            keys,
            interpolation,
        }
    }

    pub fn try_new(
        keys: Vec<Keyframe<T>>,
        interpolation: InterpolationMode,
    ) -> Result<Self, SampleDomainError> {
        let track = Self::new(keys, interpolation);
        track.validate()?;
        Ok(track)
    }

    #[must_use]
    pub fn keys(&self) -> &[Keyframe<T>] {
        &self.keys
    }

    #[must_use]
    pub fn interpolation(&self) -> InterpolationMode {
        self.interpolation
    }

    /// Time of the last key, or 0 for an empty track.
    #[must_use]
    pub fn end_time(&self) -> f32 {
        self.keys.last().map_or(0.0, |k| k.time)
    }

    /// Checks ordering, finiteness, unit-length rotations and (for arrays)
    /// consistent lengths.
    pub fn validate(&self) -> Result<(), SampleDomainError> {
        let first = self.keys.first().ok_or(SampleDomainError::EmptyTrack)?;

        if T::DOMAIN == ValueDomain::FloatArray && self.interpolation == InterpolationMode::Hermite {
            return Err(SampleDomainError::UnsupportedInterpolation);
        }

        let expected = first.value.component_count();
        for (index, key) in self.keys.iter().enumerate() {
            if !key.time.is_finite() || !key.value.is_finite() {
                return Err(SampleDomainError::NonFinite { index });
            }
            if self.interpolation == InterpolationMode::Hermite
                && (!key.in_tangent.is_finite() || !key.out_tangent.is_finite())
            {
                return Err(SampleDomainError::NonFinite { index });
            }
            if !key.value.is_in_domain() {
                return Err(SampleDomainError::NonUnitRotation { index });
            }
            let found = key.value.component_count();
            if found != expected {
                return Err(SampleDomainError::ArrayLengthMismatch {
                    index,
                    expected,
                    found,
                });
            }
            if index > 0 {
                let previous = self.keys[index - 1].time;
                if key.time <= previous {
                    return Err(SampleDomainError::UnorderedKeys {
                        index,
                        previous,
                        current: key.time,
                    });
                }
            }
        }
        Ok(())
    }

    /// Samples at `time` seconds, clamping outside the key range.
    ///
    /// # Panics
    /// Panics on an empty track; binding rejects those before sampling.
    #[must_use]
    pub fn sample(&self, time: f32) -> T {
        let len = self.keys.len();
        assert!(len > 0, "Track is empty");
        if len == 1 {
            return self.keys[0].value.clone();
        }

        // First index whose key time is > time.
        let next_idx = self.keys.partition_point(|k| k.time <= time);
        if next_idx == 0 {
            return self.keys[0].value.clone();
        }
        if next_idx >= len {
            return self.keys[len - 1].value.clone();
        }

        let k0 = &self.keys[next_idx - 1];
        let k1 = &self.keys[next_idx];
        let dt = k1.time - k0.time;
        let t = ((time - k0.time) / dt).clamp(0.0, 1.0);

        // Exactly on a key.
        if t <= 0.0 {
            return k0.value.clone();
        }

        match self.interpolation {
            InterpolationMode::Step => k0.value.clone(),
            InterpolationMode::Linear => T::interpolate_linear(&k0.value, &k1.value, t),
            InterpolationMode::Hermite => T::interpolate_cubic(
                &k0.value,
                &k0.out_tangent,
                &k1.in_tangent,
                &k1.value,
                t,
                dt,
            ),
        }
    }
}

/// A track of any value domain.
#[derive(Debug, Clone)]
pub enum TrackData {
    Scalar(KeyframeTrack<f32>),
    Vec2(KeyframeTrack<Vec2>),
    Vec3(KeyframeTrack<Vec3>),
    Vec4(KeyframeTrack<Vec4>),
    Rotation(KeyframeTrack<Quat>),
    FloatArray(KeyframeTrack<FloatArray>),
}

macro_rules! dispatch {
    ($self:expr, $track:ident => $body:expr) => {
        match $self {
            TrackData::Scalar($track) => $body,
            TrackData::Vec2($track) => $body,
            TrackData::Vec3($track) => $body,
            TrackData::Vec4($track) => $body,
            TrackData::Rotation($track) => $body,
            TrackData::FloatArray($track) => $body,
        }
    };
}

impl TrackData {
    #[must_use]
    pub fn domain(&self) -> ValueDomain {
        match self {
            TrackData::Scalar(_) => ValueDomain::Scalar,
            TrackData::Vec2(_) => ValueDomain::Vec2,
            TrackData::Vec3(_) => ValueDomain::Vec3,
            TrackData::Vec4(_) => ValueDomain::Vec4,
            TrackData::Rotation(_) => ValueDomain::Rotation,
            TrackData::FloatArray(_) => ValueDomain::FloatArray,
        }
    }

    #[must_use]
    pub fn end_time(&self) -> f32 {
        dispatch!(self, t => t.end_time())
    }

    pub fn validate(&self) -> Result<(), SampleDomainError> {
        dispatch!(self, t => t.validate())
    }

    /// Component count of the sampled value (first key), 0 if empty.
    #[must_use]
    pub fn component_count(&self) -> usize {
        dispatch!(self, t => t.keys().first().map_or(0, |k| k.value.component_count()))
    }

    /// Samples at `time` seconds.
    #[must_use]
    pub fn sample(&self, time: f32) -> AnimationValue {
        dispatch!(self, t => t.sample(time).into_value())
    }

    /// Wrap-resolves `normalized` and samples at `resolved * duration`.
    #[must_use]
    pub fn sample_normalized(&self, normalized: f32, duration: f32, wrap: WrapMode) -> AnimationValue {
        self.sample(wrap.resolve(normalized) * duration)
    }
}
