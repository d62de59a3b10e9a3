//! Animated value domains and the math that combines them.
//!
//! Every curve samples one [`ValueDomain`]. The typed side is expressed by
//! [`Interpolatable`] (per-segment interpolation, used by
//! [`KeyframeTrack`](super::tracks::KeyframeTrack)) and [`Animatable`]
//! (conversion to and from the type-erased [`AnimationValue`] that flows
//! through layers and curve owners).

use glam::{Quat, Vec2, Vec3, Vec4};
use smallvec::SmallVec;

/// Variable-length float vector, e.g. blend-shape weights.
pub type FloatArray = SmallVec<[f32; 8]>;

/// The kind of value a curve samples and a property stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueDomain {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Rotation,
    FloatArray,
}

/// A sampled or stored property value.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationValue {
    Scalar(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Rotation(Quat),
    FloatArray(FloatArray),
}

impl AnimationValue {
    #[must_use]
    pub fn domain(&self) -> ValueDomain {
        match self {
            AnimationValue::Scalar(_) => ValueDomain::Scalar,
            AnimationValue::Vec2(_) => ValueDomain::Vec2,
            AnimationValue::Vec3(_) => ValueDomain::Vec3,
            AnimationValue::Vec4(_) => ValueDomain::Vec4,
            AnimationValue::Rotation(_) => ValueDomain::Rotation,
            AnimationValue::FloatArray(_) => ValueDomain::FloatArray,
        }
    }

    /// Number of float components (quaternions count as 4).
    #[must_use]
    pub fn component_count(&self) -> usize {
        match self {
            AnimationValue::Scalar(_) => 1,
            AnimationValue::Vec2(_) => 2,
            AnimationValue::Vec3(_) => 3,
            AnimationValue::Vec4(_) | AnimationValue::Rotation(_) => 4,
            AnimationValue::FloatArray(a) => a.len(),
        }
    }

    /// Moves `self` toward `target` by `t` (override blending).
    ///
    /// Rotations use spherical interpolation. `t >= 1` assigns `target`
    /// exactly. Values of different domains are left untouched; binding
    /// guarantees they never meet.
    pub fn blend_toward(&mut self, target: &AnimationValue, t: f32) {
        if t >= 1.0 {
            if self.domain() == target.domain() {
                self.clone_from(target);
            }
            return;
        }

        match (self, target) {
            (AnimationValue::Scalar(a), AnimationValue::Scalar(b)) => *a += (b - *a) * t,
            (AnimationValue::Vec2(a), AnimationValue::Vec2(b)) => *a = a.lerp(*b, t),
            (AnimationValue::Vec3(a), AnimationValue::Vec3(b)) => *a = a.lerp(*b, t),
            (AnimationValue::Vec4(a), AnimationValue::Vec4(b)) => *a = a.lerp(*b, t),
            (AnimationValue::Rotation(a), AnimationValue::Rotation(b)) => {
                *a = a.slerp(*b, t).normalize();
            }
            (AnimationValue::FloatArray(a), AnimationValue::FloatArray(b)) => {
                for (x, y) in a.iter_mut().zip(b.iter()) {
                    *x += (y - *x) * t;
                }
            }
            _ => debug_assert!(false, "blend_toward across value domains"),
        }
    }

    /// Adds `(value - baseline) * weight` to `self` (additive blending).
    ///
    /// For rotations the delta is the relative rotation `baseline⁻¹ · value`,
    /// scaled by slerping from identity and composed onto `self`.
    pub fn add_weighted_delta(
        &mut self,
        value: &AnimationValue,
        baseline: &AnimationValue,
        weight: f32,
    ) {
        match (self, value, baseline) {
            (AnimationValue::Scalar(a), AnimationValue::Scalar(v), AnimationValue::Scalar(b)) => {
                *a += (v - b) * weight;
            }
            (AnimationValue::Vec2(a), AnimationValue::Vec2(v), AnimationValue::Vec2(b)) => {
                *a += (*v - *b) * weight;
            }
            (AnimationValue::Vec3(a), AnimationValue::Vec3(v), AnimationValue::Vec3(b)) => {
                *a += (*v - *b) * weight;
            }
            (AnimationValue::Vec4(a), AnimationValue::Vec4(v), AnimationValue::Vec4(b)) => {
                *a += (*v - *b) * weight;
            }
            (
                AnimationValue::Rotation(a),
                AnimationValue::Rotation(v),
                AnimationValue::Rotation(b),
            ) => {
                let delta = b.inverse() * *v;
                let scaled = Quat::IDENTITY.slerp(delta, weight);
                *a = (*a * scaled).normalize();
            }
            (
                AnimationValue::FloatArray(a),
                AnimationValue::FloatArray(v),
                AnimationValue::FloatArray(b),
            ) => {
                for ((x, v), b) in a.iter_mut().zip(v.iter()).zip(b.iter()) {
                    *x += (v - b) * weight;
                }
            }
            _ => debug_assert!(false, "add_weighted_delta across value domains"),
        }
    }
}

/// Conversion between a concrete property type and [`AnimationValue`].
pub trait Animatable: Clone + Sized + 'static {
    const DOMAIN: ValueDomain;

    fn into_value(self) -> AnimationValue;

    fn from_value(value: &AnimationValue) -> Option<Self>;

    /// Component count; fixed for every domain except float arrays.
    fn component_count(&self) -> usize;

    fn is_finite(&self) -> bool;

    /// Whether the value is a legal member of its domain beyond being
    /// finite. Only rotations constrain this (unit length).
    fn is_in_domain(&self) -> bool {
        true
    }
}

/// Largest deviation from unit length a rotation key may carry.
pub const UNIT_LENGTH_TOLERANCE: f32 = 1e-5;

/// Per-segment interpolation between two keys.
pub trait Interpolatable: Animatable {
    /// A tangent that contributes no slope, shaped like `value`.
    fn zero_tangent(value: &Self) -> Self;

    fn interpolate_linear(start: &Self, end: &Self, t: f32) -> Self;

    /// Cubic Hermite between `v0` and `v1`; tangents are per second and
    /// get scaled by the segment length `dt`.
    fn interpolate_cubic(
        v0: &Self,
        out_tangent0: &Self,
        in_tangent1: &Self,
        v1: &Self,
        t: f32,
        dt: f32,
    ) -> Self;
}

/// Hermite basis `(h00, h10, h01, h11)` at `t`.
#[inline]
fn hermite_basis(t: f32) -> (f32, f32, f32, f32) {
    let t2 = t * t;
    let t3 = t2 * t;

    let s2 = -2.0 * t3 + 3.0 * t2;
    let s3 = t3 - t2;
    let s0 = 1.0 - s2;
    let s1 = s3 - t2 + t;
    (s0, s1, s2, s3)
}

impl Animatable for f32 {
    const DOMAIN: ValueDomain = ValueDomain::Scalar;

    fn into_value(self) -> AnimationValue {
        AnimationValue::Scalar(self)
    }

    fn from_value(value: &AnimationValue) -> Option<Self> {
        match value {
            AnimationValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    fn component_count(&self) -> usize {
        1
    }

    fn is_finite(&self) -> bool {
        f32::is_finite(*self)
    }
}

impl Interpolatable for f32 {
    fn zero_tangent(_: &Self) -> Self {
        0.0
    }

    fn interpolate_linear(start: &Self, end: &Self, t: f32) -> Self {
        start + (end - start) * t
    }

    fn interpolate_cubic(v0: &Self, out_tangent0: &Self, in_tangent1: &Self, v1: &Self, t: f32, dt: f32) -> Self {
        let (s0, s1, s2, s3) = hermite_basis(t);
        s0 * v0 + s1 * out_tangent0 * dt + s2 * v1 + s3 * in_tangent1 * dt
    }
}

macro_rules! impl_vector_domain {
    ($ty:ty, $variant:ident, $count:expr) => {
        impl Animatable for $ty {
            const DOMAIN: ValueDomain = ValueDomain::$variant;

            fn into_value(self) -> AnimationValue {
                AnimationValue::$variant(self)
            }

            fn from_value(value: &AnimationValue) -> Option<Self> {
                match value {
                    AnimationValue::$variant(v) => Some(*v),
                    _ => None,
                }
            }

            fn component_count(&self) -> usize {
                $count
            }

            fn is_finite(&self) -> bool {
                <$ty>::is_finite(*self)
            }
        }

        impl Interpolatable for $ty {
            fn zero_tangent(_: &Self) -> Self {
                <$ty>::ZERO
            }

            fn interpolate_linear(start: &Self, end: &Self, t: f32) -> Self {
                start.lerp(*end, t)
            }

            fn interpolate_cubic(
                v0: &Self,
                out_tangent0: &Self,
                in_tangent1: &Self,
                v1: &Self,
                t: f32,
                dt: f32,
            ) -> Self {
                let (s0, s1, s2, s3) = hermite_basis(t);
                *v0 * s0 + *out_tangent0 * (s1 * dt) + *v1 * s2 + *in_tangent1 * (s3 * dt)
            }
        }
    };
}

impl_vector_domain!(Vec2, Vec2, 2);
impl_vector_domain!(Vec3, Vec3, 3);
impl_vector_domain!(Vec4, Vec4, 4);

impl Animatable for Quat {
    const DOMAIN: ValueDomain = ValueDomain::Rotation;

    fn into_value(self) -> AnimationValue {
        AnimationValue::Rotation(self)
    }

    fn from_value(value: &AnimationValue) -> Option<Self> {
        match value {
            AnimationValue::Rotation(q) => Some(*q),
            _ => None,
        }
    }

    fn component_count(&self) -> usize {
        4
    }

    fn is_finite(&self) -> bool {
        Quat::is_finite(*self)
    }

    fn is_in_domain(&self) -> bool {
        (self.length() - 1.0).abs() <= UNIT_LENGTH_TOLERANCE
    }
}

impl Interpolatable for Quat {
    fn zero_tangent(_: &Self) -> Self {
        Quat::from_xyzw(0.0, 0.0, 0.0, 0.0)
    }

    fn interpolate_linear(start: &Self, end: &Self, t: f32) -> Self {
        start.slerp(*end, t).normalize()
    }

    /// Slerp between the two keys with the blend factor eased by the
    /// tangents: each tangent is projected onto the chord `v1 - v0` to give a
    /// scalar slope, and a scalar Hermite from 0 to 1 produces the factor.
    /// Tangents equal to `chord / dt` reproduce plain slerp.
    fn interpolate_cubic(v0: &Self, out_tangent0: &Self, in_tangent1: &Self, v1: &Self, t: f32, dt: f32) -> Self {
        let a = Vec4::from(*v0);
        let mut b = Vec4::from(*v1);
        if a.dot(b) < 0.0 {
            b = -b;
        }
        let chord = b - a;
        let len2 = chord.length_squared();
        if len2 <= f32::EPSILON {
            return v0.normalize();
        }

        let m0 = Vec4::from(*out_tangent0).dot(chord) / len2 * dt;
        let m1 = Vec4::from(*in_tangent1).dot(chord) / len2 * dt;
        let (_, s1, s2, s3) = hermite_basis(t);
        let factor = s1 * m0 + s2 + s3 * m1;

        v0.slerp(*v1, factor).normalize()
    }
}

impl Animatable for FloatArray {
    const DOMAIN: ValueDomain = ValueDomain::FloatArray;

    fn into_value(self) -> AnimationValue {
        AnimationValue::FloatArray(self)
    }

    fn from_value(value: &AnimationValue) -> Option<Self> {
        match value {
            AnimationValue::FloatArray(a) => Some(a.clone()),
            _ => None,
        }
    }

    fn component_count(&self) -> usize {
        self.len()
    }

    fn is_finite(&self) -> bool {
        self.iter().all(|v| v.is_finite())
    }
}

impl Interpolatable for FloatArray {
    fn zero_tangent(value: &Self) -> Self {
        smallvec::smallvec![0.0; value.len()]
    }

    fn interpolate_linear(start: &Self, end: &Self, t: f32) -> Self {
        start
            .iter()
            .zip(end.iter())
            .map(|(a, b)| a + (b - a) * t)
            .collect()
    }

    // Arrays are linear only; tracks reject Hermite at validation.
    fn interpolate_cubic(v0: &Self, _: &Self, _: &Self, v1: &Self, t: f32, _: f32) -> Self {
        Self::interpolate_linear(v0, v1, t)
    }
}
