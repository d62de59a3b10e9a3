//! Error Types
//!
//! This module defines the error types used throughout the animation engine.
//!
//! # Overview
//!
//! Failures fall into three families, each surfaced at a different point in
//! an animated entity's life:
//! - [`ConfigurationError`]: authored state machine data is inconsistent.
//!   Fatal at construction, never retried.
//! - [`BindingError`]: a curve references a property that cannot be driven
//!   (no assembler, no component). Isolates the single affected curve owner.
//! - [`SampleDomainError`]: keyframe data is malformed for its value domain.
//!   Detected at load or bind time, never re-checked per sample.
//!
//! [`AnimationError`] wraps all three so callers can use a single
//! [`Result<T>`].
//!
//! ```rust,ignore
//! use kinema::errors::{AnimationError, Result};
//!
//! fn build() -> Result<()> {
//!     let machine = StateMachine::new(states, "Idle")?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::animation::values::ValueDomain;

/// Inconsistent authored data, detected when a state machine or registry
/// is being set up.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// A state machine was built from an empty state list.
    #[error("State machine has no states, so no default state exists")]
    NoStates,

    /// The designated default state is not part of the machine.
    #[error("Default state '{0}' does not exist")]
    UnknownDefaultState(String),

    /// Two states share a name.
    #[error("Duplicate state name '{0}'")]
    DuplicateState(String),

    /// A transition points at a state that does not exist.
    #[error("Transition from '{source_state}' targets unknown state '{destination}'")]
    DanglingTransition {
        /// Source state name (`"<any>"` for any-state transitions)
        source_state: String,
        /// Destination name as authored
        destination: String,
    },

    /// `play` / `cross_fade` was asked for a state the machine doesn't own.
    #[error("State '{0}' not found")]
    StateNotFound(String),

    /// A layer lookup by name failed.
    #[error("Layer '{0}' not found")]
    LayerNotFound(String),

    /// Crossfade duration is negative or not finite.
    #[error("Invalid crossfade duration {0}")]
    InvalidCrossfadeDuration(f32),

    /// The assembler registry no longer accepts registrations.
    #[error("Assembler registry is sealed; cannot register '{target_kind}.{property}'")]
    RegistrySealed {
        /// Target kind of the rejected registration
        target_kind: String,
        /// Property name of the rejected registration
        property: String,
    },
}

/// A curve cannot be connected to a concrete target property.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindingError {
    /// No collaborator registered an assembler for this property.
    #[error("No assembler registered for '{target_kind}.{property}'")]
    MissingAssembler {
        /// Target kind
        target_kind: String,
        /// Property name
        property: String,
    },

    /// The target entity lacks the component the curve animates.
    #[error("Target '{path}' has no '{target_kind}' component")]
    MissingComponent {
        /// Entity path relative to the animated root
        path: String,
        /// Component kind looked up
        target_kind: String,
    },

    /// The resolved component is not the type the assembler drives.
    #[error("Component '{target_kind}' at '{path}' has an unexpected type")]
    ComponentTypeMismatch {
        /// Entity path relative to the animated root
        path: String,
        /// Component kind looked up
        target_kind: String,
    },

    /// The assembler could not read the current property value.
    #[error("Failed to read '{property}': {reason}")]
    ReadFailed {
        /// Property name
        property: String,
        /// Human readable cause
        reason: String,
    },

    /// The target property holds a different kind of value than the curve.
    #[error("Property '{property}' holds {found:?} but the curve samples {expected:?}")]
    DomainMismatch {
        /// Property name
        property: String,
        /// Domain of the curve
        expected: ValueDomain,
        /// Domain read from the target
        found: ValueDomain,
    },
}

/// Keyframe data that cannot be sampled in its value domain.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SampleDomainError {
    /// A track must hold at least one key.
    #[error("Track has no keyframes")]
    EmptyTrack,

    /// Key times must be strictly increasing.
    #[error("Keyframe times not strictly increasing at index {index} ({previous} >= {current})")]
    UnorderedKeys {
        /// Index of the offending key
        index: usize,
        /// Time of the preceding key
        previous: f32,
        /// Time of the offending key
        current: f32,
    },

    /// A key time or value is NaN or infinite.
    #[error("Keyframe {index} contains a non-finite number")]
    NonFinite {
        /// Index of the offending key
        index: usize,
    },

    /// A rotation key is not a unit quaternion.
    #[error("Rotation keyframe {index} is not unit length")]
    NonUnitRotation {
        /// Index of the offending key
        index: usize,
    },

    /// Array keys disagree on their length.
    #[error("Keyframe {index} has {found} components, expected {expected}")]
    ArrayLengthMismatch {
        /// Index of the offending key
        index: usize,
        /// Component count of the first key
        expected: usize,
        /// Component count of the offending key
        found: usize,
    },

    /// Array tracks only interpolate linearly.
    #[error("Hermite interpolation is not supported for float array tracks")]
    UnsupportedInterpolation,

    /// The track's array length differs from the target's captured default.
    #[error("Track samples {track} components but property '{property}' has {target}")]
    TargetLengthMismatch {
        /// Property name
        property: String,
        /// Component count sampled by the track
        track: usize,
        /// Component count of the captured default
        target: usize,
    },
}

/// The umbrella error type for the animation engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    // ========================================================================
    // Setup Errors
    // ========================================================================
    /// Authored configuration is inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    // ========================================================================
    // Binding Errors
    // ========================================================================
    /// A curve could not be bound to its target.
    #[error("Binding error: {0}")]
    Binding(#[from] BindingError),

    /// A track's data is malformed for its value domain.
    #[error("Sample domain error: {0}")]
    SampleDomain(#[from] SampleDomainError),
}

/// Alias for `Result<T, AnimationError>`.
pub type Result<T> = std::result::Result<T, AnimationError>;
