//! Animation Module
//!
//! Keyframe sampling, per-layer state machines and multi-layer property
//! blending:
//! - [`tracks`]: keyframe tracks, wrap modes and sampling
//! - [`values`]: value domains and blend math
//! - [`state_machine`]: states, transitions and crossfades
//! - [`layer`] / [`blender`]: weighted composition and the per-frame entry point
//! - [`assembler`] / [`owner`]: the bridge from sampled values to target properties

pub mod values;
pub mod tracks;
pub mod clip;
pub mod state;
pub mod parameters;
pub mod transition;
pub mod state_machine;
pub mod assembler;
pub mod owner;
pub mod layer;
pub mod blender;

pub use values::{Animatable, AnimationValue, FloatArray, Interpolatable, ValueDomain};
pub use tracks::{InterpolationMode, Keyframe, KeyframeTrack, TrackData, WrapMode};
pub use clip::{AnimationClip, AnimationCurve, CurveBinding};
pub use state::AnimationState;
pub use parameters::{Condition, ConditionMode, ParameterValue, Parameters};
pub use transition::Transition;
pub use state_machine::{ActiveState, MachinePhase, StateMachine, StatePlayback};
pub use assembler::{
    AssemblerFactory, AssemblerRegistry, ComponentRef, FieldAssembler, PropertyAssembler,
    TargetResolver,
};
pub use owner::{CurveOwner, OwnerKey};
pub use layer::{BlendingMode, Contribution, Layer, LayerOutput};
pub use blender::{BindReport, BindingFailure, Blender, BlenderSettings};
