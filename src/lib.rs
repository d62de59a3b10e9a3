//! Kinema
//!
//! The animation evaluation and layer blending core of a real-time scene
//! graph runtime. Keyframe curves drive arbitrary scene properties (bone
//! transforms, blend-shape weights, material colors) through per-layer
//! state machines, composited once per frame.
//!
//! ```rust,ignore
//! use kinema::animation::*;
//!
//! let machine = StateMachine::new(vec![idle, walk], "Idle")?;
//! let mut blender = Blender::new(vec![Layer::new("Base", machine)]);
//! blender.bind(&AssemblerRegistry::global().read(), &scene);
//!
//! // every frame, after input/physics and before render submission
//! blender.update(dt);
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod animation;
pub mod errors;
pub mod utils;

pub use animation::{
    AnimationClip, AnimationCurve, AnimationState, AnimationValue, AssemblerRegistry,
    BlendingMode, Blender, BlenderSettings, CurveBinding, Keyframe, KeyframeTrack, Layer,
    StateMachine, TrackData, Transition, WrapMode,
};
pub use errors::{AnimationError, BindingError, ConfigurationError, Result, SampleDomainError};
pub use utils::interner;
