use std::sync::Arc;

use crate::animation::clip::AnimationClip;
use crate::animation::tracks::WrapMode;
use crate::animation::transition::Transition;

/// A named clip playback configuration inside a state machine.
#[derive(Debug, Clone)]
pub struct AnimationState {
    pub name: String,
    pub clip: Arc<AnimationClip>,
    pub speed: f32,
    pub wrap_mode: WrapMode,
    pub transitions: Vec<Transition>,
}

impl AnimationState {
    #[must_use]
    pub fn new(name: impl Into<String>, clip: Arc<AnimationClip>) -> Self {
        Self {
            name: name.into(),
            clip,
            speed: 1.0,
            wrap_mode: WrapMode::Loop,
            transitions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    #[must_use]
    pub fn with_wrap_mode(mut self, wrap_mode: WrapMode) -> Self {
        self.wrap_mode = wrap_mode;
        self
    }

    /// Appends a transition; evaluation follows insertion order.
    #[must_use]
    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    #[inline]
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.clip.duration
    }
}
