use crate::animation::parameters::{Condition, Parameters};

/// An authored edge between two states.
///
/// Fires when its exit time (if any) has been reached AND every condition
/// holds. A transition with neither fires on the first evaluation.
#[derive(Debug, Clone)]
pub struct Transition {
    pub destination: String,
    pub conditions: Vec<Condition>,
    /// Source normalized time at which the transition may fire.
    pub exit_time: Option<f32>,
    /// Crossfade length in seconds; 0 switches instantly.
    pub duration: f32,
    /// Normalized time the destination starts at.
    pub offset: f32,
}

impl Transition {
    #[must_use]
    pub fn to(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            conditions: Vec::new(),
            exit_time: None,
            duration: 0.0,
            offset: 0.0,
        }
    }

    #[must_use]
    pub fn with_exit_time(mut self, exit_time: f32) -> Self {
        self.exit_time = Some(exit_time);
        self
    }

    #[must_use]
    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.duration = seconds;
        self
    }

    #[must_use]
    pub fn with_offset(mut self, normalized: f32) -> Self {
        self.offset = normalized;
        self
    }

    #[must_use]
    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// `source_normalized` is the unwrapped normalized time of the source.
    #[must_use]
    pub fn is_satisfied(&self, source_normalized: f32, parameters: &Parameters) -> bool {
        if let Some(exit) = self.exit_time {
            if source_normalized < exit {
                return false;
            }
        }
        self.conditions.iter().all(|c| c.holds(parameters))
    }

    pub(crate) fn consume_triggers(&self, parameters: &mut Parameters) {
        for condition in &self.conditions {
            parameters.consume_trigger(condition.parameter);
        }
    }
}
