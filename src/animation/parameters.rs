//! Named parameters read by transition conditions.
//!
//! Game logic writes parameters between frames; the next
//! [`StateMachine::update`](super::state_machine::StateMachine::update)
//! reads them. Triggers are bools that reset once a transition consumes them.

use rustc_hash::FxHashMap;

use crate::utils::interner::{self, Symbol};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterValue {
    Bool(bool),
    Float(f32),
    Trigger(bool),
}

#[derive(Debug, Clone, Default)]
pub struct Parameters {
    values: FxHashMap<Symbol, ParameterValue>,
}

impl Parameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.values.insert(interner::intern(name), ParameterValue::Bool(value));
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.values.insert(interner::intern(name), ParameterValue::Float(value));
    }

    pub fn set_trigger(&mut self, name: &str) {
        self.values.insert(interner::intern(name), ParameterValue::Trigger(true));
    }

    pub fn reset_trigger(&mut self, name: &str) {
        self.values.insert(interner::intern(name), ParameterValue::Trigger(false));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<ParameterValue> {
        interner::get(name).and_then(|sym| self.values.get(&sym).copied())
    }

    /// Truthiness of a bool or trigger; unknown names read as false.
    #[must_use]
    pub fn is_set(&self, name: Symbol) -> bool {
        match self.values.get(&name) {
            Some(ParameterValue::Bool(b) | ParameterValue::Trigger(b)) => *b,
            Some(ParameterValue::Float(f)) => *f != 0.0,
            None => false,
        }
    }

    /// Float value; unknown names read as 0.
    #[must_use]
    pub fn float(&self, name: Symbol) -> f32 {
        match self.values.get(&name) {
            Some(ParameterValue::Float(f)) => *f,
            Some(ParameterValue::Bool(b) | ParameterValue::Trigger(b)) => f32::from(u8::from(*b)),
            None => 0.0,
        }
    }

    /// Resets `name` if it is a trigger.
    pub(crate) fn consume_trigger(&mut self, name: Symbol) {
        if let Some(ParameterValue::Trigger(armed)) = self.values.get_mut(&name) {
            *armed = false;
        }
    }

    pub(crate) fn contains(&self, name: Symbol) -> bool {
        self.values.contains_key(&name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConditionMode {
    If,
    IfNot,
    Greater(f32),
    Less(f32),
    Equals(f32),
    NotEquals(f32),
}

/// A predicate over one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition {
    pub parameter: Symbol,
    pub mode: ConditionMode,
}

impl Condition {
    #[must_use]
    pub fn new(parameter: &str, mode: ConditionMode) -> Self {
        Self {
            parameter: interner::intern(parameter),
            mode,
        }
    }

    #[must_use]
    pub fn is_true(parameter: &str) -> Self {
        Self::new(parameter, ConditionMode::If)
    }

    #[must_use]
    pub fn is_false(parameter: &str) -> Self {
        Self::new(parameter, ConditionMode::IfNot)
    }

    #[must_use]
    pub fn greater(parameter: &str, threshold: f32) -> Self {
        Self::new(parameter, ConditionMode::Greater(threshold))
    }

    #[must_use]
    pub fn less(parameter: &str, threshold: f32) -> Self {
        Self::new(parameter, ConditionMode::Less(threshold))
    }

    #[must_use]
    pub fn equals(parameter: &str, value: f32) -> Self {
        Self::new(parameter, ConditionMode::Equals(value))
    }

    #[must_use]
    pub fn not_equals(parameter: &str, value: f32) -> Self {
        Self::new(parameter, ConditionMode::NotEquals(value))
    }

    /// Conditions on parameters that were never set never hold.
    #[must_use]
    pub fn holds(&self, parameters: &Parameters) -> bool {
        if !parameters.contains(self.parameter) {
            return false;
        }
        match self.mode {
            ConditionMode::If => parameters.is_set(self.parameter),
            ConditionMode::IfNot => !parameters.is_set(self.parameter),
            ConditionMode::Greater(v) => parameters.float(self.parameter) > v,
            ConditionMode::Less(v) => parameters.float(self.parameter) < v,
            ConditionMode::Equals(v) => (parameters.float(self.parameter) - v).abs() <= f32::EPSILON,
            ConditionMode::NotEquals(v) => (parameters.float(self.parameter) - v).abs() > f32::EPSILON,
        }
    }
}
