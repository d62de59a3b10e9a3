use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::animation::owner::OwnerKey;
use crate::animation::parameters::Parameters;
use crate::animation::state_machine::StateMachine;
use crate::animation::values::AnimationValue;

/// How a layer's output combines with the layers beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendingMode {
    /// Lerp from what lies beneath toward this layer's value.
    #[default]
    Override,
    /// Add this layer's delta from the baseline.
    Additive,
}

/// One owner's combined value from a single layer.
#[derive(Debug, Clone)]
pub struct Contribution {
    pub owner: OwnerKey,
    pub value: AnimationValue,
    pub weight: f32,
}

/// Per-layer scratch buffer, reused every frame.
///
/// Values pushed twice for the same owner (the outgoing and incoming state
/// of a crossfade) are merged into their weighted mix.
#[derive(Debug, Default)]
pub struct LayerOutput {
    contributions: Vec<Contribution>,
    index: FxHashMap<OwnerKey, usize>,
}

impl LayerOutput {
    pub fn clear(&mut self) {
        self.contributions.clear();
        self.index.clear();
    }

    pub fn push(&mut self, owner: OwnerKey, value: AnimationValue, weight: f32) {
        if let Some(&i) = self.index.get(&owner) {
            let existing = &mut self.contributions[i];
            let total = existing.weight + weight;
            if total > 0.0 {
                existing.value.blend_toward(&value, weight / total);
                existing.weight = total;
            }
            return;
        }
        self.index.insert(owner, self.contributions.len());
        self.contributions.push(Contribution {
            owner,
            value,
            weight,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Contribution> {
        self.contributions.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.contributions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
    }
}

/// An independently weighted animation channel driven by one state machine.
#[derive(Debug, Clone)]
pub struct Layer {
    name: String,
    weight: f32,
    blending_mode: BlendingMode,
    state_machine: StateMachine,
    // Per state, per curve: the owner the curve writes to (None if skipped).
    bindings: Vec<SmallVec<[Option<OwnerKey>; 8]>>,
}

impl Layer {
    #[must_use]
    pub fn new(name: impl Into<String>, state_machine: StateMachine) -> Self {
        Self {
            name: name.into(),
            weight: 1.0,
            blending_mode: BlendingMode::Override,
            state_machine,
            bindings: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.set_weight(weight);
        self
    }

    #[must_use]
    pub fn with_blending_mode(mut self, mode: BlendingMode) -> Self {
        self.blending_mode = mode;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Clamped to `[0, 1]`; takes effect on the next update.
    pub fn set_weight(&mut self, weight: f32) {
        self.weight = if weight.is_nan() { 0.0 } else { weight.clamp(0.0, 1.0) };
    }

    #[must_use]
    pub fn blending_mode(&self) -> BlendingMode {
        self.blending_mode
    }

    pub fn set_blending_mode(&mut self, mode: BlendingMode) {
        self.blending_mode = mode;
    }

    #[must_use]
    pub fn state_machine(&self) -> &StateMachine {
        &self.state_machine
    }

    pub fn state_machine_mut(&mut self) -> &mut StateMachine {
        &mut self.state_machine
    }

    pub(crate) fn set_bindings(&mut self, bindings: Vec<SmallVec<[Option<OwnerKey>; 8]>>) {
        self.bindings = bindings;
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        !self.bindings.is_empty()
    }

    /// Advances the state machine and samples every bound curve of the
    /// active states into `out`, weights scaled by the layer weight.
    ///
    /// A layer at weight 0 keeps its state machine running but emits nothing.
    pub fn evaluate(
        &mut self,
        dt: f32,
        parameters: &mut Parameters,
        weight_epsilon: f32,
        out: &mut LayerOutput,
    ) {
        out.clear();
        self.state_machine.update(dt, parameters);

        if self.weight <= weight_epsilon {
            return;
        }

        for active in self.state_machine.active_states() {
            let weight = active.weight * self.weight;
            if weight <= weight_epsilon {
                continue;
            }
            let Some(owners) = self.bindings.get(active.state) else {
                continue;
            };
            let state = &self.state_machine.states()[active.state];
            let time = active.normalized_time * state.duration();

            for (curve, owner) in state.clip.curves.iter().zip(owners) {
                if let Some(owner) = owner {
                    out.push(*owner, curve.data.sample(time), weight);
                }
            }
        }
    }
}
