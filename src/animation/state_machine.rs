//! Per-layer state machine: advances state time and resolves crossfades.
//!
//! # Lifecycle
//!
//! A machine starts in its default state at time 0 (`InState`). Each
//! [`update`](StateMachine::update) advances the active state's time
//! (kept within one clip length, whole cycles counted separately), then
//! evaluates its transitions in authored order followed by the any-state
//! transitions; the first satisfied one wins. A zero-length transition
//! switches instantly, otherwise the machine enters `Transitioning` and
//! crossfade progress grows by `dt / duration` until it reaches 1.
//! No transitions are evaluated mid-crossfade; an explicit
//! [`cross_fade`](StateMachine::cross_fade) during one restarts it from the
//! dominant state.
//!
//! There is no terminal state: a machine runs for as long as its layer does.

use rustc_hash::FxHashMap;
use smallvec::{SmallVec, smallvec};

use crate::animation::parameters::Parameters;
use crate::animation::state::AnimationState;
use crate::animation::transition::Transition;
use crate::errors::ConfigurationError;

/// Playback cursor of one state.
///
/// `time` is local time within the current cycle, always in
/// `[0, duration)`; `cycles` counts whole clip lengths played (negative when
/// running backwards past the start). Keeping the two apart keeps `time`
/// precise no matter how long the state has been playing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatePlayback {
    pub state: usize,
    pub time: f32,
    pub cycles: i32,
}

impl StatePlayback {
    fn start(state: usize) -> Self {
        Self {
            state,
            ..Default::default()
        }
    }

    /// Advances by `seconds`, carrying whole clip lengths into `cycles`.
    fn advance(&mut self, seconds: f32, duration: f32) {
        if duration <= 0.0 || !seconds.is_finite() {
            return;
        }

        let total = self.time + seconds;
        let wraps = (total / duration).floor();
        self.time = total - wraps * duration;
        self.cycles = self.cycles.saturating_add(wraps as i32);

        // Rounding can land exactly on either boundary.
        if self.time >= duration {
            self.time -= duration;
            self.cycles = self.cycles.saturating_add(1);
        }
        self.time = self.time.max(0.0);
    }

    /// Normalized time counted from the state's entry (`cycles + fraction`).
    /// A zero-length state counts as finished.
    #[must_use]
    pub fn normalized(&self, duration: f32) -> f32 {
        if duration > 0.0 {
            self.cycles as f32 + self.time / duration
        } else {
            1.0
        }
    }

    fn fraction(&self, duration: f32) -> f32 {
        if duration > 0.0 { self.time / duration } else { 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Crossfade {
    destination: StatePlayback,
    duration: f32,
    progress: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachinePhase {
    InState,
    Transitioning,
}

/// A state that currently contributes to the layer's output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveState {
    pub state: usize,
    /// Wrap-resolved normalized time in `[0, 1]`.
    pub normalized_time: f32,
    pub weight: f32,
}

const ANY_STATE: &str = "<any>";

#[derive(Debug, Clone)]
pub struct StateMachine {
    states: Vec<AnimationState>,
    state_lookup: FxHashMap<String, usize>,
    // Parallel to each state's `transitions`: resolved destination indices.
    transition_targets: Vec<SmallVec<[usize; 4]>>,
    any_state_transitions: Vec<(usize, Transition)>,
    default_state: usize,

    primary: StatePlayback,
    crossfade: Option<Crossfade>,
    paused: bool,
}

impl StateMachine {
    /// Builds a machine starting in `default_state`.
    ///
    /// Fails if there are no states, the default is unknown, names collide,
    /// a transition targets an unknown state or has an invalid duration.
    pub fn new(
        states: Vec<AnimationState>,
        default_state: &str,
    ) -> Result<Self, ConfigurationError> {
        if states.is_empty() {
            return Err(ConfigurationError::NoStates);
        }

        let mut state_lookup = FxHashMap::default();
        for (index, state) in states.iter().enumerate() {
            if state_lookup.insert(state.name.clone(), index).is_some() {
                return Err(ConfigurationError::DuplicateState(state.name.clone()));
            }
        }

        let default_index = *state_lookup
            .get(default_state)
            .ok_or_else(|| ConfigurationError::UnknownDefaultState(default_state.to_string()))?;

        let mut transition_targets = Vec::with_capacity(states.len());
        for state in &states {
            let mut targets = SmallVec::new();
            for transition in &state.transitions {
                targets.push(resolve_transition(&state_lookup, &state.name, transition)?);
            }
            transition_targets.push(targets);
        }

        Ok(Self {
            states,
            state_lookup,
            transition_targets,
            any_state_transitions: Vec::new(),
            default_state: default_index,
            primary: StatePlayback::start(default_index),
            crossfade: None,
            paused: false,
        })
    }

    /// Adds a transition that may fire from any state but its destination.
    pub fn add_any_state_transition(
        &mut self,
        transition: Transition,
    ) -> Result<(), ConfigurationError> {
        let target = resolve_transition(&self.state_lookup, ANY_STATE, &transition)?;
        self.any_state_transitions.push((target, transition));
        Ok(())
    }

    // ========================================================================
    // Per-frame update
    // ========================================================================

    pub fn update(&mut self, dt: f32, parameters: &mut Parameters) {
        if self.paused {
            return;
        }

        let state = &self.states[self.primary.state];
        self.primary.advance(dt * state.speed, state.duration());

        if let Some(crossfade) = &mut self.crossfade {
            let destination = &self.states[crossfade.destination.state];
            crossfade
                .destination
                .advance(dt * destination.speed, destination.duration());
            crossfade.progress += dt / crossfade.duration;

            if crossfade.progress >= 1.0 {
                let destination = crossfade.destination;
                self.primary = destination;
                self.crossfade = None;
                log::debug!(
                    "Crossfade finished, now in '{}'",
                    self.states[destination.state].name
                );
            }
            return;
        }

        if let Some((destination, duration, offset)) = self.find_transition(parameters) {
            log::debug!(
                "Transition '{}' -> '{}' ({duration}s)",
                self.states[self.primary.state].name,
                self.states[destination].name
            );
            self.begin(destination, duration, offset);
        }
    }

    /// First satisfied transition: the active state's in authored order,
    /// then any-state ones. Consumes the triggers of the winner.
    fn find_transition(&self, parameters: &mut Parameters) -> Option<(usize, f32, f32)> {
        let current = self.primary.state;
        let state = &self.states[current];
        let normalized = self.primary.normalized(state.duration());

        let own = state
            .transitions
            .iter()
            .zip(self.transition_targets[current].iter().copied());
        let any = self
            .any_state_transitions
            .iter()
            .filter(|(target, _)| *target != current)
            .map(|(target, transition)| (transition, *target));

        let (transition, target) = own
            .chain(any)
            .find(|(transition, _)| transition.is_satisfied(normalized, parameters))?;

        transition.consume_triggers(parameters);
        Some((target, transition.duration, transition.offset))
    }

    fn begin(&mut self, destination: usize, duration: f32, offset: f32) {
        let length = self.states[destination].duration();
        let mut start = StatePlayback::start(destination);
        start.advance(offset * length, length);

        if duration > 0.0 {
            // Interrupting a crossfade: the dominant side becomes the source.
            if let Some(interrupted) = self.crossfade.take() {
                if interrupted.progress >= 0.5 {
                    self.primary = interrupted.destination;
                }
            }
            self.crossfade = Some(Crossfade {
                destination: start,
                duration,
                progress: 0.0,
            });
        } else {
            self.primary = start;
            self.crossfade = None;
        }
    }

    // ========================================================================
    // Direct control
    // ========================================================================

    /// Jumps to `state` at `normalized_offset`, cancelling any crossfade.
    pub fn play(&mut self, state: &str, normalized_offset: f32) -> Result<(), ConfigurationError> {
        let index = self.state_index(state)?;
        self.begin(index, 0.0, normalized_offset);
        Ok(())
    }

    /// Starts a crossfade from the active state to `state`.
    ///
    /// If a crossfade is already running, whichever of its two states holds
    /// the larger weight becomes the source of the new one.
    pub fn cross_fade(&mut self, state: &str, duration: f32) -> Result<(), ConfigurationError> {
        let index = self.state_index(state)?;
        if !duration.is_finite() || duration < 0.0 {
            return Err(ConfigurationError::InvalidCrossfadeDuration(duration));
        }
        self.begin(index, duration, 0.0);
        Ok(())
    }

    /// Returns to the default state at time 0.
    pub fn reset(&mut self) {
        self.primary = StatePlayback::start(self.default_state);
        self.crossfade = None;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// States contributing this frame with their crossfade weights.
    #[must_use]
    pub fn active_states(&self) -> SmallVec<[ActiveState; 2]> {
        let primary = self.active(self.primary, 1.0);
        match &self.crossfade {
            None => smallvec![primary],
            Some(crossfade) => {
                let progress = crossfade.progress.clamp(0.0, 1.0);
                smallvec![
                    ActiveState {
                        weight: 1.0 - progress,
                        ..primary
                    },
                    self.active(crossfade.destination, progress),
                ]
            }
        }
    }

    fn active(&self, playback: StatePlayback, weight: f32) -> ActiveState {
        let state = &self.states[playback.state];
        ActiveState {
            state: playback.state,
            normalized_time: state
                .wrap_mode
                .resolve_cycle(playback.cycles, playback.fraction(state.duration())),
            weight,
        }
    }

    #[must_use]
    pub fn phase(&self) -> MachinePhase {
        if self.crossfade.is_some() {
            MachinePhase::Transitioning
        } else {
            MachinePhase::InState
        }
    }

    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.crossfade.is_some()
    }

    #[must_use]
    pub fn current_state(&self) -> &AnimationState {
        &self.states[self.primary.state]
    }

    #[must_use]
    pub fn current_playback(&self) -> StatePlayback {
        self.primary
    }

    /// Normalized time of the active state since it was entered; this is
    /// what exit times compare against.
    #[must_use]
    pub fn current_normalized_time(&self) -> f32 {
        self.primary.normalized(self.current_state().duration())
    }

    #[must_use]
    pub fn destination_state(&self) -> Option<&AnimationState> {
        self.crossfade
            .as_ref()
            .map(|c| &self.states[c.destination.state])
    }

    #[must_use]
    pub fn crossfade_progress(&self) -> Option<f32> {
        self.crossfade.as_ref().map(|c| c.progress.min(1.0))
    }

    #[must_use]
    pub fn states(&self) -> &[AnimationState] {
        &self.states
    }

    #[must_use]
    pub fn find_state(&self, name: &str) -> Option<&AnimationState> {
        self.state_lookup.get(name).map(|&i| &self.states[i])
    }

    fn state_index(&self, name: &str) -> Result<usize, ConfigurationError> {
        self.state_lookup
            .get(name)
            .copied()
            .ok_or_else(|| ConfigurationError::StateNotFound(name.to_string()))
    }
}

fn resolve_transition(
    lookup: &FxHashMap<String, usize>,
    source: &str,
    transition: &Transition,
) -> Result<usize, ConfigurationError> {
    if !transition.duration.is_finite() || transition.duration < 0.0 {
        return Err(ConfigurationError::InvalidCrossfadeDuration(transition.duration));
    }
    lookup
        .get(&transition.destination)
        .copied()
        .ok_or_else(|| ConfigurationError::DanglingTransition {
            source_state: source.to_string(),
            destination: transition.destination.clone(),
        })
}
