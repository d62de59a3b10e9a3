//! Multi-layer blending for one animated entity.
//!
//! # Frame flow
//!
//! ```text
//! update(dt)
//!   ├─ for each layer (fixed order)
//!   │    ├─ Layer::evaluate   → state machine step + sampling
//!   │    └─ CurveOwner::accumulate for every contribution
//!   └─ CurveOwner::commit for every owner touched this frame
//! ```
//!
//! Owners receive all layers before anything is written, so each target
//! property is written at most once per frame no matter how many layers
//! or tracks reference it. Owners that received no weight are not written.

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::animation::assembler::{AssemblerRegistry, TargetResolver};
use crate::animation::clip::{AnimationCurve, CurveBinding};
use crate::animation::layer::{BlendingMode, Layer, LayerOutput};
use crate::animation::owner::{CurveOwner, OwnerKey};
use crate::animation::parameters::Parameters;
use crate::animation::values::ValueDomain;
use crate::errors::{AnimationError, BindingError, ConfigurationError, SampleDomainError};

/// Tunables for a [`Blender`].
///
/// ```rust,ignore
/// let settings = BlenderSettings {
///     speed: 0.5,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlenderSettings {
    /// Multiplier applied to every `dt`.
    pub speed: f32,
    /// Contributions at or below this weight are dropped.
    pub weight_epsilon: f32,
}

impl Default for BlenderSettings {
    fn default() -> Self {
        Self {
            speed: 1.0,
            weight_epsilon: 1e-6,
        }
    }
}

/// A curve that was skipped at bind time.
#[derive(Debug, Clone)]
pub struct BindingFailure {
    pub layer: String,
    pub state: String,
    pub binding: CurveBinding,
    pub error: AnimationError,
}

#[derive(Debug, Clone, Default)]
pub struct BindReport {
    pub bound_curves: usize,
    pub owners_created: usize,
    pub failures: Vec<BindingFailure>,
}

impl BindReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Blender {
    layers: Vec<Layer>,
    owners: SlotMap<OwnerKey, CurveOwner>,
    owner_lookup: FxHashMap<CurveBinding, OwnerKey>,
    // Owner-level failures are never retried.
    failed: FxHashMap<CurveBinding, BindingError>,
    parameters: Parameters,
    settings: BlenderSettings,

    frame: u64,
    touched: Vec<OwnerKey>,
    scratch: LayerOutput,
}

impl Blender {
    #[must_use]
    pub fn new(layers: Vec<Layer>) -> Self {
        Self {
            layers,
            owners: SlotMap::with_key(),
            owner_lookup: FxHashMap::default(),
            failed: FxHashMap::default(),
            parameters: Parameters::new(),
            settings: BlenderSettings::default(),
            frame: 0,
            touched: Vec::new(),
            scratch: LayerOutput::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: BlenderSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Appends a layer on top. Call [`bind`](Self::bind) again before the
    /// next update for it to produce output.
    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    // ========================================================================
    // Binding
    // ========================================================================

    /// Connects every curve of every layer to its target property.
    ///
    /// Curves referencing the same property share one owner whose baseline
    /// is captured once. Failures are logged, reported, and leave only the
    /// affected curve unanimated. Safe to call again: existing owners are
    /// reused and known failures are not retried.
    pub fn bind(&mut self, registry: &AssemblerRegistry, resolver: &dyn TargetResolver) -> BindReport {
        let mut report = BindReport::default();

        for layer in &mut self.layers {
            let mut layer_bindings = Vec::with_capacity(layer.state_machine().states().len());

            for state in layer.state_machine().states() {
                let mut owners: SmallVec<[Option<OwnerKey>; 8]> = SmallVec::new();

                for curve in &state.clip.curves {
                    let created = self.owners.len();
                    let result = bind_curve(
                        &mut self.owners,
                        &mut self.owner_lookup,
                        &mut self.failed,
                        registry,
                        resolver,
                        curve,
                    );
                    report.owners_created += self.owners.len() - created;

                    match result {
                        Ok(key) => {
                            report.bound_curves += 1;
                            owners.push(Some(key));
                        }
                        Err(error) => {
                            log::warn!(
                                "Layer '{}' state '{}': skipping curve '{}': {error}",
                                layer.name(),
                                state.name,
                                curve.binding
                            );
                            report.failures.push(BindingFailure {
                                layer: layer.name().to_string(),
                                state: state.name.clone(),
                                binding: curve.binding,
                                error,
                            });
                            owners.push(None);
                        }
                    }
                }
                layer_bindings.push(owners);
            }
            layer.set_bindings(layer_bindings);
        }

        log::debug!(
            "Bound {} curves to {} owners ({} skipped)",
            report.bound_curves,
            self.owners.len(),
            report.failures.len()
        );
        report
    }

    // ========================================================================
    // Per-frame update
    // ========================================================================

    /// Advances every layer by `dt` seconds and commits blended values.
    pub fn update(&mut self, dt: f32) {
        let dt = dt * self.settings.speed;
        let epsilon = self.settings.weight_epsilon;
        self.frame += 1;
        self.touched.clear();

        for layer in &mut self.layers {
            layer.evaluate(dt, &mut self.parameters, epsilon, &mut self.scratch);
            let mode = layer.blending_mode();

            for contribution in self.scratch.iter() {
                let Some(owner) = self.owners.get_mut(contribution.owner) else {
                    continue;
                };
                if owner.begin_frame(self.frame) {
                    self.touched.push(contribution.owner);
                }
                owner.accumulate(&contribution.value, contribution.weight, mode);
            }
        }

        for &key in &self.touched {
            if let Some(owner) = self.owners.get_mut(key) {
                owner.commit();
            }
        }
    }

    /// Writes every owner's captured baseline back to its target.
    pub fn revert_defaults(&mut self) {
        for owner in self.owners.values_mut() {
            owner.reset_frame();
            let default = owner.default_value().clone();
            owner.accumulate(&default, 1.0, BlendingMode::Override);
            owner.commit();
        }
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.parameters.set_bool(name, value);
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.parameters.set_float(name, value);
    }

    pub fn set_trigger(&mut self, name: &str) {
        self.parameters.set_trigger(name);
    }

    pub fn reset_trigger(&mut self, name: &str) {
        self.parameters.reset_trigger(name);
    }

    // ========================================================================
    // Layers & state control
    // ========================================================================

    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    #[must_use]
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name() == name)
    }

    pub fn layer_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.name() == name)
    }

    /// Jumps `layer` to `state` immediately.
    pub fn play(&mut self, layer: &str, state: &str) -> Result<(), ConfigurationError> {
        self.layer_mut(layer)
            .ok_or_else(|| ConfigurationError::LayerNotFound(layer.to_string()))?
            .state_machine_mut()
            .play(state, 0.0)
    }

    /// Crossfades `layer` to `state` over `duration` seconds.
    pub fn cross_fade(&mut self, layer: &str, state: &str, duration: f32) -> Result<(), ConfigurationError> {
        self.layer_mut(layer)
            .ok_or_else(|| ConfigurationError::LayerNotFound(layer.to_string()))?
            .state_machine_mut()
            .cross_fade(state, duration)
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    #[must_use]
    pub fn settings(&self) -> &BlenderSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut BlenderSettings {
        &mut self.settings
    }

    #[must_use]
    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    /// The owner bound to `binding`, if binding succeeded.
    #[must_use]
    pub fn owner(&self, binding: &CurveBinding) -> Option<&CurveOwner> {
        self.owner_lookup
            .get(binding)
            .and_then(|&key| self.owners.get(key))
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame
    }
}

fn bind_curve(
    owners: &mut SlotMap<OwnerKey, CurveOwner>,
    owner_lookup: &mut FxHashMap<CurveBinding, OwnerKey>,
    failed: &mut FxHashMap<CurveBinding, BindingError>,
    registry: &AssemblerRegistry,
    resolver: &dyn TargetResolver,
    curve: &AnimationCurve,
) -> Result<OwnerKey, AnimationError> {
    let binding = curve.binding;
    if let Some(error) = failed.get(&binding) {
        return Err(error.clone().into());
    }

    curve.data.validate()?;

    let key = match owner_lookup.get(&binding) {
        Some(&key) => key,
        None => {
            let owner = registry
                .bind(&binding, resolver)
                .and_then(|assembler| CurveOwner::new(binding, assembler))
                .inspect_err(|error| {
                    failed.insert(binding, error.clone());
                })?;
            let key = owners.insert(owner);
            owner_lookup.insert(binding, key);
            key
        }
    };

    let owner = &owners[key];
    let expected = curve.data.domain();
    if owner.domain() != expected {
        return Err(BindingError::DomainMismatch {
            property: binding.property_str().to_string(),
            expected,
            found: owner.domain(),
        }
        .into());
    }

    if expected == ValueDomain::FloatArray {
        let track = curve.data.component_count();
        let target = owner.default_value().component_count();
        if track != target {
            return Err(SampleDomainError::TargetLengthMismatch {
                property: binding.property_str().to_string(),
                track,
                target,
            }
            .into());
        }
    }

    Ok(key)
}
