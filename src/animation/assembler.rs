//! Property assemblers: the bridge between sampled values and concrete
//! target properties.
//!
//! The engine never knows the types it animates. A collaborator that wants
//! a property to be animatable registers a factory under
//! `(target kind, property name)`; at bind time the factory receives the
//! resolved component and returns a [`PropertyAssembler`] that reads and
//! writes that one property.
//!
//! ```rust,ignore
//! let mut registry = AssemblerRegistry::new();
//! registry.register_field::<SkinnedMesh, FloatArray>(
//!     "SkinnedMesh",
//!     "blendShapeWeights",
//!     |mesh| mesh.weights.clone(),
//!     |mesh, weights| mesh.weights = weights,
//! )?;
//! registry.seal();
//! ```
//!
//! # Registration phase
//!
//! Registration belongs to startup. Once [`AssemblerRegistry::seal`] is
//! called the table is read-only for the rest of the simulation.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::animation::clip::CurveBinding;
use crate::animation::values::{Animatable, AnimationValue};
use crate::errors::{BindingError, ConfigurationError};
use crate::utils::interner::{self, Symbol};

/// Type-erased component handed out by the scene.
pub type ComponentRef = Rc<dyn Any>;

/// Reads and writes one property of one concrete target.
pub trait PropertyAssembler {
    fn read(&self) -> Result<AnimationValue, BindingError>;

    fn write(&mut self, value: &AnimationValue);
}

/// Builds an assembler bound to a resolved component.
pub type AssemblerFactory =
    Arc<dyn Fn(&CurveBinding, ComponentRef) -> Result<Box<dyn PropertyAssembler>, BindingError> + Send + Sync>;

/// Locates components in the entity tree of one animated root.
///
/// Implemented by the scene collaborator; `path` is relative to the root.
pub trait TargetResolver {
    fn resolve_component(&self, path: &str, target_kind: &str) -> Option<ComponentRef>;
}

#[derive(Clone, Default)]
pub struct AssemblerRegistry {
    factories: FxHashMap<(Symbol, Symbol), AssemblerFactory>,
    sealed: bool,
}

static GLOBAL_REGISTRY: LazyLock<RwLock<AssemblerRegistry>> =
    LazyLock::new(|| RwLock::new(AssemblerRegistry::new()));

impl AssemblerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static RwLock<AssemblerRegistry> {
        &GLOBAL_REGISTRY
    }

    /// Registers `factory` for `(target_kind, property)`. Last write wins.
    pub fn register<F>(
        &mut self,
        target_kind: &str,
        property: &str,
        factory: F,
    ) -> Result<(), ConfigurationError>
    where
        F: Fn(&CurveBinding, ComponentRef) -> Result<Box<dyn PropertyAssembler>, BindingError>
            + Send
            + Sync
            + 'static,
    {
        if self.sealed {
            return Err(ConfigurationError::RegistrySealed {
                target_kind: target_kind.to_string(),
                property: property.to_string(),
            });
        }

        let key = (interner::intern(target_kind), interner::intern(property));
        if self.factories.insert(key, Arc::new(factory)).is_some() {
            log::debug!("Assembler for '{target_kind}.{property}' replaced");
        }
        Ok(())
    }

    /// Registers a [`FieldAssembler`] over a `RefCell<C>` component.
    pub fn register_field<C, T>(
        &mut self,
        target_kind: &str,
        property: &str,
        get: fn(&C) -> T,
        set: fn(&mut C, T),
    ) -> Result<(), ConfigurationError>
    where
        C: 'static,
        T: Animatable,
    {
        self.register(target_kind, property, move |binding, component| {
            let component = component.downcast::<RefCell<C>>().map_err(|_| {
                BindingError::ComponentTypeMismatch {
                    path: binding.path_str().to_string(),
                    target_kind: binding.target_kind_str().to_string(),
                }
            })?;
            Ok(Box::new(FieldAssembler {
                component,
                property: binding.property,
                get,
                set,
            }) as Box<dyn PropertyAssembler>)
        })
    }

    pub fn resolve(&self, target_kind: Symbol, property: Symbol) -> Result<AssemblerFactory, BindingError> {
        self.factories
            .get(&(target_kind, property))
            .cloned()
            .ok_or_else(|| BindingError::MissingAssembler {
                target_kind: interner::resolve(target_kind).to_string(),
                property: interner::resolve(property).to_string(),
            })
    }

    #[must_use]
    pub fn contains(&self, target_kind: &str, property: &str) -> bool {
        match (interner::get(target_kind), interner::get(property)) {
            (Some(kind), Some(prop)) => self.factories.contains_key(&(kind, prop)),
            _ => false,
        }
    }

    /// Ends the registration phase.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Resolves the component for `binding` and builds its assembler.
    pub fn bind(
        &self,
        binding: &CurveBinding,
        resolver: &dyn TargetResolver,
    ) -> Result<Box<dyn PropertyAssembler>, BindingError> {
        let factory = self.resolve(binding.target_kind, binding.property)?;
        let component = resolver
            .resolve_component(binding.path_str(), binding.target_kind_str())
            .ok_or_else(|| BindingError::MissingComponent {
                path: binding.path_str().to_string(),
                target_kind: binding.target_kind_str().to_string(),
            })?;
        factory(binding, component)
    }
}

impl std::fmt::Debug for AssemblerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssemblerRegistry")
            .field("entries", &self.factories.len())
            .field("sealed", &self.sealed)
            .finish()
    }
}

/// Drives one field of a shared `RefCell<C>` component via accessor fns.
pub struct FieldAssembler<C, T> {
    component: Rc<RefCell<C>>,
    property: Symbol,
    get: fn(&C) -> T,
    set: fn(&mut C, T),
}

impl<C: 'static, T: Animatable> PropertyAssembler for FieldAssembler<C, T> {
    fn read(&self) -> Result<AnimationValue, BindingError> {
        let component = self
            .component
            .try_borrow()
            .map_err(|e| BindingError::ReadFailed {
                property: interner::resolve(self.property).to_string(),
                reason: e.to_string(),
            })?;
        Ok((self.get)(&component).into_value())
    }

    fn write(&mut self, value: &AnimationValue) {
        let Some(value) = T::from_value(value) else {
            return;
        };
        match self.component.try_borrow_mut() {
            Ok(mut component) => (self.set)(&mut component, value),
            Err(_) => log::error!(
                "'{}' is borrowed elsewhere; animation write dropped",
                interner::resolve(self.property)
            ),
        }
    }
}
