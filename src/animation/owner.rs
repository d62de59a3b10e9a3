//! Curve owners: one per animated `(target, component, property)`.
//!
//! Every track on every layer that references the same property shares a
//! single owner, so the baseline is captured once and the target is
//! written at most once per frame.

use slotmap::new_key_type;

use crate::animation::assembler::PropertyAssembler;
use crate::animation::clip::CurveBinding;
use crate::animation::layer::BlendingMode;
use crate::animation::values::{AnimationValue, ValueDomain};
use crate::errors::BindingError;

new_key_type! {
    pub struct OwnerKey;
}

pub struct CurveOwner {
    binding: CurveBinding,
    assembler: Box<dyn PropertyAssembler>,
    default_value: AnimationValue,
    // `None` until the first contribution of the frame.
    current: Option<AnimationValue>,
    contributed: bool,
    frame: u64,
}

impl CurveOwner {
    /// Binds an owner and captures its baseline through the assembler.
    pub fn new(
        binding: CurveBinding,
        assembler: Box<dyn PropertyAssembler>,
    ) -> Result<Self, BindingError> {
        let default_value = assembler.read()?;
        Ok(Self {
            binding,
            assembler,
            default_value,
            current: None,
            contributed: false,
            frame: 0,
        })
    }

    /// Re-snapshots the baseline from the target.
    pub fn capture_default(&mut self) -> Result<(), BindingError> {
        self.default_value = self.assembler.read()?;
        Ok(())
    }

    #[must_use]
    pub fn binding(&self) -> &CurveBinding {
        &self.binding
    }

    #[must_use]
    pub fn domain(&self) -> ValueDomain {
        self.default_value.domain()
    }

    #[must_use]
    pub fn default_value(&self) -> &AnimationValue {
        &self.default_value
    }

    /// Blended value so far this frame, if anything contributed.
    #[must_use]
    pub fn current(&self) -> Option<&AnimationValue> {
        self.current.as_ref()
    }

    /// Clears the accumulator. Additive reads an unset accumulator as the
    /// baseline, override lerps from the baseline, so one sentinel serves
    /// both modes.
    pub fn reset_frame(&mut self) {
        self.current = None;
        self.contributed = false;
    }

    /// Resets on the first touch of `frame`; returns true if that happened.
    pub(crate) fn begin_frame(&mut self, frame: u64) -> bool {
        if self.frame == frame {
            return false;
        }
        self.frame = frame;
        self.reset_frame();
        true
    }

    /// Folds one layer's contribution into the accumulator.
    pub fn accumulate(&mut self, value: &AnimationValue, weight: f32, mode: BlendingMode) {
        if weight <= 0.0 {
            return;
        }
        let current = self
            .current
            .get_or_insert_with(|| self.default_value.clone());

        match mode {
            BlendingMode::Override => current.blend_toward(value, weight),
            BlendingMode::Additive => current.add_weighted_delta(value, &self.default_value, weight),
        }
        self.contributed = true;
    }

    /// Writes the blended value if anything contributed. Returns whether a
    /// write happened.
    pub fn commit(&mut self) -> bool {
        if !self.contributed {
            return false;
        }
        match &self.current {
            Some(value) => {
                self.assembler.write(value);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for CurveOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurveOwner")
            .field("binding", &self.binding)
            .field("default_value", &self.default_value)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}
