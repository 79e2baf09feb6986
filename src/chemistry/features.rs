//! Scalable physical features.
//!
//! Rate-like quantities are stored in per-second units and rescaled to the
//! current integration step before every evaluation pass. Each quantity
//! keeps two scaled values: one for the full step and one for the half
//! step, because the error estimation protocol halves the rate constant
//! rather than the resulting concentration change.
//!
//! Reference: step-doubling local error estimation, Press et al.,
//! Numerical Recipes, 3rd ed., Cambridge University Press 2007, ch. 17.2

use std::collections::HashMap;

use crate::error::SimulationError;
use crate::modules::EvaluationStep;

/// Kinds of physical features an entity can carry.
///
/// All kinds except [`FeatureKind::MichaelisConstant`] are rate-like and
/// time-scaled; the Michaelis constant is a concentration and is used
/// unscaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    /// Graph diffusivity (1/s against neighbor concentration differences)
    Diffusivity,
    /// Membrane permeability coefficient (1/s when folded with area)
    MembranePermeability,
    /// Turnover number kcat (1/s)
    CatalyticRate,
    /// Michaelis constant Km (mol/L, not time-scaled)
    MichaelisConstant,
    /// Per-channel transport rate for single-file channels (1/s per channel
    /// per mol/L of gradient)
    ChannelTransportRate,
}

/// A per-second quantity with cached full-step and half-step scalings.
///
/// The cached values are invalid until [`ScalableQuantity::rescale`] has
/// been called for the current step size; the harmonizer rescales every
/// module before each evaluation pass.
#[derive(Debug, Clone, Copy)]
pub struct ScalableQuantity {
    base_per_sec: f64,
    full: f64,
    half: f64,
}

impl ScalableQuantity {
    /// Wrap a per-second base value
    pub fn new(base_per_sec: f64) -> Self {
        Self {
            base_per_sec,
            full: 0.0,
            half: 0.0,
        }
    }

    /// Base value in per-second units
    #[inline]
    pub fn base_per_sec(&self) -> f64 {
        self.base_per_sec
    }

    /// Recompute the cached step-scaled values for a new step size
    pub fn rescale(&mut self, step_sec: f64) {
        self.full = self.base_per_sec * step_sec;
        self.half = self.base_per_sec * step_sec * 0.5;
    }

    /// Scaled value for the requested evaluation step
    #[inline]
    pub fn value(&self, step: EvaluationStep) -> f64 {
        match step {
            EvaluationStep::Full => self.full,
            EvaluationStep::Half => self.half,
        }
    }
}

/// Features attached to a chemical entity.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    values: HashMap<FeatureKind, f64>,
}

impl FeatureSet {
    /// Create an empty feature set
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a feature, chainable for setup code
    pub fn with(mut self, kind: FeatureKind, value: f64) -> Self {
        self.values.insert(kind, value);
        self
    }

    /// Read a feature if present
    pub fn get(&self, kind: FeatureKind) -> Option<f64> {
        self.values.get(&kind).copied()
    }

    /// Read a feature a module declares as mandatory.
    ///
    /// Fails with a configuration error naming the module and entity so the
    /// problem surfaces at setup time, not mid-run.
    pub fn require(
        &self,
        kind: FeatureKind,
        module: &str,
        entity: crate::chemistry::EntityId,
    ) -> Result<f64, SimulationError> {
        self.get(kind).ok_or_else(|| SimulationError::MissingFeature {
            module: module.to_string(),
            entity,
            feature: kind,
        })
    }
}
