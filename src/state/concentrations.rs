//! Concentration container.
//!
//! Maps (subsection, entity) pairs to concentrations in mol/L. Unset
//! entries read as zero so delta functions never have to distinguish
//! "absent" from "depleted". External mutation keeps values finite and
//! non-negative; update modules may propose negative deltas, clamping
//! happens once at application time.

use std::collections::{BTreeSet, HashMap};

use crate::chemistry::EntityId;
use crate::error::SimulationError;
use crate::state::subsections::SubsectionId;

/// Per-updatable concentration state.
///
/// Cloning produces a deep copy with no shared mutable state, which the
/// evaluation driver relies on for half-step bookkeeping: the authoritative
/// container and its half-step projection live side by side in one pass and
/// must never alias.
#[derive(Debug, Clone, Default)]
pub struct ConcentrationContainer {
    values: HashMap<(SubsectionId, EntityId), f64>,
}

impl ConcentrationContainer {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Concentration of an entity in a subsection (mol/L), zero if unset
    #[inline]
    pub fn get(&self, subsection: SubsectionId, entity: EntityId) -> f64 {
        self.values
            .get(&(subsection, entity))
            .copied()
            .unwrap_or(0.0)
    }

    /// Set a concentration (mol/L).
    ///
    /// Non-finite values are ignored, negative values are stored as zero.
    pub fn set(&mut self, subsection: SubsectionId, entity: EntityId, mol_per_l: f64) {
        if !mol_per_l.is_finite() {
            return;
        }
        self.values
            .insert((subsection, entity), mol_per_l.max(0.0));
    }

    /// Store a value without the non-negativity policy.
    ///
    /// Half-step projections are internal bookkeeping and must keep raw
    /// values: clamping a negative projection would zero the half-step
    /// delta and hide an oversized step from the error estimator.
    pub(crate) fn set_raw(&mut self, subsection: SubsectionId, entity: EntityId, mol_per_l: f64) {
        self.values.insert((subsection, entity), mol_per_l);
    }

    /// Initialize a concentration during setup.
    ///
    /// Refuses to overwrite an existing entry; initial conditions must be
    /// stated once, later changes go through the delta pipeline.
    pub fn initialize(
        &mut self,
        subsection: SubsectionId,
        entity: EntityId,
        mol_per_l: f64,
    ) -> Result<(), SimulationError> {
        if !mol_per_l.is_finite() || mol_per_l < 0.0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "initial concentration for entity {:?} in subsection {:?} must be finite and \
                 non-negative, got {}",
                entity, subsection, mol_per_l
            )));
        }
        if self.values.contains_key(&(subsection, entity)) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "concentration for entity {:?} in subsection {:?} is already initialized",
                entity, subsection
            )));
        }
        self.values.insert((subsection, entity), mol_per_l);
        Ok(())
    }

    /// Subsections with at least one entry, in stable order
    pub fn subsections(&self) -> BTreeSet<SubsectionId> {
        self.values.keys().map(|&(s, _)| s).collect()
    }

    /// Entities present in a subsection, in stable order
    pub fn entities_in(&self, subsection: SubsectionId) -> BTreeSet<EntityId> {
        self.values
            .keys()
            .filter(|&&(s, _)| s == subsection)
            .map(|&(_, e)| e)
            .collect()
    }

    /// Iterate over all entries
    pub fn iter(&self) -> impl Iterator<Item = (SubsectionId, EntityId, f64)> + '_ {
        self.values.iter().map(|(&(s, e), &v)| (s, e, v))
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
