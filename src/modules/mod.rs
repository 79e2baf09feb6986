//! Update modules.
//!
//! A module encapsulates one physical law (reaction kinetics, diffusion,
//! membrane transport) behind a single delta-producing protocol so that
//! unrelated laws can share one evaluation driver. Modules are classified
//! along two independent axes:
//!
//! - **scope** — whether the computation reads neighboring updatables
//!   (diffusion does, reactions do not, vesicle coupling does for some
//!   sub-cases only);
//! - **specificity** — the granularity at which the module is invoked
//!   (once per referenced entity, once per subsection, or once per
//!   updatable).
//!
//! The driver in [`pass`] implements the iteration strategy for every
//! scope/specificity combination exactly once; modules only provide the
//! velocity law and the reactant bookkeeping. The current entity,
//! subsection and updatable are threaded through an explicit
//! [`DeltaContext`] rather than held as module state, so evaluation order
//! never becomes load-bearing.

pub mod diffusion;
pub mod pass;
pub mod reactions;
pub mod transport;

pub use diffusion::{Diffusion, DiffusionConfig};
pub use pass::evaluate_pass;
pub use reactions::{
    ComplexBuildingReaction, ComplexBuildingReactionConfig, MichaelisMentenReaction,
    MichaelisMentenReactionConfig, NthOrderReaction, NthOrderReactionConfig, Reactant,
    ReactantRole, ReversibleReaction, ReversibleReactionConfig,
};
pub use transport::{
    MembraneDiffusion, MembraneDiffusionConfig, SingleFileChannelTransport,
    SingleFileChannelTransportConfig,
};

use std::collections::HashMap;

use crate::chemistry::EntityId;
use crate::error::SimulationError;
use crate::graph::{NeighborLink, SpaceView, UpdatableId};
use crate::state::{CellTopology, Delta, DeltaId, ModuleId, SubsectionId};

/// Whether a module's computation depends on neighboring updatables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleScope {
    /// Operates purely on one updatable's own container
    Independent,
    /// Reads neighbor containers on every invocation
    NeighborDependent,
    /// Reads neighbors only for specific sub-cases (vesicle coupling)
    SemiDependent,
}

/// Granularity at which a module's delta function is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleSpecificity {
    /// Once per referenced chemical entity
    Entity,
    /// Once per subsection of the updatable
    Subsection,
    /// Once per updatable, handling all entities and subsections internally
    Updatable,
}

/// Which step scaling an evaluation runs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationStep {
    /// The full time step
    Full,
    /// The half step of the error estimation protocol
    Half,
}

/// Explicit invocation context handed to a module's delta function.
///
/// `subsection` is set for subsection-specific modules, `entity` for
/// entity-specific modules; updatable-specific modules receive neither and
/// resolve everything through their own topology roles.
pub struct DeltaContext<'a> {
    /// Step scaling of this evaluation
    pub step: EvaluationStep,
    /// Identifier the produced deltas are tagged with
    pub module: ModuleId,
    /// Name of the invoking module, for diagnostics
    pub module_name: &'a str,
    /// The updatable under evaluation
    pub updatable: UpdatableId,
    /// Current subsection for subsection-specific invocations
    pub subsection: Option<SubsectionId>,
    /// Current entity for entity-specific invocations
    pub entity: Option<EntityId>,
    view: SpaceView<'a>,
}

impl<'a> DeltaContext<'a> {
    pub(crate) fn new(
        step: EvaluationStep,
        module: ModuleId,
        module_name: &'a str,
        updatable: UpdatableId,
        subsection: Option<SubsectionId>,
        entity: Option<EntityId>,
        view: SpaceView<'a>,
    ) -> Self {
        Self {
            step,
            module,
            module_name,
            updatable,
            subsection,
            entity,
            view,
        }
    }

    /// Concentration of an entity in a subsection of the current updatable
    #[inline]
    pub fn concentration(&self, subsection: SubsectionId, entity: EntityId) -> f64 {
        self.view.concentrations(self.updatable).get(subsection, entity)
    }

    /// Concentration of an entity in a subsection of any updatable
    #[inline]
    pub fn concentration_of(
        &self,
        updatable: UpdatableId,
        subsection: SubsectionId,
        entity: EntityId,
    ) -> f64 {
        self.view.concentrations(updatable).get(subsection, entity)
    }

    /// Resolve a topology role on the current updatable
    pub fn resolved(&self, topology: CellTopology) -> Option<SubsectionId> {
        self.view.state(self.updatable).resolve(topology)
    }

    /// Resolve a topology role, failing loudly if the updatable does not
    /// map it
    pub fn require_resolved(
        &self,
        topology: CellTopology,
        entity: EntityId,
    ) -> Result<SubsectionId, SimulationError> {
        self.resolved(topology)
            .ok_or_else(|| SimulationError::UnresolvedTopology {
                module: self.module_name.to_string(),
                updatable: self.updatable,
                topology,
                entity,
            })
    }

    /// Resolve a topology role on another updatable, failing loudly
    pub fn require_resolved_on(
        &self,
        updatable: UpdatableId,
        topology: CellTopology,
        entity: EntityId,
    ) -> Result<SubsectionId, SimulationError> {
        self.view
            .state(updatable)
            .resolve(topology)
            .ok_or_else(|| SimulationError::UnresolvedTopology {
                module: self.module_name.to_string(),
                updatable,
                topology,
                entity,
            })
    }

    /// Authoritative state of the current updatable (topology, geometry,
    /// flags)
    pub fn own_state(&self) -> &crate::graph::UpdatableState {
        self.view.state(self.updatable)
    }

    /// Authoritative state of any updatable
    pub fn state_of(&self, id: UpdatableId) -> &crate::graph::UpdatableState {
        self.view.state(id)
    }

    /// Neighbor links of the current updatable
    pub fn neighbor_links(&self) -> Vec<NeighborLink> {
        self.view.neighbor_links(self.updatable)
    }
}

/// Accumulates deltas produced during one evaluation phase.
///
/// Contributions for the same [`DeltaId`] are merged by summation; zero
/// quantities are dropped when the accumulator is drained.
pub struct DeltaAccumulator {
    module: ModuleId,
    quantities: HashMap<DeltaId, f64>,
}

impl DeltaAccumulator {
    /// Create an accumulator for one module's pass
    pub fn new(module: ModuleId) -> Self {
        Self {
            module,
            quantities: HashMap::new(),
        }
    }

    /// Contribute a delta quantity for an (updatable, subsection, entity)
    /// triple
    pub fn add(
        &mut self,
        updatable: UpdatableId,
        subsection: SubsectionId,
        entity: EntityId,
        quantity_mol_per_l: f64,
    ) {
        *self
            .quantities
            .entry(DeltaId::new(updatable, subsection, entity))
            .or_insert(0.0) += quantity_mol_per_l;
    }

    /// Drain into a delta map, scaling every quantity and dropping zeros
    pub fn into_deltas(self, scale: f64) -> HashMap<DeltaId, Delta> {
        let module = self.module;
        self.quantities
            .into_iter()
            .filter(|&(_, quantity)| quantity != 0.0)
            .map(|(id, quantity)| {
                (
                    id,
                    Delta::new(module, id.subsection, id.entity, quantity * scale),
                )
            })
            .collect()
    }
}

/// One physical law participating in the update protocol.
///
/// Modules hold configuration fixed at construction (reactants, rate
/// constants, referenced entities) and cached step-scaled rates; they carry
/// no memory of simulation progress across epochs.
pub trait UpdateModule {
    /// Module name used in logs and diagnostics
    fn name(&self) -> &str;

    /// Neighbor dependence of this module
    fn scope(&self) -> ModuleScope;

    /// Invocation granularity of this module
    fn specificity(&self) -> ModuleSpecificity;

    /// Entities this module may produce deltas for; the driver never
    /// invokes the module for an entity outside this set
    fn referenced_entities(&self) -> &[EntityId];

    /// Application condition, evaluated once per updatable before any delta
    /// function runs; updatables failing it are skipped entirely
    fn applies_to(&self, updatable: UpdatableId, view: &SpaceView) -> bool {
        let _ = (updatable, view);
        true
    }

    /// Applicability predicate gating each delta-function invocation
    fn is_applicable(&self, ctx: &DeltaContext) -> bool {
        let _ = ctx;
        true
    }

    /// Recompute cached step-scaled rate constants for a new step size
    fn rescale(&mut self, step_sec: f64);

    /// Compute deltas for one invocation and feed them to the accumulator
    fn deltas(
        &self,
        ctx: &DeltaContext,
        out: &mut DeltaAccumulator,
    ) -> Result<(), SimulationError>;
}
