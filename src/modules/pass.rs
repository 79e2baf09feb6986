//! The shared evaluation driver.
//!
//! One harmonizer pass of one module proceeds in fixed phases:
//!
//! 1. evaluate every applicable delta function at the full step size and
//!    merge nonzero results by delta identifier;
//! 2. project half-step concentrations (`current + 0.5 × full delta`) into
//!    deep-copied containers that never alias the authoritative state;
//! 3. re-evaluate against the projected containers at the half-scaled
//!    rates, normalize the results back to full-step magnitude (×2), and
//!    register them as potential deltas on the affected updatables;
//! 4. compare both delta sets per identifier and report the worst relative
//!    discrepancy as the module's local error.
//!
//! The iteration strategy for every scope/specificity combination lives
//! here and only here; modules never duplicate traversal logic.
//!
//! Reference: step-doubling local error estimation, Press et al.,
//! Numerical Recipes, 3rd ed., ch. 17.2

use std::collections::HashMap;

use crate::error::SimulationError;
use crate::graph::{SimulationSpace, SpaceView, UpdatableId};
use crate::modules::{
    DeltaAccumulator, DeltaContext, EvaluationStep, ModuleSpecificity, UpdateModule,
};
use crate::state::{ConcentrationContainer, Delta, DeltaId, LocalError, ModuleId};

/// Run one full evaluation pass of a single module.
///
/// When `target` is set, only that updatable is evaluated; the harmonizer
/// uses this to probe the critical updatable cheaply while shrinking the
/// step. Potential deltas are registered on every affected updatable either
/// way; the caller is responsible for clearing stale potentials before the
/// pass.
pub fn evaluate_pass(
    module: &dyn UpdateModule,
    module_id: ModuleId,
    space: &mut SimulationSpace,
    target: Option<UpdatableId>,
) -> Result<LocalError, SimulationError> {
    let ids: Vec<UpdatableId> = match target {
        Some(updatable) => vec![updatable],
        None => space.updatable_ids(),
    };

    // Phase 1: full-step deltas against the authoritative containers.
    let full = {
        let view = SpaceView::new(space);
        evaluate_phase(module, module_id, &ids, view, EvaluationStep::Full)?
    };

    // Phase 2: half-step projections. Containers are deep copies; the
    // authoritative state stays untouched so a rejected step has no trace.
    let mut half_concentrations: HashMap<UpdatableId, ConcentrationContainer> = HashMap::new();
    for (id, delta) in &full {
        let container = half_concentrations
            .entry(id.updatable)
            .or_insert_with(|| space.state(id.updatable).concentrations.clone());
        let projected =
            container.get(id.subsection, id.entity) + 0.5 * delta.quantity_mol_per_l;
        container.set_raw(id.subsection, id.entity, projected);
    }

    // Phase 3: half-step deltas, normalized back to full-step magnitude.
    let half = {
        let view = SpaceView::with_overlay(space, &half_concentrations);
        evaluate_phase(module, module_id, &ids, view, EvaluationStep::Half)?
    };

    for (id, delta) in &half {
        space.state_mut(id.updatable).add_potential_delta(*delta);
    }

    // Phase 4: worst relative discrepancy. A zero-valued delta on either
    // side means no change and therefore no error; identifiers present only
    // in the half-step set contribute nothing.
    let mut worst = LocalError::empty();
    for (id, full_delta) in &full {
        let Some(half_delta) = half.get(id) else {
            continue;
        };
        let full_quantity = full_delta.quantity_mol_per_l;
        let half_quantity = half_delta.quantity_mol_per_l;
        if full_quantity == 0.0 || half_quantity == 0.0 {
            continue;
        }
        let error = (1.0 - full_quantity / half_quantity).abs();
        if error > worst.value {
            worst = LocalError {
                updatable: id.updatable,
                entity: id.entity,
                value: error,
            };
        }
    }
    Ok(worst)
}

/// Evaluate one phase of the pass over all updatables.
fn evaluate_phase(
    module: &dyn UpdateModule,
    module_id: ModuleId,
    ids: &[UpdatableId],
    view: SpaceView,
    step: EvaluationStep,
) -> Result<HashMap<DeltaId, Delta>, SimulationError> {
    let scale = match step {
        EvaluationStep::Full => 1.0,
        EvaluationStep::Half => 2.0,
    };

    let mut accumulator = DeltaAccumulator::new(module_id);
    for &updatable in ids {
        if !module.applies_to(updatable, &view) {
            continue;
        }
        for (subsection, entity) in invocations(module, updatable, &view) {
            let ctx = DeltaContext::new(
                step,
                module_id,
                module.name(),
                updatable,
                subsection,
                entity,
                view,
            );
            if module.is_applicable(&ctx) {
                module.deltas(&ctx, &mut accumulator)?;
            }
        }
    }
    Ok(accumulator.into_deltas(scale))
}

/// Enumerate invocation units for one updatable according to the module's
/// specificity.
fn invocations(
    module: &dyn UpdateModule,
    updatable: UpdatableId,
    view: &SpaceView,
) -> Vec<(Option<crate::state::SubsectionId>, Option<crate::chemistry::EntityId>)> {
    match module.specificity() {
        ModuleSpecificity::Updatable => vec![(None, None)],
        ModuleSpecificity::Subsection => view
            .state(updatable)
            .subsections()
            .into_iter()
            .map(|subsection| (Some(subsection), None))
            .collect(),
        ModuleSpecificity::Entity => module
            .referenced_entities()
            .iter()
            .map(|&entity| (None, Some(entity)))
            .collect(),
    }
}
