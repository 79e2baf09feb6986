//! Error taxonomy for the simulation core.
//!
//! Configuration problems surface at module construction time and abort
//! setup; topology resolution failures abort the run with a diagnostic
//! naming the module, updatable and entity involved; a time step that keeps
//! shrinking without reaching tolerance is reported instead of looping
//! forever. Numerical edge cases (negative concentrations) are not errors,
//! they are absorbed at delta application time and counted.

use thiserror::Error;

use crate::chemistry::{EntityId, FeatureKind};
use crate::graph::UpdatableId;
use crate::state::CellTopology;

/// Fatal errors raised by module construction or by the integration loop.
#[derive(Debug, Clone, Error)]
pub enum SimulationError {
    /// A module declared a feature as mandatory but the entity does not
    /// carry it.
    #[error("module '{module}' requires feature {feature:?} on entity {entity:?}")]
    MissingFeature {
        module: String,
        entity: EntityId,
        feature: FeatureKind,
    },

    /// A module requested a subsection through a topology role that the
    /// target updatable does not map.
    #[error(
        "module '{module}' could not resolve topology {topology:?} on {updatable:?} \
         while processing entity {entity:?}"
    )]
    UnresolvedTopology {
        module: String,
        updatable: UpdatableId,
        topology: CellTopology,
        entity: EntityId,
    },

    /// The harmonizer shrank the step repeatedly without reaching the error
    /// tolerance.
    #[error(
        "time step did not converge after {retries} shrink retries \
         (floor {min_step_sec} s, last local error {error})"
    )]
    NonConvergentStep {
        retries: usize,
        min_step_sec: f64,
        error: f64,
    },

    /// A module or container was set up with inconsistent values.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}
