//! Concentration state data structures.
//!
//! A subsection is a named compartment class shared across the automaton
//! (for example "cytosol" or "plasma membrane"); a concentration container
//! maps (subsection, entity) pairs to concentrations; deltas are proposed
//! concentration changes produced by update modules and committed by the
//! time-step harmonizer.

pub mod concentrations;
pub mod delta;
pub mod subsections;

pub use concentrations::ConcentrationContainer;
pub use delta::{Delta, DeltaId, LocalError, ModuleId};
pub use subsections::{CellSubsection, CellTopology, SubsectionId, SubsectionRegistry};
