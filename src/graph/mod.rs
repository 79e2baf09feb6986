//! Spatial organization of the simulation.
//!
//! The automaton graph is a finite-volume discretization of cellular space:
//! fixed nodes connected by neighbor relations, each owning a concentration
//! container. Vesicles are mobile updatables that straddle one or more
//! nodes with fractional area overlap.

pub mod automaton;
pub mod space;
pub mod vesicle;

pub use automaton::{AutomatonGraph, AutomatonNode, NodeId, UpdatableState};
pub use space::{NeighborLink, SimulationSpace, SpaceView};
pub use vesicle::{Vesicle, VesicleId};

/// Identifier of an updatable unit: a fixed graph node or a mobile vesicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UpdatableId {
    /// A fixed automaton node
    Node(NodeId),
    /// A mobile vesicle
    Vesicle(VesicleId),
}

impl UpdatableId {
    /// Placeholder identifier used by the empty local error sentinel
    pub fn none() -> Self {
        UpdatableId::Node(NodeId(u32::MAX))
    }

    /// Whether this identifies a fixed node
    pub fn is_node(&self) -> bool {
        matches!(self, UpdatableId::Node(_))
    }

    /// Whether this identifies a vesicle
    pub fn is_vesicle(&self) -> bool {
        matches!(self, UpdatableId::Vesicle(_))
    }
}
