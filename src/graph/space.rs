//! Simulation space: the graph plus all vesicles, addressed uniformly.
//!
//! The evaluation driver works against a read-only [`SpaceView`], which can
//! carry a half-step concentration overlay: lookups for updatables touched
//! by the current pass resolve against the projected containers while
//! everything else reads the authoritative state. Authoritative containers
//! are never mutated during evaluation, which is what makes step rejection
//! free of side effects.

use std::collections::HashMap;

use crate::graph::automaton::{AutomatonGraph, NodeId, UpdatableState};
use crate::graph::vesicle::{Vesicle, VesicleId};
use crate::graph::UpdatableId;
use crate::state::ConcentrationContainer;

/// A neighbor relation with an overlap fraction.
///
/// Node-to-node links always have fraction 1.0; vesicle links carry the
/// vesicle's fractional area overlap with the node.
#[derive(Debug, Clone, Copy)]
pub struct NeighborLink {
    /// The neighboring updatable
    pub id: UpdatableId,
    /// Area fraction of the relation
    pub fraction: f64,
}

/// All updatable units of a simulation.
#[derive(Debug, Clone, Default)]
pub struct SimulationSpace {
    /// Fixed nodes and their adjacency
    pub graph: AutomatonGraph,
    vesicles: Vec<Vesicle>,
}

impl SimulationSpace {
    /// Create a space around a graph
    pub fn new(graph: AutomatonGraph) -> Self {
        Self {
            graph,
            vesicles: Vec::new(),
        }
    }

    /// Add a vesicle, returning its id
    pub fn add_vesicle(&mut self, mut vesicle: Vesicle) -> VesicleId {
        let id = VesicleId(self.vesicles.len() as u32);
        vesicle.id = id;
        self.vesicles.push(vesicle);
        id
    }

    /// Vesicle by id
    pub fn vesicle(&self, id: VesicleId) -> &Vesicle {
        &self.vesicles[id.0 as usize]
    }

    /// Mutable vesicle by id
    pub fn vesicle_mut(&mut self, id: VesicleId) -> &mut Vesicle {
        &mut self.vesicles[id.0 as usize]
    }

    /// Iterate over all vesicles
    pub fn vesicles(&self) -> impl Iterator<Item = &Vesicle> {
        self.vesicles.iter()
    }

    /// All updatable ids, nodes first, in stable order
    pub fn updatable_ids(&self) -> Vec<UpdatableId> {
        let mut ids: Vec<UpdatableId> = self.graph.node_ids().map(UpdatableId::Node).collect();
        ids.extend(self.vesicles.iter().map(|v| UpdatableId::Vesicle(v.id)));
        ids
    }

    /// Updatable state by id
    pub fn state(&self, id: UpdatableId) -> &UpdatableState {
        match id {
            UpdatableId::Node(node) => &self.graph.node(node).state,
            UpdatableId::Vesicle(vesicle) => &self.vesicles[vesicle.0 as usize].state,
        }
    }

    /// Mutable updatable state by id
    pub fn state_mut(&mut self, id: UpdatableId) -> &mut UpdatableState {
        match id {
            UpdatableId::Node(node) => &mut self.graph.node_mut(node).state,
            UpdatableId::Vesicle(vesicle) => &mut self.vesicles[vesicle.0 as usize].state,
        }
    }

    /// Neighbor links of an updatable: graph adjacency for nodes,
    /// fractional node associations for vesicles
    pub fn neighbor_links(&self, id: UpdatableId) -> Vec<NeighborLink> {
        match id {
            UpdatableId::Node(node) => self
                .graph
                .neighbors(node)
                .iter()
                .map(|&n| NeighborLink {
                    id: UpdatableId::Node(n),
                    fraction: 1.0,
                })
                .collect(),
            UpdatableId::Vesicle(vesicle) => self.vesicles[vesicle.0 as usize]
                .associated_nodes()
                .iter()
                .map(|&(n, fraction)| NeighborLink {
                    id: UpdatableId::Node(n),
                    fraction,
                })
                .collect(),
        }
    }

    /// Discard provisional deltas on every updatable
    pub fn clear_all_potential_deltas(&mut self) {
        for node in self.graph.node_ids().collect::<Vec<_>>() {
            self.graph.node_mut(node).state.clear_potential_deltas();
        }
        for vesicle in &mut self.vesicles {
            vesicle.state.clear_potential_deltas();
        }
    }

    /// Commit provisional deltas on every updatable
    pub fn shift_all_deltas(&mut self) {
        for node in self.graph.node_ids().collect::<Vec<_>>() {
            self.graph.node_mut(node).state.shift_deltas();
        }
        for vesicle in &mut self.vesicles {
            vesicle.state.shift_deltas();
        }
    }

    /// Apply committed deltas on every updatable, returning the total
    /// number of clamped (subsection, entity) pairs
    pub fn apply_all_final_deltas(&mut self) -> u64 {
        let mut clamped = 0;
        for node in self.graph.node_ids().collect::<Vec<_>>() {
            clamped += self.graph.node_mut(node).state.apply_final_deltas();
        }
        for vesicle in &mut self.vesicles {
            clamped += vesicle.state.apply_final_deltas();
        }
        clamped
    }

    /// Connect a node's state in one call during setup
    pub fn node_state_mut(&mut self, node: NodeId) -> &mut UpdatableState {
        &mut self.graph.node_mut(node).state
    }
}

/// Read-only view of the space, optionally overlaid with half-step
/// concentration projections.
#[derive(Clone, Copy)]
pub struct SpaceView<'a> {
    space: &'a SimulationSpace,
    overlay: Option<&'a HashMap<UpdatableId, ConcentrationContainer>>,
}

impl<'a> SpaceView<'a> {
    /// View of the authoritative state
    pub fn new(space: &'a SimulationSpace) -> Self {
        Self {
            space,
            overlay: None,
        }
    }

    /// View with half-step projections taking precedence
    pub fn with_overlay(
        space: &'a SimulationSpace,
        overlay: &'a HashMap<UpdatableId, ConcentrationContainer>,
    ) -> Self {
        Self {
            space,
            overlay: Some(overlay),
        }
    }

    /// Concentrations of an updatable, preferring the overlay
    pub fn concentrations(&self, id: UpdatableId) -> &'a ConcentrationContainer {
        if let Some(overlay) = self.overlay {
            if let Some(container) = overlay.get(&id) {
                return container;
            }
        }
        &self.space.state(id).concentrations
    }

    /// Authoritative updatable state (topology, flags, geometry).
    ///
    /// Concentration reads should go through
    /// [`SpaceView::concentrations`] so the overlay applies.
    pub fn state(&self, id: UpdatableId) -> &'a UpdatableState {
        self.space.state(id)
    }

    /// Neighbor links of an updatable
    pub fn neighbor_links(&self, id: UpdatableId) -> Vec<NeighborLink> {
        self.space.neighbor_links(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chemistry::EntityId;
    use crate::state::SubsectionId;
    use glam::DVec3;

    #[test]
    fn test_overlay_takes_precedence_for_projected_updatables() {
        let mut graph = AutomatonGraph::new();
        let a = graph.add_node(DVec3::ZERO);
        let b = graph.add_node(DVec3::new(1.0, 0.0, 0.0));
        let mut space = SimulationSpace::new(graph);

        let (s, e) = (SubsectionId(0), EntityId(0));
        space.node_state_mut(a).concentrations.set(s, e, 1.0);
        space.node_state_mut(b).concentrations.set(s, e, 2.0);

        let mut overlay = HashMap::new();
        let mut projected = space.state(UpdatableId::Node(a)).concentrations.clone();
        projected.set(s, e, 1.5);
        overlay.insert(UpdatableId::Node(a), projected);

        let view = SpaceView::with_overlay(&space, &overlay);
        assert!((view.concentrations(UpdatableId::Node(a)).get(s, e) - 1.5).abs() < 1e-12);
        assert!((view.concentrations(UpdatableId::Node(b)).get(s, e) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_updatable_ids_cover_nodes_and_vesicles() {
        let mut graph = AutomatonGraph::new();
        graph.add_node(DVec3::ZERO);
        let mut space = SimulationSpace::new(graph);
        space.add_vesicle(Vesicle::new(VesicleId(0), DVec3::ZERO, 0.05));

        let ids = space.updatable_ids();
        assert_eq!(ids.len(), 2);
        assert!(ids[0].is_node());
        assert!(ids[1].is_vesicle());
    }
}
