//! Automaton nodes and the simulation graph.

use std::collections::{BTreeSet, HashMap};

use glam::DVec3;

use crate::chemistry::EntityId;
use crate::state::{CellTopology, ConcentrationContainer, Delta, SubsectionId};

/// Identifier of a fixed node in the automaton graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// State shared by every updatable unit (node or vesicle).
///
/// Owns the concentration container, the topology map resolving logical
/// roles to concrete subsections, and the two delta lists of the update
/// protocol: potential deltas are provisional results of the current
/// evaluation pass and are discarded whenever a step is rejected; final
/// deltas are committed by the harmonizer and cleared as soon as they have
/// been applied.
#[derive(Debug, Clone, Default)]
pub struct UpdatableState {
    /// Authoritative concentrations of this updatable
    pub concentrations: ConcentrationContainer,
    /// Ignore all final deltas; used for externally clamped boundary nodes
    pub concentration_fixed: bool,
    /// Whether per-epoch observation events include this updatable
    pub observed: bool,
    /// Membrane surface area (µm²), consumed by permeability-driven flux
    pub membrane_area_um2: f64,
    /// Compartment volume (L), consumed by count-based transport
    pub volume_l: f64,
    topology_map: HashMap<CellTopology, SubsectionId>,
    potential_deltas: Vec<Delta>,
    final_deltas: Vec<Delta>,
}

impl UpdatableState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a topology role to a concrete subsection.
    ///
    /// Each role resolves to at most one subsection; remapping replaces the
    /// previous resolution.
    pub fn map_topology(&mut self, topology: CellTopology, subsection: SubsectionId) {
        self.topology_map.insert(topology, subsection);
    }

    /// Resolve a topology role for this updatable
    pub fn resolve(&self, topology: CellTopology) -> Option<SubsectionId> {
        self.topology_map.get(&topology).copied()
    }

    /// All subsections this updatable carries: every mapped topology target
    /// plus every subsection holding a concentration, in stable order
    pub fn subsections(&self) -> BTreeSet<SubsectionId> {
        let mut set = self.concentrations.subsections();
        set.extend(self.topology_map.values().copied());
        set
    }

    /// Register a provisional delta for the current evaluation pass
    pub fn add_potential_delta(&mut self, delta: Delta) {
        self.potential_deltas.push(delta);
    }

    /// Discard all provisional deltas (step rejected or pass restarted)
    pub fn clear_potential_deltas(&mut self) {
        self.potential_deltas.clear();
    }

    /// Provisional deltas of the current pass
    pub fn potential_deltas(&self) -> &[Delta] {
        &self.potential_deltas
    }

    /// Committed deltas awaiting application
    pub fn final_deltas(&self) -> &[Delta] {
        &self.final_deltas
    }

    /// Commit provisional deltas: move them into the final list
    pub fn shift_deltas(&mut self) {
        self.final_deltas.append(&mut self.potential_deltas);
    }

    /// Apply and clear all final deltas.
    ///
    /// Deltas targeting the same (subsection, entity) pair are summed
    /// before application so the clamp sees the net change, not an
    /// order-dependent intermediate. A result below zero is clamped to
    /// zero; the number of clamped pairs is returned for diagnostics.
    /// Updatables with a fixed concentration discard their deltas
    /// unapplied.
    pub fn apply_final_deltas(&mut self) -> u64 {
        if self.concentration_fixed {
            self.final_deltas.clear();
            return 0;
        }

        let mut net: HashMap<(SubsectionId, EntityId), f64> = HashMap::new();
        for delta in self.final_deltas.drain(..) {
            *net.entry((delta.subsection, delta.entity)).or_insert(0.0) +=
                delta.quantity_mol_per_l;
        }

        let mut clamped = 0;
        for ((subsection, entity), quantity) in net {
            let next = self.concentrations.get(subsection, entity) + quantity;
            if next < 0.0 {
                clamped += 1;
            }
            self.concentrations.set(subsection, entity, next.max(0.0));
        }
        clamped
    }
}

/// A fixed spatial unit of the automaton.
#[derive(Debug, Clone)]
pub struct AutomatonNode {
    /// Graph identifier
    pub id: NodeId,
    /// Position of the node center (µm)
    pub position_um: DVec3,
    /// Updatable state (concentrations, deltas, topology)
    pub state: UpdatableState,
    neighbors: Vec<NodeId>,
}

impl AutomatonNode {
    /// Neighboring node ids
    pub fn neighbors(&self) -> &[NodeId] {
        &self.neighbors
    }
}

/// The discretized simulation graph.
#[derive(Debug, Clone, Default)]
pub struct AutomatonGraph {
    nodes: Vec<AutomatonNode>,
}

impl AutomatonGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node at a position, returning its id
    pub fn add_node(&mut self, position_um: DVec3) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(AutomatonNode {
            id,
            position_um,
            state: UpdatableState::new(),
            neighbors: Vec::new(),
        });
        id
    }

    /// Connect two nodes bidirectionally
    pub fn connect(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        if !self.nodes[a.0 as usize].neighbors.contains(&b) {
            self.nodes[a.0 as usize].neighbors.push(b);
        }
        if !self.nodes[b.0 as usize].neighbors.contains(&a) {
            self.nodes[b.0 as usize].neighbors.push(a);
        }
    }

    /// Node by id
    pub fn node(&self, id: NodeId) -> &AutomatonNode {
        &self.nodes[id.0 as usize]
    }

    /// Mutable node by id
    pub fn node_mut(&mut self, id: NodeId) -> &mut AutomatonNode {
        &mut self.nodes[id.0 as usize]
    }

    /// Neighbors of a node
    pub fn neighbors(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0 as usize].neighbors
    }

    /// All node ids in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|n| n.id)
    }

    /// Iterate over all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &AutomatonNode> {
        self.nodes.iter()
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
