//! Mobile vesicles.
//!
//! A vesicle is an updatable that is not pinned to the graph: it has a
//! position and radius, and it overlaps one or more automaton nodes with
//! fractional membrane-area shares. Modules that exchange material between
//! a vesicle and the surrounding compartments split their flux across the
//! associated nodes weighted by those fractions; the weighted contributions
//! must sum to the flux a fully enclosed vesicle would see.

use glam::DVec3;

use crate::graph::automaton::{AutomatonGraph, NodeId, UpdatableState};

/// Identifier of a vesicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VesicleId(pub u32);

/// A mobile membrane-bounded compartment.
#[derive(Debug, Clone)]
pub struct Vesicle {
    /// Identifier within the simulation space
    pub id: VesicleId,
    /// Center position (µm)
    pub position_um: DVec3,
    /// Radius (µm)
    pub radius_um: f64,
    /// Updatable state (lumen and membrane concentrations, deltas)
    pub state: UpdatableState,
    associations: Vec<(NodeId, f64)>,
}

impl Vesicle {
    /// Create a vesicle with no node associations yet
    pub fn new(id: VesicleId, position_um: DVec3, radius_um: f64) -> Self {
        Self {
            id,
            position_um,
            radius_um,
            state: UpdatableState::new(),
            associations: Vec::new(),
        }
    }

    /// Nodes this vesicle overlaps, with area fractions summing to one
    pub fn associated_nodes(&self) -> &[(NodeId, f64)] {
        &self.associations
    }

    /// Associate the vesicle with a node at a given area fraction
    pub fn associate(&mut self, node: NodeId, fraction: f64) {
        self.associations.push((node, fraction));
    }

    /// Replace all associations
    pub fn set_associations(&mut self, associations: Vec<(NodeId, f64)>) {
        self.associations = associations;
    }

    /// Rescale association fractions so they sum to one.
    ///
    /// No-op when the vesicle is not associated with any node.
    pub fn normalize_associations(&mut self) {
        let total: f64 = self.associations.iter().map(|(_, f)| f).sum();
        if total > 0.0 {
            for (_, fraction) in &mut self.associations {
                *fraction /= total;
            }
        }
    }

    /// Derive associations from node distances.
    ///
    /// Every node whose center lies within `node_spacing_um` of the vesicle
    /// surface receives a share that falls off linearly with distance;
    /// shares are normalized to sum to one. A coarse stand-in for exact
    /// area-overlap integration on regular lattices.
    pub fn associate_by_distance(&mut self, graph: &AutomatonGraph, node_spacing_um: f64) {
        self.associations.clear();
        if node_spacing_um <= 0.0 {
            return;
        }
        for node in graph.nodes() {
            let distance = (node.position_um - self.position_um).length();
            let surface_distance = (distance - self.radius_um).max(0.0);
            let weight = 1.0 - surface_distance / node_spacing_um;
            if weight > 0.0 {
                self.associations.push((node.id, weight));
            }
        }
        self.normalize_associations();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_associations() {
        let mut vesicle = Vesicle::new(VesicleId(0), DVec3::ZERO, 0.05);
        vesicle.associate(NodeId(0), 3.0);
        vesicle.associate(NodeId(1), 1.0);
        vesicle.normalize_associations();

        let fractions: Vec<f64> = vesicle.associated_nodes().iter().map(|(_, f)| *f).collect();
        assert!((fractions[0] - 0.75).abs() < 1e-12);
        assert!((fractions[1] - 0.25).abs() < 1e-12);
        let total: f64 = fractions.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_associate_by_distance_prefers_close_nodes() {
        let mut graph = AutomatonGraph::new();
        let near = graph.add_node(DVec3::new(0.2, 0.0, 0.0));
        let far = graph.add_node(DVec3::new(0.9, 0.0, 0.0));
        graph.add_node(DVec3::new(50.0, 0.0, 0.0));

        let mut vesicle = Vesicle::new(VesicleId(0), DVec3::ZERO, 0.05);
        vesicle.associate_by_distance(&graph, 1.0);

        let nodes: Vec<NodeId> = vesicle.associated_nodes().iter().map(|(n, _)| *n).collect();
        assert!(nodes.contains(&near));
        assert!(nodes.contains(&far));
        assert_eq!(nodes.len(), 2, "distant node must not be associated");

        let near_fraction = vesicle.associated_nodes()[0].1;
        let far_fraction = vesicle.associated_nodes()[1].1;
        assert!(near_fraction > far_fraction);
        assert!((near_fraction + far_fraction - 1.0).abs() < 1e-12);
    }
}
