//! Validation tests for graph diffusion.
//!
//! Covers the flux symmetry property (flux A->B equals flux B->A in
//! magnitude for equal diffusivities), mass conservation over the graph,
//! and the asymmetric membrane-crossing rules for membrane-anchored
//! entities.

use glam::DVec3;

use cytoflux::{
    AutomatonGraph, CellTopology, Diffusion, DiffusionConfig, EntityRegistry, FeatureKind,
    FeatureSet, NodeId, Simulation, SimulationSpace, SubsectionRegistry, TimeStepHarmonizer,
    UpdatableId,
};

fn two_node_simulation(
    anchored: bool,
) -> (Simulation, NodeId, NodeId) {
    let mut entities = EntityRegistry::new();
    entities.add_entity(
        "cargo",
        anchored,
        FeatureSet::new().with(FeatureKind::Diffusivity, 2.0),
    );
    let mut subsections = SubsectionRegistry::new();
    let cytosol = subsections.add("cytosol", false);

    let mut graph = AutomatonGraph::new();
    let left = graph.add_node(DVec3::ZERO);
    let right = graph.add_node(DVec3::new(1.0, 0.0, 0.0));
    graph.connect(left, right);
    let mut space = SimulationSpace::new(graph);
    for node in [left, right] {
        space.node_state_mut(node).map_topology(CellTopology::Inner, cytosol);
    }

    let simulation = Simulation::new(
        space,
        entities,
        subsections,
        TimeStepHarmonizer::new(1e-4),
    );
    (simulation, left, right)
}

#[test]
fn test_diffusion_flux_is_symmetric_between_equal_nodes() {
    let (mut simulation, left, right) = two_node_simulation(false);
    let cargo = simulation.entities.by_name("cargo").unwrap();
    let cytosol = simulation.subsections.by_name("cytosol").unwrap();

    simulation
        .space
        .node_state_mut(left)
        .concentrations
        .initialize(cytosol, cargo, 1.0)
        .unwrap();
    simulation
        .space
        .node_state_mut(right)
        .concentrations
        .initialize(cytosol, cargo, 0.4)
        .unwrap();

    let diffusion = Diffusion::new(
        "diffusion",
        DiffusionConfig { cargoes: vec![cargo] },
        &simulation.entities,
        &simulation.subsections,
    )
    .unwrap();
    simulation.add_module(Box::new(diffusion));

    simulation.next_epoch().unwrap();

    let left_change = simulation
        .space
        .state(UpdatableId::Node(left))
        .concentrations
        .get(cytosol, cargo)
        - 1.0;
    let right_change = simulation
        .space
        .state(UpdatableId::Node(right))
        .concentrations
        .get(cytosol, cargo)
        - 0.4;

    assert!(left_change < 0.0, "cargo must flow out of the richer node");
    assert!(right_change > 0.0, "cargo must flow into the poorer node");
    assert!(
        (left_change + right_change).abs() < 1e-12,
        "flux must be equal in magnitude and opposite in sign, got {} and {}",
        left_change,
        right_change
    );
}

#[test]
fn test_diffusion_conserves_mass_on_a_chain() {
    let mut entities = EntityRegistry::new();
    let cargo = entities.add_entity(
        "cargo",
        false,
        FeatureSet::new().with(FeatureKind::Diffusivity, 1.0),
    );
    let mut subsections = SubsectionRegistry::new();
    let cytosol = subsections.add("cytosol", false);

    let mut graph = AutomatonGraph::new();
    let nodes: Vec<NodeId> = (0..5)
        .map(|i| graph.add_node(DVec3::new(i as f64, 0.0, 0.0)))
        .collect();
    for pair in nodes.windows(2) {
        graph.connect(pair[0], pair[1]);
    }
    let mut space = SimulationSpace::new(graph);
    for &node in &nodes {
        space.node_state_mut(node).map_topology(CellTopology::Inner, cytosol);
    }
    space
        .node_state_mut(nodes[0])
        .concentrations
        .initialize(cytosol, cargo, 1.0)
        .unwrap();

    let mut simulation = Simulation::new(
        space,
        entities,
        subsections,
        TimeStepHarmonizer::new(1e-3),
    );
    let diffusion = Diffusion::new(
        "diffusion",
        DiffusionConfig { cargoes: vec![cargo] },
        &simulation.entities,
        &simulation.subsections,
    )
    .unwrap();
    simulation.add_module(Box::new(diffusion));

    simulation.run_for(0.5).unwrap();

    let total: f64 = nodes
        .iter()
        .map(|&node| {
            simulation
                .space
                .state(UpdatableId::Node(node))
                .concentrations
                .get(cytosol, cargo)
        })
        .sum();
    assert!(
        (total - 1.0).abs() < 1e-9,
        "diffusion must conserve total mass, got {}",
        total
    );

    // The far end of the chain must have received some cargo.
    let far = simulation
        .space
        .state(UpdatableId::Node(nodes[4]))
        .concentrations
        .get(cytosol, cargo);
    assert!(far > 0.0, "cargo must spread along the chain");
}

#[test]
fn test_unanchored_cargo_does_not_cross_subsection_boundaries() {
    // Node M carries a membrane subsection, node C only cytosol. An
    // unanchored entity placed in M's membrane has no same-subsection
    // partner anywhere and must stay put.
    let mut entities = EntityRegistry::new();
    let cargo = entities.add_entity(
        "stuck cargo",
        false,
        FeatureSet::new().with(FeatureKind::Diffusivity, 3.0),
    );
    let mut subsections = SubsectionRegistry::new();
    let cytosol = subsections.add("cytosol", false);
    let membrane = subsections.add("plasma membrane", true);

    let mut graph = AutomatonGraph::new();
    let membrane_node = graph.add_node(DVec3::ZERO);
    let cytosol_node = graph.add_node(DVec3::new(1.0, 0.0, 0.0));
    graph.connect(membrane_node, cytosol_node);

    let mut space = SimulationSpace::new(graph);
    space
        .node_state_mut(membrane_node)
        .map_topology(CellTopology::Membrane, membrane);
    space
        .node_state_mut(cytosol_node)
        .map_topology(CellTopology::Inner, cytosol);
    space
        .node_state_mut(membrane_node)
        .concentrations
        .initialize(membrane, cargo, 0.5)
        .unwrap();

    let mut simulation = Simulation::new(
        space,
        entities,
        subsections,
        TimeStepHarmonizer::new(1e-3),
    );
    let diffusion = Diffusion::new(
        "diffusion",
        DiffusionConfig { cargoes: vec![cargo] },
        &simulation.entities,
        &simulation.subsections,
    )
    .unwrap();
    simulation.add_module(Box::new(diffusion));

    simulation.run_epochs(20).unwrap();

    let stuck = simulation
        .space
        .state(UpdatableId::Node(membrane_node))
        .concentrations
        .get(membrane, cargo);
    let leaked = simulation
        .space
        .state(UpdatableId::Node(cytosol_node))
        .concentrations
        .get(cytosol, cargo);
    assert!(
        (stuck - 0.5).abs() < 1e-15,
        "unanchored membrane cargo must not move, got {}",
        stuck
    );
    assert_eq!(leaked, 0.0, "unanchored cargo must not cross into cytosol");
}

#[test]
fn test_anchored_cargo_sinks_from_membrane_into_cytosol() {
    // The same layout with an anchored entity: membrane to non-membrane is
    // an admissible one-way sink, so cargo leaks into the cytosol node.
    let mut entities = EntityRegistry::new();
    let cargo = entities.add_entity(
        "anchored cargo",
        true,
        FeatureSet::new().with(FeatureKind::Diffusivity, 3.0),
    );
    let mut subsections = SubsectionRegistry::new();
    let cytosol = subsections.add("cytosol", false);
    let membrane = subsections.add("plasma membrane", true);

    let mut graph = AutomatonGraph::new();
    let membrane_node = graph.add_node(DVec3::ZERO);
    let cytosol_node = graph.add_node(DVec3::new(1.0, 0.0, 0.0));
    graph.connect(membrane_node, cytosol_node);

    let mut space = SimulationSpace::new(graph);
    space
        .node_state_mut(membrane_node)
        .map_topology(CellTopology::Membrane, membrane);
    space
        .node_state_mut(cytosol_node)
        .map_topology(CellTopology::Inner, cytosol);
    space
        .node_state_mut(membrane_node)
        .concentrations
        .initialize(membrane, cargo, 0.5)
        .unwrap();

    let mut simulation = Simulation::new(
        space,
        entities,
        subsections,
        TimeStepHarmonizer::new(1e-4),
    );
    let diffusion = Diffusion::new(
        "diffusion",
        DiffusionConfig { cargoes: vec![cargo] },
        &simulation.entities,
        &simulation.subsections,
    )
    .unwrap();
    simulation.add_module(Box::new(diffusion));

    simulation.run_epochs(20).unwrap();

    let remaining = simulation
        .space
        .state(UpdatableId::Node(membrane_node))
        .concentrations
        .get(membrane, cargo);
    let received = simulation
        .space
        .state(UpdatableId::Node(cytosol_node))
        .concentrations
        .get(cytosol, cargo);

    assert!(remaining < 0.5, "anchored cargo must leave the membrane");
    assert!(received > 0.0, "anchored cargo must arrive in the cytosol");
    assert!(
        (remaining + received - 0.5).abs() < 1e-9,
        "crossing must conserve mass, got {}",
        remaining + received
    );
}
