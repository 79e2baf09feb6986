//! Validation tests for reaction kinetics.
//!
//! Closed-form targets:
//! | Scenario | Target | Source |
//! |----------|--------|--------|
//! | A <=> B, kf=5/s, kb=10/s | A=0.6667, B=0.3333 mol/L | kf·A = kb·B steady state |
//! | 2A -> 4B + 2C, k=0.07/s | dB = 2·dC, dA = -0.5·dB | stoichiometry |
//! | Complex equilibrium | [C]/([binder][bindee]) = kon/koff | mass action |

use glam::DVec3;

use cytoflux::{
    AutomatonGraph, CellTopology, ComplexBuildingReaction, ComplexBuildingReactionConfig,
    EntityRegistry, NodeId, NthOrderReaction, NthOrderReactionConfig, Reactant,
    ReversibleReaction, ReversibleReactionConfig, Simulation, SimulationSpace, SubsectionRegistry,
    TimeStepHarmonizer, UpdatableId,
};

// ============================================================================
// Reversible reaction equilibrium
// ============================================================================

#[test]
fn test_two_node_reversible_reaction_reaches_equilibrium() {
    let mut entities = EntityRegistry::new();
    let a = entities.add("a");
    let b = entities.add("b");
    let mut subsections = SubsectionRegistry::new();
    let cytosol = subsections.add("cytosol", false);

    let mut graph = AutomatonGraph::new();
    let left = graph.add_node(DVec3::ZERO);
    let right = graph.add_node(DVec3::new(1.0, 0.0, 0.0));
    graph.connect(left, right);

    let mut space = SimulationSpace::new(graph);
    for node in [left, right] {
        space.node_state_mut(node).map_topology(CellTopology::Inner, cytosol);
        space
            .node_state_mut(node)
            .concentrations
            .initialize(cytosol, a, 1.0)
            .unwrap();
    }

    let mut simulation = Simulation::new(
        space,
        entities,
        subsections,
        TimeStepHarmonizer::new(1e-3),
    );
    simulation.add_module(Box::new(
        ReversibleReaction::new(
            "a to b",
            ReversibleReactionConfig {
                reactants: vec![Reactant::substrate(a), Reactant::product(b)],
                k_forward_per_sec: 5.0,
                k_backward_per_sec: 10.0,
            },
        )
        .unwrap(),
    ));

    // Relaxation time is 1/(kf+kb) ~ 67 ms; two seconds is far past it.
    simulation.run_for(2.0).unwrap();

    for node in [left, right] {
        let state = simulation.space.state(UpdatableId::Node(node));
        let final_a = state.concentrations.get(cytosol, a);
        let final_b = state.concentrations.get(cytosol, b);

        assert!(
            (final_a - 2.0 / 3.0).abs() < 1e-3,
            "equilibrium A should be 0.6667 mol/L, got {} on {:?}",
            final_a,
            node
        );
        assert!(
            (final_b - 1.0 / 3.0).abs() < 1e-3,
            "equilibrium B should be 0.3333 mol/L, got {} on {:?}",
            final_b,
            node
        );
        assert!(
            (final_a + final_b - 1.0).abs() < 1e-9,
            "mass must be conserved, got total {}",
            final_a + final_b
        );
    }
}

#[test]
fn test_reversible_reaction_deltas_are_antisymmetric() {
    // For A <=> B every evaluation must produce delta(A) = -delta(B).
    let mut entities = EntityRegistry::new();
    let a = entities.add("a");
    let b = entities.add("b");
    let mut subsections = SubsectionRegistry::new();
    let cytosol = subsections.add("cytosol", false);

    let mut graph = AutomatonGraph::new();
    let node = graph.add_node(DVec3::ZERO);
    let mut space = SimulationSpace::new(graph);
    space.node_state_mut(node).map_topology(CellTopology::Inner, cytosol);
    space
        .node_state_mut(node)
        .concentrations
        .initialize(cytosol, a, 0.8)
        .unwrap();
    space
        .node_state_mut(node)
        .concentrations
        .initialize(cytosol, b, 0.1)
        .unwrap();

    let mut simulation = Simulation::new(
        space,
        entities,
        subsections,
        TimeStepHarmonizer::new(1e-4),
    );
    simulation.add_module(Box::new(
        ReversibleReaction::new(
            "a to b",
            ReversibleReactionConfig {
                reactants: vec![Reactant::substrate(a), Reactant::product(b)],
                k_forward_per_sec: 5.0,
                k_backward_per_sec: 10.0,
            },
        )
        .unwrap(),
    ));

    simulation.next_epoch().unwrap();

    let state = simulation.space.state(UpdatableId::Node(node));
    let change_a = state.concentrations.get(cytosol, a) - 0.8;
    let change_b = state.concentrations.get(cytosol, b) - 0.1;
    assert!(
        (change_a + change_b).abs() < 1e-12,
        "delta(A) must equal -delta(B), got {} and {}",
        change_a,
        change_b
    );
    assert!(change_a < 0.0, "net forward reaction must consume A");
}

// ============================================================================
// Nth-order decomposition stoichiometry
// ============================================================================

/// Elementary decomposition 2A -> 4B + 2C with k = 0.07/s.
///
/// At every sampled epoch the accumulated changes must satisfy
/// dB = 2·dC and dA = -0.5·dB.
#[test]
fn test_decomposition_stoichiometric_ratios() {
    let mut entities = EntityRegistry::new();
    let a = entities.add("a");
    let b = entities.add("b");
    let c = entities.add("c");
    let mut subsections = SubsectionRegistry::new();
    let cytosol = subsections.add("cytosol", false);

    let mut graph = AutomatonGraph::new();
    let node = graph.add_node(DVec3::ZERO);
    let mut space = SimulationSpace::new(graph);
    space.node_state_mut(node).map_topology(CellTopology::Inner, cytosol);
    let initial_a = 0.02;
    space
        .node_state_mut(node)
        .concentrations
        .initialize(cytosol, a, initial_a)
        .unwrap();

    let mut simulation = Simulation::new(
        space,
        entities,
        subsections,
        TimeStepHarmonizer::new(1e-3),
    );
    simulation.add_module(Box::new(
        NthOrderReaction::new(
            "decomposition",
            NthOrderReactionConfig {
                reactants: vec![
                    Reactant::substrate(a).stoichiometry(2.0),
                    Reactant::product(b).stoichiometry(4.0),
                    Reactant::product(c).stoichiometry(2.0),
                ],
                rate_per_sec: 0.07,
                elementary: true,
            },
        )
        .unwrap(),
    ));

    for _ in 0..200 {
        simulation.next_epoch().unwrap();

        let state = simulation.space.state(UpdatableId::Node(node));
        let change_a = state.concentrations.get(cytosol, a) - initial_a;
        let change_b = state.concentrations.get(cytosol, b);
        let change_c = state.concentrations.get(cytosol, c);

        if change_b == 0.0 {
            continue;
        }
        assert!(
            (change_b - 2.0 * change_c).abs() < 1e-12 * change_b.abs().max(1.0),
            "dB = 2*dC must hold at every epoch, got dB={} dC={}",
            change_b,
            change_c
        );
        assert!(
            (change_a + 0.5 * change_b).abs() < 1e-12 * change_b.abs().max(1.0),
            "dA = -0.5*dB must hold at every epoch, got dA={} dB={}",
            change_a,
            change_b
        );
    }

    let state = simulation.space.state(UpdatableId::Node(node));
    assert!(
        state.concentrations.get(cytosol, b) > 0.0,
        "decomposition must have produced B"
    );
}

#[test]
fn test_zero_order_reaction_produces_at_constant_rate() {
    let mut entities = EntityRegistry::new();
    let product = entities.add("product");
    let mut subsections = SubsectionRegistry::new();
    let cytosol = subsections.add("cytosol", false);

    let mut graph = AutomatonGraph::new();
    let node = graph.add_node(DVec3::ZERO);
    let mut space = SimulationSpace::new(graph);
    space.node_state_mut(node).map_topology(CellTopology::Inner, cytosol);

    let mut simulation = Simulation::new(
        space,
        entities,
        subsections,
        TimeStepHarmonizer::new(1e-3),
    );
    simulation.add_module(Box::new(
        NthOrderReaction::new(
            "source",
            NthOrderReactionConfig {
                reactants: vec![Reactant::product(product)],
                rate_per_sec: 0.5,
                elementary: false,
            },
        )
        .unwrap(),
    ));

    simulation.run_for(1.0).unwrap();

    let state = simulation.space.state(UpdatableId::Node(node));
    let produced = state.concentrations.get(cytosol, product);
    let expected = 0.5 * simulation.elapsed_sec;
    assert!(
        (produced - expected).abs() < 1e-9,
        "zero-order production should be rate times elapsed time, got {} expected {}",
        produced,
        expected
    );
}

// ============================================================================
// Michaelis-Menten kinetics
// ============================================================================

#[test]
fn test_michaelis_menten_converts_substrate_without_consuming_enzyme() {
    use cytoflux::{
        FeatureKind, FeatureSet, MichaelisMentenReaction, MichaelisMentenReactionConfig,
    };

    let mut entities = EntityRegistry::new();
    let enzyme = entities.add_entity(
        "hexokinase",
        false,
        FeatureSet::new()
            .with(FeatureKind::CatalyticRate, 10.0)
            .with(FeatureKind::MichaelisConstant, 1e-4),
    );
    let substrate = entities.add("glucose");
    let product = entities.add("glucose-6-phosphate");
    let mut subsections = SubsectionRegistry::new();
    let cytosol = subsections.add("cytosol", false);

    let mut graph = AutomatonGraph::new();
    let node = graph.add_node(DVec3::ZERO);
    let mut space = SimulationSpace::new(graph);
    let state = space.node_state_mut(node);
    state.map_topology(CellTopology::Inner, cytosol);
    state.concentrations.initialize(cytosol, enzyme, 1e-6).unwrap();
    state.concentrations.initialize(cytosol, substrate, 5e-4).unwrap();

    let mut simulation = Simulation::new(
        space,
        entities,
        subsections,
        TimeStepHarmonizer::new(1e-3),
    );
    let module = MichaelisMentenReaction::new(
        "phosphorylation",
        MichaelisMentenReactionConfig {
            enzyme,
            substrate,
            products: vec![Reactant::product(product)],
        },
        simulation.entities.get(enzyme),
    )
    .unwrap();
    simulation.add_module(Box::new(module));

    simulation.run_for(5.0).unwrap();

    let state = simulation.space.state(UpdatableId::Node(node));
    let remaining = state.concentrations.get(cytosol, substrate);
    let produced = state.concentrations.get(cytosol, product);

    assert!(produced > 0.0, "the enzyme must have produced product");
    assert!(remaining < 5e-4, "the substrate must have been consumed");
    assert!(
        (remaining + produced - 5e-4).abs() < 1e-12,
        "substrate and product must balance, got {}",
        remaining + produced
    );
    assert!(
        (state.concentrations.get(cytosol, enzyme) - 1e-6).abs() < 1e-18,
        "the enzyme must not be consumed"
    );
}

// ============================================================================
// Complex building
// ============================================================================

fn complex_scenario() -> (Simulation, NodeId) {
    let mut entities = EntityRegistry::new();
    let receptor = entities.add("receptor");
    let ligand = entities.add("ligand");
    let complex = entities.add("receptor-ligand complex");
    let mut subsections = SubsectionRegistry::new();
    let cytosol = subsections.add("cytosol", false);
    let membrane = subsections.add("plasma membrane", true);

    let mut graph = AutomatonGraph::new();
    let node = graph.add_node(DVec3::ZERO);
    let mut space = SimulationSpace::new(graph);
    let state = space.node_state_mut(node);
    state.map_topology(CellTopology::Inner, cytosol);
    state.map_topology(CellTopology::Membrane, membrane);
    state.concentrations.initialize(membrane, receptor, 1e-3).unwrap();
    state.concentrations.initialize(cytosol, ligand, 1e-3).unwrap();

    let mut simulation = Simulation::new(
        space,
        entities,
        subsections,
        TimeStepHarmonizer::new(1e-3),
    );
    simulation.add_module(Box::new(
        ComplexBuildingReaction::new(
            "receptor binding",
            ComplexBuildingReactionConfig {
                binder: receptor,
                binder_topology: CellTopology::Membrane,
                bindee: ligand,
                bindee_topology: CellTopology::Inner,
                complex,
                k_on_per_molar_sec: 1e4,
                k_off_per_sec: 2.0,
            },
        )
        .unwrap(),
    ));
    (simulation, node)
}

#[test]
fn test_complex_building_approaches_binding_equilibrium() {
    let (mut simulation, node) = complex_scenario();
    simulation.run_for(5.0).unwrap();

    let receptor = simulation.entities.by_name("receptor").unwrap();
    let ligand = simulation.entities.by_name("ligand").unwrap();
    let complex = simulation.entities.by_name("receptor-ligand complex").unwrap();
    let cytosol = simulation.subsections.by_name("cytosol").unwrap();
    let membrane = simulation.subsections.by_name("plasma membrane").unwrap();

    let state = simulation.space.state(UpdatableId::Node(node));
    let free_receptor = state.concentrations.get(membrane, receptor);
    let free_ligand = state.concentrations.get(cytosol, ligand);
    let bound = state.concentrations.get(membrane, complex);

    // At equilibrium kon·[R]·[L] = koff·[RL].
    let association = 1e4 * free_receptor * free_ligand;
    let dissociation = 2.0 * bound;
    assert!(
        (association - dissociation).abs() < 1e-2 * dissociation.max(1e-12),
        "binding equilibrium violated: kon·R·L={} koff·RL={}",
        association,
        dissociation
    );

    // The complex holds one receptor and one ligand.
    assert!(
        (free_receptor + bound - 1e-3).abs() < 1e-12,
        "receptor mass must be conserved"
    );
    assert!(
        (free_ligand + bound - 1e-3).abs() < 1e-12,
        "ligand mass must be conserved"
    );
}

#[test]
fn test_complex_building_is_inert_without_binder_and_complex() {
    let (mut simulation, node) = complex_scenario();

    // Remove the receptor; only the ligand remains.
    let receptor = simulation.entities.by_name("receptor").unwrap();
    let ligand = simulation.entities.by_name("ligand").unwrap();
    let complex = simulation.entities.by_name("receptor-ligand complex").unwrap();
    let cytosol = simulation.subsections.by_name("cytosol").unwrap();
    let membrane = simulation.subsections.by_name("plasma membrane").unwrap();
    simulation
        .space
        .state_mut(UpdatableId::Node(node))
        .concentrations
        .set(membrane, receptor, 0.0);

    simulation.run_epochs(50).unwrap();

    let state = simulation.space.state(UpdatableId::Node(node));
    assert_eq!(
        state.concentrations.get(membrane, complex),
        0.0,
        "no complex may form without binder"
    );
    assert!(
        (state.concentrations.get(cytosol, ligand) - 1e-3).abs() < 1e-15,
        "ligand must stay untouched when binder and complex are absent"
    );
}
