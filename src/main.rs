//! Cytoflux - Entry point
//!
//! Headless diagnostics driver for the chemical-kinetics engine.
//!
//! CLI Usage:
//!   cargo run                        # Run the two-node demo scenario
//!   cargo run -- -n 5000             # Custom epoch count
//!   cargo run -- --csv               # Also export a CSV time series

use anyhow::Result;
use glam::DVec3;

use cytoflux::{
    export::{export_snapshot_json, CsvTimeSeriesObserver, TrackedConcentration},
    AutomatonGraph, CellTopology, Diffusion, DiffusionConfig, EntityId, EntityRegistry,
    FeatureKind, FeatureSet, NodeId, Reactant, ReversibleReaction, ReversibleReactionConfig,
    Simulation, SimulationParameters, SimulationSpace, SubsectionId, SubsectionRegistry,
    UpdatableId,
};

/// Identifiers of the demo scenario's moving parts.
struct DemoIds {
    cytosol: SubsectionId,
    species_a: EntityId,
    species_b: EntityId,
    left: NodeId,
}

/// Build the demo scenario: two connected cytosol nodes, a reversible
/// conversion between two species, and diffusion spreading both species
/// across the graph.
fn build_demo(params: &SimulationParameters) -> Result<(Simulation, DemoIds)> {
    let mut entities = EntityRegistry::new();
    let species_a = entities.add_entity(
        "species a",
        false,
        FeatureSet::new().with(FeatureKind::Diffusivity, 5.0),
    );
    let species_b = entities.add_entity(
        "species b",
        false,
        FeatureSet::new().with(FeatureKind::Diffusivity, 5.0),
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
        space.node_state_mut(node).observed = true;
    }
    space
        .node_state_mut(left)
        .concentrations
        .initialize(cytosol, species_a, 1.0)?;

    let conversion = ReversibleReaction::new(
        "a to b conversion",
        ReversibleReactionConfig {
            reactants: vec![Reactant::substrate(species_a), Reactant::product(species_b)],
            k_forward_per_sec: 5.0,
            k_backward_per_sec: 10.0,
        },
    )?;
    let diffusion = Diffusion::new(
        "cytosol diffusion",
        DiffusionConfig {
            cargoes: vec![species_a, species_b],
        },
        &entities,
        &subsections,
    )?;

    let mut simulation = Simulation::new(space, entities, subsections, params.harmonizer());
    simulation.add_module(Box::new(conversion));
    simulation.add_module(Box::new(diffusion));

    Ok((
        simulation,
        DemoIds {
            cytosol,
            species_a,
            species_b,
            left,
        },
    ))
}

fn print_summary(simulation: &Simulation, ids: &DemoIds) {
    println!("=== Cytoflux Diagnostics ===");
    println!();
    println!(
        "Epochs: {}   Elapsed: {:.6} s   Step: {:.3e} s",
        simulation.epoch, simulation.elapsed_sec, simulation.harmonizer.step_sec
    );
    println!("Clamp events: {}", simulation.clamp_events);
    println!();
    println!("Concentrations (mol/L):");
    for id in simulation.space.updatable_ids() {
        println!("  {:?}", id);
        let state = simulation.space.state(id);
        for entity in simulation.entities.iter() {
            let value = state.concentrations.get(ids.cytosol, entity.id);
            println!("    {:<12} {:.6}", entity.name, value);
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    // Parse simple CLI arguments
    let args: Vec<String> = std::env::args().collect();
    let mut epochs: u64 = 2000;
    let mut export_csv = false;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-n" | "--epochs" => {
                if i + 1 < args.len() {
                    epochs = args[i + 1].parse().unwrap_or(epochs);
                    i += 1;
                }
            }
            "--csv" => export_csv = true,
            _ => {}
        }
        i += 1;
    }

    log::info!("Cytoflux starting, {} epochs requested", epochs);

    let params = SimulationParameters::load_or_default("data/parameters/simulation.json");
    let (mut simulation, ids) = build_demo(&params)?;

    if export_csv {
        let tracked = vec![
            TrackedConcentration {
                label: "a_left_mol_per_l".to_string(),
                updatable: UpdatableId::Node(ids.left),
                subsection: ids.cytosol,
                entity: ids.species_a,
            },
            TrackedConcentration {
                label: "b_left_mol_per_l".to_string(),
                updatable: UpdatableId::Node(ids.left),
                subsection: ids.cytosol,
                entity: ids.species_b,
            },
        ];
        simulation.add_observer(Box::new(CsvTimeSeriesObserver::new(tracked, 0.0)?));
    }

    simulation.run_epochs(epochs)?;
    print_summary(&simulation, &ids);

    let snapshot = export_snapshot_json(&simulation)?;
    println!();
    println!("Snapshot written to {}", snapshot.display());

    Ok(())
}
