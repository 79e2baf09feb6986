//! JSON export for simulation snapshots.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use serde::Serialize;

use crate::simulation::Simulation;

/// Full snapshot export structure
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotExport {
    /// Export timestamp
    pub exported_at: String,
    /// Export version for compatibility
    pub version: &'static str,
    /// Epoch the snapshot was taken at
    pub epoch: u64,
    /// Elapsed simulation time (seconds)
    pub elapsed_sec: f64,
    /// Negative-concentration clamps since simulation start
    pub clamp_events: u64,
    /// Concentration state of every updatable
    pub updatables: Vec<UpdatableExport>,
}

/// Concentrations of one updatable
#[derive(Debug, Clone, Serialize)]
pub struct UpdatableExport {
    /// Display label of the updatable
    pub updatable: String,
    /// All stored concentration entries
    pub concentrations: Vec<ConcentrationExport>,
}

/// One concentration entry
#[derive(Debug, Clone, Serialize)]
pub struct ConcentrationExport {
    /// Subsection name
    pub subsection: String,
    /// Entity name
    pub entity: String,
    /// Concentration (mol/L)
    pub mol_per_l: f64,
}

fn build_export(simulation: &Simulation) -> SnapshotExport {
    let updatables = simulation
        .space
        .updatable_ids()
        .into_iter()
        .map(|id| UpdatableExport {
            updatable: format!("{:?}", id),
            concentrations: simulation
                .space
                .state(id)
                .concentrations
                .iter()
                .map(|(subsection, entity, mol_per_l)| ConcentrationExport {
                    subsection: simulation.subsections.name_of(subsection).to_string(),
                    entity: simulation.entities.name_of(entity).to_string(),
                    mol_per_l,
                })
                .collect(),
        })
        .collect();

    SnapshotExport {
        exported_at: Local::now().to_rfc3339(),
        version: "1.0.0",
        epoch: simulation.epoch,
        elapsed_sec: simulation.elapsed_sec,
        clamp_events: simulation.clamp_events,
        updatables,
    }
}

/// Export the current simulation state to JSON.
///
/// Creates the exports directory if it doesn't exist. Filename is
/// auto-generated with timestamp: `snapshot_YYYYMMDD_HHMMSS.json`.
///
/// Returns the path to the saved JSON file.
pub fn export_snapshot_json(simulation: &Simulation) -> Result<PathBuf> {
    let dir = PathBuf::from("exports");
    std::fs::create_dir_all(&dir)?;

    let timestamp = Local::now();
    let filename = format!("snapshot_{}.json", timestamp.format("%Y%m%d_%H%M%S"));
    let path = dir.join(&filename);

    export_snapshot_json_to(simulation, &path)?;
    Ok(path)
}

/// Export the current simulation state to a specific file
pub fn export_snapshot_json_to(simulation: &Simulation, path: &Path) -> Result<()> {
    let export = build_export(simulation);
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, &export)?;

    log::info!("JSON snapshot exported: {}", path.display());
    Ok(())
}
