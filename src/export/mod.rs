//! Export functionality for simulation data.
//!
//! Provides CSV time-series export of tracked concentrations and JSON
//! snapshot export of full simulation state. Both are observation-sink
//! adapters: they consume the per-epoch events the core emits and never
//! reach into the integration loop.

mod csv_export;
mod json_export;

pub use csv_export::{CsvTimeSeriesObserver, TrackedConcentration};
pub use json_export::{export_snapshot_json, export_snapshot_json_to};
