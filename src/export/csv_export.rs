//! CSV time-series export of tracked concentrations.

use std::fs::File;
use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;

use crate::chemistry::EntityId;
use crate::graph::UpdatableId;
use crate::simulation::{ObservationEvent, SimulationObserver};
use crate::state::SubsectionId;

/// One concentration series to export.
#[derive(Debug, Clone)]
pub struct TrackedConcentration {
    /// Column header
    pub label: String,
    /// Updatable holding the concentration; must be flagged as observed
    pub updatable: UpdatableId,
    /// Subsection within the updatable
    pub subsection: SubsectionId,
    /// Tracked entity
    pub entity: EntityId,
}

/// CSV exporter writing one row per epoch, gated by a sample interval.
pub struct CsvTimeSeriesObserver {
    writer: csv::Writer<File>,
    tracked: Vec<TrackedConcentration>,
    /// Sample interval in simulation seconds
    sample_interval_sec: f64,
    /// Last sample time
    last_sample_time: f64,
    /// Path to output file
    path: PathBuf,
}

impl CsvTimeSeriesObserver {
    /// Create an exporter writing to an auto-named file.
    ///
    /// Creates the exports directory if it doesn't exist. Filename is
    /// auto-generated with timestamp: `timeseries_YYYYMMDD_HHMMSS.csv`.
    pub fn new(tracked: Vec<TrackedConcentration>, sample_interval_sec: f64) -> Result<Self> {
        let dir = PathBuf::from("exports");
        std::fs::create_dir_all(&dir)?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("timeseries_{}.csv", timestamp);
        Self::create(dir.join(filename), tracked, sample_interval_sec)
    }

    /// Create an exporter writing to a specific path
    pub fn create(
        path: PathBuf,
        tracked: Vec<TrackedConcentration>,
        sample_interval_sec: f64,
    ) -> Result<Self> {
        let file = File::create(&path)?;
        let mut writer = csv::Writer::from_writer(file);

        let mut header = vec!["epoch".to_string(), "elapsed_sec".to_string()];
        header.extend(tracked.iter().map(|t| t.label.clone()));
        writer.write_record(&header)?;

        log::info!("CSV export started: {}", path.display());

        Ok(Self {
            writer,
            tracked,
            sample_interval_sec,
            last_sample_time: -sample_interval_sec, // Ensure first sample is recorded
            path,
        })
    }

    fn record(&mut self, event: &ObservationEvent) -> Result<()> {
        let mut row = vec![event.epoch.to_string(), format!("{:.9}", event.elapsed_sec)];
        for tracked in &self.tracked {
            let value = event
                .updatables
                .iter()
                .find(|snapshot| snapshot.id == tracked.updatable)
                .map(|snapshot| {
                    snapshot
                        .concentrations
                        .get(tracked.subsection, tracked.entity)
                })
                .unwrap_or(0.0);
            row.push(format!("{:.9e}", value));
        }
        self.writer.write_record(&row)?;
        self.last_sample_time = event.elapsed_sec;
        Ok(())
    }

    /// Finish writing and return the output path
    pub fn finish(mut self) -> Result<PathBuf> {
        self.writer.flush()?;
        log::info!("CSV export completed: {}", self.path.display());
        Ok(self.path)
    }

    /// Get the output path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl SimulationObserver for CsvTimeSeriesObserver {
    fn on_epoch(&mut self, event: &ObservationEvent) {
        if event.elapsed_sec - self.last_sample_time < self.sample_interval_sec {
            return;
        }
        if let Err(error) = self.record(event) {
            log::warn!("CSV export failed at epoch {}: {}", event.epoch, error);
        }
    }
}
