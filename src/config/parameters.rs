//! Simulation parameter structures.
//!
//! Parameters load from JSON with logged fallbacks so a missing or broken
//! file never aborts a run during exploration; validation of the values a
//! module actually consumes happens at module construction.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::simulation::{HarmonizerConfig, TimeStepHarmonizer};

/// Integration and step-control parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationParameters {
    /// Initial integration step (seconds)
    /// Typical chemical-kinetics runs start at 1 µs to 1 ms
    pub time_step_sec: f64,

    /// Largest acceptable step-doubling local error
    pub error_tolerance: f64,

    /// Step multiplier applied when an epoch is rejected
    pub shrink_factor: f64,

    /// Step multiplier applied after comfortable acceptance
    pub growth_factor: f64,

    /// Relative margin below the tolerance required before growing
    pub growth_margin: f64,

    /// Maximum shrink retries per epoch before the run aborts
    pub max_shrink_retries: usize,

    /// Smallest admissible step size (seconds)
    pub min_step_sec: f64,
}

impl SimulationParameters {
    /// Load parameters from a JSON file or return defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(params) => {
                    log::info!("Loaded simulation parameters from {:?}", path.as_ref());
                    params
                }
                Err(e) => {
                    log::warn!("Failed to parse simulation parameters: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Simulation parameters file not found, using defaults");
                Self::default()
            }
        }
    }

    /// Build a harmonizer from these parameters
    pub fn harmonizer(&self) -> TimeStepHarmonizer {
        TimeStepHarmonizer::with_config(
            self.time_step_sec,
            HarmonizerConfig {
                epsilon: self.error_tolerance,
                shrink_factor: self.shrink_factor,
                growth_factor: self.growth_factor,
                growth_margin: self.growth_margin,
                max_shrink_retries: self.max_shrink_retries,
                min_step_sec: self.min_step_sec,
            },
        )
    }
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            time_step_sec: 1e-3,
            error_tolerance: 0.01,
            shrink_factor: 0.8,
            growth_factor: 1.2,
            growth_margin: 0.1,
            max_shrink_retries: 50,
            min_step_sec: 1e-12,
        }
    }
}
