//! Simulation driver.
//!
//! Owns the simulation space, the module set, the harmonizer and the
//! epoch/elapsed-time bookkeeping. One epoch asks the harmonizer for an
//! accepted set of final deltas, applies them to every concentration
//! container, advances time by the accepted step and notifies observers.
//! Termination and emission cadence are the caller's policies, not part of
//! the core loop.

pub mod harmonizer;

pub use harmonizer::{EpochOutcome, HarmonizerConfig, TimeStepHarmonizer};

use crate::chemistry::EntityRegistry;
use crate::error::SimulationError;
use crate::graph::{SimulationSpace, UpdatableId};
use crate::modules::UpdateModule;
use crate::state::{ConcentrationContainer, LocalError, ModuleId, SubsectionRegistry};

/// Per-epoch summary for diagnostics and observers.
#[derive(Debug, Clone)]
pub struct EpochReport {
    /// Epoch number after this step
    pub epoch: u64,
    /// Elapsed simulation time after this step (seconds)
    pub elapsed_sec: f64,
    /// Step size the epoch was accepted at (seconds)
    pub accepted_step_sec: f64,
    /// Worst local error of the accepting evaluation
    pub max_error: LocalError,
    /// Whether the step was shrunk this epoch
    pub step_rescaled: bool,
    /// Shrink retries spent this epoch
    pub shrink_retries: usize,
    /// Concentration clamps performed while applying this epoch's deltas
    pub clamp_events: u64,
}

/// Concentration snapshot of one observed updatable.
#[derive(Debug, Clone)]
pub struct UpdatableSnapshot {
    /// The observed updatable
    pub id: UpdatableId,
    /// Copy of its concentrations after delta application
    pub concentrations: ConcentrationContainer,
}

/// Per-epoch notification for observation sinks.
#[derive(Debug, Clone)]
pub struct ObservationEvent {
    /// Epoch number
    pub epoch: u64,
    /// Elapsed simulation time (seconds)
    pub elapsed_sec: f64,
    /// Snapshots of all observed updatables
    pub updatables: Vec<UpdatableSnapshot>,
}

/// Observation sink notified after every epoch.
pub trait SimulationObserver {
    /// Handle one epoch's observation event
    fn on_epoch(&mut self, event: &ObservationEvent);
}

/// The simulation: space, modules, harmonizer and bookkeeping.
pub struct Simulation {
    /// Graph nodes and vesicles
    pub space: SimulationSpace,
    /// Registered chemical entities
    pub entities: EntityRegistry,
    /// Registered subsection classes
    pub subsections: SubsectionRegistry,
    /// Adaptive step-size governor
    pub harmonizer: TimeStepHarmonizer,
    /// Completed epochs
    pub epoch: u64,
    /// Elapsed simulation time (seconds); grows by the accepted step each
    /// epoch, never by rejected retries
    pub elapsed_sec: f64,
    /// Total negative-concentration clamps since construction; a steadily
    /// climbing count signals that opposing deltas are being double counted
    pub clamp_events: u64,
    modules: Vec<Box<dyn UpdateModule>>,
    observers: Vec<Box<dyn SimulationObserver>>,
}

impl Simulation {
    /// Assemble a simulation
    pub fn new(
        space: SimulationSpace,
        entities: EntityRegistry,
        subsections: SubsectionRegistry,
        harmonizer: TimeStepHarmonizer,
    ) -> Self {
        Self {
            space,
            entities,
            subsections,
            harmonizer,
            epoch: 0,
            elapsed_sec: 0.0,
            clamp_events: 0,
            modules: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Register an update module, returning its identifier
    pub fn add_module(&mut self, module: Box<dyn UpdateModule>) -> ModuleId {
        let id = ModuleId(self.modules.len() as u32);
        log::info!("registered module '{}'", module.name());
        self.modules.push(module);
        id
    }

    /// Registered modules
    pub fn modules(&self) -> &[Box<dyn UpdateModule>] {
        &self.modules
    }

    /// Attach an observation sink
    pub fn add_observer(&mut self, observer: Box<dyn SimulationObserver>) {
        self.observers.push(observer);
    }

    /// Advance the simulation by one accepted epoch.
    pub fn next_epoch(&mut self) -> Result<EpochReport, SimulationError> {
        let outcome = self.harmonizer.step(&mut self.modules, &mut self.space)?;

        let clamped = self.space.apply_all_final_deltas();
        self.clamp_events += clamped;
        self.epoch += 1;
        self.elapsed_sec += outcome.accepted_step_sec;

        if clamped > 0 {
            log::debug!(
                "epoch {}: clamped {} negative concentration(s) to zero",
                self.epoch,
                clamped
            );
        }

        let report = EpochReport {
            epoch: self.epoch,
            elapsed_sec: self.elapsed_sec,
            accepted_step_sec: outcome.accepted_step_sec,
            max_error: outcome.max_error,
            step_rescaled: outcome.step_rescaled,
            shrink_retries: outcome.shrink_retries,
            clamp_events: clamped,
        };

        if !self.observers.is_empty() {
            let event = ObservationEvent {
                epoch: self.epoch,
                elapsed_sec: self.elapsed_sec,
                updatables: self.observed_snapshots(),
            };
            for observer in &mut self.observers {
                observer.on_epoch(&event);
            }
        }

        Ok(report)
    }

    /// Run epochs until the elapsed time has advanced by a duration
    pub fn run_for(&mut self, duration_sec: f64) -> Result<(), SimulationError> {
        let target = self.elapsed_sec + duration_sec;
        while self.elapsed_sec < target {
            self.next_epoch()?;
        }
        Ok(())
    }

    /// Run a fixed number of epochs
    pub fn run_epochs(&mut self, epochs: u64) -> Result<(), SimulationError> {
        for _ in 0..epochs {
            self.next_epoch()?;
        }
        Ok(())
    }

    /// Run epochs while a caller-supplied policy holds
    pub fn run_while<F>(&mut self, mut keep_running: F) -> Result<(), SimulationError>
    where
        F: FnMut(&Simulation) -> bool,
    {
        while keep_running(self) {
            self.next_epoch()?;
        }
        Ok(())
    }

    /// Snapshots of every updatable flagged as observed
    pub fn observed_snapshots(&self) -> Vec<UpdatableSnapshot> {
        self.space
            .updatable_ids()
            .into_iter()
            .filter(|&id| self.space.state(id).observed)
            .map(|id| UpdatableSnapshot {
                id,
                concentrations: self.space.state(id).concentrations.clone(),
            })
            .collect()
    }
}
