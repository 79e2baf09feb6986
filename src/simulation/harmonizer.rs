//! Adaptive time-step control.
//!
//! One harmonizer step evaluates every module at the current step size,
//! estimates the local integration error by step doubling and decides
//! whether the step is acceptable:
//!
//! - error above tolerance: shrink the step by a fixed factor, discard all
//!   provisional deltas, and probe only the critical module against the
//!   critical updatable until its error falls below tolerance (a smaller
//!   step changes every module's deltas, so the full module set is then
//!   re-evaluated once at the accepted size);
//! - error comfortably below tolerance with no shrink this epoch: grow the
//!   step for the next epoch.
//!
//! Shrinking is bounded by a retry count and a minimum step size; crossing
//! either bound aborts the run instead of looping forever.

use crate::error::SimulationError;
use crate::graph::SimulationSpace;
use crate::modules::{evaluate_pass, UpdateModule};
use crate::state::{LocalError, ModuleId};

/// Tuning knobs of the harmonizer.
#[derive(Debug, Clone)]
pub struct HarmonizerConfig {
    /// Largest acceptable local error
    pub epsilon: f64,
    /// Step multiplier applied on rejection
    pub shrink_factor: f64,
    /// Step multiplier applied after a comfortable acceptance
    pub growth_factor: f64,
    /// Relative margin below epsilon required before growing
    pub growth_margin: f64,
    /// Maximum shrink retries per epoch before giving up
    pub max_shrink_retries: usize,
    /// Smallest admissible step size (seconds)
    pub min_step_sec: f64,
}

impl Default for HarmonizerConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.01,
            shrink_factor: 0.8,
            growth_factor: 1.2,
            growth_margin: 0.1,
            max_shrink_retries: 50,
            min_step_sec: 1e-12,
        }
    }
}

/// Result of one accepted harmonizer step.
#[derive(Debug, Clone)]
pub struct EpochOutcome {
    /// Step size the deltas were accepted at (seconds)
    pub accepted_step_sec: f64,
    /// Worst local error of the accepting evaluation
    pub max_error: LocalError,
    /// Whether the step had to be shrunk this epoch
    pub step_rescaled: bool,
    /// Number of shrink retries spent this epoch
    pub shrink_retries: usize,
    /// Whether the step was grown for the next epoch
    pub grew_next_step: bool,
}

/// Error-controlled step-size governor.
#[derive(Debug, Clone)]
pub struct TimeStepHarmonizer {
    /// Current step size (seconds); mutated by shrink and growth
    pub step_sec: f64,
    /// Tuning configuration
    pub config: HarmonizerConfig,
}

impl TimeStepHarmonizer {
    /// Create a harmonizer with default tuning
    pub fn new(initial_step_sec: f64) -> Self {
        Self::with_config(initial_step_sec, HarmonizerConfig::default())
    }

    /// Create a harmonizer with explicit tuning
    pub fn with_config(initial_step_sec: f64, config: HarmonizerConfig) -> Self {
        Self {
            step_sec: initial_step_sec,
            config,
        }
    }

    /// Run one epoch's evaluation and commit the accepted deltas.
    ///
    /// On return every updatable holds its committed deltas in the final
    /// list; applying them is the simulation driver's job. Authoritative
    /// concentrations are never touched here, so rejected attempts leave no
    /// trace beyond the shrunken step size.
    pub fn step(
        &mut self,
        modules: &mut [Box<dyn UpdateModule>],
        space: &mut SimulationSpace,
    ) -> Result<EpochOutcome, SimulationError> {
        for module in modules.iter_mut() {
            module.rescale(self.step_sec);
        }

        let mut rescaled = false;
        let mut retries = 0usize;

        loop {
            space.clear_all_potential_deltas();

            let mut worst = LocalError::empty();
            let mut critical_module = 0usize;
            for (index, module) in modules.iter().enumerate() {
                let error =
                    evaluate_pass(module.as_ref(), ModuleId(index as u32), space, None)?;
                if error.value > worst.value {
                    worst = error;
                    critical_module = index;
                }
            }

            if worst.is_empty() || worst.value <= self.config.epsilon {
                space.shift_all_deltas();
                let accepted = self.step_sec;

                let comfortable = worst.is_empty()
                    || worst.value < self.config.epsilon * (1.0 - self.config.growth_margin);
                let grew = !rescaled && comfortable;
                if grew {
                    self.step_sec *= self.config.growth_factor;
                    log::trace!(
                        "step accepted at {:.3e} s, growing next step to {:.3e} s",
                        accepted,
                        self.step_sec
                    );
                }

                return Ok(EpochOutcome {
                    accepted_step_sec: accepted,
                    max_error: worst,
                    step_rescaled: rescaled,
                    shrink_retries: retries,
                    grew_next_step: grew,
                });
            }

            // Shrink, probing only the worst offender. Re-running the full
            // module set on every candidate step would repeat work that the
            // critical pair dominates anyway.
            rescaled = true;
            let critical_updatable = worst.updatable;
            log::debug!(
                "local error {:.3e} above tolerance {:.3e} (module '{}', {:?}), shrinking",
                worst.value,
                self.config.epsilon,
                modules[critical_module].name(),
                critical_updatable
            );

            loop {
                retries += 1;
                let candidate = self.step_sec * self.config.shrink_factor;
                if retries > self.config.max_shrink_retries
                    || candidate < self.config.min_step_sec
                {
                    return Err(SimulationError::NonConvergentStep {
                        retries,
                        min_step_sec: self.config.min_step_sec,
                        error: worst.value,
                    });
                }
                self.step_sec = candidate;
                for module in modules.iter_mut() {
                    module.rescale(self.step_sec);
                }
                space.clear_all_potential_deltas();

                let error = evaluate_pass(
                    modules[critical_module].as_ref(),
                    ModuleId(critical_module as u32),
                    space,
                    Some(critical_updatable),
                )?;
                if error.is_empty() || error.value <= self.config.epsilon {
                    break;
                }
                worst = error;
            }
            // A smaller step changes every module's deltas, not just the
            // critical one; the outer loop re-runs the full set.
        }
    }
}
