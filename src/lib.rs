//! Cytoflux - spatially resolved chemical-kinetics simulation engine
//!
//! This library advances concentrations of chemical species across a graph
//! of discretized cellular compartments, applying reaction, diffusion and
//! membrane-transport laws concurrently while guaranteeing numerical
//! stability through adaptive time-step control.
//!
//! The building blocks:
//! - concentration containers mapping (subsection, entity) pairs to mol/L
//! - update modules encapsulating one physical law each, classified by
//!   neighbor dependence and invocation granularity
//! - a time-step harmonizer validating every epoch through step-doubling
//!   local error estimation, shrinking and growing the step adaptively
//! - a simulation driver owning the graph, the module set and the
//!   epoch/elapsed-time bookkeeping

pub mod chemistry;
pub mod config;
pub mod error;
pub mod export;
pub mod graph;
pub mod modules;
pub mod simulation;
pub mod state;

pub use chemistry::{
    ChemicalEntity, EntityId, EntityRegistry, FeatureKind, FeatureSet, ScalableQuantity,
};
pub use config::SimulationParameters;
pub use error::SimulationError;
pub use graph::{
    AutomatonGraph, AutomatonNode, NodeId, SimulationSpace, UpdatableId, UpdatableState, Vesicle,
    VesicleId,
};
pub use modules::{
    ComplexBuildingReaction, ComplexBuildingReactionConfig, Diffusion, DiffusionConfig,
    MembraneDiffusion, MembraneDiffusionConfig, MichaelisMentenReaction,
    MichaelisMentenReactionConfig, ModuleScope, ModuleSpecificity, NthOrderReaction,
    NthOrderReactionConfig, Reactant, ReactantRole, ReversibleReaction,
    ReversibleReactionConfig, SingleFileChannelTransport, SingleFileChannelTransportConfig,
    UpdateModule,
};
pub use simulation::{
    EpochReport, HarmonizerConfig, ObservationEvent, Simulation, SimulationObserver,
    TimeStepHarmonizer,
};
pub use state::{
    CellSubsection, CellTopology, ConcentrationContainer, Delta, DeltaId, LocalError, ModuleId,
    SubsectionId, SubsectionRegistry,
};
