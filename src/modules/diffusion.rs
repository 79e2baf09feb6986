//! Graph diffusion.
//!
//! Finite-volume diffusion between neighboring automaton nodes: the flux
//! into a node is the diffusivity times the sum of admissible neighbor
//! concentrations, the flux out is the diffusivity times the number of
//! admissible outflow targets times the node's own concentration.
//!
//! Membrane-anchored entities follow asymmetric crossing rules: they
//! diffuse laterally between membrane regions, enter membranes from
//! adjacent non-membrane regions (one-way source) and leave membranes into
//! adjacent non-membrane regions (one-way sink). Unanchored entities only
//! move between nodes sharing the same subsection.

use std::collections::HashMap;

use crate::chemistry::{EntityId, EntityRegistry, FeatureKind, ScalableQuantity};
use crate::error::SimulationError;
use crate::graph::{SpaceView, UpdatableId};
use crate::modules::{
    DeltaAccumulator, DeltaContext, ModuleScope, ModuleSpecificity, UpdateModule,
};
use crate::state::{SubsectionId, SubsectionRegistry};

/// Configuration for the diffusion module.
#[derive(Debug, Clone)]
pub struct DiffusionConfig {
    /// Entities transported by diffusion; each must carry a diffusivity
    /// feature
    pub cargoes: Vec<EntityId>,
}

/// Neighbor-dependent, entity-specific diffusion over the automaton graph.
pub struct Diffusion {
    name: String,
    cargoes: Vec<EntityId>,
    diffusivity: HashMap<EntityId, ScalableQuantity>,
    anchored: HashMap<EntityId, bool>,
    membrane_subsections: Vec<SubsectionId>,
}

impl Diffusion {
    /// Build the module, reading diffusivities from entity features
    pub fn new(
        name: impl Into<String>,
        config: DiffusionConfig,
        entities: &EntityRegistry,
        subsections: &SubsectionRegistry,
    ) -> Result<Self, SimulationError> {
        let name = name.into();
        if config.cargoes.is_empty() {
            return Err(SimulationError::InvalidConfiguration(format!(
                "diffusion module '{}' has no cargo entities",
                name
            )));
        }

        let mut diffusivity = HashMap::new();
        let mut anchored = HashMap::new();
        for &cargo in &config.cargoes {
            let entity = entities.get(cargo);
            let base = entity
                .features
                .require(FeatureKind::Diffusivity, &name, cargo)?;
            diffusivity.insert(cargo, ScalableQuantity::new(base));
            anchored.insert(cargo, entity.membrane_anchored);
        }

        let membrane_subsections = (0..subsections.len() as u32)
            .map(SubsectionId)
            .filter(|&s| subsections.is_membrane(s))
            .collect();

        Ok(Self {
            name,
            cargoes: config.cargoes,
            diffusivity,
            anchored,
            membrane_subsections,
        })
    }

    #[inline]
    fn is_membrane(&self, subsection: SubsectionId) -> bool {
        self.membrane_subsections.contains(&subsection)
    }

    /// Whether the cargo may cross from one subsection into another.
    ///
    /// Unanchored cargo stays within its own subsection class. Anchored
    /// cargo additionally crosses membrane boundaries: lateral
    /// membrane-to-membrane movement, entry from non-membrane regions and
    /// release into non-membrane regions are each admissible as independent
    /// one-way crossings.
    fn admits(&self, from: SubsectionId, to: SubsectionId, anchored: bool) -> bool {
        if !anchored {
            return from == to;
        }
        match (self.is_membrane(from), self.is_membrane(to)) {
            (true, true) => true,
            (false, true) => true,
            (true, false) => true,
            (false, false) => from == to,
        }
    }
}

impl UpdateModule for Diffusion {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> ModuleScope {
        ModuleScope::NeighborDependent
    }

    fn specificity(&self) -> ModuleSpecificity {
        ModuleSpecificity::Entity
    }

    fn referenced_entities(&self) -> &[EntityId] {
        &self.cargoes
    }

    fn applies_to(&self, updatable: UpdatableId, _view: &SpaceView) -> bool {
        // Vesicle contents do not exchange with graph neighbors through
        // plain diffusion.
        updatable.is_node()
    }

    fn rescale(&mut self, step_sec: f64) {
        for quantity in self.diffusivity.values_mut() {
            quantity.rescale(step_sec);
        }
    }

    fn deltas(
        &self,
        ctx: &DeltaContext,
        out: &mut DeltaAccumulator,
    ) -> Result<(), SimulationError> {
        let Some(entity) = ctx.entity else {
            return Ok(());
        };
        let Some(diffusivity) = self.diffusivity.get(&entity) else {
            return Ok(());
        };
        let scaled = diffusivity.value(ctx.step);
        let anchored = self.anchored.get(&entity).copied().unwrap_or(false);
        let neighbors = ctx.neighbor_links();

        for own_subsection in ctx.own_state().subsections() {
            let mut influx = 0.0;
            let mut efflux_count = 0.0;

            for link in &neighbors {
                for neighbor_subsection in ctx.state_of(link.id).subsections() {
                    if self.admits(neighbor_subsection, own_subsection, anchored) {
                        influx += link.fraction
                            * ctx.concentration_of(link.id, neighbor_subsection, entity);
                    }
                    if self.admits(own_subsection, neighbor_subsection, anchored) {
                        efflux_count += link.fraction;
                    }
                }
            }

            let own = ctx.concentration(own_subsection, entity);
            let delta = scaled * influx - scaled * efflux_count * own;
            if delta != 0.0 {
                out.add(ctx.updatable, own_subsection, entity, delta);
            }
        }
        Ok(())
    }
}
