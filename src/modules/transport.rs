//! Membrane transport modules.
//!
//! Permeability-driven membrane diffusion and occupancy-driven single-file
//! channel transport. Both move cargo between the inner and outer sides of
//! a membrane; membrane diffusion additionally handles vesicles straddling
//! several automaton nodes, splitting the flux by fractional area overlap
//! while conserving mass exactly.
//!
//! Permeability and area are folded into one per-second exchange
//! coefficient (permeability in µm/s, area in µm², volume normalization
//! absorbed into the permeability feature), so fluxes come out directly in
//! mol/L per step.

use crate::chemistry::{
    ChemicalEntity, EntityId, FeatureKind, ScalableQuantity, AVOGADRO_PER_MOL,
};
use crate::error::SimulationError;
use crate::graph::{SpaceView, UpdatableId};
use crate::modules::{
    DeltaAccumulator, DeltaContext, ModuleScope, ModuleSpecificity, UpdateModule,
};
use crate::state::CellTopology;

// ============================================================================
// Membrane diffusion
// ============================================================================

/// Configuration for permeability-driven membrane diffusion.
#[derive(Debug, Clone)]
pub struct MembraneDiffusionConfig {
    /// Transported entity; must carry a membrane permeability feature
    pub cargo: EntityId,
}

/// Passive flux across a membrane.
///
/// flux = permeability × area × (outer concentration − inner concentration)
///
/// For fixed nodes the flux moves cargo between the node's own outer and
/// inner subsections. For a vesicle the outer side is the cytosol of each
/// associated node: the flux is computed per node, weighted by the
/// vesicle's area fraction there, charged to that node and summed onto the
/// vesicle's lumen, so the vesicle-side aggregate equals the negated sum of
/// the node-side deltas.
pub struct MembraneDiffusion {
    name: String,
    cargo: EntityId,
    entities: Vec<EntityId>,
    permeability: ScalableQuantity,
}

impl MembraneDiffusion {
    /// Build the module, reading the permeability from the cargo's features
    pub fn new(
        name: impl Into<String>,
        config: MembraneDiffusionConfig,
        cargo: &ChemicalEntity,
    ) -> Result<Self, SimulationError> {
        let name = name.into();
        let permeability =
            cargo
                .features
                .require(FeatureKind::MembranePermeability, &name, config.cargo)?;
        Ok(Self {
            name,
            cargo: config.cargo,
            entities: vec![config.cargo],
            permeability: ScalableQuantity::new(permeability),
        })
    }
}

impl UpdateModule for MembraneDiffusion {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> ModuleScope {
        ModuleScope::SemiDependent
    }

    fn specificity(&self) -> ModuleSpecificity {
        ModuleSpecificity::Entity
    }

    fn referenced_entities(&self) -> &[EntityId] {
        &self.entities
    }

    fn applies_to(&self, updatable: UpdatableId, view: &SpaceView) -> bool {
        view.state(updatable).resolve(CellTopology::Membrane).is_some()
    }

    fn rescale(&mut self, step_sec: f64) {
        self.permeability.rescale(step_sec);
    }

    fn deltas(
        &self,
        ctx: &DeltaContext,
        out: &mut DeltaAccumulator,
    ) -> Result<(), SimulationError> {
        let exchange = self.permeability.value(ctx.step) * ctx.own_state().membrane_area_um2;
        if exchange == 0.0 {
            return Ok(());
        }
        let inner_subsection = ctx.require_resolved(CellTopology::Inner, self.cargo)?;
        let inner = ctx.concentration(inner_subsection, self.cargo);

        match ctx.updatable {
            UpdatableId::Node(_) => {
                let outer_subsection = ctx.require_resolved(CellTopology::Outer, self.cargo)?;
                let outer = ctx.concentration(outer_subsection, self.cargo);
                let flux = exchange * (outer - inner);
                if flux != 0.0 {
                    out.add(ctx.updatable, inner_subsection, self.cargo, flux);
                    out.add(ctx.updatable, outer_subsection, self.cargo, -flux);
                }
            }
            UpdatableId::Vesicle(_) => {
                // The surrounding medium of a vesicle is the cytosol of
                // every node it overlaps.
                let mut aggregate = 0.0;
                for link in ctx.neighbor_links() {
                    let node_subsection =
                        ctx.require_resolved_on(link.id, CellTopology::Inner, self.cargo)?;
                    let node_concentration =
                        ctx.concentration_of(link.id, node_subsection, self.cargo);
                    let flux = exchange * link.fraction * (node_concentration - inner);
                    if flux != 0.0 {
                        out.add(link.id, node_subsection, self.cargo, -flux);
                    }
                    aggregate += flux;
                }
                if aggregate != 0.0 {
                    out.add(ctx.updatable, inner_subsection, self.cargo, aggregate);
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Single-file channel transport
// ============================================================================

/// Configuration for single-file channel transport.
#[derive(Debug, Clone)]
pub struct SingleFileChannelTransportConfig {
    /// Entity moved through the channel
    pub cargo: EntityId,
    /// Entity whose gradient drives the transport
    pub solute: EntityId,
    /// Channel protein residing in the membrane subsection; must carry a
    /// channel transport rate feature
    pub transporter: EntityId,
}

/// Gradient-driven transport through single-file channels.
///
/// velocity = rate × channel count × (outer solute − inner solute)
///
/// The channel count is the transporter's membrane concentration converted
/// to molecules through the compartment volume and Avogadro's number, so
/// the per-channel rate feature stays in single-molecule units.
pub struct SingleFileChannelTransport {
    name: String,
    cargo: EntityId,
    solute: EntityId,
    transporter: EntityId,
    entities: Vec<EntityId>,
    rate: ScalableQuantity,
}

impl SingleFileChannelTransport {
    /// Build the module, reading the per-channel rate from the transporter
    pub fn new(
        name: impl Into<String>,
        config: SingleFileChannelTransportConfig,
        transporter: &ChemicalEntity,
    ) -> Result<Self, SimulationError> {
        let name = name.into();
        let rate = transporter.features.require(
            FeatureKind::ChannelTransportRate,
            &name,
            config.transporter,
        )?;
        Ok(Self {
            name,
            cargo: config.cargo,
            solute: config.solute,
            transporter: config.transporter,
            entities: vec![config.cargo, config.solute, config.transporter],
            rate: ScalableQuantity::new(rate),
        })
    }
}

impl UpdateModule for SingleFileChannelTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> ModuleScope {
        ModuleScope::Independent
    }

    fn specificity(&self) -> ModuleSpecificity {
        ModuleSpecificity::Updatable
    }

    fn referenced_entities(&self) -> &[EntityId] {
        &self.entities
    }

    fn applies_to(&self, updatable: UpdatableId, view: &SpaceView) -> bool {
        let state = view.state(updatable);
        state.resolve(CellTopology::Membrane).is_some()
            && state.resolve(CellTopology::Inner).is_some()
            && state.resolve(CellTopology::Outer).is_some()
    }

    fn is_applicable(&self, ctx: &DeltaContext) -> bool {
        match ctx.resolved(CellTopology::Membrane) {
            Some(membrane) => ctx.concentration(membrane, self.transporter) > 0.0,
            None => false,
        }
    }

    fn rescale(&mut self, step_sec: f64) {
        self.rate.rescale(step_sec);
    }

    fn deltas(
        &self,
        ctx: &DeltaContext,
        out: &mut DeltaAccumulator,
    ) -> Result<(), SimulationError> {
        let membrane = ctx.require_resolved(CellTopology::Membrane, self.transporter)?;
        let inner = ctx.require_resolved(CellTopology::Inner, self.cargo)?;
        let outer = ctx.require_resolved(CellTopology::Outer, self.cargo)?;

        let channels = ctx.concentration(membrane, self.transporter)
            * ctx.own_state().volume_l
            * AVOGADRO_PER_MOL;
        let gradient =
            ctx.concentration(outer, self.solute) - ctx.concentration(inner, self.solute);
        let velocity = self.rate.value(ctx.step) * channels * gradient;
        if velocity == 0.0 {
            return Ok(());
        }

        out.add(ctx.updatable, inner, self.cargo, velocity);
        out.add(ctx.updatable, outer, self.cargo, -velocity);
        Ok(())
    }
}
