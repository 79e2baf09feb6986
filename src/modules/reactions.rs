//! Reaction kinetics modules.
//!
//! Rate laws commonly used in systems biology:
//! - nth-order (and zero-order) mass action kinetics
//! - reversible mass action kinetics
//! - Michaelis-Menten kinetics
//! - complex building and dissociation across compartment topologies
//!
//! Every module shares the half-step error estimation protocol of the
//! evaluation driver; only the velocity law and the reactant bookkeeping
//! differ between them.
//!
//! References:
//! - Cornish-Bowden A. Fundamentals of Enzyme Kinetics. 4th ed.
//!   Wiley-Blackwell, 2012
//! - Michaelis L, Menten ML. Biochemische Zeitschrift. 1913;49:333-369

use crate::chemistry::{ChemicalEntity, EntityId, FeatureKind, ScalableQuantity};
use crate::error::SimulationError;
use crate::graph::{SpaceView, UpdatableId};
use crate::modules::{
    DeltaAccumulator, DeltaContext, ModuleScope, ModuleSpecificity, UpdateModule,
};
use crate::state::{CellTopology, SubsectionId};

/// Whether a reactant is consumed or produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactantRole {
    /// Consumed by the forward direction
    Substrate,
    /// Produced by the forward direction
    Product,
}

/// One participant of a reaction.
#[derive(Debug, Clone, Copy)]
pub struct Reactant {
    /// The participating entity
    pub entity: EntityId,
    /// Role in the forward direction
    pub role: ReactantRole,
    /// Stoichiometric coefficient applied to the velocity
    pub stoichiometric_number: f64,
    /// Exponent of the concentration in the rate law
    pub reaction_order: f64,
}

impl Reactant {
    /// A substrate with coefficient and order one
    pub fn substrate(entity: EntityId) -> Self {
        Self {
            entity,
            role: ReactantRole::Substrate,
            stoichiometric_number: 1.0,
            reaction_order: 1.0,
        }
    }

    /// A product with coefficient and order one
    pub fn product(entity: EntityId) -> Self {
        Self {
            entity,
            role: ReactantRole::Product,
            stoichiometric_number: 1.0,
            reaction_order: 1.0,
        }
    }

    /// Set the stoichiometric coefficient
    pub fn stoichiometry(mut self, number: f64) -> Self {
        self.stoichiometric_number = number;
        self
    }

    /// Set the reaction order
    pub fn order(mut self, order: f64) -> Self {
        self.reaction_order = order;
        self
    }

    #[inline]
    fn signed_stoichiometry(&self) -> f64 {
        match self.role {
            ReactantRole::Substrate => -self.stoichiometric_number,
            ReactantRole::Product => self.stoichiometric_number,
        }
    }
}

fn validate_reactants(name: &str, reactants: &[Reactant]) -> Result<(), SimulationError> {
    for reactant in reactants {
        if !reactant.stoichiometric_number.is_finite() || reactant.stoichiometric_number <= 0.0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "reaction '{}': stoichiometric number for entity {:?} must be finite and \
                 positive",
                name, reactant.entity
            )));
        }
        if !reactant.reaction_order.is_finite() || reactant.reaction_order < 0.0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "reaction '{}': reaction order for entity {:?} must be finite and non-negative",
                name, reactant.entity
            )));
        }
    }
    Ok(())
}

fn validate_rate(name: &str, label: &str, rate: f64) -> Result<(), SimulationError> {
    if !rate.is_finite() || rate < 0.0 {
        return Err(SimulationError::InvalidConfiguration(format!(
            "reaction '{}': {} must be finite and non-negative, got {}",
            name, label, rate
        )));
    }
    Ok(())
}

/// Product of substrate (or product) concentrations raised to their orders.
#[inline]
fn concentration_product(
    ctx: &DeltaContext,
    subsection: SubsectionId,
    reactants: &[Reactant],
    role: ReactantRole,
) -> f64 {
    let mut product = 1.0;
    for reactant in reactants.iter().filter(|r| r.role == role) {
        let concentration = ctx.concentration(subsection, reactant.entity);
        if reactant.reaction_order == 1.0 {
            product *= concentration;
        } else {
            product *= concentration.powf(reactant.reaction_order);
        }
    }
    product
}

// ============================================================================
// Nth-order reaction
// ============================================================================

/// Configuration for an irreversible nth-order reaction.
#[derive(Debug, Clone)]
pub struct NthOrderReactionConfig {
    /// Substrates and products with coefficients and orders
    pub reactants: Vec<Reactant>,
    /// Rate constant (1/s, scaled per step)
    pub rate_per_sec: f64,
    /// Elementary reactions take their orders from the stoichiometric
    /// coefficients
    pub elementary: bool,
}

/// Irreversible mass action kinetics.
///
/// velocity = k × Π(substrate concentration ^ reaction order)
///
/// A reaction with no substrates is a zero-order source with velocity k.
pub struct NthOrderReaction {
    name: String,
    reactants: Vec<Reactant>,
    entities: Vec<EntityId>,
    rate: ScalableQuantity,
}

impl NthOrderReaction {
    /// Build and validate the module
    pub fn new(
        name: impl Into<String>,
        config: NthOrderReactionConfig,
    ) -> Result<Self, SimulationError> {
        let name = name.into();
        validate_rate(&name, "rate constant", config.rate_per_sec)?;
        let mut reactants = config.reactants;
        if config.elementary {
            for reactant in &mut reactants {
                if reactant.role == ReactantRole::Substrate {
                    reactant.reaction_order = reactant.stoichiometric_number;
                }
            }
        }
        validate_reactants(&name, &reactants)?;
        let entities = reactants.iter().map(|r| r.entity).collect();
        Ok(Self {
            name,
            reactants,
            entities,
            rate: ScalableQuantity::new(config.rate_per_sec),
        })
    }

    #[inline]
    fn velocity(&self, ctx: &DeltaContext, subsection: SubsectionId) -> f64 {
        self.rate.value(ctx.step)
            * concentration_product(ctx, subsection, &self.reactants, ReactantRole::Substrate)
    }
}

impl UpdateModule for NthOrderReaction {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> ModuleScope {
        ModuleScope::Independent
    }

    fn specificity(&self) -> ModuleSpecificity {
        ModuleSpecificity::Subsection
    }

    fn referenced_entities(&self) -> &[EntityId] {
        &self.entities
    }

    fn rescale(&mut self, step_sec: f64) {
        self.rate.rescale(step_sec);
    }

    fn deltas(
        &self,
        ctx: &DeltaContext,
        out: &mut DeltaAccumulator,
    ) -> Result<(), SimulationError> {
        let Some(subsection) = ctx.subsection else {
            return Ok(());
        };
        let velocity = self.velocity(ctx, subsection);
        if velocity == 0.0 {
            return Ok(());
        }
        for reactant in &self.reactants {
            out.add(
                ctx.updatable,
                subsection,
                reactant.entity,
                velocity * reactant.signed_stoichiometry(),
            );
        }
        Ok(())
    }
}

// ============================================================================
// Reversible reaction
// ============================================================================

/// Configuration for a reversible reaction.
#[derive(Debug, Clone)]
pub struct ReversibleReactionConfig {
    /// Substrates and products with coefficients and orders
    pub reactants: Vec<Reactant>,
    /// Forward rate constant (1/s, scaled per step)
    pub k_forward_per_sec: f64,
    /// Backward rate constant (1/s, scaled per step)
    pub k_backward_per_sec: f64,
}

/// Reversible mass action kinetics.
///
/// velocity = kf × Π(substrate concentrations) − kb × Π(product
/// concentrations); a negative velocity runs the reaction backwards.
pub struct ReversibleReaction {
    name: String,
    reactants: Vec<Reactant>,
    entities: Vec<EntityId>,
    k_forward: ScalableQuantity,
    k_backward: ScalableQuantity,
}

impl ReversibleReaction {
    /// Build and validate the module
    pub fn new(
        name: impl Into<String>,
        config: ReversibleReactionConfig,
    ) -> Result<Self, SimulationError> {
        let name = name.into();
        validate_rate(&name, "forward rate constant", config.k_forward_per_sec)?;
        validate_rate(&name, "backward rate constant", config.k_backward_per_sec)?;
        validate_reactants(&name, &config.reactants)?;
        let entities = config.reactants.iter().map(|r| r.entity).collect();
        Ok(Self {
            name,
            reactants: config.reactants,
            entities,
            k_forward: ScalableQuantity::new(config.k_forward_per_sec),
            k_backward: ScalableQuantity::new(config.k_backward_per_sec),
        })
    }

    #[inline]
    fn velocity(&self, ctx: &DeltaContext, subsection: SubsectionId) -> f64 {
        let forward = self.k_forward.value(ctx.step)
            * concentration_product(ctx, subsection, &self.reactants, ReactantRole::Substrate);
        let backward = self.k_backward.value(ctx.step)
            * concentration_product(ctx, subsection, &self.reactants, ReactantRole::Product);
        forward - backward
    }
}

impl UpdateModule for ReversibleReaction {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> ModuleScope {
        ModuleScope::Independent
    }

    fn specificity(&self) -> ModuleSpecificity {
        ModuleSpecificity::Subsection
    }

    fn referenced_entities(&self) -> &[EntityId] {
        &self.entities
    }

    fn rescale(&mut self, step_sec: f64) {
        self.k_forward.rescale(step_sec);
        self.k_backward.rescale(step_sec);
    }

    fn deltas(
        &self,
        ctx: &DeltaContext,
        out: &mut DeltaAccumulator,
    ) -> Result<(), SimulationError> {
        let Some(subsection) = ctx.subsection else {
            return Ok(());
        };
        let velocity = self.velocity(ctx, subsection);
        if velocity == 0.0 {
            return Ok(());
        }
        for reactant in &self.reactants {
            out.add(
                ctx.updatable,
                subsection,
                reactant.entity,
                velocity * reactant.signed_stoichiometry(),
            );
        }
        Ok(())
    }
}

// ============================================================================
// Michaelis-Menten reaction
// ============================================================================

/// Configuration for an enzyme-catalyzed reaction.
#[derive(Debug, Clone)]
pub struct MichaelisMentenReactionConfig {
    /// The catalyzing enzyme; must carry catalytic rate and Michaelis
    /// constant features
    pub enzyme: EntityId,
    /// The rate-limiting substrate
    pub substrate: EntityId,
    /// Products with stoichiometric coefficients
    pub products: Vec<Reactant>,
}

/// Michaelis-Menten kinetics.
///
/// velocity = kcat × [E] × [S] / (Km + [S])
///
/// Only a single rate-limiting substrate is supported; multi-substrate
/// mechanisms require their own rate law. kcat and Km are mandatory
/// features of the enzyme entity and missing either fails construction.
pub struct MichaelisMentenReaction {
    name: String,
    enzyme: EntityId,
    substrate: EntityId,
    products: Vec<Reactant>,
    entities: Vec<EntityId>,
    k_cat: ScalableQuantity,
    km_mol_per_l: f64,
}

impl MichaelisMentenReaction {
    /// Build the module, reading kcat and Km from the enzyme's features
    pub fn new(
        name: impl Into<String>,
        config: MichaelisMentenReactionConfig,
        enzyme: &ChemicalEntity,
    ) -> Result<Self, SimulationError> {
        let name = name.into();
        let k_cat = enzyme
            .features
            .require(FeatureKind::CatalyticRate, &name, config.enzyme)?;
        let km = enzyme
            .features
            .require(FeatureKind::MichaelisConstant, &name, config.enzyme)?;
        validate_rate(&name, "catalytic rate", k_cat)?;
        validate_reactants(&name, &config.products)?;

        let mut entities = vec![config.enzyme, config.substrate];
        entities.extend(config.products.iter().map(|r| r.entity));
        Ok(Self {
            name,
            enzyme: config.enzyme,
            substrate: config.substrate,
            products: config.products,
            entities,
            k_cat: ScalableQuantity::new(k_cat),
            km_mol_per_l: km,
        })
    }

    #[inline]
    fn velocity(&self, ctx: &DeltaContext, subsection: SubsectionId) -> f64 {
        let substrate = ctx.concentration(subsection, self.substrate);
        if substrate <= 0.0 {
            return 0.0;
        }
        let enzyme = ctx.concentration(subsection, self.enzyme);
        self.k_cat.value(ctx.step) * enzyme * substrate / (self.km_mol_per_l + substrate)
    }
}

impl UpdateModule for MichaelisMentenReaction {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> ModuleScope {
        ModuleScope::Independent
    }

    fn specificity(&self) -> ModuleSpecificity {
        ModuleSpecificity::Subsection
    }

    fn referenced_entities(&self) -> &[EntityId] {
        &self.entities
    }

    fn rescale(&mut self, step_sec: f64) {
        self.k_cat.rescale(step_sec);
    }

    fn deltas(
        &self,
        ctx: &DeltaContext,
        out: &mut DeltaAccumulator,
    ) -> Result<(), SimulationError> {
        let Some(subsection) = ctx.subsection else {
            return Ok(());
        };
        let velocity = self.velocity(ctx, subsection);
        if velocity == 0.0 {
            return Ok(());
        }
        out.add(ctx.updatable, subsection, self.substrate, -velocity);
        for product in &self.products {
            out.add(
                ctx.updatable,
                subsection,
                product.entity,
                velocity * product.stoichiometric_number,
            );
        }
        Ok(())
    }
}

// ============================================================================
// Complex building reaction
// ============================================================================

/// Configuration for a complex building and dissociation reaction.
#[derive(Debug, Clone)]
pub struct ComplexBuildingReactionConfig {
    /// Binding partner (for example a membrane receptor)
    pub binder: EntityId,
    /// Topology role whose subsection holds the binder and the complex
    pub binder_topology: CellTopology,
    /// Bound partner (for example a cytosolic ligand)
    pub bindee: EntityId,
    /// Topology role whose subsection holds the bindee
    pub bindee_topology: CellTopology,
    /// The resulting complex
    pub complex: EntityId,
    /// Association rate constant (1/(M·s), scaled per step)
    pub k_on_per_molar_sec: f64,
    /// Dissociation rate constant (1/s, scaled per step)
    pub k_off_per_sec: f64,
}

/// Complex formation coupling two compartment topologies.
///
/// velocity = kon × [binder] × [bindee] − koff × [complex]
///
/// The complex is produced into the binder's subsection. Updatables that do
/// not resolve both topology roles are skipped by the application
/// condition; a reactant-presence predicate guarantees zero net effect when
/// binder and complex are simultaneously absent.
pub struct ComplexBuildingReaction {
    name: String,
    binder: EntityId,
    binder_topology: CellTopology,
    bindee: EntityId,
    bindee_topology: CellTopology,
    complex: EntityId,
    entities: Vec<EntityId>,
    k_on: ScalableQuantity,
    k_off: ScalableQuantity,
}

impl ComplexBuildingReaction {
    /// Build and validate the module
    pub fn new(
        name: impl Into<String>,
        config: ComplexBuildingReactionConfig,
    ) -> Result<Self, SimulationError> {
        let name = name.into();
        validate_rate(&name, "association rate constant", config.k_on_per_molar_sec)?;
        validate_rate(&name, "dissociation rate constant", config.k_off_per_sec)?;
        Ok(Self {
            name,
            binder: config.binder,
            binder_topology: config.binder_topology,
            bindee: config.bindee,
            bindee_topology: config.bindee_topology,
            complex: config.complex,
            entities: vec![config.binder, config.bindee, config.complex],
            k_on: ScalableQuantity::new(config.k_on_per_molar_sec),
            k_off: ScalableQuantity::new(config.k_off_per_sec),
        })
    }
}

impl UpdateModule for ComplexBuildingReaction {
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
        state.resolve(self.binder_topology).is_some()
            && state.resolve(self.bindee_topology).is_some()
    }

    fn is_applicable(&self, ctx: &DeltaContext) -> bool {
        // Without binder and complex there is nothing to associate or
        // dissociate; skipping keeps the net effect exactly zero.
        let Some(binder_subsection) = ctx.resolved(self.binder_topology) else {
            return false;
        };
        ctx.concentration(binder_subsection, self.binder) > 0.0
            || ctx.concentration(binder_subsection, self.complex) > 0.0
    }

    fn rescale(&mut self, step_sec: f64) {
        self.k_on.rescale(step_sec);
        self.k_off.rescale(step_sec);
    }

    fn deltas(
        &self,
        ctx: &DeltaContext,
        out: &mut DeltaAccumulator,
    ) -> Result<(), SimulationError> {
        let binder_subsection = ctx.require_resolved(self.binder_topology, self.binder)?;
        let bindee_subsection = ctx.require_resolved(self.bindee_topology, self.bindee)?;

        let binder = ctx.concentration(binder_subsection, self.binder);
        let bindee = ctx.concentration(bindee_subsection, self.bindee);
        let complex = ctx.concentration(binder_subsection, self.complex);

        let velocity =
            self.k_on.value(ctx.step) * binder * bindee - self.k_off.value(ctx.step) * complex;
        if velocity == 0.0 {
            return Ok(());
        }

        out.add(ctx.updatable, binder_subsection, self.binder, -velocity);
        out.add(ctx.updatable, bindee_subsection, self.bindee, -velocity);
        out.add(ctx.updatable, binder_subsection, self.complex, velocity);
        Ok(())
    }
}
