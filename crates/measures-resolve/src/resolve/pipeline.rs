//! Resolution pipeline.
//!
//! Orchestrates the passes that turn a flat list of raw declarations into a
//! [`Population`] plus diagnostics.

use indexmap::IndexMap;
use measures_ast::{Declaration, TypeId};
use tracing::{debug, info, instrument};

use crate::error::{Diagnostic, ErrorKind, ResolveError};
use crate::resolve::constants::resolve_constants;
use crate::resolve::context::{CancellationToken, ResolutionContext};
use crate::resolve::derivations::Placeholders;
use crate::resolve::inclusion::{resolve_default_unit, visible_instances};
use crate::resolve::population::{Population, ResolvedQuantity};
use crate::resolve::registry::Registry;
use crate::resolve::relations::{index_members, resolve_relations, MemberIndex};
use crate::resolve::settings::ResolutionSettings;
use crate::resolve::specialization::{resolve_specializations, FlatQuantity};
use crate::resolve::units::{resolve_units, ResolvedUnit};

/// Outcome of one resolution run.
///
/// The population is usable even when `diagnostics` contains errors; it
/// holds every entity that resolved cleanly.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub population: Population,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }
}

/// Resolves `declarations` into a population.
///
/// Declaration order does not matter for which entities resolve, only for
/// the order of populations and diagnostics. Fails only when `cancel` fires,
/// or when a declaration carries an identity the front-end should never
/// produce (no segments, or an empty segment); every other problem with the
/// declarations is a diagnostic.
#[instrument(skip_all, fields(declarations = declarations.len(), parallel = settings.parallel))]
pub fn resolve(
    declarations: Vec<Declaration>,
    settings: &ResolutionSettings,
    cancel: &CancellationToken,
) -> Result<Resolution, ResolveError> {
    let ctx = ResolutionContext::new(settings, cancel);
    let mut errors = Vec::new();
    cancel.check()?;

    if let Some(malformed) = declarations.iter().find(|d| !d.id().is_well_formed()) {
        return Err(ResolveError::Contract(format!(
            "declaration at {:?} has the malformed identity '{}'",
            malformed.locator(),
            malformed.id()
        )));
    }

    // 1. Index declarations by identity
    let registry = Registry::build(declarations, &mut errors);
    let placeholders = Placeholders::new()?;
    debug!(entities = registry.len(), "registered declarations");

    // 2. Units, after the units their signatures reference
    let units = resolve_units(&registry, &placeholders, &ctx, &mut errors)?;
    debug!(units = units.len(), "resolved units");

    // 3. Flatten specialization chains, parents before children
    let flat = resolve_specializations(&registry, &units, &ctx, &mut errors)?;
    debug!(quantities = flat.len(), "flattened quantities");

    // 4. Group members by dimension before anything resizes into a group
    let members = index_members(&flat, &mut errors);

    // 5. Per-quantity passes only read finished inputs
    let pending: Vec<&FlatQuantity> = flat.values().collect();
    let results = ctx.map_each(&pending, |quantity| {
        let mut errors = Vec::new();
        let resolved = finish_quantity(
            quantity,
            &flat,
            &units,
            &members,
            &registry,
            &placeholders,
            settings,
            &mut errors,
        );
        (resolved, errors)
    })?;

    let mut quantities = Vec::with_capacity(results.len());
    for (resolved, mut quantity_errors) in results {
        errors.append(&mut quantity_errors);
        quantities.extend(resolved);
    }

    // 6. Assemble
    cancel.check()?;
    let population = Population::assemble(settings.documentation, units, quantities);

    info!(
        units = population.units.len(),
        quantities = population.quantity_count(),
        diagnostics = errors.len(),
        "resolution complete"
    );
    Ok(Resolution {
        population,
        diagnostics: errors,
    })
}

/// Unit filtering, constants and relationships of one flattened quantity.
#[allow(clippy::too_many_arguments)]
fn finish_quantity(
    quantity: &FlatQuantity,
    quantities: &IndexMap<TypeId, FlatQuantity>,
    units: &IndexMap<TypeId, ResolvedUnit>,
    members: &MemberIndex,
    registry: &Registry,
    placeholders: &Placeholders,
    settings: &ResolutionSettings,
    errors: &mut Vec<Diagnostic>,
) -> Option<ResolvedQuantity> {
    let Some(unit) = units.get(&quantity.unit) else {
        errors.push(Diagnostic::error(
            ErrorKind::Internal,
            quantity.locator,
            format!(
                "'{}' was flattened without its unit '{}'",
                quantity.id, quantity.unit
            ),
        ));
        return None;
    };

    let visible_units = visible_instances(quantity, unit, settings, errors);
    let default_unit = resolve_default_unit(quantity, &visible_units, errors);
    let constants = resolve_constants(quantity, unit, &visible_units, registry, settings, errors);
    let relations =
        resolve_relations(quantity, quantities, members, registry, placeholders, errors);

    Some(ResolvedQuantity {
        id: quantity.id.clone(),
        kind: quantity.kind,
        original: quantity.original.clone(),
        base: quantity.base.clone(),
        unit: quantity.unit.clone(),
        biased: quantity.biased,
        visible_units,
        default_unit,
        default_symbol: quantity.default_symbol.clone(),
        implement_sum: quantity.implement_sum,
        implement_difference: quantity.implement_difference,
        difference: relations.difference,
        powers: relations.powers,
        scalar: relations.scalar,
        constants,
        conversions: relations.conversions,
        operations: relations.operations,
        resizes: relations.resizes,
        derivations: relations.derivations,
        members: members.get(&quantity.id).cloned().unwrap_or_default(),
        locator: quantity.locator,
    })
}
