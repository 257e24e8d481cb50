//! Unit resolution.
//!
//! A unit is resolved in two steps. Preparation checks what the unit
//! measures and validates its derivation signatures. Resolution then binds
//! derived instances and walks modifier chains. Derived instances bind
//! instances of other units, so units are resolved depth by depth: a unit
//! only after every unit its signatures reference. Units of one depth are
//! independent and may run in parallel.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use measures_ast::{Locator, QuantityKind, RawUnit, TypeId};
use serde::Serialize;
use tracing::debug;

use crate::error::{Diagnostic, ErrorKind, ResolveError};
use crate::resolve::context::ResolutionContext;
use crate::resolve::derivations::{
    format_signature, resolve_derived_instances, resolve_unit_signatures, Placeholders,
    ResolvedDerivation,
};
use crate::resolve::instances::{index_instances, resolve_instances, ResolvedInstance};
use crate::resolve::registry::Registry;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedUnit {
    pub id: TypeId,
    /// Scalar quantity measured by the unit.
    pub quantity: TypeId,
    pub bias_term: bool,
    pub instances: IndexMap<String, ResolvedInstance>,
    pub derivations: Vec<ResolvedDerivation>,
    pub locator: Locator,
}

impl ResolvedUnit {
    pub fn instance(&self, name: &str) -> Option<&ResolvedInstance> {
        self.instances.get(name)
    }
}

/// A usable unit with validated signatures, waiting for the units those
/// signatures reference.
#[derive(Debug, Clone)]
pub struct PreparedUnit<'a> {
    pub unit: &'a RawUnit,
    pub derivations: Vec<ResolvedDerivation>,
}

impl PreparedUnit<'_> {
    /// Units referenced by the signatures, each once.
    fn dependencies(&self) -> Vec<TypeId> {
        let unique: IndexSet<&TypeId> = self
            .derivations
            .iter()
            .flat_map(|derivation| &derivation.signature)
            .collect();
        unique.into_iter().cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Resolves every unit in `registry`, keyed by identity in declaration
/// order.
pub fn resolve_units(
    registry: &Registry,
    placeholders: &Placeholders,
    ctx: &ResolutionContext<'_>,
    errors: &mut Vec<Diagnostic>,
) -> Result<IndexMap<TypeId, ResolvedUnit>, ResolveError> {
    let raw: Vec<&RawUnit> = registry.units().collect();
    let results = ctx.map_each(&raw, |unit| {
        let mut errors = Vec::new();
        let prepared = prepare_unit(*unit, registry, placeholders, &mut errors);
        (prepared, errors)
    })?;

    let mut prepared = Vec::with_capacity(results.len());
    for (unit, mut unit_errors) in results {
        errors.append(&mut unit_errors);
        prepared.extend(unit);
    }

    let levels = plan_units(prepared, errors);
    debug!(depths = levels.len(), "planned units");

    let mut resolved: IndexMap<TypeId, ResolvedUnit> = IndexMap::with_capacity(raw.len());
    for level in &levels {
        let results = ctx.map_each(level, |unit| {
            let mut errors = Vec::new();
            let unit = resolve_unit(unit, &resolved, registry, placeholders, &mut errors);
            (unit, errors)
        })?;
        for (unit, mut unit_errors) in results {
            errors.append(&mut unit_errors);
            resolved.insert(unit.id.clone(), unit);
        }
    }

    // Declaration order, not depth order
    Ok(raw
        .iter()
        .filter_map(|unit| resolved.swap_remove_entry(&unit.id))
        .collect())
}

/// Checks that `unit` measures a declared scalar and validates its
/// signatures.
///
/// Returns `None` only when the unit itself is unusable. Invalid
/// signatures are dropped individually.
pub fn prepare_unit<'a>(
    unit: &'a RawUnit,
    registry: &Registry,
    placeholders: &Placeholders,
    errors: &mut Vec<Diagnostic>,
) -> Option<PreparedUnit<'a>> {
    let quantity = registry.expect_quantity(&unit.quantity, unit.locator, errors)?;
    if quantity.kind != QuantityKind::Scalar {
        errors.push(Diagnostic::error(
            ErrorKind::TypeKindMismatch,
            unit.locator,
            format!(
                "'{}' must measure a scalar quantity, but '{}' is a {}",
                unit.id, quantity.id, quantity.kind
            ),
        ));
        return None;
    }

    Some(PreparedUnit {
        unit,
        derivations: resolve_unit_signatures(unit, registry, placeholders, errors),
    })
}

/// Groups prepared units by derivation depth.
///
/// A unit whose signatures reference no other unit has depth 0; otherwise
/// its depth is one more than the deepest unit it references. Signatures
/// over units that failed preparation are dropped. Where signatures form a
/// cycle, the signatures closing it are dropped with one diagnostic per
/// cycle, so every remaining unit gets a depth.
pub fn plan_units<'a>(
    prepared: Vec<PreparedUnit<'a>>,
    errors: &mut Vec<Diagnostic>,
) -> Vec<Vec<PreparedUnit<'a>>> {
    let mut pending: IndexMap<TypeId, PreparedUnit<'a>> = prepared
        .into_iter()
        .map(|unit| (unit.unit.id.clone(), unit))
        .collect();

    let usable: IndexSet<TypeId> = pending.keys().cloned().collect();
    for unit in pending.values_mut() {
        let owner = unit.unit;
        unit.derivations.retain(|derivation| {
            let missing = derivation.signature.iter().find(|id| !usable.contains(*id));
            if let Some(missing) = missing {
                errors.push(Diagnostic::error(
                    ErrorKind::UnrecognizedType,
                    derivation.locator,
                    format!(
                        "unit '{}' in the derivation ({}) of '{}' could not be resolved",
                        missing,
                        format_signature(&derivation.signature),
                        owner.id
                    ),
                ));
            }
            missing.is_none()
        });
    }

    let mut analysis = DepthAnalysis {
        pending: &pending,
        marks: HashMap::new(),
        depths: HashMap::new(),
        cuts: Vec::new(),
    };
    for id in &usable {
        analysis.walk(id);
    }
    let DepthAnalysis { depths, cuts, .. } = analysis;

    for cut in cuts {
        let Some(unit) = pending.get_mut(&cut.owner) else {
            continue;
        };
        let locator = unit
            .derivations
            .iter()
            .find(|derivation| derivation.signature.contains(&cut.dependency))
            .map_or(unit.unit.locator, |derivation| derivation.locator);
        let path: Vec<String> = cut.cycle.iter().map(TypeId::to_string).collect();
        errors.push(
            Diagnostic::error(
                ErrorKind::InvalidDerivationSignature,
                locator,
                format!("derivations form a cycle: {}", path.join(" -> ")),
            )
            .with_note(format!(
                "derivations of '{}' over '{}' are dropped",
                cut.owner, cut.dependency
            )),
        );
        unit.derivations
            .retain(|derivation| !derivation.signature.contains(&cut.dependency));
    }

    let mut levels: Vec<Vec<PreparedUnit<'a>>> = Vec::new();
    for (id, unit) in pending {
        let depth = depths.get(&id).copied().unwrap_or(0);
        if levels.len() <= depth {
            levels.resize_with(depth + 1, Vec::new);
        }
        levels[depth].push(unit);
    }
    levels
}

/// Dependency edge that closes a cycle.
struct Cut {
    owner: TypeId,
    dependency: TypeId,
    /// Units on the cycle, starting and ending at `dependency`.
    cycle: Vec<TypeId>,
}

struct Frame {
    id: TypeId,
    dependencies: Vec<TypeId>,
    next: usize,
}

struct DepthAnalysis<'p, 'a> {
    pending: &'p IndexMap<TypeId, PreparedUnit<'a>>,
    marks: HashMap<TypeId, Mark>,
    depths: HashMap<TypeId, usize>,
    cuts: Vec<Cut>,
}

impl DepthAnalysis<'_, '_> {
    /// Depth-first walk with an explicit stack; a dependency still in
    /// progress closes a cycle.
    fn walk(&mut self, start: &TypeId) {
        if self.marks.contains_key(start) {
            return;
        }

        let mut stack = vec![self.enter(start)];
        while let Some(frame) = stack.last_mut() {
            let Some(dependency) = frame.dependencies.get(frame.next).cloned() else {
                // Edges closing a cycle point at units without a depth yet
                let depth = frame
                    .dependencies
                    .iter()
                    .filter_map(|dependency| self.depths.get(dependency))
                    .map(|depth| depth + 1)
                    .max()
                    .unwrap_or(0);
                let id = frame.id.clone();
                stack.pop();
                self.marks.insert(id.clone(), Mark::Done);
                self.depths.insert(id, depth);
                continue;
            };
            frame.next += 1;
            let owner = frame.id.clone();

            match self.marks.get(&dependency).copied() {
                None => stack.push(self.enter(&dependency)),
                Some(Mark::InProgress) => {
                    let mut cycle: Vec<TypeId> = stack
                        .iter()
                        .skip_while(|frame| frame.id != dependency)
                        .map(|frame| frame.id.clone())
                        .collect();
                    cycle.push(dependency.clone());
                    self.cuts.push(Cut {
                        owner,
                        dependency,
                        cycle,
                    });
                }
                Some(Mark::Done) => {}
            }
        }
    }

    fn enter(&mut self, id: &TypeId) -> Frame {
        self.marks.insert(id.clone(), Mark::InProgress);
        Frame {
            id: id.clone(),
            dependencies: self
                .pending
                .get(id)
                .map(PreparedUnit::dependencies)
                .unwrap_or_default(),
            next: 0,
        }
    }
}

/// Binds derived instances against `units` and resolves modifier chains.
///
/// `units` must hold every resolved unit the signatures of `prepared`
/// reference. Problems with single instances only remove those.
pub fn resolve_unit(
    prepared: &PreparedUnit<'_>,
    units: &IndexMap<TypeId, ResolvedUnit>,
    registry: &Registry,
    placeholders: &Placeholders,
    errors: &mut Vec<Diagnostic>,
) -> ResolvedUnit {
    let unit = prepared.unit;
    let declared = index_instances(unit, errors);
    let derived = resolve_derived_instances(
        unit,
        &declared,
        &prepared.derivations,
        units,
        registry,
        placeholders,
        errors,
    );
    let instances = resolve_instances(unit, &declared, &derived, errors);

    ResolvedUnit {
        id: unit.id.clone(),
        quantity: unit.quantity.clone(),
        bias_term: unit.bias_term,
        instances,
        derivations: prepared.derivations.clone(),
        locator: unit.locator,
    }
}
