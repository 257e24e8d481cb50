//! Derivation signatures and derived unit instances.
//!
//! A derivation signature states that a type can be computed from an ordered
//! tuple of other types, e.g. `UnitOfSpeed = {0} / {1}` over
//! `(UnitOfLength, UnitOfTime)`. Units and quantities declare signatures the
//! same way; units additionally declare derived instances that bind one
//! instance of each signature position (`MetrePerSecond = Metre / Second`).
//!
//! # Pipeline Position
//!
//! ```text
//! Registry → Derivations → Instance Chains → Specialization → Filters → Assembly
//!            ^^^^^^^^^^^
//! ```

use std::collections::HashSet;

use indexmap::IndexMap;
use measures_ast::{
    Locator, Magnitude, RawDerivation, RawInstanceKind, RawUnit, RawUnitInstance, TypeId,
};
use regex::Regex;
use serde::Serialize;

use crate::error::{Diagnostic, ErrorKind, ResolveError};
use crate::resolve::registry::Registry;
use crate::resolve::units::ResolvedUnit;

/// A validated derivation signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDerivation {
    pub id: Option<String>,
    pub expression: String,
    pub signature: Vec<TypeId>,
    pub permutations: bool,
    pub locator: Locator,
}

/// Selected signature and bound instances of a derived unit instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedBinding {
    pub derivation: Option<String>,
    /// One `(unit, instance)` pair per signature position, in signature
    /// order.
    pub instances: Vec<(TypeId, String)>,
    /// The derivation expression with every placeholder substituted by the
    /// bound instance name.
    pub scale: Magnitude,
}

/// Compiled `{N}` placeholder pattern for derivation expressions.
#[derive(Debug, Clone)]
pub struct Placeholders {
    pattern: Regex,
}

impl Placeholders {
    pub fn new() -> Result<Self, ResolveError> {
        Ok(Self {
            pattern: Regex::new(r"\{(\d+)\}")?,
        })
    }

    /// Indices referenced by `expression`, in order of appearance.
    ///
    /// An index too large to represent is reported as `None`.
    pub fn indices(&self, expression: &str) -> Vec<Option<usize>> {
        self.pattern
            .captures_iter(expression)
            .map(|caps| caps.get(1).and_then(|m| m.as_str().parse().ok()))
            .collect()
    }

    /// Replaces `{N}` with `arguments[N]`; out-of-range placeholders are kept.
    pub fn substitute(&self, expression: &str, arguments: &[String]) -> String {
        self.pattern
            .replace_all(expression, |caps: &regex::Captures<'_>| {
                caps.get(1)
                    .and_then(|m| m.as_str().parse::<usize>().ok())
                    .and_then(|index| arguments.get(index))
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

/// Validates the derivation signatures declared on `owner`.
///
/// `member` checks one signature member, reporting why it is unusable.
/// Invalid signatures are dropped individually; the remaining ones keep
/// declaration order.
pub fn resolve_signatures<F>(
    owner: &TypeId,
    declared: &[RawDerivation],
    mut member: F,
    placeholders: &Placeholders,
    errors: &mut Vec<Diagnostic>,
) -> Vec<ResolvedDerivation>
where
    F: FnMut(&TypeId, Locator, &mut Vec<Diagnostic>) -> bool,
{
    let mut resolved: Vec<ResolvedDerivation> = Vec::new();

    for derivation in declared {
        if derivation.signature.is_empty() {
            errors.push(Diagnostic::error(
                ErrorKind::InvalidDerivationSignature,
                derivation.locator,
                format!("derivation of '{}' has an empty signature", owner),
            ));
            continue;
        }

        if declared.len() > 1 && derivation.id.is_none() {
            errors.push(
                Diagnostic::error(
                    ErrorKind::AmbiguousDerivationSignature,
                    derivation.locator,
                    format!(
                        "'{}' declares {} derivations; each needs an id",
                        owner,
                        declared.len()
                    ),
                )
                .with_note("derived instances select a derivation by its id".to_string()),
            );
            continue;
        }

        let mut references_resolved = true;
        for id in &derivation.signature {
            references_resolved &= member(id, derivation.locator, errors);
        }
        if !references_resolved {
            continue;
        }

        if !validate_expression(owner, derivation, placeholders, errors) {
            continue;
        }

        if let Some(id) = &derivation.id {
            if let Some(first) = resolved.iter().find(|d| d.id.as_ref() == Some(id)) {
                errors.push(
                    Diagnostic::error(
                        ErrorKind::DuplicateDerivation,
                        derivation.locator,
                        format!("duplicate derivation id '{}' on '{}'", id, owner),
                    )
                    .with_label(first.locator, "first declared here".to_string()),
                );
                continue;
            }
        }

        if let Some(first) = resolved
            .iter()
            .find(|d| same_signature(d, &derivation.signature, derivation.permutations))
        {
            errors.push(
                Diagnostic::error(
                    ErrorKind::DuplicateDerivation,
                    derivation.locator,
                    format!(
                        "'{}' already declares a derivation from ({})",
                        owner,
                        format_signature(&derivation.signature)
                    ),
                )
                .with_label(first.locator, "first declared here".to_string()),
            );
            continue;
        }

        resolved.push(ResolvedDerivation {
            id: derivation.id.clone(),
            expression: derivation.expression.clone(),
            signature: derivation.signature.clone(),
            permutations: derivation.permutations,
            locator: derivation.locator,
        });
    }

    resolved
}

/// Every placeholder must be in range and every position referenced.
fn validate_expression(
    owner: &TypeId,
    derivation: &RawDerivation,
    placeholders: &Placeholders,
    errors: &mut Vec<Diagnostic>,
) -> bool {
    let arity = derivation.signature.len();
    let mut referenced = vec![false; arity];
    let mut valid = true;

    for index in placeholders.indices(&derivation.expression) {
        match index {
            Some(index) if index < arity => referenced[index] = true,
            _ => {
                errors.push(Diagnostic::error(
                    ErrorKind::InvalidDerivationExpression,
                    derivation.locator,
                    format!(
                        "expression '{}' of '{}' references a position outside \
                         its {} element signature",
                        derivation.expression, owner, arity
                    ),
                ));
                valid = false;
            }
        }
    }

    if let Some(missing) = referenced.iter().position(|r| !r) {
        errors.push(Diagnostic::error(
            ErrorKind::InvalidDerivationExpression,
            derivation.locator,
            format!(
                "expression '{}' of '{}' never references position {{{}}}",
                derivation.expression, owner, missing
            ),
        ));
        valid = false;
    }

    valid
}

fn same_signature(existing: &ResolvedDerivation, signature: &[TypeId], permutations: bool) -> bool {
    if existing.signature.len() != signature.len() {
        return false;
    }
    if existing.permutations || permutations {
        let mut a: Vec<&TypeId> = existing.signature.iter().collect();
        let mut b: Vec<&TypeId> = signature.iter().collect();
        a.sort();
        b.sort();
        a == b
    } else {
        existing.signature == signature
    }
}

pub(crate) fn format_signature(signature: &[TypeId]) -> String {
    signature
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validates the signatures of a unit.
///
/// A unit with a bias term cannot be derived; its signatures are dropped.
pub fn resolve_unit_signatures(
    unit: &RawUnit,
    registry: &Registry,
    placeholders: &Placeholders,
    errors: &mut Vec<Diagnostic>,
) -> Vec<ResolvedDerivation> {
    if unit.bias_term && !unit.derivations.is_empty() {
        errors.push(Diagnostic::error(
            ErrorKind::UnitIncludesBiasTerm,
            unit.derivations[0].locator,
            format!(
                "'{}' includes a bias term and cannot declare derivations",
                unit.id
            ),
        ));
        return Vec::new();
    }

    resolve_signatures(
        &unit.id,
        &unit.derivations,
        |id, locator, errors| registry.expect_unit(id, locator, errors).is_some(),
        placeholders,
        errors,
    )
}

/// Binds every derived instance of `unit` against its validated signatures,
/// keyed by instance name.
///
/// `declared` is the unit's instance index with duplicates already removed,
/// so a dropped duplicate never binds. Signature members are bound against
/// `units`, the units resolved so far; an instance that failed in its own
/// unit cannot be bound. Instances that fail are absent from the result.
pub fn resolve_derived_instances(
    unit: &RawUnit,
    declared: &IndexMap<&str, &RawUnitInstance>,
    signatures: &[ResolvedDerivation],
    units: &IndexMap<TypeId, ResolvedUnit>,
    registry: &Registry,
    placeholders: &Placeholders,
    errors: &mut Vec<Diagnostic>,
) -> IndexMap<String, DerivedBinding> {
    let mut bindings = IndexMap::new();

    for &instance in declared.values() {
        if let RawInstanceKind::Derived {
            derivation,
            instances,
        } = &instance.kind
        {
            let binder = Binder {
                unit,
                instance,
                signatures,
                units,
                registry,
                placeholders,
            };
            if let Some(binding) = binder.bind(derivation.as_deref(), instances, errors) {
                bindings.insert(instance.name.clone(), binding);
            }
        }
    }

    bindings
}

struct Binder<'a> {
    unit: &'a RawUnit,
    instance: &'a RawUnitInstance,
    signatures: &'a [ResolvedDerivation],
    units: &'a IndexMap<TypeId, ResolvedUnit>,
    registry: &'a Registry,
    placeholders: &'a Placeholders,
}

impl Binder<'_> {
    fn bind(
        &self,
        derivation: Option<&str>,
        names: &[String],
        errors: &mut Vec<Diagnostic>,
    ) -> Option<DerivedBinding> {
        let instance = self.instance;
        let selected = select_signature(self.unit, instance, derivation, self.signatures, errors)?;

        if names.len() != selected.signature.len() {
            errors.push(Diagnostic::error(
                ErrorKind::IncompatibleDerivedUnitListSize,
                instance.locator,
                format!(
                    "derived instance '{}' lists {} unit instances, \
                     but the derivation ({}) expects {}",
                    instance.name,
                    names.len(),
                    format_signature(&selected.signature),
                    selected.signature.len()
                ),
            ));
            return None;
        }

        // candidates[i]: signature positions whose unit resolved names[i]
        let candidates: Vec<Vec<usize>> = names
            .iter()
            .map(|name| {
                selected
                    .signature
                    .iter()
                    .enumerate()
                    .filter(|(_, unit_id)| self.resolves_instance(unit_id, name))
                    .map(|(position, _)| position)
                    .collect()
            })
            .collect();

        let assignment = if selected.permutations {
            find_assignment(&candidates)
        } else {
            let in_order = candidates
                .iter()
                .enumerate()
                .all(|(i, positions)| positions.contains(&i));
            in_order.then(|| (0..names.len()).collect())
        };

        let Some(assignment) = assignment else {
            errors.push(self.unbindable(selected, names, &candidates));
            return None;
        };

        // assignment[i] is the signature position bound to names[i]
        let mut bound = vec![String::new(); names.len()];
        for (i, position) in assignment.iter().enumerate() {
            bound[*position] = names[i].clone();
        }

        Some(DerivedBinding {
            derivation: selected.id.clone(),
            instances: selected
                .signature
                .iter()
                .cloned()
                .zip(bound.iter().cloned())
                .collect(),
            scale: Magnitude::Expression(
                self.placeholders.substitute(&selected.expression, &bound),
            ),
        })
    }

    fn resolves_instance(&self, unit: &TypeId, name: &str) -> bool {
        self.units
            .get(unit)
            .is_some_and(|unit| unit.instances.contains_key(name))
    }

    fn unbindable(
        &self,
        selected: &ResolvedDerivation,
        names: &[String],
        candidates: &[Vec<usize>],
    ) -> Diagnostic {
        let offending = candidates
            .iter()
            .enumerate()
            .find(|(i, positions)| {
                positions.is_empty() || (!selected.permutations && !positions.contains(i))
            })
            .map(|(i, _)| i)
            .unwrap_or(0);
        let name = &names[offending];

        let mut diagnostic = Diagnostic::error(
            ErrorKind::IncompatibleDerivedUnitInstance,
            self.instance.locator,
            format!(
                "derived instance '{}' cannot bind '{}' to the derivation ({})",
                self.instance.name,
                name,
                format_signature(&selected.signature)
            ),
        );

        // Declared by a signature unit, but excluded while resolving it
        let excluded = selected.signature.iter().find(|unit_id| {
            !self.resolves_instance(unit_id, name)
                && self
                    .registry
                    .unit(unit_id)
                    .is_some_and(|unit| unit.instances.iter().any(|i| i.name == *name))
        });
        if let Some(unit_id) = excluded {
            diagnostic = diagnostic.with_note(format!(
                "'{}' of '{}' could not be resolved",
                name, unit_id
            ));
        }
        diagnostic
    }
}

fn select_signature<'a>(
    unit: &RawUnit,
    instance: &RawUnitInstance,
    derivation: Option<&str>,
    signatures: &'a [ResolvedDerivation],
    errors: &mut Vec<Diagnostic>,
) -> Option<&'a ResolvedDerivation> {
    match derivation {
        Some(id) => {
            let found = signatures.iter().find(|s| s.id.as_deref() == Some(id));
            if found.is_none() {
                errors.push(Diagnostic::error(
                    ErrorKind::UnrecognizedDerivation,
                    instance.locator,
                    format!("'{}' has no derivation with id '{}'", unit.id, id),
                ));
            }
            found
        }
        None => match signatures {
            [] => {
                errors.push(Diagnostic::error(
                    ErrorKind::UnrecognizedDerivation,
                    instance.locator,
                    format!(
                        "derived instance '{}' requires '{}' to declare a derivation",
                        instance.name, unit.id
                    ),
                ));
                None
            }
            [single] => Some(single),
            _ => {
                errors.push(
                    Diagnostic::error(
                        ErrorKind::AmbiguousDerivationSignature,
                        instance.locator,
                        format!(
                            "derived instance '{}' does not specify which of the {} \
                             derivations of '{}' it uses",
                            instance.name,
                            signatures.len(),
                            unit.id
                        ),
                    )
                    .with_note(format!(
                        "available derivations: {}",
                        signatures
                            .iter()
                            .filter_map(|s| s.id.as_deref())
                            .collect::<Vec<_>>()
                            .join(", ")
                    )),
                );
                None
            }
        },
    }
}

/// Finds a perfect matching of names to signature positions, preferring the
/// declared order.
fn find_assignment(candidates: &[Vec<usize>]) -> Option<Vec<usize>> {
    fn assign(
        index: usize,
        candidates: &[Vec<usize>],
        taken: &mut HashSet<usize>,
        current: &mut Vec<usize>,
    ) -> bool {
        let Some(positions) = candidates.get(index) else {
            return true;
        };
        // Declared position first
        let ordered = positions
            .iter()
            .filter(|p| **p == index)
            .chain(positions.iter().filter(|p| **p != index));
        for &position in ordered {
            if taken.insert(position) {
                current.push(position);
                if assign(index + 1, candidates, taken, current) {
                    return true;
                }
                current.pop();
                taken.remove(&position);
            }
        }
        false
    }

    let mut taken = HashSet::new();
    let mut current = Vec::with_capacity(candidates.len());
    assign(0, candidates, &mut taken, &mut current).then_some(current)
}
