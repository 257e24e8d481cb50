//! Unit instance chain resolution.
//!
//! Every unit instance is either a root (fixed, or derived from other units)
//! or a modification of another instance of the same unit. Resolution walks
//! each modifier chain to its root and composes the transform on the way back
//! down, so that each resolved instance carries `scale` and `offset` with
//!
//! ```text
//! root_magnitude = magnitude * scale + offset
//! ```
//!
//! Chains are walked iteratively with an explicit path, so chain length never
//! affects stack depth. Each instance is marked in progress, resolved or
//! failed; meeting an in-progress instance closes a cycle.

use std::collections::HashMap;

use indexmap::IndexMap;
use measures_ast::{Locator, Magnitude, Prefix, RawInstanceKind, RawUnit, RawUnitInstance};
use serde::Serialize;

use crate::error::{Diagnostic, ErrorKind};
use crate::resolve::derivations::DerivedBinding;

/// Resolved definition of an instance relative to its original.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InstanceModifier {
    Fixed,
    Alias,
    Scaled(Magnitude),
    Prefixed(Prefix),
    Biased(Magnitude),
    Derived(DerivedBinding),
}

/// A unit instance with its composed transform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedInstance {
    pub name: String,
    pub plural: String,
    pub modifier: InstanceModifier,
    /// Direct original, for modified instances.
    pub original: Option<String>,
    pub scale: Magnitude,
    pub offset: Magnitude,
    pub locator: Locator,
}

impl ResolvedInstance {
    /// Converts a magnitude in this instance to the chain root, when the
    /// transform is fully literal.
    pub fn to_root(&self, magnitude: f64) -> Option<f64> {
        Some(magnitude * self.scale.literal()? + self.offset.literal()?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Resolved,
    Failed,
}

/// Resolves all instances of `unit`, keyed by name in declaration order.
///
/// `declared` is the index built by [`index_instances`]. `derived` holds the
/// already-resolved bindings of derived instances; a derived instance
/// without a binding failed earlier and is left out.
pub fn resolve_instances<'a>(
    unit: &'a RawUnit,
    declared: &'a IndexMap<&'a str, &'a RawUnitInstance>,
    derived: &'a IndexMap<String, DerivedBinding>,
    errors: &mut Vec<Diagnostic>,
) -> IndexMap<String, ResolvedInstance> {
    let mut chains = ChainResolver {
        unit,
        declared,
        derived,
        marks: HashMap::new(),
        failures: HashMap::new(),
        resolved: HashMap::new(),
        errors,
    };
    for name in declared.keys() {
        chains.walk(name);
    }

    let mut resolved = chains.resolved;
    declared
        .keys()
        .filter_map(|name| resolved.remove(*name).map(|r| (name.to_string(), r)))
        .collect()
}

/// Indexes instances by name, dropping later duplicates of a name or plural.
pub fn index_instances<'a>(
    unit: &'a RawUnit,
    errors: &mut Vec<Diagnostic>,
) -> IndexMap<&'a str, &'a RawUnitInstance> {
    let mut declared: IndexMap<&str, &RawUnitInstance> = IndexMap::new();
    let mut plurals: HashMap<String, &RawUnitInstance> = HashMap::new();

    for instance in &unit.instances {
        if let Some(first) = declared.get(instance.name.as_str()) {
            errors.push(
                Diagnostic::error(
                    ErrorKind::DuplicateInstanceName,
                    instance.locator,
                    format!(
                        "'{}' already declares an instance named '{}'",
                        unit.id, instance.name
                    ),
                )
                .with_label(first.locator, "first declared here".to_string()),
            );
            continue;
        }

        let plural = instance.plural_form();
        if let Some(first) = plurals.get(&plural) {
            errors.push(
                Diagnostic::error(
                    ErrorKind::DuplicateInstanceName,
                    instance.locator,
                    format!(
                        "plural form '{}' of '{}' is already used by '{}'",
                        plural, instance.name, first.name
                    ),
                )
                .with_label(first.locator, "first declared here".to_string()),
            );
            continue;
        }

        plurals.insert(plural, instance);
        declared.insert(instance.name.as_str(), instance);
    }

    declared
}

struct ChainResolver<'a, 'e> {
    unit: &'a RawUnit,
    declared: &'a IndexMap<&'a str, &'a RawUnitInstance>,
    derived: &'a IndexMap<String, DerivedBinding>,
    marks: HashMap<&'a str, Mark>,
    /// Why a failed instance failed, for diagnostics on its dependants.
    failures: HashMap<&'a str, String>,
    resolved: HashMap<&'a str, ResolvedInstance>,
    errors: &'e mut Vec<Diagnostic>,
}

impl<'a> ChainResolver<'a, '_> {
    fn walk(&mut self, start: &'a str) {
        if self.marks.contains_key(start) {
            return;
        }

        // Follow originals until reaching a root, a settled instance, an
        // unknown name or the current path itself.
        let mut path: Vec<&'a str> = Vec::new();
        let mut current = start;
        loop {
            match self.marks.get(current).copied() {
                Some(Mark::Resolved) | Some(Mark::Failed) => break,
                Some(Mark::InProgress) => {
                    self.fail_cycle(&path, current);
                    break;
                }
                None => {}
            }

            let instance = self.declared[current];
            self.marks.insert(current, Mark::InProgress);
            path.push(current);

            match instance.kind.original() {
                None => break,
                Some(original) => match self.declared.get_key_value(original) {
                    Some((original, _)) => current = *original,
                    None => {
                        self.errors.push(Diagnostic::error(
                            ErrorKind::UnrecognizedOriginalInstance,
                            instance.locator,
                            format!(
                                "unrecognized original unit instance '{}' of '{}' in '{}'",
                                original, instance.name, self.unit.id
                            ),
                        ));
                        self.marks.insert(current, Mark::Failed);
                        let reason = format!("has the unrecognized original '{}'", original);
                        self.failures.insert(current, reason);
                        break;
                    }
                },
            }
        }

        // Compose from the root end of the path back to `start`.
        for &name in path.iter().rev() {
            if self.marks.get(name) != Some(&Mark::InProgress) {
                continue;
            }
            let instance = self.declared[name];
            match self.resolve_one(instance) {
                Some(resolved) => {
                    self.resolved.insert(name, resolved);
                    self.marks.insert(name, Mark::Resolved);
                }
                None => {
                    self.marks.insert(name, Mark::Failed);
                }
            }
        }
    }

    /// Marks the cycle closing at `entry` as failed, with one diagnostic.
    fn fail_cycle(&mut self, path: &[&'a str], entry: &'a str) {
        let start = path.iter().position(|name| *name == entry).unwrap_or(0);
        let members = &path[start..];

        let mut cycle: Vec<&str> = members.to_vec();
        cycle.push(entry);
        let instance = self.declared[entry];
        let mut diagnostic = Diagnostic::error(
            ErrorKind::CyclicallyModifiedInstance,
            instance.locator,
            format!(
                "cyclically modified unit instances in '{}': {}",
                self.unit.id,
                cycle.join(" -> ")
            ),
        );
        for member in members.iter().skip(1) {
            diagnostic = diagnostic.with_label(
                self.declared[*member].locator,
                format!("'{}' is part of the cycle", member),
            );
        }
        self.errors.push(diagnostic);

        for member in members {
            self.marks.insert(*member, Mark::Failed);
            self.failures
                .insert(*member, "is part of a modification cycle".to_string());
        }
    }

    fn resolve_one(&mut self, instance: &'a RawUnitInstance) -> Option<ResolvedInstance> {
        let resolved = |modifier, original: Option<&str>, scale, offset| ResolvedInstance {
            name: instance.name.clone(),
            plural: instance.plural_form(),
            modifier,
            original: original.map(String::from),
            scale,
            offset,
            locator: instance.locator,
        };

        let Some(original) = instance.kind.original() else {
            return match &instance.kind {
                RawInstanceKind::Derived { .. } => {
                    let Some(binding) = self.derived.get(&instance.name).cloned() else {
                        let reason = "could not be bound to its derivation".to_string();
                        self.failures.insert(instance.name.as_str(), reason);
                        return None;
                    };
                    let scale = binding.scale.clone();
                    Some(resolved(
                        InstanceModifier::Derived(binding),
                        None,
                        scale,
                        Magnitude::ZERO,
                    ))
                }
                _ => Some(resolved(
                    InstanceModifier::Fixed,
                    None,
                    Magnitude::ONE,
                    Magnitude::ZERO,
                )),
            };
        };

        let Some(parent) = self.resolved.get(original) else {
            let mut diagnostic = Diagnostic::error(
                ErrorKind::UnrecognizedOriginalInstance,
                instance.locator,
                format!(
                    "original unit instance '{}' of '{}' could not be resolved",
                    original, instance.name
                ),
            );
            if let Some(failed) = self.declared.get(original) {
                diagnostic = diagnostic
                    .with_label(failed.locator, format!("'{}' is declared here", original));
            }
            if let Some(reason) = self.failures.get(original) {
                diagnostic = diagnostic.with_note(format!("'{}' {}", original, reason));
            }
            self.errors.push(diagnostic);
            self.failures.insert(
                &instance.name,
                format!("depends on '{}', which could not be resolved", original),
            );
            return None;
        };
        let (scale, offset) = (&parent.scale, &parent.offset);

        let instance_resolved = match &instance.kind {
            RawInstanceKind::Alias { .. } => resolved(
                InstanceModifier::Alias,
                Some(original),
                scale.clone(),
                offset.clone(),
            ),
            RawInstanceKind::Scaled { scale: factor, .. } => resolved(
                InstanceModifier::Scaled(factor.clone()),
                Some(original),
                factor.times(scale),
                offset.clone(),
            ),
            RawInstanceKind::Prefixed { prefix, .. } => resolved(
                InstanceModifier::Prefixed(*prefix),
                Some(original),
                Magnitude::Literal(prefix.factor()).times(scale),
                offset.clone(),
            ),
            RawInstanceKind::Biased { bias, .. } => {
                if !self.unit.bias_term {
                    self.failures
                        .insert(instance.name.as_str(), "requires a bias term".to_string());
                    self.errors.push(Diagnostic::error(
                        ErrorKind::UnitNotIncludingBiasTerm,
                        instance.locator,
                        format!(
                            "biased instance '{}' requires '{}' to include a bias term",
                            instance.name, self.unit.id
                        ),
                    ));
                    return None;
                }
                resolved(
                    InstanceModifier::Biased(bias.clone()),
                    Some(original),
                    scale.clone(),
                    offset.minus(&bias.times(scale)),
                )
            }
            RawInstanceKind::Fixed | RawInstanceKind::Derived { .. } => {
                // Roots were handled above
                return None;
            }
        };
        Some(instance_resolved)
    }
}
