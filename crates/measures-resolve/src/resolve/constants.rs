//! Quantity constants.
//!
//! Binds each constant of a flattened quantity to a visible unit instance and
//! checks that neither the constant nor its multiples property collides with
//! names the generated type already uses.

use std::collections::HashMap;

use indexmap::IndexSet;
use measures_ast::{ConstantValue, Locator, QuantityKind, RawConstant, Setting, TypeId};
use serde::Serialize;

use crate::error::{Diagnostic, ErrorKind};
use crate::resolve::registry::Registry;
use crate::resolve::settings::ResolutionSettings;
use crate::resolve::specialization::{FlatQuantity, Sourced};
use crate::resolve::units::ResolvedUnit;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConstant {
    pub name: String,
    pub unit_instance: String,
    pub value: ConstantValue,
    /// Name of the multiples property, if one is generated.
    pub multiples: Option<String>,
    /// Quantity that declared the constant.
    pub owner: TypeId,
    pub locator: Locator,
}

/// Resolves the constants of `quantity` in flattened order.
pub fn resolve_constants(
    quantity: &FlatQuantity,
    unit: &ResolvedUnit,
    visible: &IndexSet<String>,
    registry: &Registry,
    settings: &ResolutionSettings,
    errors: &mut Vec<Diagnostic>,
) -> Vec<ResolvedConstant> {
    let reserved = reserved_names(quantity, unit, visible, registry);
    let mut taken: HashMap<String, Locator> = HashMap::new();
    let mut resolved = Vec::new();

    for sourced in &quantity.constants {
        let owned = quantity.owns(sourced);
        let constant = &sourced.item;
        let report = |kind: ErrorKind, message: String| {
            constant_diagnostic(sourced, owned, kind, message)
        };

        if !check_value(quantity, constant, owned, errors) {
            continue;
        }

        if !visible.contains(&constant.unit_instance) {
            errors.push(report(
                ErrorKind::UnrecognizedUnitInstance,
                format!(
                    "constant '{}' is expressed in '{}', which is not a visible instance of '{}'",
                    constant.name, constant.unit_instance, unit.id
                ),
            ));
            continue;
        }

        if let Some(holder) = reserved.get(constant.name.as_str()) {
            errors.push(report(
                ErrorKind::ConstantSharesName,
                format!(
                    "constant '{}' of '{}' shares its name with {}",
                    constant.name, quantity.id, holder
                ),
            ));
            continue;
        }

        if let Some(first) = taken.get(&constant.name) {
            errors.push(
                report(
                    ErrorKind::DuplicateConstantName,
                    format!("'{}' already names a member of '{}'", constant.name, quantity.id),
                )
                .with_label(*first, "first used here".to_string()),
            );
            continue;
        }
        taken.insert(constant.name.clone(), constant.locator);

        let multiples = multiples_name(constant, settings).and_then(|multiples| {
            if let Some(holder) = reserved.get(multiples.as_str()) {
                errors.push(report(
                    ErrorKind::ConstantMultiplesSharesName,
                    format!(
                        "multiples '{}' of constant '{}' shares its name with {}",
                        multiples, constant.name, holder
                    ),
                ));
                return None;
            }
            if let Some(first) = taken.get(&multiples) {
                errors.push(
                    report(
                        ErrorKind::DuplicateConstantName,
                        format!(
                            "multiples '{}' of constant '{}' already names a member of '{}'",
                            multiples, constant.name, quantity.id
                        ),
                    )
                    .with_label(*first, "first used here".to_string()),
                );
                return None;
            }
            taken.insert(multiples.clone(), constant.locator);
            Some(multiples)
        });

        resolved.push(ResolvedConstant {
            name: constant.name.clone(),
            unit_instance: constant.unit_instance.clone(),
            value: constant.value.clone(),
            multiples,
            owner: sourced.owner.clone(),
            locator: constant.locator,
        });
    }

    resolved
}

/// Own failures are errors; failures of inherited constants are warnings
/// pointing at the declaring quantity.
fn constant_diagnostic(
    sourced: &Sourced<RawConstant>,
    owned: bool,
    kind: ErrorKind,
    message: String,
) -> Diagnostic {
    if owned {
        Diagnostic::error(kind, sourced.item.locator, message)
    } else {
        Diagnostic::warning(kind, sourced.item.locator, message)
            .with_note(format!("inherited from '{}'", sourced.owner))
    }
}

/// Names a constant may not take, mapped to a description of their holder.
fn reserved_names<'a>(
    quantity: &'a FlatQuantity,
    unit: &'a ResolvedUnit,
    visible: &IndexSet<String>,
    registry: &'a Registry,
) -> HashMap<&'a str, String> {
    let mut reserved = HashMap::new();
    for raw in registry.units() {
        reserved.insert(raw.id.name(), format!("unit '{}'", raw.id));
    }
    for instance in unit.instances.values() {
        if !visible.contains(&instance.name) {
            continue;
        }
        reserved.insert(
            instance.name.as_str(),
            format!("unit instance '{}'", instance.name),
        );
        reserved.insert(
            instance.plural.as_str(),
            format!("the plural of unit instance '{}'", instance.name),
        );
    }
    reserved.insert(quantity.id.name(), format!("the quantity '{}'", quantity.id));
    reserved
}

fn multiples_name(constant: &RawConstant, settings: &ResolutionSettings) -> Option<String> {
    if !constant.generate_multiples {
        return None;
    }
    match &constant.multiples {
        Setting::Value(name) => Some(name.clone()),
        Setting::Unset => Some(settings.default_multiples_name(&constant.name)),
        Setting::Null => None,
    }
}

/// Scalars hold scalar constants, vectors hold one component per dimension.
/// Vector groups have no constants of their own.
fn check_value(
    quantity: &FlatQuantity,
    constant: &RawConstant,
    owned: bool,
    errors: &mut Vec<Diagnostic>,
) -> bool {
    let problem = match (quantity.kind, &constant.value) {
        (QuantityKind::Scalar, ConstantValue::Scalar(_)) => None,
        (kind, ConstantValue::Vector(components)) if kind.is_vector_like() => {
            let dimension = kind.dimension().unwrap_or_default() as usize;
            (components.len() != dimension).then(|| {
                (
                    ErrorKind::UnexpectedDimension,
                    format!(
                        "constant '{}' has {} components, but '{}' has dimension {}",
                        constant.name,
                        components.len(),
                        quantity.id,
                        dimension
                    ),
                )
            })
        }
        (kind, _) => Some((
            ErrorKind::TypeKindMismatch,
            format!(
                "constant '{}' does not fit '{}', a {}",
                constant.name, quantity.id, kind
            ),
        )),
    };

    match problem {
        None => true,
        Some((kind, message)) => {
            // Inherited constants share the owner's shape and were reported there.
            if owned {
                errors.push(Diagnostic::error(kind, constant.locator, message));
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::instances::{InstanceModifier, ResolvedInstance};
    use indexmap::IndexMap;
    use measures_ast::{Magnitude, RawQuantity, RawUnit};

    fn test_locator(start: u32) -> Locator {
        Locator::new(0, start, start + 1, 1)
    }

    fn make_unit() -> ResolvedUnit {
        let instances = ["Metre", "Foot"]
            .iter()
            .map(|name| {
                (
                    name.to_string(),
                    ResolvedInstance {
                        name: name.to_string(),
                        plural: if *name == "Foot" {
                            "Feet".to_string()
                        } else {
                            format!("{}s", name)
                        },
                        modifier: InstanceModifier::Fixed,
                        original: None,
                        scale: Magnitude::ONE,
                        offset: Magnitude::ZERO,
                        locator: test_locator(0),
                    },
                )
            })
            .collect::<IndexMap<_, _>>();
        ResolvedUnit {
            id: TypeId::from("UnitOfLength"),
            quantity: TypeId::from("Length"),
            bias_term: false,
            instances,
            derivations: Vec::new(),
            locator: test_locator(0),
        }
    }

    fn make_quantity(
        id: &str,
        kind: QuantityKind,
        constants: Vec<Sourced<RawConstant>>,
    ) -> FlatQuantity {
        FlatQuantity {
            id: TypeId::from(id),
            kind,
            original: None,
            base: TypeId::from(id),
            unit: TypeId::from("UnitOfLength"),
            biased: false,
            scalar: None,
            default_unit: None,
            default_symbol: None,
            implement_sum: true,
            implement_difference: true,
            difference: None,
            powers: Vec::new(),
            operations: Vec::new(),
            conversions: Vec::new(),
            constants,
            unit_levels: Vec::new(),
            resizes: Vec::new(),
            derivations: Vec::new(),
            locator: test_locator(0),
        }
    }

    fn resolve(
        quantity: &FlatQuantity,
        visible: &[&str],
    ) -> (Vec<ResolvedConstant>, Vec<Diagnostic>) {
        let mut errors = Vec::new();
        let registry = Registry::build(
            [
                RawQuantity::base("Length", QuantityKind::Scalar, "UnitOfLength", test_locator(0))
                    .into(),
                RawUnit::new("UnitOfLength", "Length", test_locator(0)).into(),
            ],
            &mut errors,
        );
        let visible: IndexSet<String> = visible.iter().map(|s| s.to_string()).collect();
        let constants = resolve_constants(
            quantity,
            &make_unit(),
            &visible,
            &registry,
            &ResolutionSettings::default(),
            &mut errors,
        );
        (constants, errors)
    }

    fn own(id: &str, constant: RawConstant) -> Sourced<RawConstant> {
        Sourced::new(&TypeId::from(id), constant)
    }

    #[test]
    fn test_constant_binds_visible_instance() {
        let quantity = make_quantity(
            "Length",
            QuantityKind::Scalar,
            vec![own(
                "Length",
                RawConstant::scalar("PlanckLength", "Metre", 1.616e-35, test_locator(1)),
            )],
        );
        let (constants, errors) = resolve(&quantity, &["Metre", "Foot"]);
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(constants[0].multiples.as_deref(), Some("MultiplesOfPlanckLength"));
    }

    #[test]
    fn test_constant_named_like_plural_is_rejected() {
        let quantity = make_quantity(
            "Length",
            QuantityKind::Scalar,
            vec![
                own("Length", RawConstant::scalar("Feet", "Metre", 0.3048, test_locator(1))),
                own("Length", RawConstant::scalar("UnitOfLength", "Metre", 1.0, test_locator(2))),
                own("Length", RawConstant::scalar("Length", "Metre", 1.0, test_locator(3))),
            ],
        );
        let (constants, errors) = resolve(&quantity, &["Metre", "Foot"]);
        assert!(constants.is_empty());
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| e.kind == ErrorKind::ConstantSharesName));
    }

    #[test]
    fn test_hidden_instances_do_not_reserve_names() {
        let quantity = make_quantity(
            "Length",
            QuantityKind::Scalar,
            vec![own("Length", RawConstant::scalar("Feet", "Metre", 0.3048, test_locator(1)))],
        );
        let (constants, errors) = resolve(&quantity, &["Metre"]);
        assert!(errors.is_empty());
        assert_eq!(constants.len(), 1);
    }

    #[test]
    fn test_invisible_unit_instance() {
        let quantity = make_quantity(
            "Distance",
            QuantityKind::Scalar,
            vec![
                own("Length", RawConstant::scalar("Mile", "Foot", 5280.0, test_locator(1))),
                own("Distance", RawConstant::scalar("League", "Foot", 15840.0, test_locator(2))),
            ],
        );
        let (constants, errors) = resolve(&quantity, &["Metre"]);
        assert!(constants.is_empty());
        assert!(!errors[0].is_error());
        assert!(errors[1].is_error());
        assert!(errors
            .iter()
            .all(|e| e.kind == ErrorKind::UnrecognizedUnitInstance));
    }

    #[test]
    fn test_multiples_collision_keeps_constant() {
        let quantity = make_quantity(
            "Length",
            QuantityKind::Scalar,
            vec![
                own(
                    "Length",
                    RawConstant::scalar("Marathon", "Metre", 42195.0, test_locator(1))
                        .with_multiples("Metres"),
                ),
                own(
                    "Length",
                    RawConstant::scalar("Lap", "Metre", 400.0, test_locator(2))
                        .with_multiples("Marathon"),
                ),
                own(
                    "Length",
                    RawConstant::scalar("Pitch", "Metre", 105.0, test_locator(3))
                        .without_multiples(),
                ),
            ],
        );
        let (constants, errors) = resolve(&quantity, &["Metre", "Foot"]);
        assert_eq!(constants.len(), 3);
        assert!(constants.iter().all(|c| c.multiples.is_none()));
        let kinds: Vec<_> = errors.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [
                ErrorKind::ConstantMultiplesSharesName,
                ErrorKind::DuplicateConstantName,
            ]
        );
    }

    #[test]
    fn test_vector_constant_dimension() {
        let quantity = make_quantity(
            "Position",
            QuantityKind::Vector { dimension: 3 },
            vec![
                own(
                    "Position",
                    RawConstant::vector(
                        "Origin",
                        "Metre",
                        vec![Magnitude::ZERO, Magnitude::ZERO, Magnitude::ZERO],
                        test_locator(1),
                    ),
                ),
                own(
                    "Position",
                    RawConstant::vector("Flat", "Metre", vec![Magnitude::ONE], test_locator(2)),
                ),
                own("Position", RawConstant::scalar("Scalar", "Metre", 1.0, test_locator(3))),
            ],
        );
        let (constants, errors) = resolve(&quantity, &["Metre"]);
        assert_eq!(constants.len(), 1);
        let kinds: Vec<_> = errors.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [ErrorKind::UnexpectedDimension, ErrorKind::TypeKindMismatch]
        );
    }
}
