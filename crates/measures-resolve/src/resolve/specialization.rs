//! Quantity specialization chains.
//!
//! A quantity is either a base (measured in a unit) or a specialization of
//! another quantity of the same family. Resolution happens in two phases:
//!
//! 1. **Planning** walks every chain once, rejecting unknown parents, kind
//!    mismatches and cycles, and assigns each surviving quantity its depth
//!    below its base.
//! 2. **Flattening** processes quantities depth by depth. Every quantity of
//!    one depth only reads completed results of the previous depths, so a
//!    depth is resolved as one batch (in parallel when enabled) and published
//!    once complete.
//!
//! Flattening merges each inheritable category top-down according to the
//! specialization's inherit flags.

use std::collections::HashMap;

use indexmap::IndexMap;
use measures_ast::{
    Locator, Origin, QuantityKind, RawConstant, RawDerivation, RawOperation, RawQuantity,
    RawResize, RawUnitList, Reference, Setting, TypeId,
};
use serde::Serialize;
use tracing::debug;

use crate::error::{Diagnostic, ErrorKind, ResolveError};
use crate::resolve::context::ResolutionContext;
use crate::resolve::registry::Registry;
use crate::resolve::units::ResolvedUnit;

/// An inherited item together with the quantity that declared it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sourced<T> {
    pub owner: TypeId,
    pub item: T,
}

impl<T> Sourced<T> {
    pub fn new(owner: &TypeId, item: T) -> Self {
        Self {
            owner: owner.clone(),
            item,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Power {
    Reciprocal,
    Square,
    Cube,
    SquareRoot,
    CubeRoot,
}

impl Power {
    pub fn name(self) -> &'static str {
        match self {
            Power::Reciprocal => "reciprocal",
            Power::Square => "square",
            Power::Cube => "cube",
            Power::SquareRoot => "square root",
            Power::CubeRoot => "cube root",
        }
    }
}

/// The unit lists declared by one level of a specialization chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitListLevel {
    pub owner: TypeId,
    pub lists: Vec<RawUnitList>,
}

/// A quantity with its specialization chain flattened.
///
/// Inherited list categories hold the parent's items first, followed by the
/// quantity's own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatQuantity {
    pub id: TypeId,
    pub kind: QuantityKind,
    /// Direct specialization parent.
    pub original: Option<TypeId>,
    /// Root of the specialization chain.
    pub base: TypeId,
    pub unit: TypeId,
    pub biased: bool,
    pub scalar: Option<Sourced<TypeId>>,
    pub default_unit: Option<Sourced<String>>,
    pub default_symbol: Option<String>,
    pub implement_sum: bool,
    pub implement_difference: bool,
    pub difference: Option<Sourced<TypeId>>,
    pub powers: Vec<(Power, Sourced<TypeId>)>,
    pub operations: Vec<Sourced<RawOperation>>,
    pub conversions: Vec<Sourced<Reference>>,
    pub constants: Vec<Sourced<RawConstant>>,
    /// Root-to-leaf.
    pub unit_levels: Vec<UnitListLevel>,
    pub resizes: Vec<RawResize>,
    pub derivations: Vec<RawDerivation>,
    pub locator: Locator,
}

impl FlatQuantity {
    /// Whether `item` was declared by this quantity rather than inherited.
    pub fn owns<T>(&self, item: &Sourced<T>) -> bool {
        item.owner == self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Resolved,
    Failed,
}

/// Resolves every quantity in `registry`, keyed by identity in declaration
/// order.
///
/// Quantities that are part of, or depend on, a broken chain are absent.
pub fn resolve_specializations(
    registry: &Registry,
    units: &IndexMap<TypeId, ResolvedUnit>,
    ctx: &ResolutionContext<'_>,
    errors: &mut Vec<Diagnostic>,
) -> Result<IndexMap<TypeId, FlatQuantity>, ResolveError> {
    let levels = plan_specializations(registry, units, errors);
    debug!(depths = levels.len(), "planned specialization chains");

    let mut done: IndexMap<TypeId, FlatQuantity> = IndexMap::new();
    for level in &levels {
        let results = ctx.map_each(level, |raw| {
            let mut errors = Vec::new();
            let parent = original_id(raw).and_then(|id| done.get(id));
            let flat = flatten(raw, parent, units, &mut errors);
            (flat, errors)
        })?;
        for (flat, mut level_errors) in results {
            errors.append(&mut level_errors);
            if let Some(flat) = flat {
                done.insert(flat.id.clone(), flat);
            }
        }
    }

    Ok(registry
        .quantities()
        .filter_map(|raw| done.swap_remove(&raw.id).map(|flat| (raw.id.clone(), flat)))
        .collect())
}

/// Walks every specialization chain and groups the valid quantities by
/// depth below their base.
pub fn plan_specializations<'a>(
    registry: &'a Registry,
    units: &'a IndexMap<TypeId, ResolvedUnit>,
    errors: &mut Vec<Diagnostic>,
) -> Vec<Vec<&'a RawQuantity>> {
    let mut analysis = ChainAnalysis {
        registry,
        units,
        marks: HashMap::new(),
        depths: HashMap::new(),
        errors,
    };
    for quantity in registry.quantities() {
        analysis.walk(quantity);
    }

    let depths = analysis.depths;
    let mut levels: Vec<Vec<&RawQuantity>> = Vec::new();
    for quantity in registry.quantities() {
        if let Some(&depth) = depths.get(&quantity.id) {
            if levels.len() <= depth {
                levels.resize_with(depth + 1, Vec::new);
            }
            levels[depth].push(quantity);
        }
    }
    levels
}

fn original_id(quantity: &RawQuantity) -> Option<&TypeId> {
    quantity.original().and_then(Setting::value)
}

struct ChainAnalysis<'a, 'e> {
    registry: &'a Registry,
    units: &'a IndexMap<TypeId, ResolvedUnit>,
    marks: HashMap<&'a TypeId, Mark>,
    depths: HashMap<&'a TypeId, usize>,
    errors: &'e mut Vec<Diagnostic>,
}

impl<'a> ChainAnalysis<'a, '_> {
    fn walk(&mut self, start: &'a RawQuantity) {
        if self.marks.contains_key(&start.id) {
            return;
        }

        let mut path: Vec<&'a RawQuantity> = Vec::new();
        let mut current = start;
        loop {
            match self.marks.get(&current.id).copied() {
                Some(Mark::Resolved) | Some(Mark::Failed) => break,
                Some(Mark::InProgress) => {
                    self.fail_cycle(&path, current);
                    break;
                }
                None => {}
            }

            self.marks.insert(&current.id, Mark::InProgress);
            path.push(current);

            match self.parent_of(current) {
                Ok(None) => break,
                Ok(Some(parent)) => current = parent,
                Err(()) => {
                    self.marks.insert(&current.id, Mark::Failed);
                    break;
                }
            }
        }

        for &quantity in path.iter().rev() {
            if self.marks.get(&quantity.id) != Some(&Mark::InProgress) {
                continue;
            }
            match self.place(quantity) {
                Some(depth) => {
                    self.depths.insert(&quantity.id, depth);
                    self.marks.insert(&quantity.id, Mark::Resolved);
                }
                None => {
                    self.marks.insert(&quantity.id, Mark::Failed);
                }
            }
        }
    }

    /// Looks up the declared parent, reporting unusable references.
    fn parent_of(&mut self, quantity: &'a RawQuantity) -> Result<Option<&'a RawQuantity>, ()> {
        match quantity.original() {
            None => Ok(None),
            Some(Setting::Value(original)) => self
                .registry
                .expect_quantity(original, quantity.locator, self.errors)
                .map(Some)
                .ok_or(()),
            Some(Setting::Unset) | Some(Setting::Null) => {
                self.errors.push(Diagnostic::error(
                    ErrorKind::UnrecognizedType,
                    quantity.locator,
                    format!(
                        "specialization '{}' does not name its original quantity",
                        quantity.id
                    ),
                ));
                Err(())
            }
        }
    }

    fn fail_cycle(&mut self, path: &[&'a RawQuantity], entry: &'a RawQuantity) {
        let start = path.iter().position(|q| q.id == entry.id).unwrap_or(0);
        let members = &path[start..];

        let mut cycle: Vec<String> = members.iter().map(|q| q.id.to_string()).collect();
        cycle.push(entry.id.to_string());
        let mut diagnostic = Diagnostic::error(
            ErrorKind::CyclicSpecialization,
            entry.locator,
            format!("cyclic specialization: {}", cycle.join(" -> ")),
        );
        for member in members.iter().skip(1) {
            diagnostic = diagnostic.with_label(
                member.locator,
                format!("'{}' is part of the cycle", member.id),
            );
        }
        self.errors.push(diagnostic);

        for &member in members {
            self.marks.insert(&member.id, Mark::Failed);
        }
    }

    /// Depth of `quantity` once its parent is settled.
    fn place(&mut self, quantity: &'a RawQuantity) -> Option<usize> {
        let Some(original) = original_id(quantity) else {
            return self.place_base(quantity).then_some(0);
        };

        let parent = self.registry.quantity(original)?;
        if self.marks.get(&parent.id) != Some(&Mark::Resolved) {
            self.errors.push(Diagnostic::error(
                ErrorKind::UnrecognizedType,
                quantity.locator,
                format!(
                    "original quantity '{}' of '{}' could not be resolved",
                    parent.id, quantity.id
                ),
            ));
            return None;
        }
        if !check_kind(quantity, parent, self.errors) {
            return None;
        }
        self.depths.get(&parent.id).map(|depth| depth + 1)
    }

    fn place_base(&mut self, quantity: &RawQuantity) -> bool {
        let Origin::Base { unit } = &quantity.origin else {
            return false;
        };
        if let QuantityKind::VectorGroupMember { .. } = quantity.kind {
            self.errors.push(Diagnostic::error(
                ErrorKind::TypeKindMismatch,
                quantity.locator,
                format!(
                    "vector group member '{}' must specialize its vector group",
                    quantity.id
                ),
            ));
            return false;
        }
        if self.units.contains_key(unit) {
            return true;
        }
        if self.registry.unit(unit).is_some() {
            self.errors.push(Diagnostic::error(
                ErrorKind::UnrecognizedType,
                quantity.locator,
                format!("unit '{}' of '{}' could not be resolved", unit, quantity.id),
            ));
        } else {
            self.registry
                .expect_unit(unit, quantity.locator, self.errors);
        }
        false
    }
}

/// Specializations stay within their family; vectors keep their dimension
/// and members specialize a vector group.
fn check_kind(quantity: &RawQuantity, parent: &RawQuantity, errors: &mut Vec<Diagnostic>) -> bool {
    match (quantity.kind, parent.kind) {
        (QuantityKind::Scalar, QuantityKind::Scalar)
        | (QuantityKind::VectorGroup, QuantityKind::VectorGroup)
        | (QuantityKind::VectorGroupMember { .. }, QuantityKind::VectorGroup) => true,
        (QuantityKind::Vector { dimension: own }, QuantityKind::Vector { dimension: theirs })
            if own == theirs =>
        {
            true
        }
        (QuantityKind::Vector { dimension: own }, QuantityKind::Vector { dimension: theirs }) => {
            errors.push(Diagnostic::error(
                ErrorKind::UnexpectedDimension,
                quantity.locator,
                format!(
                    "'{}' has dimension {}, but its original quantity '{}' has dimension {}",
                    quantity.id, own, parent.id, theirs
                ),
            ));
            false
        }
        (own, theirs) => {
            errors.push(Diagnostic::error(
                ErrorKind::TypeKindMismatch,
                quantity.locator,
                format!(
                    "'{}' is a {} and cannot specialize '{}', a {}",
                    quantity.id, own, parent.id, theirs
                ),
            ));
            false
        }
    }
}

/// Flattens one quantity against its already-flattened parent.
///
/// `parent` is `None` for bases. Returns `None` when a specialization's
/// parent is missing or a base's unit is.
pub fn flatten(
    raw: &RawQuantity,
    parent: Option<&FlatQuantity>,
    units: &IndexMap<TypeId, ResolvedUnit>,
    errors: &mut Vec<Diagnostic>,
) -> Option<FlatQuantity> {
    let id = &raw.id;
    let own = |setting: &Setting<TypeId>| {
        setting.clone().or_inherit(None).map(|t| Sourced::new(id, t))
    };

    let (base, unit, biased) = match (&raw.origin, parent) {
        (Origin::Base { unit }, _) => {
            let resolved = units.get(unit)?;
            let mut biased = raw.biased && raw.kind.is_scalar();
            if biased && !resolved.bias_term {
                errors.push(Diagnostic::error(
                    ErrorKind::UnitNotIncludingBiasTerm,
                    raw.locator,
                    format!(
                        "biased scalar '{}' requires '{}' to include a bias term",
                        id, unit
                    ),
                ));
                biased = false;
            }
            (id.clone(), unit.clone(), biased)
        }
        (Origin::Specialization { .. }, Some(parent)) => {
            (parent.base.clone(), parent.unit.clone(), parent.biased)
        }
        (Origin::Specialization { .. }, None) => return None,
    };

    let inherit = raw.inherit;
    let from_parent = |enabled: bool| parent.filter(|_| enabled);

    let mut operations = from_parent(inherit.operations)
        .map(|p| p.operations.clone())
        .unwrap_or_default();
    operations.extend(raw.operations.iter().cloned().map(|op| Sourced::new(id, op)));

    let mut conversions = from_parent(inherit.conversions)
        .map(|p| p.conversions.clone())
        .unwrap_or_default();
    conversions.extend(raw.conversions.iter().cloned().map(|c| Sourced::new(id, c)));

    // Closer declarations replace inherited constants of the same name.
    let mut constants: Vec<Sourced<RawConstant>> = from_parent(inherit.constants)
        .map(|p| {
            p.constants
                .iter()
                .filter(|c| raw.constants.iter().all(|declared| declared.name != c.item.name))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    constants.extend(raw.constants.iter().cloned().map(|c| Sourced::new(id, c)));

    let mut unit_levels = from_parent(inherit.units)
        .map(|p| p.unit_levels.clone())
        .unwrap_or_default();
    if !raw.unit_lists.is_empty() {
        unit_levels.push(UnitListLevel {
            owner: id.clone(),
            lists: raw.unit_lists.clone(),
        });
    }

    let inherited = |pick: fn(&FlatQuantity) -> Option<Sourced<TypeId>>| parent.and_then(pick);
    let search = |setting: &Setting<TypeId>, inherited: Option<Sourced<TypeId>>| match setting {
        Setting::Unset => inherited,
        Setting::Null | Setting::Value(_) => own(setting),
    };

    let declared_powers = [
        (Power::Reciprocal, &raw.powers.reciprocal),
        (Power::Square, &raw.powers.square),
        (Power::Cube, &raw.powers.cube),
        (Power::SquareRoot, &raw.powers.square_root),
        (Power::CubeRoot, &raw.powers.cube_root),
    ];
    let powers = declared_powers
        .into_iter()
        .filter_map(|(power, setting)| {
            let parent_power = parent.and_then(|p| {
                p.powers
                    .iter()
                    .find(|(candidate, _)| *candidate == power)
                    .map(|(_, target)| target.clone())
            });
            search(setting, parent_power).map(|target| (power, target))
        })
        .collect();

    let default_unit = match &raw.default_unit {
        Setting::Value(instance) => Some(Sourced::new(id, instance.clone())),
        Setting::Null => None,
        Setting::Unset => parent.and_then(|p| p.default_unit.clone()),
    };
    let default_symbol = raw
        .default_symbol
        .clone()
        .or_inherit(parent.and_then(|p| p.default_symbol.clone()));

    Some(FlatQuantity {
        id: id.clone(),
        kind: raw.kind,
        original: parent.map(|p| p.id.clone()),
        base,
        unit,
        biased,
        scalar: search(&raw.scalar, inherited(|p| p.scalar.clone())),
        default_unit,
        default_symbol,
        implement_sum: raw
            .implement_sum
            .clone()
            .or_inherit(parent.map(|p| p.implement_sum))
            .unwrap_or(true),
        implement_difference: raw
            .implement_difference
            .clone()
            .or_inherit(parent.map(|p| p.implement_difference))
            .unwrap_or(true),
        difference: search(&raw.difference, inherited(|p| p.difference.clone())),
        powers,
        operations,
        conversions,
        constants,
        unit_levels,
        resizes: raw.resizes.clone(),
        derivations: raw.derivations.clone(),
        locator: raw.locator,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::context::CancellationToken;
    use crate::resolve::settings::ResolutionSettings;
    use measures_ast::{Declaration, RawUnit, RawUnitInstance, StackingMode};

    fn test_locator(start: u32) -> Locator {
        Locator::new(0, start, start + 1, 1)
    }

    fn make_unit(id: &str, quantity: &str) -> ResolvedUnit {
        ResolvedUnit {
            id: TypeId::from(id),
            quantity: TypeId::from(quantity),
            bias_term: false,
            instances: IndexMap::new(),
            derivations: Vec::new(),
            locator: test_locator(0),
        }
    }

    fn resolve(
        declarations: Vec<Declaration>,
    ) -> (IndexMap<TypeId, FlatQuantity>, Vec<Diagnostic>) {
        let mut errors = Vec::new();
        let mut declarations = declarations;
        declarations.push(
            RawUnit::new("UnitOfLength", "Length", test_locator(0))
                .with_instance(RawUnitInstance::fixed("Metre", test_locator(0)))
                .into(),
        );
        let registry = Registry::build(declarations, &mut errors);
        let mut units = IndexMap::new();
        units.insert(
            TypeId::from("UnitOfLength"),
            make_unit("UnitOfLength", "Length"),
        );
        let settings = ResolutionSettings::default();
        let cancel = CancellationToken::new();
        let ctx = ResolutionContext::new(&settings, &cancel);
        let flat = resolve_specializations(&registry, &units, &ctx, &mut errors).unwrap();
        (flat, errors)
    }

    fn length() -> RawQuantity {
        RawQuantity::base("Length", QuantityKind::Scalar, "UnitOfLength", test_locator(1))
    }

    #[test]
    fn test_constants_respect_inherit_flag() {
        let base = length()
            .with_constant(RawConstant::scalar("A", "Metre", 1.0, test_locator(2)))
            .with_constant(RawConstant::scalar("B", "Metre", 2.0, test_locator(3)))
            .with_constant(RawConstant::scalar("C", "Metre", 3.0, test_locator(4)));
        let own = RawConstant::scalar("D", "Metre", 4.0, test_locator(5));

        let (flat, errors) = resolve(vec![
            base.clone().into(),
            RawQuantity::specialization("Distance", QuantityKind::Scalar, "Length", test_locator(6))
                .with_inherit_constants(false)
                .with_constant(own.clone())
                .into(),
        ]);
        assert!(errors.is_empty(), "{:?}", errors);
        let names: Vec<_> = flat[&TypeId::from("Distance")]
            .constants
            .iter()
            .map(|c| c.item.name.as_str())
            .collect();
        assert_eq!(names, ["D"]);

        let (flat, _) = resolve(vec![
            base.into(),
            RawQuantity::specialization("Distance", QuantityKind::Scalar, "Length", test_locator(6))
                .with_constant(own)
                .with_constant(RawConstant::scalar("B", "Metre", 20.0, test_locator(7)))
                .into(),
        ]);
        let distance = &flat[&TypeId::from("Distance")];
        let names: Vec<_> = distance
            .constants
            .iter()
            .map(|c| c.item.name.as_str())
            .collect();
        assert_eq!(names, ["A", "C", "D", "B"]);
        assert!(distance.owns(&distance.constants[3]));
        assert!(!distance.owns(&distance.constants[0]));
    }

    #[test]
    fn test_chain_shares_base_and_unit() {
        let (flat, errors) = resolve(vec![
            RawQuantity::specialization("Height", QuantityKind::Scalar, "Distance", test_locator(3))
                .into(),
            RawQuantity::specialization("Distance", QuantityKind::Scalar, "Length", test_locator(2))
                .into(),
            length().into(),
        ]);
        assert!(errors.is_empty());
        let height = &flat[&TypeId::from("Height")];
        assert_eq!(height.base, TypeId::from("Length"));
        assert_eq!(height.original, Some(TypeId::from("Distance")));
        assert_eq!(height.unit, TypeId::from("UnitOfLength"));
        let order: Vec<_> = flat.keys().map(|id| id.to_string()).collect();
        assert_eq!(order, ["Height", "Distance", "Length"]);
    }

    #[test]
    fn test_cycle_excludes_members_with_one_diagnostic() {
        let (flat, errors) = resolve(vec![
            length().into(),
            RawQuantity::specialization("A", QuantityKind::Scalar, "B", test_locator(2)).into(),
            RawQuantity::specialization("B", QuantityKind::Scalar, "A", test_locator(3)).into(),
            RawQuantity::specialization("Loop", QuantityKind::Scalar, "Loop", test_locator(4))
                .into(),
            RawQuantity::specialization("Distance", QuantityKind::Scalar, "Length", test_locator(5))
                .into(),
        ]);
        let ids: Vec<_> = flat.keys().map(|id| id.to_string()).collect();
        assert_eq!(ids, ["Length", "Distance"]);
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| e.kind == ErrorKind::CyclicSpecialization));
    }

    #[test]
    fn test_kind_and_reference_errors() {
        let (flat, errors) = resolve(vec![
            length().into(),
            RawQuantity::specialization(
                "Displacement",
                QuantityKind::Vector { dimension: 3 },
                "Length",
                test_locator(2),
            )
            .into(),
            RawQuantity::specialization("Ghost", QuantityKind::Scalar, "Missing", test_locator(3))
                .into(),
            RawQuantity::specialization("Child", QuantityKind::Scalar, "Ghost", test_locator(4))
                .into(),
        ]);
        assert_eq!(flat.len(), 1);
        let kinds: Vec<_> = errors.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [
                ErrorKind::TypeKindMismatch,
                ErrorKind::UnrecognizedType,
                ErrorKind::UnrecognizedType,
            ]
        );
    }

    #[test]
    fn test_search_for_defined_properties() {
        let (flat, _) = resolve(vec![
            length().with_default_unit("Metre", "m").into(),
            RawQuantity::specialization("Distance", QuantityKind::Scalar, "Length", test_locator(2))
                .into(),
            {
                let mut nulled = RawQuantity::specialization(
                    "Height",
                    QuantityKind::Scalar,
                    "Distance",
                    test_locator(3),
                );
                nulled.default_symbol = Setting::Null;
                nulled.implement_sum = Setting::Value(false);
                nulled.into()
            },
        ]);
        let distance = &flat[&TypeId::from("Distance")];
        assert_eq!(
            distance.default_unit.as_ref().map(|u| u.item.as_str()),
            Some("Metre")
        );
        assert_eq!(distance.default_symbol.as_deref(), Some("m"));
        let height = &flat[&TypeId::from("Height")];
        assert_eq!(height.default_symbol, None);
        assert!(!height.implement_sum);
        assert!(height.implement_difference);
    }

    #[test]
    fn test_unit_levels_follow_inherit_flag() {
        let base = length().with_unit_list(RawUnitList::include(
            &["Metre"],
            StackingMode::Union,
            test_locator(2),
        ));
        let (flat, _) = resolve(vec![
            base.into(),
            RawQuantity::specialization("Distance", QuantityKind::Scalar, "Length", test_locator(3))
                .with_unit_list(RawUnitList::exclude(&["Metre"], test_locator(4)))
                .into(),
            RawQuantity::specialization("Height", QuantityKind::Scalar, "Distance", test_locator(5))
                .with_inherit_units(false)
                .into(),
        ]);
        assert_eq!(flat[&TypeId::from("Distance")].unit_levels.len(), 2);
        assert!(flat[&TypeId::from("Height")].unit_levels.is_empty());
    }

    #[test]
    fn test_long_chain_resolves() {
        let mut declarations: Vec<Declaration> = vec![length().into()];
        for i in 1..5_000u32 {
            let parent = if i == 1 {
                "Length".to_string()
            } else {
                format!("Q{}", i - 1)
            };
            declarations.push(
                RawQuantity::specialization(
                    format!("Q{}", i),
                    QuantityKind::Scalar,
                    parent,
                    test_locator(i),
                )
                .into(),
            );
        }
        declarations.reverse();
        let (flat, errors) = resolve(declarations);
        assert!(errors.is_empty());
        assert_eq!(flat.len(), 5_000);
        assert_eq!(flat[&TypeId::from("Q4999")].base, TypeId::from("Length"));
    }
}
