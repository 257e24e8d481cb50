//! Cross-quantity relationships.
//!
//! Everything a quantity says about other quantities is resolved here, by
//! identity against the flattened quantity population: conversions, resizes,
//! operations, derived-quantity signatures and the associated difference,
//! power and magnitude quantities.
//!
//! An unusable reference removes only its own entry. Inherited entries were
//! diagnosed when their owner was resolved and are dropped quietly.

use indexmap::IndexMap;
use measures_ast::{Locator, Operator, OperatorPosition, QuantityKind, RawResize, TypeId};
use serde::Serialize;

use crate::error::{Diagnostic, ErrorKind};
use crate::resolve::derivations::{resolve_signatures, Placeholders, ResolvedDerivation};
use crate::resolve::registry::Registry;
use crate::resolve::specialization::{FlatQuantity, Power, Sourced};

/// Members of each vector group, keyed by dimension.
pub type MemberIndex = IndexMap<TypeId, IndexMap<u8, TypeId>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedOperation {
    pub operator: Operator,
    pub other: TypeId,
    pub result: TypeId,
    pub position: OperatorPosition,
    pub mirror: bool,
    pub owner: TypeId,
    pub locator: Locator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedResize {
    pub dimension: u8,
    /// The vector of that dimension; for groups, the member.
    pub target: TypeId,
    pub locator: Locator,
}

/// Resolved relationships of one quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relations {
    /// Quantity of the difference of two values; the quantity itself unless
    /// declared otherwise.
    pub difference: TypeId,
    pub powers: Vec<(Power, TypeId)>,
    pub scalar: Option<TypeId>,
    pub conversions: Vec<TypeId>,
    pub operations: Vec<ResolvedOperation>,
    pub resizes: Vec<ResolvedResize>,
    pub derivations: Vec<ResolvedDerivation>,
}

/// Groups vector group members by group and dimension.
///
/// A second member of the same dimension is reported and left out.
pub fn index_members(
    quantities: &IndexMap<TypeId, FlatQuantity>,
    errors: &mut Vec<Diagnostic>,
) -> MemberIndex {
    let mut index = MemberIndex::new();
    for quantity in quantities.values() {
        if let QuantityKind::VectorGroup = quantity.kind {
            index.entry(quantity.id.clone()).or_default();
        }
    }

    for quantity in quantities.values() {
        let QuantityKind::VectorGroupMember { dimension } = quantity.kind else {
            continue;
        };
        let Some(group) = &quantity.original else {
            continue;
        };
        let members = index.entry(group.clone()).or_default();
        if let Some(first) = members.get(&dimension) {
            let first_locator = quantities
                .get(first)
                .map(|q| q.locator)
                .unwrap_or_default();
            errors.push(
                Diagnostic::error(
                    ErrorKind::DuplicateMemberDimension,
                    quantity.locator,
                    format!(
                        "'{}' already has a member of dimension {}: '{}'",
                        group, dimension, first
                    ),
                )
                .with_label(first_locator, "first declared here".to_string()),
            );
            continue;
        }
        members.insert(dimension, quantity.id.clone());
    }
    index
}

/// Scalars relate to scalars, vectors to vectors of the same dimension and
/// groups to groups.
fn same_family(a: QuantityKind, b: QuantityKind) -> bool {
    match (a, b) {
        (QuantityKind::Scalar, QuantityKind::Scalar)
        | (QuantityKind::VectorGroup, QuantityKind::VectorGroup) => true,
        (a, b) if a.is_vector_like() && b.is_vector_like() => a.dimension() == b.dimension(),
        _ => false,
    }
}

/// Looks up `id` in the flattened population, reporting why it is missing.
fn find_quantity<'q>(
    quantities: &'q IndexMap<TypeId, FlatQuantity>,
    registry: &Registry,
    id: &TypeId,
    locator: Locator,
    errors: &mut Vec<Diagnostic>,
) -> Option<&'q FlatQuantity> {
    if let Some(found) = quantities.get(id) {
        return Some(found);
    }
    if registry.quantity(id).is_some() {
        errors.push(Diagnostic::error(
            ErrorKind::UnrecognizedType,
            locator,
            format!("quantity '{}' could not be resolved", id),
        ));
    } else {
        registry.expect_quantity(id, locator, errors);
    }
    None
}

/// Resolves the relationships of `quantity`.
pub fn resolve_relations(
    quantity: &FlatQuantity,
    quantities: &IndexMap<TypeId, FlatQuantity>,
    members: &MemberIndex,
    registry: &Registry,
    placeholders: &Placeholders,
    errors: &mut Vec<Diagnostic>,
) -> Relations {
    let mut resolver = RelationResolver {
        quantity,
        quantities,
        members,
        registry,
        errors,
    };

    let difference = resolver.difference();
    let powers = resolver.powers();
    let scalar = resolver.scalar();
    let conversions = resolver.conversions();
    let operations = resolver.operations();
    let resizes = resolver.resizes();
    let derivations = resolver.derivations(placeholders);

    Relations {
        difference,
        powers,
        scalar,
        conversions,
        operations,
        resizes,
        derivations,
    }
}

struct RelationResolver<'a, 'e> {
    quantity: &'a FlatQuantity,
    quantities: &'a IndexMap<TypeId, FlatQuantity>,
    members: &'a MemberIndex,
    registry: &'a Registry,
    errors: &'e mut Vec<Diagnostic>,
}

impl<'a> RelationResolver<'a, '_> {
    fn owns<T>(&self, item: &Sourced<T>) -> bool {
        self.quantity.owns(item)
    }

    fn report(&mut self, owned: bool, diagnostic: Diagnostic) {
        if owned {
            self.errors.push(diagnostic);
        }
    }

    /// Looks up a referenced quantity, reporting unknown and unresolvable
    /// references when `owned`.
    fn lookup(&mut self, id: &TypeId, locator: Locator, owned: bool) -> Option<&'a FlatQuantity> {
        if owned {
            find_quantity(self.quantities, self.registry, id, locator, self.errors)
        } else {
            self.quantities.get(id)
        }
    }

    /// Signatures are checked against the flattened population, so a
    /// member that was declared but dropped invalidates its signature.
    fn derivations(&mut self, placeholders: &Placeholders) -> Vec<ResolvedDerivation> {
        let (quantity, quantities, registry) = (self.quantity, self.quantities, self.registry);
        resolve_signatures(
            &quantity.id,
            &quantity.derivations,
            |id, locator, errors| {
                find_quantity(quantities, registry, id, locator, errors).is_some()
            },
            placeholders,
            self.errors,
        )
    }

    fn difference(&mut self) -> TypeId {
        let quantity = self.quantity;
        let Some(declared) = &quantity.difference else {
            return quantity.id.clone();
        };
        let owned = self.owns(declared);
        let Some(target) = self.lookup(&declared.item, quantity.locator, owned) else {
            return quantity.id.clone();
        };
        if !same_family(quantity.kind, target.kind) {
            self.report(
                owned,
                Diagnostic::error(
                    ErrorKind::TypeKindMismatch,
                    quantity.locator,
                    format!(
                        "difference '{}' of '{}' is a {}, expected a {}",
                        target.id, quantity.id, target.kind, quantity.kind
                    ),
                ),
            );
            return quantity.id.clone();
        }
        target.id.clone()
    }

    fn powers(&mut self) -> Vec<(Power, TypeId)> {
        let quantity = self.quantity;
        let mut resolved = Vec::new();
        for (power, declared) in &quantity.powers {
            let owned = self.owns(declared);
            if !quantity.kind.is_scalar() {
                self.report(
                    owned,
                    Diagnostic::error(
                        ErrorKind::TypeKindMismatch,
                        quantity.locator,
                        format!(
                            "only scalars declare powers, but '{}' is a {}",
                            quantity.id, quantity.kind
                        ),
                    ),
                );
                continue;
            }
            let Some(target) = self.lookup(&declared.item, quantity.locator, owned) else {
                continue;
            };
            if !target.kind.is_scalar() {
                self.report(
                    owned,
                    Diagnostic::error(
                        ErrorKind::TypeKindMismatch,
                        quantity.locator,
                        format!(
                            "{} '{}' of '{}' must be a scalar, found a {}",
                            power.name(),
                            target.id,
                            quantity.id,
                            target.kind
                        ),
                    ),
                );
                continue;
            }
            resolved.push((*power, target.id.clone()));
        }
        resolved
    }

    fn scalar(&mut self) -> Option<TypeId> {
        let quantity = self.quantity;
        let declared = quantity.scalar.as_ref()?;
        let owned = self.owns(declared);
        if quantity.kind.is_scalar() {
            self.report(
                owned,
                Diagnostic::error(
                    ErrorKind::TypeKindMismatch,
                    quantity.locator,
                    format!("scalar '{}' cannot declare an associated scalar", quantity.id),
                ),
            );
            return None;
        }
        let target = self.lookup(&declared.item, quantity.locator, owned)?;
        if !target.kind.is_scalar() {
            self.report(
                owned,
                Diagnostic::error(
                    ErrorKind::TypeKindMismatch,
                    quantity.locator,
                    format!(
                        "associated scalar '{}' of '{}' is a {}",
                        target.id, quantity.id, target.kind
                    ),
                ),
            );
            return None;
        }
        Some(target.id.clone())
    }

    fn conversions(&mut self) -> Vec<TypeId> {
        let quantity = self.quantity;
        let mut resolved: IndexMap<TypeId, Locator> = IndexMap::new();

        for conversion in &quantity.conversions {
            let owned = self.owns(conversion);
            let reference = &conversion.item;

            if reference.target == quantity.id {
                self.report(
                    owned,
                    Diagnostic::warning(
                        ErrorKind::ConvertibleToSelf,
                        reference.locator,
                        format!("'{}' is trivially convertible to itself", quantity.id),
                    ),
                );
                continue;
            }

            let Some(target) = self.lookup(&reference.target, reference.locator, owned) else {
                continue;
            };

            if !same_family(quantity.kind, target.kind) {
                self.report(
                    owned,
                    Diagnostic::error(
                        ErrorKind::IncompatibleConversion,
                        reference.locator,
                        format!(
                            "'{}' ({}) cannot convert to '{}' ({})",
                            quantity.id, quantity.kind, target.id, target.kind
                        ),
                    ),
                );
                continue;
            }
            if quantity.kind.is_scalar() && quantity.biased != target.biased {
                let describe = |biased: bool| if biased { "biased" } else { "unbiased" };
                self.report(
                    owned,
                    Diagnostic::error(
                        ErrorKind::IncompatibleConversion,
                        reference.locator,
                        format!(
                            "{} '{}' cannot convert to {} '{}'",
                            describe(quantity.biased),
                            quantity.id,
                            describe(target.biased),
                            target.id
                        ),
                    ),
                );
                continue;
            }

            if let Some(first) = resolved.get(&target.id) {
                let first = *first;
                self.report(
                    owned,
                    Diagnostic::warning(
                        ErrorKind::RedundantListing,
                        reference.locator,
                        format!("conversion to '{}' is listed more than once", target.id),
                    )
                    .with_label(first, "first listed here".to_string()),
                );
                continue;
            }
            resolved.insert(target.id.clone(), reference.locator);
        }

        resolved.into_keys().collect()
    }

    fn operations(&mut self) -> Vec<ResolvedOperation> {
        let quantity = self.quantity;
        let mut resolved: Vec<ResolvedOperation> = Vec::new();

        for sourced in &quantity.operations {
            let owned = self.owns(sourced);
            let operation = &sourced.item;

            let Some(other) = self.lookup(&operation.other, operation.locator, owned) else {
                continue;
            };
            let Some(result) = self.lookup(&operation.result, operation.locator, owned) else {
                continue;
            };

            if matches!(operation.operator, Operator::Dot | Operator::Cross) {
                if !quantity.kind.is_vector_like() || !other.kind.is_vector_like() {
                    self.report(
                        owned,
                        Diagnostic::error(
                            ErrorKind::TypeKindMismatch,
                            operation.locator,
                            format!(
                                "'{}' {} '{}' needs two vectors",
                                quantity.id, operation.operator, other.id
                            ),
                        ),
                    );
                    continue;
                }
                if quantity.kind.dimension() != other.kind.dimension() {
                    self.report(
                        owned,
                        Diagnostic::error(
                            ErrorKind::UnexpectedDimension,
                            operation.locator,
                            format!(
                                "'{}' and '{}' differ in dimension",
                                quantity.id, other.id
                            ),
                        ),
                    );
                    continue;
                }
            }

            let candidate = ResolvedOperation {
                operator: operation.operator,
                other: other.id.clone(),
                result: result.id.clone(),
                position: operation.position,
                mirror: operation.mirror,
                owner: sourced.owner.clone(),
                locator: operation.locator,
            };
            if let Some(first) = resolved.iter().find(|existing| {
                existing.operator == candidate.operator
                    && existing.other == candidate.other
                    && existing.position == candidate.position
            }) {
                let first = first.locator;
                self.report(
                    owned,
                    Diagnostic::warning(
                        ErrorKind::DuplicateOperation,
                        operation.locator,
                        format!(
                            "'{}' already declares the operation {} '{}'",
                            quantity.id, operation.operator, candidate.other
                        ),
                    )
                    .with_label(first, "first declared here".to_string()),
                );
                continue;
            }
            resolved.push(candidate);
        }

        resolved
    }

    fn resizes(&mut self) -> Vec<ResolvedResize> {
        let quantity = self.quantity;
        let mut resolved: Vec<ResolvedResize> = Vec::new();
        for resize in &quantity.resizes {
            if let Some(target) = self.resize(resize) {
                if resolved.iter().any(|r| r.dimension == target.dimension) {
                    self.errors.push(Diagnostic::warning(
                        ErrorKind::RedundantListing,
                        resize.locator,
                        format!(
                            "'{}' already resizes to dimension {}",
                            quantity.id, resize.dimension
                        ),
                    ));
                    continue;
                }
                resolved.push(target);
            }
        }
        resolved
    }

    fn resize(&mut self, resize: &RawResize) -> Option<ResolvedResize> {
        let quantity = self.quantity;
        let Some(own_dimension) = quantity.kind.dimension() else {
            self.errors.push(Diagnostic::error(
                ErrorKind::TypeKindMismatch,
                resize.locator,
                format!("only vectors resize, but '{}' is a {}", quantity.id, quantity.kind),
            ));
            return None;
        };
        if resize.dimension == own_dimension {
            self.errors.push(Diagnostic::error(
                ErrorKind::UnexpectedDimension,
                resize.locator,
                format!(
                    "'{}' cannot resize to its own dimension {}",
                    quantity.id, own_dimension
                ),
            ));
            return None;
        }

        let target = self.lookup(&resize.target, resize.locator, true)?;
        let resolved = match target.kind {
            QuantityKind::Vector { dimension } | QuantityKind::VectorGroupMember { dimension }
                if dimension == resize.dimension =>
            {
                Some(target.id.clone())
            }
            QuantityKind::VectorGroup => self
                .members
                .get(&target.id)
                .and_then(|members| members.get(&resize.dimension))
                .cloned(),
            QuantityKind::Vector { .. } | QuantityKind::VectorGroupMember { .. } => None,
            QuantityKind::Scalar => {
                self.errors.push(Diagnostic::error(
                    ErrorKind::TypeKindMismatch,
                    resize.locator,
                    format!("'{}' resizes to scalar '{}'", quantity.id, target.id),
                ));
                return None;
            }
        };

        match resolved {
            Some(id) => Some(ResolvedResize {
                dimension: resize.dimension,
                target: id,
                locator: resize.locator,
            }),
            None => {
                self.errors.push(Diagnostic::error(
                    ErrorKind::UnexpectedDimension,
                    resize.locator,
                    format!(
                        "'{}' has no vector of dimension {}",
                        target.id, resize.dimension
                    ),
                ));
                None
            }
        }
    }
}
