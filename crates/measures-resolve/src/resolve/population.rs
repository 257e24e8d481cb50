//! The resolved population handed to code emission.

use indexmap::{IndexMap, IndexSet};
use measures_ast::{Locator, QuantityKind, TypeId};
use serde::Serialize;
use tracing::debug;

use crate::resolve::constants::ResolvedConstant;
use crate::resolve::derivations::ResolvedDerivation;
use crate::resolve::relations::{ResolvedOperation, ResolvedResize};
use crate::resolve::specialization::Power;
use crate::resolve::units::ResolvedUnit;

/// A fully resolved quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedQuantity {
    pub id: TypeId,
    pub kind: QuantityKind,
    /// Direct specialization parent, `None` for bases.
    pub original: Option<TypeId>,
    pub base: TypeId,
    pub unit: TypeId,
    pub biased: bool,
    /// Instances of `unit` the quantity exposes, in unit declaration order.
    pub visible_units: IndexSet<String>,
    pub default_unit: Option<String>,
    pub default_symbol: Option<String>,
    pub implement_sum: bool,
    pub implement_difference: bool,
    pub difference: TypeId,
    pub powers: Vec<(Power, TypeId)>,
    pub scalar: Option<TypeId>,
    pub constants: Vec<ResolvedConstant>,
    pub conversions: Vec<TypeId>,
    pub operations: Vec<ResolvedOperation>,
    pub resizes: Vec<ResolvedResize>,
    pub derivations: Vec<ResolvedDerivation>,
    /// Vector groups only: members by dimension.
    pub members: IndexMap<u8, TypeId>,
    pub locator: Locator,
}

impl ResolvedQuantity {
    pub fn is_base(&self) -> bool {
        self.original.is_none()
    }
}

/// Every entity that resolved, grouped by family and keyed by identity.
///
/// Each `*_bases` map sends an identity to the root of its specialization
/// chain (bases map to themselves); `unit_bases` sends a unit to the scalar
/// it measures.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Population {
    pub documentation: bool,
    pub units: IndexMap<TypeId, ResolvedUnit>,
    pub unit_bases: IndexMap<TypeId, TypeId>,
    pub scalars: IndexMap<TypeId, ResolvedQuantity>,
    pub scalar_bases: IndexMap<TypeId, TypeId>,
    pub vectors: IndexMap<TypeId, ResolvedQuantity>,
    pub vector_bases: IndexMap<TypeId, TypeId>,
    pub vector_groups: IndexMap<TypeId, ResolvedQuantity>,
    pub vector_group_bases: IndexMap<TypeId, TypeId>,
    pub vector_group_members: IndexMap<TypeId, ResolvedQuantity>,
}

impl Population {
    /// Sorts resolved entities into their populations, keeping input order
    /// within each.
    pub fn assemble(
        documentation: bool,
        units: IndexMap<TypeId, ResolvedUnit>,
        quantities: Vec<ResolvedQuantity>,
    ) -> Self {
        let mut population = Population {
            documentation,
            unit_bases: units
                .values()
                .map(|unit| (unit.id.clone(), unit.quantity.clone()))
                .collect(),
            units,
            ..Population::default()
        };

        for quantity in quantities {
            let id = quantity.id.clone();
            let base = quantity.base.clone();
            match quantity.kind {
                QuantityKind::Scalar => {
                    population.scalar_bases.insert(id.clone(), base);
                    population.scalars.insert(id, quantity);
                }
                QuantityKind::Vector { .. } => {
                    population.vector_bases.insert(id.clone(), base);
                    population.vectors.insert(id, quantity);
                }
                QuantityKind::VectorGroup => {
                    population.vector_group_bases.insert(id.clone(), base);
                    population.vector_groups.insert(id, quantity);
                }
                QuantityKind::VectorGroupMember { .. } => {
                    population.vector_group_members.insert(id, quantity);
                }
            }
        }

        debug!(
            units = population.units.len(),
            scalars = population.scalars.len(),
            vectors = population.vectors.len(),
            vector_groups = population.vector_groups.len(),
            members = population.vector_group_members.len(),
            "assembled population"
        );
        population
    }

    pub fn unit(&self, id: &TypeId) -> Option<&ResolvedUnit> {
        self.units.get(id)
    }

    /// Looks up a quantity of any family.
    pub fn quantity(&self, id: &TypeId) -> Option<&ResolvedQuantity> {
        self.scalars
            .get(id)
            .or_else(|| self.vectors.get(id))
            .or_else(|| self.vector_groups.get(id))
            .or_else(|| self.vector_group_members.get(id))
    }

    /// Root of the specialization chain of any quantity.
    pub fn base_of(&self, id: &TypeId) -> Option<&TypeId> {
        self.scalar_bases
            .get(id)
            .or_else(|| self.vector_bases.get(id))
            .or_else(|| self.vector_group_bases.get(id))
            .or_else(|| self.vector_group_members.get(id).map(|member| &member.base))
    }

    pub fn quantity_count(&self) -> usize {
        self.scalars.len()
            + self.vectors.len()
            + self.vector_groups.len()
            + self.vector_group_members.len()
    }
}
