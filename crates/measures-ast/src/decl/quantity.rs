//! Quantity declarations: scalars, vectors, vector groups and their members.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::unit::RawDerivation;
use crate::foundation::{Locator, Magnitude, Setting, TypeId};

/// Quantity family and shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuantityKind {
    Scalar,
    Vector { dimension: u8 },
    VectorGroup,
    /// Fixed-dimension member of the vector group named by the declaration's
    /// specialization parent.
    VectorGroupMember { dimension: u8 },
}

impl QuantityKind {
    pub fn dimension(self) -> Option<u8> {
        match self {
            QuantityKind::Vector { dimension } | QuantityKind::VectorGroupMember { dimension } => {
                Some(dimension)
            }
            QuantityKind::Scalar | QuantityKind::VectorGroup => None,
        }
    }

    pub fn is_scalar(self) -> bool {
        matches!(self, QuantityKind::Scalar)
    }

    /// Vectors and vector group members both behave as fixed-size vectors.
    pub fn is_vector_like(self) -> bool {
        matches!(
            self,
            QuantityKind::Vector { .. } | QuantityKind::VectorGroupMember { .. }
        )
    }
}

impl fmt::Display for QuantityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantityKind::Scalar => write!(f, "scalar"),
            QuantityKind::Vector { dimension } => write!(f, "vector of dimension {}", dimension),
            QuantityKind::VectorGroup => write!(f, "vector group"),
            QuantityKind::VectorGroupMember { dimension } => {
                write!(f, "vector group member of dimension {}", dimension)
            }
        }
    }
}

/// Where a quantity's definition comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    /// A base quantity, measured in `unit`.
    Base { unit: TypeId },
    /// A specialization of `original`.
    Specialization { original: Setting<TypeId> },
}

/// Per-category inheritance switches of a specialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritFlags {
    pub operations: bool,
    pub conversions: bool,
    pub constants: bool,
    pub units: bool,
}

impl Default for InheritFlags {
    fn default() -> Self {
        Self {
            operations: true,
            conversions: true,
            constants: true,
            units: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StackingMode {
    Union,
    Intersection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListMode {
    Include(StackingMode),
    Exclude,
}

/// An `Include`/`Exclude` list of unit instance names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUnitList {
    pub mode: ListMode,
    pub instances: Vec<String>,
    pub locator: Locator,
}

impl RawUnitList {
    pub fn include(instances: &[&str], stacking: StackingMode, locator: Locator) -> Self {
        Self {
            mode: ListMode::Include(stacking),
            instances: instances.iter().map(|s| s.to_string()).collect(),
            locator,
        }
    }

    pub fn exclude(instances: &[&str], locator: Locator) -> Self {
        Self {
            mode: ListMode::Exclude,
            instances: instances.iter().map(|s| s.to_string()).collect(),
            locator,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstantValue {
    Scalar(Magnitude),
    Vector(Vec<Magnitude>),
}

/// A named constant expressed in one of the quantity's unit instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawConstant {
    pub name: String,
    pub unit_instance: String,
    pub value: ConstantValue,
    pub generate_multiples: bool,
    /// Name of the multiples property. Unset derives one from the constant
    /// name.
    pub multiples: Setting<String>,
    pub locator: Locator,
}

impl RawConstant {
    pub fn scalar(
        name: impl Into<String>,
        unit_instance: impl Into<String>,
        value: impl Into<Magnitude>,
        locator: Locator,
    ) -> Self {
        Self {
            name: name.into(),
            unit_instance: unit_instance.into(),
            value: ConstantValue::Scalar(value.into()),
            generate_multiples: true,
            multiples: Setting::Unset,
            locator,
        }
    }

    pub fn vector(
        name: impl Into<String>,
        unit_instance: impl Into<String>,
        components: Vec<Magnitude>,
        locator: Locator,
    ) -> Self {
        Self {
            value: ConstantValue::Vector(components),
            ..Self::scalar(name, unit_instance, Magnitude::ZERO, locator)
        }
    }

    pub fn with_multiples(self, multiples: impl Into<String>) -> Self {
        Self {
            generate_multiples: true,
            multiples: Setting::Value(multiples.into()),
            ..self
        }
    }

    pub fn without_multiples(self) -> Self {
        Self {
            generate_multiples: false,
            ..self
        }
    }
}

/// A typed reference to another quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub target: TypeId,
    pub locator: Locator,
}

impl Reference {
    pub fn new(target: impl Into<TypeId>, locator: Locator) -> Self {
        Self {
            target: target.into(),
            locator,
        }
    }
}

/// Declares that a vector has an equivalent of another dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResize {
    /// A vector, or a vector group holding a member of `dimension`.
    pub target: TypeId,
    pub dimension: u8,
    pub locator: Locator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Dot,
    Cross,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Dot => "dot",
            Operator::Cross => "cross",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorPosition {
    Left,
    Right,
}

/// `self <operator> other = result` (or `other <operator> self` when the
/// quantity sits on the right).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOperation {
    pub operator: Operator,
    pub other: TypeId,
    pub result: TypeId,
    pub position: OperatorPosition,
    /// Also implement the operation with operands swapped.
    pub mirror: bool,
    pub locator: Locator,
}

impl RawOperation {
    pub fn new(
        operator: Operator,
        other: impl Into<TypeId>,
        result: impl Into<TypeId>,
        locator: Locator,
    ) -> Self {
        Self {
            operator,
            other: other.into(),
            result: result.into(),
            position: OperatorPosition::Left,
            mirror: false,
            locator,
        }
    }
}

/// Related scalars produced by raising a scalar to a power.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPowers {
    pub reciprocal: Setting<TypeId>,
    pub square: Setting<TypeId>,
    pub cube: Setting<TypeId>,
    pub square_root: Setting<TypeId>,
    pub cube_root: Setting<TypeId>,
}

/// Raw quantity declaration, as extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQuantity {
    pub id: TypeId,
    pub kind: QuantityKind,
    pub origin: Origin,
    pub inherit: InheritFlags,
    /// Scalars only: magnitudes carry the unit's bias term.
    pub biased: bool,
    /// Vectors only: the scalar describing the vector's magnitude.
    pub scalar: Setting<TypeId>,
    pub default_unit: Setting<String>,
    pub default_symbol: Setting<String>,
    pub implement_sum: Setting<bool>,
    pub implement_difference: Setting<bool>,
    pub difference: Setting<TypeId>,
    pub powers: RawPowers,
    pub operations: Vec<RawOperation>,
    pub constants: Vec<RawConstant>,
    pub conversions: Vec<Reference>,
    pub unit_lists: Vec<RawUnitList>,
    pub resizes: Vec<RawResize>,
    pub derivations: Vec<RawDerivation>,
    pub locator: Locator,
}

impl RawQuantity {
    fn new(id: TypeId, kind: QuantityKind, origin: Origin, locator: Locator) -> Self {
        Self {
            id,
            kind,
            origin,
            inherit: InheritFlags::default(),
            biased: false,
            scalar: Setting::Unset,
            default_unit: Setting::Unset,
            default_symbol: Setting::Unset,
            implement_sum: Setting::Unset,
            implement_difference: Setting::Unset,
            difference: Setting::Unset,
            powers: RawPowers::default(),
            operations: Vec::new(),
            constants: Vec::new(),
            conversions: Vec::new(),
            unit_lists: Vec::new(),
            resizes: Vec::new(),
            derivations: Vec::new(),
            locator,
        }
    }

    /// A base quantity measured in `unit`.
    pub fn base(
        id: impl Into<TypeId>,
        kind: QuantityKind,
        unit: impl Into<TypeId>,
        locator: Locator,
    ) -> Self {
        Self::new(id.into(), kind, Origin::Base { unit: unit.into() }, locator)
    }

    /// A specialization of `original`.
    pub fn specialization(
        id: impl Into<TypeId>,
        kind: QuantityKind,
        original: impl Into<TypeId>,
        locator: Locator,
    ) -> Self {
        Self::new(
            id.into(),
            kind,
            Origin::Specialization {
                original: Setting::Value(original.into()),
            },
            locator,
        )
    }

    /// A fixed-dimension member of `group`.
    pub fn member(
        id: impl Into<TypeId>,
        group: impl Into<TypeId>,
        dimension: u8,
        locator: Locator,
    ) -> Self {
        Self::specialization(
            id,
            QuantityKind::VectorGroupMember { dimension },
            group,
            locator,
        )
    }

    /// The declared specialization parent, if this is not a base.
    pub fn original(&self) -> Option<&Setting<TypeId>> {
        match &self.origin {
            Origin::Base { .. } => None,
            Origin::Specialization { original } => Some(original),
        }
    }

    pub fn with_inherit(self, inherit: InheritFlags) -> Self {
        Self { inherit, ..self }
    }

    pub fn with_inherit_constants(mut self, inherit: bool) -> Self {
        self.inherit.constants = inherit;
        self
    }

    pub fn with_inherit_units(mut self, inherit: bool) -> Self {
        self.inherit.units = inherit;
        self
    }

    pub fn with_biased(self, biased: bool) -> Self {
        Self { biased, ..self }
    }

    pub fn with_scalar(self, scalar: impl Into<TypeId>) -> Self {
        Self {
            scalar: Setting::Value(scalar.into()),
            ..self
        }
    }

    pub fn with_default_unit(self, instance: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            default_unit: Setting::Value(instance.into()),
            default_symbol: Setting::Value(symbol.into()),
            ..self
        }
    }

    pub fn with_difference(self, difference: impl Into<TypeId>) -> Self {
        Self {
            difference: Setting::Value(difference.into()),
            ..self
        }
    }

    pub fn with_powers(self, powers: RawPowers) -> Self {
        Self { powers, ..self }
    }

    pub fn with_operation(mut self, operation: RawOperation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn with_constant(mut self, constant: RawConstant) -> Self {
        self.constants.push(constant);
        self
    }

    pub fn with_conversion(mut self, target: impl Into<TypeId>, locator: Locator) -> Self {
        self.conversions.push(Reference::new(target, locator));
        self
    }

    pub fn with_unit_list(mut self, list: RawUnitList) -> Self {
        self.unit_lists.push(list);
        self
    }

    pub fn with_resize(
        mut self,
        target: impl Into<TypeId>,
        dimension: u8,
        locator: Locator,
    ) -> Self {
        self.resizes.push(RawResize {
            target: target.into(),
            dimension,
            locator,
        });
        self
    }

    pub fn with_derivation(mut self, derivation: RawDerivation) -> Self {
        self.derivations.push(derivation);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_is_specialization_of_group() {
        let member = RawQuantity::member("Position3", "Position", 3, Locator::default());
        assert_eq!(
            member.original(),
            Some(&Setting::Value(TypeId::from("Position")))
        );
        assert_eq!(member.kind.dimension(), Some(3));
        assert!(member.kind.is_vector_like());
    }

    #[test]
    fn test_base_has_no_original() {
        let length = RawQuantity::base(
            "Length",
            QuantityKind::Scalar,
            "UnitOfLength",
            Locator::default(),
        );
        assert!(length.original().is_none());
        assert_eq!(length.inherit, InheritFlags::default());
    }
}
