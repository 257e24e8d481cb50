//! Raw declarations handed over by the extraction front-end.
//!
//! Records are plain values: the front-end builds them with the `with_*`
//! constructors, which consume and return a new value, so two extraction
//! runs can be compared by value for change detection.

pub mod quantity;
pub mod unit;

use serde::{Deserialize, Serialize};

use crate::foundation::{Locator, TypeId};

pub use quantity::{
    ConstantValue, InheritFlags, ListMode, Operator, OperatorPosition, Origin, QuantityKind,
    RawConstant, RawOperation, RawPowers, RawQuantity, RawResize, RawUnitList, Reference,
    StackingMode,
};
pub use unit::{RawDerivation, RawInstanceKind, RawUnit, RawUnitInstance};

/// Any top-level declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Declaration {
    Unit(RawUnit),
    Quantity(RawQuantity),
}

/// Entity family of a declaration, used for kind-aware lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclKind {
    Unit,
    Scalar,
    Vector,
    VectorGroup,
    VectorGroupMember,
}

impl Declaration {
    pub fn id(&self) -> &TypeId {
        match self {
            Declaration::Unit(unit) => &unit.id,
            Declaration::Quantity(quantity) => &quantity.id,
        }
    }

    pub fn locator(&self) -> Locator {
        match self {
            Declaration::Unit(unit) => unit.locator,
            Declaration::Quantity(quantity) => quantity.locator,
        }
    }

    pub fn kind(&self) -> DeclKind {
        match self {
            Declaration::Unit(_) => DeclKind::Unit,
            Declaration::Quantity(quantity) => match quantity.kind {
                QuantityKind::Scalar => DeclKind::Scalar,
                QuantityKind::Vector { .. } => DeclKind::Vector,
                QuantityKind::VectorGroup => DeclKind::VectorGroup,
                QuantityKind::VectorGroupMember { .. } => DeclKind::VectorGroupMember,
            },
        }
    }
}

impl From<RawUnit> for Declaration {
    fn from(unit: RawUnit) -> Self {
        Declaration::Unit(unit)
    }
}

impl From<RawQuantity> for Declaration {
    fn from(quantity: RawQuantity) -> Self {
        Declaration::Quantity(quantity)
    }
}
