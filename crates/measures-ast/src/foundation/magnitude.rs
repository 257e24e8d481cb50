//! Literal or symbolic magnitudes.
//!
//! Scale factors, bias offsets and constant values may be written either as
//! numeric literals or as expression text that the emitter copies verbatim
//! into generated code. The resolver folds literal operands and otherwise
//! composes expression text; it never evaluates expressions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A numeric literal or an opaque expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Magnitude {
    /// A literal value.
    Literal(f64),
    /// Expression text, copied as-is into generated code.
    Expression(String),
}

impl Magnitude {
    /// The multiplicative identity.
    pub const ONE: Magnitude = Magnitude::Literal(1.0);
    /// The additive identity.
    pub const ZERO: Magnitude = Magnitude::Literal(0.0);

    /// Returns the literal value, if this magnitude is a literal.
    pub fn literal(&self) -> Option<f64> {
        match self {
            Magnitude::Literal(v) => Some(*v),
            Magnitude::Expression(_) => None,
        }
    }

    /// Whether this is a literal equal to zero.
    pub fn is_zero(&self) -> bool {
        self.literal() == Some(0.0)
    }

    /// Multiplies two magnitudes.
    ///
    /// Literal operands are folded; a literal one is dropped from symbolic
    /// products.
    pub fn times(&self, other: &Magnitude) -> Magnitude {
        match (self, other) {
            (Magnitude::Literal(a), Magnitude::Literal(b)) => Magnitude::Literal(a * b),
            (Magnitude::Literal(a), expr) | (expr, Magnitude::Literal(a)) if *a == 1.0 => {
                expr.clone()
            }
            (a, b) => Magnitude::Expression(format!("({}) * ({})", a, b)),
        }
    }

    /// Subtracts `other` from `self`.
    pub fn minus(&self, other: &Magnitude) -> Magnitude {
        match (self, other) {
            (Magnitude::Literal(a), Magnitude::Literal(b)) => Magnitude::Literal(a - b),
            (expr, zero) if zero.is_zero() => expr.clone(),
            (zero, expr) if zero.is_zero() => Magnitude::Expression(format!("-({})", expr)),
            (a, b) => Magnitude::Expression(format!("({}) - ({})", a, b)),
        }
    }
}

impl fmt::Display for Magnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Magnitude::Literal(v) => write!(f, "{}", v),
            Magnitude::Expression(e) => write!(f, "{}", e),
        }
    }
}

impl From<f64> for Magnitude {
    fn from(value: f64) -> Self {
        Magnitude::Literal(value)
    }
}

impl From<&str> for Magnitude {
    fn from(value: &str) -> Self {
        Magnitude::Expression(value.to_string())
    }
}
