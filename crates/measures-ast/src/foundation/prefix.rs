//! Metric and binary unit prefixes.

use serde::{Deserialize, Serialize};

/// SI prefixes, ordered from largest to smallest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricPrefix {
    Yotta,
    Zetta,
    Exa,
    Peta,
    Tera,
    Giga,
    Mega,
    Kilo,
    Hecto,
    Deca,
    Deci,
    Centi,
    Milli,
    Micro,
    Nano,
    Pico,
    Femto,
    Atto,
    Zepto,
    Yocto,
}

/// IEC binary prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryPrefix {
    Kibi,
    Mebi,
    Gibi,
    Tebi,
    Pebi,
    Exbi,
    Zebi,
    Yobi,
}

/// Prefix applied by a prefixed unit instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Prefix {
    Metric(MetricPrefix),
    Binary(BinaryPrefix),
    /// User-supplied factor.
    Custom(f64),
}

impl MetricPrefix {
    /// Decimal exponent of the prefix.
    pub fn exponent(self) -> i32 {
        match self {
            MetricPrefix::Yotta => 24,
            MetricPrefix::Zetta => 21,
            MetricPrefix::Exa => 18,
            MetricPrefix::Peta => 15,
            MetricPrefix::Tera => 12,
            MetricPrefix::Giga => 9,
            MetricPrefix::Mega => 6,
            MetricPrefix::Kilo => 3,
            MetricPrefix::Hecto => 2,
            MetricPrefix::Deca => 1,
            MetricPrefix::Deci => -1,
            MetricPrefix::Centi => -2,
            MetricPrefix::Milli => -3,
            MetricPrefix::Micro => -6,
            MetricPrefix::Nano => -9,
            MetricPrefix::Pico => -12,
            MetricPrefix::Femto => -15,
            MetricPrefix::Atto => -18,
            MetricPrefix::Zepto => -21,
            MetricPrefix::Yocto => -24,
        }
    }

    pub fn factor(self) -> f64 {
        10f64.powi(self.exponent())
    }
}

impl BinaryPrefix {
    /// Power of 1024 represented by the prefix.
    pub fn power(self) -> i32 {
        match self {
            BinaryPrefix::Kibi => 1,
            BinaryPrefix::Mebi => 2,
            BinaryPrefix::Gibi => 3,
            BinaryPrefix::Tebi => 4,
            BinaryPrefix::Pebi => 5,
            BinaryPrefix::Exbi => 6,
            BinaryPrefix::Zebi => 7,
            BinaryPrefix::Yobi => 8,
        }
    }

    pub fn factor(self) -> f64 {
        1024f64.powi(self.power())
    }
}

impl Prefix {
    /// Numeric factor multiplied into the running scale.
    pub fn factor(self) -> f64 {
        match self {
            Prefix::Metric(p) => p.factor(),
            Prefix::Binary(p) => p.factor(),
            Prefix::Custom(f) => f,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_factors() {
        assert_eq!(Prefix::Metric(MetricPrefix::Kilo).factor(), 1000.0);
        assert_eq!(Prefix::Binary(BinaryPrefix::Kibi).factor(), 1024.0);
        assert_eq!(Prefix::Binary(BinaryPrefix::Mebi).factor(), 1_048_576.0);
        assert!((Prefix::Metric(MetricPrefix::Milli).factor() - 0.001).abs() < 1e-15);
        assert_eq!(Prefix::Custom(12.0).factor(), 12.0);
    }
}
