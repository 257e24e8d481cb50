//! Unit declarations.
//!
//! A unit type (e.g. `UnitOfLength`) declares a set of named instances
//! (`Metre`, `Kilometre`, ...) and optionally a set of derivation signatures
//! describing how the unit relates to other units.

use serde::{Deserialize, Serialize};

use crate::foundation::{Locator, Magnitude, Prefix, Setting, TypeId};

/// Raw unit declaration, as extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawUnit {
    pub id: TypeId,
    /// Scalar quantity measured by this unit.
    pub quantity: TypeId,
    /// Whether instances may carry a bias offset (e.g. temperature).
    pub bias_term: bool,
    pub instances: Vec<RawUnitInstance>,
    pub derivations: Vec<RawDerivation>,
    pub locator: Locator,
}

impl RawUnit {
    pub fn new(id: impl Into<TypeId>, quantity: impl Into<TypeId>, locator: Locator) -> Self {
        Self {
            id: id.into(),
            quantity: quantity.into(),
            bias_term: false,
            instances: Vec::new(),
            derivations: Vec::new(),
            locator,
        }
    }

    pub fn with_bias_term(self, bias_term: bool) -> Self {
        Self { bias_term, ..self }
    }

    pub fn with_instance(mut self, instance: RawUnitInstance) -> Self {
        self.instances.push(instance);
        self
    }

    pub fn with_derivation(mut self, derivation: RawDerivation) -> Self {
        self.derivations.push(derivation);
        self
    }
}

/// A single named instance of a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawUnitInstance {
    pub name: String,
    /// Plural form. Unset or null falls back to `name + "s"`.
    pub plural: Setting<String>,
    pub kind: RawInstanceKind,
    pub locator: Locator,
}

impl RawUnitInstance {
    pub fn new(name: impl Into<String>, kind: RawInstanceKind, locator: Locator) -> Self {
        Self {
            name: name.into(),
            plural: Setting::Unset,
            kind,
            locator,
        }
    }

    pub fn fixed(name: impl Into<String>, locator: Locator) -> Self {
        Self::new(name, RawInstanceKind::Fixed, locator)
    }

    pub fn alias(name: impl Into<String>, original: impl Into<String>, locator: Locator) -> Self {
        Self::new(
            name,
            RawInstanceKind::Alias {
                original: original.into(),
            },
            locator,
        )
    }

    pub fn scaled(
        name: impl Into<String>,
        original: impl Into<String>,
        scale: impl Into<Magnitude>,
        locator: Locator,
    ) -> Self {
        Self::new(
            name,
            RawInstanceKind::Scaled {
                original: original.into(),
                scale: scale.into(),
            },
            locator,
        )
    }

    pub fn prefixed(
        name: impl Into<String>,
        original: impl Into<String>,
        prefix: Prefix,
        locator: Locator,
    ) -> Self {
        Self::new(
            name,
            RawInstanceKind::Prefixed {
                original: original.into(),
                prefix,
            },
            locator,
        )
    }

    pub fn biased(
        name: impl Into<String>,
        original: impl Into<String>,
        bias: impl Into<Magnitude>,
        locator: Locator,
    ) -> Self {
        Self::new(
            name,
            RawInstanceKind::Biased {
                original: original.into(),
                bias: bias.into(),
            },
            locator,
        )
    }

    pub fn derived(
        name: impl Into<String>,
        derivation: Option<&str>,
        instances: &[&str],
        locator: Locator,
    ) -> Self {
        Self::new(
            name,
            RawInstanceKind::Derived {
                derivation: derivation.map(String::from),
                instances: instances.iter().map(|s| s.to_string()).collect(),
            },
            locator,
        )
    }

    pub fn with_plural(self, plural: impl Into<String>) -> Self {
        Self {
            plural: Setting::Value(plural.into()),
            ..self
        }
    }

    /// The effective plural form.
    pub fn plural_form(&self) -> String {
        match &self.plural {
            Setting::Value(plural) => plural.clone(),
            Setting::Unset | Setting::Null => format!("{}s", self.name),
        }
    }
}

/// How an instance is defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawInstanceKind {
    /// A root instance with scale one and no offset.
    Fixed,
    /// Same magnitude as `original` under another name.
    Alias { original: String },
    /// `original` multiplied by a factor.
    Scaled { original: String, scale: Magnitude },
    /// `original` multiplied by a prefix factor.
    Prefixed { original: String, prefix: Prefix },
    /// `original` shifted by an offset. Requires a unit with a bias term.
    Biased { original: String, bias: Magnitude },
    /// Computed from instances of other units through a derivation signature.
    Derived {
        derivation: Option<String>,
        instances: Vec<String>,
    },
}

impl RawInstanceKind {
    /// Name of the instance this one modifies, if any.
    pub fn original(&self) -> Option<&str> {
        match self {
            RawInstanceKind::Fixed | RawInstanceKind::Derived { .. } => None,
            RawInstanceKind::Alias { original }
            | RawInstanceKind::Scaled { original, .. }
            | RawInstanceKind::Prefixed { original, .. }
            | RawInstanceKind::Biased { original, .. } => Some(original),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RawInstanceKind::Fixed => "fixed",
            RawInstanceKind::Alias { .. } => "alias",
            RawInstanceKind::Scaled { .. } => "scaled",
            RawInstanceKind::Prefixed { .. } => "prefixed",
            RawInstanceKind::Biased { .. } => "biased",
            RawInstanceKind::Derived { .. } => "derived",
        }
    }
}

/// A derivation signature, declared on a unit (over unit types) or on a
/// quantity (over quantity types).
///
/// The expression refers to signature positions with `{0}`, `{1}`, ...
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDerivation {
    /// Required once more than one signature is declared on the same type.
    pub id: Option<String>,
    pub expression: String,
    pub signature: Vec<TypeId>,
    /// Whether any arrangement of the signature is accepted when matching.
    pub permutations: bool,
    pub locator: Locator,
}

impl RawDerivation {
    pub fn new(expression: impl Into<String>, signature: &[&str], locator: Locator) -> Self {
        Self {
            id: None,
            expression: expression.into(),
            signature: signature.iter().map(|s| TypeId::from(*s)).collect(),
            permutations: false,
            locator,
        }
    }

    pub fn with_id(self, id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..self
        }
    }

    pub fn with_permutations(self, permutations: bool) -> Self {
        Self {
            permutations,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural_defaults_to_name_with_s() {
        let loc = Locator::default();
        let metre = RawUnitInstance::fixed("Metre", loc);
        assert_eq!(metre.plural_form(), "Metres");
        let foot = RawUnitInstance::fixed("Foot", loc).with_plural("Feet");
        assert_eq!(foot.plural_form(), "Feet");
    }

    #[test]
    fn test_instance_original() {
        let loc = Locator::default();
        let km = RawUnitInstance::scaled("Kilometre", "Metre", 1000.0, loc);
        assert_eq!(km.kind.original(), Some("Metre"));
        assert_eq!(RawInstanceKind::Fixed.original(), None);
    }

    #[test]
    fn test_builder_does_not_mutate_original() {
        let loc = Locator::default();
        let unit = RawUnit::new("UnitOfLength", "Length", loc);
        let with = unit.clone().with_instance(RawUnitInstance::fixed("Metre", loc));
        assert!(unit.instances.is_empty());
        assert_eq!(with.instances.len(), 1);
        assert_ne!(unit, with);
    }
}
