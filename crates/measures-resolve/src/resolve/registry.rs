//! Declaration registry.
//!
//! Indexes every raw declaration by identity so later stages can resolve
//! references regardless of declaration order. The registry performs no
//! validation beyond rejecting identity collisions.

use indexmap::IndexMap;
use measures_ast::{DeclKind, Declaration, Locator, RawQuantity, RawUnit, TypeId};

use crate::error::{Diagnostic, ErrorKind};

/// Registry of raw declarations keyed by [`TypeId`], in registration order.
#[derive(Debug, Default)]
pub struct Registry {
    declarations: IndexMap<TypeId, Declaration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a flat declaration list.
    pub fn build(
        declarations: impl IntoIterator<Item = Declaration>,
        errors: &mut Vec<Diagnostic>,
    ) -> Self {
        let mut registry = Self::new();
        for declaration in declarations {
            registry.register(declaration, errors);
        }
        registry
    }

    /// Indexes `declaration` by its identity.
    ///
    /// On collision the earlier declaration is kept and the new one is
    /// dropped with a diagnostic. Returns whether the declaration was kept.
    pub fn register(&mut self, declaration: Declaration, errors: &mut Vec<Diagnostic>) -> bool {
        if let Some(existing) = self.declarations.get(declaration.id()) {
            errors.push(
                Diagnostic::error(
                    ErrorKind::DuplicateTypeDeclaration,
                    declaration.locator(),
                    format!("duplicate type declaration '{}'", declaration.id()),
                )
                .with_label(existing.locator(), "first declared here".to_string()),
            );
            return false;
        }
        self.declarations
            .insert(declaration.id().clone(), declaration);
        true
    }

    pub fn lookup(&self, id: &TypeId) -> Option<&Declaration> {
        self.declarations.get(id)
    }

    /// Looks up a declaration of the given kind by simple type name.
    ///
    /// Returns `None` when no declaration, or more than one, matches.
    pub fn lookup_by_kind_and_name(&self, kind: DeclKind, name: &str) -> Option<&Declaration> {
        let mut matches = self
            .declarations
            .values()
            .filter(|decl| decl.kind() == kind && decl.id().name() == name);
        let first = matches.next()?;
        match matches.next() {
            Some(_) => None,
            None => Some(first),
        }
    }

    pub fn unit(&self, id: &TypeId) -> Option<&RawUnit> {
        match self.lookup(id)? {
            Declaration::Unit(unit) => Some(unit),
            Declaration::Quantity(_) => None,
        }
    }

    pub fn quantity(&self, id: &TypeId) -> Option<&RawQuantity> {
        match self.lookup(id)? {
            Declaration::Quantity(quantity) => Some(quantity),
            Declaration::Unit(_) => None,
        }
    }

    /// Resolves a reference that must name a unit, reporting why it does not.
    pub fn expect_unit(
        &self,
        id: &TypeId,
        locator: Locator,
        errors: &mut Vec<Diagnostic>,
    ) -> Option<&RawUnit> {
        match self.lookup(id) {
            Some(Declaration::Unit(unit)) => Some(unit),
            Some(Declaration::Quantity(_)) => {
                errors.push(Diagnostic::error(
                    ErrorKind::TypeKindMismatch,
                    locator,
                    format!("expected '{}' to be a unit, found a quantity", id),
                ));
                None
            }
            None => {
                errors.push(unrecognized_type(id, locator));
                None
            }
        }
    }

    /// Resolves a reference that must name a quantity, reporting why it does
    /// not.
    pub fn expect_quantity(
        &self,
        id: &TypeId,
        locator: Locator,
        errors: &mut Vec<Diagnostic>,
    ) -> Option<&RawQuantity> {
        match self.lookup(id) {
            Some(Declaration::Quantity(quantity)) => Some(quantity),
            Some(Declaration::Unit(_)) => {
                errors.push(Diagnostic::error(
                    ErrorKind::TypeKindMismatch,
                    locator,
                    format!("expected '{}' to be a quantity, found a unit", id),
                ));
                None
            }
            None => {
                errors.push(unrecognized_type(id, locator));
                None
            }
        }
    }

    pub fn units(&self) -> impl Iterator<Item = &RawUnit> {
        self.declarations.values().filter_map(|decl| match decl {
            Declaration::Unit(unit) => Some(unit),
            Declaration::Quantity(_) => None,
        })
    }

    pub fn quantities(&self) -> impl Iterator<Item = &RawQuantity> {
        self.declarations.values().filter_map(|decl| match decl {
            Declaration::Quantity(quantity) => Some(quantity),
            Declaration::Unit(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

pub(crate) fn unrecognized_type(id: &TypeId, locator: Locator) -> Diagnostic {
    Diagnostic::error(
        ErrorKind::UnrecognizedType,
        locator,
        format!("unrecognized type '{}'", id),
    )
}
