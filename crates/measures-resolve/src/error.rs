//! Resolution diagnostics.
//!
//! Every problem found in user-authored declarations is reported as a
//! [`Diagnostic`] rather than a Rust error: resolution always produces a
//! usable population, and diagnostics explain what was left out of it and
//! why. Only cancellation and front-end contract violations surface as
//! [`ResolveError`].
//!
//! # Examples
//!
//! ```
//! # use measures_resolve::error::*;
//! # use measures_ast::Locator;
//! let diagnostic = Diagnostic::error(
//!     ErrorKind::DuplicateTypeDeclaration,
//!     Locator::default(),
//!     "duplicate type declaration 'Length'".to_string(),
//! );
//! assert_eq!(diagnostic.kind.code(), "MEAS0001");
//! ```

use std::fmt;

use measures_ast::Locator;
use serde::Serialize;
use thiserror::Error;

/// Resolution diagnostic with locator and message.
///
/// Each diagnostic has:
/// - Primary locator (the declaration or property at fault)
/// - Error kind (stable category and code)
/// - Message (human-readable, values already substituted)
/// - Optional secondary labels (related declarations)
/// - Optional notes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Diagnostic {
    /// Category of this diagnostic
    pub kind: ErrorKind,
    /// Severity level
    pub severity: Severity,
    /// Primary source location
    pub locator: Locator,
    /// Primary message
    pub message: String,
    /// Additional labeled locations
    pub labels: Vec<Label>,
    /// Additional notes or hints
    pub notes: Vec<String>,
}

/// Category of a resolution diagnostic.
///
/// # Invariant
///
/// The discriminant values must match the ERROR_KIND_TABLE indices. Codes
/// are stable across releases; new kinds are only ever appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u16)]
pub enum ErrorKind {
    // Registry
    /// Referenced type is not declared
    UnrecognizedType = 0,
    /// Two declarations share one identity
    DuplicateTypeDeclaration = 1,
    /// Referenced type has the wrong entity kind
    TypeKindMismatch = 2,

    // Unit instances
    /// Modified instance references an unknown instance
    UnrecognizedOriginalInstance = 3,
    /// Modifier chain loops back on itself
    CyclicallyModifiedInstance = 4,
    /// Biased instance on a unit without a bias term
    UnitNotIncludingBiasTerm = 5,
    /// Derivations declared on a unit with a bias term
    UnitIncludesBiasTerm = 6,
    /// Instance name or plural form used twice
    DuplicateInstanceName = 7,

    // Derivations
    /// Signature is empty or unusable
    InvalidDerivationSignature = 8,
    /// Expression does not match the signature
    InvalidDerivationExpression = 9,
    /// Derivation id or signature declared twice
    DuplicateDerivation = 10,
    /// Several signatures and no id to pick one
    AmbiguousDerivationSignature = 11,
    /// Derivation id does not exist
    UnrecognizedDerivation = 12,
    /// Derived instance lists the wrong number of instances
    IncompatibleDerivedUnitListSize = 13,
    /// Derived instance lists an instance of the wrong unit
    IncompatibleDerivedUnitInstance = 14,

    // Quantities
    /// Specialization chain loops back on itself
    CyclicSpecialization = 15,
    /// Unit instance name not found or not visible
    UnrecognizedUnitInstance = 16,
    /// Inclusion/exclusion entry with no effect
    RedundantListing = 17,
    /// Include and Exclude lists on one quantity
    ContradictoryInclusion = 18,
    /// Constant or multiples name used twice
    DuplicateConstantName = 19,
    /// Constant name collides with a unit or instance name
    ConstantSharesName = 20,
    /// Multiples name collides with a unit or instance name
    ConstantMultiplesSharesName = 21,

    // Relationships
    /// Conversion between incompatible quantities
    IncompatibleConversion = 22,
    /// Quantity listed as convertible to itself
    ConvertibleToSelf = 23,
    /// Dimension does not match what the reference requires
    UnexpectedDimension = 24,
    /// Operation declared twice
    DuplicateOperation = 25,
    /// Two members of one vector group share a dimension
    DuplicateMemberDimension = 26,

    // Generic
    /// Front-end contract violation or resolver bug
    Internal = 27,
}

/// Stable code and human-readable name for each error kind.
///
/// Index matches ErrorKind discriminant.
const ERROR_KIND_TABLE: &[(&str, &str)] = &[
    ("MEAS0000", "unrecognized type"),                     // 0
    ("MEAS0001", "duplicate type declaration"),            // 1
    ("MEAS0002", "type kind mismatch"),                    // 2
    ("MEAS0003", "unrecognized original unit instance"),   // 3
    ("MEAS0004", "cyclically modified unit instance"),     // 4
    ("MEAS0005", "unit does not include a bias term"),     // 5
    ("MEAS0006", "unit includes a bias term"),             // 6
    ("MEAS0007", "duplicate unit instance name"),          // 7
    ("MEAS0008", "invalid derivation signature"),          // 8
    ("MEAS0009", "invalid derivation expression"),         // 9
    ("MEAS0010", "duplicate derivation"),                  // 10
    ("MEAS0011", "ambiguous derivation signature"),        // 11
    ("MEAS0012", "unrecognized derivation"),               // 12
    ("MEAS0013", "incompatible derived unit list size"),   // 13
    ("MEAS0014", "incompatible derived unit instance"),    // 14
    ("MEAS0015", "cyclic specialization"),                 // 15
    ("MEAS0016", "unrecognized unit instance"),            // 16
    ("MEAS0017", "redundant listing"),                     // 17
    ("MEAS0018", "contradictory inclusion"),               // 18
    ("MEAS0019", "duplicate constant name"),               // 19
    ("MEAS0020", "constant shares name"),                  // 20
    ("MEAS0021", "constant multiples shares name"),        // 21
    ("MEAS0022", "incompatible conversion"),               // 22
    ("MEAS0023", "convertible to self"),                   // 23
    ("MEAS0024", "unexpected dimension"),                  // 24
    ("MEAS0025", "duplicate operation"),                   // 25
    ("MEAS0026", "duplicate vector group member dimension"), // 26
    ("MEAS0027", "internal resolver error"),               // 27
];

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    /// Declaration is valid but suspicious
    Warning,
    /// Part of a declaration was left out of the population
    Error,
}

/// Secondary labeled location in a diagnostic.
///
/// Used to point to related declarations (e.g. "first declared here").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Label {
    pub locator: Locator,
    pub message: String,
}

impl Diagnostic {
    /// Creates a new error diagnostic.
    pub fn error(kind: ErrorKind, locator: Locator, message: String) -> Self {
        Self::with_severity(kind, Severity::Error, locator, message)
    }

    /// Creates a new warning diagnostic.
    pub fn warning(kind: ErrorKind, locator: Locator, message: String) -> Self {
        Self::with_severity(kind, Severity::Warning, locator, message)
    }

    fn with_severity(
        kind: ErrorKind,
        severity: Severity,
        locator: Locator,
        message: String,
    ) -> Self {
        Self {
            kind,
            severity,
            locator,
            message,
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Adds a secondary labeled location.
    pub fn with_label(mut self, locator: Locator, message: String) -> Self {
        self.labels.push(Label { locator, message });
        self
    }

    /// Adds a note or hint.
    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl ErrorKind {
    /// Stable categorical code, e.g. `MEAS0015`.
    pub fn code(self) -> &'static str {
        ERROR_KIND_TABLE[self as usize].0
    }

    /// Human-readable name for this error kind.
    pub fn name(self) -> &'static str {
        ERROR_KIND_TABLE[self as usize].1
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]: {}: {}",
            self.severity,
            self.kind.code(),
            self.kind.name(),
            self.message
        )
    }
}

/// Failures that abort a resolution run as a whole.
///
/// A run that returns one of these produced no population; the caller
/// discards it wholesale.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("resolution was cancelled")]
    Cancelled,

    #[error("front-end contract violated: {0}")]
    Contract(String),

    #[error("invalid placeholder pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_discriminants() {
        assert_eq!(ERROR_KIND_TABLE.len(), ErrorKind::Internal as usize + 1);
        assert_eq!(ErrorKind::UnrecognizedType.code(), "MEAS0000");
        assert_eq!(ErrorKind::CyclicSpecialization.code(), "MEAS0015");
        assert_eq!(ErrorKind::Internal.code(), "MEAS0027");
        assert_eq!(ErrorKind::ConstantSharesName.name(), "constant shares name");
    }

    #[test]
    fn test_display_includes_code() {
        let diagnostic = Diagnostic::warning(
            ErrorKind::RedundantListing,
            Locator::default(),
            "'Metre' is already included".to_string(),
        )
        .with_note("remove the entry".to_string());
        assert_eq!(
            diagnostic.to_string(),
            "warning[MEAS0017]: redundant listing: 'Metre' is already included"
        );
        assert_eq!(diagnostic.notes.len(), 1);
        assert!(!diagnostic.is_error());
    }
}
