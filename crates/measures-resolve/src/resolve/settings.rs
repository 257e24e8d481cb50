//! Resolution settings.

use serde::{Deserialize, Serialize};

/// Pre-resolved settings for one resolution run.
///
/// The driver loads and merges configuration; the resolver only receives the
/// final value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionSettings {
    /// Carried through to the population for the emitter.
    pub documentation: bool,
    /// Resolve independent units and quantities on the rayon pool.
    pub parallel: bool,
    /// Emit warning-level diagnostics for redundant list entries.
    pub redundancy_warnings: bool,
    /// Prefix of a constant's multiples property when no name is given.
    pub default_multiples_prefix: String,
}

impl Default for ResolutionSettings {
    fn default() -> Self {
        Self {
            documentation: true,
            parallel: false,
            redundancy_warnings: true,
            default_multiples_prefix: "MultiplesOf".to_string(),
        }
    }
}

impl ResolutionSettings {
    /// Multiples property name used for `constant` when none is declared.
    pub fn default_multiples_name(&self, constant: &str) -> String {
        format!("{}{}", self.default_multiples_prefix, constant)
    }
}
