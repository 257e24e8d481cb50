//! Resolution passes.
//!
//! ```text
//! Registry → Units → Specializations → Inclusion → Constants → Relations → Population
//!            ^^^^^                                   (per quantity, in parallel)
//!   derivations + instance chains
//! ```
//!
//! # Units (`units`)
//!
//! Validates derivation signatures, orders units so that every unit follows
//! the units its signatures reference, binds derived instances against those
//! resolved units and composes every instance's modifier chain into a scale
//! and offset relative to the unit's root.
//!
//! # Specializations (`specialization`)
//!
//! Walks specialization chains, rejects cycles and flattens inherited
//! categories from the base down.
//!
//! # Per-quantity passes (`inclusion`, `constants`, `relations`)
//!
//! Depend only on flattened quantities and resolved units, so every quantity
//! is finished independently.

pub mod constants;
pub mod context;
pub mod derivations;
pub mod inclusion;
pub mod instances;
pub mod pipeline;
pub mod population;
pub mod registry;
pub mod relations;
pub mod settings;
pub mod specialization;
pub mod units;

pub use context::{CancellationToken, ResolutionContext};
pub use pipeline::{resolve, Resolution};
pub use population::{Population, ResolvedQuantity};
pub use registry::Registry;
pub use settings::ResolutionSettings;
pub use units::ResolvedUnit;
