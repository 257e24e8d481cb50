// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Population resolution for unit and quantity declarations
//!
//! Takes the raw declarations extracted from user code, validates them and
//! resolves every cross-reference, producing the populations the code
//! emitter consumes together with a list of diagnostics.

pub mod error;
pub mod resolve;

pub use error::{Diagnostic, ErrorKind, ResolveError, Severity};
pub use resolve::*;
