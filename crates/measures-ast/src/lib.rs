// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Declaration records for the measures code generator.
//!
//! This crate holds the plain, unresolved records that the extraction
//! front-end produces for every declared unit and quantity, together with the
//! foundation types they are built from.

pub mod decl;
pub mod foundation;

pub use decl::*;
pub use foundation::{
    BinaryPrefix, Locator, Magnitude, MetricPrefix, Path, Prefix, Setting, TypeId,
};
