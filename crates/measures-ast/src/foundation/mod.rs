//! Foundation types shared by declarations and the resolver.

pub mod locator;
pub mod magnitude;
pub mod path;
pub mod prefix;
pub mod setting;

pub use locator::Locator;
pub use magnitude::Magnitude;
pub use path::{Path, TypeId};
pub use prefix::{BinaryPrefix, MetricPrefix, Prefix};
pub use setting::Setting;
