//! Tri-state declared property values.

use serde::{Deserialize, Serialize};

/// A declared property value that keeps "not written" apart from "written as
/// null".
///
/// Inheritable properties use the distinction: an [`Setting::Unset`] value is
/// taken from the specialization parent, an explicit [`Setting::Null`] stops
/// inheritance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Setting<T> {
    /// The property was not written at all.
    #[default]
    Unset,
    /// The property was explicitly written as null.
    Null,
    /// The property was written with a value.
    Value(T),
}

impl<T> Setting<T> {
    /// Returns the value, if one was written.
    pub fn value(&self) -> Option<&T> {
        match self {
            Setting::Value(v) => Some(v),
            Setting::Unset | Setting::Null => None,
        }
    }

    /// Resolves an inheritable property: own value first, otherwise the
    /// parent's resolved value unless the property was explicitly nulled.
    pub fn or_inherit(self, inherited: Option<T>) -> Option<T> {
        match self {
            Setting::Value(v) => Some(v),
            Setting::Null => None,
            Setting::Unset => inherited,
        }
    }
}

impl<T> From<Option<T>> for Setting<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Setting::Value(v),
            None => Setting::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_inherit() {
        assert_eq!(Setting::Value(1).or_inherit(Some(2)), Some(1));
        assert_eq!(Setting::Unset.or_inherit(Some(2)), Some(2));
        assert_eq!(Setting::<i32>::Null.or_inherit(Some(2)), None);
    }

    #[test]
    fn test_missing_option_is_null() {
        assert_eq!(Setting::from(Some(3)), Setting::Value(3));
        assert_eq!(Setting::<i32>::from(None), Setting::Null);
        assert_eq!(Setting::<i32>::default(), Setting::Unset);
    }
}
