//! Opaque source locators.
//!
//! The extraction front-end attaches a [`Locator`] to every declaration and
//! every property it extracted. The resolution engine never interprets a
//! locator; it only copies it onto the diagnostics it emits so the front-end
//! can map them back to source text.

use serde::{Deserialize, Serialize};

/// Compact, uninterpreted source location token.
///
/// Mirrors the front-end's notion of "file + byte range + line", but the
/// resolver only ever compares and copies it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    /// Front-end assigned file index
    pub file_id: u16,
    /// Byte offset of start position
    pub start: u32,
    /// Byte offset of end position (exclusive)
    pub end: u32,
    /// Cached line number (1-based) for the start position
    pub start_line: u16,
}

impl Locator {
    /// Create a new locator.
    pub fn new(file_id: u16, start: u32, end: u32, start_line: u16) -> Self {
        Self {
            file_id,
            start,
            end,
            start_line,
        }
    }
}
