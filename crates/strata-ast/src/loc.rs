use core::fmt;

use serde_derive::{Deserialize, Serialize};

/// A position in the source text.
///
/// Lines are 1-based and columns are 0-based, matching the LSP
/// position convention used throughout the toolchain.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    /// 1-based line number.
    pub line: u32,
    /// 0-based column number.
    pub column: u32,
}

impl Location {
    /// Creates a new location.
    pub fn new(line: u32, column: u32) -> Self {
        debug_assert!(line >= 1, "lines are 1-based");
        Self { line, column }
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A trait for types that can provide a source location.
pub trait Located {
    /// Returns the location of the start of the item.
    fn loc(&self) -> Location;
}

impl<T: Located> Located for &T {
    fn loc(&self) -> Location {
        (**self).loc()
    }
}

impl<T: Located> Located for Box<T> {
    fn loc(&self) -> Location {
        (**self).loc()
    }
}
