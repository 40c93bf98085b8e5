//! Location handles addressing positions in the row tree.
//!
//! A [`Location`] is the engine's model-index replacement: a path of row
//! indices from the root plus a column. Paths are plain indices rather than
//! interior pointers, so a handle is always safe to hold; it is only
//! *meaningful* until the next structural mutation touching one of the rows
//! on its path.

use std::cmp::Ordering;
use std::fmt;

use smallvec::SmallVec;

/// An opaque handle addressing the root, a row, or a cell of a table.
///
/// The empty path is the root, the "no parent" position. A path of length
/// n addresses a row n levels deep; the column selects a cell within that
/// row. Equality is path + column equality.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Location {
    path: SmallVec<[usize; 4]>,
    column: usize,
}

impl Location {
    /// The root location (no row, column 0).
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a location from a row-index path and a column.
    #[must_use]
    pub fn from_path(path: impl IntoIterator<Item = usize>, column: usize) -> Self {
        Self {
            path: path.into_iter().collect(),
            column,
        }
    }

    /// Returns true for the root location.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// The location of row `row`, column `column` under this one.
    #[must_use]
    pub fn child(&self, row: usize, column: usize) -> Self {
        let mut path = self.path.clone();
        path.push(row);
        Self { path, column }
    }

    /// The parent location (column reset to 0). The root is its own parent.
    #[must_use]
    pub fn parent(&self) -> Self {
        let mut path = self.path.clone();
        path.pop();
        Self { path, column: 0 }
    }

    /// The row index within the parent, or `None` for the root.
    #[must_use]
    pub fn row(&self) -> Option<usize> {
        self.path.last().copied()
    }

    /// The column within the addressed row.
    #[must_use]
    pub fn column(&self) -> usize {
        self.column
    }

    /// This location with a different column.
    #[must_use]
    pub fn with_column(&self, column: usize) -> Self {
        Self {
            path: self.path.clone(),
            column,
        }
    }

    /// Tree depth: 0 for the root, 1 for top-level rows.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// The row-index path from the root.
    #[must_use]
    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// Returns true if `self` addresses a strict ancestor row of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        other.path.len() > self.path.len() && other.path.starts_with(&self.path)
    }

    /// Depth-first traversal order over row paths (columns ignored).
    ///
    /// A row orders before all of its descendants; siblings order by index.
    #[must_use]
    pub fn traversal_cmp(&self, other: &Self) -> Ordering {
        self.path.cmp(&other.path)
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Location({:?}, col {})", &self.path[..], self.column)
    }
}
