//! Shared vocabulary for the flatmodel storage engine.
//!
//! This crate is the leaf of the workspace: it defines the dynamic [`Value`]
//! type stored in cells and headers, the [`Locale`] tags and resolution
//! policy used for multi-language cell values, the open-ended [`Role`] keys,
//! and the [`ItemFlags`] bitmask. It has no knowledge of the row tree itself.

pub mod flags;
pub mod locale;
pub mod role;
pub mod value;

pub use flags::ItemFlags;
pub use locale::{Locale, LocaleContext};
pub use role::Role;
pub use value::{IconRef, Value, ValueKind};

use serde::{Deserialize, Serialize};

/// Direction of a sort pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    /// Smallest value first.
    #[default]
    Ascending,
    /// Largest value first.
    Descending,
}

impl SortOrder {
    /// Apply this direction to an already-computed ascending ordering.
    #[inline]
    #[must_use]
    pub fn apply(self, ord: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            Self::Ascending => ord,
            Self::Descending => ord.reverse(),
        }
    }
}

/// One key of a multi-column sort: which column to compare, in which
/// direction, and which role's value to read.
///
/// Keys are evaluated in list order; later keys only break ties left by
/// earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Column whose values drive the comparison.
    pub column: usize,
    /// Sort direction.
    pub order: SortOrder,
    /// Role to read from each cell (usually [`Role::DISPLAY`]).
    pub role: Role,
}

impl SortKey {
    /// Ascending sort on `column` by display role.
    #[must_use]
    pub fn ascending(column: usize) -> Self {
        Self {
            column,
            order: SortOrder::Ascending,
            role: Role::DISPLAY,
        }
    }

    /// Descending sort on `column` by display role.
    #[must_use]
    pub fn descending(column: usize) -> Self {
        Self {
            column,
            order: SortOrder::Descending,
            role: Role::DISPLAY,
        }
    }
}

/// Which header band a section index addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// Column headers (sections are column indices).
    Horizontal,
    /// Row headers (sections are top-level row indices).
    Vertical,
}
