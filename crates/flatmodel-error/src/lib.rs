//! Error types for the flatmodel storage engine.
//!
//! The engine distinguishes two failure tiers and never mixes them:
//!
//! - **Recoverable validation failures**: out-of-range indices, invalid
//!   move ranges, malformed bulk data. These surface as [`ModelError`]
//!   values; callers are expected to check the result. No operation panics
//!   on bad input.
//! - **Programmer-contract violations**: a column index reaching row-level
//!   storage that was never validated, bookkeeping that has drifted out of
//!   sync. These halt through [`contract_check!`]: continuing in an
//!   inconsistent state is worse than stopping.

use thiserror::Error;

/// Primary error type for model operations.
///
/// Every variant is a recoverable validation failure; contract violations
/// never surface here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Row index past the row count of its parent.
    #[error("row {row} out of range (parent has {count} rows)")]
    RowOutOfRange { row: usize, count: usize },

    /// Row span `[row, row + span)` does not fit the parent.
    #[error("row range {row}+{span} out of range (parent has {count} rows)")]
    RowRangeOutOfRange { row: usize, span: usize, count: usize },

    /// Column index past the table's column count.
    #[error("column {column} out of range (table has {count} columns)")]
    ColumnOutOfRange { column: usize, count: usize },

    /// Column span `[column, column + span)` does not fit the table.
    #[error("column range {column}+{span} out of range (table has {count} columns)")]
    ColumnRangeOutOfRange {
        column: usize,
        span: usize,
        count: usize,
    },

    /// A location handle does not address a row in this table.
    #[error("location does not address a row in this table")]
    NoSuchLocation,

    /// A move destination lies inside the moved span.
    #[error("move destination {destination} overlaps source span {row}+{span}")]
    MoveOverlapsSource {
        row: usize,
        span: usize,
        destination: usize,
    },

    /// A move would re-parent a span into its own descendant subtree.
    #[error("move destination is inside the moved subtree")]
    MoveIntoOwnSubtree,

    /// Header section index past the section count.
    #[error("header section {section} out of range ({count} sections)")]
    HeaderSectionOutOfRange { section: usize, count: usize },

    /// An empty span was passed where at least one row/column is required.
    #[error("operation requires a non-empty span")]
    EmptySpan,
}

/// Result alias used across the engine.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Assert an internal contract, halting on violation.
///
/// This is the fatal tier: a failed check means the caller broke a
/// documented precondition or the engine's own bookkeeping is inconsistent.
/// Never use it for input validation; that tier returns [`ModelError`].
#[macro_export]
macro_rules! contract_check {
    ($cond:expr, $($arg:tt)+) => {
        assert!($cond, "contract violation: {}", format_args!($($arg)+));
    };
}
