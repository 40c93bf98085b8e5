//! Hierarchical sparse table storage engine.
//!
//! An in-memory tree-of-rows × fixed-column data store: the "flat item
//! model" that backs grid and tree views. One [`Table`] owns a tree of
//! sparse [`row::RowSet`] levels; cells materialize lazily on first write,
//! hold one value per (role, locale), and track a per-slot changed bit.
//!
//! The engine is single-threaded and synchronous. Every operation runs to
//! completion on the calling thread and either succeeds or fails
//! deterministically; change notifications fire in-line through the
//! [`ModelObserver`] hooks. Shared ownership exists in exactly one place,
//! the [`VariantHandle`] layer, which lets a whole table travel as a
//! cheaply-copyable value.

pub mod cell;
pub mod handle;
pub mod headers;
pub mod location;
pub mod observer;
pub mod row;
mod search;
pub mod slot;
mod sort;
pub mod table;

pub use cell::Cell;
pub use handle::VariantHandle;
pub use headers::HeaderStore;
pub use location::Location;
pub use observer::{ModelObserver, NoOpObserver};
pub use row::{Cascade, Row, RowSet};
pub use slot::ValueSlot;
pub use table::Table;
