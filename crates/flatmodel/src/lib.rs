//! Public API facade for the flatmodel storage engine.
//!
//! Re-exports the engine, its vocabulary types, and its error type so
//! consumers depend on one crate. Integration-level tests that exercise the
//! whole stack together live here.

pub use flatmodel_core::{
    Cascade, Cell, HeaderStore, Location, ModelObserver, NoOpObserver, Row, RowSet, Table,
    ValueSlot, VariantHandle,
};
pub use flatmodel_error::{ModelError, Result};
pub use flatmodel_types::{
    IconRef, ItemFlags, Locale, LocaleContext, Orientation, Role, SortKey, SortOrder, Value,
    ValueKind,
};
