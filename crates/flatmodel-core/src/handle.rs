//! The reference-counted embeddable-table handle.
//!
//! A [`VariantHandle`] lets a whole table travel as a cheaply-copyable value
//! (across module boundaries, inside generic dynamic-value containers).
//! Copying a handle shares the table; there is no implicit deep copy. All
//! default-constructed handles share one thread-wide "null" sentinel table,
//! itself reference-counted so it is never freed while any default handle
//! is outstanding. The engine is single-threaded, so sharing is `Rc`-based.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::table::Table;

thread_local! {
    /// The shared empty table behind every default-constructed handle.
    static NULL_SENTINEL: Rc<RefCell<Table>> = Rc::new(RefCell::new(Table::new(0)));
}

/// A shared handle to one table, or to the null sentinel when empty.
///
/// Mutating through a handle mutates the one shared table; every copy
/// observes the change. The sole copy-on-write case is the sentinel: the
/// first mutable access through an empty handle detaches it onto a fresh
/// table so the sentinel itself is never written.
#[derive(Clone)]
pub struct VariantHandle {
    inner: Rc<RefCell<Table>>,
}

impl VariantHandle {
    /// An empty handle sharing the null sentinel. Never allocates a table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: NULL_SENTINEL.with(Rc::clone),
        }
    }

    /// Transfer a live table into a shared handle.
    ///
    /// The table's external wiring (registered observers) is detached
    /// first; after this, all access goes through handles.
    #[must_use]
    pub fn from_table(mut table: Table) -> Self {
        table.disconnect_observers();
        Self {
            inner: Rc::new(RefCell::new(table)),
        }
    }

    /// Returns true if this handle shares the null sentinel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        NULL_SENTINEL.with(|s| Rc::ptr_eq(&self.inner, s))
    }

    /// Returns true if both handles share the same table.
    #[must_use]
    pub fn shares_with(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Borrow the shared table.
    #[must_use]
    pub fn table(&self) -> Ref<'_, Table> {
        self.inner.borrow()
    }

    /// Borrow the shared table mutably, detaching from the sentinel first.
    pub fn table_mut(&mut self) -> RefMut<'_, Table> {
        if self.is_empty() {
            self.inner = Rc::new(RefCell::new(Table::new(0)));
        }
        self.inner.borrow_mut()
    }

    /// Extract a table from the handle.
    ///
    /// The sole owner takes the table out directly; otherwise (or for an
    /// empty handle) a deep copy crosses the boundary.
    #[must_use]
    pub fn into_table(self) -> Table {
        if self.is_empty() {
            return Table::new(0);
        }
        match Rc::try_unwrap(self.inner) {
            Ok(cell) => cell.into_inner(),
            Err(shared) => shared.borrow().clone(),
        }
    }
}

impl Default for VariantHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for VariantHandle {
    /// Handle equality is identity: two handles are equal when they share
    /// one table. All empty handles are equal to each other.
    fn eq(&self, other: &Self) -> bool {
        self.shares_with(other)
    }
}

impl std::fmt::Debug for VariantHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            f.write_str("VariantHandle(empty)")
        } else {
            write!(f, "VariantHandle(strong {})", Rc::strong_count(&self.inner))
        }
    }
}
