//! Structural-change notification hooks.
//!
//! Observation is opt-in: all trait methods are `&self` with
//! empty default bodies, and a table with no registered observers pays only
//! an empty-vector check per mutation.
//!
//! Every structural notification is a matched begin/end bracket fired
//! synchronously around the mutation. Handlers must not re-enter a
//! structural mutation on the same table while a notification is in flight;
//! the engine does not guard against it.

use std::rc::Rc;

use flatmodel_types::{Orientation, Role};

use crate::location::Location;

/// Callbacks for table mutations.
///
/// `first`/`last` are inclusive section bounds, matching what view layers
/// expect to suspend their indices over.
#[allow(unused_variables)]
pub trait ModelObserver {
    /// The whole table is about to be rebuilt; all locations become invalid.
    fn model_about_to_be_reset(&self) {}
    /// The rebuild finished.
    fn model_reset(&self) {}

    /// Rows `[first, last]` are about to be inserted under `parent`.
    fn rows_about_to_be_inserted(&self, parent: &Location, first: usize, last: usize) {}
    /// The insertion finished.
    fn rows_inserted(&self, parent: &Location, first: usize, last: usize) {}

    /// Rows `[first, last]` under `parent` are about to be removed.
    fn rows_about_to_be_removed(&self, parent: &Location, first: usize, last: usize) {}
    /// The removal finished.
    fn rows_removed(&self, parent: &Location, first: usize, last: usize) {}

    /// Rows `[first, last]` under `src_parent` are about to move before the
    /// pre-move index `dst` under `dst_parent`.
    fn rows_about_to_be_moved(
        &self,
        src_parent: &Location,
        first: usize,
        last: usize,
        dst_parent: &Location,
        dst: usize,
    ) {
    }
    /// The move finished.
    fn rows_moved(
        &self,
        src_parent: &Location,
        first: usize,
        last: usize,
        dst_parent: &Location,
        dst: usize,
    ) {
    }

    /// Columns `[first, last]` are about to be inserted (table-wide).
    fn columns_about_to_be_inserted(&self, first: usize, last: usize) {}
    /// The insertion finished.
    fn columns_inserted(&self, first: usize, last: usize) {}

    /// Columns `[first, last]` are about to be removed (table-wide).
    fn columns_about_to_be_removed(&self, first: usize, last: usize) {}
    /// The removal finished.
    fn columns_removed(&self, first: usize, last: usize) {}

    /// Columns `[first, last]` are about to move before pre-move index `dst`.
    fn columns_about_to_be_moved(&self, first: usize, last: usize, dst: usize) {}
    /// The move finished.
    fn columns_moved(&self, first: usize, last: usize, dst: usize) {}

    /// The cell at `location` changed for `roles`.
    fn data_changed(&self, location: &Location, roles: &[Role]) {}

    /// A header label changed.
    fn header_data_changed(&self, orientation: Orientation, section: usize) {}
}

/// An observer that ignores everything. Useful as a base for tests and for
/// consumers that only care about one or two hooks.
pub struct NoOpObserver;

impl ModelObserver for NoOpObserver {}

/// The table's observer list.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    observers: Vec<Rc<dyn ModelObserver>>,
}

impl ObserverRegistry {
    pub(crate) fn add(&mut self, observer: Rc<dyn ModelObserver>) {
        self.observers.push(observer);
    }

    pub(crate) fn clear(&mut self) {
        self.observers.clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Invoke `f` for every registered observer.
    ///
    /// The list is snapshotted first so an observer that registers or
    /// removes observers does not invalidate the iteration.
    pub(crate) fn notify(&self, f: impl Fn(&dyn ModelObserver)) {
        if self.observers.is_empty() {
            return;
        }
        let snapshot: Vec<Rc<dyn ModelObserver>> = self.observers.clone();
        for observer in &snapshot {
            f(observer.as_ref());
        }
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.observers.len())
            .finish()
    }
}
