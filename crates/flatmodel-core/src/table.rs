//! The root table object.
//!
//! [`Table`] is the sole entry point for reads, writes, structural
//! mutation, and change notification. It owns the root [`RowSet`], the two
//! header stores, and the search-index cache, and keeps all three
//! consistent across every mutation.
//!
//! Validation discipline: every public operation checks its indices here
//! and reports bad input as a recoverable [`ModelError`]. Once an index
//! crosses into the row tree it is a guaranteed precondition; tree-level
//! violations halt (see the crate's error-tier notes).

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::debug;

use flatmodel_error::{contract_check, ModelError, Result};
use flatmodel_types::{
    ItemFlags, Locale, LocaleContext, Orientation, Role, SortKey, Value,
};

use crate::cell::Cell;
use crate::handle::VariantHandle;
use crate::headers::HeaderStore;
use crate::location::Location;
use crate::observer::{ModelObserver, ObserverRegistry};
use crate::row::{Cascade, Row, RowSet};
use crate::search::SearchIndexCache;
use crate::sort;

/// Hierarchical sparse table: a tree of rows × a fixed set of columns.
///
/// Every row anywhere in the tree has exactly [`Table::column_count`]
/// logical columns; storage is materialized lazily on first write.
#[derive(Debug)]
pub struct Table {
    column_count: usize,
    default_flags: ItemFlags,
    root: RowSet,
    row_headers: HeaderStore,
    column_headers: HeaderStore,
    search: SearchIndexCache,
    locale_ctx: LocaleContext,
    active_locale: Locale,
    locale_override: Option<Locale>,
    observers: ObserverRegistry,
    reset_depth: usize,
    moving: bool,
}

impl Table {
    /// An empty table with `columns` columns.
    #[must_use]
    pub fn new(columns: usize) -> Self {
        Self {
            column_count: columns,
            default_flags: ItemFlags::default(),
            root: RowSet::new(columns),
            row_headers: HeaderStore::default(),
            column_headers: HeaderStore::default(),
            search: SearchIndexCache::default(),
            locale_ctx: LocaleContext::default(),
            active_locale: Locale::ANY,
            locale_override: None,
            observers: ObserverRegistry::default(),
            reset_depth: 0,
            moving: false,
        }
    }

    /// An empty table pre-sized to `rows` top-level rows and `columns`
    /// columns (rows stay unmaterialized).
    #[must_use]
    pub fn with_dimensions(rows: usize, columns: usize) -> Self {
        let mut table = Self::new(columns);
        table.root.set_row_count(rows);
        table
    }

    // -- locale & flags configuration ---------------------------------------

    /// The ambient default locales used by value resolution.
    #[must_use]
    pub fn locale_context(&self) -> &LocaleContext {
        &self.locale_ctx
    }

    /// Replace the ambient locale context.
    pub fn set_locale_context(&mut self, ctx: LocaleContext) {
        self.locale_ctx = ctx;
        self.search.invalidate();
    }

    /// The locale reads and writes resolve through by default.
    #[must_use]
    pub fn active_locale(&self) -> &Locale {
        &self.active_locale
    }

    /// Switch the active locale.
    pub fn set_active_locale(&mut self, locale: Locale) {
        self.active_locale = locale;
        self.search.invalidate();
    }

    /// Set or clear a scoped locale override; while present it wins over
    /// the active locale.
    pub fn set_locale_override(&mut self, locale: Option<Locale>) {
        self.locale_override = locale;
        self.search.invalidate();
    }

    fn effective_locale(&self) -> &Locale {
        self.locale_override.as_ref().unwrap_or(&self.active_locale)
    }

    /// Flags returned for cells without an explicit override.
    #[must_use]
    pub fn default_flags(&self) -> ItemFlags {
        self.default_flags
    }

    /// Replace the default flags.
    pub fn set_default_flags(&mut self, flags: ItemFlags) {
        self.default_flags = flags;
    }

    // -- observers ----------------------------------------------------------

    /// Register an observer for change notifications.
    pub fn add_observer(&mut self, observer: Rc<dyn ModelObserver>) {
        self.observers.add(observer);
    }

    /// Detach every registered observer.
    pub fn disconnect_observers(&mut self) {
        self.observers.clear();
    }

    /// Returns true if at least one observer is registered.
    #[must_use]
    pub fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    // -- dimensions & navigation --------------------------------------------

    /// The table-wide column count.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// The number of rows under `parent` (0 for anything unmaterialized or
    /// out of range).
    #[must_use]
    pub fn row_count(&self, parent: &Location) -> usize {
        match self.set_for(parent) {
            Ok(Some(set)) => set.row_count(),
            _ => 0,
        }
    }

    /// Returns true if `parent` has at least one child row.
    #[must_use]
    pub fn has_children(&self, parent: &Location) -> bool {
        self.row_count(parent) > 0
    }

    /// Returns true if the table has no top-level rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.row_count() == 0
    }

    /// Logical row count across the whole tree.
    #[must_use]
    pub fn total_row_count(&self) -> usize {
        self.root.total_row_count()
    }

    /// Build a location handle for (`row`, `col`) under `parent`.
    ///
    /// The handle stays meaningful until the next structural mutation of
    /// that row or column.
    pub fn index(&self, row: usize, col: usize, parent: &Location) -> Result<Location> {
        if col >= self.column_count {
            return Err(ModelError::ColumnOutOfRange {
                column: col,
                count: self.column_count,
            });
        }
        let count = self.parent_row_count(parent)?;
        if row >= count {
            return Err(ModelError::RowOutOfRange { row, count });
        }
        Ok(parent.child(row, col))
    }

    // -- data ---------------------------------------------------------------

    /// Read the value at `location` for `role`, resolved through the
    /// active (or overridden) locale. Missing data reads as [`Value::Null`].
    #[must_use]
    pub fn data(&self, location: &Location, role: Role) -> Value {
        self.data_with_locale(location, role, self.effective_locale())
    }

    /// Read with an explicit locale instead of the active one.
    #[must_use]
    pub fn data_with_locale(&self, location: &Location, role: Role, locale: &Locale) -> Value {
        if location.column() >= self.column_count {
            return Value::Null;
        }
        self.row_at(location)
            .ok()
            .flatten()
            .and_then(|row| row.value(location.column(), role, &self.locale_ctx, locale))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Write `value` at `location` for `role` under the active (or
    /// overridden) locale.
    ///
    /// An empty value clears the slot rather than storing it. The write
    /// materializes the row path and cell, marks the slot changed, drops
    /// the search cache, and notifies observers.
    pub fn set_data(&mut self, location: &Location, value: Value, role: Role) -> Result<()> {
        let locale = self.effective_locale().clone();
        self.set_data_with_locale(location, value, role, &locale)
    }

    /// Write with an explicit locale instead of the active one.
    pub fn set_data_with_locale(
        &mut self,
        location: &Location,
        value: Value,
        role: Role,
        locale: &Locale,
    ) -> Result<()> {
        let cell = self.cell_mut_at(location)?;
        cell.set(role, locale, value);
        self.search.invalidate();
        self.observers.notify(|o| o.data_changed(location, &[role]));
        Ok(())
    }

    /// The effective flags at `location`: the cell override if present,
    /// else the table default.
    #[must_use]
    pub fn flags(&self, location: &Location) -> ItemFlags {
        if location.column() >= self.column_count {
            return self.default_flags;
        }
        self.row_at(location)
            .ok()
            .flatten()
            .and_then(|row| row.cell(location.column()))
            .and_then(Cell::flags_override)
            .unwrap_or(self.default_flags)
    }

    /// Set (or, with `None`, clear) the flags override at `location`.
    pub fn set_flags(&mut self, location: &Location, flags: Option<ItemFlags>) -> Result<()> {
        let cell = self.cell_mut_at(location)?;
        cell.set_flags_override(flags);
        self.search.invalidate();
        self.observers.notify(|o| o.data_changed(location, &[]));
        Ok(())
    }

    /// The resolved role→value map of the cell at `location`.
    pub fn item_data(&self, location: &Location) -> Result<BTreeMap<Role, Value>> {
        if location.column() >= self.column_count {
            return Err(ModelError::ColumnOutOfRange {
                column: location.column(),
                count: self.column_count,
            });
        }
        let row = self.row_at(location)?;
        Ok(row
            .and_then(|r| r.cell(location.column()))
            .map(|c| c.to_map(&self.locale_ctx, self.effective_locale()))
            .unwrap_or_default())
    }

    /// Bulk-replace the cell at `location` from a role→value map.
    pub fn set_item_data(&mut self, location: &Location, map: BTreeMap<Role, Value>) -> Result<()> {
        let locale = self.effective_locale().clone();
        let roles: Vec<Role> = map.keys().copied().collect();
        let cell = self.cell_mut_at(location)?;
        cell.from_map(map, &locale);
        self.search.invalidate();
        self.observers.notify(|o| o.data_changed(location, &roles));
        Ok(())
    }

    /// Returns true if the slot at (`location`, `role`) was written (with `None`:
    /// any slot of that cell) since the last reset.
    #[must_use]
    pub fn is_changed(&self, location: &Location, role: Option<Role>) -> bool {
        if location.column() >= self.column_count {
            return false;
        }
        self.row_at(location)
            .ok()
            .flatten()
            .and_then(|row| row.cell(location.column()))
            .is_some_and(|c| c.is_changed(role))
    }

    /// Clear every changed bit in the whole tree.
    pub fn reset_changed(&mut self) {
        self.root.reset_changed();
    }

    /// Clear every changed bit in the subtree rooted at `location`
    /// (the row itself included).
    pub fn reset_changed_under(&mut self, location: &Location) -> Result<()> {
        if location.is_root() {
            self.root.reset_changed();
            return Ok(());
        }
        self.row_mut_at(location)?.reset_changed();
        Ok(())
    }

    /// Returns true if any slot anywhere in the tree is changed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.root.has_changes()
    }

    // -- headers ------------------------------------------------------------

    /// Read a header label. Missing labels read as [`Value::Null`].
    #[must_use]
    pub fn header_data(&self, section: usize, orientation: Orientation, role: Role) -> Value {
        let store = match orientation {
            Orientation::Horizontal => &self.column_headers,
            Orientation::Vertical => &self.row_headers,
        };
        store.data(section, role).cloned().unwrap_or(Value::Null)
    }

    /// Write a header label; an empty value clears it.
    pub fn set_header_data(
        &mut self,
        section: usize,
        orientation: Orientation,
        role: Role,
        value: Value,
    ) -> Result<()> {
        let count = match orientation {
            Orientation::Horizontal => self.column_count,
            Orientation::Vertical => self.root.row_count(),
        };
        if section >= count {
            return Err(ModelError::HeaderSectionOutOfRange { section, count });
        }
        let store = match orientation {
            Orientation::Horizontal => &mut self.column_headers,
            Orientation::Vertical => &mut self.row_headers,
        };
        store.set_data(section, role, value);
        self.observers
            .notify(|o| o.header_data_changed(orientation, section));
        Ok(())
    }

    // -- structural mutation: rows ------------------------------------------

    /// Insert `count` rows before `row` under `parent`.
    pub fn insert_rows(&mut self, row: usize, count: usize, parent: &Location) -> Result<()> {
        if count == 0 {
            return Err(ModelError::EmptySpan);
        }
        let existing = self.parent_row_count(parent)?;
        if row > existing {
            return Err(ModelError::RowOutOfRange {
                row,
                count: existing,
            });
        }
        self.observers
            .notify(|o| o.rows_about_to_be_inserted(parent, row, row + count - 1));
        self.set_for_mut(parent)?.insert_rows(row, count)?;
        if parent.is_root() {
            self.row_headers.insert_sections(row, count);
        }
        self.search.invalidate();
        debug!(row, count, depth = parent.depth(), "inserted rows");
        self.observers
            .notify(|o| o.rows_inserted(parent, row, row + count - 1));
        Ok(())
    }

    /// Remove the rows `[row, row + count)` under `parent`, destroying
    /// their subtrees.
    pub fn remove_rows(&mut self, row: usize, count: usize, parent: &Location) -> Result<()> {
        if count == 0 {
            return Err(ModelError::EmptySpan);
        }
        let existing = self.parent_row_count(parent)?;
        if row + count > existing {
            return Err(ModelError::RowRangeOutOfRange {
                row,
                span: count,
                count: existing,
            });
        }
        self.observers
            .notify(|o| o.rows_about_to_be_removed(parent, row, row + count - 1));
        self.set_for_mut(parent)?.remove_rows(row, count)?;
        if parent.is_root() {
            self.row_headers.remove_sections(row, count);
        }
        self.search.invalidate();
        debug!(row, count, depth = parent.depth(), "removed rows");
        self.observers
            .notify(|o| o.rows_removed(parent, row, row + count - 1));
        Ok(())
    }

    /// Grow or shrink the row count under `parent` via insert/remove
    /// semantics (notifications included).
    pub fn set_row_count(&mut self, n: usize, parent: &Location) -> Result<()> {
        let existing = self.parent_row_count(parent)?;
        match n.cmp(&existing) {
            Ordering::Greater => self.insert_rows(existing, n - existing, parent),
            Ordering::Less => self.remove_rows(n, existing - n, parent),
            Ordering::Equal => Ok(()),
        }
    }

    /// Move the rows `[src_row, src_row + count)` under `src_parent` before
    /// the **pre-move** index `dst_row` under `dst_parent`.
    ///
    /// Within one parent the real target is corrected by subtracting
    /// `count` when `dst_row` lies past the span. Across parents the span
    /// is detached, re-parented, and spliced in (take-then-put). Trivial
    /// destinations succeed as no-ops; a destination inside the span, or
    /// inside the moved subtree, is rejected.
    pub fn move_rows(
        &mut self,
        src_parent: &Location,
        src_row: usize,
        count: usize,
        dst_parent: &Location,
        dst_row: usize,
    ) -> Result<()> {
        let plan = self.allow_move_rows(src_parent, src_row, count, dst_parent, dst_row)?;
        let Some(adjusted_dst_parent) = plan else {
            return Ok(());
        };

        contract_check!(!self.moving, "move bracket is not re-entrant");
        self.moving = true;
        let last = src_row + count - 1;
        self.observers
            .notify(|o| o.rows_about_to_be_moved(src_parent, src_row, last, dst_parent, dst_row));

        if src_parent.path() == dst_parent.path() {
            self.set_for_mut(src_parent)?.move_rows(src_row, count, dst_row)?;
            if src_parent.is_root() {
                let corrected = if dst_row > src_row { dst_row - count } else { dst_row };
                let width = self.root.row_count();
                self.row_headers.move_sections(src_row, count, corrected, width);
            }
        } else {
            let span = self.set_for_mut(src_parent)?.take_rows(src_row, count)?;
            if src_parent.is_root() {
                self.row_headers.remove_sections(src_row, count);
            }
            self.set_for_mut(&adjusted_dst_parent)?.put_rows(span, dst_row)?;
            if adjusted_dst_parent.is_root() {
                self.row_headers.insert_sections(dst_row, count);
            }
        }

        self.search.invalidate();
        debug!(src_row, count, dst_row, "moved rows");
        self.moving = false;
        self.observers
            .notify(|o| o.rows_moved(src_parent, src_row, last, dst_parent, dst_row));
        Ok(())
    }

    /// Validate a row move.
    ///
    /// Returns `Ok(None)` for a trivial no-op, `Ok(Some(dst_parent))`,
    /// with the destination parent's path corrected for the span's removal,
    /// for a real move, and an error for invalid input. The check walks
    /// the full ancestor chain: a destination anywhere inside the moved
    /// subtree is rejected, however many levels apart the parents are.
    fn allow_move_rows(
        &self,
        src_parent: &Location,
        src_row: usize,
        count: usize,
        dst_parent: &Location,
        dst_row: usize,
    ) -> Result<Option<Location>> {
        if count == 0 {
            return Err(ModelError::EmptySpan);
        }
        let src_count = self.parent_row_count(src_parent)?;
        if src_row + count > src_count {
            return Err(ModelError::RowRangeOutOfRange {
                row: src_row,
                span: count,
                count: src_count,
            });
        }
        let dst_count = self.parent_row_count(dst_parent)?;
        if dst_row > dst_count {
            return Err(ModelError::RowOutOfRange {
                row: dst_row,
                count: dst_count,
            });
        }

        if src_parent.path() == dst_parent.path() {
            if dst_row == src_row || dst_row == src_row + count {
                return Ok(None);
            }
            if dst_row > src_row && dst_row < src_row + count {
                return Err(ModelError::MoveOverlapsSource {
                    row: src_row,
                    span: count,
                    destination: dst_row,
                });
            }
            return Ok(Some(dst_parent.clone()));
        }

        // Full ancestor-chain check: reject a destination parent whose path
        // descends through any row of the moved span.
        let prefix_len = src_parent.depth();
        let descends_through_span = dst_parent.path().len() > prefix_len
            && dst_parent.path().starts_with(src_parent.path())
            && (src_row..src_row + count).contains(&dst_parent.path()[prefix_len]);
        if descends_through_span {
            return Err(ModelError::MoveIntoOwnSubtree);
        }

        // Removing the span shifts any destination path that passes through
        // the source parent at a later sibling index.
        let mut adjusted = dst_parent.clone();
        if dst_parent.path().len() > prefix_len
            && dst_parent.path().starts_with(src_parent.path())
            && dst_parent.path()[prefix_len] >= src_row + count
        {
            let mut path: Vec<usize> = dst_parent.path().to_vec();
            path[prefix_len] -= count;
            adjusted = Location::from_path(path, 0);
        }
        Ok(Some(adjusted))
    }

    // -- structural mutation: columns ---------------------------------------

    /// Insert `count` columns before `col`, cascading through the whole
    /// tree.
    pub fn insert_columns(&mut self, col: usize, count: usize) -> Result<()> {
        if count == 0 {
            return Err(ModelError::EmptySpan);
        }
        if col > self.column_count {
            return Err(ModelError::ColumnOutOfRange {
                column: col,
                count: self.column_count,
            });
        }
        self.observers
            .notify(|o| o.columns_about_to_be_inserted(col, col + count - 1));
        self.column_count += count;
        self.root.insert_columns(col, count, Cascade::Descend);
        self.column_headers.insert_sections(col, count);
        self.search.invalidate();
        debug!(col, count, "inserted columns");
        self.observers
            .notify(|o| o.columns_inserted(col, col + count - 1));
        Ok(())
    }

    /// Remove the columns `[col, col + count)` across the whole tree.
    pub fn remove_columns(&mut self, col: usize, count: usize) -> Result<()> {
        if count == 0 {
            return Err(ModelError::EmptySpan);
        }
        if col + count > self.column_count {
            return Err(ModelError::ColumnRangeOutOfRange {
                column: col,
                span: count,
                count: self.column_count,
            });
        }
        self.observers
            .notify(|o| o.columns_about_to_be_removed(col, col + count - 1));
        self.column_count -= count;
        self.root.remove_columns(col, count, Cascade::Descend);
        self.column_headers.remove_sections(col, count);
        self.search.invalidate();
        debug!(col, count, "removed columns");
        self.observers
            .notify(|o| o.columns_removed(col, col + count - 1));
        Ok(())
    }

    /// Grow or shrink the column count via insert/remove semantics.
    pub fn set_column_count(&mut self, n: usize) -> Result<()> {
        match n.cmp(&self.column_count) {
            Ordering::Greater => self.insert_columns(self.column_count, n - self.column_count),
            Ordering::Less => self.remove_columns(n, self.column_count - n),
            Ordering::Equal => Ok(()),
        }
    }

    /// Move the columns `[src, src + count)` before the **pre-move** index
    /// `dst`, table-wide.
    pub fn move_columns(&mut self, src: usize, count: usize, dst: usize) -> Result<()> {
        if count == 0 {
            return Err(ModelError::EmptySpan);
        }
        if src + count > self.column_count {
            return Err(ModelError::ColumnRangeOutOfRange {
                column: src,
                span: count,
                count: self.column_count,
            });
        }
        if dst > self.column_count {
            return Err(ModelError::ColumnOutOfRange {
                column: dst,
                count: self.column_count,
            });
        }
        if dst == src || dst == src + count {
            return Ok(());
        }
        if dst > src && dst < src + count {
            return Err(ModelError::MoveOverlapsSource {
                row: src,
                span: count,
                destination: dst,
            });
        }

        contract_check!(!self.moving, "move bracket is not re-entrant");
        self.moving = true;
        self.observers
            .notify(|o| o.columns_about_to_be_moved(src, src + count - 1, dst));
        let corrected = if dst > src { dst - count } else { dst };
        self.root.move_columns(src, count, corrected, Cascade::Descend);
        self.column_headers
            .move_sections(src, count, corrected, self.column_count);
        self.search.invalidate();
        debug!(src, count, dst, "moved columns");
        self.moving = false;
        self.observers
            .notify(|o| o.columns_moved(src, src + count - 1, dst));
        Ok(())
    }

    // -- bulk / lifecycle ---------------------------------------------------

    /// Drop every row (and the row headers) under a reset bracket, keeping
    /// columns and column headers.
    pub fn clear(&mut self) {
        self.begin_reset();
        self.root = RowSet::new(self.column_count);
        self.row_headers.clear();
        self.end_reset();
    }

    /// Eagerly materialize every row and cell slot in the tree.
    ///
    /// A pure performance hint before bulk-fill loops; no semantic effect.
    pub fn alloc(&mut self) {
        self.root.alloc();
    }

    /// Open a reset bracket. Brackets nest; only the outermost pair fires
    /// the reset notification.
    pub fn begin_reset(&mut self) {
        self.reset_depth += 1;
        if self.reset_depth == 1 {
            self.observers.notify(|o| o.model_about_to_be_reset());
        }
    }

    /// Close a reset bracket opened by [`Table::begin_reset`].
    pub fn end_reset(&mut self) {
        contract_check!(self.reset_depth > 0, "end_reset without begin_reset");
        self.reset_depth -= 1;
        if self.reset_depth == 0 {
            self.search.invalidate();
            self.observers.notify(|o| o.model_reset());
        }
    }

    // -- sort ---------------------------------------------------------------

    /// Sort the whole tree by an ordered key list.
    ///
    /// Out of place: observers only ever see a reset bracket around the
    /// finished reorder. The sort is stable; later keys only break ties
    /// left by earlier ones.
    pub fn sort_by(&mut self, keys: &[SortKey]) -> Result<()> {
        for key in keys {
            if key.column >= self.column_count {
                return Err(ModelError::ColumnOutOfRange {
                    column: key.column,
                    count: self.column_count,
                });
            }
        }
        if keys.is_empty() {
            return Ok(());
        }
        let sorted = sort::sorted_clone_by_keys(
            &self.root,
            &self.locale_ctx,
            self.effective_locale(),
            keys,
        );
        debug!(keys = keys.len(), rows = self.root.row_count(), "sorted table");
        self.begin_reset();
        self.root = sorted;
        self.end_reset();
        Ok(())
    }

    /// Sort the whole tree by a caller-supplied row comparator.
    pub fn sort_with(&mut self, mut cmp: impl FnMut(&Row, &Row) -> Ordering) {
        let sorted = sort::sorted_clone_with(&self.root, &mut cmp);
        self.begin_reset();
        self.root = sorted;
        self.end_reset();
    }

    // -- search -------------------------------------------------------------

    /// Find cells whose stringified value for `role` equals `value`.
    ///
    /// The search runs over the column of `start`; results come back in
    /// depth-first order restricted to locations at or after `start`.
    /// `max_hits == 0` means unlimited. Answers are served from the
    /// search-index cache, which any mutation discards wholesale.
    #[must_use]
    pub fn match_values(
        &self,
        start: &Location,
        role: Role,
        value: &Value,
        max_hits: usize,
        case_sensitive: bool,
    ) -> Vec<Location> {
        let column = start.column();
        if column >= self.column_count {
            return Vec::new();
        }
        self.search.lookup(
            &self.root,
            &self.locale_ctx,
            self.effective_locale(),
            column,
            role,
            value,
            start,
            max_hits,
            case_sensitive,
        )
    }

    // -- drag/drop extension point ------------------------------------------

    /// Encode `locations` into a drag payload.
    ///
    /// Extension point only: payload encoding belongs to the view layer,
    /// so the engine always answers `None`.
    #[must_use]
    pub fn drag_payload(&self, _locations: &[Location]) -> Option<Value> {
        None
    }

    /// Accept a dropped payload at `location`.
    ///
    /// Extension point only: the engine does not decode payloads and
    /// always refuses.
    pub fn drop_payload(&mut self, _payload: &Value, _location: &Location) -> bool {
        false
    }

    // -- handle boundary ----------------------------------------------------

    /// Transfer this table into a shared [`VariantHandle`].
    ///
    /// Observers are detached first; afterwards all access goes through
    /// the handle.
    #[must_use]
    pub fn into_handle(self) -> VariantHandle {
        VariantHandle::from_table(self)
    }

    // -- internal navigation ------------------------------------------------

    /// Walk to the row set under `parent` without materializing anything.
    ///
    /// `Ok(None)` means the path is valid but not materialized (logical
    /// row count 0); `Err` means a path component is out of range.
    fn set_for(&self, parent: &Location) -> Result<Option<&RowSet>> {
        let mut set = &self.root;
        for &comp in parent.path() {
            if comp >= set.row_count() {
                return Err(ModelError::NoSuchLocation);
            }
            let Some(row) = set.row(comp) else {
                return Ok(None);
            };
            let Some(children) = row.children() else {
                return Ok(None);
            };
            set = children;
        }
        Ok(Some(set))
    }

    fn parent_row_count(&self, parent: &Location) -> Result<usize> {
        Ok(self.set_for(parent)?.map_or(0, RowSet::row_count))
    }

    /// Walk to the row set under `parent`, materializing the path.
    fn set_for_mut(&mut self, parent: &Location) -> Result<&mut RowSet> {
        let mut set = &mut self.root;
        for &comp in parent.path() {
            if comp >= set.row_count() {
                return Err(ModelError::NoSuchLocation);
            }
            set = set.row_mut(comp).children_mut();
        }
        Ok(set)
    }

    /// The row addressed by `location`, if materialized.
    fn row_at(&self, location: &Location) -> Result<Option<&Row>> {
        let Some(row) = location.row() else {
            return Err(ModelError::NoSuchLocation);
        };
        match self.set_for(&location.parent())? {
            None => Ok(None),
            Some(set) => {
                if row >= set.row_count() {
                    return Err(ModelError::NoSuchLocation);
                }
                Ok(set.row(row))
            }
        }
    }

    /// The row addressed by `location`, materialized.
    fn row_mut_at(&mut self, location: &Location) -> Result<&mut Row> {
        let Some(row) = location.row() else {
            return Err(ModelError::NoSuchLocation);
        };
        let set = self.set_for_mut(&location.parent())?;
        if row >= set.row_count() {
            return Err(ModelError::RowOutOfRange {
                row,
                count: set.row_count(),
            });
        }
        Ok(set.row_mut(row))
    }

    /// The cell addressed by `location`, materialized, with the column
    /// validated at this boundary.
    fn cell_mut_at(&mut self, location: &Location) -> Result<&mut Cell> {
        let column = location.column();
        if column >= self.column_count {
            return Err(ModelError::ColumnOutOfRange {
                column,
                count: self.column_count,
            });
        }
        Ok(self.row_mut_at(location)?.cell_mut(column))
    }
}

impl Clone for Table {
    /// Deep copy of data, headers, flags, and locale state. Observers and
    /// the search cache do not travel; the clone starts unwired.
    fn clone(&self) -> Self {
        Self {
            column_count: self.column_count,
            default_flags: self.default_flags,
            root: self.root.clone_set(true),
            row_headers: self.row_headers.clone(),
            column_headers: self.column_headers.clone(),
            search: SearchIndexCache::default(),
            locale_ctx: self.locale_ctx.clone(),
            active_locale: self.active_locale.clone(),
            locale_override: self.locale_override.clone(),
            observers: ObserverRegistry::default(),
            reset_depth: 0,
            moving: false,
        }
    }
}

impl PartialEq for Table {
    /// Structural + data equality: dimensions, default flags, every cell,
    /// every header label. Materialization shape is ignored: an absent
    /// slot equals an empty one.
    fn eq(&self, other: &Self) -> bool {
        self.column_count == other.column_count
            && self.default_flags == other.default_flags
            && self.root.content_eq(&other.root)
            && self.row_headers.content_eq(&other.row_headers)
            && self.column_headers.content_eq(&other.column_headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn root() -> Location {
        Location::root()
    }

    fn loc(path: &[usize], col: usize) -> Location {
        Location::from_path(path.iter().copied(), col)
    }

    /// A table with `rows` top-level rows and `cols` columns, every cell
    /// filled with `"r{row}c{col}"`.
    fn grid(rows: usize, cols: usize) -> Table {
        let mut table = Table::new(cols);
        table.insert_rows(0, rows, &root()).unwrap();
        for r in 0..rows {
            for c in 0..cols {
                table
                    .set_data(&loc(&[r], c), Value::from(format!("r{r}c{c}")), Role::DISPLAY)
                    .unwrap();
            }
        }
        table
    }

    fn text(table: &Table, location: &Location) -> String {
        table.data(location, Role::DISPLAY).to_display_string()
    }

    struct RecordingObserver {
        events: RefCell<Vec<String>>,
    }

    impl RecordingObserver {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                events: RefCell::new(Vec::new()),
            })
        }

        fn push(&self, event: impl Into<String>) {
            self.events.borrow_mut().push(event.into());
        }

        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.events.borrow_mut())
        }
    }

    impl ModelObserver for RecordingObserver {
        fn model_about_to_be_reset(&self) {
            self.push("begin-reset");
        }
        fn model_reset(&self) {
            self.push("end-reset");
        }
        fn rows_about_to_be_inserted(&self, _parent: &Location, first: usize, last: usize) {
            self.push(format!("begin-insert-rows {first}..{last}"));
        }
        fn rows_inserted(&self, _parent: &Location, first: usize, last: usize) {
            self.push(format!("end-insert-rows {first}..{last}"));
        }
        fn rows_about_to_be_removed(&self, _parent: &Location, first: usize, last: usize) {
            self.push(format!("begin-remove-rows {first}..{last}"));
        }
        fn rows_removed(&self, _parent: &Location, first: usize, last: usize) {
            self.push(format!("end-remove-rows {first}..{last}"));
        }
        fn rows_about_to_be_moved(
            &self,
            _src_parent: &Location,
            first: usize,
            last: usize,
            _dst_parent: &Location,
            dst: usize,
        ) {
            self.push(format!("begin-move-rows {first}..{last}->{dst}"));
        }
        fn rows_moved(
            &self,
            _src_parent: &Location,
            first: usize,
            last: usize,
            _dst_parent: &Location,
            dst: usize,
        ) {
            self.push(format!("end-move-rows {first}..{last}->{dst}"));
        }
        fn data_changed(&self, location: &Location, roles: &[Role]) {
            self.push(format!("data {:?} roles {}", location.path(), roles.len()));
        }
    }

    #[test]
    fn test_row_and_column_counts_track_mutations() {
        let mut table = Table::new(3);
        assert_eq!(table.column_count(), 3);
        assert!(table.is_empty());

        table.insert_rows(0, 4, &root()).unwrap();
        table.insert_rows(2, 2, &root()).unwrap();
        table.remove_rows(0, 1, &root()).unwrap();
        assert_eq!(table.row_count(&root()), 5);

        let parent = loc(&[1], 0);
        table.insert_rows(0, 3, &parent).unwrap();
        assert_eq!(table.row_count(&parent), 3);
        assert!(table.has_children(&parent));
        assert_eq!(table.total_row_count(), 8);

        table.insert_columns(1, 2).unwrap();
        assert_eq!(table.column_count(), 5);
        table.remove_columns(0, 4).unwrap();
        assert_eq!(table.column_count(), 1);
    }

    #[test]
    fn test_data_round_trip_and_empty_write_clears() {
        let mut table = Table::new(2);
        table.insert_rows(0, 1, &root()).unwrap();
        let cell = loc(&[0], 1);

        table.set_data(&cell, Value::from(42i64), Role::DISPLAY).unwrap();
        assert_eq!(table.data(&cell, Role::DISPLAY).as_integer(), Some(42));

        // Writing an empty value clears the slot instead of storing it.
        table.set_data(&cell, Value::Null, Role::DISPLAY).unwrap();
        assert!(table.data(&cell, Role::DISPLAY).is_null());
        assert!(table.item_data(&cell).unwrap().is_empty());

        // Reads of never-written positions are Null, not errors.
        assert!(table.data(&loc(&[0], 0), Role::TOOLTIP).is_null());
        assert!(table.data(&loc(&[7], 0), Role::DISPLAY).is_null());
    }

    #[test]
    fn test_locale_fallback_reads_through_the_chain() {
        let mut table = Table::new(1);
        table.insert_rows(0, 1, &root()).unwrap();
        table.set_locale_context(LocaleContext {
            ui: Locale::new("fr"),
            app: Locale::new("es"),
        });
        let cell = loc(&[0], 0);

        table
            .set_data_with_locale(&cell, Value::from("bonjour"), Role::DISPLAY, &Locale::new("fr"))
            .unwrap();
        table
            .set_data_with_locale(&cell, Value::from("hello"), Role::DISPLAY, &Locale::ENGLISH)
            .unwrap();

        // Reading under a locale with no entry falls back to the UI locale.
        table.set_active_locale(Locale::new("de"));
        assert_eq!(table.data(&cell, Role::DISPLAY).as_str(), Some("bonjour"));

        // A scoped override wins over the active locale.
        table.set_locale_override(Some(Locale::ENGLISH));
        assert_eq!(table.data(&cell, Role::DISPLAY).as_str(), Some("hello"));
        table.set_locale_override(None);
        assert_eq!(table.data(&cell, Role::DISPLAY).as_str(), Some("bonjour"));
    }

    #[test]
    fn test_flags_inherit_and_override() {
        let mut table = Table::new(1);
        table.insert_rows(0, 2, &root()).unwrap();
        assert_eq!(table.flags(&loc(&[0], 0)), ItemFlags::default());

        let editable = ItemFlags::ENABLED | ItemFlags::EDITABLE;
        table.set_flags(&loc(&[0], 0), Some(editable)).unwrap();
        assert_eq!(table.flags(&loc(&[0], 0)), editable);
        assert_eq!(table.flags(&loc(&[1], 0)), ItemFlags::default());

        table.set_default_flags(ItemFlags::ENABLED);
        assert_eq!(table.flags(&loc(&[1], 0)), ItemFlags::ENABLED);
        assert_eq!(table.flags(&loc(&[0], 0)), editable);

        table.set_flags(&loc(&[0], 0), None).unwrap();
        assert_eq!(table.flags(&loc(&[0], 0)), ItemFlags::ENABLED);
    }

    #[test]
    fn test_structural_validation_is_recoverable() {
        let mut table = Table::new(2);
        table.insert_rows(0, 3, &root()).unwrap();

        assert_eq!(
            table.insert_rows(5, 1, &root()),
            Err(ModelError::RowOutOfRange { row: 5, count: 3 })
        );
        assert_eq!(table.insert_rows(0, 0, &root()), Err(ModelError::EmptySpan));
        assert_eq!(
            table.remove_rows(2, 2, &root()),
            Err(ModelError::RowRangeOutOfRange {
                row: 2,
                span: 2,
                count: 3
            })
        );
        assert_eq!(
            table.insert_columns(3, 1),
            Err(ModelError::ColumnOutOfRange { column: 3, count: 2 })
        );
        assert_eq!(
            table.set_data(&loc(&[0], 2), Value::from(1i64), Role::DISPLAY),
            Err(ModelError::ColumnOutOfRange { column: 2, count: 2 })
        );
        // A bad parent path is recoverable too.
        assert_eq!(
            table.insert_rows(0, 1, &loc(&[9], 0)),
            Err(ModelError::NoSuchLocation)
        );
        // Nothing above changed the table.
        assert_eq!(table.row_count(&root()), 3);
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn test_move_rows_pre_move_convention() {
        // [A, B, C, D]: moving row 0 (count 1) to destination 2 yields
        // [B, A, C, D]; the destination is the insertion point before the
        // span's removal.
        let mut table = Table::new(1);
        table.insert_rows(0, 4, &root()).unwrap();
        for (i, name) in ["A", "B", "C", "D"].iter().enumerate() {
            table
                .set_data(&loc(&[i], 0), Value::from(*name), Role::DISPLAY)
                .unwrap();
        }

        table.move_rows(&root(), 0, 1, &root(), 2).unwrap();
        let order: Vec<String> = (0..4).map(|i| text(&table, &loc(&[i], 0))).collect();
        assert_eq!(order, ["B", "A", "C", "D"]);
        assert_eq!(table.row_count(&root()), 4);
    }

    #[test]
    fn test_move_rows_trivial_and_invalid_destinations() {
        let mut table = grid(4, 1);
        let before = table.clone();

        // dst == src and dst == src + count are trivial no-ops.
        assert!(table.move_rows(&root(), 1, 2, &root(), 1).is_ok());
        assert!(table.move_rows(&root(), 1, 2, &root(), 3).is_ok());
        assert_eq!(table, before);

        assert_eq!(
            table.move_rows(&root(), 1, 2, &root(), 2),
            Err(ModelError::MoveOverlapsSource {
                row: 1,
                span: 2,
                destination: 2
            })
        );
        assert_eq!(
            table.move_rows(&root(), 3, 2, &root(), 0),
            Err(ModelError::RowRangeOutOfRange {
                row: 3,
                span: 2,
                count: 4
            })
        );
    }

    #[test]
    fn test_move_rows_across_parents_adjusts_the_destination_path() {
        // Root [A, B, C]; move A and B under C. C's path shifts from [2]
        // to [0] once the span is detached.
        let mut table = grid(3, 1);
        table
            .set_data(&loc(&[0], 0), Value::from("A"), Role::DISPLAY)
            .unwrap();
        table
            .set_data(&loc(&[1], 0), Value::from("B"), Role::DISPLAY)
            .unwrap();
        table
            .set_data(&loc(&[2], 0), Value::from("C"), Role::DISPLAY)
            .unwrap();

        table.move_rows(&root(), 0, 2, &loc(&[2], 0), 0).unwrap();

        assert_eq!(table.row_count(&root()), 1);
        assert_eq!(text(&table, &loc(&[0], 0)), "C");
        assert_eq!(table.row_count(&loc(&[0], 0)), 2);
        assert_eq!(text(&table, &loc(&[0, 0], 0)), "A");
        assert_eq!(text(&table, &loc(&[0, 1], 0)), "B");
    }

    #[test]
    fn test_move_rows_rejects_descendant_destination_at_any_depth() {
        let mut table = grid(2, 1);
        // Give row 0 a grandchild level.
        table.insert_rows(0, 1, &loc(&[0], 0)).unwrap();
        table.insert_rows(0, 1, &loc(&[0, 0], 0)).unwrap();

        // Moving row 0 under its own child, or its grandchild, must fail.
        assert_eq!(
            table.move_rows(&root(), 0, 1, &loc(&[0, 0], 0), 0),
            Err(ModelError::MoveIntoOwnSubtree)
        );
        assert_eq!(
            table.move_rows(&root(), 0, 1, &loc(&[0, 0, 0], 0), 0),
            Err(ModelError::MoveIntoOwnSubtree)
        );
        // A sibling's subtree is fine.
        assert!(table.move_rows(&root(), 0, 1, &loc(&[1], 0), 0).is_ok());
    }

    #[test]
    fn test_insert_columns_cascades_and_shifts_headers() {
        let mut table = grid(2, 2);
        table.insert_rows(0, 1, &loc(&[0], 0)).unwrap();
        table
            .set_data(&loc(&[0, 0], 1), Value::from("nested"), Role::DISPLAY)
            .unwrap();
        table
            .set_header_data(0, Orientation::Horizontal, Role::DISPLAY, Value::from("first"))
            .unwrap();
        table
            .set_header_data(1, Orientation::Horizontal, Role::DISPLAY, Value::from("second"))
            .unwrap();

        table.insert_columns(1, 2).unwrap();

        assert_eq!(table.column_count(), 4);
        // Cell data shifted at every depth.
        assert_eq!(text(&table, &loc(&[0], 3)), "r0c1");
        assert_eq!(text(&table, &loc(&[0, 0], 3)), "nested");
        assert!(table.data(&loc(&[0], 1), Role::DISPLAY).is_null());
        // Headers shifted in lockstep.
        assert_eq!(
            table
                .header_data(0, Orientation::Horizontal, Role::DISPLAY)
                .as_str(),
            Some("first")
        );
        assert_eq!(
            table
                .header_data(3, Orientation::Horizontal, Role::DISPLAY)
                .as_str(),
            Some("second")
        );
    }

    #[test]
    fn test_move_columns_reorders_cells_and_headers() {
        let mut table = grid(1, 3);
        for (c, name) in ["x", "y", "z"].iter().enumerate() {
            table
                .set_header_data(c, Orientation::Horizontal, Role::DISPLAY, Value::from(*name))
                .unwrap();
        }

        // [c0, c1, c2]: move column 0 before pre-move index 2 => [c1, c0, c2].
        table.move_columns(0, 1, 2).unwrap();
        let row: Vec<String> = (0..3).map(|c| text(&table, &loc(&[0], c))).collect();
        assert_eq!(row, ["r0c1", "r0c0", "r0c2"]);
        let headers: Vec<Option<String>> = (0..3)
            .map(|c| {
                table
                    .header_data(c, Orientation::Horizontal, Role::DISPLAY)
                    .as_str()
                    .map(str::to_owned)
            })
            .collect();
        assert_eq!(
            headers,
            [Some("y".to_owned()), Some("x".to_owned()), Some("z".to_owned())]
        );
    }

    #[test]
    fn test_header_validation_and_row_header_shifting() {
        let mut table = grid(3, 1);
        assert_eq!(
            table.set_header_data(3, Orientation::Vertical, Role::DISPLAY, Value::from("x")),
            Err(ModelError::HeaderSectionOutOfRange { section: 3, count: 3 })
        );

        table
            .set_header_data(2, Orientation::Vertical, Role::DISPLAY, Value::from("last"))
            .unwrap();
        table.insert_rows(0, 2, &root()).unwrap();
        assert_eq!(
            table
                .header_data(4, Orientation::Vertical, Role::DISPLAY)
                .as_str(),
            Some("last")
        );
        table.remove_rows(0, 3, &root()).unwrap();
        assert_eq!(
            table
                .header_data(1, Orientation::Vertical, Role::DISPLAY)
                .as_str(),
            Some("last")
        );
    }

    #[test]
    fn test_sort_by_keys_with_tie_break() {
        // [(b,5), (a,5), (a,3)] sorted by (name asc, age asc) yields
        // [(a,3), (a,5), (b,5)].
        let mut table = Table::new(2);
        table.insert_rows(0, 3, &root()).unwrap();
        let people = [("b", 5i64), ("a", 5), ("a", 3)];
        for (r, (name, age)) in people.iter().enumerate() {
            table
                .set_data(&loc(&[r], 0), Value::from(*name), Role::DISPLAY)
                .unwrap();
            table
                .set_data(&loc(&[r], 1), Value::from(*age), Role::DISPLAY)
                .unwrap();
        }

        table
            .sort_by(&[SortKey::ascending(0), SortKey::ascending(1)])
            .unwrap();

        let sorted: Vec<(String, i64)> = (0..3)
            .map(|r| {
                (
                    text(&table, &loc(&[r], 0)),
                    table.data(&loc(&[r], 1), Role::DISPLAY).as_integer().unwrap(),
                )
            })
            .collect();
        assert_eq!(
            sorted,
            [("a".to_owned(), 3), ("a".to_owned(), 5), ("b".to_owned(), 5)]
        );
    }

    #[test]
    fn test_sort_recurses_and_only_fires_one_reset() {
        let mut table = grid(2, 1);
        table
            .set_data(&loc(&[0], 0), Value::from("z"), Role::DISPLAY)
            .unwrap();
        table
            .set_data(&loc(&[1], 0), Value::from("a"), Role::DISPLAY)
            .unwrap();
        table.insert_rows(0, 2, &loc(&[0], 0)).unwrap();
        table
            .set_data(&loc(&[0, 0], 0), Value::from("beta"), Role::DISPLAY)
            .unwrap();
        table
            .set_data(&loc(&[0, 1], 0), Value::from("alpha"), Role::DISPLAY)
            .unwrap();

        let observer = RecordingObserver::new();
        table.add_observer(observer.clone());
        table.sort_by(&[SortKey::ascending(0)]).unwrap();

        assert_eq!(observer.take(), ["begin-reset", "end-reset"]);
        assert_eq!(text(&table, &loc(&[0], 0)), "a");
        // The child level of the row that was "z" sorted too.
        assert_eq!(text(&table, &loc(&[1, 0], 0)), "alpha");
        assert_eq!(text(&table, &loc(&[1, 1], 0)), "beta");
    }

    #[test]
    fn test_sort_with_custom_comparator() {
        let mut table = grid(3, 1);
        let ctx = LocaleContext::default();
        table.sort_with(|a, b| {
            let va = a
                .value(0, Role::DISPLAY, &ctx, &Locale::ANY)
                .map(Value::to_display_string)
                .unwrap_or_default();
            let vb = b
                .value(0, Role::DISPLAY, &ctx, &Locale::ANY)
                .map(Value::to_display_string)
                .unwrap_or_default();
            vb.cmp(&va)
        });
        let order: Vec<String> = (0..3).map(|r| text(&table, &loc(&[r], 0))).collect();
        assert_eq!(order, ["r2c0", "r1c0", "r0c0"]);
    }

    fn brute_force_match(
        table: &Table,
        parent: &Location,
        column: usize,
        role: Role,
        needle: &str,
        case_sensitive: bool,
        out: &mut Vec<Location>,
    ) {
        for i in 0..table.row_count(parent) {
            let cell = parent.child(i, column);
            let found = table.data(&cell, role).to_display_string();
            let hit = !found.is_empty()
                && if case_sensitive {
                    found == needle
                } else {
                    found.to_lowercase() == needle.to_lowercase()
                };
            if hit {
                out.push(cell.clone());
            }
            brute_force_match(table, &cell.with_column(0), column, role, needle, case_sensitive, out);
        }
    }

    #[test]
    fn test_match_values_agrees_with_brute_force_across_invalidation() {
        let mut table = grid(4, 2);
        table.insert_rows(0, 2, &loc(&[1], 0)).unwrap();
        table
            .set_data(&loc(&[1, 0], 1), Value::from("needle"), Role::DISPLAY)
            .unwrap();
        table
            .set_data(&loc(&[3], 1), Value::from("needle"), Role::DISPLAY)
            .unwrap();

        let start = root().with_column(1);
        let needle = Value::from("needle");

        let mut expected = Vec::new();
        brute_force_match(&table, &root(), 1, Role::DISPLAY, "needle", true, &mut expected);
        assert_eq!(expected.len(), 2);
        // Ask twice: the second answer comes from the built index.
        for _ in 0..2 {
            assert_eq!(
                table.match_values(&start, Role::DISPLAY, &needle, 0, true),
                expected
            );
        }

        // A mutation discards the cache; fresh answers match a fresh scan.
        table
            .set_data(&loc(&[0], 1), Value::from("needle"), Role::DISPLAY)
            .unwrap();
        let mut expected = Vec::new();
        brute_force_match(&table, &root(), 1, Role::DISPLAY, "needle", true, &mut expected);
        assert_eq!(expected.len(), 3);
        assert_eq!(
            table.match_values(&start, Role::DISPLAY, &needle, 0, true),
            expected
        );
    }

    #[test]
    fn test_match_values_start_max_hits_and_case() {
        let mut table = grid(4, 1);
        for r in 0..4 {
            table
                .set_data(&loc(&[r], 0), Value::from("HIT"), Role::DISPLAY)
                .unwrap();
        }

        let all = table.match_values(&root(), Role::DISPLAY, &Value::from("hit"), 0, false);
        assert_eq!(all.len(), 4);
        assert!(table
            .match_values(&root(), Role::DISPLAY, &Value::from("hit"), 0, true)
            .is_empty());

        let capped = table.match_values(&root(), Role::DISPLAY, &Value::from("HIT"), 2, true);
        assert_eq!(capped.len(), 2);
        assert_eq!(capped[0], loc(&[0], 0));

        // Starting mid-table skips earlier rows.
        let from_two = table.match_values(&loc(&[2], 0), Role::DISPLAY, &Value::from("HIT"), 0, true);
        assert_eq!(from_two, vec![loc(&[2], 0), loc(&[3], 0)]);
    }

    #[test]
    fn test_clone_round_trip_is_deep() {
        let mut table = grid(3, 2);
        table.insert_rows(0, 1, &loc(&[2], 0)).unwrap();
        table
            .set_data(&loc(&[2, 0], 0), Value::from("nested"), Role::DISPLAY)
            .unwrap();
        table
            .set_header_data(1, Orientation::Horizontal, Role::DISPLAY, Value::from("col"))
            .unwrap();
        table
            .set_flags(&loc(&[0], 1), Some(ItemFlags::ENABLED | ItemFlags::CHECKABLE))
            .unwrap();

        let mut clone = table.clone();
        assert_eq!(clone, table);

        // Mutating the clone must not leak into the original.
        clone
            .set_data(&loc(&[2, 0], 0), Value::from("changed"), Role::DISPLAY)
            .unwrap();
        clone.remove_rows(0, 1, &root()).unwrap();
        assert_ne!(clone, table);
        assert_eq!(text(&table, &loc(&[2, 0], 0)), "nested");
        assert_eq!(table.row_count(&root()), 3);
    }

    #[test]
    fn test_change_tracking_set_and_subtree_reset() {
        let mut table = grid(2, 1);
        table.reset_changed();
        assert!(!table.has_changes());

        table.insert_rows(0, 1, &loc(&[0], 0)).unwrap();
        table
            .set_data(&loc(&[0, 0], 0), Value::from("deep"), Role::DISPLAY)
            .unwrap();
        assert!(table.is_changed(&loc(&[0, 0], 0), Some(Role::DISPLAY)));
        assert!(!table.is_changed(&loc(&[0, 0], 0), Some(Role::TOOLTIP)));
        assert!(table.has_changes());

        // Reads do not re-set the bit.
        table.reset_changed_under(&loc(&[0], 0)).unwrap();
        let _ = table.data(&loc(&[0, 0], 0), Role::DISPLAY);
        assert!(!table.is_changed(&loc(&[0, 0], 0), Some(Role::DISPLAY)));
        assert!(!table.has_changes());
    }

    #[test]
    fn test_reset_brackets_nest() {
        let mut table = Table::new(1);
        let observer = RecordingObserver::new();
        table.add_observer(observer.clone());

        table.begin_reset();
        table.begin_reset();
        table.end_reset();
        assert_eq!(observer.take(), ["begin-reset"]);
        table.end_reset();
        assert_eq!(observer.take(), ["end-reset"]);
    }

    #[test]
    fn test_observer_brackets_surround_structural_changes() {
        let mut table = Table::new(1);
        let observer = RecordingObserver::new();
        table.add_observer(observer.clone());

        table.insert_rows(0, 2, &root()).unwrap();
        table.remove_rows(1, 1, &root()).unwrap();
        table.insert_rows(0, 3, &root()).unwrap();
        table.move_rows(&root(), 0, 1, &root(), 3).unwrap();

        assert_eq!(
            observer.take(),
            [
                "begin-insert-rows 0..1",
                "end-insert-rows 0..1",
                "begin-remove-rows 1..1",
                "end-remove-rows 1..1",
                "begin-insert-rows 0..2",
                "end-insert-rows 0..2",
                "begin-move-rows 0..0->3",
                "end-move-rows 0..0->3",
            ]
        );

        // Failed validation notifies nothing.
        assert!(table.insert_rows(9, 1, &root()).is_err());
        assert!(observer.take().is_empty());
    }

    #[test]
    fn test_item_data_bulk_replace() {
        let mut table = Table::new(1);
        table.insert_rows(0, 1, &root()).unwrap();
        let cell = loc(&[0], 0);
        table.set_data(&cell, Value::from("old"), Role::TOOLTIP).unwrap();

        let mut map = BTreeMap::new();
        map.insert(Role::DISPLAY, Value::from("shown"));
        map.insert(Role::SORT, Value::from(3i64));
        map.insert(Role::EDIT, Value::Null);
        table.set_item_data(&cell, map).unwrap();

        let back = table.item_data(&cell).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[&Role::DISPLAY].as_str(), Some("shown"));
        assert_eq!(back[&Role::SORT].as_integer(), Some(3));
    }

    #[test]
    fn test_alloc_is_semantically_inert() {
        let mut table = Table::with_dimensions(50, 4);
        table
            .set_data(&loc(&[10], 2), Value::from("x"), Role::DISPLAY)
            .unwrap();
        let before = table.clone();

        table.alloc();
        assert_eq!(table, before);
        assert_eq!(table.row_count(&root()), 50);
        assert_eq!(text(&table, &loc(&[10], 2)), "x");
    }

    #[test]
    fn test_index_validates_and_builds_handles() {
        let mut table = grid(2, 2);
        table.insert_rows(0, 1, &loc(&[1], 0)).unwrap();

        let top = table.index(1, 1, &root()).unwrap();
        assert_eq!(top, loc(&[1], 1));
        let nested = table.index(0, 0, &top).unwrap();
        assert_eq!(nested, loc(&[1, 0], 0));
        assert_eq!(nested.parent(), top.with_column(0));

        assert_eq!(
            table.index(2, 0, &root()),
            Err(ModelError::RowOutOfRange { row: 2, count: 2 })
        );
        assert_eq!(
            table.index(0, 2, &root()),
            Err(ModelError::ColumnOutOfRange { column: 2, count: 2 })
        );
    }

    #[test]
    fn test_set_row_count_and_set_column_count() {
        let mut table = Table::new(1);
        table.set_row_count(5, &root()).unwrap();
        assert_eq!(table.row_count(&root()), 5);
        table.set_row_count(2, &root()).unwrap();
        assert_eq!(table.row_count(&root()), 2);

        table.set_column_count(4).unwrap();
        assert_eq!(table.column_count(), 4);
        table.set_column_count(1).unwrap();
        assert_eq!(table.column_count(), 1);
    }

    #[test]
    fn test_clear_keeps_columns() {
        let mut table = grid(3, 2);
        table
            .set_header_data(0, Orientation::Horizontal, Role::DISPLAY, Value::from("kept"))
            .unwrap();
        table
            .set_header_data(0, Orientation::Vertical, Role::DISPLAY, Value::from("dropped"))
            .unwrap();

        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.column_count(), 2);
        assert_eq!(
            table
                .header_data(0, Orientation::Horizontal, Role::DISPLAY)
                .as_str(),
            Some("kept")
        );
        assert!(table
            .header_data(0, Orientation::Vertical, Role::DISPLAY)
            .is_null());
    }

    #[test]
    fn test_into_handle_detaches_observers() {
        let mut table = grid(1, 1);
        let observer = RecordingObserver::new();
        table.add_observer(observer.clone());
        assert!(table.has_observers());

        let mut handle = table.into_handle();
        handle
            .table_mut()
            .set_data(&loc(&[0], 0), Value::from("silent"), Role::DISPLAY)
            .unwrap();
        assert!(observer.take().is_empty());
        assert!(!handle.table().has_observers());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn root() -> Location {
        Location::root()
    }

    proptest! {
        /// After any sequence of inserts and removes, the reported row
        /// count equals the arithmetic sum of the operations' effects.
        #[test]
        fn prop_row_count_matches_operation_arithmetic(
            ops in proptest::collection::vec((any::<bool>(), 0usize..8, 1usize..4), 1..24)
        ) {
            let mut table = Table::new(2);
            let mut expected = 0usize;
            for (is_insert, at, n) in ops {
                if is_insert {
                    let at = at.min(expected);
                    table.insert_rows(at, n, &root()).unwrap();
                    expected += n;
                } else if expected > 0 {
                    let at = at % expected;
                    let n = n.min(expected - at);
                    if n > 0 {
                        table.remove_rows(at, n, &root()).unwrap();
                        expected -= n;
                    }
                }
                prop_assert_eq!(table.row_count(&root()), expected);
            }
        }

        /// A same-parent row move either normalizes exactly like the
        /// pre-move convention applied to a plain vector, no-ops, or is
        /// rejected, and the row count never drifts.
        #[test]
        fn prop_move_rows_matches_vec_model(
            n in 2usize..8,
            src in 0usize..8,
            span in 1usize..4,
            dst in 0usize..9,
        ) {
            prop_assume!(src + span <= n);
            prop_assume!(dst <= n);

            let mut table = Table::new(1);
            table.insert_rows(0, n, &root()).unwrap();
            for i in 0..n {
                table
                    .set_data(&root().child(i, 0), Value::from(i as i64), Role::DISPLAY)
                    .unwrap();
            }
            let mut model: Vec<usize> = (0..n).collect();

            let result = table.move_rows(&root(), src, span, &root(), dst);
            if dst == src || dst == src + span {
                prop_assert!(result.is_ok());
            } else if dst > src && dst < src + span {
                prop_assert!(result.is_err());
            } else {
                prop_assert!(result.is_ok());
                let taken: Vec<usize> = model.drain(src..src + span).collect();
                let corrected = if dst > src { dst - span } else { dst };
                for (k, v) in taken.into_iter().enumerate() {
                    model.insert(corrected + k, v);
                }
            }

            prop_assert_eq!(table.row_count(&root()), n);
            let actual: Vec<i64> = (0..n)
                .map(|i| {
                    table
                        .data(&root().child(i, 0), Role::DISPLAY)
                        .as_integer()
                        .unwrap()
                })
                .collect();
            let expected: Vec<i64> = model.into_iter().map(|v| v as i64).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
