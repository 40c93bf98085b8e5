//! Row and row-set tree mechanics.
//!
//! A [`RowSet`] is an ordered sparse sequence of sibling rows; a [`Row`] is
//! one tree node holding a sparse cell array and an optional child set.
//! Sparseness is the engine's memory-lazy allocation strategy: backing
//! storage may be shorter than the logical row/column count, and unset slots
//! mean "no data yet" while still counting toward the logical length.
//!
//! Index validation happens at the table boundary. By the time an index
//! reaches this module it is a guaranteed precondition, so violations here
//! halt through `contract_check!` instead of returning errors.

use flatmodel_error::{contract_check, ModelError, Result};
use flatmodel_types::{Locale, LocaleContext, Role, Value};

use crate::cell::Cell;
use crate::location::Location;

/// Whether a column operation cascades into child row sets.
///
/// Structural column changes normally descend through every materialized
/// descendant. A caller that drives the cascade itself passes
/// [`Cascade::SkipChildren`] to avoid touching the same subtree twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cascade {
    /// Apply the operation to this node and every materialized descendant.
    Descend,
    /// Apply the operation to this node only.
    SkipChildren,
}

// ---------------------------------------------------------------------------
// Row
// ---------------------------------------------------------------------------

/// One tree node: a lazily-sized cell array plus an optional child set.
#[derive(Debug)]
pub struct Row {
    column_count: usize,
    /// Sparse cell storage; `len() <= column_count`, unset slots are
    /// "no cell yet".
    cells: Vec<Option<Box<Cell>>>,
    children: Option<Box<RowSet>>,
}

impl Row {
    pub(crate) fn new(column_count: usize) -> Self {
        Self {
            column_count,
            cells: Vec::new(),
            children: None,
        }
    }

    /// Logical column count (mirrors the owning table).
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// The cell at `col`, if materialized. `col` must be in range.
    #[must_use]
    pub fn cell(&self, col: usize) -> Option<&Cell> {
        contract_check!(
            col < self.column_count,
            "cell read at column {col} >= column count {}",
            self.column_count
        );
        self.cells.get(col).and_then(Option::as_deref)
    }

    /// The cell at `col`, materializing it on first access.
    ///
    /// `col` must be in range; a violation is a fatal programmer error, not
    /// a recoverable failure.
    pub fn cell_mut(&mut self, col: usize) -> &mut Cell {
        contract_check!(
            col < self.column_count,
            "cell write at column {col} >= column count {}",
            self.column_count
        );
        if col >= self.cells.len() {
            self.cells.resize_with(col + 1, || None);
        }
        self.cells[col].get_or_insert_with(Box::default)
    }

    /// Resolve the value stored at (`col`, `role`) through the locale chain.
    #[must_use]
    pub fn value<'a>(
        &'a self,
        col: usize,
        role: Role,
        ctx: &LocaleContext,
        requested: &Locale,
    ) -> Option<&'a Value> {
        self.cell(col).and_then(|c| c.value(role, ctx, requested))
    }

    /// Returns true if this row has a non-empty child set.
    #[must_use]
    pub fn has_children(&self) -> bool {
        self.children.as_ref().is_some_and(|c| c.row_count() > 0)
    }

    /// The child set, if it was ever created.
    #[must_use]
    pub fn children(&self) -> Option<&RowSet> {
        self.children.as_deref()
    }

    /// The child set, created empty on first access.
    pub fn children_mut(&mut self) -> &mut RowSet {
        let column_count = self.column_count;
        self.children
            .get_or_insert_with(|| Box::new(RowSet::new(column_count)))
    }

    pub(crate) fn set_column_count(&mut self, n: usize, cascade: Cascade) {
        if n > self.column_count {
            let at = self.column_count;
            self.insert_columns(at, n - at, cascade);
        } else if n < self.column_count {
            self.remove_columns(n, self.column_count - n, cascade);
        }
    }

    pub(crate) fn insert_columns(&mut self, col: usize, count: usize, cascade: Cascade) {
        contract_check!(
            col <= self.column_count,
            "column insert at {col} > column count {}",
            self.column_count
        );
        if col < self.cells.len() {
            for _ in 0..count {
                self.cells.insert(col, None);
            }
        }
        self.column_count += count;
        if cascade == Cascade::Descend {
            if let Some(children) = self.children.as_deref_mut() {
                children.insert_columns(col, count, cascade);
            }
        }
    }

    pub(crate) fn remove_columns(&mut self, col: usize, count: usize, cascade: Cascade) {
        contract_check!(
            col + count <= self.column_count,
            "column remove {col}+{count} > column count {}",
            self.column_count
        );
        if col < self.cells.len() {
            let end = usize::min(col + count, self.cells.len());
            self.cells.drain(col..end);
        }
        self.column_count -= count;
        if cascade == Cascade::Descend {
            if let Some(children) = self.children.as_deref_mut() {
                children.remove_columns(col, count, cascade);
            }
        }
    }

    /// Reorder columns. `dst` is the post-removal insertion index (the
    /// pre-move correction happens at the table boundary).
    pub(crate) fn move_columns(&mut self, src: usize, count: usize, dst: usize, cascade: Cascade) {
        contract_check!(
            src + count <= self.column_count && dst + count <= self.column_count,
            "column move {src}+{count} -> {dst} outside column count {}",
            self.column_count
        );
        // Work on a full-width view so sparse tails splice correctly.
        self.cells.resize_with(self.column_count, || None);
        let span: Vec<Option<Box<Cell>>> = self.cells.drain(src..src + count).collect();
        for (offset, cell) in span.into_iter().enumerate() {
            self.cells.insert(dst + offset, cell);
        }
        while matches!(self.cells.last(), Some(None)) {
            self.cells.pop();
        }
        if cascade == Cascade::Descend {
            if let Some(children) = self.children.as_deref_mut() {
                children.move_columns(src, count, dst, cascade);
            }
        }
    }

    /// Deep-copy this row's cells; optionally recurse into children.
    #[must_use]
    pub fn clone_row(&self, clone_children: bool) -> Self {
        Self {
            column_count: self.column_count,
            cells: self.cells.clone(),
            children: if clone_children {
                self.children
                    .as_ref()
                    .map(|c| Box::new(c.clone_set(true)))
            } else {
                None
            },
        }
    }

    /// Clear every slot's changed bit in this row and all descendants.
    pub fn reset_changed(&mut self) {
        for cell in self.cells.iter_mut().flatten() {
            cell.reset_changed(None);
        }
        if let Some(children) = self.children.as_deref_mut() {
            children.reset_changed();
        }
    }

    /// Returns true if any slot in this row or a descendant is changed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.cells
            .iter()
            .flatten()
            .any(|c| c.is_changed(None))
            || self
                .children
                .as_deref()
                .is_some_and(RowSet::has_changes)
    }

    pub(crate) fn alloc(&mut self) {
        for col in 0..self.column_count {
            let _ = self.cell_mut(col);
        }
        if let Some(children) = self.children.as_deref_mut() {
            children.alloc();
        }
    }

    /// Returns true if the row stores nothing: no populated cells, no
    /// logical children.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.cells
            .iter()
            .all(|c| c.as_deref().is_none_or(Cell::is_empty))
            && self.children.as_deref().is_none_or(|c| c.row_count() == 0)
    }

    /// Structural + data equality: cells compare logically (an absent slot
    /// equals an empty cell), children likewise.
    #[must_use]
    pub fn content_eq(&self, other: &Self) -> bool {
        if self.column_count != other.column_count {
            return false;
        }
        for col in 0..self.column_count {
            let a = self.cells.get(col).and_then(Option::as_deref);
            let b = other.cells.get(col).and_then(Option::as_deref);
            let eq = match (a, b) {
                (None, None) => true,
                (Some(c), None) | (None, Some(c)) => c.is_empty(),
                (Some(a), Some(b)) => a.data_eq(b),
            };
            if !eq {
                return false;
            }
        }
        match (self.children.as_deref(), other.children.as_deref()) {
            (None, None) => true,
            (Some(c), None) | (None, Some(c)) => c.row_count() == 0,
            (Some(a), Some(b)) => a.content_eq(b),
        }
    }
}

// ---------------------------------------------------------------------------
// RowSet
// ---------------------------------------------------------------------------

/// An ordered sparse sequence of sibling rows sharing one parent.
///
/// `row_count` is the logical length; the backing vector only grows as rows
/// are materialized. A 1-entry reverse-lookup cache amortizes repeated
/// [`RowSet::find_row`] calls for the same row.
#[derive(Debug)]
pub struct RowSet {
    row_count: usize,
    column_count: usize,
    /// Sparse row storage; `len() <= row_count`.
    rows: Vec<Option<Box<Row>>>,
    /// Last `find_row` hit: (row address, index). Identity compare only,
    /// never dereferenced.
    lookup: std::cell::Cell<Option<(*const Row, usize)>>,
}

impl RowSet {
    /// An empty set for rows of `column_count` logical columns.
    #[must_use]
    pub fn new(column_count: usize) -> Self {
        Self {
            row_count: 0,
            column_count,
            rows: Vec::new(),
            lookup: std::cell::Cell::new(None),
        }
    }

    /// Logical number of rows, materialized or not.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Logical column count, mirrored from the owning table.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// The row at `i`, if materialized. `i` must be below the row count.
    #[must_use]
    pub fn row(&self, i: usize) -> Option<&Row> {
        contract_check!(
            i < self.row_count,
            "row read at {i} >= row count {}",
            self.row_count
        );
        self.rows.get(i).and_then(Option::as_deref)
    }

    /// The row at `i`, materializing it (and growing backing storage) on
    /// first access. `i` must be below the row count.
    pub fn row_mut(&mut self, i: usize) -> &mut Row {
        contract_check!(
            i < self.row_count,
            "row write at {i} >= row count {}",
            self.row_count
        );
        if i >= self.rows.len() {
            self.rows.resize_with(i + 1, || None);
        }
        let column_count = self.column_count;
        self.rows[i].get_or_insert_with(|| Box::new(Row::new(column_count)))
    }

    /// Grow via insert-rows semantics or shrink via remove-rows semantics.
    pub fn set_row_count(&mut self, n: usize) {
        if n > self.row_count {
            // Tail growth needs no backing slots; the new rows stay lazy.
            self.row_count = n;
        } else if n < self.row_count {
            self.rows.truncate(n);
            self.row_count = n;
            self.lookup.set(None);
        }
    }

    /// Insert `count` unmaterialized rows before `row`.
    pub fn insert_rows(&mut self, row: usize, count: usize) -> Result<()> {
        if count == 0 {
            return Err(ModelError::EmptySpan);
        }
        if row > self.row_count {
            return Err(ModelError::RowOutOfRange {
                row,
                count: self.row_count,
            });
        }
        if row < self.rows.len() {
            for _ in 0..count {
                self.rows.insert(row, None);
            }
        }
        self.row_count += count;
        self.lookup.set(None);
        Ok(())
    }

    /// Remove the rows `[row, row + count)`, destroying their subtrees.
    pub fn remove_rows(&mut self, row: usize, count: usize) -> Result<()> {
        if count == 0 {
            return Err(ModelError::EmptySpan);
        }
        if row + count > self.row_count {
            return Err(ModelError::RowRangeOutOfRange {
                row,
                span: count,
                count: self.row_count,
            });
        }
        if row < self.rows.len() {
            let end = usize::min(row + count, self.rows.len());
            self.rows.drain(row..end);
        }
        self.row_count -= count;
        self.lookup.set(None);
        Ok(())
    }

    /// Detach the rows `[row, row + count)`, preserving sparseness.
    ///
    /// The returned vector has exactly `count` entries; unmaterialized rows
    /// stay `None`.
    pub fn take_rows(&mut self, row: usize, count: usize) -> Result<Vec<Option<Box<Row>>>> {
        if count == 0 {
            return Err(ModelError::EmptySpan);
        }
        if row + count > self.row_count {
            return Err(ModelError::RowRangeOutOfRange {
                row,
                span: count,
                count: self.row_count,
            });
        }
        let mut taken: Vec<Option<Box<Row>>> = Vec::with_capacity(count);
        if row < self.rows.len() {
            let end = usize::min(row + count, self.rows.len());
            taken.extend(self.rows.drain(row..end));
        }
        taken.resize_with(count, || None);
        self.row_count -= count;
        self.lookup.set(None);
        Ok(taken)
    }

    /// Splice previously-taken rows back in before `at`.
    ///
    /// Every materialized row must already carry this set's column count;
    /// a mismatch is a broken caller contract, not a recoverable failure.
    pub fn put_rows(&mut self, rows: Vec<Option<Box<Row>>>, at: usize) -> Result<()> {
        if at > self.row_count {
            return Err(ModelError::RowOutOfRange {
                row: at,
                count: self.row_count,
            });
        }
        for row in rows.iter().flatten() {
            contract_check!(
                row.column_count() == self.column_count,
                "re-parented row carries {} columns, set expects {}",
                row.column_count(),
                self.column_count
            );
        }
        let count = rows.len();
        if at <= self.rows.len() {
            let mut idx = at;
            for row in rows {
                self.rows.insert(idx, row);
                idx += 1;
            }
        } else {
            // Splicing past the materialized tail: pad, then append.
            self.rows.resize_with(at, || None);
            self.rows.extend(rows);
        }
        self.row_count += count;
        self.lookup.set(None);
        Ok(())
    }

    /// Move `[src, src + count)` before the pre-move index `dst` within this
    /// set.
    ///
    /// Trivial destinations (`dst == src` or `dst == src + count`) succeed
    /// without doing anything; a destination strictly inside the span is
    /// rejected.
    pub fn move_rows(&mut self, src: usize, count: usize, dst: usize) -> Result<()> {
        if count == 0 {
            return Err(ModelError::EmptySpan);
        }
        if src + count > self.row_count {
            return Err(ModelError::RowRangeOutOfRange {
                row: src,
                span: count,
                count: self.row_count,
            });
        }
        if dst > self.row_count {
            return Err(ModelError::RowOutOfRange {
                row: dst,
                count: self.row_count,
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
        let corrected = if dst > src { dst - count } else { dst };
        let span = self.take_rows(src, count)?;
        self.put_rows(span, corrected)
    }

    /// Find the index of `row` by identity.
    ///
    /// Linear scan behind a 1-entry cache; repeated lookups for the same row
    /// right after a mutation hit the cache.
    #[must_use]
    pub fn find_row(&self, row: &Row) -> Option<usize> {
        let needle = std::ptr::from_ref(row);
        if let Some((ptr, idx)) = self.lookup.get() {
            if ptr == needle
                && self
                    .rows
                    .get(idx)
                    .and_then(Option::as_deref)
                    .is_some_and(|r| std::ptr::from_ref(r) == needle)
            {
                return Some(idx);
            }
        }
        let idx = self
            .rows
            .iter()
            .position(|r| r.as_deref().is_some_and(|r| std::ptr::from_ref(r) == needle))?;
        self.lookup.set(Some((needle, idx)));
        Some(idx)
    }

    pub(crate) fn set_column_count(&mut self, n: usize, cascade: Cascade) {
        if n > self.column_count {
            let at = self.column_count;
            self.insert_columns(at, n - at, cascade);
        } else if n < self.column_count {
            self.remove_columns(n, self.column_count - n, cascade);
        }
    }

    pub(crate) fn insert_columns(&mut self, col: usize, count: usize, cascade: Cascade) {
        contract_check!(
            col <= self.column_count,
            "column insert at {col} > column count {}",
            self.column_count
        );
        self.column_count += count;
        for row in self.rows.iter_mut().flatten() {
            row.insert_columns(col, count, cascade);
        }
    }

    pub(crate) fn remove_columns(&mut self, col: usize, count: usize, cascade: Cascade) {
        contract_check!(
            col + count <= self.column_count,
            "column remove {col}+{count} > column count {}",
            self.column_count
        );
        self.column_count -= count;
        for row in self.rows.iter_mut().flatten() {
            row.remove_columns(col, count, cascade);
        }
    }

    pub(crate) fn move_columns(&mut self, src: usize, count: usize, dst: usize, cascade: Cascade) {
        for row in self.rows.iter_mut().flatten() {
            row.move_columns(src, count, dst, cascade);
        }
    }

    /// Structural copy. With `deep == false` child sets are not cloned;
    /// the copy carries the sibling level only.
    #[must_use]
    pub fn clone_set(&self, deep: bool) -> Self {
        Self {
            row_count: self.row_count,
            column_count: self.column_count,
            rows: self
                .rows
                .iter()
                .map(|r| r.as_deref().map(|r| Box::new(r.clone_row(deep))))
                .collect(),
            lookup: std::cell::Cell::new(None),
        }
    }

    /// Clear changed bits across every materialized descendant.
    pub fn reset_changed(&mut self) {
        for row in self.rows.iter_mut().flatten() {
            row.reset_changed();
        }
    }

    /// Returns true if any materialized descendant carries a changed bit.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.rows
            .iter()
            .flatten()
            .any(|r| r.has_changes())
    }

    /// Materialize every row and cell slot in this subtree.
    pub(crate) fn alloc(&mut self) {
        for i in 0..self.row_count {
            self.row_mut(i).alloc();
        }
    }

    /// Depth-first visit of every materialized row, parents before children.
    pub(crate) fn visit_rows(&self, base: &Location, f: &mut dyn FnMut(&Location, &Row)) {
        for (i, slot) in self.rows.iter().enumerate() {
            if let Some(row) = slot.as_deref() {
                let loc = base.child(i, 0);
                f(&loc, row);
                if let Some(children) = row.children() {
                    children.visit_rows(&loc, f);
                }
            }
        }
    }

    pub(crate) fn materialized_rows_mut(&mut self) -> impl Iterator<Item = &mut Row> {
        self.rows.iter_mut().flatten().map(Box::as_mut)
    }

    /// Pad backing storage to the logical length and reorder rows by `cmp`.
    ///
    /// The sort is stable; unmaterialized rows participate as blank rows.
    pub(crate) fn sort_rows(
        &mut self,
        cmp: &mut dyn FnMut(Option<&Row>, Option<&Row>) -> std::cmp::Ordering,
    ) {
        self.rows.resize_with(self.row_count, || None);
        self.rows.sort_by(|a, b| cmp(a.as_deref(), b.as_deref()));
        self.lookup.set(None);
    }

    /// Logical structural + data equality (see [`Row::content_eq`]).
    #[must_use]
    pub fn content_eq(&self, other: &Self) -> bool {
        if self.row_count != other.row_count || self.column_count != other.column_count {
            return false;
        }
        let len = usize::max(self.rows.len(), other.rows.len());
        for i in 0..len {
            let a = self.rows.get(i).and_then(Option::as_deref);
            let b = other.rows.get(i).and_then(Option::as_deref);
            let eq = match (a, b) {
                (None, None) => true,
                (Some(r), None) | (None, Some(r)) => r.is_blank(),
                (Some(a), Some(b)) => a.content_eq(b),
            };
            if !eq {
                return false;
            }
        }
        true
    }

    /// Recursive logical row count across the whole subtree.
    #[must_use]
    pub fn total_row_count(&self) -> usize {
        let nested: usize = self
            .rows
            .iter()
            .flatten()
            .filter_map(|r| r.children())
            .map(RowSet::total_row_count)
            .sum();
        self.row_count + nested
    }
}
