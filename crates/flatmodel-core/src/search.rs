//! Derived search index over stringified cell values.
//!
//! Built lazily per (column, role, case-sensitivity) key: the first query
//! for a key walks the whole tree once and collects
//! `stringify(value) → location` into a multi-map; later queries with the
//! same key answer from the map. Any structural or data mutation discards
//! the entire cache: coarse invalidation, correctness over precision.

use std::cell::RefCell;
use std::collections::HashMap;

use tracing::debug;

use flatmodel_types::{Locale, LocaleContext, Role, Value};

use crate::location::Location;
use crate::row::RowSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SearchKey {
    column: usize,
    role: Role,
    case_sensitive: bool,
}

/// Invalidate-on-write index from stringified cell values to locations.
///
/// Interior mutability keeps queries `&self`: a lookup is logically a read
/// even when it builds the index as a side effect.
#[derive(Debug, Default)]
pub(crate) struct SearchIndexCache {
    built: RefCell<HashMap<SearchKey, HashMap<String, Vec<Location>>>>,
}

impl SearchIndexCache {
    /// Discard every built index. Called on any mutation.
    pub(crate) fn invalidate(&mut self) {
        self.built.get_mut().clear();
    }

    /// Answer a match query, building the index for its key if needed.
    ///
    /// Results come back in depth-first traversal order, restricted to
    /// locations at or after `start`; `max_hits == 0` means unlimited.
    /// Values that stringify to the empty string are not indexed, so an
    /// empty needle never matches.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn lookup(
        &self,
        root: &RowSet,
        ctx: &LocaleContext,
        locale: &Locale,
        column: usize,
        role: Role,
        needle: &Value,
        start: &Location,
        max_hits: usize,
        case_sensitive: bool,
    ) -> Vec<Location> {
        let key = SearchKey {
            column,
            role,
            case_sensitive,
        };
        let mut built = self.built.borrow_mut();
        let index = built
            .entry(key)
            .or_insert_with(|| build_index(root, ctx, locale, column, role, case_sensitive));

        let mut needle_text = needle.to_display_string();
        if !case_sensitive {
            needle_text = needle_text.to_lowercase();
        }
        let Some(hits) = index.get(&needle_text) else {
            return Vec::new();
        };
        let mut out: Vec<Location> = hits
            .iter()
            .filter(|loc| start.traversal_cmp(loc) != std::cmp::Ordering::Greater)
            .cloned()
            .collect();
        if max_hits > 0 {
            out.truncate(max_hits);
        }
        out
    }
}

fn build_index(
    root: &RowSet,
    ctx: &LocaleContext,
    locale: &Locale,
    column: usize,
    role: Role,
    case_sensitive: bool,
) -> HashMap<String, Vec<Location>> {
    let mut index: HashMap<String, Vec<Location>> = HashMap::new();
    let mut visited = 0_usize;
    root.visit_rows(&Location::root(), &mut |loc, row| {
        visited += 1;
        if column >= row.column_count() {
            return;
        }
        let Some(value) = row.value(column, role, ctx, locale) else {
            return;
        };
        let mut text = value.to_display_string();
        if text.is_empty() {
            return;
        }
        if !case_sensitive {
            text = text.to_lowercase();
        }
        index.entry(text).or_default().push(loc.with_column(column));
    });
    debug!(
        column,
        role = role.get(),
        case_sensitive,
        rows = visited,
        keys = index.len(),
        "built search index"
    );
    index
}
