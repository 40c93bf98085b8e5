//! Clone-based sort engine.
//!
//! Sorting is out of place: the row tree is cloned, every sibling level of
//! the clone is reordered by a stable sort, and the table then swaps the
//! ordered clone in under a reset bracket. Observers never see a partially
//! sorted tree.
//!
//! Comparators follow the usual contract: deterministic, antisymmetric,
//! transitive. Key-driven comparison uses the engine's value ordering, so
//! ties are locale/format-aware equality, not raw identity.

use std::cmp::Ordering;

use flatmodel_types::{Locale, LocaleContext, SortKey, Value};

use crate::row::{Row, RowSet};

/// Clone `root` and sort every sibling level by the ordered key list.
///
/// Keys are applied in list order: column 1 first, column 2 only on
/// equality, and so on. Unmaterialized rows sort as all-null rows.
pub(crate) fn sorted_clone_by_keys(
    root: &RowSet,
    ctx: &LocaleContext,
    locale: &Locale,
    keys: &[SortKey],
) -> RowSet {
    let mut clone = root.clone_set(true);
    sort_set_recursive(&mut clone, &mut |a, b| compare_by_keys(a, b, ctx, locale, keys));
    clone
}

/// Clone `root` and sort every sibling level by a caller comparator.
pub(crate) fn sorted_clone_with(
    root: &RowSet,
    cmp: &mut dyn FnMut(&Row, &Row) -> Ordering,
) -> RowSet {
    let blank = Row::new(root.column_count());
    let mut clone = root.clone_set(true);
    sort_set_recursive(&mut clone, &mut |a, b| {
        cmp(a.unwrap_or(&blank), b.unwrap_or(&blank))
    });
    clone
}

fn sort_set_recursive(
    set: &mut RowSet,
    cmp: &mut dyn FnMut(Option<&Row>, Option<&Row>) -> Ordering,
) {
    set.sort_rows(cmp);
    for row in set.materialized_rows_mut() {
        if row.has_children() {
            sort_set_recursive(row.children_mut(), cmp);
        }
    }
}

fn compare_by_keys(
    a: Option<&Row>,
    b: Option<&Row>,
    ctx: &LocaleContext,
    locale: &Locale,
    keys: &[SortKey],
) -> Ordering {
    let null = Value::Null;
    for key in keys {
        let va = key_value(a, key, ctx, locale).unwrap_or(&null);
        let vb = key_value(b, key, ctx, locale).unwrap_or(&null);
        let ord = key.order.apply(va.compare(vb));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn key_value<'a>(
    row: Option<&'a Row>,
    key: &SortKey,
    ctx: &LocaleContext,
    locale: &Locale,
) -> Option<&'a Value> {
    let row = row?;
    if key.column < row.column_count() {
        row.value(key.column, key.role, ctx, locale)
    } else {
        None
    }
}
