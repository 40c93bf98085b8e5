//! Sparse per-role header label stores.
//!
//! Row and column headers live outside the row tree in two [`HeaderStore`]s
//! owned by the table. Section indices are row indices (vertical band) or
//! column indices (horizontal band); the table keeps both stores shifted in
//! lockstep with structural mutations.

use std::collections::BTreeMap;

use flatmodel_types::{Role, Value};

/// A sparse sequence of per-section role→value maps.
///
/// Backing storage only grows when a section is actually labeled; the
/// logical section count is owned by the table, not by the store.
#[derive(Debug, Clone, Default)]
pub struct HeaderStore {
    /// Sparse; `len()` never exceeds the logical section count.
    sections: Vec<Option<BTreeMap<Role, Value>>>,
}

impl HeaderStore {
    /// The value stored for (`section`, `role`), if any.
    #[must_use]
    pub fn data(&self, section: usize, role: Role) -> Option<&Value> {
        self.sections
            .get(section)
            .and_then(Option::as_ref)
            .and_then(|map| map.get(&role))
    }

    /// Store `value` for (`section`, `role`); an empty value clears.
    pub fn set_data(&mut self, section: usize, role: Role, value: Value) {
        if value.is_empty() {
            if let Some(Some(map)) = self.sections.get_mut(section) {
                map.remove(&role);
                if map.is_empty() {
                    self.sections[section] = None;
                }
            }
            return;
        }
        if section >= self.sections.len() {
            self.sections.resize_with(section + 1, || None);
        }
        self.sections[section]
            .get_or_insert_with(BTreeMap::new)
            .insert(role, value);
    }

    /// Shift labels right for `count` sections inserted before `at`.
    pub fn insert_sections(&mut self, at: usize, count: usize) {
        if at < self.sections.len() {
            for _ in 0..count {
                self.sections.insert(at, None);
            }
        }
    }

    /// Drop labels for the removed sections `[at, at + count)`.
    pub fn remove_sections(&mut self, at: usize, count: usize) {
        if at < self.sections.len() {
            let end = usize::min(at + count, self.sections.len());
            self.sections.drain(at..end);
        }
    }

    /// Reorder labels for a section move; `dst` is the post-removal
    /// insertion index, `width` the logical section count.
    pub fn move_sections(&mut self, src: usize, count: usize, dst: usize, width: usize) {
        if self.sections.is_empty() {
            return;
        }
        self.sections.resize_with(width, || None);
        let span: Vec<_> = self.sections.drain(src..src + count).collect();
        for (offset, section) in span.into_iter().enumerate() {
            self.sections.insert(dst + offset, section);
        }
        while matches!(self.sections.last(), Some(None)) {
            self.sections.pop();
        }
    }

    /// Drop labels beyond the logical section count `n`.
    pub fn truncate(&mut self, n: usize) {
        self.sections.truncate(n);
    }

    /// Drop every label.
    pub fn clear(&mut self) {
        self.sections.clear();
    }

    /// Logical equality: an absent section equals an empty map.
    #[must_use]
    pub fn content_eq(&self, other: &Self) -> bool {
        let len = usize::max(self.sections.len(), other.sections.len());
        (0..len).all(|i| {
            let a = self.sections.get(i).and_then(Option::as_ref);
            let b = other.sections.get(i).and_then(Option::as_ref);
            match (a, b) {
                (None, None) => true,
                (Some(m), None) | (None, Some(m)) => m.is_empty(),
                (Some(a), Some(b)) => a == b,
            }
        })
    }
}
