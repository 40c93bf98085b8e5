//! One (row, column) position: a role→slot list plus an optional flags
//! override.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use flatmodel_types::{ItemFlags, Locale, LocaleContext, Role, Value};

use crate::slot::ValueSlot;

/// Lazily-created storage for one cell position.
///
/// Cells hold a handful of roles in the common case, so the slot list is a
/// small vector searched linearly. A cell with no flags override inherits
/// the table's default flags.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    flags: Option<ItemFlags>,
    slots: SmallVec<[ValueSlot; 4]>,
}

impl Cell {
    /// The flags override, if one was explicitly set.
    #[must_use]
    pub fn flags_override(&self) -> Option<ItemFlags> {
        self.flags
    }

    /// Set or clear the flags override.
    pub fn set_flags_override(&mut self, flags: Option<ItemFlags>) {
        self.flags = flags;
    }

    /// The slot stored for `role`, if any.
    #[must_use]
    pub fn slot(&self, role: Role) -> Option<&ValueSlot> {
        self.slots.iter().find(|s| s.role() == role)
    }

    /// Store `value` for `role` under `locale`.
    ///
    /// An empty value clears the locale entry (and the whole slot once no
    /// entries remain) instead of being stored, so storage stays proportional
    /// to populated data.
    pub fn set(&mut self, role: Role, locale: &Locale, value: Value) {
        if value.is_empty() {
            self.remove_locale(role, locale);
            return;
        }
        match self.slots.iter_mut().find(|s| s.role() == role) {
            Some(slot) => slot.set(locale, value),
            None => self.slots.push(ValueSlot::new(role, locale, value)),
        }
    }

    /// Resolve the value stored for `role` through the locale chain.
    #[must_use]
    pub fn value<'a>(
        &'a self,
        role: Role,
        ctx: &LocaleContext,
        requested: &Locale,
    ) -> Option<&'a Value> {
        self.slot(role).and_then(|s| s.resolve(ctx, requested))
    }

    /// Drop the whole slot stored for `role`. Returns true if one existed.
    pub fn remove(&mut self, role: Role) -> bool {
        let before = self.slots.len();
        self.slots.retain(|s| s.role() != role);
        self.slots.len() != before
    }

    fn remove_locale(&mut self, role: Role, locale: &Locale) {
        if let Some(idx) = self.slots.iter().position(|s| s.role() == role) {
            if self.slots[idx].remove(locale) {
                self.slots.remove(idx);
            }
        }
    }

    /// Drop every slot, returning the roles that were populated.
    pub fn take_roles(&mut self) -> Vec<Role> {
        let roles = self.slots.iter().map(ValueSlot::role).collect();
        self.slots.clear();
        roles
    }

    /// Drop every slot and the flags override.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.flags = None;
    }

    /// Returns true if the cell stores nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty() && self.flags.is_none()
    }

    /// Resolved role→value view under `requested` (one value per role).
    #[must_use]
    pub fn to_map(&self, ctx: &LocaleContext, requested: &Locale) -> BTreeMap<Role, Value> {
        self.slots
            .iter()
            .filter_map(|s| s.resolve(ctx, requested).map(|v| (s.role(), v.clone())))
            .collect()
    }

    /// Raw role→(locale→value) view.
    #[must_use]
    pub fn to_raw_map(&self) -> BTreeMap<Role, BTreeMap<Locale, Value>> {
        self.slots.iter().map(|s| (s.role(), s.raw_map())).collect()
    }

    /// Replace the cell's contents from a role→value map under `locale`.
    ///
    /// Empty values in the map clear rather than store, as with
    /// [`Cell::set`]. The flags override is left alone.
    pub fn from_map(&mut self, map: BTreeMap<Role, Value>, locale: &Locale) {
        self.slots.clear();
        for (role, value) in map {
            self.set(role, locale, value);
        }
    }

    /// Returns true if `role` (or, with `None`, any role) was written since
    /// the last reset.
    #[must_use]
    pub fn is_changed(&self, role: Option<Role>) -> bool {
        match role {
            Some(role) => self.slot(role).is_some_and(ValueSlot::is_changed),
            None => self.slots.iter().any(ValueSlot::is_changed),
        }
    }

    /// Clear the changed bit for `role`, or for every slot with `None`.
    pub fn reset_changed(&mut self, role: Option<Role>) {
        for slot in &mut self.slots {
            if role.is_none() || role == Some(slot.role()) {
                slot.reset_changed();
            }
        }
    }

    /// Data equality: flags override plus per-role raw maps, ignoring
    /// changed bits and slot order.
    #[must_use]
    pub fn data_eq(&self, other: &Self) -> bool {
        self.flags == other.flags
            && self.slots.len() == other.slots.len()
            && self.slots.iter().all(|s| {
                other
                    .slot(s.role())
                    .is_some_and(|o| s.data_eq(o))
            })
    }
}
