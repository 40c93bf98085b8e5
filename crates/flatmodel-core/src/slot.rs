//! Per-role value storage within a cell.

use std::collections::BTreeMap;

use flatmodel_types::{Locale, LocaleContext, Role, Value};

/// The payload of a [`ValueSlot`]: a single scalar until the first write
/// under a concrete locale, a locale→value map afterwards.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ValueStore {
    /// One locale-agnostic value.
    Scalar(Value),
    /// One value per locale tag.
    PerLocale(BTreeMap<Locale, Value>),
}

/// One role's value(s) for one cell position, plus its changed bit.
///
/// A slot starts life as a scalar. The first write under a locale other
/// than [`Locale::ANY`] promotes it to a per-locale map; the promotion is
/// permanent: the slot never demotes back to scalar even if the map shrinks
/// to a single entry.
#[derive(Debug, Clone)]
pub struct ValueSlot {
    role: Role,
    changed: bool,
    store: ValueStore,
}

impl ValueSlot {
    pub(crate) fn new(role: Role, locale: &Locale, value: Value) -> Self {
        let store = if locale.is_any() {
            ValueStore::Scalar(value)
        } else {
            let mut map = BTreeMap::new();
            map.insert(locale.clone(), value);
            ValueStore::PerLocale(map)
        };
        Self {
            role,
            changed: true,
            store,
        }
    }

    /// The role this slot stores.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Store `value` under `locale`, promoting scalar storage if needed.
    pub(crate) fn set(&mut self, locale: &Locale, value: Value) {
        match &mut self.store {
            ValueStore::Scalar(current) if locale.is_any() => *current = value,
            ValueStore::Scalar(current) => {
                let mut map = BTreeMap::new();
                map.insert(Locale::ANY, std::mem::take(current));
                map.insert(locale.clone(), value);
                self.store = ValueStore::PerLocale(map);
            }
            ValueStore::PerLocale(map) => {
                map.insert(locale.clone(), value);
            }
        }
        self.changed = true;
    }

    /// Remove the entry stored under `locale`.
    ///
    /// Returns true if the slot holds no values afterwards and should be
    /// dropped by its cell. A scalar slot is only cleared by [`Locale::ANY`].
    pub(crate) fn remove(&mut self, locale: &Locale) -> bool {
        match &mut self.store {
            ValueStore::Scalar(_) => {
                if locale.is_any() {
                    self.changed = true;
                    return true;
                }
                false
            }
            ValueStore::PerLocale(map) => {
                if map.remove(locale).is_some() {
                    self.changed = true;
                }
                map.is_empty()
            }
        }
    }

    /// Resolve one value for `requested` through the fallback chain.
    #[must_use]
    pub fn resolve<'a>(&'a self, ctx: &LocaleContext, requested: &Locale) -> Option<&'a Value> {
        match &self.store {
            ValueStore::Scalar(v) => Some(v),
            ValueStore::PerLocale(map) => ctx.resolve(map, requested),
        }
    }

    /// The raw locale→value view of this slot.
    ///
    /// Scalar storage is reported as a single [`Locale::ANY`] entry.
    #[must_use]
    pub fn raw_map(&self) -> BTreeMap<Locale, Value> {
        match &self.store {
            ValueStore::Scalar(v) => {
                let mut map = BTreeMap::new();
                map.insert(Locale::ANY, v.clone());
                map
            }
            ValueStore::PerLocale(map) => map.clone(),
        }
    }

    /// Returns true if this slot was written since the last
    /// [`ValueSlot::reset_changed`].
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub(crate) fn reset_changed(&mut self) {
        self.changed = false;
    }

    /// Data equality, ignoring the changed bit.
    pub(crate) fn data_eq(&self, other: &Self) -> bool {
        self.role == other.role && self.raw_map() == other.raw_map()
    }
}
