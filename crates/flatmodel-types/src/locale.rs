//! Locale tags and the value resolution policy.
//!
//! A cell slot may hold one value per locale. Reads go through the
//! resolution chain: exact locale → UI default locale → "any language" →
//! application default locale → Russian → English → first available entry.
//! The chain is deterministic; two reads with the same map and context
//! always pick the same entry.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A language/region tag selecting one of several stored values.
///
/// The special [`Locale::ANY`] tag marks a locale-agnostic value; a slot
/// holding only an `ANY` entry behaves as a plain scalar.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(Cow<'static, str>);

impl Locale {
    /// The locale-agnostic "any language" tag.
    pub const ANY: Self = Self(Cow::Borrowed("*"));
    /// Russian, a fixed step of the fallback chain.
    pub const RUSSIAN: Self = Self(Cow::Borrowed("ru"));
    /// English, a fixed step of the fallback chain.
    pub const ENGLISH: Self = Self(Cow::Borrowed("en"));

    /// Create a locale from a tag such as `"de"` or `"pt-BR"`.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(Cow::Owned(tag.into()))
    }

    /// The raw tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the "any language" tag.
    #[must_use]
    pub fn is_any(&self) -> bool {
        self.0 == Self::ANY.0
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::ANY
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locale {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// The two ambient default locales consulted by the resolution chain.
///
/// Supplied by the consuming application's locale service; the engine only
/// reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleContext {
    /// The locale the user interface currently renders in.
    pub ui: Locale,
    /// The application-wide default locale.
    pub app: Locale,
}

impl Default for LocaleContext {
    fn default() -> Self {
        Self {
            ui: Locale::ENGLISH,
            app: Locale::ENGLISH,
        }
    }
}

impl LocaleContext {
    /// Pick one value out of a locale→value map for `requested`.
    ///
    /// Walks the fallback chain in order and returns the first entry found;
    /// `None` only if the map is empty.
    #[must_use]
    pub fn resolve<'a>(
        &self,
        map: &'a BTreeMap<Locale, Value>,
        requested: &Locale,
    ) -> Option<&'a Value> {
        for candidate in [
            requested,
            &self.ui,
            &Locale::ANY,
            &self.app,
            &Locale::RUSSIAN,
            &Locale::ENGLISH,
        ] {
            if let Some(v) = map.get(candidate) {
                return Some(v);
            }
        }
        map.values().next()
    }
}
