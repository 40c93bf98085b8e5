//! The dynamically-typed cell/header value.
//!
//! Every cell, header entry, and sort key in the engine stores a [`Value`].
//! The set of variants is closed: null, boolean, integer, floating point,
//! decimal, string, date/time, icon reference, and opaque blob. Each variant
//! has defined comparison and stringification rules so that sorting and the
//! search-index cache behave deterministically.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A named reference to an icon or image resource.
///
/// The engine never loads pixels; icon values are opaque names resolved by
/// the consuming application's icon cache.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IconRef(String);

impl IconRef {
    /// Create an icon reference from a resource name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IconRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The storage class of a [`Value`], used for cross-variant ordering.
///
/// Variants compare by kind rank first; only the numeric kinds (integer,
/// float, decimal) compare against each other by magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// No value.
    Null,
    /// Boolean.
    Bool,
    /// Any of the three numeric variants.
    Numeric,
    /// Calendar date and time.
    DateTime,
    /// UTF-8 text.
    String,
    /// Icon resource reference.
    Icon,
    /// Opaque byte blob.
    Blob,
}

/// A dynamically-typed value.
///
/// Cell data, header labels, and sort keys all flow through this closed
/// tagged union.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum Value {
    /// No value. Writing `Null` into a cell clears the slot.
    #[default]
    Null,
    /// A boolean (check states and similar).
    Bool(bool),
    /// A 64-bit signed integer.
    Integer(i64),
    /// A 64-bit IEEE 754 floating-point number.
    Float(f64),
    /// An exact decimal (monetary amounts and similar).
    Decimal(Decimal),
    /// A UTF-8 text string.
    String(String),
    /// A calendar date and time, naive (no timezone).
    DateTime(NaiveDateTime),
    /// A named icon/image reference.
    Icon(IconRef),
    /// An opaque binary blob.
    Blob(Vec<u8>),
}

impl Value {
    /// Returns the storage class of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Integer(_) | Self::Float(_) | Self::Decimal(_) => ValueKind::Numeric,
            Self::DateTime(_) => ValueKind::DateTime,
            Self::String(_) => ValueKind::String,
            Self::Icon(_) => ValueKind::Icon,
            Self::Blob(_) => ValueKind::Blob,
        }
    }

    /// Returns true if this is the null value.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true if this value carries no payload worth storing.
    ///
    /// Null, the empty string, and the empty blob are all "empty": writing
    /// an empty value through the data API clears the slot instead of
    /// materializing storage for it.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(s) => s.is_empty(),
            Self::Blob(b) => b.is_empty(),
            _ => false,
        }
    }

    /// Try to extract a boolean.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to extract an integer.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to extract a float.
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to extract a text reference.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to extract a blob reference.
    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Self::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// Compare two values under the engine's total ordering.
    ///
    /// Rules:
    /// - Different kinds order by kind rank (`Null < Bool < Numeric <
    ///   DateTime < String < Icon < Blob`).
    /// - The numeric variants compare against each other by magnitude
    ///   (an `Integer(2)` equals a `Float(2.0)` equals a `Decimal(2)`).
    /// - Strings compare lexicographically by scalar value, icons by name,
    ///   blobs bytewise, date/times chronologically.
    /// - `Float` NaN orders below every other number, so the ordering stays
    ///   total.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        let (ka, kb) = (self.kind(), other.kind());
        if ka != kb {
            return ka.cmp(&kb);
        }
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::DateTime(a), Self::DateTime(b)) => a.cmp(b),
            (Self::Icon(a), Self::Icon(b)) => a.cmp(b),
            (Self::Blob(a), Self::Blob(b)) => a.cmp(b),
            _ => numeric_cmp(self, other),
        }
    }

    /// Returns true if the two values compare equal under [`Value::compare`].
    ///
    /// This is the equality used by sort tie-breaking and by the search
    /// cache, not raw structural identity: `Integer(2)` equals `Float(2.0)`.
    #[must_use]
    pub fn compares_equal(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }

    /// Stringify this value for display and for search-index keys.
    ///
    /// Null becomes the empty string; blobs are interpreted as UTF-8 with
    /// lossy replacement for invalid sequences.
    #[must_use]
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Decimal(d) => d.to_string(),
            Self::String(s) => s.clone(),
            Self::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Self::Icon(icon) => icon.name().to_owned(),
            Self::Blob(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}

/// Compare two numeric values by magnitude.
///
/// Integer/Integer and Decimal/Decimal compare exactly; every mixed pairing
/// goes through `f64`. NaN is normalized to order below all other numbers.
#[allow(clippy::cast_precision_loss)]
fn numeric_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
        (Value::Decimal(x), Value::Decimal(y)) => x.cmp(y),
        (Value::Integer(x), Value::Decimal(y)) => Decimal::from(*x).cmp(y),
        (Value::Decimal(x), Value::Integer(y)) => x.cmp(&Decimal::from(*y)),
        _ => total_f64_cmp(numeric_as_f64(a), numeric_as_f64(b)),
    }
}

#[allow(clippy::cast_precision_loss)]
fn numeric_as_f64(v: &Value) -> f64 {
    match v {
        Value::Integer(i) => *i as f64,
        Value::Float(f) => *f,
        Value::Decimal(d) => d.to_f64().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn total_f64_cmp(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.compares_equal(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Self::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Self::DateTime(dt)
    }
}

impl From<IconRef> for Value {
    fn from(icon: IconRef) -> Self {
        Self::Icon(icon)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Blob(b)
    }
}
