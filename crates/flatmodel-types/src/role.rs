//! Open-ended role keys.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An integer key identifying which aspect of a cell or header is stored.
///
/// The key space is open-ended: the engine only interprets roles as map
/// keys, never as behavior. Well-known roles are provided as constants;
/// consumers allocate their own starting at [`Role::USER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Role(pub u32);

impl Role {
    /// Primary display text.
    pub const DISPLAY: Self = Self(0);
    /// Icon shown next to the display text.
    pub const DECORATION: Self = Self(1);
    /// Text shown while editing.
    pub const EDIT: Self = Self(2);
    /// Tooltip text.
    pub const TOOLTIP: Self = Self(3);
    /// Check-box state.
    pub const CHECK_STATE: Self = Self(10);
    /// Value used for sorting when it differs from the display text.
    pub const SORT: Self = Self(14);
    /// First role free for consumer-defined data.
    pub const USER: Self = Self(0x0100);

    /// A consumer-defined role offset from [`Role::USER`].
    #[must_use]
    pub const fn user(offset: u32) -> Self {
        Self(Self::USER.0 + offset)
    }

    /// The raw key.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Role {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}
