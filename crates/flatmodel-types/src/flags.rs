//! Per-cell behavior flags.

use bitflags::bitflags;

bitflags! {
    /// Behavior flags for one cell position.
    ///
    /// A table carries a default set; individual cells may override it.
    /// The engine stores and returns flags but never interprets them; the
    /// view layer does.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ItemFlags: u32 {
        /// The cell can be interacted with at all.
        const ENABLED      = 1 << 0;
        /// The cell can be selected.
        const SELECTABLE   = 1 << 1;
        /// The cell's value can be edited in place.
        const EDITABLE     = 1 << 2;
        /// The cell renders a check box.
        const CHECKABLE    = 1 << 3;
        /// The cell can act as a drag source.
        const DRAG_ENABLED = 1 << 4;
        /// The cell can accept drops.
        const DROP_ENABLED = 1 << 5;
    }
}

impl Default for ItemFlags {
    /// Enabled and selectable, the usual default for data cells.
    fn default() -> Self {
        Self::ENABLED | Self::SELECTABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flags() {
        let flags = ItemFlags::default();
        assert!(flags.contains(ItemFlags::ENABLED));
        assert!(flags.contains(ItemFlags::SELECTABLE));
        assert!(!flags.contains(ItemFlags::EDITABLE));
    }
}
