//! Modifier state tracking.
//!
//! The tracker folds key down/up transitions into a bitmask of currently
//! held modifiers. Left and right variants of a modifier share one bit, so
//! releasing either side clears it even if the other side is still down;
//! that simplification is deliberate and matches the stored data model.

use std::collections::HashMap;

use bitflags::bitflags;

bitflags! {
    /// Held-modifier bitset. Decomposed into one boolean column per bit
    /// when persisted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModifierMask: u8 {
        const SHIFT   = 0x01;
        const CONTROL = 0x02;
        const ALT     = 0x04;
        const META    = 0x08;
        const SUPER   = 0x10;
    }
}

impl ModifierMask {
    pub fn shift(&self) -> bool {
        self.contains(ModifierMask::SHIFT)
    }

    pub fn ctrl(&self) -> bool {
        self.contains(ModifierMask::CONTROL)
    }

    pub fn alt(&self) -> bool {
        self.contains(ModifierMask::ALT)
    }

    pub fn meta(&self) -> bool {
        self.contains(ModifierMask::META)
    }

    pub fn superkey(&self) -> bool {
        self.contains(ModifierMask::SUPER)
    }
}

/// The stock identifier-to-bit table.
///
/// evdev reports the Super/Windows key as `KEY_LEFTMETA`/`KEY_RIGHTMETA`;
/// it is counted under the SUPER bit, which is what X11 setups historically
/// recorded for that physical key. The META bit stays reachable through a
/// custom table.
pub fn default_modifier_table() -> HashMap<String, ModifierMask> {
    let mut table = HashMap::new();
    table.insert("KEY_LEFTSHIFT".to_string(), ModifierMask::SHIFT);
    table.insert("KEY_RIGHTSHIFT".to_string(), ModifierMask::SHIFT);
    table.insert("KEY_LEFTCTRL".to_string(), ModifierMask::CONTROL);
    table.insert("KEY_RIGHTCTRL".to_string(), ModifierMask::CONTROL);
    table.insert("KEY_LEFTALT".to_string(), ModifierMask::ALT);
    table.insert("KEY_RIGHTALT".to_string(), ModifierMask::ALT);
    table.insert("KEY_LEFTMETA".to_string(), ModifierMask::SUPER);
    table.insert("KEY_RIGHTMETA".to_string(), ModifierMask::SUPER);
    table
}

/// Tracks which modifiers are currently held.
///
/// The identifier-to-bit table is fixed at construction; identifiers not in
/// the table are ignored by [`update`](Self::update).
#[derive(Debug, Clone)]
pub struct ModifierTracker {
    table: HashMap<String, ModifierMask>,
    mask: ModifierMask,
}

impl ModifierTracker {
    pub fn new(table: HashMap<String, ModifierMask>) -> Self {
        Self {
            table,
            mask: ModifierMask::empty(),
        }
    }

    /// Apply a key transition. Sets the bit on press, clears it on release;
    /// unrecognized identifiers are no-ops. Re-pressing a held modifier or
    /// re-releasing an idle one leaves the mask unchanged.
    pub fn update(&mut self, identifier: &str, pressed: bool) {
        if let Some(bit) = self.table.get(identifier) {
            if pressed {
                self.mask |= *bit;
            } else {
                self.mask &= !*bit;
            }
        }
    }

    /// The mask of modifiers held right now.
    pub fn mask(&self) -> ModifierMask {
        self.mask
    }
}

impl Default for ModifierTracker {
    fn default() -> Self {
        Self::new(default_modifier_table())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_and_release_round_trip() {
        let mut tracker = ModifierTracker::default();
        tracker.update("KEY_LEFTSHIFT", true);
        assert_eq!(tracker.mask(), ModifierMask::SHIFT);
        tracker.update("KEY_LEFTSHIFT", false);
        assert!(tracker.mask().is_empty());
    }

    #[test]
    fn test_left_and_right_share_a_bit() {
        let mut tracker = ModifierTracker::default();
        tracker.update("KEY_LEFTCTRL", true);
        tracker.update("KEY_RIGHTCTRL", true);
        assert_eq!(tracker.mask(), ModifierMask::CONTROL);

        // Releasing one side clears the shared bit even though the other
        // side is still physically down.
        tracker.update("KEY_LEFTCTRL", false);
        assert!(tracker.mask().is_empty());
    }

    #[test]
    fn test_unrecognized_identifier_is_a_noop() {
        let mut tracker = ModifierTracker::default();
        tracker.update("KEY_A", true);
        tracker.update("17", true);
        assert!(tracker.mask().is_empty());
    }

    #[test]
    fn test_repeat_transitions_are_idempotent() {
        let mut tracker = ModifierTracker::default();
        tracker.update("KEY_LEFTALT", true);
        tracker.update("KEY_LEFTALT", true);
        assert_eq!(tracker.mask(), ModifierMask::ALT);
        tracker.update("KEY_LEFTALT", false);
        tracker.update("KEY_LEFTALT", false);
        assert!(tracker.mask().is_empty());
    }

    #[test]
    fn test_combined_mask() {
        let mut tracker = ModifierTracker::default();
        tracker.update("KEY_LEFTSHIFT", true);
        tracker.update("KEY_LEFTMETA", true);
        assert_eq!(tracker.mask(), ModifierMask::SHIFT | ModifierMask::SUPER);
        assert!(tracker.mask().shift());
        assert!(tracker.mask().superkey());
        assert!(!tracker.mask().meta());
    }

    #[test]
    fn test_custom_table_reaches_meta() {
        let mut table = HashMap::new();
        table.insert("KEY_LEFTMETA".to_string(), ModifierMask::META);
        let mut tracker = ModifierTracker::new(table);
        tracker.update("KEY_LEFTMETA", true);
        assert_eq!(tracker.mask(), ModifierMask::META);

        // Keys outside the custom table are ordinary keys.
        tracker.update("KEY_LEFTSHIFT", true);
        assert_eq!(tracker.mask(), ModifierMask::META);
    }
}
