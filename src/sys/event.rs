use std::time::Duration;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::sys::geometry::Point;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CONTROL = 1 << 1;
        const ALT = 1 << 2;
        const COMMAND = 1 << 3;
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKey {
    Shift,
    #[serde(alias = "ctrl")]
    Control,
    #[serde(alias = "option")]
    Alt,
    #[serde(alias = "cmd")]
    Command,
}

impl From<ModifierKey> for Modifiers {
    fn from(key: ModifierKey) -> Self {
        match key {
            ModifierKey::Shift => Modifiers::SHIFT,
            ModifierKey::Control => Modifiers::CONTROL,
            ModifierKey::Alt => Modifiers::ALT,
            ModifierKey::Command => Modifiers::COMMAND,
        }
    }
}

impl Modifiers {
    pub fn from_keys(keys: &[ModifierKey]) -> Self {
        keys.iter().fold(Modifiers::empty(), |acc, k| acc | Modifiers::from(*k))
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
    Other(u8),
}

/// Low-level pointer events delivered by the event tap on the run-loop
/// thread. `timestamp` is the event's own time, monotonic from an arbitrary
/// origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MouseEvent {
    Down {
        button: MouseButton,
        modifiers: Modifiers,
        location: Point,
        timestamp: Duration,
    },
    Dragged {
        location: Point,
        timestamp: Duration,
    },
    Up {
        location: Point,
        timestamp: Duration,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_keys_fold_into_flags() {
        let mods = Modifiers::from_keys(&[ModifierKey::Alt, ModifierKey::Shift]);
        assert!(mods.contains(Modifiers::ALT));
        assert!(mods.contains(Modifiers::SHIFT));
        assert!(!mods.contains(Modifiers::COMMAND));
    }
}
