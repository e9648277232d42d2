//! The logical key stream.
//!
//! The engine never sees terminal bytes. A front-end decodes escape
//! sequences and hands the session one [`KeyInput`] at a time: a printable
//! character, a named special key, or either of those with modifier flags.
//! This keeps the dispatcher testable — a test feeds the same values a
//! terminal would.

use bitflags::bitflags;

/// Identity of a key: printable characters use [`Key::Char`], everything
/// else has a named variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable Unicode character.
    Char(char),
    Escape,
    Enter,
    Tab,
    Backspace,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    /// F1 through F12.
    F(u8),
}

bitflags! {
    /// Modifier flags held with a key.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Mods: u8 {
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
    }
}

/// One keystroke: key identity plus modifier flags.
///
/// Shift is already folded into `Char` for printable keys (`A` arrives as
/// `Char('A')` with no flags); the SHIFT flag only matters for named keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyInput {
    pub key: Key,
    pub mods: Mods,
}

impl KeyInput {
    #[inline]
    #[must_use]
    pub const fn new(key: Key, mods: Mods) -> Self {
        Self { key, mods }
    }

    /// A key with no modifiers.
    #[inline]
    #[must_use]
    pub const fn plain(key: Key) -> Self {
        Self { key, mods: Mods::empty() }
    }

    /// A printable character with no modifiers.
    #[inline]
    #[must_use]
    pub const fn ch(ch: char) -> Self {
        Self::plain(Key::Char(ch))
    }

    /// A Ctrl chord, e.g. `Ctrl-R`.
    #[inline]
    #[must_use]
    pub const fn ctrl(ch: char) -> Self {
        Self { key: Key::Char(ch), mods: Mods::CTRL }
    }

    /// True when the CTRL flag is held.
    #[inline]
    #[must_use]
    pub const fn is_ctrl(self) -> bool {
        self.mods.contains(Mods::CTRL)
    }
}

impl From<Key> for KeyInput {
    fn from(key: Key) -> Self {
        Self::plain(key)
    }
}

impl From<char> for KeyInput {
    fn from(ch: char) -> Self {
        Self::ch(ch)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
