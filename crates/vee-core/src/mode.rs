//! Modal editing states.
//!
//! The session is always in exactly one [`Mode`]; the mode decides how the
//! next key is interpreted and where the cursor may rest:
//!
//! | Mode     | Cursor limit        | Purpose                    |
//! |----------|---------------------|----------------------------|
//! | Normal   | `0..max(1, len)`    | motions, operators, counts |
//! | Insert   | `0..=len`           | typing text                |
//! | Replace  | `0..=len`           | overwriting text           |
//! | Visual   | `0..max(1, len)`    | extending a selection      |
//! | Command  | (on the input line) | `:` / `/` / `?` input      |
//!
//! This is pure data — transitions live in the session dispatcher.

use std::fmt;

/// Which flavor of visual selection is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualKind {
    /// `v` — character-wise, inclusive of the cursor character.
    Char,
    /// `V` — line-wise, whole rows regardless of column.
    Line,
}

/// The current editing mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Keys are commands. The initial mode.
    #[default]
    Normal,
    /// Keys insert text at the cursor.
    Insert,
    /// `R` — keys overwrite the character under the cursor.
    Replace,
    /// Motions extend a selection anchored where the mode was entered.
    Visual(VisualKind),
    /// Collecting one line of `:` / `/` / `?` input.
    Command,
}

impl Mode {
    /// Status-line name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Insert => "INSERT",
            Self::Replace => "REPLACE",
            Self::Visual(VisualKind::Char) => "VISUAL",
            Self::Visual(VisualKind::Line) => "VISUAL LINE",
            Self::Command => "COMMAND",
        }
    }

    /// True when the cursor may rest one column past the last character.
    /// Normal and visual contexts keep the cursor on a character.
    #[inline]
    #[must_use]
    pub const fn allows_past_end(self) -> bool {
        matches!(self, Self::Insert | Self::Replace | Self::Command)
    }

    /// True for either visual flavor.
    #[inline]
    #[must_use]
    pub const fn is_visual(self) -> bool {
        matches!(self, Self::Visual(_))
    }

    /// True when keys become buffer or command-line text.
    #[inline]
    #[must_use]
    pub const fn is_input(self) -> bool {
        matches!(self, Self::Insert | Self::Replace | Self::Command)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
