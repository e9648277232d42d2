//! The cursor — a clamped buffer position with motion commands.
//!
//! Every motion takes the buffer it moves over plus a `past_end` flag:
//! `false` keeps the column on a character (`col < max(1, line_len)`, the
//! normal/visual rule), `true` allows resting one past the last character
//! (insert, replace). Motions that cannot move leave the cursor untouched —
//! they are silent no-ops, never errors.
//!
//! Vertical motion remembers a *sticky* column: moving from a long row
//! through a short one and back restores the original column, and `$` pins
//! the cursor to row ends until a horizontal motion resets it.

use crate::buffer::Buffer;
use crate::position::Position;
use crate::word;

/// Flavor of a single-row character search (`f`/`F`/`t`/`T`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindKind {
    /// `f` — forward onto the target character.
    Forward,
    /// `F` — backward onto the target character.
    Backward,
    /// `t` — forward, stopping just before the target.
    TillForward,
    /// `T` — backward, stopping just after the target.
    TillBackward,
}

impl FindKind {
    /// The mirrored search used by `,`.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
            Self::TillForward => Self::TillBackward,
            Self::TillBackward => Self::TillForward,
        }
    }
}

/// A buffer position plus the sticky column for vertical motion.
#[derive(Debug, Clone)]
pub struct Cursor {
    pos: Position,
    sticky: usize,
}

impl Cursor {
    #[must_use]
    pub const fn new() -> Self {
        Self { pos: Position::ORIGIN, sticky: 0 }
    }

    // -- Accessors ----------------------------------------------------------

    #[inline]
    #[must_use]
    pub const fn pos(&self) -> Position {
        self.pos
    }

    #[inline]
    #[must_use]
    pub const fn row(&self) -> usize {
        self.pos.row
    }

    #[inline]
    #[must_use]
    pub const fn col(&self) -> usize {
        self.pos.col
    }

    // -- Placement ----------------------------------------------------------

    fn max_col(buf: &Buffer, row: usize, past_end: bool) -> usize {
        let len = buf.line_len(row);
        if past_end { len } else { len.saturating_sub(1) }
    }

    /// Place the cursor, clamping to the buffer, and remember the column.
    pub fn set(&mut self, pos: Position, buf: &Buffer, past_end: bool) {
        let row = pos.row.min(buf.row_count() - 1);
        let col = pos.col.min(Self::max_col(buf, row, past_end));
        self.pos = Position::new(row, col);
        self.sticky = col;
    }

    /// Re-clamp after a buffer mutation shrank the text under the cursor.
    pub fn clamp(&mut self, buf: &Buffer, past_end: bool) {
        let row = self.pos.row.min(buf.row_count() - 1);
        let col = self.pos.col.min(Self::max_col(buf, row, past_end));
        self.pos = Position::new(row, col);
    }

    // -- Horizontal ---------------------------------------------------------

    /// `h` — left `count` columns, stopping at column 0.
    pub fn left(&mut self, count: usize) {
        self.pos.col = self.pos.col.saturating_sub(count);
        self.sticky = self.pos.col;
    }

    /// `l` — right `count` columns, stopping at the row edge.
    pub fn right(&mut self, count: usize, buf: &Buffer, past_end: bool) {
        let limit = Self::max_col(buf, self.pos.row, past_end);
        self.pos.col = self.pos.col.saturating_add(count).min(limit);
        self.sticky = self.pos.col;
    }

    /// `0` — column 0.
    pub const fn to_row_start(&mut self) {
        self.pos.col = 0;
        self.sticky = 0;
    }

    /// `^` — first non-blank column (or column 0 on a blank row).
    pub fn to_first_non_blank(&mut self, buf: &Buffer) {
        let line = buf.line(self.pos.row);
        let col = line
            .chars()
            .position(|ch| !ch.is_whitespace())
            .unwrap_or(0);
        self.pos.col = col;
        self.sticky = col;
    }

    /// `$` — row end; pins vertical motion to row ends until a horizontal
    /// motion resets the column.
    pub fn to_row_end(&mut self, buf: &Buffer, past_end: bool) {
        self.pos.col = Self::max_col(buf, self.pos.row, past_end);
        self.sticky = usize::MAX;
    }

    // -- Vertical -----------------------------------------------------------

    /// `k` — up `count` rows, restoring the sticky column.
    pub fn up(&mut self, count: usize, buf: &Buffer, past_end: bool) {
        let row = self.pos.row.saturating_sub(count);
        self.land_on_row(row, buf, past_end);
    }

    /// `j` — down `count` rows, restoring the sticky column.
    pub fn down(&mut self, count: usize, buf: &Buffer, past_end: bool) {
        let row = self
            .pos
            .row
            .saturating_add(count)
            .min(buf.row_count() - 1);
        self.land_on_row(row, buf, past_end);
    }

    /// `gg` / `G` with a count — jump to `row` (clamped) and land on its
    /// first non-blank column.
    pub fn goto_row(&mut self, row: usize, buf: &Buffer) {
        self.pos.row = row.min(buf.row_count() - 1);
        self.to_first_non_blank(buf);
    }

    /// `G` without a count — the last row.
    pub fn to_last_row(&mut self, buf: &Buffer) {
        self.goto_row(buf.row_count() - 1, buf);
    }

    fn land_on_row(&mut self, row: usize, buf: &Buffer, past_end: bool) {
        self.pos.row = row;
        self.pos.col = self.sticky.min(Self::max_col(buf, row, past_end));
    }

    // -- Word motions -------------------------------------------------------

    /// `w` / `W`.
    pub fn next_word(&mut self, count: usize, buf: &Buffer, big: bool) {
        for _ in 0..count {
            self.pos = word::next_word_start(buf, self.pos, big);
        }
        self.sticky = self.pos.col;
    }

    /// `b` / `B`.
    pub fn prev_word(&mut self, count: usize, buf: &Buffer, big: bool) {
        for _ in 0..count {
            self.pos = word::prev_word_start(buf, self.pos, big);
        }
        self.sticky = self.pos.col;
    }

    /// `e` / `E`.
    pub fn word_end(&mut self, count: usize, buf: &Buffer, big: bool) {
        for _ in 0..count {
            self.pos = word::next_word_end(buf, self.pos, big);
        }
        self.sticky = self.pos.col;
    }

    // -- Character search ---------------------------------------------------

    /// `f`/`F`/`t`/`T` — search the current row for the `count`-th
    /// occurrence of `target`. Returns whether the cursor moved; an absent
    /// target is a silent no-op.
    pub fn find_char(
        &mut self,
        buf: &Buffer,
        target: char,
        count: usize,
        kind: FindKind,
    ) -> bool {
        let chars: Vec<char> = buf.line(self.pos.row).chars().collect();
        let col = self.pos.col;
        let hit = match kind {
            FindKind::Forward | FindKind::TillForward => {
                nth_occurrence((col + 1..chars.len()).filter(|&c| chars[c] == target), count)
            }
            FindKind::Backward | FindKind::TillBackward => {
                nth_occurrence((0..col).rev().filter(|&c| chars[c] == target), count)
            }
        };
        let Some(hit) = hit else {
            return false;
        };
        let dest = match kind {
            FindKind::Forward | FindKind::Backward => hit,
            FindKind::TillForward => hit - 1,
            FindKind::TillBackward => hit + 1,
        };
        self.pos.col = dest;
        self.sticky = dest;
        true
    }

    // -- Paragraph motions --------------------------------------------------

    /// `}` — forward to the next empty row (stepping at least one row), or
    /// the last row when none remains. Whitespace-only rows are not
    /// boundaries; only truly empty rows are. A count repeats the step.
    pub fn paragraph_forward(&mut self, count: usize, buf: &Buffer) {
        let rows = buf.row_count();
        for _ in 0..count {
            let mut row = self.pos.row + 1;
            while row < rows && buf.line_len(row) != 0 {
                row += 1;
            }
            self.pos.row = row.min(rows - 1);
        }
        self.pos.col = 0;
        self.sticky = 0;
    }

    /// `{` — backward to the previous empty row (stepping at least one
    /// row), or the first row when none remains.
    pub fn paragraph_backward(&mut self, count: usize, buf: &Buffer) {
        for _ in 0..count {
            if self.pos.row == 0 {
                break;
            }
            let mut row = self.pos.row - 1;
            while row > 0 && buf.line_len(row) != 0 {
                row -= 1;
            }
            self.pos.row = row;
        }
        self.pos.col = 0;
        self.sticky = 0;
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

/// Exactly the `count`-th item, or `None` when the iterator runs dry first.
fn nth_occurrence(mut iter: impl Iterator<Item = usize>, count: usize) -> Option<usize> {
    iter.nth(count.max(1) - 1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
