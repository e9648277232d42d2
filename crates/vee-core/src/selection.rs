//! Visual-mode selections.
//!
//! A selection is ephemeral: created when visual mode is entered, destroyed
//! on Escape or by the operator that consumes it. Only the **anchor** is
//! stored — the live end is wherever the cursor currently sits, so motions
//! grow and shrink the selection for free. Reading the selection normalizes
//! the endpoint order through derived views without ever mutating the
//! anchor.

use crate::buffer::Buffer;
use crate::mode::VisualKind;
use crate::position::{Position, Span};

/// The fixed half of a visual selection plus its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub kind: VisualKind,
}

impl Selection {
    #[inline]
    #[must_use]
    pub const fn new(anchor: Position, kind: VisualKind) -> Self {
        Self { anchor, kind }
    }

    /// Anchor and head in buffer order.
    #[inline]
    #[must_use]
    pub fn endpoints(&self, head: Position) -> (Position, Position) {
        if self.anchor <= head {
            (self.anchor, head)
        } else {
            (head, self.anchor)
        }
    }

    /// The rows the selection touches, `first <= last`.
    #[inline]
    #[must_use]
    pub fn rows(&self, head: Position) -> (usize, usize) {
        let (start, end) = self.endpoints(head);
        (start.row, end.row)
    }

    /// The buffer span an operator acts on.
    ///
    /// Char-wise selections include the head character, wrapping past a row
    /// end to swallow the line break when the inclusive end sits there.
    /// Line-wise selections cover whole rows: through the following row's
    /// start when one exists, otherwise to the end of the last row (the
    /// caller eats the preceding break when deleting).
    #[must_use]
    pub fn span(&self, head: Position, buf: &Buffer) -> Span {
        let (start, end) = self.endpoints(head);
        match self.kind {
            VisualKind::Char => {
                let len = buf.line_len(end.row);
                let past = if end.col < len {
                    end.with_col(end.col + 1)
                } else if end.row + 1 < buf.row_count() {
                    Position::new(end.row + 1, 0)
                } else {
                    end.with_col(len)
                };
                Span::new(start, past)
            }
            VisualKind::Line => {
                let first = Position::new(start.row, 0);
                let last = if end.row + 1 < buf.row_count() {
                    Position::new(end.row + 1, 0)
                } else {
                    Position::new(end.row, buf.line_len(end.row))
                };
                Span::new(first, last)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
