//! Undo/redo history.
//!
//! Every buffer mutation is logged as a reversible [`Step`]; steps group
//! into a [`Change`], the atomic unit of undo. One normal-mode operator is
//! one change; an insert or replace session (mode entry to Escape) coalesces
//! into one change no matter how many keys were typed.
//!
//! Steps are recorded only alongside the buffer primitives that performed
//! them, with the exact text involved — that is what makes applying a
//! change's inverse restore the prior content byte-for-byte.
//!
//! The stacks are bounded: past [`HISTORY_LIMIT`] changes the oldest entry
//! is evicted. Undoing pushes onto the redo stack; any new change clears it.
//!
//! ```text
//! history.begin(cursor);
//! // mutate the buffer, logging each primitive:
//! history.note_insert(pos, text);
//! history.note_delete(pos, removed);
//! history.commit(cursor);
//! ```
//!
//! An empty change (begin then commit with no steps) is discarded.

use crate::buffer::Buffer;
use crate::position::{Position, Span};

/// Maximum changes kept on the undo stack.
pub const HISTORY_LIMIT: usize = 1000;

// ---------------------------------------------------------------------------
// Steps and changes
// ---------------------------------------------------------------------------

/// One reversible buffer mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    /// `text` was inserted at `at`. Inverse: delete it.
    Insert { at: Position, text: String },
    /// `text` was removed starting at `at`. Inverse: put it back.
    Delete { at: Position, text: String },
}

impl Step {
    fn revert(&self, buf: &mut Buffer) {
        match self {
            Self::Insert { at, text } => {
                buf.delete_span(Span::new(*at, advance_over(*at, text)));
            }
            Self::Delete { at, text } => buf.insert_text(*at, text),
        }
    }

    fn reapply(&self, buf: &mut Buffer) {
        match self {
            Self::Insert { at, text } => buf.insert_text(*at, text),
            Self::Delete { at, text } => {
                buf.delete_span(Span::new(*at, advance_over(*at, text)));
            }
        }
    }
}

/// A group of steps undone and redone as one unit, with the cursor
/// positions to restore on either side.
#[derive(Debug, Clone)]
struct Change {
    steps: Vec<Step>,
    cursor_before: Position,
    cursor_after: Position,
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Bounded undo/redo stacks for one buffer.
#[derive(Debug, Default)]
pub struct History {
    undo_stack: Vec<Change>,
    redo_stack: Vec<Change>,
    open: Option<Change>,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a change. `cursor` is where the cursor sat before any of its
    /// edits. An already-open change is committed first.
    pub fn begin(&mut self, cursor: Position) {
        if self.open.is_some() {
            self.commit(cursor);
        }
        self.open = Some(Change {
            steps: Vec::new(),
            cursor_before: cursor,
            cursor_after: cursor,
        });
    }

    /// Log an insertion that was just performed. No open change, no record.
    pub fn note_insert(&mut self, at: Position, text: &str) {
        if let Some(change) = &mut self.open {
            change.steps.push(Step::Insert { at, text: text.to_string() });
        }
    }

    /// Log a deletion that was just performed; `removed` is the text taken
    /// out of the buffer, captured exactly.
    pub fn note_delete(&mut self, at: Position, removed: &str) {
        if let Some(change) = &mut self.open {
            change.steps.push(Step::Delete { at, text: removed.to_string() });
        }
    }

    /// Seal the open change with the cursor position after its edits.
    /// Empty changes are dropped; real ones clear the redo stack.
    pub fn commit(&mut self, cursor: Position) {
        if let Some(mut change) = self.open.take() {
            if change.steps.is_empty() {
                return;
            }
            change.cursor_after = cursor;
            self.redo_stack.clear();
            self.push_undo(change);
        }
    }

    /// Undo the most recent change. Returns the cursor position recorded
    /// before it, or `None` when there is nothing to undo.
    pub fn undo(&mut self, buf: &mut Buffer) -> Option<Position> {
        // A still-open change is undoable too.
        if let Some(change) = self.open.take() {
            if !change.steps.is_empty() {
                self.redo_stack.clear();
                self.push_undo(change);
            }
        }
        let change = self.undo_stack.pop()?;
        for step in change.steps.iter().rev() {
            step.revert(buf);
        }
        let cursor = change.cursor_before;
        self.redo_stack.push(change);
        Some(cursor)
    }

    /// Redo the most recently undone change. Returns the cursor position
    /// recorded after it, or `None` when there is nothing to redo.
    pub fn redo(&mut self, buf: &mut Buffer) -> Option<Position> {
        let change = self.redo_stack.pop()?;
        for step in &change.steps {
            step.reapply(buf);
        }
        let cursor = change.cursor_after;
        self.undo_stack.push(change);
        Some(cursor)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
            || self.open.as_ref().is_some_and(|c| !c.steps.is_empty())
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    fn push_undo(&mut self, change: Change) {
        if self.undo_stack.len() >= HISTORY_LIMIT {
            self.undo_stack.remove(0);
        }
        self.undo_stack.push(change);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Where the buffer position lands after inserting `text` at `start`.
fn advance_over(start: Position, text: &str) -> Position {
    let mut row = start.row;
    let mut col = start.col;
    for ch in text.chars() {
        if ch == '\n' {
            row += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    Position::new(row, col)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
