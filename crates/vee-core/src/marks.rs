//! Marks — named positions within one buffer.
//!
//! `m{a-z}` records the cursor; `` `{a-z} `` jumps back exactly and
//! `'{a-z}` jumps line-wise. Marks hold plain `(row, col)` indices, never
//! references into the text, so they survive arbitrary edits: row-level
//! edits shift or drop them eagerly, and every read is clamped against the
//! live buffer as a final guard.

use std::collections::HashMap;

use crate::buffer::Buffer;
use crate::position::Position;

/// The `a`–`z` mark table of a single buffer.
#[derive(Debug, Default)]
pub struct MarkSet {
    marks: HashMap<char, Position>,
}

impl MarkSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `pos` under `name`. Only `a`–`z` are accepted; anything else
    /// is ignored.
    pub fn set(&mut self, name: char, pos: Position) {
        if name.is_ascii_lowercase() {
            self.marks.insert(name, pos);
        }
    }

    /// Look up a mark, clamped to the current buffer bounds. `None` when
    /// the mark was never set or was invalidated by a deletion.
    #[must_use]
    pub fn get(&self, name: char, buf: &Buffer) -> Option<Position> {
        self.marks
            .get(&name.to_ascii_lowercase())
            .map(|&pos| buf.clamp(pos))
    }

    /// Rows `at..` shifted down by `count` (an insertion above them).
    pub fn shift_down(&mut self, at: usize, count: usize) {
        for pos in self.marks.values_mut() {
            if pos.row >= at {
                pos.row += count;
            }
        }
    }

    /// Rows `at..at + count` removed: marks inside are invalidated, marks
    /// below shift up.
    pub fn shift_up(&mut self, at: usize, count: usize) {
        self.marks.retain(|_, pos| !(pos.row >= at && pos.row < at + count));
        for pos in self.marks.values_mut() {
            if pos.row >= at + count {
                pos.row -= count;
            }
        }
    }

    /// Drop every mark (buffer replaced wholesale, e.g. `:e`).
    pub fn clear(&mut self) {
        self.marks.clear();
    }

    /// All set marks in name order, for the `:marks` listing.
    #[must_use]
    pub fn listing(&self) -> Vec<(char, Position)> {
        let mut out: Vec<(char, Position)> =
            self.marks.iter().map(|(&ch, &pos)| (ch, pos)).collect();
        out.sort_unstable_by_key(|&(ch, _)| ch);
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p(row: usize, col: usize) -> Position {
        Position::new(row, col)
    }

    #[test]
    fn set_and_get() {
        let buf = Buffer::from_rows(&["one", "two", "three"]);
        let mut marks = MarkSet::new();
        marks.set('a', p(1, 2));
        assert_eq!(marks.get('a', &buf), Some(p(1, 2)));
        assert_eq!(marks.get('b', &buf), None);
    }

    #[test]
    fn uppercase_name_rejected_on_set_but_reads_lowercase() {
        let buf = Buffer::from_rows(&["one"]);
        let mut marks = MarkSet::new();
        marks.set('A', p(0, 1));
        assert_eq!(marks.get('a', &buf), None);
        marks.set('a', p(0, 1));
        assert_eq!(marks.get('A', &buf), Some(p(0, 1)));
    }

    #[test]
    fn reads_clamp_to_live_buffer() {
        let buf = Buffer::from_rows(&["ab"]);
        let mut marks = MarkSet::new();
        marks.set('a', p(9, 9));
        assert_eq!(marks.get('a', &buf), Some(p(0, 2)));
    }

    #[test]
    fn insertion_shifts_later_marks_down() {
        let buf = Buffer::from_rows(&["a", "b", "c", "d"]);
        let mut marks = MarkSet::new();
        marks.set('a', p(0, 0));
        marks.set('b', p(2, 1));
        marks.shift_down(1, 2);
        assert_eq!(marks.get('a', &buf), Some(p(0, 0)));
        assert_eq!(marks.get('b', &buf), Some(p(3, 1))); // clamped row 4 -> 3
    }

    #[test]
    fn deletion_invalidates_marks_on_removed_rows() {
        let buf = Buffer::from_rows(&["a", "b", "c", "d"]);
        let mut marks = MarkSet::new();
        marks.set('a', p(0, 0));
        marks.set('b', p(1, 0));
        marks.set('c', p(3, 0));
        marks.shift_up(1, 2); // rows 1..3 removed
        assert_eq!(marks.get('a', &buf), Some(p(0, 0)));
        assert_eq!(marks.get('b', &buf), None);
        assert_eq!(marks.get('c', &buf), Some(p(1, 0)));
    }

    #[test]
    fn clear_drops_everything() {
        let mut marks = MarkSet::new();
        marks.set('a', p(0, 0));
        marks.clear();
        assert!(marks.listing().is_empty());
    }

    #[test]
    fn listing_is_name_ordered() {
        let mut marks = MarkSet::new();
        marks.set('q', p(1, 0));
        marks.set('a', p(0, 0));
        marks.set('m', p(2, 0));
        let names: Vec<char> = marks.listing().iter().map(|&(ch, _)| ch).collect();
        assert_eq!(names, vec!['a', 'm', 'q']);
    }
}
