//! Pattern search over a buffer.
//!
//! Patterns are regular expressions compiled with [`build_regex`]; a bad
//! pattern is a recoverable error for the session to report, never a panic.
//! Matches stay within one row.
//!
//! Forward search starts just **after** the given position, runs to the end
//! of the buffer, then (when wrapping is on) wraps to the start and comes
//! back up through the starting position. Backward search mirrors this.
//! "Not found" is simply `None` — the caller leaves the cursor alone.

use regex::Regex;

use crate::buffer::Buffer;
use crate::position::Position;

/// Search direction, remembered between searches for `n`/`N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// The opposite direction (`N` repeats reversed).
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }

    /// The prompt character that starts a search this way.
    #[must_use]
    pub const fn prompt(self) -> char {
        match self {
            Self::Forward => '/',
            Self::Backward => '?',
        }
    }
}

/// The last confirmed search, kept for the whole session.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub pattern: String,
    pub direction: Direction,
}

/// A match: where it starts and how many chars it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchHit {
    pub pos: Position,
    pub len: usize,
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

/// Compile a pattern, optionally case-insensitive.
///
/// # Errors
///
/// The regex engine's parse error, surfaced to the user as-is.
pub fn build_regex(pattern: &str, ignore_case: bool) -> Result<Regex, regex::Error> {
    if ignore_case {
        Regex::new(&format!("(?i){pattern}"))
    } else {
        Regex::new(pattern)
    }
}

/// The whole-word pattern `*`/`#` build from the word under the cursor.
#[must_use]
pub fn whole_word_pattern(word: &str) -> String {
    format!(r"\b{}\b", regex::escape(word))
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

/// All non-empty matches on one line as `(char_col, char_len)`.
fn matches_on(line: &str, re: &Regex) -> Vec<(usize, usize)> {
    re.find_iter(line)
        .filter(|m| m.start() < m.end())
        .map(|m| {
            let col = line[..m.start()].chars().count();
            let len = m.as_str().chars().count();
            (col, len)
        })
        .collect()
}

/// First match strictly after `from`, wrapping to the buffer start (and
/// back up through `from` itself) when `wrap` is on.
#[must_use]
pub fn find_forward(buf: &Buffer, re: &Regex, from: Position, wrap: bool) -> Option<SearchHit> {
    let rows = buf.row_count();

    // Tail of the starting row.
    for (col, len) in matches_on(&buf.line(from.row), re) {
        if col > from.col {
            return Some(hit(from.row, col, len));
        }
    }
    // Rows below.
    for row in from.row + 1..rows {
        if let Some(&(col, len)) = matches_on(&buf.line(row), re).first() {
            return Some(hit(row, col, len));
        }
    }
    if !wrap {
        return None;
    }
    // Wrapped: rows above, then the head of the starting row.
    for row in 0..from.row {
        if let Some(&(col, len)) = matches_on(&buf.line(row), re).first() {
            return Some(hit(row, col, len));
        }
    }
    matches_on(&buf.line(from.row), re)
        .into_iter()
        .find(|&(col, _)| col <= from.col)
        .map(|(col, len)| hit(from.row, col, len))
}

/// Last match strictly before `from`, wrapping to the buffer end when
/// `wrap` is on.
#[must_use]
pub fn find_backward(buf: &Buffer, re: &Regex, from: Position, wrap: bool) -> Option<SearchHit> {
    // Head of the starting row.
    if let Some(&(col, len)) = matches_on(&buf.line(from.row), re)
        .iter()
        .rev()
        .find(|&&(col, _)| col < from.col)
    {
        return Some(hit(from.row, col, len));
    }
    // Rows above, bottom-up.
    for row in (0..from.row).rev() {
        if let Some(&(col, len)) = matches_on(&buf.line(row), re).last() {
            return Some(hit(row, col, len));
        }
    }
    if !wrap {
        return None;
    }
    // Wrapped: rows below from the end, then the tail of the starting row.
    for row in (from.row + 1..buf.row_count()).rev() {
        if let Some(&(col, len)) = matches_on(&buf.line(row), re).last() {
            return Some(hit(row, col, len));
        }
    }
    matches_on(&buf.line(from.row), re)
        .into_iter()
        .rev()
        .find(|&(col, _)| col >= from.col)
        .map(|(col, len)| hit(from.row, col, len))
}

/// Search in either direction.
#[must_use]
pub fn find(
    buf: &Buffer,
    re: &Regex,
    from: Position,
    direction: Direction,
    wrap: bool,
) -> Option<SearchHit> {
    match direction {
        Direction::Forward => find_forward(buf, re, from, wrap),
        Direction::Backward => find_backward(buf, re, from, wrap),
    }
}

const fn hit(row: usize, col: usize, len: usize) -> SearchHit {
    SearchHit { pos: Position::new(row, col), len }
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

    fn re(pattern: &str) -> Regex {
        build_regex(pattern, false).unwrap()
    }

    // -- Compilation --------------------------------------------------------

    #[test]
    fn bad_pattern_is_an_error() {
        assert!(build_regex("[unclosed", false).is_err());
    }

    #[test]
    fn ignore_case_flag() {
        let ci = build_regex("hello", true).unwrap();
        assert!(ci.is_match("HeLLo"));
        let cs = build_regex("hello", false).unwrap();
        assert!(!cs.is_match("HeLLo"));
    }

    #[test]
    fn whole_word_pattern_escapes_and_bounds() {
        let pat = whole_word_pattern("foo");
        let rx = re(&pat);
        assert!(rx.is_match("a foo b"));
        assert!(!rx.is_match("food"));
        // Metacharacters in the word are literal.
        let dotted = whole_word_pattern("a_b");
        assert!(re(&dotted).is_match("x a_b y"));
    }

    // -- Forward ------------------------------------------------------------

    #[test]
    fn forward_finds_next_on_same_row() {
        let buf = Buffer::from_text("one two one two");
        let found = find_forward(&buf, &re("two"), p(0, 0), true).unwrap();
        assert_eq!(found.pos, p(0, 4));
        assert_eq!(found.len, 3);
    }

    #[test]
    fn forward_is_strictly_after_start() {
        let buf = Buffer::from_text("foo bar foo");
        // Cursor sitting on the first "foo": next hit is the second one.
        let found = find_forward(&buf, &re("foo"), p(0, 0), true).unwrap();
        assert_eq!(found.pos, p(0, 8));
    }

    #[test]
    fn forward_crosses_rows() {
        let buf = Buffer::from_rows(&["nothing here", "target below"]);
        let found = find_forward(&buf, &re("target"), p(0, 5), true).unwrap();
        assert_eq!(found.pos, p(1, 0));
    }

    #[test]
    fn forward_wraps_to_earlier_match() {
        let buf = Buffer::from_rows(&["needle early", "nothing", "nothing"]);
        let found = find_forward(&buf, &re("needle"), p(2, 0), true).unwrap();
        assert_eq!(found.pos, p(0, 0));
    }

    #[test]
    fn forward_wrap_reaches_the_start_position_itself() {
        let buf = Buffer::from_text("only");
        let found = find_forward(&buf, &re("only"), p(0, 0), true).unwrap();
        assert_eq!(found.pos, p(0, 0));
    }

    #[test]
    fn forward_without_wrap_stops_at_end() {
        let buf = Buffer::from_rows(&["needle early", "nothing"]);
        assert_eq!(find_forward(&buf, &re("needle"), p(1, 0), false), None);
    }

    #[test]
    fn forward_not_found() {
        let buf = Buffer::from_text("nothing to see");
        assert_eq!(find_forward(&buf, &re("ghost"), p(0, 0), true), None);
    }

    // -- Backward -----------------------------------------------------------

    #[test]
    fn backward_finds_previous_on_same_row() {
        let buf = Buffer::from_text("one two one");
        let found = find_backward(&buf, &re("one"), p(0, 8), true).unwrap();
        assert_eq!(found.pos, p(0, 0));
    }

    #[test]
    fn backward_is_strictly_before_start() {
        let buf = Buffer::from_text("foo bar");
        // Cursor on "foo" itself: no earlier match, wraps to itself.
        let found = find_backward(&buf, &re("foo"), p(0, 0), true).unwrap();
        assert_eq!(found.pos, p(0, 0));
    }

    #[test]
    fn backward_finds_before_cursor_without_wrapping() {
        // Spec property: a pattern only before the cursor is found backward
        // directly, and forward only via wrap.
        let buf = Buffer::from_rows(&["needle here", "cursor row"]);
        let back = find_backward(&buf, &re("needle"), p(1, 3), false).unwrap();
        assert_eq!(back.pos, p(0, 0));
        assert_eq!(find_forward(&buf, &re("needle"), p(1, 3), false), None);
        let wrapped = find_forward(&buf, &re("needle"), p(1, 3), true).unwrap();
        assert_eq!(wrapped.pos, p(0, 0));
    }

    #[test]
    fn backward_wraps_to_buffer_end() {
        let buf = Buffer::from_rows(&["nothing", "late needle"]);
        let found = find_backward(&buf, &re("needle"), p(0, 3), true).unwrap();
        assert_eq!(found.pos, p(1, 5));
    }

    #[test]
    fn backward_without_wrap_stops_at_start() {
        let buf = Buffer::from_rows(&["nothing", "late needle"]);
        assert_eq!(find_backward(&buf, &re("needle"), p(0, 3), false), None);
    }

    #[test]
    fn backward_takes_last_match_on_row() {
        let buf = Buffer::from_text("x x x y");
        let found = find_backward(&buf, &re("x"), p(0, 6), true).unwrap();
        assert_eq!(found.pos, p(0, 4));
    }

    // -- Regex niceties -----------------------------------------------------

    #[test]
    fn regex_classes_work() {
        let buf = Buffer::from_text("abc 123 def");
        let found = find_forward(&buf, &re(r"\d+"), p(0, 0), true).unwrap();
        assert_eq!(found.pos, p(0, 4));
        assert_eq!(found.len, 3);
    }

    #[test]
    fn empty_matches_are_ignored() {
        let buf = Buffer::from_text("aaa");
        // "b*" matches empty everywhere; must not produce a hit.
        assert_eq!(find_forward(&buf, &re("b*"), p(0, 0), true), None);
    }

    #[test]
    fn unicode_columns() {
        let buf = Buffer::from_text("café au lait");
        let found = find_forward(&buf, &re("au"), p(0, 0), true).unwrap();
        assert_eq!(found.pos, p(0, 5));
    }

    // -- Direction ----------------------------------------------------------

    #[test]
    fn direction_reversal_and_prompt() {
        assert_eq!(Direction::Forward.reversed(), Direction::Backward);
        assert_eq!(Direction::Backward.reversed(), Direction::Forward);
        assert_eq!(Direction::Forward.prompt(), '/');
        assert_eq!(Direction::Backward.prompt(), '?');
    }

    #[test]
    fn find_dispatches_by_direction() {
        let buf = Buffer::from_text("a b a");
        let fwd = find(&buf, &re("a"), p(0, 0), Direction::Forward, true).unwrap();
        assert_eq!(fwd.pos, p(0, 4));
        let back = find(&buf, &re("a"), p(0, 4), Direction::Backward, true).unwrap();
        assert_eq!(back.pos, p(0, 0));
    }
}
