//! Word-boundary classification and the six word motions.
//!
//! A **word** is a run of alphanumerics/underscore *or* a run of other
//! non-blank characters — punctuation forms its own words, so `a.b` holds
//! three of them. A **WORD** is any run of non-blank characters; only
//! whitespace separates WORDs. An empty row is itself a word boundary:
//! `w` and `b` stop on it, `e` does not.
//!
//! All motions are pure position computations: they take the buffer and a
//! starting position and return where the cursor would land, staying put
//! when there is nowhere to go.

use crate::buffer::Buffer;
use crate::position::Position;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Character class for boundary detection within a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// Letters, digits, underscore.
    Word,
    /// Non-blank, non-word characters.
    Punct,
    /// Space, tab, and other in-row whitespace.
    Blank,
}

/// Classify for small-word motions (`w`/`b`/`e`).
#[must_use]
pub fn class_of(ch: char) -> CharClass {
    if ch.is_whitespace() {
        CharClass::Blank
    } else if ch.is_alphanumeric() || ch == '_' {
        CharClass::Word
    } else {
        CharClass::Punct
    }
}

/// Classify for WORD motions (`W`/`B`/`E`): blank or not.
#[must_use]
pub fn big_class_of(ch: char) -> CharClass {
    if ch.is_whitespace() {
        CharClass::Blank
    } else {
        CharClass::Word
    }
}

fn classify(ch: char, big: bool) -> CharClass {
    if big { big_class_of(ch) } else { class_of(ch) }
}

fn row_chars(buf: &Buffer, row: usize) -> Vec<char> {
    buf.line(row).chars().collect()
}

// ---------------------------------------------------------------------------
// Motions
// ---------------------------------------------------------------------------

/// `w` / `W` — forward to the start of the next word. Crossing a row
/// boundary lands on the first token of the next row; an empty row counts
/// as a word and stops the motion.
#[must_use]
pub fn next_word_start(buf: &Buffer, pos: Position, big: bool) -> Position {
    let rows = buf.row_count();
    let mut row = pos.row;
    if row >= rows {
        return pos;
    }
    let mut chars = row_chars(buf, row);
    let mut col = pos.col.min(chars.len());

    // Step off the token under the cursor.
    if col < chars.len() {
        let cls = classify(chars[col], big);
        if cls != CharClass::Blank {
            while col < chars.len() && classify(chars[col], big) == cls {
                col += 1;
            }
        }
    }

    // Skip blanks and row breaks until the next token or an empty row.
    loop {
        if col >= chars.len() {
            if row + 1 >= rows {
                return pos; // nothing ahead — stay put
            }
            row += 1;
            col = 0;
            chars = row_chars(buf, row);
            if chars.is_empty() {
                return Position::new(row, 0);
            }
            continue;
        }
        if classify(chars[col], big) == CharClass::Blank {
            col += 1;
        } else {
            return Position::new(row, col);
        }
    }
}

/// `b` / `B` — backward to the start of the previous word. An empty row
/// counts as a word and stops the motion.
#[must_use]
pub fn prev_word_start(buf: &Buffer, pos: Position, big: bool) -> Position {
    let mut row = pos.row.min(buf.row_count() - 1);
    let mut chars = row_chars(buf, row);
    let mut col = pos.col.min(chars.len());

    // Step left once, crossing row boundaries.
    loop {
        if col > 0 {
            col -= 1;
            break;
        }
        if row == 0 {
            return pos;
        }
        row -= 1;
        chars = row_chars(buf, row);
        if chars.is_empty() {
            return Position::new(row, 0);
        }
        col = chars.len() - 1;
        break;
    }

    // Skip blanks backward, stopping on empty rows.
    loop {
        if col < chars.len() && classify(chars[col], big) != CharClass::Blank {
            break;
        }
        if col > 0 {
            col -= 1;
            continue;
        }
        if row == 0 {
            return Position::ORIGIN;
        }
        row -= 1;
        chars = row_chars(buf, row);
        if chars.is_empty() {
            return Position::new(row, 0);
        }
        col = chars.len() - 1;
    }

    // Walk to the start of this token.
    let cls = classify(chars[col], big);
    while col > 0 && classify(chars[col - 1], big) == cls {
        col -= 1;
    }
    Position::new(row, col)
}

/// `e` / `E` — forward to the end of the current or next word. Skips empty
/// rows rather than stopping on them.
#[must_use]
pub fn next_word_end(buf: &Buffer, pos: Position, big: bool) -> Position {
    let rows = buf.row_count();
    let mut row = pos.row;
    if row >= rows {
        return pos;
    }
    let mut chars = row_chars(buf, row);
    let mut col = pos.col + 1;

    // Find the next token, crossing rows and blanks.
    loop {
        if col >= chars.len() {
            if row + 1 >= rows {
                return pos;
            }
            row += 1;
            col = 0;
            chars = row_chars(buf, row);
            continue;
        }
        if classify(chars[col], big) == CharClass::Blank {
            col += 1;
        } else {
            break;
        }
    }

    // Advance to the token's last character.
    let cls = classify(chars[col], big);
    while col + 1 < chars.len() && classify(chars[col + 1], big) == cls {
        col += 1;
    }
    Position::new(row, col)
}

/// The whole word under (or, failing that, after) the cursor on its row —
/// the pattern source for `*`/`#`. Only alnum-class words qualify; returns
/// `None` when the row holds no word at or past the cursor.
#[must_use]
pub fn word_under_cursor(buf: &Buffer, pos: Position) -> Option<String> {
    let chars = row_chars(buf, pos.row);
    if chars.is_empty() {
        return None;
    }
    let mut col = pos.col.min(chars.len() - 1);
    // Not on a word char: scan right for the next word on this row.
    if class_of(chars[col]) != CharClass::Word {
        col = (col..chars.len()).find(|&c| class_of(chars[c]) == CharClass::Word)?;
    }
    let mut start = col;
    while start > 0 && class_of(chars[start - 1]) == CharClass::Word {
        start -= 1;
    }
    let mut end = col;
    while end + 1 < chars.len() && class_of(chars[end + 1]) == CharClass::Word {
        end += 1;
    }
    Some(chars[start..=end].iter().collect())
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

    // -- Classification -----------------------------------------------------

    #[test]
    fn classes() {
        assert_eq!(class_of('a'), CharClass::Word);
        assert_eq!(class_of('9'), CharClass::Word);
        assert_eq!(class_of('_'), CharClass::Word);
        assert_eq!(class_of('é'), CharClass::Word);
        assert_eq!(class_of('.'), CharClass::Punct);
        assert_eq!(class_of('+'), CharClass::Punct);
        assert_eq!(class_of(' '), CharClass::Blank);
        assert_eq!(class_of('\t'), CharClass::Blank);
    }

    #[test]
    fn big_class_merges_punct() {
        assert_eq!(big_class_of('.'), CharClass::Word);
        assert_eq!(big_class_of('a'), CharClass::Word);
        assert_eq!(big_class_of(' '), CharClass::Blank);
    }

    // -- next_word_start ----------------------------------------------------

    #[test]
    fn w_two_words() {
        let buf = Buffer::from_text("hello world");
        assert_eq!(next_word_start(&buf, p(0, 0), false), p(0, 6));
        assert_eq!(next_word_start(&buf, p(0, 3), false), p(0, 6));
    }

    #[test]
    fn w_punct_is_its_own_word() {
        let buf = Buffer::from_text("hello.world");
        assert_eq!(next_word_start(&buf, p(0, 0), false), p(0, 5));
        assert_eq!(next_word_start(&buf, p(0, 5), false), p(0, 6));
    }

    #[test]
    fn w_operator_runs() {
        let buf = Buffer::from_text("x=y+z");
        assert_eq!(next_word_start(&buf, p(0, 0), false), p(0, 1));
        assert_eq!(next_word_start(&buf, p(0, 1), false), p(0, 2));
        assert_eq!(next_word_start(&buf, p(0, 2), false), p(0, 3));
    }

    #[test]
    fn w_crosses_row_to_first_token() {
        let buf = Buffer::from_text("hello\n  world");
        assert_eq!(next_word_start(&buf, p(0, 0), false), p(1, 2));
    }

    #[test]
    fn w_stops_on_empty_row() {
        let buf = Buffer::from_text("hello\n\nworld");
        assert_eq!(next_word_start(&buf, p(0, 0), false), p(1, 0));
        assert_eq!(next_word_start(&buf, p(1, 0), false), p(2, 0));
    }

    #[test]
    fn w_skips_whitespace_only_row() {
        let buf = Buffer::from_text("hello\n   \nworld");
        assert_eq!(next_word_start(&buf, p(0, 0), false), p(2, 0));
    }

    #[test]
    fn w_at_buffer_end_stays() {
        let buf = Buffer::from_text("hello");
        assert_eq!(next_word_start(&buf, p(0, 4), false), p(0, 4));
        assert_eq!(next_word_start(&buf, p(0, 0), false), p(0, 0));
    }

    #[test]
    fn big_w_swallows_punct() {
        let buf = Buffer::from_text("a.b()c next");
        assert_eq!(next_word_start(&buf, p(0, 0), true), p(0, 7));
    }

    // -- prev_word_start ----------------------------------------------------

    #[test]
    fn b_two_words() {
        let buf = Buffer::from_text("hello world");
        assert_eq!(prev_word_start(&buf, p(0, 6), false), p(0, 0));
        assert_eq!(prev_word_start(&buf, p(0, 8), false), p(0, 6));
    }

    #[test]
    fn b_punct_boundary() {
        let buf = Buffer::from_text("hello.world");
        assert_eq!(prev_word_start(&buf, p(0, 6), false), p(0, 5));
        assert_eq!(prev_word_start(&buf, p(0, 5), false), p(0, 0));
    }

    #[test]
    fn b_crosses_rows() {
        let buf = Buffer::from_text("hello\nworld");
        assert_eq!(prev_word_start(&buf, p(1, 0), false), p(0, 0));
    }

    #[test]
    fn b_stops_on_empty_row() {
        let buf = Buffer::from_text("hello\n\nworld");
        assert_eq!(prev_word_start(&buf, p(2, 0), false), p(1, 0));
        assert_eq!(prev_word_start(&buf, p(1, 0), false), p(0, 0));
    }

    #[test]
    fn b_at_origin_stays() {
        let buf = Buffer::from_text("hello");
        assert_eq!(prev_word_start(&buf, p(0, 0), false), p(0, 0));
    }

    #[test]
    fn big_b_swallows_punct() {
        let buf = Buffer::from_text("prev a.b()c");
        assert_eq!(prev_word_start(&buf, p(0, 11), true), p(0, 5));
    }

    // -- next_word_end ------------------------------------------------------

    #[test]
    fn e_to_end_of_word() {
        let buf = Buffer::from_text("hello world");
        assert_eq!(next_word_end(&buf, p(0, 0), false), p(0, 4));
        assert_eq!(next_word_end(&buf, p(0, 4), false), p(0, 10));
    }

    #[test]
    fn e_punct_boundary() {
        let buf = Buffer::from_text("hello.world");
        assert_eq!(next_word_end(&buf, p(0, 0), false), p(0, 4));
        assert_eq!(next_word_end(&buf, p(0, 4), false), p(0, 5));
        assert_eq!(next_word_end(&buf, p(0, 5), false), p(0, 10));
    }

    #[test]
    fn e_skips_empty_rows() {
        let buf = Buffer::from_text("hello\n\nworld");
        assert_eq!(next_word_end(&buf, p(0, 4), false), p(2, 4));
    }

    #[test]
    fn e_at_buffer_end_stays() {
        let buf = Buffer::from_text("hello");
        assert_eq!(next_word_end(&buf, p(0, 4), false), p(0, 4));
    }

    #[test]
    fn big_e_swallows_punct() {
        let buf = Buffer::from_text("a.b()c next");
        assert_eq!(next_word_end(&buf, p(0, 0), true), p(0, 5));
    }

    // -- Round trip ---------------------------------------------------------

    #[test]
    fn w_then_b_returns() {
        let buf = Buffer::from_text("one two three");
        let mid = next_word_start(&buf, p(0, 0), false);
        assert_eq!(mid, p(0, 4));
        assert_eq!(prev_word_start(&buf, mid, false), p(0, 0));
    }

    // -- word_under_cursor --------------------------------------------------

    #[test]
    fn word_under_cursor_middle() {
        let buf = Buffer::from_text("fn main_loop() {");
        assert_eq!(word_under_cursor(&buf, p(0, 5)), Some("main_loop".into()));
    }

    #[test]
    fn word_under_cursor_scans_right_from_blank() {
        let buf = Buffer::from_text("   target");
        assert_eq!(word_under_cursor(&buf, p(0, 0)), Some("target".into()));
    }

    #[test]
    fn word_under_cursor_scans_right_from_punct() {
        let buf = Buffer::from_text("(word)");
        assert_eq!(word_under_cursor(&buf, p(0, 0)), Some("word".into()));
    }

    #[test]
    fn word_under_cursor_none() {
        let buf = Buffer::from_text("!!! ...");
        assert_eq!(word_under_cursor(&buf, p(0, 0)), None);
        let empty = Buffer::new();
        assert_eq!(word_under_cursor(&empty, p(0, 0)), None);
    }
}
