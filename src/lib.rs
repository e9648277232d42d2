// SPDX-License-Identifier: MIT

//! # vee — a modal text-editing engine
//!
//! This crate wires the vee-core building blocks into one editing session.
//! A terminal front-end owns the screen and the raw input; the engine owns
//! everything else. Each keystroke flows through:
//!
//! ```text
//!   front-end → Editor::handle_key → mode dispatch → buffer/cursor mutation
//!   front-end ← lines() / cursor() / status() / take_message()
//! ```
//!
//! The [`Editor`] is the single session context: it owns the buffer list
//! (each slot pairing a buffer with its cursor, undo history, and marks),
//! the register file, the mode state machine, and the pending-input state
//! for multi-key commands. One key is fully processed before the next is
//! read; Escape at any pending point abandons the half-typed command with
//! no side effects.
//!
//! Normal-mode grammar: `[count] ["register] [operator] [count] motion`,
//! with the two counts multiplying (`2d3w` deletes six words). Motions are
//! inclusive (`e`, `$`, `f`, `t`) or exclusive (`w`, `b`, `h`, `l`) of
//! their endpoint, and doubled operators (`dd`, `yy`, `cc`) act on whole
//! rows.

use std::fmt;
use std::path::PathBuf;

use tracing::{debug, trace};

use vee_core::buffer::Buffer;
use vee_core::command::{self, Address, CommandLine, ExCommand, RangeSpec, SubstFlags};
use vee_core::cursor::{Cursor, FindKind};
use vee_core::history::History;
use vee_core::key::{Key, KeyInput};
use vee_core::marks::MarkSet;
use vee_core::mode::{Mode, VisualKind};
use vee_core::options::{self, Options};
use vee_core::position::{Position, Span};
use vee_core::register::{RegisterFile, RegisterKind};
use vee_core::search::{self, Direction, SearchQuery};
use vee_core::selection::Selection;
use vee_core::word;

pub use vee_core::buffer::FileError;

// ---------------------------------------------------------------------------
// Session types
// ---------------------------------------------------------------------------

/// What the front-end should do after a keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Keep going: render and read the next key.
    Continue,
    /// The session asked to end (`:q`, `:wq`, …).
    Quit,
}

/// A status-line message left behind by the last command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

/// Everything the status line needs, 1-based where users expect it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub mode: &'static str,
    pub file: String,
    pub modified: bool,
    pub row: usize,
    pub col: usize,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = if self.modified { " [+]" } else { "" };
        write!(f, "{}  {}{}  {},{}", self.mode, self.file, flag, self.row, self.col)
    }
}

/// One open buffer with its per-buffer state.
struct BufferSlot {
    buffer: Buffer,
    cursor: Cursor,
    history: History,
    marks: MarkSet,
}

impl BufferSlot {
    fn new(buffer: Buffer) -> Self {
        Self {
            buffer,
            cursor: Cursor::new(),
            history: History::new(),
            marks: MarkSet::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pending multi-key state
// ---------------------------------------------------------------------------

/// State held between the keys of a multi-key command.
///
/// Waiting happens here, not in control flow: the dispatcher returns after
/// every key, and the next key finds the half-typed command in this enum.
/// Escape (or any key that fits nothing) drops it.
#[derive(Debug, Clone, Copy)]
enum Pending {
    /// `d`/`c`/`y` pressed; waiting for a motion, a second count, the same
    /// key (line operation), or a prefix that needs more keys.
    Operator { op: char, count: usize },
    /// Operator plus `f`/`F`/`t`/`T`; waiting for the target character.
    OperatorFind { op: char, count: usize, kind: FindKind, find_count: usize },
    /// Operator plus `g`; waiting for the second `g`.
    OperatorGoto { op: char, target: Option<usize> },
    /// Operator plus `` ` `` or `'`; waiting for the mark letter.
    OperatorJump { op: char, exact: bool },
    /// Standalone `f`/`F`/`t`/`T`; waiting for the target character.
    Find { kind: FindKind, count: usize },
    /// `g`; waiting for the second `g`.
    Goto { target: Option<usize> },
    /// `r`; waiting for the replacement character.
    ReplaceChar { count: usize },
    /// `m`; waiting for the mark letter.
    SetMark,
    /// `` ` `` (exact) or `'` (line-wise); waiting for the mark letter.
    Jump { exact: bool },
    /// `"`; waiting for the register name.
    RegisterName,
}

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

/// The editing session: buffers, registers, mode, and the key dispatcher.
pub struct Editor {
    slots: Vec<BufferSlot>,
    current: usize,
    mode: Mode,

    /// Visual-mode anchor; `None` outside visual mode.
    selection: Option<Selection>,

    /// Half-typed multi-key command.
    pending: Option<Pending>,

    /// Count accumulator; `None` until a digit is pressed.
    count: Option<usize>,

    registers: RegisterFile,

    /// Register named with `"x`, consumed by the next delete/yank/paste.
    register_override: Option<char>,

    /// The `:`/`/`/`?` input line; `Some` while in command mode.
    cmdline: Option<CommandLine>,

    message: Option<StatusMessage>,

    /// Last confirmed search, for `n`/`N`.
    query: Option<SearchQuery>,

    /// Last `f`/`F`/`t`/`T`, for `;`/`,`.
    last_find: Option<(char, FindKind)>,

    /// Last substitution, for a bare `:s`.
    last_subst: Option<(String, String, SubstFlags)>,

    options: Options,

    /// Replace-mode trail: (position, char typed, char overwritten) so
    /// backspace restores what `R` destroyed.
    replace_trail: Vec<(Position, char, Option<char>)>,
}

impl Editor {
    // -- Construction -------------------------------------------------------

    /// A session over one empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_buffer(Buffer::new())
    }

    /// A session over in-memory text (tests, embedding).
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self::with_buffer(Buffer::from_text(text))
    }

    /// Open a file into a fresh session. A missing file starts an empty
    /// buffer bound to the path.
    ///
    /// # Errors
    ///
    /// Read failures other than "not found".
    pub fn open(path: &std::path::Path) -> Result<Self, FileError> {
        Ok(Self::with_buffer(Buffer::open(path)?))
    }

    fn with_buffer(buffer: Buffer) -> Self {
        Self {
            slots: vec![BufferSlot::new(buffer)],
            current: 0,
            mode: Mode::Normal,
            selection: None,
            pending: None,
            count: None,
            registers: RegisterFile::new(),
            register_override: None,
            cmdline: None,
            message: None,
            query: None,
            last_find: None,
            last_subst: None,
            options: Options::default(),
            replace_trail: Vec::new(),
        }
    }

    // -- Output boundary ----------------------------------------------------

    /// The current buffer's rows — the render snapshot.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.buf().lines()
    }

    /// The cursor position, 0-based.
    #[must_use]
    pub fn cursor(&self) -> Position {
        self.slots[self.current].cursor.pos()
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn buffer(&self) -> &Buffer {
        self.buf()
    }

    #[must_use]
    pub const fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    #[must_use]
    pub const fn options(&self) -> &Options {
        &self.options
    }

    /// The pending `:`/`/`/`?` input, for the front-end to echo.
    #[must_use]
    pub fn command_line(&self) -> Option<(char, &str)> {
        self.cmdline.as_ref().map(|cl| (cl.prompt(), cl.input()))
    }

    #[must_use]
    pub const fn message(&self) -> Option<&StatusMessage> {
        self.message.as_ref()
    }

    /// Take the pending message, clearing it.
    pub fn take_message(&mut self) -> Option<StatusMessage> {
        self.message.take()
    }

    /// Status-line data: mode, file name, modified flag, 1-based row/col.
    #[must_use]
    pub fn status(&self) -> Status {
        let pos = self.cursor();
        Status {
            mode: self.mode.name(),
            file: self.buf().display_name(),
            modified: self.buf().is_modified(),
            row: pos.row + 1,
            col: pos.col + 1,
        }
    }

    // -- Key dispatch -------------------------------------------------------

    /// Feed one keystroke. The key is fully processed before returning.
    pub fn handle_key(&mut self, key: KeyInput) -> Signal {
        match self.mode {
            Mode::Normal => self.on_normal_key(key),
            Mode::Insert => self.on_insert_key(key),
            Mode::Replace => self.on_replace_key(key),
            Mode::Visual(_) => self.on_visual_key(key),
            Mode::Command => self.on_command_key(key),
        }
    }

    // -- Small internals ----------------------------------------------------

    fn buf(&self) -> &Buffer {
        &self.slots[self.current].buffer
    }

    fn slot_mut(&mut self) -> &mut BufferSlot {
        &mut self.slots[self.current]
    }

    fn pos(&self) -> Position {
        self.slots[self.current].cursor.pos()
    }

    fn place_cursor(&mut self, pos: Position, past_end: bool) {
        let slot = &mut self.slots[self.current];
        slot.cursor.set(pos, &slot.buffer, past_end);
    }

    fn clamp_cursor(&mut self, past_end: bool) {
        let slot = &mut self.slots[self.current];
        slot.cursor.clamp(&slot.buffer, past_end);
    }

    fn set_mode(&mut self, mode: Mode) {
        trace!(from = %self.mode, to = %mode, "mode transition");
        self.mode = mode;
    }

    fn inform(&mut self, text: impl Into<String>) {
        self.message = Some(StatusMessage { text: text.into(), is_error: false });
    }

    fn fail(&mut self, text: impl Into<String>) {
        self.message = Some(StatusMessage { text: text.into(), is_error: true });
    }

    fn take_raw_count(&mut self) -> Option<usize> {
        self.count.take()
    }

    fn take_count(&mut self) -> usize {
        self.count.take().unwrap_or(1)
    }

    fn push_digit(&mut self, digit: usize) {
        let current = self.count.unwrap_or(0);
        self.count = Some(current.saturating_mul(10).saturating_add(digit));
    }

    // -- Recorded buffer edits ---------------------------------------------

    /// Insert through the undo log, shifting marks past new rows.
    fn insert_recorded(&mut self, at: Position, text: &str) {
        let new_rows = text.matches('\n').count();
        let slot = &mut self.slots[self.current];
        slot.buffer.insert_text(at, text);
        slot.history.note_insert(at, text);
        if new_rows > 0 {
            // An insert at column 0 pushes the row itself down; mid-row
            // inserts only move the rows below.
            let from = if at.col == 0 { at.row } else { at.row + 1 };
            slot.marks.shift_down(from, new_rows);
        }
    }

    /// Delete through the undo log, invalidating marks on removed rows.
    fn delete_recorded(&mut self, span: Span) -> String {
        let slot = &mut self.slots[self.current];
        let removed = slot.buffer.delete_span(span);
        if removed.is_empty() {
            return removed;
        }
        slot.history.note_delete(span.start, &removed);
        let rows_gone = span.end.row - span.start.row;
        if rows_gone > 0 {
            // Line-wise spans remove rows start..end whole; char-wise spans
            // keep the head of the start row and merge the end row into it.
            let from = if span.start.col == 0 && span.end.col == 0 {
                span.start.row
            } else {
                span.start.row + 1
            };
            slot.marks.shift_up(from, rows_gone);
        }
        removed
    }

    fn begin_change(&mut self) {
        let at = self.pos();
        self.slot_mut().history.begin(at);
    }

    fn commit_change(&mut self) {
        let at = self.pos();
        self.slot_mut().history.commit(at);
    }

    // -- Normal mode --------------------------------------------------------

    fn on_normal_key(&mut self, key: KeyInput) -> Signal {
        self.message = None;

        if key.is_ctrl() {
            self.pending = None;
            if key.key == Key::Char('r') {
                let count = self.take_count();
                self.redo(count);
            } else {
                self.count = None;
            }
            return Signal::Continue;
        }

        if let Some(pending) = self.pending.take() {
            return self.on_pending(pending, key);
        }

        // Count digits: 1-9 start one, 0 extends one (else it is a motion).
        match key.key {
            Key::Char(d @ '1'..='9') => {
                self.push_digit(d as usize - '0' as usize);
                return Signal::Continue;
            }
            Key::Char('0') if self.count.is_some() => {
                self.push_digit(0);
                return Signal::Continue;
            }
            _ => {}
        }

        let raw = self.take_raw_count();
        self.on_normal_cmd(key, raw)
    }

    #[allow(clippy::too_many_lines)]
    fn on_normal_cmd(&mut self, key: KeyInput, raw: Option<usize>) -> Signal {
        let count = raw.unwrap_or(1);

        if self.apply_motion(key.key, raw, false) {
            return Signal::Continue;
        }

        match key.key {
            Key::Escape => {
                self.count = None;
                self.register_override = None;
            }

            // -- Command line --
            Key::Char(':') => {
                self.cmdline = Some(CommandLine::new(':'));
                self.set_mode(Mode::Command);
            }
            Key::Char('/') => {
                self.cmdline = Some(CommandLine::new('/'));
                self.set_mode(Mode::Command);
            }
            Key::Char('?') => {
                self.cmdline = Some(CommandLine::new('?'));
                self.set_mode(Mode::Command);
            }

            // -- Visual mode --
            Key::Char('v') => {
                self.selection = Some(Selection::new(self.pos(), VisualKind::Char));
                self.set_mode(Mode::Visual(VisualKind::Char));
            }
            Key::Char('V') => {
                self.selection = Some(Selection::new(self.pos(), VisualKind::Line));
                self.set_mode(Mode::Visual(VisualKind::Line));
            }

            // -- Insert transitions (each repositions first) --
            Key::Char('i') => {
                self.begin_change();
                self.set_mode(Mode::Insert);
            }
            Key::Char('I') => {
                self.begin_change();
                let slot = &mut self.slots[self.current];
                slot.cursor.to_first_non_blank(&slot.buffer);
                self.set_mode(Mode::Insert);
            }
            Key::Char('a') => {
                self.begin_change();
                let slot = &mut self.slots[self.current];
                slot.cursor.right(1, &slot.buffer, true);
                self.set_mode(Mode::Insert);
            }
            Key::Char('A') => {
                self.begin_change();
                let slot = &mut self.slots[self.current];
                slot.cursor.to_row_end(&slot.buffer, true);
                self.set_mode(Mode::Insert);
            }
            Key::Char('o') => self.open_row_below(),
            Key::Char('O') => self.open_row_above(),
            Key::Char('R') => {
                self.begin_change();
                self.replace_trail.clear();
                self.set_mode(Mode::Replace);
            }

            // -- Operators --
            Key::Char(op @ ('d' | 'c' | 'y')) => {
                self.pending = Some(Pending::Operator { op, count });
            }

            // -- Single-key edits --
            Key::Char('x') | Key::Delete => self.delete_chars_forward(count),
            Key::Char('X') => self.delete_chars_backward(count),
            Key::Char('D') => self.delete_to_row_end(count),
            Key::Char('C') => self.change_to_row_end(count),
            Key::Char('S') => self.change_rows_at_cursor(count),
            Key::Char('Y') => self.yank_rows_at_cursor(count),
            Key::Char('J') => self.join_rows(count),
            Key::Char('~') => self.toggle_case(count),
            Key::Char('r') => self.pending = Some(Pending::ReplaceChar { count }),
            Key::Char('p') => self.paste(count, true),
            Key::Char('P') => self.paste(count, false),

            // -- Undo --
            Key::Char('u') => self.undo(count),

            // -- Pending starters --
            Key::Char('f') => {
                self.pending = Some(Pending::Find { kind: FindKind::Forward, count });
            }
            Key::Char('F') => {
                self.pending = Some(Pending::Find { kind: FindKind::Backward, count });
            }
            Key::Char('t') => {
                self.pending = Some(Pending::Find { kind: FindKind::TillForward, count });
            }
            Key::Char('T') => {
                self.pending = Some(Pending::Find { kind: FindKind::TillBackward, count });
            }
            Key::Char('g') => self.pending = Some(Pending::Goto { target: raw }),
            Key::Char('m') => self.pending = Some(Pending::SetMark),
            Key::Char('`') => self.pending = Some(Pending::Jump { exact: true }),
            Key::Char('\'') => self.pending = Some(Pending::Jump { exact: false }),
            Key::Char('"') => self.pending = Some(Pending::RegisterName),

            // -- Search repeats --
            Key::Char('n') => self.repeat_search(false, count),
            Key::Char('N') => self.repeat_search(true, count),
            Key::Char('*') => self.search_word_under_cursor(Direction::Forward),
            Key::Char('#') => self.search_word_under_cursor(Direction::Backward),

            // Unmapped keys are silent no-ops.
            _ => {}
        }

        Signal::Continue
    }

    /// Cursor motions shared by normal and visual mode. True when the key
    /// was consumed as a motion.
    fn apply_motion(&mut self, key: Key, raw: Option<usize>, past_end: bool) -> bool {
        let count = raw.unwrap_or(1);
        let last_find = self.last_find;
        let slot = &mut self.slots[self.current];
        match key {
            Key::Char('h') | Key::Left | Key::Backspace => slot.cursor.left(count),
            Key::Char('l') | Key::Right => slot.cursor.right(count, &slot.buffer, past_end),
            Key::Char('j') | Key::Down => slot.cursor.down(count, &slot.buffer, past_end),
            Key::Char('k') | Key::Up => slot.cursor.up(count, &slot.buffer, past_end),
            Key::Enter => {
                slot.cursor.down(count, &slot.buffer, past_end);
                slot.cursor.to_first_non_blank(&slot.buffer);
            }
            Key::Char('0') | Key::Home => slot.cursor.to_row_start(),
            Key::Char('$') | Key::End => slot.cursor.to_row_end(&slot.buffer, past_end),
            Key::Char('^') => slot.cursor.to_first_non_blank(&slot.buffer),
            Key::Char('w') => slot.cursor.next_word(count, &slot.buffer, false),
            Key::Char('W') => slot.cursor.next_word(count, &slot.buffer, true),
            Key::Char('b') => slot.cursor.prev_word(count, &slot.buffer, false),
            Key::Char('B') => slot.cursor.prev_word(count, &slot.buffer, true),
            Key::Char('e') => slot.cursor.word_end(count, &slot.buffer, false),
            Key::Char('E') => slot.cursor.word_end(count, &slot.buffer, true),
            Key::Char('G') => match raw {
                Some(n) => slot.cursor.goto_row(n.saturating_sub(1), &slot.buffer),
                None => slot.cursor.to_last_row(&slot.buffer),
            },
            Key::Char('}') => slot.cursor.paragraph_forward(count, &slot.buffer),
            Key::Char('{') => slot.cursor.paragraph_backward(count, &slot.buffer),
            Key::Char(';') => {
                if let Some((ch, kind)) = last_find {
                    slot.cursor.find_char(&slot.buffer, ch, count, kind);
                }
            }
            Key::Char(',') => {
                if let Some((ch, kind)) = last_find {
                    slot.cursor.find_char(&slot.buffer, ch, count, kind.reversed());
                }
            }
            _ => return false,
        }
        true
    }

    // -- Pending dispatch ---------------------------------------------------

    #[allow(clippy::too_many_lines)]
    fn on_pending(&mut self, pending: Pending, key: KeyInput) -> Signal {
        match pending {
            Pending::Operator { op, count: op_count } => {
                if key.key == Key::Escape {
                    self.count = None;
                    return Signal::Continue;
                }
                // A second count may come between operator and motion.
                match key.key {
                    Key::Char(d @ '1'..='9') => {
                        self.push_digit(d as usize - '0' as usize);
                        self.pending = Some(Pending::Operator { op, count: op_count });
                        return Signal::Continue;
                    }
                    Key::Char('0') if self.count.is_some() => {
                        self.push_digit(0);
                        self.pending = Some(Pending::Operator { op, count: op_count });
                        return Signal::Continue;
                    }
                    _ => {}
                }

                // Doubled operator: line operation over count rows.
                if key.key == Key::Char(op) {
                    let effective = op_count * self.take_raw_count().unwrap_or(1);
                    let first = self.pos().row;
                    let last = (first + effective - 1).min(self.buf().row_count() - 1);
                    self.run_line_operator(op, first, last);
                    return Signal::Continue;
                }

                match key.key {
                    Key::Char('f') | Key::Char('F') | Key::Char('t') | Key::Char('T') => {
                        let kind = match key.key {
                            Key::Char('f') => FindKind::Forward,
                            Key::Char('F') => FindKind::Backward,
                            Key::Char('t') => FindKind::TillForward,
                            _ => FindKind::TillBackward,
                        };
                        let find_count = self.take_raw_count().unwrap_or(1);
                        self.pending = Some(Pending::OperatorFind {
                            op,
                            count: op_count,
                            kind,
                            find_count,
                        });
                    }
                    Key::Char('g') => {
                        let target = self.take_raw_count();
                        self.pending = Some(Pending::OperatorGoto { op, target });
                    }
                    Key::Char('`') => {
                        self.pending = Some(Pending::OperatorJump { op, exact: true });
                    }
                    Key::Char('\'') => {
                        self.pending = Some(Pending::OperatorJump { op, exact: false });
                    }
                    Key::Char(rep @ (';' | ',')) => {
                        if let Some((ch, stored)) = self.last_find {
                            let kind = if rep == ',' { stored.reversed() } else { stored };
                            let effective = op_count * self.take_raw_count().unwrap_or(1);
                            if let Some(span) = self.char_find_span(ch, kind, effective) {
                                self.apply_operator(op, span, false);
                            }
                        }
                    }
                    _ => {
                        let raw_motion = self.take_raw_count();
                        let effective = op_count * raw_motion.unwrap_or(1);
                        if let Some((span, linewise)) =
                            self.operator_motion_span(key.key, op, effective, raw_motion)
                        {
                            self.apply_operator(op, span, linewise);
                        }
                        // Anything unrecognized cancels the operator silently.
                    }
                }
                Signal::Continue
            }

            Pending::OperatorFind { op, count, kind, find_count } => {
                if let Key::Char(ch) = key.key {
                    self.last_find = Some((ch, kind));
                    let effective = count * find_count;
                    if let Some(span) = self.char_find_span(ch, kind, effective) {
                        self.apply_operator(op, span, false);
                    }
                }
                Signal::Continue
            }

            Pending::OperatorGoto { op, target } => {
                if key.key == Key::Char('g') {
                    let row = target.map_or(0, |n| n.saturating_sub(1));
                    let first = self.pos().row.min(row);
                    let last = self.pos().row.max(row).min(self.buf().row_count() - 1);
                    self.run_line_operator(op, first, last);
                }
                Signal::Continue
            }

            Pending::OperatorJump { op, exact } => {
                if let Key::Char(name @ 'a'..='z') = key.key {
                    let slot = &self.slots[self.current];
                    if let Some(mark) = slot.marks.get(name, &slot.buffer) {
                        let here = self.pos();
                        if exact {
                            let span = Span::ordered(here, mark);
                            self.apply_operator(op, span, false);
                        } else {
                            let first = here.row.min(mark.row);
                            let last = here.row.max(mark.row);
                            self.run_line_operator(op, first, last);
                        }
                    } else {
                        self.fail(format!("E20: Mark not set: {name}"));
                    }
                }
                Signal::Continue
            }

            Pending::Find { kind, count } => {
                if let Key::Char(ch) = key.key {
                    self.last_find = Some((ch, kind));
                    let slot = &mut self.slots[self.current];
                    slot.cursor.find_char(&slot.buffer, ch, count, kind);
                }
                Signal::Continue
            }

            Pending::Goto { target } => {
                if key.key == Key::Char('g') {
                    let row = target.map_or(0, |n| n.saturating_sub(1));
                    let slot = &mut self.slots[self.current];
                    slot.cursor.goto_row(row, &slot.buffer);
                }
                Signal::Continue
            }

            Pending::ReplaceChar { count } => {
                if let Key::Char(ch) = key.key {
                    self.replace_chars(ch, count);
                }
                Signal::Continue
            }

            Pending::SetMark => {
                if let Key::Char(name @ 'a'..='z') = key.key {
                    let at = self.pos();
                    self.slot_mut().marks.set(name, at);
                }
                Signal::Continue
            }

            Pending::Jump { exact } => {
                if let Key::Char(name @ 'a'..='z') = key.key {
                    let slot = &mut self.slots[self.current];
                    if let Some(mark) = slot.marks.get(name, &slot.buffer) {
                        if exact {
                            slot.cursor.set(mark, &slot.buffer, false);
                        } else {
                            slot.cursor.goto_row(mark.row, &slot.buffer);
                        }
                    } else {
                        self.fail(format!("E20: Mark not set: {name}"));
                    }
                }
                Signal::Continue
            }

            Pending::RegisterName => {
                if let Key::Char(name) = key.key {
                    if name.is_ascii_alphabetic() {
                        self.register_override = Some(name);
                    }
                }
                Signal::Continue
            }
        }
    }

    // -- Operator ranges ----------------------------------------------------

    /// Resolve an operator + motion key into the span to act on.
    ///
    /// Exclusive motions end at the target; inclusive motions extend one
    /// character past it; row motions return line-wise spans. Exclusive
    /// word motions get the vi adjustment: a target at the start of a later
    /// row pulls back to the end of the previous row, so `dw` on the last
    /// word of a row never swallows the line break.
    #[allow(clippy::too_many_lines)]
    fn operator_motion_span(
        &self,
        key: Key,
        op: char,
        effective: usize,
        raw_motion: Option<usize>,
    ) -> Option<(Span, bool)> {
        let start = self.pos();
        let buf = &self.slots[self.current].buffer;
        let rows = buf.row_count();
        let mut probe = self.slots[self.current].cursor.clone();

        // Row-wise motions first.
        match key {
            Key::Char('j') | Key::Down | Key::Enter => {
                if start.row + 1 >= rows {
                    return None;
                }
                let last = (start.row + effective).min(rows - 1);
                return self.rows_span(start.row, last).map(|s| (s, true));
            }
            Key::Char('k') | Key::Up => {
                if start.row == 0 {
                    return None;
                }
                let first = start.row.saturating_sub(effective);
                return self.rows_span(first, start.row).map(|s| (s, true));
            }
            Key::Char('G') => {
                let target = raw_motion.map_or(rows - 1, |n| n.saturating_sub(1).min(rows - 1));
                let first = start.row.min(target);
                let last = start.row.max(target);
                return self.rows_span(first, last).map(|s| (s, true));
            }
            Key::Char('{') => {
                probe.paragraph_backward(effective, buf);
                let first = probe.pos().row.min(start.row);
                let last = probe.pos().row.max(start.row);
                return self.rows_span(first, last).map(|s| (s, true));
            }
            Key::Char('}') => {
                probe.paragraph_forward(effective, buf);
                let first = probe.pos().row.min(start.row);
                let last = probe.pos().row.max(start.row);
                return self.rows_span(first, last).map(|s| (s, true));
            }
            _ => {}
        }

        // Character-wise motions.
        let inclusive = match key {
            Key::Char('h') | Key::Left => {
                probe.left(effective);
                false
            }
            Key::Char('l') | Key::Right => {
                probe.right(effective, buf, true);
                false
            }
            Key::Char('0') | Key::Home => {
                probe.to_row_start();
                false
            }
            Key::Char('^') => {
                probe.to_first_non_blank(buf);
                false
            }
            Key::Char('$') | Key::End => {
                probe.to_row_end(buf, false);
                true
            }
            Key::Char('b') => {
                probe.prev_word(effective, buf, false);
                false
            }
            Key::Char('B') => {
                probe.prev_word(effective, buf, true);
                false
            }
            Key::Char('e') => {
                probe.word_end(effective, buf, false);
                true
            }
            Key::Char('E') => {
                probe.word_end(effective, buf, true);
                true
            }
            Key::Char(w @ ('w' | 'W')) => {
                let big = w == 'W';
                if op == 'c' {
                    // cw changes to the word end, like ce.
                    probe.word_end(effective, buf, big);
                    true
                } else {
                    probe.next_word(effective, buf, big);
                    let mut end = probe.pos();
                    if end == start {
                        // No next word: operate to the row end instead.
                        end = Position::new(start.row, buf.line_len(start.row));
                    } else if end.row > start.row && end.col == 0 {
                        // The vi exclusive-motion adjustment.
                        end = Position::new(end.row - 1, buf.line_len(end.row - 1));
                    }
                    if end <= start {
                        return None;
                    }
                    return Some((Span::new(start, end), false));
                }
            }
            _ => return None,
        };

        let end = probe.pos();
        if end == start {
            return None;
        }
        let (from, to) = if start <= end { (start, end) } else { (end, start) };
        if inclusive {
            let to = self.past_char(to);
            Some((Span::new(from, to), false))
        } else {
            Some((Span::new(from, to), false))
        }
    }

    /// One past `pos`, wrapping to the next row start when `pos` sits on a
    /// row's last character.
    fn past_char(&self, pos: Position) -> Position {
        let buf = self.buf();
        let len = buf.line_len(pos.row);
        if pos.col < len {
            pos.with_col(pos.col + 1)
        } else if pos.row + 1 < buf.row_count() {
            Position::new(pos.row + 1, 0)
        } else {
            pos.with_col(len)
        }
    }

    /// The span of a char-search motion under an operator. Forward finds
    /// include the target character; backward finds stop at the cursor.
    fn char_find_span(&self, ch: char, kind: FindKind, count: usize) -> Option<Span> {
        let start = self.pos();
        let buf = &self.slots[self.current].buffer;
        let mut probe = self.slots[self.current].cursor.clone();
        if !probe.find_char(buf, ch, count, kind) {
            return None;
        }
        let target = probe.pos();
        match kind {
            FindKind::Forward | FindKind::TillForward => {
                Some(Span::new(start, self.past_char(target)))
            }
            FindKind::Backward | FindKind::TillBackward => Some(Span::ordered(target, start)),
        }
    }

    /// The line-wise span covering rows `first..=last`, eating the break
    /// before the block when it reaches the buffer end. `None` only for a
    /// lone empty row.
    fn rows_span(&self, first: usize, last: usize) -> Option<Span> {
        let buf = self.buf();
        let rows = buf.row_count();
        let last = last.min(rows - 1);
        let span = if last + 1 < rows {
            Span::new(Position::new(first, 0), Position::new(last + 1, 0))
        } else if first > 0 {
            Span::new(
                Position::new(first - 1, buf.line_len(first - 1)),
                Position::new(last, buf.line_len(last)),
            )
        } else {
            Span::new(Position::ORIGIN, Position::new(last, buf.line_len(last)))
        };
        if span.is_empty() { None } else { Some(span) }
    }

    // -- Operator application -----------------------------------------------

    /// Run `d`/`c`/`y` over a span. Line-wise operations tag the register
    /// line-wise and normalize its text to end with a newline.
    fn apply_operator(&mut self, op: char, span: Span, linewise: bool) {
        if span.is_empty() {
            return;
        }
        let text = self.buf().text_in(span);
        let kind = if linewise { RegisterKind::Line } else { RegisterKind::Char };
        let reg_text = if linewise && !text.ends_with('\n') {
            format!("{text}\n")
        } else {
            text.clone()
        };
        let name = self.register_override.take();
        let row_count = span.row_span();

        match op {
            'd' => {
                self.registers.store(name, reg_text, kind);
                self.begin_change();
                self.delete_recorded(span);
                self.place_cursor(span.start, false);
                if linewise {
                    let slot = &mut self.slots[self.current];
                    slot.cursor.to_first_non_blank(&slot.buffer);
                }
                self.commit_change();
            }
            'c' => {
                self.registers.store(name, reg_text, kind);
                self.begin_change();
                self.delete_recorded(span);
                self.place_cursor(span.start, true);
                // The change stays open; Escape out of insert commits it,
                // so cw + typed text undoes as one unit.
                self.set_mode(Mode::Insert);
            }
            'y' => {
                self.registers.store(name, reg_text, kind);
                self.place_cursor(span.start, false);
                if linewise && row_count > 1 {
                    self.inform(format!("{row_count} lines yanked"));
                }
            }
            _ => {}
        }
    }

    /// `dd` / `yy` / `cc` over rows `first..=last`.
    fn run_line_operator(&mut self, op: char, first: usize, last: usize) {
        match op {
            'y' => {
                let text = self.rows_text(first, last);
                let name = self.register_override.take();
                let rows = last - first + 1;
                self.registers.store(name, text, RegisterKind::Line);
                self.place_cursor(Position::new(first, 0), false);
                if rows > 1 {
                    self.inform(format!("{rows} lines yanked"));
                }
            }
            'd' => {
                if let Some(span) = self.rows_span(first, last) {
                    let text = self.rows_text(first, last);
                    let name = self.register_override.take();
                    self.registers.store(name, text, RegisterKind::Line);
                    self.begin_change();
                    self.delete_recorded(span);
                    self.place_cursor(Position::new(first, 0), false);
                    let slot = &mut self.slots[self.current];
                    slot.cursor.to_first_non_blank(&slot.buffer);
                    self.commit_change();
                }
            }
            'c' => self.change_rows(first, last),
            _ => {}
        }
    }

    /// Rows `first..=last` as line-wise register text (trailing newline).
    fn rows_text(&self, first: usize, last: usize) -> String {
        let buf = self.buf();
        let mut out = String::new();
        for row in first..=last.min(buf.row_count() - 1) {
            out.push_str(&buf.line(row));
            out.push('\n');
        }
        out
    }

    /// `cc`/`S`: clear rows but keep one empty row to type into.
    fn change_rows(&mut self, first: usize, last: usize) {
        let text = self.rows_text(first, last);
        let name = self.register_override.take();
        self.registers.store(name, text, RegisterKind::Line);

        self.begin_change();
        if let Some(span) = self.rows_span(first, last) {
            self.delete_recorded(span);
        }
        let rows = self.buf().row_count();
        if !(rows == 1 && self.buf().is_blank()) {
            if first < rows {
                self.insert_recorded(Position::new(first, 0), "\n");
            } else {
                let len = self.buf().line_len(rows - 1);
                self.insert_recorded(Position::new(rows - 1, len), "\n");
            }
        }
        let target = Position::new(first.min(self.buf().row_count() - 1), 0);
        self.place_cursor(target, true);
        self.set_mode(Mode::Insert);
    }

    // -- Single-key edits ---------------------------------------------------

    /// `x` — delete `count` characters under and after the cursor.
    fn delete_chars_forward(&mut self, count: usize) {
        let pos = self.pos();
        let len = self.buf().line_len(pos.row);
        if pos.col >= len {
            return;
        }
        let end = pos.with_col((pos.col + count).min(len));
        let span = Span::new(pos, end);
        let text = self.buf().text_in(span);
        let name = self.register_override.take();
        self.registers.store(name, text, RegisterKind::Char);
        self.begin_change();
        self.delete_recorded(span);
        self.clamp_cursor(false);
        self.commit_change();
    }

    /// `X` — delete `count` characters before the cursor.
    fn delete_chars_backward(&mut self, count: usize) {
        let pos = self.pos();
        if pos.col == 0 {
            return;
        }
        let start = pos.with_col(pos.col.saturating_sub(count));
        let span = Span::new(start, pos);
        let text = self.buf().text_in(span);
        let name = self.register_override.take();
        self.registers.store(name, text, RegisterKind::Char);
        self.begin_change();
        self.delete_recorded(span);
        self.place_cursor(start, false);
        self.commit_change();
    }

    /// `D` — delete to the end of the row (through row `+count-1`).
    fn delete_to_row_end(&mut self, count: usize) {
        let pos = self.pos();
        let buf = self.buf();
        let target = (pos.row + count - 1).min(buf.row_count() - 1);
        let end = Position::new(target, buf.line_len(target));
        if pos >= end {
            return;
        }
        let span = Span::new(pos, end);
        let text = self.buf().text_in(span);
        let name = self.register_override.take();
        self.registers.store(name, text, RegisterKind::Char);
        self.begin_change();
        self.delete_recorded(span);
        self.clamp_cursor(false);
        self.commit_change();
    }

    /// `C` — change to the end of the row.
    fn change_to_row_end(&mut self, count: usize) {
        let pos = self.pos();
        let buf = self.buf();
        let target = (pos.row + count - 1).min(buf.row_count() - 1);
        let end = Position::new(target, buf.line_len(target));
        self.begin_change();
        if pos < end {
            let span = Span::new(pos, end);
            let text = self.buf().text_in(span);
            let name = self.register_override.take();
            self.registers.store(name, text, RegisterKind::Char);
            self.delete_recorded(span);
            self.place_cursor(pos, true);
        }
        self.set_mode(Mode::Insert);
    }

    /// `S` — change whole rows.
    fn change_rows_at_cursor(&mut self, count: usize) {
        let first = self.pos().row;
        let last = (first + count - 1).min(self.buf().row_count() - 1);
        self.change_rows(first, last);
    }

    /// `Y` — yank whole rows without touching the buffer.
    fn yank_rows_at_cursor(&mut self, count: usize) {
        let first = self.pos().row;
        let last = (first + count - 1).min(self.buf().row_count() - 1);
        self.run_line_operator('y', first, last);
    }

    /// `J` — join rows, collapsing the next row's indent to one space.
    fn join_rows(&mut self, count: usize) {
        let joins = if count > 1 { count - 1 } else { 1 };
        if self.pos().row + 1 >= self.buf().row_count() {
            return;
        }
        self.begin_change();
        for _ in 0..joins {
            let row = self.pos().row;
            if row + 1 >= self.buf().row_count() {
                break;
            }
            let cur = self.buf().line(row);
            let next = self.buf().line(row + 1);
            let cur_len = cur.chars().count();
            let leading = next.chars().take_while(|c| *c == ' ' || *c == '\t').count();
            let rest_empty = next.chars().count() == leading;
            let ends_space = cur.ends_with(' ') || cur.ends_with('\t');

            self.delete_recorded(Span::new(
                Position::new(row, cur_len),
                Position::new(row + 1, leading),
            ));
            if !rest_empty && !ends_space && cur_len > 0 {
                self.insert_recorded(Position::new(row, cur_len), " ");
            }
            self.place_cursor(Position::new(row, cur_len), false);
        }
        self.commit_change();
    }

    /// `~` — toggle case under the cursor, advancing over each char.
    fn toggle_case(&mut self, count: usize) {
        let pos = self.pos();
        let line = self.buf().line(pos.row);
        let chars: Vec<char> = line.chars().collect();
        if pos.col >= chars.len() {
            return;
        }
        let end = (pos.col + count).min(chars.len());
        let new: String = chars[pos.col..end]
            .iter()
            .map(|&ch| {
                if ch.is_uppercase() {
                    ch.to_lowercase().next().unwrap_or(ch)
                } else if ch.is_lowercase() {
                    ch.to_uppercase().next().unwrap_or(ch)
                } else {
                    ch
                }
            })
            .collect();
        self.begin_change();
        self.delete_recorded(Span::new(pos, pos.with_col(end)));
        self.insert_recorded(pos, &new);
        self.place_cursor(pos.with_col(end), false);
        self.commit_change();
    }

    /// `r{char}` — overwrite `count` characters in place.
    fn replace_chars(&mut self, ch: char, count: usize) {
        let pos = self.pos();
        let len = self.buf().line_len(pos.row);
        if pos.col + count > len {
            return; // not enough characters to replace
        }
        let span = Span::new(pos, pos.with_col(pos.col + count));
        let new = ch.to_string().repeat(count);
        self.begin_change();
        self.delete_recorded(span);
        self.insert_recorded(pos, &new);
        self.place_cursor(pos.with_col(pos.col + count - 1), false);
        self.commit_change();
    }

    // -- Paste --------------------------------------------------------------

    /// `p` (after) / `P` (before). Char-wise text lands inline; line-wise
    /// text opens rows below/above the cursor row.
    fn paste(&mut self, count: usize, after: bool) {
        let name = self.register_override.take();
        let reg = self.registers.read(name);
        if reg.is_empty() || count == 0 {
            return;
        }
        let kind = reg.kind();
        let text = reg.text().repeat(count);
        let pos = self.pos();
        let row_len = self.buf().line_len(pos.row);
        let rows = self.buf().row_count();

        self.begin_change();
        match kind {
            RegisterKind::Char => {
                let at = if after && row_len > 0 {
                    pos.with_col(pos.col + 1)
                } else {
                    pos
                };
                let chars = text.chars().count();
                self.insert_recorded(at, &text);
                let end_col = at.col + chars.saturating_sub(1);
                self.place_cursor(Position::new(at.row, end_col), false);
            }
            RegisterKind::Line => {
                if after && pos.row + 1 >= rows {
                    // Below the last row: lead with a break instead of
                    // trailing with one.
                    let at = Position::new(pos.row, row_len);
                    let body = text.strip_suffix('\n').unwrap_or(&text);
                    self.insert_recorded(at, &format!("\n{body}"));
                    let slot = &mut self.slots[self.current];
                    slot.cursor.goto_row(pos.row + 1, &slot.buffer);
                } else {
                    let at = if after {
                        Position::new(pos.row + 1, 0)
                    } else {
                        Position::new(pos.row, 0)
                    };
                    self.insert_recorded(at, &text);
                    let slot = &mut self.slots[self.current];
                    slot.cursor.goto_row(at.row, &slot.buffer);
                }
            }
        }
        self.commit_change();
    }

    // -- Open row -----------------------------------------------------------

    /// `o` — open a row below and enter insert mode.
    fn open_row_below(&mut self) {
        self.begin_change();
        let row = self.pos().row;
        let eol = Position::new(row, self.buf().line_len(row));
        self.insert_recorded(eol, "\n");
        self.place_cursor(Position::new(row + 1, 0), true);
        self.set_mode(Mode::Insert);
    }

    /// `O` — open a row above and enter insert mode.
    fn open_row_above(&mut self) {
        self.begin_change();
        let row = self.pos().row;
        self.insert_recorded(Position::new(row, 0), "\n");
        self.place_cursor(Position::new(row, 0), true);
        self.set_mode(Mode::Insert);
    }

    // -- Undo / redo --------------------------------------------------------

    fn undo(&mut self, count: usize) {
        let mut restored = None;
        {
            let slot = &mut self.slots[self.current];
            for _ in 0..count.max(1) {
                match slot.history.undo(&mut slot.buffer) {
                    Some(pos) => restored = Some(pos),
                    None => break,
                }
            }
        }
        match restored {
            Some(pos) => self.place_cursor(pos, false),
            None => self.inform("Already at oldest change"),
        }
    }

    fn redo(&mut self, count: usize) {
        let mut restored = None;
        {
            let slot = &mut self.slots[self.current];
            for _ in 0..count.max(1) {
                match slot.history.redo(&mut slot.buffer) {
                    Some(pos) => restored = Some(pos),
                    None => break,
                }
            }
        }
        match restored {
            Some(pos) => self.place_cursor(pos, false),
            None => self.inform("Already at newest change"),
        }
    }

    // -- Insert mode --------------------------------------------------------

    fn on_insert_key(&mut self, key: KeyInput) -> Signal {
        self.message = None;
        match key.key {
            Key::Escape => {
                self.commit_change();
                self.set_mode(Mode::Normal);
                let slot = &mut self.slots[self.current];
                if slot.cursor.col() > 0 {
                    slot.cursor.left(1);
                }
                slot.cursor.clamp(&slot.buffer, false);
            }
            Key::Char(ch) => {
                let pos = self.pos();
                self.insert_recorded(pos, &ch.to_string());
                let slot = &mut self.slots[self.current];
                slot.cursor.right(1, &slot.buffer, true);
            }
            Key::Enter => {
                let pos = self.pos();
                self.insert_recorded(pos, "\n");
                self.place_cursor(Position::new(pos.row + 1, 0), true);
            }
            Key::Tab => {
                let pos = self.pos();
                if self.options.expand_tab {
                    let width = self.options.tab_stop.max(1);
                    let spaces = " ".repeat(width - pos.col % width);
                    let n = spaces.len();
                    self.insert_recorded(pos, &spaces);
                    self.place_cursor(pos.with_col(pos.col + n), true);
                } else {
                    self.insert_recorded(pos, "\t");
                    self.place_cursor(pos.with_col(pos.col + 1), true);
                }
            }
            Key::Backspace => {
                let pos = self.pos();
                if pos.col > 0 {
                    self.delete_recorded(Span::new(pos.with_col(pos.col - 1), pos));
                    self.place_cursor(pos.with_col(pos.col - 1), true);
                } else if pos.row > 0 {
                    let prev_len = self.buf().line_len(pos.row - 1);
                    let from = Position::new(pos.row - 1, prev_len);
                    self.delete_recorded(Span::new(from, pos));
                    self.place_cursor(from, true);
                }
            }
            Key::Delete => {
                let pos = self.pos();
                let len = self.buf().line_len(pos.row);
                if pos.col < len {
                    self.delete_recorded(Span::new(pos, pos.with_col(pos.col + 1)));
                } else if pos.row + 1 < self.buf().row_count() {
                    self.delete_recorded(Span::new(pos, Position::new(pos.row + 1, 0)));
                }
            }
            Key::Left | Key::Right | Key::Up | Key::Down | Key::Home | Key::End => {
                self.apply_motion(key.key, None, true);
            }
            _ => {}
        }
        Signal::Continue
    }

    // -- Replace mode -------------------------------------------------------

    fn on_replace_key(&mut self, key: KeyInput) -> Signal {
        self.message = None;
        match key.key {
            Key::Escape => {
                self.commit_change();
                self.replace_trail.clear();
                self.set_mode(Mode::Normal);
                let slot = &mut self.slots[self.current];
                if slot.cursor.col() > 0 {
                    slot.cursor.left(1);
                }
                slot.cursor.clamp(&slot.buffer, false);
            }
            Key::Char(ch) => {
                let pos = self.pos();
                let len = self.buf().line_len(pos.row);
                let overwritten = if pos.col < len {
                    let old = self.buf().char_at(pos);
                    self.delete_recorded(Span::new(pos, pos.with_col(pos.col + 1)));
                    old
                } else {
                    None
                };
                self.insert_recorded(pos, &ch.to_string());
                self.replace_trail.push((pos, ch, overwritten));
                self.place_cursor(pos.with_col(pos.col + 1), true);
            }
            Key::Enter => {
                let pos = self.pos();
                self.insert_recorded(pos, "\n");
                self.replace_trail.push((pos, '\n', None));
                self.place_cursor(Position::new(pos.row + 1, 0), true);
            }
            Key::Backspace => {
                if let Some((pos, typed, overwritten)) = self.replace_trail.pop() {
                    // Take back what R wrote, restoring the overwritten char.
                    let end = if typed == '\n' {
                        Position::new(pos.row + 1, 0)
                    } else {
                        pos.with_col(pos.col + 1)
                    };
                    self.delete_recorded(Span::new(pos, end));
                    if let Some(old) = overwritten {
                        self.insert_recorded(pos, &old.to_string());
                    }
                    self.place_cursor(pos, true);
                } else {
                    let slot = &mut self.slots[self.current];
                    slot.cursor.left(1);
                }
            }
            Key::Left | Key::Right | Key::Up | Key::Down | Key::Home | Key::End => {
                self.apply_motion(key.key, None, true);
            }
            _ => {}
        }
        Signal::Continue
    }

    // -- Visual mode --------------------------------------------------------

    fn on_visual_key(&mut self, key: KeyInput) -> Signal {
        self.message = None;
        let Some(sel) = self.selection else {
            // Defensive: visual mode without a selection falls back.
            self.set_mode(Mode::Normal);
            return Signal::Continue;
        };

        if key.is_ctrl() {
            self.count = None;
            self.pending = None;
            return Signal::Continue;
        }

        if let Some(pending) = self.pending.take() {
            match pending {
                Pending::Find { kind, count } => {
                    if let Key::Char(ch) = key.key {
                        self.last_find = Some((ch, kind));
                        let slot = &mut self.slots[self.current];
                        slot.cursor.find_char(&slot.buffer, ch, count, kind);
                    }
                }
                Pending::Goto { target } => {
                    if key.key == Key::Char('g') {
                        let row = target.map_or(0, |n| n.saturating_sub(1));
                        let slot = &mut self.slots[self.current];
                        slot.cursor.goto_row(row, &slot.buffer);
                    }
                }
                Pending::Jump { exact } => {
                    if let Key::Char(name @ 'a'..='z') = key.key {
                        let slot = &mut self.slots[self.current];
                        if let Some(mark) = slot.marks.get(name, &slot.buffer) {
                            if exact {
                                slot.cursor.set(mark, &slot.buffer, false);
                            } else {
                                slot.cursor.goto_row(mark.row, &slot.buffer);
                            }
                        }
                    }
                }
                Pending::RegisterName => {
                    if let Key::Char(name) = key.key {
                        if name.is_ascii_alphabetic() {
                            self.register_override = Some(name);
                        }
                    }
                }
                _ => {} // other pending kinds have no meaning here
            }
            return Signal::Continue;
        }

        match key.key {
            Key::Char(d @ '1'..='9') => {
                self.push_digit(d as usize - '0' as usize);
                return Signal::Continue;
            }
            Key::Char('0') if self.count.is_some() => {
                self.push_digit(0);
                return Signal::Continue;
            }
            _ => {}
        }

        let raw = self.take_raw_count();
        let count = raw.unwrap_or(1);

        if self.apply_motion(key.key, raw, false) {
            return Signal::Continue;
        }

        match key.key {
            Key::Escape => {
                self.selection = None;
                self.set_mode(Mode::Normal);
            }

            // Same key exits; the other switches the kind in place.
            Key::Char('v') => {
                if sel.kind == VisualKind::Char {
                    self.selection = None;
                    self.set_mode(Mode::Normal);
                } else {
                    self.selection = Some(Selection::new(sel.anchor, VisualKind::Char));
                    self.set_mode(Mode::Visual(VisualKind::Char));
                }
            }
            Key::Char('V') => {
                if sel.kind == VisualKind::Line {
                    self.selection = None;
                    self.set_mode(Mode::Normal);
                } else {
                    self.selection = Some(Selection::new(sel.anchor, VisualKind::Line));
                    self.set_mode(Mode::Visual(VisualKind::Line));
                }
            }

            // Swap anchor and cursor.
            Key::Char('o') => {
                let here = self.pos();
                self.selection = Some(Selection::new(here, sel.kind));
                self.place_cursor(sel.anchor, false);
            }

            Key::Char('d' | 'x') => self.visual_delete(),
            Key::Char('y') => self.visual_yank(),
            Key::Char('c' | 's') => self.visual_change(),

            Key::Char('f') => {
                self.pending = Some(Pending::Find { kind: FindKind::Forward, count });
            }
            Key::Char('F') => {
                self.pending = Some(Pending::Find { kind: FindKind::Backward, count });
            }
            Key::Char('t') => {
                self.pending = Some(Pending::Find { kind: FindKind::TillForward, count });
            }
            Key::Char('T') => {
                self.pending = Some(Pending::Find { kind: FindKind::TillBackward, count });
            }
            Key::Char('g') => self.pending = Some(Pending::Goto { target: raw }),
            Key::Char('`') => self.pending = Some(Pending::Jump { exact: true }),
            Key::Char('\'') => self.pending = Some(Pending::Jump { exact: false }),
            Key::Char('"') => self.pending = Some(Pending::RegisterName),

            _ => {}
        }
        Signal::Continue
    }

    fn visual_delete(&mut self) {
        let Some(sel) = self.selection.take() else {
            return;
        };
        self.set_mode(Mode::Normal);
        match sel.kind {
            VisualKind::Line => {
                let (first, last) = sel.rows(self.pos());
                self.run_line_operator('d', first, last);
            }
            VisualKind::Char => {
                let span = sel.span(self.pos(), self.buf());
                if span.is_empty() {
                    return;
                }
                let text = self.buf().text_in(span);
                let name = self.register_override.take();
                self.registers.store(name, text, RegisterKind::Char);
                self.begin_change();
                self.delete_recorded(span);
                self.place_cursor(span.start, false);
                self.commit_change();
            }
        }
    }

    fn visual_yank(&mut self) {
        let Some(sel) = self.selection.take() else {
            return;
        };
        self.set_mode(Mode::Normal);
        match sel.kind {
            VisualKind::Line => {
                let (first, last) = sel.rows(self.pos());
                self.run_line_operator('y', first, last);
            }
            VisualKind::Char => {
                let span = sel.span(self.pos(), self.buf());
                if span.is_empty() {
                    return;
                }
                let text = self.buf().text_in(span);
                let name = self.register_override.take();
                self.registers.store(name, text, RegisterKind::Char);
                self.place_cursor(span.start, false);
            }
        }
    }

    fn visual_change(&mut self) {
        let Some(sel) = self.selection.take() else {
            return;
        };
        self.set_mode(Mode::Normal);
        match sel.kind {
            VisualKind::Line => {
                let (first, last) = sel.rows(self.pos());
                self.change_rows(first, last);
            }
            VisualKind::Char => {
                let span = sel.span(self.pos(), self.buf());
                if span.is_empty() {
                    return;
                }
                let text = self.buf().text_in(span);
                let name = self.register_override.take();
                self.registers.store(name, text, RegisterKind::Char);
                self.begin_change();
                self.delete_recorded(span);
                self.place_cursor(span.start, true);
                self.set_mode(Mode::Insert);
            }
        }
    }

    // -- Search -------------------------------------------------------------

    /// `n`/`N` — repeat the stored search, optionally reversed.
    fn repeat_search(&mut self, reversed: bool, count: usize) {
        let Some(query) = self.query.clone() else {
            self.fail("E486: Pattern not found");
            return;
        };
        let direction = if reversed {
            query.direction.reversed()
        } else {
            query.direction
        };
        for _ in 0..count.max(1) {
            if !self.jump_to_match(&query.pattern, direction) {
                break;
            }
        }
    }

    /// `*`/`#` — whole-word search for the word under the cursor.
    fn search_word_under_cursor(&mut self, direction: Direction) {
        let Some(found) = word::word_under_cursor(self.buf(), self.pos()) else {
            self.fail("E348: No string under cursor");
            return;
        };
        let pattern = search::whole_word_pattern(&found);
        self.query = Some(SearchQuery { pattern: pattern.clone(), direction });
        self.jump_to_match(&pattern, direction);
    }

    /// One search step from the cursor. True when the cursor moved.
    fn jump_to_match(&mut self, pattern: &str, direction: Direction) -> bool {
        let re = match search::build_regex(pattern, self.options.ignore_case) {
            Ok(re) => re,
            Err(err) => {
                self.fail(format!("E383: Invalid pattern: {err}"));
                return false;
            }
        };
        let from = self.pos();
        let hit = search::find(self.buf(), &re, from, direction, self.options.wrap_scan);
        match hit {
            Some(hit) => {
                let wrapped = match direction {
                    Direction::Forward => hit.pos <= from,
                    Direction::Backward => hit.pos >= from,
                };
                self.place_cursor(hit.pos, false);
                if wrapped {
                    self.inform(match direction {
                        Direction::Forward => "search hit BOTTOM, continuing at TOP",
                        Direction::Backward => "search hit TOP, continuing at BOTTOM",
                    });
                }
                true
            }
            None => {
                self.fail(format!("E486: Pattern not found: {pattern}"));
                false
            }
        }
    }

    // -- Command mode -------------------------------------------------------

    fn on_command_key(&mut self, key: KeyInput) -> Signal {
        match key.key {
            Key::Escape => {
                self.cmdline = None;
                self.set_mode(Mode::Normal);
            }
            Key::Enter => {
                let Some(cl) = self.cmdline.take() else {
                    self.set_mode(Mode::Normal);
                    return Signal::Continue;
                };
                self.set_mode(Mode::Normal);
                let input = cl.input().to_string();
                match cl.prompt() {
                    ':' => return self.execute_ex(&command::parse(&input)),
                    '/' => self.run_search_line(&input, Direction::Forward),
                    '?' => self.run_search_line(&input, Direction::Backward),
                    _ => {}
                }
            }
            Key::Char(ch) => {
                if let Some(cl) = self.cmdline.as_mut() {
                    cl.insert_char(ch);
                }
            }
            Key::Backspace => {
                let cancel = self
                    .cmdline
                    .as_mut()
                    .is_some_and(|cl| !cl.backspace() && cl.is_empty());
                if cancel {
                    self.cmdline = None;
                    self.set_mode(Mode::Normal);
                }
            }
            Key::Left => {
                if let Some(cl) = self.cmdline.as_mut() {
                    cl.move_left();
                }
            }
            Key::Right => {
                if let Some(cl) = self.cmdline.as_mut() {
                    cl.move_right();
                }
            }
            Key::Home => {
                if let Some(cl) = self.cmdline.as_mut() {
                    cl.move_home();
                }
            }
            Key::End => {
                if let Some(cl) = self.cmdline.as_mut() {
                    cl.move_end();
                }
            }
            _ => {}
        }
        Signal::Continue
    }

    /// Execute a confirmed `/`/`?` line. An empty line reuses the stored
    /// pattern; no stored pattern is a failure.
    fn run_search_line(&mut self, input: &str, direction: Direction) {
        let pattern = if input.is_empty() {
            match &self.query {
                Some(q) => q.pattern.clone(),
                None => {
                    self.fail("E35: No previous search pattern");
                    return;
                }
            }
        } else {
            input.to_string()
        };
        self.query = Some(SearchQuery { pattern: pattern.clone(), direction });
        self.jump_to_match(&pattern, direction);
    }

    // -- Ex execution -------------------------------------------------------

    fn resolve_address(&self, addr: Address) -> usize {
        let rows = self.buf().row_count();
        match addr {
            Address::Row(n) => n.min(rows - 1),
            Address::Current => self.pos().row,
            Address::Last => rows - 1,
        }
    }

    /// A range's rows, defaulting to the cursor row; endpoints are swapped
    /// when given backwards.
    fn resolve_range(&self, range: RangeSpec) -> (usize, usize) {
        match range {
            RangeSpec::None => (self.pos().row, self.pos().row),
            RangeSpec::Whole => (0, self.buf().row_count() - 1),
            RangeSpec::At(addr) => {
                let row = self.resolve_address(addr);
                (row, row)
            }
            RangeSpec::Span(a, b) => {
                let first = self.resolve_address(a);
                let last = self.resolve_address(b);
                (first.min(last), first.max(last))
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    fn execute_ex(&mut self, cmd: &ExCommand) -> Signal {
        debug!(?cmd, "ex command");
        match cmd {
            ExCommand::Nop => {}

            ExCommand::Goto { range } => {
                let (_, row) = self.resolve_range(*range);
                let slot = &mut self.slots[self.current];
                slot.cursor.goto_row(row, &slot.buffer);
            }

            ExCommand::Write { path, force } => {
                self.write_current(path.clone(), *force);
            }

            ExCommand::Quit { force } => {
                if !force && self.buf().is_modified() {
                    self.fail("E37: No write since last change (add ! to override)");
                } else {
                    return Signal::Quit;
                }
            }

            ExCommand::WriteQuit { force } => {
                if self.write_current(None, *force) {
                    return Signal::Quit;
                }
            }

            ExCommand::Edit { path, force } => self.edit_file(path.clone(), *force),

            ExCommand::Read { range, path } => self.read_file(*range, path.clone()),

            ExCommand::Substitute { range, pattern, replacement, flags } => {
                let (pattern, replacement, flags) =
                    (pattern.clone(), replacement.clone(), *flags);
                self.last_subst = Some((pattern.clone(), replacement.clone(), flags));
                self.substitute(*range, &pattern, &replacement, flags);
            }

            ExCommand::RepeatSubstitute { range } => {
                match self.last_subst.clone() {
                    Some((pattern, replacement, flags)) => {
                        self.substitute(*range, &pattern, &replacement, flags);
                    }
                    None => self.fail("E33: No previous substitute regular expression"),
                }
            }

            ExCommand::DeleteRows { range } => {
                let (first, last) = self.resolve_range(*range);
                let removed = last - first + 1;
                self.run_line_operator('d', first, last);
                if removed > 1 {
                    self.inform(format!("{removed} fewer lines"));
                }
            }

            ExCommand::YankRows { range } => {
                let (first, last) = self.resolve_range(*range);
                let rows = last - first + 1;
                let text = self.rows_text(first, last);
                self.registers.store(None, text, RegisterKind::Line);
                if rows > 1 {
                    self.inform(format!("{rows} lines yanked"));
                }
            }

            ExCommand::Put { range } => {
                let (_, row) = self.resolve_range(*range);
                self.put_below(row);
            }

            ExCommand::Set { args } => self.apply_set(args),

            ExCommand::Undo => self.undo(1),
            ExCommand::Redo => self.redo(1),

            ExCommand::NextBuffer => {
                self.current = (self.current + 1) % self.slots.len();
                self.announce_buffer();
            }
            ExCommand::PrevBuffer => {
                self.current = (self.current + self.slots.len() - 1) % self.slots.len();
                self.announce_buffer();
            }
            ExCommand::DeleteBuffer { force } => self.delete_buffer(*force),
            ExCommand::ListBuffers => self.list_buffers(),

            ExCommand::Marks => self.list_marks(),
            ExCommand::Registers => self.list_registers(),

            ExCommand::Unknown(input) => {
                self.fail(format!("E492: Not an editor command: {input}"));
            }
        }
        Signal::Continue
    }

    /// `:w` family. True on success.
    fn write_current(&mut self, path: Option<PathBuf>, force: bool) -> bool {
        if path.is_none() && self.buf().path().is_none() {
            self.fail("E32: No file name");
            return false;
        }
        let buffer = &mut self.slots[self.current].buffer;
        let result = match path {
            Some(p) => buffer.save_as(&p, force),
            None => buffer.save(force),
        };
        match result {
            Ok(rows) => {
                let name = self.buf().display_name();
                debug!(file = %name, rows, "wrote buffer");
                self.inform(format!("\"{name}\" {rows} lines written"));
                true
            }
            Err(err) => {
                self.fail(format!("E212: {err}"));
                false
            }
        }
    }

    /// `:e` — open a file into a new buffer slot (or reload in place when
    /// no path is given).
    fn edit_file(&mut self, path: Option<PathBuf>, force: bool) {
        if !force && self.buf().is_modified() {
            self.fail("E37: No write since last change (add ! to override)");
            return;
        }
        let target = match path {
            Some(p) => p,
            None => match self.buf().path() {
                Some(p) => p.to_path_buf(),
                None => {
                    self.fail("E32: No file name");
                    return;
                }
            },
        };
        match Buffer::open(&target) {
            Ok(buffer) => {
                let name = buffer.display_name();
                let rows = buffer.row_count();
                debug!(file = %name, rows, "opened buffer");
                if path_matches(self.buf(), &target) {
                    // Reload in place.
                    self.slots[self.current] = BufferSlot::new(buffer);
                } else {
                    self.slots.push(BufferSlot::new(buffer));
                    self.current = self.slots.len() - 1;
                }
                self.inform(format!("\"{name}\" {rows} lines"));
            }
            Err(err) => self.fail(err.to_string()),
        }
    }

    /// `:r` — insert a file's rows below the addressed row.
    fn read_file(&mut self, range: RangeSpec, path: Option<PathBuf>) {
        let Some(path) = path else {
            self.fail("E32: No file name");
            return;
        };
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                self.fail(format!("E484: Can't open file {}: {err}", path.display()));
                return;
            }
        };
        let rows_in = Buffer::from_text(&text).lines();
        let count = rows_in.len();
        let (_, row) = self.resolve_range(range);
        let at = Position::new(row, self.buf().line_len(row));
        let body = rows_in.join("\n");

        self.begin_change();
        self.insert_recorded(at, &format!("\n{body}"));
        let slot = &mut self.slots[self.current];
        slot.cursor.goto_row(row + 1, &slot.buffer);
        self.commit_change();
        debug!(file = %path.display(), rows = count, "read file into buffer");
        self.inform(format!("\"{}\" {count} lines read", path.display()));
    }

    /// `:s` over a resolved row range.
    fn substitute(&mut self, range: RangeSpec, pattern: &str, replacement: &str, flags: SubstFlags) {
        let re = match search::build_regex(pattern, flags.ignore_case || self.options.ignore_case)
        {
            Ok(re) => re,
            Err(err) => {
                self.fail(format!("E383: Invalid pattern: {err}"));
                return;
            }
        };
        let (first, last) = self.resolve_range(range);

        let mut total = 0usize;
        let mut rows_hit = 0usize;
        let mut final_row = first;
        let mut opened = false;

        for row in first..=last {
            let line = self.buf().line(row);
            let hits = if flags.all {
                re.find_iter(&line).filter(|m| m.start() < m.end()).count()
            } else {
                usize::from(re.find(&line).is_some_and(|m| m.start() < m.end()))
            };
            if hits == 0 {
                continue;
            }
            let new = if flags.all {
                re.replace_all(&line, replacement).into_owned()
            } else {
                re.replace(&line, replacement).into_owned()
            };
            if !opened {
                self.begin_change();
                opened = true;
            }
            let slot = &mut self.slots[self.current];
            slot.history.note_delete(Position::new(row, 0), &line);
            slot.history.note_insert(Position::new(row, 0), &new);
            slot.buffer.replace_row(row, &new);
            total += hits;
            rows_hit += 1;
            final_row = row;
        }

        if total == 0 {
            self.fail(format!("E486: Pattern not found: {pattern}"));
            return;
        }
        let slot = &mut self.slots[self.current];
        slot.cursor.goto_row(final_row, &slot.buffer);
        self.commit_change();
        let subs = if total == 1 { "substitution" } else { "substitutions" };
        let lines = if rows_hit == 1 { "line" } else { "lines" };
        self.inform(format!("{total} {subs} on {rows_hit} {lines}"));
    }

    /// `:put` — paste the unnamed register line-wise below `row`.
    fn put_below(&mut self, row: usize) {
        let reg = self.registers.read(None);
        if reg.is_empty() {
            self.fail("E353: Nothing in register \"");
            return;
        }
        let mut text = reg.text().to_string();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        self.begin_change();
        if row + 1 < self.buf().row_count() {
            self.insert_recorded(Position::new(row + 1, 0), &text);
        } else {
            let at = Position::new(row, self.buf().line_len(row));
            let body = text.strip_suffix('\n').unwrap_or(&text).to_string();
            self.insert_recorded(at, &format!("\n{body}"));
        }
        let slot = &mut self.slots[self.current];
        slot.cursor.goto_row(row + 1, &slot.buffer);
        self.commit_change();
    }

    /// `:set` — apply directives, reporting queries and the first error.
    fn apply_set(&mut self, args: &str) {
        let directives = options::parse_set(args);
        if directives.is_empty() {
            return;
        }
        let mut answers = Vec::new();
        for directive in &directives {
            match self.options.apply(directive) {
                Ok(Some(answer)) => answers.push(answer),
                Ok(None) => {}
                Err(err) => {
                    self.fail(format!("E518: {err}"));
                    return;
                }
            }
        }
        if !answers.is_empty() {
            self.inform(answers.join("  "));
        }
    }

    // -- Buffer list --------------------------------------------------------

    fn announce_buffer(&mut self) {
        let name = self.buf().display_name();
        let rows = self.buf().row_count();
        self.inform(format!("\"{name}\" {rows} lines"));
    }

    /// `:bd` — close the current buffer; the list never goes empty.
    fn delete_buffer(&mut self, force: bool) {
        if !force && self.buf().is_modified() {
            self.fail("E89: No write since last change (add ! to override)");
            return;
        }
        self.slots.remove(self.current);
        if self.slots.is_empty() {
            self.slots.push(BufferSlot::new(Buffer::new()));
        }
        if self.current >= self.slots.len() {
            self.current = self.slots.len() - 1;
        }
        self.announce_buffer();
    }

    fn list_buffers(&mut self) {
        let rows: Vec<String> = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                let marker = if i == self.current { "%a" } else { "  " };
                let modified = if slot.buffer.is_modified() { " +" } else { "" };
                format!(
                    "{:3} {marker} \"{}\"{modified} {} lines",
                    i + 1,
                    slot.buffer.display_name(),
                    slot.buffer.row_count(),
                )
            })
            .collect();
        self.inform(rows.join("\n"));
    }

    fn list_marks(&mut self) {
        let listing = self.slots[self.current].marks.listing();
        if listing.is_empty() {
            self.inform("No marks set");
            return;
        }
        let mut out = vec!["mark  line  col".to_string()];
        for (name, pos) in listing {
            out.push(format!("  {name}   {:4}  {:3}", pos.row + 1, pos.col));
        }
        self.inform(out.join("\n"));
    }

    fn list_registers(&mut self) {
        let listing = self.registers.listing();
        if listing.is_empty() {
            self.inform("No registers");
            return;
        }
        let mut out = vec!["-- Registers --".to_string()];
        for (name, reg) in listing {
            let excerpt: String = reg.text().chars().take(40).collect();
            out.push(format!("\"{name}   {}", excerpt.replace('\n', "^J")));
        }
        self.inform(out.join("\n"));
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

fn path_matches(buf: &Buffer, path: &std::path::Path) -> bool {
    buf.path() == Some(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
