//! The text buffer — a rope presented as an ordered sequence of rows.
//!
//! A `Buffer` wraps a [`ropey::Rope`] and exposes row-oriented editing
//! primitives on top of it. The rope stores the rows joined with `\n` and no
//! other separators; CRLF/CR files are normalized on load and the detected
//! ending is restored on save.
//!
//! # Invariants
//!
//! - **Never empty.** A cleared buffer is one empty row, never zero rows.
//!   `row_count()` is always at least 1.
//! - **Columns are char offsets**, not bytes. Column `line_len(row)` is the
//!   spot just past the last character — a valid span endpoint and the
//!   insert-mode resting position.
//! - Out-of-range reads do not fail: [`line`](Buffer::line) on a missing row
//!   returns the empty string. Mutations clamp their coordinates to the
//!   buffer instead of panicking.
//!
//! Undo history is not recorded here — the session wraps every mutating call
//! with its transaction log so inverses restore content exactly.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use ropey::Rope;
use thiserror::Error;

use crate::position::{Position, Span};

// ---------------------------------------------------------------------------
// Line endings
// ---------------------------------------------------------------------------

/// Line ending style of the file backing a buffer.
///
/// Detected from the first line break on load, defaulting to `Lf`. Applied
/// when saving; the in-memory rope always uses `\n`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
    Cr,
}

impl LineEnding {
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Cr => "\r",
        }
    }

    /// Detect the style from the first line break in `text`.
    #[must_use]
    pub fn detect(text: &str) -> Self {
        let bytes = text.as_bytes();
        for (i, &b) in bytes.iter().enumerate() {
            if b == b'\n' {
                return Self::Lf;
            }
            if b == b'\r' {
                return if bytes.get(i + 1) == Some(&b'\n') {
                    Self::CrLf
                } else {
                    Self::Cr
                };
            }
        }
        Self::Lf
    }
}

// ---------------------------------------------------------------------------
// File errors
// ---------------------------------------------------------------------------

/// Failure modes of the file boundary.
///
/// All of these are recoverable: the session reports them on the status line
/// and leaves the buffer untouched.
#[derive(Debug, Error)]
pub enum FileError {
    /// Write requested but the buffer has no associated path.
    #[error("no file name")]
    NoFileName,

    /// The OS refused the read or write.
    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    /// The on-disk file changed after the buffer last synced with it and
    /// the write was not forced.
    #[error("{}: file changed on disk (add ! to override)", .0.display())]
    ExternalModification(PathBuf),

    /// The file is not valid UTF-8.
    #[error("{}: not valid UTF-8", .0.display())]
    Encoding(PathBuf),

    /// Any other I/O failure.
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FileError {
    fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::InvalidData => Self::Encoding(path.to_path_buf()),
            _ => Self::Io { path: path.to_path_buf(), source: err },
        }
    }
}

// ---------------------------------------------------------------------------
// Buffer
// ---------------------------------------------------------------------------

/// A rope-backed, never-empty sequence of text rows with file metadata.
pub struct Buffer {
    rope: Rope,
    path: Option<PathBuf>,
    modified: bool,
    line_ending: LineEnding,
    /// Disk mtime observed at the last load or save; `None` for buffers
    /// that never touched a file. Guards against silently overwriting
    /// external edits.
    synced_mtime: Option<SystemTime>,
}

impl Buffer {
    // -- Construction -------------------------------------------------------

    /// An empty scratch buffer: one empty row, no path.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            path: None,
            modified: false,
            line_ending: LineEnding::Lf,
            synced_mtime: None,
        }
    }

    /// Build a buffer from in-memory text. A trailing newline terminates the
    /// last row rather than opening an extra empty one, matching how editors
    /// count a file's lines.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let line_ending = LineEnding::detect(text);
        Self {
            rope: Rope::from_str(&normalize(text)),
            path: None,
            modified: false,
            line_ending,
            synced_mtime: None,
        }
    }

    /// Build a buffer from rows (used heavily by tests).
    #[must_use]
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Self {
        let joined = rows
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("\n");
        Self::from_text(&joined)
    }

    /// Open a file. A missing file is **not** an error — it denotes a new
    /// buffer that will be created on the first write.
    ///
    /// # Errors
    ///
    /// Permission and encoding failures from the underlying read.
    pub fn open(path: &Path) -> Result<Self, FileError> {
        match fs::read_to_string(path) {
            Ok(text) => {
                let mut buf = Self::from_text(&text);
                buf.path = Some(path.to_path_buf());
                buf.synced_mtime = fs::metadata(path).and_then(|m| m.modified()).ok();
                Ok(buf)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let mut buf = Self::new();
                buf.path = Some(path.to_path_buf());
                Ok(buf)
            }
            Err(err) => Err(FileError::from_io(path, err)),
        }
    }

    // -- Row access ---------------------------------------------------------

    /// Number of rows; at least 1.
    #[inline]
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Row content without its line break. Out of range returns the empty
    /// string — reads never fail.
    #[must_use]
    pub fn line(&self, row: usize) -> String {
        if row >= self.row_count() {
            return String::new();
        }
        let slice = self.rope.line(row);
        let mut text = slice.to_string();
        if text.ends_with('\n') {
            text.pop();
        }
        text
    }

    /// Content length of a row in chars, excluding the line break.
    /// Out of range returns 0.
    #[must_use]
    pub fn line_len(&self, row: usize) -> usize {
        if row >= self.row_count() {
            return 0;
        }
        let slice = self.rope.line(row);
        let len = slice.len_chars();
        if len > 0 && slice.char(len - 1) == '\n' {
            len - 1
        } else {
            len
        }
    }

    /// The character at `pos`, when `pos.col` addresses a content character.
    #[must_use]
    pub fn char_at(&self, pos: Position) -> Option<char> {
        if pos.row < self.row_count() && pos.col < self.line_len(pos.row) {
            let idx = self.rope.line_to_char(pos.row) + pos.col;
            Some(self.rope.char(idx))
        } else {
            None
        }
    }

    /// All rows, in order — the snapshot handed across the output boundary.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        (0..self.row_count()).map(|r| self.line(r)).collect()
    }

    /// The whole buffer as one `\n`-joined string.
    #[must_use]
    pub fn contents(&self) -> String {
        self.rope.to_string()
    }

    /// True when the buffer is a single empty row.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// The text covered by `span`, without mutating.
    #[must_use]
    pub fn text_in(&self, span: Span) -> String {
        let start = self.index_of(self.clamp(span.start));
        let end = self.index_of(self.clamp(span.end));
        if start >= end {
            return String::new();
        }
        self.rope.slice(start..end).to_string()
    }

    // -- Coordinates --------------------------------------------------------

    /// Clamp `pos` to a valid position: row into range, column at most the
    /// row's content length.
    #[must_use]
    pub fn clamp(&self, pos: Position) -> Position {
        let row = pos.row.min(self.row_count() - 1);
        let col = pos.col.min(self.line_len(row));
        Position::new(row, col)
    }

    /// Absolute char index of a (valid) position. A column equal to the
    /// row's content length addresses the line break (or the rope end on
    /// the last row).
    fn index_of(&self, pos: Position) -> usize {
        self.rope.line_to_char(pos.row) + pos.col
    }

    // -- Span mutation ------------------------------------------------------

    /// Insert `text` at `pos`, splitting rows on embedded `\n` and shifting
    /// everything after the insertion point.
    pub fn insert_text(&mut self, pos: Position, text: &str) {
        let at = self.index_of(self.clamp(pos));
        self.rope.insert(at, text);
        self.modified = true;
    }

    /// Remove the text in `span` and return it exactly as removed. Handles
    /// same-row and multi-row spans, splicing the first-row head onto the
    /// last-row tail. An empty or inverted span is a no-op.
    pub fn delete_span(&mut self, span: Span) -> String {
        let start = self.index_of(self.clamp(span.start));
        let end = self.index_of(self.clamp(span.end));
        if start >= end {
            return String::new();
        }
        let removed = self.rope.slice(start..end).to_string();
        self.rope.remove(start..end);
        self.modified = true;
        removed
    }

    // -- Row mutation -------------------------------------------------------

    /// Insert `text` as a new row at index `row` (clamped to `0..=row_count`).
    /// Rows at and after `row` shift down.
    pub fn insert_row(&mut self, row: usize, text: &str) {
        let count = self.row_count();
        let row = row.min(count);
        if row < count {
            let at = self.rope.line_to_char(row);
            self.rope.insert(at, &format!("{text}\n"));
        } else {
            let at = self.rope.len_chars();
            self.rope.insert(at, &format!("\n{text}"));
        }
        self.modified = true;
    }

    /// Remove row `row` and return its content. Deleting the only row
    /// leaves one empty row — the buffer never reaches zero rows. Out of
    /// range is a no-op returning the empty string.
    pub fn delete_row(&mut self, row: usize) -> String {
        let count = self.row_count();
        if row >= count {
            return String::new();
        }
        let content = self.line(row);
        if count == 1 {
            let all = self.rope.len_chars();
            self.rope.remove(0..all);
        } else if row + 1 < count {
            let start = self.rope.line_to_char(row);
            let end = self.rope.line_to_char(row + 1);
            self.rope.remove(start..end);
        } else {
            // Last row: also remove the preceding line break.
            let start = self.rope.line_to_char(row) - 1;
            let end = self.rope.len_chars();
            self.rope.remove(start..end);
        }
        self.modified = true;
        content
    }

    /// Replace the content of row `row`, keeping its line break.
    /// Out of range is a no-op.
    pub fn replace_row(&mut self, row: usize, text: &str) {
        if row >= self.row_count() {
            return;
        }
        let start = self.rope.line_to_char(row);
        let end = start + self.line_len(row);
        self.rope.remove(start..end);
        self.rope.insert(start, text);
        self.modified = true;
    }

    // -- Metadata -----------------------------------------------------------

    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[inline]
    pub fn set_path(&mut self, path: PathBuf) {
        self.path = Some(path);
    }

    /// Short display name for the status line: file name or `[No Name]`.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .map_or_else(|| "[No Name]".to_string(), |n| n.to_string_lossy().into_owned())
    }

    #[inline]
    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.modified
    }

    #[inline]
    #[must_use]
    pub const fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    // -- Saving -------------------------------------------------------------

    /// Write the buffer to its associated path. Returns the number of rows
    /// written.
    ///
    /// # Errors
    ///
    /// `NoFileName` without an associated path; `ExternalModification` when
    /// the on-disk file is newer than the last sync and `force` is false;
    /// permission and other I/O failures from the write itself.
    pub fn save(&mut self, force: bool) -> Result<usize, FileError> {
        let path = self.path.clone().ok_or(FileError::NoFileName)?;
        self.write_to(&path, force)
    }

    /// Write the buffer to `path`, adopting it as the buffer's path.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`save`](Self::save), minus `NoFileName`.
    pub fn save_as(&mut self, path: &Path, force: bool) -> Result<usize, FileError> {
        let owned = path.to_path_buf();
        let written = self.write_to(&owned, force)?;
        self.path = Some(owned);
        Ok(written)
    }

    fn write_to(&mut self, path: &Path, force: bool) -> Result<usize, FileError> {
        if !force && self.externally_modified(path) {
            return Err(FileError::ExternalModification(path.to_path_buf()));
        }
        let ending = self.line_ending.as_str();
        let mut out = String::with_capacity(self.rope.len_bytes() + self.row_count());
        for row in 0..self.row_count() {
            out.push_str(&self.line(row));
            out.push_str(ending);
        }
        fs::write(path, &out).map_err(|e| FileError::from_io(path, e))?;
        self.synced_mtime = fs::metadata(path).and_then(|m| m.modified()).ok();
        self.modified = false;
        Ok(self.row_count())
    }

    /// True when the file at `path` changed after this buffer last synced
    /// with it. A buffer that never synced (new file) reports false.
    #[must_use]
    pub fn externally_modified(&self, path: &Path) -> bool {
        let Some(synced) = self.synced_mtime else {
            return false;
        };
        match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(disk) => disk > synced,
            Err(_) => false,
        }
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("rows", &self.row_count())
            .field("modified", &self.modified)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Normalize CRLF/CR breaks to `\n` and drop one trailing newline so the
/// rope holds exactly the rows joined with `\n`.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(ch);
        }
    }
    if out.ends_with('\n') {
        out.pop();
    }
    out
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

    // -- Construction & the never-empty invariant ---------------------------

    #[test]
    fn new_buffer_is_one_empty_row() {
        let buf = Buffer::new();
        assert_eq!(buf.row_count(), 1);
        assert_eq!(buf.line(0), "");
        assert!(buf.is_blank());
        assert!(!buf.is_modified());
    }

    #[test]
    fn from_text_counts_rows() {
        let buf = Buffer::from_text("alpha\nbeta\ngamma");
        assert_eq!(buf.row_count(), 3);
        assert_eq!(buf.line(1), "beta");
    }

    #[test]
    fn trailing_newline_does_not_open_extra_row() {
        let buf = Buffer::from_text("alpha\nbeta\n");
        assert_eq!(buf.row_count(), 2);
        assert_eq!(buf.line(1), "beta");
    }

    #[test]
    fn double_trailing_newline_keeps_one_empty_row() {
        let buf = Buffer::from_text("alpha\n\n");
        assert_eq!(buf.row_count(), 2);
        assert_eq!(buf.line(1), "");
    }

    #[test]
    fn crlf_normalized_and_remembered() {
        let buf = Buffer::from_text("one\r\ntwo\r\n");
        assert_eq!(buf.row_count(), 2);
        assert_eq!(buf.line(0), "one");
        assert_eq!(buf.line_ending(), LineEnding::CrLf);
        assert_eq!(buf.contents(), "one\ntwo");
    }

    #[test]
    fn from_rows_builder() {
        let buf = Buffer::from_rows(&["a", "b", "c"]);
        assert_eq!(buf.lines(), vec!["a", "b", "c"]);
    }

    // -- Reads never fail ---------------------------------------------------

    #[test]
    fn line_out_of_range_is_empty() {
        let buf = Buffer::from_text("only");
        assert_eq!(buf.line(7), "");
        assert_eq!(buf.line_len(7), 0);
        assert_eq!(buf.char_at(p(7, 0)), None);
    }

    #[test]
    fn char_at_content_only() {
        let buf = Buffer::from_text("hi\nthere");
        assert_eq!(buf.char_at(p(0, 1)), Some('i'));
        assert_eq!(buf.char_at(p(0, 2)), None); // the break is not content
        assert_eq!(buf.char_at(p(1, 0)), Some('t'));
    }

    #[test]
    fn unicode_columns_are_chars() {
        let buf = Buffer::from_text("café\n你好");
        assert_eq!(buf.line_len(0), 4);
        assert_eq!(buf.char_at(p(0, 3)), Some('é'));
        assert_eq!(buf.line_len(1), 2);
        assert_eq!(buf.char_at(p(1, 1)), Some('好'));
    }

    // -- Clamp --------------------------------------------------------------

    #[test]
    fn clamp_row_and_col() {
        let buf = Buffer::from_text("hello\nhi");
        assert_eq!(buf.clamp(p(9, 9)), p(1, 2));
        assert_eq!(buf.clamp(p(0, 99)), p(0, 5));
        assert_eq!(buf.clamp(p(0, 3)), p(0, 3));
    }

    // -- insert_text --------------------------------------------------------

    #[test]
    fn insert_text_inline() {
        let mut buf = Buffer::from_text("hllo");
        buf.insert_text(p(0, 1), "e");
        assert_eq!(buf.contents(), "hello");
        assert!(buf.is_modified());
    }

    #[test]
    fn insert_text_splits_rows() {
        let mut buf = Buffer::from_text("headtail");
        buf.insert_text(p(0, 4), "\nmid\n");
        assert_eq!(buf.lines(), vec!["head", "mid", "tail"]);
    }

    #[test]
    fn insert_text_at_row_end_addresses_the_break() {
        let mut buf = Buffer::from_text("ab\ncd");
        buf.insert_text(p(0, 2), "!");
        assert_eq!(buf.lines(), vec!["ab!", "cd"]);
    }

    // -- delete_span --------------------------------------------------------

    #[test]
    fn delete_span_same_row() {
        let mut buf = Buffer::from_text("hello world");
        let removed = buf.delete_span(Span::new(p(0, 0), p(0, 6)));
        assert_eq!(removed, "hello ");
        assert_eq!(buf.contents(), "world");
    }

    #[test]
    fn delete_span_multi_row_splices_remainders() {
        let mut buf = Buffer::from_text("first\nsecond\nthird");
        let removed = buf.delete_span(Span::new(p(0, 3), p(2, 2)));
        assert_eq!(removed, "st\nsecond\nth");
        assert_eq!(buf.lines(), vec!["firird"]);
    }

    #[test]
    fn delete_span_including_break_joins_rows() {
        let mut buf = Buffer::from_text("ab\ncd");
        let removed = buf.delete_span(Span::new(p(0, 2), p(1, 0)));
        assert_eq!(removed, "\n");
        assert_eq!(buf.lines(), vec!["abcd"]);
    }

    #[test]
    fn delete_span_empty_is_noop() {
        let mut buf = Buffer::from_text("abc");
        assert_eq!(buf.delete_span(Span::point(p(0, 1))), "");
        assert!(!buf.is_modified());
    }

    #[test]
    fn delete_span_everything_leaves_one_row() {
        let mut buf = Buffer::from_text("a\nb");
        buf.delete_span(Span::new(p(0, 0), p(1, 1)));
        assert_eq!(buf.row_count(), 1);
        assert_eq!(buf.line(0), "");
    }

    // -- Row primitives -----------------------------------------------------

    #[test]
    fn insert_row_in_middle_shifts_down() {
        let mut buf = Buffer::from_rows(&["a", "c"]);
        buf.insert_row(1, "b");
        assert_eq!(buf.lines(), vec!["a", "b", "c"]);
    }

    #[test]
    fn insert_row_at_top_and_bottom() {
        let mut buf = Buffer::from_rows(&["mid"]);
        buf.insert_row(0, "top");
        buf.insert_row(2, "bot");
        assert_eq!(buf.lines(), vec!["top", "mid", "bot"]);
    }

    #[test]
    fn delete_row_returns_content() {
        let mut buf = Buffer::from_rows(&["a", "b", "c"]);
        assert_eq!(buf.delete_row(1), "b");
        assert_eq!(buf.lines(), vec!["a", "c"]);
    }

    #[test]
    fn delete_last_row_eats_preceding_break() {
        let mut buf = Buffer::from_rows(&["a", "b"]);
        assert_eq!(buf.delete_row(1), "b");
        assert_eq!(buf.lines(), vec!["a"]);
    }

    #[test]
    fn delete_only_row_leaves_empty_row() {
        let mut buf = Buffer::from_rows(&["solo"]);
        assert_eq!(buf.delete_row(0), "solo");
        assert_eq!(buf.row_count(), 1);
        assert_eq!(buf.line(0), "");
    }

    #[test]
    fn delete_every_row_never_reaches_zero() {
        let mut buf = Buffer::from_rows(&["a", "b", "c"]);
        buf.delete_row(0);
        buf.delete_row(0);
        buf.delete_row(0);
        buf.delete_row(0); // extra deletes stay harmless
        assert_eq!(buf.row_count(), 1);
        assert_eq!(buf.line(0), "");
    }

    #[test]
    fn replace_row_keeps_neighbors() {
        let mut buf = Buffer::from_rows(&["a", "old", "c"]);
        buf.replace_row(1, "new text");
        assert_eq!(buf.lines(), vec!["a", "new text", "c"]);
    }

    #[test]
    fn replace_row_out_of_range_is_noop() {
        let mut buf = Buffer::from_rows(&["a"]);
        buf.replace_row(5, "x");
        assert_eq!(buf.lines(), vec!["a"]);
        assert!(!buf.is_modified());
    }

    // -- text_in ------------------------------------------------------------

    #[test]
    fn text_in_does_not_mutate() {
        let buf = Buffer::from_text("one\ntwo");
        assert_eq!(buf.text_in(Span::new(p(0, 1), p(1, 1))), "ne\nt");
        assert_eq!(buf.contents(), "one\ntwo");
    }

    // -- File I/O -----------------------------------------------------------

    #[test]
    fn open_missing_file_is_new_buffer() {
        let path = std::env::temp_dir().join("vee_core_missing_file.txt");
        let _ = fs::remove_file(&path);
        let buf = Buffer::open(&path).unwrap();
        assert_eq!(buf.row_count(), 1);
        assert_eq!(buf.path(), Some(path.as_path()));
        assert!(!buf.is_modified());
    }

    #[test]
    fn save_without_path_is_no_file_name() {
        let mut buf = Buffer::from_text("text");
        assert!(matches!(buf.save(false), Err(FileError::NoFileName)));
    }

    #[test]
    fn save_and_open_roundtrip() {
        let dir = std::env::temp_dir().join("vee_core_roundtrip");
        let _ = fs::create_dir_all(&dir);
        let path = dir.join("file.txt");

        let mut buf = Buffer::from_rows(&["alpha", "beta"]);
        let written = buf.save_as(&path, false).unwrap();
        assert_eq!(written, 2);
        assert!(!buf.is_modified());

        let loaded = Buffer::open(&path).unwrap();
        assert_eq!(loaded.lines(), vec!["alpha", "beta"]);

        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "alpha\nbeta\n");

        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir(&dir);
    }

    #[test]
    fn save_preserves_crlf() {
        let dir = std::env::temp_dir().join("vee_core_crlf");
        let _ = fs::create_dir_all(&dir);
        let path = dir.join("crlf.txt");

        let mut buf = Buffer::from_text("one\r\ntwo\r\n");
        buf.save_as(&path, false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\r\ntwo\r\n");

        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir(&dir);
    }

    #[test]
    fn refuses_to_overwrite_external_edit_without_force() {
        let dir = std::env::temp_dir().join("vee_core_external");
        let _ = fs::create_dir_all(&dir);
        let path = dir.join("guarded.txt");

        let mut buf = Buffer::from_rows(&["ours"]);
        buf.save_as(&path, false).unwrap();

        // Another process touches the file after our sync point.
        std::thread::sleep(std::time::Duration::from_millis(50));
        fs::write(&path, "theirs\n").unwrap();

        buf.insert_text(p(0, 0), "x");
        assert!(matches!(
            buf.save(false),
            Err(FileError::ExternalModification(_))
        ));
        // Forced write goes through and re-syncs.
        assert_eq!(buf.save(true).unwrap(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "xours\n");

        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir(&dir);
    }

    // -- Display name -------------------------------------------------------

    #[test]
    fn display_name_with_and_without_path() {
        let mut buf = Buffer::new();
        assert_eq!(buf.display_name(), "[No Name]");
        buf.set_path(PathBuf::from("/tmp/notes.txt"));
        assert_eq!(buf.display_name(), "notes.txt");
    }

    // -- Line ending detection ---------------------------------------------

    #[test]
    fn detect_line_endings() {
        assert_eq!(LineEnding::detect("a\nb"), LineEnding::Lf);
        assert_eq!(LineEnding::detect("a\r\nb"), LineEnding::CrLf);
        assert_eq!(LineEnding::detect("a\rb"), LineEnding::Cr);
        assert_eq!(LineEnding::detect("plain"), LineEnding::Lf);
    }
}
