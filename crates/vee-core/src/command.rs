//! Ex commands — parsing the `:` line.
//!
//! Grammar: `<range>? <name>[!] [args]`. The range is optional and made of
//! addresses — an absolute 1-based line number, `.` (current row), `$`
//! (last row) — either alone, as an `N,M` pair, or `%` for the whole
//! buffer. A bare range (`:5`, `:$`) is a goto.
//!
//! Substitution gets special treatment because its argument is not
//! whitespace-separated: `s/pat/repl/flags` accepts any non-alphanumeric
//! delimiter, `\<delim>` escapes inside the fields, and a missing tail is
//! tolerated (`:s/foo` deletes the first `foo` on the line).
//!
//! Parsing never fails — unrecognized input becomes [`ExCommand::Unknown`]
//! and the session reports it. Execution lives in the session.

use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Addresses and ranges
// ---------------------------------------------------------------------------

/// One line address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Address {
    /// An absolute row, already converted to 0-based.
    Row(usize),
    /// `.` — the cursor row.
    Current,
    /// `$` — the last row.
    Last,
}

/// The range prefix of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeSpec {
    /// No range given; each command picks its default (usually the cursor
    /// row).
    #[default]
    None,
    /// `%` — every row.
    Whole,
    /// A single address.
    At(Address),
    /// `N,M` — a pair of addresses.
    Span(Address, Address),
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Flags accepted by `:substitute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubstFlags {
    /// `g` — every match on each line, not just the first.
    pub all: bool,
    /// `i` — case-insensitive matching.
    pub ignore_case: bool,
}

/// A parsed ex command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExCommand {
    /// `:w [path]`, `:w! [path]`.
    Write { path: Option<PathBuf>, force: bool },
    /// `:q`, `:q!`.
    Quit { force: bool },
    /// `:wq` / `:x`.
    WriteQuit { force: bool },
    /// `:e[!] path` (path optional: reload).
    Edit { path: Option<PathBuf>, force: bool },
    /// `:r path` — insert a file below the addressed row.
    Read { range: RangeSpec, path: Option<PathBuf> },
    /// `:[range]s/pat/repl/flags`.
    Substitute {
        range: RangeSpec,
        pattern: String,
        replacement: String,
        flags: SubstFlags,
    },
    /// `:[range]s` — repeat the last substitution.
    RepeatSubstitute { range: RangeSpec },
    /// `:[range]d` — delete rows into the unnamed register.
    DeleteRows { range: RangeSpec },
    /// `:[range]y` — yank rows.
    YankRows { range: RangeSpec },
    /// `:[range]pu` — paste the unnamed register below the addressed row.
    Put { range: RangeSpec },
    /// `:set …` (arguments parsed by the options module).
    Set { args: String },
    /// `:u`.
    Undo,
    /// `:redo`.
    Redo,
    /// `:bn`.
    NextBuffer,
    /// `:bp`.
    PrevBuffer,
    /// `:bd[!]`.
    DeleteBuffer { force: bool },
    /// `:ls`.
    ListBuffers,
    /// `:marks`.
    Marks,
    /// `:registers`.
    Registers,
    /// A bare range — move the cursor there (`:5`, `:$`).
    Goto { range: RangeSpec },
    /// Empty input; does nothing.
    Nop,
    /// Anything else, kept verbatim for the error message.
    Unknown(String),
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse one ex-command line (without the leading `:`).
#[must_use]
pub fn parse(input: &str) -> ExCommand {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return ExCommand::Nop;
    }

    let (range, rest) = parse_range(trimmed);
    let rest = rest.trim_start();

    if rest.is_empty() {
        return match range {
            RangeSpec::None => ExCommand::Nop,
            _ => ExCommand::Goto { range },
        };
    }

    // Command name: the leading alphabetic run.
    let name_len = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    let name = &rest[..name_len];
    let tail = &rest[name_len..];

    // Substitution keeps its delimiter in `tail`; everything else takes an
    // optional `!` then whitespace-separated arguments.
    if matches!(name, "s" | "su" | "sub" | "substitute") {
        return parse_substitute(range, tail);
    }

    let (force, tail) = match tail.strip_prefix('!') {
        Some(t) => (true, t),
        None => (false, tail),
    };
    let args = tail.trim();

    match name {
        "w" | "wr" | "write" => ExCommand::Write { path: path_arg(args), force },
        "q" | "qu" | "quit" => ExCommand::Quit { force },
        "wq" | "x" | "xit" | "exit" => ExCommand::WriteQuit { force },
        "e" | "ed" | "edit" => ExCommand::Edit { path: path_arg(args), force },
        "r" | "re" | "read" => ExCommand::Read { range, path: path_arg(args) },
        "d" | "de" | "del" | "delete" => ExCommand::DeleteRows { range },
        "y" | "ya" | "yank" => ExCommand::YankRows { range },
        "pu" | "put" => ExCommand::Put { range },
        "se" | "set" => ExCommand::Set { args: args.to_string() },
        "u" | "un" | "undo" => ExCommand::Undo,
        "red" | "redo" => ExCommand::Redo,
        "bn" | "bnext" => ExCommand::NextBuffer,
        "bp" | "bprev" | "bprevious" => ExCommand::PrevBuffer,
        "bd" | "bdel" | "bdelete" => ExCommand::DeleteBuffer { force },
        "ls" | "buffers" => ExCommand::ListBuffers,
        "marks" => ExCommand::Marks,
        "reg" | "registers" => ExCommand::Registers,
        _ => ExCommand::Unknown(trimmed.to_string()),
    }
}

fn path_arg(args: &str) -> Option<PathBuf> {
    if args.is_empty() {
        None
    } else {
        Some(PathBuf::from(args))
    }
}

/// Parse the range prefix; returns the range and the remaining input.
fn parse_range(input: &str) -> (RangeSpec, &str) {
    if let Some(rest) = input.strip_prefix('%') {
        return (RangeSpec::Whole, rest);
    }
    let Some((first, rest)) = parse_address(input) else {
        return (RangeSpec::None, input);
    };
    if let Some(after_comma) = rest.strip_prefix(',') {
        if let Some((second, rest)) = parse_address(after_comma) {
            return (RangeSpec::Span(first, second), rest);
        }
        // Dangling comma — treat as a single address.
        return (RangeSpec::At(first), rest);
    }
    (RangeSpec::At(first), rest)
}

/// Parse one address from the front of `input`.
fn parse_address(input: &str) -> Option<(Address, &str)> {
    let mut chars = input.chars();
    match chars.next()? {
        '.' => Some((Address::Current, &input[1..])),
        '$' => Some((Address::Last, &input[1..])),
        c if c.is_ascii_digit() => {
            let end = input
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(input.len());
            let n: usize = input[..end].parse().ok()?;
            Some((Address::Row(n.saturating_sub(1)), &input[end..]))
        }
        _ => None,
    }
}

/// Parse the body of `:s` — everything after the command name.
fn parse_substitute(range: RangeSpec, body: &str) -> ExCommand {
    if body.is_empty() {
        return ExCommand::RepeatSubstitute { range };
    }
    let mut chars = body.chars();
    let Some(delim) = chars.next() else {
        return ExCommand::RepeatSubstitute { range };
    };
    if delim.is_alphanumeric() || delim == ' ' {
        // `:something-starting-with-s` that is not a substitution.
        return ExCommand::Unknown(format!("s{body}"));
    }
    let body = &body[delim.len_utf8()..];

    let Some((pattern, rest)) = split_unescaped(body, delim) else {
        // `:s/foo` — pattern only, empty replacement, no flags.
        return ExCommand::Substitute {
            range,
            pattern: unescape(body, delim),
            replacement: String::new(),
            flags: SubstFlags::default(),
        };
    };
    let Some((replacement, rest)) = split_unescaped(rest, delim) else {
        // `:s/foo/bar` — no trailing delimiter, no flags.
        return ExCommand::Substitute {
            range,
            pattern: unescape(pattern, delim),
            replacement: unescape(rest, delim),
            flags: SubstFlags::default(),
        };
    };

    let mut flags = SubstFlags::default();
    for ch in rest.chars() {
        match ch {
            'g' => flags.all = true,
            'i' => flags.ignore_case = true,
            _ => {} // unknown flags ignored
        }
    }
    ExCommand::Substitute {
        range,
        pattern: unescape(pattern, delim),
        replacement: unescape(replacement, delim),
        flags,
    }
}

/// Split at the first occurrence of `delim` not preceded by a backslash.
fn split_unescaped(s: &str, delim: char) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (idx, ch) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == delim {
            return Some((&s[..idx], &s[idx + ch.len_utf8()..]));
        }
    }
    None
}

/// Turn `\<delim>` back into the delimiter; leave other escapes for the
/// regex engine.
fn unescape(s: &str, delim: char) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' && chars.peek() == Some(&delim) {
            out.push(delim);
            chars.next();
        } else {
            out.push(ch);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// The input line
// ---------------------------------------------------------------------------

/// The line being typed after `:`, `/`, or `?`.
///
/// The prompt character is stored but not part of the input; Enter hands
/// the collected text to the ex parser or the search engine depending on
/// the prompt.
#[derive(Debug, Clone)]
pub struct CommandLine {
    prompt: char,
    input: String,
    cursor: usize,
}

impl CommandLine {
    #[must_use]
    pub const fn new(prompt: char) -> Self {
        Self { prompt, input: String::new(), cursor: 0 }
    }

    #[inline]
    #[must_use]
    pub const fn prompt(&self) -> char {
        self.prompt
    }

    #[inline]
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    pub fn insert_char(&mut self, ch: char) {
        let at = self.byte_at(self.cursor);
        self.input.insert(at, ch);
        self.cursor += 1;
    }

    /// Remove the char before the cursor. False when already at the start.
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_at(self.cursor);
        self.input.remove(at);
        true
    }

    pub const fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.input.chars().count() {
            self.cursor += 1;
        }
    }

    pub const fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    fn byte_at(&self, char_idx: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_idx)
            .map_or(self.input.len(), |(b, _)| b)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // -- Ranges -------------------------------------------------------------

    #[test]
    fn whole_range() {
        assert_eq!(
            parse("%d"),
            ExCommand::DeleteRows { range: RangeSpec::Whole }
        );
    }

    #[test]
    fn numeric_pair_is_zero_based() {
        assert_eq!(
            parse("5,10d"),
            ExCommand::DeleteRows {
                range: RangeSpec::Span(Address::Row(4), Address::Row(9))
            }
        );
    }

    #[test]
    fn dot_and_dollar_addresses() {
        assert_eq!(
            parse(".,$y"),
            ExCommand::YankRows {
                range: RangeSpec::Span(Address::Current, Address::Last)
            }
        );
    }

    #[test]
    fn single_address() {
        assert_eq!(
            parse("3d"),
            ExCommand::DeleteRows { range: RangeSpec::At(Address::Row(2)) }
        );
    }

    #[test]
    fn bare_range_is_goto() {
        assert_eq!(
            parse("5"),
            ExCommand::Goto { range: RangeSpec::At(Address::Row(4)) }
        );
        assert_eq!(
            parse("$"),
            ExCommand::Goto { range: RangeSpec::At(Address::Last) }
        );
    }

    // -- Plain commands -----------------------------------------------------

    #[test]
    fn write_variants() {
        assert_eq!(parse("w"), ExCommand::Write { path: None, force: false });
        assert_eq!(parse("w!"), ExCommand::Write { path: None, force: true });
        assert_eq!(
            parse("w out.txt"),
            ExCommand::Write { path: Some(PathBuf::from("out.txt")), force: false }
        );
        assert_eq!(parse("write"), ExCommand::Write { path: None, force: false });
    }

    #[test]
    fn quit_variants() {
        assert_eq!(parse("q"), ExCommand::Quit { force: false });
        assert_eq!(parse("q!"), ExCommand::Quit { force: true });
        assert_eq!(parse("quit"), ExCommand::Quit { force: false });
        assert_eq!(parse("wq"), ExCommand::WriteQuit { force: false });
        assert_eq!(parse("x"), ExCommand::WriteQuit { force: false });
    }

    #[test]
    fn edit_and_read() {
        assert_eq!(
            parse("e notes.txt"),
            ExCommand::Edit { path: Some(PathBuf::from("notes.txt")), force: false }
        );
        assert_eq!(
            parse("e! notes.txt"),
            ExCommand::Edit { path: Some(PathBuf::from("notes.txt")), force: true }
        );
        assert_eq!(
            parse("r extra.txt"),
            ExCommand::Read { range: RangeSpec::None, path: Some(PathBuf::from("extra.txt")) }
        );
        assert_eq!(
            parse("3r extra.txt"),
            ExCommand::Read {
                range: RangeSpec::At(Address::Row(2)),
                path: Some(PathBuf::from("extra.txt"))
            }
        );
    }

    #[test]
    fn small_commands() {
        assert_eq!(parse("u"), ExCommand::Undo);
        assert_eq!(parse("undo"), ExCommand::Undo);
        assert_eq!(parse("redo"), ExCommand::Redo);
        assert_eq!(parse("bn"), ExCommand::NextBuffer);
        assert_eq!(parse("bp"), ExCommand::PrevBuffer);
        assert_eq!(parse("bd"), ExCommand::DeleteBuffer { force: false });
        assert_eq!(parse("bd!"), ExCommand::DeleteBuffer { force: true });
        assert_eq!(parse("ls"), ExCommand::ListBuffers);
        assert_eq!(parse("marks"), ExCommand::Marks);
        assert_eq!(parse("registers"), ExCommand::Registers);
        assert_eq!(parse("set number"), ExCommand::Set { args: "number".into() });
    }

    #[test]
    fn put_command() {
        assert_eq!(parse("pu"), ExCommand::Put { range: RangeSpec::None });
        assert_eq!(
            parse("3put"),
            ExCommand::Put { range: RangeSpec::At(Address::Row(2)) }
        );
    }

    #[test]
    fn empty_and_unknown() {
        assert_eq!(parse(""), ExCommand::Nop);
        assert_eq!(parse("   "), ExCommand::Nop);
        assert_eq!(parse("frobnicate"), ExCommand::Unknown("frobnicate".into()));
    }

    // -- Substitution -------------------------------------------------------

    #[test]
    fn substitute_full_form() {
        assert_eq!(
            parse("%s/foo/bar/g"),
            ExCommand::Substitute {
                range: RangeSpec::Whole,
                pattern: "foo".into(),
                replacement: "bar".into(),
                flags: SubstFlags { all: true, ignore_case: false },
            }
        );
    }

    #[test]
    fn substitute_flags() {
        let ExCommand::Substitute { flags, .. } = parse("s/a/b/gi") else {
            panic!("expected substitute");
        };
        assert!(flags.all);
        assert!(flags.ignore_case);
    }

    #[test]
    fn substitute_defaults_to_cursor_row() {
        assert_eq!(
            parse("s/foo/bar/"),
            ExCommand::Substitute {
                range: RangeSpec::None,
                pattern: "foo".into(),
                replacement: "bar".into(),
                flags: SubstFlags::default(),
            }
        );
    }

    #[test]
    fn substitute_missing_tail() {
        assert_eq!(
            parse("s/foo"),
            ExCommand::Substitute {
                range: RangeSpec::None,
                pattern: "foo".into(),
                replacement: String::new(),
                flags: SubstFlags::default(),
            }
        );
        assert_eq!(
            parse("s/foo/bar"),
            ExCommand::Substitute {
                range: RangeSpec::None,
                pattern: "foo".into(),
                replacement: "bar".into(),
                flags: SubstFlags::default(),
            }
        );
    }

    #[test]
    fn substitute_alternate_delimiter() {
        assert_eq!(
            parse("s#a/b#c#g"),
            ExCommand::Substitute {
                range: RangeSpec::None,
                pattern: "a/b".into(),
                replacement: "c".into(),
                flags: SubstFlags { all: true, ignore_case: false },
            }
        );
    }

    #[test]
    fn substitute_escaped_delimiter() {
        assert_eq!(
            parse(r"s/a\/b/c/"),
            ExCommand::Substitute {
                range: RangeSpec::None,
                pattern: "a/b".into(),
                replacement: "c".into(),
                flags: SubstFlags::default(),
            }
        );
    }

    #[test]
    fn bare_s_repeats() {
        assert_eq!(parse("s"), ExCommand::RepeatSubstitute { range: RangeSpec::None });
        assert_eq!(parse("%s"), ExCommand::RepeatSubstitute { range: RangeSpec::Whole });
    }

    #[test]
    fn set_is_not_a_substitution() {
        assert_eq!(parse("set ignorecase"), ExCommand::Set { args: "ignorecase".into() });
    }

    #[test]
    fn ranged_substitute() {
        assert_eq!(
            parse("2,4s/x/y/"),
            ExCommand::Substitute {
                range: RangeSpec::Span(Address::Row(1), Address::Row(3)),
                pattern: "x".into(),
                replacement: "y".into(),
                flags: SubstFlags::default(),
            }
        );
    }

    // -- CommandLine --------------------------------------------------------

    #[test]
    fn command_line_editing() {
        let mut cl = CommandLine::new(':');
        assert_eq!(cl.prompt(), ':');
        for ch in "wq".chars() {
            cl.insert_char(ch);
        }
        assert_eq!(cl.input(), "wq");
        assert!(cl.backspace());
        assert_eq!(cl.input(), "w");
        assert!(cl.backspace());
        assert!(!cl.backspace());
        assert!(cl.is_empty());
    }

    #[test]
    fn command_line_cursor_motion() {
        let mut cl = CommandLine::new('/');
        for ch in "abc".chars() {
            cl.insert_char(ch);
        }
        cl.move_home();
        cl.insert_char('0');
        assert_eq!(cl.input(), "0abc");
        cl.move_end();
        cl.move_left();
        cl.insert_char('x');
        assert_eq!(cl.input(), "0abxc");
        cl.move_right();
        assert_eq!(cl.cursor(), 5);
    }

    #[test]
    fn command_line_unicode() {
        let mut cl = CommandLine::new(':');
        cl.insert_char('é');
        cl.insert_char('b');
        cl.move_left();
        cl.move_left();
        cl.insert_char('a');
        assert_eq!(cl.input(), "aéb");
    }
}
