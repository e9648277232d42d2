//! Registers — where deleted and yanked text lives.
//!
//! Every delete and yank writes the **unnamed** register; `p`/`P` and
//! `:put` read from it by default. Named registers `"a`–`"z` hold text the
//! user routes there explicitly; uppercase names append to the lowercase
//! slot instead of overwriting. Writes are last-write-wins per key.
//!
//! Each slot remembers how its text was captured, because paste behaves
//! differently for the two kinds:
//!
//! - **char-wise** — pasted inline at the cursor;
//! - **line-wise** — pasted as whole rows below/above the cursor row.

use std::collections::HashMap;

/// How register text was captured; decides paste placement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegisterKind {
    #[default]
    Char,
    Line,
}

/// One register slot.
#[derive(Debug, Clone, Default)]
pub struct Register {
    text: String,
    kind: RegisterKind,
}

impl Register {
    #[must_use]
    pub fn new(text: String, kind: RegisterKind) -> Self {
        Self { text, kind }
    }

    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> RegisterKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Append more text. Mixing in line-wise content promotes the slot to
    /// line-wise, separating the halves with a newline.
    fn append(&mut self, text: &str, kind: RegisterKind) {
        if kind == RegisterKind::Line || self.kind == RegisterKind::Line {
            if !self.text.is_empty() && !self.text.ends_with('\n') {
                self.text.push('\n');
            }
            self.kind = RegisterKind::Line;
        }
        self.text.push_str(text);
    }
}

/// The full register set: unnamed plus named `a`–`z`.
#[derive(Debug, Default)]
pub struct RegisterFile {
    unnamed: Register,
    named: HashMap<char, Register>,
}

impl RegisterFile {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store text.
    ///
    /// - `None` — unnamed only (the default for every delete/yank);
    /// - `Some('a'..='z')` — overwrite the named slot and mirror to unnamed;
    /// - `Some('A'..='Z')` — append to the lowercase slot, mirroring the
    ///   full result to unnamed.
    ///
    /// Any other name falls back to unnamed.
    pub fn store(&mut self, name: Option<char>, text: String, kind: RegisterKind) {
        match name {
            Some(ch) if ch.is_ascii_lowercase() => {
                self.named.insert(ch, Register::new(text.clone(), kind));
                self.unnamed = Register::new(text, kind);
            }
            Some(ch) if ch.is_ascii_uppercase() => {
                let slot = self
                    .named
                    .entry(ch.to_ascii_lowercase())
                    .or_default();
                slot.append(&text, kind);
                self.unnamed = slot.clone();
            }
            _ => self.unnamed = Register::new(text, kind),
        }
    }

    /// Read a register. `None` reads unnamed; uppercase names read their
    /// lowercase slot; unknown names fall back to unnamed.
    #[must_use]
    pub fn read(&self, name: Option<char>) -> &Register {
        match name {
            Some(ch) if ch.is_ascii_alphabetic() => self
                .named
                .get(&ch.to_ascii_lowercase())
                .unwrap_or(&self.unnamed),
            _ => &self.unnamed,
        }
    }

    /// Non-empty registers for the `:registers` listing, unnamed first then
    /// named in alphabetical order.
    #[must_use]
    pub fn listing(&self) -> Vec<(char, &Register)> {
        let mut out = Vec::new();
        if !self.unnamed.is_empty() {
            out.push(('"', &self.unnamed));
        }
        let mut names: Vec<char> = self
            .named
            .iter()
            .filter(|(_, r)| !r.is_empty())
            .map(|(&ch, _)| ch)
            .collect();
        names.sort_unstable();
        for ch in names {
            out.push((ch, &self.named[&ch]));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
