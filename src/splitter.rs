//! Quote-aware SQL statement splitter.
//!
//! The splitter walks the script once, left to right, with a single byte of
//! lookahead. It tracks whether it is inside a single-quoted string literal
//! so that semicolons and `--` markers inside literals are not mistaken for
//! statement terminators or comments. Line comments are kept as part of the
//! statement text; the [`is_meaningful`] post-filter removes statements that
//! consist of comments only.
//!
//! Statements are returned as slices of the input, trimmed of surrounding
//! whitespace and without their terminating semicolon.

use alloc::vec::Vec;

/// Scanner state between two bytes of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Outside of any string literal.
    Normal,
    /// Inside a single-quoted string literal.
    InQuotedString,
}

/// What the scanner does with the bytes at the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// The next `n` bytes belong to the current statement.
    Consume(usize),
    /// The byte at the current position is a top-level semicolon.
    EndStatement,
}

impl ScanState {
    /// Decide the next state from the remaining, non-empty input.
    fn transition(self, rest: &[u8]) -> (Self, Action) {
        match (self, rest) {
            (Self::Normal, [b'\'', ..]) => (Self::InQuotedString, Action::Consume(1)),
            (Self::Normal, [b';', ..]) => (Self::Normal, Action::EndStatement),
            (Self::Normal, [b'-', b'-', ..]) => {
                let comment_len = rest
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(rest.len(), |newline| newline + 1);
                (Self::Normal, Action::Consume(comment_len))
            }
            // Escaped quote: `''` stays inside the literal.
            (Self::InQuotedString, [b'\'', b'\'', ..]) => {
                (Self::InQuotedString, Action::Consume(2))
            }
            (Self::InQuotedString, [b'\'', ..]) => (Self::Normal, Action::Consume(1)),
            (state, _) => (state, Action::Consume(1)),
        }
    }
}

/// Iterator over the raw statements of a SQL script.
///
/// Raw statements may still be comment-only; see [`is_meaningful`].
///
/// # Example
///
/// ```
/// use seed_loader::Splitter;
///
/// let statements: Vec<&str> =
///     Splitter::new("INSERT INTO t VALUES ('a;b'); SELECT 'it''s fine'").collect();
/// assert_eq!(statements, ["INSERT INTO t VALUES ('a;b')", "SELECT 'it''s fine'"]);
/// ```
#[derive(Debug, Clone)]
pub struct Splitter<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Splitter<'a> {
    /// Create a new splitter over the given script.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Byte offset where the next statement scan starts.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Scan one statement starting at the current position.
    ///
    /// Returns the untrimmed statement text. Every slice boundary is either
    /// the start or end of the input or an ASCII semicolon, so slicing never
    /// splits a multi-byte character.
    fn scan_statement(&mut self) -> &'a str {
        let input = self.input;
        let bytes = input.as_bytes();
        let start = self.pos;
        let mut state = ScanState::Normal;

        while self.pos < bytes.len() {
            let (next, action) = state.transition(&bytes[self.pos..]);
            state = next;
            match action {
                Action::Consume(n) => self.pos = (self.pos + n).min(bytes.len()),
                Action::EndStatement => {
                    let end = self.pos;
                    self.pos += 1;
                    return &input[start..end];
                }
            }
        }

        // End of input: a missing trailing semicolon or an unterminated
        // string literal both flush whatever was accumulated.
        &input[start..]
    }
}

impl<'a> Iterator for Splitter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.input.len() {
            let statement = self.scan_statement().trim();
            if !statement.is_empty() {
                return Some(statement);
            }
        }
        None
    }
}

impl core::iter::FusedIterator for Splitter<'_> {}

/// Split a script into its raw statements, in source order.
///
/// Comment-only statements are still present; use [`meaningful_statements`]
/// to drop them.
#[must_use]
pub fn split_statements(sql: &str) -> Vec<&str> {
    Splitter::new(sql).collect()
}

/// Returns whether a statement has at least one line that is neither blank
/// nor a `--` line comment.
#[must_use]
pub fn is_meaningful(statement: &str) -> bool {
    statement
        .lines()
        .map(str::trim)
        .any(|line| !line.is_empty() && !line.starts_with("--"))
}

/// Split a script and keep only the statements that carry SQL.
#[must_use]
pub fn meaningful_statements(sql: &str) -> Vec<&str> {
    Splitter::new(sql).filter(|stmt| is_meaningful(stmt)).collect()
}

/// Returns whether a statement ends inside a `--` line comment.
///
/// Such a statement must be terminated on a new line, otherwise the
/// terminator would be commented out. Dashes inside string literals do not
/// count.
#[must_use]
pub fn ends_with_line_comment(statement: &str) -> bool {
    let bytes = statement.as_bytes();
    let mut state = ScanState::Normal;
    let mut pos = 0;

    while pos < bytes.len() {
        let rest = &bytes[pos..];
        let (next, action) = state.transition(rest);
        let step = match action {
            Action::Consume(n) => n,
            Action::EndStatement => 1,
        };
        if state == ScanState::Normal
            && rest.starts_with(b"--")
            && step >= rest.len()
            && !rest.ends_with(b"\n")
        {
            return true;
        }
        state = next;
        pos += step;
    }
    false
}
