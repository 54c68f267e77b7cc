//! Size-bounded batching of statements.
//!
//! A batch is serialized as every statement followed by `;`, joined with
//! `\n`. A statement ending in a `--` comment gets its `;` on the next line. [`plan_batches`] packs statements greedily into one open batch at a
//! time, closing it as soon as the next statement would push its serialized
//! size over the threshold. A statement that alone exceeds the threshold is
//! never split and becomes a batch of its own.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::splitter::ends_with_line_comment;

/// Terminator appended to every statement of a batch.
const TERMINATOR: &str = ";";
/// Terminator for a statement whose last line is a `--` comment.
const TERMINATOR_AFTER_COMMENT: &str = "\n;";
/// Separator placed between two terminated statements.
const SEPARATOR: char = '\n';

/// The text closing `statement` in a serialized batch.
pub(crate) fn terminator_for(statement: &str) -> &'static str {
    if ends_with_line_comment(statement) {
        TERMINATOR_AFTER_COMMENT
    } else {
        TERMINATOR
    }
}

/// An ordered group of statements submitted in a single request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Batch<'a> {
    statements: Vec<&'a str>,
    size: usize,
}

impl<'a> Batch<'a> {
    /// Bytes `statement` adds to this batch once terminated and separated.
    fn cost_of(&self, statement: &str) -> usize {
        let separator = if self.statements.is_empty() {
            0
        } else {
            SEPARATOR.len_utf8()
        };
        separator + statement.len() + terminator_for(statement).len()
    }

    fn push(&mut self, statement: &'a str) {
        self.size += self.cost_of(statement);
        self.statements.push(statement);
    }

    /// The statements of this batch, in source order, without terminators.
    #[must_use]
    pub fn statements(&self) -> &[&'a str] {
        &self.statements
    }

    /// Number of statements in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Returns true if the batch holds no statement.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Size in bytes of the serialized batch, equal to `self.to_query().len()`.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// The query text sent for this batch.
    #[must_use]
    pub fn to_query(&self) -> String {
        let mut query = String::with_capacity(self.size);
        for (i, statement) in self.statements.iter().enumerate() {
            if i > 0 {
                query.push(SEPARATOR);
            }
            query.push_str(statement);
            query.push_str(terminator_for(statement));
        }
        query
    }
}

impl fmt::Display for Batch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, statement) in self.statements.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            write!(f, "{statement}{}", terminator_for(statement))?;
        }
        Ok(())
    }
}

/// Group statements into batches whose serialized size stays within
/// `max_batch_size` bytes.
///
/// Statement order is preserved both across and within batches. A batch
/// only exceeds the threshold when it holds a single oversized statement.
///
/// # Example
///
/// ```
/// use seed_loader::plan_batches;
///
/// let batches = plan_batches(["SELECT 1", "SELECT 2", "SELECT 3"], 20);
/// assert_eq!(batches.len(), 2);
/// assert_eq!(batches[0].to_query(), "SELECT 1;\nSELECT 2;");
/// assert_eq!(batches[1].to_query(), "SELECT 3;");
/// ```
#[must_use]
pub fn plan_batches<'a, I>(statements: I, max_batch_size: usize) -> Vec<Batch<'a>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut batches = Vec::new();
    let mut current = Batch::default();

    for statement in statements {
        if !current.is_empty() && current.size + current.cost_of(statement) > max_batch_size {
            batches.push(core::mem::take(&mut current));
        }
        current.push(statement);
    }

    if !current.is_empty() {
        batches.push(current);
    }

    batches
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
