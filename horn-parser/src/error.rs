//! Defines [`ReadError`], the unified error type for the reader.

use smartstring::alias::String;
use thiserror::Error;

/// A source position, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// All errors the tokenizer and parser can produce.
///
/// `Syntax` carries a human-readable detail used verbatim as the
/// argument of the engine's `syntax_error/1`; `Incomplete` marks input
/// that ended in the middle of a term, which interactive callers may
/// treat as "read more input".
#[derive(Debug, Clone, Error)]
pub enum ReadError {
    #[error("syntax error at {}:{}: {detail}", span.line, span.column)]
    Syntax { detail: String, span: Span },

    #[error("unexpected end of input")]
    Incomplete,
}

impl ReadError {
    /// Construct a syntax error at the given position.
    pub fn syntax(detail: impl AsRef<str>, span: Span) -> Self {
        Self::Syntax {
            detail: String::from(detail.as_ref()),
            span,
        }
    }

    /// The detail message, as handed to `syntax_error/1`.
    pub fn detail(&self) -> &str {
        match self {
            Self::Syntax { detail, .. } => detail,
            Self::Incomplete => "unexpected end of input",
        }
    }
}
