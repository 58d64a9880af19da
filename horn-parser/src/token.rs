//! Token definitions for the Prolog tokenizer.

use crate::Span;
use horn_terms::Atom;
use smartstring::alias::String;

/// Punctuation tokens that are not atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    /// `(` preceded by layout.
    Open,
    /// `(` immediately following a name token: functional notation.
    OpenCT,
    Close,
    OpenList,
    CloseList,
    OpenCurly,
    CloseCurly,
    Comma,
    Bar,
}

/// One lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A name: unquoted alphanumeric, graphic, quoted, or solo (`!`, `;`).
    Atom(Atom),
    /// A variable name, including `_`.
    Var(String),
    Int(i64),
    Float(f64),
    /// A double-quoted string, read as a code list by the parser.
    Str(String),
    Punct(Punct),
    /// The end token: `.` followed by layout or end of input.
    End,
    Eof,
}

/// A token plus the position it started at and whether any layout or
/// comment preceded it.  The layout flag disambiguates functional
/// notation (`f(`) and glued negative literals (`-1`).
#[derive(Debug, Clone, PartialEq)]
pub struct Lexed {
    pub token: Token,
    pub span: Span,
    pub layout_before: bool,
}

impl Token {
    /// `true` if this token can begin a term.
    pub fn starts_term(&self) -> bool {
        match self {
            Token::Atom(_) | Token::Var(_) | Token::Int(_) | Token::Float(_) | Token::Str(_) => {
                true
            }
            Token::Punct(p) => matches!(
                p,
                Punct::Open | Punct::OpenCT | Punct::OpenList | Punct::OpenCurly
            ),
            Token::End | Token::Eof => false,
        }
    }
}
