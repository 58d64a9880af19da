//! Tokenizer for Prolog source text.
//!
//! Pulls characters one at a time from a [`CharSource`], so the same
//! tokenizer serves in-memory strings and open input streams: reading
//! one term consumes exactly the characters of that term through its
//! end dot.  Handles unquoted, quoted, graphic and solo atoms,
//! variables, integers in all ISO radix notations, floats, strings,
//! comments, and the character-conversion mapping.

use crate::{Lexed, Punct, ReadError, Span, Token};
use horn_terms::Atom;
use smartstring::alias::String;
use std::collections::HashMap;
use std::collections::VecDeque;

/// A pull source of characters.
///
/// Implemented by [`StrSource`] for in-memory text; stream owners
/// implement it with a closure reading one character at a time.
pub trait CharSource {
    /// Produce the next character, or `None` at end of input.
    fn next_char(&mut self) -> Option<char>;
}

/// A [`CharSource`] over an in-memory string.
pub struct StrSource<'a> {
    chars: std::str::Chars<'a>,
}

impl<'a> StrSource<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars(),
        }
    }
}

impl CharSource for StrSource<'_> {
    #[inline]
    fn next_char(&mut self) -> Option<char> {
        self.chars.next()
    }
}

impl<S: CharSource + ?Sized> CharSource for &mut S {
    #[inline]
    fn next_char(&mut self) -> Option<char> {
        (**self).next_char()
    }
}

/// Adapts a closure producing characters into a [`CharSource`]; this
/// is how open input streams feed the tokenizer.
pub struct FnSource<F>(pub F);

impl<F: FnMut() -> Option<char>> CharSource for FnSource<F> {
    #[inline]
    fn next_char(&mut self) -> Option<char> {
        (self.0)()
    }
}

/// The tokenizer.
///
/// `conv` is the runtime character-conversion map; it applies to every
/// character outside quoted tokens when enabled.
pub struct Lexer<S: CharSource> {
    src: S,
    pending: VecDeque<char>,
    conv: Option<HashMap<char, char>>,
    line: usize,
    column: usize,
}

impl<S: CharSource> Lexer<S> {
    /// Create a tokenizer over `src` with no character conversion.
    pub fn new(src: S) -> Self {
        Self {
            src,
            pending: VecDeque::new(),
            conv: None,
            line: 1,
            column: 1,
        }
    }

    /// Apply the given character-conversion map to unquoted characters.
    pub fn with_conv(mut self, conv: HashMap<char, char>) -> Self {
        self.set_conv(Some(conv));
        self
    }

    /// Install or clear the character-conversion map; the table may
    /// change between two terms of the same source.
    pub fn set_conv(&mut self, conv: Option<HashMap<char, char>>) {
        self.conv = conv;
    }

    /// Current position, for error reporting.
    pub fn span(&self) -> Span {
        Span::new(self.line, self.column)
    }

    /// Surrender the characters read ahead of the last token produced.
    /// Callers feeding the tokenizer from a stream push these back so
    /// the stream position stays exactly after the consumed input.
    pub fn take_pending(&mut self) -> Vec<char> {
        self.pending.drain(..).collect()
    }

    fn fill(&mut self, n: usize) {
        while self.pending.len() < n {
            match self.src.next_char() {
                Some(c) => self.pending.push_back(c),
                None => break,
            }
        }
    }

    /// Peek `n` characters ahead without consuming, raw.
    fn peek_at(&mut self, n: usize) -> Option<char> {
        self.fill(n + 1);
        self.pending.get(n).copied()
    }

    fn peek(&mut self) -> Option<char> {
        self.peek_at(0)
    }

    /// Peek with character conversion applied.
    fn peek_conv(&mut self) -> Option<char> {
        self.peek().map(|c| self.convert(c))
    }

    fn convert(&self, c: char) -> char {
        match &self.conv {
            Some(map) => map.get(&c).copied().unwrap_or(c),
            None => c,
        }
    }

    /// Consume and return the next raw character.
    fn bump(&mut self) -> Option<char> {
        self.fill(1);
        let c = self.pending.pop_front()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Consume and return the next character, converted.
    fn bump_conv(&mut self) -> Option<char> {
        self.bump().map(|c| self.convert(c))
    }

    /// Skip layout and comments; `true` if anything was skipped.
    fn skip_layout(&mut self) -> Result<bool, ReadError> {
        let mut skipped = false;
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                    skipped = true;
                }
                Some('%') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                    skipped = true;
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let start = self.span();
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => {
                                return Err(ReadError::syntax("unterminated block comment", start))
                            }
                        }
                    }
                    skipped = true;
                }
                _ => return Ok(skipped),
            }
        }
    }

    /// Produce the next token.
    pub fn next_token(&mut self) -> Result<Lexed, ReadError> {
        let layout_before = self.skip_layout()?;
        let span = self.span();
        let lexed = |token| Lexed {
            token,
            span,
            layout_before,
        };

        let Some(c) = self.peek_conv() else {
            return Ok(lexed(Token::Eof));
        };

        let token = match c {
            '(' => {
                self.bump();
                Token::Punct(if layout_before {
                    Punct::Open
                } else {
                    Punct::OpenCT
                })
            }
            ')' => {
                self.bump();
                Token::Punct(Punct::Close)
            }
            '[' => {
                self.bump();
                Token::Punct(Punct::OpenList)
            }
            ']' => {
                self.bump();
                Token::Punct(Punct::CloseList)
            }
            '{' => {
                self.bump();
                Token::Punct(Punct::OpenCurly)
            }
            '}' => {
                self.bump();
                Token::Punct(Punct::CloseCurly)
            }
            ',' => {
                self.bump();
                Token::Punct(Punct::Comma)
            }
            '|' => {
                self.bump();
                Token::Punct(Punct::Bar)
            }
            '!' | ';' => {
                self.bump();
                Token::Atom(Atom::new(c.to_string()))
            }
            '\'' => {
                self.bump();
                Token::Atom(Atom::from(self.read_quoted('\'', span)?))
            }
            '"' => {
                self.bump();
                Token::Str(self.read_quoted('"', span)?)
            }
            c if c.is_ascii_digit() => self.read_number(span)?,
            c if c.is_ascii_uppercase() || c == '_' => {
                let name = self.read_name();
                Token::Var(name)
            }
            c if c.is_alphanumeric() && !c.is_uppercase() => {
                let name = self.read_name();
                Token::Atom(Atom::from(name))
            }
            c if is_graphic(c) => self.read_graphic(span)?,
            other => {
                return Err(ReadError::syntax(
                    format!("unexpected character {other:?}"),
                    span,
                ))
            }
        };
        Ok(Lexed {
            token,
            span,
            layout_before,
        })
    }

    /// An alphanumeric run: an unquoted atom or a variable name.
    fn read_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek_conv() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.bump_conv();
            } else {
                break;
            }
        }
        name
    }

    /// A run of graphic characters: a symbolic atom or the end token.
    fn read_graphic(&mut self, span: Span) -> Result<Token, ReadError> {
        let mut name = String::new();
        while let Some(c) = self.peek_conv() {
            if is_graphic(c) {
                name.push(c);
                self.bump_conv();
            } else {
                break;
            }
        }
        if name == "." {
            // a dot followed by layout, a comment, or nothing ends a term
            match self.peek() {
                None => return Ok(Token::End),
                Some(c) if c.is_whitespace() || c == '%' => return Ok(Token::End),
                _ => {}
            }
        }
        if name.is_empty() {
            return Err(ReadError::syntax("expected a symbolic atom", span));
        }
        Ok(Token::Atom(Atom::from(name)))
    }

    /// Integer and float literals: decimal, `0x`/`0o`/`0b` radix
    /// notation, `0'c` character codes, and floats with an optional
    /// exponent.
    fn read_number(&mut self, span: Span) -> Result<Token, ReadError> {
        let mut digits = String::new();
        digits.push(self.bump_conv().expect("digit present"));

        if digits == "0" {
            match self.peek_conv() {
                Some('\'') => {
                    self.bump();
                    let code = self.read_char_code(span)?;
                    return Ok(Token::Int(code as i64));
                }
                Some('x') => {
                    self.bump();
                    return self.read_radix(16, span);
                }
                Some('o') => {
                    self.bump();
                    return self.read_radix(8, span);
                }
                Some('b') => {
                    self.bump();
                    return self.read_radix(2, span);
                }
                _ => {}
            }
        }

        while let Some(c) = self.peek_conv() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.bump_conv();
            } else {
                break;
            }
        }

        // a float requires a digit right after the dot
        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            digits.push('.');
            self.bump();
            while let Some(c) = self.peek_conv() {
                if c.is_ascii_digit() {
                    digits.push(c);
                    self.bump_conv();
                } else {
                    break;
                }
            }
        }
        if matches!(self.peek_conv(), Some('e' | 'E')) {
            let exp_digit_at = match self.peek_at(1) {
                Some('+') | Some('-') => 2,
                _ => 1,
            };
            if self.peek_at(exp_digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                digits.push(self.bump_conv().expect("exponent marker"));
                if matches!(self.peek(), Some('+') | Some('-')) {
                    digits.push(self.bump().expect("exponent sign"));
                }
                while let Some(c) = self.peek_conv() {
                    if c.is_ascii_digit() {
                        digits.push(c);
                        self.bump_conv();
                    } else {
                        break;
                    }
                }
            }
        }

        if is_float {
            digits
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| ReadError::syntax("malformed float", span))
        } else {
            digits
                .parse::<i64>()
                .map(Token::Int)
                .map_err(|_| ReadError::syntax("integer out of range", span))
        }
    }

    fn read_radix(&mut self, radix: u32, span: Span) -> Result<Token, ReadError> {
        let mut digits = String::new();
        while let Some(c) = self.peek_conv() {
            if c.is_digit(radix) {
                digits.push(c);
                self.bump_conv();
            } else {
                break;
            }
        }
        if digits.is_empty() {
            return Err(ReadError::syntax("missing digits after radix prefix", span));
        }
        i64::from_str_radix(&digits, radix)
            .map(Token::Int)
            .map_err(|_| ReadError::syntax("integer out of range", span))
    }

    /// The character of a `0'c` literal.  `0'''` is the quote itself.
    fn read_char_code(&mut self, span: Span) -> Result<char, ReadError> {
        match self.bump() {
            Some('\'') => {
                if self.peek() == Some('\'') {
                    self.bump();
                    Ok('\'')
                } else {
                    Err(ReadError::syntax("bad character code literal", span))
                }
            }
            Some('\\') => self
                .read_escape(span)?
                .ok_or_else(|| ReadError::syntax("bad escape in character code", span)),
            Some(c) => Ok(c),
            None => Err(ReadError::Incomplete),
        }
    }

    /// The body of a quoted atom or string, after the opening quote.
    /// Character conversion does not apply inside quotes.
    fn read_quoted(&mut self, quote: char, span: Span) -> Result<String, ReadError> {
        let mut text = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        self.bump();
                        text.push(quote);
                    } else {
                        return Ok(text);
                    }
                }
                Some('\\') => {
                    if let Some(c) = self.read_escape(span)? {
                        text.push(c);
                    }
                }
                Some('\n') => {
                    return Err(ReadError::syntax("newline in quoted token", span));
                }
                Some(c) => text.push(c),
                None => return Err(ReadError::Incomplete),
            }
        }
    }

    /// An escape sequence after a backslash.  `None` for a line
    /// continuation, which contributes no character.
    fn read_escape(&mut self, span: Span) -> Result<Option<char>, ReadError> {
        match self.bump() {
            Some('n') => Ok(Some('\n')),
            Some('t') => Ok(Some('\t')),
            Some('r') => Ok(Some('\r')),
            Some('a') => Ok(Some('\x07')),
            Some('b') => Ok(Some('\x08')),
            Some('f') => Ok(Some('\x0c')),
            Some('v') => Ok(Some('\x0b')),
            Some('\\') => Ok(Some('\\')),
            Some('\'') => Ok(Some('\'')),
            Some('"') => Ok(Some('"')),
            Some('`') => Ok(Some('`')),
            Some('\n') => Ok(None),
            Some('x') => {
                let mut digits = String::new();
                while let Some(c) = self.peek() {
                    if c.is_ascii_hexdigit() {
                        digits.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                if self.bump() != Some('\\') {
                    return Err(ReadError::syntax("unterminated \\x escape", span));
                }
                code_to_char(u32::from_str_radix(&digits, 16).ok(), span).map(Some)
            }
            Some(c) if c.is_digit(8) => {
                let mut digits = String::new();
                digits.push(c);
                while let Some(c) = self.peek() {
                    if c.is_digit(8) {
                        digits.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                if self.bump() != Some('\\') {
                    return Err(ReadError::syntax("unterminated octal escape", span));
                }
                code_to_char(u32::from_str_radix(&digits, 8).ok(), span).map(Some)
            }
            Some(other) => Err(ReadError::syntax(
                format!("unknown escape \\{other}"),
                span,
            )),
            None => Err(ReadError::Incomplete),
        }
    }
}

fn code_to_char(code: Option<u32>, span: Span) -> Result<char, ReadError> {
    code.and_then(char::from_u32)
        .ok_or_else(|| ReadError::syntax("character code out of range", span))
}

/// The graphic characters that may form unquoted symbolic atoms.
pub(crate) fn is_graphic(c: char) -> bool {
    "#$&*+-./:<=>?@^~\\".contains(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(StrSource::new(text));
        let mut out = Vec::new();
        loop {
            let t = lexer.next_token().unwrap().token;
            let done = t == Token::Eof;
            out.push(t);
            if done {
                return out;
            }
        }
    }

    #[test]
    fn simple_clause() {
        assert_eq!(
            tokens("foo(X)."),
            vec![
                Token::Atom(Atom::new("foo")),
                Token::Punct(Punct::OpenCT),
                Token::Var("X".into()),
                Token::Punct(Punct::Close),
                Token::End,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn open_ct_requires_adjacency() {
        let mut lexer = Lexer::new(StrSource::new("f (x)"));
        assert_eq!(lexer.next_token().unwrap().token, Token::Atom(Atom::new("f")));
        assert_eq!(lexer.next_token().unwrap().token, Token::Punct(Punct::Open));
    }

    #[test]
    fn graphic_atoms_and_end() {
        assert_eq!(
            tokens("X =.. Y."),
            vec![
                Token::Var("X".into()),
                Token::Atom(Atom::new("=..")),
                Token::Var("Y".into()),
                Token::End,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn dot_inside_graphic_run_is_an_atom() {
        let ts = tokens("a .(b). ");
        assert_eq!(ts[1], Token::Atom(Atom::new(".")));
    }

    #[test]
    fn numbers() {
        assert_eq!(tokens("42. ")[0], Token::Int(42));
        assert_eq!(tokens("0xff. ")[0], Token::Int(255));
        assert_eq!(tokens("0o17. ")[0], Token::Int(15));
        assert_eq!(tokens("0b101. ")[0], Token::Int(5));
        assert_eq!(tokens("0'a. ")[0], Token::Int('a' as i64));
        assert_eq!(tokens("0'''. ")[0], Token::Int('\'' as i64));
        assert_eq!(tokens("0'\\n. ")[0], Token::Int(10));
        assert_eq!(tokens("1.5. ")[0], Token::Float(1.5));
        assert_eq!(tokens("1.0e3. ")[0], Token::Float(1000.0));
        assert_eq!(tokens("2e8. ")[0], Token::Float(2e8));
    }

    #[test]
    fn integer_then_end_dot() {
        assert_eq!(tokens("1."), vec![Token::Int(1), Token::End, Token::Eof]);
    }

    #[test]
    fn quoted_atom_with_escapes() {
        assert_eq!(
            tokens("'hello\\nworld'. ")[0],
            Token::Atom(Atom::new("hello\nworld"))
        );
        assert_eq!(tokens("'it''s'. ")[0], Token::Atom(Atom::new("it's")));
        assert_eq!(tokens("'\\x41\\'. ")[0], Token::Atom(Atom::new("A")));
        assert_eq!(tokens("'\\101\\'. ")[0], Token::Atom(Atom::new("A")));
    }

    #[test]
    fn double_quoted_string() {
        assert_eq!(tokens("\"ab\". ")[0], Token::Str("ab".into()));
    }

    #[test]
    fn comments_are_layout() {
        assert_eq!(
            tokens("a % line\n /* block */ b. "),
            vec![
                Token::Atom(Atom::new("a")),
                Token::Atom(Atom::new("b")),
                Token::End,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn char_conversion_applies_outside_quotes() {
        let mut conv = HashMap::new();
        conv.insert('a', 'b');
        let mut lexer = Lexer::new(StrSource::new("a 'a'")).with_conv(conv);
        assert_eq!(lexer.next_token().unwrap().token, Token::Atom(Atom::new("b")));
        assert_eq!(lexer.next_token().unwrap().token, Token::Atom(Atom::new("a")));
    }

    #[test]
    fn unterminated_quote_is_incomplete() {
        let mut lexer = Lexer::new(StrSource::new("'abc"));
        assert!(matches!(
            lexer.next_token(),
            Err(ReadError::Incomplete)
        ));
    }
}
