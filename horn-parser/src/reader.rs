//! The term reader: an operator-precedence parser over the tokenizer.
//!
//! A [`Reader`] parses exactly one term (through its end dot) against a
//! runtime [`OperTab`], which is why the parser is hand-driven rather
//! than table-generated: `op/3` can change the grammar between two
//! consecutive terms of the same source.  Variables are scoped to the
//! term being read and reported back with their names and singleton
//! status.

use crate::{CharSource, Lexed, Lexer, Punct, ReadError, Token};
use horn_terms::{Atom, OperTab, Term, Var, ARG_PRIORITY, MAX_OPER_PRIORITY};
use smartstring::alias::String;

/// The result of reading one term.
#[derive(Debug)]
pub struct ReadOut {
    /// The term itself.
    pub term: Term,
    /// Every variable of the term in first-occurrence order, anonymous
    /// ones included.
    pub variables: Vec<Var>,
    /// `Name = Var` pairs for the named variables.
    pub variable_names: Vec<(String, Var)>,
    /// The named variables that occur exactly once.
    pub singletons: Vec<(String, Var)>,
}

struct VarEntry {
    name: String,
    var: Var,
    count: usize,
}

/// Parses one term from a borrowed tokenizer.
///
/// Borrowing the tokenizer lets a caller keep its character pipeline
/// alive across terms: a program loader reads clause after clause from
/// one [`Lexer`], re-creating only the cheap `Reader` when the
/// operator table has changed in between.
pub struct Reader<'r, S: CharSource> {
    lexer: &'r mut Lexer<S>,
    ops: &'r OperTab,
    lookahead: Option<Lexed>,
    occurrences: Vec<Var>,
    named: Vec<VarEntry>,
}

impl<'r, S: CharSource> Reader<'r, S> {
    /// Create a reader over `lexer` using the operator table `ops`.
    pub fn new(lexer: &'r mut Lexer<S>, ops: &'r OperTab) -> Self {
        Self {
            lexer,
            ops,
            lookahead: None,
            occurrences: Vec::new(),
            named: Vec::new(),
        }
    }

    /// Read one term through its end dot.  `Ok(None)` at end of input.
    pub fn read_term(mut self) -> Result<Option<ReadOut>, ReadError> {
        if self.peek()?.token == Token::Eof {
            return Ok(None);
        }
        let term = self.parse(MAX_OPER_PRIORITY as u16)?;
        let end = self.next()?;
        match end.token {
            Token::End => {}
            Token::Eof => return Err(ReadError::Incomplete),
            ref other => {
                return Err(ReadError::syntax(
                    format!("operator expected before {other:?}"),
                    end.span,
                ))
            }
        }
        let singletons = self
            .named
            .iter()
            .filter(|e| e.count == 1)
            .map(|e| (e.name.clone(), e.var.clone()))
            .collect();
        let variable_names = self
            .named
            .iter()
            .map(|e| (e.name.clone(), e.var.clone()))
            .collect();
        Ok(Some(ReadOut {
            term,
            variables: self.occurrences,
            variable_names,
            singletons,
        }))
    }

    fn peek(&mut self) -> Result<&Lexed, ReadError> {
        if self.lookahead.is_none() {
            self.lookahead = Some(self.lexer.next_token()?);
        }
        Ok(self.lookahead.as_ref().expect("lookahead just filled"))
    }

    fn next(&mut self) -> Result<Lexed, ReadError> {
        match self.lookahead.take() {
            Some(t) => Ok(t),
            None => self.lexer.next_token(),
        }
    }

    fn variable(&mut self, name: &str) -> Term {
        if name == "_" {
            let v = Var::fresh();
            self.occurrences.push(v.clone());
            return Term::var(v);
        }
        if let Some(entry) = self.named.iter_mut().find(|e| e.name == name) {
            entry.count += 1;
            return Term::var(entry.var.clone());
        }
        let v = Var::named(name);
        self.occurrences.push(v.clone());
        self.named.push(VarEntry {
            name: String::from(name),
            var: v.clone(),
            count: 1,
        });
        Term::var(v)
    }

    fn parse(&mut self, max: u16) -> Result<Term, ReadError> {
        let (left, left_prec) = self.parse_primary(max)?;
        self.parse_operators(left, left_prec, max)
    }

    fn parse_primary(&mut self, max: u16) -> Result<(Term, u16), ReadError> {
        let lexed = self.next()?;
        match lexed.token {
            Token::Int(i) => Ok((Term::int(i), 0)),
            Token::Float(f) => Ok((Term::float(f), 0)),
            Token::Str(s) => Ok((
                Term::list(s.chars().map(|c| Term::int(c as i64)).collect::<Vec<_>>()),
                0,
            )),
            Token::Var(name) => Ok((self.variable(&name), 0)),
            Token::Punct(Punct::Open | Punct::OpenCT) => {
                let t = self.parse(MAX_OPER_PRIORITY as u16)?;
                self.expect(Token::Punct(Punct::Close), "expected )")?;
                Ok((t, 0))
            }
            Token::Punct(Punct::OpenList) => {
                if self.peek()?.token == Token::Punct(Punct::CloseList) {
                    self.next()?;
                    return Ok((Term::nil(), 0));
                }
                Ok((self.parse_list()?, 0))
            }
            Token::Punct(Punct::OpenCurly) => {
                if self.peek()?.token == Token::Punct(Punct::CloseCurly) {
                    self.next()?;
                    return Ok((Term::atom("{}"), 0));
                }
                let t = self.parse(MAX_OPER_PRIORITY as u16)?;
                self.expect(Token::Punct(Punct::CloseCurly), "expected }")?;
                Ok((Term::compound("{}", vec![t]), 0))
            }
            Token::Atom(a) => self.parse_atom_primary(a, max),
            Token::Eof => Err(ReadError::Incomplete),
            other => Err(ReadError::syntax(
                format!("expression expected, found {other:?}"),
                lexed.span,
            )),
        }
    }

    fn parse_atom_primary(&mut self, a: Atom, max: u16) -> Result<(Term, u16), ReadError> {
        // functional notation: name immediately followed by `(`
        if self.peek()?.token == Token::Punct(Punct::OpenCT) {
            self.next()?;
            let args = self.parse_args()?;
            return Ok((Term::compound(a, args), 0));
        }

        // a glued `-`/`+` before a number literal is part of the literal
        if a == "-" || a == "+" {
            let negate = a == "-";
            let peeked = self.peek()?;
            if !peeked.layout_before {
                match peeked.token {
                    Token::Int(i) => {
                        self.next()?;
                        return Ok((Term::int(if negate { -i } else { i }), 0));
                    }
                    Token::Float(f) => {
                        self.next()?;
                        return Ok((Term::float(if negate { -f } else { f }), 0));
                    }
                    _ => {}
                }
            }
        }

        if let Some(def) = self.ops.prefix(a.as_str()).copied() {
            if def.priority <= max && self.peek()?.token.starts_term() {
                let arg = self.parse(def.spec.right_max(def.priority))?;
                return Ok((Term::compound(a, vec![arg]), def.priority));
            }
        }

        // a bare operator atom as an operand carries its own priority
        let prec = self.operand_priority(a.as_str());
        if prec > max {
            return Err(ReadError::syntax(
                format!("operator {a} needs brackets here"),
                self.lexer.span(),
            ));
        }
        Ok((Term::Atom(a), prec))
    }

    fn operand_priority(&self, name: &str) -> u16 {
        [
            self.ops.prefix(name),
            self.ops.infix(name),
            self.ops.postfix(name),
        ]
        .into_iter()
        .flatten()
        .map(|def| def.priority)
        .max()
        .unwrap_or(0)
    }

    fn parse_operators(
        &mut self,
        mut left: Term,
        mut left_prec: u16,
        max: u16,
    ) -> Result<Term, ReadError> {
        loop {
            let token = self.peek()?.token.clone();
            match token {
                Token::Punct(Punct::Comma) if max >= 1000 && left_prec < 1000 => {
                    self.next()?;
                    let rhs = self.parse(1000)?;
                    left = Term::compound(",", vec![left, rhs]);
                    left_prec = 1000;
                }
                Token::Punct(Punct::Bar) => {
                    // when `|` is declared infix it reads as `;`
                    let Some(def) = self.ops.infix("|").copied() else {
                        break;
                    };
                    if def.priority > max || left_prec > def.spec.left_max(def.priority) {
                        break;
                    }
                    self.next()?;
                    let rhs = self.parse(def.spec.right_max(def.priority))?;
                    left = Term::compound(";", vec![left, rhs]);
                    left_prec = def.priority;
                }
                Token::Atom(a) => {
                    let infix = self.ops.infix(a.as_str()).copied();
                    let postfix = self.ops.postfix(a.as_str()).copied();
                    if let Some(def) = infix {
                        if def.priority <= max && left_prec <= def.spec.left_max(def.priority) {
                            self.next()?;
                            let rhs = self.parse(def.spec.right_max(def.priority))?;
                            left = Term::compound(a, vec![left, rhs]);
                            left_prec = def.priority;
                            continue;
                        }
                    }
                    if let Some(def) = postfix {
                        if def.priority <= max && left_prec <= def.spec.left_max(def.priority) {
                            self.next()?;
                            left = Term::compound(a, vec![left]);
                            left_prec = def.priority;
                            continue;
                        }
                    }
                    break;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_args(&mut self) -> Result<Vec<Term>, ReadError> {
        let mut args = Vec::new();
        loop {
            args.push(self.parse(ARG_PRIORITY)?);
            let lexed = self.next()?;
            match lexed.token {
                Token::Punct(Punct::Comma) => {}
                Token::Punct(Punct::Close) => return Ok(args),
                Token::Eof => return Err(ReadError::Incomplete),
                other => {
                    return Err(ReadError::syntax(
                        format!("expected , or ) in arguments, found {other:?}"),
                        lexed.span,
                    ))
                }
            }
        }
    }

    /// List items after `[`, through the closing `]`.
    fn parse_list(&mut self) -> Result<Term, ReadError> {
        let mut items = Vec::new();
        loop {
            items.push(self.parse(ARG_PRIORITY)?);
            let lexed = self.next()?;
            match lexed.token {
                Token::Punct(Punct::Comma) => {}
                Token::Punct(Punct::CloseList) => {
                    return Ok(Term::list(items));
                }
                Token::Punct(Punct::Bar) => {
                    let tail = self.parse(ARG_PRIORITY)?;
                    self.expect(Token::Punct(Punct::CloseList), "expected ]")?;
                    return Ok(Term::partial_list(items, tail));
                }
                Token::Eof => return Err(ReadError::Incomplete),
                other => {
                    return Err(ReadError::syntax(
                        format!("expected , | or ] in list, found {other:?}"),
                        lexed.span,
                    ))
                }
            }
        }
    }

    fn expect(&mut self, token: Token, detail: &str) -> Result<(), ReadError> {
        let lexed = self.next()?;
        if lexed.token == token {
            Ok(())
        } else if lexed.token == Token::Eof {
            Err(ReadError::Incomplete)
        } else {
            Err(ReadError::syntax(detail, lexed.span))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StrSource;
    use horn_terms::{atom, func, list, Env};

    fn read(text: &str) -> ReadOut {
        let ops = OperTab::defaults();
        let mut lexer = Lexer::new(StrSource::new(text));
        Reader::new(&mut lexer, &ops)
            .read_term()
            .unwrap()
            .expect("a term")
    }

    fn read_t(text: &str) -> Term {
        read(text).term
    }

    #[test]
    fn reads_facts_and_structures() {
        assert_eq!(read_t("foo."), atom!("foo"));
        assert_eq!(
            read_t("point(1, 2.5)."),
            func!["point"; Term::int(1), Term::float(2.5)]
        );
    }

    #[test]
    fn eof_returns_none() {
        let ops = OperTab::defaults();
        let mut lexer = Lexer::new(StrSource::new("   % only a comment\n"));
        assert!(Reader::new(&mut lexer, &ops).read_term().unwrap().is_none());
    }

    #[test]
    fn infix_priorities_shape_the_tree() {
        assert_eq!(
            read_t("1 + 2 * 3."),
            func!["+"; Term::int(1), func!["*"; Term::int(2), Term::int(3)]]
        );
        assert_eq!(
            read_t("(1 + 2) * 3."),
            func!["*"; func!["+"; Term::int(1), Term::int(2)], Term::int(3)]
        );
    }

    #[test]
    fn left_associative_chains() {
        assert_eq!(
            read_t("1 - 2 - 3."),
            func!["-"; func!["-"; Term::int(1), Term::int(2)], Term::int(3)]
        );
    }

    #[test]
    fn right_associative_chains() {
        assert_eq!(
            read_t("a , b , c."),
            func![","; atom!("a"), func![","; atom!("b"), atom!("c")]]
        );
    }

    #[test]
    fn non_associative_clash_is_an_error() {
        let ops = OperTab::defaults();
        let mut lexer = Lexer::new(StrSource::new("a = b = c."));
        assert!(Reader::new(&mut lexer, &ops).read_term().is_err());
    }

    #[test]
    fn clause_neck() {
        assert_eq!(
            read_t("a :- b, c."),
            func![":-"; atom!("a"), func![","; atom!("b"), atom!("c")]]
        );
    }

    #[test]
    fn prefix_and_negative_literals() {
        assert_eq!(read_t("-1."), Term::int(-1));
        assert_eq!(read_t("- 1."), func!["-"; Term::int(1)]);
        assert_eq!(read_t("-(1)."), func!["-"; Term::int(1)]);
        assert_eq!(read_t("- -1."), func!["-"; Term::int(-1)]);
        assert_eq!(read_t("X is -1 + 2.").arity(), 2);
    }

    #[test]
    fn lists_and_tails() {
        assert_eq!(
            read_t("[1, 2]."),
            list![Term::int(1), Term::int(2)]
        );
        let out = read("[1|T].");
        let t = out.variable_names[0].1.clone();
        assert_eq!(out.term, list![Term::int(1); Term::var(t)]);
        assert_eq!(read_t("[]."), Term::nil());
    }

    #[test]
    fn curly_terms() {
        assert_eq!(read_t("{a}."), func!["{}"; atom!("a")]);
        assert_eq!(read_t("{}."), atom!("{}"));
    }

    #[test]
    fn strings_read_as_code_lists() {
        assert_eq!(
            read_t("\"ab\"."),
            list![Term::int(97), Term::int(98)]
        );
    }

    #[test]
    fn variables_share_within_a_term() {
        let out = read("f(X, X, Y, _, _).");
        assert_eq!(out.variable_names.len(), 2);
        assert_eq!(out.variables.len(), 4); // X, Y, and two anonymous
        let x = &out.variable_names[0];
        assert_eq!(x.0.as_str(), "X");
        let args = out.term.as_struct("f", 5).unwrap();
        assert_eq!(args[0], args[1]);
        assert_ne!(args[3], args[4]);
    }

    #[test]
    fn singletons_are_reported() {
        let out = read("f(X, X, Y).");
        assert_eq!(out.singletons.len(), 1);
        assert_eq!(out.singletons[0].0.as_str(), "Y");
    }

    #[test]
    fn operator_as_operand_needs_brackets() {
        let ops = OperTab::defaults();
        let mut lexer = Lexer::new(StrSource::new("X = ;."));
        assert!(Reader::new(&mut lexer, &ops).read_term().is_err());
        assert_eq!(
            read_t("X = (;).").as_struct("=", 2).unwrap()[1],
            atom!(";")
        );
        assert_eq!(
            read_t("f(-).").as_struct("f", 1).unwrap()[0],
            atom!("-")
        );
    }

    #[test]
    fn several_terms_from_one_lexer() {
        let ops = OperTab::defaults();
        let mut lexer = Lexer::new(StrSource::new("a. b. "));
        let a = Reader::new(&mut lexer, &ops).read_term().unwrap().unwrap();
        let b = Reader::new(&mut lexer, &ops).read_term().unwrap().unwrap();
        assert_eq!(a.term, atom!("a"));
        assert_eq!(b.term, atom!("b"));
        assert!(Reader::new(&mut lexer, &ops).read_term().unwrap().is_none());
    }

    #[test]
    fn writer_reader_round_trip() {
        let ops = OperTab::defaults();
        let env = Env::new();
        for text in [
            "f(a, [1, 2|T], X-Y).",
            "a:-b,c;d.",
            "- 1.",
            "'hello world'([]).",
            "{x, y}.",
        ] {
            let mut lexer = Lexer::new(StrSource::new(text));
            let out = Reader::new(&mut lexer, &ops).read_term().unwrap().unwrap();
            let written = format!(
                "{}. ",
                out.term.display(&env).with_ops(&ops).quoted(true)
            );
            let mut lexer2 = Lexer::new(StrSource::new(&written));
            let out2 = Reader::new(&mut lexer2, &ops).read_term().unwrap().unwrap();
            // structurally equal up to variable identity
            assert_eq!(
                out2.term.display(&env).with_ops(&ops).quoted(true).to_string(),
                out.term.display(&env).with_ops(&ops).quoted(true).to_string()
            );
        }
    }
}
