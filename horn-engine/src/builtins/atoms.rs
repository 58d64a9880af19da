//! Atom and number text built-ins: lengths, concatenation, sub-atoms,
//! and the char/code conversions.

use super::unify_candidates;
use crate::{
    instantiation_error, representation_error, syntax_error, type_error, Cont, Machine,
    ProcedureStore, Promise,
};
use horn_parser::{Lexer, Reader, StrSource};
use horn_terms::{func, Atom, Env, OperTab, Term};

pub fn register(store: &mut ProcedureStore) {
    store.register_builtin("atom_length", 2, atom_length);
    store.register_builtin("atom_concat", 3, atom_concat);
    store.register_builtin("sub_atom", 5, sub_atom);
    store.register_builtin("atom_chars", 2, |m, env, args, k| {
        atom_text(m, env, args, k, TextKind::Chars)
    });
    store.register_builtin("atom_codes", 2, |m, env, args, k| {
        atom_text(m, env, args, k, TextKind::Codes)
    });
    store.register_builtin("number_chars", 2, |m, env, args, k| {
        number_text(m, env, args, k, TextKind::Chars)
    });
    store.register_builtin("number_codes", 2, |m, env, args, k| {
        number_text(m, env, args, k, TextKind::Codes)
    });
    store.register_builtin("char_code", 2, char_code);
}

/// Read an atom argument, with the usual errors.
fn want_atom(env: &Env, t: &Term) -> Result<Atom, Promise> {
    match env.resolve(t).clone() {
        Term::Atom(a) => Ok(a),
        Term::Var(v) => Err(Promise::Error(instantiation_error(Term::var(v)))),
        other => Err(Promise::Error(type_error("atom", env.resolved(&other)))),
    }
}

fn atom_length(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let a = match want_atom(env, &args[0]) {
        Ok(a) => a,
        Err(p) => return p,
    };
    let len = env.resolve(&args[1]).clone();
    match &len {
        Term::Var(_) | Term::Int(_) => {}
        other => return Promise::Error(type_error("integer", env.resolved(other))),
    }
    let n = a.as_str().chars().count() as i64;
    m.unify_then(env, &len, &Term::int(n), k)
}

/// `atom_concat(A, B, Whole)`: concatenates when the prefix and the
/// suffix are known, enumerates splits of `Whole` otherwise.
fn atom_concat(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let a = env.resolve(&args[0]).clone();
    let b = env.resolve(&args[1]).clone();
    let is_known = |t: &Term| t.is_atom();
    if is_known(&a) && is_known(&b) {
        let whole = format!(
            "{}{}",
            a.as_atom().expect("checked").as_str(),
            b.as_atom().expect("checked").as_str()
        );
        return m.unify_then(env, &args[2], &Term::atom(whole), k);
    }
    for t in [&a, &b] {
        if !t.is_var() && !t.is_atom() {
            return Promise::Error(type_error("atom", env.resolved(t)));
        }
    }
    let whole = match want_atom(env, &args[2]) {
        Ok(w) => w,
        Err(p) => return p,
    };
    let target = func!["c"; a, b];
    let text = whole.as_str();
    let candidates = (0..=text.chars().count())
        .map(|i| {
            let at = text
                .char_indices()
                .nth(i)
                .map_or(text.len(), |(idx, _)| idx);
            func![
                "c";
                Term::atom(&text[..at]),
                Term::atom(&text[at..])
            ]
        })
        .collect();
    unify_candidates(&target, candidates, k)
}

/// `sub_atom(Atom, Before, Length, After, SubAtom)`: enumerates every
/// split in before-then-length order.
fn sub_atom(_m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let whole = match want_atom(env, &args[0]) {
        Ok(a) => a,
        Err(p) => return p,
    };
    let sub = env.resolve(&args[4]).clone();
    if !sub.is_var() && !sub.is_atom() {
        return Promise::Error(type_error("atom", env.resolved(&sub)));
    }
    let text = whole.as_str();
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain([text.len()])
        .collect();
    let n = offsets.len() - 1;
    let target = func![
        "s";
        args[1].clone(),
        args[2].clone(),
        args[3].clone(),
        sub
    ];
    let mut candidates = Vec::new();
    for before in 0..=n {
        for len in 0..=(n - before) {
            let piece = &text[offsets[before]..offsets[before + len]];
            candidates.push(func![
                "s";
                Term::int(before as i64),
                Term::int(len as i64),
                Term::int((n - before - len) as i64),
                Term::atom(piece)
            ]);
        }
    }
    unify_candidates(&target, candidates, k)
}

#[derive(Clone, Copy, PartialEq)]
enum TextKind {
    Chars,
    Codes,
}

impl TextKind {
    fn encode(self, text: &str) -> Term {
        let items: Vec<Term> = match self {
            Self::Chars => text.chars().map(|c| Term::atom(c.to_string())).collect(),
            Self::Codes => text.chars().map(|c| Term::int(c as i64)).collect(),
        };
        Term::list(items)
    }

    /// Decode a proper list of chars or codes into text.
    fn decode(self, env: &Env, list: &Term) -> Result<String, Promise> {
        let (items, tail) = env.list_view(list);
        if tail.is_var() {
            return Err(Promise::Error(instantiation_error(tail)));
        }
        if !tail.is_nil() {
            return Err(Promise::Error(type_error("list", env.resolved(list))));
        }
        let mut text = String::new();
        for item in items {
            let item = env.resolve(&item).clone();
            match (self, &item) {
                (_, Term::Var(_)) => {
                    return Err(Promise::Error(instantiation_error(item)))
                }
                (Self::Chars, Term::Atom(a)) if a.as_str().chars().count() == 1 => {
                    text.push(a.as_str().chars().next().expect("one char"));
                }
                (Self::Chars, other) => {
                    return Err(Promise::Error(type_error(
                        "character",
                        env.resolved(other),
                    )))
                }
                (Self::Codes, Term::Int(code)) => {
                    match u32::try_from(*code).ok().and_then(char::from_u32) {
                        Some(c) => text.push(c),
                        None => {
                            return Err(Promise::Error(representation_error(
                                "character_code",
                                item.clone(),
                            )))
                        }
                    }
                }
                (Self::Codes, other) => {
                    return Err(Promise::Error(type_error(
                        "integer",
                        env.resolved(other),
                    )))
                }
            }
        }
        Ok(text)
    }
}

fn atom_text(
    m: &mut Machine,
    env: &mut Env,
    args: &[Term],
    k: &Cont,
    kind: TextKind,
) -> Promise {
    let a = env.resolve(&args[0]).clone();
    match &a {
        Term::Var(_) => {
            let text = match kind.decode(env, &args[1]) {
                Ok(text) => text,
                Err(p) => return p,
            };
            m.unify_then(env, &a, &Term::atom(text), k)
        }
        // numbers are written out, per atom_chars on atomic terms
        Term::Int(i) => m.unify_then(env, &args[1], &kind.encode(&i.to_string()), k),
        Term::Float(f) => {
            let text = format_float(*f);
            m.unify_then(env, &args[1], &kind.encode(&text), k)
        }
        Term::Atom(atom) => {
            let encoded = kind.encode(atom.as_str());
            m.unify_then(env, &args[1], &encoded, k)
        }
        other => Promise::Error(type_error("atom", env.resolved(other))),
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.is_finite() {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

fn number_text(
    m: &mut Machine,
    env: &mut Env,
    args: &[Term],
    k: &Cont,
    kind: TextKind,
) -> Promise {
    let n = env.resolve(&args[0]).clone();
    match &n {
        Term::Int(i) => m.unify_then(env, &args[1], &kind.encode(&i.to_string()), k),
        Term::Float(f) => m.unify_then(env, &args[1], &kind.encode(&format_float(*f)), k),
        Term::Var(_) => {
            let text = match kind.decode(env, &args[1]) {
                Ok(text) => text,
                Err(p) => return p,
            };
            match parse_number(&text) {
                Some(number) => m.unify_then(env, &n, &number, k),
                None => Promise::Error(syntax_error("illegal number")),
            }
        }
        other => Promise::Error(type_error("number", env.resolved(other))),
    }
}

/// Parse a number through the ordinary reader, so every literal
/// notation (radix prefixes, char codes, exponents, glued signs)
/// means the same thing here as in program text.
fn parse_number(text: &str) -> Option<Term> {
    let source = format!("{text} .");
    let ops = OperTab::new();
    let mut lexer = Lexer::new(StrSource::new(&source));
    let out = Reader::new(&mut lexer, &ops).read_term().ok()??;
    out.term.is_number().then_some(out.term)
}

/// `char_code(Char, Code)`.
fn char_code(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let ch = env.resolve(&args[0]).clone();
    let code = env.resolve(&args[1]).clone();
    match (&ch, &code) {
        (Term::Atom(a), _) if a.as_str().chars().count() == 1 => {
            let c = a.as_str().chars().next().expect("one char");
            m.unify_then(env, &code, &Term::int(c as i64), k)
        }
        (Term::Var(_), Term::Int(i)) => {
            match u32::try_from(*i).ok().and_then(char::from_u32) {
                Some(c) => m.unify_then(env, &ch, &Term::atom(c.to_string()), k),
                None => Promise::Error(representation_error("character_code", code.clone())),
            }
        }
        (Term::Var(_), Term::Var(_)) => Promise::Error(instantiation_error(ch)),
        (Term::Var(_), other) => Promise::Error(type_error("integer", env.resolved(other))),
        (other, _) => Promise::Error(type_error("character", env.resolved(other))),
    }
}
