//! Defines [`TermDisplay`], a formatter for rendering [`Term`] values.
//!
//! Provides a [`fmt::Display`] implementation for human-readable output
//! of terms under a binding environment: operator layout driven by an
//! [`OperTab`], optional quoting, `'$VAR'/1` naming, and `...` elision
//! of cyclic structure.

use crate::{Env, OperTab, Term, ARG_PRIORITY, MAX_OPER_PRIORITY};
use std::fmt;

/// Options controlling how a term is written.
///
/// The defaults match `write/1`: no quoting, operator layout enabled,
/// `'$VAR'/1` rendered as variable names.
#[derive(Debug, Clone, Copy)]
pub struct WriteOpts {
    /// Quote atoms that could not be read back.
    pub quoted: bool,
    /// Ignore operator definitions and write canonical `f(...)` syntax.
    pub ignore_ops: bool,
    /// Render `'$VAR'(N)` as `A`, `B`, ... `Z`, `A1`, ...
    pub numbervars: bool,
}

impl Default for WriteOpts {
    fn default() -> Self {
        Self {
            quoted: false,
            ignore_ops: false,
            numbervars: true,
        }
    }
}

/// A wrapper tying together a [`Term`], the [`Env`] it lives in, the
/// operator table, and the [`WriteOpts`] to apply.  Implements
/// [`fmt::Display`], so it can be used with the standard formatting
/// macros.
///
/// ### Example
/// ```rust
/// use horn_terms::{func, Env, Term};
/// let env = Env::new();
/// let term = func!["foo"; Term::int(1), Term::atom("hello world")];
///
/// assert_eq!(term.display(&env).to_string(), "foo(1, hello world)");
/// assert_eq!(
///     term.display(&env).quoted(true).to_string(),
///     "foo(1, 'hello world')"
/// );
/// ```
pub struct TermDisplay<'a> {
    term: &'a Term,
    env: &'a Env,
    ops: Option<&'a OperTab>,
    opts: WriteOpts,
}

impl Term {
    /// Return a [`TermDisplay`] suitable for formatting with
    /// [`fmt::Display`].  Operator layout is off until an operator
    /// table is supplied with [`TermDisplay::with_ops`].
    pub fn display<'a>(&'a self, env: &'a Env) -> TermDisplay<'a> {
        TermDisplay {
            term: self,
            env,
            ops: None,
            opts: WriteOpts::default(),
        }
    }
}

impl<'a> TermDisplay<'a> {
    /// Lay out operators according to `ops`.
    pub fn with_ops(mut self, ops: &'a OperTab) -> Self {
        self.ops = Some(ops);
        self
    }

    /// Replace all options at once.
    pub fn with_opts(mut self, opts: WriteOpts) -> Self {
        self.opts = opts;
        self
    }

    /// Toggle quoting.
    pub fn quoted(mut self, quoted: bool) -> Self {
        self.opts.quoted = quoted;
        self
    }
}

impl fmt::Display for TermDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        let mut path = Vec::new();
        self.render(&mut out, self.term, MAX_OPER_PRIORITY as u16, false, &mut path);
        f.write_str(&out)
    }
}

fn is_unquoted_alpha(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The graphic characters that may form unquoted symbolic atoms.
pub(crate) fn is_graphic(c: char) -> bool {
    "#$&*+-./:<=>?@^~\\".contains(c)
}

fn is_solo(s: &str) -> bool {
    matches!(s, "!" | ";" | "[]" | "{}")
}

fn needs_quotes(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    if is_solo(s) || is_unquoted_alpha(s) {
        return false;
    }
    !s.chars().all(is_graphic)
}

fn push_quoted(out: &mut String, s: &str) {
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => {
                out.push_str(&format!("\\x{:x}\\", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('\'');
}

/// `'$VAR'(0)` is `A`, `'$VAR'(25)` is `Z`, `'$VAR'(26)` is `A1`.
fn numbervar_name(n: i64) -> String {
    let letter = (b'A' + (n % 26) as u8) as char;
    let index = n / 26;
    if index == 0 {
        letter.to_string()
    } else {
        format!("{letter}{index}")
    }
}

impl TermDisplay<'_> {
    fn render(&self, out: &mut String, t: &Term, max: u16, op_arg: bool, path: &mut Vec<u64>) {
        let (entry, t) = self.env.resolve_step(t);
        if let Some(v) = entry {
            if path.contains(&v.id()) {
                out.push_str("...");
                return;
            }
        }
        let entered = entry.map(|v| v.id());
        if let Some(id) = entered {
            path.push(id);
        }
        self.render_resolved(out, t, max, op_arg, path);
        if entered.is_some() {
            path.pop();
        }
    }

    fn render_resolved(&self, out: &mut String, t: &Term, max: u16, op_arg: bool, path: &mut Vec<u64>) {
        match t {
            Term::Var(v) => match v.name() {
                Some(name) => out.push_str(name),
                None => out.push_str(&format!("_G{}", v.id())),
            },
            Term::Int(i) => {
                if *i < 0 && op_arg {
                    out.push('(');
                    out.push_str(&i.to_string());
                    out.push(')');
                } else {
                    out.push_str(&i.to_string());
                }
            }
            Term::Float(x) => {
                let s = if x.fract() == 0.0 && x.is_finite() {
                    format!("{x:.1}")
                } else {
                    format!("{x}")
                };
                if *x < 0.0 && op_arg {
                    out.push('(');
                    out.push_str(&s);
                    out.push(')');
                } else {
                    out.push_str(&s);
                }
            }
            Term::Atom(a) => {
                let operator = self
                    .ops
                    .is_some_and(|ops| ops.is_operator(a.as_str()));
                if operator && op_arg {
                    out.push('(');
                    self.push_atom(out, a.as_str());
                    out.push(')');
                } else {
                    self.push_atom(out, a.as_str());
                }
            }
            Term::Compound(c) => {
                if self.opts.numbervars {
                    if let Some(args) = t.as_struct("$VAR", 1) {
                        if let Term::Int(n) = self.env.resolve(&args[0]) {
                            if *n >= 0 {
                                out.push_str(&numbervar_name(*n));
                                return;
                            }
                        }
                    }
                }
                if *c.functor() == "." && c.arity() == 2 {
                    self.render_list(out, t, path);
                    return;
                }
                if let Some(args) = t.as_struct("{}", 1) {
                    out.push('{');
                    self.render(out, &args[0], MAX_OPER_PRIORITY as u16, false, path);
                    out.push('}');
                    return;
                }
                if !self.opts.ignore_ops {
                    if let Some(ops) = self.ops {
                        if self.render_operator(out, c.functor().as_str(), c.args(), ops, max, path)
                        {
                            return;
                        }
                    }
                }
                self.render_canonical(out, c.functor().as_str(), c.args(), path);
            }
        }
    }

    fn push_atom(&self, out: &mut String, name: &str) {
        if self.opts.quoted && needs_quotes(name) {
            push_quoted(out, name);
        } else {
            out.push_str(name);
        }
    }

    fn render_canonical(&self, out: &mut String, functor: &str, args: &[Term], path: &mut Vec<u64>) {
        self.push_atom(out, functor);
        out.push('(');
        for (i, a) in args.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.render(out, a, ARG_PRIORITY, false, path);
        }
        out.push(')');
    }

    /// Render an operator application; `false` if the functor has no
    /// matching definition and canonical syntax should be used.
    fn render_operator(
        &self,
        out: &mut String,
        functor: &str,
        args: &[Term],
        ops: &OperTab,
        max: u16,
        path: &mut Vec<u64>,
    ) -> bool {
        match args {
            [lhs, rhs] => {
                let Some(def) = ops.infix(functor) else {
                    return false;
                };
                let open = def.priority > max;
                if open {
                    out.push('(');
                }
                let mut left = String::new();
                self.render(&mut left, lhs, def.spec.left_max(def.priority), true, path);
                let mut right = String::new();
                self.render(&mut right, rhs, def.spec.right_max(def.priority), true, path);
                out.push_str(&left);
                push_spaced(out, &left, functor, Some(&right));
                out.push_str(&right);
                if open {
                    out.push(')');
                }
                true
            }
            [arg] => {
                if let Some(def) = ops.prefix(functor) {
                    let open = def.priority > max;
                    if open {
                        out.push('(');
                    }
                    let mut operand = String::new();
                    self.render(&mut operand, arg, def.spec.right_max(def.priority), true, path);
                    out.push_str(functor);
                    // `-1` would re-read as a negative literal
                    let numeric_operand =
                        operand.starts_with(|c: char| c.is_ascii_digit());
                    if glue(functor.chars().last(), operand.chars().next())
                        || (matches!(functor, "-" | "+") && numeric_operand)
                    {
                        out.push(' ');
                    }
                    out.push_str(&operand);
                    if open {
                        out.push(')');
                    }
                    true
                } else if let Some(def) = ops.postfix(functor) {
                    let open = def.priority > max;
                    if open {
                        out.push('(');
                    }
                    let mut operand = String::new();
                    self.render(&mut operand, arg, def.spec.left_max(def.priority), true, path);
                    out.push_str(&operand);
                    if glue(operand.chars().last(), functor.chars().next()) {
                        out.push(' ');
                    }
                    out.push_str(functor);
                    if open {
                        out.push(')');
                    }
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    fn render_list(&self, out: &mut String, t: &Term, path: &mut Vec<u64>) {
        out.push('[');
        let mut first = true;
        let mut cur = t.clone();
        let mark = path.len();
        loop {
            let (entry, resolved) = {
                let (entry, resolved) = self.env.resolve_step(&cur);
                (entry.cloned(), resolved.clone())
            };
            if let Some(v) = &entry {
                if path.contains(&v.id()) {
                    out.push('|');
                    out.push_str("...");
                    break;
                }
                path.push(v.id());
            }
            match resolved.as_struct(".", 2) {
                Some(cell) => {
                    if !first {
                        out.push_str(", ");
                    }
                    first = false;
                    self.render(out, &cell[0], ARG_PRIORITY, false, path);
                    cur = cell[1].clone();
                }
                None => {
                    if !resolved.is_nil() {
                        out.push('|');
                        self.render_resolved(out, &resolved, ARG_PRIORITY, false, path);
                    }
                    break;
                }
            }
        }
        path.truncate(mark);
        out.push(']');
    }
}

/// Append an infix operator between already-rendered operands,
/// inserting spaces only where tokens would otherwise glue together.
fn push_spaced(out: &mut String, left: &str, functor: &str, right: Option<&str>) {
    if glue(left.chars().last(), functor.chars().next()) {
        out.push(' ');
    }
    out.push_str(functor);
    if let Some(right) = right {
        if glue(functor.chars().last(), right.chars().next()) {
            out.push(' ');
        }
    }
}

/// Two adjacent characters glue when both are graphic or both are
/// alphanumeric, which would change tokenization on re-read.
fn glue(a: Option<char>, b: Option<char>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            (is_graphic(a) && is_graphic(b))
                || ((a.is_alphanumeric() || a == '_') && (b.is_alphanumeric() || b == '_'))
        }
        _ => false,
    }
}
