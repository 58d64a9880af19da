//! The clause compiler: head and body to a compact instruction stream.
//!
//! A clause `Head :- Body` compiles to a constant table, an indicator
//! table, a count of variable slots, and a flat instruction buffer.
//! Ground arguments intern into the constant table; non-ground
//! compounds build at run time through `Functor`/`Pop` pairs;
//! conjunction bodies flatten into a call sequence.  The VM renames
//! the variable slots apart on every activation, so a compiled clause
//! is reusable and immutable.

use crate::{instantiation_error, type_error, Exception, Indicator};
use horn_terms::{Env, Term};

/// One VM instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Push the k-th constant.
    Const(usize),
    /// Push the i-th variable slot.
    Var(usize),
    /// Open a compound with the k-th indicator's functor; arguments
    /// are the entries pushed before the matching `Pop`.
    Functor(usize),
    /// Close the innermost open compound and push the result.
    Pop,
    /// End of head: unify the pushed arguments with the goal's.
    Enter,
    /// Call the k-th indicator with the pushed arguments.
    Call(usize),
    /// Successful end of clause: hand over to the continuation.
    Exit,
}

/// The compiled form of one clause.
#[derive(Debug)]
pub struct Clause {
    /// The clause as a term, for `clause/2` and `retract/1`.
    pub raw: Term,
    /// Ground terms referenced by `Const`.
    pub consts: Vec<Term>,
    /// Indicators referenced by `Functor` and `Call`.
    pub pis: Vec<Indicator>,
    /// Number of distinct variable slots to rename apart.
    pub nvars: usize,
    /// The instruction buffer.
    pub code: Vec<Op>,
}

struct Compiler {
    consts: Vec<Term>,
    pis: Vec<Indicator>,
    vars: Vec<u64>,
    code: Vec<Op>,
}

impl Compiler {
    fn new() -> Self {
        Self {
            consts: Vec::new(),
            pis: Vec::new(),
            vars: Vec::new(),
            code: Vec::new(),
        }
    }

    fn const_index(&mut self, t: Term) -> usize {
        match self.consts.iter().position(|c| *c == t) {
            Some(i) => i,
            None => {
                self.consts.push(t);
                self.consts.len() - 1
            }
        }
    }

    fn pi_index(&mut self, pi: Indicator) -> usize {
        match self.pis.iter().position(|p| *p == pi) {
            Some(i) => i,
            None => {
                self.pis.push(pi);
                self.pis.len() - 1
            }
        }
    }

    fn var_slot(&mut self, id: u64) -> usize {
        match self.vars.iter().position(|v| *v == id) {
            Some(i) => i,
            None => {
                self.vars.push(id);
                self.vars.len() - 1
            }
        }
    }

    /// Compile one argument position of a head or a goal.
    fn arg(&mut self, env: &Env, t: &Term) {
        let t = env.resolve(t).clone();
        match t {
            Term::Var(v) => {
                let slot = self.var_slot(v.id());
                self.code.push(Op::Var(slot));
            }
            Term::Compound(ref c) if !env.is_ground(&t) => {
                let pi = Indicator::new(c.functor().clone(), c.arity());
                let k = self.pi_index(pi);
                self.code.push(Op::Functor(k));
                for a in c.args() {
                    self.arg(env, a);
                }
                self.code.push(Op::Pop);
            }
            ground => {
                let k = self.const_index(env.resolved(&ground));
                self.code.push(Op::Const(k));
            }
        }
    }

    /// Compile one body goal.  Conjunctions flatten; `true` vanishes;
    /// a variable goal becomes `call/1`.
    fn goal(&mut self, env: &Env, g: &Term) -> Result<(), Exception> {
        let g = env.resolve(g).clone();
        match g {
            Term::Var(_) => {
                self.arg(env, &g);
                let k = self.pi_index(Indicator::new("call".into(), 1));
                self.code.push(Op::Call(k));
                Ok(())
            }
            Term::Atom(a) => {
                if a == "true" {
                    return Ok(());
                }
                let k = self.pi_index(Indicator::new(a, 0));
                self.code.push(Op::Call(k));
                Ok(())
            }
            Term::Compound(ref c) => {
                if let Some(args) = g.as_struct(",", 2) {
                    let (lhs, rhs) = (args[0].clone(), args[1].clone());
                    self.goal(env, &lhs)?;
                    self.goal(env, &rhs)?;
                    return Ok(());
                }
                for a in c.args() {
                    self.arg(env, a);
                }
                let k = self.pi_index(Indicator::new(c.functor().clone(), c.arity()));
                self.code.push(Op::Call(k));
                Ok(())
            }
            other => Err(type_error("callable", env.resolved(&other))),
        }
    }
}

/// Split a clause term into head and body; a fact has body `true`.
pub fn split_clause(env: &Env, t: &Term) -> (Term, Term) {
    let t = env.resolve(t).clone();
    match t.as_struct(":-", 2) {
        Some(args) => (args[0].clone(), args[1].clone()),
        None => (t, Term::atom("true")),
    }
}

/// Compile `clause_term` (`Head :- Body` or a fact).  The head must be
/// callable and instantiated; body goals are validated as they are
/// flattened.
pub fn compile_clause(env: &mut Env, clause_term: &Term) -> Result<Clause, Exception> {
    let raw = env.renamed_copy(clause_term);
    let (head, body) = split_clause(env, &raw);

    let head = env.resolve(&head).clone();
    let mut compiler = Compiler::new();
    match &head {
        Term::Var(_) => return Err(instantiation_error(head)),
        Term::Atom(_) => {}
        Term::Compound(c) => {
            for a in c.args() {
                compiler.arg(env, a);
            }
        }
        other => return Err(type_error("callable", env.resolved(other))),
    }
    compiler.code.push(Op::Enter);

    // a variable body converts to call/1 during goal compilation
    compiler.goal(env, &body)?;
    compiler.code.push(Op::Exit);

    Ok(Clause {
        raw,
        consts: compiler.consts,
        pis: compiler.pis,
        nvars: compiler.vars.len(),
        code: compiler.code,
    })
}
