//! The machine: resolver, bytecode execution, and the embedding API.
//!
//! [`Machine`] owns the mutable engine state (procedure store, flags,
//! operator table, character conversions, streams).  Goal resolution
//! is continuation-passing: [`Machine::solve`] turns a goal term into
//! a [`Promise`] whose success paths call the supplied continuation,
//! and the [`Forcer`](crate::Forcer) drives the promise tree.  Control
//! constructs are decoded structurally before procedure lookup so
//! that cut barriers thread through them transparently.

use crate::{
    compile_clause, existence_error, split_clause, syntax_error, type_error, BarrierId, Clause,
    Cont, Exception, FlagStore, Forcer, Indicator, Op, Procedure, ProcedureStore, Promise,
    SharedBuf, Stream, StreamMode, StreamTab, Thunk, Unknown,
};
use horn_parser::{Lexer, ReadOut, Reader, StrSource};
use horn_terms::{unify, Env, OperTab, Term, Var};
use smartstring::alias::String;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::rc::Rc;

/// The engine: procedure database, tables, streams, and counters.
pub struct Machine {
    pub(crate) store: ProcedureStore,
    pub(crate) flags: FlagStore,
    pub(crate) ops: OperTab,
    pub(crate) conv: HashMap<char, char>,
    pub(crate) streams: StreamTab,
    next_barrier: BarrierId,
    out_buf: Option<SharedBuf>,
}

impl Machine {
    fn base(streams: StreamTab, out_buf: Option<SharedBuf>) -> Self {
        let mut m = Self {
            store: ProcedureStore::new(),
            flags: FlagStore::new(),
            ops: OperTab::defaults(),
            conv: HashMap::new(),
            streams,
            next_barrier: 1,
            out_buf,
        };
        crate::builtins::register_all(&mut m.store);
        m
    }

    /// A machine with the standard streams on process stdio.
    pub fn new() -> Self {
        Self::base(
            StreamTab::with_stdio(
                Stream::input(io::stdin()),
                Stream::output(io::stdout(), StreamMode::Write),
            ),
            None,
        )
    }

    /// A machine with in-memory standard streams; `user_input` starts
    /// empty and `user_output` accumulates into an inspectable buffer.
    pub fn with_buffers() -> Self {
        let buf = SharedBuf::default();
        Self::base(
            StreamTab::with_stdio(
                Stream::input_text(""),
                Stream::output(buf.clone(), StreamMode::Write),
            ),
            Some(buf),
        )
    }

    /// Everything written to the buffered `user_output` so far.
    pub fn output_text(&self) -> std::string::String {
        match &self.out_buf {
            Some(buf) => std::string::String::from_utf8_lossy(&buf.0.borrow()).into_owned(),
            None => std::string::String::new(),
        }
    }

    /// Replace the buffered `user_input` contents.
    pub fn set_user_input(&mut self, text: &str) {
        if let Some(stream) = self.streams.get_mut(self.streams.current_input()) {
            let alias = stream.alias.clone();
            let mut fresh = Stream::input_text(text);
            fresh.alias = alias;
            *stream = fresh;
        }
    }

    /// A fresh cut-barrier id.
    pub(crate) fn fresh_barrier(&mut self) -> BarrierId {
        let b = self.next_barrier;
        self.next_barrier += 1;
        b
    }

    /// The character-conversion map, when the flag enables it.
    pub(crate) fn active_conv(&self) -> Option<HashMap<char, char>> {
        (self.flags.char_conversion && !self.conv.is_empty()).then(|| self.conv.clone())
    }

    // ------------------------------------------------------------------
    // resolution

    /// Resolve `goal`: decode control constructs against the caller's
    /// cut `barrier`, or dispatch on the procedure store.  Successes
    /// call `k`; the returned promise is the goal's remaining search.
    pub(crate) fn solve(
        &mut self,
        env: &mut Env,
        goal: &Term,
        k: Cont,
        barrier: BarrierId,
    ) -> Promise {
        let goal = env.resolve(goal).clone();
        match &goal {
            Term::Var(_) => Promise::Error(crate::instantiation_error(goal.clone())),
            Term::Int(_) | Term::Float(_) => {
                Promise::Error(type_error("callable", goal.clone()))
            }
            Term::Atom(a) => match a.as_str() {
                "true" => k(self, env),
                "fail" | "false" => Promise::fail(),
                "!" => Promise::CutBarrier {
                    barrier,
                    then: Box::new(move |m, env| k(m, env)),
                },
                _ => self.dispatch(env, &goal, k, barrier),
            },
            Term::Compound(c) => match (c.functor().as_str(), c.arity()) {
                (",", 2) => {
                    let (a, b) = (c.args()[0].clone(), c.args()[1].clone());
                    let next: Cont = Rc::new(move |m, env| {
                        let k = k.clone();
                        m.solve(env, &b, k, barrier)
                    });
                    self.solve(env, &a, next, barrier)
                }
                (";", 2) => {
                    let lhs = env.resolve(&c.args()[0]).clone();
                    if let Some(ite) = lhs.as_struct("->", 2) {
                        let (cond, then) = (ite[0].clone(), ite[1].clone());
                        let els = c.args()[1].clone();
                        return self.solve_ite(env, cond, then, els, k, barrier);
                    }
                    let (a, b) = (c.args()[0].clone(), c.args()[1].clone());
                    let k2 = k.clone();
                    Promise::choice([
                        Box::new(move |m: &mut Machine, env: &mut Env| m.solve(env, &a, k, barrier))
                            as Thunk,
                        Box::new(move |m: &mut Machine, env: &mut Env| {
                            m.solve(env, &b, k2, barrier)
                        }),
                    ])
                }
                ("->", 2) => {
                    let (cond, then) = (c.args()[0].clone(), c.args()[1].clone());
                    self.solve_ite(env, cond, then, Term::atom("fail"), k, barrier)
                }
                _ => self.dispatch(env, &goal, k, barrier),
            },
        }
    }

    /// If-then-else: the condition runs in its own cut scope; its
    /// first solution commits, discarding both the condition's other
    /// solutions and the else branch.
    fn solve_ite(
        &mut self,
        _env: &mut Env,
        cond: Term,
        then: Term,
        els: Term,
        k: Cont,
        barrier: BarrierId,
    ) -> Promise {
        let b_ite = self.fresh_barrier();
        let b_cond = self.fresh_barrier();
        let commit: Cont = {
            let k = k.clone();
            Rc::new(move |_m, _env| {
                let then = then.clone();
                let k = k.clone();
                Promise::CutBarrier {
                    barrier: b_ite,
                    then: Box::new(move |m, env| m.solve(env, &then, k, barrier)),
                }
            })
        };
        let cond_alt: Thunk = Box::new(move |_m, _env| {
            Promise::barrier_choice(
                b_cond,
                [Box::new(move |m: &mut Machine, env: &mut Env| {
                    m.solve(env, &cond, commit, b_cond)
                }) as Thunk],
            )
        });
        let else_alt: Thunk =
            Box::new(move |m: &mut Machine, env: &mut Env| m.solve(env, &els, k, barrier));
        Promise::barrier_choice(b_ite, [cond_alt, else_alt])
    }

    /// Procedure dispatch: built-ins run directly, clause lists become
    /// a choice over VM activations, unknown procedures follow the
    /// `unknown` flag.
    fn dispatch(&mut self, env: &mut Env, goal: &Term, k: Cont, _barrier: BarrierId) -> Promise {
        let pi = Indicator::of(goal).expect("dispatch on callable goals only");
        if self.flags.debug {
            log::debug!("call {}", goal.display(env).with_ops(&self.ops));
        }
        match self.store.get(&pi) {
            Some(Procedure::Builtin(f)) => {
                let f = *f;
                let args: Vec<Term> = goal
                    .as_compound()
                    .map(|c| c.args().to_vec())
                    .unwrap_or_default();
                f(self, env, &args, &k)
            }
            Some(Procedure::Clauses(set)) => {
                let clauses = set.clauses.clone();
                let b = self.fresh_barrier();
                let goal_args: Rc<Vec<Term>> = Rc::new(
                    goal.as_compound()
                        .map(|c| c.args().to_vec())
                        .unwrap_or_default(),
                );
                let alts: Vec<Thunk> = clauses
                    .into_iter()
                    .map(|clause| {
                        let goal_args = goal_args.clone();
                        let k = k.clone();
                        Box::new(move |m: &mut Machine, env: &mut Env| {
                            m.exec_clause(env, clause, goal_args, k, b)
                        }) as Thunk
                    })
                    .collect();
                Promise::barrier_choice(b, alts)
            }
            None => match self.flags.unknown {
                Unknown::Error => Promise::Error(existence_error("procedure", pi.to_term())),
                Unknown::Warning => {
                    log::warn!("unknown procedure {pi}");
                    Promise::fail()
                }
                Unknown::Fail => Promise::fail(),
            },
        }
    }

    // ------------------------------------------------------------------
    // bytecode execution

    /// Run one clause against the goal arguments: rename the variable
    /// slots apart and walk the instruction stream.
    fn exec_clause(
        &mut self,
        env: &mut Env,
        clause: Rc<Clause>,
        goal_args: Rc<Vec<Term>>,
        k: Cont,
        barrier: BarrierId,
    ) -> Promise {
        let vars: Rc<Vec<Term>> = Rc::new(
            (0..clause.nvars)
                .map(|_| Term::var(Var::fresh()))
                .collect(),
        );
        self.exec_from(env, clause, 0, vars, goal_args, k, barrier)
    }

    /// Walk instructions from `pc`.  A `Call` suspends the walk into a
    /// continuation; there is no frame stack to unwind.
    #[allow(clippy::too_many_arguments)]
    fn exec_from(
        &mut self,
        env: &mut Env,
        clause: Rc<Clause>,
        mut pc: usize,
        vars: Rc<Vec<Term>>,
        goal_args: Rc<Vec<Term>>,
        k: Cont,
        barrier: BarrierId,
    ) -> Promise {
        let mut stack: Vec<Term> = Vec::new();
        let mut open: Vec<(usize, usize)> = Vec::new();
        loop {
            match clause.code[pc] {
                Op::Const(i) => stack.push(clause.consts[i].clone()),
                Op::Var(i) => stack.push(vars[i].clone()),
                Op::Functor(i) => open.push((i, stack.len())),
                Op::Pop => {
                    let (i, start) = open.pop().expect("unbalanced Functor/Pop");
                    let args = stack.split_off(start);
                    stack.push(Term::compound(clause.pis[i].name.clone(), args));
                }
                Op::Enter => {
                    debug_assert_eq!(stack.len(), goal_args.len());
                    for (head_arg, goal_arg) in stack.drain(..).zip(goal_args.iter()) {
                        if !unify(env, &head_arg, goal_arg) {
                            return Promise::fail();
                        }
                    }
                }
                Op::Call(i) => {
                    let pi = clause.pis[i].clone();
                    let args = std::mem::take(&mut stack);
                    let goal = Term::compound(pi.name, args);
                    let next_pc = pc + 1;
                    let cont: Cont = {
                        let clause = clause.clone();
                        let vars = vars.clone();
                        let goal_args = goal_args.clone();
                        let k = k.clone();
                        Rc::new(move |m, env| {
                            m.exec_from(
                                env,
                                clause.clone(),
                                next_pc,
                                vars.clone(),
                                goal_args.clone(),
                                k.clone(),
                                barrier,
                            )
                        })
                    };
                    return Promise::delay(move |m, env| m.solve(env, &goal, cont, barrier));
                }
                Op::Exit => return k(self, env),
            }
            pc += 1;
        }
    }

    // ------------------------------------------------------------------
    // helpers shared by the built-in kernel

    /// Unify and continue: the usual tail of a deterministic built-in.
    pub(crate) fn unify_then(&mut self, env: &mut Env, a: &Term, b: &Term, k: &Cont) -> Promise {
        let cp = env.checkpoint();
        if unify(env, a, b) {
            k(self, env)
        } else {
            env.restore(cp);
            Promise::fail()
        }
    }

    /// Run `goal` in a fresh cut scope: a cut inside is local.
    pub(crate) fn solve_opaque(&mut self, env: &mut Env, goal: &Term, k: Cont) -> Promise {
        let b = self.fresh_barrier();
        let goal = goal.clone();
        Promise::barrier_choice(
            b,
            [Box::new(move |m: &mut Machine, env: &mut Env| m.solve(env, &goal, k, b)) as Thunk],
        )
    }

    /// Prove `goal` to its first solution with a nested forcer,
    /// keeping any bindings.  The caller restores the environment if
    /// the bindings are not wanted.
    pub(crate) fn solve_once(&mut self, env: &mut Env, goal: &Term) -> Result<bool, Exception> {
        let k: Cont = Rc::new(|_, _| Promise::ok());
        let p = self.solve_opaque(env, goal, k);
        Forcer::new().force(self, env, p)
    }

    /// All solutions of `goal`, each recorded by `snapshot` against
    /// the solution environment.  The environment is restored before
    /// returning.
    pub(crate) fn collect_solutions(
        &mut self,
        env: &mut Env,
        goal: &Term,
        snapshot: impl Fn(&mut Env) -> Term + 'static,
    ) -> Result<Vec<Term>, Exception> {
        let results: Rc<RefCell<Vec<Term>>> = Rc::new(RefCell::new(Vec::new()));
        let k: Cont = {
            let results = results.clone();
            Rc::new(move |_m: &mut Machine, env: &mut Env| {
                results.borrow_mut().push(snapshot(env));
                Promise::fail()
            })
        };
        let cp = env.checkpoint();
        let p = self.solve_opaque(env, goal, k);
        let outcome = Forcer::new().force(self, env, p);
        env.restore(cp);
        outcome?;
        Ok(results.take())
    }

    // ------------------------------------------------------------------
    // program loading and queries

    /// Load a program text: install its clauses and execute its
    /// directives in order.
    pub fn consult(&mut self, text: &str) -> Result<(), Exception> {
        let mut lexer = Lexer::new(StrSource::new(text));
        loop {
            lexer.set_conv(self.active_conv());
            let out = Reader::new(&mut lexer, &self.ops)
                .read_term()
                .map_err(|e| syntax_error(e.detail()))?;
            let Some(read) = out else {
                return Ok(());
            };
            self.load_term(&read)?;
        }
    }

    fn load_term(&mut self, read: &ReadOut) -> Result<(), Exception> {
        if let Some(args) = read.term.as_struct(":-", 1) {
            let directive = args[0].clone();
            let mut env = Env::new();
            if !self.solve_once(&mut env, &directive)? {
                log::warn!(
                    "directive failed: {}",
                    directive.display(&env).with_ops(&self.ops)
                );
            }
            return Ok(());
        }
        let mut env = Env::new();
        let clause = compile_clause(&mut env, &read.term)?;
        let (head, _) = split_clause(&env, &clause.raw);
        let pi = Indicator::of(env.resolve(&head)).ok_or_else(|| {
            type_error("callable", env.resolved(&head))
        })?;
        self.store.install_consulted(pi, clause)
    }

    /// Parse one goal and return its solutions.
    pub fn query(&mut self, text: &str) -> Result<Solutions<'_>, Exception> {
        let mut lexer = Lexer::new(StrSource::new(text));
        lexer.set_conv(self.active_conv());
        let read = Reader::new(&mut lexer, &self.ops)
            .read_term()
            .map_err(|e| syntax_error(e.detail()))?
            .ok_or_else(|| syntax_error("empty query"))?;
        let vars = read
            .variable_names
            .iter()
            .map(|(name, var)| (name.clone(), var.clone()))
            .collect();
        Ok(Solutions {
            machine: self,
            env: Env::new(),
            forcer: Forcer::new(),
            vars,
            pending: Some(read.term),
            done: false,
        })
    }

    /// Prove a goal text once, discarding bindings.  Convenient for
    /// embeddings that only need success or failure.
    pub fn prove(&mut self, text: &str) -> Result<bool, Exception> {
        match self.query(text)?.next() {
            None => Ok(false),
            Some(Ok(_)) => Ok(true),
            Some(Err(e)) => Err(e),
        }
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

/// One solution's bindings for the query's named variables.
#[derive(Debug, Clone)]
pub struct Bindings {
    pairs: Vec<(String, Term)>,
}

impl Bindings {
    /// The binding of the named variable, if that name occurred in the
    /// query.
    pub fn get(&self, name: &str) -> Option<&Term> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    /// All `(name, value)` pairs in occurrence order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.pairs.iter().map(|(n, t)| (n.as_str(), t))
    }
}

/// The lazily produced solutions of one query.
///
/// Each `next()` resumes the search where the previous solution left
/// off; dropping the iterator abandons the remaining alternatives.
/// The three user-visible outcomes map onto the iterator protocol:
/// solutions are `Some(Ok(bindings))`, exhaustion is `None`, and an
/// uncaught exception is `Some(Err(e))` followed by `None`.
pub struct Solutions<'m> {
    machine: &'m mut Machine,
    env: Env,
    forcer: Forcer,
    vars: Vec<(String, Var)>,
    pending: Option<Term>,
    done: bool,
}

impl Iterator for Solutions<'_> {
    type Item = Result<Bindings, Exception>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let outcome = match self.pending.take() {
            Some(goal) => {
                let k: Cont = Rc::new(|_, _| Promise::ok());
                let p = self.machine.solve_opaque(&mut self.env, &goal, k);
                self.forcer.force(self.machine, &mut self.env, p)
            }
            None => self.forcer.resume(self.machine, &mut self.env),
        };
        match outcome {
            Ok(true) => {
                let pairs = self
                    .vars
                    .iter()
                    .map(|(name, var)| (name.clone(), self.env.resolved(&Term::var(var.clone()))))
                    .collect();
                Some(Ok(Bindings { pairs }))
            }
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
