//! Control and meta-call built-ins: `call/1..8`, `\+/1`, `catch/3`,
//! `throw/1`, `halt/0,1`, `repeat/0`.

use crate::{
    instantiation_error, type_error, Choice, Cont, Exception, Machine, ProcedureStore, Promise,
    Thunk,
};
use horn_terms::{unify, Env, Term};
use std::collections::VecDeque;

pub fn register(store: &mut ProcedureStore) {
    for arity in 1..=8 {
        store.register_builtin("call", arity, call_n);
    }
    store.register_builtin("\\+", 1, not_provable);
    store.register_builtin("not", 1, not_provable);
    store.register_builtin("catch", 3, catch);
    store.register_builtin("throw", 1, throw);
    store.register_builtin("halt", 0, halt0);
    store.register_builtin("halt", 1, halt1);
    store.register_builtin("repeat", 0, repeat);
}

/// `call(Goal, Extra...)`: extend `Goal` with the extra arguments and
/// run it in a fresh cut scope, so a cut inside is opaque to the
/// caller's alternatives.
fn call_n(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let goal = env.resolve(&args[0]).clone();
    let extra = &args[1..];
    let goal = if extra.is_empty() {
        goal
    } else {
        match &goal {
            Term::Var(_) => return Promise::Error(instantiation_error(goal.clone())),
            Term::Atom(a) => Term::compound(a.clone(), extra.to_vec()),
            Term::Compound(c) => {
                let mut all = c.args().to_vec();
                all.extend_from_slice(extra);
                Term::compound(c.functor().clone(), all)
            }
            other => return Promise::Error(type_error("callable", env.resolved(other))),
        }
    };
    m.solve_opaque(env, &goal, k.clone())
}

/// `\+(Goal)`: succeeds exactly when `Goal` has no solution.  Any
/// bindings made while proving `Goal` are undone either way.
fn not_provable(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let cp = env.checkpoint();
    match m.solve_once(env, &args[0]) {
        Err(e) => Promise::Error(e),
        Ok(proved) => {
            env.restore(cp);
            if proved {
                Promise::fail()
            } else {
                k(m, env)
            }
        }
    }
}

/// `catch(Goal, Catcher, Recovery)`: run `Goal` under a recover
/// handler.  A ball unifying with `Catcher` restores the environment
/// to the catch point, keeps the unification bindings, and runs
/// `Recovery`; any other ball keeps unwinding.  The goal gets its own
/// cut scope *inside* the handler frame, so a cut in `Goal` cannot
/// discard the handler.
fn catch(_m: &mut Machine, _env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let goal = args[0].clone();
    let catcher = args[1].clone();
    let recovery = args[2].clone();
    let k_goal = k.clone();
    let k_rec = k.clone();
    Promise::Choice(Choice {
        barrier: None,
        alts: VecDeque::from([Box::new(move |m: &mut Machine, env: &mut Env| {
            m.solve_opaque(env, &goal, k_goal)
        }) as Thunk]),
        recover: Some(Box::new(move |m, env, ball| {
            let cp = env.checkpoint();
            if unify(env, &catcher, &ball) {
                Some(m.solve_opaque(env, &recovery, k_rec))
            } else {
                env.restore(cp);
                None
            }
        })),
    })
}

/// `throw(Ball)`: snapshot the ball (fresh variables, sharing kept)
/// and hand it to the promise machinery.
fn throw(_m: &mut Machine, env: &mut Env, args: &[Term], _k: &Cont) -> Promise {
    let t = env.resolve(&args[0]).clone();
    if t.is_var() {
        return Promise::Error(instantiation_error(t));
    }
    Promise::Error(Exception::Ball(env.renamed_copy(&args[0])))
}

fn halt0(_m: &mut Machine, _env: &mut Env, _args: &[Term], _k: &Cont) -> Promise {
    Promise::Error(Exception::Halt(0))
}

fn halt1(_m: &mut Machine, env: &mut Env, args: &[Term], _k: &Cont) -> Promise {
    let t = env.resolve(&args[0]).clone();
    match t {
        Term::Int(code) => Promise::Error(Exception::Halt(code)),
        Term::Var(_) => Promise::Error(instantiation_error(t)),
        other => Promise::Error(type_error("integer", env.resolved(&other))),
    }
}

/// `repeat`: succeed, and succeed again on every backtrack.
fn repeat(_m: &mut Machine, _env: &mut Env, _args: &[Term], k: &Cont) -> Promise {
    let k1 = k.clone();
    let k2 = k.clone();
    Promise::choice([
        Box::new(move |m: &mut Machine, env: &mut Env| k1(m, env)) as Thunk,
        Box::new(move |m: &mut Machine, env: &mut Env| repeat(m, env, &[], &k2)),
    ])
}
