//! Arithmetic built-ins: `is/2` and the numeric comparisons.

use crate::{eval, Cont, Machine, ProcedureStore, Promise};
use horn_terms::{Env, Term};
use std::cmp::Ordering;

pub fn register(store: &mut ProcedureStore) {
    store.register_builtin("is", 2, is2);
    store.register_builtin("=:=", 2, |m, env, args, k| {
        num_check(m, env, args, k, |o| o == Ordering::Equal)
    });
    store.register_builtin("=\\=", 2, |m, env, args, k| {
        num_check(m, env, args, k, |o| o != Ordering::Equal)
    });
    store.register_builtin("<", 2, |m, env, args, k| {
        num_check(m, env, args, k, |o| o == Ordering::Less)
    });
    store.register_builtin(">", 2, |m, env, args, k| {
        num_check(m, env, args, k, |o| o == Ordering::Greater)
    });
    store.register_builtin("=<", 2, |m, env, args, k| {
        num_check(m, env, args, k, |o| o != Ordering::Greater)
    });
    store.register_builtin(">=", 2, |m, env, args, k| {
        num_check(m, env, args, k, |o| o != Ordering::Less)
    });
}

/// `Result is Expression`.
fn is2(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    match eval(env, &args[1]) {
        Ok(n) => m.unify_then(env, &args[0], &n.to_term(), k),
        Err(e) => Promise::Error(e),
    }
}

fn num_check(
    m: &mut Machine,
    env: &mut Env,
    args: &[Term],
    k: &Cont,
    accept: impl Fn(Ordering) -> bool,
) -> Promise {
    let lhs = match eval(env, &args[0]) {
        Ok(n) => n,
        Err(e) => return Promise::Error(e),
    };
    let rhs = match eval(env, &args[1]) {
        Ok(n) => n,
        Err(e) => return Promise::Error(e),
    };
    if accept(lhs.cmp(rhs)) {
        k(m, env)
    } else {
        Promise::fail()
    }
}
