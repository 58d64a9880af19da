//! The built-in predicate kernel.
//!
//! Each built-in is a host function of the common [`BuiltinFn`]
//! signature, registered under its indicator.  Deterministic
//! built-ins unify and pass to the continuation; nondeterministic
//! ones return a [`Promise::choice`] whose alternatives unify one
//! candidate each.

mod arith;
mod atoms;
mod control;
mod db;
mod flags;
mod solutions;
mod streams;
mod terms;
mod typecheck;

use crate::{Cont, Machine, ProcedureStore, Promise, Thunk};
use horn_terms::{Env, Term};

/// Register the whole kernel into a procedure store.
pub fn register_all(store: &mut ProcedureStore) {
    control::register(store);
    typecheck::register(store);
    terms::register(store);
    db::register(store);
    solutions::register(store);
    arith::register(store);
    atoms::register(store);
    streams::register(store);
    flags::register(store);
}

/// Unify `target` with each candidate in order, as alternatives.
/// The shared backbone of the enumeration built-ins.
pub(crate) fn unify_candidates(
    target: &Term,
    candidates: Vec<Term>,
    k: &Cont,
) -> Promise {
    let alts: Vec<Thunk> = candidates
        .into_iter()
        .map(|cand| {
            let target = target.clone();
            let k = k.clone();
            Box::new(move |m: &mut Machine, env: &mut Env| m.unify_then(env, &target, &cand, &k))
                as Thunk
        })
        .collect();
    Promise::choice(alts)
}
