//! Database built-ins: assert, retract, abolish, clause inspection.

use super::unify_candidates;
use crate::{
    compile_clause, instantiation_error, permission_error, split_clause, type_error, Cont,
    Indicator, Machine, Procedure, ProcedureStore, Promise, Thunk,
};
use horn_terms::{func, unify, Env, Term};

pub fn register(store: &mut ProcedureStore) {
    store.register_builtin("assertz", 1, |m, env, args, k| {
        assert_clause(m, env, args, k, false)
    });
    store.register_builtin("asserta", 1, |m, env, args, k| {
        assert_clause(m, env, args, k, true)
    });
    store.register_builtin("retract", 1, retract);
    store.register_builtin("abolish", 1, abolish);
    store.register_builtin("clause", 2, clause2);
    store.register_builtin("current_predicate", 1, current_predicate);
    store.register_builtin("dynamic", 1, dynamic1);
}

/// `assertz/1` and `asserta/1`.  A directive `:- Goal` in assert
/// position executes immediately instead of being stored.
fn assert_clause(
    m: &mut Machine,
    env: &mut Env,
    args: &[Term],
    k: &Cont,
    front: bool,
) -> Promise {
    let t = env.resolve(&args[0]).clone();
    if t.is_var() {
        return Promise::Error(instantiation_error(t));
    }
    if let Some(directive) = t.as_struct(":-", 1) {
        let goal = directive[0].clone();
        return m.solve_opaque(env, &goal, k.clone());
    }
    let clause = match compile_clause(env, &t) {
        Ok(c) => c,
        Err(e) => return Promise::Error(e),
    };
    let (head, _) = split_clause(env, &clause.raw);
    let pi = Indicator::of(env.resolve(&head)).expect("compiled head is callable");
    match m.store.install_clause(pi, clause, front) {
        Ok(()) => k(m, env),
        Err(e) => Promise::Error(e),
    }
}

/// `retract(Clause)`: alternatives over the matching clauses; each
/// removes its clause before the continuation runs, so backtracking
/// removes the next match.
fn retract(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let t = env.resolve(&args[0]).clone();
    if t.is_var() {
        return Promise::Error(instantiation_error(t));
    }
    let (head, body) = split_clause(env, &t);
    let head = env.resolve(&head).clone();
    if head.is_var() {
        return Promise::Error(instantiation_error(head));
    }
    let Some(pi) = Indicator::of(&head) else {
        return Promise::Error(type_error("callable", env.resolved(&head)));
    };
    let Some(set) = m.store.clauses(&pi) else {
        return match m.store.get(&pi) {
            Some(Procedure::Builtin(_)) => Promise::Error(permission_error(
                "modify",
                "static_procedure",
                pi.to_term(),
            )),
            _ => Promise::fail(),
        };
    };
    if !set.dynamic {
        return Promise::Error(permission_error(
            "modify",
            "static_procedure",
            pi.to_term(),
        ));
    }
    let alts: Vec<Thunk> = set
        .clauses
        .clone()
        .into_iter()
        .map(|cl| {
            let (head, body, pi, k) = (head.clone(), body.clone(), pi.clone(), k.clone());
            Box::new(move |m: &mut Machine, env: &mut Env| {
                let cp = env.checkpoint();
                let renamed = env.renamed_copy(&cl.raw);
                let (h, b) = split_clause(env, &renamed);
                if unify(env, &head, &h) && unify(env, &body, &b) {
                    if let Err(e) = m.store.remove_clause(&pi, &cl) {
                        return Promise::Error(e);
                    }
                    k(m, env)
                } else {
                    env.restore(cp);
                    Promise::fail()
                }
            }) as Thunk
        })
        .collect();
    Promise::choice(alts)
}

/// `abolish(PI)`: drop a whole dynamic procedure.
fn abolish(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let pi = match Indicator::from_term(env, &args[0]) {
        Ok(pi) => pi,
        Err(e) => return Promise::Error(e),
    };
    match m.store.abolish(&pi) {
        Ok(()) => k(m, env),
        Err(e) => Promise::Error(e),
    }
}

/// `clause(Head, Body)`: reads through the store, renaming each
/// stored clause apart before unification.
fn clause2(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let head = env.resolve(&args[0]).clone();
    if head.is_var() {
        return Promise::Error(instantiation_error(head));
    }
    let Some(pi) = Indicator::of(&head) else {
        return Promise::Error(type_error("callable", env.resolved(&head)));
    };
    let body = env.resolve(&args[1]).clone();
    if !body.is_var() && !body.is_callable() {
        return Promise::Error(type_error("callable", env.resolved(&body)));
    }
    match m.store.get(&pi) {
        Some(Procedure::Builtin(_)) => Promise::Error(permission_error(
            "access",
            "private_procedure",
            pi.to_term(),
        )),
        None => Promise::fail(),
        Some(Procedure::Clauses(set)) => {
            let alts: Vec<Thunk> = set
                .clauses
                .clone()
                .into_iter()
                .map(|cl| {
                    let (head, body, k) = (head.clone(), body.clone(), k.clone());
                    Box::new(move |m: &mut Machine, env: &mut Env| {
                        let renamed = env.renamed_copy(&cl.raw);
                        let (h, b) = split_clause(env, &renamed);
                        let target = func!["c"; head, body];
                        m.unify_then(env, &target, &func!["c"; h, b], &k)
                    }) as Thunk
                })
                .collect();
            Promise::choice(alts)
        }
    }
}

/// `current_predicate(PI)`: enumerate the clause-defined procedures.
fn current_predicate(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let t = env.resolve(&args[0]).clone();
    let shaped = t.is_var() || t.as_struct("/", 2).is_some();
    if !shaped {
        return Promise::Error(type_error(
            "predicate_indicator",
            env.resolved(&t),
        ));
    }
    let candidates = m
        .store
        .user_indicators()
        .map(Indicator::to_term)
        .collect();
    unify_candidates(&t, candidates, k)
}

/// `dynamic(PI)`: declare one indicator, or a `,`-sequence or list of
/// them, dynamic.
fn dynamic1(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let mut pending = vec![args[0].clone()];
    while let Some(next) = pending.pop() {
        let t = env.resolve(&next).clone();
        if let Some(pair) = t.as_struct(",", 2) {
            pending.push(pair[1].clone());
            pending.push(pair[0].clone());
            continue;
        }
        if t.as_struct(".", 2).is_some() || t.is_nil() {
            let (items, _) = env.list_view(&t);
            pending.extend(items);
            continue;
        }
        let pi = match Indicator::from_term(env, &t) {
            Ok(pi) => pi,
            Err(e) => return Promise::Error(e),
        };
        if let Err(e) = m.store.declare_dynamic(pi) {
            return Promise::Error(e);
        }
    }
    k(m, env)
}
