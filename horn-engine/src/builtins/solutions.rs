//! All-solutions built-ins: `findall/3`, `bagof/3`, `setof/3`.

use crate::{Cont, Machine, ProcedureStore, Promise, Thunk};
use horn_terms::{compare, func, Env, Term, Var};
use std::cmp::Ordering;
use std::collections::HashMap;

pub fn register(store: &mut ProcedureStore) {
    store.register_builtin("findall", 3, findall);
    store.register_builtin("bagof", 3, |m, env, args, k| collect(m, env, args, k, false));
    store.register_builtin("setof", 3, |m, env, args, k| collect(m, env, args, k, true));
}

/// `findall(Template, Goal, Instances)`: all solutions as renamed
/// copies, in solution order; an empty list when there are none.
fn findall(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let template = args[0].clone();
    let results =
        match m.collect_solutions(env, &args[1], move |env| env.renamed_copy(&template)) {
            Ok(results) => results,
            Err(e) => return Promise::Error(e),
        };
    m.unify_then(env, &args[2], &Term::list(results), k)
}

/// Strip `V ^ Goal` prefixes, collecting the existential variables.
fn strip_carets(env: &Env, goal: &Term) -> (Vec<Var>, Term) {
    let mut existential = Vec::new();
    let mut goal = env.resolve(goal).clone();
    while let Some(pair) = goal.as_struct("^", 2).map(<[Term]>::to_vec) {
        existential.extend(env.term_variables(&pair[0]));
        goal = env.resolve(&pair[1]).clone();
    }
    (existential, goal)
}

/// Two terms are variants when they are structurally equal up to a
/// consistent renaming of variables.
fn variant(env: &Env, a: &Term, b: &Term) -> bool {
    fn go(
        env: &Env,
        a: &Term,
        b: &Term,
        fwd: &mut HashMap<u64, u64>,
        bwd: &mut HashMap<u64, u64>,
    ) -> bool {
        let a = env.resolve(a);
        let b = env.resolve(b);
        match (a, b) {
            (Term::Var(x), Term::Var(y)) => {
                let x_to = *fwd.entry(x.id()).or_insert_with(|| y.id());
                let y_to = *bwd.entry(y.id()).or_insert_with(|| x.id());
                x_to == y.id() && y_to == x.id()
            }
            (Term::Compound(x), Term::Compound(y)) => {
                x.functor() == y.functor()
                    && x.arity() == y.arity()
                    && x.args()
                        .iter()
                        .zip(y.args().iter())
                        .all(|(p, q)| go(env, p, q, fwd, bwd))
            }
            (x, y) => x == y,
        }
    }
    let (a, b) = (a.clone(), b.clone());
    go(env, &a, &b, &mut HashMap::new(), &mut HashMap::new())
}

/// The shared engine of `bagof/3` and `setof/3`.
///
/// Witness variables are the free variables of the goal not bound by
/// `^/2` and not occurring in the template.  Solutions are collected
/// findall-style as witness/template pairs and grouped by variant
/// witnesses; each group is one answer, binding the witnesses.  Both
/// predicates fail when the goal has no solution; `setof` sorts each
/// group under the standard order and drops duplicates, yielding
/// groups in witness order.
fn collect(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont, sorted: bool) -> Promise {
    let template = args[0].clone();
    let (existential, goal) = strip_carets(env, &args[1]);
    let witnesses: Vec<Var> = env
        .term_variables(&goal)
        .into_iter()
        .filter(|v| !existential.contains(v))
        .filter(|v| !env.term_variables(&template).contains(v))
        .collect();
    let witness_list = Term::list(witnesses.iter().cloned().map(Term::var).collect::<Vec<_>>());

    let pair_template = func!["-"; witness_list.clone(), template];
    let pairs = match m.collect_solutions(env, &goal, move |env| {
        env.renamed_copy(&pair_template)
    }) {
        Ok(pairs) => pairs,
        Err(e) => return Promise::Error(e),
    };
    if pairs.is_empty() {
        return Promise::fail();
    }

    // group by variant witness instances, in encounter order
    let mut groups: Vec<(Term, Vec<Term>)> = Vec::new();
    for pair in pairs {
        let parts = pair.as_struct("-", 2).expect("collected pairs are -/2");
        let (w, t) = (parts[0].clone(), parts[1].clone());
        match groups.iter_mut().find(|(key, _)| variant(env, key, &w)) {
            Some((_, items)) => items.push(t),
            None => groups.push((w, vec![t])),
        }
    }

    if sorted {
        for (_, items) in &mut groups {
            items.sort_by(|a, b| compare(env, a, b));
            items.dedup_by(|a, b| compare(env, a, b) == Ordering::Equal);
        }
        groups.sort_by(|(a, _), (b, _)| compare(env, a, b));
    }

    let target = func!["-"; witness_list, args[2].clone()];
    let alts: Vec<Thunk> = groups
        .into_iter()
        .map(|(key, items)| {
            let (target, k) = (target.clone(), k.clone());
            Box::new(move |m: &mut Machine, env: &mut Env| {
                let cand = func!["-"; key, Term::list(items)];
                m.unify_then(env, &target, &cand, &k)
            }) as Thunk
        })
        .collect();
    Promise::choice(alts)
}
