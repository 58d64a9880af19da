//! Structural built-ins: unification, term construction and
//! inspection, copying, and the standard-order comparisons.

use super::unify_candidates;
use crate::{domain_error, instantiation_error, type_error, Cont, Machine, ProcedureStore, Promise};
use horn_terms::{compare, func, unify, unify_with_occurs_check, Env, Term, Var};
use std::cmp::Ordering;

pub fn register(store: &mut ProcedureStore) {
    store.register_builtin("=", 2, unify2);
    store.register_builtin("\\=", 2, not_unifiable);
    store.register_builtin("unify_with_occurs_check", 2, unify_occurs);
    store.register_builtin("functor", 3, functor3);
    store.register_builtin("arg", 3, arg3);
    store.register_builtin("=..", 2, univ);
    store.register_builtin("copy_term", 2, copy_term);
    store.register_builtin("compare", 3, compare3);
    store.register_builtin("==", 2, |m, env, args, k| {
        order_check(m, env, args, k, |o| o == Ordering::Equal)
    });
    store.register_builtin("\\==", 2, |m, env, args, k| {
        order_check(m, env, args, k, |o| o != Ordering::Equal)
    });
    store.register_builtin("@<", 2, |m, env, args, k| {
        order_check(m, env, args, k, |o| o == Ordering::Less)
    });
    store.register_builtin("@>", 2, |m, env, args, k| {
        order_check(m, env, args, k, |o| o == Ordering::Greater)
    });
    store.register_builtin("@=<", 2, |m, env, args, k| {
        order_check(m, env, args, k, |o| o != Ordering::Greater)
    });
    store.register_builtin("@>=", 2, |m, env, args, k| {
        order_check(m, env, args, k, |o| o != Ordering::Less)
    });
}

fn unify2(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    m.unify_then(env, &args[0], &args[1], k)
}

fn not_unifiable(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let cp = env.checkpoint();
    let unified = unify(env, &args[0], &args[1]);
    env.restore(cp);
    if unified {
        Promise::fail()
    } else {
        k(m, env)
    }
}

fn unify_occurs(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let cp = env.checkpoint();
    if unify_with_occurs_check(env, &args[0], &args[1]) {
        k(m, env)
    } else {
        env.restore(cp);
        Promise::fail()
    }
}

/// `functor(Term, Name, Arity)`: decompose a bound term, or build one
/// from name and arity with fresh arguments.
fn functor3(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let t = env.resolve(&args[0]).clone();
    match &t {
        Term::Var(_) => {
            let name = env.resolve(&args[1]).clone();
            let arity = env.resolve(&args[2]).clone();
            let n = match &arity {
                Term::Var(_) => return Promise::Error(instantiation_error(arity)),
                Term::Int(n) if *n >= 0 => *n,
                Term::Int(_) => {
                    return Promise::Error(domain_error(
                        "not_less_than_zero",
                        env.resolved(&arity),
                    ))
                }
                other => return Promise::Error(type_error("integer", env.resolved(other))),
            };
            let built = match &name {
                Term::Var(_) => return Promise::Error(instantiation_error(name)),
                Term::Atom(a) => Term::compound(
                    a.clone(),
                    (0..n).map(|_| Term::var(Var::fresh())).collect(),
                ),
                _ if n == 0 => name.clone(),
                _ if name.is_number() => {
                    return Promise::Error(type_error("atom", env.resolved(&name)))
                }
                other => return Promise::Error(type_error("atomic", env.resolved(other))),
            };
            m.unify_then(env, &t, &built, k)
        }
        Term::Compound(c) => {
            let name = Term::Atom(c.functor().clone());
            let arity = Term::int(c.arity() as i64);
            let target = func!["f"; args[1].clone(), args[2].clone()];
            m.unify_then(env, &target, &func!["f"; name, arity], k)
        }
        atomic => {
            let target = func!["f"; args[1].clone(), args[2].clone()];
            m.unify_then(env, &target, &func!["f"; atomic.clone(), Term::int(0)], k)
        }
    }
}

/// `arg(N, Term, Arg)`: with `N` unbound, enumerates argument
/// positions left to right.
fn arg3(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let t = env.resolve(&args[1]).clone();
    let c = match &t {
        Term::Var(_) => return Promise::Error(instantiation_error(t)),
        Term::Compound(c) => c.clone(),
        other => return Promise::Error(type_error("compound", env.resolved(other))),
    };
    let n = env.resolve(&args[0]).clone();
    match &n {
        Term::Var(_) => {
            let target = func!["a"; args[0].clone(), args[2].clone()];
            let candidates = c
                .args()
                .iter()
                .enumerate()
                .map(|(i, a)| func!["a"; Term::int(i as i64 + 1), a.clone()])
                .collect();
            unify_candidates(&target, candidates, k)
        }
        Term::Int(i) => {
            if *i < 1 || *i as usize > c.arity() {
                return Promise::fail();
            }
            m.unify_then(env, &args[2], &c.args()[*i as usize - 1], k)
        }
        other => Promise::Error(type_error("integer", env.resolved(other))),
    }
}

/// `Term =.. List` (univ).
fn univ(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let t = env.resolve(&args[0]).clone();
    match &t {
        Term::Var(_) => {
            let (items, tail) = env.list_view(&args[1]);
            if tail.is_var() {
                return Promise::Error(instantiation_error(tail));
            }
            if !tail.is_nil() {
                return Promise::Error(type_error("list", env.resolved(&args[1])));
            }
            let Some((head, rest)) = items.split_first() else {
                return Promise::Error(domain_error("non_empty_list", Term::nil()));
            };
            let head = env.resolve(head).clone();
            let built = match &head {
                Term::Var(_) => return Promise::Error(instantiation_error(head)),
                Term::Atom(a) => Term::compound(a.clone(), rest.to_vec()),
                _ if rest.is_empty() => head.clone(),
                other => return Promise::Error(type_error("atom", env.resolved(other))),
            };
            m.unify_then(env, &t, &built, k)
        }
        Term::Compound(c) => {
            let mut items = vec![Term::Atom(c.functor().clone())];
            items.extend(c.args().iter().cloned());
            m.unify_then(env, &args[1], &Term::list(items), k)
        }
        atomic => m.unify_then(env, &args[1], &Term::list(vec![atomic.clone()]), k),
    }
}

fn copy_term(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let copy = env.renamed_copy(&args[0]);
    m.unify_then(env, &args[1], &copy, k)
}

/// `compare(Order, A, B)` under the standard order of terms.
fn compare3(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let order = env.resolve(&args[0]).clone();
    if let Some(a) = order.as_atom() {
        if !matches!(a.as_str(), "<" | "=" | ">") {
            return Promise::Error(domain_error("order", order.clone()));
        }
    } else if !order.is_var() {
        return Promise::Error(type_error("atom", env.resolved(&order)));
    }
    let result = match compare(env, &args[1], &args[2]) {
        Ordering::Less => "<",
        Ordering::Equal => "=",
        Ordering::Greater => ">",
    };
    m.unify_then(env, &order, &Term::atom(result), k)
}

fn order_check(
    m: &mut Machine,
    env: &mut Env,
    args: &[Term],
    k: &Cont,
    accept: impl Fn(Ordering) -> bool,
) -> Promise {
    if accept(compare(env, &args[0], &args[1])) {
        k(m, env)
    } else {
        Promise::fail()
    }
}
