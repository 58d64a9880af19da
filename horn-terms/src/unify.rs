//! Unification of terms against a binding environment.
//!
//! Both entry points augment the environment on success and leave the
//! log in an undefined-but-longer state on failure; callers take a
//! [`Checkpoint`](crate::Checkpoint) before attempting a unification
//! and restore it when `false` comes back.

use crate::{Env, Term, Var};

/// Unify `a` and `b`, binding variables as needed.  Rational trees are
/// permitted: `X = f(X)` succeeds and leaves a cyclic binding.
pub fn unify(env: &mut Env, a: &Term, b: &Term) -> bool {
    unify_impl(env, a, b, false)
}

/// Unify `a` and `b`, rejecting any binding of a variable to a term
/// that contains it.  A success therefore never creates a cycle.
pub fn unify_with_occurs_check(env: &mut Env, a: &Term, b: &Term) -> bool {
    unify_impl(env, a, b, true)
}

fn unify_impl(env: &mut Env, a: &Term, b: &Term, occurs: bool) -> bool {
    // Explicit worklist: recursion depth would otherwise track the
    // length of list arguments.
    let mut work = vec![(a.clone(), b.clone())];
    while let Some((a, b)) = work.pop() {
        let a = env.resolve(&a).clone();
        let b = env.resolve(&b).clone();
        match (a, b) {
            (Term::Var(x), Term::Var(y)) if x == y => {}
            (Term::Var(x), t) | (t, Term::Var(x)) => {
                if occurs && occurs_in(env, &x, &t) {
                    return false;
                }
                env.bind(&x, t);
            }
            (Term::Atom(x), Term::Atom(y)) => {
                if x != y {
                    return false;
                }
            }
            (Term::Int(x), Term::Int(y)) => {
                if x != y {
                    return false;
                }
            }
            (Term::Float(x), Term::Float(y)) => {
                if x != y {
                    return false;
                }
            }
            (Term::Compound(x), Term::Compound(y)) => {
                if x.functor() != y.functor() || x.arity() != y.arity() {
                    return false;
                }
                for (p, q) in x.args().iter().zip(y.args().iter()).rev() {
                    work.push((p.clone(), q.clone()));
                }
            }
            _ => return false,
        }
    }
    true
}

/// `true` if `v` occurs in `t` after resolution.  Bound variables seen
/// on the way are tracked so rational trees cannot loop the search.
fn occurs_in(env: &Env, v: &Var, t: &Term) -> bool {
    let mut work = vec![t.clone()];
    let mut visited: Vec<u64> = Vec::new();
    while let Some(t) = work.pop() {
        let (entry, resolved) = env.resolve_step(&t);
        if let Some(e) = entry {
            if visited.contains(&e.id()) {
                continue;
            }
            visited.push(e.id());
        }
        match resolved {
            Term::Var(x) => {
                if x == v {
                    return true;
                }
            }
            Term::Compound(c) => {
                work.extend(c.args().iter().cloned());
            }
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{atom, func};

    #[test]
    fn unifies_var_with_structure() {
        let mut env = Env::new();
        let x = Var::fresh();
        assert!(unify(&mut env, &Term::var(x.clone()), &func!["f"; atom!("a")]));
        assert_eq!(env.resolve(&Term::var(x)), &func!["f"; atom!("a")]);
    }

    #[test]
    fn mismatched_atoms_fail() {
        let mut env = Env::new();
        let cp = env.checkpoint();
        assert!(!unify(&mut env, &atom!("a"), &func!["f"; atom!("a")]));
        env.restore(cp);
        assert!(env.is_empty());
    }

    #[test]
    fn compound_args_unify_pairwise() {
        let mut env = Env::new();
        let x = Var::fresh();
        let y = Var::fresh();
        let a = func!["f"; Term::var(x.clone()), atom!("b")];
        let b = func!["f"; atom!("a"), Term::var(y.clone())];
        assert!(unify(&mut env, &a, &b));
        assert_eq!(env.resolve(&Term::var(x)), &atom!("a"));
        assert_eq!(env.resolve(&Term::var(y)), &atom!("b"));
    }

    #[test]
    fn int_float_do_not_unify() {
        let mut env = Env::new();
        assert!(!unify(&mut env, &Term::int(1), &Term::float(1.0)));
    }

    #[test]
    fn rational_tree_is_permitted_without_occurs_check() {
        let mut env = Env::new();
        let x = Var::fresh();
        assert!(unify(
            &mut env,
            &Term::var(x.clone()),
            &func!["f"; Term::var(x.clone())]
        ));
        // the binding is cyclic but resolvable one step at a time
        let t = env.resolve(&Term::var(x)).clone();
        assert!(t.as_struct("f", 1).is_some());
    }

    #[test]
    fn occurs_check_rejects_cycle() {
        let mut env = Env::new();
        let x = Var::fresh();
        let cp = env.checkpoint();
        assert!(!unify_with_occurs_check(
            &mut env,
            &Term::var(x.clone()),
            &func!["f"; Term::var(x)]
        ));
        env.restore(cp);
    }

    #[test]
    fn occurs_check_survives_existing_rational_tree() {
        let mut env = Env::new();
        let x = Var::fresh();
        let y = Var::fresh();
        env.bind(&y, func!["f"; Term::var(y.clone())]);
        // X does not occur in the cyclic term bound to Y
        assert!(unify_with_occurs_check(
            &mut env,
            &Term::var(x),
            &Term::var(y)
        ));
    }

    #[test]
    fn unification_soundness() {
        let mut env = Env::new();
        let x = Var::fresh();
        let y = Var::fresh();
        let a = func!["g"; Term::var(x.clone()), func!["h"; Term::var(y.clone())]];
        let b = func!["g"; atom!("c"), func!["h"; Term::int(7)]];
        assert!(unify(&mut env, &a, &b));
        assert_eq!(env.resolved(&a), env.resolved(&b));
    }
}
