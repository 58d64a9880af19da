//! The standard order of terms.
//!
//! A total order used by `compare/3`, the term-order comparison
//! built-ins, and the set-collection built-ins:
//! variable < number < atom < compound.  Variables compare by identity,
//! numbers by value (a float ties below an integer of equal value),
//! atoms by name, and compounds by arity, then functor name, then
//! arguments left to right.

use crate::{Env, Term};
use std::cmp::Ordering;

fn class(t: &Term) -> u8 {
    match t {
        Term::Var(_) => 0,
        Term::Int(_) | Term::Float(_) => 1,
        Term::Atom(_) => 2,
        Term::Compound(_) => 3,
    }
}

fn number_cmp(a: &Term, b: &Term) -> Ordering {
    match (a, b) {
        (Term::Int(x), Term::Int(y)) => x.cmp(y),
        (Term::Float(x), Term::Float(y)) => x.total_cmp(y),
        (Term::Int(x), Term::Float(y)) => (*x as f64).total_cmp(y).then(Ordering::Greater),
        (Term::Float(x), Term::Int(y)) => x.total_cmp(&(*y as f64)).then(Ordering::Less),
        _ => unreachable!("number_cmp on non-numbers"),
    }
}

/// Compare `a` and `b` under the standard order of terms, resolving
/// both sides against `env`.  Terminates on rational trees: a pair of
/// cyclic positions already descended through is considered equal.
pub fn compare(env: &Env, a: &Term, b: &Term) -> Ordering {
    let mut work = vec![(a.clone(), b.clone())];
    let mut seen: Vec<(u64, u64)> = Vec::new();
    while let Some((a, b)) = work.pop() {
        let (ea, ra) = env.resolve_step(&a);
        let (eb, rb) = env.resolve_step(&b);
        if let (Some(x), Some(y)) = (ea, eb) {
            let pair = (x.id(), y.id());
            if seen.contains(&pair) {
                continue;
            }
            seen.push(pair);
        }
        let ord = match (ra, rb) {
            (Term::Var(x), Term::Var(y)) => x.id().cmp(&y.id()),
            (Term::Atom(x), Term::Atom(y)) => x.cmp(y),
            (x, y) if x.is_number() && y.is_number() => number_cmp(x, y),
            (Term::Compound(x), Term::Compound(y)) => {
                let head = x
                    .arity()
                    .cmp(&y.arity())
                    .then_with(|| x.functor().cmp(y.functor()));
                if head != Ordering::Equal {
                    return head;
                }
                for (p, q) in x.args().iter().zip(y.args().iter()).rev() {
                    work.push((p.clone(), q.clone()));
                }
                continue;
            }
            (x, y) => class(x).cmp(&class(y)),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{atom, func, Var};

    #[test]
    fn class_ordering() {
        let env = Env::new();
        let v = Term::var(Var::fresh());
        let n = Term::int(100);
        let a = atom!("zebra");
        let c = func!["a"; Term::int(1)];
        assert_eq!(compare(&env, &v, &n), Ordering::Less);
        assert_eq!(compare(&env, &n, &a), Ordering::Less);
        assert_eq!(compare(&env, &a, &c), Ordering::Less);
    }

    #[test]
    fn numbers_compare_by_value_float_first_on_tie() {
        let env = Env::new();
        assert_eq!(compare(&env, &Term::int(1), &Term::float(1.5)), Ordering::Less);
        assert_eq!(compare(&env, &Term::float(1.0), &Term::int(1)), Ordering::Less);
        assert_eq!(compare(&env, &Term::int(1), &Term::float(1.0)), Ordering::Greater);
    }

    #[test]
    fn compounds_by_arity_then_functor_then_args() {
        let env = Env::new();
        let f1 = func!["z"; Term::int(1)];
        let f2 = func!["a"; Term::int(1), Term::int(2)];
        assert_eq!(compare(&env, &f1, &f2), Ordering::Less);

        let g1 = func!["a"; Term::int(1)];
        assert_eq!(compare(&env, &g1, &f1), Ordering::Less);

        let h1 = func!["a"; Term::int(1)];
        let h2 = func!["a"; Term::int(2)];
        assert_eq!(compare(&env, &h1, &h2), Ordering::Less);
        assert_eq!(compare(&env, &h1, &h1), Ordering::Equal);
    }

    #[test]
    fn resolves_before_comparing() {
        let mut env = Env::new();
        let x = Var::fresh();
        env.bind(&x, atom!("a"));
        assert_eq!(compare(&env, &Term::var(x), &atom!("a")), Ordering::Equal);
    }

    #[test]
    fn variables_by_identity() {
        let env = Env::new();
        let x = Var::fresh();
        let y = Var::fresh();
        assert_eq!(
            compare(&env, &Term::var(x.clone()), &Term::var(y)),
            Ordering::Less
        );
        assert_eq!(
            compare(&env, &Term::var(x.clone()), &Term::var(x)),
            Ordering::Equal
        );
    }

    #[test]
    fn rational_trees_compare_equal_to_themselves() {
        let mut env = Env::new();
        let x = Var::fresh();
        env.bind(&x, func!["f"; Term::var(x.clone())]);
        let y = Var::fresh();
        env.bind(&y, func!["f"; Term::var(y.clone())]);
        assert_eq!(
            compare(&env, &Term::var(x), &Term::var(y)),
            Ordering::Equal
        );
    }
}
