//! Type-checking built-ins: `var/1`, `atom/1`, `integer/1`, and the
//! rest of the kind tests.

use crate::{Cont, Machine, ProcedureStore, Promise};
use horn_terms::{Env, Term};

pub fn register(store: &mut ProcedureStore) {
    store.register_builtin("var", 1, |m, env, args, k| check(m, env, args, k, Term::is_var));
    store.register_builtin("nonvar", 1, |m, env, args, k| {
        check(m, env, args, k, |t| !t.is_var())
    });
    store.register_builtin("atom", 1, |m, env, args, k| {
        check(m, env, args, k, Term::is_atom)
    });
    store.register_builtin("integer", 1, |m, env, args, k| {
        check(m, env, args, k, |t| matches!(t, Term::Int(_)))
    });
    store.register_builtin("float", 1, |m, env, args, k| {
        check(m, env, args, k, |t| matches!(t, Term::Float(_)))
    });
    store.register_builtin("number", 1, |m, env, args, k| {
        check(m, env, args, k, Term::is_number)
    });
    store.register_builtin("atomic", 1, |m, env, args, k| {
        check(m, env, args, k, |t| !t.is_var() && !t.is_compound())
    });
    store.register_builtin("compound", 1, |m, env, args, k| {
        check(m, env, args, k, Term::is_compound)
    });
    store.register_builtin("callable", 1, |m, env, args, k| {
        check(m, env, args, k, Term::is_callable)
    });
    store.register_builtin("is_list", 1, is_list);
}

fn check(
    m: &mut Machine,
    env: &mut Env,
    args: &[Term],
    k: &Cont,
    pred: impl Fn(&Term) -> bool,
) -> Promise {
    if pred(env.resolve(&args[0])) {
        k(m, env)
    } else {
        Promise::fail()
    }
}

fn is_list(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let (_, tail) = env.list_view(&args[0]);
    if tail.is_nil() {
        k(m, env)
    } else {
        Promise::fail()
    }
}
