//! Flag, operator-table, and character-conversion built-ins.

use super::unify_candidates;
use crate::{
    domain_error, instantiation_error, permission_error, type_error, Cont, Machine,
    ProcedureStore, Promise,
};
use horn_terms::{func, Env, OperSpec, Term, TermError};

pub fn register(store: &mut ProcedureStore) {
    store.register_builtin("set_prolog_flag", 2, set_prolog_flag);
    store.register_builtin("current_prolog_flag", 2, current_prolog_flag);
    store.register_builtin("op", 3, op3);
    store.register_builtin("current_op", 3, current_op);
    store.register_builtin("char_conversion", 2, char_conversion);
    store.register_builtin("current_char_conversion", 2, current_char_conversion);
}

fn set_prolog_flag(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let name = env.resolve(&args[0]).clone();
    let value = env.resolve(&args[1]).clone();
    let name = match &name {
        Term::Var(_) => return Promise::Error(instantiation_error(name)),
        Term::Atom(a) => a.clone(),
        other => return Promise::Error(type_error("atom", env.resolved(other))),
    };
    if value.is_var() {
        return Promise::Error(instantiation_error(value));
    }
    match m.flags.set(name.as_str(), &value) {
        Ok(()) => k(m, env),
        Err(e) => Promise::Error(e),
    }
}

fn current_prolog_flag(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let name = env.resolve(&args[0]).clone();
    if let Some(a) = name.as_atom() {
        if !m
            .flags
            .entries()
            .iter()
            .any(|(flag, _)| flag.as_atom() == Some(a))
        {
            return Promise::Error(domain_error("prolog_flag", name.clone()));
        }
    } else if !name.is_var() {
        return Promise::Error(type_error("atom", env.resolved(&name)));
    }
    let target = func!["f"; name, args[1].clone()];
    let candidates = m
        .flags
        .entries()
        .into_iter()
        .map(|(flag, value)| func!["f"; flag, value])
        .collect();
    unify_candidates(&target, candidates, k)
}

/// `op(Priority, Specifier, Name)`: install, replace, or remove
/// operator definitions.  `Name` may be one atom or a list of atoms.
fn op3(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let priority = env.resolve(&args[0]).clone();
    let priority = match &priority {
        Term::Var(_) => return Promise::Error(instantiation_error(priority)),
        Term::Int(p) => *p,
        other => return Promise::Error(type_error("integer", env.resolved(other))),
    };
    let spec_term = env.resolve(&args[1]).clone();
    let spec = match &spec_term {
        Term::Var(_) => return Promise::Error(instantiation_error(spec_term)),
        Term::Atom(a) => match a.as_str().parse::<OperSpec>() {
            Ok(spec) => spec,
            Err(_) => {
                return Promise::Error(domain_error(
                    "operator_specifier",
                    spec_term.clone(),
                ))
            }
        },
        other => return Promise::Error(type_error("atom", env.resolved(other))),
    };
    let names_term = env.resolve(&args[2]).clone();
    let names = if names_term.as_struct(".", 2).is_some() {
        let (items, tail) = env.list_view(&names_term);
        if tail.is_var() {
            return Promise::Error(instantiation_error(tail));
        }
        if !tail.is_nil() {
            return Promise::Error(type_error("list", env.resolved(&names_term)));
        }
        items
    } else {
        vec![names_term]
    };
    for name in names {
        let name = env.resolve(&name).clone();
        let atom = match &name {
            Term::Var(_) => return Promise::Error(instantiation_error(name)),
            Term::Atom(a) => a.clone(),
            other => return Promise::Error(type_error("atom", env.resolved(other))),
        };
        if let Err(e) = m.ops.define(priority, spec, &atom) {
            return Promise::Error(match e {
                TermError::InvalidOperPriority(p) => {
                    domain_error("operator_priority", Term::int(p))
                }
                TermError::InvalidOperSpec(_) => {
                    domain_error("operator_specifier", spec_term.clone())
                }
                TermError::ReservedOperator(a) | TermError::ConflictingOperator(a) => {
                    permission_error("modify", "operator", Term::Atom(a))
                }
            });
        }
    }
    k(m, env)
}

fn current_op(m: &mut Machine, _env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let target = func![
        "op";
        args[0].clone(),
        args[1].clone(),
        args[2].clone()
    ];
    let candidates = m
        .ops
        .iter()
        .map(|(name, def)| {
            func![
                "op";
                Term::int(def.priority as i64),
                Term::atom(def.spec.to_string()),
                Term::Atom(name.clone())
            ]
        })
        .collect();
    unify_candidates(&target, candidates, k)
}

fn one_char(env: &Env, t: &Term) -> Result<char, Promise> {
    let t = env.resolve(t).clone();
    match &t {
        Term::Var(_) => Err(Promise::Error(instantiation_error(t))),
        Term::Atom(a) if a.as_str().chars().count() == 1 => {
            Ok(a.as_str().chars().next().expect("one char"))
        }
        other => Err(Promise::Error(type_error("character", env.resolved(other)))),
    }
}

/// `char_conversion(In, Out)`: `In = Out` removes the mapping.
fn char_conversion(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let from = match one_char(env, &args[0]) {
        Ok(c) => c,
        Err(p) => return p,
    };
    let to = match one_char(env, &args[1]) {
        Ok(c) => c,
        Err(p) => return p,
    };
    if from == to {
        m.conv.remove(&from);
    } else {
        m.conv.insert(from, to);
    }
    k(m, env)
}

fn current_char_conversion(m: &mut Machine, _env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let target = func!["c"; args[0].clone(), args[1].clone()];
    let mut pairs: Vec<(char, char)> = m.conv.iter().map(|(a, b)| (*a, *b)).collect();
    pairs.sort_unstable();
    let candidates = pairs
        .into_iter()
        .map(|(from, to)| {
            func![
                "c";
                Term::atom(from.to_string()),
                Term::atom(to.to_string())
            ]
        })
        .collect();
    unify_candidates(&target, candidates, k)
}
