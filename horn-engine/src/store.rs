//! The procedure store: indicators, procedures, and their mutability.
//!
//! Procedures are keyed by `(name, arity)` indicators and kept in
//! definition order so `current_predicate/1` enumerates
//! deterministically.  A procedure is either a built-in (always
//! static) or a clause list; clause lists loaded from source are
//! static unless declared dynamic, while `assertz/1` on an undefined
//! indicator creates a dynamic one.

use crate::{permission_error, type_error, Clause, Cont, Exception, Machine, Promise};
use horn_terms::{func, Atom, Env, Term};
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// A procedure indicator: functor name plus arity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Indicator {
    pub name: Atom,
    pub arity: usize,
}

impl Indicator {
    pub fn new(name: Atom, arity: usize) -> Self {
        Self { name, arity }
    }

    /// The indicator of a callable term.
    pub fn of(goal: &Term) -> Option<Self> {
        goal.name()
            .map(|name| Self::new(name.clone(), goal.arity()))
    }

    /// Read an `F/A` term, with the ISO errors for the usual misuses.
    pub fn from_term(env: &Env, t: &Term) -> Result<Self, Exception> {
        let t = env.resolve(t).clone();
        let Some(args) = t.as_struct("/", 2) else {
            return Err(type_error(
                "predicate_indicator",
                env.resolved(&t),
            ));
        };
        let name = env.resolve(&args[0]).clone();
        let arity = env.resolve(&args[1]).clone();
        match (&name, &arity) {
            (Term::Var(_), _) | (_, Term::Var(_)) => Err(crate::instantiation_error(t)),
            (Term::Atom(name), Term::Int(n)) if *n >= 0 => {
                Ok(Self::new(name.clone(), *n as usize))
            }
            (Term::Atom(_), _) => Err(type_error("integer", env.resolved(&arity))),
            _ => Err(type_error("atom", env.resolved(&name))),
        }
    }

    /// The `F/A` term for this indicator.
    pub fn to_term(&self) -> Term {
        func![
            "/";
            Term::Atom(self.name.clone()),
            Term::int(self.arity as i64)
        ]
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// The host function behind a built-in predicate.
pub type BuiltinFn = fn(&mut Machine, &mut Env, &[Term], &Cont) -> Promise;

/// A clause list and its modifiability.
pub struct ClauseSet {
    pub clauses: Vec<Rc<Clause>>,
    pub dynamic: bool,
}

/// One entry of the procedure store.
pub enum Procedure {
    Builtin(BuiltinFn),
    Clauses(ClauseSet),
}

/// Maps indicators to procedures.
#[derive(Default)]
pub struct ProcedureStore {
    map: IndexMap<Indicator, Procedure>,
}

impl ProcedureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pi: &Indicator) -> Option<&Procedure> {
        self.map.get(pi)
    }

    /// Register a built-in under `name/arity`.
    pub fn register_builtin(&mut self, name: &str, arity: usize, f: BuiltinFn) {
        self.map
            .insert(Indicator::new(Atom::new(name), arity), Procedure::Builtin(f));
    }

    /// Install a clause at the front or back of its procedure,
    /// enforcing the static-procedure protection.  An undefined
    /// indicator implicitly becomes a dynamic procedure.
    pub fn install_clause(
        &mut self,
        pi: Indicator,
        clause: Clause,
        front: bool,
    ) -> Result<(), Exception> {
        let set = match self.map.entry(pi.clone()).or_insert_with(|| {
            Procedure::Clauses(ClauseSet {
                clauses: Vec::new(),
                dynamic: true,
            })
        }) {
            Procedure::Builtin(_) => {
                return Err(modify_static(&pi));
            }
            Procedure::Clauses(set) if !set.dynamic => {
                return Err(modify_static(&pi));
            }
            Procedure::Clauses(set) => set,
        };
        if front {
            set.clauses.insert(0, Rc::new(clause));
        } else {
            set.clauses.push(Rc::new(clause));
        }
        Ok(())
    }

    /// Install a clause read from a source file: appends without the
    /// static check, and an indicator not declared dynamic beforehand
    /// becomes a static procedure.
    pub fn install_consulted(&mut self, pi: Indicator, clause: Clause) -> Result<(), Exception> {
        match self.map.entry(pi.clone()).or_insert_with(|| {
            Procedure::Clauses(ClauseSet {
                clauses: Vec::new(),
                dynamic: false,
            })
        }) {
            Procedure::Builtin(_) => Err(modify_static(&pi)),
            Procedure::Clauses(set) => {
                set.clauses.push(Rc::new(clause));
                Ok(())
            }
        }
    }

    /// Declare `pi` dynamic, creating an empty procedure if needed.
    pub fn declare_dynamic(&mut self, pi: Indicator) -> Result<(), Exception> {
        match self.map.entry(pi.clone()).or_insert_with(|| {
            Procedure::Clauses(ClauseSet {
                clauses: Vec::new(),
                dynamic: true,
            })
        }) {
            Procedure::Builtin(_) => Err(modify_static(&pi)),
            Procedure::Clauses(set) if !set.dynamic && !set.clauses.is_empty() => {
                Err(modify_static(&pi))
            }
            Procedure::Clauses(set) => {
                set.dynamic = true;
                Ok(())
            }
        }
    }

    /// Remove the clause `target` (by identity) from `pi`.
    pub fn remove_clause(&mut self, pi: &Indicator, target: &Rc<Clause>) -> Result<(), Exception> {
        match self.map.get_mut(pi) {
            Some(Procedure::Clauses(set)) if set.dynamic => {
                set.clauses.retain(|c| !Rc::ptr_eq(c, target));
                Ok(())
            }
            Some(_) => Err(modify_static(pi)),
            None => Ok(()),
        }
    }

    /// Remove the whole procedure.  Abolishing an undefined indicator
    /// succeeds silently.
    pub fn abolish(&mut self, pi: &Indicator) -> Result<(), Exception> {
        match self.map.get(pi) {
            Some(Procedure::Clauses(set)) if set.dynamic => {
                self.map.shift_remove(pi);
                Ok(())
            }
            Some(_) => Err(modify_static(pi)),
            None => Ok(()),
        }
    }

    /// The clause list of `pi`, if it is a clause procedure.
    pub fn clauses(&self, pi: &Indicator) -> Option<&ClauseSet> {
        match self.map.get(pi) {
            Some(Procedure::Clauses(set)) => Some(set),
            _ => None,
        }
    }

    /// Indicators of clause-defined procedures, in definition order.
    pub fn user_indicators(&self) -> impl Iterator<Item = &Indicator> {
        self.map.iter().filter_map(|(pi, p)| match p {
            Procedure::Clauses(_) => Some(pi),
            Procedure::Builtin(_) => None,
        })
    }
}

fn modify_static(pi: &Indicator) -> Exception {
    permission_error("modify", "static_procedure", pi.to_term())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile_clause;
    use horn_terms::{atom, func};

    fn clause(t: &Term) -> Clause {
        compile_clause(&mut Env::new(), t).unwrap()
    }

    #[test]
    fn indicator_reads_and_writes_slash_terms() {
        let env = Env::new();
        let t = func!["/"; atom!("foo"), Term::int(2)];
        let pi = Indicator::from_term(&env, &t).unwrap();
        assert_eq!(pi.to_string(), "foo/2");
        assert_eq!(pi.to_term(), t);
        assert!(Indicator::from_term(&env, &atom!("foo")).is_err());
        assert!(
            Indicator::from_term(&env, &func!["/"; atom!("foo"), Term::int(-1)]).is_err()
        );
    }

    #[test]
    fn assert_creates_dynamic_and_orders_clauses() {
        let mut store = ProcedureStore::new();
        let pi = Indicator::new("p".into(), 0);
        store
            .install_clause(pi.clone(), clause(&atom!("p")), false)
            .unwrap();
        store
            .install_clause(pi.clone(), clause(&atom!("p")), true)
            .unwrap();
        assert_eq!(store.clauses(&pi).unwrap().clauses.len(), 2);
        assert!(store.clauses(&pi).unwrap().dynamic);
    }

    #[test]
    fn consulted_procedures_are_static() {
        let mut store = ProcedureStore::new();
        let pi = Indicator::new("p".into(), 0);
        store
            .install_consulted(pi.clone(), clause(&atom!("p")))
            .unwrap();
        assert!(!store.clauses(&pi).unwrap().dynamic);
        assert!(store
            .install_clause(pi.clone(), clause(&atom!("p")), false)
            .is_err());
        assert!(store.abolish(&pi).is_err());
    }

    #[test]
    fn dynamic_declaration_before_consult_keeps_it_dynamic() {
        let mut store = ProcedureStore::new();
        let pi = Indicator::new("p".into(), 0);
        store.declare_dynamic(pi.clone()).unwrap();
        store
            .install_consulted(pi.clone(), clause(&atom!("p")))
            .unwrap();
        assert!(store.clauses(&pi).unwrap().dynamic);
        store
            .install_clause(pi.clone(), clause(&atom!("p")), false)
            .unwrap();
    }

    #[test]
    fn remove_clause_by_identity() {
        let mut store = ProcedureStore::new();
        let pi = Indicator::new("p".into(), 0);
        store
            .install_clause(pi.clone(), clause(&atom!("p")), false)
            .unwrap();
        let target = store.clauses(&pi).unwrap().clauses[0].clone();
        store.remove_clause(&pi, &target).unwrap();
        assert!(store.clauses(&pi).unwrap().clauses.is_empty());
    }

    #[test]
    fn abolish_unknown_is_silent() {
        let mut store = ProcedureStore::new();
        assert!(store.abolish(&Indicator::new("q".into(), 3)).is_ok());
    }
}
