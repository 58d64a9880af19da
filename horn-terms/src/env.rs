//! The binding environment: an append-only log of variable bindings.
//!
//! An [`Env`] records every binding made along the current branch of the
//! search.  Bindings are only ever appended; undoing the work of a failed
//! branch is a truncation back to a [`Checkpoint`].  A bound variable is
//! never re-bound within a branch, so a prefix of the log is always a
//! consistent snapshot.

use crate::{Term, Var};
use std::collections::HashMap;

/// An opaque snapshot of the environment, equal to its length at the
/// time it was taken.  Restoring truncates the log, undoing every
/// binding made after the checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint(usize);

/// The binding log.  Lookup scans from the tail; since a variable is
/// bound at most once per branch, the first hit is the only hit.
#[derive(Debug, Default)]
pub struct Env {
    bindings: Vec<(u64, Term)>,
}

impl Env {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bindings currently in the log.
    #[inline]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// `true` if no bindings have been made.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Take a checkpoint of the current state.
    #[inline]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.bindings.len())
    }

    /// Truncate the log back to `cp`, undoing all bindings made after it.
    #[inline]
    pub fn restore(&mut self, cp: Checkpoint) {
        self.bindings.truncate(cp.0);
    }

    /// Append a binding for `v`.  The variable must be unbound.
    pub fn bind(&mut self, v: &Var, t: Term) {
        debug_assert!(self.lookup(v.id()).is_none(), "rebinding {v:?}");
        self.bindings.push((v.id(), t));
    }

    /// The binding for the variable with the given id, if any.
    pub fn lookup(&self, id: u64) -> Option<&Term> {
        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| *bound == id)
            .map(|(_, t)| t)
    }

    /// Chase variable chains until a non-variable or an unbound variable
    /// is reached.  Never rewrites the environment.  Variable chains are
    /// acyclic by construction (only unbound variables are ever bound),
    /// so this terminates even on rational trees.
    pub fn resolve<'a>(&'a self, mut t: &'a Term) -> &'a Term {
        while let Term::Var(v) = t {
            match self.lookup(v.id()) {
                Some(bound) => t = bound,
                None => break,
            }
        }
        t
    }

    /// Like [`resolve`](Self::resolve), additionally reporting the last
    /// variable stepped through on the way to a bound value.  Used by
    /// deep traversals to detect cycles through the binding log.
    pub(crate) fn resolve_step<'a>(&'a self, t: &'a Term) -> (Option<&'a Var>, &'a Term) {
        let mut entry = None;
        let mut t = t;
        while let Term::Var(v) = t {
            match self.lookup(v.id()) {
                Some(bound) => {
                    entry = Some(v);
                    t = bound;
                }
                None => break,
            }
        }
        (entry, t)
    }

    /// A fully substituted copy of `t`: every bound variable is replaced
    /// by its value, recursively.  Unbound variables remain themselves.
    /// A cycle through the binding log is left as the variable that
    /// closes it, keeping the result finite.
    pub fn resolved(&self, t: &Term) -> Term {
        self.resolved_guarded(t, &mut Vec::new())
    }

    fn resolved_guarded(&self, t: &Term, path: &mut Vec<u64>) -> Term {
        let (entry, t) = self.resolve_step(t);
        match t {
            Term::Compound(c) => {
                if let Some(v) = entry {
                    if path.contains(&v.id()) {
                        return Term::var(v.clone());
                    }
                    path.push(v.id());
                }
                let args = c
                    .args()
                    .iter()
                    .map(|a| self.resolved_guarded(a, path))
                    .collect();
                if entry.is_some() {
                    path.pop();
                }
                Term::compound(c.functor().clone(), args)
            }
            other => other.clone(),
        }
    }

    /// A copy of `t` with every unbound variable replaced by a fresh
    /// one, sharing preserved within the copy, and no variables shared
    /// with the original.  Rational trees stay rational: a cycle is
    /// re-tied through a fresh variable bound to the copied structure.
    pub fn renamed_copy(&mut self, t: &Term) -> Term {
        let mut map = HashMap::new();
        self.renamed(t, &mut map, &mut Vec::new())
    }

    fn renamed(&mut self, t: &Term, map: &mut HashMap<u64, Var>, path: &mut Vec<u64>) -> Term {
        let (entry, resolved) = {
            let (entry, resolved) = self.resolve_step(t);
            (entry.cloned(), resolved.clone())
        };
        match resolved {
            Term::Var(v) => {
                let fresh = map.entry(v.id()).or_insert_with(Var::fresh).clone();
                Term::var(fresh)
            }
            Term::Compound(c) => {
                if let Some(v) = &entry {
                    if path.contains(&v.id()) {
                        // Cycle: stand in a fresh variable; the entry
                        // occurrence ties the knot below.
                        let fresh = map.entry(v.id()).or_insert_with(Var::fresh).clone();
                        return Term::var(fresh);
                    }
                    if let Some(fresh) = map.get(&v.id()) {
                        if self.lookup(fresh.id()).is_some() {
                            // This cyclic structure was already copied.
                            return Term::var(fresh.clone());
                        }
                    }
                    path.push(v.id());
                }
                let mut args = Vec::with_capacity(c.arity());
                for a in c.args() {
                    args.push(self.renamed(a, map, path));
                }
                let out = Term::compound(c.functor().clone(), args);
                if let Some(v) = entry {
                    path.pop();
                    if let Some(fresh) = map.get(&v.id()).cloned() {
                        // A cycle through `v` was cut above; close it.
                        if self.lookup(fresh.id()).is_none() {
                            self.bind(&fresh, out.clone());
                        }
                    }
                }
                out
            }
            other => other,
        }
    }

    /// The unbound variables of `t` in first-visit, left-to-right order.
    pub fn term_variables(&self, t: &Term) -> Vec<Var> {
        let mut seen = Vec::new();
        self.collect_variables(t, &mut seen, &mut Vec::new());
        seen
    }

    fn collect_variables(&self, t: &Term, seen: &mut Vec<Var>, path: &mut Vec<u64>) {
        let (entry, t) = self.resolve_step(t);
        match t {
            Term::Var(v) => {
                if !seen.contains(v) {
                    seen.push(v.clone());
                }
            }
            Term::Compound(c) => {
                if let Some(v) = entry {
                    if path.contains(&v.id()) {
                        return;
                    }
                    path.push(v.id());
                }
                for a in c.args() {
                    self.collect_variables(a, seen, path);
                }
                if entry.is_some() {
                    path.pop();
                }
            }
            _ => {}
        }
    }

    /// `true` if `t` contains no unbound variables after resolution.
    pub fn is_ground(&self, t: &Term) -> bool {
        self.term_variables(t).is_empty()
    }

    /// Walk a list term, returning its elements and the resolved tail.
    /// A proper list ends in `[]`; a partial list ends in an unbound
    /// variable; anything else is malformed.  Cyclic lists terminate
    /// with the closing variable as tail.
    pub fn list_view(&self, t: &Term) -> (Vec<Term>, Term) {
        let mut elems = Vec::new();
        let mut visited = Vec::new();
        let mut cur = t.clone();
        loop {
            let (entry, resolved) = {
                let (entry, resolved) = self.resolve_step(&cur);
                (entry.cloned(), resolved.clone())
            };
            if let Some(v) = entry {
                if visited.contains(&v.id()) {
                    return (elems, Term::var(v));
                }
                visited.push(v.id());
            }
            match resolved.as_struct(".", 2) {
                Some(cell) => {
                    elems.push(cell[0].clone());
                    cur = cell[1].clone();
                }
                None => return (elems, resolved),
            }
        }
    }
}
