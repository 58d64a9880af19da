//! # Horn Terms
//!
//! The term model and binding environment of the horn Prolog engine.
//!
//! This crate provides the tagged [`Term`] type for representing Prolog
//! terms, the append-only binding [`Env`] with checkpoint/restore
//! semantics, unification with and without occurs check, the standard
//! order of terms, the runtime operator table consulted by the reader
//! and writer, and a configurable term writer.
//!
//! Terms are immutable once built; compound structure sits behind
//! reference-counted payloads so clones are cheap and subterms can be
//! shared between the clause database, binding log, and resolution
//! machinery.  Variables carry process-unique numeric identities, so
//! renaming a clause apart never requires touching its structure.
//!
//! ## Example
//! ```rust
//! use horn_terms::{func, list, unify, Env, Term, Var};
//!
//! let mut env = Env::new();
//! let x = Var::named("X");
//! let l = Var::fresh();
//!
//! // append([], L, L) applied to append([], [1, 2], X)
//! let general = func!["append"; Term::nil(), Term::var(l.clone()), Term::var(l)];
//! let query = func!["append"; Term::nil(), list![Term::int(1), Term::int(2)], Term::var(x.clone())];
//!
//! let cp = env.checkpoint();
//! assert!(unify(&mut env, &general, &query));
//! assert_eq!(
//!     env.resolve(&Term::var(x)),
//!     &list![Term::int(1), Term::int(2)]
//! );
//! env.restore(cp);
//! ```
//!
//! ## License
//!
//! Copyright (c) 2005–2025 IKH Software, Inc.
//!
//! Released under the terms of the GNU Lesser General Public License, version 3.0 or
//! (at your option) any later version (LGPL-3.0-or-later).

mod display;
mod env;
mod error;
mod oper;
mod order;
mod term;
mod unify;

pub use display::{TermDisplay, WriteOpts};
pub use env::{Checkpoint, Env};
pub use error::TermError;
pub use oper::{
    OperClass, OperDef, OperSpec, OperTab, ARG_PRIORITY, MAX_OPER_PRIORITY, MIN_OPER_PRIORITY,
};
pub use order::compare;
pub use term::{Atom, Compound, Term, Var};
pub use unify::{unify, unify_with_occurs_check};
