//! # Horn Engine
//!
//! A goal-directed logic interpreter: depth-first SLD resolution with
//! chronological backtracking over definite Horn-clause programs.
//!
//! The engine is built around a lazy promise tree.  Resolving a goal
//! produces a [`Promise`] describing the remaining search; success
//! paths yield control to a continuation, failure paths advance to
//! the next alternative, and `!`, `catch/3`, and `throw/1` act on the
//! explicit frame stack of the forcing loop.  User-defined procedures
//! compile to a small bytecode executed against the caller's argument
//! terms; the continuation carries all pending work, so no frame
//! stack is ever allocated for clause bodies.
//!
//! The embedding surface is [`Machine`]: load programs with
//! [`Machine::consult`], run goals with [`Machine::query`], and walk
//! the [`Solutions`] iterator.  A query ends in one of three ways:
//! solutions with bindings, exhaustion, or an uncaught exception.
//!
//! ## Example
//! ```rust
//! use horn_engine::Machine;
//! use horn_terms::Env;
//!
//! let mut m = Machine::with_buffers();
//! m.consult(
//!     "append([], L, L).
//!      append([H|T], L, [H|R]) :- append(T, L, R).",
//! )
//! .unwrap();
//!
//! let mut solutions = m.query("append([a, b], [c, d], X).").unwrap();
//! let first = solutions.next().unwrap().unwrap();
//! let x = first.get("X").unwrap();
//! assert_eq!(x.display(&Env::new()).to_string(), "[a, b, c, d]");
//! assert!(solutions.next().is_none());
//! ```
//!
//! ## License
//!
//! Copyright (c) 2005–2025 IKH Software, Inc.
//!
//! Released under the terms of the GNU Lesser General Public License, version 3.0 or
//! (at your option) any later version (LGPL-3.0-or-later).

mod arith;
mod builtins;
mod clause;
mod exception;
mod flags;
mod machine;
mod promise;
mod store;
mod stream;

pub use arith::{eval, Num};
pub use clause::{compile_clause, split_clause, Clause, Op};
pub use exception::{
    domain_error, evaluation_error, existence_error, instantiation_error, permission_error,
    representation_error, resource_error, syntax_error, system_error, type_error, Exception,
};
pub use flags::{FlagStore, Unknown};
pub use machine::{Bindings, Machine, Solutions};
pub use promise::{BarrierId, Choice, Cont, Forcer, Promise, Recover, Thunk};
pub use store::{BuiltinFn, ClauseSet, Indicator, Procedure, ProcedureStore};
pub use stream::{EofAction, Got, SharedBuf, Stream, StreamMode, StreamTab, StreamType};
