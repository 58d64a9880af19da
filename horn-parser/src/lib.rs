//! # Horn Parser
//!
//! The reader of the horn Prolog engine: a tokenizer and an
//! operator-precedence parser producing [`horn_terms`] values.
//!
//! The grammar of Prolog is not fixed: `op/3` may add, replace, or
//! remove operators between any two terms of a source.  The parser is
//! therefore driven directly by the runtime
//! [`OperTab`](horn_terms::OperTab) rather than by generated tables,
//! and a [`Reader`] is constructed per term over a longer-lived
//! [`Lexer`].  Characters are pulled one at a time through the
//! [`CharSource`] trait, so the same machinery reads in-memory program
//! text and open input streams.
//!
//! ## Example
//! ```rust
//! use horn_parser::{Lexer, Reader, StrSource};
//! use horn_terms::OperTab;
//!
//! let ops = OperTab::defaults();
//! let mut lexer = Lexer::new(StrSource::new("path(X, Y) :- edge(X, Z), path(Z, Y)."));
//! let out = Reader::new(&mut lexer, &ops).read_term().unwrap().unwrap();
//! assert_eq!(out.term.as_struct(":-", 2).unwrap().len(), 2);
//! assert_eq!(out.variable_names.len(), 3);
//! ```
//!
//! ## License
//!
//! Copyright (c) 2005–2025 IKH Software, Inc.
//!
//! Released under the terms of the GNU Lesser General Public License, version 3.0 or
//! (at your option) any later version (LGPL-3.0-or-later).

mod error;
mod lexer;
mod reader;
mod token;

pub use error::{ReadError, Span};
pub use lexer::{CharSource, FnSource, Lexer, StrSource};
pub use reader::{ReadOut, Reader};
pub use token::{Lexed, Punct, Token};
