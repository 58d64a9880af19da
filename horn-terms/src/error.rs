//! Defines [`TermError`], the unified error type for term operations.
//!
//! Provides descriptive error variants for invalid operator
//! definitions.  Prolog-level errors (the `error(Formal, Context)`
//! terms of the engine) are built elsewhere; this type covers the
//! host-level API surface of the term crate.

use crate::Atom;
use smartstring::alias::String;
use thiserror::Error;

/// All errors that can arise from operator table updates.
///
/// [`TermError`] provides a single error surface for higher-level
/// crates.  Thanks to `thiserror` each variant formats a readable
/// message, so callers can propagate with `?` and report at the edge.
#[derive(Debug, Clone, Error)]
pub enum TermError {
    #[error("invalid operator specifier: {0}")]
    InvalidOperSpec(String),

    #[error("operator priority {0} out of range")]
    InvalidOperPriority(i64),

    #[error("operator {0} cannot be modified")]
    ReservedOperator(Atom),

    #[error("operator {0} cannot be both infix and postfix")]
    ConflictingOperator(Atom),
}
