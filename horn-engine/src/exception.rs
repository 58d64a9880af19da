//! Prolog exceptions and the constructors for the ISO error taxonomy.
//!
//! Every error the engine raises is a Prolog term of the shape
//! `error(Formal, Context)` carried by [`Exception::Ball`].  The ball
//! travels through the promise machinery until `catch/3` intercepts it
//! or it surfaces as the final outcome of a query.  `halt/0,1` uses the
//! separate [`Exception::Halt`] variant, which no handler may catch.

use horn_terms::{func, Env, Term};
use std::fmt;

/// An exception travelling up the promise tree.
#[derive(Debug, Clone)]
pub enum Exception {
    /// A thrown term, snapshot at throw time.
    Ball(Term),
    /// Engine shutdown requested by `halt/0,1`, carrying the exit code.
    Halt(i64),
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // the snapshot carries no live bindings, so an empty
            // environment renders it faithfully
            Self::Ball(t) => write!(f, "uncaught exception: {}", t.display(&Env::new())),
            Self::Halt(code) => write!(f, "halted with exit code {code}"),
        }
    }
}

impl std::error::Error for Exception {}

impl Exception {
    /// Wrap a formal term and a context message into the standard
    /// `error(Formal, Context)` shape.
    pub fn error(formal: Term, context: impl AsRef<str>) -> Self {
        Self::Ball(func!["error"; formal, Term::atom(context)])
    }

    /// The thrown term, if this is a ball.
    pub fn ball(&self) -> Option<&Term> {
        match self {
            Self::Ball(t) => Some(t),
            Self::Halt(_) => None,
        }
    }
}

/// `error(instantiation_error, Culprit)`: an argument was a variable
/// where an instantiated term is required.  The context names the
/// offending variable.
pub fn instantiation_error(culprit: Term) -> Exception {
    Exception::Ball(func![
        "error";
        Term::atom("instantiation_error"),
        culprit
    ])
}

/// `error(type_error(Kind, Culprit), Context)`.
pub fn type_error(kind: &str, culprit: Term) -> Exception {
    Exception::error(
        func!["type_error"; Term::atom(kind), culprit],
        format!("{kind} expected"),
    )
}

/// `error(domain_error(Kind, Culprit), Context)`.
pub fn domain_error(kind: &str, culprit: Term) -> Exception {
    Exception::error(
        func!["domain_error"; Term::atom(kind), culprit],
        format!("not a valid {kind}"),
    )
}

/// `error(existence_error(Kind, Culprit), Context)`.
pub fn existence_error(kind: &str, culprit: Term) -> Exception {
    Exception::error(
        func!["existence_error"; Term::atom(kind), culprit],
        format!("unknown {kind}"),
    )
}

/// `error(permission_error(Operation, Kind, Culprit), Context)`.
pub fn permission_error(operation: &str, kind: &str, culprit: Term) -> Exception {
    Exception::error(
        func![
            "permission_error";
            Term::atom(operation),
            Term::atom(kind),
            culprit
        ],
        format!("cannot {operation} {kind}"),
    )
}

/// `error(representation_error(Kind, Culprit), Context)`.
pub fn representation_error(kind: &str, culprit: Term) -> Exception {
    Exception::error(
        func!["representation_error"; Term::atom(kind), culprit],
        format!("cannot represent {kind}"),
    )
}

/// `error(evaluation_error(Kind), Context)`.
pub fn evaluation_error(kind: &str) -> Exception {
    Exception::error(
        func!["evaluation_error"; Term::atom(kind)],
        format!("evaluation error: {kind}"),
    )
}

/// `error(resource_error(Kind, Context), Context)`.
pub fn resource_error(kind: &str, context: Term) -> Exception {
    Exception::error(
        func!["resource_error"; Term::atom(kind), context],
        format!("resource exhausted: {kind}"),
    )
}

/// `error(syntax_error(Detail), Context)`.
pub fn syntax_error(detail: &str) -> Exception {
    Exception::error(
        func!["syntax_error"; Term::atom(detail)],
        "syntax error",
    )
}

/// `error(system_error(Detail), Context)`.
pub fn system_error(detail: &str) -> Exception {
    Exception::error(
        func!["system_error"; Term::atom(detail)],
        "system error",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_terms_have_the_standard_shape() {
        let e = type_error("callable", Term::int(0));
        let ball = e.ball().unwrap();
        let args = ball.as_struct("error", 2).unwrap();
        let formal = args[0].as_struct("type_error", 2).unwrap();
        assert_eq!(formal[0], Term::atom("callable"));
        assert_eq!(formal[1], Term::int(0));
    }

    #[test]
    fn halt_is_not_a_ball() {
        assert!(Exception::Halt(1).ball().is_none());
    }
}
