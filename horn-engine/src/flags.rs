//! The Prolog flag store.
//!
//! A fixed table of keys: a handful of read-only capability flags and
//! three writable behavior switches.  Unknown keys and out-of-domain
//! values surface as the ISO `domain_error`/`permission_error` terms.

use crate::{domain_error, permission_error, Exception};
use horn_terms::{func, Term};

/// Behavior when a goal names an undefined procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unknown {
    /// Raise `existence_error(procedure, F/A)`.
    #[default]
    Error,
    /// Warn and fail.
    Warning,
    /// Fail silently.
    Fail,
}

impl Unknown {
    fn atom(self) -> Term {
        Term::atom(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Fail => "fail",
        })
    }
}

/// The flag store.  Read-only flags are materialized on demand.
#[derive(Debug, Clone)]
pub struct FlagStore {
    pub char_conversion: bool,
    pub debug: bool,
    pub unknown: Unknown,
}

impl Default for FlagStore {
    fn default() -> Self {
        Self {
            char_conversion: false,
            debug: false,
            unknown: Unknown::Error,
        }
    }
}

const ON: &str = "on";
const OFF: &str = "off";

impl FlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn on_off(value: bool) -> Term {
        Term::atom(if value { ON } else { OFF })
    }

    /// Every flag with its current value, in the table's fixed order.
    pub fn entries(&self) -> Vec<(Term, Term)> {
        vec![
            (Term::atom("bounded"), Term::atom("true")),
            (Term::atom("max_integer"), Term::int(i64::MAX)),
            (Term::atom("min_integer"), Term::int(i64::MIN)),
            (
                Term::atom("integer_rounding_function"),
                Term::atom("toward_zero"),
            ),
            (Term::atom("max_arity"), Term::atom("unbounded")),
            (
                Term::atom("char_conversion"),
                Self::on_off(self.char_conversion),
            ),
            (Term::atom("debug"), Self::on_off(self.debug)),
            (Term::atom("unknown"), self.unknown.atom()),
        ]
    }

    /// Set a writable flag.  Unknown flag names raise
    /// `domain_error(prolog_flag, Flag)`; bad values raise
    /// `domain_error(flag_value, Flag + Value)`; read-only flags raise
    /// `permission_error(modify, flag, Flag)`.
    pub fn set(&mut self, name: &str, value: &Term) -> Result<(), Exception> {
        let bad_value = || {
            domain_error(
                "flag_value",
                func!["+"; Term::atom(name), value.clone()],
            )
        };
        let as_on_off = || match value.as_atom().map(|a| a.as_str()) {
            Some(ON) => Ok(true),
            Some(OFF) => Ok(false),
            _ => Err(bad_value()),
        };
        match name {
            "char_conversion" => {
                self.char_conversion = as_on_off()?;
                Ok(())
            }
            "debug" => {
                self.debug = as_on_off()?;
                Ok(())
            }
            "unknown" => {
                self.unknown = match value.as_atom().map(|a| a.as_str()) {
                    Some("error") => Unknown::Error,
                    Some("warning") => Unknown::Warning,
                    Some("fail") => Unknown::Fail,
                    _ => return Err(bad_value()),
                };
                Ok(())
            }
            "bounded" | "max_integer" | "min_integer" | "integer_rounding_function"
            | "max_arity" => Err(permission_error("modify", "flag", Term::atom(name))),
            _ => Err(domain_error("prolog_flag", Term::atom(name))),
        }
    }
}
