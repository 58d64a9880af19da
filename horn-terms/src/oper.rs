//! Operator definitions, precedence, and the runtime operator table.
//!
//! Prolog syntax is operator-driven: the reader and the writer both
//! consult a table of `(priority, specifier, name)` entries which user
//! code may change at any time through `op/3`.  This module defines the
//! specifier and class enums, the per-name definition records, and the
//! [`OperTab`] registry that keeps them in definition order.

use crate::{Atom, TermError};
use indexmap::IndexMap;
use smartstring::alias::String;
use std::fmt;
use std::str::FromStr;

/// Lowest operator priority accepted by a definition.  Priority `0`
/// removes a definition instead.
pub const MIN_OPER_PRIORITY: i64 = 1;
/// Highest operator priority.
pub const MAX_OPER_PRIORITY: i64 = 1200;
/// Priority ceiling for operators appearing as arguments.
pub const ARG_PRIORITY: u16 = 999;

/// The syntactic position an operator occupies.
///
/// Each name may carry at most one definition per class; ISO forbids an
/// atom from being both an infix and a postfix operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OperClass {
    /// Before its operand, e.g. `- X`.
    Prefix = 0,
    /// Between two operands, e.g. `X + Y`.
    Infix = 1,
    /// After its operand, e.g. `X ^^`.
    Postfix = 2,
}

impl OperClass {
    /// The total number of class variants.
    pub const COUNT: usize = 3;
}

/// An ISO operator specifier: fixity plus argument-priority shape.
///
/// The `x` positions accept arguments of strictly lower priority, the
/// `y` positions arguments of the same priority or lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OperSpec {
    Fx,
    Fy,
    Xf,
    Yf,
    Xfx,
    Xfy,
    Yfx,
}

impl OperSpec {
    /// Canonical string representations, in declaration order.
    pub const STRS: &'static [&'static str] = &["fx", "fy", "xf", "yf", "xfx", "xfy", "yfx"];

    /// The class this specifier belongs to.
    pub fn class(self) -> OperClass {
        match self {
            Self::Fx | Self::Fy => OperClass::Prefix,
            Self::Xf | Self::Yf => OperClass::Postfix,
            Self::Xfx | Self::Xfy | Self::Yfx => OperClass::Infix,
        }
    }

    /// Highest priority accepted for the left operand, relative to the
    /// operator's own priority.  Meaningless for prefix specifiers.
    pub fn left_max(self, priority: u16) -> u16 {
        match self {
            Self::Yf | Self::Yfx => priority,
            _ => priority.saturating_sub(1),
        }
    }

    /// Highest priority accepted for the right operand, relative to the
    /// operator's own priority.  Meaningless for postfix specifiers.
    pub fn right_max(self, priority: u16) -> u16 {
        match self {
            Self::Fy | Self::Xfy => priority,
            _ => priority.saturating_sub(1),
        }
    }
}

impl fmt::Display for OperSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::STRS[*self as usize])
    }
}

impl FromStr for OperSpec {
    type Err = TermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fx" => Ok(Self::Fx),
            "fy" => Ok(Self::Fy),
            "xf" => Ok(Self::Xf),
            "yf" => Ok(Self::Yf),
            "xfx" => Ok(Self::Xfx),
            "xfy" => Ok(Self::Xfy),
            "yfx" => Ok(Self::Yfx),
            other => Err(TermError::InvalidOperSpec(String::from(other))),
        }
    }
}

impl TryFrom<&str> for OperSpec {
    type Error = TermError;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// One operator definition: its priority and specifier.  The name is
/// the key of the owning [`OperTab`] entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperDef {
    pub priority: u16,
    pub spec: OperSpec,
}

/// The runtime operator table.
///
/// Entries are kept in definition order (insertion order of the name)
/// so that `current_op/3` enumerates deterministically.  Each name maps
/// to up to one definition per [`OperClass`].
#[derive(Debug, Clone, Default)]
pub struct OperTab {
    map: IndexMap<Atom, [Option<OperDef>; OperClass::COUNT]>,
}

impl OperTab {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The ISO bootstrap table.
    pub fn defaults() -> Self {
        let mut tab = Self::new();
        let defs: &[(i64, OperSpec, &str)] = &[
            (1200, OperSpec::Xfx, ":-"),
            (1200, OperSpec::Xfx, "-->"),
            (1200, OperSpec::Fx, ":-"),
            (1200, OperSpec::Fx, "?-"),
            (1100, OperSpec::Xfy, ";"),
            (1050, OperSpec::Xfy, "->"),
            (1000, OperSpec::Xfy, ","),
            (900, OperSpec::Fy, "\\+"),
            (700, OperSpec::Xfx, "="),
            (700, OperSpec::Xfx, "\\="),
            (700, OperSpec::Xfx, "=="),
            (700, OperSpec::Xfx, "\\=="),
            (700, OperSpec::Xfx, "@<"),
            (700, OperSpec::Xfx, "@>"),
            (700, OperSpec::Xfx, "@=<"),
            (700, OperSpec::Xfx, "@>="),
            (700, OperSpec::Xfx, "=.."),
            (700, OperSpec::Xfx, "is"),
            (700, OperSpec::Xfx, "=:="),
            (700, OperSpec::Xfx, "=\\="),
            (700, OperSpec::Xfx, "<"),
            (700, OperSpec::Xfx, ">"),
            (700, OperSpec::Xfx, "=<"),
            (700, OperSpec::Xfx, ">="),
            (500, OperSpec::Yfx, "+"),
            (500, OperSpec::Yfx, "-"),
            (500, OperSpec::Yfx, "/\\"),
            (500, OperSpec::Yfx, "\\/"),
            (500, OperSpec::Yfx, "xor"),
            (400, OperSpec::Yfx, "*"),
            (400, OperSpec::Yfx, "/"),
            (400, OperSpec::Yfx, "//"),
            (400, OperSpec::Yfx, "mod"),
            (400, OperSpec::Yfx, "rem"),
            (400, OperSpec::Yfx, "<<"),
            (400, OperSpec::Yfx, ">>"),
            (200, OperSpec::Xfx, "**"),
            (200, OperSpec::Xfy, "^"),
            (200, OperSpec::Fy, "-"),
            (200, OperSpec::Fy, "+"),
            (200, OperSpec::Fy, "\\"),
        ];
        for (priority, spec, name) in defs {
            tab.define(*priority, *spec, &Atom::new(name))
                .expect("bootstrap operator table is valid");
        }
        tab
    }

    /// Install, replace, or remove a definition.
    ///
    /// Priority `0` removes the definition of `name` in the specifier's
    /// class; `1..=1200` installs or replaces it.  The comma operator
    /// is immutable, `|` may only be an infix operator of priority
    /// 1001 or higher, and a name cannot be both infix and postfix.
    pub fn define(&mut self, priority: i64, spec: OperSpec, name: &Atom) -> Result<(), TermError> {
        if *name == "," {
            return Err(TermError::ReservedOperator(name.clone()));
        }
        if !(priority == 0 || (MIN_OPER_PRIORITY..=MAX_OPER_PRIORITY).contains(&priority)) {
            return Err(TermError::InvalidOperPriority(priority));
        }
        let class = spec.class();
        if *name == "|" && (class != OperClass::Infix || (1..1001).contains(&priority)) {
            return Err(TermError::ReservedOperator(name.clone()));
        }
        if priority == 0 {
            if let Some(defs) = self.map.get_mut(name) {
                defs[class as usize] = None;
                if defs.iter().all(Option::is_none) {
                    self.map.shift_remove(name);
                }
            }
            return Ok(());
        }
        let defs = self.map.entry(name.clone()).or_default();
        let conflicting = match class {
            OperClass::Infix => OperClass::Postfix,
            OperClass::Postfix => OperClass::Infix,
            OperClass::Prefix => OperClass::Prefix,
        };
        if conflicting != class && defs[conflicting as usize].is_some() {
            return Err(TermError::ConflictingOperator(name.clone()));
        }
        defs[class as usize] = Some(OperDef {
            priority: priority as u16,
            spec,
        });
        Ok(())
    }

    /// The definition of `name` in the given class, if any.
    pub fn get(&self, name: &str, class: OperClass) -> Option<&OperDef> {
        self.map.get(name)?[class as usize].as_ref()
    }

    /// Shorthand for a prefix definition lookup.
    #[inline]
    pub fn prefix(&self, name: &str) -> Option<&OperDef> {
        self.get(name, OperClass::Prefix)
    }

    /// Shorthand for an infix definition lookup.
    #[inline]
    pub fn infix(&self, name: &str) -> Option<&OperDef> {
        self.get(name, OperClass::Infix)
    }

    /// Shorthand for a postfix definition lookup.
    #[inline]
    pub fn postfix(&self, name: &str) -> Option<&OperDef> {
        self.get(name, OperClass::Postfix)
    }

    /// `true` if `name` has a definition in any class.
    pub fn is_operator(&self, name: &str) -> bool {
        self.map
            .get(name)
            .is_some_and(|defs| defs.iter().any(Option::is_some))
    }

    /// All definitions in definition order, as `(name, def)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Atom, &OperDef)> {
        self.map
            .iter()
            .flat_map(|(name, defs)| defs.iter().flatten().map(move |def| (name, def)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_round_trips_through_strings() {
        for s in OperSpec::STRS {
            let spec: OperSpec = s.parse().unwrap();
            assert_eq!(&spec.to_string(), s);
        }
        assert!("zfz".parse::<OperSpec>().is_err());
    }

    #[test]
    fn defaults_contain_the_core_table() {
        let tab = OperTab::defaults();
        assert_eq!(tab.infix(":-").unwrap().priority, 1200);
        assert_eq!(tab.infix(",").unwrap().priority, 1000);
        assert_eq!(tab.prefix("-").unwrap().priority, 200);
        assert_eq!(tab.infix("-").unwrap().priority, 500);
        assert!(tab.postfix("-").is_none());
        assert!(tab.is_operator("is"));
        assert!(!tab.is_operator("foo"));
    }

    #[test]
    fn define_and_remove() {
        let mut tab = OperTab::new();
        let name = Atom::new("~>");
        tab.define(650, OperSpec::Xfy, &name).unwrap();
        assert_eq!(tab.infix("~>").unwrap().priority, 650);
        tab.define(0, OperSpec::Xfy, &name).unwrap();
        assert!(tab.infix("~>").is_none());
        assert!(!tab.is_operator("~>"));
    }

    #[test]
    fn replace_changes_priority() {
        let mut tab = OperTab::defaults();
        tab.define(600, OperSpec::Xfx, &Atom::new("is")).unwrap();
        assert_eq!(tab.infix("is").unwrap().priority, 600);
    }

    #[test]
    fn comma_is_immutable() {
        let mut tab = OperTab::defaults();
        assert!(tab.define(999, OperSpec::Xfy, &Atom::new(",")).is_err());
        assert!(tab.define(0, OperSpec::Xfy, &Atom::new(",")).is_err());
    }

    #[test]
    fn infix_and_postfix_conflict() {
        let mut tab = OperTab::new();
        let name = Atom::new("#");
        tab.define(500, OperSpec::Yfx, &name).unwrap();
        assert!(tab.define(500, OperSpec::Xf, &name).is_err());
    }

    #[test]
    fn out_of_range_priority_is_rejected() {
        let mut tab = OperTab::new();
        assert!(tab.define(1300, OperSpec::Xfx, &Atom::new("#")).is_err());
        assert!(tab.define(-1, OperSpec::Xfx, &Atom::new("#")).is_err());
    }

    #[test]
    fn argument_priority_shapes() {
        assert_eq!(OperSpec::Xfy.right_max(1100), 1100);
        assert_eq!(OperSpec::Xfy.left_max(1100), 1099);
        assert_eq!(OperSpec::Yfx.left_max(500), 500);
        assert_eq!(OperSpec::Yfx.right_max(500), 499);
        assert_eq!(OperSpec::Fy.right_max(200), 200);
        assert_eq!(OperSpec::Fx.right_max(1200), 1199);
    }
}
