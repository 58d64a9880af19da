//! The arithmetic evaluator behind `is/2` and the numeric comparisons.
//!
//! Maps a ground expression term to a [`Num`].  Unknown evaluable
//! functors raise `type_error(evaluable, F/A)`, wrong operand kinds
//! raise `type_error(integer|number, X)`, integer division by zero
//! raises `evaluation_error(zero_divisor)`, and integer overflow
//! raises `evaluation_error(int_overflow)` (checked arithmetic
//! throughout, per the `bounded = true` flag).

use crate::{
    evaluation_error, instantiation_error, type_error, Exception, Indicator,
};
use horn_terms::{Env, Term};
use std::cmp::Ordering;

/// A computed number: the engine's two numeric kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    /// The term for this number.
    pub fn to_term(self) -> Term {
        match self {
            Self::Int(i) => Term::int(i),
            Self::Float(f) => Term::float(f),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    /// Numeric comparison for `=:=`, `<` and friends; mixed operands
    /// compare as floats.
    pub fn cmp(self, other: Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(&b),
            (a, b) => a.as_f64().total_cmp(&b.as_f64()),
        }
    }
}

fn overflow() -> Exception {
    evaluation_error("int_overflow")
}

fn zero_divisor() -> Exception {
    evaluation_error("zero_divisor")
}

fn int_of(env: &Env, n: Num, culprit: &Term) -> Result<i64, Exception> {
    match n {
        Num::Int(i) => Ok(i),
        Num::Float(_) => Err(type_error("integer", env.resolved(culprit))),
    }
}

/// Evaluate `t` as an arithmetic expression under `env`.
pub fn eval(env: &Env, t: &Term) -> Result<Num, Exception> {
    let t = env.resolve(t).clone();
    match &t {
        Term::Var(_) => Err(instantiation_error(t)),
        Term::Int(i) => Ok(Num::Int(*i)),
        Term::Float(f) => Ok(Num::Float(*f)),
        Term::Atom(a) => match a.as_str() {
            "pi" => Ok(Num::Float(std::f64::consts::PI)),
            "e" => Ok(Num::Float(std::f64::consts::E)),
            _ => Err(unknown_evaluable(a.as_str(), 0)),
        },
        Term::Compound(c) => {
            let name = c.functor().as_str();
            match c.args() {
                [x] => {
                    let x_term = x.clone();
                    let x = eval(env, &x_term)?;
                    eval_unary(env, name, x, &x_term)
                }
                [x, y] => {
                    let (x_term, y_term) = (x.clone(), y.clone());
                    let x = eval(env, &x_term)?;
                    let y = eval(env, &y_term)?;
                    eval_binary(env, name, x, y, &x_term, &y_term)
                }
                _ => Err(unknown_evaluable(name, c.arity())),
            }
        }
    }
}

fn unknown_evaluable(name: &str, arity: usize) -> Exception {
    type_error(
        "evaluable",
        Indicator::new(name.into(), arity).to_term(),
    )
}

fn eval_unary(env: &Env, name: &str, x: Num, x_term: &Term) -> Result<Num, Exception> {
    match name {
        "-" => match x {
            Num::Int(i) => i.checked_neg().map(Num::Int).ok_or_else(overflow),
            Num::Float(f) => Ok(Num::Float(-f)),
        },
        "+" => Ok(x),
        "abs" => match x {
            Num::Int(i) => i.checked_abs().map(Num::Int).ok_or_else(overflow),
            Num::Float(f) => Ok(Num::Float(f.abs())),
        },
        // sign of a float NaN is NaN
        "sign" => Ok(match x {
            Num::Int(i) => Num::Int(i.signum()),
            Num::Float(f) => Num::Float(if f == 0.0 { f } else { f.signum() }),
        }),
        "sqrt" => Ok(Num::Float(x.as_f64().sqrt())),
        "sin" => Ok(Num::Float(x.as_f64().sin())),
        "cos" => Ok(Num::Float(x.as_f64().cos())),
        "tan" => Ok(Num::Float(x.as_f64().tan())),
        "asin" => Ok(Num::Float(x.as_f64().asin())),
        "acos" => Ok(Num::Float(x.as_f64().acos())),
        "atan" => Ok(Num::Float(x.as_f64().atan())),
        "exp" => Ok(Num::Float(x.as_f64().exp())),
        "log" => {
            let f = x.as_f64();
            if f <= 0.0 {
                return Err(evaluation_error("undefined"));
            }
            Ok(Num::Float(f.ln()))
        }
        "float" => Ok(Num::Float(x.as_f64())),
        "truncate" => float_to_int(x, f64::trunc),
        "round" => float_to_int(x, f64::round),
        "ceiling" => float_to_int(x, f64::ceil),
        "floor" => float_to_int(x, f64::floor),
        "float_integer_part" => Ok(Num::Float(x.as_f64().trunc())),
        "float_fractional_part" => Ok(Num::Float(x.as_f64().fract())),
        "\\" => {
            let i = int_of(env, x, x_term)?;
            Ok(Num::Int(!i))
        }
        "msb" => {
            let i = int_of(env, x, x_term)?;
            if i <= 0 {
                return Err(evaluation_error("undefined"));
            }
            Ok(Num::Int(63 - i.leading_zeros() as i64))
        }
        _ => Err(unknown_evaluable(name, 1)),
    }
}

fn float_to_int(x: Num, f: fn(f64) -> f64) -> Result<Num, Exception> {
    match x {
        Num::Int(i) => Ok(Num::Int(i)),
        Num::Float(v) => {
            let r = f(v);
            if r.is_finite() && r >= i64::MIN as f64 && r <= i64::MAX as f64 {
                Ok(Num::Int(r as i64))
            } else {
                Err(overflow())
            }
        }
    }
}

fn eval_binary(
    env: &Env,
    name: &str,
    x: Num,
    y: Num,
    x_term: &Term,
    y_term: &Term,
) -> Result<Num, Exception> {
    use Num::{Float, Int};
    match name {
        "+" => match (x, y) {
            (Int(a), Int(b)) => a.checked_add(b).map(Int).ok_or_else(overflow),
            (a, b) => Ok(Float(a.as_f64() + b.as_f64())),
        },
        "-" => match (x, y) {
            (Int(a), Int(b)) => a.checked_sub(b).map(Int).ok_or_else(overflow),
            (a, b) => Ok(Float(a.as_f64() - b.as_f64())),
        },
        "*" => match (x, y) {
            (Int(a), Int(b)) => a.checked_mul(b).map(Int).ok_or_else(overflow),
            (a, b) => Ok(Float(a.as_f64() * b.as_f64())),
        },
        // integer division when exact, float quotient otherwise
        "/" => match (x, y) {
            (Int(_), Int(0)) => Err(zero_divisor()),
            (Int(a), Int(b)) => {
                if a % b == 0 {
                    a.checked_div(b).map(Int).ok_or_else(overflow)
                } else {
                    Ok(Float(a as f64 / b as f64))
                }
            }
            (a, b) => Ok(Float(a.as_f64() / b.as_f64())),
        },
        "//" => {
            let (a, b) = (int_of(env, x, x_term)?, int_of(env, y, y_term)?);
            if b == 0 {
                return Err(zero_divisor());
            }
            a.checked_div(b).map(Int).ok_or_else(overflow)
        }
        // mod follows the sign of the divisor, rem the dividend
        "mod" => {
            let (a, b) = (int_of(env, x, x_term)?, int_of(env, y, y_term)?);
            if b == 0 {
                return Err(zero_divisor());
            }
            a.checked_rem_euclid(b)
                .map(|r| if r != 0 && b < 0 { r + b } else { r })
                .map(Int)
                .ok_or_else(overflow)
        }
        "rem" => {
            let (a, b) = (int_of(env, x, x_term)?, int_of(env, y, y_term)?);
            if b == 0 {
                return Err(zero_divisor());
            }
            a.checked_rem(b).map(Int).ok_or_else(overflow)
        }
        "min" => Ok(if x.cmp(y) == Ordering::Greater { y } else { x }),
        "max" => Ok(if x.cmp(y) == Ordering::Less { y } else { x }),
        "**" => Ok(Float(x.as_f64().powf(y.as_f64()))),
        "^" => match (x, y) {
            (Int(a), Int(b)) => {
                if b >= 0 {
                    let exp = u32::try_from(b).map_err(|_| overflow())?;
                    a.checked_pow(exp).map(Int).ok_or_else(overflow)
                } else if a == 1 {
                    Ok(Int(1))
                } else if a == -1 {
                    Ok(Int(if b % 2 == 0 { 1 } else { -1 }))
                } else {
                    Ok(Float((a as f64).powf(b as f64)))
                }
            }
            (a, b) => Ok(Float(a.as_f64().powf(b.as_f64()))),
        },
        "atan2" => Ok(Float(x.as_f64().atan2(y.as_f64()))),
        ">>" => {
            let (a, b) = (int_of(env, x, x_term)?, int_of(env, y, y_term)?);
            let shift = u32::try_from(b).map_err(|_| overflow())?;
            Ok(Int(a.checked_shr(shift).unwrap_or(if a < 0 { -1 } else { 0 })))
        }
        "<<" => {
            let (a, b) = (int_of(env, x, x_term)?, int_of(env, y, y_term)?);
            let shift = u32::try_from(b).map_err(|_| overflow())?;
            a.checked_shl(shift).map(Int).ok_or_else(overflow)
        }
        "/\\" => Ok(Int(int_of(env, x, x_term)? & int_of(env, y, y_term)?)),
        "\\/" => Ok(Int(int_of(env, x, x_term)? | int_of(env, y, y_term)?)),
        "xor" => Ok(Int(int_of(env, x, x_term)? ^ int_of(env, y, y_term)?)),
        _ => Err(unknown_evaluable(name, 2)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horn_terms::{atom, func, Var};

    fn ev(t: &Term) -> Result<Num, Exception> {
        eval(&Env::new(), t)
    }

    #[test]
    fn basic_arithmetic() {
        assert_eq!(ev(&func!["+"; Term::int(1), Term::int(2)]).unwrap(), Num::Int(3));
        assert_eq!(
            ev(&func!["*"; Term::int(3), Term::float(2.5)]).unwrap(),
            Num::Float(7.5)
        );
        assert_eq!(ev(&func!["-"; Term::int(5)]).unwrap(), Num::Int(-5));
    }

    #[test]
    fn division_kinds() {
        assert_eq!(ev(&func!["/"; Term::int(6), Term::int(3)]).unwrap(), Num::Int(2));
        assert_eq!(
            ev(&func!["/"; Term::int(7), Term::int(2)]).unwrap(),
            Num::Float(3.5)
        );
        assert_eq!(ev(&func!["//"; Term::int(7), Term::int(2)]).unwrap(), Num::Int(3));
        assert_eq!(ev(&func!["//"; Term::int(-7), Term::int(2)]).unwrap(), Num::Int(-3));
        assert!(ev(&func!["//"; Term::int(1), Term::int(0)]).is_err());
        assert!(ev(&func!["/"; Term::int(1), Term::int(0)]).is_err());
    }

    #[test]
    fn mod_follows_divisor_rem_follows_dividend() {
        assert_eq!(ev(&func!["mod"; Term::int(7), Term::int(-2)]).unwrap(), Num::Int(-1));
        assert_eq!(ev(&func!["mod"; Term::int(-7), Term::int(2)]).unwrap(), Num::Int(1));
        assert_eq!(ev(&func!["rem"; Term::int(-7), Term::int(2)]).unwrap(), Num::Int(-1));
        assert_eq!(ev(&func!["rem"; Term::int(7), Term::int(-2)]).unwrap(), Num::Int(1));
    }

    #[test]
    fn overflow_is_an_error() {
        assert!(ev(&func!["+"; Term::int(i64::MAX), Term::int(1)]).is_err());
        assert!(ev(&func!["-"; Term::int(i64::MIN)]).is_err());
        assert!(ev(&func!["^"; Term::int(2), Term::int(64)]).is_err());
    }

    #[test]
    fn sign_of_nan_is_nan() {
        let r = ev(&func!["sign"; Term::float(f64::NAN)]).unwrap();
        assert!(matches!(r, Num::Float(f) if f.is_nan()));
        assert_eq!(ev(&func!["sign"; Term::float(-0.0)]).unwrap(), Num::Float(-0.0));
        assert_eq!(ev(&func!["sign"; Term::int(-3)]).unwrap(), Num::Int(-1));
    }

    #[test]
    fn rounding_family() {
        assert_eq!(ev(&func!["truncate"; Term::float(1.9)]).unwrap(), Num::Int(1));
        assert_eq!(ev(&func!["round"; Term::float(1.5)]).unwrap(), Num::Int(2));
        assert_eq!(ev(&func!["ceiling"; Term::float(1.1)]).unwrap(), Num::Int(2));
        assert_eq!(ev(&func!["floor"; Term::float(-1.1)]).unwrap(), Num::Int(-2));
    }

    #[test]
    fn errors_for_bad_expressions() {
        assert!(matches!(
            ev(&Term::var(Var::fresh())),
            Err(Exception::Ball(_))
        ));
        assert!(ev(&atom!("no_such_const")).is_err());
        assert!(ev(&func!["frobnicate"; Term::int(1)]).is_err());
        // float operand to an integer-only function
        assert!(ev(&func!["//"; Term::float(1.0), Term::int(2)]).is_err());
    }

    #[test]
    fn bitwise_ops() {
        assert_eq!(ev(&func!["/\\"; Term::int(6), Term::int(3)]).unwrap(), Num::Int(2));
        assert_eq!(ev(&func!["\\/"; Term::int(6), Term::int(3)]).unwrap(), Num::Int(7));
        assert_eq!(ev(&func!["xor"; Term::int(6), Term::int(3)]).unwrap(), Num::Int(5));
        assert_eq!(ev(&func!["\\"; Term::int(0)]).unwrap(), Num::Int(-1));
        assert_eq!(ev(&func!["<<"; Term::int(1), Term::int(4)]).unwrap(), Num::Int(16));
        assert_eq!(ev(&func![">>"; Term::int(16), Term::int(2)]).unwrap(), Num::Int(4));
    }

    #[test]
    fn comparison_promotes_mixed_operands() {
        assert_eq!(Num::Int(1).cmp(Num::Float(1.5)), Ordering::Less);
        assert_eq!(Num::Int(2).cmp(Num::Float(2.0)), Ordering::Equal);
        assert_eq!(Num::Float(3.0).cmp(Num::Int(2)), Ordering::Greater);
    }
}
