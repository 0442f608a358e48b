//! Tree-walking evaluation over the allow-lists.

use std::f64::consts;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::{EvalError, EvalResult};

/// How many arguments a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Between(usize, usize),
    AtLeast(usize),
}

impl Arity {
    fn accepts(self, n: usize) -> bool {
        match self {
            Self::Exact(k) => n == k,
            Self::Between(lo, hi) => (lo..=hi).contains(&n),
            Self::AtLeast(lo) => n >= lo,
        }
    }

    fn describe(self) -> String {
        match self {
            Self::Exact(1) => "exactly 1 argument".to_string(),
            Self::Exact(k) => format!("exactly {k} arguments"),
            Self::Between(lo, hi) => format!("{lo} to {hi} arguments"),
            Self::AtLeast(1) => "at least 1 argument".to_string(),
            Self::AtLeast(lo) => format!("at least {lo} arguments"),
        }
    }
}

type Apply = fn(&[f64]) -> Result<f64, &'static str>;

/// An allowed function.
#[derive(Clone, Copy)]
pub struct Function {
    pub name: &'static str,
    pub arity: Arity,
    apply: Apply,
}

const DOMAIN: &str = "math domain error";

macro_rules! unary {
    ($f:expr) => {
        |args: &[f64]| Ok($f(args[0]))
    };
}

#[rustfmt::skip]
const FUNCTIONS: &[Function] = &[
    Function { name: "sin", arity: Arity::Exact(1), apply: unary!(f64::sin) },
    Function { name: "cos", arity: Arity::Exact(1), apply: unary!(f64::cos) },
    Function { name: "tan", arity: Arity::Exact(1), apply: unary!(f64::tan) },
    Function { name: "asin", arity: Arity::Exact(1), apply: unary!(f64::asin) },
    Function { name: "acos", arity: Arity::Exact(1), apply: unary!(f64::acos) },
    Function { name: "atan", arity: Arity::Exact(1), apply: unary!(f64::atan) },
    Function { name: "atan2", arity: Arity::Exact(2), apply: |a: &[f64]| Ok(a[0].atan2(a[1])) },
    Function { name: "sinh", arity: Arity::Exact(1), apply: unary!(f64::sinh) },
    Function { name: "cosh", arity: Arity::Exact(1), apply: unary!(f64::cosh) },
    Function { name: "tanh", arity: Arity::Exact(1), apply: unary!(f64::tanh) },
    Function { name: "asinh", arity: Arity::Exact(1), apply: unary!(f64::asinh) },
    Function { name: "acosh", arity: Arity::Exact(1), apply: unary!(f64::acosh) },
    Function { name: "atanh", arity: Arity::Exact(1), apply: unary!(f64::atanh) },
    Function { name: "exp", arity: Arity::Exact(1), apply: unary!(f64::exp) },
    Function { name: "expm1", arity: Arity::Exact(1), apply: unary!(f64::exp_m1) },
    Function { name: "log", arity: Arity::Between(1, 2), apply: log },
    Function { name: "log2", arity: Arity::Exact(1), apply: |a: &[f64]| positive(a[0]).map(f64::log2) },
    Function { name: "log10", arity: Arity::Exact(1), apply: |a: &[f64]| positive(a[0]).map(f64::log10) },
    Function { name: "log1p", arity: Arity::Exact(1), apply: log1p },
    Function { name: "sqrt", arity: Arity::Exact(1), apply: unary!(f64::sqrt) },
    Function { name: "cbrt", arity: Arity::Exact(1), apply: unary!(f64::cbrt) },
    Function { name: "pow", arity: Arity::Exact(2), apply: |a: &[f64]| Ok(a[0].powf(a[1])) },
    Function { name: "hypot", arity: Arity::AtLeast(1), apply: hypot },
    Function { name: "fabs", arity: Arity::Exact(1), apply: unary!(f64::abs) },
    Function { name: "abs", arity: Arity::Exact(1), apply: unary!(f64::abs) },
    Function { name: "floor", arity: Arity::Exact(1), apply: unary!(f64::floor) },
    Function { name: "ceil", arity: Arity::Exact(1), apply: unary!(f64::ceil) },
    Function { name: "trunc", arity: Arity::Exact(1), apply: unary!(f64::trunc) },
    Function { name: "round", arity: Arity::Between(1, 2), apply: round },
    Function { name: "degrees", arity: Arity::Exact(1), apply: unary!(f64::to_degrees) },
    Function { name: "radians", arity: Arity::Exact(1), apply: unary!(f64::to_radians) },
    Function { name: "copysign", arity: Arity::Exact(2), apply: |a: &[f64]| Ok(a[0].copysign(a[1])) },
    Function { name: "fmod", arity: Arity::Exact(2), apply: |a: &[f64]| Ok(a[0] % a[1]) },
    Function { name: "factorial", arity: Arity::Exact(1), apply: factorial },
    Function { name: "gcd", arity: Arity::AtLeast(1), apply: gcd },
    Function { name: "min", arity: Arity::AtLeast(1), apply: |a: &[f64]| Ok(a.iter().copied().fold(f64::INFINITY, f64::min)) },
    Function { name: "max", arity: Arity::AtLeast(1), apply: |a: &[f64]| Ok(a.iter().copied().fold(f64::NEG_INFINITY, f64::max)) },
];

const CONSTANTS: &[(&str, f64)] = &[
    ("pi", consts::PI),
    ("e", consts::E),
    ("tau", consts::TAU),
    ("inf", f64::INFINITY),
    ("nan", f64::NAN),
];

/// Looks up an allowed function.
pub fn function(name: &str) -> Option<&'static Function> {
    FUNCTIONS.iter().find(|f| f.name == name)
}

/// Looks up an allowed constant.
pub fn constant(name: &str) -> Option<f64> {
    CONSTANTS.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
}

/// Names of every allowed function, in table order.
pub fn function_names() -> impl Iterator<Item = &'static str> {
    FUNCTIONS.iter().map(|f| f.name)
}

/// Remainder with the sign of the divisor, so `-7 % 3` is `2`.
/// `fmod` keeps the truncated remainder.
fn floored_rem(l: f64, r: f64) -> f64 {
    let m = l % r;
    if m != 0.0 && (m < 0.0) != (r < 0.0) {
        m + r
    } else {
        m
    }
}

/// Evaluates a parsed expression.
pub fn eval(expr: &Expr) -> EvalResult<f64> {
    match expr {
        Expr::Literal(value) => Ok(*value),

        Expr::Name(name) => constant(name).ok_or_else(|| EvalError::DisallowedName {
            name: name.clone(),
        }),

        Expr::Unary { op, operand } => {
            let value = eval(operand)?;
            Ok(match op {
                UnaryOp::Plus => value,
                UnaryOp::Neg => -value,
            })
        }

        Expr::Binary { op, left, right } => {
            let l = eval(left)?;
            let r = eval(right)?;
            Ok(match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div => l / r,
                BinaryOp::Mod => floored_rem(l, r),
                BinaryOp::Pow => l.powf(r),
            })
        }

        Expr::Call { name, args } => {
            // Resolve the name first: a disallowed call never evaluates its arguments.
            let func = function(name).ok_or_else(|| EvalError::DisallowedFunction {
                name: name.clone(),
            })?;

            if !func.arity.accepts(args.len()) {
                return Err(EvalError::invalid_args(
                    func.name,
                    format!("expected {}, got {}", func.arity.describe(), args.len()),
                ));
            }

            let values = args.iter().map(eval).collect::<EvalResult<Vec<_>>>()?;
            let result =
                (func.apply)(&values).map_err(|reason| EvalError::invalid_args(func.name, reason))?;

            if result.is_nan() && !values.iter().any(|v| v.is_nan()) {
                return Err(EvalError::invalid_args(func.name, DOMAIN));
            }
            Ok(result)
        }

        Expr::Unsupported(construct) => Err(EvalError::UnsupportedExpression {
            construct: *construct,
        }),
    }
}

// =============================================================================
// Function bodies
// =============================================================================

fn positive(x: f64) -> Result<f64, &'static str> {
    if x > 0.0 || x.is_nan() { Ok(x) } else { Err(DOMAIN) }
}

fn log(args: &[f64]) -> Result<f64, &'static str> {
    let x = positive(args[0])?;
    match args.get(1) {
        None => Ok(x.ln()),
        Some(&base) => {
            let base = positive(base)?;
            if base == 1.0 {
                return Err("log base must not be 1");
            }
            Ok(x.ln() / base.ln())
        }
    }
}

fn log1p(args: &[f64]) -> Result<f64, &'static str> {
    if args[0] <= -1.0 {
        return Err(DOMAIN);
    }
    Ok(args[0].ln_1p())
}

fn hypot(args: &[f64]) -> Result<f64, &'static str> {
    Ok(args.iter().fold(0.0_f64, |acc, x| acc.hypot(*x)))
}

fn integral(x: f64) -> Result<f64, &'static str> {
    if x.is_finite() && x.fract() == 0.0 {
        Ok(x)
    } else {
        Err("expected an integer")
    }
}

fn round(args: &[f64]) -> Result<f64, &'static str> {
    let x = args[0];
    match args.get(1) {
        None => Ok(x.round_ties_even()),
        Some(&digits) => {
            let digits = integral(digits)?;
            let scale = 10f64.powi(digits as i32);
            if !scale.is_finite() || scale == 0.0 {
                return Ok(x);
            }
            Ok((x * scale).round_ties_even() / scale)
        }
    }
}

fn factorial(args: &[f64]) -> Result<f64, &'static str> {
    let n = integral(args[0])?;
    if n < 0.0 {
        return Err("factorial() not defined for negative values");
    }
    let mut acc = 1.0_f64;
    let mut k = 2.0_f64;
    while k <= n && acc.is_finite() {
        acc *= k;
        k += 1.0;
    }
    Ok(acc)
}

fn gcd(args: &[f64]) -> Result<f64, &'static str> {
    let mut acc = 0.0_f64;
    for &x in args {
        let mut a = integral(acc)?.abs();
        let mut b = integral(x)?.abs();
        while b != 0.0 {
            (a, b) = (b, a % b);
        }
        acc = a;
    }
    Ok(acc)
}
