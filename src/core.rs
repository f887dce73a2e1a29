use std::{cmp::Ordering, f64::consts, fmt::Display};

use im_rc::Vector;

use crate::{
    error::{self as e, Error},
    value::{
        Args,
        Arity::{AtLeast, Between, Exactly},
        Builtin, EvalResult, Value,
    },
};

const BUILTINS: &[Builtin] = &[
    Builtin::new("+", AtLeast(0), add),
    Builtin::new("-", Exactly(2), subtract),
    Builtin::new("*", AtLeast(0), multiply),
    Builtin::new("/", Exactly(2), divide),
    Builtin::new("=", Exactly(2), equal),
    Builtin::new("append", Exactly(2), append),
    Builtin::new("head", Exactly(1), head),
    Builtin::new("tail", Exactly(1), tail),
    Builtin::new("length", Exactly(1), length),
    Builtin::new("list", AtLeast(0), list),
    Builtin::new("list?", Exactly(1), listp),
    Builtin::new("number?", Exactly(1), numberp),
    Builtin::new("symbol?", Exactly(1), symbolp),
    Builtin::new("null?", Exactly(1), nullp),
    Builtin::new("not", Exactly(1), not),
    Builtin::new("max", AtLeast(1), max),
    Builtin::new("min", AtLeast(1), min),
    Builtin::new("map", Exactly(2), map),
    // math
    Builtin::new("sin", Exactly(1), sin),
    Builtin::new("cos", Exactly(1), cos),
    Builtin::new("tan", Exactly(1), tan),
    Builtin::new("asin", Exactly(1), asin),
    Builtin::new("acos", Exactly(1), acos),
    Builtin::new("atan", Exactly(1), atan),
    Builtin::new("sinh", Exactly(1), sinh),
    Builtin::new("cosh", Exactly(1), cosh),
    Builtin::new("tanh", Exactly(1), tanh),
    Builtin::new("asinh", Exactly(1), asinh),
    Builtin::new("acosh", Exactly(1), acosh),
    Builtin::new("atanh", Exactly(1), atanh),
    Builtin::new("exp", Exactly(1), exp),
    Builtin::new("expm1", Exactly(1), expm1),
    Builtin::new("sqrt", Exactly(1), sqrt),
    Builtin::new("log", Between(1, 2), log),
    Builtin::new("log10", Exactly(1), log10),
    Builtin::new("log2", Exactly(1), log2),
    Builtin::new("log1p", Exactly(1), log1p),
    Builtin::new("fabs", Exactly(1), fabs),
    Builtin::new("degrees", Exactly(1), degrees),
    Builtin::new("radians", Exactly(1), radians),
    Builtin::new("ceil", Exactly(1), ceil),
    Builtin::new("floor", Exactly(1), floor),
    Builtin::new("trunc", Exactly(1), trunc),
    Builtin::new("factorial", Exactly(1), factorial),
    Builtin::new("isinf", Exactly(1), isinf),
    Builtin::new("isnan", Exactly(1), isnan),
    Builtin::new("pow", Exactly(2), pow),
    Builtin::new("atan2", Exactly(2), atan2),
    Builtin::new("hypot", Exactly(2), hypot),
    Builtin::new("fmod", Exactly(2), fmod),
    Builtin::new("copysign", Exactly(2), copysign),
    Builtin::new("erf", Exactly(1), erf),
    Builtin::new("erfc", Exactly(1), erfc),
    Builtin::new("gamma", Exactly(1), gamma),
    Builtin::new("lgamma", Exactly(1), lgamma),
    Builtin::new("ldexp", Exactly(2), ldexp),
    Builtin::new("modf", Exactly(1), modf),
    Builtin::new("frexp", Exactly(1), frexp),
    Builtin::new("fsum", Exactly(1), fsum),
];

/// Every binding of the root environment.
pub fn namespace() -> Vec<(&'static str, Value)> {
    let mut ns = vec![
        ("pi", Value::Float(consts::PI)),
        ("e", Value::Float(consts::E)),
        ("tau", Value::Float(consts::TAU)),
        ("inf", Value::Float(f64::INFINITY)),
        ("nan", Value::Float(f64::NAN)),
    ];
    ns.extend(BUILTINS.iter().map(|b| (b.name, Value::Builtin(*b))));
    ns
}

pub fn add(args: Args) -> EvalResult {
    fold(args, Value::Integer(0), i64::checked_add, |a, b| a + b, '+')
}

pub fn multiply(args: Args) -> EvalResult {
    fold(args, Value::Integer(1), i64::checked_mul, |a, b| a * b, '*')
}

pub fn subtract(args: Args) -> EvalResult {
    let left = number(&args[0], '-', 0)?;
    let right = number(&args[1], '-', 1)?;
    arithmetic(left, right, i64::checked_sub, |a, b| a - b, '-')
}

pub fn divide(args: Args) -> EvalResult {
    let left = float(&args[0], '/', 0)?;
    let right = float(&args[1], '/', 1)?;
    if right == 0.0 {
        Err(e::domain('/', "division by zero"))
    } else {
        Ok(Value::Float(left / right))
    }
}

pub fn equal(args: Args) -> EvalResult {
    Ok(Value::Bool(args[0] == args[1]))
}

pub fn append(args: Args) -> EvalResult {
    match (&args[0], &args[1]) {
        (Value::List(left), Value::List(right)) => {
            let mut list = left.clone();
            list.append(right.clone());
            Ok(Value::List(list))
        }
        (Value::Text(left), Value::Text(right)) => {
            Ok(Value::make_text(format!("{}{}", left, right)))
        }
        (Value::List(_), _) => Err(e::arg_type("append", "list", 1)),
        (Value::Text(_), _) => Err(e::arg_type("append", "text", 1)),
        _ => Err(e::arg_type("append", "list or text", 0)),
    }
}

pub fn head(args: Args) -> EvalResult {
    let first = match &args[0] {
        Value::List(l) => l.front().map(|v| v.to_string()),
        Value::Text(s) => s.chars().next().map(String::from),
        _ => return Err(e::arg_type("head", "list or text", 0)),
    };

    first
        .map(|s| Value::make_text(format!("({})", s)))
        .ok_or_else(|| e::domain("head", "empty sequence"))
}

pub fn tail(args: Args) -> EvalResult {
    let rest: Vec<String> = match &args[0] {
        Value::List(l) => l.iter().skip(1).map(|v| v.to_string()).collect(),
        Value::Text(s) => s.chars().skip(1).map(String::from).collect(),
        _ => return Err(e::arg_type("tail", "list or text", 0)),
    };

    Ok(Value::make_text(format!("({})", rest.join(","))))
}

pub fn length(args: Args) -> EvalResult {
    let len = match &args[0] {
        Value::List(l) => l.len(),
        Value::Text(s) => s.chars().count(),
        Value::Mapping(m) => m.len(),
        _ => return Err(e::arg_type("length", "list, text or mapping", 0)),
    };
    Ok(Value::Integer(len as i64))
}

pub fn list(args: Args) -> EvalResult {
    Ok(Value::List(args))
}

pub fn listp(args: Args) -> EvalResult {
    Ok(Value::Bool(matches!(args[0], Value::List(_))))
}

pub fn numberp(args: Args) -> EvalResult {
    Ok(Value::Bool(args[0].is_number()))
}

pub fn symbolp(args: Args) -> EvalResult {
    Ok(Value::Bool(matches!(args[0], Value::Text(_))))
}

pub fn nullp(args: Args) -> EvalResult {
    Ok(Value::Bool(args[0].list().map_or(false, Vector::is_empty)))
}

pub fn not(args: Args) -> EvalResult {
    Ok(Value::Bool(!args[0].truthy()))
}

pub fn max(args: Args) -> EvalResult {
    extremum(args, Ordering::Greater, "max")
}

pub fn min(args: Args) -> EvalResult {
    extremum(args, Ordering::Less, "min")
}

pub fn map(args: Args) -> EvalResult {
    let procedure = match &args[0] {
        Value::Builtin(b) => *b,
        _ => return Err(e::arg_type("map", "procedure", 0)),
    };
    let items = args[1].list().ok_or_else(|| e::arg_type("map", "list", 1))?;

    items
        .iter()
        .map(|item| procedure.call(Vector::unit(item.clone())))
        .collect::<Result<Vector<_>, _>>()
        .map(Value::List)
}

pub fn sin(args: Args) -> EvalResult {
    unary(args, f64::sin, "sin")
}

pub fn cos(args: Args) -> EvalResult {
    unary(args, f64::cos, "cos")
}

pub fn tan(args: Args) -> EvalResult {
    unary(args, f64::tan, "tan")
}

pub fn asin(args: Args) -> EvalResult {
    unary_checked(args, f64::asin, |x| (-1.0..=1.0).contains(&x), "asin")
}

pub fn acos(args: Args) -> EvalResult {
    unary_checked(args, f64::acos, |x| (-1.0..=1.0).contains(&x), "acos")
}

pub fn atan(args: Args) -> EvalResult {
    unary(args, f64::atan, "atan")
}

pub fn sinh(args: Args) -> EvalResult {
    unary(args, f64::sinh, "sinh")
}

pub fn cosh(args: Args) -> EvalResult {
    unary(args, f64::cosh, "cosh")
}

pub fn tanh(args: Args) -> EvalResult {
    unary(args, f64::tanh, "tanh")
}

pub fn asinh(args: Args) -> EvalResult {
    unary(args, f64::asinh, "asinh")
}

pub fn acosh(args: Args) -> EvalResult {
    unary_checked(args, f64::acosh, |x| x >= 1.0, "acosh")
}

pub fn atanh(args: Args) -> EvalResult {
    unary_checked(args, f64::atanh, |x| x > -1.0 && x < 1.0, "atanh")
}

pub fn exp(args: Args) -> EvalResult {
    unary(args, f64::exp, "exp")
}

pub fn expm1(args: Args) -> EvalResult {
    unary(args, f64::exp_m1, "expm1")
}

pub fn sqrt(args: Args) -> EvalResult {
    unary_checked(args, f64::sqrt, |x| x >= 0.0, "sqrt")
}

pub fn log(args: Args) -> EvalResult {
    let x = float(&args[0], "log", 0)?;
    if x <= 0.0 {
        return Err(e::math_domain("log"));
    }
    match args.get(1) {
        None => Ok(Value::Float(x.ln())),
        Some(base) => {
            let base = float(base, "log", 1)?;
            if base <= 0.0 {
                Err(e::math_domain("log"))
            } else if base == 1.0 {
                Err(e::domain("log", "division by zero"))
            } else {
                Ok(Value::Float(x.ln() / base.ln()))
            }
        }
    }
}

pub fn log10(args: Args) -> EvalResult {
    unary_checked(args, f64::log10, |x| x > 0.0, "log10")
}

pub fn log2(args: Args) -> EvalResult {
    unary_checked(args, f64::log2, |x| x > 0.0, "log2")
}

pub fn log1p(args: Args) -> EvalResult {
    unary_checked(args, f64::ln_1p, |x| x > -1.0, "log1p")
}

pub fn fabs(args: Args) -> EvalResult {
    unary(args, f64::abs, "fabs")
}

pub fn degrees(args: Args) -> EvalResult {
    unary(args, f64::to_degrees, "degrees")
}

pub fn radians(args: Args) -> EvalResult {
    unary(args, f64::to_radians, "radians")
}

pub fn ceil(args: Args) -> EvalResult {
    rounding(args, f64::ceil, "ceil")
}

pub fn floor(args: Args) -> EvalResult {
    rounding(args, f64::floor, "floor")
}

pub fn trunc(args: Args) -> EvalResult {
    rounding(args, f64::trunc, "trunc")
}

pub fn factorial(args: Args) -> EvalResult {
    match args[0] {
        Value::Integer(n) if n < 0 => Err(e::domain(
            "factorial",
            "not defined for negative values",
        )),
        Value::Integer(n) => (2..=n)
            .try_fold(1i64, |acc, k| acc.checked_mul(k))
            .map(Value::Integer)
            .ok_or_else(|| e::numeric_overflow("factorial")),
        _ => Err(e::arg_type("factorial", "integer", 0)),
    }
}

pub fn isinf(args: Args) -> EvalResult {
    Ok(Value::Bool(float(&args[0], "isinf", 0)?.is_infinite()))
}

pub fn isnan(args: Args) -> EvalResult {
    Ok(Value::Bool(float(&args[0], "isnan", 0)?.is_nan()))
}

pub fn pow(args: Args) -> EvalResult {
    let x = float(&args[0], "pow", 0)?;
    let y = float(&args[1], "pow", 1)?;
    if (x == 0.0 && y < 0.0) || (x < 0.0 && y.fract() != 0.0) {
        Err(e::math_domain("pow"))
    } else {
        Ok(Value::Float(x.powf(y)))
    }
}

pub fn atan2(args: Args) -> EvalResult {
    binary(args, f64::atan2, "atan2")
}

pub fn hypot(args: Args) -> EvalResult {
    binary(args, f64::hypot, "hypot")
}

pub fn copysign(args: Args) -> EvalResult {
    binary(args, f64::copysign, "copysign")
}

pub fn fmod(args: Args) -> EvalResult {
    if float(&args[1], "fmod", 1)? == 0.0 {
        return Err(e::math_domain("fmod"));
    }
    binary(args, |x, y| x % y, "fmod")
}

pub fn erf(args: Args) -> EvalResult {
    unary(args, libm::erf, "erf")
}

pub fn erfc(args: Args) -> EvalResult {
    unary(args, libm::erfc, "erfc")
}

pub fn gamma(args: Args) -> EvalResult {
    let x = float(&args[0], "gamma", 0)?;
    if x == f64::NEG_INFINITY || (x <= 0.0 && x.fract() == 0.0) {
        return Err(e::math_domain("gamma"));
    }
    let y = libm::tgamma(x);
    if y.is_infinite() && x.is_finite() {
        Err(e::math_range("gamma"))
    } else {
        Ok(Value::Float(y))
    }
}

pub fn lgamma(args: Args) -> EvalResult {
    unary_checked(args, libm::lgamma, |x| x > 0.0 || x.fract() != 0.0, "lgamma")
}

pub fn ldexp(args: Args) -> EvalResult {
    let x = float(&args[0], "ldexp", 0)?;
    let exp = match args[1] {
        Value::Integer(n) => n.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
        _ => return Err(e::arg_type("ldexp", "integer", 1)),
    };
    let y = libm::ldexp(x, exp);
    if y.is_infinite() && x.is_finite() {
        Err(e::math_range("ldexp"))
    } else {
        Ok(Value::Float(y))
    }
}

/// `(fractional integral)`, both floats carrying the sign of the argument.
pub fn modf(args: Args) -> EvalResult {
    let (fractional, integral) = libm::modf(float(&args[0], "modf", 0)?);
    Ok(Value::List(Vector::from(vec![
        Value::Float(fractional),
        Value::Float(integral),
    ])))
}

/// `(mantissa exponent)` with `0.5 <= |mantissa| < 1`, or `(0.0 0)` for zero.
pub fn frexp(args: Args) -> EvalResult {
    let (mantissa, exponent) = libm::frexp(float(&args[0], "frexp", 0)?);
    Ok(Value::List(Vector::from(vec![
        Value::Float(mantissa),
        Value::Integer(exponent as i64),
    ])))
}

/// Sums a list of numbers without intermediate rounding loss.
pub fn fsum(args: Args) -> EvalResult {
    let items = args[0].list().ok_or_else(|| e::arg_type("fsum", "list", 0))?;
    // Non-overlapping partial sums in increasing magnitude.
    let mut partials: Vec<f64> = Vec::new();
    let mut special = 0.0;
    let mut infinities = 0.0;

    for (i, item) in items.iter().enumerate() {
        let mut x = float(item, "fsum", i)?;
        if !x.is_finite() {
            special += x;
            if x.is_infinite() {
                infinities += x;
            }
            continue;
        }

        let mut kept = 0;
        for j in 0..partials.len() {
            let mut y = partials[j];
            if x.abs() < y.abs() {
                std::mem::swap(&mut x, &mut y);
            }
            let hi = x + y;
            if hi.is_infinite() {
                return Err(e::domain("fsum", "intermediate overflow"));
            }
            let lo = y - (hi - x);
            if lo != 0.0 {
                partials[kept] = lo;
                kept += 1;
            }
            x = hi;
        }
        partials.truncate(kept);
        partials.push(x);
    }

    if infinities.is_nan() {
        Err(e::domain("fsum", "-inf + inf"))
    } else if special != 0.0 {
        Ok(Value::Float(special))
    } else {
        Ok(Value::Float(partials.iter().fold(0.0, |acc, p| acc + p)))
    }
}

#[inline]
fn number<'a, D: Display>(value: &'a Value, name: D, position: usize) -> Result<&'a Value, Error> {
    if value.is_number() {
        Ok(value)
    } else {
        Err(e::arg_type(name, "number", position))
    }
}

#[inline]
fn float<D: Display>(value: &Value, name: D, position: usize) -> Result<f64, Error> {
    value
        .float()
        .ok_or_else(|| e::arg_type(name, "number", position))
}

/// Integer arithmetic stays integral; any float operand promotes both.
#[inline]
fn arithmetic(
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
    name: char,
) -> EvalResult {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => int_op(*a, *b)
            .map(Value::Integer)
            .ok_or_else(|| e::numeric_overflow(name)),
        _ => match (left.float(), right.float()) {
            (Some(a), Some(b)) => Ok(Value::Float(float_op(a, b))),
            (None, _) => Err(e::arg_type(name, "number", 0)),
            (_, None) => Err(e::arg_type(name, "number", 1)),
        },
    }
}

#[inline]
fn fold(
    args: Args,
    init: Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
    name: char,
) -> EvalResult {
    args.iter().enumerate().try_fold(init, |acc, (i, v)| {
        arithmetic(&acc, number(v, name, i)?, int_op, float_op, name)
    })
}

#[inline]
fn unary(args: Args, operation: fn(f64) -> f64, name: &str) -> EvalResult {
    float(&args[0], name, 0).map(|x| Value::Float(operation(x)))
}

#[inline]
fn unary_checked(
    args: Args,
    operation: fn(f64) -> f64,
    valid: fn(f64) -> bool,
    name: &str,
) -> EvalResult {
    let x = float(&args[0], name, 0)?;
    if valid(x) || x.is_nan() {
        Ok(Value::Float(operation(x)))
    } else {
        Err(e::math_domain(name))
    }
}

#[inline]
fn binary(args: Args, operation: fn(f64, f64) -> f64, name: &str) -> EvalResult {
    let x = float(&args[0], name, 0)?;
    let y = float(&args[1], name, 1)?;
    Ok(Value::Float(operation(x, y)))
}

#[inline]
fn rounding(args: Args, operation: fn(f64) -> f64, name: &str) -> EvalResult {
    match args[0] {
        Value::Integer(n) => Ok(Value::Integer(n)),
        Value::Float(x) => {
            let rounded = operation(x);
            if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
                Ok(Value::Integer(rounded as i64))
            } else {
                Err(e::domain(name, format!("cannot convert {} to integer", Value::Float(x))))
            }
        }
        _ => Err(e::arg_type(name, "number", 0)),
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
        _ => a.float()?.partial_cmp(&b.float()?),
    }
}

// A single list argument is searched element-wise, otherwise the arguments are.
fn extremum(args: Args, wanted: Ordering, name: &str) -> EvalResult {
    let items = if args.len() == 1 {
        match &args[0] {
            Value::List(l) => l.clone(),
            _ => return Err(e::arg_type(name, "list", 0)),
        }
    } else {
        args
    };

    let mut iter = items.iter().enumerate();
    let (_, first) = iter
        .next()
        .ok_or_else(|| e::domain(name, "empty sequence"))?;
    let mut best = number(first, name, 0)?;
    for (i, item) in iter {
        let item = number(item, name, i)?;
        if compare(item, best) == Some(wanted) {
            best = item;
        }
    }
    Ok(best.clone())
}
