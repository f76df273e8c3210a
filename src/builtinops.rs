//! Built-in operations registry.
//!
//! Every primitive procedure installed by
//! [`create_global_env`](crate::evaluator::create_global_env) is defined here once, with
//! its identifier, its [`Arity`] and a plain function pointer taking the evaluated
//! arguments:
//!
//! ```scheme
//! (+ 1 2.5)            ; 3.5, mixing kinds promotes to float
//! (< 1 2 3)            ; #t, comparisons chain
//! (cons 0 (list 1 2))  ; (0 1 2)
//! (map + (list 1 2) (list 10 20 30))  ; (11 22)
//! (sqrt 2)             ; 1.4142135623730951
//! ```
//!
//! ## Numbers
//!
//! Arithmetic accepts integers and floats. Two integers give an integer, checked for
//! overflow; any float operand promotes the result to a float. `/` always divides in
//! floating point. The math namespace (`sin`, `log`, `pow`, ...) follows host `f64`
//! semantics, so a domain error yields NaN or an infinity rather than failing.
//!
//! ## Error Handling
//!
//! - **Type errors**: an argument of the wrong kind, e.g. `(car 5)` or `(+ 1 (quote a))`
//! - **Evaluation errors**: `car` of an empty list, division by zero, integer overflow
//! - **Arity errors**: raised by [`Arity::validate`] before the function runs
//!
//! ## Adding New Operations
//!
//! 1. Implement the function with the signature `fn(args: &[Value]) -> Result<Value, Error>`
//! 2. Add it to `BUILTIN_OPS` with its identifier and arity
//! 3. Add test cases to the table in this module's tests

use crate::Error;
use crate::ast::{IntegerType, Value};
use crate::evaluator::apply;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::LazyLock;

/// Number of arguments a procedure accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly n arguments
    Exact(usize),
    /// At least n arguments
    AtLeast(usize),
    /// Between min and max arguments (inclusive)
    Range(usize, usize),
}

impl Arity {
    /// Check an argument count, reporting the nearest acceptable count on failure
    pub fn validate(self, arg_count: usize) -> Result<(), Error> {
        match self {
            Arity::Exact(n) if arg_count != n => Err(Error::arity_error(n, arg_count)),
            Arity::AtLeast(min) | Arity::Range(min, _) if arg_count < min => {
                Err(Error::arity_error(min, arg_count))
            }
            Arity::Range(_, max) if arg_count > max => Err(Error::arity_error(max, arg_count)),
            _ => Ok(()),
        }
    }
}

/// Signature shared by every built-in operation
pub type BuiltinFn = fn(&[Value]) -> Result<Value, Error>;

/// Definition of a built-in operation
#[derive(Debug, Clone)]
pub struct BuiltinOp {
    /// The identifier this operation is bound to in the global environment
    pub scheme_id: &'static str,
    pub func: BuiltinFn,
    /// Expected number of arguments
    pub arity: Arity,
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        // Compare operations by their scheme_id, which uniquely identifies them
        self.scheme_id == other.scheme_id
    }
}

/// Float constants of the math namespace
pub const MATH_CONSTANTS: &[(&str, f64)] = &[
    ("pi", std::f64::consts::PI),
    ("e", std::f64::consts::E),
    ("tau", std::f64::consts::TAU),
    ("inf", f64::INFINITY),
    ("nan", f64::NAN),
];

//
// Argument helpers
//

/// A numeric argument, keeping track of its kind
#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(IntegerType),
    Float(f64),
}

impl Number {
    fn from_value(value: &Value) -> Option<Number> {
        match value {
            Value::Integer(n) => Some(Number::Int(*n)),
            Value::Float(x) => Some(Number::Float(*x)),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            // Precision loss above 2^53 matches host float promotion
            Number::Int(n) => n as f64,
            Number::Float(x) => x,
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(n) => Value::Integer(n),
            Number::Float(x) => Value::Float(x),
        }
    }
}

/// Order two numbers, exactly for integer pairs. `None` if either is NaN.
fn compare_numbers(a: Number, b: Number) -> Option<Ordering> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => Some(x.cmp(&y)),
        _ => a.as_f64().partial_cmp(&b.as_f64()),
    }
}

fn number_arg(op: &str, value: &Value) -> Result<Number, Error> {
    Number::from_value(value).ok_or_else(|| {
        Error::TypeError(format!(
            "{op}: expected a number, got {} {value}",
            value.type_name()
        ))
    })
}

fn number_args(op: &str, args: &[Value]) -> Result<Vec<Number>, Error> {
    args.iter().map(|arg| number_arg(op, arg)).collect()
}

fn float_arg(op: &str, value: &Value) -> Result<f64, Error> {
    number_arg(op, value).map(Number::as_f64)
}

fn integer_arg(op: &str, value: &Value) -> Result<IntegerType, Error> {
    match value {
        Value::Integer(n) => Ok(*n),
        _ => Err(Error::TypeError(format!(
            "{op}: expected an integer, got {} {value}",
            value.type_name()
        ))),
    }
}

fn list_arg<'a>(op: &str, value: &'a Value) -> Result<&'a [Value], Error> {
    match value {
        Value::List(elements) => Ok(&elements[..]),
        _ => Err(Error::TypeError(format!(
            "{op}: expected a list, got {} {value}",
            value.type_name()
        ))),
    }
}

fn one_arg(args: &[Value]) -> Result<&Value, Error> {
    match args {
        [arg] => Ok(arg),
        _ => Err(Error::arity_error(1, args.len())),
    }
}

fn two_args(args: &[Value]) -> Result<(&Value, &Value), Error> {
    match args {
        [first, second] => Ok((first, second)),
        _ => Err(Error::arity_error(2, args.len())),
    }
}

fn overflow(op: &str) -> Error {
    Error::EvalError(format!("integer overflow in {op}"))
}

/// Convert an integral float to an integer, failing when it cannot be represented
fn float_to_integer(op: &str, x: f64) -> Result<Value, Error> {
    // 2^63 is exactly representable; every float in [-2^63, 2^63) fits in i64
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if x.is_finite() && (-LIMIT..LIMIT).contains(&x) {
        Ok(Value::Integer(x as IntegerType))
    } else {
        Err(Error::EvalError(format!("{op}: cannot convert {x:?} to integer")))
    }
}

//
// Builtin Function Implementations
//

/// Combine two numbers, checked for integer pairs and promoted to float otherwise
fn arith(
    op: &str,
    a: Number,
    b: Number,
    int_op: fn(IntegerType, IntegerType) -> Option<IntegerType>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Number, Error> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => int_op(x, y).map(Number::Int).ok_or_else(|| overflow(op)),
        _ => Ok(Number::Float(float_op(a.as_f64(), b.as_f64()))),
    }
}

fn builtin_add(args: &[Value]) -> Result<Value, Error> {
    let mut sum = Number::Int(0);
    for n in number_args("+", args)? {
        sum = arith("+", sum, n, IntegerType::checked_add, |x, y| x + y)?;
    }
    Ok(sum.into())
}

fn builtin_mul(args: &[Value]) -> Result<Value, Error> {
    let nums = number_args("*", args)?;
    let Some((&first, rest)) = nums.split_first() else {
        return Err(Error::arity_error(1, 0));
    };

    let mut product = first;
    for &n in rest {
        product = arith("*", product, n, IntegerType::checked_mul, |x, y| x * y)?;
    }
    Ok(product.into())
}

fn builtin_sub(args: &[Value]) -> Result<Value, Error> {
    let nums = number_args("-", args)?;
    match nums.as_slice() {
        [] => Err(Error::arity_error(1, 0)),
        [Number::Int(n)] => n.checked_neg().map(Value::Integer).ok_or_else(|| overflow("-")),
        [Number::Float(x)] => Ok(Value::Float(-x)),
        [first, rest @ ..] => {
            let mut result = *first;
            for &n in rest {
                result = arith("-", result, n, IntegerType::checked_sub, |x, y| x - y)?;
            }
            Ok(result.into())
        }
    }
}

fn builtin_div(args: &[Value]) -> Result<Value, Error> {
    let nums = number_args("/", args)?;
    let (numerator, divisors) = match nums.as_slice() {
        [] => return Err(Error::arity_error(1, 0)),
        // One argument: reciprocal
        [only] => (1.0, std::slice::from_ref(only)),
        [first, rest @ ..] => (first.as_f64(), rest),
    };

    let mut quotient = numerator;
    for divisor in divisors {
        let d = divisor.as_f64();
        if d == 0.0 {
            return Err(Error::EvalError("division by zero".to_owned()));
        }
        quotient /= d;
    }
    Ok(Value::Float(quotient))
}

// Macro to generate numeric comparison functions
macro_rules! numeric_comparison {
    ($name:ident, $op_str:expr, $accept:pat) => {
        fn $name(args: &[Value]) -> Result<Value, Error> {
            let nums = number_args($op_str, args)?;
            if nums.len() < 2 {
                return Err(Error::arity_error(2, nums.len()));
            }

            // Chain comparisons: all adjacent pairs must satisfy the comparison.
            // NaN compares as unordered, so any comparison involving it is false.
            Ok(Value::Bool(
                nums.windows(2)
                    .all(|pair| matches!(compare_numbers(pair[0], pair[1]), $accept)),
            ))
        }
    };
}

// Generate all comparison functions
numeric_comparison!(builtin_eq, "=", Some(Ordering::Equal));
numeric_comparison!(builtin_lt, "<", Some(Ordering::Less));
numeric_comparison!(builtin_gt, ">", Some(Ordering::Greater));
numeric_comparison!(builtin_le, "<=", Some(Ordering::Less | Ordering::Equal));
numeric_comparison!(builtin_ge, ">=", Some(Ordering::Greater | Ordering::Equal));

fn builtin_car(args: &[Value]) -> Result<Value, Error> {
    match list_arg("car", one_arg(args)?)? {
        [first, ..] => Ok(first.clone()),
        [] => Err(Error::EvalError("car of empty list".into())),
    }
}

fn builtin_cdr(args: &[Value]) -> Result<Value, Error> {
    match list_arg("cdr", one_arg(args)?)? {
        [_, rest @ ..] => Ok(Value::list(rest.to_vec())),
        [] => Err(Error::EvalError("cdr of empty list".into())),
    }
}

fn builtin_cons(args: &[Value]) -> Result<Value, Error> {
    let (first, rest) = two_args(args)?;
    match rest {
        Value::List(tail) => {
            let mut new_list = Vec::with_capacity(tail.len() + 1);
            new_list.push(first.clone());
            new_list.extend_from_slice(tail);
            Ok(Value::list(new_list))
        }
        // No improper lists: the tail must already be a list
        _ => Err(Error::TypeError(format!(
            "cons requires a list as second argument, got {} {rest}",
            rest.type_name()
        ))),
    }
}

fn builtin_list(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::list(args.to_vec()))
}

fn builtin_length(args: &[Value]) -> Result<Value, Error> {
    let len = list_arg("length", one_arg(args)?)?.len();
    IntegerType::try_from(len)
        .map(Value::Integer)
        .map_err(|_| overflow("length"))
}

fn builtin_append(args: &[Value]) -> Result<Value, Error> {
    let mut result = Vec::new();
    for arg in args {
        result.extend_from_slice(list_arg("append", arg)?);
    }
    Ok(Value::list(result))
}

fn builtin_null(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(one_arg(args)?.is_nil()))
}

fn builtin_is_list(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(one_arg(args)?, Value::List(_))))
}

fn builtin_is_number(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(
        one_arg(args)?,
        Value::Integer(_) | Value::Float(_)
    )))
}

fn builtin_is_symbol(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(one_arg(args)?, Value::Symbol(_))))
}

fn builtin_is_procedure(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(one_arg(args)?, Value::Procedure(_))))
}

/// Identity: the same shared list, the same procedure, or equal atoms
fn is_identical(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::List(x), Value::List(y)) => Rc::ptr_eq(x, y) || (x.is_empty() && y.is_empty()),
        _ => a == b,
    }
}

/// Structural equality, comparing numbers by value across kinds
fn is_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::List(x), Value::List(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(p, q)| is_equal(p, q))
        }
        _ => match (Number::from_value(a), Number::from_value(b)) {
            (Some(x), Some(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
            _ => a == b,
        },
    }
}

fn builtin_eq_p(args: &[Value]) -> Result<Value, Error> {
    let (a, b) = two_args(args)?;
    Ok(Value::Bool(is_identical(a, b)))
}

fn builtin_equal(args: &[Value]) -> Result<Value, Error> {
    let (a, b) = two_args(args)?;
    Ok(Value::Bool(is_equal(a, b)))
}

fn builtin_abs(args: &[Value]) -> Result<Value, Error> {
    match number_arg("abs", one_arg(args)?)? {
        Number::Int(n) => n.checked_abs().map(Value::Integer).ok_or_else(|| overflow("abs")),
        Number::Float(x) => Ok(Value::Float(x.abs())),
    }
}

/// The first argument that no later argument beats, in its original kind
fn extreme(op: &str, args: &[Value], beats: Ordering) -> Result<Value, Error> {
    let nums = number_args(op, args)?;
    let Some((&first, rest)) = nums.split_first() else {
        return Err(Error::arity_error(1, 0));
    };

    let mut best = first;
    for &n in rest {
        if compare_numbers(n, best) == Some(beats) {
            best = n;
        }
    }
    Ok(best.into())
}

fn builtin_max(args: &[Value]) -> Result<Value, Error> {
    extreme("max", args, Ordering::Greater)
}

fn builtin_min(args: &[Value]) -> Result<Value, Error> {
    extreme("min", args, Ordering::Less)
}

fn builtin_not(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(one_arg(args)?, Value::Bool(false))))
}

fn builtin_round(args: &[Value]) -> Result<Value, Error> {
    match args {
        [x] => match number_arg("round", x)? {
            Number::Int(n) => Ok(Value::Integer(n)),
            Number::Float(x) => float_to_integer("round", x.round_ties_even()),
        },
        [x, digits] => {
            let x = float_arg("round", x)?;
            let digits = integer_arg("round", digits)?;
            let digits = i32::try_from(digits).map_err(|_| overflow("round"))?;

            let factor = 10f64.powi(digits);
            let scaled = x * factor;
            if !scaled.is_finite() || factor == 0.0 {
                // Rounding at this precision cannot change the value
                return Ok(Value::Float(x));
            }
            Ok(Value::Float(scaled.round_ties_even() / factor))
        }
        _ => Err(Error::arity_error(1, args.len())),
    }
}

fn builtin_begin(args: &[Value]) -> Result<Value, Error> {
    args.last()
        .cloned()
        .ok_or_else(|| Error::arity_error(1, 0))
}

fn builtin_map(args: &[Value]) -> Result<Value, Error> {
    let [func, lists @ ..] = args else {
        return Err(Error::arity_error(2, 0));
    };
    let Value::Procedure(procedure) = func else {
        return Err(Error::TypeError(format!(
            "map: expected a procedure, got {} {func}",
            func.type_name()
        )));
    };
    if lists.is_empty() {
        return Err(Error::arity_error(2, 1));
    }

    let lists = lists
        .iter()
        .map(|list| list_arg("map", list))
        .collect::<Result<Vec<_>, _>>()?;
    let len = lists.iter().map(|list| list.len()).min().unwrap_or(0);

    (0..len)
        .map(|i| apply(procedure, lists.iter().map(|list| list[i].clone()).collect()))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::list)
}

//
// Math namespace
//

// Macro to generate one-argument float functions of the math namespace
macro_rules! unary_float_op {
    ($name:ident, $op_str:expr, $f:expr) => {
        fn $name(args: &[Value]) -> Result<Value, Error> {
            let f: fn(f64) -> f64 = $f;
            Ok(Value::Float(f(float_arg($op_str, one_arg(args)?)?)))
        }
    };
}

unary_float_op!(math_sin, "sin", f64::sin);
unary_float_op!(math_cos, "cos", f64::cos);
unary_float_op!(math_tan, "tan", f64::tan);
unary_float_op!(math_asin, "asin", f64::asin);
unary_float_op!(math_acos, "acos", f64::acos);
unary_float_op!(math_atan, "atan", f64::atan);
unary_float_op!(math_sinh, "sinh", f64::sinh);
unary_float_op!(math_cosh, "cosh", f64::cosh);
unary_float_op!(math_tanh, "tanh", f64::tanh);
unary_float_op!(math_asinh, "asinh", f64::asinh);
unary_float_op!(math_acosh, "acosh", f64::acosh);
unary_float_op!(math_atanh, "atanh", f64::atanh);
unary_float_op!(math_exp, "exp", f64::exp);
unary_float_op!(math_expm1, "expm1", f64::exp_m1);
unary_float_op!(math_log10, "log10", f64::log10);
unary_float_op!(math_log2, "log2", f64::log2);
unary_float_op!(math_log1p, "log1p", f64::ln_1p);
unary_float_op!(math_sqrt, "sqrt", f64::sqrt);
unary_float_op!(math_fabs, "fabs", f64::abs);
unary_float_op!(math_degrees, "degrees", f64::to_degrees);
unary_float_op!(math_radians, "radians", f64::to_radians);
unary_float_op!(math_cbrt, "cbrt", f64::cbrt);
unary_float_op!(math_exp2, "exp2", f64::exp2);

// Macro to generate two-argument float functions of the math namespace
macro_rules! binary_float_op {
    ($name:ident, $op_str:expr, $f:expr) => {
        fn $name(args: &[Value]) -> Result<Value, Error> {
            let f: fn(f64, f64) -> f64 = $f;
            let (a, b) = two_args(args)?;
            Ok(Value::Float(f(float_arg($op_str, a)?, float_arg($op_str, b)?)))
        }
    };
}

binary_float_op!(math_atan2, "atan2", f64::atan2);
binary_float_op!(math_pow, "pow", f64::powf);
binary_float_op!(math_hypot, "hypot", f64::hypot);
// Remainder with the sign of the dividend
binary_float_op!(math_fmod, "fmod", |x, y| x % y);
binary_float_op!(math_copysign, "copysign", f64::copysign);
binary_float_op!(math_remainder, "remainder", ieee_remainder);
binary_float_op!(math_nextafter, "nextafter", next_after);

/// IEEE 754 remainder: `x - n*y` where `n` is `x/y` rounded half to even
fn ieee_remainder(x: f64, y: f64) -> f64 {
    if x.is_nan() || y.is_nan() || x.is_infinite() || y == 0.0 {
        return f64::NAN;
    }
    if y.is_infinite() {
        return x;
    }

    let (abs_x, abs_y) = (x.abs(), y.abs());
    let m = abs_x % abs_y;
    let c = abs_y - m;
    let r = match m.partial_cmp(&c) {
        Some(Ordering::Less) => m,
        Some(Ordering::Greater) => -c,
        // Exactly halfway: keep the even quotient
        _ => m - 2.0 * ((0.5 * (abs_x - m)) % abs_y),
    };
    1.0_f64.copysign(x) * r
}

/// The next representable float after `x` in the direction of `y`
fn next_after(x: f64, y: f64) -> f64 {
    if x.is_nan() || y.is_nan() {
        f64::NAN
    } else if x == y {
        y
    } else if y > x {
        x.next_up()
    } else {
        x.next_down()
    }
}

fn math_ulp(args: &[Value]) -> Result<Value, Error> {
    let x = float_arg("ulp", one_arg(args)?)?.abs();
    let ulp = if !x.is_finite() {
        x
    } else if x == f64::MAX {
        x - x.next_down()
    } else {
        x.next_up() - x
    };
    Ok(Value::Float(ulp))
}

fn math_fma(args: &[Value]) -> Result<Value, Error> {
    match args {
        [x, y, z] => Ok(Value::Float(float_arg("fma", x)?.mul_add(
            float_arg("fma", y)?,
            float_arg("fma", z)?,
        ))),
        _ => Err(Error::arity_error(3, args.len())),
    }
}

/// `x * 2^exp`, saturating to zero or infinity
fn math_ldexp(args: &[Value]) -> Result<Value, Error> {
    const STEP: i32 = 1000;

    let (x, exp) = two_args(args)?;
    let mut x = float_arg("ldexp", x)?;
    // Past this range every finite input has already overflowed or underflowed
    let mut exp = integer_arg("ldexp", exp)?.clamp(-2200, 2200) as i32;
    while exp > STEP {
        x *= 2f64.powi(STEP);
        exp -= STEP;
    }
    while exp < -STEP {
        x *= 2f64.powi(-STEP);
        exp += STEP;
    }
    Ok(Value::Float(x * 2f64.powi(exp)))
}

/// Split into mantissa in `[0.5, 1)` and a power of two
fn frexp(x: f64) -> (f64, IntegerType) {
    const EXP_MASK: u64 = 0x7ff << 52;

    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }
    let bits = x.to_bits();
    let biased = ((bits & EXP_MASK) >> 52) as IntegerType;
    if biased == 0 {
        // Subnormal
        let (mantissa, exp) = frexp(x * 2f64.powi(54));
        return (mantissa, exp - 54);
    }
    let mantissa = f64::from_bits((bits & !EXP_MASK) | (1022 << 52));
    (mantissa, biased - 1022)
}

fn math_frexp(args: &[Value]) -> Result<Value, Error> {
    let (mantissa, exp) = frexp(float_arg("frexp", one_arg(args)?)?);
    Ok(Value::list(vec![Value::Float(mantissa), Value::Integer(exp)]))
}

fn math_modf(args: &[Value]) -> Result<Value, Error> {
    let x = float_arg("modf", one_arg(args)?)?;
    let fractional = if x.is_infinite() {
        0.0_f64.copysign(x)
    } else {
        x.fract()
    };
    Ok(Value::list(vec![Value::Float(fractional), Value::Float(x.trunc())]))
}

/// Sum a list of floats without intermediate rounding loss
fn math_fsum(args: &[Value]) -> Result<Value, Error> {
    let values: Vec<f64> = number_args("fsum", list_arg("fsum", one_arg(args)?)?)?
        .into_iter()
        .map(Number::as_f64)
        .collect();
    if values.iter().any(|x| !x.is_finite()) {
        return Ok(Value::Float(values.iter().sum()));
    }

    // Shewchuk's non-overlapping partial sums
    let mut partials: Vec<f64> = Vec::new();
    for mut x in values {
        for mut y in std::mem::take(&mut partials) {
            if x.abs() < y.abs() {
                std::mem::swap(&mut x, &mut y);
            }
            let hi = x + y;
            let lo = y - (hi - x);
            if lo != 0.0 {
                partials.push(lo);
            }
            x = hi;
        }
        partials.push(x);
    }
    Ok(Value::Float(partials.iter().sum()))
}

fn math_prod(args: &[Value]) -> Result<Value, Error> {
    let (items, start) = match args {
        [items] => (items, Number::Int(1)),
        [items, start] => (items, number_arg("prod", start)?),
        _ => return Err(Error::arity_error(1, args.len())),
    };

    let mut product = start;
    for n in number_args("prod", list_arg("prod", items)?)? {
        product = arith("prod", product, n, IntegerType::checked_mul, |x, y| x * y)?;
    }
    Ok(product.into())
}

/// Two numeric lists of the same length
fn paired_number_lists(
    op: &str,
    args: &[Value],
) -> Result<(Vec<Number>, Vec<Number>), Error> {
    let (p, q) = two_args(args)?;
    let p = number_args(op, list_arg(op, p)?)?;
    let q = number_args(op, list_arg(op, q)?)?;
    if p.len() != q.len() {
        return Err(Error::EvalError(format!(
            "{op}: both lists must have the same length, got {} and {}",
            p.len(),
            q.len()
        )));
    }
    Ok((p, q))
}

/// Euclidean distance between two points given as coordinate lists
fn math_dist(args: &[Value]) -> Result<Value, Error> {
    let (p, q) = paired_number_lists("dist", args)?;
    let distance = p
        .iter()
        .zip(&q)
        .map(|(a, b)| a.as_f64() - b.as_f64())
        .fold(0.0, f64::hypot);
    Ok(Value::Float(distance))
}

fn math_sumprod(args: &[Value]) -> Result<Value, Error> {
    let (p, q) = paired_number_lists("sumprod", args)?;
    let mut total = Number::Int(0);
    for (a, b) in p.into_iter().zip(q) {
        let term = arith("sumprod", a, b, IntegerType::checked_mul, |x, y| x * y)?;
        total = arith("sumprod", total, term, IntegerType::checked_add, |x, y| x + y)?;
    }
    Ok(total.into())
}

fn math_isclose(args: &[Value]) -> Result<Value, Error> {
    const DEFAULT_REL_TOL: f64 = 1e-9;

    let floats = args
        .iter()
        .map(|arg| float_arg("isclose", arg))
        .collect::<Result<Vec<_>, _>>()?;
    let (a, b, rel_tol, abs_tol) = match floats[..] {
        [a, b] => (a, b, DEFAULT_REL_TOL, 0.0),
        [a, b, rel_tol] => (a, b, rel_tol, 0.0),
        [a, b, rel_tol, abs_tol] => (a, b, rel_tol, abs_tol),
        _ => return Err(Error::arity_error(2, args.len())),
    };
    if rel_tol < 0.0 || abs_tol < 0.0 {
        return Err(Error::EvalError(
            "isclose: tolerances must be non-negative".to_owned(),
        ));
    }

    if a == b {
        return Ok(Value::Bool(true));
    }
    if a.is_infinite() || b.is_infinite() {
        return Ok(Value::Bool(false));
    }
    let diff = (b - a).abs();
    Ok(Value::Bool(
        diff <= (rel_tol * b).abs() || diff <= (rel_tol * a).abs() || diff <= abs_tol,
    ))
}

fn math_log(args: &[Value]) -> Result<Value, Error> {
    match args {
        [x] => Ok(Value::Float(float_arg("log", x)?.ln())),
        [x, base] => Ok(Value::Float(
            float_arg("log", x)?.ln() / float_arg("log", base)?.ln(),
        )),
        _ => Err(Error::arity_error(1, args.len())),
    }
}

// Macro to generate float-to-integer rounding functions
macro_rules! integer_rounding_op {
    ($name:ident, $op_str:expr, $f:expr) => {
        fn $name(args: &[Value]) -> Result<Value, Error> {
            let f: fn(f64) -> f64 = $f;
            match number_arg($op_str, one_arg(args)?)? {
                Number::Int(n) => Ok(Value::Integer(n)),
                Number::Float(x) => float_to_integer($op_str, f(x)),
            }
        }
    };
}

integer_rounding_op!(math_floor, "floor", f64::floor);
integer_rounding_op!(math_ceil, "ceil", f64::ceil);
integer_rounding_op!(math_trunc, "trunc", f64::trunc);

fn math_factorial(args: &[Value]) -> Result<Value, Error> {
    let n = integer_arg("factorial", one_arg(args)?)?;
    if n < 0 {
        return Err(Error::EvalError(
            "factorial not defined for negative values".to_owned(),
        ));
    }

    let mut result: IntegerType = 1;
    for k in 2..=n {
        result = result.checked_mul(k).ok_or_else(|| overflow("factorial"))?;
    }
    Ok(Value::Integer(result))
}

fn non_negative_integer_arg(op: &str, value: &Value) -> Result<IntegerType, Error> {
    match integer_arg(op, value)? {
        n if n < 0 => Err(Error::EvalError(format!(
            "{op}: expected a non-negative integer, got {n}"
        ))),
        n => Ok(n),
    }
}

fn math_isqrt(args: &[Value]) -> Result<Value, Error> {
    let n = non_negative_integer_arg("isqrt", one_arg(args)?)?;
    Ok(Value::Integer(n.isqrt()))
}

/// Ways to choose k items from n, without order
fn math_comb(args: &[Value]) -> Result<Value, Error> {
    let (n, k) = two_args(args)?;
    let n = non_negative_integer_arg("comb", n)?;
    let k = non_negative_integer_arg("comb", k)?;
    if k > n {
        return Ok(Value::Integer(0));
    }

    let mut result: i128 = 1;
    for i in 0..k.min(n - k) {
        // Every partial result is itself a binomial coefficient, so the division is exact
        result = result * i128::from(n - i) / i128::from(i + 1);
        if result > i128::from(IntegerType::MAX) {
            return Err(overflow("comb"));
        }
    }
    IntegerType::try_from(result)
        .map(Value::Integer)
        .map_err(|_| overflow("comb"))
}

/// Ways to choose k items from n, in order; k defaults to n
fn math_perm(args: &[Value]) -> Result<Value, Error> {
    let (n, k) = match args {
        [n] => {
            let n = non_negative_integer_arg("perm", n)?;
            (n, n)
        }
        [n, k] => (
            non_negative_integer_arg("perm", n)?,
            non_negative_integer_arg("perm", k)?,
        ),
        _ => return Err(Error::arity_error(1, args.len())),
    };
    if k > n {
        return Ok(Value::Integer(0));
    }

    let mut result: IntegerType = 1;
    for i in 0..k {
        result = result.checked_mul(n - i).ok_or_else(|| overflow("perm"))?;
    }
    Ok(Value::Integer(result))
}

/// Euclid's algorithm on magnitudes
fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn math_gcd(args: &[Value]) -> Result<Value, Error> {
    let mut result: u64 = 0;
    for arg in args {
        result = gcd(result, integer_arg("gcd", arg)?.unsigned_abs());
    }
    IntegerType::try_from(result)
        .map(Value::Integer)
        .map_err(|_| overflow("gcd"))
}

fn math_lcm(args: &[Value]) -> Result<Value, Error> {
    let mut result: u64 = 1;
    for arg in args {
        let n = integer_arg("lcm", arg)?.unsigned_abs();
        result = if result == 0 || n == 0 {
            0
        } else {
            (result / gcd(result, n))
                .checked_mul(n)
                .ok_or_else(|| overflow("lcm"))?
        };
    }
    IntegerType::try_from(result)
        .map(Value::Integer)
        .map_err(|_| overflow("lcm"))
}

// Macro to generate float classification predicates; integers are always finite
macro_rules! float_predicate {
    ($name:ident, $op_str:expr, $f:expr, $int_result:literal) => {
        fn $name(args: &[Value]) -> Result<Value, Error> {
            let f: fn(f64) -> bool = $f;
            match number_arg($op_str, one_arg(args)?)? {
                Number::Int(_) => Ok(Value::Bool($int_result)),
                Number::Float(x) => Ok(Value::Bool(f(x))),
            }
        }
    };
}

float_predicate!(math_isnan, "isnan", f64::is_nan, false);
float_predicate!(math_isinf, "isinf", f64::is_infinite, false);
float_predicate!(math_isfinite, "isfinite", f64::is_finite, true);

macro_rules! op {
    ($id:expr, $func:expr, $arity:expr) => {
        BuiltinOp {
            scheme_id: $id,
            func: $func,
            arity: $arity,
        }
    };
}

/// Global registry of all built-in operations
static BUILTIN_OPS: &[BuiltinOp] = &[
    // Arithmetic
    op!("+", builtin_add, Arity::AtLeast(0)),
    op!("-", builtin_sub, Arity::AtLeast(1)),
    op!("*", builtin_mul, Arity::AtLeast(1)),
    op!("/", builtin_div, Arity::AtLeast(1)),
    // Comparison
    op!("=", builtin_eq, Arity::AtLeast(2)),
    op!("<", builtin_lt, Arity::AtLeast(2)),
    op!(">", builtin_gt, Arity::AtLeast(2)),
    op!("<=", builtin_le, Arity::AtLeast(2)),
    op!(">=", builtin_ge, Arity::AtLeast(2)),
    // Lists
    op!("car", builtin_car, Arity::Exact(1)),
    op!("cdr", builtin_cdr, Arity::Exact(1)),
    op!("cons", builtin_cons, Arity::Exact(2)),
    op!("list", builtin_list, Arity::AtLeast(0)),
    op!("length", builtin_length, Arity::Exact(1)),
    op!("append", builtin_append, Arity::AtLeast(0)),
    // Predicates
    op!("null?", builtin_null, Arity::Exact(1)),
    op!("list?", builtin_is_list, Arity::Exact(1)),
    op!("number?", builtin_is_number, Arity::Exact(1)),
    op!("symbol?", builtin_is_symbol, Arity::Exact(1)),
    op!("procedure?", builtin_is_procedure, Arity::Exact(1)),
    op!("eq?", builtin_eq_p, Arity::Exact(2)),
    op!("equal?", builtin_equal, Arity::Exact(2)),
    // Numeric utilities
    op!("abs", builtin_abs, Arity::Exact(1)),
    op!("max", builtin_max, Arity::AtLeast(1)),
    op!("min", builtin_min, Arity::AtLeast(1)),
    op!("round", builtin_round, Arity::Range(1, 2)),
    // Logic and control
    op!("not", builtin_not, Arity::Exact(1)),
    op!("begin", builtin_begin, Arity::AtLeast(1)),
    op!("map", builtin_map, Arity::AtLeast(2)),
    // Math namespace
    op!("sin", math_sin, Arity::Exact(1)),
    op!("cos", math_cos, Arity::Exact(1)),
    op!("tan", math_tan, Arity::Exact(1)),
    op!("asin", math_asin, Arity::Exact(1)),
    op!("acos", math_acos, Arity::Exact(1)),
    op!("atan", math_atan, Arity::Exact(1)),
    op!("sinh", math_sinh, Arity::Exact(1)),
    op!("cosh", math_cosh, Arity::Exact(1)),
    op!("tanh", math_tanh, Arity::Exact(1)),
    op!("asinh", math_asinh, Arity::Exact(1)),
    op!("acosh", math_acosh, Arity::Exact(1)),
    op!("atanh", math_atanh, Arity::Exact(1)),
    op!("exp", math_exp, Arity::Exact(1)),
    op!("expm1", math_expm1, Arity::Exact(1)),
    op!("log", math_log, Arity::Range(1, 2)),
    op!("log10", math_log10, Arity::Exact(1)),
    op!("log2", math_log2, Arity::Exact(1)),
    op!("log1p", math_log1p, Arity::Exact(1)),
    op!("sqrt", math_sqrt, Arity::Exact(1)),
    op!("fabs", math_fabs, Arity::Exact(1)),
    op!("degrees", math_degrees, Arity::Exact(1)),
    op!("radians", math_radians, Arity::Exact(1)),
    op!("cbrt", math_cbrt, Arity::Exact(1)),
    op!("exp2", math_exp2, Arity::Exact(1)),
    op!("atan2", math_atan2, Arity::Exact(2)),
    op!("pow", math_pow, Arity::Exact(2)),
    op!("hypot", math_hypot, Arity::Exact(2)),
    op!("fmod", math_fmod, Arity::Exact(2)),
    op!("copysign", math_copysign, Arity::Exact(2)),
    op!("remainder", math_remainder, Arity::Exact(2)),
    op!("nextafter", math_nextafter, Arity::Exact(2)),
    op!("ulp", math_ulp, Arity::Exact(1)),
    op!("fma", math_fma, Arity::Exact(3)),
    op!("ldexp", math_ldexp, Arity::Exact(2)),
    op!("frexp", math_frexp, Arity::Exact(1)),
    op!("modf", math_modf, Arity::Exact(1)),
    op!("fsum", math_fsum, Arity::Exact(1)),
    op!("prod", math_prod, Arity::Range(1, 2)),
    op!("dist", math_dist, Arity::Exact(2)),
    op!("sumprod", math_sumprod, Arity::Exact(2)),
    op!("isclose", math_isclose, Arity::Range(2, 4)),
    op!("floor", math_floor, Arity::Exact(1)),
    op!("ceil", math_ceil, Arity::Exact(1)),
    op!("trunc", math_trunc, Arity::Exact(1)),
    op!("factorial", math_factorial, Arity::Exact(1)),
    op!("gcd", math_gcd, Arity::AtLeast(0)),
    op!("lcm", math_lcm, Arity::AtLeast(0)),
    op!("isqrt", math_isqrt, Arity::Exact(1)),
    op!("comb", math_comb, Arity::Exact(2)),
    op!("perm", math_perm, Arity::Range(1, 2)),
    op!("isnan", math_isnan, Arity::Exact(1)),
    op!("isinf", math_isinf, Arity::Exact(1)),
    op!("isfinite", math_isfinite, Arity::Exact(1)),
];

/// Lazy static map from scheme_id to BuiltinOp (private - use find_scheme_op)
static BUILTIN_SCHEME: LazyLock<HashMap<&'static str, &'static BuiltinOp>> =
    LazyLock::new(|| BUILTIN_OPS.iter().map(|op| (op.scheme_id, op)).collect());

/// All built-in operations, in registration order
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS
}

/// Look up a built-in operation by identifier
pub fn find_scheme_op(id: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_SCHEME.get(id).copied()
}
