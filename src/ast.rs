//! This module defines the value model shared by the reader, the evaluator and the
//! built-in library. The main enum, [`Value`], covers every expression and result:
//! the two numeric kinds, booleans, symbols, lists and procedures. Procedures are either
//! [`Primitive`] host functions or [`Closure`]s that capture their defining
//! [`Environment`]. Ergonomic helper functions such as [`val`], [`sym`] and [`nil`] are
//! provided for building trees in code and tests. The [`Display`](std::fmt::Display)
//! implementation is the printer: its output reads back to an equal value for every
//! tree built from literals.

use crate::Error;
use crate::builtinops::Arity;
use crate::evaluator::Environment;
use std::rc::Rc;

/// Type alias for integer values in interpreter
pub(crate) type IntegerType = i64;

/// Canonical erased signature of a primitive procedure.
///
/// Primitives borrow their already-evaluated arguments; arity has been checked against
/// the primitive's [`Arity`] before the call.
pub type OperationFn = dyn Fn(&[Value]) -> Result<Value, Error>;

/// Core value type in interpreter
///
/// To build a tree, use the ergonomic helper functions:
/// - `val(42)` for values, `sym("name")` for symbols, `nil()` for empty lists
/// - `val([1, 2, 3])` for homogeneous lists
/// - `val(vec![sym("op"), val(42)])` for mixed lists
#[derive(Clone)]
pub enum Value {
    Integer(IntegerType),
    Float(f64),
    /// Boolean values, bound to the symbols `#t` and `#f` in the global environment
    Bool(bool),
    /// Symbols (identifiers), compared by content
    Symbol(String),
    /// Lists, shared by reference. The empty list represents nil
    List(Rc<[Value]>),
    Procedure(Procedure),
    /// Result of `define` and `set!`
    Unspecified,
}

/// A callable value.
#[derive(Clone)]
pub enum Procedure {
    Primitive(Primitive),
    Closure(Rc<Closure>),
}

/// A host function exposed to programs.
#[derive(Clone)]
pub struct Primitive {
    /// Name the primitive was registered under, used for display and equality
    pub id: String,
    pub arity: Arity,
    pub func: Rc<OperationFn>,
}

/// A user-defined procedure created by `lambda`.
pub struct Closure {
    pub params: Vec<String>,
    pub body: Value,
    /// Environment active when the `lambda` was evaluated; never rebound
    pub env: Environment,
}

impl Value {
    /// Build a list value from its elements
    pub fn list(elements: Vec<Value>) -> Value {
        Value::List(Rc::from(elements))
    }

    /// Check if a value represents nil (empty list)
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::List(list) if list.is_empty())
    }

    /// Everything except `#f` counts as true in a conditional
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false))
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Procedure(_) => "procedure",
            Value::Unspecified => "unspecified",
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "Integer({n})"),
            Value::Float(x) => write!(f, "Float({x:?})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Symbol(s) => write!(f, "Symbol({s})"),
            Value::List(list) => {
                write!(f, "List(")?;
                for (i, v) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v:?}")?;
                }
                write!(f, ")")
            }
            Value::Procedure(Procedure::Primitive(p)) => write!(f, "Primitive({})", p.id),
            Value::Procedure(Procedure::Closure(c)) => {
                write!(f, "Closure(params={:?}, body={:?})", c.params, c.body)
            }
            Value::Unspecified => write!(f, "Unspecified"),
        }
    }
}

// From trait implementations for Value - enables .into() conversion
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<Procedure> for Value {
    fn from(p: Procedure) -> Self {
        Value::Procedure(p)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Integer(IntegerType::from(n))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(IntegerType);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::list(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::list(arr.into_iter().map(Into::into).collect())
    }
}

/// Helper function for creating symbols - works great in mixed lists!
pub fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

/// Helper function for creating Values - works great in mixed lists!
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper function for creating empty lists (nil)
pub fn nil() -> Value {
    Value::list(Vec::new())
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            // Debug keeps a `.0` or exponent on every float, so output never reads back
            // as an integer
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::List(elements) => {
                write!(f, "(")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
            Value::Procedure(Procedure::Primitive(p)) => {
                write!(f, "#<builtin-function:{}>", p.id)
            }
            Value::Procedure(Procedure::Closure(_)) => write!(f, "#<function>"),
            Value::Unspecified => write!(f, "#<unspecified>"),
        }
    }
}

impl PartialEq for Procedure {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // Compare primitives by id string, not function pointer
            (Procedure::Primitive(a), Procedure::Primitive(b)) => a.id == b.id,
            (Procedure::Closure(a), Procedure::Closure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Structural equality. `Integer(2)` and `Float(2.0)` are different values; numeric
/// equality across kinds is the job of `=` and `equal?`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Procedure(a), Value::Procedure(b)) => a == b,
            (Value::Unspecified, Value::Unspecified) => true,
            _ => false,
        }
    }
}
