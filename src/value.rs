use im_rc::{HashMap, Vector};

use std::{
    fmt::{self, Debug, Display},
    rc::Rc,
};

use crate::{
    error::{self as e, Error},
    hashkey::HashKey,
};

pub type Args = Vector<Value>;
pub type Mapping = HashMap<HashKey, Option<Value>>;
pub type EvalResult = Result<Value, Error>;
pub type BuiltinFunction = fn(Args) -> EvalResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
    Between(usize, usize),
}

impl Arity {
    pub fn accepts(&self, provided: usize) -> bool {
        match *self {
            Self::Exactly(n) => provided == n,
            Self::AtLeast(n) => provided >= n,
            Self::Between(min, max) => (min..=max).contains(&provided),
        }
    }
}

impl Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Exactly(n) => write!(f, "{}", n),
            Self::AtLeast(n) => write!(f, "{} or more", n),
            Self::Between(min, max) => write!(f, "{} to {}", min, max),
        }
    }
}

/// A procedure implemented in Rust. Receives already evaluated arguments.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: Arity,
    pub func: BuiltinFunction,
}

impl Builtin {
    pub const fn new(name: &'static str, arity: Arity, func: BuiltinFunction) -> Self {
        Builtin { name, arity, func }
    }

    pub fn call(&self, args: Args) -> EvalResult {
        if !self.arity.accepts(args.len()) {
            return Err(e::arg_count(self.name, self.arity, args.len()));
        }
        (self.func)(args)
    }
}

impl Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Builtin results such as `head` and `tail` render their output as text.
    Text(Rc<str>),
    List(Vector<Value>),
    Mapping(Mapping),
    Builtin(Builtin),
}

impl Value {
    #[inline]
    pub fn make_text<S: AsRef<str>>(s: S) -> Self {
        Value::Text(Rc::from(s.as_ref()))
    }

    #[inline]
    pub fn list(&self) -> Option<&Vector<Value>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    #[inline]
    pub fn mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// Numeric value widened to a float.
    #[inline]
    pub fn float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Integer(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Mapping(m) => !m.is_empty(),
            Value::Builtin(_) => true,
        }
    }
}

impl From<i64> for Value {
    fn from(source: i64) -> Self {
        Value::Integer(source)
    }
}

impl From<f64> for Value {
    fn from(source: f64) -> Self {
        Value::Float(source)
    }
}

impl From<bool> for Value {
    fn from(source: bool) -> Self {
        Value::Bool(source)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Integer(a), Self::Float(b)) | (Self::Float(b), Self::Integer(a)) => {
                *a as f64 == *b
            }
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Mapping(a), Self::Mapping(b)) => a == b,
            (Self::Builtin(a), Self::Builtin(b)) => a.name == b.name,
            _ => false,
        }
    }
}

pub(crate) fn write_float(n: f64, f: &mut fmt::Formatter) -> fmt::Result {
    if n.is_nan() {
        write!(f, "nan")
    } else if n.is_infinite() {
        write!(f, "{}", if n > 0.0 { "inf" } else { "-inf" })
    } else if n.fract() == 0.0 && n.abs() < 1e16 {
        write!(f, "{:.1}", n)
    } else {
        write!(f, "{}", n)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{}", n),
            Self::Float(n) => write_float(*n, f),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Text(s) => write!(f, "{}", s),
            Self::Builtin(b) => write!(f, "#<builtin {}>", b.name),
            Self::List(l) => {
                write!(f, "(")?;
                display_seq(l.iter(), " ", f)?;
                write!(f, ")")
            }
            Self::Mapping(m) => {
                write!(f, "{{")?;
                display_seq(m.iter().map(MappingEntry), ", ", f)?;
                write!(f, "}}")
            }
        }
    }
}

pub fn display_seq<P: Display, I: Iterator<Item = P>>(
    mut i: I,
    separator: &str,
    f: &mut fmt::Formatter,
) -> fmt::Result {
    if let Some(e) = i.next() {
        write!(f, "{}", e)?;
    }

    for e in i {
        write!(f, "{}{}", separator, e)?;
    }

    Ok(())
}

struct MappingEntry<'a>((&'a HashKey, &'a Option<Value>));

impl<'a> Display for MappingEntry<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.0).1 {
            Some(v) => write!(f, "{}: {}", (self.0).0, v),
            None => write!(f, "{}: none", (self.0).0),
        }
    }
}
