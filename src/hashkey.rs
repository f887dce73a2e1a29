use std::{
    fmt::{self, Display},
    rc::Rc,
};

use crate::value::{write_float, Value};

/// The hashable subset of values, usable as mapping keys.
///
/// Floats are keyed by their bit pattern with `-0.0` folded into `0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    Integer(i64),
    Float(u64),
    Bool(bool),
    Text(Rc<str>),
}

impl HashKey {
    fn float(n: f64) -> Self {
        let n = if n == 0.0 { 0.0 } else { n };
        HashKey::Float(n.to_bits())
    }
}

impl Display for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{}", n),
            Self::Float(bits) => write_float(f64::from_bits(*bits), f),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl TryFrom<Value> for HashKey {
    type Error = Value;
    fn try_from(source: Value) -> Result<Self, Self::Error> {
        match source {
            Value::Integer(n) => Ok(HashKey::Integer(n)),
            Value::Float(n) => Ok(HashKey::float(n)),
            Value::Bool(b) => Ok(HashKey::Bool(b)),
            Value::Text(s) => Ok(HashKey::Text(s)),
            provided => Err(provided),
        }
    }
}

impl From<HashKey> for Value {
    fn from(source: HashKey) -> Self {
        match source {
            HashKey::Integer(n) => Value::Integer(n),
            HashKey::Float(bits) => Value::Float(f64::from_bits(bits)),
            HashKey::Bool(b) => Value::Bool(b),
            HashKey::Text(s) => Value::Text(s),
        }
    }
}
