use std::fmt::{self, Display};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxError {
    UnexpectedEnd,
    UnexpectedClose,
    TooDeep(usize),
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnexpectedEnd => write!(f, "unexpected end of input"),
            Self::UnexpectedClose => write!(f, "unexpected )"),
            Self::TooDeep(limit) => write!(f, "nesting deeper than {}", limit),
        }
    }
}

/// Coarse classification a driver can use to decide what to recover from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Syntax,
    UnboundSymbol,
    Type,
    Arity,
    Domain,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::UnboundSymbol => write!(f, "unbound symbol"),
            Self::Type => write!(f, "type"),
            Self::Arity => write!(f, "arity"),
            Self::Domain => write!(f, "domain"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("{0}")]
    Syntax(SyntaxError),
    #[error("symbol '{0}' not found")]
    UnboundSymbol(String),
    #[error("{name}: expected {expected} as argument {position}")]
    Type {
        name: String,
        expected: String,
        position: usize,
    },
    #[error("{0} is not callable")]
    NotCallable(String),
    #[error("{0} produced no value")]
    NoValue(String),
    #[error("{name}: expected {expected} arguments, got {provided}")]
    Arity {
        name: String,
        expected: String,
        provided: usize,
    },
    #[error("{name}: {message}")]
    Domain { name: String, message: String },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax(_) => ErrorKind::Syntax,
            Self::UnboundSymbol(_) => ErrorKind::UnboundSymbol,
            Self::Type { .. } | Self::NotCallable(_) | Self::NoValue(_) => ErrorKind::Type,
            Self::Arity { .. } => ErrorKind::Arity,
            Self::Domain { .. } => ErrorKind::Domain,
        }
    }
}

impl From<SyntaxError> for Error {
    fn from(source: SyntaxError) -> Self {
        Error::Syntax(source)
    }
}

pub fn unexpected_end() -> Error {
    Error::Syntax(SyntaxError::UnexpectedEnd)
}

pub fn unexpected_close() -> Error {
    Error::Syntax(SyntaxError::UnexpectedClose)
}

pub fn too_deep(limit: usize) -> Error {
    Error::Syntax(SyntaxError::TooDeep(limit))
}

pub fn unbound_symbol<S: Into<String>>(symbol: S) -> Error {
    Error::UnboundSymbol(symbol.into())
}

pub fn arg_type<N: Display, E: Display>(name: N, expected: E, position: usize) -> Error {
    Error::Type {
        name: name.to_string(),
        expected: expected.to_string(),
        position,
    }
}

pub fn arg_count<N: Display, R: Display>(name: N, expected: R, provided: usize) -> Error {
    Error::Arity {
        name: name.to_string(),
        expected: expected.to_string(),
        provided,
    }
}

pub fn not_callable<D: Display>(value: D) -> Error {
    Error::NotCallable(value.to_string())
}

pub fn no_value<D: Display>(form: D) -> Error {
    Error::NoValue(form.to_string())
}

pub fn domain<N: Display, M: Display>(name: N, message: M) -> Error {
    Error::Domain {
        name: name.to_string(),
        message: message.to_string(),
    }
}

pub fn numeric_overflow<N: Display>(name: N) -> Error {
    domain(name, "integer overflow")
}

pub fn math_domain<N: Display>(name: N) -> Error {
    domain(name, "math domain error")
}

pub fn math_range<N: Display>(name: N) -> Error {
    domain(name, "math range error")
}
