//! A small embeddable expression language.
//!
//! Text is read into an [`Expr`] tree with [`parse`] and evaluated against an
//! explicitly constructed [`Env`] with [`eval`]:
//!
//! ```
//! use mlang::{eval, parse, Env, Value};
//!
//! let root = Env::root();
//! eval(&parse("(var x 5)").unwrap(), &root).unwrap();
//! let sum = eval(&parse("(+ x 1 2)").unwrap(), &root).unwrap();
//! assert_eq!(sum, Some(Value::Integer(8)));
//! ```

pub mod core;
pub mod env;
pub mod error;
pub mod eval;
pub mod hashkey;
pub mod reader;
pub mod value;

pub use crate::{
    env::{Env, EnvBuilder},
    error::{Error, ErrorKind, SyntaxError},
    eval::{eval, Evaluator, MappingPolicy},
    hashkey::HashKey,
    reader::{parse, tokenize, Atom, Expr},
    value::{Arity, Builtin, EvalResult, Value},
};

/// Reads and evaluates one line of source.
pub fn rep(s: &str, evaluator: &Evaluator, env: &Env) -> Result<Option<Value>, Error> {
    evaluator.eval(&parse(s)?, env)
}
