use im_rc::{HashMap, Vector};
use tracing::{debug, trace};

use std::rc::Rc;

use crate::{
    env::Env,
    error::{self as e, Error},
    hashkey::HashKey,
    reader::{Atom, Expr, MAX_DEPTH},
    value::{Args, EvalResult, Mapping, Value},
};

/// Keyword of the definition form `(var name expr)`.
pub const DEFINE: &str = "var";

/// How the direct children of a comma-bearing sequence pair up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MappingPolicy {
    /// `k v , k v`: a child followed by a non-comma is a pair, a child
    /// followed by a comma or standing last maps to absent.
    #[default]
    CommaAdjacent,
    /// `k , v k , v`: strides of three, the middle child is skipped.
    Triples,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    pub mapping: MappingPolicy,
}

/// Evaluates with the default policy.
pub fn eval(expr: &Expr, env: &Env) -> Result<Option<Value>, Error> {
    Evaluator::default().eval(expr, env)
}

// Dispatch rules, in priority order.
enum Form<'a> {
    Symbol(&'a Rc<str>),
    Literal(Value),
    Mapping(&'a Vector<Expr>),
    NumericList(&'a Vector<Expr>),
    Define(&'a Vector<Expr>),
    Empty,
    Apply(&'a Vector<Expr>),
}

impl<'a> Form<'a> {
    fn classify(expr: &'a Expr) -> Self {
        match expr {
            Expr::Atom(Atom::Symbol(s)) => Form::Symbol(s),
            Expr::Atom(Atom::Integer(n)) => Form::Literal(Value::Integer(*n)),
            Expr::Atom(Atom::Float(n)) => Form::Literal(Value::Float(*n)),
            Expr::List(l) if l.iter().any(Expr::is_comma) => Form::Mapping(l),
            Expr::List(l) => match l.front() {
                Some(first) if first.is_numeric() => Form::NumericList(l),
                Some(first) if first.symbol().map_or(false, |s| &**s == DEFINE) => {
                    Form::Define(l)
                }
                Some(_) => Form::Apply(l),
                None => Form::Empty,
            },
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Form::Symbol(_) => "symbol",
            Form::Literal(_) => "literal",
            Form::Mapping(_) => "mapping",
            Form::NumericList(_) => "numeric list",
            Form::Define(_) => "define",
            Form::Empty => "empty",
            Form::Apply(_) => "apply",
        }
    }
}

impl Evaluator {
    pub fn new(mapping: MappingPolicy) -> Self {
        Evaluator { mapping }
    }

    /// `Ok(None)` is the result of a definition.
    ///
    /// Trees nested deeper than [`MAX_DEPTH`] fail with a `Domain` error.
    /// The reader never builds one, but an embedder assembling an [`Expr`]
    /// by hand can.
    pub fn eval(&self, expr: &Expr, env: &Env) -> Result<Option<Value>, Error> {
        self.eval_at(expr, env, 0)
    }

    /// Evaluates where a value is required.
    pub fn eval_value(&self, expr: &Expr, env: &Env) -> EvalResult {
        self.value_at(expr, env, 0)
    }

    fn eval_at(&self, expr: &Expr, env: &Env, depth: usize) -> Result<Option<Value>, Error> {
        if depth > MAX_DEPTH {
            return Err(e::domain("eval", format!("nesting deeper than {}", MAX_DEPTH)));
        }
        let form = Form::classify(expr);
        trace!(form = form.name(), depth, %expr, "eval");

        let depth = depth + 1;
        match form {
            Form::Symbol(s) => env.get(s).map(Some),
            Form::Literal(value) => Ok(Some(value)),
            Form::Mapping(children) => self.eval_mapping(children, env, depth).map(Some),
            Form::NumericList(children) => {
                self.eval_numeric_list(children, env, depth).map(Some)
            }
            Form::Define(children) => self.eval_define(children, env, depth).map(|_| None),
            Form::Empty => Ok(Some(Value::List(Vector::new()))),
            Form::Apply(children) => self.eval_apply(children, env, depth).map(Some),
        }
    }

    fn value_at(&self, expr: &Expr, env: &Env, depth: usize) -> EvalResult {
        self.eval_at(expr, env, depth)?.ok_or_else(|| e::no_value(expr))
    }

    fn eval_key(
        &self,
        expr: &Expr,
        position: usize,
        env: &Env,
        depth: usize,
    ) -> Result<HashKey, Error> {
        HashKey::try_from(self.value_at(expr, env, depth)?)
            .map_err(|_| e::arg_type("mapping literal", "hashable key", position))
    }

    fn eval_mapping(&self, children: &Vector<Expr>, env: &Env, depth: usize) -> EvalResult {
        let mut map: Mapping = HashMap::new();
        let mut i = 0;

        match self.mapping {
            MappingPolicy::CommaAdjacent => {
                while i < children.len() {
                    let key = self.eval_key(&children[i], i, env, depth)?;
                    match children.get(i + 1) {
                        Some(next) if !next.is_comma() => {
                            map.insert(key, self.eval_at(next, env, depth)?);
                            i += 3;
                        }
                        Some(_) => {
                            map.insert(key, None);
                            i += 2;
                        }
                        None => {
                            map.insert(key, None);
                            i += 1;
                        }
                    }
                }
            }
            MappingPolicy::Triples => {
                while i < children.len() {
                    let key = self.eval_key(&children[i], i, env, depth)?;
                    let value = match children.get(i + 2) {
                        Some(expr) => self.eval_at(expr, env, depth)?,
                        None => None,
                    };
                    map.insert(key, value);
                    i += 3;
                }
            }
        }

        Ok(Value::Mapping(map))
    }

    // Numeric children first, then the evaluated rest, each group in source order.
    fn eval_numeric_list(&self, children: &Vector<Expr>, env: &Env, depth: usize) -> EvalResult {
        let (literals, forms): (Vec<&Expr>, Vec<&Expr>) =
            children.iter().partition(|c| c.is_numeric());

        literals
            .into_iter()
            .chain(forms)
            .map(|c| self.value_at(c, env, depth))
            .collect::<Result<Vector<_>, _>>()
            .map(Value::List)
    }

    fn eval_define(&self, children: &Vector<Expr>, env: &Env, depth: usize) -> Result<(), Error> {
        if children.len() != 3 {
            return Err(e::arg_count(DEFINE, 2, children.len() - 1));
        }

        let symbol = children[1]
            .symbol()
            .ok_or_else(|| e::arg_type(DEFINE, "symbol", 0))?;
        let value = self.value_at(&children[2], env, depth)?;

        debug!(%symbol, %value, "define");
        env.define(Rc::clone(symbol), value);
        Ok(())
    }

    fn eval_apply(&self, children: &Vector<Expr>, env: &Env, depth: usize) -> EvalResult {
        let procedure = self.value_at(&children[0], env, depth)?;
        let args = children
            .iter()
            .skip(1)
            .map(|c| self.value_at(c, env, depth))
            .collect::<Result<Args, _>>()?;

        match procedure {
            Value::Builtin(builtin) => builtin.call(args),
            other => Err(e::not_callable(other)),
        }
    }
}

#[cfg(test)]
mod eval_tests {
    use super::*;
    use crate::{error::ErrorKind, reader::parse};
    use im_rc::vector;

    fn run(src: &str, env: &Env) -> Result<Option<Value>, Error> {
        eval(&parse(src)?, env)
    }

    fn value(src: &str, env: &Env) -> Value {
        run(src, env).unwrap().unwrap()
    }

    fn ints(ns: &[i64]) -> Value {
        Value::List(ns.iter().copied().map(Value::Integer).collect())
    }

    fn mapping(pairs: &[(i64, Option<i64>)]) -> Value {
        Value::Mapping(
            pairs
                .iter()
                .map(|(k, v)| (HashKey::Integer(*k), v.map(Value::Integer)))
                .collect(),
        )
    }

    fn with_ab() -> Env {
        let env = Env::root();
        env.define("a".into(), Value::Integer(1));
        env.define("b".into(), Value::Integer(2));
        env.define("c".into(), Value::Integer(3));
        env.define("d".into(), Value::Integer(4));
        env
    }

    #[test]
    fn application() {
        let env = Env::root();
        assert_eq!(value("(+ 1 2)", &env), Value::Integer(3));
        assert_eq!(value("(* 2 (+ 1 2) 4)", &env), Value::Integer(24));
        assert_eq!(value("(- 10 (/ 9 3))", &env), Value::Float(7.0));
        assert_eq!(
            value("(list 1 (list 2 3))", &env),
            Value::List(vector![Value::Integer(1), ints(&[2, 3])])
        );
        assert_eq!(value("(head (list 1 2 3))", &env), Value::make_text("(1)"));
        assert_eq!(value("(tail (list 1 2 3))", &env), Value::make_text("(2,3)"));
        assert_eq!(value("(length (list 1 2 3))", &env), Value::Integer(3));
        assert_eq!(value("(max 4 9 2)", &env), Value::Integer(9));
    }

    #[test]
    fn define_then_lookup() {
        let env = Env::root();
        assert_eq!(run("(var x 5)", &env).unwrap(), None);
        assert_eq!(value("x", &env), Value::Integer(5));
        assert_eq!(run("(var x (+ x 1))", &env).unwrap(), None);
        assert_eq!(value("x", &env), Value::Integer(6));
    }

    #[test]
    fn define_writes_current_frame_only() {
        let root = Env::root();
        root.define("x".into(), Value::Integer(1));
        let inner = Env::new().env(root.clone()).make();
        run("(var x 2)", &inner).unwrap();
        assert_eq!(value("x", &root), Value::Integer(1));
        assert_eq!(value("x", &inner), Value::Integer(2));
    }

    #[test]
    fn define_shape() {
        let env = Env::root();
        assert_eq!(run("(var x)", &env).unwrap_err().kind(), ErrorKind::Arity);
        assert_eq!(run("(var x 1 2)", &env).unwrap_err().kind(), ErrorKind::Arity);
        assert_eq!(run("(var 1 2)", &env).unwrap_err().kind(), ErrorKind::Type);
        assert!(!env.contains("x"));
    }

    #[test]
    fn unbound_symbol() {
        let env = Env::root();
        assert_eq!(
            run("nope", &env).unwrap_err(),
            Error::UnboundSymbol("nope".into())
        );
        assert_eq!(
            run("(+ 1 nope)", &env).unwrap_err().kind(),
            ErrorKind::UnboundSymbol
        );
    }

    #[test]
    fn literals_are_fixed_points() {
        let env = Env::root();
        assert_eq!(value("42", &env), Value::Integer(42));
        assert_eq!(value("3.14", &env), Value::Float(3.14));

        let once = value("7", &env);
        let again = value(&once.to_string(), &env);
        assert_eq!(once, again);
    }

    #[test]
    fn numeric_list_reorders() {
        let env = Env::root();
        assert_eq!(value("(1 (+ 1 1) 2)", &env), ints(&[1, 2, 2]));
        assert_eq!(value("(1 (+ 2 3) 2 (* 2 2) 3)", &env), ints(&[1, 2, 3, 5, 4]));
        assert_eq!(
            value("(1 2.5)", &env),
            Value::List(vector![Value::Integer(1), Value::Float(2.5)])
        );
        assert_eq!(
            value("(5 (list 6))", &env),
            Value::List(vector![Value::Integer(5), ints(&[6])])
        );
    }

    #[test]
    fn numeric_list_resolves_symbols_after_literals() {
        let env = with_ab();
        assert_eq!(value("(9 a 8)", &env), ints(&[9, 8, 1]));
    }

    #[test]
    fn mapping_comma_adjacent() {
        let env = with_ab();
        assert_eq!(value("(a ,)", &env), mapping(&[(1, None)]));
        assert_eq!(value("(a b , c d)", &env), mapping(&[(1, Some(2)), (3, Some(4))]));
        assert_eq!(value("(a , b)", &env), mapping(&[(1, None), (2, None)]));
        assert_eq!(value("(a b , c)", &env), mapping(&[(1, Some(2)), (3, None)]));
    }

    #[test]
    fn mapping_triples() {
        let env = with_ab();
        let strict = Evaluator::new(MappingPolicy::Triples);
        let run = |src: &str| strict.eval(&parse(src).unwrap(), &env).unwrap().unwrap();
        assert_eq!(run("(a , b)"), mapping(&[(1, Some(2))]));
        assert_eq!(run("(a ,)"), mapping(&[(1, None)]));
        assert_eq!(run("(a , b c , d)"), mapping(&[(1, Some(2)), (3, Some(4))]));
    }

    #[test]
    fn mapping_scans_direct_children_only() {
        let env = with_ab();
        assert_eq!(
            value("(list (a , b))", &env),
            Value::List(vector![mapping(&[(1, None), (2, None)])])
        );
    }

    #[test]
    fn mapping_values_evaluate() {
        let env = with_ab();
        assert_eq!(
            value("((+ a b) (* c d) ,)", &env),
            mapping(&[(3, Some(12))])
        );
        assert_eq!(
            run("((list 1) 2 ,)", &env).unwrap_err().kind(),
            ErrorKind::Type
        );
    }

    #[test]
    fn empty_sequence() {
        assert_eq!(value("()", &Env::root()), ints(&[]));
    }

    #[test]
    fn non_procedure_application() {
        let env = with_ab();
        assert_eq!(
            run("(a 1)", &env).unwrap_err(),
            Error::NotCallable("1".into())
        );
        assert_eq!(run("((list 1) 2)", &env).unwrap_err().kind(), ErrorKind::Type);
    }

    #[test]
    fn definition_is_not_a_value() {
        let env = Env::root();
        assert_eq!(
            run("(+ 1 (var y 2))", &env).unwrap_err().kind(),
            ErrorKind::Type
        );
    }

    #[test]
    fn errors_stop_evaluation() {
        let env = Env::root();
        assert!(run("(list (var z 1) nope)", &env).is_err());
        assert!(env.contains("z"));
        assert!(run("(list nope (var w 1))", &env).is_err());
        assert!(!env.contains("w"));
    }

    #[test]
    fn numeric_list_definition_runs_before_failing() {
        let env = Env::root();
        assert_eq!(
            run("(1 (var q 2))", &env).unwrap_err(),
            Error::NoValue("(var q 2)".into())
        );
        assert_eq!(value("q", &env), Value::Integer(2));
    }

    #[test]
    fn nesting_is_bounded() {
        fn nested(depth: usize) -> Expr {
            let mut expr = Expr::Atom(Atom::Integer(1));
            for _ in 0..depth {
                expr = Expr::List(vector![Expr::make_symbol("list"), expr]);
            }
            expr
        }

        // Unoptimized frames outgrow the default test thread stack here.
        std::thread::Builder::new()
            .stack_size(32 * 1024 * 1024)
            .spawn(|| {
                let env = Env::root();
                assert!(eval(&nested(MAX_DEPTH), &env).is_ok());
                assert_eq!(
                    eval(&nested(MAX_DEPTH + 1), &env).unwrap_err().kind(),
                    ErrorKind::Domain
                );
            })
            .unwrap()
            .join()
            .unwrap();
    }

    #[test]
    fn builtin_arity_reported() {
        let env = Env::root();
        assert_eq!(
            run("(- 1 2 3)", &env).unwrap_err(),
            Error::Arity {
                name: "-".into(),
                expected: "2".into(),
                provided: 3
            }
        );
    }
}
