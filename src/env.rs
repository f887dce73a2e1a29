use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::{
    error::{self as e, Error},
    value::Value,
};

/// Handle to one frame of the environment chain. Cloning shares the frame.
pub struct Env(Rc<Frame>);

struct Frame {
    data: RefCell<HashMap<Rc<str>, Value>>,
    outer: Option<Env>,
}

impl Env {
    pub fn new() -> EnvBuilder {
        EnvBuilder {
            data: HashMap::new(),
            outer: None,
        }
    }

    /// Root frame populated with the builtin library.
    pub fn root() -> Env {
        Env::new().with_builtins().make()
    }

    pub fn is_root(&self) -> bool {
        self.0.outer.is_none()
    }

    pub fn outer(&self) -> Option<&Env> {
        self.0.outer.as_ref()
    }

    pub fn contains(&self, k: &str) -> bool {
        self.0.data.borrow().contains_key(k)
    }

    /// Nearest frame, innermost first, that binds `k`.
    pub fn find(&self, k: &str) -> Result<Env, Error> {
        let mut frame = self;
        loop {
            if frame.contains(k) {
                return Ok(frame.clone());
            }
            match frame.outer() {
                Some(outer) => frame = outer,
                None => return Err(e::unbound_symbol(k)),
            }
        }
    }

    pub fn get(&self, k: &str) -> Result<Value, Error> {
        let frame = self.find(k)?;
        let data = frame.0.data.borrow();
        data.get(k).cloned().ok_or_else(|| e::unbound_symbol(k))
    }

    /// Binds `k` in this frame, never in an outer one.
    pub fn define(&self, k: Rc<str>, value: Value) {
        self.0.data.borrow_mut().insert(k, value);
    }
}

impl Clone for Env {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

pub struct EnvBuilder {
    data: HashMap<Rc<str>, Value>,
    outer: Option<Env>,
}

impl EnvBuilder {
    pub fn env(mut self, env: Env) -> Self {
        self.outer = Some(env);
        self
    }

    pub fn with_builtins(mut self) -> Self {
        for (name, value) in crate::core::namespace() {
            self.data.insert(Rc::from(name), value);
        }
        self
    }

    /// Pairs names with values positionally, stopping at the shorter side.
    pub fn binds<N, V>(mut self, names: N, values: V) -> Self
    where
        N: IntoIterator,
        N::Item: AsRef<str>,
        V: IntoIterator<Item = Value>,
    {
        for (name, value) in names.into_iter().zip(values) {
            self.data.insert(Rc::from(name.as_ref()), value);
        }
        self
    }

    pub fn make(mut self) -> Env {
        let outer = self.outer.take();

        Env(Rc::new(Frame {
            data: RefCell::new(self.data),
            outer,
        }))
    }
}

#[cfg(test)]
mod env_tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn unbound_on_single_root() {
        let env = Env::new().make();
        assert!(env.is_root());
        let err = env.find("x").err().unwrap();
        assert_eq!(err, Error::UnboundSymbol("x".into()));
        assert_eq!(env.get("x").unwrap_err().kind(), ErrorKind::UnboundSymbol);
    }

    #[test]
    fn find_walks_outward() {
        let root = Env::new().binds(["x"], vec![Value::Integer(1)]).make();
        let inner = Env::new().env(root.clone()).make();
        assert!(!inner.is_root());
        assert!(inner.find("x").unwrap().is_root());
        assert_eq!(inner.get("x").unwrap(), Value::Integer(1));
        assert!(inner.find("y").is_err());
    }

    #[test]
    fn innermost_binding_wins() {
        let root = Env::new().binds(["x"], vec![Value::Integer(1)]).make();
        let inner = Env::new()
            .env(root)
            .binds(["x"], vec![Value::Integer(2)])
            .make();
        assert_eq!(inner.get("x").unwrap(), Value::Integer(2));
    }

    #[test]
    fn define_targets_current_frame() {
        let root = Env::new().binds(["x"], vec![Value::Integer(1)]).make();
        let inner = Env::new().env(root.clone()).make();
        inner.define("x".into(), Value::Integer(9));
        assert_eq!(root.get("x").unwrap(), Value::Integer(1));
        assert_eq!(inner.get("x").unwrap(), Value::Integer(9));

        root.define("x".into(), Value::Integer(3));
        assert_eq!(root.get("x").unwrap(), Value::Integer(3));
    }

    #[test]
    fn binds_truncate_to_shorter() {
        let env = Env::new()
            .binds(["a", "b", "c"], vec![Value::Integer(1), Value::Integer(2)])
            .make();
        assert!(env.contains("b"));
        assert!(!env.contains("c"));

        let env = Env::new().binds(["a"], vec![Value::Integer(1), Value::Integer(2)]).make();
        assert!(env.contains("a"));
    }

    #[test]
    fn root_has_builtins() {
        let env = Env::root();
        assert!(matches!(env.get("+"), Ok(Value::Builtin(_))));
        assert!(matches!(env.get("pi"), Ok(Value::Float(_))));
    }
}
