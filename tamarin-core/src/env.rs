// tamarin-core - Environment for lexical scoping
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Environment for variable bindings with lexical scoping.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::object::Value;

/// A lexical environment for variable bindings.
///
/// Environments form a chain through outer references. Lookup walks
/// outward; definition always writes into the innermost environment.
/// Function values hold the environment current at their creation, which
/// keeps the captured chain alive for as long as the closure does.
///
/// # Examples
///
/// ```
/// use tamarin_core::{Env, Value};
///
/// let env = Env::new();
/// env.define("x", Value::Integer(42));
/// assert_eq!(env.lookup("x"), Some(Value::Integer(42)));
///
/// // An enclosed environment sees outer bindings and can shadow them.
/// let inner = env.enclosed();
/// assert_eq!(inner.lookup("x"), Some(Value::Integer(42)));
/// inner.define("x", Value::Integer(7));
/// assert_eq!(inner.lookup("x"), Some(Value::Integer(7)));
/// assert_eq!(env.lookup("x"), Some(Value::Integer(42)));
/// ```
#[derive(Debug, Clone)]
pub struct Env {
    inner: Rc<RefCell<EnvInner>>,
}

#[derive(Debug)]
struct EnvInner {
    bindings: HashMap<String, Value>,
    outer: Option<Env>,
}

impl Env {
    /// Create a new root environment with no outer link.
    pub fn new() -> Self {
        Env {
            inner: Rc::new(RefCell::new(EnvInner {
                bindings: HashMap::new(),
                outer: None,
            })),
        }
    }

    /// Create an environment enclosed by this one.
    #[must_use]
    pub fn enclosed(&self) -> Self {
        Env {
            inner: Rc::new(RefCell::new(EnvInner {
                bindings: HashMap::new(),
                outer: Some(self.clone()),
            })),
        }
    }

    /// Bind a name in this environment (never an outer one).
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.inner.borrow_mut().bindings.insert(name.into(), value);
    }

    /// Look up a name in this environment or the outer chain.
    /// Iterative traversal so deep chains cannot overflow the host stack.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut current = self.clone();
        loop {
            let inner = current.inner.borrow();
            if let Some(value) = inner.bindings.get(name) {
                return Some(value.clone());
            }
            let outer = inner.outer.clone();
            drop(inner);
            match outer {
                Some(outer) => current = outer,
                None => return None,
            }
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
