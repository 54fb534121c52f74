// tamarin-core - Runtime value types for Tamarin
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Core runtime value type for Tamarin.
//!
//! `Value` is the central enum representing every value both back-ends
//! produce. Arrays and hashes use `im` collections so that values share
//! structure when aliased. Each value exposes a `type_name` tag (used in
//! error messages) and renders its inspect form via `Display`.

use std::fmt;
use std::rc::Rc;

use im::{OrdMap, Vector};

use tamarin_parser::BlockStatement;

use crate::env::Env;

/// FNV-1a offset basis (64-bit).
const FNV_OFFSET_BASIS: u64 = 14_695_981_039_346_656_037;
/// FNV-1a prime (64-bit).
const FNV_PRIME: u64 = 1_099_511_628_211;

/// A Tamarin runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    Str(Rc<str>),
    Null,
    Array(Vector<Value>),
    Hash(OrdMap<HashKey, HashPair>),
    /// Control-flow marker produced by `return`; unwinds through blocks and
    /// is unwrapped at program level and on function application.
    Return(Box<Value>),
    /// A runtime error. Short-circuits all further evaluation.
    Error(String),
    Function(Rc<Function>),
    Builtin(&'static Builtin),
    CompiledFunction(Rc<CompiledFunction>),
}

impl Value {
    /// Build a string value.
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(Rc::from(s.into()))
    }

    /// Build an array value.
    pub fn array(elements: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(elements.into_iter().collect())
    }

    /// Build an error value.
    pub fn error(message: impl Into<String>) -> Self {
        Value::Error(message.into())
    }

    /// The uppercase type tag used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::Boolean(_) => "BOOLEAN",
            Value::Str(_) => "STRING",
            Value::Null => "NULL",
            Value::Array(_) => "ARRAY",
            Value::Hash(_) => "HASH",
            Value::Return(_) => "RETURN_VALUE",
            Value::Error(_) => "ERROR",
            Value::Function(_) => "FUNCTION",
            Value::Builtin(_) => "BUILTIN",
            Value::CompiledFunction(_) => "COMPILED_FUNCTION",
        }
    }

    /// Everything is truthy except `false` and `null`.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false) | Value::Null)
    }

    /// Equality as the `==` operator sees non-integer operands: only the
    /// shared boolean and null singletons compare equal. Both back-ends
    /// use this rule, keeping their results in agreement.
    pub fn identity_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }

    /// The hash key for this value, or `None` if the type is not hashable.
    /// Only integers, booleans, and strings hash.
    pub fn hash_key(&self) -> Option<HashKey> {
        let value = match self {
            Value::Integer(v) => *v as u64,
            Value::Boolean(v) => u64::from(*v),
            Value::Str(s) => fnv1a(s.as_bytes()),
            _ => return None,
        };
        Some(HashKey {
            kind: self.type_name(),
            value,
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Hash(a), Value::Hash(b)) => a == b,
            (Value::Return(a), Value::Return(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            // Functions compare by identity.
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => std::ptr::eq(*a, *b),
            (Value::CompiledFunction(a), Value::CompiledFunction(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Str(s) => f.write_str(s),
            Value::Null => f.write_str("null"),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            Value::Hash(pairs) => {
                // OrdMap iterates in key order, so rendering is deterministic.
                write!(f, "{{")?;
                for (i, (_, pair)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", pair.key, pair.value)?;
                }
                write!(f, "}}")
            }
            Value::Return(value) => write!(f, "{}", value),
            Value::Error(message) => write!(f, "ERROR: {}", message),
            Value::Function(function) => {
                write!(f, "fn(")?;
                for (i, parameter) in function.parameters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    f.write_str(parameter)?;
                }
                write!(f, ") {}", function.body)
            }
            Value::Builtin(_) => f.write_str("builtin function"),
            Value::CompiledFunction(c) => {
                write!(f, "CompiledFunction[{:p}]", Rc::as_ptr(c))
            }
        }
    }
}

/// The hash of a hashable value: its type tag plus a 64-bit payload.
/// Integers hash as their bit pattern, booleans as 0/1, strings via
/// FNV-1a over their UTF-8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HashKey {
    kind: &'static str,
    value: u64,
}

/// An entry in a hash value: the original key value plus the mapped value.
#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: Value,
    pub value: Value,
}

/// A user-defined function: parameters, body, and the environment captured
/// at its creation (lexical scope).
#[derive(Clone)]
pub struct Function {
    pub parameters: Vec<String>,
    pub body: BlockStatement,
    pub env: Env,
}

impl fmt::Debug for Function {
    // The captured environment may contain this function (recursive let),
    // so it is left out of the debug rendering.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("parameters", &self.parameters)
            .field("body", &self.body.to_string())
            .finish_non_exhaustive()
    }
}

/// A native function exposed to Tamarin programs.
#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub func: fn(&[Value]) -> Value,
}

/// A function lowered to bytecode by the compiler, executed by the VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFunction {
    pub instructions: Vec<u8>,
    pub num_locals: usize,
    pub num_parameters: usize,
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

// ============================================================================
// Tests
// ============================================================================
