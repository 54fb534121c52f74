// tamarin-core - Runtime and evaluator for the Tamarin programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # tamarin-core
//!
//! Runtime values and tree-walking evaluator for the Tamarin programming
//! language. The bytecode back-end in `tamarin-vm` shares the same value
//! model, so the two back-ends agree on results.
//!
//! # Quick Start
//!
//! ```
//! use tamarin_core::{Env, Value, eval};
//! use tamarin_parser::parse;
//!
//! let (program, errors) = parse("let x = 2; x * 21");
//! assert!(errors.is_empty());
//!
//! let env = Env::new();
//! assert_eq!(eval(&program, &env), Value::Integer(42));
//! ```
//!
//! # Core Components
//!
//! - [`Value`] - the tagged runtime value type shared by both back-ends
//! - [`Env`] - lexical environment chain for the evaluator
//! - [`eval`] - evaluate a parsed program
//! - [`builtins`] - the native function registry (`len`, `puts`, ...)

pub mod builtins;
pub mod env;
pub mod eval;
pub mod object;

pub use env::Env;
pub use eval::{apply_function, eval};
pub use object::{Builtin, CompiledFunction, Function, HashKey, HashPair, Value};
